//! Process lifecycle
//!
//! `Starting -> Running -> Draining -> Stopped`. The transport runs on a
//! background task while the caller's task races it against the shutdown
//! signal. Whichever finishes first decides the outcome.

use crate::transport::{McpHandler, Transport};
use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Draining,
    Stopped,
}

pub struct Lifecycle {
    transitions: Mutex<Vec<LifecycleState>>,
    shutdown: CancellationToken,
    grace: Duration,
}

impl Lifecycle {
    pub fn new(grace: Duration) -> Self {
        Self {
            transitions: Mutex::new(vec![LifecycleState::Starting]),
            shutdown: CancellationToken::new(),
            grace,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.transitions()
            .last()
            .copied()
            .unwrap_or(LifecycleState::Starting)
    }

    /// Every state entered so far, oldest first
    pub fn transitions(&self) -> Vec<LifecycleState> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Token handed to the transport; cancelled when draining starts
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn set(&self, next: LifecycleState) {
        info!(state = ?next, "Lifecycle transition");
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(next);
    }

    /// Serve until `stop` resolves or the transport ends.
    ///
    /// A signal drains in-flight work for at most the grace period and
    /// returns `Ok`. A transport that stops by itself returns its own result.
    pub async fn run<T, H, S>(&self, transport: T, handler: Arc<H>, stop: S) -> Result<()>
    where
        T: Transport + 'static,
        H: McpHandler + 'static,
        S: Future<Output = ()>,
    {
        let token = self.shutdown.clone();
        let mut task = tokio::spawn(async move { transport.serve(handler, token).await });
        self.set(LifecycleState::Running);

        let finished = tokio::select! {
            _ = stop => None,
            res = &mut task => Some(res),
        };
        self.set(LifecycleState::Draining);
        self.shutdown.cancel();

        let outcome = match finished {
            Some(res) => match res {
                Ok(Ok(())) => {
                    info!("Transport finished");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Transport failed");
                    Err(e.context("transport failed"))
                }
                Err(e) => Err(anyhow!("transport task aborted: {e}")),
            },
            None => {
                match tokio::time::timeout(self.grace, &mut task).await {
                    Ok(Ok(Ok(()))) => info!("Drained cleanly"),
                    Ok(Ok(Err(e))) => warn!(error = %e, "Transport error while draining"),
                    Ok(Err(e)) => warn!(error = %e, "Transport task aborted while draining"),
                    Err(_) => {
                        warn!(
                            grace = ?self.grace,
                            "Grace period elapsed, abandoning in-flight work"
                        );
                        task.abort();
                    }
                }
                Ok(())
            }
        };

        self.set(LifecycleState::Stopped);
        outcome
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_GRACE)
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
///
/// Handlers are installed when this is called, not when the future is first
/// polled, so a signal arriving right after startup is never lost.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    use signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());
    async move {
        tokio::select! {
            _ = recv_signal(interrupt, "interrupt") => {
                info!("Received Ctrl+C, shutting down...");
            },
            _ = recv_signal(terminate, "terminate") => {
                info!("Received terminate signal, shutting down...");
            },
        }
    }
}

#[cfg(unix)]
async fn recv_signal(installed: std::io::Result<signal::unix::Signal>, name: &str) {
    match installed {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            error!(error = %e, signal = name, "Failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves on Ctrl+C
#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{McpRequest, McpResponse};
    use LifecycleState::*;

    struct Idle;

    #[async_trait::async_trait]
    impl McpHandler for Idle {
        async fn handle_request(
            &self,
            _request: McpRequest,
            _ctx: CancellationToken,
        ) -> Option<McpResponse> {
            None
        }
    }

    /// Waits for shutdown, then lingers for `linger`
    struct Lingering {
        linger: Duration,
    }

    #[async_trait::async_trait]
    impl Transport for Lingering {
        async fn serve<H: McpHandler + 'static>(
            self,
            _handler: Arc<H>,
            shutdown: CancellationToken,
        ) -> Result<()> {
            shutdown.cancelled().await;
            tokio::time::sleep(self.linger).await;
            Ok(())
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Transport for Failing {
        async fn serve<H: McpHandler + 'static>(
            self,
            _handler: Arc<H>,
            _shutdown: CancellationToken,
        ) -> Result<()> {
            Err(anyhow!("bind failed"))
        }
    }

    /// Returns as soon as it starts, like stdio on an empty input
    struct Finished;

    #[async_trait::async_trait]
    impl Transport for Finished {
        async fn serve<H: McpHandler + 'static>(
            self,
            _handler: Arc<H>,
            _shutdown: CancellationToken,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_signal_drains_and_stops() {
        let lifecycle = Lifecycle::new(Duration::from_secs(1));
        let token = lifecycle.shutdown_token();
        let transport = Lingering {
            linger: Duration::from_millis(10),
        };
        lifecycle
            .run(transport, Arc::new(Idle), async {})
            .await
            .unwrap();
        assert!(token.is_cancelled());
        assert_eq!(lifecycle.transitions(), [Starting, Running, Draining, Stopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_is_bounded() {
        let lifecycle = Lifecycle::new(Duration::from_millis(50));
        let transport = Lingering {
            linger: Duration::from_secs(3600),
        };
        lifecycle
            .run(transport, Arc::new(Idle), async {})
            .await
            .unwrap();
        assert_eq!(lifecycle.state(), Stopped);
    }

    #[tokio::test]
    async fn test_transport_end_still_drains() {
        let lifecycle = Lifecycle::default();
        let token = lifecycle.shutdown_token();
        lifecycle
            .run(Finished, Arc::new(Idle), std::future::pending())
            .await
            .unwrap();
        assert!(token.is_cancelled());
        assert_eq!(lifecycle.transitions(), [Starting, Running, Draining, Stopped]);
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let lifecycle = Lifecycle::default();
        let err = lifecycle
            .run(Failing, Arc::new(Idle), std::future::pending())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("bind failed"));
        assert_eq!(lifecycle.transitions(), [Starting, Running, Draining, Stopped]);
    }
}
