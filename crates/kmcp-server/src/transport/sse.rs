//! SSE Transport
//!
//! `GET {base}/sse` opens a session and announces where to POST with an
//! `endpoint` event. `POST {base}/message?sessionId=..` is answered with
//! `202 Accepted`; the JSON-RPC response follows as a `message` event on
//! the session's stream.

use super::{dispatch, McpHandler, Transport, TransportError};
use crate::protocol::{parse_message, McpResponse};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const DEFAULT_ADDR: &str = "localhost:1234";
pub const DEFAULT_BASE_PATH: &str = "/mcp";
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

const SESSION_QUEUE: usize = 32;

/// HTTP + Server-Sent Events transport
pub struct SseTransport {
    bind_addr: String,
    base_path: String,
    keep_alive: Duration,
}

impl SseTransport {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }
}

impl Default for SseTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn serve<H: McpHandler + 'static>(
        self,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        info!(addr = %self.bind_addr, base_path = %self.base_path, "Starting SSE transport");

        let tracker = TaskTracker::new();
        let app = build_router(
            handler,
            &self.base_path,
            self.keep_alive,
            shutdown.clone(),
            tracker.clone(),
        );

        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.bind_addr))?;
        info!(addr = %self.bind_addr, "SSE transport listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .context("SSE server failed")?;

        tracker.close();
        tracker.wait().await;
        info!("SSE transport shut down");
        Ok(())
    }
}

/// Live sessions, keyed by id
#[derive(Default)]
struct Sessions {
    inner: Mutex<HashMap<Uuid, mpsc::Sender<Event>>>,
}

impl Sessions {
    fn insert(&self, id: Uuid, tx: mpsc::Sender<Event>) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
    }

    fn get(&self, id: &Uuid) -> Option<mpsc::Sender<Event>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn remove(&self, id: &Uuid) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Removes the session when its event stream is dropped
struct SessionGuard {
    id: Uuid,
    sessions: Arc<Sessions>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        info!(session = %self.id, "SSE session closed");
    }
}

struct SseState<H> {
    handler: Arc<H>,
    sessions: Arc<Sessions>,
    base_path: String,
    keep_alive: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// `""` and `"/"` mean root; otherwise a leading slash and no trailing one
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// The SSE application, without binding a socket
pub fn router<H: McpHandler + 'static>(
    handler: Arc<H>,
    base_path: &str,
    keep_alive: Duration,
    shutdown: CancellationToken,
) -> Router {
    build_router(handler, base_path, keep_alive, shutdown, TaskTracker::new())
}

fn build_router<H: McpHandler + 'static>(
    handler: Arc<H>,
    base_path: &str,
    keep_alive: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) -> Router {
    let base_path = normalize_base_path(base_path);
    let state = Arc::new(SseState {
        handler,
        sessions: Arc::new(Sessions::default()),
        base_path: base_path.clone(),
        keep_alive,
        shutdown,
        tracker,
    });

    Router::new()
        .route(&format!("{base_path}/sse"), get(sse_handler::<H>))
        .route(&format!("{base_path}/message"), post(message_handler::<H>))
        .route("/health", get(health_handler::<H>))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// === Handlers ===

async fn health_handler<H: McpHandler>(
    State(state): State<Arc<SseState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": crate::SERVER_NAME,
        "version": crate::SERVER_VERSION,
        "sessions": state.sessions.len()
    }))
}

async fn sse_handler<H: McpHandler + 'static>(
    State(state): State<Arc<SseState<H>>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Event>(SESSION_QUEUE);
    state.sessions.insert(id, tx);
    info!(session = %id, "SSE session opened");

    let endpoint = format!("{}/message?sessionId={}", state.base_path, id);
    let guard = SessionGuard {
        id,
        sessions: state.sessions.clone(),
    };

    let events = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));
        while let Some(event) = rx.recv().await {
            yield Ok(event);
        }
    };

    Sse::new(events.take_until(state.shutdown.clone().cancelled_owned()))
        .keep_alive(KeepAlive::new().interval(state.keep_alive))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = self.to_string();
        match self {
            TransportError::MalformedMessage(response) => {
                (StatusCode::BAD_REQUEST, Json(response)).into_response()
            }
            TransportError::UnknownSession(_) | TransportError::SessionClosed(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": message, "kind": kind })),
            )
                .into_response(),
        }
    }
}

async fn message_handler<H: McpHandler + 'static>(
    State(state): State<Arc<SseState<H>>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Result<StatusCode, TransportError> {
    let session = Uuid::parse_str(&query.session_id)
        .ok()
        .and_then(|id| state.sessions.get(&id).map(|tx| (id, tx)));
    let Some((id, tx)) = session else {
        return Err(TransportError::UnknownSession(query.session_id));
    };
    if tx.is_closed() {
        return Err(TransportError::SessionClosed(id.to_string()));
    }

    let request = parse_message(&body).map_err(TransportError::MalformedMessage)?;
    debug!(session = %id, method = %request.method, "SSE message received");

    let handler = state.handler.clone();
    let ctx = state.shutdown.child_token();
    state.tracker.spawn(async move {
        let Some(response) = dispatch(handler.as_ref(), request, ctx).await else {
            return;
        };
        if let Err(e) = push(&tx, &response).await {
            debug!(session = %id, error = %e, "Response dropped");
        }
    });

    Ok(StatusCode::ACCEPTED)
}

async fn push(tx: &mpsc::Sender<Event>, response: &McpResponse) -> Result<()> {
    let event = Event::default()
        .event("message")
        .json_data(response)
        .map_err(|e| {
            error!(error = %e, "Failed to encode response");
            anyhow::anyhow!("failed to encode response: {e}")
        })?;
    tx.send(event)
        .await
        .map_err(|_| anyhow::anyhow!("session closed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/mcp"), "/mcp");
        assert_eq!(normalize_base_path("mcp/"), "/mcp");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[test]
    fn test_sessions_remove_on_guard_drop() {
        let sessions = Arc::new(Sessions::default());
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        sessions.insert(id, tx);
        assert_eq!(sessions.len(), 1);

        drop(SessionGuard {
            id,
            sessions: sessions.clone(),
        });
        assert_eq!(sessions.len(), 0);
        assert!(sessions.get(&id).is_none());
    }
}
