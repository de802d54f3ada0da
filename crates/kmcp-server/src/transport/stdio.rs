//! Stdio Transport
//!
//! Standard MCP transport over stdin/stdout. Each request runs on its own
//! task, so responses may be written out of order; ids tie them back.
//!
//! Stdin is read on a plain OS thread, so runtime shutdown never waits on a
//! pending read while the client holds stdin open.

use super::{dispatch, McpHandler, Transport};
use crate::protocol::{parse_message, JsonRpcError, McpResponse};
use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const RESPONSE_QUEUE: usize = 64;
const STDIN_QUEUE: usize = 16;
const STDIN_CHUNK: usize = 8 * 1024;

/// Stdio transport - reads JSON-RPC from stdin, writes to stdout
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn serve<H: McpHandler + 'static>(
        self,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let input = stdin_reader().context("failed to start stdin reader")?;
        info!("Starting MCP stdio transport");
        serve_stream(input, tokio::io::stdout(), handler, shutdown).await
    }
}

/// Stdin as an async reader fed by a dedicated thread.
///
/// The thread is never joined. It ends on EOF, on a read error, or once the
/// reader side is dropped and its next chunk has nowhere to go.
fn stdin_reader() -> std::io::Result<impl AsyncRead + Unpin + Send> {
    let (tx, rx) = mpsc::channel::<std::io::Result<Cursor<Vec<u8>>>>(STDIN_QUEUE);

    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut chunk = vec![0u8; STDIN_CHUNK];
            loop {
                let read = match stdin.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => Ok(Cursor::new(chunk[..n].to_vec())),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => Err(e),
                };
                let failed = read.is_err();
                if tx.blocking_send(read).is_err() || failed {
                    break;
                }
            }
        })?;

    let chunks = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    Ok(StreamReader::new(Box::pin(chunks)))
}

/// Serve newline-delimited JSON-RPC over any reader/writer pair.
///
/// Returns once the input hits EOF (or `shutdown` fires) and every request
/// already accepted has been answered.
pub async fn serve_stream<R, W, H>(
    reader: R,
    writer: W,
    handler: Arc<H>,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
    H: McpHandler + 'static,
{
    let (tx, rx) = mpsc::channel::<McpResponse>(RESPONSE_QUEUE);
    let writer_task = tokio::spawn(write_responses(writer, rx));
    let tracker = TaskTracker::new();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    let outcome = loop {
        buf.clear();
        let read = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer reading input");
                break Ok(());
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                info!("Input closed");
                break Ok(());
            }
            Ok(_) => {}
            Err(e) => break Err(anyhow::Error::new(e).context("failed to read from input")),
        }

        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                let line = line.trim();
                debug!(request = %line, "Received request");
                parse_message(line)
            }
            Err(_) => Err(McpResponse::error(
                None,
                JsonRpcError::parse_error("message is not valid UTF-8"),
            )),
        };

        match parsed {
            Ok(request) => {
                let handler = handler.clone();
                let tx = tx.clone();
                let ctx = shutdown.child_token();
                tracker.spawn(async move {
                    if let Some(response) = dispatch(handler.as_ref(), request, ctx).await {
                        if tx.send(response).await.is_err() {
                            debug!("Output closed before response was written");
                        }
                    }
                });
            }
            Err(response) => {
                warn!("Rejected malformed message");
                if tx.send(response).await.is_err() {
                    break Ok(());
                }
            }
        }
    };

    // accepted requests are answered even when the input failed
    tracker.close();
    tracker.wait().await;
    drop(tx);

    writer_task.await.context("response writer task failed")??;
    info!("Stdio transport shutting down");
    outcome
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<McpResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = serde_json::to_string(&response)?;
        debug!(response = %response_json, "Sending response");

        writer
            .write_all(response_json.as_bytes())
            .await
            .context("failed to write response")?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
