//! Line-delimited JSON host for the link protocol.
//!
//! Each input line is one request object; each output line is its response,
//! carrying the request's `id` field if it had one. Requests are answered
//! concurrently, so responses may come back out of order.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use maillink_core::{LinkService, Response};

#[derive(Debug, Serialize)]
struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    response: Response,
}

/// Serves requests from `input` until EOF, then waits for the ones still in
/// flight. Returns the writer.
pub async fn run<S, R, W>(service: Arc<S>, input: R, output: W) -> Result<W>
where
    S: LinkService + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Reply>();
    let writer = tokio::spawn(write_replies(rx, output));

    let mut lines = input.lines();
    let mut in_flight = JoinSet::new();
    let mut received = 0_u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        received += 1;

        let value: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                let _ = tx.send(Reply {
                    id: None,
                    response: Response::failure(format!("Invalid JSON: {e}")),
                });
                continue;
            }
        };

        let id = value.get("id").cloned();
        let service = Arc::clone(&service);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = service.resolve_value(value).await;
            let _ = tx.send(Reply { id, response });
        });
    }

    debug!(pending = in_flight.len(), "input closed, draining");
    while in_flight.join_next().await.is_some() {}
    drop(tx);

    let output = writer.await??;
    info!(requests = received, "link host stopped");
    Ok(output)
}

async fn write_replies<W>(mut rx: mpsc::UnboundedReceiver<Reply>, mut output: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let mut line = serde_json::to_vec(&reply)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(output)
}
