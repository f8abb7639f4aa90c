// SPDX-License-Identifier: MIT

//! Stdio tool server: one JSON request per line on stdin, one response per
//! line on stdout. Diagnostics go to stderr so the protocol stream stays
//! clean. Requests are handled one at a time in arrival order.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::StocklineError;
use crate::tools::{ToolInvocation, ToolRegistry};
use crate::wire::{Reply, Request, WireError};

/// Serves the registry over this process's stdio until EOF or a shutdown
/// request.
pub async fn run(registry: ToolRegistry) -> Result<(), StocklineError> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_loop(registry, stdin, tokio::io::stdout()).await
}

/// The serving loop, generic over its streams so tests can drive it with
/// in-memory buffers.
pub async fn run_loop<R, W>(
    registry: ToolRegistry,
    mut input: R,
    mut output: W,
) -> Result<(), StocklineError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(&mut output, &Reply::ready()).await?;
    log::info!("stock tool server ready");

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).await? == 0 {
            log::info!("input stream closed; shutting down");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_request(trimmed) {
            Ok(Request::Shutdown { id }) => {
                log::info!("shutdown requested (id {})", id);
                let reply = Reply::ok(id, json!({"status": "shutting_down"}));
                write_line(&mut output, &reply).await?;
                break;
            }
            Ok(Request::Invoke {
                id,
                tool,
                arguments,
            }) => {
                let invocation = ToolInvocation { tool, arguments };
                let reply = match registry.dispatch(&invocation).await {
                    Ok(result) => Reply::ok(id, result),
                    Err(err) => {
                        log::warn!("request {} failed: {}", id, err);
                        Reply::fail(Some(id), WireError::from(&err))
                    }
                };
                write_line(&mut output, &reply).await?;
            }
            Err(reply) => {
                write_line(&mut output, &reply).await?;
            }
        }
    }

    Ok(())
}

/// Parses one request line. Bad lines map to the error response that should
/// go back instead, so the loop never dies on malformed input.
fn parse_request(line: &str) -> Result<Request, Reply> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("rejecting request line: {}", err);
            return Err(Reply::fail(
                None,
                WireError::new("invalid_request", "request was not valid JSON"),
            ));
        }
    };

    // Keep the id for the error response even when the rest is unusable
    let id = raw.get("id").and_then(Value::as_str).map(str::to_string);
    serde_json::from_value::<Request>(raw).map_err(|err| {
        log::warn!("unsupported request (id {:?}): {}", id, err);
        Reply::fail(id, WireError::new("unsupported", "unsupported message type"))
    })
}

async fn write_line<W: AsyncWrite + Unpin>(
    output: &mut W,
    reply: &Reply,
) -> Result<(), StocklineError> {
    let mut payload = serde_json::to_vec(reply)?;
    payload.push(b'\n');
    output.write_all(&payload).await?;
    output.flush().await?;
    Ok(())
}
