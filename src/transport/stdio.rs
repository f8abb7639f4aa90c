// SPDX-License-Identifier: MIT

//! Subprocess transport: spawns the `serve` subcommand and speaks the
//! newline-delimited JSON protocol over its stdin/stdout. The child's
//! stderr is inherited so its logs land next to the client's.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;

use crate::config::{HANDSHAKE_TIMEOUT, SHUTDOWN_GRACE};
use crate::error::StocklineError;
use crate::tools::ToolInvocation;
use crate::transport::Transport;
use crate::wire::{Reply, Request};

#[derive(Debug)]
pub struct StdioTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    closed: bool,
}

impl StdioTransport {
    /// Spawns the tool server and waits for its ready line.
    pub async fn spawn(server_exe: &Path, args: &[String]) -> Result<Self, StocklineError> {
        log::info!(
            "starting tool server: {} {}",
            server_exe.display(),
            args.join(" ")
        );

        let mut child = Command::new(server_exe)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                StocklineError::transport(format!("failed to start the tool server: {}", err))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StocklineError::transport("tool server stdin was not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StocklineError::transport("tool server stdout was not piped"))?;

        let mut transport = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            closed: false,
        };

        let ready = timeout(HANDSHAKE_TIMEOUT, transport.read_reply())
            .await
            .map_err(|_| {
                StocklineError::transport("timed out waiting for the server's ready line")
            })??;
        match ready {
            Reply::Ready { version } => {
                log::info!("tool server ready (protocol {})", version);
                Ok(transport)
            }
            other => Err(StocklineError::transport(format!(
                "expected a ready line, got {:?}",
                other
            ))),
        }
    }

    async fn write_request(&mut self, request: &Request) -> Result<(), StocklineError> {
        let mut payload = serde_json::to_vec(request)?;
        payload.push(b'\n');
        self.stdin.write_all(&payload).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply, StocklineError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(StocklineError::transport(
                    "tool server closed its output stream",
                ));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed).map_err(|err| {
                StocklineError::transport(format!(
                    "unparsable server line '{}': {}",
                    trimmed, err
                ))
            });
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, invocation: &ToolInvocation) -> Result<Value, StocklineError> {
        let request = Request::invoke(invocation);
        let request_id = request.id().to_string();
        self.write_request(&request).await?;

        match self.read_reply().await? {
            Reply::Response { id, result, error } => {
                if id.as_deref() != Some(request_id.as_str()) {
                    return Err(StocklineError::transport(format!(
                        "response id {:?} does not match request id {}",
                        id, request_id
                    )));
                }
                if let Some(error) = error {
                    return Err(error.into_error());
                }
                result.ok_or_else(|| {
                    StocklineError::transport("response carried neither result nor error")
                })
            }
            Reply::Ready { .. } => Err(StocklineError::transport(
                "unexpected ready line mid-session",
            )),
        }
    }

    async fn shutdown(&mut self) -> Result<(), StocklineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.write_request(&Request::shutdown()).await.is_ok() {
            // The ack is best effort; the grace timeout below decides
            let _ = timeout(SHUTDOWN_GRACE, self.read_reply()).await;
        }

        match timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(status) => {
                log::info!("tool server exited ({})", status?);
            }
            Err(_) => {
                log::warn!("tool server did not exit in time; killing it");
                self.child.start_kill().ok();
            }
        }
        Ok(())
    }
}
