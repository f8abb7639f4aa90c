// SPDX-License-Identifier: MIT

//! In-process transport: no child process, no framing, dispatch straight
//! into a local registry. Same contract as the stdio transport, so the
//! session loop cannot tell them apart.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StocklineError;
use crate::tools::{ToolInvocation, ToolRegistry};
use crate::transport::Transport;

pub struct InProcessTransport {
    registry: ToolRegistry,
}

impl InProcessTransport {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&mut self, invocation: &ToolInvocation) -> Result<Value, StocklineError> {
        self.registry.dispatch(invocation).await
    }

    async fn shutdown(&mut self) -> Result<(), StocklineError> {
        Ok(())
    }
}
