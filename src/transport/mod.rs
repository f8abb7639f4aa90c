// SPDX-License-Identifier: MIT

//! Transports carry one invocation to a serving registry and bring the
//! result back. Framing only; payload semantics belong to the tools.

pub mod memory;
pub mod stdio;

pub use memory::InProcessTransport;
pub use stdio::StdioTransport;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StocklineError;
use crate::tools::ToolInvocation;

#[async_trait]
pub trait Transport: Send {
    /// Sends one invocation and waits for its result.
    async fn send(&mut self, invocation: &ToolInvocation) -> Result<Value, StocklineError>;

    /// Graceful teardown. Safe to call more than once.
    async fn shutdown(&mut self) -> Result<(), StocklineError>;
}
