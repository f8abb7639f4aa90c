// SPDX-License-Identifier: MIT

//! Tool registry and dispatch.
//!
//! Dispatch validates arguments against the tool's schema before the handler
//! runs, so handlers only ever see complete input. Handler failures come back
//! wrapped in [`StocklineError::ToolExecution`] naming the tool; validation
//! failures come back unwrapped since the handler never ran.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::StocklineError;
use crate::tools::{Tool, ToolDescriptor, ToolInvocation};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name().to_string(), tool);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// Metadata for every registered tool, sorted by name.
    pub async fn descriptors(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().await;
        let mut out: Vec<ToolDescriptor> = tools
            .values()
            .map(|tool| ToolDescriptor::new(tool.name(), tool.description(), tool.schema()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Validates and runs one invocation.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> Result<Value, StocklineError> {
        let tool = self.get(&invocation.tool).await.ok_or_else(|| {
            log::error!("dispatch asked for unknown tool '{}'", invocation.tool);
            StocklineError::unknown_tool(&invocation.tool)
        })?;

        validate_arguments(tool.schema(), invocation)?;

        let input = serde_json::to_value(&invocation.arguments)?;
        log::info!("dispatching {} with {}", invocation.tool, input);
        tool.execute(input)
            .await
            .map_err(|err| StocklineError::tool_execution(&invocation.tool, err))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that every schema-required argument is present and non-blank.
/// Arguments are strings by construction, so presence is the whole check.
fn validate_arguments(schema: &Value, invocation: &ToolInvocation) -> Result<(), StocklineError> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for field in required {
        match invocation.arguments.get(field) {
            Some(value) if !value.trim().is_empty() => {}
            Some(_) => {
                return Err(StocklineError::invalid_argument(field, "must not be blank"));
            }
            None => {
                return Err(StocklineError::invalid_argument(
                    field,
                    "required argument is missing",
                ));
            }
        }
    }
    Ok(())
}
