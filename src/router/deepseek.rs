// SPDX-License-Identifier: MIT

//! Deepseek-backed classification.
//!
//! One chat-completions call in JSON-object mode, asking the model to name
//! a tool and its arguments. Anything that goes wrong is a [`ClassifyError`]
//! and the router falls through to the keyword heuristic.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::ClassifyError;
use crate::router::RouterBackend;
use crate::tools::{ToolDescriptor, ToolInvocation};

pub struct DeepseekBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl DeepseekBackend {
    pub fn new(
        api_key: String,
        endpoint: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }
}

#[async_trait]
impl RouterBackend for DeepseekBackend {
    async fn classify(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolInvocation, ClassifyError> {
        let body = json!({
            "model": self.model,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system_prompt(tools)},
                {"role": "user", "content": prompt},
            ],
        });

        log::debug!("classification request to {}", self.endpoint);

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = resp.json().await?;
        log::debug!("classification reply: {}", reply);

        let content = reply
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| ClassifyError::Unusable("reply had no message content".to_string()))?;

        parse_classification(content, tools)
    }
}

/// System prompt describing the tool catalog to the model.
fn system_prompt(tools: &[ToolDescriptor]) -> String {
    let catalog = tools
        .iter()
        .map(|tool| {
            format!(
                "- {}: {}\n  arguments schema: {}",
                tool.name, tool.description, tool.schema
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a routing assistant for a stock data toolset. Map the user's prompt to \
         exactly one of the tools below. Reply with a JSON object with two keys: \
         \"tool\" (string) and \"arguments\" (object mapping argument names to string \
         values). Ticker symbols must be uppercase.\n\nTools:\n{}",
        catalog
    )
}

/// Turns the model's JSON content into an invocation of a cataloged tool.
/// Unknown tools, missing arguments, and non-scalar argument values are all
/// rejected here so dispatch never sees a half-made invocation.
fn parse_classification(
    content: &str,
    tools: &[ToolDescriptor],
) -> Result<ToolInvocation, ClassifyError> {
    let parsed: Value = serde_json::from_str(content.trim())
        .map_err(|err| ClassifyError::Unusable(format!("content was not JSON: {}", err)))?;

    let tool_name = parsed
        .get("tool")
        .and_then(Value::as_str)
        .ok_or_else(|| ClassifyError::Unusable("missing 'tool' key".to_string()))?;

    let descriptor = tools
        .iter()
        .find(|tool| tool.name == tool_name)
        .ok_or_else(|| {
            ClassifyError::Unusable(format!("'{}' is not a cataloged tool", tool_name))
        })?;

    let raw_args = parsed
        .get("arguments")
        .and_then(Value::as_object)
        .ok_or_else(|| ClassifyError::Unusable("missing 'arguments' object".to_string()))?;

    let mut arguments = BTreeMap::new();
    for (key, value) in raw_args {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ClassifyError::Unusable(format!(
                    "argument '{}' had non-scalar value {}",
                    key, other
                )));
            }
        };
        arguments.insert(key.clone(), value);
    }

    let required: Vec<&str> = descriptor
        .schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    for field in required {
        let missing = arguments
            .get(field)
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ClassifyError::Unusable(format!(
                "required argument '{}' not provided",
                field
            )));
        }
    }

    Ok(ToolInvocation {
        tool: tool_name.to_string(),
        arguments,
    })
}
