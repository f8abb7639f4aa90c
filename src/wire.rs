// SPDX-License-Identifier: MIT

//! Newline-delimited JSON protocol spoken between the client and the tool
//! server: one JSON object per line, tagged by `type`.
//!
//! The server opens with a `ready` line, then answers every request with a
//! `response` carrying the request's id. Failures travel as structured
//! `{kind, message}` objects inside the response, never as broken framing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::StocklineError;
use crate::tools::ToolInvocation;

pub const PROTOCOL_VERSION: &str = "1.0";

/// Client to server messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Invoke {
        id: String,
        tool: String,
        arguments: BTreeMap<String, String>,
    },
    Shutdown {
        id: String,
    },
}

impl Request {
    /// Wraps an invocation with a fresh request id.
    pub fn invoke(invocation: &ToolInvocation) -> Self {
        Request::Invoke {
            id: Uuid::new_v4().to_string(),
            tool: invocation.tool.clone(),
            arguments: invocation.arguments.clone(),
        }
    }

    pub fn shutdown() -> Self {
        Request::Shutdown {
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Request::Invoke { id, .. } | Request::Shutdown { id } => id,
        }
    }
}

/// Server to client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Ready {
        version: String,
    },
    Response {
        /// Echoes the request id; absent only when the request had none.
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
}

impl Reply {
    pub fn ready() -> Self {
        Reply::Ready {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Reply::Response {
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    pub fn fail(id: Option<String>, error: WireError) -> Self {
        Reply::Response {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Serialized error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: String,
    pub message: String,
}

impl WireError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Rebuilds a client-side error that keeps the remote kind.
    pub fn into_error(self) -> StocklineError {
        StocklineError::Remote {
            kind: self.kind,
            message: self.message,
        }
    }
}

impl From<&StocklineError> for WireError {
    fn from(err: &StocklineError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
