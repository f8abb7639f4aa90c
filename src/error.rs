// SPDX-License-Identifier: MIT

//! Typed error handling for stockline-rs
//!
//! One top-level enum covers every failure the assistant can surface, with
//! smaller enums for the two soft-failure domains (routing and live quotes)
//! whose errors are recovered from rather than reported.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StocklineError>;

/// Top-level error type for stockline-rs
#[derive(Debug, Error)]
pub enum StocklineError {
    /// A tool argument was missing, empty, or otherwise unusable
    #[error("invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    /// Tool not found during dispatch
    #[error("tool '{name}' is not registered")]
    UnknownTool { name: String },

    /// No price available from the live source or the offline cache
    #[error("no price found for '{symbol}'; check the ticker or add it to the offline data file")]
    SymbolNotFound { symbol: String },

    /// A registered tool failed while running
    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: Box<StocklineError>,
    },

    /// The offline data file could not be used at all
    #[error("malformed offline data: {0}")]
    MalformedData(String),

    /// Framing or process trouble between client and tool server
    #[error("transport error: {0}")]
    Transport(String),

    /// The prompt could not be mapped to any tool
    #[error(transparent)]
    Unroutable(#[from] RouteError),

    /// An error reported by the remote tool server, rebuilt client-side
    #[error("{message}")]
    Remote { kind: String, message: String },

    /// Configuration errors (bad env vars, client construction)
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Reasons a prompt stays unrouted. These render as plain sentences in the
/// session loop and never terminate it.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Empty or whitespace-only prompt
    #[error("the query is empty")]
    EmptyPrompt,

    /// A comparison was asked for but two symbols were not found
    #[error("a comparison needs two ticker symbols, and two were not found in the query")]
    MissingComparisonSymbols,

    /// Nothing in the prompt looked like a ticker or a known company
    #[error("no ticker symbol or known company name was found in the query")]
    NoSymbols,
}

/// Failures of the AI classification backend. All of them are soft: the
/// router logs the error and falls through to the keyword heuristic.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Request never completed (network, timeout)
    #[error("classification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the endpoint
    #[error("classification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The reply arrived but could not be turned into a valid invocation
    #[error("classification reply was unusable: {0}")]
    Unusable(String),
}

/// Failures of the live quote source. Also soft: any of these sends the
/// resolver to the offline cache.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Request never completed (network, timeout)
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the endpoint
    #[error("quote endpoint returned status {0}")]
    Status(u16),

    /// Payload arrived but carried no usable price
    #[error("unusable quote payload: {0}")]
    Malformed(String),
}

impl StocklineError {
    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unknown tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a symbol not found error
    pub fn symbol_not_found(symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            symbol: symbol.into(),
        }
    }

    /// Wrap a tool handler failure
    pub fn tool_execution(tool: impl Into<String>, source: StocklineError) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            source: Box::new(source),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Stable machine-readable tag, used as the `kind` field when the error
    /// crosses the wire.
    pub fn kind(&self) -> &str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::SymbolNotFound { .. } => "symbol_not_found",
            Self::ToolExecution { .. } => "tool_execution",
            Self::MalformedData(_) => "malformed_data",
            Self::Transport(_) => "transport",
            Self::Unroutable(_) => "unroutable",
            Self::Remote { kind, .. } => kind,
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "serialization",
            Self::Http(_) => "http",
        }
    }
}
