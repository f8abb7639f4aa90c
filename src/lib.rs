// SPDX-License-Identifier: MIT

//! stockline-rs: a small stock query assistant.
//!
//! One natural-language prompt becomes one tool call. A router maps the
//! prompt to either `get_stock_price` or `compare_stocks`, using a Deepseek
//! classifier when a key is configured and a keyword heuristic otherwise.
//! Prices resolve live-first with an offline CSV cache behind them, and the
//! client talks to the tool server over newline-delimited JSON on stdio (or
//! dispatches in-process, behind the same transport trait).

pub mod config;
pub mod error;
pub mod market;
pub mod repl;
pub mod router;
pub mod server;
pub mod tools;
pub mod transport;
pub mod wire;

pub use error::{Result, StocklineError};
