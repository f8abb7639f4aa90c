// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! Everything tunable lives in [`Settings`], filled once from the
//! environment at startup and handed to the pieces that need it. Command
//! line flags override on top; no module reads env vars on its own.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Deadline for one AI classification round trip.
pub const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for one live quote lookup.
pub const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the client waits for the tool server's ready line.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a shutdown is given before the server child is killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub const DEFAULT_DEEPSEEK_URL: &str = "https://api.deepseek.com/chat/completions";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";
pub const DEFAULT_DATA_FILE: &str = "stocks_data.csv";

/// Assistant settings, sourced from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Deepseek API key. `None` (unset or blank) disables AI routing and the
    /// keyword heuristic handles everything.
    pub deepseek_key: Option<String>,
    pub deepseek_url: String,
    pub deepseek_model: String,
    /// Offline price cache location.
    pub data_file: PathBuf,
    /// Dispatch tools in-process instead of spawning the stdio server.
    pub in_process: bool,
    /// Skip live lookups entirely and answer from the offline cache.
    pub offline: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            deepseek_key: env::var("DEEPSEEK_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            deepseek_url: env::var("DEEPSEEK_API_URL")
                .unwrap_or_else(|_| DEFAULT_DEEPSEEK_URL.to_string()),
            deepseek_model: env::var("DEEPSEEK_MODEL")
                .unwrap_or_else(|_| DEFAULT_DEEPSEEK_MODEL.to_string()),
            data_file: env::var("STOCKS_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_FILE)),
            in_process: flag_set("STOCKLINE_IN_PROCESS"),
            offline: flag_set("STOCKLINE_OFFLINE"),
        }
    }
}

fn flag_set(name: &str) -> bool {
    env::var(name)
        .map(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("1")
                || value.eq_ignore_ascii_case("true")
                || value.eq_ignore_ascii_case("yes")
        })
        .unwrap_or(false)
}
