// SPDX-License-Identifier: MIT

//! Live quote source.
//!
//! [`YahooQuotes`] queries the public Yahoo Finance chart endpoint for the
//! latest regular-market price. Failures here are ordinary (no network,
//! rate limiting, unknown symbol) and always recoverable: the resolver
//! treats any [`QuoteError`] as the cue to fall back to the offline cache.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::QuoteError;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stockline-rs/0.1)";

/// One live price observation.
#[derive(Debug, Clone)]
pub struct LiveTick {
    pub price: f64,
    pub as_of: DateTime<Utc>,
}

/// Anything that can produce a current price for a ticker symbol.
#[async_trait]
pub trait LiveQuotes: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<LiveTick, QuoteError>;
}

pub struct YahooQuotes {
    client: Client,
}

impl YahooQuotes {
    pub fn new(timeout: Duration) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn chart_url(symbol: &str) -> Result<Url, QuoteError> {
        let mut url = Url::parse(&format!("{}{}", YAHOO_CHART_URL, symbol)).map_err(|err| {
            QuoteError::Malformed(format!("cannot build a quote url for '{}': {}", symbol, err))
        })?;
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1d");
        Ok(url)
    }
}

#[async_trait]
impl LiveQuotes for YahooQuotes {
    async fn fetch(&self, symbol: &str) -> Result<LiveTick, QuoteError> {
        let url = Self::chart_url(symbol)?;
        log::debug!("live quote request: {}", url);

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(QuoteError::Status(status.as_u16()));
        }

        let body: Value = resp.json().await?;
        tick_from_chart(&body)
    }
}

/// Pulls the regular-market price out of a chart payload.
fn tick_from_chart(body: &Value) -> Result<LiveTick, QuoteError> {
    if let Some(err) = body.pointer("/chart/error").filter(|e| !e.is_null()) {
        return Err(QuoteError::Malformed(format!("provider error: {}", err)));
    }

    let meta = body
        .pointer("/chart/result/0/meta")
        .ok_or_else(|| QuoteError::Malformed("missing chart.result[0].meta".to_string()))?;

    let price = meta
        .get("regularMarketPrice")
        .and_then(Value::as_f64)
        .filter(|price| price.is_finite() && *price >= 0.0)
        .ok_or_else(|| QuoteError::Malformed("missing regularMarketPrice".to_string()))?;

    let as_of = meta
        .get("regularMarketTime")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    Ok(LiveTick { price, as_of })
}
