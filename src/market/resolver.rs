// SPDX-License-Identifier: MIT

//! Price resolution: live first, offline cache second.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StocklineError;
use crate::market::cache::OfflineCache;
use crate::market::live::LiveQuotes;

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Live,
    Cache,
}

/// A resolved price, ready to serialize into a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: String,
    pub price: f64,
    pub source: PriceSource,
    /// Observation time: RFC 3339 for live quotes, the `last_updated` column
    /// verbatim for cached ones.
    pub as_of: String,
}

pub struct PriceResolver {
    live: Option<Arc<dyn LiveQuotes>>,
    cache: OfflineCache,
}

impl PriceResolver {
    /// `live: None` puts the resolver in offline mode.
    pub fn new(live: Option<Arc<dyn LiveQuotes>>, cache: OfflineCache) -> Self {
        Self { live, cache }
    }

    /// Resolves a symbol, preferring the live source and falling back to the
    /// offline cache on any live failure.
    pub async fn resolve(&self, symbol: &str) -> Result<PriceRecord, StocklineError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(StocklineError::invalid_argument(
                "symbol",
                "must be a non-empty ticker",
            ));
        }

        if let Some(live) = &self.live {
            match live.fetch(&symbol).await {
                Ok(tick) => {
                    log::info!("live quote for {}: {:.2}", symbol, tick.price);
                    return Ok(PriceRecord {
                        symbol,
                        price: tick.price,
                        source: PriceSource::Live,
                        as_of: tick.as_of.to_rfc3339(),
                    });
                }
                Err(err) => {
                    log::warn!(
                        "live lookup for {} failed ({}); trying the offline cache",
                        symbol,
                        err
                    );
                }
            }
        } else {
            log::debug!("live lookups disabled; resolving {} offline", symbol);
        }

        match self.cache.lookup(&symbol) {
            Some(entry) => {
                log::info!("offline cache hit for {}: {:.2}", symbol, entry.price);
                Ok(PriceRecord {
                    symbol,
                    price: entry.price,
                    source: PriceSource::Cache,
                    as_of: entry.last_updated.clone(),
                })
            }
            None => Err(StocklineError::symbol_not_found(symbol)),
        }
    }
}
