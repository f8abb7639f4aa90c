// SPDX-License-Identifier: MIT

//! Offline price cache backed by a small CSV file.
//!
//! The file is read once at startup and the in-memory table never changes
//! afterwards. Rows that fail to parse are skipped with a warning so one bad
//! line does not take the whole fixture down. A missing or headerless file
//! is fatal: the cache is the last fallback and has nothing behind it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::StocklineError;

/// One row of the offline data file.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineCacheEntry {
    pub symbol: String,
    pub price: f64,
    pub last_updated: String,
}

#[derive(Debug, Default)]
pub struct OfflineCache {
    entries: HashMap<String, OfflineCacheEntry>,
}

impl OfflineCache {
    /// Reads and parses the data file.
    pub fn load(path: &Path) -> Result<Self, StocklineError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            StocklineError::MalformedData(format!(
                "offline data file '{}' could not be read: {}",
                path.display(),
                err
            ))
        })?;
        let cache = Self::parse(&raw)?;
        log::info!(
            "loaded {} offline price entries from {}",
            cache.len(),
            path.display()
        );
        Ok(cache)
    }

    /// Parses CSV text with a `symbol,price,last_updated` header.
    pub fn parse(raw: &str) -> Result<Self, StocklineError> {
        let mut lines = raw.lines();

        let header = lines.next().unwrap_or("").trim();
        let columns: Vec<String> = header
            .split(',')
            .map(|col| col.trim().to_ascii_lowercase())
            .collect();
        if columns.len() < 3 || columns[0] != "symbol" || columns[1] != "price" {
            return Err(StocklineError::MalformedData(format!(
                "expected a 'symbol,price,last_updated' header, found '{}'",
                header
            )));
        }

        let mut entries = HashMap::new();
        for (index, line) in lines.enumerate() {
            let line_no = index + 2; // the header is line 1
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 3 {
                log::warn!(
                    "skipping offline data line {}: expected 3 columns, found {}",
                    line_no,
                    fields.len()
                );
                continue;
            }

            let symbol = fields[0].to_ascii_uppercase();
            if symbol.is_empty() {
                log::warn!("skipping offline data line {}: empty symbol", line_no);
                continue;
            }

            let price: f64 = match fields[1].parse() {
                Ok(price) => price,
                Err(_) => {
                    log::warn!(
                        "skipping offline data line {}: price '{}' is not a number",
                        line_no,
                        fields[1]
                    );
                    continue;
                }
            };
            if !price.is_finite() || price < 0.0 {
                log::warn!(
                    "skipping offline data line {}: {} is not a usable price",
                    line_no,
                    price
                );
                continue;
            }

            if entries.contains_key(&symbol) {
                log::warn!(
                    "offline data line {}: duplicate symbol {}, keeping the later row",
                    line_no,
                    symbol
                );
            }
            entries.insert(
                symbol.clone(),
                OfflineCacheEntry {
                    symbol,
                    price,
                    last_updated: fields[2].to_string(),
                },
            );
        }

        if entries.is_empty() {
            log::warn!("offline data file contained no usable rows");
        }
        Ok(Self { entries })
    }

    /// Exact, case-insensitive lookup.
    pub fn lookup(&self, symbol: &str) -> Option<&OfflineCacheEntry> {
        self.entries.get(&symbol.trim().to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
