// SPDX-License-Identifier: MIT

//! Deterministic keyword routing, used when no AI backend is configured or
//! when classification fails.
//!
//! Symbol extraction is a three-step cascade and the first step that yields
//! anything wins: known tickers, then company names, then `$`-prefixed
//! tokens. Matching is case-insensitive throughout.

use crate::error::RouteError;
use crate::tools::stock::{COMPARE_STOCKS, GET_STOCK_PRICE};
use crate::tools::ToolInvocation;

/// Tickers recognized without an AI pass.
const KNOWN_TICKERS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "TSLA", "AMZN", "NVDA", "META", "IBM", "ORCL", "NFLX",
];

/// Company names mapped to tickers, matched on whole words.
const NAME_TO_TICKER: &[(&str, &str)] = &[
    ("APPLE", "AAPL"),
    ("MICROSOFT", "MSFT"),
    ("TESLA", "TSLA"),
    ("AMAZON", "AMZN"),
    ("GOOGLE", "GOOGL"),
    ("ALPHABET", "GOOGL"),
    ("META", "META"),
    ("FACEBOOK", "META"),
    ("NVIDIA", "NVDA"),
    ("IBM", "IBM"),
    ("ORACLE", "ORCL"),
    ("NETFLIX", "NFLX"),
];

const COMPARISON_KEYWORDS: &[&str] = &["compare", "vs", "versus"];

/// Routes a prompt by symbol count: two or more candidates compare, exactly
/// one is a single lookup, and a comparison keyword without two candidates
/// is unroutable rather than a guess.
pub fn route(prompt: &str) -> Result<ToolInvocation, RouteError> {
    let symbols = extract_symbols(prompt);
    log::debug!("heuristic candidates for '{}': {:?}", prompt, symbols);

    if symbols.len() >= 2 {
        return Ok(ToolInvocation::new(COMPARE_STOCKS)
            .with_arg("symbol_one", symbols[0].as_str())
            .with_arg("symbol_two", symbols[1].as_str()));
    }
    if has_comparison_keyword(prompt) {
        return Err(RouteError::MissingComparisonSymbols);
    }
    match symbols.first() {
        Some(symbol) => {
            Ok(ToolInvocation::new(GET_STOCK_PRICE).with_arg("symbol", symbol.as_str()))
        }
        None => Err(RouteError::NoSymbols),
    }
}

/// Candidate tickers in prompt order.
pub fn extract_symbols(prompt: &str) -> Vec<String> {
    let words = words(prompt);

    let direct: Vec<String> = words
        .iter()
        .filter(|word| word.len() <= 5 && KNOWN_TICKERS.contains(&word.as_str()))
        .cloned()
        .collect();
    if !direct.is_empty() {
        return direct;
    }

    let mut named: Vec<String> = Vec::new();
    for word in &words {
        if let Some((_, ticker)) = NAME_TO_TICKER.iter().find(|(name, _)| name == word) {
            // Two aliases of the same company stay one candidate
            if !named.iter().any(|t| t == ticker) {
                named.push((*ticker).to_string());
            }
        }
    }
    if !named.is_empty() {
        return named;
    }

    dollar_symbols(prompt)
}

/// Uppercased alphabetic words of the prompt.
fn words(prompt: &str) -> Vec<String> {
    prompt
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_uppercase())
        .collect()
}

/// `$`-prefixed tickers, e.g. `$tsla`, up to five letters each.
fn dollar_symbols(prompt: &str) -> Vec<String> {
    prompt
        .split('$')
        .skip(1)
        .filter_map(|after| {
            let ticker: String = after
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .take(5)
                .collect();
            if ticker.is_empty() {
                None
            } else {
                Some(ticker.to_ascii_uppercase())
            }
        })
        .collect()
}

fn has_comparison_keyword(prompt: &str) -> bool {
    prompt
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| {
            let word = word.to_ascii_lowercase();
            COMPARISON_KEYWORDS.contains(&word.as_str())
        })
}
