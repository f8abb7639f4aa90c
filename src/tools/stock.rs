// SPDX-License-Identifier: MIT

//! The two stock tools served by the registry: a single-symbol price lookup
//! and a two-symbol comparison.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::StocklineError;
use crate::market::{PriceRecord, PriceResolver};
use crate::tools::{Tool, ToolDescriptor, ToolRegistry};

pub const GET_STOCK_PRICE: &str = "get_stock_price";
pub const COMPARE_STOCKS: &str = "compare_stocks";

// --- Static schemas ---

static GET_STOCK_PRICE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "symbol": {
                "type": "string",
                "description": "Ticker symbol to look up, e.g. AAPL"
            }
        },
        "required": ["symbol"]
    })
});

static COMPARE_STOCKS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "symbol_one": {
                "type": "string",
                "description": "First ticker symbol"
            },
            "symbol_two": {
                "type": "string",
                "description": "Second ticker symbol"
            }
        },
        "required": ["symbol_one", "symbol_two"]
    })
});

const GET_STOCK_PRICE_DESCRIPTION: &str = "Looks up the current price of one ticker symbol. \
    Uses the live market feed when reachable and the offline cache otherwise.";
const COMPARE_STOCKS_DESCRIPTION: &str = "Resolves two ticker symbols and reports whether the \
    first is trading higher than, lower than, or equal to the second.";

#[derive(Debug, Deserialize)]
struct GetStockPriceArgs {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct CompareStocksArgs {
    symbol_one: String,
    symbol_two: String,
}

/// How the first symbol's price relates to the second's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Higher,
    Lower,
    Equal,
}

impl Relation {
    fn between(one: f64, two: f64) -> Self {
        match one.total_cmp(&two) {
            std::cmp::Ordering::Greater => Relation::Higher,
            std::cmp::Ordering::Less => Relation::Lower,
            std::cmp::Ordering::Equal => Relation::Equal,
        }
    }
}

/// Result payload of `compare_stocks`: both resolved records plus the
/// relation. The client renders the sentence; the wire stays structured.
#[derive(Debug, Serialize, Deserialize)]
pub struct Comparison {
    pub symbol_one: PriceRecord,
    pub symbol_two: PriceRecord,
    pub relation: Relation,
}

pub struct GetStockPriceTool {
    resolver: Arc<PriceResolver>,
}

impl GetStockPriceTool {
    pub fn new(resolver: Arc<PriceResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Tool for GetStockPriceTool {
    fn name(&self) -> &str {
        GET_STOCK_PRICE
    }

    fn description(&self) -> &str {
        GET_STOCK_PRICE_DESCRIPTION
    }

    fn schema(&self) -> &Value {
        &GET_STOCK_PRICE_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, StocklineError> {
        let args: GetStockPriceArgs = serde_json::from_value(input)?;
        let record = self.resolver.resolve(&args.symbol).await?;
        Ok(serde_json::to_value(record)?)
    }
}

pub struct CompareStocksTool {
    resolver: Arc<PriceResolver>,
}

impl CompareStocksTool {
    pub fn new(resolver: Arc<PriceResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Tool for CompareStocksTool {
    fn name(&self) -> &str {
        COMPARE_STOCKS
    }

    fn description(&self) -> &str {
        COMPARE_STOCKS_DESCRIPTION
    }

    fn schema(&self) -> &Value {
        &COMPARE_STOCKS_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, StocklineError> {
        let args: CompareStocksArgs = serde_json::from_value(input)?;

        // Resolve both symbols concurrently; the first failure names the
        // symbol that caused it.
        let (one, two) = future::join(
            self.resolver.resolve(&args.symbol_one),
            self.resolver.resolve(&args.symbol_two),
        )
        .await;
        let one = one?;
        let two = two?;

        let relation = Relation::between(one.price, two.price);
        Ok(serde_json::to_value(Comparison {
            symbol_one: one,
            symbol_two: two,
            relation,
        })?)
    }
}

/// Registers both stock tools against a shared resolver.
pub async fn register_stock_tools(registry: &ToolRegistry, resolver: Arc<PriceResolver>) {
    registry
        .register(Arc::new(GetStockPriceTool::new(resolver.clone())))
        .await;
    registry
        .register(Arc::new(CompareStocksTool::new(resolver)))
        .await;
}

/// Tool metadata for the router, identical to what a populated registry
/// reports but without needing a resolver.
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            GET_STOCK_PRICE,
            GET_STOCK_PRICE_DESCRIPTION,
            &GET_STOCK_PRICE_SCHEMA,
        ),
        ToolDescriptor::new(
            COMPARE_STOCKS,
            COMPARE_STOCKS_DESCRIPTION,
            &COMPARE_STOCKS_SCHEMA,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{OfflineCache, PriceSource};
    use crate::tools::ToolInvocation;

    async fn registry() -> ToolRegistry {
        let cache = OfflineCache::parse(
            "symbol,price,last_updated\n\
             AAPL,188.12,2024-01-01\n\
             MSFT,405.15,2024-01-01\n\
             IBM,188.12,2024-01-01\n",
        )
        .unwrap();
        let registry = ToolRegistry::new();
        register_stock_tools(&registry, Arc::new(PriceResolver::new(None, cache))).await;
        registry
    }

    #[test]
    fn test_relation_between() {
        assert_eq!(Relation::between(2.0, 1.0), Relation::Higher);
        assert_eq!(Relation::between(1.0, 2.0), Relation::Lower);
        assert_eq!(Relation::between(1.5, 1.5), Relation::Equal);
    }

    #[test]
    fn test_relation_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(Relation::Higher).unwrap(),
            Value::String("higher".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_stock_price_from_cache() {
        let registry = registry().await;
        let invocation = ToolInvocation::new(GET_STOCK_PRICE).with_arg("symbol", "aapl");
        let result = registry.dispatch(&invocation).await.unwrap();

        let record: PriceRecord = serde_json::from_value(result).unwrap();
        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.price, 188.12);
        assert_eq!(record.source, PriceSource::Cache);
    }

    #[tokio::test]
    async fn test_compare_stocks_orders_by_invocation() {
        let registry = registry().await;
        let invocation = ToolInvocation::new(COMPARE_STOCKS)
            .with_arg("symbol_one", "AAPL")
            .with_arg("symbol_two", "MSFT");
        let result = registry.dispatch(&invocation).await.unwrap();

        let cmp: Comparison = serde_json::from_value(result).unwrap();
        assert_eq!(cmp.symbol_one.symbol, "AAPL");
        assert_eq!(cmp.symbol_two.symbol, "MSFT");
        assert_eq!(cmp.relation, Relation::Lower);
    }

    #[tokio::test]
    async fn test_compare_stocks_equal_prices() {
        let registry = registry().await;
        let invocation = ToolInvocation::new(COMPARE_STOCKS)
            .with_arg("symbol_one", "AAPL")
            .with_arg("symbol_two", "IBM");
        let result = registry.dispatch(&invocation).await.unwrap();

        let cmp: Comparison = serde_json::from_value(result).unwrap();
        assert_eq!(cmp.relation, Relation::Equal);
    }

    #[tokio::test]
    async fn test_compare_stocks_names_the_missing_symbol() {
        let registry = registry().await;
        let invocation = ToolInvocation::new(COMPARE_STOCKS)
            .with_arg("symbol_one", "AAPL")
            .with_arg("symbol_two", "ZZZZ");
        let err = registry.dispatch(&invocation).await.unwrap_err();
        assert!(err.to_string().contains("ZZZZ"));
    }

    #[test]
    fn test_descriptors_match_tool_names() {
        let descriptors = descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, GET_STOCK_PRICE);
        assert_eq!(descriptors[1].name, COMPARE_STOCKS);
        assert!(descriptors[1].schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f == "symbol_two"));
    }
}
