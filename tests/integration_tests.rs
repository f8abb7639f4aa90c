//! Integration tests for routing, resolution, and transports
//!
//! These tests verify end-to-end behavior using mock quote sources, and run
//! the stdio round trip against the real server binary.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stockline_rs::config::Settings;
use stockline_rs::error::{ClassifyError, QuoteError, RouteError, StocklineError};
use stockline_rs::market::{LiveQuotes, LiveTick, OfflineCache, PriceResolver, PriceSource};
use stockline_rs::repl::render_result;
use stockline_rs::router::{RouteOrigin, Router, RouterBackend};
use stockline_rs::tools::stock::{self, Comparison, Relation};
use stockline_rs::tools::{ToolDescriptor, ToolInvocation, ToolRegistry};
use stockline_rs::transport::{InProcessTransport, StdioTransport, Transport};

// ============================================================================
// Mock Components
// ============================================================================

/// Live source backed by a fixed price table; anything else is an error.
struct TableQuotes {
    prices: HashMap<String, f64>,
}

impl TableQuotes {
    fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(symbol, price)| (symbol.to_string(), *price))
                .collect(),
        }
    }
}

#[async_trait]
impl LiveQuotes for TableQuotes {
    async fn fetch(&self, symbol: &str) -> Result<LiveTick, QuoteError> {
        match self.prices.get(symbol) {
            Some(price) => Ok(LiveTick {
                price: *price,
                as_of: Utc::now(),
            }),
            None => Err(QuoteError::Malformed(format!("no chart data for {symbol}"))),
        }
    }
}

/// Live source that is always down, to force cache fallbacks.
struct DeadQuotes;

#[async_trait]
impl LiveQuotes for DeadQuotes {
    async fn fetch(&self, _symbol: &str) -> Result<LiveTick, QuoteError> {
        Err(QuoteError::Status(503))
    }
}

/// Classification backend that replays a scripted answer and counts calls.
struct ScriptedBackend {
    reply: Result<ToolInvocation, String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    fn answering(invocation: ToolInvocation, calls: Arc<AtomicUsize>) -> Self {
        Self {
            reply: Ok(invocation),
            calls,
        }
    }

    fn failing(message: &str, calls: Arc<AtomicUsize>) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls,
        }
    }
}

#[async_trait]
impl RouterBackend for ScriptedBackend {
    async fn classify(
        &self,
        _prompt: &str,
        _tools: &[ToolDescriptor],
    ) -> Result<ToolInvocation, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(invocation) => Ok(invocation.clone()),
            Err(message) => Err(ClassifyError::Unusable(message.clone())),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const OFFLINE_DATA: &str = "symbol,price,last_updated\n\
    AAPL,188.12,2024-01-01\n\
    MSFT,405.15,2024-01-01\n\
    TSLA,248.42,2024-01-01\n\
    IBM,188.12,2024-01-01\n";

async fn registry_with(live: Option<Arc<dyn LiveQuotes>>) -> ToolRegistry {
    let cache = OfflineCache::parse(OFFLINE_DATA).expect("fixture parses");
    let registry = ToolRegistry::new();
    let resolver = Arc::new(PriceResolver::new(live, cache));
    stock::register_stock_tools(&registry, resolver).await;
    registry
}

async fn offline_registry() -> ToolRegistry {
    registry_with(None).await
}

fn heuristic_router() -> Router {
    Router::new(None, stock::descriptors())
}

// ============================================================================
// Prompt to Answer Scenarios
// ============================================================================

#[tokio::test]
async fn test_price_question_answers_from_the_cache() {
    let router = heuristic_router();
    let registry = offline_registry().await;

    let decision = router
        .route("What's the price of AAPL?")
        .await
        .expect("routable prompt");
    assert_eq!(decision.origin, RouteOrigin::Heuristic);
    assert_eq!(decision.invocation.tool, stock::GET_STOCK_PRICE);

    let result = registry
        .dispatch(&decision.invocation)
        .await
        .expect("dispatch succeeds");
    assert_eq!(result["symbol"], "AAPL");
    assert_eq!(result["price"], 188.12);
    assert_eq!(result["source"], "cache");

    let answer = render_result(&decision.invocation, &result);
    assert_eq!(
        answer,
        "The current price of AAPL is $188.12 (offline cache, as of 2024-01-01)."
    );
}

#[tokio::test]
async fn test_comparison_question_answers_with_a_relation() {
    let router = heuristic_router();
    let registry = offline_registry().await;

    let decision = router
        .route("Compare Apple and Microsoft stocks")
        .await
        .expect("routable prompt");
    assert_eq!(decision.invocation.tool, stock::COMPARE_STOCKS);
    assert_eq!(decision.invocation.arguments["symbol_one"], "AAPL");
    assert_eq!(decision.invocation.arguments["symbol_two"], "MSFT");

    let result = registry
        .dispatch(&decision.invocation)
        .await
        .expect("dispatch succeeds");
    assert_eq!(result["relation"], "lower");

    let answer = render_result(&decision.invocation, &result);
    assert_eq!(
        answer,
        "AAPL ($188.12, offline cache) is trading lower than MSFT ($405.15, offline cache)."
    );
}

#[tokio::test]
async fn test_gibberish_prompt_is_rejected_before_dispatch() {
    let router = heuristic_router();
    let err = router
        .route("tell me a joke about the weather")
        .await
        .expect_err("nothing to route");
    assert!(matches!(err, RouteError::NoSymbols));
}

// ============================================================================
// Router Backend Scenarios
// ============================================================================

#[tokio::test]
async fn test_settings_without_a_key_disable_ai_routing() {
    let settings = Settings {
        deepseek_key: None,
        deepseek_url: "http://unused.invalid".to_string(),
        deepseek_model: "unused".to_string(),
        data_file: PathBuf::from("stocks_data.csv"),
        in_process: true,
        offline: true,
    };
    let router = Router::from_settings(&settings, stock::descriptors()).expect("router builds");
    assert!(!router.ai_enabled());

    let decision = router.route("price of TSLA").await.expect("heuristic routes");
    assert_eq!(decision.origin, RouteOrigin::Heuristic);
}

#[tokio::test]
async fn test_backend_failure_falls_back_to_the_heuristic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = ScriptedBackend::failing("model returned prose", Arc::clone(&calls));
    let router = Router::new(Some(Box::new(backend)), stock::descriptors());
    let registry = offline_registry().await;

    let decision = router
        .route("How is Tesla doing today?")
        .await
        .expect("fallback routes");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(decision.origin, RouteOrigin::Heuristic);
    assert_eq!(decision.invocation.arguments["symbol"], "TSLA");

    let result = registry
        .dispatch(&decision.invocation)
        .await
        .expect("dispatch succeeds");
    assert_eq!(result["price"], 248.42);
}

#[tokio::test]
async fn test_backend_decision_wins_over_the_heuristic() {
    // The prompt mentions two symbols, but the scripted backend insists on a
    // single-price call; the AI decision must be the one dispatched.
    let calls = Arc::new(AtomicUsize::new(0));
    let scripted = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "IBM");
    let backend = ScriptedBackend::answering(scripted.clone(), Arc::clone(&calls));
    let router = Router::new(Some(Box::new(backend)), stock::descriptors());
    let registry = offline_registry().await;

    let decision = router.route("AAPL vs MSFT").await.expect("backend routes");
    assert_eq!(decision.origin, RouteOrigin::Ai);
    assert_eq!(decision.invocation, scripted);

    let result = registry
        .dispatch(&decision.invocation)
        .await
        .expect("dispatch succeeds");
    assert_eq!(result["symbol"], "IBM");
}

#[tokio::test]
async fn test_backend_naming_an_unknown_tool_is_a_typed_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scripted = ToolInvocation::new("get_weather").with_arg("city", "Oslo");
    let backend = ScriptedBackend::answering(scripted, Arc::clone(&calls));
    let router = Router::new(Some(Box::new(backend)), stock::descriptors());
    let registry = offline_registry().await;

    let decision = router
        .route("what about the weather in AAPL town")
        .await
        .expect("backend routes");
    let err = registry
        .dispatch(&decision.invocation)
        .await
        .expect_err("unknown tool");
    assert!(matches!(err, StocklineError::UnknownTool { .. }));
    assert_eq!(err.kind(), "unknown_tool");
}

// ============================================================================
// Live-First Resolution
// ============================================================================

#[tokio::test]
async fn test_live_source_is_preferred_when_it_answers() {
    let live: Arc<dyn LiveQuotes> = Arc::new(TableQuotes::new(&[("AAPL", 190.55)]));
    let registry = registry_with(Some(live)).await;

    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "aapl");
    let result = registry.dispatch(&invocation).await.expect("dispatch succeeds");
    assert_eq!(result["price"], 190.55);
    assert_eq!(result["source"], "live");
}

#[tokio::test]
async fn test_cache_answers_when_the_live_source_is_down() {
    let live: Arc<dyn LiveQuotes> = Arc::new(DeadQuotes);
    let registry = registry_with(Some(live)).await;

    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "MSFT");
    let result = registry.dispatch(&invocation).await.expect("dispatch succeeds");
    assert_eq!(result["price"], 405.15);
    assert_eq!(result["source"], "cache");
}

#[tokio::test]
async fn test_comparison_mixes_live_and_cached_records() {
    // AAPL resolves live, MSFT only exists offline. Per-symbol fallback means
    // one comparison can carry both sources.
    let live: Arc<dyn LiveQuotes> = Arc::new(TableQuotes::new(&[("AAPL", 500.0)]));
    let registry = registry_with(Some(live)).await;

    let invocation = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "AAPL")
        .with_arg("symbol_two", "MSFT");
    let result = registry.dispatch(&invocation).await.expect("dispatch succeeds");

    let comparison: Comparison = serde_json::from_value(result).expect("comparison payload");
    assert_eq!(comparison.symbol_one.source, PriceSource::Live);
    assert_eq!(comparison.symbol_two.source, PriceSource::Cache);
    assert_eq!(comparison.relation, Relation::Higher);
}

#[tokio::test]
async fn test_unknown_symbol_fails_with_the_symbol_named() {
    let registry = offline_registry().await;
    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "ZZZZ");
    let err = registry
        .dispatch(&invocation)
        .await
        .expect_err("nowhere to resolve from");
    assert_eq!(err.kind(), "tool_execution");
    assert!(err.to_string().contains("ZZZZ"));
}

// ============================================================================
// Transports
// ============================================================================

#[tokio::test]
async fn test_in_process_transport_round_trip() {
    let registry = offline_registry().await;
    let mut transport = InProcessTransport::new(registry);

    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "IBM");
    let result = transport.send(&invocation).await.expect("send succeeds");
    assert_eq!(result["symbol"], "IBM");
    assert_eq!(result["price"], 188.12);

    transport.shutdown().await.expect("shutdown is a no-op");
}

#[tokio::test]
async fn test_in_process_transport_passes_typed_errors_through() {
    let registry = offline_registry().await;
    let mut transport = InProcessTransport::new(registry);

    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE);
    let err = transport.send(&invocation).await.expect_err("missing argument");
    assert!(matches!(err, StocklineError::InvalidArgument { .. }));
}

// ============================================================================
// Stdio Server Round Trip
// ============================================================================

fn write_temp_data_file() -> PathBuf {
    let path = std::env::temp_dir().join(format!("stockline-test-{}.csv", uuid::Uuid::new_v4()));
    std::fs::write(&path, OFFLINE_DATA).expect("write temp data file");
    path
}

#[tokio::test]
async fn test_stdio_round_trip_against_the_real_server() {
    let data_file = write_temp_data_file();
    let server_exe = PathBuf::from(env!("CARGO_BIN_EXE_stockline-rs"));
    let args = vec![
        "serve".to_string(),
        "--offline".to_string(),
        "--data-file".to_string(),
        data_file.display().to_string(),
    ];

    let mut transport = StdioTransport::spawn(&server_exe, &args)
        .await
        .expect("server starts and says ready");

    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "TSLA");
    let result = transport.send(&invocation).await.expect("invoke succeeds");
    assert_eq!(result["symbol"], "TSLA");
    assert_eq!(result["price"], 248.42);
    assert_eq!(result["source"], "cache");

    // An error reply must not poison the session.
    let missing = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "ZZZZ");
    let err = transport.send(&missing).await.expect_err("unknown symbol");
    assert_eq!(err.kind(), "tool_execution");
    assert!(err.to_string().contains("ZZZZ"));

    let compare = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "AAPL")
        .with_arg("symbol_two", "MSFT");
    let result = transport.send(&compare).await.expect("compare succeeds");
    assert_eq!(result["relation"], "lower");

    transport.shutdown().await.expect("graceful shutdown");
    transport.shutdown().await.expect("second shutdown is a no-op");

    let _ = std::fs::remove_file(&data_file);
}

#[tokio::test]
async fn test_spawn_failure_surfaces_as_a_transport_error() {
    let bogus = PathBuf::from("/nonexistent/stockline-server");
    let err = StdioTransport::spawn(&bogus, &[])
        .await
        .expect_err("no such binary");
    let rendered = err.to_string();
    assert!(
        matches!(err, StocklineError::Io(_) | StocklineError::Transport(_)),
        "unexpected error: {rendered}"
    );
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn test_equal_prices_render_as_a_tie() {
    let registry = offline_registry().await;
    let invocation = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "AAPL")
        .with_arg("symbol_two", "IBM");
    let result = registry.dispatch(&invocation).await.expect("dispatch succeeds");
    assert_eq!(result["relation"], "equal");

    let answer = render_result(&invocation, &result);
    assert_eq!(
        answer,
        "AAPL and IBM are trading at the same price ($188.12)."
    );

    // Equal is equal in both orders
    let reversed = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "IBM")
        .with_arg("symbol_two", "AAPL");
    let result = registry.dispatch(&reversed).await.expect("dispatch succeeds");
    assert_eq!(result["relation"], "equal");
}

#[tokio::test]
async fn test_swapping_operands_inverts_the_relation() {
    let registry = offline_registry().await;

    let forward = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "MSFT")
        .with_arg("symbol_two", "TSLA");
    let result = registry.dispatch(&forward).await.expect("dispatch succeeds");
    assert_eq!(result["relation"], "higher");

    let reversed = ToolInvocation::new(stock::COMPARE_STOCKS)
        .with_arg("symbol_one", "TSLA")
        .with_arg("symbol_two", "MSFT");
    let result = registry.dispatch(&reversed).await.expect("dispatch succeeds");
    assert_eq!(result["relation"], "lower");
}

#[tokio::test]
async fn test_unexpected_payload_renders_a_plain_notice() {
    let invocation = ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "AAPL");
    let answer = render_result(&invocation, &Value::String("not a record".to_string()));
    assert!(answer.contains("unexpected"));
}
