// SPDX-License-Identifier: MIT

//! Routing: free text in, validated tool invocation out.
//!
//! Two paths, tried in order: an optional AI classification backend, then
//! the deterministic keyword heuristic. Backend trouble is never an answer
//! the user sees; it logs a warning and falls through.

pub mod deepseek;
pub mod heuristic;

pub use deepseek::DeepseekBackend;

use std::fmt;

use async_trait::async_trait;

use crate::config::{Settings, CLASSIFY_TIMEOUT};
use crate::error::{ClassifyError, RouteError, StocklineError};
use crate::tools::{ToolDescriptor, ToolInvocation};

/// Which path produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrigin {
    Ai,
    Heuristic,
}

impl fmt::Display for RouteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteOrigin::Ai => write!(f, "ai"),
            RouteOrigin::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// A routed invocation plus the path that produced it.
#[derive(Debug, Clone)]
pub struct RouterDecision {
    pub invocation: ToolInvocation,
    pub origin: RouteOrigin,
}

/// Classification backend seam. Implementations must return an invocation
/// of a cataloged tool or a [`ClassifyError`]; they never route by guess.
#[async_trait]
pub trait RouterBackend: Send + Sync {
    async fn classify(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ToolInvocation, ClassifyError>;
}

pub struct Router {
    backend: Option<Box<dyn RouterBackend>>,
    tools: Vec<ToolDescriptor>,
}

impl Router {
    pub fn new(backend: Option<Box<dyn RouterBackend>>, tools: Vec<ToolDescriptor>) -> Self {
        Self { backend, tools }
    }

    /// Builds a router from settings: with a Deepseek backend when a key is
    /// configured, heuristic-only otherwise.
    pub fn from_settings(
        settings: &Settings,
        tools: Vec<ToolDescriptor>,
    ) -> Result<Self, StocklineError> {
        let backend: Option<Box<dyn RouterBackend>> = match &settings.deepseek_key {
            Some(key) => {
                log::info!("Deepseek routing enabled (model {})", settings.deepseek_model);
                let backend = DeepseekBackend::new(
                    key.clone(),
                    settings.deepseek_url.clone(),
                    settings.deepseek_model.clone(),
                    CLASSIFY_TIMEOUT,
                )
                .map_err(|err| {
                    StocklineError::config(format!("cannot build the Deepseek client: {}", err))
                })?;
                Some(Box::new(backend))
            }
            None => {
                log::info!("no Deepseek key configured; routing by keyword heuristic only");
                None
            }
        };
        Ok(Self::new(backend, tools))
    }

    /// True when an AI backend is configured.
    pub fn ai_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn route(&self, prompt: &str) -> Result<RouterDecision, RouteError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RouteError::EmptyPrompt);
        }

        if let Some(backend) = &self.backend {
            match backend.classify(prompt, &self.tools).await {
                Ok(invocation) => {
                    log::info!("classifier routed to {}", invocation.tool);
                    return Ok(RouterDecision {
                        invocation,
                        origin: RouteOrigin::Ai,
                    });
                }
                Err(err) => {
                    log::warn!(
                        "classification failed ({}); falling back to the keyword heuristic",
                        err
                    );
                }
            }
        }

        let invocation = heuristic::route(prompt)?;
        Ok(RouterDecision {
            invocation,
            origin: RouteOrigin::Heuristic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::stock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend that records calls and answers from a script.
    struct ScriptedBackend {
        calls: Arc<AtomicUsize>,
        reply: Result<ToolInvocation, ()>,
    }

    impl ScriptedBackend {
        fn ok(invocation: ToolInvocation) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    reply: Ok(invocation),
                },
                calls,
            )
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    reply: Err(()),
                },
                calls,
            )
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
                Err(()) => Err(ClassifyError::Unusable("scripted failure".to_string())),
            }
        }
    }

    fn offline_settings() -> Settings {
        Settings {
            deepseek_key: None,
            deepseek_url: "https://api.deepseek.com/chat/completions".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            data_file: "stocks_data.csv".into(),
            in_process: false,
            offline: true,
        }
    }

    #[tokio::test]
    async fn test_backend_decision_wins() {
        let scripted =
            ToolInvocation::new(stock::GET_STOCK_PRICE).with_arg("symbol", "AAPL");
        let (backend, calls) = ScriptedBackend::ok(scripted.clone());
        let router = Router::new(Some(Box::new(backend)), stock::descriptors());

        let decision = router.route("apple?").await.unwrap();
        assert_eq!(decision.origin, RouteOrigin::Ai);
        assert_eq!(decision.invocation, scripted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_heuristic() {
        let (backend, calls) = ScriptedBackend::failing();
        let router = Router::new(Some(Box::new(backend)), stock::descriptors());

        let decision = router.route("price of AAPL").await.unwrap();
        assert_eq!(decision.origin, RouteOrigin::Heuristic);
        assert_eq!(decision.invocation.arguments["symbol"], "AAPL");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_backend_routes_by_heuristic() {
        let router = Router::new(None, stock::descriptors());
        let decision = router.route("compare apple and microsoft").await.unwrap();
        assert_eq!(decision.origin, RouteOrigin::Heuristic);
        assert_eq!(decision.invocation.tool, stock::COMPARE_STOCKS);
    }

    #[tokio::test]
    async fn test_empty_prompt_short_circuits() {
        let (backend, calls) = ScriptedBackend::failing();
        let router = Router::new(Some(Box::new(backend)), stock::descriptors());

        let err = router.route("   ").await.unwrap_err();
        assert!(matches!(err, RouteError::EmptyPrompt));
        // The backend is never consulted for an empty prompt
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_from_settings_without_key_disables_ai() {
        let router = Router::from_settings(&offline_settings(), stock::descriptors()).unwrap();
        assert!(!router.ai_enabled());

        let decision = router.route("price of tesla").await.unwrap();
        assert_eq!(decision.origin, RouteOrigin::Heuristic);
    }

    #[tokio::test]
    async fn test_from_settings_with_key_enables_ai() {
        let mut settings = offline_settings();
        settings.deepseek_key = Some("sk-test".to_string());
        let router = Router::from_settings(&settings, stock::descriptors()).unwrap();
        assert!(router.ai_enabled());
    }
}
