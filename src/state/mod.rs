mod entitlement;
mod generation;
mod rooms;

pub use entitlement::USERS_COLLECTION;
pub use generation::{validate_generation_payload, GENERATION_UNAVAILABLE};
pub use rooms::{authorize_operation, RoomOperation, ROOMS_COLLECTION};

use crate::auth::{IdentityVerifier, TokenIdentity};
use crate::cache::GenerationCache;
use crate::clock::{Clock, SystemClock};
use crate::config::GenerationConfig;
use crate::llm::TriviaAdapter;
use crate::rate_limit::DailyRateLimiter;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityVerifier>,
    /// Generation backends in fallback order
    pub adapters: Arc<Vec<TriviaAdapter>>,
    pub cache: GenerationCache,
    pub limiter: DailyRateLimiter,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// State with default quota and cache policy, the system clock and an
    /// empty token table
    pub fn new(store: Arc<dyn DocumentStore>, adapters: Vec<TriviaAdapter>) -> Self {
        let config = GenerationConfig::default();
        Self {
            cache: GenerationCache::new(store.clone(), config.cache_ttl),
            limiter: DailyRateLimiter::new(store.clone(), config.daily_limit),
            store,
            identity: Arc::new(TokenIdentity::default()),
            adapters: Arc::new(adapters),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_generation_config(mut self, config: &GenerationConfig) -> Self {
        self.cache = GenerationCache::new(self.store.clone(), config.cache_ttl);
        self.limiter = DailyRateLimiter::new(self.store.clone(), config.daily_limit);
        self
    }

    /// Configured providers, in the order they are tried
    pub fn provider_names(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|adapter| adapter.tag().to_string())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::llm::{GenerateRequest, GenerateResponse, LlmError, LlmProvider, LlmResult};
    use crate::llm::{ResponseMetadata, TriviaAdapter};
    use crate::types::ProviderTag;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Provider that replays a fixed reply and counts calls
    pub struct ScriptedProvider {
        pub reply: Result<String, String>,
        pub calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, _request: GenerateRequest) -> LlmResult<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(GenerateResponse {
                    text: text.clone(),
                    metadata: ResponseMetadata {
                        provider: "scripted".to_string(),
                        model: "scripted".to_string(),
                        tokens_used: None,
                        latency_ms: 0,
                    },
                }),
                Err(e) => Err(LlmError::ApiError(e.clone())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Adapter over a scripted provider, plus its call counter
    pub fn adapter(
        tag: ProviderTag,
        reply: Result<String, String>,
    ) -> (TriviaAdapter, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            reply,
            calls: calls.clone(),
        };
        (
            TriviaAdapter::new(Box::new(provider), tag, Duration::from_secs(55)),
            calls,
        )
    }

    /// Backend reply with `n` items of three correct answers and two distractors
    pub fn reply_with_items(n: usize) -> String {
        let items: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "categoryPattern": format!("These are rivers {}", i),
                    "correctPool": ["Nile", "Amazon", "Danube"],
                    "distractorPool": ["Everest", "Sahara"],
                })
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }
}
