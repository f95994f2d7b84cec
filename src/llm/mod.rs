mod anthropic;
mod gemini;
pub mod trivia;

use async_trait::async_trait;
use std::time::Duration;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use trivia::TriviaAdapter;

use crate::config::env_non_empty;
use crate::types::ProviderTag;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),

    #[error("Provider returned no usable items")]
    EmptyResult,
}

/// Request to generate text
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The user prompt
    pub prompt: String,
    /// Optional system instruction
    pub system: Option<String>,
    /// Maximum response length in tokens
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// The generated text
    pub text: String,
    pub metadata: ResponseMetadata,
}

/// Metadata about the LLM response
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// Name of the provider (e.g., "gemini", "anthropic")
    pub provider: String,
    /// Model name used
    pub model: String,
    /// Tokens consumed (if available)
    pub tokens_used: Option<u32>,
    /// Latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers must implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Submit a prompt and return the raw generated text
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Hard per-call bound on a generation attempt
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(55);

/// Timeout of the HTTP client talking to a backend
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Configuration for LLM providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Gemini API key (primary provider)
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Anthropic API key (secondary provider)
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    /// Hard bound on each provider attempt, enforced outside the HTTP client
    pub generation_timeout: Duration,
    /// Timeout configured on the HTTP clients themselves
    pub http_timeout: Duration,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-5-sonnet-20241022".to_string(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            gemini_api_key: env_non_empty("GEMINI_API_KEY"),
            gemini_model: env_non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            anthropic_api_key: env_non_empty("ANTHROPIC_API_KEY"),
            anthropic_model: env_non_empty("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            generation_timeout: env_non_empty("LLM_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.generation_timeout),
            http_timeout: env_non_empty("LLM_HTTP_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            max_tokens: env_non_empty("LLM_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
        }
    }

    /// Build the adapters for every configured provider, in fallback order:
    /// Gemini first, then Anthropic.
    pub fn build_adapters(&self) -> LlmResult<Vec<TriviaAdapter>> {
        let mut adapters = Vec::new();

        if let Some(api_key) = &self.gemini_api_key {
            let provider =
                GeminiProvider::new(api_key.clone(), self.gemini_model.clone(), self.http_timeout)?;
            adapters.push(
                TriviaAdapter::new(Box::new(provider), ProviderTag::Gemini, self.generation_timeout)
                    .with_max_tokens(self.max_tokens),
            );
        }

        if let Some(api_key) = &self.anthropic_api_key {
            let provider = AnthropicProvider::new(
                api_key.clone(),
                self.anthropic_model.clone(),
                self.http_timeout,
            )?;
            adapters.push(
                TriviaAdapter::new(
                    Box::new(provider),
                    ProviderTag::Anthropic,
                    self.generation_timeout,
                )
                .with_max_tokens(self.max_tokens),
            );
        }

        if adapters.is_empty() {
            return Err(LlmError::ConfigError(
                "No LLM providers configured. Set GEMINI_API_KEY or ANTHROPIC_API_KEY".to_string(),
            ));
        }

        Ok(adapters)
    }
}
