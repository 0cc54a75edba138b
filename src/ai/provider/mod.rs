//! LLM Provider Abstraction
//!
//! Defines the LlmProvider trait for free-text completion.
//! All providers return `LlmResponse` with token usage metrics for reporting.
//!
//! ## Providers
//!
//! - `gemini`: Google Generative Language API (default)
//! - `openai`: OpenAI Chat Completions API
//! - `ollama`: locally running Ollama server, no credential

mod gemini;
mod ollama;
mod openai;

#[cfg(test)]
pub(crate) mod stub;
#[cfg(test)]
pub(crate) mod test_server;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ai::timeout::TimeoutConfig;
use crate::config::LlmConfig;
use crate::types::{LensError, Result};

// =============================================================================
// LLM Response with Usage Metrics
// =============================================================================

/// Complete LLM response including content and usage metrics
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text, verbatim
    pub content: String,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Provider and model info
    pub metadata: ResponseMetadata,
}

impl LlmResponse {
    /// Create response with content only (usage unknown)
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn with_metrics(
        content: String,
        usage: TokenUsage,
        metadata: ResponseMetadata,
    ) -> Self {
        Self {
            content,
            usage,
            metadata,
        }
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from Gemini `usageMetadata`
    pub fn from_gemini(prompt_token_count: u32, candidates_token_count: u32) -> Self {
        Self {
            input_tokens: prompt_token_count,
            output_tokens: candidates_token_count,
        }
    }

    /// Create from OpenAI-style usage response
    pub fn from_openai(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            input_tokens: prompt_tokens,
            output_tokens: completion_tokens,
        }
    }

    /// Create from Ollama-style usage response
    pub fn from_ollama(prompt_eval_count: u32, eval_count: u32) -> Self {
        Self {
            input_tokens: prompt_eval_count,
            output_tokens: eval_count,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Response metadata
#[derive(Debug, Clone, Default)]
pub struct ResponseMetadata {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared LLM provider type for concurrent access across pipeline stages.
pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for LLM providers
///
/// Note: API keys are never serialized and are redacted in debug output.
/// Each provider converts the key to SecretString internally.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "openai", "ollama"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for LLM generation
    pub temperature: f32,
    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for ProviderConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config or the environment.
    ///
    /// Empty values count as missing.
    pub(crate) fn resolve_api_key(&self, env_var: &str) -> Result<SecretString> {
        let present = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(present)
            .or_else(|| std::env::var(env_var).ok().filter(present))
            .map(SecretString::from)
            .ok_or_else(|| LensError::MissingCredential {
                provider: self.provider.clone(),
                env_var: env_var.to_string(),
            })
    }

    /// HTTP client with request and connect timeouts
    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        let timeouts = TimeoutConfig::from_secs(self.timeout_secs);
        reqwest::Client::builder()
            .timeout(timeouts.llm_request)
            .connect_timeout(timeouts.connection)
            .build()
            .map_err(|e| LensError::LlmApi(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Environment variable holding the credential for `provider`, if it needs one
pub fn credential_env_var(provider: &str) -> Option<&'static str> {
    match provider {
        "gemini" => Some(gemini::API_KEY_ENV),
        "openai" => Some(openai::API_KEY_ENV),
        _ => None,
    }
}

/// Classified error for a non-success HTTP status
pub(crate) fn http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> LensError {
    let message = format!("{} API error ({}): {}", provider, status, body.trim());
    ErrorClassifier::classify_http_status(status.as_u16(), &message, provider).into()
}

// =============================================================================
// LLM Provider Trait
// =============================================================================

/// LLM Provider trait for single-shot text completion with usage metrics
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the response text verbatim.
    ///
    /// Implementations make exactly one request; there is no retry.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared provider from configuration
///
/// Fails with [`LensError::MissingCredential`] when a keyed provider has no key,
/// before any request is made.
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.clone())?)),
        _ => Err(LensError::Config(format!(
            "Unknown provider: {}. Supported: gemini, openai, ollama",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_from_llm_config() {
        let llm = LlmConfig {
            provider: "openai".to_string(),
            model: Some("gpt-4o".to_string()),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let config = ProviderConfig::from(&llm);
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.timeout_secs, 300);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "watson".to_string(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, LensError::Config(_)));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = ProviderConfig {
            provider: "openai".to_string(),
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let err = config
            .resolve_api_key("LEGACYLENS_TEST_UNSET_KEY_VAR")
            .err()
            .unwrap();
        assert!(matches!(err, LensError::MissingCredential { .. }));
    }

    #[test]
    fn test_credential_env_vars() {
        assert_eq!(credential_env_var("gemini"), Some("GOOGLE_API_KEY"));
        assert_eq!(credential_env_var("openai"), Some("OPENAI_API_KEY"));
        assert_eq!(credential_env_var("ollama"), None);
    }

    #[test]
    fn test_http_error_is_classified() {
        let err = http_error(
            "gemini",
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "quota exceeded",
        );
        match err {
            LensError::Llm(llm) => {
                assert_eq!(llm.category, ErrorCategory::RateLimit);
                assert_eq!(llm.provider.as_deref(), Some("gemini"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = TokenUsage::default();
        total += TokenUsage::from_gemini(10, 5);
        total += TokenUsage::from_openai(1, 2);
        assert_eq!(total.total(), 18);
    }
}
