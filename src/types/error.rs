//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Backend failures are classified so the pipeline can log what went wrong
//! before folding the failure into a stage outcome.
//!
//! ## Error Categories
//!
//! - **RateLimit**: quota or request-rate exhaustion
//! - **TokenLimit**: context too large for the model
//! - **Auth**: missing or rejected credentials
//! - **Network**: connectivity issues and timeouts
//! - **Unavailable**: provider or model not reachable
//! - **BadRequest**: the request itself was rejected
//! - **ParseError**: the response could not be decoded
//! - **Transient**: temporary server-side issues

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for backend failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    TokenLimit,
    Auth,
    Network,
    Unavailable,
    BadRequest,
    ParseError,
    Transient,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Short operator hint shown next to a failed stage
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RateLimit => Some("quota exhausted"),
            Self::TokenLimit => Some("context too large; lower pipeline.max_context_chars"),
            Self::Auth => Some("check the API key for the configured provider"),
            Self::Network => Some("check network connectivity or raise llm.timeout_secs"),
            Self::Unavailable => Some("provider or model not reachable"),
            _ => None,
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Classified backend error with provider context
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for reporting
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before a manual retry
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Operator hint: the category hint plus the suggested wait before rerunning
    pub fn hint(&self) -> Option<String> {
        match (self.category.hint(), self.retry_after) {
            (Some(hint), Some(wait)) => Some(format!("{}; rerun in {}s", hint, wait.as_secs())),
            (Some(hint), None) => Some(hint.to_string()),
            (None, Some(wait)) => Some(format!("temporary failure; rerun in {}s", wait.as_secs())),
            (None, None) => None,
        }
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw backend failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any provider
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota")
            || lower.contains("resource_exhausted")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(60));
        }

        if lower.contains("token")
            && (lower.contains("limit") || lower.contains("exceed") || lower.contains("maximum"))
            || lower.contains("context length")
            || lower.contains("too large")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
            || lower.contains("unauthenticated")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("503")
            || lower.contains("502")
            || lower.contains("service unavailable")
            || lower.contains("not found")
        {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("parse") || lower.contains("decode") || lower.contains("no content") {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        if lower.contains("overloaded") || lower.contains("temporary") || lower.contains("500") {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(2));
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(60)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
                    .retry_after(Duration::from_secs(5))
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a [`LensError`] returned by a provider
    pub fn classify_lens_error(err: &LensError, provider: &str) -> LlmError {
        match err {
            LensError::Llm(llm_err) => llm_err.clone(),
            LensError::LlmApi(msg) => Self::classify(msg, provider),
            LensError::Timeout { .. } => {
                LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider)
            }
            LensError::Json(_) => {
                LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider)
            }
            LensError::MissingCredential { .. } => {
                LlmError::with_provider(ErrorCategory::Auth, err.to_string(), provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum LensError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// Classified backend error
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Unclassified backend error message
    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("No API key for provider '{provider}': set {env_var} or llm.api_key")]
    MissingCredential { provider: String, env_var: String },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("No code files found under '{location}'")]
    IngestionEmpty { location: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to write output {path}: {reason}")]
    Output { path: String, reason: String },
}

impl From<LlmError> for LensError {
    fn from(err: LlmError) -> Self {
        LensError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, LensError>;

impl LensError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Errors that stop a run before any backend call
    pub fn is_fatal_before_pipeline(&self) -> bool {
        matches!(
            self,
            Self::IngestionEmpty { .. } | Self::MissingCredential { .. } | Self::Config(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
