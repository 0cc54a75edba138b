//! AI Integration Layer
//!
//! Completion backends plus the guards placed around every call to them.

pub mod guard;
pub mod preflight;
pub mod provider;
pub mod timeout;

pub use guard::ContextGuard;
pub use preflight::{CheckResult, PreflightCheck, PreflightResult};
pub use provider::{
    ErrorCategory, ErrorClassifier, GeminiProvider, LlmError, LlmProvider, LlmResponse,
    OllamaProvider, OpenAiProvider, ProviderConfig, ResponseMetadata, SharedProvider,
    TokenUsage, create_provider, credential_env_var,
};
pub use timeout::{TimeoutConfig, with_timeout};
