//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/legacylens/) and project (.legacylens.toml) configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{guard, ingest, network, output};
use crate::pipeline::FailurePolicy;
use crate::types::{LensError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Completion backend settings
    pub llm: LlmConfig,

    /// Repository ingestion settings
    pub ingest: IngestConfig,

    /// Agent pipeline settings
    pub pipeline: PipelineConfig,

    /// Output artifact settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            ingest: IngestConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `LensError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(LensError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(LensError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_context_chars == 0 {
            return Err(LensError::Config(
                "pipeline.max_context_chars must be greater than 0".to_string(),
            ));
        }

        if let Some(ext) = self.ingest.extensions.iter().find(|e| !e.starts_with('.')) {
            return Err(LensError::Config(format!(
                "ingest.extensions entries must start with '.', got '{}'",
                ext
            )));
        }

        if self.ingest.clone_depth == Some(0) {
            return Err(LensError::Config(
                "ingest.clone_depth must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini", "openai", "ollama"
    pub provider: String,

    /// Model name (provider default when unset)
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens to generate per stage
    pub max_tokens: usize,

    /// Custom API endpoint
    pub api_base: Option<String>,

    /// API key; the provider's environment variable is used when unset.
    /// Never serialized to output.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            max_tokens: 8192,
            api_base: None,
            api_key: None,
        }
    }
}

// =============================================================================
// Ingestion Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Parent directory for cloned repositories
    pub staging_dir: PathBuf,

    /// Shallow clone depth (full clone when unset)
    pub clone_depth: Option<u32>,

    /// Apply .gitignore rules while scanning
    pub respect_gitignore: bool,

    /// Extensions to include (with leading dot)
    pub extensions: Vec<String>,

    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(ingest::DEFAULT_STAGING_DIR),
            clone_depth: None,
            respect_gitignore: false,
            extensions: ingest::ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_dirs: ingest::EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Character cap applied before every completion call
    pub max_context_chars: usize,

    /// Run stages whose inputs are ready concurrently
    pub parallel: bool,

    /// How a failed stage's output reaches downstream stages
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_context_chars: guard::DEFAULT_MAX_CHARS,
            parallel: false,
            failure_policy: FailurePolicy::Forward,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Combined documentation file
    pub file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(output::DEFAULT_OUTPUT_FILE),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
