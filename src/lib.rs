//! LegacyLens - AI-Driven Documentation for Legacy Codebases
//!
//! Reads a local directory or clones a remote repository, concatenates its
//! source files into one context blob, and runs four persona agents over it
//! to produce a README and a Mermaid architecture diagram.
//!
//! ## Quick Start
//!
//! ```ignore
//! use legacylens::{Config, Pipeline, ProviderConfig, create_provider};
//! use legacylens::ingest::CodebaseScanner;
//!
//! let config = Config::default();
//! let provider = create_provider(&ProviderConfig::from(&config.llm))?;
//! let blob = CodebaseScanner::new("./legacy-app", &config.ingest).collect();
//! let run = Pipeline::from_config(provider, &config).run(blob.as_str()).await;
//! let report = legacylens::Report::from_run(&run);
//! println!("{}", report.document());
//! ```
//!
//! ## Modules
//!
//! - [`ingest`]: repository materialization, staging cleanup, file scanning
//! - [`ai`]: completion providers, context guard, timeouts, preflight checks
//! - [`pipeline`]: the four agents and their task-graph scheduler
//! - [`report`]: combined Markdown document and diagram preview link
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ErrorCategory, LensError, Result};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    FailurePolicy, Pipeline, PipelineRun, ProgressEvent, Stage, StageOutcome, TaskGraph,
};
pub use report::Report;

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    ContextGuard, LlmProvider, LlmResponse, ProviderConfig, SharedProvider, TimeoutConfig,
    create_provider, with_timeout,
};

// =============================================================================
// Ingest Re-exports
// =============================================================================

pub use ingest::{CodebaseScanner, ContextBlob, Materializer, RepositoryLocation};
