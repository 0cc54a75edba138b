//! Pre-flight Validation Checks
//!
//! Validates system state before any backend call is made.
//!
//! ## Checks
//!
//! - Credential present for the selected provider (blocking)
//! - `git` launchable when the location is remote (warning)
//! - Raw context size against the guard threshold (warning)

use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::ai::guard::ContextGuard;
use crate::ai::provider::{ProviderConfig, credential_env_var};
use crate::ingest::{ContextBlob, RepositoryLocation};
use crate::types::{LensError, Result};

/// Pre-flight check results
#[derive(Debug)]
pub struct PreflightResult {
    /// All blocking checks passed
    pub passed: bool,
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// Warnings (non-blocking)
    pub warnings: Vec<String>,
    /// Errors (blocking)
    pub errors: Vec<String>,
    /// First blocking failure, kept typed for the caller
    fatal: Option<LensError>,
}

impl PreflightResult {
    pub fn new() -> Self {
        Self {
            passed: true,
            checks: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            fatal: None,
        }
    }

    fn add_check(&mut self, check: CheckResult) {
        if !check.passed {
            self.passed = false;
            self.errors.push(check.message.clone());
        }
        if let Some(ref warn) = check.warning {
            self.warnings.push(warn.clone());
        }
        self.checks.push(check);
    }

    fn fail_with(&mut self, check: CheckResult, error: LensError) {
        self.add_check(check);
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    /// Convert into the first blocking error, if any
    pub fn into_result(self) -> Result<Vec<String>> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(self.warnings),
        }
    }
}

impl Default for PreflightResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Individual check result
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub warning: Option<String>,
    pub duration_ms: u64,
}

/// Pre-flight validation checker
pub struct PreflightCheck {
    git_program: String,
}

impl Default for PreflightCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl PreflightCheck {
    pub fn new() -> Self {
        Self {
            git_program: "git".to_string(),
        }
    }

    /// Probe a different executable for the clone tool
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    /// Checks that run before ingestion starts
    pub fn check_environment(
        &self,
        provider: &ProviderConfig,
        location: &RepositoryLocation,
    ) -> PreflightResult {
        let mut result = PreflightResult::new();

        info!("Running pre-flight checks...");

        self.check_credential(provider, &mut result);
        if location.is_remote() {
            self.check_git(&mut result);
        }

        if result.passed {
            debug!("Pre-flight checks passed ({} checks)", result.checks.len());
        } else {
            warn!("Pre-flight checks failed: {} errors", result.errors.len());
        }
        result
    }

    /// Checks that need the ingested blob
    pub fn check_context(&self, blob: &ContextBlob, guard: &ContextGuard) -> PreflightResult {
        let mut result = PreflightResult::new();
        let start = Instant::now();
        let chars = blob.char_count();

        let warning = guard.exceeds(blob.as_str()).then(|| {
            format!(
                "Codebase is {} chars; every stage input will be truncated to {} chars",
                chars,
                guard.max_chars()
            )
        });
        if let Some(ref w) = warning {
            warn!("{}", w);
        }

        result.add_check(CheckResult {
            name: "context_size".to_string(),
            passed: true,
            message: format!("{} files, {} chars", blob.files().len(), chars),
            warning,
            duration_ms: start.elapsed().as_millis() as u64,
        });
        result
    }

    fn check_credential(&self, provider: &ProviderConfig, result: &mut PreflightResult) {
        let start = Instant::now();
        let name = format!("credential_{}", provider.provider);

        let Some(env_var) = credential_env_var(&provider.provider) else {
            result.add_check(CheckResult {
                name,
                passed: true,
                message: format!("Provider '{}' needs no credential", provider.provider),
                warning: None,
                duration_ms: start.elapsed().as_millis() as u64,
            });
            return;
        };

        match provider.resolve_api_key(env_var) {
            Ok(_) => result.add_check(CheckResult {
                name,
                passed: true,
                message: format!("Credential found for '{}'", provider.provider),
                warning: None,
                duration_ms: start.elapsed().as_millis() as u64,
            }),
            Err(err) => {
                let check = CheckResult {
                    name,
                    passed: false,
                    message: err.to_string(),
                    warning: None,
                    duration_ms: start.elapsed().as_millis() as u64,
                };
                result.fail_with(check, err);
            }
        }
    }

    fn check_git(&self, result: &mut PreflightResult) {
        let start = Instant::now();
        let available = Command::new(&self.git_program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        let warning = (!available).then(|| {
            format!(
                "'{}' is not available; cloning will fail and the location will be scanned as a path",
                self.git_program
            )
        });

        result.add_check(CheckResult {
            name: "git_available".to_string(),
            passed: true,
            message: if available {
                "git is available".to_string()
            } else {
                "git is not available".to_string()
            },
            warning,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
}
