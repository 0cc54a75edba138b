//! Repository Materializer
//!
//! Resolves a [`RepositoryLocation`] to a directory on disk. Remote URLs are
//! cloned into `<staging_dir>/<repo-name>`; a previous clone under the same
//! name is removed first. Clone failures are not fatal: the original
//! location string is handed back and the scan of it will usually come up
//! empty.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use super::RepositoryLocation;
use super::cleanup::force_remove_dir;
use crate::config::IngestConfig;
use crate::constants::ingest::FALLBACK_REPO_NAME;

/// How the working directory came to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    /// Local path passed through unchanged
    Local,
    /// Remote repository cloned into the staging directory
    Cloned,
    /// Clone failed; the path is the original location string
    CloneFailed(String),
}

/// A resolved working directory
#[derive(Debug, Clone)]
pub struct Materialized {
    pub path: PathBuf,
    pub outcome: MaterializeOutcome,
}

impl Materialized {
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, MaterializeOutcome::CloneFailed(_))
    }
}

/// Produces local working directories for repository locations
pub struct Materializer {
    staging_dir: PathBuf,
    clone_depth: Option<u32>,
    git_program: String,
}

impl Materializer {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            clone_depth: config.clone_depth,
            git_program: "git".to_string(),
        }
    }

    /// Use a different executable for the clone step
    pub fn with_git_program(mut self, program: impl Into<String>) -> Self {
        self.git_program = program.into();
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Resolve a location to a local directory
    pub fn materialize(&self, location: &RepositoryLocation) -> Materialized {
        match location {
            RepositoryLocation::Local(path) => Materialized {
                path: path.clone(),
                outcome: MaterializeOutcome::Local,
            },
            RepositoryLocation::Remote(url) => self.materialize_remote(url),
        }
    }

    fn materialize_remote(&self, url: &str) -> Materialized {
        let repo_name = derive_repo_name(url);
        let local_path = self.staging_dir.join(&repo_name);

        if let Err(e) = fs::create_dir_all(&self.staging_dir) {
            warn!(
                "Could not create staging directory {}: {}",
                self.staging_dir.display(),
                e
            );
        }

        if local_path.exists() {
            info!("Cleaning up old version of {}...", repo_name);
            let report = force_remove_dir(&local_path);
            if !report.is_clean() {
                warn!(
                    "{} entries under {} could not be removed",
                    report.failed.len(),
                    local_path.display()
                );
            }
        }

        info!("Cloning {} from {}...", repo_name, url);
        match self.clone_into(url, &local_path) {
            Ok(()) => {
                info!("Cloned to {}", local_path.display());
                Materialized {
                    path: local_path,
                    outcome: MaterializeOutcome::Cloned,
                }
            }
            Err(reason) => {
                warn!("Failed to clone repository: {}", reason);
                Materialized {
                    path: PathBuf::from(url),
                    outcome: MaterializeOutcome::CloneFailed(reason),
                }
            }
        }
    }

    fn clone_into(&self, url: &str, target: &Path) -> std::result::Result<(), String> {
        let mut cmd = Command::new(&self.git_program);
        cmd.arg("clone");
        if let Some(depth) = self.clone_depth {
            cmd.arg("--depth").arg(depth.to_string());
        }
        cmd.arg(url)
            .arg(target)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0");

        debug!("Running {:?}", cmd);

        let status = cmd
            .status()
            .map_err(|e| format!("failed to launch {}: {}", self.git_program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} clone exited with {}", self.git_program, status))
        }
    }
}

/// Folder name for a remote URL: last non-empty path segment, `.git` suffix removed
pub fn derive_repo_name(url: &str) -> String {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back().map(String::from)),
        Err(_) => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .map(String::from),
    };

    let name = segment
        .as_deref()
        .map(|s| s.strip_suffix(".git").unwrap_or(s))
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_REPO_NAME.to_string()
    } else {
        name.to_string()
    }
}
