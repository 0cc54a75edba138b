//! Repository Ingestion
//!
//! Turns a user-supplied repository location into one delimited text blob:
//! - Materialization of remote repositories into a local staging directory
//! - Best-effort cleanup of stale clones
//! - Directory walking with extension and directory-name filters

pub mod cleanup;
pub mod materializer;
pub mod scanner;

pub use cleanup::{CleanupReport, force_remove_dir};
pub use materializer::{Materialized, MaterializeOutcome, Materializer};
pub use scanner::{CodeUnit, CodebaseScanner, ContextBlob};

use std::fmt;
use std::path::PathBuf;

/// Where a repository lives, as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    /// Filesystem path (existence not verified)
    Local(PathBuf),
    /// http(s) URL to clone
    Remote(String),
}

impl RepositoryLocation {
    /// Classify a raw location by its scheme prefix
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(raw.trim().to_string())
        } else {
            Self::Local(PathBuf::from(raw))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn is_local(&self) -> bool {
        !self.is_remote()
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let loc = RepositoryLocation::parse("https://github.com/octocat/Hello-World");
        assert!(loc.is_remote());
        assert!(!loc.is_local());
        assert!(RepositoryLocation::parse("HTTP://example.com/repo.git").is_remote());
    }

    #[test]
    fn test_parse_local() {
        assert_eq!(
            RepositoryLocation::parse("./src"),
            RepositoryLocation::Local(PathBuf::from("./src"))
        );
        // A directory whose name merely starts with "http" is still local
        assert!(RepositoryLocation::parse("httpdocs/site").is_local());
        assert!(RepositoryLocation::parse("git@github.com:user/repo.git").is_local());
    }

    #[test]
    fn test_display_round_trips_input() {
        let url = "https://github.com/user/repo";
        assert_eq!(RepositoryLocation::parse(url).to_string(), url);
        assert_eq!(RepositoryLocation::parse("some/dir").to_string(), "some/dir");
    }
}
