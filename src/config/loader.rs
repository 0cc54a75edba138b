//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/legacylens/config.toml)
//! 3. Project config (./.legacylens.toml)
//! 4. Environment variables (LEGACYLENS_* prefix)
//!
//! A `.env` file in the working directory is loaded first so provider
//! credentials (GOOGLE_API_KEY, OPENAI_API_KEY) can live next to the project.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{LensError, Result};

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = ".legacylens.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// .env → defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("Ignoring unreadable .env file: {}", e),
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        Self::extract(figment.merge(Self::env_provider()))
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| LensError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// LEGACYLENS_LLM_MODEL -> llm.model. Keys are split on the first
    /// underscore only, so `LEGACYLENS_PIPELINE_MAX_CONTEXT_CHARS` maps to
    /// `pipeline.max_context_chars`.
    fn env_provider() -> Env {
        Env::prefixed("LEGACYLENS_").map(|key| {
            let key = key.as_str().to_lowercase();
            match key.split_once('_') {
                Some((section, field)) => format!("{}.{}", section, field).into(),
                None => key.into(),
            }
        })
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/legacylens/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("legacylens"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| LensError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    /// Write a default config file (project-level unless `global`)
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let path = if global {
            let dir = Self::global_dir().ok_or_else(|| {
                LensError::Config("Cannot determine global config directory".to_string())
            })?;
            fs::create_dir_all(&dir)?;
            dir.join("config.toml")
        } else {
            Self::project_config_path()
        };

        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(path);
        }

        fs::write(&path, Self::default_config_toml())?;
        info!("Created config: {}", path.display());
        Ok(path)
    }

    /// Default config content (TOML)
    fn default_config_toml() -> String {
        r#"# LegacyLens Configuration
# Environment variables (LEGACYLENS_LLM_MODEL, ...) override these values.

version = "1.0"

[llm]
provider = "gemini"        # gemini | openai | ollama
# model = "gemini-2.5-flash"
timeout_secs = 300
temperature = 0.2

[ingest]
staging_dir = "./temp_repos"
respect_gitignore = false
# clone_depth = 1

[pipeline]
max_context_chars = 800000
parallel = false
failure_policy = "forward"  # forward | substitute

[output]
file = "GENERATED_README.md"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailurePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_file_merges_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[llm]
provider = "ollama"
model = "llama3"

[pipeline]
parallel = true
failure_policy = "substitute"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model.as_deref(), Some("llama3"));
        assert!(config.pipeline.parallel);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::Substitute);
        // Untouched sections keep defaults
        assert_eq!(config.pipeline.max_context_chars, 800_000);
        assert_eq!(config.output.file, PathBuf::from("GENERATED_README.md"));
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\ntimeout_secs = 0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, LensError::Config(_)));
    }

    #[test]
    fn test_default_config_toml_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, ConfigLoader::default_config_toml()).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.timeout_secs, 300);
    }

    #[test]
    fn test_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEGACYLENS_LLM_MODEL", "test-model");
            jail.set_env("LEGACYLENS_PIPELINE_MAX_CONTEXT_CHARS", "1234");

            let config: Config = Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(ConfigLoader::env_provider())
                .extract()?;
            assert_eq!(config.llm.model.as_deref(), Some("test-model"));
            assert_eq!(config.pipeline.max_context_chars, 1234);
            Ok(())
        });
    }
}
