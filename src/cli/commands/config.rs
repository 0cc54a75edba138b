//! Config Command
//!
//! Manage LegacyLens configuration.
//!
//! Usage:
//!   legacylens config show [--json]
//!   legacylens config path
//!   legacylens config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show merged effective configuration
pub fn show(as_json: bool) -> Result<()> {
    ConfigLoader::show_config(as_json)
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();
    let existed = if global {
        ConfigLoader::global_config_path().is_some_and(|p| p.exists())
    } else {
        ConfigLoader::project_config_path().exists()
    };

    let path = ConfigLoader::init(global, force)?;

    if existed && !force {
        output.warning(&format!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    } else {
        let scope = if global { "global" } else { "project" };
        output.success(&format!("Initialized {} configuration", scope));
        output.field("Config", &path.display().to_string());
    }
    Ok(())
}
