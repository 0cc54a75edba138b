//! Documentation Report
//!
//! Combines the Writer's README and the Architect's diagram into one Markdown
//! document and builds a rendered-preview link for the diagram.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use regex::Regex;
use tracing::{debug, info};

use crate::constants::output::{DIAGRAM_HEADING, MERMAID_INK_SVG};
use crate::pipeline::{PipelineRun, Stage};
use crate::types::{LensError, Result};

/// A fence wrapped around the whole text: ```` ```lang\n ... \n``` ````
static WRAPPING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?\s*```\s*$")
        .expect("valid fence pattern")
});

/// Remove a code fence the model put around its diagram despite instructions.
/// Text without a wrapping fence is returned unchanged.
pub fn strip_code_fence(text: &str) -> &str {
    WRAPPING_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

/// mermaid.ink SVG link for `diagram`
pub fn mermaid_preview_url(diagram: &str) -> String {
    format!("{}{}", MERMAID_INK_SVG, URL_SAFE.encode(diagram.as_bytes()))
}

/// Final artifacts of one run
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Analyst output (or its failure text)
    pub analysis: String,
    /// Tech Lead output (or its failure text)
    pub critique: String,
    /// Writer output (or its failure text)
    pub readme: String,
    /// Architect output with any wrapping fence removed
    pub diagram: String,
}

impl Report {
    pub fn new(readme: impl Into<String>, diagram: &str) -> Self {
        Self {
            readme: readme.into(),
            diagram: strip_code_fence(diagram).to_string(),
            ..Default::default()
        }
    }

    pub fn from_run(run: &PipelineRun) -> Self {
        Self {
            analysis: run.text(Stage::Analyst),
            critique: run.text(Stage::TechLead),
            ..Self::new(run.text(Stage::Writer), &run.text(Stage::Architect))
        }
    }

    /// Titled sections for display, documentation first
    pub fn sections(&self) -> [(&'static str, &str); 4] {
        [
            ("Documentation", self.readme.as_str()),
            ("Architecture", self.diagram.as_str()),
            ("Tech Lead Review", self.critique.as_str()),
            ("Raw Analysis", self.analysis.as_str()),
        ]
    }

    /// README, then the diagram heading, then a mermaid block
    pub fn document(&self) -> String {
        format!(
            "{}\n\n{}\n\n```mermaid\n{}\n```",
            self.readme, DIAGRAM_HEADING, self.diagram
        )
    }

    pub fn preview_url(&self) -> String {
        mermaid_preview_url(&self.diagram)
    }

    /// Write [`Self::document`] to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let output_error = |e: std::io::Error| LensError::Output {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(output_error)?;
        }

        let document = self.document();
        fs::write(path, &document).map_err(output_error)?;
        debug!("Wrote {} bytes", document.len());
        info!("Documentation written to {}", path.display());
        Ok(())
    }
}
