//! Analyze Command
//!
//! Location → working directory → context blob → four agents → README with
//! an embedded architecture diagram.
//!
//! Two conditions stop a run before any completion call: a missing
//! credential (checked before ingestion) and an empty scan.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::ai::{ContextGuard, PreflightCheck, ProviderConfig, SharedProvider, create_provider};
use crate::cli::progress::ConsoleRenderer;
use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::ingest::{
    CodebaseScanner, MaterializeOutcome, Materialized, Materializer, RepositoryLocation,
};
use crate::pipeline::{FailurePolicy, Pipeline, PipelineRun};
use crate::report::Report;
use crate::types::{LensError, Result};

/// Command-line overrides for one analysis
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub location: String,
    pub output: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub parallel: bool,
    pub substitute_failures: bool,
    pub no_write: bool,
    pub quiet: bool,
}

impl AnalyzeOptions {
    /// Layer flags over loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
            // A model name only makes sense for the provider it was set for
            if self.model.is_none() {
                config.llm.model = None;
            }
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(output) = &self.output {
            config.output.file = output.clone();
        }
        if self.parallel {
            config.pipeline.parallel = true;
        }
        if self.substitute_failures {
            config.pipeline.failure_policy = FailurePolicy::Substitute;
        }
    }
}

/// Everything one analysis produced
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub materialized: Materialized,
    pub files: usize,
    pub chars: usize,
    /// Non-blocking preflight warnings raised after ingestion
    pub warnings: Vec<String>,
    pub run: PipelineRun,
    pub report: Report,
}

/// Entry point for `legacylens analyze`
pub async fn run(options: AnalyzeOptions) -> Result<()> {
    let output = Output::quiet(options.quiet);

    let mut config = ConfigLoader::load()?;
    options.apply(&mut config);
    config.validate()?;

    let location = RepositoryLocation::parse(&options.location);
    let provider_config = ProviderConfig::from(&config.llm);

    // Credential and tooling checks happen before anything touches the disk
    let warnings = PreflightCheck::new()
        .check_environment(&provider_config, &location)
        .into_result()?;
    for warning in &warnings {
        output.warning(warning);
    }

    let provider = create_provider(&provider_config)?;
    output.header("LegacyLens");
    output.field("Location", &location.to_string());
    output.field(
        "Backend",
        &format!("{} ({})", provider.name(), provider.model()),
    );

    let materializer = Materializer::new(&config.ingest);
    let outcome = analyze(&config, &location, &materializer, provider, !options.quiet).await?;

    print_outcome(&output, &outcome);

    if options.no_write {
        output.info("Skipped writing output (--no-write)");
    } else {
        outcome.report.write_to(&config.output.file)?;
        output.success(&format!(
            "Documentation saved to {}",
            config.output.file.display()
        ));
    }

    Ok(())
}

/// Ingest `location` and run the agent pipeline over it.
///
/// Returns [`LensError::IngestionEmpty`] without calling the provider when
/// no code is found.
pub async fn analyze(
    config: &Config,
    location: &RepositoryLocation,
    materializer: &Materializer,
    provider: SharedProvider,
    show_progress: bool,
) -> Result<AnalysisOutcome> {
    let materialized = materializer.materialize(location);
    if let MaterializeOutcome::CloneFailed(reason) = &materialized.outcome {
        warn!(
            "Clone failed ({}); scanning '{}' as a local path",
            reason,
            materialized.path.display()
        );
    }

    info!("Reading codebase at {}", materialized.path.display());
    let blob = CodebaseScanner::new(&materialized.path, &config.ingest).collect();
    if blob.is_empty() {
        return Err(LensError::IngestionEmpty {
            location: location.to_string(),
        });
    }

    let guard = ContextGuard::new(config.pipeline.max_context_chars);
    let warnings = PreflightCheck::new()
        .check_context(&blob, &guard)
        .into_result()?;

    let pipeline = Pipeline::from_config(provider, config);
    let renderer = show_progress.then(|| {
        ConsoleRenderer::new(pipeline.progress().clone()).spawn(pipeline.progress().subscribe())
    });

    let run = pipeline.run(blob.as_str()).await;

    if let Some(handle) = renderer
        && let Err(e) = handle.await
    {
        warn!("Progress renderer stopped unexpectedly: {}", e);
    }

    let report = Report::from_run(&run);
    Ok(AnalysisOutcome {
        materialized,
        files: blob.files().len(),
        chars: blob.char_count(),
        warnings,
        run,
        report,
    })
}

fn print_outcome(output: &Output, outcome: &AnalysisOutcome) {
    if outcome.materialized.is_degraded() {
        output.warning("Repository could not be cloned; results are from the fallback path");
    }
    output.field("Files", &outcome.files.to_string());
    output.field("Characters", &outcome.chars.to_string());
    for warning in &outcome.warnings {
        output.warning(warning);
    }

    for (title, text) in outcome.report.sections() {
        output.section(title);
        output.block(text);
    }

    output.section("Diagram Preview");
    output.block(&outcome.report.preview_url());

    let usage = outcome.run.total_usage();
    output.field(
        "Tokens",
        &format!("{} in / {} out", usage.input_tokens, usage.output_tokens),
    );

    let failed = outcome.run.failed_stages();
    if failed.is_empty() {
        output.success("All agents completed");
    } else {
        let names: Vec<&str> = failed.iter().map(|s| s.role()).collect();
        output.warning(&format!("Failed agents: {}", names.join(", ")));
    }
}
