use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use legacylens::cli::commands::analyze::AnalyzeOptions;

#[derive(Parser)]
#[command(name = "legacylens")]
#[command(
    version,
    about = "AI-driven documentation generator for legacy codebases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a README and architecture diagram for a repository
    Analyze {
        #[arg(help = "Local directory or http(s) repository URL")]
        location: String,
        #[arg(long, short, help = "Output file (default: GENERATED_README.md)")]
        output: Option<PathBuf>,
        #[arg(long, help = "LLM provider (gemini, openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Run independent agents concurrently")]
        parallel: bool,
        #[arg(
            long,
            help = "Pass a placeholder instead of error text to agents after a failure"
        )]
        substitute_failures: bool,
        #[arg(long = "no-write", help = "Print results without writing the output file")]
        no_write: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Print as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mLegacyLens encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            location,
            output,
            provider,
            model,
            parallel,
            substitute_failures,
            no_write,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(legacylens::cli::commands::analyze::run(AnalyzeOptions {
                location,
                output,
                provider,
                model,
                parallel,
                substitute_failures,
                no_write,
                quiet: cli.quiet,
            }))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                legacylens::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                legacylens::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                legacylens::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
