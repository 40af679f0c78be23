//! Lumen CLI - Analyze images with a prompt through interchangeable vision-model vendors.
//!
//! Results and errors are printed to stdout as JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a local image
//! lumen analyze ./chart.png "What does this chart show?"
//!
//! # Force a template and ask for JSON output
//! lumen analyze https://example.com/receipt.jpg "List the items" --template ocr --format json
//!
//! # List templates and providers
//! lumen templates
//! lumen providers
//!
//! # View configuration (API key masked)
//! lumen config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Lumen - Analyze images with a prompt through interchangeable vision-model vendors.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze an image with a prompt
    Analyze(cli::analyze::AnalyzeArgs),

    /// List the available prompt templates
    Templates,

    /// List the registered model providers
    Providers,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let loaded = lumen_core::Config::load();
    let log_config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Check your config file with `lumen config path`."
            );
            lumen_core::Config::default()
        }
    };
    logging::init_from_config(&log_config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, loaded?, cli.verbose).await,
        Commands::Templates => cli::templates::execute(),
        Commands::Providers => cli::providers::execute(),
        Commands::Config(args) => cli::config::execute(args, loaded),
    }
}
