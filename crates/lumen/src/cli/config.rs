//! The `lumen config` command for configuration management.

use clap::{Args, Subcommand};
use lumen_core::{Config, ConfigError, ModelConfig, ProviderRegistry};

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the active configuration with the API key masked
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command.
///
/// `loaded` is the result of loading the file and environment; `path` and
/// `init` work even when it failed.
pub fn execute(args: ConfigArgs, loaded: Result<Config, ConfigError>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = loaded?;
            let registry = ProviderRegistry::with_builtins();
            let model = ModelConfig::resolve(&config, &registry)?;
            super::print_json(&model.summary(config.image.strict_url_validation))?;
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Write default config; keys belong in the environment
            let config = Config::default();
            let toml = config.to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}
