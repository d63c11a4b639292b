//! Dynacomp CLI
//!
//! Command-line interface for the dynacomp compressor.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use dynacomp::cli::{commands, Cli, Commands, ConfigCommand};
use dynacomp::config::Settings;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Dynacomp v{}", env!("CARGO_PKG_VERSION"));

    let settings_path = Settings::resolve_path(cli.config.as_deref());

    match cli.command {
        Commands::Process {
            input,
            output,
            options,
        } => commands::process(&settings_path, &input, &output, &options)
            .with_context(|| format!("failed to process {}", input.display()))?,
        Commands::Batch {
            input_dir,
            output_dir,
            options,
        } => {
            commands::batch(&settings_path, &input_dir, &output_dir, &options)
                .with_context(|| format!("batch over {} failed", input_dir.display()))?;
        }
        Commands::Analyze { input, options } => {
            commands::analyze(&settings_path, &input, &options)
                .with_context(|| format!("failed to analyze {}", input.display()))?;
        }
        Commands::Config(ConfigCommand::Show) => commands::config_show(&settings_path)?,
        Commands::Config(ConfigCommand::Set { target, strength }) => {
            commands::config_set(&settings_path, target, strength)
                .with_context(|| format!("could not update {}", settings_path.display()))?
        }
        Commands::Config(ConfigCommand::Reset) => commands::config_reset(&settings_path)?,
    }

    Ok(())
}
