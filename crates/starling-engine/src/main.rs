//! Starling binary.
//!
//! One executable serves every role: invoked without arguments it
//! launches the configured batch of runs; invoked with `--role` it runs
//! a single subsystem against the shared store, which is how the
//! launcher re-invokes it per subsystem process.

use std::path::PathBuf;

use clap::Parser;
use starling_core::SimulationConfig;
use starling_engine::launcher;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "starling", about = "Multi-process graph-backed simulation runner")]
struct Cli {
    /// Subsystem role to run; `launch` orchestrates the whole batch.
    #[arg(long, default_value = "launch")]
    role: String,

    /// Path to the YAML configuration file.
    #[arg(long, default_value = "starling.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = SimulationConfig::from_file(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(role = cli.role, config = %cli.config.display(), "starling starting");

    if cli.role == "launch" {
        launcher::run_launcher(&config, &cli.config).await?;
    } else {
        let model = launcher::model_for(&config.run.spec_name)?;
        let client = launcher::open_client(&config).await?;
        launcher::run_role(&cli.role, &client, model.as_ref(), &config).await?;
    }

    info!(role = cli.role, "starling finished");
    Ok(())
}
