//! Run orchestration.
//!
//! A run is one reset followed by every configured subsystem executing
//! to the run length. With the postgres store each subsystem is its own
//! OS process (this binary re-invoked with a role argument) sharing the
//! store; with the in-memory store there is nothing to share between
//! processes, so subsystems run as tasks inside the launcher process
//! over one backend.

use std::path::Path;
use std::sync::Arc;

use starling_core::{ClockBarrier, Model, SimulationConfig};
use starling_store::{GraphClient, MemoryBackend, PostgresBackend, PostgresConfig};
use tokio::process::Command;
use tracing::{info, warn};

use crate::demo::DemoModel;
use crate::error::EngineError;
use crate::monitor::OccupancyMonitor;
use crate::reset::run_reset;
use crate::{flow, monitor, roles, social};

/// Resolve a spec name to a model object.
///
/// # Errors
///
/// Fails if no model is registered under `name`.
pub fn model_for(name: &str) -> Result<Arc<dyn Model>, EngineError> {
    match name {
        "demo" => Ok(Arc::new(DemoModel)),
        other => Err(EngineError::UnknownModel {
            name: other.to_owned(),
        }),
    }
}

/// Open a store handle per the configuration. Each subsystem process
/// owns its own connection.
///
/// # Errors
///
/// Fails if the backend kind is unknown or the store is unreachable.
pub async fn open_client(config: &SimulationConfig) -> Result<GraphClient, EngineError> {
    let policy = config.retry.policy();
    match config.store.backend.as_str() {
        "memory" => Ok(GraphClient::new(Arc::new(MemoryBackend::new()), policy)),
        "postgres" => {
            let pg = PostgresConfig::new(&config.store.postgres_url)
                .with_max_connections(config.store.max_connections);
            let backend = PostgresBackend::connect(&pg).await?;
            backend.run_migrations().await?;
            Ok(GraphClient::new(Arc::new(backend), policy))
        }
        other => Err(EngineError::Launcher {
            message: format!("unknown store backend: {other}"),
        }),
    }
}

/// Dispatch one subsystem role over an open store handle.
///
/// # Errors
///
/// Fails if the role cannot run to completion.
pub async fn run_role(
    role: &str,
    client: &GraphClient,
    model: &dyn Model,
    config: &SimulationConfig,
) -> Result<(), EngineError> {
    let barrier = ClockBarrier::new(client.clone(), config.clock.poll_interval());
    let run_length = config.run.run_length;
    match role {
        "flow" => flow::run_flow(client, &barrier, model, run_length).await,
        "social" => social::run_social(client, &barrier, model, run_length).await,
        "cluster" => roles::run_cluster(client, &barrier, run_length).await,
        "monitor" => {
            let mut sampler = OccupancyMonitor;
            monitor::run_monitor(
                client,
                &barrier,
                run_length,
                &mut sampler,
                Path::new("."),
            )
            .await?;
            Ok(())
        }
        other => roles::run_model_role(client, &barrier, model, run_length, other).await,
    }
}

/// Run the configured batch of runs.
///
/// # Errors
///
/// Fails if a reset fails or any subsystem fails.
pub async fn run_launcher(
    config: &SimulationConfig,
    config_path: &Path,
) -> Result<(), EngineError> {
    let model = model_for(&config.run.spec_name)?;
    for run_number in 1..=config.run.runs {
        info!(run_number, runs = config.run.runs, "starting run");
        if config.store.backend == "memory" {
            run_in_process(config, Arc::clone(&model), run_number).await?;
        } else {
            run_as_processes(config, config_path, model.as_ref(), run_number).await?;
        }
    }
    Ok(())
}

/// One run with every subsystem as an in-process task over a shared
/// in-memory backend.
async fn run_in_process(
    config: &SimulationConfig,
    model: Arc<dyn Model>,
    run_number: u64,
) -> Result<(), EngineError> {
    let client = open_client(config).await?;
    run_reset(&client, &config.run, model.as_ref(), run_number).await?;

    let mut tasks = Vec::with_capacity(config.run.modules.len());
    for role in &config.run.modules {
        let role = role.clone();
        let client = client.clone();
        let model = Arc::clone(&model);
        let config = config.clone();
        tasks.push(tokio::spawn(async move {
            run_role(&role, &client, model.as_ref(), &config).await
        }));
    }
    for task in tasks {
        task.await
            .map_err(|e| EngineError::Launcher {
                message: format!("subsystem task panicked: {e}"),
            })??;
    }
    Ok(())
}

/// One run with every subsystem as its own OS process sharing the
/// external store.
async fn run_as_processes(
    config: &SimulationConfig,
    config_path: &Path,
    model: &dyn Model,
    run_number: u64,
) -> Result<(), EngineError> {
    let client = open_client(config).await?;
    run_reset(&client, &config.run, model, run_number).await?;

    let exe = std::env::current_exe()?;
    let mut children = Vec::with_capacity(config.run.modules.len());
    for role in &config.run.modules {
        let child = Command::new(&exe)
            .arg("--role")
            .arg(role)
            .arg("--config")
            .arg(config_path)
            .spawn()
            .map_err(|e| EngineError::Launcher {
                message: format!("failed to spawn {role}: {e}"),
            })?;
        info!(role, "subsystem process spawned");
        children.push((role.clone(), child));
    }

    for (role, mut child) in children {
        let status = child.wait().await?;
        if status.success() {
            info!(role, "subsystem process finished");
        } else {
            warn!(role, %status, "subsystem process failed");
            return Err(EngineError::Launcher {
                message: format!("{role} exited with {status}"),
            });
        }
    }
    Ok(())
}
