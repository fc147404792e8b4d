//! The monitor subsystem.
//!
//! A follower that samples the world once per generation and, at the
//! end of the run, writes the collected records as JSON named after the
//! run tag. Plotting is downstream tooling's concern; the file is the
//! interface.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use starling_core::{ClockBarrier, CoreError};
use starling_store::GraphClient;
use tracing::{info, warn};

use crate::error::EngineError;

/// A model-defined per-generation sampler.
#[async_trait]
pub trait Monitor: Send {
    /// Sample the world at one generation into a JSON record.
    async fn snapshot(&mut self, client: &GraphClient, time: u64) -> Result<Value, CoreError>;
}

/// Model-independent default sampler: generation, population size, and
/// per-node occupancy.
#[derive(Debug, Default)]
pub struct OccupancyMonitor;

#[async_trait]
impl Monitor for OccupancyMonitor {
    async fn snapshot(&mut self, client: &GraphClient, time: u64) -> Result<Value, CoreError> {
        let mut occupancy = serde_json::Map::new();
        for node in client.nodes_in_system().await? {
            let count = client.get_node_agents(&node).await?.len();
            occupancy.insert(node.id.to_string(), Value::from(count));
        }
        Ok(serde_json::json!({
            "time": time,
            "sampled_at": Utc::now().to_rfc3339(),
            "agents": client.agents_in_system().await?.len(),
            "occupancy": occupancy,
        }))
    }
}

/// Run the monitor loop, then write `<run_name>_monitor.json` under
/// `output_dir`. Returns the written path.
///
/// A failed snapshot loses that generation's record, not the run.
///
/// # Errors
///
/// Fails if the clock can no longer be read or the output file cannot
/// be written.
pub async fn run_monitor(
    client: &GraphClient,
    barrier: &ClockBarrier,
    run_length: u64,
    monitor: &mut dyn Monitor,
    output_dir: &Path,
) -> Result<PathBuf, EngineError> {
    info!(run_length, "monitor started");
    let mut records: Vec<Value> = Vec::new();
    loop {
        let now = barrier.now().await?;
        match monitor.snapshot(client, now).await {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(time = now, %error, "snapshot failed, record lost");
            }
        }
        if now >= run_length {
            break;
        }
        barrier.wait_past(now).await?;
    }

    let run_name = client.get_run_name().await?;
    let path = output_dir.join(format!("{run_name}_monitor.json"));
    std::fs::write(&path, serde_json::to_string_pretty(&records)?)?;
    info!(path = %path.display(), records = records.len(), "monitor output written");
    Ok(path)
}
