//! The flow driver.
//!
//! Flow is the one subsystem that owns time. Each generation it readies
//! every node's agents, then advances the clock exactly once, strictly
//! after all of that generation's writes. Every other subsystem keys
//! off the advance.

use starling_core::{ClockBarrier, Model};
use starling_store::GraphClient;
use tracing::{info, warn};

use crate::error::EngineError;

/// Run the driver until the clock reaches `run_length`.
///
/// A node whose generation fails is logged and skipped; the clock still
/// advances so followers are never stranded.
///
/// # Errors
///
/// Fails if the clock can no longer be read or advanced.
pub async fn run_flow(
    client: &GraphClient,
    barrier: &ClockBarrier,
    model: &dyn Model,
    run_length: u64,
) -> Result<(), EngineError> {
    info!(model = model.name(), run_length, "flow driver started");
    loop {
        let now = barrier.now().await?;
        if now >= run_length {
            break;
        }
        for node in model.nodes() {
            if let Err(error) = node.agents_ready(client, model, now).await {
                warn!(
                    node = node.name(),
                    time = now,
                    %error,
                    "node generation failed, skipped"
                );
            }
        }
        let next = barrier.advance().await?;
        info!("T: {next}");
    }
    info!(model = model.name(), "flow driver finished");
    Ok(())
}
