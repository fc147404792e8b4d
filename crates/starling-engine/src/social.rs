//! The social subsystem.
//!
//! A follower that runs every agent's social pipeline once per
//! generation. Models without social behaviour simply produce no
//! communicative agents and the loop idles along with the clock.

use starling_core::{ClockBarrier, Model};
use starling_store::GraphClient;
use tracing::{info, warn};

use crate::error::EngineError;

/// Run the social loop until the clock reaches `run_length`.
///
/// # Errors
///
/// Fails if the clock can no longer be read.
pub async fn run_social(
    client: &GraphClient,
    barrier: &ClockBarrier,
    model: &dyn Model,
    run_length: u64,
) -> Result<(), EngineError> {
    info!(model = model.name(), run_length, "social subsystem started");
    loop {
        let now = barrier.now().await?;
        if now >= run_length {
            break;
        }
        for reference in client.agents_in_system().await? {
            let Some(id) = reference.id.as_num() else {
                continue;
            };
            let Some(mut agent) = model.social_agent(id) else {
                continue;
            };
            if let Err(error) = agent.socialise(client).await {
                warn!(agent = id, time = now, %error, "socialise failed, skipped");
            }
        }
        barrier.wait_past(now).await?;
    }
    info!(model = model.name(), "social subsystem finished");
    Ok(())
}
