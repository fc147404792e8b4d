//! Follower wrappers for model intervenors.
//!
//! Population, balancer and structure are all model-defined intervenors
//! run through the same follower loop; cluster is the framework's own.
//! Arbitrary extra role names configured for a run are forwarded to the
//! model's registry too.

use starling_cluster::ClusterIntervenor;
use starling_core::{ClockBarrier, Model, run_intervenor};
use starling_store::GraphClient;
use tracing::info;

use crate::error::EngineError;

/// Run a model-registered intervenor role as a follower loop.
///
/// # Errors
///
/// Fails if the model has no intervenor for `role`, or if the clock can
/// no longer be read.
pub async fn run_model_role(
    client: &GraphClient,
    barrier: &ClockBarrier,
    model: &dyn Model,
    run_length: u64,
    role: &str,
) -> Result<(), EngineError> {
    let Some(mut intervenor) = model.intervenor(role) else {
        return Err(EngineError::UnknownRole {
            role: role.to_owned(),
        });
    };
    run_intervenor(client, barrier, run_length, intervenor.as_mut()).await?;
    Ok(())
}

/// Run the framework clustering intervenor: initialise once, then the
/// follower loop.
///
/// # Errors
///
/// Fails if initialisation fails or the clock can no longer be read.
pub async fn run_cluster(
    client: &GraphClient,
    barrier: &ClockBarrier,
    run_length: u64,
) -> Result<(), EngineError> {
    let mut intervenor = ClusterIntervenor::new();
    intervenor.initialise(client).await?;
    info!("clustering initialised");
    run_intervenor(client, barrier, run_length, &mut intervenor).await?;
    Ok(())
}
