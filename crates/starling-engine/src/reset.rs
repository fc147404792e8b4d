//! The reset runner.
//!
//! Runs strictly before any subsystem of a run: wipe the store, write
//! the run tag, zero the clock, then hand the model its four
//! world-building hooks in order.

use starling_core::{Model, config::RunConfig};
use starling_store::GraphClient;
use starling_types::RunTag;
use tracing::info;

use crate::error::EngineError;

/// Build the run tag for one run of a configured batch.
pub fn run_tag(run: &RunConfig, model_name: &str, run_number: u64) -> RunTag {
    RunTag {
        spec_name: model_name.to_owned(),
        reset_name: run.reset_name.clone(),
        pop_size: run.population,
        run_length: run.run_length,
        run_number,
    }
}

/// Reset the store for one run.
///
/// # Errors
///
/// Fails if the store is unreachable or a model hook fails.
pub async fn run_reset(
    client: &GraphClient,
    run: &RunConfig,
    model: &dyn Model,
    run_number: u64,
) -> Result<(), EngineError> {
    let tag = run_tag(run, model.name(), run_number);
    info!(tag = tag.format(), "resetting world");

    client.clear_database().await?;
    client.set_tag(&tag).await?;
    client.set_clock(0).await?;

    model.set_nodes(client).await?;
    model.set_edges(client).await?;
    model.set_services(client).await?;
    model.generate_population(client, run.population).await?;

    info!(
        population = run.population,
        run_length = run.run_length,
        "world reset complete"
    );
    Ok(())
}
