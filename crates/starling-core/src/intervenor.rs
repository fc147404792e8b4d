//! The intervenor protocol.
//!
//! An intervenor is a follower subsystem that inspects the world once
//! per generation and optionally applies a change set: population
//! top-up, attribute rebalancing, topology edits, cluster maintenance.
//! The read phase and the write phase are separate calls so a run can
//! always be reasoned about as check-then-apply; the change set
//! computed by `check` is carried on the intervenor itself, which keeps
//! the trait usable as a trait object.

use async_trait::async_trait;
use starling_store::GraphClient;
use tracing::{info, warn};

use crate::clock::ClockBarrier;
use crate::error::CoreError;

/// A per-generation check/apply subsystem.
#[async_trait]
pub trait Intervenor: Send {
    /// Role name, used in logs.
    fn name(&self) -> &str;

    /// Inspect the world and compute this generation's change set,
    /// storing it on the intervenor. Returns whether a change is
    /// pending. Read-only with respect to the store.
    async fn check(&mut self, client: &GraphClient) -> Result<bool, CoreError>;

    /// Apply the change set computed by the preceding `check`.
    async fn apply_change(&mut self, client: &GraphClient) -> Result<(), CoreError>;
}

/// Run an intervenor as a follower loop: one check/apply pair per
/// generation until the clock reaches the run length.
///
/// A failed cycle is logged and abandoned; the loop continues with the
/// next generation. Only clock failures end the loop early.
///
/// # Errors
///
/// Fails if the clock can no longer be read.
pub async fn run_intervenor(
    client: &GraphClient,
    barrier: &ClockBarrier,
    run_length: u64,
    intervenor: &mut dyn Intervenor,
) -> Result<(), CoreError> {
    info!(role = intervenor.name(), run_length, "intervenor started");
    loop {
        let now = barrier.now().await?;
        if now >= run_length {
            break;
        }
        match intervenor.check(client).await {
            Ok(true) => {
                if let Err(error) = intervenor.apply_change(client).await {
                    warn!(
                        role = intervenor.name(),
                        time = now,
                        %error,
                        "apply failed, cycle abandoned"
                    );
                }
            }
            Ok(false) => {}
            Err(error) => {
                warn!(
                    role = intervenor.name(),
                    time = now,
                    %error,
                    "check failed, cycle abandoned"
                );
            }
        }
        barrier.wait_past(now).await?;
    }
    info!(role = intervenor.name(), "intervenor finished");
    Ok(())
}
