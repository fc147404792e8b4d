//! The generation clock barrier.
//!
//! Time is a single shared counter stored on the clock entity. One
//! subsystem (the flow driver) advances it exactly once per generation,
//! strictly after all of its per-generation writes; every other
//! subsystem is a follower that waits for the counter to move before
//! starting its next cycle. After N driver generations the clock reads
//! N.
//!
//! Followers poll with a configured interval rather than spinning; the
//! interval is explicit configuration, not a hidden constant.

use std::time::Duration;

use starling_store::GraphClient;
use tracing::debug;

use crate::error::CoreError;

/// Synchronizes a subsystem with the shared generation clock.
#[derive(Debug, Clone)]
pub struct ClockBarrier {
    client: GraphClient,
    poll_interval: Duration,
}

impl ClockBarrier {
    /// Build a barrier over a store handle.
    pub const fn new(client: GraphClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Read the current generation.
    ///
    /// # Errors
    ///
    /// Fails if the clock entity is absent.
    pub async fn now(&self) -> Result<u64, CoreError> {
        Ok(self.client.get_time().await?)
    }

    /// Advance the clock by one generation. Driver role only; called
    /// strictly after all per-generation writes.
    ///
    /// # Errors
    ///
    /// Fails if the clock entity is absent.
    pub async fn advance(&self) -> Result<u64, CoreError> {
        let next = self.client.tick().await?;
        debug!(time = next, "clock advanced");
        Ok(next)
    }

    /// Block until the clock moves past `observed`, returning the new
    /// value. Follower role.
    ///
    /// # Errors
    ///
    /// Fails if the clock entity is absent.
    pub async fn wait_past(&self, observed: u64) -> Result<u64, CoreError> {
        loop {
            let now = self.client.get_time().await?;
            if now > observed {
                return Ok(now);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
