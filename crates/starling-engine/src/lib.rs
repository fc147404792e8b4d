//! Subsystem processes for the Starling simulation.
//!
//! Each subsystem is one process holding its own store connection: the
//! flow driver that owns the clock, the follower loops (social,
//! cluster, model intervenors, monitor), the reset runner that lays
//! down a fresh world, and the launcher that orchestrates a batch of
//! runs.
//!
//! # Modules
//!
//! - [`demo`] -- The built-in two-node reference model
//! - [`error`] -- Engine error type
//! - [`flow`] -- The driver loop
//! - [`launcher`] -- Batch orchestration and role dispatch
//! - [`monitor`] -- Per-generation sampling and JSON output
//! - [`reset`] -- The reset runner
//! - [`roles`] -- Model intervenor and cluster follower wrappers
//! - [`social`] -- The social follower loop

pub mod demo;
pub mod error;
pub mod flow;
pub mod launcher;
pub mod monitor;
pub mod reset;
pub mod roles;
pub mod social;

pub use error::EngineError;
pub use launcher::{model_for, open_client, run_launcher, run_role};
pub use monitor::{Monitor, OccupancyMonitor};
