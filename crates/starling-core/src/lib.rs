//! Simulation core for the Starling framework.
//!
//! Starling advances a population of agents through a shared world
//! graph in discrete generations. This crate holds the
//! store-independent protocol pieces every subsystem builds on: the
//! generation clock barrier, the check/apply intervenor loop, the agent
//! movement and social pipelines, the node and service contracts, the
//! model registry, and run configuration.
//!
//! # Modules
//!
//! - [`agent`] -- Mobile and communicative agent contracts
//! - [`clock`] -- The generation clock barrier
//! - [`config`] -- Typed YAML run configuration
//! - [`error`] -- Shared core error type
//! - [`intervenor`] -- The check/apply protocol and follower loop
//! - [`model`] -- The model registry trait
//! - [`node`] -- The node contract and queue handling
//! - [`service`] -- Node-attached services

pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod intervenor;
pub mod model;
pub mod node;
pub mod service;

// Re-export primary types for convenience.
pub use agent::{CommunicativeAgent, MobileAgent, MoveOutcome};
pub use clock::ClockBarrier;
pub use config::{ConfigError, SimulationConfig};
pub use error::CoreError;
pub use intervenor::{Intervenor, run_intervenor};
pub use model::Model;
pub use node::SimNode;
pub use service::Service;
