//! Simulation model, runner, sweeps, and result storage for orgsim.
//!
//! This crate turns a topology, a behavior kind, and a parameter map into
//! packaged results. A run builds a [`SimulationModel`], steps it under a
//! [`SimulationRunner`], and persists the [`SimulationResult`] through a
//! [`ResultStore`]. The [`ParameterSweepEngine`] repeats that for every
//! point of a one- or two-parameter grid.
//!
//! # Modules
//!
//! - [`model`] -- Model construction and the simultaneous-update step.
//! - [`metrics`] -- Per-step metric records and time-series columns.
//! - [`summary`] -- Behavior-specific terminal summaries.
//! - [`runner`] -- Sequential run loop with cooperative cancellation.
//! - [`sweep`] -- Concurrent parameter sweeps.
//! - [`store`] -- [`ResultStore`] trait with file and in-memory stores.
//! - [`theory`] -- Static catalogue of behavior kinds.
//! - [`config`] -- Configuration loading from `orgsim-config.yaml`.
//! - [`error`] -- [`EngineError`] and [`SimulationError`].
//!
//! [`SimulationResult`]: orgsim_types::SimulationResult

pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod runner;
pub mod store;
pub mod summary;
pub mod sweep;
pub mod theory;

// Re-export primary types at crate root.
pub use config::{ConfigError, OrgsimConfig};
pub use error::{EngineError, SimulationError};
pub use metrics::{MetricsCollector, StepRecord};
pub use model::{SimulationModel, create_model};
pub use runner::{CancellationToken, SimulationRunner};
pub use store::{FileResultStore, MemoryResultStore, ResultStore, StoreError};
pub use sweep::{ParameterSweepEngine, SweepRequest};
pub use theory::{TheoryInfo, theories, theory};
