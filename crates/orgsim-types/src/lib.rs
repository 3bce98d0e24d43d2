//! Shared type definitions for the orgsim simulation engine.
//!
//! This crate is the single source of truth for the types that cross crate
//! and process boundaries. Result types flow downstream to `TypeScript` via
//! `ts-rs` for the analysis dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier newtypes (simulations, sweeps, graph nodes)
//! - [`enums`] -- Behavior kinds, run status, adoption curve labels
//! - [`values`] -- Scalar values and parameter maps
//! - [`results`] -- Simulation and sweep result records

pub mod enums;
pub mod ids;
pub mod results;
pub mod values;

// Re-export all public types at crate root for convenience.
pub use enums::{AdoptionCurve, BehaviorKind, RunStatus, UnknownBehaviorKind};
pub use ids::{NodeId, SimulationId, SweepId};
pub use results::{ParameterRange, SimulationResult, SweepGrid, SweepPoint, SweepResult};
pub use values::{ParameterSet, Scalar};
