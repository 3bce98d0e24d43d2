//! Error types for the `orgsim` binary.
//!
//! [`CliError`] wraps every failure a command can hit so handlers can
//! propagate with `?`; `main` reports it, and config load failures,
//! through `anyhow`.

use std::path::PathBuf;

use orgsim_core::{EngineError, SimulationError};

/// Top-level error for the `orgsim` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// An input file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadInput {
        /// File that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An input file is not the expected JSON shape.
    #[error("cannot parse {}: {source}", path.display())]
    ParseInput {
        /// File that was requested.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A command-line argument is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Model construction or sweep validation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A run failed after it started.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// The blocking run task panicked or was aborted.
    #[error("run task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// Writing output failed.
    #[error("cannot encode output: {source}")]
    Output {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
