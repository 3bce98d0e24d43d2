//! Error types for model construction, runs, sweeps, and persistence.
//!
//! Two classes of failure exist. Validation problems ([`EngineError`]
//! variants other than [`EngineError::Simulation`]) are raised before a
//! simulation id exists and leave no partial state behind. Failures after
//! that point are [`SimulationError`] values carrying the id of the run.

use orgsim_agents::AgentError;
use orgsim_network::NetworkError;
use orgsim_types::{SimulationId, UnknownBehaviorKind};

use crate::store::StoreError;

/// A failure while a simulation was running or being summarized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "simulation {} failed: {message}",
    .simulation_id.as_ref().map_or("<unassigned>", SimulationId::as_str)
)]
pub struct SimulationError {
    /// Id of the failed run, when one had been allocated.
    pub simulation_id: Option<SimulationId>,
    /// Human-readable description.
    pub message: String,
}

impl SimulationError {
    /// Wrap any displayable failure for the given run.
    pub fn new(simulation_id: Option<SimulationId>, message: impl Into<String>) -> Self {
        Self {
            simulation_id,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the engine API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The behavior identifier is not one of the catalogued kinds.
    #[error("invalid behavior kind: {0}")]
    InvalidBehaviorKind(#[from] UnknownBehaviorKind),

    /// The topology failed validation.
    #[error("invalid topology: {0}")]
    InvalidTopology(#[from] NetworkError),

    /// A sweep did not name one or two parameters with values.
    #[error("invalid sweep grid: {0}")]
    InvalidSweepGrid(String),

    /// A parameter has the wrong type or is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A run failed after its id was allocated.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// No stored result exists under the id (or it is unreadable).
    #[error("result not found: {id}")]
    ResultNotFound {
        /// The simulation or sweep id that was looked up.
        id: String,
    },

    /// Persisting or reading a result failed.
    #[error("result store error: {0}")]
    Store(StoreError),

    /// A sweep worker task could not be driven to completion.
    #[error("sweep worker failed: {0}")]
    Worker(String),
}

impl From<AgentError> for EngineError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidParameter { name, reason } => Self::InvalidParameter { name, reason },
            AgentError::UnknownSeedNode(id) => Self::InvalidParameter {
                name: "seed_nodes".to_owned(),
                reason: format!("node {id} is not in the topology"),
            },
            other => Self::Simulation(SimulationError::new(None, other.to_string())),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } | StoreError::Corrupt { id, .. } => {
                Self::ResultNotFound { id }
            }
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn simulation_error_names_the_run() {
        let err = SimulationError::new(Some(SimulationId::new("run-1")), "boom");
        assert_eq!(err.to_string(), "simulation run-1 failed: boom");
        let err = SimulationError::new(None, "boom");
        assert_eq!(err.to_string(), "simulation <unassigned> failed: boom");
    }

    #[test]
    fn agent_parameter_errors_stay_validation_errors() {
        let err: EngineError = AgentError::invalid("influence_strength", "expected a number").into();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        let err: EngineError = AgentError::VarianceOutOfRange { variance: 0.3 }.into();
        assert!(matches!(err, EngineError::Simulation(_)));
    }

    #[test]
    fn missing_results_map_to_not_found() {
        let err: EngineError = StoreError::NotFound {
            id: "abc".to_owned(),
        }
        .into();
        assert!(matches!(err, EngineError::ResultNotFound { ref id } if id == "abc"));
    }
}
