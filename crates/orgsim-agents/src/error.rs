//! Error types for the orgsim-agents crate.
//!
//! Parameter problems surface while agents are being initialized, before a
//! simulation has an id. The remaining variants can only occur mid-run and
//! are wrapped into a simulation error by the runner.

use orgsim_types::{BehaviorKind, NodeId};

/// Errors that can occur while initializing or updating agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A parameter has the wrong type or is out of range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter (or node attribute) name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An explicit seed node is not part of the topology.
    #[error("seed node {0} is not in the topology")]
    UnknownSeedNode(NodeId),

    /// An agent's state belongs to a different behavior than the rule.
    #[error("agent at index {index} does not carry {expected} state")]
    StateMismatch {
        /// The rule that was applied.
        expected: BehaviorKind,
        /// Arena index of the agent.
        index: usize,
    },

    /// Opinion variance exceeded the theoretical maximum of a `[0, 1]`
    /// population, which means an opinion escaped its bounds.
    #[error("opinion variance {variance} exceeds 0.25")]
    VarianceOutOfRange {
        /// The measured variance.
        variance: f64,
    },
}

impl AgentError {
    /// Shorthand for [`AgentError::InvalidParameter`].
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
