//! Per-agent state.
//!
//! Agents are created one per topology node and live in a flat arena in
//! node-index order. Static attributes are copied from the node; the
//! mutable part is a small `Copy` enum so the model can snapshot the whole
//! population cheaply before every step.

use std::collections::BTreeMap;

use orgsim_types::{NodeId, Scalar};
use serde::{Deserialize, Serialize};

/// Continuous opinion state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialInfluenceState {
    /// Attitude position, always within `[0, 1]`.
    pub opinion: f64,
}

/// Innovation adoption state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionState {
    /// Whether the agent has adopted. Never reverts once true.
    pub adopted: bool,
    /// Step of adoption; `0` for seed adopters, `-1` before adoption.
    pub adoption_time: i64,
    /// Decayed neighbor-influence fraction needed to adopt.
    pub adoption_threshold: f64,
}

impl DiffusionState {
    /// A non-adopter with the given threshold.
    pub const fn pending(adoption_threshold: f64) -> Self {
        Self {
            adopted: false,
            adoption_time: -1,
            adoption_threshold,
        }
    }

    /// A seed adopter (adopted at time 0).
    pub const fn seeded(adoption_threshold: f64) -> Self {
        Self {
            adopted: true,
            adoption_time: 0,
            adoption_threshold,
        }
    }
}

/// The behavior-specific mutable part of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum VariantState {
    /// Opinion dynamics.
    SocialInfluence(SocialInfluenceState),
    /// Threshold adoption.
    Diffusion(DiffusionState),
    /// Behaviors without dynamics carry no state.
    Inert,
}

impl VariantState {
    /// Opinion, when this is social influence state.
    pub const fn opinion(&self) -> Option<f64> {
        match self {
            Self::SocialInfluence(s) => Some(s.opinion),
            _ => None,
        }
    }

    /// Diffusion state, when this is one.
    pub const fn diffusion(&self) -> Option<&DiffusionState> {
        match self {
            Self::Diffusion(s) => Some(s),
            _ => None,
        }
    }
}

/// One agent: the node it sits on, its static attributes, and its state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Node the agent is placed on.
    pub id: NodeId,
    /// Static attributes copied from the node.
    pub attributes: BTreeMap<String, Scalar>,
    /// Mutable behavior state.
    pub variant: VariantState,
}

impl AgentState {
    /// Build an agent.
    pub const fn new(
        id: NodeId,
        attributes: BTreeMap<String, Scalar>,
        variant: VariantState,
    ) -> Self {
        Self {
            id,
            attributes,
            variant,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn variant_state_is_tagged() {
        let state = VariantState::SocialInfluence(SocialInfluenceState { opinion: 0.5 });
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["variant"], "social_influence");
        assert_eq!(json["opinion"], 0.5);
    }

    #[test]
    fn diffusion_constructors() {
        let pending = DiffusionState::pending(0.3);
        assert!(!pending.adopted);
        assert_eq!(pending.adoption_time, -1);
        let seeded = DiffusionState::seeded(0.3);
        assert!(seeded.adopted);
        assert_eq!(seeded.adoption_time, 0);
    }
}
