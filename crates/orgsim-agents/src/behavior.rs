//! The behavior rule a model runs under, as a closed enum.
//!
//! [`Behavior`] pairs a [`BehaviorKind`] with its parsed parameters and
//! dispatches initialization and per-agent updates with a `match`. Kinds
//! without dynamics become [`Behavior::Inert`]: their agents carry
//! [`VariantState::Inert`] and are never updated.

use orgsim_network::GraphTopology;
use orgsim_types::{BehaviorKind, ParameterSet};
use rand::Rng;
use tracing::warn;

use crate::diffusion::{self, DiffusionParams};
use crate::error::AgentError;
use crate::social_influence::{self, SocialInfluenceParams};
use crate::state::{AgentState, SocialInfluenceState, VariantState};

/// Names read by every kind: the seed and the echoed population size.
const SHARED_PARAMETERS: [&str; 2] = ["random_seed", "num_agents"];

/// Parameter names `kind` understands, besides the shared ones.
pub const fn known_parameters(kind: BehaviorKind) -> &'static [&'static str] {
    match kind {
        BehaviorKind::SocialInfluence => {
            &["influence_strength", "conformity_bias", "initial_opinions"]
        }
        BehaviorKind::DiffusionOfInnovations => &[
            "initial_adopters",
            "default_threshold",
            "adoption_threshold",
            "influence_decay",
            "seed_nodes",
            "adoption_thresholds",
        ],
        BehaviorKind::TeamAssembly => &["skill_weight", "social_weight", "team_stability"],
        BehaviorKind::OrganizationalLearning => &[
            "learning_rate",
            "forgetting_rate",
            "knowledge_transfer_efficiency",
        ],
    }
}

/// Names in `params` that `kind` does not read, in name order.
pub fn unknown_parameters(kind: BehaviorKind, params: &ParameterSet) -> Vec<&str> {
    let known = known_parameters(kind);
    params
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| !known.contains(name) && !SHARED_PARAMETERS.contains(name))
        .collect()
}

/// A behavior kind with its parameters resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Opinion dynamics.
    SocialInfluence(SocialInfluenceParams),
    /// Threshold adoption.
    Diffusion(DiffusionParams),
    /// A catalogued kind without dynamics.
    Inert(BehaviorKind),
}

impl Behavior {
    /// Resolve the rule for `kind` from a parameter map.
    ///
    /// Names the kind does not read are ignored with a warning.
    pub fn from_parameters(kind: BehaviorKind, params: &ParameterSet) -> Result<Self, AgentError> {
        for name in unknown_parameters(kind, params) {
            warn!(kind = %kind, parameter = name, "Ignoring unknown parameter");
        }
        Ok(match kind {
            BehaviorKind::SocialInfluence => {
                Self::SocialInfluence(SocialInfluenceParams::from_parameters(params)?)
            }
            BehaviorKind::DiffusionOfInnovations => {
                Self::Diffusion(DiffusionParams::from_parameters(params)?)
            }
            BehaviorKind::TeamAssembly | BehaviorKind::OrganizationalLearning => Self::Inert(kind),
        })
    }

    /// The kind this rule implements.
    pub const fn kind(&self) -> BehaviorKind {
        match self {
            Self::SocialInfluence(_) => BehaviorKind::SocialInfluence,
            Self::Diffusion(_) => BehaviorKind::DiffusionOfInnovations,
            Self::Inert(kind) => *kind,
        }
    }

    /// Whether metrics are recorded once before the first step.
    pub const fn records_initial_state(&self) -> bool {
        matches!(self, Self::Diffusion(_))
    }

    /// Build one agent per topology node, in node-index order.
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        topology: &GraphTopology,
        params: &ParameterSet,
        rng: &mut R,
    ) -> Result<Vec<AgentState>, AgentError> {
        let variants: Vec<VariantState> = match self {
            Self::SocialInfluence(_) => social_influence::initial_opinions(topology, params, rng)?
                .into_iter()
                .map(VariantState::SocialInfluence)
                .collect(),
            Self::Diffusion(rule) => diffusion::initial_states(topology, params, rule, rng)?
                .into_iter()
                .map(VariantState::Diffusion)
                .collect(),
            Self::Inert(_) => vec![VariantState::Inert; topology.node_count()],
        };
        Ok(topology
            .nodes()
            .iter()
            .zip(variants)
            .map(|(node, variant)| AgentState::new(node.id.clone(), node.attributes.clone(), variant))
            .collect())
    }

    /// Apply the rule to the agent at `index` during step `step`.
    ///
    /// `current` and `neighbors` are pre-step states. Returns the new state,
    /// or `None` when the agent is unchanged.
    pub fn apply(
        &self,
        index: usize,
        current: VariantState,
        neighbors: &[VariantState],
        step: u64,
    ) -> Result<Option<VariantState>, AgentError> {
        match self {
            Self::SocialInfluence(rule) => {
                let mismatch = || AgentError::StateMismatch {
                    expected: BehaviorKind::SocialInfluence,
                    index,
                };
                let opinion = current.opinion().ok_or_else(mismatch)?;
                let neighbor_opinions = neighbors
                    .iter()
                    .map(|n| n.opinion().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rule
                    .next_opinion(opinion, &neighbor_opinions)
                    .map(|opinion| VariantState::SocialInfluence(SocialInfluenceState { opinion })))
            }
            Self::Diffusion(rule) => {
                let mismatch = || AgentError::StateMismatch {
                    expected: BehaviorKind::DiffusionOfInnovations,
                    index,
                };
                let state = current.diffusion().copied().ok_or_else(mismatch)?;
                let neighbor_states = neighbors
                    .iter()
                    .map(|n| n.diffusion().copied().ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rule
                    .next_state(state, &neighbor_states, step)
                    .map(VariantState::Diffusion))
            }
            Self::Inert(_) => Ok(None),
        }
    }
}
