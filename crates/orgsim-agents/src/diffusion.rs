//! Diffusion of innovations: threshold adoption with time-decayed influence.
//!
//! A small seed set adopts at time 0. In every later step a non-adopter
//! sums the influence of its adopted neighbors, each worth
//! `max(0, 1 - influence_decay * (step - adoption_time))`, and adopts once
//! that sum divided by its degree reaches its own threshold. Adoption is
//! permanent.

use std::collections::BTreeMap;

use orgsim_network::GraphTopology;
use orgsim_types::{AdoptionCurve, NodeId, ParameterSet};
use rand::Rng;
use rand::seq::index;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::social_influence::finite_or_default;
use crate::state::DiffusionState;

/// Default fraction of the population seeded as adopters.
pub const DEFAULT_INITIAL_ADOPTERS: f64 = 0.05;

/// Default per-agent adoption threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default per-step decay of an adopter's influence.
pub const DEFAULT_INFLUENCE_DECAY: f64 = 0.1;

/// Rule parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffusionParams {
    /// Fraction of nodes sampled as seeds when no explicit list is given.
    pub initial_adopters: f64,
    /// Threshold for agents without an override.
    pub default_threshold: f64,
    /// Per-step decay of an adopter's influence.
    pub influence_decay: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            initial_adopters: DEFAULT_INITIAL_ADOPTERS,
            default_threshold: DEFAULT_THRESHOLD,
            influence_decay: DEFAULT_INFLUENCE_DECAY,
        }
    }
}

impl DiffusionParams {
    /// Read the rule parameters, falling back to defaults for missing names.
    ///
    /// `adoption_threshold` is accepted as an alias of `default_threshold`.
    pub fn from_parameters(params: &ParameterSet) -> Result<Self, AgentError> {
        let initial_adopters =
            finite_or_default(params, "initial_adopters", DEFAULT_INITIAL_ADOPTERS)?;
        unit_interval("initial_adopters", initial_adopters)?;

        let threshold_name = if params.contains("default_threshold") {
            "default_threshold"
        } else {
            "adoption_threshold"
        };
        let default_threshold = finite_or_default(params, threshold_name, DEFAULT_THRESHOLD)?;
        unit_interval(threshold_name, default_threshold)?;

        let influence_decay =
            finite_or_default(params, "influence_decay", DEFAULT_INFLUENCE_DECAY)?;
        if influence_decay < 0.0 {
            return Err(AgentError::invalid(
                "influence_decay",
                format!("{influence_decay} is negative"),
            ));
        }

        Ok(Self {
            initial_adopters,
            default_threshold,
            influence_decay,
        })
    }

    /// Number of seeds to sample from a population of `population` nodes.
    pub fn seed_count(&self, population: usize) -> usize {
        if population == 0 || self.initial_adopters <= 0.0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.initial_adopters * population as f64).round();
        // initial_adopters is within [0, 1], so scaled fits in usize.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = scaled as usize;
        count.clamp(1, population)
    }

    /// Weight of one adopted neighbor's influence at `step`.
    pub fn decayed_influence(&self, step: u64, adoption_time: i64) -> f64 {
        let now = i64::try_from(step).unwrap_or(i64::MAX);
        #[allow(clippy::cast_precision_loss)]
        let elapsed = now.saturating_sub(adoption_time) as f64;
        self.influence_decay.mul_add(-elapsed, 1.0).max(0.0)
    }

    /// Next state of an agent during step `step` (1-based), given its
    /// neighbors' pre-step states.
    ///
    /// Returns `None` when nothing changes: already adopted, isolated, or
    /// below threshold.
    pub fn next_state(
        &self,
        state: DiffusionState,
        neighbors: &[DiffusionState],
        step: u64,
    ) -> Option<DiffusionState> {
        if state.adopted || neighbors.is_empty() {
            return None;
        }
        let influence: f64 = neighbors
            .iter()
            .filter(|n| n.adopted)
            .map(|n| self.decayed_influence(step, n.adoption_time))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let k = neighbors.len() as f64;
        if influence / k >= state.adoption_threshold {
            Some(DiffusionState {
                adopted: true,
                adoption_time: i64::try_from(step).unwrap_or(i64::MAX),
                adoption_threshold: state.adoption_threshold,
            })
        } else {
            None
        }
    }
}

fn unit_interval(name: &str, x: f64) -> Result<(), AgentError> {
    if (0.0..=1.0).contains(&x) {
        Ok(())
    } else {
        Err(AgentError::invalid(name, format!("{x} is outside [0, 1]")))
    }
}

/// Initial diffusion state for every node, in node-index order.
///
/// Thresholds come from the `adoption_thresholds` parameter, then the
/// node's `adoption_threshold` attribute, then `default_threshold`. Seeds
/// come from `seed_nodes` when it is a non-empty list, otherwise they are
/// sampled without replacement using `rng`.
pub fn initial_states<R: Rng + ?Sized>(
    topology: &GraphTopology,
    params: &ParameterSet,
    rule: &DiffusionParams,
    rng: &mut R,
) -> Result<Vec<DiffusionState>, AgentError> {
    let overrides = threshold_overrides(params)?;
    for key in overrides.keys() {
        if !topology.contains(&key.as_str().into()) {
            warn!(node = %key, "adoption_thresholds names a node that is not in the topology");
        }
    }

    let mut states = Vec::with_capacity(topology.node_count());
    for node in topology.nodes() {
        let threshold = if let Some(&x) = overrides.get(node.id.as_str()) {
            unit_interval("adoption_thresholds", x)?;
            x
        } else if let Some(value) = node.attributes.get("adoption_threshold") {
            let Some(x) = value.as_f64() else {
                return Err(AgentError::invalid(
                    "adoption_threshold",
                    format!("node {} has a non-numeric threshold attribute", node.id),
                ));
            };
            unit_interval("adoption_threshold", x)?;
            x
        } else {
            rule.default_threshold
        };
        states.push(DiffusionState::pending(threshold));
    }

    let seeds = match explicit_seeds(params)? {
        Some(ids) => ids
            .into_iter()
            .map(|id| topology.index_of(&id).ok_or(AgentError::UnknownSeedNode(id)))
            .collect::<Result<Vec<_>, _>>()?,
        None => {
            let population = topology.node_count();
            index::sample(rng, population, rule.seed_count(population)).into_vec()
        }
    };
    for i in &seeds {
        if let Some(state) = states.get_mut(*i) {
            *state = DiffusionState::seeded(state.adoption_threshold);
        }
    }
    debug!(seeds = seeds.len(), "Seeded initial adopters");

    Ok(states)
}

fn threshold_overrides(params: &ParameterSet) -> Result<BTreeMap<String, f64>, AgentError> {
    match params.get("adoption_thresholds") {
        None | Some(serde_json::Value::Null) => Ok(BTreeMap::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| AgentError::invalid("adoption_thresholds", e.to_string())),
    }
}

fn explicit_seeds(params: &ParameterSet) -> Result<Option<Vec<NodeId>>, AgentError> {
    match params.get("seed_nodes") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => {
            let ids: Vec<NodeId> = serde_json::from_value(value.clone())
                .map_err(|e| AgentError::invalid("seed_nodes", e.to_string()))?;
            Ok(if ids.is_empty() { None } else { Some(ids) })
        }
    }
}

/// Number of adopters in a population.
pub fn adopted_count(states: &[DiffusionState]) -> usize {
    states.iter().filter(|s| s.adopted).count()
}

/// Fraction of the population that has adopted; `0.0` when empty.
pub fn adoption_rate(states: &[DiffusionState]) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = adopted_count(states) as f64 / states.len() as f64;
    rate
}

/// Agents that adopted during the step that just completed.
///
/// `completed_step == 0` is the seeded initial state, which reports none.
pub fn new_adoptions(states: &[DiffusionState], completed_step: u64) -> usize {
    if completed_step == 0 {
        return 0;
    }
    let Ok(step) = i64::try_from(completed_step) else {
        return 0;
    };
    states
        .iter()
        .filter(|s| s.adopted && s.adoption_time == step)
        .count()
}

/// First series index at which the adopted count reaches
/// `floor(fraction * population)`, or `-1`.
pub fn time_to_fraction(adoption_rates: &[f64], population: usize, fraction: f64) -> i64 {
    #[allow(clippy::cast_precision_loss)]
    let n = population as f64;
    let target = (fraction * n).floor();
    adoption_rates
        .iter()
        .position(|rate| (rate * n).round() >= target)
        .and_then(|i| i64::try_from(i).ok())
        .unwrap_or(-1)
}

/// Shape of the adoption curve from the new-adoptions series.
///
/// A peak strictly inside a series longer than three points is the
/// signature of an S-curve; anything else is reported as linear.
pub fn adoption_curve(new_adoptions: &[i64]) -> AdoptionCurve {
    if new_adoptions.len() <= 3 {
        return AdoptionCurve::Linear;
    }
    let mut peak = 0;
    let mut best = i64::MIN;
    for (i, &v) in new_adoptions.iter().enumerate() {
        if v > best {
            best = v;
            peak = i;
        }
    }
    if peak > 0 && peak < new_adoptions.len().saturating_sub(1) {
        AdoptionCurve::SShaped
    } else {
        AdoptionCurve::Linear
    }
}
