//! Social influence: continuous opinions pulled toward the neighborhood.
//!
//! Each step an agent moves toward the mean opinion of its neighbors by
//! `influence_strength + conformity_bias` times the gap, then clamps to
//! `[0, 1]`. Agents without neighbors keep their opinion.
//!
//! The population-level statistics (mean, variance, homogeneity, and the
//! number of opinion clusters) live here too, since only this behavior
//! produces opinions.

use std::collections::BTreeMap;

use orgsim_network::GraphTopology;
use orgsim_types::ParameterSet;
use rand::Rng;
use tracing::warn;

use crate::error::AgentError;
use crate::state::SocialInfluenceState;

/// Default weight of the pull toward the neighborhood mean.
pub const DEFAULT_INFLUENCE_STRENGTH: f64 = 0.1;

/// Default additional conformity pull.
pub const DEFAULT_CONFORMITY_BIAS: f64 = 0.3;

/// Largest variance a population of opinions in `[0, 1]` can have.
pub const MAX_OPINION_VARIANCE: f64 = 0.25;

/// Opinion gap that separates two subcultures.
pub const SUBCULTURE_GAP: f64 = 0.1;

/// Homogeneity above which a population counts as converged.
pub const CONVERGENCE_HOMOGENEITY: f64 = 0.95;

/// Slack for rounding when checking the variance bound.
const VARIANCE_EPSILON: f64 = 1e-9;

/// Rule parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocialInfluenceParams {
    /// Weight of the pull toward the neighborhood mean.
    pub influence_strength: f64,
    /// Additional conformity pull.
    pub conformity_bias: f64,
}

impl Default for SocialInfluenceParams {
    fn default() -> Self {
        Self {
            influence_strength: DEFAULT_INFLUENCE_STRENGTH,
            conformity_bias: DEFAULT_CONFORMITY_BIAS,
        }
    }
}

impl SocialInfluenceParams {
    /// Read the rule parameters, falling back to defaults for missing names.
    pub fn from_parameters(params: &ParameterSet) -> Result<Self, AgentError> {
        Ok(Self {
            influence_strength: finite_or_default(
                params,
                "influence_strength",
                DEFAULT_INFLUENCE_STRENGTH,
            )?,
            conformity_bias: finite_or_default(params, "conformity_bias", DEFAULT_CONFORMITY_BIAS)?,
        })
    }

    /// Next opinion given the current one and the neighbors' opinions.
    ///
    /// Returns `None` when there are no neighbors (no update).
    pub fn next_opinion(&self, opinion: f64, neighbor_opinions: &[f64]) -> Option<f64> {
        if neighbor_opinions.is_empty() {
            return None;
        }
        let delta = mean(neighbor_opinions) - opinion;
        let moved = self
            .conformity_bias
            .mul_add(delta, self.influence_strength.mul_add(delta, opinion));
        Some(moved.clamp(0.0, 1.0))
    }
}

/// Read a numeric parameter that must be finite when present.
pub(crate) fn finite_or_default(
    params: &ParameterSet,
    name: &str,
    default: f64,
) -> Result<f64, AgentError> {
    if !params.contains(name) {
        return Ok(default);
    }
    match params.get_f64(name) {
        Some(x) if x.is_finite() => Ok(x),
        Some(x) => Err(AgentError::invalid(name, format!("{x} is not finite"))),
        None => Err(AgentError::invalid(name, "expected a number")),
    }
}

/// Initial opinions for every node, in node-index order.
///
/// Priority per node: the `initial_opinions` parameter entry, then the
/// node's `opinion` attribute, then a uniform draw from `rng`. Draws happen
/// in node order and only for nodes that need one.
pub fn initial_opinions<R: Rng + ?Sized>(
    topology: &GraphTopology,
    params: &ParameterSet,
    rng: &mut R,
) -> Result<Vec<SocialInfluenceState>, AgentError> {
    let overrides = opinion_overrides(params)?;
    for key in overrides.keys() {
        if !topology.contains(&key.as_str().into()) {
            warn!(node = %key, "initial_opinions names a node that is not in the topology");
        }
    }

    let mut states = Vec::with_capacity(topology.node_count());
    for node in topology.nodes() {
        let opinion = if let Some(&x) = overrides.get(node.id.as_str()) {
            check_opinion("initial_opinions", x)?
        } else if let Some(value) = node.attributes.get("opinion") {
            let Some(x) = value.as_f64() else {
                return Err(AgentError::invalid(
                    "opinion",
                    format!("node {} has a non-numeric opinion attribute", node.id),
                ));
            };
            check_opinion("opinion", x)?
        } else {
            rng.random::<f64>()
        };
        states.push(SocialInfluenceState { opinion });
    }
    Ok(states)
}

fn opinion_overrides(params: &ParameterSet) -> Result<BTreeMap<String, f64>, AgentError> {
    match params.get("initial_opinions") {
        None | Some(serde_json::Value::Null) => Ok(BTreeMap::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| AgentError::invalid("initial_opinions", e.to_string())),
    }
}

fn check_opinion(name: &str, x: f64) -> Result<f64, AgentError> {
    if (0.0..=1.0).contains(&x) {
        Ok(x)
    } else {
        Err(AgentError::invalid(
            name,
            format!("opinion {x} is outside [0, 1]"),
        ))
    }
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Population variance; `0.0` for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n
}

/// Homogeneity `1 - variance / 0.25`, and exactly `1.0` at zero variance.
///
/// # Errors
///
/// [`AgentError::VarianceOutOfRange`] when the variance is above what a
/// population confined to `[0, 1]` can produce.
pub fn homogeneity(variance: f64) -> Result<f64, AgentError> {
    if variance.is_nan() || variance > MAX_OPINION_VARIANCE + VARIANCE_EPSILON {
        return Err(AgentError::VarianceOutOfRange { variance });
    }
    if variance <= 0.0 {
        return Ok(1.0);
    }
    Ok(1.0 - variance.min(MAX_OPINION_VARIANCE) / MAX_OPINION_VARIANCE)
}

/// Number of opinion clusters separated by gaps wider than
/// [`SUBCULTURE_GAP`]. Empty populations have none.
pub fn subculture_count(opinions: &[f64]) -> usize {
    let mut sorted = opinions.to_vec();
    sorted.sort_by(f64::total_cmp);
    let gaps = sorted
        .windows(2)
        .filter(|pair| matches!(pair, [a, b] if b - a > SUBCULTURE_GAP))
        .count();
    if sorted.is_empty() {
        0
    } else {
        gaps.saturating_add(1)
    }
}

/// First index at which homogeneity exceeds [`CONVERGENCE_HOMOGENEITY`],
/// or `-1` if it never does.
pub fn convergence_time(homogeneity_series: &[f64]) -> i64 {
    homogeneity_series
        .iter()
        .position(|&h| h > CONVERGENCE_HOMOGENEITY)
        .and_then(|i| i64::try_from(i).ok())
        .unwrap_or(-1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use orgsim_network::{EdgeRecord, NodeRecord, TopologySpec, ring_lattice};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn update_moves_toward_neighbors() {
        let rule = SocialInfluenceParams::default();
        // delta = 0.5, pull = 0.4 * 0.5
        let next = rule.next_opinion(0.2, &[0.6, 0.8]).unwrap();
        assert!(close(next, 0.4));
    }

    #[test]
    fn update_clamps_to_unit_interval() {
        let rule = SocialInfluenceParams {
            influence_strength: 1.0,
            conformity_bias: 1.0,
        };
        assert_eq!(rule.next_opinion(0.2, &[1.0]), Some(1.0));
        assert_eq!(rule.next_opinion(0.8, &[0.0]), Some(0.0));
    }

    #[test]
    fn isolated_agent_is_not_updated() {
        let rule = SocialInfluenceParams::default();
        assert_eq!(rule.next_opinion(0.3, &[]), None);
    }

    #[test]
    fn zero_strength_keeps_opinion() {
        let rule = SocialInfluenceParams {
            influence_strength: 0.0,
            conformity_bias: 0.0,
        };
        assert_eq!(rule.next_opinion(0.37, &[0.9, 0.1]), Some(0.37));
    }

    #[test]
    fn params_default_and_reject_non_numeric() {
        let params = SocialInfluenceParams::from_parameters(&ParameterSet::new()).unwrap();
        assert_eq!(params, SocialInfluenceParams::default());

        let bad = ParameterSet::new().with_value("conformity_bias", serde_json::json!("high"));
        assert!(matches!(
            SocialInfluenceParams::from_parameters(&bad),
            Err(AgentError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn initial_opinion_priority() {
        let spec = TopologySpec {
            directed: false,
            nodes: vec![
                NodeRecord::new("a").with_attribute("opinion", 0.9),
                NodeRecord::new("b").with_attribute("opinion", 0.8),
                NodeRecord::new("c"),
            ],
            edges: vec![EdgeRecord::new("a", "b")],
        };
        let topo = GraphTopology::from_spec(spec).unwrap();
        let params =
            ParameterSet::new().with_value("initial_opinions", serde_json::json!({"a": 0.1}));
        let mut rng = StdRng::seed_from_u64(7);
        let states = initial_opinions(&topo, &params, &mut rng).unwrap();
        assert_eq!(states[0].opinion, 0.1);
        assert_eq!(states[1].opinion, 0.8);
        assert!((0.0..1.0).contains(&states[2].opinion));
    }

    #[test]
    fn out_of_range_initial_opinion_is_rejected() {
        let topo = GraphTopology::from_spec(ring_lattice(4, 1)).unwrap();
        let params =
            ParameterSet::new().with_value("initial_opinions", serde_json::json!({"0": 1.5}));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            initial_opinions(&topo, &params, &mut rng),
            Err(AgentError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn random_opinions_follow_the_seed() {
        let topo = GraphTopology::from_spec(ring_lattice(20, 2)).unwrap();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            initial_opinions(&topo, &ParameterSet::new(), &mut rng).unwrap()
        };
        assert_eq!(draw(42), draw(42));
        assert_ne!(draw(42), draw(43));
    }

    #[test]
    fn statistics() {
        let opinions = [0.0, 1.0];
        assert!(close(mean(&opinions), 0.5));
        assert!(close(variance(&opinions), 0.25));
        assert!(close(homogeneity(0.25).unwrap(), 0.0));
        assert_eq!(homogeneity(0.0).unwrap(), 1.0);
        assert!(matches!(
            homogeneity(0.3),
            Err(AgentError::VarianceOutOfRange { .. })
        ));
    }

    #[test]
    fn subcultures_split_on_wide_gaps() {
        assert_eq!(subculture_count(&[]), 0);
        assert_eq!(subculture_count(&[0.5]), 1);
        assert_eq!(subculture_count(&[0.1, 0.15, 0.2]), 1);
        assert_eq!(subculture_count(&[0.9, 0.1, 0.15, 0.5]), 3);
    }

    #[test]
    fn convergence_is_first_index_above_threshold() {
        assert_eq!(convergence_time(&[0.2, 0.9, 0.96, 0.99]), 2);
        assert_eq!(convergence_time(&[0.2, 0.95]), -1);
        assert_eq!(convergence_time(&[]), -1);
    }
}
