//! The simulation model: topology, agents, parameters, step counter, RNG.
//!
//! A [`SimulationModel`] is created once per run, advanced in place by
//! [`SimulationModel::step`], and consumed by the runner when the run ends.
//!
//! Every step updates agents from a snapshot of the population taken
//! before the step began, so an agent never sees a neighbor's same-step
//! write. The visiting order is still shuffled with the model's own
//! seeded RNG each step.
//!
//! Metric collection timing differs per behavior: social influence records
//! the population before each update (`steps` records in total) while
//! diffusion records the seeded state at construction and the population
//! after each update (`steps + 1` records).

use std::sync::Arc;

use orgsim_agents::{AgentError, AgentState, Behavior, VariantState};
use orgsim_network::{GraphTopology, TopologySpec};
use orgsim_types::{BehaviorKind, ParameterSet};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::EngineError;
use crate::metrics::MetricsCollector;

/// Parameter that seeds the model RNG.
pub const RANDOM_SEED: &str = "random_seed";

/// Parameter echoed with the number of agents in the model.
pub const NUM_AGENTS: &str = "num_agents";

/// Build a model from raw inputs, validating each in turn.
///
/// # Errors
///
/// [`EngineError::InvalidBehaviorKind`] for an unknown identifier,
/// [`EngineError::InvalidTopology`] for a malformed graph, and
/// [`EngineError::InvalidParameter`] for malformed parameters. Nothing is
/// created when any check fails.
pub fn create_model(
    kind: &str,
    topology: TopologySpec,
    parameters: ParameterSet,
) -> Result<SimulationModel, EngineError> {
    let kind: BehaviorKind = kind.parse()?;
    let topology = GraphTopology::from_spec(topology)?;
    SimulationModel::new(kind, Arc::new(topology), parameters)
}

/// A population of agents evolving on a topology.
#[derive(Debug, Clone)]
pub struct SimulationModel {
    behavior: Behavior,
    topology: Arc<GraphTopology>,
    agents: Vec<AgentState>,
    parameters: ParameterSet,
    step_counter: u64,
    rng: StdRng,
    metrics: MetricsCollector,
}

impl SimulationModel {
    /// Build a model over a shared topology.
    ///
    /// When `random_seed` is absent a seed is drawn from system entropy and
    /// written back into the parameters so the run can be reproduced.
    pub fn new(
        kind: BehaviorKind,
        topology: Arc<GraphTopology>,
        mut parameters: ParameterSet,
    ) -> Result<Self, EngineError> {
        let behavior = Behavior::from_parameters(kind, &parameters)?;

        let seed = if parameters.contains(RANDOM_SEED) {
            parameters
                .get_u64(RANDOM_SEED)
                .ok_or_else(|| EngineError::InvalidParameter {
                    name: RANDOM_SEED.to_owned(),
                    reason: "expected a non-negative integer".to_owned(),
                })?
        } else {
            let seed = rand::random::<u64>();
            parameters.set_u64(RANDOM_SEED, seed);
            seed
        };
        let mut rng = StdRng::seed_from_u64(seed);

        let agents = behavior.initialize(&topology, &parameters, &mut rng)?;
        parameters.set_u64(
            NUM_AGENTS,
            u64::try_from(agents.len()).unwrap_or(u64::MAX),
        );

        let mut metrics = MetricsCollector::new();
        if behavior.records_initial_state() {
            metrics.collect(&behavior, &agents, 0)?;
        }

        debug!(
            kind = %kind,
            agents = agents.len(),
            seed,
            "Model created"
        );

        Ok(Self {
            behavior,
            topology,
            agents,
            parameters,
            step_counter: 0,
            rng,
            metrics,
        })
    }

    /// Advance the model by one step.
    ///
    /// # Errors
    ///
    /// Fails when an agent carries state for a different behavior or a
    /// metric invariant is violated. The model must not be stepped again
    /// after an error.
    pub fn step(&mut self) -> Result<(), AgentError> {
        let executing = self.step_counter.saturating_add(1);

        if !self.behavior.records_initial_state() {
            self.metrics
                .collect(&self.behavior, &self.agents, self.step_counter)?;
        }

        if !matches!(self.behavior, Behavior::Inert(_)) {
            let snapshot: Vec<VariantState> = self.agents.iter().map(|a| a.variant).collect();
            let mut order: Vec<usize> = (0..self.agents.len()).collect();
            order.shuffle(&mut self.rng);

            let mut neighbor_states = Vec::new();
            for index in order {
                let Some(&current) = snapshot.get(index) else {
                    continue;
                };
                neighbor_states.clear();
                neighbor_states.extend(
                    self.topology
                        .neighbors(index)
                        .iter()
                        .filter_map(|n| snapshot.get(n.node).copied()),
                );
                if let Some(next) =
                    self.behavior
                        .apply(index, current, &neighbor_states, executing)?
                    && let Some(agent) = self.agents.get_mut(index)
                {
                    agent.variant = next;
                }
            }
        }

        self.step_counter = executing;

        if self.behavior.records_initial_state() {
            self.metrics
                .collect(&self.behavior, &self.agents, self.step_counter)?;
        }
        Ok(())
    }

    /// The active behavior rule.
    pub const fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// The behavior kind.
    pub const fn kind(&self) -> BehaviorKind {
        self.behavior.kind()
    }

    /// The shared topology.
    pub fn topology(&self) -> &GraphTopology {
        &self.topology
    }

    /// Agents in node-index order.
    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    /// Effective parameters, including the seed actually used.
    pub const fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Number of completed steps.
    pub const fn step_counter(&self) -> u64 {
        self.step_counter
    }

    /// Collected metrics.
    pub const fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use orgsim_network::{EdgeRecord, NodeRecord, ring_lattice};

    use super::*;

    fn ring(n: usize, k: usize) -> Arc<GraphTopology> {
        Arc::new(GraphTopology::from_spec(ring_lattice(n, k)).unwrap())
    }

    #[test]
    fn unknown_kind_fails_fast() {
        let err = create_model("voter_model", ring_lattice(5, 1), ParameterSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidBehaviorKind(_)));
    }

    #[test]
    fn bad_topology_fails_fast() {
        let mut spec = ring_lattice(5, 1);
        spec.edges.push(EdgeRecord::new("0", "missing"));
        let err = create_model("social_influence", spec, ParameterSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTopology(_)));
    }

    #[test]
    fn missing_seed_is_drawn_and_echoed() {
        let model = SimulationModel::new(
            BehaviorKind::SocialInfluence,
            ring(10, 2),
            ParameterSet::new(),
        )
        .unwrap();
        assert!(model.parameters().get_u64(RANDOM_SEED).is_some());
        assert_eq!(model.parameters().get_u64(NUM_AGENTS), Some(10));
    }

    #[test]
    fn malformed_seed_is_rejected() {
        let params = ParameterSet::new().with(RANDOM_SEED, -3.0);
        assert!(matches!(
            SimulationModel::new(BehaviorKind::SocialInfluence, ring(4, 1), params),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn record_counts_follow_collection_timing() {
        let params = ParameterSet::new().with(RANDOM_SEED, 1.0);
        let mut social =
            SimulationModel::new(BehaviorKind::SocialInfluence, ring(12, 2), params.clone())
                .unwrap();
        let mut diffusion =
            SimulationModel::new(BehaviorKind::DiffusionOfInnovations, ring(12, 2), params)
                .unwrap();
        assert_eq!(social.metrics().len(), 0);
        assert_eq!(diffusion.metrics().len(), 1);
        for _ in 0..5 {
            social.step().unwrap();
            diffusion.step().unwrap();
        }
        assert_eq!(social.step_counter(), 5);
        assert_eq!(social.metrics().len(), 5);
        assert_eq!(diffusion.metrics().len(), 6);
    }

    #[test]
    fn updates_read_pre_step_state() {
        // Path a - b - c: with simultaneous updates b moves toward the old
        // mean of a and c no matter which agent is visited first.
        let spec = TopologySpec {
            directed: false,
            nodes: vec![
                NodeRecord::new("a").with_attribute("opinion", 0.0),
                NodeRecord::new("b").with_attribute("opinion", 0.5),
                NodeRecord::new("c").with_attribute("opinion", 1.0),
            ],
            edges: vec![EdgeRecord::new("a", "b"), EdgeRecord::new("b", "c")],
        };
        let params = ParameterSet::new()
            .with("influence_strength", 0.5)
            .with("conformity_bias", 0.0)
            .with(RANDOM_SEED, 9.0);
        let mut model = create_model("social_influence", spec, params).unwrap();
        model.step().unwrap();
        let opinions: Vec<f64> = model
            .agents()
            .iter()
            .map(|a| a.variant.opinion().unwrap())
            .collect();
        assert_eq!(opinions, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn inert_model_only_counts_steps() {
        let mut model = SimulationModel::new(
            BehaviorKind::OrganizationalLearning,
            ring(6, 1),
            ParameterSet::new().with(RANDOM_SEED, 2.0),
        )
        .unwrap();
        model.step().unwrap();
        model.step().unwrap();
        assert_eq!(model.step_counter(), 2);
        assert!(model.metrics().is_empty());
        assert!(model.agents().iter().all(|a| a.variant == VariantState::Inert));
    }
}
