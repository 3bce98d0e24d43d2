//! Per-step metric collection.
//!
//! The [`MetricsCollector`] appends one [`StepRecord`] per collection point:
//! the model-level aggregates for the active behavior plus a copy of every
//! agent's state at that point. Column views of the model-level metrics
//! become the `time_series` of a result.

use std::collections::BTreeMap;

use orgsim_agents::diffusion;
use orgsim_agents::social_influence;
use orgsim_agents::{AgentError, AgentState, Behavior, DiffusionState, VariantState};
use orgsim_types::{BehaviorKind, Scalar};

/// Metrics captured at one collection point.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Number of steps completed when the record was taken.
    pub step: u64,
    /// Model-level aggregates by name.
    pub model: BTreeMap<String, Scalar>,
    /// Agent states in arena order.
    pub agents: Vec<VariantState>,
}

/// Model-level aggregates for a population under `behavior`.
///
/// `completed_step` is the number of steps finished so far; diffusion uses
/// it to count the adoptions of the step that just ran. Inert behaviors
/// have no aggregates.
pub fn model_metrics(
    behavior: &Behavior,
    agents: &[AgentState],
    completed_step: u64,
) -> Result<BTreeMap<String, Scalar>, AgentError> {
    let mut metrics = BTreeMap::new();
    match behavior {
        Behavior::SocialInfluence(_) => {
            let opinions = opinions(agents)?;
            let variance = social_influence::variance(&opinions);
            metrics.insert(
                "opinion_mean".to_owned(),
                Scalar::Float(social_influence::mean(&opinions)),
            );
            metrics.insert("opinion_variance".to_owned(), Scalar::Float(variance));
            metrics.insert(
                "culture_homogeneity".to_owned(),
                Scalar::Float(social_influence::homogeneity(variance)?),
            );
            metrics.insert(
                "subculture_count".to_owned(),
                count(social_influence::subculture_count(&opinions)),
            );
        }
        Behavior::Diffusion(_) => {
            let states = diffusion_states(agents)?;
            metrics.insert(
                "adoption_rate".to_owned(),
                Scalar::Float(diffusion::adoption_rate(&states)),
            );
            metrics.insert(
                "new_adoptions".to_owned(),
                count(diffusion::new_adoptions(&states, completed_step)),
            );
        }
        Behavior::Inert(_) => {}
    }
    Ok(metrics)
}

/// Every agent's opinion, in arena order.
pub fn opinions(agents: &[AgentState]) -> Result<Vec<f64>, AgentError> {
    agents
        .iter()
        .enumerate()
        .map(|(index, agent)| {
            agent.variant.opinion().ok_or(AgentError::StateMismatch {
                expected: BehaviorKind::SocialInfluence,
                index,
            })
        })
        .collect()
}

/// Every agent's diffusion state, in arena order.
pub fn diffusion_states(agents: &[AgentState]) -> Result<Vec<DiffusionState>, AgentError> {
    agents
        .iter()
        .enumerate()
        .map(|(index, agent)| {
            agent
                .variant
                .diffusion()
                .copied()
                .ok_or(AgentError::StateMismatch {
                    expected: BehaviorKind::DiffusionOfInnovations,
                    index,
                })
        })
        .collect()
}

fn count(n: usize) -> Scalar {
    Scalar::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Append-only time series of [`StepRecord`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsCollector {
    records: Vec<StepRecord>,
}

impl MetricsCollector {
    /// Create an empty collector.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Compute and append a record for the current population.
    ///
    /// Inert behaviors produce no record.
    pub fn collect(
        &mut self,
        behavior: &Behavior,
        agents: &[AgentState],
        completed_step: u64,
    ) -> Result<(), AgentError> {
        let model = model_metrics(behavior, agents, completed_step)?;
        if model.is_empty() {
            return Ok(());
        }
        self.records.push(StepRecord {
            step: completed_step,
            model,
            agents: agents.iter().map(|a| a.variant).collect(),
        });
        Ok(())
    }

    /// All records in collection order.
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Model-level metrics as named columns.
    pub fn series(&self) -> BTreeMap<String, Vec<Scalar>> {
        let mut columns: BTreeMap<String, Vec<Scalar>> = BTreeMap::new();
        for record in &self.records {
            for (name, value) in &record.model {
                columns.entry(name.clone()).or_default().push(value.clone());
            }
        }
        columns
    }

    /// One metric as floats. Missing or non-numeric entries are skipped.
    pub fn float_series(&self, name: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.model.get(name).and_then(Scalar::as_f64))
            .collect()
    }

    /// One metric as integers. Missing or non-integer entries are skipped.
    pub fn int_series(&self, name: &str) -> Vec<i64> {
        self.records
            .iter()
            .filter_map(|r| r.model.get(name).and_then(Scalar::as_i64))
            .collect()
    }

    /// The states one agent went through, one per record.
    pub fn agent_history(&self, index: usize) -> Vec<VariantState> {
        self.records
            .iter()
            .filter_map(|r| r.agents.get(index).copied())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use orgsim_agents::{SocialInfluenceParams, SocialInfluenceState};
    use orgsim_types::NodeId;

    use super::*;

    fn opinion_agents(opinions: &[f64]) -> Vec<AgentState> {
        opinions
            .iter()
            .enumerate()
            .map(|(i, &opinion)| {
                AgentState::new(
                    NodeId::from(i as u64),
                    BTreeMap::new(),
                    VariantState::SocialInfluence(SocialInfluenceState { opinion }),
                )
            })
            .collect()
    }

    #[test]
    fn social_influence_metrics() {
        let behavior = Behavior::SocialInfluence(SocialInfluenceParams::default());
        let metrics = model_metrics(&behavior, &opinion_agents(&[0.5, 0.5]), 0).unwrap();
        assert_eq!(metrics["opinion_mean"], Scalar::Float(0.5));
        assert_eq!(metrics["culture_homogeneity"], Scalar::Float(1.0));
        assert_eq!(metrics["subculture_count"], Scalar::Int(1));
    }

    #[test]
    fn wrong_state_is_reported() {
        let behavior = Behavior::Diffusion(orgsim_agents::DiffusionParams::default());
        assert!(matches!(
            model_metrics(&behavior, &opinion_agents(&[0.1]), 0),
            Err(AgentError::StateMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn collector_builds_columns() {
        let behavior = Behavior::SocialInfluence(SocialInfluenceParams::default());
        let mut collector = MetricsCollector::new();
        collector.collect(&behavior, &opinion_agents(&[0.0, 1.0]), 0).unwrap();
        collector.collect(&behavior, &opinion_agents(&[0.5, 0.5]), 1).unwrap();
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.float_series("culture_homogeneity"), vec![0.0, 1.0]);
        assert_eq!(collector.int_series("subculture_count"), vec![2, 1]);
        assert_eq!(collector.series()["opinion_mean"].len(), 2);
        assert_eq!(collector.agent_history(1).len(), 2);
    }

    #[test]
    fn inert_behaviors_record_nothing() {
        let behavior = Behavior::Inert(BehaviorKind::TeamAssembly);
        let mut collector = MetricsCollector::new();
        collector.collect(&behavior, &[], 1).unwrap();
        assert!(collector.is_empty());
    }
}
