//! Terminal summaries extracted from a finished model.

use std::collections::BTreeMap;

use orgsim_agents::{AgentError, Behavior, diffusion, social_influence};
use orgsim_types::Scalar;

use crate::metrics::{diffusion_states, model_metrics};
use crate::model::SimulationModel;

/// The `final_state` map for a model that has stopped stepping.
///
/// Social influence reports the current opinion statistics and the
/// convergence time; diffusion reports the final adoption rate, the time
/// to 50% and 90% adoption, and the adoption curve shape. Inert behaviors
/// get a generic summary with only `steps_executed` and `behavior_kind`.
pub fn terminal_summary(model: &SimulationModel) -> Result<BTreeMap<String, Scalar>, AgentError> {
    let collector = model.metrics();
    let summary = match model.behavior() {
        Behavior::SocialInfluence(_) => {
            let mut summary =
                model_metrics(model.behavior(), model.agents(), model.step_counter())?;
            let convergence =
                social_influence::convergence_time(&collector.float_series("culture_homogeneity"));
            summary.insert("convergence_time".to_owned(), Scalar::Int(convergence));
            summary
        }
        Behavior::Diffusion(_) => {
            let states = diffusion_states(model.agents())?;
            let rates = collector.float_series("adoption_rate");
            let population = states.len();
            let curve = diffusion::adoption_curve(&collector.int_series("new_adoptions"));
            BTreeMap::from([
                (
                    "final_adoption_rate".to_owned(),
                    Scalar::Float(diffusion::adoption_rate(&states)),
                ),
                (
                    "time_to_50pct".to_owned(),
                    Scalar::Int(diffusion::time_to_fraction(&rates, population, 0.5)),
                ),
                (
                    "time_to_90pct".to_owned(),
                    Scalar::Int(diffusion::time_to_fraction(&rates, population, 0.9)),
                ),
                (
                    "adoption_curve".to_owned(),
                    Scalar::Text(curve.as_str().to_owned()),
                ),
            ])
        }
        Behavior::Inert(kind) => BTreeMap::from([
            (
                "steps_executed".to_owned(),
                Scalar::Int(i64::try_from(model.step_counter()).unwrap_or(i64::MAX)),
            ),
            (
                "behavior_kind".to_owned(),
                Scalar::Text(kind.as_str().to_owned()),
            ),
        ]),
    };
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use orgsim_network::{GraphTopology, ring_lattice};
    use orgsim_types::{BehaviorKind, ParameterSet};

    use super::*;

    fn model(kind: BehaviorKind, steps: u64) -> SimulationModel {
        let topology = Arc::new(GraphTopology::from_spec(ring_lattice(30, 3)).unwrap());
        let params = ParameterSet::new().with("random_seed", 11.0);
        let mut model = SimulationModel::new(kind, topology, params).unwrap();
        for _ in 0..steps {
            model.step().unwrap();
        }
        model
    }

    #[test]
    fn social_influence_summary_keys() {
        let summary = terminal_summary(&model(BehaviorKind::SocialInfluence, 10)).unwrap();
        let keys: Vec<&str> = summary.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "convergence_time",
                "culture_homogeneity",
                "opinion_mean",
                "opinion_variance",
                "subculture_count"
            ]
        );
    }

    #[test]
    fn diffusion_summary_keys() {
        let summary = terminal_summary(&model(BehaviorKind::DiffusionOfInnovations, 10)).unwrap();
        assert!(summary.contains_key("final_adoption_rate"));
        assert!(summary.contains_key("time_to_50pct"));
        assert!(summary.contains_key("time_to_90pct"));
        let curve = summary["adoption_curve"].as_str().unwrap();
        assert!(curve == "s-shaped" || curve == "linear");
    }

    #[test]
    fn zero_step_social_influence_has_not_converged() {
        let summary = terminal_summary(&model(BehaviorKind::SocialInfluence, 0)).unwrap();
        assert_eq!(summary["convergence_time"], Scalar::Int(-1));
    }

    #[test]
    fn stub_kinds_get_generic_summary() {
        let summary = terminal_summary(&model(BehaviorKind::TeamAssembly, 4)).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary["steps_executed"], Scalar::Int(4));
        assert_eq!(
            summary["behavior_kind"],
            Scalar::Text("team_assembly".to_owned())
        );
    }
}
