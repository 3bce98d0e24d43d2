//! Static catalogue of the behavior kinds for documentation and UIs.
//!
//! Nothing here is read on the simulation path; the defaults listed for
//! the implemented kinds are kept equal to the rule defaults by a test.

use orgsim_agents::{diffusion, social_influence};
use orgsim_types::BehaviorKind;
use serde::Serialize;

/// A tunable parameter of a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterInfo {
    /// Parameter name as read from the parameter map.
    pub name: &'static str,
    /// Value type.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Value used when the parameter is absent.
    pub default: f64,
    /// Smallest meaningful value.
    pub min: f64,
    /// Largest meaningful value.
    pub max: f64,
    /// What the parameter controls.
    pub description: &'static str,
}

/// A metric a behavior reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricInfo {
    /// Metric name in `final_state` or `time_series`.
    pub name: &'static str,
    /// What the metric measures.
    pub description: &'static str,
}

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TheoryInfo {
    /// Behavior kind identifier.
    pub id: BehaviorKind,
    /// Display name.
    pub name: &'static str,
    /// One-sentence summary.
    pub description: &'static str,
    /// Whether the kind has dynamics in this engine.
    pub implemented: bool,
    /// Tunable parameters.
    pub key_parameters: &'static [ParameterInfo],
    /// Reported metrics.
    pub metrics: &'static [MetricInfo],
    /// Literature the model follows.
    pub references: &'static [&'static str],
}

const fn unit_float(
    name: &'static str,
    default: f64,
    description: &'static str,
) -> ParameterInfo {
    ParameterInfo {
        name,
        kind: "float",
        default,
        min: 0.0,
        max: 1.0,
        description,
    }
}

static THEORIES: [TheoryInfo; 4] = [
    TheoryInfo {
        id: BehaviorKind::SocialInfluence,
        name: "Social Influence Theory",
        description: "Models how individuals' attitudes and behaviors are influenced by others in their social network.",
        implemented: true,
        key_parameters: &[
            unit_float(
                "influence_strength",
                social_influence::DEFAULT_INFLUENCE_STRENGTH,
                "How strongly agents are influenced by their neighbors",
            ),
            unit_float(
                "conformity_bias",
                social_influence::DEFAULT_CONFORMITY_BIAS,
                "Tendency to conform to the group average opinion",
            ),
        ],
        metrics: &[
            MetricInfo {
                name: "culture_homogeneity",
                description: "Degree of opinion convergence (0-1)",
            },
            MetricInfo {
                name: "subculture_count",
                description: "Number of distinct opinion clusters",
            },
            MetricInfo {
                name: "convergence_time",
                description: "Time steps until culture reaches high homogeneity",
            },
        ],
        references: &[
            "Friedkin, N. E. (1998). A structural theory of social influence. Cambridge University Press.",
            "Cialdini, R. B., & Goldstein, N. J. (2004). Social influence: Compliance and conformity. Annual Review of Psychology, 55, 591-621.",
        ],
    },
    TheoryInfo {
        id: BehaviorKind::DiffusionOfInnovations,
        name: "Diffusion of Innovations",
        description: "Models how new ideas, products, or practices spread through a social system.",
        implemented: true,
        key_parameters: &[
            unit_float(
                "initial_adopters",
                diffusion::DEFAULT_INITIAL_ADOPTERS,
                "Proportion of agents who start with the innovation",
            ),
            unit_float(
                "default_threshold",
                diffusion::DEFAULT_THRESHOLD,
                "Threshold of neighbor influence needed for adoption",
            ),
            unit_float(
                "influence_decay",
                diffusion::DEFAULT_INFLUENCE_DECAY,
                "Rate at which influence of adopters decays over time",
            ),
        ],
        metrics: &[
            MetricInfo {
                name: "final_adoption_rate",
                description: "Proportion of agents who adopt the innovation",
            },
            MetricInfo {
                name: "time_to_50pct",
                description: "Time steps until 50% adoption is reached",
            },
            MetricInfo {
                name: "adoption_curve",
                description: "Shape of the adoption curve (s-shaped or linear)",
            },
        ],
        references: &[
            "Rogers, E. M. (2003). Diffusion of innovations (5th ed.). Free Press.",
            "Bass, F. M. (1969). A new product growth for model consumer durables. Management Science, 15(5), 215-227.",
        ],
    },
    TheoryInfo {
        id: BehaviorKind::TeamAssembly,
        name: "Team Assembly Mechanisms",
        description: "Models how teams form and evolve based on skill complementarity and social connections.",
        implemented: false,
        key_parameters: &[
            unit_float(
                "skill_weight",
                0.5,
                "Importance of skill complementarity in team formation",
            ),
            unit_float(
                "social_weight",
                0.5,
                "Importance of social connections in team formation",
            ),
            unit_float(
                "team_stability",
                0.7,
                "Likelihood of team members remaining in the team",
            ),
        ],
        metrics: &[
            MetricInfo {
                name: "team_performance",
                description: "Estimated performance of teams",
            },
            MetricInfo {
                name: "team_diversity",
                description: "Skill diversity within teams",
            },
            MetricInfo {
                name: "clustering_coefficient",
                description: "Degree of clustering in the team network",
            },
        ],
        references: &[
            "Guimerà, R., Uzzi, B., Spiro, J., & Amaral, L. A. N. (2005). Team assembly mechanisms determine collaboration network structure and team performance. Science, 308(5722), 697-702.",
            "Contractor, N. S., DeChurch, L. A., Carson, J., Carter, D. R., & Keegan, B. (2012). The topology of collective leadership. The Leadership Quarterly, 23(6), 994-1011.",
        ],
    },
    TheoryInfo {
        id: BehaviorKind::OrganizationalLearning,
        name: "Organizational Learning",
        description: "Models how organizations acquire, process, and retain knowledge over time.",
        implemented: false,
        key_parameters: &[
            unit_float(
                "learning_rate",
                0.2,
                "Rate at which agents learn from experiences",
            ),
            unit_float(
                "forgetting_rate",
                0.05,
                "Rate at which agents forget knowledge over time",
            ),
            unit_float(
                "knowledge_transfer_efficiency",
                0.3,
                "Efficiency of knowledge transfer between agents",
            ),
        ],
        metrics: &[
            MetricInfo {
                name: "organizational_knowledge",
                description: "Total knowledge level in the organization",
            },
            MetricInfo {
                name: "knowledge_distribution",
                description: "How evenly knowledge is distributed",
            },
            MetricInfo {
                name: "exploration_exploitation_ratio",
                description: "Balance between exploring new knowledge and exploiting existing knowledge",
            },
        ],
        references: &[
            "March, J. G. (1991). Exploration and exploitation in organizational learning. Organization Science, 2(1), 71-87.",
            "Argote, L., & Miron-Spektor, E. (2011). Organizational learning: From experience to knowledge. Organization Science, 22(5), 1123-1137.",
        ],
    },
];

/// Every catalogue entry, in [`BehaviorKind::ALL`] order.
pub fn theories() -> &'static [TheoryInfo] {
    &THEORIES
}

/// The entry for one kind.
pub fn theory(kind: BehaviorKind) -> Option<&'static TheoryInfo> {
    THEORIES.iter().find(|t| t.id == kind)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use orgsim_agents::{DiffusionParams, SocialInfluenceParams};

    use super::*;

    fn default_of(kind: BehaviorKind, name: &str) -> f64 {
        theory(kind)
            .unwrap()
            .key_parameters
            .iter()
            .find(|p| p.name == name)
            .unwrap()
            .default
    }

    #[test]
    fn every_kind_is_catalogued_in_order() {
        let ids: Vec<BehaviorKind> = theories().iter().map(|t| t.id).collect();
        assert_eq!(ids, BehaviorKind::ALL.to_vec());
        for t in theories() {
            assert_eq!(t.implemented, t.id.is_implemented());
            assert!(!t.references.is_empty());
        }
    }

    #[test]
    fn defaults_match_the_rules() {
        let si = SocialInfluenceParams::default();
        assert_eq!(
            default_of(BehaviorKind::SocialInfluence, "influence_strength"),
            si.influence_strength
        );
        assert_eq!(
            default_of(BehaviorKind::SocialInfluence, "conformity_bias"),
            si.conformity_bias
        );
        let d = DiffusionParams::default();
        let kind = BehaviorKind::DiffusionOfInnovations;
        assert_eq!(default_of(kind, "initial_adopters"), d.initial_adopters);
        assert_eq!(default_of(kind, "default_threshold"), d.default_threshold);
        assert_eq!(default_of(kind, "influence_decay"), d.influence_decay);
    }

    #[test]
    fn catalogued_parameters_are_read_by_their_kind() {
        for t in theories() {
            let known = orgsim_agents::behavior::known_parameters(t.id);
            for p in t.key_parameters {
                assert!(known.contains(&p.name), "{} does not read {}", t.id, p.name);
            }
        }
    }

    #[test]
    fn serializes_with_wire_ids() {
        let json = serde_json::to_value(theory(BehaviorKind::TeamAssembly).unwrap()).unwrap();
        assert_eq!(json["id"], "team_assembly");
        assert_eq!(json["key_parameters"][0]["type"], "float");
    }
}
