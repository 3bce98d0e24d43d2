//! Enumeration types shared across the workspace.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The behavioral rule a simulation runs under.
///
/// The first two kinds have full behavior and summary logic. Team assembly
/// and organizational learning are catalogued extension points: they build
/// and run, but their agents carry no state and their summary is generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Continuous opinion dynamics pulled toward the neighborhood average.
    SocialInfluence,
    /// Threshold adoption of an innovation with time-decayed influence.
    DiffusionOfInnovations,
    /// Team formation from skill complementarity (not implemented).
    TeamAssembly,
    /// Knowledge acquisition and forgetting (not implemented).
    OrganizationalLearning,
}

impl BehaviorKind {
    /// Every kind, in catalogue order.
    pub const ALL: [Self; 4] = [
        Self::SocialInfluence,
        Self::DiffusionOfInnovations,
        Self::TeamAssembly,
        Self::OrganizationalLearning,
    ];

    /// Wire identifier of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SocialInfluence => "social_influence",
            Self::DiffusionOfInnovations => "diffusion_of_innovations",
            Self::TeamAssembly => "team_assembly",
            Self::OrganizationalLearning => "organizational_learning",
        }
    }

    /// Whether the kind has dedicated behavior and summary logic.
    pub const fn is_implemented(self) -> bool {
        matches!(self, Self::SocialInfluence | Self::DiffusionOfInnovations)
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier that does not name any [`BehaviorKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown behavior kind: {0}")]
pub struct UnknownBehaviorKind(pub String);

impl FromStr for BehaviorKind {
    type Err = UnknownBehaviorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownBehaviorKind(s.to_owned()))
    }
}

/// How a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every requested step was executed.
    Completed,
    /// A cancellation request stopped the run early; the result is partial.
    Cancelled,
}

/// Qualitative shape of a diffusion adoption curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AdoptionCurve {
    /// New adoptions peak strictly inside the run.
    #[serde(rename = "s-shaped")]
    SShaped,
    /// New adoptions peak at the first or last step (or the run is too short).
    #[serde(rename = "linear")]
    Linear,
}

impl AdoptionCurve {
    /// Label stored in a result's final state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SShaped => "s-shaped",
            Self::Linear => "linear",
        }
    }
}
