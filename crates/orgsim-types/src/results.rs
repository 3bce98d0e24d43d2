//! Result records produced by the engine and consumed by hosts.
//!
//! Field names are part of the external contract: dashboards and the
//! persistence layer read `simulation_id`, `final_state`, `time_series`,
//! `parameters`, and `steps_executed` by name. All maps are ordered so a
//! result serializes to the same bytes every time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BehaviorKind, RunStatus};
use crate::ids::{SimulationId, SweepId};
use crate::values::{ParameterSet, Scalar};

/// The packaged outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationResult {
    /// Key the result is persisted under.
    pub simulation_id: SimulationId,
    /// Behavior the run used.
    pub behavior_kind: BehaviorKind,
    /// Whether every requested step ran.
    pub status: RunStatus,
    /// Number of steps actually executed.
    pub steps_executed: u64,
    /// Terminal summary metrics.
    pub final_state: BTreeMap<String, Scalar>,
    /// Per-collection-point metric series.
    pub time_series: BTreeMap<String, Vec<Scalar>>,
    /// Effective parameters plus topology size.
    pub parameters: ParameterSet,
}

impl SimulationResult {
    /// Look up a final-state metric.
    pub fn metric(&self, name: &str) -> Option<&Scalar> {
        self.final_state.get(name)
    }

    /// Look up a time series.
    pub fn series(&self, name: &str) -> Option<&[Scalar]> {
        self.time_series.get(name).map(Vec::as_slice)
    }
}

/// Ordered list of values for one swept parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ParameterRange {
    /// Parameter name, as understood by the behavior.
    pub name: String,
    /// Values to run, in grid order.
    pub values: Vec<f64>,
}

impl ParameterRange {
    /// Build a range from a name and its values.
    pub fn new(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_owned(),
            values,
        }
    }
}

/// One grid point of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SweepPoint {
    /// Swept parameter values for this point.
    pub parameters: BTreeMap<String, f64>,
    /// The tracked metric from the run's final state, if present.
    pub metric_value: Option<Scalar>,
    /// Id of the simulation run for this point.
    pub simulation_id: SimulationId,
    /// Failure message when the point's run did not produce a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Heatmap-ready matrix for a two-parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SweepGrid {
    /// First swept parameter (rows).
    pub x_param: String,
    /// Second swept parameter (columns).
    pub y_param: String,
    /// Row values.
    pub x_values: Vec<f64>,
    /// Column values.
    pub y_values: Vec<f64>,
    /// `values[i][j]` is the metric at `(x_values[i], y_values[j])`.
    pub values: Vec<Vec<Option<Scalar>>>,
}

/// The packaged outcome of a parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SweepResult {
    /// Key the sweep is persisted under.
    pub sweep_id: SweepId,
    /// Behavior every point ran.
    pub behavior_kind: BehaviorKind,
    /// The swept ranges, in request order.
    pub parameters: Vec<ParameterRange>,
    /// Steps per point.
    pub steps: u64,
    /// Name of the tracked final-state metric.
    pub metric: String,
    /// One entry per grid point, in grid order.
    pub results: Vec<SweepPoint>,
    /// Present only for two-parameter sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<SweepGrid>,
}
