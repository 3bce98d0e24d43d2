//! Parameter sweeps over one or two parameters.
//!
//! A sweep expands its ranges into grid points (the Cartesian product for
//! two parameters), runs one independent simulation per point, and reads
//! the tracked metric from each run's final state. Points share only the
//! read-only topology, so they run concurrently on blocking worker tasks;
//! a semaphore caps how many run at once and a `JoinSet` fans results back
//! in. Results are reordered into grid order before packaging.
//!
//! A point that fails records its error and a null metric. The sweep as a
//! whole only fails on validation (before anything runs) or when the final
//! result cannot be persisted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use orgsim_network::GraphTopology;
use orgsim_types::{
    BehaviorKind, ParameterRange, ParameterSet, Scalar, SimulationId, SweepGrid, SweepId,
    SweepPoint, SweepResult,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::model::SimulationModel;
use crate::runner::SimulationRunner;
use crate::store::ResultStore;

/// Most parameters a sweep may vary.
pub const MAX_SWEPT_PARAMETERS: usize = 2;

/// Everything needed to run a sweep.
#[derive(Debug, Clone)]
pub struct SweepRequest {
    /// Behavior every point runs.
    pub behavior_kind: BehaviorKind,
    /// Topology shared by every point.
    pub topology: Arc<GraphTopology>,
    /// One or two ranges, in grid order.
    pub parameter_ranges: Vec<ParameterRange>,
    /// Steps per point.
    pub steps: u64,
    /// Final-state metric to track.
    pub metric_name: String,
    /// Parameters applied to every point before its swept values.
    pub base_parameters: ParameterSet,
}

/// A single grid point before it runs.
#[derive(Debug, Clone)]
struct PlannedPoint {
    row: usize,
    column: usize,
    values: BTreeMap<String, f64>,
    simulation_id: SimulationId,
}

/// Runs sweeps and persists their results.
#[derive(Debug, Clone)]
pub struct ParameterSweepEngine {
    runner: SimulationRunner,
    max_workers: usize,
}

impl ParameterSweepEngine {
    /// Create an engine whose runs (and sweep results) go to `store`.
    ///
    /// Concurrency defaults to the available parallelism.
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self {
            runner: SimulationRunner::new(store),
            max_workers: 0,
        }
    }

    /// Cap concurrent points. `0` means available parallelism.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Permits for a grid of `points`: never more than the grid needs nor
    /// more than a semaphore can hold.
    fn worker_count(&self, points: usize) -> usize {
        let requested = if self.max_workers > 0 {
            self.max_workers
        } else {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        };
        requested.min(points).clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Run a sweep under a fresh id.
    pub async fn sweep(&self, request: SweepRequest) -> Result<SweepResult, EngineError> {
        self.sweep_with_id(request, SweepId::generate()).await
    }

    /// Run a sweep under the given id.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSweepGrid`] when the ranges are not one or two
    /// distinct parameters with finite values, and [`EngineError::Store`]
    /// when the sweep result cannot be persisted.
    pub async fn sweep_with_id(
        &self,
        request: SweepRequest,
        sweep_id: SweepId,
    ) -> Result<SweepResult, EngineError> {
        validate_ranges(&request.parameter_ranges)?;
        let points = plan_points(&sweep_id, &request.parameter_ranges);
        let total = points.len();
        let workers = self.worker_count(total);

        info!(
            sweep_id = %sweep_id,
            kind = %request.behavior_kind,
            points = total,
            workers,
            metric = %request.metric_name,
            "Sweep starting"
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut positions = HashMap::with_capacity(total);
        let mut slots: Vec<Option<SweepPoint>> = vec![None; total];

        for (position, point) in points.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;
            let pending = (position, point.values.clone(), point.simulation_id.clone());
            let runner = self.runner.clone();
            let topology = Arc::clone(&request.topology);
            let base = request.base_parameters.clone();
            let kind = request.behavior_kind;
            let steps = request.steps;
            let metric = request.metric_name.clone();
            let handle = tasks.spawn_blocking(move || {
                let _permit = permit;
                run_point(&runner, kind, topology, &base, steps, &metric, point)
            });
            positions.insert(handle.id(), pending);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, point)) => (id, Ok(point)),
                Err(e) => (e.id(), Err(e.to_string())),
            };
            let Some((position, values, simulation_id)) = positions.remove(&id) else {
                continue;
            };
            let point = outcome.unwrap_or_else(|message| {
                warn!(sweep_id = %sweep_id, %simulation_id, %message, "Sweep worker aborted");
                SweepPoint {
                    parameters: values,
                    metric_value: None,
                    simulation_id,
                    error: Some(message),
                }
            });
            if let Some(slot) = slots.get_mut(position) {
                *slot = Some(point);
            }
        }

        let results: Vec<SweepPoint> = slots.into_iter().flatten().collect();
        let grid = build_grid(&request.parameter_ranges, &results);
        let failed = results.iter().filter(|p| p.error.is_some()).count();

        let result = SweepResult {
            sweep_id: sweep_id.clone(),
            behavior_kind: request.behavior_kind,
            parameters: request.parameter_ranges,
            steps: request.steps,
            metric: request.metric_name,
            results,
            grid,
        };
        self.runner.store().save_sweep(&result)?;

        info!(
            sweep_id = %sweep_id,
            points = total,
            failed,
            "Sweep finished"
        );
        Ok(result)
    }
}

fn validate_ranges(ranges: &[ParameterRange]) -> Result<(), EngineError> {
    if ranges.is_empty() || ranges.len() > MAX_SWEPT_PARAMETERS {
        return Err(EngineError::InvalidSweepGrid(format!(
            "expected 1 or 2 swept parameters, got {}",
            ranges.len()
        )));
    }
    if let [a, b] = ranges
        && a.name == b.name
    {
        return Err(EngineError::InvalidSweepGrid(format!(
            "parameter {} is swept twice",
            a.name
        )));
    }
    for range in ranges {
        if range.values.is_empty() {
            return Err(EngineError::InvalidSweepGrid(format!(
                "parameter {} has no values",
                range.name
            )));
        }
        if let Some(bad) = range.values.iter().find(|v| !v.is_finite()) {
            return Err(EngineError::InvalidSweepGrid(format!(
                "parameter {} has non-finite value {bad}",
                range.name
            )));
        }
        // Point ids derive from the values, so a repeat would share a key.
        let mut seen = HashSet::with_capacity(range.values.len());
        if let Some(repeated) = range.values.iter().find(|v| !seen.insert(v.to_bits())) {
            return Err(EngineError::InvalidSweepGrid(format!(
                "parameter {} lists {repeated} more than once",
                range.name
            )));
        }
    }
    Ok(())
}

/// Grid points in row-major order with their derived simulation ids.
fn plan_points(sweep_id: &SweepId, ranges: &[ParameterRange]) -> Vec<PlannedPoint> {
    let mut points = Vec::new();
    match ranges {
        [x] => {
            for (row, &value) in x.values.iter().enumerate() {
                points.push(PlannedPoint {
                    row,
                    column: 0,
                    values: BTreeMap::from([(x.name.clone(), value)]),
                    simulation_id: SimulationId::new(format!("{sweep_id}_{}_{value}", x.name)),
                });
            }
        }
        [x, y] => {
            for (row, &xv) in x.values.iter().enumerate() {
                for (column, &yv) in y.values.iter().enumerate() {
                    points.push(PlannedPoint {
                        row,
                        column,
                        values: BTreeMap::from([(x.name.clone(), xv), (y.name.clone(), yv)]),
                        simulation_id: SimulationId::new(format!(
                            "{sweep_id}_{}_{xv}_{}_{yv}",
                            x.name, y.name
                        )),
                    });
                }
            }
        }
        _ => {}
    }
    points
}

/// Run one grid point. Failures become an error entry, never a panic.
fn run_point(
    runner: &SimulationRunner,
    kind: BehaviorKind,
    topology: Arc<GraphTopology>,
    base: &ParameterSet,
    steps: u64,
    metric: &str,
    point: PlannedPoint,
) -> SweepPoint {
    let swept = point
        .values
        .iter()
        .fold(ParameterSet::new(), |set, (name, &value)| set.with(name, value));
    let parameters = base.merged(&swept);
    debug!(
        simulation_id = %point.simulation_id,
        row = point.row,
        column = point.column,
        "Sweep point starting"
    );

    let outcome = SimulationModel::new(kind, topology, parameters)
        .map_err(|e| e.to_string())
        .and_then(|model| {
            runner
                .run(model, steps, Some(point.simulation_id.clone()))
                .map_err(|e| e.to_string())
        });

    match outcome {
        Ok(result) => SweepPoint {
            parameters: point.values,
            metric_value: result.final_state.get(metric).cloned(),
            simulation_id: point.simulation_id,
            error: None,
        },
        Err(message) => SweepPoint {
            parameters: point.values,
            metric_value: None,
            simulation_id: point.simulation_id,
            error: Some(message),
        },
    }
}

/// Heatmap matrix for two-parameter sweeps; `None` otherwise.
fn build_grid(ranges: &[ParameterRange], results: &[SweepPoint]) -> Option<SweepGrid> {
    let [x, y] = ranges else {
        return None;
    };
    let mut lookup: BTreeMap<(u64, u64), Option<Scalar>> = BTreeMap::new();
    for point in results {
        if let (Some(xv), Some(yv)) = (point.parameters.get(&x.name), point.parameters.get(&y.name))
        {
            lookup.insert((xv.to_bits(), yv.to_bits()), point.metric_value.clone());
        }
    }
    let values = x
        .values
        .iter()
        .map(|xv| {
            y.values
                .iter()
                .map(|yv| {
                    lookup
                        .get(&(xv.to_bits(), yv.to_bits()))
                        .cloned()
                        .flatten()
                })
                .collect()
        })
        .collect();
    Some(SweepGrid {
        x_param: x.name.clone(),
        y_param: y.name.clone(),
        x_values: x.values.clone(),
        y_values: y.values.clone(),
        values,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::float_cmp)]
mod tests {
    use orgsim_network::ring_lattice;

    use super::*;
    use crate::store::MemoryResultStore;

    fn request(ranges: Vec<ParameterRange>) -> SweepRequest {
        SweepRequest {
            behavior_kind: BehaviorKind::SocialInfluence,
            topology: Arc::new(GraphTopology::from_spec(ring_lattice(16, 2)).unwrap()),
            parameter_ranges: ranges,
            steps: 5,
            metric_name: "culture_homogeneity".to_owned(),
            base_parameters: ParameterSet::new().with("random_seed", 3.0),
        }
    }

    #[test]
    fn rejects_bad_grids() {
        assert!(validate_ranges(&[]).is_err());
        let three = vec![
            ParameterRange::new("a", vec![0.1]),
            ParameterRange::new("b", vec![0.1]),
            ParameterRange::new("c", vec![0.1]),
        ];
        assert!(matches!(
            validate_ranges(&three),
            Err(EngineError::InvalidSweepGrid(_))
        ));
        assert!(validate_ranges(&[ParameterRange::new("a", vec![])]).is_err());
        assert!(
            validate_ranges(&[
                ParameterRange::new("a", vec![0.1]),
                ParameterRange::new("a", vec![0.2])
            ])
            .is_err()
        );
        assert!(validate_ranges(&[ParameterRange::new("a", vec![f64::NAN])]).is_err());
    }

    #[test]
    fn repeated_values_are_rejected() {
        assert!(matches!(
            validate_ranges(&[ParameterRange::new("influence_strength", vec![0.1, 0.2, 0.1])]),
            Err(EngineError::InvalidSweepGrid(_))
        ));
        let ranges = [
            ParameterRange::new("influence_strength", vec![0.1, 0.2]),
            ParameterRange::new("conformity_bias", vec![0.3, 0.3]),
        ];
        assert!(validate_ranges(&ranges).is_err());
        // The same value in different parameters is fine.
        assert!(
            validate_ranges(&[
                ParameterRange::new("influence_strength", vec![0.1]),
                ParameterRange::new("conformity_bias", vec![0.1]),
            ])
            .is_ok()
        );
    }

    #[tokio::test]
    async fn repeated_values_never_reach_the_store() {
        let store = Arc::new(MemoryResultStore::new());
        let engine = ParameterSweepEngine::new(store.clone());
        let mut req = request(vec![ParameterRange::new("influence_strength", vec![0.1, 0.1])]);
        req.base_parameters = ParameterSet::new();
        assert!(matches!(
            engine.sweep_with_id(req, SweepId::new("dup")).await,
            Err(EngineError::InvalidSweepGrid(_))
        ));
        assert_eq!(store.simulation_count(), 0);
        assert!(store.load_sweep(&SweepId::new("dup")).is_err());
    }

    #[test]
    fn worker_count_stays_within_semaphore_and_grid() {
        let store = Arc::new(MemoryResultStore::new());
        let engine = ParameterSweepEngine::new(store).with_max_workers(usize::MAX);
        assert_eq!(engine.worker_count(4), 4);
        assert!(engine.worker_count(usize::MAX) <= Semaphore::MAX_PERMITS);
        let engine = engine.with_max_workers(3);
        assert_eq!(engine.worker_count(10), 3);
        assert_eq!(engine.worker_count(0), 1);
    }

    #[tokio::test]
    async fn oversized_worker_limit_still_runs() {
        let engine =
            ParameterSweepEngine::new(Arc::new(MemoryResultStore::new())).with_max_workers(usize::MAX);
        let result = engine
            .sweep(request(vec![ParameterRange::new("influence_strength", vec![0.1, 0.2])]))
            .await
            .unwrap();
        assert_eq!(result.results.len(), 2);
        assert!(result.results.iter().all(|p| p.error.is_none()));
    }

    #[test]
    fn point_ids_follow_the_grid() {
        let ranges = vec![
            ParameterRange::new("influence_strength", vec![0.05, 0.1]),
            ParameterRange::new("conformity_bias", vec![0.3]),
        ];
        let points = plan_points(&SweepId::new("s"), &ranges);
        assert_eq!(points.len(), 2);
        assert_eq!(
            points[0].simulation_id.as_str(),
            "s_influence_strength_0.05_conformity_bias_0.3"
        );
        assert_eq!((points[1].row, points[1].column), (1, 0));
    }

    #[tokio::test]
    async fn one_parameter_sweep_has_no_grid() {
        let store = Arc::new(MemoryResultStore::new());
        let engine = ParameterSweepEngine::new(store.clone()).with_max_workers(2);
        let result = engine
            .sweep_with_id(
                request(vec![ParameterRange::new("influence_strength", vec![0.0, 0.2, 0.4])]),
                SweepId::new("one"),
            )
            .await
            .unwrap();
        assert!(result.grid.is_none());
        assert_eq!(result.results.len(), 3);
        assert!(result.results.iter().all(|p| p.error.is_none()));
        assert_eq!(result.results[1].parameters["influence_strength"], 0.2);
        assert_eq!(store.simulation_count(), 3);
        assert_eq!(store.load_sweep(&SweepId::new("one")).unwrap(), result);
    }

    #[tokio::test]
    async fn failing_points_do_not_abort_the_sweep() {
        let engine = ParameterSweepEngine::new(Arc::new(MemoryResultStore::new()));
        let mut req = request(vec![ParameterRange::new("random_seed", vec![1.0, -1.0])]);
        req.base_parameters = ParameterSet::new();
        let result = engine.sweep(req).await.unwrap();
        assert!(result.results[0].error.is_none());
        assert!(result.results[1].error.is_some());
        assert!(result.results[1].metric_value.is_none());
    }

    #[tokio::test]
    async fn missing_metric_is_null() {
        let engine = ParameterSweepEngine::new(Arc::new(MemoryResultStore::new()));
        let mut req = request(vec![ParameterRange::new("influence_strength", vec![0.1])]);
        req.metric_name = "no_such_metric".to_owned();
        let result = engine.sweep(req).await.unwrap();
        assert!(result.results[0].error.is_none());
        assert!(result.results[0].metric_value.is_none());
    }
}
