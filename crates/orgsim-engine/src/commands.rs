//! Subcommand handlers and their input parsing.
//!
//! Handlers return the JSON value to print; `main` owns stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use orgsim_core::{
    CancellationToken, EngineError, FileResultStore, ParameterSweepEngine, ResultStore,
    SimulationRunner, SweepRequest, create_model, theories, theory,
};
use orgsim_network::{GraphTopology, TopologySpec};
use orgsim_types::{BehaviorKind, ParameterRange, ParameterSet, SimulationId, SweepId};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::CliError;

/// Inputs shared by `run` and `sweep`.
#[derive(Debug, Clone)]
pub struct ModelInputs {
    /// Behavior kind identifier.
    pub kind: String,
    /// Topology JSON file.
    pub topology: PathBuf,
    /// Optional parameter JSON file.
    pub params_file: Option<PathBuf>,
    /// `name=value` overrides applied after the file.
    pub overrides: Vec<String>,
}

impl ModelInputs {
    fn topology_spec(&self) -> Result<TopologySpec, CliError> {
        read_json(&self.topology)
    }

    fn parameters(&self) -> Result<ParameterSet, CliError> {
        let mut parameters = match &self.params_file {
            Some(path) => read_json(path)?,
            None => ParameterSet::new(),
        };
        for raw in &self.overrides {
            let (name, value) = parse_assignment(raw)?;
            parameters = parameters.with_value(&name, value);
        }
        Ok(parameters)
    }
}

/// Run one simulation, cancelling at the next step on Ctrl-C.
pub async fn run(
    store: Arc<FileResultStore>,
    inputs: &ModelInputs,
    steps: u64,
    id: Option<String>,
) -> Result<serde_json::Value, CliError> {
    let model = create_model(&inputs.kind, inputs.topology_spec()?, inputs.parameters()?)?;
    let runner = SimulationRunner::new(store);

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next step");
            watcher.cancel();
        }
    });

    let simulation_id = id.map(SimulationId::new);
    let result = tokio::task::spawn_blocking(move || {
        runner.run_with_cancel(model, steps, simulation_id, &cancel)
    })
    .await??;

    info!(
        simulation_id = %result.simulation_id,
        status = ?result.status,
        steps_executed = result.steps_executed,
        "Simulation finished"
    );
    Ok(serde_json::to_value(&result)?)
}

/// Run a one- or two-parameter sweep.
pub async fn sweep(
    store: Arc<FileResultStore>,
    inputs: &ModelInputs,
    ranges: &[String],
    metric: String,
    steps: u64,
    max_workers: usize,
    id: Option<String>,
) -> Result<serde_json::Value, CliError> {
    let behavior_kind: BehaviorKind = inputs.kind.parse().map_err(EngineError::from)?;
    let topology = GraphTopology::from_spec(inputs.topology_spec()?).map_err(EngineError::from)?;
    let parameter_ranges = ranges
        .iter()
        .map(|raw| parse_range(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let request = SweepRequest {
        behavior_kind,
        topology: Arc::new(topology),
        parameter_ranges,
        steps,
        metric_name: metric,
        base_parameters: inputs.parameters()?,
    };
    let engine = ParameterSweepEngine::new(store).with_max_workers(max_workers);
    let result = match id {
        Some(id) => engine.sweep_with_id(request, SweepId::new(id)).await?,
        None => engine.sweep(request).await?,
    };

    info!(
        sweep_id = %result.sweep_id,
        points = result.results.len(),
        "Sweep finished"
    );
    Ok(serde_json::to_value(&result)?)
}

/// Load a stored simulation result.
pub fn show(store: &FileResultStore, id: &str) -> Result<serde_json::Value, CliError> {
    let result = store
        .load_simulation(&SimulationId::new(id))
        .map_err(EngineError::from)?;
    Ok(serde_json::to_value(&result)?)
}

/// Load a stored sweep result.
pub fn show_sweep(store: &FileResultStore, id: &str) -> Result<serde_json::Value, CliError> {
    let result = store
        .load_sweep(&SweepId::new(id))
        .map_err(EngineError::from)?;
    Ok(serde_json::to_value(&result)?)
}

/// The theory catalogue, or one entry of it.
pub fn list_theories(kind: Option<&str>) -> Result<serde_json::Value, CliError> {
    match kind {
        None => Ok(serde_json::to_value(theories())?),
        Some(kind) => {
            let kind: BehaviorKind = kind.parse().map_err(EngineError::from)?;
            Ok(serde_json::to_value(theory(kind))?)
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::ReadInput {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CliError::ParseInput {
        path: path.to_owned(),
        source,
    })
}

/// Split `name=value`. The value is read as JSON when it parses, so
/// `seed_nodes=["a","b"]` and `random_seed=7` keep their types; anything
/// else is taken as a string.
pub fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), CliError> {
    let (name, value) = raw
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| CliError::InvalidArgument(format!("expected name=value, got {raw:?}")))?;
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_owned()));
    Ok((name.trim().to_owned(), value))
}

/// Parse `name=v1,v2,...` into a sweep range.
pub fn parse_range(raw: &str) -> Result<ParameterRange, CliError> {
    let (name, values) = raw
        .split_once('=')
        .filter(|(name, values)| !name.trim().is_empty() && !values.trim().is_empty())
        .ok_or_else(|| {
            CliError::InvalidArgument(format!("expected name=v1,v2,..., got {raw:?}"))
        })?;
    let values = values
        .split(',')
        .map(|v| {
            v.trim().parse::<f64>().map_err(|e| {
                CliError::InvalidArgument(format!("{name}: {v:?} is not a number ({e})"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParameterRange::new(name.trim(), values))
}
