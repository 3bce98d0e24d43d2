//! Simulation runner with cooperative cancellation.
//!
//! [`SimulationRunner`] drives a [`SimulationModel`] for a fixed number of
//! steps, extracts the terminal summary, persists the packaged result and
//! returns it. Every failure after the run id exists comes back as a
//! [`SimulationError`] value carrying that id.
//!
//! Cancellation is cooperative: the runner checks a [`CancellationToken`]
//! once before every step and, when it is set, stops and returns a result
//! marked [`RunStatus::Cancelled`] with the steps actually executed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use orgsim_types::{RunStatus, SimulationId, SimulationResult};
use tracing::{debug, info, warn};

use crate::error::SimulationError;
use crate::model::SimulationModel;
use crate::store::ResultStore;
use crate::summary::terminal_summary;

/// Shared flag asking a run to stop at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Runs models to completion and persists their results.
#[derive(Clone)]
pub struct SimulationRunner {
    store: Arc<dyn ResultStore>,
}

impl core::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationRunner").finish_non_exhaustive()
    }
}

impl SimulationRunner {
    /// Create a runner that persists into `store`.
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// The store results are written to.
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Run `steps` steps and persist the result.
    ///
    /// A fresh UUID v4 id is generated when `simulation_id` is `None`.
    pub fn run(
        &self,
        model: SimulationModel,
        steps: u64,
        simulation_id: Option<SimulationId>,
    ) -> Result<SimulationResult, SimulationError> {
        self.run_with_cancel(model, steps, simulation_id, &CancellationToken::new())
    }

    /// Like [`run`](Self::run), but stops early once `cancel` is set.
    pub fn run_with_cancel(
        &self,
        mut model: SimulationModel,
        steps: u64,
        simulation_id: Option<SimulationId>,
        cancel: &CancellationToken,
    ) -> Result<SimulationResult, SimulationError> {
        let simulation_id = simulation_id.unwrap_or_else(SimulationId::generate);
        let fail = |message: String| {
            warn!(simulation_id = %simulation_id, %message, "Simulation failed");
            SimulationError::new(Some(simulation_id.clone()), message)
        };

        info!(
            simulation_id = %simulation_id,
            kind = %model.kind(),
            agents = model.agents().len(),
            steps,
            "Simulation starting"
        );

        let mut status = RunStatus::Completed;
        for _ in 0..steps {
            if cancel.is_cancelled() {
                status = RunStatus::Cancelled;
                info!(
                    simulation_id = %simulation_id,
                    executed = model.step_counter(),
                    requested = steps,
                    "Simulation cancelled"
                );
                break;
            }
            model.step().map_err(|e| {
                fail(format!(
                    "step {} failed: {e}",
                    model.step_counter().saturating_add(1)
                ))
            })?;
        }

        let final_state = terminal_summary(&model)
            .map_err(|e| fail(format!("summary extraction failed: {e}")))?;

        let result = SimulationResult {
            simulation_id: simulation_id.clone(),
            behavior_kind: model.kind(),
            status,
            steps_executed: model.step_counter(),
            final_state,
            time_series: model.metrics().series(),
            parameters: model.parameters().clone(),
        };

        self.store
            .save_simulation(&result)
            .map_err(|e| fail(format!("failed to persist result: {e}")))?;

        debug!(simulation_id = %simulation_id, "Result persisted");
        info!(
            simulation_id = %simulation_id,
            steps_executed = result.steps_executed,
            status = ?result.status,
            "Simulation finished"
        );
        Ok(result)
    }
}
