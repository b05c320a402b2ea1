pub mod fees;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{CoordinatorError, RejectionKind, StepRejection};
use crate::model::{ExecutionContext, ExecutionResult, FeeTotals};
use crate::registry::{AdapterRegistry, Resolved};
use crate::validate;

pub use state::{PauseSignal, RunState};

/// Pause between successive step executions.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(2000);

/// Outcome of a run that got past validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub strategy_id: String,
    pub state: RunState,
    /// One entry per attempted step, in strategy order.
    pub results: Vec<ExecutionResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn is_complete(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Index a later `resume` should start from, if the run stopped early.
    ///
    /// `None` for an aborted run whose failed step already broadcast a
    /// transaction: it may have landed, so the caller must pick the index.
    pub fn next_step(&self) -> Option<usize> {
        match self.state {
            RunState::Aborted { failed_step } if !self.failed_after_broadcast() => {
                Some(failed_step)
            }
            RunState::Paused { next } => Some(next),
            _ => None,
        }
    }

    /// The failed step, if it broadcast something before failing.
    pub fn failed_after_broadcast(&self) -> bool {
        self.results.last().is_some_and(ExecutionResult::was_broadcast)
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| !r.is_failed()).count()
    }
}

/// Drives strategies through validate-all-then-execute-in-order.
///
/// Holds no per-run state, so one coordinator serves any number of
/// concurrent runs. Each run keeps its own state record.
pub struct Coordinator {
    registry: Arc<AdapterRegistry>,
    step_delay: Duration,
}

impl Coordinator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Coordinator {
            registry,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Validate every step, then execute them in order, stopping at the
    /// first failure.
    ///
    /// Returns `Err` only when nothing was executed: an invalid document, an
    /// unresolvable step or an adapter rejecting a step. A mid-run failure
    /// is reported through the `Aborted` state and the partial results.
    pub async fn execute_strategy(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionReport, CoordinatorError> {
        self.drive(ctx, 0, None).await
    }

    /// Like [`Coordinator::execute_strategy`], honouring `pause` between steps.
    pub async fn execute_with_pause(
        &self,
        ctx: &ExecutionContext,
        pause: &PauseSignal,
    ) -> Result<ExecutionReport, CoordinatorError> {
        self.drive(ctx, 0, Some(pause)).await
    }

    /// Continue a paused or aborted run from step `from`. Only the remaining
    /// steps are validated; result ids keep their original positions.
    pub async fn resume_strategy(
        &self,
        ctx: &ExecutionContext,
        from: usize,
        pause: Option<&PauseSignal>,
    ) -> Result<ExecutionReport, CoordinatorError> {
        let len = ctx.strategy.steps.len();
        if from >= len {
            return Err(CoordinatorError::ResumeOutOfRange { from, len });
        }
        self.drive(ctx, from, pause).await
    }

    /// Per-chain fee totals for the whole strategy.
    pub async fn estimate_for_strategy(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<FeeTotals, CoordinatorError> {
        fees::estimate_for_strategy(&self.registry, ctx).await
    }

    async fn drive(
        &self,
        ctx: &ExecutionContext,
        start: usize,
        pause: Option<&PauseSignal>,
    ) -> Result<ExecutionReport, CoordinatorError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, strategy = %ctx.strategy.id);

        async move {
            let mut run = Run {
                ctx,
                registry: &self.registry,
                step_delay: self.step_delay,
                pause,
                start,
                state: RunState::Created,
                plan: Vec::new(),
                rejections: Vec::new(),
                results: Vec::new(),
            };
            let started_at = Utc::now();

            while !run.state.is_terminal() {
                let next = run.step().await?;
                debug!(from = %run.state, to = %next, "transition");
                run.state = next;
            }

            info!(state = %run.state, steps = run.results.len(), "run finished");

            if run.state == RunState::Rejected {
                return Err(CoordinatorError::Rejected {
                    strategy_id: ctx.strategy.id.clone(),
                    rejections: run.rejections,
                });
            }

            Ok(ExecutionReport {
                run_id,
                strategy_id: ctx.strategy.id.clone(),
                state: run.state,
                results: run.results,
                started_at,
                finished_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }
}

// ── Run state machine ──────────────────────────────────────────────

struct Run<'a> {
    ctx: &'a ExecutionContext,
    registry: &'a AdapterRegistry,
    step_delay: Duration,
    pause: Option<&'a PauseSignal>,
    start: usize,
    state: RunState,
    /// Resolved adapters for steps `start..`, filled during validation.
    plan: Vec<Resolved>,
    rejections: Vec<StepRejection>,
    results: Vec<ExecutionResult>,
}

impl Run<'_> {
    /// Perform the work of the current state and return the next one.
    async fn step(&mut self) -> Result<RunState, CoordinatorError> {
        match self.state {
            RunState::Created => {
                validate::validate(&self.ctx.strategy).map_err(CoordinatorError::InvalidStrategy)?;
                Ok(RunState::Validating)
            }
            RunState::Validating => {
                self.validate_steps().await;
                if self.rejections.is_empty() {
                    Ok(RunState::Valid)
                } else {
                    for r in &self.rejections {
                        warn!("{r}");
                    }
                    Ok(RunState::Rejected)
                }
            }
            RunState::Valid => Ok(RunState::Executing { next: self.start }),
            RunState::Executing { next } => Ok(self.execute_at(next).await),
            terminal => Ok(terminal),
        }
    }

    /// Resolve and validate every remaining step, collecting all rejections.
    async fn validate_steps(&mut self) {
        let ctx = self.ctx;
        let strategy = &ctx.strategy;
        for (index, step) in strategy.steps.iter().enumerate().skip(self.start) {
            let step_id = strategy.step_id(index);
            let reject = |kind, reason: String| StepRejection {
                index,
                step_id: step_id.clone(),
                protocol: step.protocol.clone(),
                kind,
                reason,
            };

            let resolved = match self.registry.resolve(step) {
                Ok(r) => r,
                Err(e) => {
                    self.rejections
                        .push(reject(RejectionKind::Resolution, e.to_string()));
                    continue;
                }
            };

            match resolved.adapter.validate(step, ctx).await {
                Ok(outcome) if outcome.valid => {
                    debug!(step = %step_id, chain = %resolved.chain, "step valid");
                }
                Ok(outcome) => {
                    let reason = outcome
                        .reason
                        .unwrap_or_else(|| "rejected by adapter".to_string());
                    self.rejections.push(reject(RejectionKind::Validation, reason));
                }
                Err(e) => {
                    self.rejections
                        .push(reject(RejectionKind::Validation, format!("{e:#}")));
                }
            }
            self.plan.push(resolved);
        }
    }

    async fn execute_at(&mut self, index: usize) -> RunState {
        let ctx = self.ctx;
        let strategy = &ctx.strategy;
        if index >= strategy.steps.len() {
            return RunState::Completed;
        }
        if self.pause.is_some_and(PauseSignal::is_requested) {
            info!(next = index, "pause requested, stopping before step");
            return RunState::Paused { next: index };
        }

        let step = &strategy.steps[index];
        let step_id = strategy.step_id(index);
        let adapter = &self.plan[index - self.start].adapter;

        info!(step = %step_id, "executing {}", step.label());
        let mut result = match adapter.execute(&step_id, step, ctx).await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failed(&step_id, format!("{e:#}")),
        };
        result.step_id = step_id;

        let failed = result.is_failed();
        if failed {
            warn!(
                step = %result.step_id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "step failed, aborting run"
            );
        } else {
            info!(
                step = %result.step_id,
                tx = result.transaction_hash.as_deref().unwrap_or("-"),
                "step succeeded"
            );
        }
        self.results.push(result);

        if failed {
            return RunState::Aborted { failed_step: index };
        }
        if index + 1 < strategy.steps.len() {
            tokio::time::sleep(self.step_delay).await;
        }
        RunState::Executing { next: index + 1 }
    }
}
