//! Dispatch Orchestrator
//!
//! **Responsibility:**
//! Own both slots of a comparison run: validate the inputs, reset the
//! aggregator, then drive the two executions concurrently and write each
//! outcome the moment it arrives.
//!
//! **Guarantees:**
//! - An empty snippet on either side aborts the whole run before any request
//!   is made (`IncompleteInput`).
//! - Per-slot problems (unknown language, transport failure) become a failed
//!   result on that slot only; the sibling carries on.
//! - Both pipelines run as futures joined on the caller's task. Slot 1 is
//!   polled first, but either may finish first.
//! - `is_executing()` stays true until both slots are terminal (await-all).
//!   If a run is dropped before it settles, its in-flight slots go back to
//!   `Idle` before the flag is released.
//!
//! **Not supported:**
//! Cancellation and per-call deadlines. A started run always runs to
//! completion; the only timeout is the HTTP client's, if configured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::aggregator::{ResultAggregator, RunInfo};
use crate::client::ExecutionBackend;
use crate::error::{ArenaError, Result};
use crate::request::ExecutionPayload;
use crate::slot::SlotState;
use crate::types::{ExecutionResult, SlotId, SlotInput, SlotPair};

/// Error shown on a slot whose language is not supported.
pub const INVALID_LANGUAGE_MESSAGE: &str = "Invalid language selected";

/// Outcome of a run that was awaited to the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: SlotPair<ExecutionResult>,
}

/// Point-in-time view of the latest run, as served to observers.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub executing: bool,
    pub slots: SlotPair<SlotState>,
}

pub struct Orchestrator<B> {
    backend: Arc<B>,
    results: Arc<ResultAggregator>,
    executing: Arc<AtomicBool>,
}

// Manual impl: cloning must not require `B: Clone`.
impl<B> Clone for Orchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            results: Arc::clone(&self.results),
            executing: Arc::clone(&self.executing),
        }
    }
}

/// Clears the executing flag however the run ends, abandoning any slot the
/// run left in flight.
struct ExecutingGuard {
    executing: Arc<AtomicBool>,
    results: Arc<ResultAggregator>,
}

impl Drop for ExecutingGuard {
    fn drop(&mut self) {
        let abandoned = self.results.abandon_in_flight();
        if abandoned > 0 {
            warn!(abandoned, "Run dropped before both slots settled");
        }
        self.executing.store(false, Ordering::Release);
    }
}

/// A run that passed validation and has both slots `Pending`.
/// Nothing has been sent yet; call `execute` to drive it.
#[must_use = "a pending run does nothing until executed"]
pub struct PendingRun<B> {
    orchestrator: Orchestrator<B>,
    run: RunInfo,
    inputs: SlotPair<SlotInput>,
    _guard: ExecutingGuard,
}

impl<B: ExecutionBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            results: Arc::new(ResultAggregator::new()),
            executing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Aggregator consumers read from.
    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let run = self.results.run_info();
        RunSnapshot {
            run_id: run.map(|r| r.run_id),
            started_at: run.map(|r| r.started_at),
            executing: self.is_executing(),
            slots: self.results.snapshot(),
        }
    }

    /// Validate and dispatch both slots, then wait for both to settle.
    pub async fn run(&self, first: SlotInput, second: SlotInput) -> Result<RunReport> {
        self.begin(first, second)?.execute().await
    }

    /// Synchronous half of `run`: claim the executing flag, supersede the
    /// previous run, check preconditions and mark both slots `Pending`.
    pub fn begin(&self, first: SlotInput, second: SlotInput) -> Result<PendingRun<B>> {
        if self
            .executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected run: previous run still executing");
            return Err(ArenaError::RunInProgress);
        }
        let guard = ExecutingGuard {
            executing: Arc::clone(&self.executing),
            results: Arc::clone(&self.results),
        };

        if first.code.is_empty() || second.code.is_empty() {
            self.results.clear(None);
            info!("Run rejected: incomplete input");
            return Err(ArenaError::IncompleteInput);
        }

        let run = RunInfo {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        self.results.clear(Some(run));

        for slot in SlotId::ALL {
            self.results.update(slot, SlotState::dispatch)?;
        }

        info!(
            run_id = %run.run_id,
            first_language = %first.language,
            second_language = %second.language,
            "Comparison run dispatched"
        );

        Ok(PendingRun {
            orchestrator: self.clone(),
            run,
            inputs: SlotPair::new(first, second),
            _guard: guard,
        })
    }

    #[instrument(
        skip(self, run_id, slot, input),
        fields(run_id = %run_id, slot = %slot, language = %input.language)
    )]
    async fn run_slot(&self, run_id: Uuid, slot: SlotId, input: SlotInput) -> ExecutionResult {
        let started = std::time::Instant::now();

        let payload = ExecutionPayload::build(&input.code, &input.language);

        // Running marks the call as in flight; a slot never skips it, even
        // when the language check already decided the outcome.
        self.record(slot, SlotState::start);

        let result = match payload {
            Ok(payload) => self.backend.execute(&payload).await,
            Err(e) => {
                warn!(error = %e, "Slot not dispatched");
                ExecutionResult::failure(input.language.clone(), INVALID_LANGUAGE_MESSAGE)
            }
        };

        self.record(slot, |state| state.finish(result.clone()));

        info!(
            success = result.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Slot settled"
        );
        result
    }

    fn record(&self, slot: SlotId, step: impl FnOnce(&mut SlotState) -> Result<()>) {
        // Only this slot's pipeline writes it while the executing flag is held.
        if let Err(e) = self.results.update(slot, step) {
            debug!(slot = %slot, error = %e, "Slot update skipped");
        }
    }
}

impl<B: ExecutionBackend> PendingRun<B> {
    pub fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    /// Drive both slots to completion. Resolves once both are terminal.
    pub async fn execute(self) -> Result<RunReport> {
        let PendingRun {
            orchestrator,
            run,
            inputs,
            _guard,
        } = self;

        let (first, second) = tokio::join!(
            orchestrator.run_slot(run.run_id, SlotId::First, inputs.first),
            orchestrator.run_slot(run.run_id, SlotId::Second, inputs.second),
        );

        let report = RunReport {
            run_id: run.run_id,
            started_at: run.started_at,
            finished_at: Utc::now(),
            results: SlotPair::new(first, second),
        };

        info!(
            run_id = %report.run_id,
            first_success = report.results.first.success,
            second_success = report.results.second.success,
            "Comparison run finished"
        );

        Ok(report)
    }
}
