// Result Aggregator
//
// Fixed two-entry store keyed by slot. Each slot lives in its own watch
// channel, so a write for one slot never touches the other and readers never
// wait on an in-flight execution. Only the pipeline owning a slot writes it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::Result;
use crate::slot::SlotState;
use crate::types::{ExecutionResult, SlotId, SlotPair};

/// Identity of the latest comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ResultAggregator {
    slots: [watch::Sender<SlotState>; 2],
    run: watch::Sender<Option<RunInfo>>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self {
            slots: [
                watch::channel(SlotState::Idle).0,
                watch::channel(SlotState::Idle).0,
            ],
            run: watch::channel(None).0,
        }
    }

    /// Current state of one slot.
    pub fn state(&self, slot: SlotId) -> SlotState {
        self.slots[slot.index()].borrow().clone()
    }

    /// Terminal result of one slot, if it has settled.
    pub fn result(&self, slot: SlotId) -> Option<ExecutionResult> {
        self.slots[slot.index()].borrow().result().cloned()
    }

    pub fn snapshot(&self) -> SlotPair<SlotState> {
        SlotPair::from_fn(|slot| self.state(slot))
    }

    pub fn run_info(&self) -> Option<RunInfo> {
        *self.run.borrow()
    }

    /// Receiver woken on every change of `slot` only.
    pub fn subscribe(&self, slot: SlotId) -> watch::Receiver<SlotState> {
        self.slots[slot.index()].subscribe()
    }

    pub fn all_terminal(&self) -> bool {
        self.slots.iter().all(|slot| slot.borrow().is_terminal())
    }

    /// Supersede the previous run: both slots back to `Idle`. `None` leaves
    /// no current run, as after a rejected request.
    pub(crate) fn clear(&self, run: Option<RunInfo>) {
        for slot in &self.slots {
            slot.send_modify(SlotState::reset);
        }
        self.run.send_replace(run);
    }

    /// Send every slot still `Pending` or `Running` back to `Idle`. Settled
    /// slots keep their result. Returns how many slots were abandoned.
    pub(crate) fn abandon_in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| {
                slot.send_if_modified(|state| {
                    let in_flight = matches!(state, SlotState::Pending | SlotState::Running);
                    if in_flight {
                        state.reset();
                    }
                    in_flight
                })
            })
            .count()
    }

    /// Apply a state-machine step to one slot. Watchers are only notified when
    /// the step is accepted.
    pub(crate) fn update(
        &self,
        slot: SlotId,
        step: impl FnOnce(&mut SlotState) -> Result<()>,
    ) -> Result<()> {
        let mut outcome = Ok(());
        self.slots[slot.index()].send_if_modified(|state| match step(state) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }
}
