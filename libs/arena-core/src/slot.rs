//! Slot State Machine
//!
//! One slot moves `Idle -> Pending -> Running -> Completed | Failed`.
//! `Pending` is entered as soon as a run is accepted, `Running` right before
//! the execution call, and the terminal state is picked from
//! `ExecutionResult::success`. Only the terminal states carry a result.
//! Re-dispatching a settled slot goes through `reset` first.

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, Result};
use crate::types::ExecutionResult;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "lowercase")]
pub enum SlotState {
    #[default]
    Idle,
    Pending,
    Running,
    Completed(ExecutionResult),
    Failed(ExecutionResult),
}

/// Payload-free view of a `SlotState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Idle,
    Pending,
    Running,
    Completed,
    Failed,
}

impl SlotState {
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotState::Idle => SlotStatus::Idle,
            SlotState::Pending => SlotStatus::Pending,
            SlotState::Running => SlotStatus::Running,
            SlotState::Completed(_) => SlotStatus::Completed,
            SlotState::Failed(_) => SlotStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotState::Completed(_) | SlotState::Failed(_))
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            SlotState::Completed(result) | SlotState::Failed(result) => Some(result),
            _ => None,
        }
    }

    /// Back to `Idle` from anywhere, dropping any result.
    pub fn reset(&mut self) {
        *self = SlotState::Idle;
    }

    /// `Idle -> Pending`
    pub fn dispatch(&mut self) -> Result<()> {
        self.expect(SlotStatus::Idle, SlotStatus::Pending)?;
        *self = SlotState::Pending;
        Ok(())
    }

    /// `Pending -> Running`
    pub fn start(&mut self) -> Result<()> {
        self.expect(SlotStatus::Pending, SlotStatus::Running)?;
        *self = SlotState::Running;
        Ok(())
    }

    /// `Running -> Completed | Failed`
    pub fn finish(&mut self, result: ExecutionResult) -> Result<()> {
        let to = if result.success {
            SlotStatus::Completed
        } else {
            SlotStatus::Failed
        };
        self.expect(SlotStatus::Running, to)?;

        *self = if result.success {
            SlotState::Completed(result)
        } else {
            SlotState::Failed(result)
        };
        Ok(())
    }

    fn expect(&self, from: SlotStatus, to: SlotStatus) -> Result<()> {
        let current = self.status();
        if current == from {
            Ok(())
        } else {
            Err(ArenaError::InvalidTransition { from: current, to })
        }
    }
}
