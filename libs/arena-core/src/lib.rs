//! Dual-slot remote code execution.
//!
//! Two snippets are sent to a remote execution service side by side; each
//! slot's outcome becomes observable through the [`ResultAggregator`] as soon
//! as that slot settles.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod slot;
pub mod types;

#[cfg(test)]
mod orchestrator_tests;

pub use aggregator::{ResultAggregator, RunInfo};
pub use client::{ExecutionBackend, RemoteExecutionClient, TRANSPORT_FAILURE_MESSAGE};
pub use config::ArenaConfig;
pub use error::{ArenaError, Result};
pub use orchestrator::{Orchestrator, PendingRun, RunReport, RunSnapshot, INVALID_LANGUAGE_MESSAGE};
pub use request::ExecutionPayload;
pub use slot::{SlotState, SlotStatus};
pub use types::{
    supported_languages, ExecutionResult, Language, LanguageOption, SlotId, SlotInput, SlotPair,
};
