use thiserror::Error;

use crate::slot::SlotStatus;

#[derive(Error, Debug)]
pub enum ArenaError {
    /// One of the two snippets is empty; nothing was dispatched.
    #[error("Both code snippets are required")]
    IncompleteInput,

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("A comparison run is already executing")]
    RunInProgress,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response from execution service: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid slot transition: {from:?} -> {to:?}")]
    InvalidTransition { from: SlotStatus, to: SlotStatus },
}

pub type Result<T> = std::result::Result<T, ArenaError>;
