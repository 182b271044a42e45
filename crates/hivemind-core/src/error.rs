//! Error types for HiveMind

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied arguments failed a precondition. Required fields
    /// are never silently defaulted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An operation requiring session state found none. Callers branch on
    /// this routinely; lifecycle surfaces turn it into guidance text.
    #[error("no active session")]
    NoActiveSession,

    /// `start` called while a session is already open. Non-fatal.
    #[error("session already active: {0}")]
    AlreadyActive(String),

    /// Primary persistence failed. Write-path failures propagate; read
    /// paths degrade to defaults before reaching this.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}
