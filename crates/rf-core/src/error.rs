//! Error types for the reelforge pipeline.
//!
//! Two levels exist. [`Error`] aborts the operation that produced it (a
//! missing credential detected before any provider call, a store that cannot
//! be read). [`StageError`] describes why a single scene failed a single
//! stage; the batch runner always catches it at the per-scene boundary,
//! records it on the scene and moves on.

use std::fmt;

/// Unified error type for operations that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A credential or required selection is missing; nothing was attempted.
    #[error("Setup error: {0}")]
    Setup(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "scene").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The scene store failed to read or apply an update.
    #[error("Store error: {0}")]
    Store(String),

    /// Another batch is already running against the same providers.
    #[error("a batch is already running")]
    Busy,

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Setup`].
    pub fn setup(message: impl Into<String>) -> Self {
        Error::Setup(message.into())
    }

    /// Convenience constructor for [`Error::Store`].
    pub fn store(message: impl fmt::Display) -> Self {
        Error::Store(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Why one scene failed one stage.
///
/// The variant keeps the failure class for logging; the batch runner treats
/// every variant the same way. `Provider` and `InvalidInput` display the bare
/// message so the scene's `error` field shows exactly what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// Credentials were missing or rejected; retrying needs user action.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// The scene lacks the input this stage needs.
    #[error("{0}")]
    InvalidInput(String),

    /// The provider answered with a failure status or an unusable payload.
    #[error("{0}")]
    Provider(String),

    /// The provider could not be reached.
    #[error("network error: {0}")]
    Transport(String),

    /// The provider call exceeded the per-call timeout.
    #[error("request timed out after {secs}s")]
    Timeout {
        /// The timeout that elapsed.
        secs: u64,
    },
}

impl StageError {
    /// Short name of the failure class, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Credentials(_) => "credentials",
            StageError::InvalidInput(_) => "invalid_input",
            StageError::Provider(_) => "provider",
            StageError::Transport(_) => "transport",
            StageError::Timeout { .. } => "timeout",
        }
    }
}
