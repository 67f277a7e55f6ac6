//! Error taxonomy
//!
//! Library functions return `anyhow::Result` and attach context the usual way.
//! Failures that callers need to tell apart carry a [`SnowError`] as their root
//! cause, which survives any number of `.context(..)` layers and can be recovered
//! with [`error_kind`].

use crate::artifacts::access::access_report::AccessReport;
use crate::artifacts::checkout::conflict::LocalChange;
use thiserror::Error;

/// Classified failures of the version-control engine
#[derive(Debug, Error)]
pub enum SnowError {
    /// Unknown commit, reference, index or path
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    /// The request is not valid in the current repository state
    #[error("{0}")]
    InvalidState(String),

    /// Local changes in the working directory block the operation
    #[error("{}", LocalChange::render_conflict(.target, .changes))]
    Conflict {
        target: String,
        changes: Vec<LocalChange>,
    },

    /// One or more paths failed the access check
    #[error(transparent)]
    AccessDenied(#[from] AccessReport),

    /// Recomputed content does not match the recorded hash
    #[error("integrity mismatch for '{path}': expected {expected}, found {actual}")]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },
}

impl SnowError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        SnowError::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        SnowError::InvalidState(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SnowError::NotFound { .. } => ErrorKind::NotFound,
            SnowError::InvalidState(_) => ErrorKind::InvalidState,
            SnowError::Conflict { .. } => ErrorKind::Conflict,
            SnowError::AccessDenied(_) => ErrorKind::AccessDenied,
            SnowError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Conflict,
    AccessDenied,
    IntegrityMismatch,
    IoFailure,
}

/// Classify an error by its most specific root cause
pub fn error_kind(error: &anyhow::Error) -> ErrorKind {
    if let Some(snow_error) = error.downcast_ref::<SnowError>() {
        return snow_error.kind();
    }

    let io_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<std::io::Error>());

    match io_error {
        Some(io_error) if io_error.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::IoFailure,
    }
}

/// Borrow the [`SnowError`] behind an error, if there is one
pub fn as_snow_error(error: &anyhow::Error) -> Option<&SnowError> {
    error.downcast_ref::<SnowError>()
}
