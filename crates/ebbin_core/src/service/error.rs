//! Service-level error taxonomy.
//!
//! # Invariants
//! - Storage failures are surfaced unchanged; services never retry them.
//! - Missing records are reported as `NotFound`, not as storage faults.

use crate::repo::{RecordKind, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    StorageFailure,
}

/// Error returned by task and schedule services.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced record does not exist.
    NotFound { kind: RecordKind, id: Uuid },
    /// Caller input is unusable (zero limit, malformed date, reversed range,
    /// already-completed entry, invalid field values).
    InvalidArgument(String),
    /// Persistence collaborator failure.
    Storage(RepoError),
}

impl ServiceError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Stable snake_case code for log lines.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepoError::Validation(err) => Self::InvalidArgument(err.to_string()),
            other => Self::Storage(other),
        }
    }
}
