//! Field validation errors shared by all domain records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure for task/chunk/schedule records.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Identifier is the nil UUID.
    NilId,
    /// Title is empty after trim.
    BlankTitle,
    /// `user_importance` is outside `[0, 1]` or not finite.
    ImportanceOutOfRange(f64),
    /// `retention_score` is outside `(0, 1]` or not finite.
    RetentionOutOfRange(f64),
    /// `completed` and `completed_at` disagree.
    CompletionMismatch { completed: bool },
    /// A mastered chunk cannot be moved back into review.
    MasteredIsPermanent,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "id must not be nil"),
            Self::BlankTitle => write!(f, "title must not be blank"),
            Self::ImportanceOutOfRange(value) => {
                write!(f, "user_importance ({value}) must be within [0, 1]")
            }
            Self::RetentionOutOfRange(value) => {
                write!(f, "retention_score ({value}) must be within (0, 1]")
            }
            Self::CompletionMismatch { completed: true } => {
                write!(f, "completed entry must carry completed_at")
            }
            Self::CompletionMismatch { completed: false } => {
                write!(f, "incomplete entry must not carry completed_at")
            }
            Self::MasteredIsPermanent => write!(f, "mastered is permanent"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::BlankTitle);
    }
    Ok(())
}

pub(crate) fn validate_importance(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::ImportanceOutOfRange(value));
    }
    Ok(())
}

pub(crate) fn validate_retention(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ValidationError::RetentionOutOfRange(value));
    }
    Ok(())
}
