//! Task domain model.
//!
//! # Responsibility
//! - Define the top-level unit of work that owns reviewable chunks.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `title` is never blank.
//! - Deleting a task cascades to its chunks in storage.

use crate::model::validation::{validate_title, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Top-level unit of work or knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Optional owner reference. Not interpreted by core.
    pub owner: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Creates a new task with a generated stable ID.
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            owner: None,
            created_at,
        }
    }

    /// Creates a task with a caller-provided ID.
    ///
    /// # Errors
    /// - Returns `ValidationError::NilId` for `Uuid::nil()`.
    /// - Returns `ValidationError::BlankTitle` for blank titles.
    pub fn with_id(
        id: TaskId,
        title: impl Into<String>,
        created_at: i64,
    ) -> Result<Self, ValidationError> {
        let task = Self {
            id,
            title: title.into(),
            owner: None,
            created_at,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId);
        }
        validate_title(&self.title)
    }
}
