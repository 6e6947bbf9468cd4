//! Schedule entry domain model.
//!
//! # Responsibility
//! - Bind one chunk to one calendar date.
//! - Provide the joined read model returned by schedule listings.
//!
//! # Invariants
//! - `completed == true` iff `completed_at.is_some()`.
//! - Completed entries are never removed by schedule regeneration.

use crate::model::chunk::{Chunk, ChunkId};
use crate::model::validation::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a schedule entry.
pub type ScheduleEntryId = Uuid;

/// Assignment of one chunk to one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleEntryId,
    pub chunk_id: ChunkId,
    /// Calendar date without time component, serialized as `YYYY-MM-DD`.
    pub scheduled_for: NaiveDate,
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub completed_at: Option<i64>,
}

impl ScheduleEntry {
    /// Creates an incomplete entry for `chunk_id` on `scheduled_for`.
    pub fn new(chunk_id: ChunkId, scheduled_for: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            chunk_id,
            scheduled_for,
            completed: false,
            completed_at: None,
        }
    }

    /// Marks the entry complete at `now_ms`.
    pub fn mark_completed(&mut self, now_ms: i64) {
        self.completed = true;
        self.completed_at = Some(now_ms);
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.chunk_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        if self.completed != self.completed_at.is_some() {
            return Err(ValidationError::CompletionMismatch {
                completed: self.completed,
            });
        }
        Ok(())
    }
}

/// Schedule entry joined with its chunk and parent task title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub entry: ScheduleEntry,
    pub chunk: Chunk,
    pub task_title: String,
}
