//! Chunk (reviewable unit) domain model.
//!
//! # Responsibility
//! - Define the independently schedulable piece of a task.
//! - Carry the retention state mutated by reviews.
//!
//! # Invariants
//! - `user_importance` stays within `[0, 1]`.
//! - `retention_score` stays within `(0, 1]`.
//! - `last_reviewed == None` means "never reviewed"; then `review_count == 0`
//!   for chunks that only changed through `record_review`.
//! - A mastered or review-ineligible chunk is never due.
//! - `mastered` only moves from `false` to `true`.

use crate::model::task::TaskId;
use crate::model::validation::{
    validate_importance, validate_retention, validate_title, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a chunk.
pub type ChunkId = Uuid;

/// Importance assigned when the caller does not provide one.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;
/// Retention score of a chunk that has never been reviewed.
pub const INITIAL_RETENTION: f64 = 1.0;

/// Decomposed, independently schedulable piece of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub task_id: TaskId,
    pub title: String,
    /// User-assigned weight in `[0, 1]`.
    pub user_importance: f64,
    /// Optional display ordering inside the parent task.
    pub order_within_task: Option<i64>,
    pub review_eligible: bool,
    /// Once set, the chunk is permanently excluded from due-selection.
    pub mastered: bool,
    /// Unix epoch milliseconds of the last completed review.
    pub last_reviewed: Option<i64>,
    pub review_count: u32,
    /// Decayed confidence proxy in `(0, 1]`.
    pub retention_score: f64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Chunk {
    /// Creates a never-reviewed chunk with default importance.
    pub fn new(task_id: TaskId, title: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            title: title.into(),
            user_importance: DEFAULT_IMPORTANCE,
            order_within_task: None,
            review_eligible: true,
            mastered: false,
            last_reviewed: None,
            review_count: 0,
            retention_score: INITIAL_RETENTION,
            created_at,
        }
    }

    /// Returns whether the chunk may appear in a due set.
    pub fn is_schedulable(&self) -> bool {
        self.review_eligible && !self.mastered
    }

    /// Returns whether the chunk has never been reviewed.
    pub fn is_never_reviewed(&self) -> bool {
        self.last_reviewed.is_none()
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() || self.task_id.is_nil() {
            return Err(ValidationError::NilId);
        }
        validate_title(&self.title)?;
        validate_importance(self.user_importance)?;
        validate_retention(self.retention_score)
    }
}

/// Partial update for user-editable chunk fields.
///
/// `None` leaves the field untouched. `order_within_task: Some(None)` clears
/// the ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkPatch {
    pub title: Option<String>,
    pub user_importance: Option<f64>,
    pub order_within_task: Option<Option<i64>>,
    pub review_eligible: Option<bool>,
    pub mastered: Option<bool>,
}

impl ChunkPatch {
    /// Returns whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.user_importance.is_none()
            && self.order_within_task.is_none()
            && self.review_eligible.is_none()
            && self.mastered.is_none()
    }

    /// Applies set fields onto `chunk`.
    ///
    /// Field ranges are left to `Chunk::validate`. Unsetting `mastered` on a
    /// mastered chunk fails with `MasteredIsPermanent` and leaves `chunk`
    /// untouched.
    pub fn apply(&self, chunk: &mut Chunk) -> Result<(), ValidationError> {
        if chunk.mastered && self.mastered == Some(false) {
            return Err(ValidationError::MasteredIsPermanent);
        }
        if let Some(title) = &self.title {
            chunk.title = title.clone();
        }
        if let Some(importance) = self.user_importance {
            chunk.user_importance = importance;
        }
        if let Some(order) = self.order_within_task {
            chunk.order_within_task = order;
        }
        if let Some(eligible) = self.review_eligible {
            chunk.review_eligible = eligible;
        }
        if let Some(mastered) = self.mastered {
            chunk.mastered = mastered;
        }
        Ok(())
    }
}
