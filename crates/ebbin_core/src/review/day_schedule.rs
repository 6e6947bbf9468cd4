//! Per-date schedule aggregate.
//!
//! # Responsibility
//! - Group one calendar date's schedule items.
//! - Derive the day state used by logging and callers.
//!
//! # Invariants
//! - Items all share `date`.
//! - Items are ordered by priority descending at construction time, ties
//!   keep storage order.

use crate::model::schedule::{ScheduleEntry, ScheduleItem};
use crate::review::retention::compute_priority;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Lifecycle state of one day's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayScheduleState {
    /// No entries for the date.
    Empty,
    /// Entries exist and none is completed.
    Populated,
    /// Some but not all entries are completed.
    PartiallyCompleted,
    /// Every entry is completed.
    FullyCompleted,
}

impl DayScheduleState {
    /// Derives the state from completed/total counts.
    pub fn from_counts(completed: usize, total: usize) -> Self {
        match (completed, total) {
            (_, 0) => Self::Empty,
            (0, _) => Self::Populated,
            (done, all) if done >= all => Self::FullyCompleted,
            _ => Self::PartiallyCompleted,
        }
    }

    /// Derives the state from raw entries.
    pub fn of_entries<'a>(entries: impl IntoIterator<Item = &'a ScheduleEntry>) -> Self {
        let (completed, total) = entries
            .into_iter()
            .fold((0, 0), |(completed, total), entry| {
                (completed + usize::from(entry.completed), total + 1)
            });
        Self::from_counts(completed, total)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Populated => "populated",
            Self::PartiallyCompleted => "partially_completed",
            Self::FullyCompleted => "fully_completed",
        }
    }
}

impl Display for DayScheduleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar date's schedule with items ranked by current priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub items: Vec<ScheduleItem>,
}

impl DaySchedule {
    /// Builds the aggregate, ordering items by priority at `now_ms`.
    pub fn new(date: NaiveDate, mut items: Vec<ScheduleItem>, now_ms: i64) -> Self {
        items.sort_by(|left, right| {
            compute_priority(&right.chunk, now_ms).total_cmp(&compute_priority(&left.chunk, now_ms))
        });
        Self { date, items }
    }

    pub fn state(&self) -> DayScheduleState {
        DayScheduleState::of_entries(self.items.iter().map(|item| &item.entry))
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.entry.completed).count()
    }

    /// Items still waiting for review.
    pub fn pending(&self) -> impl Iterator<Item = &ScheduleItem> {
        self.items.iter().filter(|item| !item.entry.completed)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
