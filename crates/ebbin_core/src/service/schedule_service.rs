//! Review schedule use-case service.
//!
//! # Responsibility
//! - Generate a day's schedule from the ranked due set.
//! - Complete schedule entries and apply the retention update.
//! - Serve schedule and completion history reads.
//!
//! # Invariants
//! - Generation for one date is serialized by a per-date lock and replaces
//!   only incomplete entries.
//! - Completion for one entry is serialized by a per-entry lock within one
//!   service, and by a conditional store update across connections.
//! - Completion marks the entry before touching the chunk. A failed chunk
//!   update is reported as `CompletionOutcome::PartialSuccess` and never rolls
//!   the entry back.
//! - Completing an already-completed entry is rejected with
//!   `InvalidArgument`, so one review is recorded per entry.

use crate::config::ScheduleConfig;
use crate::model::chunk::{Chunk, ChunkId};
use crate::model::schedule::{ScheduleEntry, ScheduleEntryId, ScheduleItem};
use crate::repo::chunk_repo::ChunkRepository;
use crate::repo::schedule_repo::{format_date, ScheduleRepository};
use crate::repo::RecordKind;
use crate::review::clock::Clock;
use crate::review::day_schedule::DaySchedule;
use crate::review::due_set::{select_due, RankedChunk};
use crate::review::locks::KeyedLocks;
use crate::review::retention::record_review;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::{error, info, warn};
use std::time::Instant;
use uuid::Uuid;

/// Result of a successful `complete_entry` call.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// Entry completed and chunk retention updated.
    Completed { entry: ScheduleEntry, chunk: Chunk },
    /// Entry completed but the retention update failed. Retry with
    /// `ScheduleService::record_entry_review`.
    PartialSuccess {
        entry: ScheduleEntry,
        failure: ServiceError,
    },
}

impl CompletionOutcome {
    /// The completed entry, present in both outcomes.
    pub fn entry(&self) -> &ScheduleEntry {
        match self {
            Self::Completed { entry, .. } | Self::PartialSuccess { entry, .. } => entry,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialSuccess { .. })
    }
}

/// Schedule service facade over chunk/schedule repositories and a clock.
pub struct ScheduleService<C, S, K>
where
    C: ChunkRepository,
    S: ScheduleRepository,
    K: Clock,
{
    chunks: C,
    schedule: S,
    clock: K,
    config: ScheduleConfig,
    date_locks: KeyedLocks<NaiveDate>,
    entry_locks: KeyedLocks<ScheduleEntryId>,
}

impl<C, S, K> ScheduleService<C, S, K>
where
    C: ChunkRepository,
    S: ScheduleRepository,
    K: Clock,
{
    /// Creates a service with the default configuration.
    pub fn new(chunks: C, schedule: S, clock: K) -> Self {
        Self::with_config(chunks, schedule, clock, ScheduleConfig::default())
    }

    pub fn with_config(chunks: C, schedule: S, clock: K, config: ScheduleConfig) -> Self {
        Self {
            chunks,
            schedule,
            clock,
            config,
            date_locks: KeyedLocks::new(),
            entry_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Current calendar date according to the service clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Returns the ranked due set without writing anything.
    pub fn select_due(&self, limit: Option<u32>) -> ServiceResult<Vec<RankedChunk>> {
        let limit = self.resolve_limit(limit)?;
        let candidates = self.chunks.list_chunks_for_selection()?;
        Ok(select_due(candidates, limit, self.clock.now_ms()))
    }

    /// Regenerates the schedule for `date`.
    ///
    /// Incomplete entries for `date` are replaced by one entry per due
    /// chunk, returned in ranking order. Completed entries stay untouched.
    /// An empty due set leaves the date with only its completed entries.
    pub fn generate_schedule(
        &self,
        date: NaiveDate,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<ScheduleEntry>> {
        let limit = self.resolve_limit(limit)?;
        let started_at = Instant::now();

        let result = self
            .date_locks
            .with_lock(&date, || self.regenerate_locked(date, limit));

        match &result {
            Ok(entries) => info!(
                "event=schedule_generate module=schedule status=ok date={} limit={} created={} duration_ms={}",
                format_date(date),
                limit,
                entries.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=schedule_generate module=schedule status=error date={} limit={} error_code={} error={}",
                format_date(date),
                limit,
                err.code(),
                err
            ),
        }
        result
    }

    /// Returns the schedule for `date`, ranked by current priority.
    pub fn get_schedule(&self, date: NaiveDate) -> ServiceResult<DaySchedule> {
        let items = self.schedule.list_items_for_date(date)?;
        Ok(DaySchedule::new(date, items, self.clock.now_ms()))
    }

    /// Marks one entry complete, then records a review on its chunk.
    ///
    /// # Errors
    /// - `NotFound` when the entry does not exist.
    /// - `InvalidArgument` when the entry is already completed.
    /// - `Storage` when the entry update itself fails.
    pub fn complete_entry(&self, id: ScheduleEntryId) -> ServiceResult<CompletionOutcome> {
        self.entry_locks.with_lock(&id, || {
            let mut entry = self.load_entry(id)?;
            if entry.completed {
                return Err(ServiceError::invalid_argument(format!(
                    "schedule entry {id} is already completed"
                )));
            }

            let now_ms = self.clock.now_ms();
            match self.schedule.mark_entry_completed(id, now_ms) {
                Ok(true) => entry.mark_completed(now_ms),
                Ok(false) => {
                    warn!(
                        "event=entry_complete module=schedule status=rejected entry_id={id} reason=completed_elsewhere"
                    );
                    return Err(ServiceError::invalid_argument(format!(
                        "schedule entry {id} is already completed"
                    )));
                }
                Err(err) => {
                    let err = ServiceError::from(err);
                    error!(
                        "event=entry_complete module=schedule status=error entry_id={id} error_code={} error={err}",
                        err.code()
                    );
                    return Err(err);
                }
            }

            match self.review_chunk(entry.chunk_id, now_ms) {
                Ok(chunk) => {
                    info!(
                        "event=entry_complete module=schedule status=ok entry_id={id} chunk_id={} review_count={}",
                        chunk.id, chunk.review_count
                    );
                    Ok(CompletionOutcome::Completed { entry, chunk })
                }
                Err(failure) => {
                    warn!(
                        "event=entry_complete module=schedule status=partial entry_id={id} chunk_id={} error_code={} error={failure}",
                        entry.chunk_id,
                        failure.code()
                    );
                    Ok(CompletionOutcome::PartialSuccess { entry, failure })
                }
            }
        })
    }

    /// Re-runs only the retention step for a completed entry.
    ///
    /// Intended for callers recovering from `CompletionOutcome::PartialSuccess`.
    /// Each call records one more review on the chunk.
    pub fn record_entry_review(&self, id: ScheduleEntryId) -> ServiceResult<Chunk> {
        self.entry_locks.with_lock(&id, || {
            let entry = self.load_entry(id)?;
            let completed_at = entry.completed_at.ok_or_else(|| {
                ServiceError::invalid_argument(format!("schedule entry {id} is not completed"))
            })?;
            let chunk = self.review_chunk(entry.chunk_id, completed_at)?;
            info!(
                "event=entry_review_retry module=schedule status=ok entry_id={id} chunk_id={}",
                chunk.id
            );
            Ok(chunk)
        })
    }

    /// Completed items scheduled within `[start, end]`, newest completion
    /// first.
    pub fn get_completed(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceResult<Vec<ScheduleItem>> {
        if start > end {
            return Err(ServiceError::invalid_argument(format!(
                "range start {} is after end {}",
                format_date(start),
                format_date(end)
            )));
        }
        Ok(self.schedule.list_completed_in_range(start, end)?)
    }

    fn regenerate_locked(&self, date: NaiveDate, limit: u32) -> ServiceResult<Vec<ScheduleEntry>> {
        let candidates = self.chunks.list_chunks_for_selection()?;
        let due = select_due(candidates, limit, self.clock.now_ms());
        let chunk_ids: Vec<ChunkId> = due.iter().map(|ranked| ranked.chunk.id).collect();
        let entries = self.schedule.replace_incomplete_entries(date, &chunk_ids)?;

        info!(
            "event=schedule_replace module=schedule status=ok date={} selected={}",
            format_date(date),
            chunk_ids.len()
        );
        Ok(entries)
    }

    fn load_entry(&self, id: ScheduleEntryId) -> ServiceResult<ScheduleEntry> {
        self.schedule
            .get_entry(id)?
            .ok_or(ServiceError::NotFound {
                kind: RecordKind::ScheduleEntry,
                id,
            })
    }

    fn review_chunk(&self, chunk_id: ChunkId, now_ms: i64) -> ServiceResult<Chunk> {
        let chunk = self.chunks.modify_chunk(chunk_id, &|chunk| {
            record_review(chunk, now_ms);
            Ok(())
        })?;
        Ok(chunk)
    }

    fn resolve_limit(&self, limit: Option<u32>) -> ServiceResult<u32> {
        match limit {
            None => Ok(self.config.default_limit()),
            Some(0) => Err(ServiceError::invalid_argument(
                "limit must be a positive integer",
            )),
            Some(value) => Ok(value.min(self.config.max_limit())),
        }
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_schedule_date(value: &str) -> ServiceResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ServiceError::invalid_argument(format!("malformed date `{value}`; expected YYYY-MM-DD"))
    })
}

/// Parses an opaque record identifier.
pub fn parse_record_id(value: &str) -> ServiceResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ServiceError::invalid_argument(format!("malformed id `{value}`")))
}
