//! Core domain logic for the Ebbin review scheduler.
//! This crate is the single source of truth for ranking and scheduling rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod review;
pub mod service;

pub use config::{ScheduleConfig, MAX_SCHEDULE_LIMIT};
pub use logging::{init_logging, logging_status, LogLevel};
pub use model::chunk::{Chunk, ChunkId, ChunkPatch, DEFAULT_IMPORTANCE};
pub use model::schedule::{ScheduleEntry, ScheduleEntryId, ScheduleItem};
pub use model::task::{Task, TaskId};
pub use model::validation::ValidationError;
pub use repo::chunk_repo::{ChunkRepository, SqliteChunkRepository};
pub use repo::schedule_repo::{ScheduleRepository, SqliteScheduleRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RecordKind, RepoError, RepoResult};
pub use review::clock::{Clock, FixedClock, SystemClock};
pub use review::day_schedule::{DaySchedule, DayScheduleState};
pub use review::due_set::{select_due, RankedChunk, DEFAULT_DUE_LIMIT};
pub use review::retention::{compute_priority, record_review};
pub use service::error::{ErrorKind, ServiceError, ServiceResult};
pub use service::schedule_service::{
    parse_record_id, parse_schedule_date, CompletionOutcome, ScheduleService,
};
pub use service::task_service::{NewChunk, TaskService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
