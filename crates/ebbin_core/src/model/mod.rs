//! Domain model for tasks, reviewable chunks and daily schedule entries.
//!
//! # Responsibility
//! - Define canonical data structures used by the review scheduler.
//! - Own field-level validation shared by repository write/read paths.
//!
//! # Invariants
//! - Every domain object is identified by a stable UUID.
//! - Chunk priority is never stored; it is computed on read by
//!   `review::retention::compute_priority`.

pub mod chunk;
pub mod schedule;
pub mod task;
pub mod validation;
