//! Review scheduling engine.
//!
//! # Responsibility
//! - Score chunks and update retention state (`retention`).
//! - Rank the due set with deterministic tie-breaks (`due_set`).
//! - Model one calendar day's schedule as an aggregate (`day_schedule`).
//! - Provide the time seam (`clock`) and per-key writer locks (`locks`).
//!
//! # Invariants
//! - Nothing in this module reads wall-clock time except `SystemClock`.
//! - Nothing in this module performs I/O.

pub mod clock;
pub mod day_schedule;
pub mod due_set;
pub mod locks;
pub mod retention;
