//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into caller-facing operations.
//! - Keep CLI and other outer layers decoupled from storage details.

pub mod error;
pub mod schedule_service;
pub mod task_service;
