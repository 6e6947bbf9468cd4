//! Task and chunk management use-case service.
//!
//! # Responsibility
//! - Create, read, update and delete tasks and their chunks.
//! - Record ad-hoc reviews on a chunk outside of a schedule.
//!
//! # Invariants
//! - A chunk is only created under an existing task.
//! - Chunk updates must set at least one field.
//! - A mastered chunk stays mastered.
//! - Chunk updates and reviews are single read-modify-write steps in the
//!   store, so concurrent writers cannot lose each other's changes.
//! - Reviews go through `review::retention::record_review`, the same path
//!   used by schedule completion.

use crate::model::chunk::{Chunk, ChunkId, ChunkPatch, DEFAULT_IMPORTANCE};
use crate::model::task::{Task, TaskId};
use crate::repo::chunk_repo::ChunkRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::RecordKind;
use crate::review::clock::Clock;
use crate::review::retention::record_review;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

/// Request model for creating one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub task_id: TaskId,
    pub title: String,
    /// Defaults to `DEFAULT_IMPORTANCE`.
    pub user_importance: Option<f64>,
    pub order_within_task: Option<i64>,
    /// Defaults to `true`.
    pub review_eligible: Option<bool>,
}

impl NewChunk {
    pub fn new(task_id: TaskId, title: impl Into<String>) -> Self {
        Self {
            task_id,
            title: title.into(),
            user_importance: None,
            order_within_task: None,
            review_eligible: None,
        }
    }
}

/// Task service facade over task/chunk repositories and a clock.
pub struct TaskService<T, C, K>
where
    T: TaskRepository,
    C: ChunkRepository,
    K: Clock,
{
    tasks: T,
    chunks: C,
    clock: K,
}

impl<T, C, K> TaskService<T, C, K>
where
    T: TaskRepository,
    C: ChunkRepository,
    K: Clock,
{
    pub fn new(tasks: T, chunks: C, clock: K) -> Self {
        Self {
            tasks,
            chunks,
            clock,
        }
    }

    /// Creates a task with an optional owner.
    pub fn create_task(
        &self,
        title: impl Into<String>,
        owner: Option<String>,
    ) -> ServiceResult<Task> {
        let title: String = title.into();
        let mut task = Task::new(title.trim(), self.clock.now_ms());
        task.owner = owner;
        self.tasks.create_task(&task)?;
        info!(
            "event=task_create module=task status=ok task_id={}",
            task.id
        );
        Ok(task)
    }

    /// Lists tasks, newest first.
    pub fn list_tasks(&self, owner: Option<&str>) -> ServiceResult<Vec<Task>> {
        Ok(self.tasks.list_tasks(owner)?)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.tasks.get_task(id)?.ok_or(ServiceError::NotFound {
            kind: RecordKind::Task,
            id,
        })
    }

    /// Replaces the task title.
    pub fn rename_task(&self, id: TaskId, title: impl Into<String>) -> ServiceResult<Task> {
        let title: String = title.into();
        let mut task = self.get_task(id)?;
        task.title = title.trim().to_string();
        self.tasks.update_task(&task)?;
        Ok(task)
    }

    /// Deletes a task together with its chunks and their schedule entries.
    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        self.tasks.delete_task(id)?;
        info!("event=task_delete module=task status=ok task_id={id}");
        Ok(())
    }

    /// Creates a never-reviewed chunk under an existing task.
    pub fn create_chunk(&self, request: NewChunk) -> ServiceResult<Chunk> {
        let mut chunk = Chunk::new(
            request.task_id,
            request.title.trim(),
            self.clock.now_ms(),
        );
        chunk.user_importance = request.user_importance.unwrap_or(DEFAULT_IMPORTANCE);
        chunk.order_within_task = request.order_within_task;
        chunk.review_eligible = request.review_eligible.unwrap_or(true);

        self.chunks.create_chunk(&chunk)?;
        info!(
            "event=chunk_create module=task status=ok task_id={} chunk_id={}",
            chunk.task_id, chunk.id
        );
        Ok(chunk)
    }

    /// Lists chunks of one task in display order.
    pub fn list_chunks(&self, task_id: TaskId) -> ServiceResult<Vec<Chunk>> {
        Ok(self.chunks.list_chunks_for_task(task_id)?)
    }

    pub fn get_chunk(&self, id: ChunkId) -> ServiceResult<Chunk> {
        self.chunks.get_chunk(id)?.ok_or(ServiceError::NotFound {
            kind: RecordKind::Chunk,
            id,
        })
    }

    /// Applies a partial update to user-editable chunk fields.
    ///
    /// # Errors
    /// - `InvalidArgument` when `patch` sets no field, produces invalid
    ///   values, or unsets `mastered` on a mastered chunk.
    /// - `NotFound` when the chunk does not exist.
    pub fn update_chunk(&self, id: ChunkId, patch: &ChunkPatch) -> ServiceResult<Chunk> {
        if patch.is_empty() {
            return Err(ServiceError::invalid_argument("no fields to update"));
        }

        let chunk = self
            .chunks
            .modify_chunk(id, &|chunk| Ok(patch.apply(chunk)?))?;
        info!(
            "event=chunk_update module=task status=ok chunk_id={id} mastered={}",
            chunk.mastered
        );
        Ok(chunk)
    }

    pub fn delete_chunk(&self, id: ChunkId) -> ServiceResult<()> {
        Ok(self.chunks.delete_chunk(id)?)
    }

    /// Records one review on a chunk without going through a schedule.
    pub fn review_chunk(&self, id: ChunkId) -> ServiceResult<Chunk> {
        let now_ms = self.clock.now_ms();
        let chunk = self.chunks.modify_chunk(id, &|chunk| {
            record_review(chunk, now_ms);
            Ok(())
        })?;
        info!(
            "event=chunk_review module=task status=ok chunk_id={id} review_count={}",
            chunk.review_count
        );
        Ok(chunk)
    }
}
