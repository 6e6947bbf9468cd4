//! Chunk repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the chunk load/save contract used by the review scheduler.
//! - Provide chunk CRUD used by task management.
//!
//! # Invariants
//! - `list_chunks_for_selection` returns only review-eligible, non-mastered
//!   chunks in stable insertion order (`created_at ASC, rowid ASC`).
//! - Per-task listing is `order_within_task ASC NULLS LAST, created_at ASC`.
//! - Creating a chunk for a missing task returns `NotFound(Task)`.
//! - SQLite `modify_chunk` loads and saves inside one `IMMEDIATE`
//!   transaction, so writers on other connections cannot lose an update.

use crate::model::chunk::{Chunk, ChunkId};
use crate::model::task::TaskId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RecordKind, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

pub(crate) const CHUNK_COLUMNS: &str = "c.id AS id,
    c.task_id AS task_id,
    c.title AS title,
    c.user_importance AS user_importance,
    c.order_within_task AS order_within_task,
    c.review_eligible AS review_eligible,
    c.mastered AS mastered,
    c.last_reviewed AS last_reviewed,
    c.review_count AS review_count,
    c.retention_score AS retention_score,
    c.created_at AS created_at";

/// Repository interface for chunk persistence.
pub trait ChunkRepository {
    fn create_chunk(&self, chunk: &Chunk) -> RepoResult<ChunkId>;
    fn get_chunk(&self, id: ChunkId) -> RepoResult<Option<Chunk>>;
    fn list_chunks_for_task(&self, task_id: TaskId) -> RepoResult<Vec<Chunk>>;
    /// All review-eligible, non-mastered chunks in stable order.
    fn list_chunks_for_selection(&self) -> RepoResult<Vec<Chunk>>;
    /// Persists every mutable field of an existing chunk.
    fn save_chunk(&self, chunk: &Chunk) -> RepoResult<()>;
    fn delete_chunk(&self, id: ChunkId) -> RepoResult<()>;

    /// Loads chunk `id`, runs `update` on it and saves the result.
    ///
    /// Returns `NotFound(Chunk)` for a missing chunk. An error from `update`
    /// aborts without saving. The default is a plain read-modify-write;
    /// implementations backed by a transactional store should override it.
    fn modify_chunk(
        &self,
        id: ChunkId,
        update: &dyn Fn(&mut Chunk) -> RepoResult<()>,
    ) -> RepoResult<Chunk> {
        let mut chunk = self
            .get_chunk(id)?
            .ok_or(RepoError::not_found(RecordKind::Chunk, id))?;
        update(&mut chunk)?;
        self.save_chunk(&chunk)?;
        Ok(chunk)
    }
}

/// SQLite-backed chunk repository.
pub struct SqliteChunkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteChunkRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_chunks(&self, filter_sql: &str, param: Option<String>) -> RepoResult<Vec<Chunk>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CHUNK_COLUMNS} FROM task_chunks c {filter_sql};"))?;
        let mut rows = match param {
            Some(value) => stmt.query([value])?,
            None => stmt.query([])?,
        };
        let mut chunks = Vec::new();
        while let Some(row) = rows.next()? {
            chunks.push(read_chunk_row(row)?);
        }
        Ok(chunks)
    }
}

impl ChunkRepository for SqliteChunkRepository<'_> {
    fn create_chunk(&self, chunk: &Chunk) -> RepoResult<ChunkId> {
        chunk.validate()?;

        let task_exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1);",
            [chunk.task_id.to_string()],
            |row| row.get(0),
        )?;
        if !task_exists {
            return Err(RepoError::not_found(RecordKind::Task, chunk.task_id));
        }

        self.conn.execute(
            "INSERT INTO task_chunks (
                id,
                task_id,
                title,
                user_importance,
                order_within_task,
                review_eligible,
                mastered,
                last_reviewed,
                review_count,
                retention_score,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                chunk.id.to_string(),
                chunk.task_id.to_string(),
                chunk.title.as_str(),
                chunk.user_importance,
                chunk.order_within_task,
                bool_to_int(chunk.review_eligible),
                bool_to_int(chunk.mastered),
                chunk.last_reviewed,
                chunk.review_count,
                chunk.retention_score,
                chunk.created_at,
            ],
        )?;

        Ok(chunk.id)
    }

    fn get_chunk(&self, id: ChunkId) -> RepoResult<Option<Chunk>> {
        load_chunk(self.conn, id)
    }

    fn list_chunks_for_task(&self, task_id: TaskId) -> RepoResult<Vec<Chunk>> {
        self.query_chunks(
            "WHERE c.task_id = ?1
             ORDER BY c.order_within_task IS NULL, c.order_within_task ASC,
                      c.created_at ASC, c.rowid ASC",
            Some(task_id.to_string()),
        )
    }

    fn list_chunks_for_selection(&self) -> RepoResult<Vec<Chunk>> {
        self.query_chunks(
            "WHERE c.review_eligible = 1
               AND c.mastered = 0
             ORDER BY c.created_at ASC, c.rowid ASC",
            None,
        )
    }

    fn save_chunk(&self, chunk: &Chunk) -> RepoResult<()> {
        write_chunk(self.conn, chunk)
    }

    fn delete_chunk(&self, id: ChunkId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM task_chunks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::not_found(RecordKind::Chunk, id));
        }
        Ok(())
    }

    fn modify_chunk(
        &self,
        id: ChunkId,
        update: &dyn Fn(&mut Chunk) -> RepoResult<()>,
    ) -> RepoResult<Chunk> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut chunk =
            load_chunk(&tx, id)?.ok_or(RepoError::not_found(RecordKind::Chunk, id))?;
        update(&mut chunk)?;
        write_chunk(&tx, &chunk)?;
        tx.commit()?;
        Ok(chunk)
    }
}

fn load_chunk(conn: &Connection, id: ChunkId) -> RepoResult<Option<Chunk>> {
    let row = conn
        .query_row(
            &format!("SELECT {CHUNK_COLUMNS} FROM task_chunks c WHERE c.id = ?1;"),
            [id.to_string()],
            |row| Ok(read_chunk_row(row)),
        )
        .optional()?;

    row.transpose()
}

fn write_chunk(conn: &Connection, chunk: &Chunk) -> RepoResult<()> {
    chunk.validate()?;

    let changed = conn.execute(
        "UPDATE task_chunks
         SET
            title = ?1,
            user_importance = ?2,
            order_within_task = ?3,
            review_eligible = ?4,
            mastered = ?5,
            last_reviewed = ?6,
            review_count = ?7,
            retention_score = ?8
         WHERE id = ?9;",
        params![
            chunk.title.as_str(),
            chunk.user_importance,
            chunk.order_within_task,
            bool_to_int(chunk.review_eligible),
            bool_to_int(chunk.mastered),
            chunk.last_reviewed,
            chunk.review_count,
            chunk.retention_score,
            chunk.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::not_found(RecordKind::Chunk, chunk.id));
    }
    Ok(())
}

/// Parses a row selected with `CHUNK_COLUMNS`.
pub(crate) fn read_chunk_row(row: &Row<'_>) -> RepoResult<Chunk> {
    let id_text: String = row.get("id")?;
    let task_id_text: String = row.get("task_id")?;
    let review_count: i64 = row.get("review_count")?;
    let review_count = u32::try_from(review_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid review_count `{review_count}` in task_chunks.review_count"
        ))
    })?;

    let chunk = Chunk {
        id: parse_uuid(&id_text, "task_chunks.id")?,
        task_id: parse_uuid(&task_id_text, "task_chunks.task_id")?,
        title: row.get("title")?,
        user_importance: row.get("user_importance")?,
        order_within_task: row.get("order_within_task")?,
        review_eligible: parse_flag(row.get("review_eligible")?, "task_chunks.review_eligible")?,
        mastered: parse_flag(row.get("mastered")?, "task_chunks.mastered")?,
        last_reviewed: row.get("last_reviewed")?,
        review_count,
        retention_score: row.get("retention_score")?,
        created_at: row.get("created_at")?,
    };
    chunk.validate()?;
    Ok(chunk)
}
