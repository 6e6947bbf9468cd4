//! Daily schedule repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist schedule entries and the joined schedule listings.
//! - Provide the delete-then-insert regeneration step.
//!
//! # Invariants
//! - `delete_incomplete_entries` never touches completed entries.
//! - SQLite `replace_incomplete_entries` runs in one `IMMEDIATE`
//!   transaction, so concurrent writers cannot interleave delete and insert.
//! - SQLite `mark_entry_completed` is a single conditional update, so an
//!   entry is completed at most once across connections.
//! - Dates are stored as `YYYY-MM-DD` text, which orders chronologically.

use crate::model::chunk::ChunkId;
use crate::model::schedule::{ScheduleEntry, ScheduleEntryId, ScheduleItem};
use crate::repo::chunk_repo::{read_chunk_row, CHUNK_COLUMNS};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RecordKind, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const ENTRY_SELECT_SQL: &str = "SELECT
    id AS entry_id,
    chunk_id,
    scheduled_for,
    completed,
    completed_at
FROM daily_schedule";

/// Repository interface for schedule entry persistence.
pub trait ScheduleRepository {
    /// Deletes all incomplete entries for `date`, returning how many went.
    fn delete_incomplete_entries(&self, date: NaiveDate) -> RepoResult<usize>;
    /// Inserts one incomplete entry for `chunk_id` on `date`.
    fn insert_entry(&self, chunk_id: ChunkId, date: NaiveDate) -> RepoResult<ScheduleEntry>;
    fn get_entry(&self, id: ScheduleEntryId) -> RepoResult<Option<ScheduleEntry>>;
    /// Persists completion fields of an existing entry.
    fn save_entry(&self, entry: &ScheduleEntry) -> RepoResult<()>;
    /// Entries for `date` joined with chunk and task, in storage order.
    fn list_items_for_date(&self, date: NaiveDate) -> RepoResult<Vec<ScheduleItem>>;
    /// Completed entries with `start <= scheduled_for <= end`, most recently
    /// completed first.
    fn list_completed_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ScheduleItem>>;

    /// Completes entry `id` at `completed_at` if it is still pending.
    ///
    /// Returns `Ok(false)` when the entry was already completed and
    /// `NotFound(ScheduleEntry)` when it does not exist. The default reads
    /// then writes; transactional stores should override it.
    fn mark_entry_completed(&self, id: ScheduleEntryId, completed_at: i64) -> RepoResult<bool> {
        let mut entry = self
            .get_entry(id)?
            .ok_or(RepoError::not_found(RecordKind::ScheduleEntry, id))?;
        if entry.completed {
            return Ok(false);
        }
        entry.mark_completed(completed_at);
        self.save_entry(&entry)?;
        Ok(true)
    }

    /// Replaces the incomplete entries of `date` with fresh entries for
    /// `chunk_ids`, preserving order.
    ///
    /// The default runs the two steps back to back without atomicity;
    /// implementations backed by a transactional store should override it.
    fn replace_incomplete_entries(
        &self,
        date: NaiveDate,
        chunk_ids: &[ChunkId],
    ) -> RepoResult<Vec<ScheduleEntry>> {
        self.delete_incomplete_entries(date)?;
        chunk_ids
            .iter()
            .map(|chunk_id| self.insert_entry(*chunk_id, date))
            .collect()
    }
}

/// SQLite-backed schedule repository.
pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_items(&self, filter_sql: &str, bind: &[String]) -> RepoResult<Vec<ScheduleItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                ds.id AS entry_id,
                ds.chunk_id AS chunk_id,
                ds.scheduled_for AS scheduled_for,
                ds.completed AS completed,
                ds.completed_at AS completed_at,
                t.title AS task_title,
                {CHUNK_COLUMNS}
             FROM daily_schedule ds
             INNER JOIN task_chunks c ON c.id = ds.chunk_id
             INNER JOIN tasks t ON t.id = c.task_id
             {filter_sql};"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind.iter()))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(ScheduleItem {
                entry: read_entry_row(row)?,
                task_title: row.get("task_title")?,
                chunk: read_chunk_row(row)?,
            });
        }
        Ok(items)
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn delete_incomplete_entries(&self, date: NaiveDate) -> RepoResult<usize> {
        delete_incomplete(self.conn, date)
    }

    fn insert_entry(&self, chunk_id: ChunkId, date: NaiveDate) -> RepoResult<ScheduleEntry> {
        insert_incomplete(self.conn, chunk_id, date)
    }

    fn get_entry(&self, id: ScheduleEntryId) -> RepoResult<Option<ScheduleEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(read_entry_row(row)),
            )
            .optional()?;

        row.transpose()
    }

    fn save_entry(&self, entry: &ScheduleEntry) -> RepoResult<()> {
        entry.validate()?;

        let changed = self.conn.execute(
            "UPDATE daily_schedule
             SET completed = ?1, completed_at = ?2
             WHERE id = ?3;",
            params![
                bool_to_int(entry.completed),
                entry.completed_at,
                entry.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(RecordKind::ScheduleEntry, entry.id));
        }
        Ok(())
    }

    fn mark_entry_completed(&self, id: ScheduleEntryId, completed_at: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE daily_schedule
             SET completed = 1, completed_at = ?1
             WHERE id = ?2
               AND completed = 0;",
            params![completed_at, id.to_string()],
        )?;
        if changed == 1 {
            return Ok(true);
        }

        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM daily_schedule WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::not_found(RecordKind::ScheduleEntry, id));
        }
        Ok(false)
    }

    fn list_items_for_date(&self, date: NaiveDate) -> RepoResult<Vec<ScheduleItem>> {
        self.query_items(
            "WHERE ds.scheduled_for = ?1 ORDER BY ds.rowid ASC",
            &[format_date(date)],
        )
    }

    fn list_completed_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ScheduleItem>> {
        self.query_items(
            "WHERE ds.scheduled_for BETWEEN ?1 AND ?2
               AND ds.completed = 1
             ORDER BY ds.completed_at DESC, ds.rowid DESC",
            &[format_date(start), format_date(end)],
        )
    }

    fn replace_incomplete_entries(
        &self,
        date: NaiveDate,
        chunk_ids: &[ChunkId],
    ) -> RepoResult<Vec<ScheduleEntry>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_incomplete(&tx, date)?;
        let entries = chunk_ids
            .iter()
            .map(|chunk_id| insert_incomplete(&tx, *chunk_id, date))
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(entries)
    }
}

/// Formats a calendar date the way it is stored.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{value}` in daily_schedule.scheduled_for"
        ))
    })
}

fn delete_incomplete(conn: &Connection, date: NaiveDate) -> RepoResult<usize> {
    let removed = conn.execute(
        "DELETE FROM daily_schedule
         WHERE scheduled_for = ?1
           AND completed = 0;",
        [format_date(date)],
    )?;
    Ok(removed)
}

fn insert_incomplete(
    conn: &Connection,
    chunk_id: ChunkId,
    date: NaiveDate,
) -> RepoResult<ScheduleEntry> {
    let entry = ScheduleEntry::new(chunk_id, date);
    let chunk_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM task_chunks WHERE id = ?1);",
        [chunk_id.to_string()],
        |row| row.get(0),
    )?;
    if !chunk_exists {
        return Err(RepoError::not_found(RecordKind::Chunk, chunk_id));
    }

    conn.execute(
        "INSERT INTO daily_schedule (id, chunk_id, scheduled_for, completed, completed_at)
         VALUES (?1, ?2, ?3, 0, NULL);",
        params![
            entry.id.to_string(),
            chunk_id.to_string(),
            format_date(date),
        ],
    )?;
    Ok(entry)
}

fn read_entry_row(row: &Row<'_>) -> RepoResult<ScheduleEntry> {
    let id_text: String = row.get("entry_id")?;
    let chunk_id_text: String = row.get("chunk_id")?;
    let date_text: String = row.get("scheduled_for")?;

    let entry = ScheduleEntry {
        id: parse_uuid(&id_text, "daily_schedule.id")?,
        chunk_id: parse_uuid(&chunk_id_text, "daily_schedule.chunk_id")?,
        scheduled_for: parse_date(&date_text)?,
        completed: parse_flag(row.get("completed")?, "daily_schedule.completed")?,
        completed_at: row.get("completed_at")?,
    };
    entry.validate()?;
    Ok(entry)
}
