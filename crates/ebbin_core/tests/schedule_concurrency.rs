use chrono::NaiveDate;
use ebbin_core::{
    Chunk, ChunkId, ChunkRepository, ErrorKind, FixedClock, RecordKind, RepoError, RepoResult,
    ScheduleEntry, ScheduleEntryId, ScheduleItem, ScheduleRepository, ScheduleService, TaskId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use uuid::Uuid;

const NOW_MS: i64 = 1_710_111_600_000;

/// In-memory store whose delete and insert steps are not atomic together.
#[derive(Default)]
struct MemoryStore {
    chunks: Mutex<Vec<Chunk>>,
    entries: Mutex<Vec<ScheduleEntry>>,
    day_reads: AtomicUsize,
}

impl MemoryStore {
    fn with_chunks(count: usize) -> Self {
        let task_id = Uuid::new_v4();
        let chunks = (0..count)
            .map(|index| {
                let mut chunk = Chunk::new(task_id, format!("chunk {index}"), NOW_MS);
                chunk.user_importance = 0.1 + 0.05 * index as f64;
                chunk
            })
            .collect();
        Self {
            chunks: Mutex::new(chunks),
            entries: Mutex::new(Vec::new()),
            day_reads: AtomicUsize::new(0),
        }
    }

    fn item(&self, entry: &ScheduleEntry) -> Option<ScheduleItem> {
        let chunks = self.chunks.lock().unwrap();
        chunks
            .iter()
            .find(|chunk| chunk.id == entry.chunk_id)
            .map(|chunk| ScheduleItem {
                entry: entry.clone(),
                chunk: chunk.clone(),
                task_title: "task".to_string(),
            })
    }
}

impl ChunkRepository for &MemoryStore {
    fn create_chunk(&self, chunk: &Chunk) -> RepoResult<ChunkId> {
        chunk.validate()?;
        self.chunks.lock().unwrap().push(chunk.clone());
        Ok(chunk.id)
    }

    fn get_chunk(&self, id: ChunkId) -> RepoResult<Option<Chunk>> {
        let chunks = self.chunks.lock().unwrap();
        Ok(chunks.iter().find(|chunk| chunk.id == id).cloned())
    }

    fn list_chunks_for_task(&self, task_id: TaskId) -> RepoResult<Vec<Chunk>> {
        let chunks = self.chunks.lock().unwrap();
        Ok(chunks
            .iter()
            .filter(|chunk| chunk.task_id == task_id)
            .cloned()
            .collect())
    }

    fn list_chunks_for_selection(&self) -> RepoResult<Vec<Chunk>> {
        let chunks = self.chunks.lock().unwrap();
        Ok(chunks
            .iter()
            .filter(|chunk| chunk.is_schedulable())
            .cloned()
            .collect())
    }

    fn save_chunk(&self, chunk: &Chunk) -> RepoResult<()> {
        let mut chunks = self.chunks.lock().unwrap();
        let slot = chunks
            .iter_mut()
            .find(|stored| stored.id == chunk.id)
            .ok_or(RepoError::not_found(RecordKind::Chunk, chunk.id))?;
        *slot = chunk.clone();
        Ok(())
    }

    fn delete_chunk(&self, id: ChunkId) -> RepoResult<()> {
        self.chunks.lock().unwrap().retain(|chunk| chunk.id != id);
        Ok(())
    }
}

impl ScheduleRepository for &MemoryStore {
    fn delete_incomplete_entries(&self, date: NaiveDate) -> RepoResult<usize> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|entry| entry.completed || entry.scheduled_for != date);
        Ok(before - entries.len())
    }

    fn insert_entry(&self, chunk_id: ChunkId, date: NaiveDate) -> RepoResult<ScheduleEntry> {
        thread::yield_now();
        let entry = ScheduleEntry::new(chunk_id, date);
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    fn get_entry(&self, id: ScheduleEntryId) -> RepoResult<Option<ScheduleEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }

    fn save_entry(&self, entry: &ScheduleEntry) -> RepoResult<()> {
        entry.validate()?;
        let mut entries = self.entries.lock().unwrap();
        let slot = entries
            .iter_mut()
            .find(|stored| stored.id == entry.id)
            .ok_or(RepoError::not_found(RecordKind::ScheduleEntry, entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    fn list_items_for_date(&self, date: NaiveDate) -> RepoResult<Vec<ScheduleItem>> {
        self.day_reads.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<ScheduleEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.scheduled_for == date)
            .cloned()
            .collect();
        Ok(entries.iter().filter_map(|entry| self.item(entry)).collect())
    }

    fn list_completed_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<ScheduleItem>> {
        let entries: Vec<ScheduleEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.completed && (start..=end).contains(&entry.scheduled_for))
            .cloned()
            .collect();
        Ok(entries.iter().filter_map(|entry| self.item(entry)).collect())
    }
}

fn pending_for(store: &MemoryStore, date: NaiveDate) -> Vec<ChunkId> {
    store
        .entries
        .lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.scheduled_for == date && !entry.completed)
        .map(|entry| entry.chunk_id)
        .collect()
}

#[test]
fn concurrent_generation_for_one_date_never_duplicates_pending_entries() {
    let store = MemoryStore::with_chunks(6);
    let clock = FixedClock::new(NOW_MS);
    let service = ScheduleService::new(&store, &store, &clock);
    let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..25 {
                    service.generate_schedule(date, Some(4)).unwrap();
                }
            });
        }
    });

    let pending = pending_for(&store, date);
    let unique: HashSet<_> = pending.iter().collect();
    assert_eq!(pending.len(), 4);
    assert_eq!(unique.len(), 4);
}

#[test]
fn generation_writes_without_reading_the_day_listing() {
    let store = MemoryStore::with_chunks(3);
    let clock = FixedClock::new(NOW_MS);
    let service = ScheduleService::new(&store, &store, &clock);
    let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    service.generate_schedule(date, None).unwrap();
    service.generate_schedule(date, Some(2)).unwrap();
    assert_eq!(store.day_reads.load(Ordering::SeqCst), 0);

    assert_eq!(service.get_schedule(date).unwrap().items.len(), 2);
    assert_eq!(store.day_reads.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_generation_for_different_dates_is_independent() {
    let store = MemoryStore::with_chunks(5);
    let clock = FixedClock::new(NOW_MS);
    let service = ScheduleService::new(&store, &store, &clock);
    let first = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    thread::scope(|scope| {
        for offset in 0..4u64 {
            let service = &service;
            scope.spawn(move || {
                let date = first + chrono::Days::new(offset);
                for _ in 0..10 {
                    service.generate_schedule(date, None).unwrap();
                }
            });
        }
    });

    for offset in 0..4u64 {
        let date = first + chrono::Days::new(offset);
        assert_eq!(pending_for(&store, date).len(), 5);
    }
}

#[test]
fn concurrent_completion_of_one_entry_reviews_once() {
    let store = MemoryStore::with_chunks(1);
    let clock = FixedClock::new(NOW_MS);
    let service = ScheduleService::new(&store, &store, &clock);
    let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let entry = service.generate_schedule(date, None).unwrap().remove(0);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| service.complete_entry(entry.id)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| err.kind() == ErrorKind::InvalidArgument));

    let chunk = (&store).get_chunk(entry.chunk_id).unwrap().unwrap();
    assert_eq!(chunk.review_count, 1);
}
