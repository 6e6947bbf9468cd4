use chrono::NaiveDate;
use ebbin_core::db::open_db_in_memory;
use ebbin_core::{
    Chunk, ChunkId, ChunkPatch, DayScheduleState, ErrorKind, FixedClock, NewChunk,
    ScheduleConfig, ScheduleService, SqliteChunkRepository, SqliteScheduleRepository,
    SqliteTaskRepository, TaskService,
};
use rusqlite::Connection;
use std::collections::BTreeSet;

// 2024-03-10T23:00:00Z
const NOW_MS: i64 = 1_710_111_600_000;

type Tasks<'a> = TaskService<SqliteTaskRepository<'a>, SqliteChunkRepository<'a>, &'a FixedClock>;
type Schedule<'a> =
    ScheduleService<SqliteChunkRepository<'a>, SqliteScheduleRepository<'a>, &'a FixedClock>;

fn services<'a>(conn: &'a Connection, clock: &'a FixedClock) -> (Tasks<'a>, Schedule<'a>) {
    let tasks = TaskService::new(
        SqliteTaskRepository::try_new(conn).unwrap(),
        SqliteChunkRepository::try_new(conn).unwrap(),
        clock,
    );
    let schedule = ScheduleService::new(
        SqliteChunkRepository::try_new(conn).unwrap(),
        SqliteScheduleRepository::try_new(conn).unwrap(),
        clock,
    );
    (tasks, schedule)
}

fn seed(tasks: &Tasks<'_>, importances: &[f64]) -> Vec<Chunk> {
    let task = tasks.create_task("Task", None).unwrap();
    importances
        .iter()
        .enumerate()
        .map(|(index, importance)| {
            let mut request = NewChunk::new(task.id, format!("chunk {index}"));
            request.user_importance = Some(*importance);
            tasks.create_chunk(request).unwrap()
        })
        .collect()
}

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn pending_chunk_ids(schedule: &Schedule<'_>, day: NaiveDate) -> Vec<ChunkId> {
    let mut ids: Vec<ChunkId> = schedule
        .get_schedule(day)
        .unwrap()
        .pending()
        .map(|item| item.chunk.id)
        .collect();
    ids.sort();
    ids
}

#[test]
fn generate_creates_entries_in_priority_order() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    let chunks = seed(&tasks, &[0.2, 0.9, 0.5]);

    let entries = schedule.generate_schedule(schedule.today(), None).unwrap();

    let ids: Vec<ChunkId> = entries.iter().map(|entry| entry.chunk_id).collect();
    assert_eq!(ids, vec![chunks[1].id, chunks[2].id, chunks[0].id]);
    assert!(entries.iter().all(|entry| !entry.completed));
    assert!(entries
        .iter()
        .all(|entry| entry.scheduled_for == date("2024-03-10")));

    let day = schedule.get_schedule(date("2024-03-10")).unwrap();
    assert_eq!(day.state(), DayScheduleState::Populated);
    let listed: Vec<ChunkId> = day.items.iter().map(|item| item.chunk.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(day.items[0].task_title, "Task");
}

#[test]
fn generate_honors_limits() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    seed(&tasks, &[0.5; 12]);
    let day = date("2024-03-11");

    assert_eq!(schedule.generate_schedule(day, None).unwrap().len(), 10);
    assert_eq!(schedule.generate_schedule(day, Some(3)).unwrap().len(), 3);
    assert_eq!(schedule.get_schedule(day).unwrap().items.len(), 3);
    assert_eq!(schedule.generate_schedule(day, Some(5_000)).unwrap().len(), 12);

    let err = schedule.generate_schedule(day, Some(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(schedule.get_schedule(day).unwrap().items.len(), 12);
}

#[test]
fn configured_max_limit_caps_requests() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let tasks = TaskService::new(
        SqliteTaskRepository::try_new(&conn).unwrap(),
        SqliteChunkRepository::try_new(&conn).unwrap(),
        &clock,
    );
    let schedule = ScheduleService::with_config(
        SqliteChunkRepository::try_new(&conn).unwrap(),
        SqliteScheduleRepository::try_new(&conn).unwrap(),
        &clock,
        ScheduleConfig::new(2, 4).unwrap(),
    );
    seed(&tasks, &[0.5; 6]);

    assert_eq!(schedule.config().default_limit(), 2);
    assert_eq!(schedule.config().max_limit(), 4);
    assert_eq!(schedule.select_due(None).unwrap().len(), 2);
    assert_eq!(schedule.select_due(Some(50)).unwrap().len(), 4);
}

#[test]
fn smallest_valid_config_still_schedules_one_chunk() {
    assert!(ScheduleConfig::new(0, 0).is_err());

    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, _) = services(&conn, &clock);
    let schedule = ScheduleService::with_config(
        SqliteChunkRepository::try_new(&conn).unwrap(),
        SqliteScheduleRepository::try_new(&conn).unwrap(),
        &clock,
        ScheduleConfig::new(1, 1).unwrap(),
    );
    seed(&tasks, &[0.5, 0.6]);

    let entries = schedule.generate_schedule(date("2024-03-10"), None).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn regeneration_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    seed(&tasks, &[0.3, 0.6, 0.9]);
    let day = date("2024-03-10");

    let first = schedule.generate_schedule(day, Some(10)).unwrap();
    let after_first = pending_chunk_ids(&schedule, day);
    let second = schedule.generate_schedule(day, Some(10)).unwrap();
    let after_second = pending_chunk_ids(&schedule, day);

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.len(), 3);
    let first_ids: BTreeSet<_> = first.iter().map(|entry| entry.id).collect();
    assert!(second.iter().all(|entry| !first_ids.contains(&entry.id)));
}

#[test]
fn regeneration_preserves_completed_entries() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    seed(&tasks, &[0.4, 0.8]);
    let day = date("2024-03-10");

    let entries = schedule.generate_schedule(day, None).unwrap();
    clock.advance(5 * 60_000);
    let outcome = schedule.complete_entry(entries[0].id).unwrap();
    assert!(!outcome.is_partial());
    let completed_at = outcome.entry().completed_at;
    assert_eq!(completed_at, Some(NOW_MS + 5 * 60_000));

    clock.advance(60_000);
    let regenerated = schedule.generate_schedule(day, None).unwrap();
    assert!(regenerated.iter().all(|entry| entry.id != entries[1].id));

    let day_schedule = schedule.get_schedule(day).unwrap();
    let kept = day_schedule
        .items
        .iter()
        .find(|item| item.entry.id == entries[0].id)
        .unwrap();
    assert!(kept.entry.completed);
    assert_eq!(kept.entry.completed_at, completed_at);
    assert_eq!(day_schedule.completed_count(), 1);
    assert_eq!(day_schedule.pending().count(), regenerated.len());
    assert_eq!(day_schedule.state(), DayScheduleState::PartiallyCompleted);
}

#[test]
fn empty_due_set_clears_incomplete_entries() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    let chunks = seed(&tasks, &[0.5, 0.7]);
    let day = date("2024-03-10");

    schedule.generate_schedule(day, None).unwrap();
    tasks
        .update_chunk(
            chunks[0].id,
            &ChunkPatch {
                mastered: Some(true),
                ..ChunkPatch::default()
            },
        )
        .unwrap();
    tasks
        .update_chunk(
            chunks[1].id,
            &ChunkPatch {
                review_eligible: Some(false),
                ..ChunkPatch::default()
            },
        )
        .unwrap();

    let regenerated = schedule.generate_schedule(day, None).unwrap();
    assert!(regenerated.is_empty());
    let day_schedule = schedule.get_schedule(day).unwrap();
    assert!(day_schedule.is_empty());
    assert_eq!(day_schedule.state(), DayScheduleState::Empty);
}

#[test]
fn generate_on_empty_corpus_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (_tasks, schedule) = services(&conn, &clock);

    assert!(schedule.select_due(Some(10)).unwrap().is_empty());
    assert!(schedule
        .generate_schedule(date("2024-03-10"), Some(10))
        .unwrap()
        .is_empty());
}

#[test]
fn past_dates_can_be_regenerated() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    seed(&tasks, &[0.5]);
    let past = date("2020-01-01");

    assert_eq!(schedule.generate_schedule(past, None).unwrap().len(), 1);
    assert_eq!(schedule.generate_schedule(past, None).unwrap().len(), 1);
    assert_eq!(schedule.get_schedule(past).unwrap().items.len(), 1);
    assert!(schedule
        .get_schedule(date("2024-03-10"))
        .unwrap()
        .is_empty());
}

#[test]
fn dates_are_independent() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    seed(&tasks, &[0.5, 0.6]);

    schedule
        .generate_schedule(date("2024-03-10"), None)
        .unwrap();
    schedule
        .generate_schedule(date("2024-03-11"), Some(1))
        .unwrap();

    assert_eq!(
        schedule
            .get_schedule(date("2024-03-10"))
            .unwrap()
            .items
            .len(),
        2
    );
    assert_eq!(
        schedule
            .get_schedule(date("2024-03-11"))
            .unwrap()
            .items
            .len(),
        1
    );
}

#[test]
fn deleting_a_chunk_removes_its_entries() {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock::new(NOW_MS);
    let (tasks, schedule) = services(&conn, &clock);
    let chunks = seed(&tasks, &[0.5, 0.6]);
    let day = date("2024-03-10");

    schedule.generate_schedule(day, None).unwrap();
    tasks.delete_chunk(chunks[0].id).unwrap();

    let remaining: Vec<ChunkId> = schedule
        .get_schedule(day)
        .unwrap()
        .items
        .iter()
        .map(|item| item.chunk.id)
        .collect();
    assert_eq!(remaining, vec![chunks[1].id]);
}
