//! Command-line front end for the review scheduler.
//!
//! # Responsibility
//! - Parse commands and route them to `TaskService` / `ScheduleService`.
//! - Render results as plain text lines.
//!
//! # Invariants
//! - The database is opened (and migrated) once per invocation.
//! - Failures print one `error[<code>]` line to stderr and exit non-zero.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ebbin_core::db::open_db;
use ebbin_core::{
    core_version, init_logging, parse_record_id, parse_schedule_date, ChunkPatch,
    CompletionOutcome, ErrorKind, LogLevel, NewChunk, RepoError, ScheduleItem, ScheduleService,
    ServiceError, SqliteChunkRepository, SqliteScheduleRepository, SqliteTaskRepository,
    SystemClock, TaskService,
};
use log::info;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "ebbin", version, about = "Spaced review scheduler for task chunks")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "ebbin.db")]
    db: PathBuf,
    /// Directory for rolling log files. Logging is off when omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a task.
    AddTask {
        title: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List tasks, newest first.
    Tasks {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Delete a task with its chunks and schedule entries.
    DeleteTask { id: String },
    /// Add a chunk to a task.
    AddChunk {
        task_id: String,
        title: String,
        /// Importance in [0, 1].
        #[arg(long)]
        importance: Option<f64>,
        #[arg(long)]
        order: Option<i64>,
        /// Exclude the chunk from scheduling.
        #[arg(long)]
        not_eligible: bool,
    },
    /// List chunks of a task.
    Chunks { task_id: String },
    /// Change user-editable chunk fields.
    UpdateChunk {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        importance: Option<f64>,
        #[arg(long, conflicts_with = "clear_order")]
        order: Option<i64>,
        #[arg(long)]
        clear_order: bool,
        #[arg(long)]
        eligible: Option<bool>,
        #[arg(long)]
        mastered: Option<bool>,
    },
    /// Delete a chunk.
    DeleteChunk { id: String },
    /// Record a review on a chunk outside of any schedule.
    ReviewChunk { id: String },
    /// Show the ranked due set without writing anything.
    Due {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Regenerate the schedule for a date (default: today).
    Generate {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the schedule for a date (default: today).
    Schedule {
        #[arg(long)]
        date: Option<String>,
    },
    /// Complete a schedule entry.
    Complete { id: String },
    /// Retry the retention update of a completed entry.
    RetryReview { id: String },
    /// List completed items scheduled between two dates, inclusive.
    Completed { start: String, end: String },
}

#[derive(Debug)]
enum CliError {
    Setup(String),
    Service(ServiceError),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup_failed",
            Self::Service(err) => err.code(),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Self::Setup(_) => 1,
            Self::Service(err) => match err.kind() {
                ErrorKind::StorageFailure => 1,
                ErrorKind::InvalidArgument => 2,
                ErrorKind::NotFound => 3,
            },
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup(message) => f.write_str(message),
            Self::Service(err) => write!(f, "{err}"),
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Service(value.into())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.code());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| LogLevel::build_default().to_string());
        init_logging(&level, absolute(log_dir)?).map_err(CliError::Setup)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let conn = open_db(&cli.db).map_err(|err| {
        CliError::Setup(format!("cannot open `{}`: {err}", cli.db.display()))
    })?;
    let tasks = TaskService::new(
        SqliteTaskRepository::try_new(&conn)?,
        SqliteChunkRepository::try_new(&conn)?,
        SystemClock,
    );
    let schedule = ScheduleService::new(
        SqliteChunkRepository::try_new(&conn)?,
        SqliteScheduleRepository::try_new(&conn)?,
        SystemClock,
    );

    match cli.command {
        Command::AddTask { title, owner } => {
            let task = tasks.create_task(title, owner)?;
            println!("{}\t{}", task.id, task.title);
        }
        Command::Tasks { owner } => {
            for task in tasks.list_tasks(owner.as_deref())? {
                let owner = task.owner.as_deref().unwrap_or("-");
                println!("{}\t{}\t{}", task.id, owner, task.title);
            }
        }
        Command::DeleteTask { id } => {
            tasks.delete_task(parse_record_id(&id)?)?;
            println!("deleted task {id}");
        }
        Command::AddChunk {
            task_id,
            title,
            importance,
            order,
            not_eligible,
        } => {
            let mut request = NewChunk::new(parse_record_id(&task_id)?, title);
            request.user_importance = importance;
            request.order_within_task = order;
            request.review_eligible = Some(!not_eligible);
            let chunk = tasks.create_chunk(request)?;
            println!("{}\t{}", chunk.id, chunk.title);
        }
        Command::Chunks { task_id } => {
            for chunk in tasks.list_chunks(parse_record_id(&task_id)?)? {
                println!(
                    "{}\timportance={:.2}\treviews={}\tretention={:.2}\t{}{}",
                    chunk.id,
                    chunk.user_importance,
                    chunk.review_count,
                    chunk.retention_score,
                    if chunk.mastered { "[mastered] " } else { "" },
                    chunk.title
                );
            }
        }
        Command::UpdateChunk {
            id,
            title,
            importance,
            order,
            clear_order,
            eligible,
            mastered,
        } => {
            let patch = ChunkPatch {
                title,
                user_importance: importance,
                order_within_task: if clear_order { Some(None) } else { order.map(Some) },
                review_eligible: eligible,
                mastered,
            };
            let chunk = tasks.update_chunk(parse_record_id(&id)?, &patch)?;
            println!("{}\t{}", chunk.id, chunk.title);
        }
        Command::DeleteChunk { id } => {
            tasks.delete_chunk(parse_record_id(&id)?)?;
            println!("deleted chunk {id}");
        }
        Command::ReviewChunk { id } => {
            let chunk = tasks.review_chunk(parse_record_id(&id)?)?;
            println!(
                "{}\treviews={}\tretention={:.2}",
                chunk.id, chunk.review_count, chunk.retention_score
            );
        }
        Command::Due { limit } => {
            for ranked in schedule.select_due(limit)? {
                println!(
                    "{:.3}\t{}\t{}",
                    ranked.priority, ranked.chunk.id, ranked.chunk.title
                );
            }
        }
        Command::Generate { date, limit } => {
            let date = resolve_date(date.as_deref(), || schedule.today())?;
            let entries = schedule.generate_schedule(date, limit)?;
            println!("generated {} entries for {date}", entries.len());
            for entry in entries {
                println!("{}\t{}", entry.id, entry.chunk_id);
            }
        }
        Command::Schedule { date } => {
            let date = resolve_date(date.as_deref(), || schedule.today())?;
            let day = schedule.get_schedule(date)?;
            println!(
                "{date}\t{}\t{}/{} done",
                day.state(),
                day.completed_count(),
                day.items.len()
            );
            for item in &day.items {
                print_item(item);
            }
        }
        Command::Complete { id } => match schedule.complete_entry(parse_record_id(&id)?)? {
            CompletionOutcome::Completed { entry, chunk } => println!(
                "completed {}\treviews={}\tretention={:.2}",
                entry.id, chunk.review_count, chunk.retention_score
            ),
            CompletionOutcome::PartialSuccess { entry, failure } => println!(
                "completed {} but retention update failed: {failure}; run `ebbin retry-review {}`",
                entry.id, entry.id
            ),
        },
        Command::RetryReview { id } => {
            let chunk = schedule.record_entry_review(parse_record_id(&id)?)?;
            println!(
                "{}\treviews={}\tretention={:.2}",
                chunk.id, chunk.review_count, chunk.retention_score
            );
        }
        Command::Completed { start, end } => {
            let start = parse_schedule_date(&start)?;
            let end = parse_schedule_date(&end)?;
            for item in schedule.get_completed(start, end)? {
                print_item(&item);
            }
        }
    }
    Ok(())
}

fn resolve_date(
    value: Option<&str>,
    today: impl FnOnce() -> NaiveDate,
) -> Result<NaiveDate, ServiceError> {
    match value {
        Some(value) => parse_schedule_date(value),
        None => Ok(today()),
    }
}

fn print_item(item: &ScheduleItem) {
    let mark = if item.entry.completed { "x" } else { " " };
    println!(
        "[{mark}] {}\t{}\t{} / {}",
        item.entry.id, item.entry.scheduled_for, item.task_title, item.chunk.title
    );
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|err| CliError::Setup(format!("cannot resolve working directory: {err}")))?;
    Ok(cwd.join(path))
}
