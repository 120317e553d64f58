//! Command handlers and plain-text rendering.

use crate::cli::Command;
use chrono::{Local, TimeZone};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use taskweave_core::{
    score_label, AnyTaskStore, AppConfig, CompleteOutcome, ConfigError, LoggingError, OwnerId,
    PersistenceError, StaticSession, StorageBackend, Task, TaskBoard, TaskDraft, TaskService,
    TaskServiceError,
};

/// Failures reported to the terminal.
#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    /// Row store selected without an owner id.
    MissingUser,
    Store(PersistenceError),
    Task(TaskServiceError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::MissingUser => write!(
                f,
                "the sqlite backend needs an owner; pass --user or set session.user_id"
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::MissingUser => None,
            Self::Store(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<PersistenceError> for CliError {
    fn from(value: PersistenceError) -> Self {
        Self::Store(value)
    }
}

impl From<TaskServiceError> for CliError {
    fn from(value: TaskServiceError) -> Self {
        Self::Task(value)
    }
}

type Service = TaskService<AnyTaskStore, StaticSession>;

/// Opens the configured backend with the owner it serves.
pub fn build_service(config: &AppConfig) -> Result<Service, CliError> {
    let owner = match config.storage.backend {
        StorageBackend::Local => OwnerId::local(),
        StorageBackend::Sqlite => config.session.user_id.ok_or(CliError::MissingUser)?,
    };
    let store = AnyTaskStore::open(&config.storage)?;
    Ok(TaskService::new(store, StaticSession::new(owner)))
}

/// Runs one command against a freshly loaded board.
pub async fn run(service: &Service, command: Command) -> Result<(), CliError> {
    let mut board = TaskBoard::new();
    service.reload(&mut board).await?;

    match command {
        Command::Add {
            text,
            urgency,
            importance,
            enjoyment,
            minutes,
            recurring,
        } => {
            let draft = TaskDraft {
                text,
                urgency,
                importance,
                enjoyment,
                estimated_minutes: minutes,
                is_recurring: recurring,
            };
            let task = service.create(&mut board, draft).await?;
            println!("added {}", render_task(&task));
        }
        Command::List => {
            if board.active().is_empty() {
                println!("no active tasks");
            }
            for task in board.active() {
                println!("{}", render_task(task));
            }
        }
        Command::Next => match board.focus_task() {
            Some(task) => println!("{}", render_task(task)),
            None => println!("nothing to do"),
        },
        Command::Edit {
            id,
            text,
            urgency,
            importance,
            enjoyment,
            minutes,
            recurring,
        } => {
            service.begin_edit(&mut board, id)?;
            if let Some(draft) = board.pending_draft_mut() {
                if let Some(text) = text {
                    draft.text = text;
                }
                if let Some(urgency) = urgency {
                    draft.urgency = urgency;
                }
                if let Some(importance) = importance {
                    draft.importance = importance;
                }
                if let Some(enjoyment) = enjoyment {
                    draft.enjoyment = enjoyment;
                }
                if let Some(minutes) = minutes {
                    draft.estimated_minutes = minutes;
                }
                if let Some(recurring) = recurring {
                    draft.is_recurring = recurring;
                }
            }
            let task = service.submit_edit(&mut board).await?;
            println!("updated {}", render_task(&task));
        }
        Command::Complete { id } => {
            let CompleteOutcome {
                completed,
                respawned,
            } = service.complete(&mut board, id).await?;
            println!("completed {}", render_task(&completed));
            if let Some(task) = respawned {
                println!("next occurrence {}", render_task(&task));
            }
        }
        Command::History { limit } => {
            if board.completed().is_empty() {
                println!("nothing completed yet");
            }
            for task in board.completed().iter().take(limit) {
                println!(
                    "{}  {}",
                    render_completed_at(task.completed_at),
                    render_task(task)
                );
            }
        }
    }

    info!(
        "event=cli_command module=cli status=ok active={} completed={}",
        board.active().len(),
        board.completed().len()
    );
    Ok(())
}

fn render_task(task: &Task) -> String {
    format!(
        "#{} [{}] u{} i{} e{} {}m{} {}",
        task.id,
        score_label(task),
        task.urgency,
        task.importance,
        task.enjoyment,
        task.estimated_minutes,
        if task.is_recurring { " (recurring)" } else { "" },
        task.text
    )
}

fn render_completed_at(completed_at: Option<i64>) -> String {
    completed_at
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map_or_else(
            || "unknown".to_string(),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        )
}
