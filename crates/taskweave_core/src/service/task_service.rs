//! Task lifecycle use-case service.
//!
//! # Responsibility
//! - Validate drafts, route writes through the persistence adapter, and
//!   reflect successful writes into the caller's [`TaskBoard`].
//! - Own the active → completed transition and recurring respawn.
//!
//! # Invariants
//! - Write before reflect: the board changes only after the store confirmed
//!   the write. A failed write leaves the board exactly as it was.
//! - Validation failures never reach the store.
//! - No operation runs without an owner from the session boundary.
//! - No automatic retries.

use crate::model::task::{
    now_epoch_ms, OwnerId, Task, TaskDraft, TaskId, TaskPatch, TaskValidationError,
};
use crate::service::board::{PendingEdit, TaskBoard};
use crate::session::{SessionEvent, SessionProvider};
use crate::store::{PersistenceError, TaskStore};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from lifecycle operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Draft rejected locally; the form should stay populated.
    Validation(TaskValidationError),
    /// No active task with this id.
    NotFound(TaskId),
    /// No signed-in owner.
    NoSession,
    /// `submit_edit` called without `begin_edit`.
    NoPendingEdit,
    /// Storage rejected the write; nothing was applied.
    Persistence(PersistenceError),
    /// Completion was stored and reflected, but the next recurring instance
    /// could not be inserted.
    RespawnFailed {
        completed: Task,
        source: PersistenceError,
    },
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "no active task with id {id}"),
            Self::NoSession => write!(f, "not signed in"),
            Self::NoPendingEdit => write!(f, "no edit in progress"),
            Self::Persistence(err) => write!(f, "could not save changes: {err}"),
            Self::RespawnFailed { completed, source } => write!(
                f,
                "task {} was completed but its next occurrence could not be created: {source}",
                completed.id
            ),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::RespawnFailed { source, .. } => Some(source),
            Self::NotFound(_) | Self::NoSession | Self::NoPendingEdit => None,
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<PersistenceError> for TaskServiceError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::NotFound(id) => Self::NotFound(id),
            PersistenceError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

/// Result of completing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteOutcome {
    /// The task as moved into the completed set.
    pub completed: Task,
    /// Next instance of a recurring task, appended to the active set.
    pub respawned: Option<Task>,
}

/// Lifecycle manager over a persistence backend and a session boundary.
pub struct TaskService<S: TaskStore, P: SessionProvider> {
    store: S,
    session: P,
}

impl<S: TaskStore, P: SessionProvider> TaskService<S, P> {
    pub fn new(store: S, session: P) -> Self {
        Self { store, session }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &P {
        &self.session
    }

    fn require_owner(&self) -> Result<OwnerId, TaskServiceError> {
        self.session
            .current_owner()
            .ok_or(TaskServiceError::NoSession)
    }

    /// Replaces both sets with the owner's persisted tasks.
    ///
    /// The board is untouched unless both loads succeed.
    pub async fn reload(&self, board: &mut TaskBoard) -> Result<(), TaskServiceError> {
        let owner = self.require_owner()?;
        self.reload_for(board, owner).await
    }

    async fn reload_for(
        &self,
        board: &mut TaskBoard,
        owner: OwnerId,
    ) -> Result<(), TaskServiceError> {
        let started_at = Instant::now();
        let loaded = async {
            let active = self.store.load_active(owner).await?;
            let completed = self.store.load_completed(owner).await?;
            Ok::<_, PersistenceError>((active, completed))
        }
        .await;

        match loaded {
            Ok((active, completed)) => {
                info!(
                    "event=task_reload module=service status=ok backend={} active={} completed={} duration_ms={}",
                    self.store.backend(),
                    active.len(),
                    completed.len(),
                    started_at.elapsed().as_millis()
                );
                board.replace(active, completed);
                Ok(())
            }
            Err(err) => {
                log_failure("task_reload", None, &err, started_at);
                Err(err.into())
            }
        }
    }

    /// Reacts to a session transition: load on sign-in, clear on sign-out.
    pub async fn handle_session_event(
        &self,
        board: &mut TaskBoard,
        event: SessionEvent,
    ) -> Result<(), TaskServiceError> {
        match event {
            SessionEvent::SignedIn(owner) => self.reload_for(board, owner).await,
            SessionEvent::SignedOut => {
                board.clear();
                info!("event=board_clear module=service status=ok reason=sign_out");
                Ok(())
            }
        }
    }

    /// Validates and persists a new active task, then appends it.
    pub async fn create(
        &self,
        board: &mut TaskBoard,
        draft: TaskDraft,
    ) -> Result<Task, TaskServiceError> {
        if let Err(err) = draft.validate() {
            warn!(
                "event=task_create module=service status=rejected reason={}",
                validation_reason(&err)
            );
            return Err(err.into());
        }
        let owner = self.require_owner()?;

        let started_at = Instant::now();
        let task = match self.store.insert(owner, &draft).await {
            Ok(task) => task,
            Err(err) => {
                log_failure("task_create", None, &err, started_at);
                return Err(err.into());
            }
        };

        board.push_active(task.clone());
        info!(
            "event=task_create module=service status=ok task_id={} recurring={} duration_ms={}",
            task.id,
            task.is_recurring,
            started_at.elapsed().as_millis()
        );
        Ok(task)
    }

    /// Opens the edit form for an active task, prefilled from its fields.
    pub fn begin_edit(
        &self,
        board: &mut TaskBoard,
        id: TaskId,
    ) -> Result<TaskDraft, TaskServiceError> {
        let task = board
            .active_task(id)
            .ok_or(TaskServiceError::NotFound(id))?;
        let draft = TaskDraft::from(task);
        board.set_pending_edit(Some(PendingEdit {
            task_id: id,
            draft: draft.clone(),
        }));
        Ok(draft)
    }

    /// Discards the pending edit draft without touching the task.
    pub fn cancel_edit(&self, board: &mut TaskBoard) {
        board.set_pending_edit(None);
    }

    /// Saves the pending edit draft.
    ///
    /// On failure the pending edit stays in place so the form keeps its input.
    pub async fn submit_edit(&self, board: &mut TaskBoard) -> Result<Task, TaskServiceError> {
        let PendingEdit { task_id, draft } = board
            .pending_edit()
            .cloned()
            .ok_or(TaskServiceError::NoPendingEdit)?;
        self.edit(board, task_id, draft).await
    }

    /// Overwrites the mutable fields of an active task.
    ///
    /// `id`, `created_at` and completion state never change here.
    pub async fn edit(
        &self,
        board: &mut TaskBoard,
        id: TaskId,
        draft: TaskDraft,
    ) -> Result<Task, TaskServiceError> {
        if let Err(err) = draft.validate() {
            warn!(
                "event=task_edit module=service status=rejected task_id={} reason={}",
                id,
                validation_reason(&err)
            );
            return Err(err.into());
        }
        if board.active_task(id).is_none() {
            return Err(TaskServiceError::NotFound(id));
        }
        let owner = self.require_owner()?;

        let started_at = Instant::now();
        let patch = TaskPatch::from(&draft);
        let stored = match self.store.update(id, owner, &patch).await {
            Ok(task) => task,
            Err(err) => {
                log_failure("task_edit", Some(id), &err, started_at);
                return Err(err.into());
            }
        };

        let task = match board.active_task_mut(id) {
            Some(task) => {
                task.apply_patch(&patch);
                task.clone()
            }
            None => stored,
        };
        if board
            .pending_edit()
            .is_some_and(|edit| edit.task_id == id)
        {
            board.set_pending_edit(None);
        }

        info!(
            "event=task_edit module=service status=ok task_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(task)
    }

    /// Completes an active task and, for recurring tasks, creates the next
    /// active instance straight away.
    pub async fn complete(
        &self,
        board: &mut TaskBoard,
        id: TaskId,
    ) -> Result<CompleteOutcome, TaskServiceError> {
        let recurrence = board
            .active_task(id)
            .ok_or(TaskServiceError::NotFound(id))?
            .recurrence_draft();
        let owner = self.require_owner()?;

        let started_at = Instant::now();
        let completed_at = now_epoch_ms();
        let completed = match self.store.mark_completed(id, owner, completed_at).await {
            Ok(task) => task,
            Err(err) => {
                log_failure("task_complete", Some(id), &err, started_at);
                return Err(err.into());
            }
        };

        let respawned = match recurrence {
            Some(draft) => match self.store.insert(owner, &draft).await {
                Ok(task) => Some(task),
                Err(source) => {
                    log_failure("task_respawn", Some(id), &source, started_at);
                    board.move_to_completed(completed.clone());
                    return Err(TaskServiceError::RespawnFailed { completed, source });
                }
            },
            None => None,
        };

        board.move_to_completed(completed.clone());
        if let Some(task) = &respawned {
            board.push_active(task.clone());
        }

        info!(
            "event=task_complete module=service status=ok task_id={} respawned_id={} duration_ms={}",
            id,
            respawned
                .as_ref()
                .map_or_else(|| "none".to_string(), |task| task.id.to_string()),
            started_at.elapsed().as_millis()
        );
        Ok(CompleteOutcome {
            completed,
            respawned,
        })
    }
}

fn log_failure(event: &str, task_id: Option<TaskId>, err: &PersistenceError, started_at: Instant) {
    error!(
        "event={} module=service status=error task_id={} duration_ms={} error_code={} error={}",
        event,
        task_id.map_or_else(|| "none".to_string(), |id| id.to_string()),
        started_at.elapsed().as_millis(),
        err.code(),
        err
    );
}

fn validation_reason(err: &TaskValidationError) -> &'static str {
    match err {
        TaskValidationError::EmptyText => "empty_text",
        TaskValidationError::WeightOutOfRange { field, .. } => field.as_str(),
        TaskValidationError::NonPositiveMinutes => "non_positive_minutes",
        TaskValidationError::CompletionMismatch => "completion_mismatch",
    }
}
