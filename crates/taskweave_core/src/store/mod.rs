//! Persistence adapter contract and its backends.
//!
//! # Responsibility
//! - Define the backend-agnostic task storage contract used by services.
//! - Provide a local snapshot backend and an owner-scoped SQLite row backend.
//!
//! # Invariants
//! - Every operation may suspend and may fail; callers never assume
//!   synchronous completion.
//! - `update` and `mark_completed` only ever touch active rows of the given
//!   owner.
//! - `load_completed` returns tasks ordered by `completed_at` descending.
//! - Write paths validate before mutating storage; read paths reject invalid
//!   persisted state instead of masking it.

use crate::config::{StorageBackend, StorageConfig};
use crate::db::DbError;
use crate::model::task::{OwnerId, Task, TaskDraft, TaskId, TaskPatch, TaskValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::path::PathBuf;

pub mod local_store;
pub mod sqlite_store;

pub use local_store::{LocalSnapshot, LocalTaskStore};
pub use sqlite_store::SqliteTaskStore;

pub type StoreResult<T> = Result<T, PersistenceError>;

/// Storage failure surfaced to the lifecycle service.
#[derive(Debug)]
pub enum PersistenceError {
    /// Draft or patched task failed field validation.
    Validation(TaskValidationError),
    Db(DbError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialization(serde_json::Error),
    /// No active task with this id exists for the owner.
    NotFound(TaskId),
    /// Stored data violates a task invariant.
    InvalidData(String),
    /// Connection was not migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Backend could not run the operation at all.
    Unavailable(String),
}

impl PersistenceError {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "store_validation",
            Self::Db(_) => "store_db",
            Self::Io { .. } => "store_io",
            Self::Serialization(_) => "store_serialization",
            Self::NotFound(_) => "store_not_found",
            Self::InvalidData(_) => "store_invalid_data",
            Self::UninitializedConnection { .. } => "store_uninitialized",
            Self::Unavailable(_) => "store_unavailable",
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "task file `{}` is not accessible: {source}", path.display())
            }
            Self::Serialization(err) => write!(f, "task snapshot is malformed: {err}"),
            Self::NotFound(id) => write!(f, "active task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task database is at schema version {actual_version}, expected {expected_version}"
            ),
            Self::Unavailable(message) => write!(f, "task storage unavailable: {message}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Serialization(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::Unavailable(_) => None,
        }
    }
}

impl From<TaskValidationError> for PersistenceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Async storage contract for tasks.
///
/// Implementations must be safe to share between tasks; each mutation is a
/// single-row (or single-snapshot) write assumed atomic by the backend.
pub trait TaskStore: Send + Sync {
    /// Which backend this is, for logging and diagnostics.
    fn backend(&self) -> StorageBackend;

    /// All active tasks of `owner`, in insertion order.
    fn load_active(&self, owner: OwnerId) -> impl Future<Output = StoreResult<Vec<Task>>> + Send;

    /// All completed tasks of `owner`, most recently completed first.
    fn load_completed(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = StoreResult<Vec<Task>>> + Send;

    /// Persists a new active task and returns it with storage-assigned id.
    fn insert(
        &self,
        owner: OwnerId,
        draft: &TaskDraft,
    ) -> impl Future<Output = StoreResult<Task>> + Send;

    /// Applies a partial update to one active task of `owner`.
    fn update(
        &self,
        id: TaskId,
        owner: OwnerId,
        patch: &TaskPatch,
    ) -> impl Future<Output = StoreResult<Task>> + Send;

    /// Flips one active task of `owner` to completed at `completed_at`.
    fn mark_completed(
        &self,
        id: TaskId,
        owner: OwnerId,
        completed_at: i64,
    ) -> impl Future<Output = StoreResult<Task>> + Send;
}

/// Backend chosen at configuration time.
pub enum AnyTaskStore {
    Local(LocalTaskStore),
    Sqlite(SqliteTaskStore),
}

impl AnyTaskStore {
    /// Opens the backend named by `config`.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        match config.backend {
            StorageBackend::Local => {
                LocalTaskStore::open(config.local_snapshot_path()).map(Self::Local)
            }
            StorageBackend::Sqlite => {
                SqliteTaskStore::open(config.sqlite_path()).map(Self::Sqlite)
            }
        }
    }
}

impl TaskStore for AnyTaskStore {
    fn backend(&self) -> StorageBackend {
        match self {
            Self::Local(store) => store.backend(),
            Self::Sqlite(store) => store.backend(),
        }
    }

    async fn load_active(&self, owner: OwnerId) -> StoreResult<Vec<Task>> {
        match self {
            Self::Local(store) => store.load_active(owner).await,
            Self::Sqlite(store) => store.load_active(owner).await,
        }
    }

    async fn load_completed(&self, owner: OwnerId) -> StoreResult<Vec<Task>> {
        match self {
            Self::Local(store) => store.load_completed(owner).await,
            Self::Sqlite(store) => store.load_completed(owner).await,
        }
    }

    async fn insert(&self, owner: OwnerId, draft: &TaskDraft) -> StoreResult<Task> {
        match self {
            Self::Local(store) => store.insert(owner, draft).await,
            Self::Sqlite(store) => store.insert(owner, draft).await,
        }
    }

    async fn update(&self, id: TaskId, owner: OwnerId, patch: &TaskPatch) -> StoreResult<Task> {
        match self {
            Self::Local(store) => store.update(id, owner, patch).await,
            Self::Sqlite(store) => store.update(id, owner, patch).await,
        }
    }

    async fn mark_completed(
        &self,
        id: TaskId,
        owner: OwnerId,
        completed_at: i64,
    ) -> StoreResult<Task> {
        match self {
            Self::Local(store) => store.mark_completed(id, owner, completed_at).await,
            Self::Sqlite(store) => store.mark_completed(id, owner, completed_at).await,
        }
    }
}

/// Orders completed tasks most recent first; ties keep the higher id first.
pub(crate) fn sort_completed_desc(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.completed_at
            .cmp(&a.completed_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
