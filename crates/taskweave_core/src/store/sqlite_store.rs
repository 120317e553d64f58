//! Owner-scoped SQLite row store.
//!
//! # Responsibility
//! - Persist one row per task in the `tasks` table.
//! - Run blocking SQLite work off the async caller via `spawn_blocking`.
//!
//! # Invariants
//! - Every statement filters on `user_id`; one owner never observes or
//!   mutates another owner's rows.
//! - Mutations only match rows with `is_completed = 0`.
//! - Ids are assigned by SQLite and never reused.

use super::{PersistenceError, StoreResult, TaskStore};
use crate::config::StorageBackend;
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::task::{now_epoch_ms, OwnerId, Task, TaskDraft, TaskId, TaskPatch};
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    text,
    urgency,
    importance,
    enjoyment,
    time,
    is_recurring,
    is_completed,
    completed_at,
    user_id,
    created_at
FROM tasks";

/// SQLite-backed task store shared behind a mutex.
#[derive(Clone)]
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh migrated in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps a connection that already carries the latest schema.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(PersistenceError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: &'static str, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let started_at = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                PersistenceError::Unavailable("sqlite connection lock poisoned".to_string())
            })?;
            work(&mut guard)
        })
        .await
        .map_err(|err| PersistenceError::Unavailable(format!("sqlite worker failed: {err}")))?;

        match &result {
            Ok(_) => debug!(
                "event=store_op module=store backend=sqlite op={} status=ok duration_ms={}",
                op,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_op module=store backend=sqlite op={} status=error duration_ms={} error_code={} error={}",
                op,
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }
}

impl TaskStore for SqliteTaskStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Sqlite
    }

    async fn load_active(&self, owner: OwnerId) -> StoreResult<Vec<Task>> {
        self.run("load_active", move |conn| {
            query_tasks(
                conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE user_id = ?1
                       AND is_completed = 0
                     ORDER BY created_at ASC, id ASC;"
                ),
                owner,
            )
        })
        .await
    }

    async fn load_completed(&self, owner: OwnerId) -> StoreResult<Vec<Task>> {
        self.run("load_completed", move |conn| {
            query_tasks(
                conn,
                &format!(
                    "{TASK_SELECT_SQL}
                     WHERE user_id = ?1
                       AND is_completed = 1
                     ORDER BY completed_at DESC, id DESC;"
                ),
                owner,
            )
        })
        .await
    }

    async fn insert(&self, owner: OwnerId, draft: &TaskDraft) -> StoreResult<Task> {
        draft.validate()?;
        let draft = draft.clone();
        self.run("insert", move |conn| {
            let created_at = now_epoch_ms();
            conn.execute(
                "INSERT INTO tasks (
                    text,
                    urgency,
                    importance,
                    enjoyment,
                    time,
                    is_recurring,
                    is_completed,
                    completed_at,
                    user_id,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?8);",
                params![
                    draft.normalized_text(),
                    draft.urgency,
                    draft.importance,
                    draft.enjoyment,
                    draft.estimated_minutes,
                    bool_to_int(draft.is_recurring),
                    owner.to_string(),
                    created_at,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Task::from_draft(id, &draft, Some(owner), created_at))
        })
        .await
    }

    async fn update(&self, id: TaskId, owner: OwnerId, patch: &TaskPatch) -> StoreResult<Task> {
        let patch = patch.clone();
        self.run("update", move |conn| {
            let tx = conn.transaction()?;
            let mut task =
                fetch_active(&tx, id, owner)?.ok_or(PersistenceError::NotFound(id))?;
            task.apply_patch(&patch);
            task.validate()?;

            let changed = tx.execute(
                "UPDATE tasks
                 SET
                    text = ?3,
                    urgency = ?4,
                    importance = ?5,
                    enjoyment = ?6,
                    time = ?7,
                    is_recurring = ?8
                 WHERE id = ?1
                   AND user_id = ?2
                   AND is_completed = 0;",
                params![
                    id,
                    owner.to_string(),
                    task.text.as_str(),
                    task.urgency,
                    task.importance,
                    task.enjoyment,
                    task.estimated_minutes,
                    bool_to_int(task.is_recurring),
                ],
            )?;
            if changed == 0 {
                return Err(PersistenceError::NotFound(id));
            }
            tx.commit()?;
            Ok(task)
        })
        .await
    }

    async fn mark_completed(
        &self,
        id: TaskId,
        owner: OwnerId,
        completed_at: i64,
    ) -> StoreResult<Task> {
        self.run("mark_completed", move |conn| {
            let tx = conn.transaction()?;
            let mut task =
                fetch_active(&tx, id, owner)?.ok_or(PersistenceError::NotFound(id))?;

            let changed = tx.execute(
                "UPDATE tasks
                 SET
                    is_completed = 1,
                    completed_at = ?3
                 WHERE id = ?1
                   AND user_id = ?2
                   AND is_completed = 0;",
                params![id, owner.to_string(), completed_at],
            )?;
            if changed == 0 {
                return Err(PersistenceError::NotFound(id));
            }
            tx.commit()?;

            task.mark_completed(completed_at);
            Ok(task)
        })
        .await
    }
}

fn query_tasks(conn: &Connection, sql: &str, owner: OwnerId) -> StoreResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn fetch_active(conn: &Connection, id: TaskId, owner: OwnerId) -> StoreResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE id = ?1
           AND user_id = ?2
           AND is_completed = 0;"
    ))?;
    let row = stmt
        .query_row(params![id, owner.to_string()], |row| Ok(parse_task_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let id: TaskId = row.get("id")?;

    let owner_text: String = row.get("user_id")?;
    let owner = Uuid::parse_str(&owner_text).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid user id `{owner_text}` in tasks.user_id"))
    })?;

    let task = Task {
        id,
        text: row.get("text")?,
        urgency: parse_weight(row, "urgency")?,
        importance: parse_weight(row, "importance")?,
        enjoyment: parse_weight(row, "enjoyment")?,
        estimated_minutes: parse_minutes(row)?,
        is_recurring: parse_flag(row, "is_recurring")?,
        is_completed: parse_flag(row, "is_completed")?,
        completed_at: row.get("completed_at")?,
        owner_id: Some(OwnerId::new(owner)),
        created_at: row.get("created_at")?,
    };
    task.validate()
        .map_err(|err| PersistenceError::InvalidData(format!("task {id}: {err}")))?;
    Ok(task)
}

fn parse_weight(row: &Row<'_>, column: &'static str) -> StoreResult<u8> {
    let value: i64 = row.get(column)?;
    u8::try_from(value).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid {column} value `{value}` in tasks.{column}"))
    })
}

fn parse_minutes(row: &Row<'_>) -> StoreResult<u32> {
    let value: i64 = row.get("time")?;
    u32::try_from(value).map_err(|_| {
        PersistenceError::InvalidData(format!("invalid time value `{value}` in tasks.time"))
    })
}

fn parse_flag(row: &Row<'_>, column: &'static str) -> StoreResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid {column} value `{other}` in tasks.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
