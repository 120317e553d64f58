//! Client-local snapshot backend.
//!
//! # Responsibility
//! - Keep the full active and completed lists in one JSON file.
//! - Rewrite the whole snapshot on every mutation.
//!
//! # Invariants
//! - The file holds two named entries, `tasks` and `completedTasks`.
//! - Writes go through a temp file + rename; a failed write leaves both the
//!   file and the in-memory snapshot unchanged.
//! - There is a single implicit owner; the `owner` argument is ignored and
//!   returned tasks carry no `owner_id`.
//! - Ids are derived from epoch milliseconds and strictly increase.

use super::{sort_completed_desc, PersistenceError, StoreResult, TaskStore};
use crate::config::StorageBackend;
use crate::model::task::{now_epoch_ms, OwnerId, Task, TaskDraft, TaskId, TaskPatch};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Serialized form of the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSnapshot {
    #[serde(rename = "tasks", default)]
    pub active: Vec<Task>,
    #[serde(rename = "completedTasks", default)]
    pub completed: Vec<Task>,
}

impl LocalSnapshot {
    /// Parses a snapshot and checks set membership and field invariants.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let mut snapshot: Self = serde_json::from_str(raw)?;
        // Older snapshots mark completion only through `completedAt`.
        for task in &mut snapshot.completed {
            if task.completed_at.is_some() {
                task.is_completed = true;
            }
        }
        snapshot.check()?;
        sort_completed_desc(&mut snapshot.completed);
        Ok(snapshot)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check(&self) -> StoreResult<()> {
        for task in &self.active {
            task.validate()?;
            if task.is_completed {
                return Err(PersistenceError::InvalidData(format!(
                    "task {} is completed but listed under `tasks`",
                    task.id
                )));
            }
        }
        for task in &self.completed {
            task.validate()?;
            if !task.is_completed {
                return Err(PersistenceError::InvalidData(format!(
                    "task {} is active but listed under `completedTasks`",
                    task.id
                )));
            }
        }
        Ok(())
    }

    fn max_id(&self) -> Option<TaskId> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .map(|task| task.id)
            .max()
    }

    fn active_index(&self, id: TaskId) -> StoreResult<usize> {
        self.active
            .iter()
            .position(|task| task.id == id)
            .ok_or(PersistenceError::NotFound(id))
    }
}

/// JSON-file task store scoped to the running client.
pub struct LocalTaskStore {
    path: PathBuf,
    state: Mutex<LocalSnapshot>,
}

impl LocalTaskStore {
    /// Opens the snapshot at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| PersistenceError::Io {
                path: path.clone(),
                source,
            })?;
            LocalSnapshot::from_json(&raw)?
        } else {
            LocalSnapshot::default()
        };

        debug!(
            "event=store_open module=store backend=local status=ok active={} completed={}",
            snapshot.active.len(),
            snapshot.completed.len()
        );
        Ok(Self {
            path,
            state: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current in-memory snapshot.
    pub fn snapshot(&self) -> StoreResult<LocalSnapshot> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, LocalSnapshot>> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("local snapshot lock poisoned".to_string()))
    }

    /// Runs `mutate` on a copy, persists the copy, then swaps it in.
    fn commit<T>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut LocalSnapshot) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let value = mutate(&mut next)?;
        if let Err(err) = write_snapshot(&self.path, &next) {
            error!(
                "event=store_write module=store backend=local op={} status=error error_code={} error={}",
                op,
                err.code(),
                err
            );
            return Err(err);
        }
        *guard = next;
        debug!(
            "event=store_write module=store backend=local op={} status=ok",
            op
        );
        Ok(value)
    }
}

impl TaskStore for LocalTaskStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn load_active(&self, _owner: OwnerId) -> StoreResult<Vec<Task>> {
        Ok(self.lock()?.active.clone())
    }

    async fn load_completed(&self, _owner: OwnerId) -> StoreResult<Vec<Task>> {
        let mut completed = self.lock()?.completed.clone();
        sort_completed_desc(&mut completed);
        Ok(completed)
    }

    async fn insert(&self, _owner: OwnerId, draft: &TaskDraft) -> StoreResult<Task> {
        draft.validate()?;
        self.commit("insert", |snapshot| {
            let now = now_epoch_ms();
            let id = match snapshot.max_id() {
                Some(max) if max >= now => max.checked_add(1).ok_or_else(|| {
                    PersistenceError::InvalidData(format!("task id {max} has no successor"))
                })?,
                _ => now,
            };
            let task = Task::from_draft(id, draft, None, now);
            snapshot.active.push(task.clone());
            Ok(task)
        })
    }

    async fn update(&self, id: TaskId, _owner: OwnerId, patch: &TaskPatch) -> StoreResult<Task> {
        self.commit("update", |snapshot| {
            let index = snapshot.active_index(id)?;
            let task = &mut snapshot.active[index];
            task.apply_patch(patch);
            task.validate()?;
            Ok(task.clone())
        })
    }

    async fn mark_completed(
        &self,
        id: TaskId,
        _owner: OwnerId,
        completed_at: i64,
    ) -> StoreResult<Task> {
        self.commit("mark_completed", |snapshot| {
            let index = snapshot.active_index(id)?;
            let mut task = snapshot.active.remove(index);
            task.mark_completed(completed_at);
            snapshot.completed.insert(0, task.clone());
            sort_completed_desc(&mut snapshot.completed);
            Ok(task)
        })
    }
}

fn write_snapshot(path: &Path, snapshot: &LocalSnapshot) -> StoreResult<()> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let data = snapshot.to_json()?;
    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(data.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
