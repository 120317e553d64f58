//! In-memory view of one owner's tasks.
//!
//! # Invariants
//! - `active` holds only tasks with `is_completed == false`, in insertion
//!   order; `completed` holds only completed tasks, most recent first.
//! - A task id appears in at most one of the two sets.
//! - Only [`TaskService`](super::task_service::TaskService) mutates the sets,
//!   and only after the matching storage write succeeded.

use crate::model::task::{Task, TaskDraft, TaskId};
use crate::priority::select_next;
use crate::store::sort_completed_desc;

/// Edit form state for one active task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub task_id: TaskId,
    pub draft: TaskDraft,
}

/// Caller-owned active/completed sets plus pending edit state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoard {
    active: Vec<Task>,
    completed: Vec<Task>,
    pending_edit: Option<PendingEdit>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    /// Highest-scoring active task, earliest on ties.
    pub fn focus_task(&self) -> Option<&Task> {
        select_next(&self.active)
    }

    pub fn active_task(&self, id: TaskId) -> Option<&Task> {
        self.active.iter().find(|task| task.id == id)
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.pending_edit.as_ref()
    }

    /// Mutable access to the edit form draft; the task itself is untouched.
    pub fn pending_draft_mut(&mut self) -> Option<&mut TaskDraft> {
        self.pending_edit.as_mut().map(|edit| &mut edit.draft)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }

    pub(crate) fn replace(&mut self, active: Vec<Task>, completed: Vec<Task>) {
        self.active = active;
        self.completed = completed;
        self.pending_edit = None;
    }

    pub(crate) fn clear(&mut self) {
        self.replace(Vec::new(), Vec::new());
    }

    pub(crate) fn push_active(&mut self, task: Task) {
        self.active.push(task);
    }

    pub(crate) fn active_task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.active.iter_mut().find(|task| task.id == id)
    }

    /// Moves a task out of the active set into the completed set, keeping
    /// the storage order (`completed_at` descending, then id descending).
    pub(crate) fn move_to_completed(&mut self, completed: Task) {
        self.active.retain(|task| task.id != completed.id);
        if self
            .pending_edit
            .as_ref()
            .is_some_and(|edit| edit.task_id == completed.id)
        {
            self.pending_edit = None;
        }
        self.completed.insert(0, completed);
        sort_completed_desc(&mut self.completed);
    }

    pub(crate) fn set_pending_edit(&mut self, edit: Option<PendingEdit>) {
        self.pending_edit = edit;
    }
}

#[cfg(test)]
mod tests {
    use super::TaskBoard;
    use crate::model::task::{Task, TaskDraft};

    fn active(id: i64) -> Task {
        Task::from_draft(id, &TaskDraft::new(format!("task {id}")), None, 0)
    }

    fn completed(id: i64, at: i64) -> Task {
        let mut task = active(id);
        task.mark_completed(at);
        task
    }

    #[test]
    fn same_millisecond_completions_follow_storage_order() {
        let mut board = TaskBoard::new();
        board.replace(vec![active(5), active(3)], Vec::new());

        board.move_to_completed(completed(5, 100));
        board.move_to_completed(completed(3, 100));

        let order: Vec<_> = board.completed().iter().map(|task| task.id).collect();
        assert_eq!(order, vec![5, 3]);
        assert!(board.active().is_empty());
    }

    #[test]
    fn newest_completion_goes_first() {
        let mut board = TaskBoard::new();
        board.replace(vec![active(1)], vec![completed(9, 50)]);

        board.move_to_completed(completed(1, 200));

        let order: Vec<_> = board.completed().iter().map(|task| task.id).collect();
        assert_eq!(order, vec![1, 9]);
    }
}
