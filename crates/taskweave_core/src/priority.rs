//! Priority scoring and focus-task selection.
//!
//! # Invariants
//! - Weights are fixed at 34/33/33 and never renormalized.
//! - Estimated time and recurrence do not influence the score.
//! - Ties resolve to the earliest task in the given ordering.

use crate::model::task::Task;

pub const URGENCY_WEIGHT: f64 = 0.34;
pub const IMPORTANCE_WEIGHT: f64 = 0.33;
pub const ENJOYMENT_WEIGHT: f64 = 0.33;

/// Weighted priority of one task. Higher means more deserving of focus.
///
/// Does not validate attribute ranges.
pub fn score(task: &Task) -> f64 {
    f64::from(task.urgency) * URGENCY_WEIGHT
        + f64::from(task.importance) * IMPORTANCE_WEIGHT
        + f64::from(task.enjoyment) * ENJOYMENT_WEIGHT
}

/// Score rendered with one decimal, as shown in task lists.
pub fn score_label(task: &Task) -> String {
    format!("{:.1}", score(task))
}

/// Picks the focus task from the active set.
///
/// A candidate replaces the current best only when its score is strictly
/// higher, so the earliest of several equal maxima wins.
pub fn select_next(active: &[Task]) -> Option<&Task> {
    let mut tasks = active.iter();
    let first = tasks.next()?;
    Some(tasks.fold(first, |best, candidate| {
        if score(candidate) > score(best) {
            candidate
        } else {
            best
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::{score, score_label, select_next};
    use crate::model::task::{Task, TaskDraft};

    fn task(id: i64, urgency: u8, importance: u8, enjoyment: u8) -> Task {
        let mut draft = TaskDraft::new(format!("task {id}"));
        draft.urgency = urgency;
        draft.importance = importance;
        draft.enjoyment = enjoyment;
        Task::from_draft(id, &draft, None, 0)
    }

    #[test]
    fn score_uses_fixed_weights() {
        let value = score(&task(1, 10, 1, 1));
        assert!((value - (3.4 + 0.33 + 0.33)).abs() < 1e-9);
    }

    #[test]
    fn score_ignores_time_and_recurrence() {
        let plain = task(1, 4, 6, 8);
        let mut long_recurring = plain.clone();
        long_recurring.estimated_minutes = 600;
        long_recurring.is_recurring = true;
        assert_eq!(score(&plain), score(&long_recurring));
    }

    #[test]
    fn score_label_rounds_to_one_decimal() {
        assert_eq!(score_label(&task(1, 5, 5, 5)), "5.0");
        assert_eq!(score_label(&task(1, 10, 1, 1)), "4.1");
    }

    #[test]
    fn select_next_on_empty_is_none() {
        assert!(select_next(&[]).is_none());
    }

    #[test]
    fn select_next_on_single_task_returns_it() {
        let only = [task(7, 2, 3, 4)];
        assert_eq!(select_next(&only).map(|t| t.id), Some(7));
    }

    #[test]
    fn select_next_is_order_independent_for_distinct_scores() {
        let high = task(1, 9, 9, 2);
        let low = task(2, 3, 3, 9);
        let forward = [high.clone(), low.clone()];
        let backward = [low, high];
        assert_eq!(select_next(&forward).map(|t| t.id), Some(1));
        assert_eq!(select_next(&backward).map(|t| t.id), Some(1));
    }

    #[test]
    fn select_next_keeps_first_of_equal_scores() {
        let tasks = vec![task(1, 5, 5, 5), task(2, 5, 5, 5), task(3, 1, 1, 1)];
        assert_eq!(select_next(&tasks).map(|t| t.id), Some(1));
    }
}
