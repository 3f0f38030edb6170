use std::cmp::Ordering;

use vikord_core::types::Task;

/// Open tasks at or above `min_priority`, most urgent first: priority
/// descending, then due date ascending (undated last), then creation time.
pub fn select_digest_tasks(tasks: Vec<Task>, min_priority: i64) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks
        .into_iter()
        .filter(|t| !t.done && t.priority >= min_priority)
        .collect();
    selected.sort_by(digest_order);
    selected
}

fn digest_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| match (a.created, b.created) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}
