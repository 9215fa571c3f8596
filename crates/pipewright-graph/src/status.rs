//! Run-status overlay.
//!
//! After a pipeline has been submitted, execution backends report a status
//! per task. The editor stores it in the task's `status` annotation, which
//! the projector surfaces on the node and which marks the task as locked.

use std::collections::BTreeMap;

use pipewright_spec::annotations::run_status;
use pipewright_spec::{ComponentSpec, TaskSpec, STATUS_ANNOTATION};

/// Copy `statuses` (task id → status text) onto the matching tasks.
/// Unknown task ids are ignored; an empty status clears the annotation.
pub fn apply_run_statuses(spec: &ComponentSpec, statuses: &BTreeMap<String, String>) -> ComponentSpec {
    let mut next = spec.clone();
    let Some(graph) = next.graph_mut() else {
        return next;
    };
    for (task_id, status) in statuses {
        match graph.task_mut(task_id) {
            Some(task) if status.is_empty() => {
                task.annotations.remove(STATUS_ANNOTATION);
            }
            Some(task) => {
                task.annotations
                    .insert(STATUS_ANNOTATION.to_string(), status.clone());
            }
            None => tracing::debug!(task_id = %task_id, "Status for unknown task ignored"),
        }
    }
    next
}

/// Remove every task's run status.
pub fn clear_run_statuses(spec: &ComponentSpec) -> ComponentSpec {
    let mut next = spec.clone();
    if let Some(graph) = next.graph_mut() {
        for task in graph.tasks.values_mut() {
            task.annotations.remove(STATUS_ANNOTATION);
        }
    }
    next
}

/// A task with a run status is locked: its arguments reflect what ran.
pub fn is_locked(task: &TaskSpec) -> bool {
    run_status(&task.annotations).is_some()
}

/// Ids of all locked tasks, sorted.
pub fn locked_tasks(spec: &ComponentSpec) -> Vec<&str> {
    spec.graph()
        .map(|graph| {
            graph
                .tasks
                .iter()
                .filter(|(_, task)| is_locked(task))
                .map(|(id, _)| id.as_str())
                .collect()
        })
        .unwrap_or_default()
}
