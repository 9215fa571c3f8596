//! Editing session: the current document plus bounded undo/redo history.
//!
//! Documents are held behind `Arc` and never mutated in place. An accepted
//! edit swaps in a new `Arc`; a rejected or no-op edit leaves the current
//! one untouched, so callers can compare snapshots with `Arc::ptr_eq`.

use std::collections::VecDeque;
use std::sync::Arc;

use pipewright_spec::ComponentSpec;
use pipewright_types::{EditorConfig, EditorError, Result};

use crate::edits::Edit;
use crate::projector::{project, GraphView};
use crate::status::is_locked;

/// What an accepted [`EditingSession::apply`] call changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditOutcome {
    /// `false` when the edit produced a document equal to the current one.
    pub changed: bool,
    pub revision: u64,
    pub created: Vec<String>,
    pub deselected: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditingSession {
    config: Arc<EditorConfig>,
    document: Arc<ComponentSpec>,
    undo_stack: VecDeque<Arc<ComponentSpec>>,
    redo_stack: Vec<Arc<ComponentSpec>>,
    revision: u64,
}

impl EditingSession {
    pub fn new(document: ComponentSpec, config: Arc<EditorConfig>) -> Self {
        Self {
            config,
            document: Arc::new(document),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            revision: 0,
        }
    }

    pub fn document(&self) -> &Arc<ComponentSpec> {
        &self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Incremented on every accepted change, including undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view(&self) -> GraphView {
        project(&self.document)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Apply one edit as one undo step.
    pub fn apply(&mut self, edit: &Edit) -> Result<EditOutcome> {
        self.apply_all(std::slice::from_ref(edit))
    }

    /// Apply edits in order as a single undo step. If any edit is rejected
    /// none of them take effect.
    pub fn apply_all(&mut self, edits: &[Edit]) -> Result<EditOutcome> {
        let mut working: Option<ComponentSpec> = None;
        let mut outcome = EditOutcome::default();

        for edit in edits {
            let current = working.as_ref().unwrap_or(self.document.as_ref());
            self.check_policy(current, edit)?;
            let applied = edit.apply(current, &self.config).map_err(|err| {
                tracing::debug!(op = edit.name(), error = %err, "Edit rejected");
                err
            })?;
            self.check_locked_unchanged(current, &applied.spec)?;
            outcome.created.extend(applied.created);
            outcome.deselected.extend(applied.deselected);
            working = Some(applied.spec);
        }

        match working {
            Some(next) if next != *self.document => {
                self.commit(Arc::new(next));
                outcome.changed = true;
            }
            _ => {}
        }
        outcome.revision = self.revision;
        Ok(outcome)
    }

    /// Swap in a document produced outside the edit operations, such as a
    /// hydrated or status-annotated copy. Recorded as one undo step.
    pub fn replace_document(&mut self, document: ComponentSpec) -> bool {
        if document == *self.document {
            return false;
        }
        self.commit(Arc::new(document));
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, previous);
        self.redo_stack.push(current);
        self.revision += 1;
        tracing::debug!(revision = self.revision, "Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, next);
        self.undo_stack.push_back(current);
        self.revision += 1;
        tracing::debug!(revision = self.revision, "Redo");
        true
    }

    fn commit(&mut self, next: Arc<ComponentSpec>) {
        let previous = std::mem::replace(&mut self.document, next);
        self.undo_stack.push_back(previous);
        while self.undo_stack.len() > self.config.history_limit {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
        self.revision += 1;
        tracing::debug!(revision = self.revision, "Document updated");
    }

    fn check_policy(&self, current: &ComponentSpec, edit: &Edit) -> Result<()> {
        if !self.config.lock_tasks_with_status {
            return Ok(());
        }
        let Some(task_id) = edit.argument_target() else {
            return Ok(());
        };
        let locked = current
            .graph()
            .and_then(|g| g.task(task_id))
            .is_some_and(is_locked);
        if locked {
            return Err(EditorError::TaskLocked(task_id.to_string()));
        }
        Ok(())
    }

    /// Cascading edits (removing an upstream task or a graph input, renaming
    /// a port) rewrite arguments of tasks they do not target. A locked task
    /// that survives the edit must keep its arguments and component.
    fn check_locked_unchanged(&self, current: &ComponentSpec, next: &ComponentSpec) -> Result<()> {
        if !self.config.lock_tasks_with_status {
            return Ok(());
        }
        let (Some(before), Some(after)) = (current.graph(), next.graph()) else {
            return Ok(());
        };
        for (task_id, task) in before.tasks.iter().filter(|(_, t)| is_locked(t)) {
            let Some(updated) = after.task(task_id) else {
                continue;
            };
            if updated.arguments != task.arguments || updated.component_ref != task.component_ref {
                tracing::debug!(task_id = %task_id, "Edit would rewrite a locked task");
                return Err(EditorError::TaskLocked(task_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::{fixtures, Connection};
    use pipewright_spec::{literal, Position};
    use pipewright_types::PortKind;

    fn session() -> EditingSession {
        EditingSession::new(fixtures::pipeline(), Arc::new(EditorConfig::default()))
    }

    fn set_mode(value: &str) -> Edit {
        Edit::SetTaskArgument {
            task_id: "T2".into(),
            input_name: "mode".into(),
            value: Some(literal(value)),
        }
    }

    #[test]
    fn rejected_edit_keeps_snapshot() {
        let mut session = session();
        let before = Arc::clone(session.document());
        let err = session
            .apply(&Edit::Connect(Connection::new(
                "input_initialData",
                None,
                "output_finalResult",
                None,
            )))
            .unwrap_err();
        assert!(err.is_structural_violation());
        assert!(Arc::ptr_eq(&before, session.document()));
        assert_eq!(session.revision(), 0);
        assert!(!session.can_undo());
    }

    #[test]
    fn no_op_edit_keeps_snapshot() {
        let mut session = session();
        let before = Arc::clone(session.document());
        let outcome = session.apply(&set_mode("fast")).unwrap();
        assert!(!outcome.changed);
        assert!(Arc::ptr_eq(&before, session.document()));
        assert!(!session.can_undo());
    }

    #[test]
    fn accepted_edit_swaps_snapshot() {
        let mut session = session();
        let before = Arc::clone(session.document());
        let outcome = session.apply(&set_mode("slow")).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.revision, 1);
        assert!(!Arc::ptr_eq(&before, session.document()));
        // The old snapshot is unchanged.
        assert_eq!(
            before.graph().unwrap().task("T2").unwrap().argument("mode"),
            Some(&literal("fast"))
        );
    }

    #[test]
    fn undo_and_redo() {
        let mut session = session();
        let original = Arc::clone(session.document());
        session.apply(&set_mode("slow")).unwrap();
        let edited = Arc::clone(session.document());

        assert!(session.undo());
        assert!(Arc::ptr_eq(&original, session.document()));
        assert!(session.can_redo());

        assert!(session.redo());
        assert!(Arc::ptr_eq(&edited, session.document()));
        assert!(!session.redo());
        assert_eq!(session.revision(), 3);
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut session = session();
        session.apply(&set_mode("slow")).unwrap();
        session.undo();
        session.apply(&set_mode("slower")).unwrap();
        assert!(!session.can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut session = EditingSession::new(fixtures::pipeline(), Arc::new(config));
        for i in 0..5 {
            session.apply(&set_mode(&format!("m{i}"))).unwrap();
        }
        assert!(session.undo());
        assert!(session.undo());
        assert!(!session.undo());
    }

    #[test]
    fn batch_is_atomic() {
        let mut session = session();
        let before = Arc::clone(session.document());
        let result = session.apply_all(&[
            set_mode("slow"),
            Edit::RemoveTask {
                task_id: "ghost".into(),
            },
        ]);
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, session.document()));
    }

    #[test]
    fn batch_is_one_undo_step() {
        let mut session = session();
        session
            .apply_all(&[
                set_mode("slow"),
                Edit::RenamePort {
                    port: PortKind::Input,
                    old_name: "threshold".into(),
                    new_name: "limit".into(),
                },
            ])
            .unwrap();
        assert!(session.undo());
        assert!(!session.can_undo());
        assert_eq!(**session.document(), fixtures::pipeline());
    }

    #[test]
    fn locked_task_refuses_argument_edits() {
        let mut session = session();
        let doc = crate::status::apply_run_statuses(
            session.document(),
            &[("T2".to_string(), "SUCCEEDED".to_string())].into_iter().collect(),
        );
        session.replace_document(doc);

        let err = session.apply(&set_mode("slow")).unwrap_err();
        assert!(matches!(err, EditorError::TaskLocked(id) if id == "T2"));

        // Moving a locked task is still allowed.
        let moved = session.apply(&Edit::UpdatePosition {
            node_id: "task_T2".into(),
            position: Position::new(1.0, 2.0),
        });
        assert!(moved.unwrap().changed);
    }

    fn locked_t2_session() -> EditingSession {
        let doc = crate::status::apply_run_statuses(
            &fixtures::pipeline(),
            &[("T2".to_string(), "SUCCEEDED".to_string())].into_iter().collect(),
        );
        EditingSession::new(doc, Arc::new(EditorConfig::default()))
    }

    #[test]
    fn removing_upstream_of_locked_task_is_refused() {
        let mut session = locked_t2_session();
        let before = Arc::clone(session.document());
        let err = session
            .apply(&Edit::RemoveTask {
                task_id: "T1".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EditorError::TaskLocked(id) if id == "T2"));
        assert!(Arc::ptr_eq(&before, session.document()));
        let doc = session.document();
        let t2 = doc.graph().unwrap().task("T2").unwrap();
        let args: Vec<&str> = t2.arguments.keys().map(String::as_str).collect();
        assert_eq!(args, vec!["limit", "mode", "x"]);
    }

    #[test]
    fn removing_input_bound_to_locked_task_is_refused() {
        let mut session = locked_t2_session();
        let err = session
            .apply(&Edit::RemoveComponentInput {
                name: "threshold".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EditorError::TaskLocked(id) if id == "T2"));
        assert!(session.document().input("threshold").is_some());
    }

    #[test]
    fn renaming_input_bound_to_locked_task_is_refused() {
        let mut session = locked_t2_session();
        let err = session
            .apply(&Edit::RenamePort {
                port: PortKind::Input,
                old_name: "threshold".into(),
                new_name: "cutoff".into(),
            })
            .unwrap_err();
        assert!(matches!(err, EditorError::TaskLocked(_)));
    }

    #[test]
    fn edits_not_touching_locked_task_are_allowed() {
        let mut session = locked_t2_session();
        // T1 is unlocked and removing the graph output leaves T2's wiring intact.
        let outcome = session
            .apply(&Edit::RemoveComponentOutput {
                name: "finalResult".into(),
            })
            .unwrap();
        assert!(outcome.changed);
        // Removing the locked task itself is a delete, not an argument edit.
        assert!(session
            .apply(&Edit::RemoveTask {
                task_id: "T2".into(),
            })
            .unwrap()
            .changed);
    }

    #[test]
    fn lock_policy_can_be_disabled() {
        let config = EditorConfig {
            lock_tasks_with_status: false,
            ..EditorConfig::default()
        };
        let doc = crate::status::apply_run_statuses(
            &fixtures::pipeline(),
            &[("T2".to_string(), "FAILED".to_string())].into_iter().collect(),
        );
        let mut session = EditingSession::new(doc, Arc::new(config));
        assert!(session.apply(&set_mode("slow")).unwrap().changed);
    }

    #[test]
    fn view_tracks_document() {
        let mut session = session();
        session
            .apply(&Edit::RemoveTask {
                task_id: "T1".into(),
            })
            .unwrap();
        let view = session.view();
        assert!(view.node("task_T1").is_none());
        assert!(view.edges.iter().all(|e| !e.id.starts_with("T1_")));
    }
}
