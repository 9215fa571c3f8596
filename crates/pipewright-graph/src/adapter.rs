//! View adapter: translates canvas gestures into edits.
//!
//! The node-graph widget reports what the user did as [`ViewChange`]
//! events. The adapter turns each event into one or more [`Edit`]s, commits
//! them to the session as a single undo step, tracks the selection, and
//! hands back a freshly projected view with selection flags set.

use std::collections::BTreeSet;

use pipewright_spec::Position;
use pipewright_types::{EditorError, PortKind, Result};
use serde::{Deserialize, Serialize};

use crate::edits::{Connection, DropKind, Edit};
use crate::ids::NodeRef;
use crate::projector::{GraphView, ViewEdge};
use crate::session::{EditOutcome, EditingSession};

/// A user gesture reported by the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewChange {
    /// A node was dragged and released.
    DragEnd { node_id: String, position: Position },
    Connect(Connection),
    /// Nodes and edges removed with the delete key. Edges are applied first.
    Delete {
        #[serde(default)]
        node_ids: Vec<String>,
        #[serde(default)]
        edges: Vec<ViewEdge>,
    },
    SelectionChanged { node_ids: Vec<String> },
    /// A component or port dragged in from the library panel.
    Drop { node: DropKind, position: Position },
    /// Duplicate the current selection.
    Duplicate,
}

pub struct ViewAdapter {
    session: EditingSession,
    selection: BTreeSet<String>,
}

impl ViewAdapter {
    pub fn new(session: EditingSession) -> Self {
        Self {
            session,
            selection: BTreeSet::new(),
        }
    }

    pub fn session(&self) -> &EditingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditingSession {
        &mut self.session
    }

    pub fn into_session(self) -> EditingSession {
        self.session
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    /// Apply one gesture and return the view to render.
    pub fn handle(&mut self, change: ViewChange) -> Result<GraphView> {
        match change {
            ViewChange::SelectionChanged { node_ids } => {
                self.selection = node_ids.into_iter().collect();
            }
            ViewChange::DragEnd { node_id, position } => {
                self.session
                    .apply(&Edit::UpdatePosition { node_id, position })?;
            }
            ViewChange::Connect(connection) => {
                self.session.apply(&Edit::Connect(connection))?;
            }
            ViewChange::Delete { node_ids, edges } => {
                let mut edits: Vec<Edit> = edges
                    .into_iter()
                    .map(|edge| Edit::Disconnect { edge })
                    .collect();
                for node_id in &node_ids {
                    edits.push(delete_edit(node_id)?);
                }
                self.session.apply_all(&edits)?;
                for node_id in &node_ids {
                    self.selection.remove(node_id);
                }
            }
            ViewChange::Drop { node, position } => {
                let outcome = self.session.apply(&Edit::DropNewNode { node, position })?;
                self.selection = outcome.created.into_iter().collect();
            }
            ViewChange::Duplicate => {
                if self.selection.is_empty() {
                    return Ok(self.render());
                }
                let node_ids = self.selection.iter().cloned().collect();
                let outcome = self.session.apply(&Edit::DuplicateNodes { node_ids })?;
                self.update_selection(outcome);
            }
        }
        Ok(self.render())
    }

    /// Project the current document and mark selected nodes.
    pub fn render(&self) -> GraphView {
        let mut view = self.session.view();
        for node in &mut view.nodes {
            node.selected = self.selection.contains(&node.id);
        }
        view
    }

    fn update_selection(&mut self, outcome: EditOutcome) {
        for node_id in &outcome.deselected {
            self.selection.remove(node_id);
        }
        self.selection.extend(outcome.created);
    }
}

fn delete_edit(node_id: &str) -> Result<Edit> {
    let edit = match NodeRef::parse(node_id) {
        Some(NodeRef::Task(task_id)) => Edit::RemoveTask { task_id },
        Some(NodeRef::Input(name)) => Edit::RemoveComponentInput { name },
        Some(NodeRef::Output(name)) => Edit::RemoveComponentOutput { name },
        None => return Err(EditorError::UnknownNode(node_id.to_string())),
    };
    Ok(edit)
}

/// Convenience for inline port-name editing in the node inspector.
pub fn rename_edit(node_id: &str, new_name: &str) -> Result<Edit> {
    let edit = match NodeRef::parse(node_id) {
        Some(NodeRef::Task(old_id)) => Edit::RenameTask {
            old_id,
            new_id: new_name.to_string(),
        },
        Some(NodeRef::Input(old_name)) => Edit::RenamePort {
            port: PortKind::Input,
            old_name,
            new_name: new_name.to_string(),
        },
        Some(NodeRef::Output(old_name)) => Edit::RenamePort {
            port: PortKind::Output,
            old_name,
            new_name: new_name.to_string(),
        },
        None => return Err(EditorError::UnknownNode(node_id.to_string())),
    };
    Ok(edit)
}
