//! Structural edit operations.
//!
//! Every operation takes the current document by reference and returns a
//! new one; the input is never mutated. A rejected edit returns an error
//! and leaves the caller holding the previous document, so a partially
//! applied edit is never observable.
//!
//! [`Edit`] is the serializable form of a single operation, used by the
//! editing session's history and by scripted edits from the CLI.

mod connect;
mod create;
mod ports;
mod remove;
mod tasks;

pub use connect::{connect, disconnect, set_task_argument, Connection};
pub use create::{drop_new_node, duplicate_nodes, DropKind, Dropped, Duplicated};
pub use ports::{rename_port, set_input_default, set_input_optional};
pub use remove::{remove_component_input, remove_component_output, remove_task};
pub use tasks::{rename_task, replace_task_component, set_task_annotation, update_position};

use pipewright_spec::{ArgumentValue, ComponentReference, ComponentSpec, GraphSpec, Position};
use pipewright_types::{EditorConfig, EditorError, PortKind, Result};
use serde::{Deserialize, Serialize};

use crate::ids::{NodeRef, INPUT_PREFIX, TASK_PREFIX};
use crate::projector::ViewEdge;

// ---------------------------------------------------------------------------
// Edit: one serializable operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Edit {
    Connect(Connection),
    Disconnect {
        edge: ViewEdge,
    },
    SetTaskArgument {
        task_id: String,
        input_name: String,
        #[serde(default)]
        value: Option<ArgumentValue>,
    },
    RemoveComponentInput {
        name: String,
    },
    RemoveComponentOutput {
        name: String,
    },
    RemoveTask {
        task_id: String,
    },
    DropNewNode {
        node: DropKind,
        #[serde(default)]
        position: Position,
    },
    DuplicateNodes {
        node_ids: Vec<String>,
    },
    UpdatePosition {
        node_id: String,
        position: Position,
    },
    RenamePort {
        port: PortKind,
        old_name: String,
        new_name: String,
    },
    RenameTask {
        old_id: String,
        new_id: String,
    },
    SetTaskAnnotation {
        task_id: String,
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    ReplaceTaskComponent {
        task_id: String,
        component_ref: ComponentReference,
    },
    SetInputDefault {
        name: String,
        #[serde(default)]
        default: Option<String>,
    },
    SetInputOptional {
        name: String,
        optional: bool,
    },
}

/// Result of applying an [`Edit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub spec: ComponentSpec,
    /// View-node ids created by the edit, which the view should select.
    pub created: Vec<String>,
    /// View-node ids the view should deselect.
    pub deselected: Vec<String>,
}

impl Applied {
    fn spec(spec: ComponentSpec) -> Self {
        Self {
            spec,
            created: Vec::new(),
            deselected: Vec::new(),
        }
    }
}

impl Edit {
    /// Operation name, as written in the `op` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Edit::Connect(_) => "connect",
            Edit::Disconnect { .. } => "disconnect",
            Edit::SetTaskArgument { .. } => "set_task_argument",
            Edit::RemoveComponentInput { .. } => "remove_component_input",
            Edit::RemoveComponentOutput { .. } => "remove_component_output",
            Edit::RemoveTask { .. } => "remove_task",
            Edit::DropNewNode { .. } => "drop_new_node",
            Edit::DuplicateNodes { .. } => "duplicate_nodes",
            Edit::UpdatePosition { .. } => "update_position",
            Edit::RenamePort { .. } => "rename_port",
            Edit::RenameTask { .. } => "rename_task",
            Edit::SetTaskAnnotation { .. } => "set_task_annotation",
            Edit::ReplaceTaskComponent { .. } => "replace_task_component",
            Edit::SetInputDefault { .. } => "set_input_default",
            Edit::SetInputOptional { .. } => "set_input_optional",
        }
    }

    /// The task whose arguments this edit rewrites, if any. Used by the
    /// session to enforce the locked-task policy.
    pub fn argument_target(&self) -> Option<&str> {
        match self {
            Edit::Connect(c) => c.target.strip_prefix(TASK_PREFIX),
            Edit::Disconnect { edge } => edge.target.strip_prefix(TASK_PREFIX),
            Edit::SetTaskArgument { task_id, .. } | Edit::ReplaceTaskComponent { task_id, .. } => {
                Some(task_id)
            }
            _ => None,
        }
    }

    /// Apply the edit to `spec`.
    pub fn apply(&self, spec: &ComponentSpec, config: &EditorConfig) -> Result<Applied> {
        tracing::debug!(op = self.name(), "Applying edit");
        let applied = match self {
            Edit::Connect(connection) => Applied::spec(connect(spec, connection)?),
            Edit::Disconnect { edge } => Applied::spec(disconnect(spec, edge)?),
            Edit::SetTaskArgument {
                task_id,
                input_name,
                value,
            } => Applied::spec(set_task_argument(spec, task_id, input_name, value.clone())?),
            Edit::RemoveComponentInput { name } => {
                Applied::spec(remove_component_input(spec, name)?)
            }
            Edit::RemoveComponentOutput { name } => {
                Applied::spec(remove_component_output(spec, name)?)
            }
            Edit::RemoveTask { task_id } => Applied::spec(remove_task(spec, task_id)?),
            Edit::DropNewNode { node, position } => {
                let dropped = drop_new_node(spec, node, *position)?;
                Applied {
                    spec: dropped.spec,
                    created: vec![dropped.node.node_id()],
                    deselected: Vec::new(),
                }
            }
            Edit::DuplicateNodes { node_ids } => {
                let duplicated = duplicate_nodes(spec, node_ids, config.duplicate_offset)?;
                Applied {
                    spec: duplicated.spec,
                    created: duplicated.created,
                    deselected: duplicated.deselected,
                }
            }
            Edit::UpdatePosition { node_id, position } => {
                Applied::spec(update_position(spec, node_id, *position)?)
            }
            Edit::RenamePort {
                port,
                old_name,
                new_name,
            } => Applied::spec(rename_port(spec, *port, old_name, new_name)?),
            Edit::RenameTask { old_id, new_id } => {
                Applied::spec(rename_task(spec, old_id, new_id)?)
            }
            Edit::SetTaskAnnotation {
                task_id,
                key,
                value,
            } => Applied::spec(set_task_annotation(spec, task_id, key, value.clone())?),
            Edit::ReplaceTaskComponent {
                task_id,
                component_ref,
            } => Applied::spec(replace_task_component(spec, task_id, component_ref.clone())?),
            Edit::SetInputDefault { name, default } => {
                Applied::spec(set_input_default(spec, name, default.clone())?)
            }
            Edit::SetInputOptional { name, optional } => {
                Applied::spec(set_input_optional(spec, name, *optional)?)
            }
        };
        Ok(applied)
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn graph_of(spec: &ComponentSpec) -> Result<&GraphSpec> {
    spec.graph().ok_or(EditorError::NotAGraph)
}

pub(crate) fn graph_of_mut(spec: &mut ComponentSpec) -> Result<&mut GraphSpec> {
    spec.graph_mut().ok_or(EditorError::NotAGraph)
}

/// Port name behind a handle id such as `input_data`.
pub(crate) fn handle_port<'h>(node_id: &str, handle: Option<&'h str>, prefix: &str) -> Result<&'h str> {
    let handle = handle.unwrap_or_default();
    handle
        .strip_prefix(prefix)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EditorError::UnknownHandle {
            node: node_id.to_string(),
            handle: handle.to_string(),
        })
}

pub(crate) fn input_handle_port<'h>(node_id: &str, handle: Option<&'h str>) -> Result<&'h str> {
    handle_port(node_id, handle, INPUT_PREFIX)
}

pub(crate) fn parse_node(node_id: &str) -> Result<NodeRef> {
    NodeRef::parse(node_id).ok_or_else(|| EditorError::UnknownNode(node_id.to_string()))
}

/// Names must contain something other than whitespace.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EditorError::InvalidName(name.to_string()));
    }
    Ok(())
}
