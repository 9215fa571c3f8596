//! View-node identifiers and unique name generation.
//!
//! Node ids are the specification name behind a fixed prefix: `task_<id>`,
//! `input_<name>`, `output_<name>`. Task nodes expose one handle per port
//! using the same `input_` / `output_` prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const TASK_PREFIX: &str = "task_";
pub const INPUT_PREFIX: &str = "input_";
pub const OUTPUT_PREFIX: &str = "output_";

/// What a view-node id points at in the specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum NodeRef {
    Task(String),
    Input(String),
    Output(String),
}

impl NodeRef {
    /// Decode a view-node id. Returns `None` for ids without a known prefix.
    pub fn parse(node_id: &str) -> Option<NodeRef> {
        if let Some(id) = node_id.strip_prefix(TASK_PREFIX) {
            Some(NodeRef::Task(id.to_string()))
        } else if let Some(name) = node_id.strip_prefix(INPUT_PREFIX) {
            Some(NodeRef::Input(name.to_string()))
        } else {
            node_id
                .strip_prefix(OUTPUT_PREFIX)
                .map(|name| NodeRef::Output(name.to_string()))
        }
    }

    pub fn node_id(&self) -> String {
        match self {
            NodeRef::Task(id) => task_node_id(id),
            NodeRef::Input(name) => input_node_id(name),
            NodeRef::Output(name) => output_node_id(name),
        }
    }

    /// The specification-level name (task id or port name).
    pub fn name(&self) -> &str {
        match self {
            NodeRef::Task(n) | NodeRef::Input(n) | NodeRef::Output(n) => n,
        }
    }

    pub fn as_task(&self) -> Option<&str> {
        match self {
            NodeRef::Task(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node_id())
    }
}

pub fn task_node_id(task_id: &str) -> String {
    format!("{TASK_PREFIX}{task_id}")
}

pub fn input_node_id(input_name: &str) -> String {
    format!("{INPUT_PREFIX}{input_name}")
}

pub fn output_node_id(output_name: &str) -> String {
    format!("{OUTPUT_PREFIX}{output_name}")
}

pub fn node_id_to_task_id(node_id: &str) -> Option<&str> {
    node_id.strip_prefix(TASK_PREFIX)
}

pub fn node_id_to_input_name(node_id: &str) -> Option<&str> {
    node_id.strip_prefix(INPUT_PREFIX)
}

pub fn node_id_to_output_name(node_id: &str) -> Option<&str> {
    node_id.strip_prefix(OUTPUT_PREFIX)
}

/// Handle id of a task's input port.
pub fn input_handle_id(input_name: &str) -> String {
    input_node_id(input_name)
}

/// Handle id of a task's output port.
pub fn output_handle_id(output_name: &str) -> String {
    output_node_id(output_name)
}

/// Return `candidate` if unused, otherwise `"candidate 2"`, `"candidate 3"`,
/// and so on, taking the first suffix that does not collide.
pub fn make_unique_name<'a, I>(candidate: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = existing.into_iter().collect();
    if !taken.contains(candidate) {
        return candidate.to_string();
    }
    let mut index = 2usize;
    loop {
        let name = format!("{candidate} {index}");
        if !taken.contains(name.as_str()) {
            return name;
        }
        index += 1;
    }
}
