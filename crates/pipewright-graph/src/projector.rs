//! Spec → view projection.
//!
//! [`project`] derives the complete node/edge view of a pipeline from its
//! specification. Nothing here is stored: the same document always yields
//! the same nodes and byte-identical edge ids, so re-rendering after an edit
//! is a plain recomputation.

use pipewright_spec::annotations::run_status;
use pipewright_spec::{
    decode_position, ArgumentValue, ComponentSpec, GraphSpec, Position, TaskOutputArgument,
    TaskSpec, TypeSpec,
};
use serde::{Deserialize, Serialize};

use crate::ids::{input_handle_id, input_node_id, output_handle_id, output_node_id, task_node_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Task,
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Task {
        task_id: String,
        label: String,
        /// Input handle names: declared inputs when hydrated, otherwise the
        /// names that currently carry an argument.
        inputs: Vec<String>,
        outputs: Vec<String>,
        status: Option<String>,
        locked: bool,
        spec_missing: bool,
    },
    Input {
        name: String,
        description: Option<String>,
        type_name: Option<String>,
        default: Option<String>,
        optional: bool,
    },
    Output {
        name: String,
        description: Option<String>,
        type_name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Task output → task input.
    TaskToTask,
    /// Graph input → task input.
    InputToTask,
    /// Task output → graph output.
    TaskToOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
    pub source_handle: Option<String>,
    pub target: String,
    pub target_handle: Option<String>,
}

/// Derived view of a pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

impl GraphView {
    pub fn node(&self, node_id: &str) -> Option<&ViewNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&ViewEdge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    /// Edges touching `node_id` on either end.
    pub fn edges_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ViewEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == node_id || e.target == node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Project a specification onto its node-graph view.
///
/// Non-graph implementations project to an empty view. References to tasks
/// or ports that do not exist produce no edge.
pub fn project(spec: &ComponentSpec) -> GraphView {
    let Some(graph) = spec.graph() else {
        return GraphView::default();
    };

    let mut nodes = Vec::with_capacity(graph.tasks.len() + spec.inputs.len() + spec.outputs.len());

    for input in &spec.inputs {
        nodes.push(ViewNode {
            id: input_node_id(&input.name),
            kind: NodeKind::Input,
            position: decode_position(&input.annotations),
            data: NodeData::Input {
                name: input.name.clone(),
                description: input.description.clone(),
                type_name: type_name(input.type_spec.as_ref()),
                default: input.default.clone(),
                optional: input.optional,
            },
            selected: false,
        });
    }

    for (task_id, task) in &graph.tasks {
        nodes.push(task_node(task_id, task));
    }

    for output in &spec.outputs {
        nodes.push(ViewNode {
            id: output_node_id(&output.name),
            kind: NodeKind::Output,
            position: decode_position(&output.annotations),
            data: NodeData::Output {
                name: output.name.clone(),
                description: output.description.clone(),
                type_name: type_name(output.type_spec.as_ref()),
            },
            selected: false,
        });
    }

    GraphView {
        nodes,
        edges: project_edges(spec, graph),
    }
}

/// All edges of the graph, in task order then output order.
pub fn project_edges(spec: &ComponentSpec, graph: &GraphSpec) -> Vec<ViewEdge> {
    let mut edges = Vec::new();

    for (task_id, input_name, argument) in graph.arguments() {
        let edge = match argument {
            ArgumentValue::TaskOutput(r) if !graph.tasks.contains_key(&r.task_id) => None,
            ArgumentValue::GraphInput(r) if spec.input(&r.input_name).is_none() => None,
            _ => argument_edge(task_id, input_name, argument),
        };
        match edge {
            Some(edge) => edges.push(edge),
            None if !matches!(argument, ArgumentValue::Literal(_)) => {
                tracing::debug!(task_id, input_name, %argument, "Skipping edge with dangling source");
            }
            None => {}
        }
    }

    for (output_name, value) in &graph.output_values {
        if spec.output(output_name).is_none()
            || !graph.tasks.contains_key(&value.task_output.task_id)
        {
            tracing::debug!(output_name, "Skipping dangling output value edge");
            continue;
        }
        edges.push(output_value_edge(output_name, value));
    }

    edges
}

/// The edge an argument induces, if it is a reference.
///
/// Ids join names with `_` and are not unique when names contain `_`: task
/// `A` output `b_c` and task `A_b` output `c` both give `A_b_c-...`. Use
/// `source`/`source_handle` to tell such edges apart.
pub fn argument_edge(task_id: &str, input_name: &str, argument: &ArgumentValue) -> Option<ViewEdge> {
    match argument {
        ArgumentValue::Literal(_) => None,
        ArgumentValue::TaskOutput(r) => Some(ViewEdge {
            id: format!("{}_{}-{}_{}", r.task_id, r.output_name, task_id, input_name),
            kind: EdgeKind::TaskToTask,
            source: task_node_id(&r.task_id),
            source_handle: Some(output_handle_id(&r.output_name)),
            target: task_node_id(task_id),
            target_handle: Some(input_handle_id(input_name)),
        }),
        ArgumentValue::GraphInput(r) => Some(ViewEdge {
            id: format!("Input_{}-{}_{}", r.input_name, task_id, input_name),
            kind: EdgeKind::InputToTask,
            source: input_node_id(&r.input_name),
            source_handle: None,
            target: task_node_id(task_id),
            target_handle: Some(input_handle_id(input_name)),
        }),
    }
}

/// The edge feeding a graph output.
pub fn output_value_edge(output_name: &str, value: &TaskOutputArgument) -> ViewEdge {
    let r = &value.task_output;
    ViewEdge {
        id: format!("{}_{}-Output_{}", r.task_id, r.output_name, output_name),
        kind: EdgeKind::TaskToOutput,
        source: task_node_id(&r.task_id),
        source_handle: Some(output_handle_id(&r.output_name)),
        target: output_node_id(output_name),
        target_handle: None,
    }
}

fn task_node(task_id: &str, task: &TaskSpec) -> ViewNode {
    let component = task.component_spec();
    let inputs = match component {
        Some(c) => c.input_names().map(String::from).collect(),
        None => task.arguments.keys().cloned().collect(),
    };
    let outputs = component
        .map(|c| c.output_names().map(String::from).collect())
        .unwrap_or_default();
    let status = run_status(&task.annotations).map(String::from);

    ViewNode {
        id: task_node_id(task_id),
        kind: NodeKind::Task,
        position: decode_position(&task.annotations),
        data: NodeData::Task {
            task_id: task_id.to_string(),
            label: task
                .component_ref
                .display_name()
                .unwrap_or(task_id)
                .to_string(),
            inputs,
            outputs,
            locked: status.is_some(),
            status,
            spec_missing: component.is_none(),
        },
        selected: false,
    }
}

fn type_name(type_spec: Option<&TypeSpec>) -> Option<String> {
    match type_spec? {
        TypeSpec::Name(name) => Some(name.clone()),
        TypeSpec::Structured(map) => map.keys().next().cloned(),
    }
}
