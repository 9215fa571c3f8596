use pipewright_spec::{
    graph_input, task_output, ArgumentValue, ComponentSpec, GraphSpec, TaskOutputArgument,
    TaskSpec,
};
use pipewright_types::{EditorError, Result};
use serde::{Deserialize, Serialize};

use super::{graph_of, graph_of_mut, handle_port, input_handle_port, parse_node};
use crate::dag::TaskDag;
use crate::ids::{input_handle_id, output_handle_id, task_node_id, NodeRef, OUTPUT_PREFIX};
use crate::projector::{argument_edge, output_value_edge, ViewEdge};

/// A user-drawn link between two view handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(
        source: impl Into<String>,
        source_handle: Option<&str>,
        target: impl Into<String>,
        target_handle: Option<&str>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.map(String::from),
            target: target.into(),
            target_handle: target_handle.map(String::from),
        }
    }

    fn rejected(&self, reason: &str) -> EditorError {
        EditorError::InvalidConnection {
            from: self.source.clone(),
            to: self.target.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Turn a view connection into a document reference.
///
/// Task output → task input sets a `taskOutput` argument, graph input → task
/// input sets a `graphInput` argument, and task output → graph output sets
/// the output value. Any other pairing is rejected. An existing argument on
/// the target handle is replaced.
pub fn connect(spec: &ComponentSpec, connection: &Connection) -> Result<ComponentSpec> {
    let source = parse_node(&connection.source)?;
    let target = parse_node(&connection.target)?;

    if matches!((&source, &target), (NodeRef::Input(_), NodeRef::Output(_))) {
        return Err(connection.rejected("graph inputs cannot feed graph outputs directly"));
    }

    let graph = graph_of(spec)?;
    let value = match &source {
        NodeRef::Task(task_id) => {
            let output_name =
                handle_port(&connection.source, connection.source_handle.as_deref(), OUTPUT_PREFIX)?;
            task_output(task_id.as_str(), output_name)
        }
        NodeRef::Input(name) => graph_input(name.as_str()),
        NodeRef::Output(_) => {
            return Err(connection.rejected("graph outputs have no outgoing handle"));
        }
    };

    match &target {
        NodeRef::Task(task_id) => {
            let input_name =
                input_handle_port(&connection.target, connection.target_handle.as_deref())?;
            set_task_argument(spec, task_id, input_name, Some(value))
        }
        NodeRef::Output(output_name) => {
            if spec.output(output_name).is_none() {
                return Err(EditorError::OutputNotFound(output_name.clone()));
            }
            let ArgumentValue::TaskOutput(reference) = value else {
                return Err(connection.rejected("only task outputs can feed graph outputs"));
            };
            check_task_output(graph, &reference.task_id, &reference.output_name)?;

            let mut next = spec.clone();
            graph_of_mut(&mut next)?.output_values.insert(
                output_name.clone(),
                TaskOutputArgument {
                    task_output: reference,
                },
            );
            tracing::debug!(output = %output_name, "Graph output connected");
            Ok(next)
        }
        NodeRef::Input(_) => Err(connection.rejected("graph inputs have no incoming handle")),
    }
}

/// Edge ids alone are ambiguous when names contain `_`, so the endpoints
/// are compared too.
fn projected_from(current: Option<&ViewEdge>, edge: &ViewEdge) -> bool {
    current.is_some_and(|c| {
        c.id == edge.id && c.source == edge.source && c.source_handle == edge.source_handle
    })
}

/// Remove the reference an edge represents.
///
/// The slot is found from the edge's target: a task input argument or a
/// graph output value. The slot is only cleared while it still holds the
/// reference the edge was projected from; a stale edge is a no-op.
pub fn disconnect(spec: &ComponentSpec, edge: &ViewEdge) -> Result<ComponentSpec> {
    let graph = graph_of(spec)?;
    let mut next = spec.clone();

    match parse_node(&edge.target)? {
        NodeRef::Task(task_id) => {
            let input_name = input_handle_port(&edge.target, edge.target_handle.as_deref())?;
            let task = graph
                .task(&task_id)
                .ok_or_else(|| EditorError::TaskNotFound(task_id.clone()))?;
            let current = task
                .argument(input_name)
                .and_then(|arg| argument_edge(&task_id, input_name, arg));
            if !projected_from(current.as_ref(), edge) {
                tracing::debug!(edge = %edge.id, "Edge no longer matches the document");
                return Ok(next);
            }
            if let Some(task) = graph_of_mut(&mut next)?.task_mut(&task_id) {
                task.arguments.remove(input_name);
            }
        }
        NodeRef::Output(output_name) => {
            let current = graph
                .output_values
                .get(&output_name)
                .map(|value| output_value_edge(&output_name, value));
            if !projected_from(current.as_ref(), edge) {
                tracing::debug!(edge = %edge.id, "Edge no longer matches the document");
                return Ok(next);
            }
            graph_of_mut(&mut next)?.output_values.remove(&output_name);
        }
        NodeRef::Input(_) => {
            return Err(EditorError::InvalidConnection {
                from: edge.source.clone(),
                to: edge.target.clone(),
                reason: "graph inputs have no incoming edges".into(),
            })
        }
    }
    Ok(next)
}

/// Set, replace or clear (`None`) one argument of a task.
///
/// References are checked before anything changes: the source task or
/// graph input must exist, a task cannot consume its own output, and the
/// new dependency must not close a cycle. Hydrated components also have
/// their declared input and output names enforced.
pub fn set_task_argument(
    spec: &ComponentSpec,
    task_id: &str,
    input_name: &str,
    value: Option<ArgumentValue>,
) -> Result<ComponentSpec> {
    let graph = graph_of(spec)?;
    let task = graph
        .task(task_id)
        .ok_or_else(|| EditorError::TaskNotFound(task_id.to_string()))?;

    if let Some(value) = &value {
        check_task_input(task_id, task, input_name)?;
        check_reference(spec, graph, task_id, value)?;
    }

    let mut next = spec.clone();
    let graph = graph_of_mut(&mut next)?;
    if let Some(task) = graph.task_mut(task_id) {
        match value {
            Some(value) => {
                tracing::debug!(task_id, input_name, %value, "Argument set");
                task.arguments.insert(input_name.to_string(), value);
            }
            None => {
                task.arguments.remove(input_name);
            }
        }
    }
    Ok(next)
}

fn check_task_input(task_id: &str, task: &TaskSpec, input_name: &str) -> Result<()> {
    match task.component_spec() {
        Some(component) if component.input(input_name).is_none() => {
            Err(EditorError::UnknownHandle {
                node: task_node_id(task_id),
                handle: input_handle_id(input_name),
            })
        }
        _ => Ok(()),
    }
}

fn check_task_output(graph: &GraphSpec, source_task: &str, output_name: &str) -> Result<()> {
    let task = graph
        .task(source_task)
        .ok_or_else(|| EditorError::TaskNotFound(source_task.to_string()))?;
    match task.component_spec() {
        Some(component) if component.output(output_name).is_none() => {
            Err(EditorError::UnknownHandle {
                node: task_node_id(source_task),
                handle: output_handle_id(output_name),
            })
        }
        _ => Ok(()),
    }
}

fn check_reference(
    spec: &ComponentSpec,
    graph: &GraphSpec,
    task_id: &str,
    value: &ArgumentValue,
) -> Result<()> {
    match value {
        ArgumentValue::Literal(_) => Ok(()),
        ArgumentValue::GraphInput(reference) => {
            if spec.input(&reference.input_name).is_none() {
                return Err(EditorError::InputNotFound(reference.input_name.clone()));
            }
            Ok(())
        }
        ArgumentValue::TaskOutput(reference) => {
            check_task_output(graph, &reference.task_id, &reference.output_name)?;
            let from = task_node_id(&reference.task_id);
            let to = task_node_id(task_id);
            if reference.task_id == task_id {
                return Err(EditorError::InvalidConnection {
                    from,
                    to,
                    reason: "a task cannot consume its own output".into(),
                });
            }
            if TaskDag::new(graph).depends_on(&reference.task_id, task_id) {
                return Err(EditorError::CycleDetected { from, to });
            }
            Ok(())
        }
    }
}
