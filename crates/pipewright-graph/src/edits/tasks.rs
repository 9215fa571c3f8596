use pipewright_spec::annotations::set_position;
use pipewright_spec::{ArgumentValue, ComponentReference, ComponentSpec, Position};
use pipewright_types::{EditorError, Result};

use super::{check_name, graph_of, graph_of_mut, parse_node};
use crate::ids::NodeRef;

/// Record a node's canvas position in its annotations.
pub fn update_position(spec: &ComponentSpec, node_id: &str, position: Position) -> Result<ComponentSpec> {
    let mut next = spec.clone();
    match parse_node(node_id)? {
        NodeRef::Task(task_id) => {
            let task = graph_of_mut(&mut next)?
                .task_mut(&task_id)
                .ok_or(EditorError::TaskNotFound(task_id))?;
            set_position(&mut task.annotations, position);
        }
        NodeRef::Input(name) => {
            let input = next
                .input_mut(&name)
                .ok_or(EditorError::InputNotFound(name))?;
            set_position(&mut input.annotations, position);
        }
        NodeRef::Output(name) => {
            let output = next
                .output_mut(&name)
                .ok_or(EditorError::OutputNotFound(name))?;
            set_position(&mut output.annotations, position);
        }
    }
    Ok(next)
}

/// Change a task's id, rewriting every argument and output value that
/// consumes its outputs.
pub fn rename_task(spec: &ComponentSpec, old_id: &str, new_id: &str) -> Result<ComponentSpec> {
    check_name(new_id)?;
    let graph = graph_of(spec)?;
    if graph.task(old_id).is_none() {
        return Err(EditorError::TaskNotFound(old_id.to_string()));
    }
    if old_id == new_id {
        return Ok(spec.clone());
    }
    if graph.task(new_id).is_some() {
        return Err(EditorError::DuplicateTaskId(new_id.to_string()));
    }

    let mut next = spec.clone();
    let graph = graph_of_mut(&mut next)?;
    if let Some(task) = graph.tasks.remove(old_id) {
        graph.tasks.insert(new_id.to_string(), task);
    }
    for task in graph.tasks.values_mut() {
        for argument in task.arguments.values_mut() {
            if let ArgumentValue::TaskOutput(reference) = argument {
                if reference.task_id == old_id {
                    reference.task_id = new_id.to_string();
                }
            }
        }
    }
    for value in graph.output_values.values_mut() {
        if value.task_output.task_id == old_id {
            value.task_output.task_id = new_id.to_string();
        }
    }

    tracing::debug!(old_id, new_id, "Task renamed");
    Ok(next)
}

/// Set (`Some`) or remove (`None`) one annotation on a task.
pub fn set_task_annotation(
    spec: &ComponentSpec,
    task_id: &str,
    key: &str,
    value: Option<String>,
) -> Result<ComponentSpec> {
    let mut next = spec.clone();
    let task = graph_of_mut(&mut next)?
        .task_mut(task_id)
        .ok_or_else(|| EditorError::TaskNotFound(task_id.to_string()))?;
    match value {
        Some(value) => {
            task.annotations.insert(key.to_string(), value);
        }
        None => {
            task.annotations.remove(key);
        }
    }
    Ok(next)
}

/// Point a task at a different component.
///
/// The new reference must be hydrated so its ports are known. Arguments for
/// inputs the new component does not declare are dropped, as are
/// downstream references to outputs it does not declare.
pub fn replace_task_component(
    spec: &ComponentSpec,
    task_id: &str,
    component_ref: ComponentReference,
) -> Result<ComponentSpec> {
    if graph_of(spec)?.task(task_id).is_none() {
        return Err(EditorError::TaskNotFound(task_id.to_string()));
    }
    let Some(component) = component_ref.spec.clone() else {
        return Err(EditorError::MissingSpec {
            reference: component_ref
                .display_name()
                .unwrap_or(task_id)
                .to_string(),
        });
    };

    let mut next = spec.clone();
    let graph = graph_of_mut(&mut next)?;

    for (id, task) in graph.tasks.iter_mut() {
        if id == task_id {
            task.arguments
                .retain(|input, _| component.input(input).is_some());
            task.component_ref = component_ref.clone();
        } else {
            task.arguments.retain(|_, argument| match argument.as_task_output() {
                Some(r) if r.task_id == task_id => component.output(&r.output_name).is_some(),
                _ => true,
            });
        }
    }
    graph.output_values.retain(|_, value| {
        value.task_output.task_id != task_id
            || component.output(&value.task_output.output_name).is_some()
    });

    tracing::debug!(task_id, component = ?component.name, "Task component replaced");
    Ok(next)
}
