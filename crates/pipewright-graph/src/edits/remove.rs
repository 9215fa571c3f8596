use pipewright_spec::ComponentSpec;
use pipewright_types::{EditorError, Result};

use super::{graph_of, graph_of_mut};

/// Delete a task and every reference to it.
///
/// Runs in three passes over the new document: arguments of other tasks that
/// consume the task's outputs are dropped, then graph output values fed by
/// it, then the task entry itself.
pub fn remove_task(spec: &ComponentSpec, task_id: &str) -> Result<ComponentSpec> {
    if graph_of(spec)?.task(task_id).is_none() {
        return Err(EditorError::TaskNotFound(task_id.to_string()));
    }

    let mut next = spec.clone();
    let graph = graph_of_mut(&mut next)?;

    let mut dropped_arguments = 0usize;
    for (id, task) in graph.tasks.iter_mut() {
        if id == task_id {
            continue;
        }
        let before = task.arguments.len();
        task.arguments.retain(|_, arg| !arg.references_task(task_id));
        dropped_arguments += before - task.arguments.len();
    }

    let before = graph.output_values.len();
    graph
        .output_values
        .retain(|_, value| value.task_output.task_id != task_id);
    let dropped_outputs = before - graph.output_values.len();

    graph.tasks.remove(task_id);

    tracing::debug!(
        task_id,
        dropped_arguments,
        dropped_outputs,
        "Task removed"
    );
    Ok(next)
}

/// Delete a graph input declaration and every argument bound to it.
pub fn remove_component_input(spec: &ComponentSpec, name: &str) -> Result<ComponentSpec> {
    if spec.input(name).is_none() {
        return Err(EditorError::InputNotFound(name.to_string()));
    }

    let mut next = spec.clone();
    if let Some(graph) = next.graph_mut() {
        for task in graph.tasks.values_mut() {
            task.arguments.retain(|_, arg| !arg.references_input(name));
        }
    }
    next.inputs.retain(|input| input.name != name);
    tracing::debug!(input = name, "Graph input removed");
    Ok(next)
}

/// Delete a graph output declaration and its output value. Other outputs
/// fed by the same task are left alone.
pub fn remove_component_output(spec: &ComponentSpec, name: &str) -> Result<ComponentSpec> {
    if spec.output(name).is_none() {
        return Err(EditorError::OutputNotFound(name.to_string()));
    }

    let mut next = spec.clone();
    if let Some(graph) = next.graph_mut() {
        graph.output_values.remove(name);
    }
    next.outputs.retain(|output| output.name != name);
    tracing::debug!(output = name, "Graph output removed");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::fixtures;
    use crate::projector::project;
    use pipewright_spec::{graph_input, literal, TaskOutputArgument};
    use pretty_assertions::assert_eq;

    #[test]
    fn remove_task_cascades() {
        let spec = fixtures::pipeline();
        let next = remove_task(&spec, "T1").unwrap();
        let graph = next.graph().unwrap();

        assert!(graph.task("T1").is_none());
        let t2 = graph.task("T2").unwrap();
        assert_eq!(t2.argument("x"), None);
        assert_eq!(t2.argument("limit"), Some(&graph_input("threshold")));
        assert_eq!(t2.argument("mode"), Some(&literal("fast")));

        assert!(!graph.output_values.contains_key("report"));
        assert_eq!(
            graph.output_values["finalResult"],
            TaskOutputArgument::new("T2", "y")
        );
        // Declarations stay.
        assert!(next.output("report").is_some());
    }

    #[test]
    fn remove_task_leaves_no_dangling_references() {
        let spec = fixtures::pipeline();
        let next = remove_task(&spec, "T2").unwrap();
        let graph = next.graph().unwrap();
        assert!(graph
            .arguments()
            .all(|(_, _, arg)| !arg.references_task("T2")));
        assert!(graph
            .output_values
            .values()
            .all(|v| v.task_output.task_id != "T2"));
        let view = project(&next);
        assert!(view.node("task_T2").is_none());
        assert_eq!(view.edges_of("task_T2").count(), 0);
    }

    #[test]
    fn remove_missing_task() {
        let spec = fixtures::pipeline();
        let err = remove_task(&spec, "ghost").unwrap_err();
        assert!(matches!(err, EditorError::TaskNotFound(id) if id == "ghost"));
    }

    #[test]
    fn remove_input_clears_bound_arguments() {
        let spec = fixtures::pipeline();
        let next = remove_component_input(&spec, "initialData").unwrap();
        assert!(next.input("initialData").is_none());
        assert!(next.input("threshold").is_some());
        let graph = next.graph().unwrap();
        assert_eq!(graph.task("T1").unwrap().argument("src"), None);
        assert!(graph.arguments().all(|(_, _, a)| !a.references_input("initialData")));
        assert!(project(&next).node("input_initialData").is_none());
    }

    #[test]
    fn remove_missing_input() {
        let spec = fixtures::pipeline();
        assert!(matches!(
            remove_component_input(&spec, "nope"),
            Err(EditorError::InputNotFound(_))
        ));
    }

    #[test]
    fn remove_output_clears_only_its_value() {
        let mut spec = fixtures::pipeline();
        // Two outputs fed by the same task output.
        spec.graph_mut()
            .unwrap()
            .output_values
            .insert("report".into(), TaskOutputArgument::new("T2", "y"));

        let next = remove_component_output(&spec, "finalResult").unwrap();
        let graph = next.graph().unwrap();
        assert!(next.output("finalResult").is_none());
        assert!(!graph.output_values.contains_key("finalResult"));
        assert_eq!(graph.output_values["report"], TaskOutputArgument::new("T2", "y"));
    }

    #[test]
    fn remove_missing_output() {
        let spec = fixtures::pipeline();
        assert!(matches!(
            remove_component_output(&spec, "nope"),
            Err(EditorError::OutputNotFound(_))
        ));
    }

    #[test]
    fn removal_does_not_touch_the_original() {
        let spec = fixtures::pipeline();
        let before = spec.clone();
        let _ = remove_task(&spec, "T1").unwrap();
        let _ = remove_component_input(&spec, "threshold").unwrap();
        assert_eq!(spec, before);
    }
}
