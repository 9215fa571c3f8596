use std::collections::BTreeMap;

use pipewright_spec::annotations::set_position;
use pipewright_spec::{
    decode_position, ArgumentValue, ComponentReference, ComponentSpec, InputSpec, OutputSpec,
    Position, TaskSpec, STATUS_ANNOTATION,
};
use pipewright_types::{EditorError, Result};
use serde::{Deserialize, Serialize};

use super::{graph_of, graph_of_mut, parse_node};
use crate::ids::{make_unique_name, NodeRef};

const DEFAULT_TASK_NAME: &str = "Task";
const DEFAULT_INPUT_NAME: &str = "Input";
const DEFAULT_OUTPUT_NAME: &str = "Output";

/// What a drag-and-drop onto the canvas creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropKind {
    Task { component_ref: ComponentReference },
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dropped {
    pub spec: ComponentSpec,
    pub node: NodeRef,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Duplicated {
    pub spec: ComponentSpec,
    /// Original task id → duplicate task id.
    pub task_ids: BTreeMap<String, String>,
    pub input_names: BTreeMap<String, String>,
    pub output_names: BTreeMap<String, String>,
    /// View-node ids of the duplicates, in selection order.
    pub created: Vec<String>,
    /// View-node ids of the originals.
    pub deselected: Vec<String>,
}

/// Create a task, graph input or graph output at `position`.
///
/// Tasks are named after their component, inputs `Input` and outputs
/// `Output`; a numeric suffix is appended when the name is taken.
pub fn drop_new_node(spec: &ComponentSpec, kind: &DropKind, position: Position) -> Result<Dropped> {
    let graph = graph_of(spec)?;
    let mut next = spec.clone();

    let node = match kind {
        DropKind::Task { component_ref } => {
            let base = task_base_name(component_ref);
            let task_id = make_unique_name(base, graph.tasks.keys().map(String::as_str));
            let mut task = TaskSpec::new(component_ref.clone());
            set_position(&mut task.annotations, position);
            graph_of_mut(&mut next)?.tasks.insert(task_id.clone(), task);
            NodeRef::Task(task_id)
        }
        DropKind::Input => {
            let name = make_unique_name(DEFAULT_INPUT_NAME, spec.input_names());
            let mut input = InputSpec::new(name.clone());
            set_position(&mut input.annotations, position);
            next.inputs.push(input);
            NodeRef::Input(name)
        }
        DropKind::Output => {
            let name = make_unique_name(DEFAULT_OUTPUT_NAME, spec.output_names());
            let mut output = OutputSpec::new(name.clone());
            set_position(&mut output.annotations, position);
            next.outputs.push(output);
            NodeRef::Output(name)
        }
    };

    tracing::debug!(node = %node, x = position.x, y = position.y, "Node dropped");
    Ok(Dropped { spec: next, node })
}

fn task_base_name(component_ref: &ComponentReference) -> &str {
    component_ref
        .spec
        .as_deref()
        .and_then(|s| s.name.as_deref())
        .or(component_ref.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TASK_NAME)
}

/// Copy the selected nodes, offset on both axes by `offset`.
///
/// Duplicates get fresh unique names. References between duplicated nodes
/// are rewritten to point at the copies; references to nodes outside the
/// selection keep pointing at the originals. Run status is not copied.
pub fn duplicate_nodes(spec: &ComponentSpec, node_ids: &[String], offset: f64) -> Result<Duplicated> {
    let graph = graph_of(spec)?;

    let mut selection: Vec<NodeRef> = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        let node = parse_node(node_id)?;
        match &node {
            NodeRef::Task(id) if graph.task(id).is_none() => {
                return Err(EditorError::TaskNotFound(id.clone()))
            }
            NodeRef::Input(name) if spec.input(name).is_none() => {
                return Err(EditorError::InputNotFound(name.clone()))
            }
            NodeRef::Output(name) if spec.output(name).is_none() => {
                return Err(EditorError::OutputNotFound(name.clone()))
            }
            _ => {}
        }
        if !selection.contains(&node) {
            selection.push(node);
        }
    }

    let mut result = Duplicated {
        spec: spec.clone(),
        ..Duplicated::default()
    };

    // Names first, so references between copies can be rewritten in one pass.
    let mut task_names: Vec<String> = graph.tasks.keys().cloned().collect();
    let mut input_names: Vec<String> = spec.input_names().map(String::from).collect();
    let mut output_names: Vec<String> = spec.output_names().map(String::from).collect();
    for node in &selection {
        let (taken, map) = match node {
            NodeRef::Task(_) => (&mut task_names, &mut result.task_ids),
            NodeRef::Input(_) => (&mut input_names, &mut result.input_names),
            NodeRef::Output(_) => (&mut output_names, &mut result.output_names),
        };
        let fresh = make_unique_name(node.name(), taken.iter().map(String::as_str));
        taken.push(fresh.clone());
        map.insert(node.name().to_string(), fresh);
    }

    for node in &selection {
        let copy = match node {
            NodeRef::Input(name) => {
                let Some(original) = spec.input(name) else { continue };
                let fresh = result.input_names[name].clone();
                let mut input = original.clone();
                input.name = fresh.clone();
                shift(&mut input.annotations, offset);
                result.spec.inputs.push(input);
                NodeRef::Input(fresh)
            }
            NodeRef::Output(name) => {
                let Some(original) = spec.output(name) else { continue };
                let fresh = result.output_names[name].clone();
                let mut output = original.clone();
                output.name = fresh.clone();
                shift(&mut output.annotations, offset);
                result.spec.outputs.push(output);

                if let Some(value) = graph.output_values.get(name) {
                    let mut value = value.clone();
                    if let Some(task_id) = result.task_ids.get(&value.task_output.task_id) {
                        value.task_output.task_id = task_id.clone();
                    }
                    graph_of_mut(&mut result.spec)?
                        .output_values
                        .insert(fresh.clone(), value);
                }
                NodeRef::Output(fresh)
            }
            NodeRef::Task(id) => {
                let Some(original) = graph.task(id) else { continue };
                let fresh = result.task_ids[id].clone();
                let mut task = original.clone();
                task.annotations.remove(STATUS_ANNOTATION);
                shift(&mut task.annotations, offset);
                for argument in task.arguments.values_mut() {
                    remap_argument(argument, &result.task_ids, &result.input_names);
                }
                graph_of_mut(&mut result.spec)?
                    .tasks
                    .insert(fresh.clone(), task);
                NodeRef::Task(fresh)
            }
        };
        result.created.push(copy.node_id());
        result.deselected.push(node.node_id());
    }

    tracing::debug!(count = result.created.len(), "Nodes duplicated");
    Ok(result)
}

fn shift(annotations: &mut pipewright_spec::Annotations, offset: f64) {
    let position = decode_position(annotations).offset(offset, offset);
    set_position(annotations, position);
}

fn remap_argument(
    argument: &mut ArgumentValue,
    task_ids: &BTreeMap<String, String>,
    input_names: &BTreeMap<String, String>,
) {
    match argument {
        ArgumentValue::TaskOutput(reference) => {
            if let Some(fresh) = task_ids.get(&reference.task_id) {
                reference.task_id = fresh.clone();
            }
        }
        ArgumentValue::GraphInput(reference) => {
            if let Some(fresh) = input_names.get(&reference.input_name) {
                reference.input_name = fresh.clone();
            }
        }
        ArgumentValue::Literal(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::fixtures;
    use crate::projector::project;
    use pipewright_spec::{graph_input, literal, task_output, TaskOutputArgument};
    use pretty_assertions::assert_eq;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // --- drop_new_node ---

    #[test]
    fn drop_task_named_after_component() {
        let spec = fixtures::pipeline();
        let component_ref = ComponentReference::from_spec(fixtures::trainer());
        let dropped = drop_new_node(
            &spec,
            &DropKind::Task { component_ref },
            Position::new(40.0, 80.0),
        )
        .unwrap();
        assert_eq!(dropped.node, NodeRef::Task("Trainer".into()));
        let view = project(&dropped.spec);
        assert_eq!(view.node("task_Trainer").unwrap().position, Position::new(40.0, 80.0));
    }

    #[test]
    fn drop_task_gets_unique_id() {
        let spec = fixtures::pipeline();
        let kind = DropKind::Task {
            component_ref: ComponentReference {
                name: Some("T1".into()),
                ..ComponentReference::default()
            },
        };
        let first = drop_new_node(&spec, &kind, Position::ORIGIN).unwrap();
        assert_eq!(first.node.node_id(), "task_T1 2");
        let second = drop_new_node(&first.spec, &kind, Position::ORIGIN).unwrap();
        assert_eq!(second.node.node_id(), "task_T1 3");
    }

    #[test]
    fn drop_unnamed_component() {
        let spec = ComponentSpec::new_graph("empty");
        let kind = DropKind::Task {
            component_ref: ComponentReference::default(),
        };
        let dropped = drop_new_node(&spec, &kind, Position::ORIGIN).unwrap();
        assert_eq!(dropped.node, NodeRef::Task("Task".into()));
    }

    #[test]
    fn drop_inputs_and_outputs() {
        let spec = ComponentSpec::new_graph("empty");
        let a = drop_new_node(&spec, &DropKind::Input, Position::ORIGIN).unwrap();
        let b = drop_new_node(&a.spec, &DropKind::Input, Position::new(0.0, 50.0)).unwrap();
        assert_eq!(b.node, NodeRef::Input("Input 2".into()));
        assert_eq!(b.spec.input_names().collect::<Vec<_>>(), vec!["Input", "Input 2"]);

        let c = drop_new_node(&b.spec, &DropKind::Output, Position::ORIGIN).unwrap();
        assert_eq!(c.node.node_id(), "output_Output");
        assert_eq!(project(&c.spec).nodes.len(), 3);
    }

    #[test]
    fn drop_on_container_is_rejected() {
        let spec = ComponentSpec {
            implementation: pipewright_spec::Implementation::Container(Default::default()),
            ..ComponentSpec::default()
        };
        assert!(matches!(
            drop_new_node(&spec, &DropKind::Input, Position::ORIGIN),
            Err(EditorError::NotAGraph)
        ));
    }

    // --- duplicate_nodes ---

    #[test]
    fn duplicate_pair_rewires_internal_reference() {
        let spec = fixtures::pipeline();
        let dup = duplicate_nodes(&spec, &ids(&["task_T1", "task_T2"]), 10.0).unwrap();
        let graph = dup.spec.graph().unwrap();

        assert_eq!(dup.task_ids["T1"], "T1 2");
        assert_eq!(dup.task_ids["T2"], "T2 2");
        let copy = graph.task("T2 2").unwrap();
        assert_eq!(copy.argument("x"), Some(&task_output("T1 2", "out")));
        assert_eq!(copy.argument("limit"), Some(&graph_input("threshold")));
        assert_eq!(copy.argument("mode"), Some(&literal("fast")));

        // Originals untouched.
        assert_eq!(
            graph.task("T2").unwrap().argument("x"),
            Some(&task_output("T1", "out"))
        );
        assert_eq!(dup.created, ids(&["task_T1 2", "task_T2 2"]));
        assert_eq!(dup.deselected, ids(&["task_T1", "task_T2"]));
    }

    #[test]
    fn duplicate_alone_keeps_external_reference() {
        let spec = fixtures::pipeline();
        let dup = duplicate_nodes(&spec, &ids(&["task_T2"]), 10.0).unwrap();
        let copy = dup.spec.graph().unwrap().task("T2 2").unwrap();
        assert_eq!(copy.argument("x"), Some(&task_output("T1", "out")));
    }

    #[test]
    fn duplicate_offsets_positions() {
        let spec = fixtures::pipeline();
        let dup = duplicate_nodes(&spec, &ids(&["task_T1", "input_initialData"]), 10.0).unwrap();
        let view = project(&dup.spec);
        assert_eq!(view.node("task_T1 2").unwrap().position, Position::new(110.0, 10.0));
        assert_eq!(
            view.node("input_initialData 2").unwrap().position,
            Position::new(10.0, 10.0)
        );
    }

    #[test]
    fn duplicate_input_rewires_copied_tasks() {
        let spec = fixtures::pipeline();
        let dup = duplicate_nodes(&spec, &ids(&["input_initialData", "task_T1"]), 10.0).unwrap();
        let copy = dup.spec.graph().unwrap().task("T1 2").unwrap();
        assert_eq!(copy.argument("src"), Some(&graph_input("initialData 2")));
    }

    #[test]
    fn duplicate_output_follows_duplicated_task() {
        let spec = fixtures::pipeline();
        let dup =
            duplicate_nodes(&spec, &ids(&["task_T2", "output_finalResult"]), 10.0).unwrap();
        let graph = dup.spec.graph().unwrap();
        assert_eq!(
            graph.output_values["finalResult 2"],
            TaskOutputArgument::new("T2 2", "y")
        );
        assert_eq!(dup.created, ids(&["task_T2 2", "output_finalResult 2"]));
    }

    #[test]
    fn duplicate_drops_run_status() {
        let mut spec = fixtures::pipeline();
        spec.graph_mut()
            .unwrap()
            .task_mut("T1")
            .unwrap()
            .annotations
            .insert(STATUS_ANNOTATION.into(), "SUCCEEDED".into());
        let dup = duplicate_nodes(&spec, &ids(&["task_T1"]), 10.0).unwrap();
        let copy = dup.spec.graph().unwrap().task("T1 2").unwrap();
        assert!(!copy.annotations.contains_key(STATUS_ANNOTATION));
    }

    #[test]
    fn duplicate_twice_gets_distinct_names() {
        let spec = fixtures::pipeline();
        let once = duplicate_nodes(&spec, &ids(&["task_T1"]), 10.0).unwrap();
        let twice = duplicate_nodes(&once.spec, &ids(&["task_T1"]), 10.0).unwrap();
        assert_eq!(twice.task_ids["T1"], "T1 3");
    }

    #[test]
    fn duplicate_ignores_repeated_selection() {
        let spec = fixtures::pipeline();
        let dup = duplicate_nodes(&spec, &ids(&["task_T1", "task_T1"]), 10.0).unwrap();
        assert_eq!(dup.created.len(), 1);
        assert_eq!(dup.spec.graph().unwrap().tasks.len(), 3);
    }

    #[test]
    fn duplicate_unknown_node() {
        let spec = fixtures::pipeline();
        assert!(matches!(
            duplicate_nodes(&spec, &ids(&["task_ghost"]), 10.0),
            Err(EditorError::TaskNotFound(_))
        ));
        assert!(matches!(
            duplicate_nodes(&spec, &ids(&["bogus"]), 10.0),
            Err(EditorError::UnknownNode(_))
        ));
    }
}
