use pipewright_spec::{ArgumentValue, ComponentSpec};
use pipewright_types::{EditorError, PortKind, Result};

use super::check_name;

/// Rename a graph input or output and every reference to it.
///
/// Renaming an input rewrites all `graphInput` arguments that name it;
/// renaming an output moves its output value to the new key.
pub fn rename_port(
    spec: &ComponentSpec,
    kind: PortKind,
    old_name: &str,
    new_name: &str,
) -> Result<ComponentSpec> {
    check_name(new_name)?;

    let exists = |name: &str| match kind {
        PortKind::Input => spec.input(name).is_some(),
        PortKind::Output => spec.output(name).is_some(),
    };
    if !exists(old_name) {
        return Err(match kind {
            PortKind::Input => EditorError::InputNotFound(old_name.to_string()),
            PortKind::Output => EditorError::OutputNotFound(old_name.to_string()),
        });
    }
    if old_name == new_name {
        return Ok(spec.clone());
    }
    if exists(new_name) {
        return Err(EditorError::DuplicateName {
            kind,
            name: new_name.to_string(),
        });
    }

    let mut next = spec.clone();
    match kind {
        PortKind::Input => {
            if let Some(input) = next.input_mut(old_name) {
                input.name = new_name.to_string();
            }
            if let Some(graph) = next.graph_mut() {
                for task in graph.tasks.values_mut() {
                    for argument in task.arguments.values_mut() {
                        if let ArgumentValue::GraphInput(reference) = argument {
                            if reference.input_name == old_name {
                                reference.input_name = new_name.to_string();
                            }
                        }
                    }
                }
            }
        }
        PortKind::Output => {
            if let Some(output) = next.output_mut(old_name) {
                output.name = new_name.to_string();
            }
            if let Some(graph) = next.graph_mut() {
                if let Some(value) = graph.output_values.remove(old_name) {
                    graph.output_values.insert(new_name.to_string(), value);
                }
            }
        }
    }

    tracing::debug!(%kind, old_name, new_name, "Port renamed");
    Ok(next)
}

/// Set or clear the default value of a graph input.
pub fn set_input_default(
    spec: &ComponentSpec,
    name: &str,
    default: Option<String>,
) -> Result<ComponentSpec> {
    let mut next = spec.clone();
    let input = next
        .input_mut(name)
        .ok_or_else(|| EditorError::InputNotFound(name.to_string()))?;
    input.default = default;
    Ok(next)
}

pub fn set_input_optional(spec: &ComponentSpec, name: &str, optional: bool) -> Result<ComponentSpec> {
    let mut next = spec.clone();
    let input = next
        .input_mut(name)
        .ok_or_else(|| EditorError::InputNotFound(name.to_string()))?;
    input.optional = optional;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::fixtures;
    use crate::projector::project;
    use pipewright_spec::{graph_input, TaskOutputArgument};
    use pretty_assertions::assert_eq;

    #[test]
    fn rename_input_rewrites_arguments() {
        let spec = fixtures::pipeline();
        let next = rename_port(&spec, PortKind::Input, "initialData", "rawData").unwrap();
        assert!(next.input("initialData").is_none());
        assert!(next.input("rawData").is_some());
        assert_eq!(
            next.graph().unwrap().task("T1").unwrap().argument("src"),
            Some(&graph_input("rawData"))
        );
        let view = project(&next);
        assert!(view.node("input_rawData").is_some());
        assert!(view.edge("Input_rawData-T1_src").is_some());
        assert!(view.edge("Input_initialData-T1_src").is_none());
    }

    #[test]
    fn rename_input_rewrites_every_consumer() {
        let mut spec = fixtures::pipeline();
        spec.graph_mut()
            .unwrap()
            .task_mut("T2")
            .unwrap()
            .arguments
            .insert("seed".into(), graph_input("initialData"));

        let next = rename_port(&spec, PortKind::Input, "initialData", "rawData").unwrap();
        let graph = next.graph().unwrap();
        assert_eq!(graph.task("T1").unwrap().argument("src"), Some(&graph_input("rawData")));
        let t2 = graph.task("T2").unwrap();
        assert_eq!(t2.argument("seed"), Some(&graph_input("rawData")));
        assert_eq!(t2.argument("limit"), Some(&graph_input("threshold")));
        assert!(!graph
            .arguments()
            .any(|(_, _, arg)| arg.references_input("initialData")));

        let view = project(&next);
        assert!(view.edge("Input_rawData-T1_src").is_some());
        assert!(view.edge("Input_rawData-T2_seed").is_some());
        assert!(view.edge("Input_threshold-T2_limit").is_some());
    }

    #[test]
    fn rename_output_moves_value() {
        let spec = fixtures::pipeline();
        let next = rename_port(&spec, PortKind::Output, "finalResult", "model").unwrap();
        let graph = next.graph().unwrap();
        assert!(!graph.output_values.contains_key("finalResult"));
        assert_eq!(graph.output_values["model"], TaskOutputArgument::new("T2", "y"));
        assert!(project(&next).edge("T2_y-Output_model").is_some());
    }

    #[test]
    fn rename_keeps_declaration_order() {
        let spec = fixtures::pipeline();
        let next = rename_port(&spec, PortKind::Input, "initialData", "zzz").unwrap();
        assert_eq!(next.input_names().collect::<Vec<_>>(), vec!["zzz", "threshold"]);
    }

    #[test]
    fn rename_collision_is_rejected() {
        let spec = fixtures::pipeline();
        let err = rename_port(&spec, PortKind::Input, "initialData", "threshold").unwrap_err();
        assert!(matches!(
            err,
            EditorError::DuplicateName { kind: PortKind::Input, ref name } if name == "threshold"
        ));
        let err = rename_port(&spec, PortKind::Output, "report", "finalResult").unwrap_err();
        assert!(matches!(err, EditorError::DuplicateName { kind: PortKind::Output, .. }));
    }

    #[test]
    fn rename_missing_port() {
        let spec = fixtures::pipeline();
        assert!(matches!(
            rename_port(&spec, PortKind::Input, "ghost", "x"),
            Err(EditorError::InputNotFound(_))
        ));
        assert!(matches!(
            rename_port(&spec, PortKind::Output, "ghost", "x"),
            Err(EditorError::OutputNotFound(_))
        ));
    }

    #[test]
    fn rename_to_blank_is_rejected() {
        let spec = fixtures::pipeline();
        assert!(matches!(
            rename_port(&spec, PortKind::Input, "initialData", "  "),
            Err(EditorError::InvalidName(_))
        ));
    }

    #[test]
    fn rename_to_same_name_is_unchanged() {
        let spec = fixtures::pipeline();
        let next = rename_port(&spec, PortKind::Output, "report", "report").unwrap();
        assert_eq!(next, spec);
    }

    #[test]
    fn input_default_and_optional() {
        let spec = fixtures::pipeline();
        let next = set_input_default(&spec, "initialData", Some("gs://bucket".into())).unwrap();
        let next = set_input_optional(&next, "initialData", true).unwrap();
        let input = next.input("initialData").unwrap();
        assert_eq!(input.default.as_deref(), Some("gs://bucket"));
        assert!(input.optional);

        let cleared = set_input_default(&next, "initialData", None).unwrap();
        assert_eq!(cleared.input("initialData").unwrap().default, None);

        assert!(matches!(
            set_input_optional(&spec, "ghost", true),
            Err(EditorError::InputNotFound(_))
        ));
    }
}
