//! Pipeline validation: lint rules and diagnostics.
//!
//! Edits keep a document consistent, but documents also arrive from disk
//! and from other tools. The rules here report what the editor would have
//! refused. Call [`validate`] for advisory diagnostics or
//! [`validate_or_raise`] to fail with every `Error`-severity issue.
//!
//! Rules that need a component's declared ports only look at hydrated tasks.

use std::collections::HashSet;

use pipewright_spec::{ArgumentValue, ComponentSpec, GraphSpec};
use serde::Serialize;

use crate::dag::TaskDag;
use crate::ids::{input_node_id, output_node_id, task_node_id};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic>;
}

impl Diagnostic {
    fn new(rule: &dyn LintRule, severity: Severity, message: String) -> Self {
        Self {
            rule: rule.name().into(),
            severity,
            message,
            node_id: None,
            fix: None,
        }
    }

    fn at(mut self, node_id: String) -> Self {
        self.node_id = Some(node_id);
        self
    }

    fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct DanglingTaskReferenceRule;
impl LintRule for DanglingTaskReferenceRule {
    fn name(&self) -> &str { "dangling_task_reference" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        let mut diags: Vec<Diagnostic> = graph
            .arguments()
            .filter_map(|(task_id, input, arg)| {
                let r = arg.as_task_output()?;
                (!graph.tasks.contains_key(&r.task_id)).then(|| {
                    Diagnostic::new(
                        self,
                        Severity::Error,
                        format!("Argument '{input}' of task '{task_id}' reads from missing task '{}'", r.task_id),
                    )
                    .at(task_node_id(task_id))
                    .fix(format!("Reconnect '{input}' or remove the argument"))
                })
            })
            .collect();
        diags.extend(graph.output_values.iter().filter_map(|(name, value)| {
            let source = &value.task_output.task_id;
            (!graph.tasks.contains_key(source)).then(|| {
                Diagnostic::new(
                    self,
                    Severity::Error,
                    format!("Graph output '{name}' reads from missing task '{source}'"),
                )
                .at(output_node_id(name))
            })
        }));
        diags
    }
}

struct UndeclaredGraphInputRule;
impl LintRule for UndeclaredGraphInputRule {
    fn name(&self) -> &str { "undeclared_graph_input" }
    fn apply(&self, spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        graph
            .arguments()
            .filter_map(|(task_id, input, arg)| {
                let r = arg.as_graph_input()?;
                spec.input(&r.input_name).is_none().then(|| {
                    Diagnostic::new(
                        self,
                        Severity::Error,
                        format!(
                            "Argument '{input}' of task '{task_id}' reads undeclared graph input '{}'",
                            r.input_name
                        ),
                    )
                    .at(task_node_id(task_id))
                    .fix(format!("Declare an input named '{}'", r.input_name))
                })
            })
            .collect()
    }
}

struct UndeclaredOutputValueRule;
impl LintRule for UndeclaredOutputValueRule {
    fn name(&self) -> &str { "undeclared_output_value" }
    fn apply(&self, spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        graph
            .output_values
            .keys()
            .filter(|name| spec.output(name).is_none())
            .map(|name| {
                Diagnostic::new(
                    self,
                    Severity::Error,
                    format!("Output value '{name}' has no matching graph output declaration"),
                )
                .fix(format!("Declare an output named '{name}' or remove the value"))
            })
            .collect()
    }
}

struct UnconnectedGraphOutputRule;
impl LintRule for UnconnectedGraphOutputRule {
    fn name(&self) -> &str { "unconnected_graph_output" }
    fn apply(&self, spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        spec.outputs
            .iter()
            .filter(|o| !graph.output_values.contains_key(&o.name))
            .map(|o| {
                Diagnostic::new(
                    self,
                    Severity::Warning,
                    format!("Graph output '{}' is not connected to any task output", o.name),
                )
                .at(output_node_id(&o.name))
            })
            .collect()
    }
}

struct DuplicatePortNameRule;
impl LintRule for DuplicatePortNameRule {
    fn name(&self) -> &str { "duplicate_port_name" }
    fn apply(&self, spec: &ComponentSpec, _graph: &GraphSpec) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        for name in spec.input_names() {
            if !seen.insert(name) {
                diags.push(
                    Diagnostic::new(self, Severity::Error, format!("Graph input '{name}' is declared more than once"))
                        .at(input_node_id(name)),
                );
            }
        }
        let mut seen = HashSet::new();
        for name in spec.output_names() {
            if !seen.insert(name) {
                diags.push(
                    Diagnostic::new(self, Severity::Error, format!("Graph output '{name}' is declared more than once"))
                        .at(output_node_id(name)),
                );
            }
        }
        diags
    }
}

struct TaskCycleRule;
impl LintRule for TaskCycleRule {
    fn name(&self) -> &str { "task_cycle" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        let stuck = TaskDag::new(graph).unorderable();
        if stuck.is_empty() {
            return vec![];
        }
        vec![Diagnostic::new(
            self,
            Severity::Error,
            format!("Tasks form a dependency cycle: {}", stuck.join(", ")),
        )
        .fix("Disconnect one of the edges on the cycle")]
    }
}

struct MissingRequiredArgumentRule;
impl LintRule for MissingRequiredArgumentRule {
    fn name(&self) -> &str { "missing_required_argument" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for (task_id, task) in &graph.tasks {
            let Some(component) = task.component_spec() else { continue };
            for input in component.inputs.iter().filter(|i| i.is_required()) {
                if task.argument(&input.name).is_none() {
                    diags.push(
                        Diagnostic::new(
                            self,
                            Severity::Warning,
                            format!("Task '{task_id}' has no argument for required input '{}'", input.name),
                        )
                        .at(task_node_id(task_id)),
                    );
                }
            }
        }
        diags
    }
}

struct UnknownArgumentRule;
impl LintRule for UnknownArgumentRule {
    fn name(&self) -> &str { "unknown_argument" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for (task_id, task) in &graph.tasks {
            let Some(component) = task.component_spec() else { continue };
            for name in task.arguments.keys() {
                if component.input(name).is_none() {
                    diags.push(
                        Diagnostic::new(
                            self,
                            Severity::Warning,
                            format!("Task '{task_id}' sets '{name}', which its component does not declare"),
                        )
                        .at(task_node_id(task_id))
                        .fix(format!("Remove argument '{name}'")),
                    );
                }
            }
        }
        diags
    }
}

struct UndeclaredTaskOutputRule;
impl LintRule for UndeclaredTaskOutputRule {
    fn name(&self) -> &str { "undeclared_task_output" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        let declared = |task_id: &str, output: &str| {
            graph
                .task(task_id)
                .and_then(|t| t.component_spec())
                .map_or(true, |c| c.output(output).is_some())
        };

        let mut diags = Vec::new();
        for (task_id, input, arg) in graph.arguments() {
            if let ArgumentValue::TaskOutput(r) = arg {
                if !declared(&r.task_id, &r.output_name) {
                    diags.push(
                        Diagnostic::new(
                            self,
                            Severity::Error,
                            format!(
                                "Argument '{input}' of task '{task_id}' reads undeclared output '{}' of task '{}'",
                                r.output_name, r.task_id
                            ),
                        )
                        .at(task_node_id(task_id)),
                    );
                }
            }
        }
        for (name, value) in &graph.output_values {
            let r = &value.task_output;
            if !declared(&r.task_id, &r.output_name) {
                diags.push(
                    Diagnostic::new(
                        self,
                        Severity::Error,
                        format!(
                            "Graph output '{name}' reads undeclared output '{}' of task '{}'",
                            r.output_name, r.task_id
                        ),
                    )
                    .at(output_node_id(name)),
                );
            }
        }
        diags
    }
}

struct UnhydratedComponentRule;
impl LintRule for UnhydratedComponentRule {
    fn name(&self) -> &str { "unhydrated_component" }
    fn apply(&self, _spec: &ComponentSpec, graph: &GraphSpec) -> Vec<Diagnostic> {
        graph
            .tasks
            .iter()
            .filter(|(_, t)| !t.component_ref.is_hydrated())
            .map(|(task_id, _)| {
                Diagnostic::new(
                    self,
                    Severity::Info,
                    format!("Component of task '{task_id}' is not loaded; port checks skipped"),
                )
                .at(task_node_id(task_id))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules. Non-graph components produce no diagnostics.
pub fn validate(spec: &ComponentSpec) -> Vec<Diagnostic> {
    let Some(graph) = spec.graph() else {
        return vec![];
    };

    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(DanglingTaskReferenceRule),
        Box::new(UndeclaredGraphInputRule),
        Box::new(UndeclaredOutputValueRule),
        Box::new(UnconnectedGraphOutputRule),
        Box::new(DuplicatePortNameRule),
        Box::new(TaskCycleRule),
        Box::new(MissingRequiredArgumentRule),
        Box::new(UnknownArgumentRule),
        Box::new(UndeclaredTaskOutputRule),
        Box::new(UnhydratedComponentRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(spec, graph));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic is
/// found. The error lists every error message, joined with `"; "`, so one
/// call reports all of them.
pub fn validate_or_raise(spec: &ComponentSpec) -> pipewright_types::Result<Vec<Diagnostic>> {
    let diagnostics = validate(spec);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(pipewright_types::EditorError::ValidationError(
            messages.join("; "),
        ));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edits::fixtures;
    use pipewright_spec::{
        from_value, graph_input, task_output, ComponentReference, InputSpec, OutputSpec,
        TaskOutputArgument, TaskSpec,
    };
    use serde_json::json;

    fn rules_hit(diags: &[Diagnostic]) -> Vec<&str> {
        let mut rules: Vec<&str> = diags.iter().map(|d| d.rule.as_str()).collect();
        rules.dedup();
        rules
    }

    #[test]
    fn consistent_pipeline_has_no_errors() {
        let diags = validate(&fixtures::pipeline());
        let errors: Vec<_> = diags.iter().filter(|d| d.severity == Severity::Error).collect();
        assert!(errors.is_empty(), "Expected no errors, got: {errors:?}");
        // Tasks are unhydrated.
        assert!(diags.iter().any(|d| d.rule == "unhydrated_component" && d.severity == Severity::Info));
    }

    #[test]
    fn container_has_nothing_to_validate() {
        let spec = from_value(json!({"implementation": {"container": {"image": "x"}}})).unwrap();
        assert!(validate(&spec).is_empty());
    }

    #[test]
    fn dangling_references_are_errors() {
        let spec = from_value(json!({
            "outputs": [{"name": "o"}],
            "implementation": {"graph": {
                "tasks": {"A": {"componentRef": {}, "arguments": {
                    "x": {"taskOutput": {"taskId": "ghost", "outputName": "out"}},
                    "y": {"graphInput": {"inputName": "nope"}}
                }}},
                "outputValues": {
                    "o": {"taskOutput": {"taskId": "ghost", "outputName": "out"}},
                    "extra": {"taskOutput": {"taskId": "A", "outputName": "out"}}
                }
            }}
        }))
        .unwrap();
        let diags = validate(&spec);
        let hit = rules_hit(&diags);
        assert!(hit.contains(&"dangling_task_reference"), "{diags:?}");
        assert!(hit.contains(&"undeclared_graph_input"), "{diags:?}");
        assert!(hit.contains(&"undeclared_output_value"), "{diags:?}");
        assert!(diags
            .iter()
            .filter(|d| d.rule == "dangling_task_reference")
            .any(|d| d.node_id.as_deref() == Some("task_A")));
    }

    #[test]
    fn unconnected_output_is_a_warning() {
        let mut spec = fixtures::pipeline();
        spec.outputs.push(OutputSpec::new("unused"));
        let diags = validate(&spec);
        let d = diags
            .iter()
            .find(|d| d.rule == "unconnected_graph_output")
            .unwrap();
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.node_id.as_deref(), Some("output_unused"));
    }

    #[test]
    fn duplicate_port_names() {
        let mut spec = fixtures::pipeline();
        spec.inputs.push(InputSpec::new("threshold"));
        let diags = validate(&spec);
        assert!(diags
            .iter()
            .any(|d| d.rule == "duplicate_port_name" && d.message.contains("threshold")));
    }

    #[test]
    fn cycle_is_reported_once() {
        let mut spec = fixtures::pipeline();
        spec.graph_mut()
            .unwrap()
            .task_mut("T1")
            .unwrap()
            .arguments
            .insert("back".into(), task_output("T2", "y"));
        let diags = validate(&spec);
        let cycles: Vec<_> = diags.iter().filter(|d| d.rule == "task_cycle").collect();
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].message.contains("T1, T2"), "{}", cycles[0].message);
    }

    #[test]
    fn hydrated_port_rules() {
        let mut spec = fixtures::pipeline();
        let mut task = fixtures::hydrated_task();
        task.arguments.insert("data".into(), graph_input("initialData"));
        task.arguments.insert("bogus".into(), graph_input("threshold"));
        spec.graph_mut().unwrap().tasks.insert("Train".into(), task);
        spec.graph_mut()
            .unwrap()
            .output_values
            .insert("report".into(), TaskOutputArgument::new("Train", "metrics"));

        let diags = validate(&spec);
        let for_rule = |rule: &str| diags.iter().filter(|d| d.rule == rule).count();
        // `limit` is required and unset.
        assert_eq!(for_rule("missing_required_argument"), 1);
        assert_eq!(for_rule("unknown_argument"), 1);
        assert_eq!(for_rule("undeclared_task_output"), 1);
    }

    #[test]
    fn optional_and_defaulted_inputs_are_not_required() {
        let component = ComponentSpec {
            inputs: vec![
                InputSpec {
                    optional: true,
                    ..InputSpec::new("a")
                },
                InputSpec {
                    default: Some("1".into()),
                    ..InputSpec::new("b")
                },
            ],
            ..ComponentSpec::default()
        };
        let mut spec = ComponentSpec::new_graph("p");
        spec.graph_mut().unwrap().tasks.insert(
            "T".into(),
            TaskSpec::new(ComponentReference::from_spec(component)),
        );
        let diags = validate(&spec);
        assert!(!diags.iter().any(|d| d.rule == "missing_required_argument"));
    }

    #[test]
    fn validate_or_raise_ok_for_valid_pipeline() {
        let result = validate_or_raise(&fixtures::pipeline());
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn validate_or_raise_errors_for_invalid_pipeline() {
        let mut spec = fixtures::pipeline();
        spec.inputs.retain(|i| i.name != "threshold");
        let err = validate_or_raise(&spec).unwrap_err();
        assert!(matches!(err, pipewright_types::EditorError::ValidationError(ref m) if m.contains("threshold")));
    }

    #[test]
    fn validate_or_raise_reports_every_error() {
        let mut spec = fixtures::pipeline();
        spec.inputs.clear();
        let message = match validate_or_raise(&spec).unwrap_err() {
            pipewright_types::EditorError::ValidationError(message) => message,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert!(message.contains("'initialData'"), "{message}");
        assert!(message.contains("'threshold'"), "{message}");
        assert!(message.contains("; "), "{message}");
    }

    #[test]
    fn diagnostics_serialize() {
        let mut spec = fixtures::pipeline();
        spec.outputs.push(OutputSpec::new("unused"));
        let value = serde_json::to_value(validate(&spec)).unwrap();
        assert!(value
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d["severity"] == "warning"));
    }
}
