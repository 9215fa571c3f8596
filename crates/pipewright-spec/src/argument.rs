//! Task argument values and their classification.
//!
//! An argument slot holds exactly one of a literal string, a reference to
//! another task's output, or a reference to a graph-level input. The wire
//! form is structural: a bare string, `{"taskOutput": {...}}`, or
//! `{"graphInput": {...}}`. Anything else is rejected rather than guessed at.

use std::fmt;

use pipewright_types::{EditorError, Result};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const TASK_OUTPUT_KEY: &str = "taskOutput";
const GRAPH_INPUT_KEY: &str = "graphInput";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputReference {
    pub task_id: String,
    pub output_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInputReference {
    pub input_name: String,
}

/// The value wired into one task input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentValue {
    Literal(String),
    TaskOutput(TaskOutputReference),
    GraphInput(GraphInputReference),
}

/// Which variant an [`ArgumentValue`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Literal,
    TaskOutput,
    GraphInput,
}

/// A graph output value. Graph outputs can only forward a task output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputArgument {
    pub task_output: TaskOutputReference,
}

impl TaskOutputArgument {
    pub fn new(task_id: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            task_output: TaskOutputReference {
                task_id: task_id.into(),
                output_name: output_name.into(),
            },
        }
    }
}

/// Build a reference to `output_name` of task `task_id`.
pub fn task_output(task_id: impl Into<String>, output_name: impl Into<String>) -> ArgumentValue {
    ArgumentValue::TaskOutput(TaskOutputReference {
        task_id: task_id.into(),
        output_name: output_name.into(),
    })
}

/// Build a reference to the graph input `input_name`.
pub fn graph_input(input_name: impl Into<String>) -> ArgumentValue {
    ArgumentValue::GraphInput(GraphInputReference {
        input_name: input_name.into(),
    })
}

/// Build a literal argument.
pub fn literal(value: impl Into<String>) -> ArgumentValue {
    ArgumentValue::Literal(value.into())
}

/// Classify a raw document value into an [`ArgumentValue`].
///
/// Strings are literals. Numbers and booleans are accepted as their literal
/// text. Objects must carry exactly one of `taskOutput` or `graphInput`; an
/// object with neither, both, or extra keys is a `MalformedArgument`.
pub fn classify(value: &Value) -> Result<ArgumentValue> {
    match value {
        Value::String(s) => Ok(ArgumentValue::Literal(s.clone())),
        Value::Number(n) => Ok(ArgumentValue::Literal(n.to_string())),
        Value::Bool(b) => Ok(ArgumentValue::Literal(b.to_string())),
        Value::Null => Err(EditorError::MalformedArgument(
            "argument value is null".into(),
        )),
        Value::Array(_) => Err(EditorError::MalformedArgument(
            "argument value is a list".into(),
        )),
        Value::Object(map) => {
            let task_output = map.get(TASK_OUTPUT_KEY);
            let graph_input = map.get(GRAPH_INPUT_KEY);
            if map.len() != 1 {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                return Err(EditorError::MalformedArgument(format!(
                    "expected exactly one of '{TASK_OUTPUT_KEY}' or '{GRAPH_INPUT_KEY}', found keys [{}]",
                    keys.join(", ")
                )));
            }
            match (task_output, graph_input) {
                (Some(inner), None) => serde_json::from_value(inner.clone())
                    .map(ArgumentValue::TaskOutput)
                    .map_err(|e| {
                        EditorError::MalformedArgument(format!("invalid {TASK_OUTPUT_KEY}: {e}"))
                    }),
                (None, Some(inner)) => serde_json::from_value(inner.clone())
                    .map(ArgumentValue::GraphInput)
                    .map_err(|e| {
                        EditorError::MalformedArgument(format!("invalid {GRAPH_INPUT_KEY}: {e}"))
                    }),
                _ => Err(EditorError::MalformedArgument(format!(
                    "unrecognized argument object key '{}'",
                    map.keys().next().map(String::as_str).unwrap_or_default()
                ))),
            }
        }
    }
}

impl ArgumentValue {
    pub fn kind(&self) -> ArgumentKind {
        match self {
            ArgumentValue::Literal(_) => ArgumentKind::Literal,
            ArgumentValue::TaskOutput(_) => ArgumentKind::TaskOutput,
            ArgumentValue::GraphInput(_) => ArgumentKind::GraphInput,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            ArgumentValue::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_task_output(&self) -> Option<&TaskOutputReference> {
        match self {
            ArgumentValue::TaskOutput(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_graph_input(&self) -> Option<&GraphInputReference> {
        match self {
            ArgumentValue::GraphInput(r) => Some(r),
            _ => None,
        }
    }

    /// True if this argument reads any output of `task_id`.
    pub fn references_task(&self, task_id: &str) -> bool {
        self.as_task_output().is_some_and(|r| r.task_id == task_id)
    }

    /// True if this argument forwards the graph input `input_name`.
    pub fn references_input(&self, input_name: &str) -> bool {
        self.as_graph_input().is_some_and(|r| r.input_name == input_name)
    }

    /// Wire form of the argument.
    pub fn to_json(&self) -> Value {
        match self {
            ArgumentValue::Literal(s) => Value::String(s.clone()),
            ArgumentValue::TaskOutput(r) => {
                serde_json::json!({ "taskOutput": { "taskId": r.task_id, "outputName": r.output_name } })
            }
            ArgumentValue::GraphInput(r) => {
                serde_json::json!({ "graphInput": { "inputName": r.input_name } })
            }
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Literal(s) => write!(f, "{s:?}"),
            ArgumentValue::TaskOutput(r) => write!(f, "{}.{}", r.task_id, r.output_name),
            ArgumentValue::GraphInput(r) => write!(f, "inputs.{}", r.input_name),
        }
    }
}

impl Serialize for ArgumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ArgumentValue::Literal(s) => serializer.serialize_str(s),
            ArgumentValue::TaskOutput(r) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(TASK_OUTPUT_KEY, r)?;
                map.end()
            }
            ArgumentValue::GraphInput(r) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(GRAPH_INPUT_KEY, r)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ArgumentValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        classify(&raw).map_err(D::Error::custom)
    }
}
