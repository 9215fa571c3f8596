use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::annotations::Annotations;
use crate::argument::{ArgumentValue, TaskOutputArgument};

/// A pipeline is a component whose implementation is a graph of tasks.
pub type PipelineSpec = ComponentSpec;

/// A reusable component: typed inputs and outputs plus an implementation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputSpec>,
    pub implementation: Implementation,
    #[serde(default, skip_serializing_if = "MetadataSpec::is_empty")]
    pub metadata: MetadataSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataSpec {
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_annotations"
    )]
    pub annotations: Annotations,
}

impl MetadataSpec {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Implementation {
    Container(ContainerSpec),
    Graph(GraphSpec),
}

impl Default for Implementation {
    fn default() -> Self {
        Implementation::Graph(GraphSpec::default())
    }
}

/// A container implementation. Only the image is interpreted; command,
/// args and env are carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSpec {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub output_values: BTreeMap<String, TaskOutputArgument>,
}

/// One node of the DAG: a component reference plus its wiring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub component_ref: ComponentReference,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, ArgumentValue>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_annotations"
    )]
    pub annotations: Annotations,
    /// Keys such as `isEnabled` or `executionOptions` that the editor does
    /// not interpret but must round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Points at a component by name, digest, URL or inline text. `spec` is
/// only present once the reference has been hydrated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<Arc<ComponentSpec>>,
}

/// A port type: either a simple tag such as `"String"` or a structured
/// descriptor. The editor never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Name(String),
    Structured(serde_json::Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_literal"
    )]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_annotations"
    )]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_spec: Option<TypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_annotations"
    )]
    pub annotations: Annotations,
}

// --- Lenient scalar helpers ---

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Annotation values written by other tools are not always strings; keep
/// them as their text so the bag stays a flat string map.
fn deserialize_annotations<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Annotations, D::Error> {
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

fn deserialize_literal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(raw))
}

// --- Accessors ---

impl ComponentSpec {
    /// An empty graph pipeline with the given name.
    pub fn new_graph(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn graph(&self) -> Option<&GraphSpec> {
        match &self.implementation {
            Implementation::Graph(g) => Some(g),
            Implementation::Container(_) => None,
        }
    }

    pub fn graph_mut(&mut self) -> Option<&mut GraphSpec> {
        match &mut self.implementation {
            Implementation::Graph(g) => Some(g),
            Implementation::Container(_) => None,
        }
    }

    pub fn is_graph(&self) -> bool {
        self.graph().is_some()
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut InputSpec> {
        self.inputs.iter_mut().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut OutputSpec> {
        self.outputs.iter_mut().find(|o| o.name == name)
    }

    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.name.as_str())
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|o| o.name.as_str())
    }

    pub fn annotations(&self) -> &Annotations {
        &self.metadata.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.metadata.annotations
    }
}

impl GraphSpec {
    pub fn task(&self, task_id: &str) -> Option<&TaskSpec> {
        self.tasks.get(task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut TaskSpec> {
        self.tasks.get_mut(task_id)
    }

    /// Iterate every `(task_id, input_name, argument)` triple.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &str, &ArgumentValue)> {
        self.tasks.iter().flat_map(|(task_id, task)| {
            task.arguments
                .iter()
                .map(move |(input, arg)| (task_id.as_str(), input.as_str(), arg))
        })
    }

    /// Ids of the tasks whose outputs `task_id` consumes.
    pub fn upstream_tasks(&self, task_id: &str) -> Vec<&str> {
        let mut upstream: Vec<&str> = self
            .task(task_id)
            .map(|t| {
                t.arguments
                    .values()
                    .filter_map(|a| a.as_task_output())
                    .map(|r| r.task_id.as_str())
                    .collect()
            })
            .unwrap_or_default();
        upstream.sort_unstable();
        upstream.dedup();
        upstream
    }
}

impl TaskSpec {
    pub fn new(component_ref: ComponentReference) -> Self {
        Self {
            component_ref,
            ..Self::default()
        }
    }

    /// The hydrated component spec, if the reference has been resolved.
    pub fn component_spec(&self) -> Option<&ComponentSpec> {
        self.component_ref.spec.as_deref()
    }

    pub fn argument(&self, input_name: &str) -> Option<&ArgumentValue> {
        self.arguments.get(input_name)
    }
}

impl ComponentReference {
    /// A reference that already carries its resolved spec.
    pub fn from_spec(spec: ComponentSpec) -> Self {
        Self {
            name: spec.name.clone(),
            spec: Some(Arc::new(spec)),
            ..Self::default()
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.spec.is_some()
    }

    /// Best human-readable name: declared component name, then the
    /// reference's own name, URL or digest.
    pub fn display_name(&self) -> Option<&str> {
        self.spec
            .as_deref()
            .and_then(|s| s.name.as_deref())
            .or(self.name.as_deref())
            .or(self.url.as_deref())
            .or(self.digest.as_deref())
    }
}

impl InputSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An input must be wired when it is neither optional nor defaulted.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

impl OutputSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
