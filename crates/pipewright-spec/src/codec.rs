use pipewright_types::Result;

use crate::model::ComponentSpec;

/// Parse a JSON pipeline or component document.
pub fn parse(source: &str) -> Result<ComponentSpec> {
    let spec: ComponentSpec = serde_json::from_str(source)?;
    tracing::debug!(
        name = spec.name.as_deref().unwrap_or_default(),
        inputs = spec.inputs.len(),
        outputs = spec.outputs.len(),
        "Parsed component document"
    );
    Ok(spec)
}

/// Parse a document that has already been decoded into a JSON value, e.g.
/// by an external YAML loader.
pub fn from_value(value: serde_json::Value) -> Result<ComponentSpec> {
    Ok(serde_json::from_value(value)?)
}

/// Emit a document as pretty-printed JSON.
pub fn to_json(spec: &ComponentSpec) -> Result<String> {
    Ok(serde_json::to_string_pretty(spec)?)
}

/// Emit a document as a JSON value.
pub fn to_value(spec: &ComponentSpec) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(spec)?)
}
