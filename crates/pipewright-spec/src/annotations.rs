//! Typed access to editor metadata stored in annotation bags.
//!
//! Annotations are a flat `string -> string` map so the document stays
//! wire-compatible with other tools. Editor data such as node positions is
//! JSON-encoded inside a single key; nothing outside this module parses it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A task's or port's free-form metadata.
pub type Annotations = BTreeMap<String, String>;

/// Key holding the JSON-encoded node position.
pub const POSITION_ANNOTATION: &str = "editor.position";

/// Key the execution backend's run status is overlaid onto.
pub const STATUS_ANNOTATION: &str = "status";

/// A point on the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// This position moved by `dx` and `dy`.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Encode a position as the JSON string stored under [`POSITION_ANNOTATION`].
/// Whole coordinates are written without a fractional part (`{"x":1,"y":2}`).
pub fn encode_position(position: Position) -> String {
    serde_json::json!({ "x": coordinate(position.x), "y": coordinate(position.y) }).to_string()
}

// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn coordinate(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serde_json::Value::from(value as i64)
    } else {
        serde_json::Value::from(value)
    }
}

/// Parse a raw position annotation. Returns `None` if it is not a JSON
/// object with numeric `x` and `y`.
pub fn parse_position(raw: &str) -> Option<Position> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some(Position { x, y })
}

/// Read the position from an annotation bag, falling back to the origin when
/// it is missing or malformed.
pub fn decode_position(annotations: &Annotations) -> Position {
    match annotations.get(POSITION_ANNOTATION) {
        None => Position::ORIGIN,
        Some(raw) => parse_position(raw).unwrap_or_else(|| {
            tracing::debug!(raw = %raw, "Malformed position annotation, using origin");
            Position::ORIGIN
        }),
    }
}

/// Write `position` into `annotations`, leaving every other key intact.
pub fn set_position(annotations: &mut Annotations, position: Position) {
    annotations.insert(POSITION_ANNOTATION.to_string(), encode_position(position));
}

/// A copy of `annotations` with `position` merged in.
pub fn with_position(annotations: &Annotations, position: Position) -> Annotations {
    let mut merged = annotations.clone();
    set_position(&mut merged, position);
    merged
}

/// The run status overlaid by an execution backend, if any.
pub fn run_status(annotations: &Annotations) -> Option<&str> {
    annotations
        .get(STATUS_ANNOTATION)
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        for position in [
            Position::new(0.0, 0.0),
            Position::new(120.5, -42.25),
            Position::new(1e6, 0.1),
        ] {
            let mut annotations = Annotations::new();
            annotations.insert(POSITION_ANNOTATION.into(), encode_position(position));
            assert_eq!(decode_position(&annotations), position);
        }
    }

    #[test]
    fn encoded_form_is_json_object() {
        assert_eq!(encode_position(Position::new(1.0, 2.0)), r#"{"x":1,"y":2}"#);
        assert_eq!(encode_position(Position::new(-40.0, 0.0)), r#"{"x":-40,"y":0}"#);
    }

    #[test]
    fn fractional_coordinates_keep_their_fraction() {
        assert_eq!(encode_position(Position::new(120.5, -0.25)), r#"{"x":120.5,"y":-0.25}"#);
    }

    #[test]
    fn reencoding_existing_annotation_is_stable() {
        let raw = r#"{"x":300,"y":50}"#;
        let position = parse_position(raw).unwrap();
        assert_eq!(encode_position(position), raw);
    }

    #[test]
    fn missing_position_defaults_to_origin() {
        assert_eq!(decode_position(&Annotations::new()), Position::ORIGIN);
    }

    #[test]
    fn malformed_position_defaults_to_origin() {
        for raw in ["not json", "[1, 2]", r#"{"x": 1}"#, r#"{"x": "1", "y": "2"}"#] {
            let mut annotations = Annotations::new();
            annotations.insert(POSITION_ANNOTATION.into(), raw.into());
            assert_eq!(decode_position(&annotations), Position::ORIGIN, "raw: {raw}");
        }
    }

    #[test]
    fn integer_coordinates_are_accepted() {
        assert_eq!(
            parse_position(r#"{"x": 10, "y": 20}"#),
            Some(Position::new(10.0, 20.0))
        );
    }

    #[test]
    fn set_position_preserves_other_keys() {
        let mut annotations = Annotations::new();
        annotations.insert(STATUS_ANNOTATION.into(), "SUCCEEDED".into());
        annotations.insert("cache.disabled".into(), "true".into());

        let merged = with_position(&annotations, Position::new(5.0, 6.0));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(STATUS_ANNOTATION).map(String::as_str), Some("SUCCEEDED"));
        assert_eq!(merged.get("cache.disabled").map(String::as_str), Some("true"));
        assert_eq!(decode_position(&merged), Position::new(5.0, 6.0));
        // Original bag is untouched.
        assert!(!annotations.contains_key(POSITION_ANNOTATION));
    }

    #[test]
    fn run_status_ignores_empty_values() {
        let mut annotations = Annotations::new();
        assert_eq!(run_status(&annotations), None);
        annotations.insert(STATUS_ANNOTATION.into(), String::new());
        assert_eq!(run_status(&annotations), None);
        annotations.insert(STATUS_ANNOTATION.into(), "RUNNING".into());
        assert_eq!(run_status(&annotations), Some("RUNNING"));
    }
}
