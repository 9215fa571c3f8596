//! Pipeline specification documents for the Pipewright graph editor.
//!
//! Parses component and pipeline documents (`inputs`, `outputs`, and a
//! `container` or `graph` implementation) into a typed model:
//! [`ComponentSpec`], [`GraphSpec`], [`TaskSpec`], [`ArgumentValue`].
//! Editor metadata lives in annotation bags and is accessed through the
//! [`annotations`] codec.
//!
//! # Example
//! ```
//! let doc = r#"{
//!     "name": "Pipeline",
//!     "implementation": {"graph": {"tasks": {
//!         "T1": {"componentRef": {"name": "producer"}},
//!         "T2": {"componentRef": {"name": "consumer"},
//!                "arguments": {"x": {"taskOutput": {"taskId": "T1", "outputName": "out"}}}}
//!     }}}
//! }"#;
//! let spec = pipewright_spec::parse(doc).unwrap();
//! assert_eq!(spec.graph().unwrap().tasks.len(), 2);
//! ```

pub mod annotations;
pub mod argument;
mod codec;
pub mod model;

pub use annotations::{
    decode_position, encode_position, with_position, Annotations, Position, POSITION_ANNOTATION,
    STATUS_ANNOTATION,
};
pub use argument::{
    classify, graph_input, literal, task_output, ArgumentKind, ArgumentValue,
    GraphInputReference, TaskOutputArgument, TaskOutputReference,
};
pub use codec::{from_value, parse, to_json, to_value};
pub use model::*;
