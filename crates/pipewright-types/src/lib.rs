//! Shared types, errors and configuration for the Pipewright graph editor.
//!
//! This crate provides the foundational types used across all other Pipewright crates:
//! - `EditorError`: unified error taxonomy for document edits
//! - `ErrorCategory`: coarse classification the view layer uses to word messages
//! - `PortKind`: which port list (graph inputs or graph outputs) an operation targets
//! - `EditorConfig`: explicitly injected editor settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Unified error type for all Pipewright subsystems.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    // === Structural violations ===
    #[error("Invalid connection from '{from}' to '{to}': {reason}")]
    InvalidConnection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Task '{0}' does not exist")]
    TaskNotFound(String),

    #[error("Graph input '{0}' does not exist")]
    InputNotFound(String),

    #[error("Graph output '{0}' does not exist")]
    OutputNotFound(String),

    #[error("Unknown node id '{0}'")]
    UnknownNode(String),

    #[error("Node '{node}' has no handle '{handle}'")]
    UnknownHandle { node: String, handle: String },

    #[error("{kind} name '{name}' is already in use")]
    DuplicateName { kind: PortKind, name: String },

    #[error("Task id '{0}' is already in use")]
    DuplicateTaskId(String),

    #[error("Invalid name '{0}': names must not be empty")]
    InvalidName(String),

    #[error("Connecting '{from}' to '{to}' would create a cycle")]
    CycleDetected { from: String, to: String },

    #[error("Pipeline does not have a graph implementation")]
    NotAGraph,

    #[error("Task '{0}' has a run status and is locked for editing")]
    TaskLocked(String),

    // === Soft conditions ===
    #[error("Component spec for '{reference}' has not been resolved")]
    MissingSpec { reference: String },

    // === Document errors ===
    #[error("Malformed argument: {0}")]
    MalformedArgument(String),

    #[error("Pipeline validation failed: {0}")]
    ValidationError(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse error classes surfaced to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    StructuralViolation,
    MissingSpec,
    MalformedDocument,
    Io,
}

impl EditorError {
    /// Classify the error for the view layer.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EditorError::MissingSpec { .. } => ErrorCategory::MissingSpec,
            EditorError::MalformedArgument(_)
            | EditorError::ValidationError(_)
            | EditorError::Json(_) => ErrorCategory::MalformedDocument,
            EditorError::Io(_) | EditorError::Other(_) => ErrorCategory::Io,
            _ => ErrorCategory::StructuralViolation,
        }
    }

    /// Returns `true` if the edit was rejected because it would break a document invariant.
    pub fn is_structural_violation(&self) -> bool {
        self.category() == ErrorCategory::StructuralViolation
    }

    /// Returns `true` for conditions the caller may defer instead of reporting,
    /// such as an edit that needs a component which has not been hydrated yet.
    pub fn is_soft(&self) -> bool {
        matches!(self, EditorError::MissingSpec { .. })
    }

    /// The entity id the error is about, when there is one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            EditorError::TaskNotFound(id)
            | EditorError::InputNotFound(id)
            | EditorError::OutputNotFound(id)
            | EditorError::UnknownNode(id)
            | EditorError::DuplicateTaskId(id)
            | EditorError::InvalidName(id)
            | EditorError::TaskLocked(id) => Some(id),
            EditorError::UnknownHandle { node, .. } => Some(node),
            EditorError::DuplicateName { name, .. } => Some(name),
            EditorError::InvalidConnection { to, .. } | EditorError::CycleDetected { to, .. } => {
                Some(to)
            }
            EditorError::MissingSpec { reference } => Some(reference),
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, EditorError>`.
pub type Result<T> = std::result::Result<T, EditorError>;

// ---------------------------------------------------------------------------
// PortKind: graph-level port lists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Input,
    Output,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => f.write_str("Input"),
            PortKind::Output => f.write_str("Output"),
        }
    }
}

// ---------------------------------------------------------------------------
// EditorConfig: settings injected into the session at startup
// ---------------------------------------------------------------------------

/// Editor settings. Every field has a default so partial config files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Local directory of component documents used for hydration.
    pub component_library_dir: Option<PathBuf>,
    /// Directory backing the filesystem document store.
    pub documents_dir: Option<PathBuf>,
    /// Pixel offset applied to both axes of duplicated nodes.
    pub duplicate_offset: f64,
    /// Maximum number of undo snapshots the session keeps.
    pub history_limit: usize,
    /// Refuse edits that would rewrite the arguments of a task carrying a
    /// run status.
    pub lock_tasks_with_status: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            component_library_dir: None,
            documents_dir: None,
            duplicate_offset: 10.0,
            history_limit: 100,
            lock_tasks_with_status: true,
        }
    }
}

impl EditorConfig {
    /// Read a config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        tracing::debug!(path = %path.display(), "Editor config loaded");
        Ok(config)
    }

    /// Serialize this config to JSON and write it to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
