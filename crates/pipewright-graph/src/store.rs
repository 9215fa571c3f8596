//! Saved pipeline documents.
//!
//! A [`DocumentStore`] keeps named pipeline documents together with the
//! time they were saved. [`FsDocumentStore`] writes one pretty-printed JSON
//! file per document into a directory; [`MemoryDocumentStore`] backs tests
//! and short-lived sessions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pipewright_spec::ComponentSpec;
use pipewright_types::{EditorError, Result};
use serde::{Deserialize, Serialize};

/// A pipeline document plus its save metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub spec: ComponentSpec,
}

impl StoredDocument {
    pub fn new(name: impl Into<String>, spec: ComponentSpec) -> Self {
        Self {
            name: name.into(),
            saved_at: Utc::now(),
            spec,
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            name: self.name.clone(),
            saved_at: self.saved_at,
            task_count: self.spec.graph().map_or(0, |g| g.tasks.len()),
        }
    }
}

/// Listing entry for a saved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub task_count: usize,
}

pub trait DocumentStore {
    /// Save `spec` under `name`, replacing any previous document of that name.
    fn save(&mut self, name: &str, spec: &ComponentSpec) -> Result<StoredDocument>;
    /// Returns `Ok(None)` when no document has that name.
    fn load(&self, name: &str) -> Result<Option<StoredDocument>>;
    /// Summaries of all saved documents, sorted by name.
    fn list(&self) -> Result<Vec<DocumentSummary>>;
    /// Returns `true` if a document was removed.
    fn delete(&mut self, name: &str) -> Result<bool>;
}

fn check_document_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EditorError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a document name. Characters outside a conservative
    /// set are replaced so any name maps to a single file in the root.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let file = file.trim_start_matches('.');
        self.root.join(format!("{file}.json"))
    }

    fn read(path: &Path) -> Result<StoredDocument> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl DocumentStore for FsDocumentStore {
    fn save(&mut self, name: &str, spec: &ComponentSpec) -> Result<StoredDocument> {
        check_document_name(name)?;
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(name);
        if path.is_file() {
            let existing = Self::read(&path)?;
            if existing.name != name {
                return Err(EditorError::Other(format!(
                    "Document name '{name}' collides with saved document '{}'",
                    existing.name
                )));
            }
        }

        let document = StoredDocument::new(name, spec.clone());
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "Document saved");
        Ok(document)
    }

    fn load(&self, name: &str) -> Result<Option<StoredDocument>> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        let document = Self::read(&path)?;
        Ok((document.name == name).then_some(document))
    }

    fn list(&self) -> Result<Vec<DocumentSummary>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(document) => summaries.push(document.summary()),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable document")
                }
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        if self.load(name)?.is_none() {
            return Ok(false);
        }
        std::fs::remove_file(self.path_for(name))?;
        tracing::debug!(name, "Document deleted");
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: BTreeMap<String, StoredDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn save(&mut self, name: &str, spec: &ComponentSpec) -> Result<StoredDocument> {
        check_document_name(name)?;
        let document = StoredDocument::new(name, spec.clone());
        self.documents.insert(name.to_string(), document.clone());
        Ok(document)
    }

    fn load(&self, name: &str) -> Result<Option<StoredDocument>> {
        Ok(self.documents.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.documents.values().map(StoredDocument::summary).collect())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        Ok(self.documents.remove(name).is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
