//! Component hydration.
//!
//! A task's component reference starts out as a name, digest, URL or
//! inline text. Hydration resolves each reference to its full component
//! spec so the projector can show declared ports and edits can check
//! handle names. Resolution failures are soft: the task stays unhydrated
//! and the failure is reported.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pipewright_spec::{ComponentReference, ComponentSpec};
use pipewright_types::{EditorError, Result};

/// Resolves a component reference to its spec.
pub trait ComponentResolver: Send + Sync {
    fn resolve(&self, reference: &ComponentReference) -> Result<ComponentSpec>;
}

fn missing(reference: &ComponentReference) -> EditorError {
    EditorError::MissingSpec {
        reference: reference.display_name().unwrap_or("<anonymous>").to_string(),
    }
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

/// Parses the reference's inline `text` as a component document.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTextResolver;

impl ComponentResolver for InlineTextResolver {
    fn resolve(&self, reference: &ComponentReference) -> Result<ComponentSpec> {
        let text = reference.text.as_deref().ok_or_else(|| missing(reference))?;
        pipewright_spec::parse(text)
    }
}

/// In-memory library keyed by digest and by name. Digest matches win.
#[derive(Debug, Clone, Default)]
pub struct LibraryResolver {
    by_digest: HashMap<String, Arc<ComponentSpec>>,
    by_name: HashMap<String, Arc<ComponentSpec>>,
}

impl LibraryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its declared name and, if given, a digest.
    pub fn insert(&mut self, spec: ComponentSpec, digest: Option<&str>) {
        let spec = Arc::new(spec);
        if let Some(digest) = digest {
            self.by_digest.insert(digest.to_string(), Arc::clone(&spec));
        }
        if let Some(name) = spec.name.clone() {
            self.by_name.insert(name, spec);
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_digest.is_empty()
    }
}

impl ComponentResolver for LibraryResolver {
    fn resolve(&self, reference: &ComponentReference) -> Result<ComponentSpec> {
        reference
            .digest
            .as_ref()
            .and_then(|d| self.by_digest.get(d))
            .or_else(|| reference.name.as_ref().and_then(|n| self.by_name.get(n)))
            .map(|spec| spec.as_ref().clone())
            .ok_or_else(|| missing(reference))
    }
}

/// Reads component documents from a local directory.
///
/// A relative `url` is looked up under the root as-is; otherwise the
/// reference's name is tried as `<root>/<name>.json`. Urls or names that
/// would leave the root are not resolved.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidate(&self, reference: &ComponentReference) -> Option<PathBuf> {
        if let Some(url) = reference.url.as_deref() {
            let relative = Path::new(url);
            if relative.is_relative() && !url.contains("://") {
                let escapes = relative.components().any(|c| {
                    matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
                });
                if escapes {
                    tracing::debug!(url, "Refusing component url outside the library root");
                    return None;
                }
                return Some(self.root.join(relative));
            }
        }
        let name = reference.name.as_deref()?;
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return None;
        }
        Some(self.root.join(format!("{name}.json")))
    }
}

impl ComponentResolver for DirectoryResolver {
    fn resolve(&self, reference: &ComponentReference) -> Result<ComponentSpec> {
        let path = self.candidate(reference).ok_or_else(|| missing(reference))?;
        if !path.is_file() {
            return Err(missing(reference));
        }
        let text = std::fs::read_to_string(&path)?;
        let spec = pipewright_spec::parse(&text)?;
        tracing::debug!(path = %path.display(), "Component loaded from library directory");
        Ok(spec)
    }
}

/// Tries each resolver in order; the first success wins.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ComponentResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl ComponentResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl ComponentResolver for ResolverChain {
    fn resolve(&self, reference: &ComponentReference) -> Result<ComponentSpec> {
        let mut last = None;
        for resolver in &self.resolvers {
            match resolver.resolve(reference) {
                Ok(spec) => return Ok(spec),
                Err(err) => last = Some(err),
            }
        }
        Err(last.unwrap_or_else(|| missing(reference)))
    }
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HydrationReport {
    /// Task ids whose component was resolved by this call.
    pub hydrated: Vec<String>,
    /// Task id → reason the component could not be resolved.
    pub failed: BTreeMap<String, String>,
}

impl HydrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resolve every unhydrated task reference. Tasks sharing a reference are
/// resolved once.
pub fn hydrate(spec: &ComponentSpec, resolver: &dyn ComponentResolver) -> (ComponentSpec, HydrationReport) {
    let mut next = spec.clone();
    let mut report = HydrationReport::default();
    let Some(graph) = next.graph_mut() else {
        return (next, report);
    };

    let mut cache: HashMap<String, std::result::Result<Arc<ComponentSpec>, String>> = HashMap::new();
    for (task_id, task) in graph.tasks.iter_mut() {
        if task.component_ref.is_hydrated() {
            continue;
        }
        let key = cache_key(&task.component_ref);
        let resolved = cache
            .entry(key)
            .or_insert_with(|| {
                resolver
                    .resolve(&task.component_ref)
                    .map(Arc::new)
                    .map_err(|err| err.to_string())
            })
            .clone();
        match resolved {
            Ok(component) => {
                task.component_ref.spec = Some(component);
                report.hydrated.push(task_id.clone());
            }
            Err(reason) => {
                tracing::warn!(task_id = %task_id, %reason, "Component could not be resolved");
                report.failed.insert(task_id.clone(), reason);
            }
        }
    }

    tracing::debug!(
        hydrated = report.hydrated.len(),
        failed = report.failed.len(),
        "Hydration finished"
    );
    (next, report)
}

fn cache_key(reference: &ComponentReference) -> String {
    serde_json::json!([
        reference.digest,
        reference.name,
        reference.url,
        reference.tag,
        reference.text,
    ])
    .to_string()
}
