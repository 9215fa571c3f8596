//! Synchronization between pipeline documents and their node-graph view.
//!
//! The document ([`pipewright_spec::ComponentSpec`]) is the single source of
//! truth. [`project`] derives nodes and edges from it; the [`edits`]
//! operations turn user gestures back into document changes. An
//! [`EditingSession`] owns the current document and its undo history, and a
//! [`ViewAdapter`] maps canvas events onto the session.

pub mod adapter;
pub mod dag;
pub mod edits;
pub mod hydration;
pub mod ids;
pub mod projector;
pub mod session;
pub mod status;
pub mod store;
pub mod validation;

pub use adapter::{rename_edit, ViewAdapter, ViewChange};
pub use dag::TaskDag;
pub use edits::{
    connect, disconnect, drop_new_node, duplicate_nodes, remove_component_input,
    remove_component_output, remove_task, rename_port, rename_task, replace_task_component,
    set_input_default, set_input_optional, set_task_annotation, set_task_argument,
    update_position, Applied, Connection, DropKind, Dropped, Duplicated, Edit,
};
pub use hydration::{
    hydrate, ComponentResolver, DirectoryResolver, HydrationReport, InlineTextResolver,
    LibraryResolver, ResolverChain,
};
pub use ids::{make_unique_name, NodeRef};
pub use projector::{project, EdgeKind, GraphView, NodeData, NodeKind, ViewEdge, ViewNode};
pub use session::{EditOutcome, EditingSession};
pub use status::{apply_run_statuses, clear_run_statuses, is_locked, locked_tasks};
pub use store::{DocumentStore, DocumentSummary, FsDocumentStore, MemoryDocumentStore, StoredDocument};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
