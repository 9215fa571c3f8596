//! CLI binary for inspecting, validating and editing pipeline documents.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pipewright_graph::{
    apply_run_statuses, hydrate, locked_tasks, project, validate, DirectoryResolver,
    DocumentStore, Edit, EditingSession, FsDocumentStore, InlineTextResolver, ResolverChain,
    Severity,
};
use pipewright_spec::ComponentSpec;
use pipewright_types::EditorConfig;

#[derive(Parser)]
#[command(name = "pipewright", version, about = "Pipeline document editor and graph inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Editor config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a pipeline document
    Info {
        /// Path to the pipeline document
        document: PathBuf,
    },

    /// Validate a pipeline document
    Validate {
        /// Path to the pipeline document
        document: PathBuf,

        /// Resolve component references before validating
        #[arg(long)]
        hydrate: bool,
    },

    /// Print the node/edge view of a pipeline as JSON
    Project {
        /// Path to the pipeline document
        document: PathBuf,

        /// Resolve component references so task ports are listed
        #[arg(long)]
        hydrate: bool,
    },

    /// Apply a JSON array of edits to a pipeline document
    Edit {
        /// Path to the pipeline document
        document: PathBuf,

        /// Path to the edit script
        script: PathBuf,

        /// Output file path (default: overwrite the document)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Annotate tasks with run statuses from a JSON object of task id -> status
    Status {
        /// Path to the pipeline document
        document: PathBuf,

        /// Path to the status map
        statuses: PathBuf,

        /// Output file path (default: overwrite the document)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage saved documents
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Save a document under a name
    Save {
        name: String,
        document: PathBuf,
    },
    /// List saved documents
    List,
    /// Write a saved document to stdout or a file
    Show {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a saved document
    Delete { name: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { document } => cmd_info(&document)?,
        Commands::Validate { document, hydrate } => cmd_validate(&document, hydrate, &config)?,
        Commands::Project { document, hydrate } => cmd_project(&document, hydrate, &config)?,
        Commands::Edit {
            document,
            script,
            output,
        } => cmd_edit(&document, &script, output.as_deref(), config)?,
        Commands::Status {
            document,
            statuses,
            output,
        } => cmd_status(&document, &statuses, output.as_deref())?,
        Commands::Store { action } => cmd_store(action, &config)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn load_document(path: &Path) -> anyhow::Result<ComponentSpec> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spec = pipewright_spec::parse(&source)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(spec)
}

fn write_document(spec: &ComponentSpec, path: &Path) -> anyhow::Result<()> {
    let json = pipewright_spec::to_json(spec)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "Document written");
    Ok(())
}

/// Resolve inline component text, then the configured library directory.
fn hydrate_with_config(spec: &ComponentSpec, config: &EditorConfig) -> ComponentSpec {
    let mut chain = ResolverChain::new().with(InlineTextResolver);
    if let Some(dir) = &config.component_library_dir {
        chain = chain.with(DirectoryResolver::new(dir));
    }
    let (hydrated, report) = hydrate(spec, &chain);
    for (task_id, reason) in &report.failed {
        tracing::warn!(task = %task_id, reason = %reason, "Component not resolved");
    }
    hydrated
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let spec = load_document(path)?;

    println!("Pipeline: {}", spec.name.as_deref().unwrap_or("(unnamed)"));
    if let Some(description) = &spec.description {
        println!("Description: {}", description);
    }

    println!("Inputs:");
    for input in &spec.inputs {
        let required = if input.is_required() { "" } else { " (optional)" };
        println!("  {}{}", input.name, required);
    }
    println!("Outputs:");
    for output in &spec.outputs {
        println!("  {}", output.name);
    }

    let Some(graph) = spec.graph() else {
        println!("Implementation: container");
        return Ok(());
    };

    let view = project(&spec);
    println!("Nodes: {}", view.nodes.len());
    println!("Edges: {}", view.edges.len());

    println!("\nTasks:");
    for (task_id, task) in &graph.tasks {
        let component = task.component_ref.display_name().unwrap_or("(unknown)");
        println!(
            "  {} [{}] arguments={}",
            task_id,
            component,
            task.arguments.len()
        );
    }

    let locked = locked_tasks(&spec);
    if !locked.is_empty() {
        println!("\nLocked (has run status): {}", locked.join(", "));
    }

    Ok(())
}

fn cmd_validate(path: &Path, hydrate: bool, config: &EditorConfig) -> anyhow::Result<()> {
    let mut spec = load_document(path)?;
    if hydrate {
        spec = hydrate_with_config(&spec, config);
    }
    let diagnostics = validate(&spec);

    if diagnostics.is_empty() {
        println!("Pipeline is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        match &diag.node_id {
            Some(node) => println!("[{}] {} ({}): {}", severity, diag.rule, node, diag.message),
            None => println!("[{}] {}: {}", severity, diag.rule, diag.message),
        }
        if let Some(fix) = &diag.fix {
            println!("        fix: {}", fix);
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_project(path: &Path, hydrate: bool, config: &EditorConfig) -> anyhow::Result<()> {
    let mut spec = load_document(path)?;
    if hydrate {
        spec = hydrate_with_config(&spec, config);
    }
    let view = project(&spec);
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn cmd_edit(
    path: &Path,
    script: &Path,
    output: Option<&Path>,
    config: EditorConfig,
) -> anyhow::Result<()> {
    let spec = load_document(path)?;
    let source = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let edits: Vec<Edit> = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse edit script {}", script.display()))?;

    let mut session = EditingSession::new(spec, Arc::new(config));
    for (index, edit) in edits.iter().enumerate() {
        let outcome = session
            .apply(edit)
            .with_context(|| format!("edit #{} ({}) rejected", index + 1, edit.name()))?;
        tracing::info!(
            op = edit.name(),
            changed = outcome.changed,
            revision = outcome.revision,
            "Edit applied"
        );
        for node_id in &outcome.created {
            println!("Created {}", node_id);
        }
    }

    write_document(session.document(), output.unwrap_or(path))?;
    println!(
        "Applied {} edit(s), revision {}",
        edits.len(),
        session.revision()
    );
    Ok(())
}

fn cmd_status(path: &Path, statuses: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let spec = load_document(path)?;
    let source = std::fs::read_to_string(statuses)
        .with_context(|| format!("failed to read {}", statuses.display()))?;
    let statuses: BTreeMap<String, String> = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse status map {}", statuses.display()))?;

    let annotated = apply_run_statuses(&spec, &statuses);
    write_document(&annotated, output.unwrap_or(path))?;
    println!("Locked tasks: {}", locked_tasks(&annotated).len());
    Ok(())
}

fn cmd_store(action: StoreAction, config: &EditorConfig) -> anyhow::Result<()> {
    let root = config
        .documents_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".pipewright/documents"));
    let mut store = FsDocumentStore::new(root);

    match action {
        StoreAction::Save { name, document } => {
            let spec = load_document(&document)?;
            let saved = store.save(&name, &spec)?;
            println!(
                "Saved '{}' at {}",
                saved.name,
                saved.saved_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        StoreAction::List => {
            let summaries = store.list()?;
            if summaries.is_empty() {
                println!("No saved documents in {}", store.root().display());
            }
            for summary in summaries {
                println!(
                    "  {} tasks={} saved={}",
                    summary.name,
                    summary.task_count,
                    summary.saved_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        StoreAction::Show { name, output } => {
            let Some(saved) = store.load(&name)? else {
                anyhow::bail!("No saved document named '{}'", name);
            };
            match output {
                Some(path) => write_document(&saved.spec, &path)?,
                None => println!("{}", pipewright_spec::to_json(&saved.spec)?),
            }
        }
        StoreAction::Delete { name } => {
            if store.delete(&name)? {
                println!("Deleted '{}'", name);
            } else {
                anyhow::bail!("No saved document named '{}'", name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_edit_command() {
        let cli = Cli::try_parse_from([
            "pipewright",
            "--verbose",
            "edit",
            "doc.json",
            "edits.json",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Edit { output, .. } => assert_eq!(output, Some(PathBuf::from("out.json"))),
            _ => panic!("expected edit command"),
        }
    }

    #[test]
    fn cli_parses_store_subcommand() {
        let cli = Cli::try_parse_from(["pipewright", "store", "delete", "draft"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Store {
                action: StoreAction::Delete { .. }
            }
        ));
    }

    #[test]
    fn edit_script_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.json");
        let script = dir.path().join("edits.json");
        let out = dir.path().join("out.json");

        std::fs::write(
            &doc,
            r#"{"name": "p", "implementation": {"graph": {"tasks": {}}}}"#,
        )
        .unwrap();
        std::fs::write(
            &script,
            r#"[
                {"op": "drop_new_node", "node": {"kind": "input"}, "position": {"x": 0, "y": 0}},
                {"op": "rename_port", "port": "input", "old_name": "Input", "new_name": "data"}
            ]"#,
        )
        .unwrap();

        cmd_edit(&doc, &script, Some(&out), EditorConfig::default()).unwrap();
        let edited = load_document(&out).unwrap();
        assert_eq!(edited.input_names().collect::<Vec<_>>(), vec!["data"]);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        assert_eq!(load_config(None).unwrap(), EditorConfig::default());
    }
}
