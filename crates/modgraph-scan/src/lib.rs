//! Python import-graph scanning.
//!
//! Walks a project with the `ignore` crate, extracts imports and code
//! metrics with tree-sitter, resolves imports to project modules, and ranks
//! modules with PageRank over a petgraph import graph.

pub mod graph;
pub mod metrics;
pub mod module;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod walker;

use std::path::Path;

use modgraph_core::{ModgraphConfig, ModgraphError};
use tracing::{debug, info};

use crate::graph::{ImportGraph, RankStats};
use crate::module::{ModuleInfo, ParsedModule};
use crate::walker::SourceFile;

/// Scan the project at `root`, build its import graph and rank it.
///
/// # Errors
///
/// Returns [`ModgraphError`] if the root is missing, an exclude pattern is
/// invalid, or the Python grammar cannot be loaded. Individual files that
/// cannot be read are skipped.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use modgraph_core::ModgraphConfig;
/// use modgraph_scan::scan_project;
///
/// let (graph, stats) = scan_project(Path::new("."), &ModgraphConfig::default()).unwrap();
/// println!("{} modules, converged: {}", graph.len(), stats.converged);
/// ```
pub fn scan_project(
    root: &Path,
    config: &ModgraphConfig,
) -> Result<(ImportGraph, RankStats), ModgraphError> {
    let files = walker::walk_project(root, &config.scan)?;
    info!(files = files.len(), "discovered python files");

    let modules = files
        .iter()
        .map(parse_module)
        .collect::<Result<Vec<_>, _>>()?;

    let mut graph = ImportGraph::build(modules);
    let stats = graph.compute_importance(&config.ranking);
    info!(
        modules = graph.len(),
        dependencies = graph.edge_count(),
        cycles = graph.cycles().len(),
        "import graph ready"
    );

    Ok((graph, stats))
}

/// Parse one source file into its imports and metrics.
///
/// # Errors
///
/// Returns [`ModgraphError::Parse`] if the Python grammar cannot be loaded.
pub fn parse_module(file: &SourceFile) -> Result<ParsedModule, ModgraphError> {
    let tree = parser::parse_tree(&file.content)?;
    let imports = tree
        .as_ref()
        .map(|t| parser::extract_imports(t, &file.content))
        .unwrap_or_default();
    let parse_errors = tree.as_ref().map_or(true, |t| t.root_node().has_error());
    if parse_errors {
        debug!(path = %file.path.display(), "syntax errors, imports may be partial");
    }
    let metrics = metrics::compute_metrics(tree.as_ref(), &file.content, file.size);

    Ok(ParsedModule {
        info: ModuleInfo::from_relative_path(&file.path, file.size),
        imports,
        metrics,
        parse_errors,
    })
}
