//! Report assembly: runs the scan and history analysis, builds the graph
//! model and writes `graph_data.json` plus the interactive HTML page.

pub mod graph_data;
pub mod html;

use std::fs;
use std::path::{Path, PathBuf};

use modgraph_core::{ModgraphConfig, ModgraphError, OutputConfig};
use modgraph_gitpulse::hotspots::{analyze_history, HistoryAnalysis, HistoryOptions};
use modgraph_gitpulse::mining::{mine_history, MiningOptions};
use modgraph_scan::graph::{ImportGraph, RankStats};
use modgraph_scan::scan_project;
use tracing::{info, warn};

use crate::graph_data::GraphData;

/// Result of a full project analysis.
#[derive(Debug)]
pub struct Analysis {
    pub graph: ImportGraph,
    pub rank_stats: RankStats,
    pub history: HistoryAnalysis,
    pub data: GraphData,
}

/// Scan `root`, analyze its git history and assemble the graph model.
///
/// A missing repository or any git failure leaves history unavailable
/// instead of failing the analysis.
///
/// # Errors
///
/// Returns [`ModgraphError`] if the scan itself fails.
pub fn analyze_project(root: &Path, config: &ModgraphConfig) -> Result<Analysis, ModgraphError> {
    let (graph, rank_stats) = scan_project(root, config)?;
    let history = project_history(root, config);
    let data = GraphData::build(&graph, rank_stats, &history, &config.metrics);

    Ok(Analysis {
        graph,
        rank_stats,
        history,
        data,
    })
}

/// Git history for `root`, or an unavailable marker when history is disabled
/// or cannot be read.
pub fn project_history(root: &Path, config: &ModgraphConfig) -> HistoryAnalysis {
    let days = config.history.since_days;
    if !config.history.enabled {
        return HistoryAnalysis::unavailable(days);
    }

    match mine_history(root, &MiningOptions::from(&config.history)) {
        Ok(commits) => {
            let analysis = analyze_history(&commits, &HistoryOptions::from(&config.history));
            info!(
                commits = analysis.total_commits,
                files = analysis.files.len(),
                hotspots = analysis.hotspots.len(),
                "git history analyzed"
            );
            analysis
        }
        Err(e) => {
            warn!(error = %e, "git history unavailable");
            HistoryAnalysis::unavailable(days)
        }
    }
}

/// Paths of the files produced by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub data_file: PathBuf,
    pub html_file: PathBuf,
}

/// Write the graph JSON and HTML page into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`ModgraphError`] on serialization or filesystem failures.
pub fn write_outputs(
    data: &GraphData,
    dir: &Path,
    config: &OutputConfig,
) -> Result<WrittenFiles, ModgraphError> {
    fs::create_dir_all(dir)?;

    let data_file = dir.join(&config.data_file);
    fs::write(&data_file, serde_json::to_string_pretty(data)?)?;

    let html_file = dir.join(&config.html_file);
    fs::write(&html_file, html::render_html(data, config)?)?;

    info!(
        data = %data_file.display(),
        html = %html_file.display(),
        "reports written"
    );
    Ok(WrittenFiles {
        data_file,
        html_file,
    })
}
