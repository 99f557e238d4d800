//! The persisted graph model consumed by the HTML page.

use std::collections::{BTreeMap, BTreeSet};

use modgraph_core::MetricsConfig;
use modgraph_gitpulse::hotspots::{ChangeClass, HistoryAnalysis};
use modgraph_scan::graph::{ImportGraph, ModuleNode, RankStats};
use modgraph_scan::metrics::performance_score;
use serde::Serialize;

/// Folder colors, assigned in sorted folder order and reused past 20.
pub const PALETTE: [&str; 20] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#FFB347", "#87CEEB",
    "#DEB887", "#F0E68C", "#FFA07A", "#20B2AA", "#87CEFA", "#778899", "#B0C4DE", "#FFFFE0",
    "#00CED1", "#FF7F50", "#6495ED", "#DC143C",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: String,
    pub name: String,
    pub stem: String,
    pub folder: String,
    pub color: String,
    pub file_path: String,
    pub index: usize,
    /// Internal (resolved) imports.
    pub imports_count: usize,
    /// Every import as written, resolved or not.
    pub all_imports: Vec<String>,
    pub importance: f64,
    pub is_test: bool,
    pub is_init: bool,
    pub size: u64,
    pub size_kb: f64,
    /// Modules importing this one.
    pub predecessors: usize,
    /// Project modules this one imports.
    pub successors: usize,
    pub in_cycle: bool,
    pub parse_errors: bool,

    pub change_count: u32,
    pub change_frequency_score: f64,
    pub change_classification: ChangeClass,
    pub total_churn: u64,
    pub churn_classification: ChangeClass,
    pub hotspot_score: f64,
    pub last_modified: Option<String>,

    pub performance_score: f64,
    pub is_performance_hotspot: bool,
    pub cyclomatic_complexity: u32,
    pub total_lines: u32,
    pub code_lines: u32,
    pub function_count: u32,
    pub class_count: u32,
    pub heavy_operations: u32,
    pub max_nesting_depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    /// Index of the importing node.
    pub source: usize,
    /// Index of the imported node.
    pub target: usize,
    pub source_id: String,
    pub target_id: String,
    pub source_folder: String,
    pub target_folder: String,
    pub is_cross_folder: bool,
    /// Either end is a test module.
    pub is_test_related: bool,
    pub in_cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderInfo {
    pub color: String,
    /// Display names of the folder's modules, sorted.
    pub modules: Vec<String>,
    pub test_modules: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_files: usize,
    pub total_dependencies: usize,
    pub cross_folder_dependencies: usize,
    pub test_files: usize,
    pub folder_count: usize,
    pub cycle_count: usize,
    pub modules_in_cycles: usize,
    pub files_with_parse_errors: usize,
    pub git_available: bool,
    pub analysis_days: u64,
    pub total_commits: usize,
    pub git_hotspots: usize,
    pub stable_files: usize,
    pub performance_hotspots: usize,
    pub rank_iterations: usize,
    pub rank_converged: bool,
}

/// Upper bounds for the page's filter sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_predecessors: usize,
    pub max_successors: usize,
    pub max_size_kb: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_predecessors: 20,
            max_successors: 20,
            max_size_kb: 100,
        }
    }
}

/// Everything the page needs, written to `graph_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
    pub folders: BTreeMap<String, FolderInfo>,
    /// Module ids per circular import, largest first.
    pub cycles: Vec<Vec<String>>,
    pub history: HistoryAnalysis,
    pub statistics: Statistics,
    pub limits: Limits,
}

impl GraphData {
    /// Assemble the graph model from a ranked graph and its history.
    pub fn build(
        graph: &ImportGraph,
        rank_stats: RankStats,
        history: &HistoryAnalysis,
        metrics_config: &MetricsConfig,
    ) -> Self {
        let colors = folder_colors(graph);
        let color_of = |folder: &str| colors.get(folder).cloned().unwrap_or_default();

        let nodes: Vec<NodeData> = graph
            .nodes()
            .enumerate()
            .map(|(index, node)| {
                node_data(graph, node, index, color_of(&node.info.folder), history, metrics_config)
            })
            .collect();

        let edges: Vec<EdgeData> = graph
            .edges()
            .into_iter()
            .map(|(source, target)| {
                let from = &nodes[source];
                let to = &nodes[target];
                EdgeData {
                    source,
                    target,
                    source_id: from.id.clone(),
                    target_id: to.id.clone(),
                    source_folder: from.folder.clone(),
                    target_folder: to.folder.clone(),
                    is_cross_folder: from.folder != to.folder,
                    is_test_related: from.is_test || to.is_test,
                    in_cycle: graph.edge_in_cycle(source, target),
                }
            })
            .collect();

        let mut folders: BTreeMap<String, FolderInfo> = BTreeMap::new();
        for node in &nodes {
            let entry = folders
                .entry(node.folder.clone())
                .or_insert_with(|| FolderInfo {
                    color: node.color.clone(),
                    modules: Vec::new(),
                    test_modules: Vec::new(),
                    count: 0,
                });
            entry.modules.push(node.name.clone());
            if node.is_test {
                entry.test_modules.push(node.name.clone());
            }
            entry.count += 1;
        }
        for info in folders.values_mut() {
            info.modules.sort();
            info.test_modules.sort();
        }

        let cycles: Vec<Vec<String>> = graph
            .cycles()
            .iter()
            .map(|members| members.iter().map(|n| n.info.id.clone()).collect())
            .collect();

        let statistics = Statistics {
            total_files: nodes.len(),
            total_dependencies: edges.len(),
            cross_folder_dependencies: edges.iter().filter(|e| e.is_cross_folder).count(),
            test_files: nodes.iter().filter(|n| n.is_test).count(),
            folder_count: folders.len(),
            cycle_count: cycles.len(),
            modules_in_cycles: nodes.iter().filter(|n| n.in_cycle).count(),
            files_with_parse_errors: nodes.iter().filter(|n| n.parse_errors).count(),
            git_available: history.available,
            analysis_days: history.analysis_days,
            total_commits: history.total_commits,
            git_hotspots: history.hotspots.len(),
            stable_files: history.stable_files.len(),
            performance_hotspots: nodes.iter().filter(|n| n.is_performance_hotspot).count(),
            rank_iterations: rank_stats.iterations,
            rank_converged: rank_stats.converged,
        };

        let limits = limits_for(&nodes);

        Self {
            nodes,
            edges,
            folders,
            cycles,
            history: history.clone(),
            statistics,
            limits,
        }
    }

    /// Nodes flagged as performance hotspots, highest score first.
    pub fn performance_hotspots(&self) -> Vec<&NodeData> {
        let mut hot: Vec<&NodeData> = self
            .nodes
            .iter()
            .filter(|n| n.is_performance_hotspot)
            .collect();
        hot.sort_by(|a, b| {
            b.performance_score
                .partial_cmp(&a.performance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hot
    }
}

fn folder_colors(graph: &ImportGraph) -> BTreeMap<String, String> {
    let folders: BTreeSet<&str> = graph.nodes().map(|n| n.info.folder.as_str()).collect();
    folders
        .into_iter()
        .enumerate()
        .map(|(i, folder)| (folder.to_string(), PALETTE[i % PALETTE.len()].to_string()))
        .collect()
}

fn node_data(
    graph: &ImportGraph,
    node: &ModuleNode,
    index: usize,
    color: String,
    history: &HistoryAnalysis,
    metrics_config: &MetricsConfig,
) -> NodeData {
    let info = &node.info;
    let metrics = &node.metrics;
    let file_history = history.file(&info.id);
    let score = performance_score(metrics);

    let mut all_imports: Vec<String> = Vec::new();
    for import in &node.imports {
        let spec = import.spec();
        if !all_imports.contains(&spec) {
            all_imports.push(spec);
        }
    }

    NodeData {
        id: info.id.clone(),
        name: info.display_name.clone(),
        stem: info.stem.clone(),
        folder: info.folder.clone(),
        color,
        file_path: info.file_path.to_string_lossy().replace('\\', "/"),
        index,
        imports_count: graph.out_degree(&info.id),
        all_imports,
        importance: node.importance,
        is_test: info.is_test,
        is_init: info.is_init,
        size: info.size,
        size_kb: metrics.file_size_kb,
        predecessors: graph.in_degree(&info.id),
        successors: graph.out_degree(&info.id),
        in_cycle: graph.in_cycle(&info.id),
        parse_errors: node.parse_errors,

        change_count: file_history.map_or(0, |h| h.change_count),
        change_frequency_score: file_history.map_or(0.0, |h| h.change_frequency_score),
        change_classification: file_history
            .map_or(ChangeClass::VeryLow, |h| h.change_classification),
        total_churn: file_history.map_or(0, |h| h.total_churn),
        churn_classification: file_history.map_or(ChangeClass::VeryLow, |h| h.churn_classification),
        hotspot_score: file_history.map_or(0.0, |h| h.hotspot_score),
        last_modified: file_history.map(|h| h.last_modified.clone()),

        performance_score: score,
        is_performance_hotspot: score > metrics_config.hotspot_threshold,
        cyclomatic_complexity: metrics.cyclomatic_complexity,
        total_lines: metrics.total_lines,
        code_lines: metrics.code_lines,
        function_count: metrics.function_count,
        class_count: metrics.class_count,
        heavy_operations: metrics.heavy_operations,
        max_nesting_depth: metrics.max_nesting_depth,
    }
}

fn limits_for(nodes: &[NodeData]) -> Limits {
    if nodes.is_empty() {
        return Limits::default();
    }
    let max_predecessors = nodes.iter().map(|n| n.predecessors).max().unwrap_or(0);
    let max_successors = nodes.iter().map(|n| n.successors).max().unwrap_or(0);
    let max_kb = nodes.iter().map(|n| n.size_kb).fold(0.0, f64::max);

    Limits {
        max_predecessors: max_predecessors + 2,
        max_successors: max_successors + 2,
        max_size_kb: (max_kb.floor() as u64 + 10).max(50),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_core::RankingConfig;
    use modgraph_gitpulse::hotspots::{analyze_history, HistoryOptions};
    use modgraph_gitpulse::mining::{ChangeStatus, CommitInfo, FileChange};
    use modgraph_scan::metrics::CodeMetrics;
    use modgraph_scan::module::{ModuleInfo, ParsedModule};
    use modgraph_scan::parser::Import;
    use std::path::Path;

    fn module(path: &str, imports: &[&str], metrics: CodeMetrics) -> ParsedModule {
        ParsedModule {
            info: ModuleInfo::from_relative_path(Path::new(path), 2048),
            imports: imports
                .iter()
                .map(|m| Import {
                    module: m.to_string(),
                    level: 0,
                    names: Vec::new(),
                    line: 1,
                    is_from: false,
                })
                .collect(),
            metrics,
            parse_errors: false,
        }
    }

    fn sample() -> (ImportGraph, RankStats) {
        let heavy = CodeMetrics {
            cyclomatic_complexity: 150,
            file_size_kb: 80.0,
            heavy_operations: 12,
            max_nesting_depth: 9,
            function_count: 25,
            ..CodeMetrics::default()
        };
        let mut graph = ImportGraph::build(vec![
            module("main.py", &["api.routes", "os", "os"], CodeMetrics::default()),
            module("api/routes.py", &["api.service"], CodeMetrics::default()),
            module("api/service.py", &["api.routes", "core.db"], heavy),
            module("core/db.py", &[], CodeMetrics::default()),
            module("tests/test_db.py", &["core.db"], CodeMetrics::default()),
        ]);
        let stats = graph.compute_importance(&RankingConfig::default());
        (graph, stats)
    }

    #[test]
    fn nodes_carry_graph_and_metric_fields() {
        let (graph, stats) = sample();
        let data = GraphData::build(
            &graph,
            stats,
            &HistoryAnalysis::unavailable(30),
            &MetricsConfig::default(),
        );

        assert_eq!(data.nodes.len(), 5);
        let main = &data.nodes[graph.index_of("main.py").unwrap()];
        assert_eq!(main.name, "main");
        assert_eq!(main.folder, "root");
        assert_eq!(main.all_imports, vec!["api.routes", "os"]);
        assert_eq!(main.imports_count, 1);
        assert_eq!(main.size_kb, 0.0);
        assert!(main.last_modified.is_none());
        assert_eq!(main.change_classification, ChangeClass::VeryLow);

        let service = &data.nodes[graph.index_of("api/service.py").unwrap()];
        assert!(service.in_cycle);
        assert!(service.is_performance_hotspot);
        assert_eq!(service.performance_score, 1.0);
        assert_eq!(service.name, "api/service");
        assert_eq!(data.performance_hotspots()[0].id, "api/service.py");

        let db = &data.nodes[graph.index_of("core/db.py").unwrap()];
        assert_eq!(db.predecessors, 2);
        assert_eq!(db.successors, 0);
    }

    #[test]
    fn edges_flag_folders_tests_and_cycles() {
        let (graph, stats) = sample();
        let data = GraphData::build(
            &graph,
            stats,
            &HistoryAnalysis::unavailable(30),
            &MetricsConfig::default(),
        );

        assert_eq!(data.edges.len(), 5);
        let find = |from: &str, to: &str| {
            data.edges
                .iter()
                .find(|e| e.source_id == from && e.target_id == to)
                .unwrap()
        };

        let routes_service = find("api/routes.py", "api/service.py");
        assert!(routes_service.in_cycle);
        assert!(!routes_service.is_cross_folder);

        let main_routes = find("main.py", "api/routes.py");
        assert!(main_routes.is_cross_folder);
        assert!(!main_routes.in_cycle);
        assert_eq!(data.nodes[main_routes.source].id, "main.py");

        assert!(find("tests/test_db.py", "core/db.py").is_test_related);
    }

    #[test]
    fn folders_statistics_and_limits() {
        let (graph, stats) = sample();
        let data = GraphData::build(
            &graph,
            stats,
            &HistoryAnalysis::unavailable(30),
            &MetricsConfig::default(),
        );

        let names: Vec<&str> = data.folders.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["api", "core", "root", "tests"]);
        assert_eq!(data.folders["api"].color, PALETTE[0]);
        assert_eq!(data.folders["tests"].color, PALETTE[3]);
        assert_eq!(data.folders["api"].modules, vec!["api/routes", "api/service"]);
        assert_eq!(data.folders["tests"].test_modules, vec!["tests/test_db"]);

        let s = &data.statistics;
        assert_eq!(s.total_files, 5);
        assert_eq!(s.total_dependencies, 5);
        assert_eq!(s.cross_folder_dependencies, 3);
        assert_eq!(s.test_files, 1);
        assert_eq!(s.folder_count, 4);
        assert_eq!(s.cycle_count, 1);
        assert_eq!(s.modules_in_cycles, 2);
        assert_eq!(s.performance_hotspots, 1);
        assert!(!s.git_available);

        assert_eq!(data.cycles, vec![vec!["api/routes.py", "api/service.py"]]);

        // routes and db have 2 importers, service imports 2, service is 80 KB
        assert_eq!(
            data.limits,
            Limits {
                max_predecessors: 4,
                max_successors: 4,
                max_size_kb: 90
            }
        );
    }

    #[test]
    fn empty_graph_uses_default_limits() {
        let mut graph = ImportGraph::build(Vec::new());
        let stats = graph.compute_importance(&RankingConfig::default());
        let data = GraphData::build(
            &graph,
            stats,
            &HistoryAnalysis::unavailable(30),
            &MetricsConfig::default(),
        );
        assert_eq!(data.limits, Limits::default());
        assert!(data.folders.is_empty());
    }

    #[test]
    fn history_fields_are_joined_by_path() {
        let (graph, stats) = sample();
        let commits = vec![CommitInfo {
            hash: "deadbeef".into(),
            author: "alice".into(),
            email: "alice@example.com".into(),
            timestamp: 1_700_000_000,
            message: "tune queries".into(),
            files_changed: vec![FileChange {
                path: "core/db.py".into(),
                lines_added: 600,
                lines_deleted: 20,
                status: ChangeStatus::Modified,
            }],
        }];
        let history = analyze_history(&commits, &HistoryOptions::default());
        let data = GraphData::build(&graph, stats, &history, &MetricsConfig::default());

        let db = &data.nodes[graph.index_of("core/db.py").unwrap()];
        assert_eq!(db.change_count, 1);
        assert_eq!(db.total_churn, 620);
        assert_eq!(db.churn_classification, ChangeClass::High);
        assert_eq!(db.last_modified.as_deref(), Some("2023-11-14T22:13:20Z"));
        assert!(data.statistics.git_available);
        assert_eq!(data.statistics.total_commits, 1);
    }

    #[test]
    fn json_uses_camel_case() {
        let (graph, stats) = sample();
        let data = GraphData::build(
            &graph,
            stats,
            &HistoryAnalysis::unavailable(30),
            &MetricsConfig::default(),
        );
        let json = serde_json::to_value(&data).unwrap();
        assert!(json["nodes"][0].get("importsCount").is_some());
        assert!(json["nodes"][0].get("isPerformanceHotspot").is_some());
        assert_eq!(json["nodes"][0]["changeClassification"], "very_low");
        assert!(json["edges"][0].get("isCrossFolder").is_some());
        assert!(json["statistics"].get("rankConverged").is_some());
        assert_eq!(json["limits"]["maxSizeKb"], 90);
    }
}
