use std::collections::{BTreeSet, HashMap};

use modgraph_core::RankingConfig;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use tracing::debug;

use crate::metrics::CodeMetrics;
use crate::module::{ModuleInfo, ParsedModule};
use crate::parser::Import;
use crate::resolver::Resolver;

/// A module in the import graph, annotated with its importance.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modgraph_scan::graph::ModuleNode;
/// use modgraph_scan::module::ModuleInfo;
///
/// let node = ModuleNode {
///     info: ModuleInfo::from_relative_path(Path::new("app.py"), 0),
///     imports: vec![],
///     metrics: Default::default(),
///     parse_errors: false,
///     rank: 0.0,
///     importance: 0.0,
/// };
/// assert_eq!(node.info.id, "app.py");
/// ```
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub info: ModuleInfo,
    /// Every import in the file, resolved or not.
    pub imports: Vec<Import>,
    pub metrics: CodeMetrics,
    pub parse_errors: bool,
    /// Raw PageRank score; all ranks sum to 1.
    pub rank: f64,
    /// Rank scaled so the top module scores 1.0.
    pub importance: f64,
}

/// Outcome of an importance computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankStats {
    pub iterations: usize,
    pub converged: bool,
}

/// Directed graph of project modules; an edge `a -> b` means `a` imports `b`.
///
/// Node indices follow the order modules were passed to [`ImportGraph::build`].
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modgraph_core::RankingConfig;
/// use modgraph_scan::graph::ImportGraph;
/// use modgraph_scan::module::{ModuleInfo, ParsedModule};
/// use modgraph_scan::parser::Import;
///
/// let module = |path: &str, imports: Vec<Import>| ParsedModule {
///     info: ModuleInfo::from_relative_path(Path::new(path), 0),
///     imports,
///     metrics: Default::default(),
///     parse_errors: false,
/// };
/// let import_b = Import {
///     module: "b".into(),
///     level: 0,
///     names: vec![],
///     line: 1,
///     is_from: false,
/// };
///
/// let mut graph = ImportGraph::build(vec![module("a.py", vec![import_b]), module("b.py", vec![])]);
/// graph.compute_importance(&RankingConfig::default());
/// assert_eq!(graph.ranked_modules()[0].info.id, "b.py");
/// assert_eq!(graph.in_degree("b.py"), 1);
/// ```
#[derive(Debug)]
pub struct ImportGraph {
    graph: DiGraph<ModuleNode, ()>,
    id_to_index: HashMap<String, NodeIndex>,
    cycles: Vec<Vec<NodeIndex>>,
    component: Vec<Option<usize>>,
}

impl ImportGraph {
    /// Build the graph, resolving every import against the given modules.
    ///
    /// Unresolved imports add no edge. Duplicate edges are collapsed and
    /// self-imports dropped.
    pub fn build(modules: Vec<ParsedModule>) -> Self {
        let infos: Vec<ModuleInfo> = modules.iter().map(|m| m.info.clone()).collect();
        let resolver = Resolver::new(&infos);

        let mut edges = BTreeSet::new();
        for (from, module) in modules.iter().enumerate() {
            for import in &module.imports {
                for to in resolver.resolve(from, import) {
                    if to != from {
                        edges.insert((from, to));
                    }
                }
            }
        }

        let mut graph = DiGraph::new();
        let mut id_to_index = HashMap::new();
        for module in modules {
            let id = module.info.id.clone();
            let idx = graph.add_node(ModuleNode {
                info: module.info,
                imports: module.imports,
                metrics: module.metrics,
                parse_errors: module.parse_errors,
                rank: 0.0,
                importance: 0.0,
            });
            id_to_index.entry(id).or_insert(idx);
        }
        for &(from, to) in &edges {
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }

        let (cycles, component) = find_cycles(&graph);
        debug!(
            modules = graph.node_count(),
            edges = graph.edge_count(),
            cycles = cycles.len(),
            "built import graph"
        );

        Self {
            graph,
            id_to_index,
            cycles,
            component,
        }
    }

    /// Run PageRank by power iteration and store rank and importance on nodes.
    ///
    /// Rank held by modules without internal imports is spread evenly over
    /// all modules each step, so ranks always sum to 1. An empty graph is a
    /// no-op that reports convergence.
    pub fn compute_importance(&mut self, config: &RankingConfig) -> RankStats {
        let n = self.graph.node_count();
        if n == 0 {
            return RankStats {
                iterations: 0,
                converged: true,
            };
        }

        let d = config.damping;
        let n_f64 = n as f64;
        let out_degrees: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.neighbors_directed(idx, Direction::Outgoing).count())
            .collect();

        let mut ranks = vec![1.0 / n_f64; n];
        let mut stats = RankStats::default();

        for iteration in 1..=config.max_iterations {
            let dangling: f64 = ranks
                .iter()
                .zip(&out_degrees)
                .filter(|(_, deg)| **deg == 0)
                .map(|(r, _)| r)
                .sum();
            let base = (1.0 - d) / n_f64 + d * dangling / n_f64;
            let mut new_ranks = vec![base; n];

            for node_idx in self.graph.node_indices() {
                let i = node_idx.index();
                if out_degrees[i] == 0 {
                    continue;
                }
                let contribution = d * ranks[i] / out_degrees[i] as f64;
                for neighbor in self.graph.neighbors_directed(node_idx, Direction::Outgoing) {
                    new_ranks[neighbor.index()] += contribution;
                }
            }

            let delta = ranks
                .iter()
                .zip(&new_ranks)
                .map(|(old, new)| (old - new).abs())
                .fold(0.0, f64::max);
            ranks = new_ranks;
            stats.iterations = iteration;

            if delta < config.tolerance {
                stats.converged = true;
                break;
            }
        }

        let max_rank = ranks.iter().copied().fold(0.0, f64::max);
        for node_idx in self.graph.node_indices() {
            let rank = ranks[node_idx.index()];
            let node = &mut self.graph[node_idx];
            node.rank = rank;
            node.importance = if max_rank > 0.0 { rank / max_rank } else { 0.0 };
        }

        debug!(
            iterations = stats.iterations,
            converged = stats.converged,
            "computed importance"
        );
        stats
    }

    /// All modules by importance, highest first; ties broken by id.
    pub fn ranked_modules(&self) -> Vec<&ModuleNode> {
        let mut nodes: Vec<&ModuleNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.info.id.cmp(&b.info.id))
        });
        nodes
    }

    /// Circular imports: strongly connected components of two or more
    /// modules. Members are sorted by id; larger cycles come first.
    pub fn cycles(&self) -> Vec<Vec<&ModuleNode>> {
        self.cycles
            .iter()
            .map(|members| members.iter().map(|&idx| &self.graph[idx]).collect())
            .collect()
    }

    /// Whether the module takes part in a circular import.
    pub fn in_cycle(&self, id: &str) -> bool {
        self.index_of(id)
            .is_some_and(|idx| self.component[idx].is_some())
    }

    /// Whether the edge between two node indices lies on a cycle.
    pub fn edge_in_cycle(&self, from: usize, to: usize) -> bool {
        match (self.component.get(from), self.component.get(to)) {
            (Some(Some(a)), Some(Some(b))) => a == b,
            _ => false,
        }
    }

    pub fn node(&self, id: &str) -> Option<&ModuleNode> {
        self.id_to_index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Node index of a module, usable with [`ImportGraph::edges`].
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).map(|idx| idx.index())
    }

    /// Modules in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        self.graph.node_weights()
    }

    /// `(importer, imported)` index pairs, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (a.index(), b.index()))
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of modules importing `id`.
    pub fn in_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Incoming)
    }

    /// Number of project modules `id` imports.
    pub fn out_degree(&self, id: &str) -> usize {
        self.degree(id, Direction::Outgoing)
    }

    /// Ids of the project modules `id` imports, sorted.
    pub fn internal_imports(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.id_to_index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].info.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn degree(&self, id: &str, dir: Direction) -> usize {
        self.id_to_index
            .get(id)
            .map(|&idx| self.graph.neighbors_directed(idx, dir).count())
            .unwrap_or(0)
    }
}

type Cycles = (Vec<Vec<NodeIndex>>, Vec<Option<usize>>);

fn find_cycles(graph: &DiGraph<ModuleNode, ()>) -> Cycles {
    let mut cycles: Vec<Vec<NodeIndex>> = petgraph::algo::tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .collect();

    for members in &mut cycles {
        members.sort_by(|a, b| graph[*a].info.id.cmp(&graph[*b].info.id));
    }
    cycles.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| graph[a[0]].info.id.cmp(&graph[b[0]].info.id))
    });

    let mut component = vec![None; graph.node_count()];
    for (cycle_idx, members) in cycles.iter().enumerate() {
        for idx in members {
            component[idx.index()] = Some(cycle_idx);
        }
    }

    (cycles, component)
}
