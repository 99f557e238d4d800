//! Per-module code metrics and the derived performance-risk score.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tree_sitter::{Node, Tree};

/// Patterns hinting at expensive work: file and network I/O, subprocesses,
/// (de)serialization, numeric libraries, long loops and sleeps.
const HEAVY_PATTERNS: &[&str] = &[
    r"\.read\(\)",
    r"\.write\(\)",
    r"\.open\(",
    r"subprocess\.",
    r"requests\.",
    r"urllib\.",
    r"json\.load",
    r"pickle\.load",
    r"pandas\.",
    r"numpy\.",
    r"scipy\.",
    r"matplotlib\.",
    r"for.*in.*range\(.*\d{3,}",
    r"while.*True:",
    r"time\.sleep",
];

/// Node kinds that add a branch to the control-flow graph.
const DECISION_KINDS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "boolean_operator",
    "conditional_expression",
    "for_in_clause",
    "if_clause",
    "case_clause",
];

/// Node kinds that open a nested block.
const BLOCK_KINDS: &[&str] = &[
    "function_definition",
    "class_definition",
    "if_statement",
    "for_statement",
    "while_statement",
    "with_statement",
    "try_statement",
    "match_statement",
];

/// Size and complexity measurements for one module.
///
/// # Examples
///
/// ```
/// use modgraph_scan::metrics::{compute_metrics, performance_score};
/// use modgraph_scan::parser::parse_tree;
///
/// let source = "def f(x):\n    if x:\n        return 1\n    return 0\n";
/// let tree = parse_tree(source).unwrap();
/// let metrics = compute_metrics(tree.as_ref(), source, source.len() as u64);
/// assert_eq!(metrics.function_count, 1);
/// assert_eq!(metrics.cyclomatic_complexity, 2);
/// assert_eq!(metrics.max_nesting_depth, 2);
/// assert!(performance_score(&metrics) < 0.1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMetrics {
    pub total_lines: u32,
    /// Lines that are neither blank nor comments.
    pub code_lines: u32,
    pub function_count: u32,
    pub class_count: u32,
    /// One per function plus one per decision point.
    pub cyclomatic_complexity: u32,
    pub heavy_operations: u32,
    /// Deepest block nesting; a top-level `def` is depth 1.
    pub max_nesting_depth: u32,
    pub file_size_kb: f64,
}

/// Measure a module. `tree` may be `None` if parsing failed outright, in
/// which case only line, size and pattern metrics are filled in.
pub fn compute_metrics(tree: Option<&Tree>, source: &str, size: u64) -> CodeMetrics {
    let mut metrics = CodeMetrics {
        total_lines: source.lines().count() as u32,
        code_lines: source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .count() as u32,
        heavy_operations: count_heavy_operations(source),
        file_size_kb: size as f64 / 1024.0,
        ..CodeMetrics::default()
    };

    if let Some(tree) = tree {
        walk(tree.root_node(), 0, &mut metrics);
        metrics.cyclomatic_complexity += metrics.function_count;
    }

    metrics
}

fn walk(node: Node, depth: u32, metrics: &mut CodeMetrics) {
    let kind = node.kind();

    match kind {
        "function_definition" => metrics.function_count += 1,
        "class_definition" => metrics.class_count += 1,
        _ => {}
    }
    if DECISION_KINDS.contains(&kind) {
        metrics.cyclomatic_complexity += 1;
    }

    let depth = if BLOCK_KINDS.contains(&kind) {
        let nested = depth + 1;
        metrics.max_nesting_depth = metrics.max_nesting_depth.max(nested);
        nested
    } else {
        depth
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        walk(child, depth, metrics);
    }
}

fn heavy_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        HEAVY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
            .collect()
    })
}

fn count_heavy_operations(source: &str) -> u32 {
    heavy_patterns()
        .iter()
        .map(|re| re.find_iter(source).count() as u32)
        .sum()
}

/// Weighted performance-risk score in `[0, 1]`.
///
/// Complexity saturates at 100, size at 50 KB, heavy operations at 10,
/// nesting at 8 and function count at 20.
pub fn performance_score(metrics: &CodeMetrics) -> f64 {
    let saturate = |value: f64, cap: f64| (value / cap).min(1.0);

    saturate(metrics.cyclomatic_complexity as f64, 100.0) * 0.3
        + saturate(metrics.file_size_kb, 50.0) * 0.2
        + saturate(metrics.heavy_operations as f64, 10.0) * 0.25
        + saturate(metrics.max_nesting_depth as f64, 8.0) * 0.15
        + saturate(metrics.function_count as f64, 20.0) * 0.1
}
