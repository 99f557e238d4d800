use std::fmt::Write;

use modgraph_core::{ModgraphError, OutputFormat};
use serde::Serialize;

use crate::graph::ImportGraph;

/// JSON-serializable row of the importance ranking.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankedOutput<'a> {
    position: usize,
    id: &'a str,
    folder: &'a str,
    importance: f64,
    rank: f64,
    imported_by: usize,
    imports: usize,
    in_cycle: bool,
}

/// Render the top `limit` modules by importance.
///
/// # Errors
///
/// Returns [`ModgraphError::Serialization`] if JSON output fails.
///
/// # Examples
///
/// ```
/// use modgraph_core::OutputFormat;
/// use modgraph_scan::graph::ImportGraph;
/// use modgraph_scan::output::format_ranking;
///
/// let graph = ImportGraph::build(vec![]);
/// let text = format_ranking(&graph, 10, OutputFormat::Text).unwrap();
/// assert!(text.contains("No Python modules"));
/// ```
pub fn format_ranking(
    graph: &ImportGraph,
    limit: usize,
    format: OutputFormat,
) -> Result<String, ModgraphError> {
    let rows: Vec<RankedOutput> = graph
        .ranked_modules()
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, node)| RankedOutput {
            position: i + 1,
            id: &node.info.id,
            folder: &node.info.folder,
            importance: node.importance,
            rank: node.rank,
            imported_by: graph.in_degree(&node.info.id),
            imports: graph.out_degree(&node.info.id),
            in_cycle: graph.in_cycle(&node.info.id),
        })
        .collect();

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&rows).map_err(ModgraphError::from),
        OutputFormat::Markdown => Ok(ranking_markdown(&rows)),
        OutputFormat::Text => Ok(ranking_text(&rows, graph.len())),
    }
}

fn ranking_text(rows: &[RankedOutput], total: usize) -> String {
    if rows.is_empty() {
        return "No Python modules found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Top {} of {total} modules by importance\n", rows.len());
    let count = rows.len();
    for (idx, row) in rows.iter().enumerate() {
        let prefix = if idx == count - 1 {
            "\u{2514}\u{2500}\u{2500} "
        } else {
            "\u{251c}\u{2500}\u{2500} "
        };
        let cycle = if row.in_cycle { "  [cycle]" } else { "" };
        let _ = writeln!(
            out,
            "{prefix}{:>3}. {:.3}  {}  (imported by {}, imports {}){cycle}",
            row.position, row.importance, row.id, row.imported_by, row.imports
        );
    }
    out
}

fn ranking_markdown(rows: &[RankedOutput]) -> String {
    let mut out = String::from("# Module Importance\n\n");
    if rows.is_empty() {
        out.push_str("No Python modules found.\n");
        return out;
    }

    out.push_str("| # | Module | Importance | Imported by | Imports |\n");
    out.push_str("|---|--------|------------|-------------|---------|\n");
    for row in rows {
        let _ = writeln!(
            out,
            "| {} | `{}` | {:.3} | {} | {} |",
            row.position, row.id, row.importance, row.imported_by, row.imports
        );
    }
    out
}

/// Render every circular import found in the graph.
///
/// # Errors
///
/// Returns [`ModgraphError::Serialization`] if JSON output fails.
///
/// # Examples
///
/// ```
/// use modgraph_core::OutputFormat;
/// use modgraph_scan::graph::ImportGraph;
/// use modgraph_scan::output::format_cycles;
///
/// let graph = ImportGraph::build(vec![]);
/// let json = format_cycles(&graph, OutputFormat::Json).unwrap();
/// assert_eq!(json.trim(), "[]");
/// ```
pub fn format_cycles(graph: &ImportGraph, format: OutputFormat) -> Result<String, ModgraphError> {
    let cycles: Vec<Vec<&str>> = graph
        .cycles()
        .iter()
        .map(|members| members.iter().map(|n| n.info.id.as_str()).collect())
        .collect();

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&cycles).map_err(ModgraphError::from),
        OutputFormat::Markdown => {
            let mut out = String::from("# Circular Imports\n\n");
            if cycles.is_empty() {
                out.push_str("No circular imports found.\n");
            }
            for (idx, members) in cycles.iter().enumerate() {
                let _ = writeln!(out, "## Cycle {} ({} modules)\n", idx + 1, members.len());
                for id in members {
                    let _ = writeln!(out, "- `{id}`");
                }
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Text => {
            if cycles.is_empty() {
                return Ok("No circular imports found.\n".to_string());
            }
            let mut out = String::new();
            let _ = writeln!(out, "{} circular import group(s)\n", cycles.len());
            for (idx, members) in cycles.iter().enumerate() {
                let _ = writeln!(out, "Cycle {} ({} modules)", idx + 1, members.len());
                let count = members.len();
                for (i, id) in members.iter().enumerate() {
                    let prefix = if i == count - 1 {
                        "\u{2514}\u{2500}\u{2500} "
                    } else {
                        "\u{251c}\u{2500}\u{2500} "
                    };
                    let _ = writeln!(out, "{prefix}{id}");
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::CodeMetrics;
    use crate::module::{ModuleInfo, ParsedModule};
    use crate::parser::Import;
    use modgraph_core::RankingConfig;
    use std::path::Path;

    fn module(path: &str, imports: &[&str]) -> ParsedModule {
        ParsedModule {
            info: ModuleInfo::from_relative_path(Path::new(path), 0),
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
            metrics: CodeMetrics::default(),
            parse_errors: false,
        }
    }

    fn sample_graph() -> ImportGraph {
        let mut graph = ImportGraph::build(vec![
            module("app.py", &["core"]),
            module("core.py", &["util"]),
            module("util.py", &["core"]),
        ]);
        graph.compute_importance(&RankingConfig::default());
        graph
    }

    #[test]
    fn ranking_text_lists_modules() {
        let text = format_ranking(&sample_graph(), 2, OutputFormat::Text).unwrap();
        assert!(text.contains("Top 2 of 3 modules"));
        assert!(text.contains("[cycle]"));
        assert!(!text.contains("app.py"), "limit should drop the last module");
    }

    #[test]
    fn ranking_json_is_valid() {
        let json = format_ranking(&sample_graph(), 10, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["position"], 1);
        assert_eq!(rows[0]["importance"], 1.0);
        assert!(rows[0].get("importedBy").is_some());
    }

    #[test]
    fn ranking_markdown_has_table() {
        let md = format_ranking(&sample_graph(), 10, OutputFormat::Markdown).unwrap();
        assert!(md.contains("# Module Importance"));
        assert!(md.contains("| `app.py` |"));
    }

    #[test]
    fn cycles_in_all_formats() {
        let graph = sample_graph();

        let text = format_cycles(&graph, OutputFormat::Text).unwrap();
        assert!(text.contains("Cycle 1 (2 modules)"));
        assert!(text.contains("core.py"));

        let json = format_cycles(&graph, OutputFormat::Json).unwrap();
        let parsed: Vec<Vec<String>> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![vec!["core.py".to_string(), "util.py".to_string()]]);

        let md = format_cycles(&graph, OutputFormat::Markdown).unwrap();
        assert!(md.contains("- `util.py`"));
    }

    #[test]
    fn no_cycles_message() {
        let graph = ImportGraph::build(vec![module("a.py", &[])]);
        let text = format_cycles(&graph, OutputFormat::Text).unwrap();
        assert_eq!(text, "No circular imports found.\n");
    }
}
