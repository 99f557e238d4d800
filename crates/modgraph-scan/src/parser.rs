use modgraph_core::ModgraphError;
use serde::Serialize;
use tree_sitter::{Node, Parser, Tree};

/// One imported module as written in the source.
///
/// `import a.b, c` produces two imports; `from x import y, z` produces one
/// import of `x` carrying the names `y` and `z`.
///
/// # Examples
///
/// ```
/// use modgraph_scan::parser::Import;
///
/// let import = Import {
///     module: "models".into(),
///     level: 2,
///     names: vec!["User".into()],
///     line: 3,
///     is_from: true,
/// };
/// assert_eq!(import.spec(), "..models");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Import {
    /// Dotted module path after any leading dots (may be empty for `from . import x`).
    pub module: String,
    /// Number of leading dots; `0` for absolute imports.
    pub level: usize,
    /// Names pulled in by a from-import (`"*"` for wildcard imports).
    pub names: Vec<String>,
    /// Line of the statement (1-indexed).
    pub line: u32,
    /// `from ... import ...` rather than `import ...`.
    pub is_from: bool,
}

impl Import {
    /// Textual module reference, e.g. `os.path` or `..models`.
    pub fn spec(&self) -> String {
        format!("{}{}", ".".repeat(self.level), self.module)
    }

    /// Whether the import is relative to the importing file.
    pub fn is_relative(&self) -> bool {
        self.level > 0
    }
}

/// Parse Python source with tree-sitter.
///
/// Returns `None` only if tree-sitter gives up entirely; syntax errors still
/// produce a tree containing `ERROR` nodes.
///
/// # Errors
///
/// Returns [`ModgraphError::Parse`] if the Python grammar cannot be loaded.
///
/// # Examples
///
/// ```
/// use modgraph_scan::parser::parse_tree;
///
/// let tree = parse_tree("import os\n").unwrap().unwrap();
/// assert_eq!(tree.root_node().kind(), "module");
/// ```
pub fn parse_tree(source: &str) -> Result<Option<Tree>, ModgraphError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ModgraphError::Parse(format!("failed to set language: {e}")))?;

    Ok(parser.parse(source, None))
}

/// Extract every import statement in the tree, including imports nested in
/// functions, classes and conditionals. `from __future__` imports are skipped.
///
/// # Examples
///
/// ```
/// use modgraph_scan::parser::{extract_imports, parse_tree};
///
/// let source = "import os\nfrom .models import User\n";
/// let tree = parse_tree(source).unwrap().unwrap();
/// let imports = extract_imports(&tree, source);
/// assert_eq!(imports.len(), 2);
/// assert_eq!(imports[1].spec(), ".models");
/// ```
pub fn extract_imports(tree: &Tree, source: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    collect_imports(tree.root_node(), source.as_bytes(), &mut imports);
    imports
}

fn collect_imports(node: Node, source: &[u8], imports: &mut Vec<Import>) {
    match node.kind() {
        "import_statement" => {
            let line = node.start_position().row as u32 + 1;
            let mut cursor = node.walk();
            for name_node in node.children_by_field_name("name", &mut cursor) {
                let Some(module) = imported_name(&name_node, source) else {
                    continue;
                };
                imports.push(Import {
                    module,
                    level: 0,
                    names: Vec::new(),
                    line,
                    is_from: false,
                });
            }
            return;
        }
        "import_from_statement" => {
            if let Some(import) = from_import(&node, source) {
                imports.push(import);
            }
            return;
        }
        "future_import_statement" => return,
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_imports(child, source, imports);
    }
}

fn from_import(node: &Node, source: &[u8]) -> Option<Import> {
    let module_node = node.child_by_field_name("module_name")?;

    let (level, module) = if module_node.kind() == "relative_import" {
        let mut level = 0;
        let mut module = String::new();
        let mut cursor = module_node.walk();
        for child in module_node.named_children(&mut cursor) {
            match child.kind() {
                "import_prefix" => {
                    level = node_text(&child, source).chars().filter(|c| *c == '.').count();
                }
                "dotted_name" => module = dotted_text(&child, source),
                _ => {}
            }
        }
        (level, module)
    } else {
        (0, dotted_text(&module_node, source))
    };

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for name_node in node.children_by_field_name("name", &mut cursor) {
        if let Some(name) = imported_name(&name_node, source) {
            names.push(name);
        }
    }
    if child_has_kind(node, "wildcard_import") {
        names.push("*".to_string());
    }

    Some(Import {
        module,
        level,
        names,
        line: node.start_position().row as u32 + 1,
        is_from: true,
    })
}

/// Name bound by an import list entry: `a.b` or the `a.b` of `a.b as c`.
fn imported_name(node: &Node, source: &[u8]) -> Option<String> {
    let target = match node.kind() {
        "dotted_name" => *node,
        "aliased_import" => node.child_by_field_name("name")?,
        _ => return None,
    };
    let text = dotted_text(&target, source);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Dotted name text with any interior whitespace removed.
fn dotted_text(node: &Node, source: &[u8]) -> String {
    node_text(node, source)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

pub(crate) fn node_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node.end_byte();
    if start >= source.len() || end > source.len() {
        return String::new();
    }
    String::from_utf8_lossy(&source[start..end]).to_string()
}

fn child_has_kind(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == kind {
            return true;
        }
    }
    false
}
