use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::metrics::CodeMetrics;
use crate::parser::Import;

/// Identity of a Python module derived from its root-relative path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modgraph_scan::module::ModuleInfo;
///
/// let info = ModuleInfo::from_relative_path(Path::new("pkg/sub/tools.py"), 120);
/// assert_eq!(info.id, "pkg/sub/tools.py");
/// assert_eq!(info.folder, "pkg");
/// assert_eq!(info.display_name, "pkg/tools");
/// assert_eq!(info.module_path, "pkg.sub.tools");
/// assert!(!info.is_test);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    /// Root-relative path with `/` separators; unique per module.
    pub id: String,
    /// Root-relative path as found on disk.
    pub file_path: PathBuf,
    /// First path component, or `"root"` for top-level files.
    pub folder: String,
    /// File name without the `.py` extension.
    pub stem: String,
    /// `stem` for top-level files, `folder/stem` otherwise.
    pub display_name: String,
    /// Dotted import path (`pkg/__init__.py` is `pkg`).
    pub module_path: String,
    /// Whether the file looks like a test module.
    pub is_test: bool,
    /// Whether the file is a package `__init__.py`.
    pub is_init: bool,
    /// File size in bytes.
    pub size: u64,
}

impl ModuleInfo {
    /// Derive module identity from a path relative to the project root.
    pub fn from_relative_path(path: &Path, size: u64) -> Self {
        let parts: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let id = parts.join("/");
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = if parts.len() > 1 {
            parts[0].clone()
        } else {
            "root".to_string()
        };
        let display_name = if folder == "root" {
            stem.clone()
        } else {
            format!("{folder}/{stem}")
        };
        let is_init = path.file_name().is_some_and(|n| n == "__init__.py");

        let mut dotted: Vec<&str> = parts[..parts.len().saturating_sub(1)]
            .iter()
            .map(String::as_str)
            .collect();
        if !is_init {
            dotted.push(stem.as_str());
        }
        let module_path = dotted.join(".");

        let is_test = is_test_module(&stem, &folder);

        Self {
            id,
            file_path: path.to_path_buf(),
            folder,
            stem,
            display_name,
            module_path,
            is_test,
            is_init,
            size,
        }
    }

    /// Directory containing the file, as a `/`-joined root-relative path.
    ///
    /// Top-level files live in the empty directory `""`.
    pub fn directory(&self) -> &str {
        match self.id.rfind('/') {
            Some(pos) => &self.id[..pos],
            None => "",
        }
    }
}

fn is_test_module(stem: &str, folder: &str) -> bool {
    let stem = stem.to_lowercase();
    let folder = folder.to_lowercase();
    stem.starts_with("test_") || stem.ends_with("_test") || stem == "test" || folder.contains("test")
}

/// A module after parsing: identity, imports, and code metrics.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub info: ModuleInfo,
    pub imports: Vec<Import>,
    pub metrics: CodeMetrics,
    /// The parser recovered from syntax errors in this file.
    pub parse_errors: bool,
}
