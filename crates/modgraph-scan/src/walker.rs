use std::path::{Path, PathBuf};

use modgraph_core::{ModgraphError, ScanConfig};
use tracing::{debug, warn};

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// A Python source file discovered during project walking.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use modgraph_scan::walker::SourceFile;
///
/// let file = SourceFile {
///     path: PathBuf::from("pkg/app.py"),
///     content: "import os\n".to_string(),
///     size: 10,
/// };
/// assert_eq!(file.size, 10);
/// ```
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Full file content.
    pub content: String,
    /// File size in bytes.
    pub size: u64,
}

/// Walk a project, returning every Python file that should be analyzed.
///
/// Hidden entries are skipped, `.gitignore` is honored when
/// [`ScanConfig::respect_gitignore`] is set, and any path containing one of
/// [`ScanConfig::exclude_folders`] or matching one of
/// [`ScanConfig::exclude_patterns`] is left out. Oversized, binary,
/// unreadable and non-UTF-8 files are skipped with a log message. Returned
/// paths are relative to `root` and sorted.
///
/// # Errors
///
/// Returns [`ModgraphError::FileNotFound`] if `root` is not a directory and
/// [`ModgraphError::Pattern`] if an exclude glob is invalid.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use modgraph_core::ScanConfig;
/// use modgraph_scan::walker::walk_project;
///
/// let files = walk_project(Path::new("."), &ScanConfig::default()).unwrap();
/// for f in &files {
///     println!("{} ({} bytes)", f.path.display(), f.size);
/// }
/// ```
pub fn walk_project(root: &Path, config: &ScanConfig) -> Result<Vec<SourceFile>, ModgraphError> {
    if !root.is_dir() {
        return Err(ModgraphError::FileNotFound(root.to_path_buf()));
    }

    let patterns = config
        .exclude_patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| ModgraphError::Pattern(format!("{p}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let excluded = config.exclude_folders.clone();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .parents(config.respect_gitignore)
        .require_git(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && excluded.iter().any(|name| entry.file_name() == name.as_str()))
        })
        .build();

    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            continue;
        }

        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => path.to_path_buf(),
        };

        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if patterns.iter().any(|p| p.matches(&relative_str)) {
            debug!(path = %relative_str, "excluded by pattern");
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %relative_str, "cannot stat file: {e}");
                continue;
            }
        };
        if metadata.len() > config.max_file_size {
            debug!(path = %relative_str, size = metadata.len(), "skipping oversized file");
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %relative_str, "cannot read file: {e}");
                continue;
            }
        };

        // Check for binary content (null bytes in first 8KB)
        let check_len = bytes.len().min(BINARY_CHECK_SIZE);
        if bytes[..check_len].contains(&0) {
            debug!(path = %relative_str, "skipping binary file");
            continue;
        }

        let content = match String::from_utf8(bytes) {
            Ok(c) => c,
            Err(_) => {
                warn!(path = %relative_str, "skipping file that is not valid UTF-8");
                continue;
            }
        };

        files.push(SourceFile {
            path: relative,
            size: metadata.len(),
            content,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
