//! Git history extraction via git2.
//!
//! Mines recent commits from the repository containing the analyzed
//! directory, extracting per-commit file changes with line counts, author
//! info, and timestamps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git2::{Delta, DiffFindOptions, DiffOptions, Repository, Sort};
use modgraph_core::ModgraphError;
use tracing::debug;

/// Raw commit data extracted from git history.
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::mining::CommitInfo;
///
/// let info = CommitInfo {
///     hash: "abc12345".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: 1700000000,
///     message: "fix: import loop".into(),
///     files_changed: vec![],
/// };
/// assert_eq!(info.author, "alice");
/// ```
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// Short commit hash.
    pub hash: String,
    pub author: String,
    pub email: String,
    /// Unix timestamp of the commit.
    pub timestamp: i64,
    /// First line of the commit message.
    pub message: String,
    pub files_changed: Vec<FileChange>,
}

/// A single file change within a commit.
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::mining::{ChangeStatus, FileChange};
///
/// let change = FileChange {
///     path: "pkg/app.py".into(),
///     lines_added: 10,
///     lines_deleted: 3,
///     status: ChangeStatus::Modified,
/// };
/// assert_eq!(change.churn(), 13);
/// ```
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Path relative to the analyzed directory, `/`-separated.
    pub path: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub status: ChangeStatus,
}

impl FileChange {
    /// Lines added plus lines deleted.
    pub fn churn(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed {
        /// Path before the rename.
        from: String,
    },
}

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::mining::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert_eq!(opts.since_days, 30);
/// assert!(opts.max_files_per_commit.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct MiningOptions {
    /// Only include commits from the last N days (default: 30).
    pub since_days: u64,
    /// Skip commits touching more files than this (default: no limit).
    pub max_files_per_commit: Option<usize>,
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
}

impl Default for MiningOptions {
    fn default() -> Self {
        Self {
            since_days: 30,
            max_files_per_commit: None,
            branch: None,
        }
    }
}

impl From<&modgraph_core::HistoryConfig> for MiningOptions {
    fn from(config: &modgraph_core::HistoryConfig) -> Self {
        Self {
            since_days: config.since_days,
            max_files_per_commit: config.max_files_per_commit,
            branch: config.branch.clone(),
        }
    }
}

/// Mine commit history for the directory at `path`.
///
/// The repository is discovered by walking up from `path`, so `path` may be
/// a subdirectory of a work tree. Paths in the result are relative to
/// `path`; changes outside it are dropped. Commits come newest first and
/// each is diffed against its first parent.
///
/// # Errors
///
/// Returns [`ModgraphError::Git`] if no repository contains `path`, the
/// repository is bare or empty, or the history cannot be walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use modgraph_gitpulse::mining::{mine_history, MiningOptions};
///
/// let commits = mine_history(Path::new("."), &MiningOptions::default()).unwrap();
/// for c in &commits {
///     println!("{}: {} ({})", c.hash, c.message, c.author);
/// }
/// ```
pub fn mine_history(path: &Path, options: &MiningOptions) -> Result<Vec<CommitInfo>, ModgraphError> {
    let repo = Repository::discover(path)
        .map_err(|e| ModgraphError::Git(format!("failed to open repository: {e}")))?;
    let prefix = scope_prefix(&repo, path)?;

    let mut revwalk = repo
        .revwalk()
        .map_err(|e| ModgraphError::Git(format!("failed to create revwalk: {e}")))?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(|e| ModgraphError::Git(format!("failed to set sorting: {e}")))?;

    if let Some(ref branch) = options.branch {
        let reference = repo.resolve_reference_from_short_name(branch).map_err(|e| {
            ModgraphError::Git(format!("failed to resolve branch '{branch}': {e}"))
        })?;
        let oid = reference
            .target()
            .ok_or_else(|| ModgraphError::Git(format!("branch '{branch}' has no target")))?;
        revwalk
            .push(oid)
            .map_err(|e| ModgraphError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| ModgraphError::Git(format!("failed to push HEAD: {e}")))?;
    }

    let cutoff = chrono::Utc::now().timestamp() - options.since_days as i64 * 86_400;
    let mut commits = Vec::new();

    for oid_result in revwalk {
        let oid = oid_result.map_err(|e| ModgraphError::Git(format!("revwalk error: {e}")))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| ModgraphError::Git(format!("failed to find commit: {e}")))?;

        let timestamp = commit.time().seconds();
        if timestamp < cutoff {
            break;
        }

        let changes = extract_file_changes(&repo, &commit)?;
        if options
            .max_files_per_commit
            .is_some_and(|limit| changes.len() > limit)
        {
            debug!(commit = %oid, files = changes.len(), "skipping oversized commit");
            continue;
        }

        let files_changed = changes
            .into_iter()
            .filter_map(|change| rescope(change, &prefix))
            .collect();

        let author = commit.author();
        let hash = oid.to_string();
        commits.push(CommitInfo {
            hash: hash[..hash.len().min(8)].to_string(),
            author: author.name().unwrap_or("unknown").to_string(),
            email: author.email().unwrap_or("unknown").to_string(),
            timestamp,
            message: commit.summary().unwrap_or("").to_string(),
            files_changed,
        });
    }

    debug!(commits = commits.len(), days = options.since_days, "mined history");
    Ok(commits)
}

/// Path of `path` inside the work tree, `/`-joined with a trailing slash
/// (empty when `path` is the work tree root).
fn scope_prefix(repo: &Repository, path: &Path) -> Result<String, ModgraphError> {
    let workdir = repo
        .workdir()
        .ok_or_else(|| ModgraphError::Git("repository has no working directory".into()))?;
    let workdir = canonical(workdir);
    let target = canonical(path);

    let relative = target.strip_prefix(&workdir).unwrap_or(Path::new(""));
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!("{}/", parts.join("/")))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Re-express a repository-relative change relative to the analyzed
/// directory, or drop it if it lies outside.
fn rescope(mut change: FileChange, prefix: &str) -> Option<FileChange> {
    if prefix.is_empty() {
        return Some(change);
    }
    change.path = change.path.strip_prefix(prefix)?.to_string();
    if let ChangeStatus::Renamed { from } = &mut change.status {
        if let Some(stripped) = from.strip_prefix(prefix) {
            *from = stripped.to_string();
        }
    }
    Some(change)
}

fn extract_file_changes(
    repo: &Repository,
    commit: &git2::Commit,
) -> Result<Vec<FileChange>, ModgraphError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| ModgraphError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| ModgraphError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| ModgraphError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))
        .map_err(|e| ModgraphError::Git(format!("failed to compute diff: {e}")))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| ModgraphError::Git(format!("failed to find renames: {e}")))?;

    let mut changes = Vec::new();
    for delta in diff.deltas() {
        let new_path = path_string(delta.new_file().path());
        let old_path = path_string(delta.old_file().path());

        let (path, status) = match delta.status() {
            Delta::Added => (new_path, ChangeStatus::Added),
            Delta::Deleted => (old_path, ChangeStatus::Deleted),
            Delta::Renamed => (new_path, ChangeStatus::Renamed { from: old_path }),
            _ => (new_path, ChangeStatus::Modified),
        };
        if path.is_empty() {
            continue;
        }
        changes.push(FileChange {
            path,
            lines_added: 0,
            lines_deleted: 0,
            status,
        });
    }

    let mut line_counts: HashMap<String, (u64, u64)> = HashMap::new();
    diff.foreach(
        &mut |_delta, _progress| true,
        None,
        None,
        Some(&mut |delta, _hunk, line| {
            let path = path_string(delta.new_file().path().or_else(|| delta.old_file().path()));
            let entry = line_counts.entry(path).or_insert((0, 0));
            match line.origin() {
                '+' => entry.0 += 1,
                '-' => entry.1 += 1,
                _ => {}
            }
            true
        }),
    )
    .map_err(|e| ModgraphError::Git(format!("failed to iterate diff lines: {e}")))?;

    for change in &mut changes {
        if let Some(&(added, deleted)) = line_counts.get(&change.path) {
            change.lines_added = added;
            change.lines_deleted = deleted;
        }
    }

    Ok(changes)
}

fn path_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}
