//! Change frequency and churn hotspot detection.
//!
//! Scores each Python file by how often it changed within the history window
//! and how many lines those changes touched. Files scoring high are hotspots;
//! files that barely moved are reported as stable.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::mining::CommitInfo;

/// Churn at which the churn component of the hotspot score saturates.
const CHURN_SATURATION: f64 = 1000.0;

/// Five-level bucket used for both change frequency and churn.
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::hotspots::ChangeClass;
///
/// assert_eq!(ChangeClass::from_frequency(0.72), ChangeClass::VeryHigh);
/// assert_eq!(ChangeClass::from_churn(120), ChangeClass::Medium);
/// assert_eq!(ChangeClass::Low.to_string(), "low");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeClass {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ChangeClass {
    /// Bucket a change frequency score in `[0, 1]`.
    pub fn from_frequency(score: f64) -> Self {
        match score {
            s if s >= 0.7 => Self::VeryHigh,
            s if s >= 0.5 => Self::High,
            s if s >= 0.3 => Self::Medium,
            s if s >= 0.1 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    /// Bucket a total churn (lines added + deleted).
    pub fn from_churn(churn: u64) -> Self {
        match churn {
            c if c >= 1000 => Self::VeryHigh,
            c if c >= 500 => Self::High,
            c if c >= 100 => Self::Medium,
            c if c >= 10 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

impl std::fmt::Display for ChangeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change history of one file within the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHistory {
    pub path: String,
    pub change_count: u32,
    /// ISO-8601 time of the oldest change in the window.
    pub first_modified: String,
    /// ISO-8601 time of the newest change in the window.
    pub last_modified: String,
    pub additions: u64,
    pub deletions: u64,
    pub total_churn: u64,
    pub avg_churn_per_commit: f64,
    pub change_frequency_score: f64,
    pub change_classification: ChangeClass,
    pub churn_classification: ChangeClass,
    pub hotspot_score: f64,
}

/// Thresholds and window for [`analyze_history`].
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::hotspots::HistoryOptions;
///
/// let opts = HistoryOptions::default();
/// assert_eq!(opts.days, 30);
/// assert_eq!(opts.hotspot_threshold, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Length of the history window in days.
    pub days: u64,
    /// Minimum hotspot score for a hotspot.
    pub hotspot_threshold: f64,
    /// Maximum hotspot score for a stable file.
    pub stable_threshold: f64,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            days: 30,
            hotspot_threshold: 0.5,
            stable_threshold: 0.1,
        }
    }
}

impl From<&modgraph_core::HistoryConfig> for HistoryOptions {
    fn from(config: &modgraph_core::HistoryConfig) -> Self {
        Self {
            days: config.since_days,
            hotspot_threshold: config.hotspot_threshold,
            stable_threshold: config.stable_threshold,
        }
    }
}

/// Result of analyzing the history window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalysis {
    /// False when git history could not be read.
    pub available: bool,
    pub analysis_days: u64,
    /// Commits in the window, including ones touching no Python files.
    pub total_commits: usize,
    /// Per-file history keyed by path.
    pub files: BTreeMap<String, FileHistory>,
    /// Paths with `hotspot_score >= hotspot_threshold`, hottest first.
    pub hotspots: Vec<String>,
    /// Paths with `hotspot_score <= stable_threshold`, calmest first.
    pub stable_files: Vec<String>,
}

impl HistoryAnalysis {
    /// An empty analysis marking history as unavailable.
    ///
    /// # Examples
    ///
    /// ```
    /// use modgraph_gitpulse::hotspots::HistoryAnalysis;
    ///
    /// let analysis = HistoryAnalysis::unavailable(30);
    /// assert!(!analysis.available);
    /// assert!(analysis.files.is_empty());
    /// ```
    pub fn unavailable(days: u64) -> Self {
        Self {
            available: false,
            analysis_days: days,
            ..Self::default()
        }
    }

    pub fn file(&self, path: &str) -> Option<&FileHistory> {
        self.files.get(path)
    }

    /// Hotspot entries in ranking order.
    pub fn hotspot_files(&self) -> Vec<&FileHistory> {
        self.hotspots.iter().filter_map(|p| self.files.get(p)).collect()
    }

    /// Stable entries in ranking order.
    pub fn stable_file_histories(&self) -> Vec<&FileHistory> {
        self.stable_files
            .iter()
            .filter_map(|p| self.files.get(p))
            .collect()
    }
}

#[derive(Default)]
struct Accumulator {
    count: u32,
    first: i64,
    last: i64,
    additions: u64,
    deletions: u64,
}

/// Score every `.py` file touched by `commits`.
///
/// # Examples
///
/// ```
/// use modgraph_gitpulse::hotspots::{analyze_history, ChangeClass, HistoryOptions};
/// use modgraph_gitpulse::mining::{ChangeStatus, CommitInfo, FileChange};
///
/// let commits = vec![CommitInfo {
///     hash: "abc12345".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: 1_700_000_000,
///     message: "tweak".into(),
///     files_changed: vec![FileChange {
///         path: "app.py".into(),
///         lines_added: 4,
///         lines_deleted: 1,
///         status: ChangeStatus::Modified,
///     }],
/// }];
/// let analysis = analyze_history(&commits, &HistoryOptions::default());
/// let app = analysis.file("app.py").unwrap();
/// assert_eq!(app.total_churn, 5);
/// assert_eq!(app.change_classification, ChangeClass::VeryHigh);
/// ```
pub fn analyze_history(commits: &[CommitInfo], options: &HistoryOptions) -> HistoryAnalysis {
    let total_commits = commits.len();
    let days = options.days.max(1) as f64;

    let mut stats: BTreeMap<String, Accumulator> = BTreeMap::new();
    for commit in commits {
        for change in &commit.files_changed {
            if !change.path.ends_with(".py") {
                continue;
            }
            let entry = stats.entry(change.path.clone()).or_insert(Accumulator {
                first: commit.timestamp,
                last: commit.timestamp,
                ..Accumulator::default()
            });
            entry.count += 1;
            entry.first = entry.first.min(commit.timestamp);
            entry.last = entry.last.max(commit.timestamp);
            entry.additions += change.lines_added;
            entry.deletions += change.lines_deleted;
        }
    }

    let files: BTreeMap<String, FileHistory> = stats
        .into_iter()
        .map(|(path, acc)| {
            let total_churn = acc.additions + acc.deletions;
            let frequency = frequency_score(acc.count, total_commits, days);
            let hotspot_score = (0.7 * frequency
                + 0.3 * (total_churn as f64 / CHURN_SATURATION).min(1.0))
            .min(1.0);
            let history = FileHistory {
                path: path.clone(),
                change_count: acc.count,
                first_modified: iso_time(acc.first),
                last_modified: iso_time(acc.last),
                additions: acc.additions,
                deletions: acc.deletions,
                total_churn,
                avg_churn_per_commit: total_churn as f64 / acc.count as f64,
                change_frequency_score: frequency,
                change_classification: ChangeClass::from_frequency(frequency),
                churn_classification: ChangeClass::from_churn(total_churn),
                hotspot_score,
            };
            (path, history)
        })
        .collect();

    let mut hotspots: Vec<&FileHistory> = files
        .values()
        .filter(|f| f.hotspot_score >= options.hotspot_threshold)
        .collect();
    hotspots.sort_by(|a, b| {
        b.hotspot_score
            .partial_cmp(&a.hotspot_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut stable: Vec<&FileHistory> = files
        .values()
        .filter(|f| f.hotspot_score <= options.stable_threshold)
        .collect();
    stable.sort_by(|a, b| {
        a.hotspot_score
            .partial_cmp(&b.hotspot_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });

    let hotspots = hotspots.into_iter().map(|f| f.path.clone()).collect();
    let stable_files = stable.into_iter().map(|f| f.path.clone()).collect();

    HistoryAnalysis {
        available: true,
        analysis_days: options.days,
        total_commits,
        files,
        hotspots,
        stable_files,
    }
}

/// Share of all commits touching the file, blended with its daily change
/// rate (saturating at two changes per day).
fn frequency_score(count: u32, total_commits: usize, days: f64) -> f64 {
    if total_commits == 0 {
        return 0.0;
    }
    let share = count as f64 / total_commits as f64;
    let rate = (count as f64 / days / 2.0).min(1.0);
    (0.7 * share + 0.3 * rate).min(1.0)
}

fn iso_time(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::{ChangeStatus, FileChange};

    fn make_commit(timestamp: i64, files: Vec<(&str, u64, u64)>) -> CommitInfo {
        CommitInfo {
            hash: format!("{timestamp:08x}"),
            author: "alice".into(),
            email: "alice@example.com".into(),
            timestamp,
            message: "test commit".into(),
            files_changed: files
                .into_iter()
                .map(|(path, added, deleted)| FileChange {
                    path: path.into(),
                    lines_added: added,
                    lines_deleted: deleted,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn frequency_blends_share_and_rate() {
        // 2 of 4 commits over 30 days: 0.7 * 0.5 + 0.3 * (2 / 30 / 2)
        let score = frequency_score(2, 4, 30.0);
        assert!((score - (0.35 + 0.01)).abs() < 1e-12);
        assert_eq!(frequency_score(0, 0, 30.0), 0.0);
        // saturates
        assert_eq!(frequency_score(100, 100, 1.0), 1.0);
    }

    #[test]
    fn classifications_cover_boundaries() {
        assert_eq!(ChangeClass::from_frequency(0.7), ChangeClass::VeryHigh);
        assert_eq!(ChangeClass::from_frequency(0.5), ChangeClass::High);
        assert_eq!(ChangeClass::from_frequency(0.3), ChangeClass::Medium);
        assert_eq!(ChangeClass::from_frequency(0.1), ChangeClass::Low);
        assert_eq!(ChangeClass::from_frequency(0.09), ChangeClass::VeryLow);

        assert_eq!(ChangeClass::from_churn(1000), ChangeClass::VeryHigh);
        assert_eq!(ChangeClass::from_churn(500), ChangeClass::High);
        assert_eq!(ChangeClass::from_churn(100), ChangeClass::Medium);
        assert_eq!(ChangeClass::from_churn(10), ChangeClass::Low);
        assert_eq!(ChangeClass::from_churn(9), ChangeClass::VeryLow);
    }

    #[test]
    fn accumulates_per_file_history() {
        let commits = vec![
            make_commit(1_700_100_000, vec![("app.py", 10, 2), ("README.md", 5, 0)]),
            make_commit(1_700_000_000, vec![("app.py", 4, 4), ("util.py", 1, 0)]),
        ];
        let analysis = analyze_history(&commits, &HistoryOptions::default());

        assert!(analysis.available);
        assert_eq!(analysis.total_commits, 2);
        assert_eq!(analysis.files.len(), 2, "non-python files are ignored");

        let app = analysis.file("app.py").unwrap();
        assert_eq!(app.change_count, 2);
        assert_eq!(app.additions, 14);
        assert_eq!(app.deletions, 6);
        assert_eq!(app.total_churn, 20);
        assert_eq!(app.avg_churn_per_commit, 10.0);
        assert_eq!(app.first_modified, "2023-11-14T22:13:20Z");
        assert_eq!(app.last_modified, "2023-11-16T02:00:00Z");
        assert_eq!(app.churn_classification, ChangeClass::Low);
    }

    #[test]
    fn hotspots_and_stable_files_are_ranked() {
        let mut commits: Vec<CommitInfo> = (0..9)
            .map(|i| make_commit(1_700_000_000 + i, vec![("hot.py", 200, 100)]))
            .collect();
        commits.push(make_commit(1_700_000_100, vec![("warm.py", 50, 0), ("cold.py", 1, 0)]));

        let analysis = analyze_history(&commits, &HistoryOptions::default());

        let hot = analysis.file("hot.py").unwrap();
        // 0.7 * (0.7 * 0.9 + 0.3 * 0.15) + 0.3 * 1.0
        assert!((hot.hotspot_score - 0.7725).abs() < 1e-9);
        assert_eq!(hot.churn_classification, ChangeClass::VeryHigh);
        assert_eq!(analysis.hotspots, vec!["hot.py"]);

        // cold: 0.7 * (0.7 * 0.1 + 0.3 / 60) + 0.3 * 0.001 = 0.0528
        // warm: the same frequency plus 0.3 * 0.05 = 0.0675
        assert_eq!(analysis.stable_files, vec!["cold.py", "warm.py"]);
        let stable = analysis.stable_file_histories();
        assert!(stable[0].hotspot_score < stable[1].hotspot_score);
        assert_eq!(analysis.hotspot_files()[0].path, "hot.py");
    }

    #[test]
    fn custom_thresholds_apply() {
        let commits = vec![make_commit(1_700_000_000, vec![("a.py", 1, 0)])];
        let opts = HistoryOptions {
            days: 30,
            hotspot_threshold: 0.9,
            stable_threshold: 0.0,
        };
        let analysis = analyze_history(&commits, &opts);
        assert!(analysis.hotspots.is_empty());
        assert!(analysis.stable_files.is_empty());
    }

    #[test]
    fn no_commits_gives_empty_available_analysis() {
        let analysis = analyze_history(&[], &HistoryOptions::default());
        assert!(analysis.available);
        assert_eq!(analysis.total_commits, 0);
        assert!(analysis.files.is_empty());
        assert!(analysis.hotspots.is_empty());
    }

    #[test]
    fn zero_day_window_does_not_divide_by_zero() {
        let commits = vec![make_commit(1_700_000_000, vec![("a.py", 1, 0)])];
        let opts = HistoryOptions {
            days: 0,
            ..HistoryOptions::default()
        };
        let analysis = analyze_history(&commits, &opts);
        assert!(analysis.file("a.py").unwrap().change_frequency_score.is_finite());
    }

    #[test]
    fn unavailable_serializes_with_flag() {
        let json = serde_json::to_value(HistoryAnalysis::unavailable(14)).unwrap();
        assert_eq!(json["available"], false);
        assert_eq!(json["analysisDays"], 14);
        assert!(json["hotspots"].as_array().unwrap().is_empty());
    }
}
