use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ModgraphError;

/// Top-level configuration loaded from `.modgraph.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use modgraph_core::ModgraphConfig;
///
/// let config = ModgraphConfig::default();
/// assert_eq!(config.ranking.damping, 0.85);
/// assert_eq!(config.history.since_days, 30);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModgraphConfig {
    /// Which files are scanned.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Importance ranking parameters.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Git history analysis settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Code metric thresholds.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Where and how the graph files are written.
    #[serde(default)]
    pub output: OutputConfig,
}

impl ModgraphConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ModgraphError::Io`] if the file cannot be read,
    /// [`ModgraphError::Toml`] if the content is not valid TOML, or
    /// [`ModgraphError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modgraph_core::ModgraphConfig;
    /// use std::path::Path;
    ///
    /// let config = ModgraphConfig::from_file(Path::new(".modgraph.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ModgraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ModgraphError::Toml`] if parsing fails, or
    /// [`ModgraphError::Config`] if validation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use modgraph_core::ModgraphConfig;
    ///
    /// let toml = r#"
    /// [history]
    /// since_days = 90
    /// "#;
    /// let config = ModgraphConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.history.since_days, 90);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ModgraphError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that numeric settings are within their meaningful ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ModgraphError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ModgraphError> {
        let ranking = &self.ranking;
        if !(ranking.damping > 0.0 && ranking.damping < 1.0) {
            return Err(ModgraphError::Config(format!(
                "ranking.damping must be in (0, 1), got {}",
                ranking.damping
            )));
        }
        if ranking.max_iterations == 0 {
            return Err(ModgraphError::Config(
                "ranking.max_iterations must be at least 1".into(),
            ));
        }
        if ranking.tolerance <= 0.0 || !ranking.tolerance.is_finite() {
            return Err(ModgraphError::Config(format!(
                "ranking.tolerance must be positive, got {}",
                ranking.tolerance
            )));
        }

        let thresholds = [
            ("history.hotspot_threshold", self.history.hotspot_threshold),
            ("history.stable_threshold", self.history.stable_threshold),
            ("metrics.hotspot_threshold", self.metrics.hotspot_threshold),
        ];
        for (key, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModgraphError::Config(format!(
                    "{key} must be in [0, 1], got {value}"
                )));
            }
        }

        if self.history.max_files_per_commit == Some(0) {
            return Err(ModgraphError::Config(
                "history.max_files_per_commit must be at least 1 when set".into(),
            ));
        }

        Ok(())
    }
}

/// File discovery settings.
///
/// # Examples
///
/// ```
/// use modgraph_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.exclude_folders, vec!["__pycache__".to_string()]);
/// assert!(config.respect_gitignore);
/// assert_eq!(config.max_file_size, 1_048_576);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names skipped wherever they appear in a path.
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    /// Glob patterns matched against root-relative paths.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Honor `.gitignore` files (default: true).
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
    /// Files larger than this many bytes are skipped (default: 1 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_exclude_folders() -> Vec<String> {
    vec!["__pycache__".into()]
}

fn default_true() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    1_048_576
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_folders: default_exclude_folders(),
            exclude_patterns: Vec::new(),
            respect_gitignore: true,
            max_file_size: default_max_file_size(),
        }
    }
}

/// PageRank-style importance parameters.
///
/// # Examples
///
/// ```
/// use modgraph_core::RankingConfig;
///
/// let config = RankingConfig::default();
/// assert_eq!(config.max_iterations, 50);
/// assert_eq!(config.tolerance, 1e-6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Probability of following an import rather than jumping (default: 0.85).
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Upper bound on power iterations (default: 50).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Stop when no score moves by more than this (default: 1e-6).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_damping() -> f64 {
    0.85
}

fn default_max_iterations() -> usize {
    50
}

fn default_tolerance() -> f64 {
    1e-6
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

/// Git history analysis settings.
///
/// # Examples
///
/// ```
/// use modgraph_core::HistoryConfig;
///
/// let config = HistoryConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.since_days, 30);
/// assert_eq!(config.hotspot_threshold, 0.5);
/// assert_eq!(config.stable_threshold, 0.1);
/// assert!(config.max_files_per_commit.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Mine git history at all (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rolling window in days (default: 30).
    #[serde(default = "default_since_days")]
    pub since_days: u64,
    /// Skip commits touching more files than this (default: no limit).
    pub max_files_per_commit: Option<usize>,
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Minimum hotspot score for a file to be reported as a hotspot.
    #[serde(default = "default_history_hotspot_threshold")]
    pub hotspot_threshold: f64,
    /// Maximum hotspot score for a file to be reported as stable.
    #[serde(default = "default_stable_threshold")]
    pub stable_threshold: f64,
}

fn default_since_days() -> u64 {
    30
}

fn default_history_hotspot_threshold() -> f64 {
    0.5
}

fn default_stable_threshold() -> f64 {
    0.1
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            since_days: default_since_days(),
            max_files_per_commit: None,
            branch: None,
            hotspot_threshold: default_history_hotspot_threshold(),
            stable_threshold: default_stable_threshold(),
        }
    }
}

/// Code metric thresholds.
///
/// # Examples
///
/// ```
/// use modgraph_core::MetricsConfig;
///
/// assert_eq!(MetricsConfig::default().hotspot_threshold, 0.6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Performance score above which a module counts as a hotspot (default: 0.6).
    #[serde(default = "default_metrics_hotspot_threshold")]
    pub hotspot_threshold: f64,
}

fn default_metrics_hotspot_threshold() -> f64 {
    0.6
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hotspot_threshold: default_metrics_hotspot_threshold(),
        }
    }
}

/// Output file settings.
///
/// # Examples
///
/// ```
/// use modgraph_core::OutputConfig;
/// use std::path::PathBuf;
///
/// let config = OutputConfig::default();
/// assert_eq!(config.directory, PathBuf::from("graph_output"));
/// assert_eq!(config.html_file, "dependency_graph.html");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the generated files (default: `graph_output`).
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// File name of the JSON dump (default: `graph_data.json`).
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// File name of the HTML page (default: `dependency_graph.html`).
    #[serde(default = "default_html_file")]
    pub html_file: String,
    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,
    /// Where the page loads D3 from.
    #[serde(default = "default_d3_url")]
    pub d3_url: String,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("graph_output")
}

fn default_data_file() -> String {
    "graph_data.json".into()
}

fn default_html_file() -> String {
    "dependency_graph.html".into()
}

fn default_title() -> String {
    "Dependency Graph".into()
}

fn default_d3_url() -> String {
    "https://d3js.org/d3.v7.min.js".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            data_file: default_data_file(),
            html_file: default_html_file(),
            title: default_title(),
            d3_url: default_d3_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = ModgraphConfig::default();
        assert_eq!(config.scan.exclude_folders, vec!["__pycache__"]);
        assert!(config.scan.exclude_patterns.is_empty());
        assert_eq!(config.ranking.damping, 0.85);
        assert_eq!(config.ranking.max_iterations, 50);
        assert!(config.history.enabled);
        assert_eq!(config.history.since_days, 30);
        assert!(config.history.branch.is_none());
        assert_eq!(config.metrics.hotspot_threshold, 0.6);
        assert_eq!(config.output.data_file, "graph_data.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ModgraphConfig::from_toml("").unwrap();
        assert_eq!(config.ranking.damping, 0.85);
        assert_eq!(config.output.title, "Dependency Graph");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[scan]
exclude_folders = ["__pycache__", "build"]
exclude_patterns = ["migrations/**"]
respect_gitignore = false

[ranking]
damping = 0.9
max_iterations = 100

[history]
since_days = 90
max_files_per_commit = 40
branch = "main"

[metrics]
hotspot_threshold = 0.5

[output]
directory = "out"
title = "My Project"
"#;
        let config = ModgraphConfig::from_toml(toml).unwrap();
        assert_eq!(config.scan.exclude_folders, vec!["__pycache__", "build"]);
        assert_eq!(config.scan.exclude_patterns, vec!["migrations/**"]);
        assert!(!config.scan.respect_gitignore);
        assert_eq!(config.ranking.damping, 0.9);
        assert_eq!(config.ranking.max_iterations, 100);
        assert_eq!(config.ranking.tolerance, 1e-6);
        assert_eq!(config.history.since_days, 90);
        assert_eq!(config.history.max_files_per_commit, Some(40));
        assert_eq!(config.history.branch.as_deref(), Some("main"));
        assert_eq!(config.metrics.hotspot_threshold, 0.5);
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.output.title, "My Project");
        assert_eq!(config.output.html_file, "dependency_graph.html");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = ModgraphConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(ModgraphError::Toml(_))));
    }

    #[test]
    fn damping_out_of_range_is_rejected() {
        let result = ModgraphConfig::from_toml("[ranking]\ndamping = 1.0\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("ranking.damping"));
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let result = ModgraphConfig::from_toml("[ranking]\nmax_iterations = 0\n");
        assert!(matches!(result, Err(ModgraphError::Config(_))));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let result = ModgraphConfig::from_toml("[history]\nhotspot_threshold = 1.5\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("history.hotspot_threshold"));
    }

    #[test]
    fn zero_commit_limit_is_rejected() {
        let result = ModgraphConfig::from_toml("[history]\nmax_files_per_commit = 0\n");
        assert!(matches!(result, Err(ModgraphError::Config(_))));
    }
}
