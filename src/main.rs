use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use modgraph_core::{ModgraphConfig, OutputFormat};
use modgraph_report::graph_data::{GraphData, NodeData};
use modgraph_report::{analyze_project, write_outputs, Analysis, WrittenFiles};
use modgraph_scan::output::{format_cycles, format_ranking};

#[derive(Parser)]
#[command(
    name = "modgraph",
    version,
    about = "Python import-graph analyzer",
    long_about = "Analyze a Python project's import graph.\n\n\
                   Ranks modules by PageRank importance, finds circular imports, measures\n\
                   complexity and git churn, and renders an interactive D3 dependency graph.\n\n\
                   Examples:\n  \
                     modgraph analyze --path .          Write graph_data.json and the HTML graph\n  \
                     modgraph rank --limit 10           Most important modules\n  \
                     modgraph cycles --format json      Circular imports as JSON\n  \
                     modgraph hotspots --since 90       Churn and performance hotspots"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .modgraph.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full analysis and write the JSON data and HTML graph
    #[command(long_about = "Run the full analysis and write the JSON data and HTML graph.\n\n\
        Scans every Python file, resolves imports, ranks modules, detects cycles,\n\
        computes code metrics and mines git history, then writes graph_data.json\n\
        and dependency_graph.html into the output directory.\n\n\
        Examples:\n  modgraph analyze --path .\n  modgraph analyze --output docs/graph --since 90\n  modgraph analyze --no-git")]
    Analyze {
        /// Project path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Output directory (default: graph_output)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Git history window in days (default: 30)
        #[arg(long)]
        since: Option<u64>,

        /// Skip git history analysis
        #[arg(long)]
        no_git: bool,
    },
    /// List modules by importance
    #[command(long_about = "List modules by PageRank importance.\n\n\
        Importance is normalized so the most imported-upon module scores 1.0.\n\n\
        Examples:\n  modgraph rank\n  modgraph rank --limit 50 --format markdown")]
    Rank {
        /// Project path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Maximum modules to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// List circular imports
    #[command(long_about = "List circular imports.\n\n\
        Each cycle is a strongly connected group of modules that import each other\n\
        directly or indirectly. Exits successfully whether or not cycles exist.")]
    Cycles {
        /// Project path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,
    },
    /// Show git churn hotspots and performance hotspots
    #[command(long_about = "Show git churn hotspots and performance hotspots.\n\n\
        Git hotspots change often and heavily within the history window.\n\
        Performance hotspots score high on complexity, nesting and heavy operations.\n\n\
        Examples:\n  modgraph hotspots\n  modgraph hotspots --since 180 --limit 10")]
    Hotspots {
        /// Project path (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Git history window in days (default: 30)
        #[arg(long)]
        since: Option<u64>,

        /// Maximum entries per list (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Create a default .modgraph.toml configuration file
    #[command(long_about = "Create a default .modgraph.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .modgraph.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mmodgraph\x1b[0m v{version}: see how your Python modules depend on each other\n");

        println!("Quick start:");
        println!("  \x1b[36mmodgraph init\x1b[0m                 Create a .modgraph.toml config file");
        println!("  \x1b[36mmodgraph analyze --path .\x1b[0m     Write the interactive dependency graph\n");

        println!("All commands:");
        println!("  \x1b[32manalyze\x1b[0m   Full analysis, JSON data and HTML graph");
        println!("  \x1b[32mrank\x1b[0m      Modules by PageRank importance");
        println!("  \x1b[32mcycles\x1b[0m    Circular imports");
        println!("  \x1b[32mhotspots\x1b[0m  Git churn and performance hotspots");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("modgraph v{version}: see how your Python modules depend on each other\n");

        println!("Quick start:");
        println!("  modgraph init                 Create a .modgraph.toml config file");
        println!("  modgraph analyze --path .     Write the interactive dependency graph\n");

        println!("All commands:");
        println!("  analyze   Full analysis, JSON data and HTML graph");
        println!("  rank      Modules by PageRank importance");
        println!("  cycles    Circular imports");
        println!("  hotspots  Git churn and performance hotspots");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'modgraph <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ModgraphConfig> {
    let config = match path {
        Some(path) => ModgraphConfig::from_file(path)
            .wrap_err(format!("loading {}", path.display()))?,
        None => {
            let default_path = Path::new(".modgraph.toml");
            if default_path.exists() {
                ModgraphConfig::from_file(default_path).wrap_err("loading .modgraph.toml")?
            } else {
                ModgraphConfig::default()
            }
        }
    };
    Ok(config)
}

fn ensure_project_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        miette::bail!(miette::miette!(
            help = "Pass --path pointing at the root of a Python project",
            "Project directory not found: {}",
            path.display()
        ));
    }
    Ok(())
}

fn spinner(message: &'static str) -> Result<Option<indicatif::ProgressBar>> {
    if !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .into_diagnostic()?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(Some(pb))
}

fn run_analysis(path: &Path, config: &ModgraphConfig) -> Result<Analysis> {
    let spinner = spinner("Analyzing Python modules...")?;
    let analysis = analyze_project(path, config).inspect_err(|_e| {
        if let Some(pb) = &spinner {
            pb.finish_with_message("Failed");
        }
    })?;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(analysis)
}

fn print_analysis_summary(data: &GraphData, written: &WrittenFiles, format: OutputFormat) -> Result<()> {
    let s = &data.statistics;
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "statistics": s,
                "dataFile": written.data_file.display().to_string(),
                "htmlFile": written.html_file.display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Import Graph Analysis\n");
            println!("| Metric | Value |");
            println!("|--------|-------|");
            println!("| Modules | {} |", s.total_files);
            println!("| Dependencies | {} |", s.total_dependencies);
            println!("| Cross-folder dependencies | {} |", s.cross_folder_dependencies);
            println!("| Test modules | {} |", s.test_files);
            println!("| Cycles | {} |", s.cycle_count);
            println!("| Modules in cycles | {} |", s.modules_in_cycles);
            println!("| Git hotspots | {} |", s.git_hotspots);
            println!("| Performance hotspots | {} |", s.performance_hotspots);
            println!();
            println!("Data: `{}`  ", written.data_file.display());
            println!("Graph: `{}`", written.html_file.display());
        }
        OutputFormat::Text => {
            println!("Analyzed {} Python modules in {} folders", s.total_files, s.folder_count);
            println!(
                "  dependencies:  {} ({} cross-folder)",
                s.total_dependencies, s.cross_folder_dependencies
            );
            println!(
                "  cycles:        {} ({} modules)",
                s.cycle_count, s.modules_in_cycles
            );
            if s.files_with_parse_errors > 0 {
                println!("  syntax errors: {} files", s.files_with_parse_errors);
            }
            if s.git_available {
                println!(
                    "  git history:   {} commits in {} days, {} hotspots, {} stable",
                    s.total_commits, s.analysis_days, s.git_hotspots, s.stable_files
                );
            } else {
                println!("  git history:   unavailable");
            }
            println!("  perf hotspots: {}", s.performance_hotspots);
            println!();
            println!("Wrote {}", written.data_file.display());
            println!("Wrote {}", written.html_file.display());
        }
    }
    Ok(())
}

fn print_hotspots(analysis: &Analysis, limit: usize, format: OutputFormat) -> Result<()> {
    let git: Vec<_> = analysis.history.hotspot_files().into_iter().take(limit).collect();
    let perf: Vec<&NodeData> = analysis
        .data
        .performance_hotspots()
        .into_iter()
        .take(limit)
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "gitAvailable": analysis.history.available,
                "analysisDays": analysis.history.analysis_days,
                "totalCommits": analysis.history.total_commits,
                "gitHotspots": git,
                "performanceHotspots": perf,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Hotspots\n");
            println!("## Git churn\n");
            if !analysis.history.available {
                println!("Git history unavailable.\n");
            } else if git.is_empty() {
                println!("No git hotspots in the last {} days.\n", analysis.history.analysis_days);
            } else {
                println!("| File | Score | Changes | Churn | Frequency |");
                println!("|------|-------|---------|-------|-----------|");
                for f in &git {
                    println!(
                        "| `{}` | {:.2} | {} | {} | {} |",
                        f.path, f.hotspot_score, f.change_count, f.total_churn, f.change_classification
                    );
                }
                println!();
            }
            println!("## Performance\n");
            if perf.is_empty() {
                println!("No performance hotspots.");
            } else {
                println!("| Module | Score | Complexity | Nesting | Heavy ops |");
                println!("|--------|-------|------------|---------|-----------|");
                for n in &perf {
                    println!(
                        "| `{}` | {:.2} | {} | {} | {} |",
                        n.id, n.performance_score, n.cyclomatic_complexity, n.max_nesting_depth, n.heavy_operations
                    );
                }
            }
        }
        OutputFormat::Text => {
            if !analysis.history.available {
                println!("Git history unavailable.");
            } else if git.is_empty() {
                println!("No git hotspots in the last {} days.", analysis.history.analysis_days);
            } else {
                println!(
                    "Git hotspots ({} commits, last {} days):",
                    analysis.history.total_commits, analysis.history.analysis_days
                );
                for f in &git {
                    println!(
                        "  {:.2}  {}  ({} changes, churn {}, {})",
                        f.hotspot_score, f.path, f.change_count, f.total_churn, f.change_classification
                    );
                }
            }
            println!();
            if perf.is_empty() {
                println!("No performance hotspots.");
            } else {
                println!("Performance hotspots:");
                for n in &perf {
                    println!(
                        "  {:.2}  {}  (complexity {}, nesting {}, heavy ops {})",
                        n.performance_score, n.id, n.cyclomatic_complexity, n.max_nesting_depth, n.heavy_operations
                    );
                }
            }
        }
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# modgraph configuration

[scan]
# exclude_folders = ["__pycache__"]
# exclude_patterns = ["migrations/**", "**/conftest.py"]
# respect_gitignore = true
# max_file_size = 1048576

[ranking]
# damping = 0.85
# max_iterations = 50
# tolerance = 1e-6

[history]
# enabled = true
# since_days = 30
# max_files_per_commit = 50
# branch = "main"
# hotspot_threshold = 0.5
# stable_threshold = 0.1

[metrics]
# hotspot_threshold = 0.6

[output]
# directory = "graph_output"
# data_file = "graph_data.json"
# html_file = "dependency_graph.html"
# title = "Dependency Graph"
# d3_url = "https://d3js.org/d3.v7.min.js"
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    let command = match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Init) => {
            let path = Path::new(".modgraph.toml");
            if path.exists() {
                miette::bail!(".modgraph.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .modgraph.toml with default configuration");
            return Ok(());
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "modgraph", &mut std::io::stdout());
            return Ok(());
        }
        Some(command) => command,
    };

    let mut config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match command {
        Command::Analyze {
            ref path,
            ref output,
            since,
            no_git,
        } => {
            ensure_project_dir(path)?;
            if let Some(days) = since {
                config.history.since_days = days;
            }
            if no_git {
                config.history.enabled = false;
            }
            let dir = output.clone().unwrap_or_else(|| config.output.directory.clone());

            let analysis = run_analysis(path, &config)?;
            let written = write_outputs(&analysis.data, &dir, &config.output)
                .wrap_err(format!("writing reports to {}", dir.display()))?;
            print_analysis_summary(&analysis.data, &written, cli.format)?;
        }
        Command::Rank { ref path, limit } => {
            ensure_project_dir(path)?;
            let (graph, _) = modgraph_scan::scan_project(path, &config)?;
            print!("{}", format_ranking(&graph, limit, cli.format)?);
        }
        Command::Cycles { ref path } => {
            ensure_project_dir(path)?;
            let (graph, _) = modgraph_scan::scan_project(path, &config)?;
            print!("{}", format_cycles(&graph, cli.format)?);
        }
        Command::Hotspots {
            ref path,
            since,
            limit,
        } => {
            ensure_project_dir(path)?;
            if let Some(days) = since {
                config.history.since_days = days;
            }
            config.history.enabled = true;

            let analysis = run_analysis(path, &config)?;
            print_hotspots(&analysis, limit, cli.format)?;
        }
        Command::Init | Command::Completions { .. } => unreachable!(),
    }

    Ok(())
}
