use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let files = [
        ("main.py", "from pkg import a\n"),
        ("pkg/__init__.py", ""),
        ("pkg/a.py", "from . import b\n\ndef f(x):\n    if x:\n        return 1\n"),
        ("pkg/b.py", "from .a import f\n"),
        ("pkg/c.py", "import json\n"),
    ];
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn modgraph(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modgraph"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "modgraph failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn no_subcommand_prints_welcome() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout(&modgraph(dir.path(), &["--color", "never"]));
    assert!(out.contains("Quick start:"));
    assert!(out.contains("modgraph analyze --path ."));
}

#[test]
fn analyze_writes_json_and_html() {
    let dir = project();
    let out = stdout(&modgraph(
        dir.path(),
        &["analyze", "--no-git", "--output", "report", "--format", "json"],
    ));

    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["statistics"]["totalFiles"], 5);
    assert_eq!(summary["statistics"]["cycleCount"], 1);
    assert_eq!(summary["statistics"]["gitAvailable"], false);

    let data = fs::read_to_string(dir.path().join("report/graph_data.json")).unwrap();
    let data: serde_json::Value = serde_json::from_str(&data).unwrap();
    assert_eq!(data["nodes"].as_array().unwrap().len(), 5);
    assert_eq!(data["cycles"][0][0], "pkg/a.py");

    let html = fs::read_to_string(dir.path().join("report/dependency_graph.html")).unwrap();
    assert!(html.contains("<title>Dependency Graph</title>"));
}

#[test]
fn analyze_uses_config_file_output_settings() {
    let dir = project();
    fs::write(
        dir.path().join(".modgraph.toml"),
        "[history]\nenabled = false\n\n[output]\ndirectory = \"graphs\"\ntitle = \"Shop\"\n",
    )
    .unwrap();

    stdout(&modgraph(dir.path(), &["analyze"]));
    let html = fs::read_to_string(dir.path().join("graphs/dependency_graph.html")).unwrap();
    assert!(html.contains("<title>Shop</title>"));
}

#[test]
fn rank_lists_modules_by_importance() {
    let dir = project();
    let out = stdout(&modgraph(dir.path(), &["rank", "--limit", "3", "--format", "json"]));
    let rows: serde_json::Value = serde_json::from_str(&out).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["importance"], 1.0);
}

#[test]
fn cycles_reports_the_loop_and_exits_zero() {
    let dir = project();
    let out = stdout(&modgraph(dir.path(), &["cycles"]));
    assert!(out.contains("pkg/a.py"));
    assert!(out.contains("pkg/b.py"));

    fs::write(dir.path().join("pkg/b.py"), "import json\n").unwrap();
    let out = stdout(&modgraph(dir.path(), &["cycles"]));
    assert_eq!(out, "No circular imports found.\n");
}

#[test]
fn hotspots_without_git_still_lists_performance() {
    let dir = project();
    let out = stdout(&modgraph(dir.path(), &["hotspots", "--format", "json"]));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["gitAvailable"], false);
    assert!(json["performanceHotspots"].is_array());
}

#[test]
fn missing_path_fails_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let output = modgraph(dir.path(), &["rank", "--path", "does-not-exist"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does-not-exist"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = project();
    fs::write(dir.path().join("bad.toml"), "[ranking]\ndamping = 2.0\n").unwrap();
    let output = modgraph(dir.path(), &["rank", "--config", "bad.toml"]);
    assert!(!output.status.success());
}
