//! Integration test: walk → parse → resolve → rank → format on a small
//! Python project built in a temp dir.

use std::fs;
use std::path::Path;

use modgraph_core::{ModgraphConfig, OutputFormat};
use modgraph_scan::output::{format_cycles, format_ranking};
use modgraph_scan::scan_project;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "main.py",
        "import os\nfrom shop import orders\nfrom shop.models import Product\n\nif __name__ == '__main__':\n    orders.run()\n",
    );
    write(root, "shop/__init__.py", "");
    write(
        root,
        "shop/models.py",
        "from .db import session\n\nclass Product:\n    pass\n",
    );
    write(
        root,
        "shop/orders.py",
        "from . import models\nfrom .db import session\n\ndef run():\n    for p in session.query():\n        if p:\n            print(p)\n",
    );
    write(
        root,
        "shop/db.py",
        "import json\nfrom .orders import run\n\nsession = None\n",
    );
    write(
        root,
        "tests/test_orders.py",
        "from shop.orders import run\n\ndef test_run():\n    run()\n",
    );
    write(root, "broken.py", "import shop.db\ndef oops(:\n    pass\n");
    write(root, "shop/__pycache__/stale.py", "import main\n");

    dir
}

#[test]
fn end_to_end_on_fixture_project() {
    let dir = fixture();
    let (graph, stats) = scan_project(dir.path(), &ModgraphConfig::default()).unwrap();

    assert_eq!(graph.len(), 7, "__pycache__ must be excluded");
    assert!(stats.iterations >= 1);

    assert_eq!(
        graph.internal_imports("main.py"),
        vec!["shop/models.py", "shop/orders.py"]
    );
    assert_eq!(
        graph.internal_imports("shop/orders.py"),
        vec!["shop/db.py", "shop/models.py"]
    );
    assert_eq!(graph.internal_imports("broken.py"), vec!["shop/db.py"]);

    // stdlib imports stay on the node but add no edge
    let main = graph.node("main.py").unwrap();
    assert!(main.imports.iter().any(|i| i.module == "os"));

    let broken = graph.node("broken.py").unwrap();
    assert!(broken.parse_errors);
    assert!(!main.parse_errors);

    let test_module = graph.node("tests/test_orders.py").unwrap();
    assert!(test_module.info.is_test);

    let orders = graph.node("shop/orders.py").unwrap();
    assert_eq!(orders.metrics.function_count, 1);
    assert_eq!(orders.metrics.max_nesting_depth, 3);

    // models -> db -> orders -> models
    let cycles = graph.cycles();
    assert_eq!(cycles.len(), 1);
    let ids: Vec<&str> = cycles[0].iter().map(|n| n.info.id.as_str()).collect();
    assert_eq!(ids, vec!["shop/db.py", "shop/models.py", "shop/orders.py"]);
    assert!(!graph.in_cycle("main.py"));

    let top = graph.ranked_modules()[0];
    assert_eq!(top.importance, 1.0);
    assert!(top.info.id.starts_with("shop/"));

    let text = format_ranking(&graph, 5, OutputFormat::Text).unwrap();
    assert!(text.contains("Top 5 of 7 modules"));
    let json = format_cycles(&graph, OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

#[test]
fn exclude_patterns_from_config() {
    let dir = fixture();
    let config = ModgraphConfig::from_toml("[scan]\nexclude_patterns = [\"tests/**\"]\n").unwrap();
    let (graph, _) = scan_project(dir.path(), &config).unwrap();
    assert!(graph.node("tests/test_orders.py").is_none());
    assert_eq!(graph.len(), 6);
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = scan_project(&dir.path().join("absent"), &ModgraphConfig::default());
    assert!(result.is_err());
}
