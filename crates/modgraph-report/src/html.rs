//! Self-contained HTML page rendering.
//!
//! The page embeds the graph JSON and inline CSS/JS; layout is left to D3's
//! force simulation, loaded from the configured URL.

use modgraph_core::{ModgraphError, OutputConfig};

use crate::graph_data::GraphData;

/// Render the interactive dependency graph page.
///
/// # Errors
///
/// Returns [`ModgraphError::Serialization`] if the graph data cannot be
/// serialized.
pub fn render_html(data: &GraphData, config: &OutputConfig) -> Result<String, ModgraphError> {
    let json = embed_json(&serde_json::to_string(data)?);
    let title = html_escape(&config.title);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
    <script src="{d3_url}"></script>
</head>
<body>
    <header>
        <h1>{title}</h1>
        <div class="meta">{summary}</div>
    </header>
    <div class="layout">
        <aside>
            <section class="panel">
                <h2>Statistics</h2>
                <dl id="stats"></dl>
            </section>
            <section class="panel">
                <h2>Filters</h2>
                <label><input type="checkbox" id="hide-tests"> Hide test modules</label>
                <label><input type="checkbox" id="cycles-only"> Only modules in cycles</label>
                <label>Min importers <input type="range" id="min-preds" min="0" max="{max_preds}" value="0"></label>
                <label>Max size (KB) <input type="range" id="max-kb" min="0" max="{max_kb}" value="{max_kb}"></label>
                <input type="search" id="search" placeholder="Find module">
            </section>
            <section class="panel">
                <h2>Folders</h2>
                <ul id="legend"></ul>
            </section>
        </aside>
        <main><svg id="graph"></svg></main>
    </div>
    <div id="tooltip" class="tooltip"></div>
    <script id="graph-data" type="application/json">{json}</script>
    <script>{js}</script>
</body>
</html>"#,
        title = title,
        css = inline_css(),
        d3_url = html_escape(&config.d3_url),
        summary = summary_line(data),
        max_preds = data.limits.max_predecessors,
        max_kb = data.limits.max_size_kb,
        json = json,
        js = inline_javascript(),
    ))
}

fn summary_line(data: &GraphData) -> String {
    let s = &data.statistics;
    format!(
        "{} modules &middot; {} dependencies &middot; {} cycles",
        s.total_files, s.total_dependencies, s.cycle_count
    )
}

/// Keep embedded JSON from closing the surrounding `<script>` element.
fn embed_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    color: #111827;
    background: #ffffff;
}
header { padding: 1rem 1.5rem; border-bottom: 2px solid #e5e7eb; }
header h1 { font-size: 1.5rem; }
header .meta { color: #6b7280; font-size: 0.875rem; }
.layout { display: flex; height: calc(100vh - 5rem); }
aside { width: 280px; overflow-y: auto; padding: 1rem; border-right: 1px solid #e5e7eb; }
main { flex: 1; }
#graph { width: 100%; height: 100%; }
.panel { margin-bottom: 1.25rem; }
.panel h2 { font-size: 0.875rem; text-transform: uppercase; color: #6b7280; margin-bottom: 0.5rem; }
.panel label { display: block; font-size: 0.875rem; margin-bottom: 0.4rem; }
.panel input[type=search] { width: 100%; padding: 0.4rem; border: 1px solid #d1d5db; border-radius: 0.375rem; }
#stats { display: grid; grid-template-columns: 1fr auto; gap: 0.2rem 0.75rem; font-size: 0.8rem; }
#stats dd { font-weight: 600; text-align: right; }
#legend { list-style: none; font-size: 0.8rem; }
#legend li { display: flex; align-items: center; gap: 0.4rem; margin-bottom: 0.2rem; }
#legend .swatch { width: 0.8rem; height: 0.8rem; border-radius: 50%; }
.link { stroke: #9ca3af; stroke-opacity: 0.5; }
.link.cycle { stroke: #dc2626; stroke-opacity: 0.9; stroke-width: 2px; }
.node circle { stroke: #1f2937; stroke-width: 1px; cursor: pointer; }
.node.hotspot circle { stroke: #f97316; stroke-width: 3px; }
.node.dimmed { opacity: 0.15; }
.node text { font-size: 10px; pointer-events: none; fill: #374151; }
.tooltip {
    position: absolute; display: none; pointer-events: none;
    background: #111827; color: #f9fafb; padding: 0.6rem 0.8rem;
    border-radius: 0.375rem; font-size: 0.75rem; line-height: 1.4; max-width: 320px;
}
"#
}

fn inline_javascript() -> &'static str {
    r#"
(function() {
    const data = JSON.parse(document.getElementById('graph-data').textContent);
    const svg = d3.select('#graph');
    const tooltip = document.getElementById('tooltip');

    const stats = document.getElementById('stats');
    const rows = [
        ['Modules', data.statistics.totalFiles],
        ['Dependencies', data.statistics.totalDependencies],
        ['Cross-folder', data.statistics.crossFolderDependencies],
        ['Test modules', data.statistics.testFiles],
        ['Folders', data.statistics.folderCount],
        ['Cycles', data.statistics.cycleCount],
        ['Modules in cycles', data.statistics.modulesInCycles],
        ['Performance hotspots', data.statistics.performanceHotspots],
        ['Git history', data.statistics.gitAvailable ? data.statistics.analysisDays + ' days' : 'unavailable'],
        ['Git hotspots', data.statistics.gitHotspots],
        ['Stable files', data.statistics.stableFiles],
    ];
    for (const [label, value] of rows) {
        const dt = document.createElement('dt');
        dt.textContent = label;
        const dd = document.createElement('dd');
        dd.textContent = value;
        stats.append(dt, dd);
    }

    const legend = document.getElementById('legend');
    for (const [name, folder] of Object.entries(data.folders)) {
        const li = document.createElement('li');
        const swatch = document.createElement('span');
        swatch.className = 'swatch';
        swatch.style.background = folder.color;
        li.append(swatch, `${name} (${folder.count})`);
        legend.append(li);
    }

    const gitHotspots = new Set(data.history.hotspots);
    const nodes = data.nodes.map(n => Object.assign({}, n));
    const links = data.edges.map(e => Object.assign({}, e));
    const radius = n => 5 + 15 * n.importance;

    const root = svg.append('g');
    svg.call(d3.zoom().scaleExtent([0.1, 8]).on('zoom', ev => root.attr('transform', ev.transform)));

    svg.append('defs').append('marker')
        .attr('id', 'arrow').attr('viewBox', '0 -5 10 10').attr('refX', 10)
        .attr('markerWidth', 6).attr('markerHeight', 6).attr('orient', 'auto')
        .append('path').attr('d', 'M0,-5L10,0L0,5').attr('fill', '#9ca3af');

    const link = root.append('g').selectAll('line').data(links).join('line')
        .attr('class', d => d.inCycle ? 'link cycle' : 'link')
        .attr('marker-end', 'url(#arrow)');

    const node = root.append('g').selectAll('g').data(nodes).join('g')
        .attr('class', d => (d.isPerformanceHotspot || gitHotspots.has(d.id)) ? 'node hotspot' : 'node');
    node.append('circle').attr('r', radius).attr('fill', d => d.color);
    node.append('text').attr('dx', d => radius(d) + 2).attr('dy', 3).text(d => d.name);

    const simulation = d3.forceSimulation(nodes)
        .force('link', d3.forceLink(links).distance(60))
        .force('charge', d3.forceManyBody().strength(-120))
        .force('center', d3.forceCenter(0, 0))
        .force('collide', d3.forceCollide().radius(d => radius(d) + 4));

    node.call(d3.drag()
        .on('start', (ev, d) => { if (!ev.active) simulation.alphaTarget(0.3).restart(); d.fx = d.x; d.fy = d.y; })
        .on('drag', (ev, d) => { d.fx = ev.x; d.fy = ev.y; })
        .on('end', (ev, d) => { if (!ev.active) simulation.alphaTarget(0); d.fx = null; d.fy = null; }));

    simulation.on('tick', () => {
        link
            .attr('x1', d => d.source.x).attr('y1', d => d.source.y)
            .attr('x2', d => d.target.x).attr('y2', d => d.target.y);
        node.attr('transform', d => `translate(${d.x},${d.y})`);
    });

    const resize = () => {
        const box = svg.node().getBoundingClientRect();
        svg.attr('viewBox', [-box.width / 2, -box.height / 2, box.width, box.height]);
    };
    window.addEventListener('resize', resize);
    resize();

    node.on('mouseover', (ev, d) => {
        tooltip.innerHTML = '';
        const lines = [
            d.id,
            `importance ${d.importance.toFixed(3)}`,
            `imported by ${d.predecessors}, imports ${d.successors}`,
            `complexity ${d.cyclomaticComplexity}, functions ${d.functionCount}, nesting ${d.maxNestingDepth}`,
            `${d.codeLines} code lines, ${d.sizeKb.toFixed(1)} KB`,
            `performance ${d.performanceScore.toFixed(2)}`,
            `changes ${d.changeCount} (${d.changeClassification}), churn ${d.totalChurn}`,
        ];
        if (d.inCycle) lines.push('part of an import cycle');
        if (d.parseErrors) lines.push('syntax errors, imports may be partial');
        for (const text of lines) {
            const div = document.createElement('div');
            div.textContent = text;
            tooltip.append(div);
        }
        tooltip.style.display = 'block';
        tooltip.style.left = (ev.pageX + 12) + 'px';
        tooltip.style.top = (ev.pageY + 12) + 'px';
    }).on('mouseout', () => { tooltip.style.display = 'none'; });

    const controls = ['hide-tests', 'cycles-only', 'min-preds', 'max-kb', 'search']
        .map(id => document.getElementById(id));
    const applyFilters = () => {
        const [hideTests, cyclesOnly, minPreds, maxKb, search] = controls;
        const needle = search.value.trim().toLowerCase();
        const visible = d =>
            !(hideTests.checked && d.isTest) &&
            !(cyclesOnly.checked && !d.inCycle) &&
            d.predecessors >= Number(minPreds.value) &&
            d.sizeKb <= Number(maxKb.value);
        node.style('display', d => visible(d) ? null : 'none')
            .classed('dimmed', d => needle !== '' && !d.id.toLowerCase().includes(needle));
        link.style('display', d => visible(d.source) && visible(d.target) ? null : 'none');
    };
    controls.forEach(c => c.addEventListener('input', applyFilters));
})();
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_data::{Limits, Statistics};
    use modgraph_gitpulse::hotspots::HistoryAnalysis;
    use std::collections::BTreeMap;

    fn empty_data() -> GraphData {
        GraphData {
            nodes: Vec::new(),
            edges: Vec::new(),
            folders: BTreeMap::new(),
            cycles: Vec::new(),
            history: HistoryAnalysis::unavailable(30),
            statistics: Statistics::default(),
            limits: Limits::default(),
        }
    }

    #[test]
    fn page_embeds_data_and_d3() {
        let config = OutputConfig::default();
        let html = render_html(&empty_data(), &config).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<script src="https://d3js.org/d3.v7.min.js"></script>"#));
        assert!(html.contains("<title>Dependency Graph</title>"));
        assert!(html.contains(r#"id="graph-data" type="application/json">{"nodes":[]"#));
        assert!(html.contains("d3.forceSimulation"));
        assert!(html.contains(r#"max="100""#));
    }

    #[test]
    fn hotspot_highlight_follows_history_list() {
        let mut data = empty_data();
        data.history.hotspots.push("core/engine.py".into());
        let html = render_html(&data, &OutputConfig::default()).unwrap();

        assert!(html.contains(r#""hotspots":["core/engine.py"]"#));
        assert!(html.contains("new Set(data.history.hotspots)"));
        assert!(!html.contains("hotspotScore >="));
    }

    #[test]
    fn title_is_escaped() {
        let config = OutputConfig {
            title: "A <b>&</b> B".into(),
            ..OutputConfig::default()
        };
        let html = render_html(&empty_data(), &config).unwrap();
        assert!(html.contains("<title>A &lt;b&gt;&amp;&lt;/b&gt; B</title>"));
    }

    #[test]
    fn embedded_json_cannot_close_the_script() {
        let mut data = empty_data();
        data.cycles.push(vec!["</script><script>alert(1)</script>".into()]);
        let html = render_html(&data, &OutputConfig::default()).unwrap();

        assert_eq!(html.matches("</script>").count(), 3);
        assert!(html.contains(r#"<\/script><script>alert(1)<\/script>"#));
    }
}
