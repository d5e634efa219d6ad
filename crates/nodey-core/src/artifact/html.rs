//! Self-contained HTML viewer for an emitted diagram.
//!
//! The page carries no network assets. The diagram JSON is embedded in a
//! `<script type="application/json">` block and laid out client-side from
//! the advisory node positions; when every node sits at the origin a
//! layered fallback layout is computed from the connections instead.

use crate::models::Diagram;
use crate::steps::StepError;

const DATA_SLOT: &str = "__NODEY_DIAGRAM__";
const TITLE_SLOT: &str = "__NODEY_TITLE__";

pub fn render(diagram: &Diagram) -> Result<String, StepError> {
    let json = serde_json::to_string(diagram)
        .map_err(|e| StepError::Io(format!("Failed to serialize diagram: {}", e)))?;
    let title = if diagram.overview.title.is_empty() {
        "Nodey".to_string()
    } else {
        escape_html(&diagram.overview.title)
    };
    Ok(TEMPLATE
        .replace(TITLE_SLOT, &title)
        .replace(DATA_SLOT, &embed_json(&json)))
}

/// Keep embedded JSON from closing the surrounding script element.
fn embed_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>__NODEY_TITLE__</title>
<style>
  :root { --bg: #0f1117; --panel: #181b24; --line: #3a3f4f; --text: #e6e8ef; --muted: #8a90a2;
          --start: #3b82f6; --trigger: #a855f7; --action: #64748b; --decision: #f59e0b; --end: #10b981;
          --yes: #22c55e; --no: #ef4444; --out: #6b7280; }
  * { box-sizing: border-box; }
  body { margin: 0; height: 100vh; display: flex; font-family: -apple-system, "Segoe UI", sans-serif;
         background: var(--bg); color: var(--text); overflow: hidden; }
  #viewport { flex: 1; position: relative; overflow: hidden; cursor: grab; }
  #viewport.dragging { cursor: grabbing; }
  #stage { position: absolute; left: 0; top: 0; transform-origin: 0 0; }
  #edges { position: absolute; left: 0; top: 0; overflow: visible; pointer-events: none; }
  .node { position: absolute; width: 180px; min-height: 56px; padding: 8px 10px; border-radius: 8px;
          background: var(--panel); border: 2px solid var(--action); cursor: pointer; font-size: 13px; }
  .node .kind { font-size: 10px; text-transform: uppercase; letter-spacing: .08em; color: var(--muted); }
  .node.selected { box-shadow: 0 0 0 3px #ffffff55; }
  .node.start { border-color: var(--start); }
  .node.trigger { border-color: var(--trigger); }
  .node.decision { border-color: var(--decision); border-style: dashed; }
  .node.end { border-color: var(--end); }
  .edge-label { font-size: 11px; font-weight: 600; }
  #inspector { width: 300px; background: var(--panel); border-left: 1px solid var(--line); padding: 16px;
               overflow-y: auto; }
  #inspector h1 { font-size: 16px; margin: 0 0 4px; }
  #inspector h2 { font-size: 13px; color: var(--muted); margin: 18px 0 6px; text-transform: uppercase; }
  #inspector p { font-size: 13px; line-height: 1.5; white-space: pre-wrap; margin: 0; }
  #hint { position: absolute; bottom: 10px; left: 12px; font-size: 11px; color: var(--muted); }
</style>
</head>
<body>
<div id="viewport">
  <div id="stage"><svg id="edges"></svg></div>
  <div id="hint">drag to pan &middot; scroll to zoom &middot; click a node for notes</div>
</div>
<aside id="inspector">
  <h1 id="flow-title"></h1>
  <p id="flow-summary"></p>
  <h2>Node</h2>
  <div id="node-detail"><p>Select a node.</p></div>
</aside>
<script type="application/json" id="flow-data">__NODEY_DIAGRAM__</script>
<script>
(function () {
  var data = JSON.parse(document.getElementById("flow-data").textContent);
  var nodes = data.nodes || [];
  var links = data.connections || [];
  var W = 180, H = 56;

  document.getElementById("flow-title").textContent = (data.overview && data.overview.title) || "Untitled flow";
  document.getElementById("flow-summary").textContent = (data.overview && data.overview.summary) || "";

  var byId = {};
  nodes.forEach(function (n) { byId[n.id] = n; });

  if (nodes.every(function (n) { return !n.x && !n.y; })) {
    var incoming = {};
    links.forEach(function (c) { incoming[c.to] = true; });
    var depth = {};
    var queue = nodes.filter(function (n) { return !incoming[n.id]; }).map(function (n) { return n.id; });
    if (!queue.length && nodes.length) { queue = [nodes[0].id]; }
    queue.forEach(function (id) { depth[id] = 0; });
    while (queue.length) {
      var id = queue.shift();
      links.forEach(function (c) {
        if (c.from === id && depth[c.to] === undefined) { depth[c.to] = depth[id] + 1; queue.push(c.to); }
      });
    }
    var rows = {};
    nodes.forEach(function (n) {
      var d = depth[n.id] === undefined ? 0 : depth[n.id];
      rows[d] = (rows[d] || 0);
      n.x = rows[d] * 240;
      n.y = d * 140;
      rows[d] += 1;
    });
  }

  var minX = Math.min.apply(null, nodes.map(function (n) { return n.x || 0; }).concat([0]));
  var minY = Math.min.apply(null, nodes.map(function (n) { return n.y || 0; }).concat([0]));
  nodes.forEach(function (n) { n.x = (n.x || 0) - minX + 40; n.y = (n.y || 0) - minY + 40; });

  var stage = document.getElementById("stage");
  var svg = document.getElementById("edges");
  var detail = document.getElementById("node-detail");
  var selected = null;

  function text(tag, value) { var el = document.createElement(tag); el.textContent = value; return el; }

  function inspect(n, el) {
    if (selected) { selected.classList.remove("selected"); }
    selected = el;
    el.classList.add("selected");
    detail.innerHTML = "";
    detail.appendChild(text("h1", n.title || n.id));
    detail.appendChild(text("h2", n.type));
    detail.appendChild(text("p", n.notes || "No notes."));
  }

  nodes.forEach(function (n) {
    var el = document.createElement("div");
    el.className = "node " + n.type;
    el.style.left = n.x + "px";
    el.style.top = n.y + "px";
    el.appendChild(text("div", n.type)).className = "kind";
    el.appendChild(text("div", n.title || n.id));
    el.addEventListener("mousedown", function (e) { e.stopPropagation(); });
    el.addEventListener("click", function () { inspect(n, el); });
    stage.appendChild(el);
  });

  var colors = { yes: "var(--yes)", no: "var(--no)", out: "var(--out)" };
  var NS = "http://www.w3.org/2000/svg";
  links.forEach(function (c) {
    var a = byId[c.from], b = byId[c.to];
    if (!a || !b) { return; }
    var kind = c.type || "out";
    var x1 = a.x + W / 2, y1 = a.y + H, x2 = b.x + W / 2, y2 = b.y;
    var bend = Math.max(40, Math.abs(y2 - y1) / 2);
    var path = document.createElementNS(NS, "path");
    path.setAttribute("d", "M" + x1 + "," + y1 + " C" + x1 + "," + (y1 + bend) + " " + x2 + "," + (y2 - bend) + " " + x2 + "," + y2);
    path.setAttribute("fill", "none");
    path.setAttribute("stroke", colors[kind] || colors.out);
    path.setAttribute("stroke-width", "2");
    svg.appendChild(path);
    if (kind !== "out") {
      var label = document.createElementNS(NS, "text");
      label.setAttribute("x", (x1 + x2) / 2 + 6);
      label.setAttribute("y", (y1 + y2) / 2);
      label.setAttribute("fill", colors[kind]);
      label.setAttribute("class", "edge-label");
      label.textContent = kind.toUpperCase();
      svg.appendChild(label);
    }
  });

  var viewport = document.getElementById("viewport");
  var view = { x: 0, y: 0, k: 1 }, drag = null;
  function apply() { stage.style.transform = "translate(" + view.x + "px," + view.y + "px) scale(" + view.k + ")"; }
  viewport.addEventListener("mousedown", function (e) {
    drag = { x: e.clientX - view.x, y: e.clientY - view.y };
    viewport.classList.add("dragging");
  });
  window.addEventListener("mousemove", function (e) {
    if (!drag) { return; }
    view.x = e.clientX - drag.x; view.y = e.clientY - drag.y; apply();
  });
  window.addEventListener("mouseup", function () { drag = null; viewport.classList.remove("dragging"); });
  viewport.addEventListener("wheel", function (e) {
    e.preventDefault();
    var rect = viewport.getBoundingClientRect();
    var px = e.clientX - rect.left, py = e.clientY - rect.top;
    var k = Math.min(3, Math.max(0.2, view.k * (e.deltaY < 0 ? 1.1 : 0.9)));
    view.x = px - (px - view.x) * (k / view.k);
    view.y = py - (py - view.y) * (k / view.k);
    view.k = k;
    apply();
  }, { passive: false });
  apply();
})();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, NodeKind, Overview};

    fn diagram(title: &str, notes: &str) -> Diagram {
        Diagram {
            overview: Overview {
                title: title.to_string(),
                summary: String::new(),
            },
            nodes: vec![
                Node::new("a", NodeKind::Start, "Begin").with_notes(notes),
                Node::new("b", NodeKind::End, "Finish"),
            ],
            connections: Vec::new(),
        }
    }

    #[test]
    fn test_render_embeds_diagram() {
        let page = render(&diagram("Order Flow", "")).unwrap();
        assert!(page.contains("<title>Order Flow</title>"));
        assert!(page.contains(r#""id":"a""#));
        assert!(!page.contains(DATA_SLOT));
        assert!(!page.contains("http://cdn") && !page.contains("https://"));
    }

    #[test]
    fn test_render_escapes_script_close() {
        let page = render(&diagram("<b>Flow</b>", "ends with </script><script>alert(1)")).unwrap();
        assert!(page.contains("<title>&lt;b&gt;Flow&lt;/b&gt;</title>"));
        assert!(page.contains(r#"ends with <\/script>"#));
        assert_eq!(page.matches("</script>").count(), 2);
    }
}
