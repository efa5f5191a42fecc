//! Transition graph of a machine definition, rendered as Mermaid text or
//! as an HTML page.
//!
//! Built from the edges declared on the builder (see
//! [`Machine::graph`](crate::runtime::Machine::graph)); handlers are never
//! run to discover transitions.

use serde::Serialize;
use std::fmt::Write as _;

/// Node standing for run termination.
pub const TERMINAL_NODE: &str = "Terminated";

/// How a transition is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EdgeKind {
    /// Ordinary transition from a receiver or a delayed transition.
    Continue,
    /// Redirect taken when a guard fails.
    Guard,
}

/// Directed graph of state names.
///
/// Nodes and edges keep insertion order; duplicates are ignored.
///
/// ```rust
/// use stagehand::graph::{EdgeKind, Graph};
///
/// let mut graph = Graph::new();
/// graph.set_initial_node("Idle");
/// graph.add_edge("Idle", "Active", EdgeKind::Continue);
/// graph.add_edge("Active", "Idle", EdgeKind::Guard);
///
/// assert_eq!(
///     graph.to_mermaid(),
///     "graph TD\n  Idle\n  Active\n  Idle --> Active\n  Active o.-> Idle\n  \
///      style Idle fill:#9f9,stroke:#333,stroke-width:4px\n"
/// );
/// ```
#[derive(Clone, Debug, Default, Serialize)]
pub struct Graph {
    nodes: Vec<String>,
    continue_edges: Vec<(String, Vec<String>)>,
    guard_edges: Vec<(String, Vec<String>)>,
    initial_node: Option<String>,
    terminal_node: Option<String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_initial_node(&mut self, node: &str) {
        self.initial_node = Some(node.to_string());
        self.add_node(node);
    }

    pub fn set_terminal_node(&mut self, node: &str) {
        self.terminal_node = Some(node.to_string());
        self.add_node(node);
    }

    pub fn add_node(&mut self, node: &str) {
        if !self.nodes.iter().any(|existing| existing == node) {
            self.nodes.push(node.to_string());
        }
    }

    /// Add an edge, adding both endpoints as nodes.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: EdgeKind) {
        self.add_node(from);
        self.add_node(to);

        let edges = match kind {
            EdgeKind::Continue => &mut self.continue_edges,
            EdgeKind::Guard => &mut self.guard_edges,
        };
        let index = match edges.iter().position(|(source, _)| source == from) {
            Some(index) => index,
            None => {
                edges.push((from.to_string(), Vec::new()));
                edges.len() - 1
            }
        };
        let targets = &mut edges[index].1;
        if !targets.iter().any(|existing| existing == to) {
            targets.push(to.to_string());
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn initial_node(&self) -> Option<&str> {
        self.initial_node.as_deref()
    }

    pub fn terminal_node(&self) -> Option<&str> {
        self.terminal_node.as_deref()
    }

    /// Targets reachable from `from` by edges of `kind`.
    pub fn successors(&self, from: &str, kind: EdgeKind) -> Vec<&str> {
        let edges = match kind {
            EdgeKind::Continue => &self.continue_edges,
            EdgeKind::Guard => &self.guard_edges,
        };
        edges
            .iter()
            .filter(|(source, _)| source == from)
            .flat_map(|(_, targets)| targets.iter().map(String::as_str))
            .collect()
    }

    pub fn to_mermaid(&self) -> String {
        let mut mermaid = String::from("graph TD\n");
        for node in &self.nodes {
            let _ = writeln!(mermaid, "  {node}");
        }
        for (from, targets) in &self.continue_edges {
            for to in targets {
                let _ = writeln!(mermaid, "  {from} --> {to}");
            }
        }
        for (from, targets) in &self.guard_edges {
            for to in targets {
                let _ = writeln!(mermaid, "  {from} o.-> {to}");
            }
        }
        if let Some(initial) = &self.initial_node {
            let _ = writeln!(
                mermaid,
                "  style {initial} fill:#9f9,stroke:#333,stroke-width:4px"
            );
        }
        if let Some(terminal) = &self.terminal_node {
            let _ = writeln!(
                mermaid,
                "  style {terminal} fill:#f99,stroke:#333,stroke-width:4px"
            );
        }
        mermaid
    }

    /// Standalone HTML page that renders the Mermaid diagram in a browser.
    ///
    /// The Mermaid script is loaded from a CDN.
    pub fn to_html(&self) -> String {
        let diagram = escape_html(&self.to_mermaid());
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <style type="text/css">
      .mermaid {{
        height: 100dvh;
        width: 100dvw;
      }}
    </style>
  </head>
  <body>
    <pre class="mermaid">
{diagram}</pre>
    <script type="module">
      import mermaid from 'https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs';
      mermaid.initialize({{ startOnLoad: true }});
    </script>
  </body>
</html>
"#
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
