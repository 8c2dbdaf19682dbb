// Diagram generation: Mermaid and Graphviz DOT
//
// Both formatters emit nodes in the graph's stable order with ids derived
// from the template path, then the edges. Missing targets get their own
// styling so broken references stand out in the rendered diagram.

use crate::analysis::{AnalysisResult, DependencyGraph, EdgeKind, NodeId};
use crate::parser::TemplateKind;

/// Renders the dependency graph as a Mermaid flowchart
#[derive(Debug)]
pub struct MermaidFormatter {
    direction: String,
}

impl MermaidFormatter {
    pub fn new() -> Self {
        Self {
            direction: "TD".to_string(),
        }
    }

    /// Set layout direction ('TD', 'LR', 'BT', 'RL')
    pub fn with_direction(mut self, direction: &str) -> Self {
        self.direction = direction.to_string();
        self
    }

    pub fn format(&self, result: &AnalysisResult) -> String {
        let graph = &result.graph;
        let mut lines = vec![format!("graph {}", self.direction)];

        for (id, node) in graph.nodes() {
            let class = if !node.discovered {
                ":::missing"
            } else {
                node_class(node.kind)
            };
            lines.push(format!(
                "    {}[\"{}\"]{}",
                mermaid_id(graph, id),
                node.id,
                class
            ));
        }

        for edge in graph.edges() {
            let arrow = if edge.optional { "-.->" } else { "-->" };
            lines.push(format!(
                "    {} {}|{}| {}",
                mermaid_id(graph, edge.from),
                arrow,
                edge.kind.label(),
                mermaid_id(graph, edge.to)
            ));
        }

        lines.push(String::new());
        lines.push("classDef layout fill:#e1f5fe,stroke:#01579b".to_string());
        lines.push("classDef partial fill:#f3e5f5,stroke:#4a148c".to_string());
        lines.push("classDef shortcode fill:#e8f5e8,stroke:#2e7d32".to_string());
        lines.push("classDef baseof fill:#fff3e0,stroke:#e65100".to_string());
        lines.push("classDef block fill:#fffde7,stroke:#f57f17".to_string());
        lines.push("classDef missing fill:#ffebee,stroke:#b71c1c,stroke-dasharray: 5 5".to_string());

        lines.join("\n")
    }
}

impl Default for MermaidFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the dependency graph as Graphviz DOT
#[derive(Debug)]
pub struct DotFormatter {
    rankdir: String,
}

impl DotFormatter {
    pub fn new() -> Self {
        Self {
            rankdir: "TB".to_string(),
        }
    }

    /// Set graph direction ('TB', 'LR', 'BT', 'RL')
    pub fn with_rankdir(mut self, rankdir: &str) -> Self {
        self.rankdir = rankdir.to_string();
        self
    }

    pub fn format(&self, result: &AnalysisResult) -> String {
        let graph = &result.graph;
        let mut lines = Vec::new();

        lines.push("digraph hugo_dependencies {".to_string());
        lines.push(format!("    rankdir = {};", self.rankdir));
        lines.push("    node [fontname=\"Arial\", fontsize=10];".to_string());
        lines.push("    edge [fontname=\"Arial\", fontsize=8];".to_string());
        lines.push(String::new());

        for (id, node) in graph.nodes() {
            let (shape, fill) = if !node.discovered {
                ("box", "#ffebee")
            } else {
                dot_style(node.kind)
            };
            lines.push(format!(
                "    {} [label=\"{}\", shape={}, style=filled, fillcolor=\"{}\"];",
                dot_id(graph, id),
                node.id,
                shape,
                fill
            ));
        }
        lines.push(String::new());

        for edge in graph.edges() {
            let style = if edge.optional { "dashed" } else { "solid" };
            let color = edge_color(edge.kind);
            lines.push(format!(
                "    {} -> {} [label=\"{}\", style={}, color=\"{}\"];",
                dot_id(graph, edge.from),
                dot_id(graph, edge.to),
                edge.kind.label(),
                style,
                color
            ));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }
}

impl Default for DotFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn node_class(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Layout => ":::layout",
        TemplateKind::Partial => ":::partial",
        TemplateKind::Shortcode => ":::shortcode",
        TemplateKind::Baseof => ":::baseof",
        TemplateKind::BlockDefinition => ":::block",
    }
}

fn dot_style(kind: TemplateKind) -> (&'static str, &'static str) {
    match kind {
        TemplateKind::Layout => ("box", "#e6f3ff"),
        TemplateKind::Partial => ("ellipse", "#ffe6e6"),
        TemplateKind::Shortcode => ("diamond", "#e6ffe6"),
        TemplateKind::Baseof => ("box", "#fff3e0"),
        TemplateKind::BlockDefinition => ("diamond", "#e8f5e8"),
    }
}

fn edge_color(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Partial => "#2196f3",
        EdgeKind::PartialCached => "#009688",
        EdgeKind::Template => "#607d8b",
        EdgeKind::BlockOverride => "#ff9800",
        EdgeKind::ShortcodeCall => "#9c27b0",
    }
}

/// Diagram-safe identifier derived from the node's path
fn sanitize_id(id: &str) -> String {
    let mut out: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "n_");
    }
    out
}

fn mermaid_id(graph: &DependencyGraph, node: NodeId) -> String {
    sanitize_id(&graph.node(node).id)
}

fn dot_id(graph: &DependencyGraph, node: NodeId) -> String {
    sanitize_id(&graph.node(node).id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DiagnosticsChecker, GraphBuilder, ModuleMap};
    use std::collections::HashMap;

    fn result_from(builder: GraphBuilder) -> AnalysisResult {
        let graph = builder.finish();
        let diagnostics = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        AnalysisResult {
            graph,
            diagnostics,
            module_map: ModuleMap::empty(),
            parse_errors: HashMap::new(),
        }
    }

    fn sample() -> AnalysisResult {
        let mut b = GraphBuilder::new();
        let index = b.add_template("index.html", TemplateKind::Layout);
        let header = b.add_template("partials/header.html", TemplateKind::Partial);
        let ghost = b.add_stub("partials/ghost.html");
        b.add_edge(index, header, EdgeKind::Partial, 1, String::new(), false, false, false, true);
        b.add_edge(index, ghost, EdgeKind::Partial, 2, String::new(), true, false, false, false);
        result_from(b)
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("partials/header.html"), "partials_header_html");
        assert_eq!(sanitize_id("404.html"), "n_404_html");
    }

    #[test]
    fn test_mermaid_output() {
        let out = MermaidFormatter::new().format(&sample());
        assert!(out.starts_with("graph TD"));
        assert!(out.contains("index_html[\"index.html\"]:::layout"));
        assert!(out.contains("partials_header_html[\"partials/header.html\"]:::partial"));
        assert!(out.contains(":::missing"));
        assert!(out.contains("index_html -->|partial| partials_header_html"));
        // optional edge rendered dashed
        assert!(out.contains("index_html -.->|partial| partials_ghost_html"));
        assert!(out.contains("classDef missing"));
    }

    #[test]
    fn test_mermaid_direction() {
        let out = MermaidFormatter::new().with_direction("LR").format(&sample());
        assert!(out.starts_with("graph LR"));
    }

    #[test]
    fn test_dot_output() {
        let out = DotFormatter::new().format(&sample());
        assert!(out.starts_with("digraph hugo_dependencies {"));
        assert!(out.ends_with('}'));
        assert!(out.contains("rankdir = TB;"));
        assert!(out.contains("index_html [label=\"index.html\", shape=box"));
        assert!(out.contains("shape=ellipse"));
        assert!(out.contains("style=dashed"));
        assert!(out.contains("index_html -> partials_header_html [label=\"partial\""));
    }

    #[test]
    fn test_dot_missing_node_styled() {
        let out = DotFormatter::new().format(&sample());
        assert!(out.contains("fillcolor=\"#ffebee\""));
    }
}
