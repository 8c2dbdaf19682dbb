// Text tree rendering of the dependency graph
//
// Prints each root template (no incoming edges) with its dependencies
// indented beneath it, then a diagnostics section. Nodes already expanded
// elsewhere are marked instead of re-expanded, so cyclic graphs terminate.

use crate::analysis::{AnalysisResult, DependencyGraph, EdgeKind, NodeId, Severity};
use std::collections::HashSet;

/// Renders the dependency graph as an indented text tree
#[derive(Debug, Default)]
pub struct TreeFormatter;

impl TreeFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, result: &AnalysisResult) -> String {
        let graph = &result.graph;
        let mut lines = Vec::new();
        let mut expanded: HashSet<NodeId> = HashSet::new();

        let roots: Vec<NodeId> = graph
            .nodes()
            .filter(|(id, _)| graph.edges_to(*id).next().is_none())
            .map(|(id, _)| id)
            .collect();

        for &root in &roots {
            expanded.insert(root);
            lines.push(node_line(graph, root));
            self.render_children(graph, root, "", &mut expanded, &mut lines);
        }

        // Anything unreachable from a root sits inside a cycle; list it flat
        let unreached: Vec<NodeId> = graph
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| !expanded.contains(id) && !roots.contains(id))
            .filter(|id| graph.edges_from(*id).next().is_some())
            .collect();
        for id in unreached {
            if expanded.insert(id) {
                lines.push(node_line(graph, id));
                self.render_children(graph, id, "", &mut expanded, &mut lines);
            }
        }

        let stats = graph.stats();
        lines.push(String::new());
        lines.push(format!(
            "{} templates ({} discovered, {} missing), {} dependencies",
            stats.nodes, stats.discovered, stats.stubs, stats.edges
        ));

        if !result.diagnostics.is_empty() {
            lines.push(String::new());
            lines.push("Diagnostics:".to_string());
            for diagnostic in &result.diagnostics {
                let severity = match diagnostic.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                };
                lines.push(format!("  {severity}: {}", diagnostic.message));
            }
        }

        lines.join("\n")
    }

    fn render_children(
        &self,
        graph: &DependencyGraph,
        node: NodeId,
        prefix: &str,
        expanded: &mut HashSet<NodeId>,
        lines: &mut Vec<String>,
    ) {
        let edges: Vec<_> = graph.edges_from(node).collect();
        let count = edges.len();

        for (i, edge) in edges.into_iter().enumerate() {
            let last = i + 1 == count;
            let branch = if last { "└── " } else { "├── " };
            let child_prefix = if last {
                format!("{prefix}    ")
            } else {
                format!("{prefix}│   ")
            };

            let mut line = format!("{prefix}{branch}{}", node_line(graph, edge.to));
            let mut flags = Vec::new();
            if edge.kind == EdgeKind::Template {
                flags.push("template");
            }
            if edge.kind == EdgeKind::BlockOverride {
                flags.push("overrides block");
            }
            if edge.cached {
                flags.push("cached");
            }
            if edge.optional {
                flags.push("optional");
            }
            if edge.fallback {
                flags.push("fallback");
            }
            if !edge.resolved {
                flags.push("missing");
            }
            if !flags.is_empty() {
                line.push_str(&format!(" ({})", flags.join(", ")));
            }
            lines.push(line);

            if expanded.insert(edge.to) {
                self.render_children(graph, edge.to, &child_prefix, expanded, lines);
            } else if graph.edges_from(edge.to).next().is_some() {
                lines.push(format!("{child_prefix}└── ..."));
            }
        }
    }
}

fn node_line(graph: &DependencyGraph, node: NodeId) -> String {
    let n = graph.node(node);
    format!("{} [{}]", n.id, n.kind.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DiagnosticsChecker, GraphBuilder, ModuleMap};
    use crate::parser::TemplateKind;
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

    #[test]
    fn test_simple_tree() {
        let mut b = GraphBuilder::new();
        let index = b.add_template("index.html", TemplateKind::Layout);
        let header = b.add_template("partials/header.html", TemplateKind::Partial);
        b.add_edge(index, header, EdgeKind::Partial, 1, String::new(), false, false, false, true);

        let out = TreeFormatter::new().format(&result_from(b));
        assert!(out.contains("index.html [layout]"));
        assert!(out.contains("└── partials/header.html [partial]"));
        assert!(out.contains("2 templates (2 discovered, 0 missing), 1 dependencies"));
    }

    #[test]
    fn test_missing_and_optional_flags() {
        let mut b = GraphBuilder::new();
        let index = b.add_template("index.html", TemplateKind::Layout);
        let ghost = b.add_stub("partials/ghost.html");
        b.add_edge(index, ghost, EdgeKind::Partial, 1, String::new(), true, false, false, false);

        let out = TreeFormatter::new().format(&result_from(b));
        assert!(out.contains("(optional, missing)"));
        assert!(out.contains("Diagnostics:"));
        assert!(out.contains("error: Missing target"));
    }

    #[test]
    fn test_cached_flag() {
        let mut b = GraphBuilder::new();
        let index = b.add_template("index.html", TemplateKind::Layout);
        let foot = b.add_template("partials/footer.html", TemplateKind::Partial);
        b.add_edge(index, foot, EdgeKind::PartialCached, 1, String::new(), false, false, true, true);

        let out = TreeFormatter::new().format(&result_from(b));
        assert!(out.contains("(cached)"));
    }

    #[test]
    fn test_fallback_flag() {
        let mut b = GraphBuilder::new();
        let index = b.add_template("index.html", TemplateKind::Layout);
        let def = b.add_template("partials/default.html", TemplateKind::Partial);
        b.add_edge(index, def, EdgeKind::Partial, 4, String::new(), false, true, false, true);

        let out = TreeFormatter::new().format(&result_from(b));
        assert!(out.contains("(fallback)"));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let p = b.add_template("partials/b.html", TemplateKind::Partial);
        b.add_edge(a, p, EdgeKind::Partial, 1, String::new(), false, false, false, true);
        b.add_edge(p, a, EdgeKind::Partial, 1, String::new(), false, false, false, true);

        // Must not recurse forever
        let out = TreeFormatter::new().format(&result_from(b));
        assert!(out.contains("..."));
    }

    #[test]
    fn test_shared_child_not_reexpanded() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let c = b.add_template("c.html", TemplateKind::Layout);
        let shared = b.add_template("partials/shared.html", TemplateKind::Partial);
        let inner = b.add_template("partials/inner.html", TemplateKind::Partial);
        b.add_edge(a, shared, EdgeKind::Partial, 1, String::new(), false, false, false, true);
        b.add_edge(c, shared, EdgeKind::Partial, 1, String::new(), false, false, false, true);
        b.add_edge(shared, inner, EdgeKind::Partial, 1, String::new(), false, false, false, true);

        let out = TreeFormatter::new().format(&result_from(b));
        // inner is expanded once, the second visit collapses to "..."
        assert_eq!(out.matches("partials/inner.html").count(), 1);
        assert!(out.contains("..."));
    }
}
