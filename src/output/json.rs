// JSON output following the nodes/edges/metadata graph shape
//
// Output is deterministic: nodes and edges come out in the graph's stable
// order and aggregate counts use sorted maps, so two runs over the same
// site produce byte-identical JSON.

use crate::analysis::AnalysisResult;
use crate::error::Result;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const SCHEMA_VERSION: &str = "1.0";

/// Renders an analysis result as a JSON document
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, result: &AnalysisResult) -> Result<String> {
        let graph = &result.graph;

        let nodes: Vec<Value> = graph
            .nodes()
            .map(|(_, node)| {
                json!({
                    "id": node.id,
                    "type": node.kind.label(),
                    "discovered": node.discovered,
                    "defined_blocks": node.defined_blocks,
                })
            })
            .collect();

        let edges: Vec<Value> = graph
            .edges()
            .map(|edge| {
                json!({
                    "source": graph.node(edge.from).id,
                    "target": graph.node(edge.to).id,
                    "relationship": edge.kind.label(),
                    "line": edge.line,
                    "context": edge.context,
                    "optional": edge.optional,
                    "fallback": edge.fallback,
                    "cached": edge.cached,
                    "resolved": edge.resolved,
                })
            })
            .collect();

        let dynamic: Vec<Value> = graph
            .dynamic_targets()
            .iter()
            .map(|d| {
                json!({
                    "source": graph.node(d.from).id,
                    "expression": d.expression,
                    "line": d.line,
                })
            })
            .collect();

        let invalid: Vec<Value> = graph
            .invalid_targets()
            .iter()
            .map(|i| {
                json!({
                    "source": graph.node(i.from).id,
                    "target": i.raw,
                    "line": i.line,
                    "reason": i.reason,
                })
            })
            .collect();

        let document = json!({
            "schema_version": SCHEMA_VERSION,
            "graph_type": "hugo_template_dependencies",
            "nodes": nodes,
            "edges": edges,
            "dynamic_targets": dynamic,
            "invalid_targets": invalid,
            "diagnostics": result.diagnostics,
            "statistics": self.statistics(result),
            "metadata": {
                "generator": "hugo-deps",
                "totalNodes": graph.node_count(),
                "totalEdges": graph.edge_count(),
            },
        });

        Ok(serde_json::to_string_pretty(&document)?)
    }

    fn statistics(&self, result: &AnalysisResult) -> Value {
        let graph = &result.graph;
        let stats = graph.stats();

        let mut node_types: BTreeMap<&str, usize> = BTreeMap::new();
        for (_, node) in graph.nodes() {
            *node_types.entry(node.kind.label()).or_default() += 1;
        }

        let mut edge_kinds: BTreeMap<&str, usize> = BTreeMap::new();
        for edge in graph.edges() {
            *edge_kinds.entry(edge.kind.label()).or_default() += 1;
        }

        let cycle_count = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == crate::analysis::DiagnosticKind::CircularDependency)
            .count();

        json!({
            "total_nodes": stats.nodes,
            "total_edges": stats.edges,
            "discovered": stats.discovered,
            "stubs": stats.stubs,
            "node_types": node_types,
            "edge_kinds": edge_kinds,
            "has_cycles": cycle_count > 0,
            "cycle_count": cycle_count,
        })
    }
}
