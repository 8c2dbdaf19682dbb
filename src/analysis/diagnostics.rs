// Structural checks over the finished graph
//
// Three independent checks: missing targets, circular dependencies among
// call edges, and deprecated/invalid path usage. Checks never short-circuit
// each other and never abort the run; everything surfaces as a Diagnostic
// in the result.

use crate::analysis::graph::{DependencyGraph, NodeId};
use crate::analysis::modules::ModuleMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingTarget,
    CircularDependency,
    DeprecatedInternal,
    InvalidPath,
    ModuleUnresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Where a diagnostic points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// A call site (or the template as a whole when line is None)
    Template { id: String, line: Option<usize> },
    /// A dependency cycle, first node repeated at the end
    Cycle { path: Vec<String> },
    /// Project-level condition with no single template
    Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

/// Runs the structural checks over a finished graph
pub struct DiagnosticsChecker<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> DiagnosticsChecker<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Run every check and collect the diagnostics
    pub fn run(&self, module_map: &ModuleMap) -> Vec<Diagnostic> {
        let mut diagnostics = self.missing_targets();
        diagnostics.extend(self.cycles());
        diagnostics.extend(self.deprecated_internal());
        diagnostics.extend(self.invalid_paths());
        diagnostics.extend(self.unresolved_modules(module_map));
        diagnostics
    }

    /// One MissingTarget per (from, to) pair, regardless of call count
    fn missing_targets(&self) -> Vec<Diagnostic> {
        let mut seen: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
        let mut out = Vec::new();

        for edge in self.graph.edges() {
            if edge.resolved || !seen.insert((edge.from, edge.to)) {
                continue;
            }
            let from = &self.graph.node(edge.from).id;
            let to = &self.graph.node(edge.to).id;
            out.push(Diagnostic {
                kind: DiagnosticKind::MissingTarget,
                severity: Severity::Error,
                message: format!("Missing target: {to} (referenced from {from})"),
                location: Location::Template {
                    id: from.clone(),
                    line: Some(edge.line),
                },
            });
        }
        out
    }

    /// One CircularDependency per distinct minimal cycle among call edges.
    ///
    /// The call-edge graph is condensed into strongly connected components
    /// first; cycles are then enumerated inside each non-trivial component
    /// with a DFS that only starts from the cycle's smallest node, so each
    /// rotation is reported exactly once.
    fn cycles(&self) -> Vec<Diagnostic> {
        let mut adjacency: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for edge in self.graph.edges() {
            if edge.kind.is_call() {
                adjacency.entry(edge.from).or_default().insert(edge.to);
            }
        }

        let mut pg: DiGraph<NodeId, ()> = DiGraph::new();
        let mut pg_index = HashMap::new();
        for &node in adjacency.keys().chain(adjacency.values().flatten()) {
            pg_index
                .entry(node)
                .or_insert_with(|| pg.add_node(node));
        }
        for (&from, targets) in &adjacency {
            for &to in targets {
                pg.add_edge(pg_index[&from], pg_index[&to], ());
            }
        }

        let mut components: Vec<Vec<NodeId>> = tarjan_scc(&pg)
            .into_iter()
            .map(|scc| scc.into_iter().map(|ix| pg[ix]).collect())
            .filter(|scc: &Vec<NodeId>| {
                scc.len() > 1
                    || scc.first().map_or(false, |&n| {
                        adjacency.get(&n).map_or(false, |t| t.contains(&n))
                    })
            })
            .collect();
        components.sort_by(|a, b| self.min_id(a).cmp(&self.min_id(b)));

        let mut out = Vec::new();
        for component in components {
            for cycle in self.cycles_in_component(&component, &adjacency) {
                out.push(Diagnostic {
                    kind: DiagnosticKind::CircularDependency,
                    severity: Severity::Error,
                    message: format!("Circular dependency: {}", cycle.join(" -> ")),
                    location: Location::Cycle { path: cycle },
                });
            }
        }
        out
    }

    fn min_id<'b>(&'b self, component: &[NodeId]) -> &'b str {
        component
            .iter()
            .map(|&n| self.graph.node(n).id.as_str())
            .min()
            .unwrap_or("")
    }

    fn cycles_in_component(
        &self,
        component: &[NodeId],
        adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>,
    ) -> Vec<Vec<String>> {
        let mut order: Vec<NodeId> = component.to_vec();
        order.sort_by(|&a, &b| self.graph.node(a).id.cmp(&self.graph.node(b).id));
        let rank: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let mut cycles = Vec::new();
        for (min_rank, &start) in order.iter().enumerate() {
            let mut path = vec![start];
            let mut on_path: HashSet<NodeId> = HashSet::from([start]);
            self.dfs_cycles(
                start, start, min_rank, &rank, adjacency, &mut path, &mut on_path, &mut cycles,
            );
        }
        cycles
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs_cycles(
        &self,
        current: NodeId,
        start: NodeId,
        min_rank: usize,
        rank: &HashMap<NodeId, usize>,
        adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>,
        path: &mut Vec<NodeId>,
        on_path: &mut HashSet<NodeId>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        let Some(targets) = adjacency.get(&current) else {
            return;
        };
        for &next in targets {
            if next == start {
                let mut ids: Vec<String> =
                    path.iter().map(|&n| self.graph.node(n).id.clone()).collect();
                ids.push(self.graph.node(start).id.clone());
                cycles.push(ids);
                continue;
            }
            let reachable = rank.get(&next).map_or(false, |&r| r > min_rank);
            if reachable && !on_path.contains(&next) {
                path.push(next);
                on_path.insert(next);
                self.dfs_cycles(next, start, min_rank, rank, adjacency, path, on_path, cycles);
                path.pop();
                on_path.remove(&next);
            }
        }
    }

    /// One DeprecatedInternal per distinct `_internal/` target
    fn deprecated_internal(&self) -> Vec<Diagnostic> {
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        let mut out = Vec::new();

        for edge in self.graph.edges() {
            let target = self.graph.node(edge.to);
            if !target.id.starts_with("_internal/") || !seen.insert(edge.to) {
                continue;
            }
            let from = &self.graph.node(edge.from).id;
            out.push(Diagnostic {
                kind: DiagnosticKind::DeprecatedInternal,
                severity: Severity::Warning,
                message: format!(
                    "Deprecated internal template: {} (first used in {})",
                    target.id, from
                ),
                location: Location::Template {
                    id: from.clone(),
                    line: Some(edge.line),
                },
            });
        }
        out
    }

    fn invalid_paths(&self) -> Vec<Diagnostic> {
        self.graph
            .invalid_targets()
            .iter()
            .map(|invalid| Diagnostic {
                kind: DiagnosticKind::InvalidPath,
                severity: Severity::Error,
                message: format!("Invalid path '{}': {}", invalid.raw, invalid.reason),
                location: Location::Template {
                    id: self.graph.node(invalid.from).id.clone(),
                    line: Some(invalid.line),
                },
            })
            .collect()
    }

    fn unresolved_modules(&self, module_map: &ModuleMap) -> Vec<Diagnostic> {
        module_map
            .unresolved
            .iter()
            .map(|module| Diagnostic {
                kind: DiagnosticKind::ModuleUnresolved,
                severity: Severity::Warning,
                message: format!("Module could not be resolved: {module}"),
                location: Location::Project,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::graph::{EdgeKind, GraphBuilder};
    use crate::parser::TemplateKind;

    fn call(builder: &mut GraphBuilder, from: NodeId, to: NodeId, line: usize, resolved: bool) {
        builder.add_edge(
            from,
            to,
            EdgeKind::Partial,
            line,
            String::new(),
            false,
            false,
            false,
            resolved,
        );
    }

    fn kinds(diags: &[Diagnostic], kind: DiagnosticKind) -> Vec<&Diagnostic> {
        diags.iter().filter(|d| d.kind == kind).collect()
    }

    #[test]
    fn test_clean_graph_no_diagnostics() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("index.html", TemplateKind::Layout);
        let h = b.add_template("partials/header.html", TemplateKind::Partial);
        call(&mut b, a, h, 1, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_missing_target_dedup_by_pair() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("index.html", TemplateKind::Layout);
        let ghost = b.add_stub("partials/ghost.html");
        call(&mut b, a, ghost, 3, false);
        call(&mut b, a, ghost, 9, false);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        let missing = kinds(&diags, DiagnosticKind::MissingTarget);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].severity, Severity::Error);
        assert!(missing[0].message.contains("partials/ghost.html"));
    }

    #[test]
    fn test_missing_target_separate_callers() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let c = b.add_template("c.html", TemplateKind::Layout);
        let ghost = b.add_stub("partials/ghost.html");
        call(&mut b, a, ghost, 1, false);
        call(&mut b, c, ghost, 1, false);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert_eq!(kinds(&diags, DiagnosticKind::MissingTarget).len(), 2);
    }

    #[test]
    fn test_two_node_cycle_reported_once() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let p = b.add_template("partials/b.html", TemplateKind::Partial);
        call(&mut b, a, p, 1, true);
        call(&mut b, p, a, 1, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        let cycles = kinds(&diags, DiagnosticKind::CircularDependency);
        assert_eq!(cycles.len(), 1);
        match &cycles[0].location {
            Location::Cycle { path } => {
                assert_eq!(path, &vec!["a.html", "partials/b.html", "a.html"]);
            }
            other => panic!("expected cycle location, got {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_cycle() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("partials/recursive.html", TemplateKind::Partial);
        call(&mut b, a, a, 2, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        let cycles = kinds(&diags, DiagnosticKind::CircularDependency);
        assert_eq!(cycles.len(), 1);
    }

    #[test]
    fn test_two_distinct_cycles_in_one_component() {
        // a -> b -> a and a -> c -> a share node a but are distinct cycles
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let x = b.add_template("partials/x.html", TemplateKind::Partial);
        let y = b.add_template("partials/y.html", TemplateKind::Partial);
        call(&mut b, a, x, 1, true);
        call(&mut b, x, a, 1, true);
        call(&mut b, a, y, 2, true);
        call(&mut b, y, a, 1, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert_eq!(kinds(&diags, DiagnosticKind::CircularDependency).len(), 2);
    }

    #[test]
    fn test_block_override_excluded_from_cycles() {
        let mut b = GraphBuilder::new();
        let base = b.add_template("_default/baseof.html", TemplateKind::Baseof);
        let single = b.add_template("_default/single.html", TemplateKind::Layout);
        call(&mut b, base, single, 1, true);
        b.add_edge(
            single,
            base,
            EdgeKind::BlockOverride,
            5,
            String::new(),
            false,
            false,
            false,
            true,
        );

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert!(kinds(&diags, DiagnosticKind::CircularDependency).is_empty());
    }

    #[test]
    fn test_deprecated_internal_dedup_by_target() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let c = b.add_template("c.html", TemplateKind::Layout);
        let internal = b.add_stub("_internal/opengraph.html");
        b.add_edge(a, internal, EdgeKind::Template, 1, String::new(), false, false, false, true);
        b.add_edge(c, internal, EdgeKind::Template, 8, String::new(), false, false, false, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        let deprecated = kinds(&diags, DiagnosticKind::DeprecatedInternal);
        assert_eq!(deprecated.len(), 1);
        assert_eq!(deprecated[0].severity, Severity::Warning);
    }

    #[test]
    fn test_internal_target_not_missing() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let internal = b.add_stub("_internal/twitter_cards.html");
        b.add_edge(a, internal, EdgeKind::Template, 1, String::new(), false, false, false, true);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert!(kinds(&diags, DiagnosticKind::MissingTarget).is_empty());
    }

    #[test]
    fn test_invalid_path_diagnostic() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        b.record_invalid(a, "../escape.html".into(), 4, "path traversal above project root".into());

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        let invalid = kinds(&diags, DiagnosticKind::InvalidPath);
        assert_eq!(invalid.len(), 1);
        assert!(invalid[0].message.contains("../escape.html"));
    }

    #[test]
    fn test_module_unresolved_diagnostic() {
        let graph = GraphBuilder::new().finish();
        let mut map = ModuleMap::empty();
        map.unresolved.push("github.com/org/missing".to_string());

        let diags = DiagnosticsChecker::new(&graph).run(&map);
        let unresolved = kinds(&diags, DiagnosticKind::ModuleUnresolved);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].location, Location::Project);
    }

    #[test]
    fn test_checks_do_not_short_circuit() {
        let mut b = GraphBuilder::new();
        let a = b.add_template("a.html", TemplateKind::Layout);
        let p = b.add_template("partials/b.html", TemplateKind::Partial);
        let ghost = b.add_stub("partials/ghost.html");
        call(&mut b, a, p, 1, true);
        call(&mut b, p, a, 1, true);
        call(&mut b, a, ghost, 2, false);

        let graph = b.finish();
        let diags = DiagnosticsChecker::new(&graph).run(&ModuleMap::empty());
        assert_eq!(kinds(&diags, DiagnosticKind::MissingTarget).len(), 1);
        assert_eq!(kinds(&diags, DiagnosticKind::CircularDependency).len(), 1);
    }
}
