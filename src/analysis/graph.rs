// Template dependency graph
//
// Flat index-based storage: nodes and edges live in vectors and reference
// each other through integer ids, so cyclic include graphs are ordinary
// data. The builder is the single insertion point; the finished graph is
// immutable and iterates in a deterministic order (nodes sorted by
// canonical id, edges by source node then insertion order).

use crate::parser::TemplateKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Index of a node in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// A template node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateNode {
    /// Canonical layouts-relative path, the unique key
    pub id: String,
    pub kind: TemplateKind,
    /// Block names declared via block/define within this file
    pub defined_blocks: BTreeSet<String>,
    /// False for stub nodes created only because something referenced them
    pub discovered: bool,
}

/// Kind of dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Partial,
    PartialCached,
    Template,
    BlockOverride,
    ShortcodeCall,
}

impl EdgeKind {
    /// True for edges representing a runtime call relation. BlockOverride
    /// is a static declaration and is excluded from cycle analysis.
    pub fn is_call(&self) -> bool {
        !matches!(self, EdgeKind::BlockOverride)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::Partial => "partial",
            EdgeKind::PartialCached => "partial_cached",
            EdgeKind::Template => "template",
            EdgeKind::BlockOverride => "block_override",
            EdgeKind::ShortcodeCall => "shortcode_call",
        }
    }
}

/// One dependency between two templates. The graph is a multigraph:
/// distinct call sites produce distinct edges between the same pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub line: usize,
    /// Verbatim source line of the call site
    pub context: String,
    /// True when discovered inside a conditional branch
    pub optional: bool,
    /// True when the call is the guaranteed bare-else fallback
    pub fallback: bool,
    /// True for partialCached edges
    pub cached: bool,
    /// False when `to` denotes a stub the analysis never discovered
    pub resolved: bool,
}

/// A computed target expression the resolver could not fold to a constant.
/// Kept on the graph so the result stays total and queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicTarget {
    pub from: NodeId,
    pub expression: String,
    pub line: usize,
}

/// A target that failed minimal path syntax checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidTarget {
    pub from: NodeId,
    pub raw: String,
    pub line: usize,
    pub reason: String,
}

/// Counts over the finished graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub discovered: usize,
    pub stubs: usize,
    pub edges: usize,
}

/// Accumulates nodes and edges during analysis. Performs no analysis
/// itself; it only materializes what extraction and resolution produced.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<TemplateNode>,
    index: HashMap<String, NodeId>,
    edges: Vec<DependencyEdge>,
    edge_keys: HashSet<(NodeId, NodeId, EdgeKind, usize)>,
    dynamic_targets: Vec<DynamicTarget>,
    invalid_targets: Vec<InvalidTarget>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a discovered template node. Re-encountering an id merges
    /// metadata: a stub is upgraded to discovered and its kind replaced by
    /// the real file's kind.
    pub fn add_template(&mut self, id: &str, kind: TemplateKind) -> NodeId {
        match self.index.get(id) {
            Some(&node_id) => {
                let node = &mut self.nodes[node_id.0];
                node.discovered = true;
                node.kind = kind;
                node_id
            }
            None => self.insert_node(id, kind, true),
        }
    }

    /// Add a stub node for a referenced-but-unseen target. If the id was
    /// already added (stub or discovered) the existing node is reused.
    pub fn add_stub(&mut self, id: &str) -> NodeId {
        match self.index.get(id) {
            Some(&node_id) => node_id,
            None => self.insert_node(id, TemplateKind::from_path(id), false),
        }
    }

    fn insert_node(&mut self, id: &str, kind: TemplateKind, discovered: bool) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(TemplateNode {
            id: id.to_string(),
            kind,
            defined_blocks: BTreeSet::new(),
            discovered,
        });
        self.index.insert(id.to_string(), node_id);
        node_id
    }

    /// Record a block name declared in a node
    pub fn add_defined_block(&mut self, node: NodeId, name: &str) {
        self.nodes[node.0].defined_blocks.insert(name.to_string());
    }

    /// Insert an edge. Idempotent on (from, to, kind, line): the same call
    /// site inserted twice produces one edge.
    #[allow(clippy::too_many_arguments)]
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
        line: usize,
        context: String,
        optional: bool,
        fallback: bool,
        cached: bool,
        resolved: bool,
    ) {
        if !self.edge_keys.insert((from, to, kind, line)) {
            return;
        }
        self.edges.push(DependencyEdge {
            from,
            to,
            kind,
            line,
            context,
            optional,
            fallback,
            cached,
            resolved,
        });
    }

    pub fn record_dynamic(&mut self, from: NodeId, expression: String, line: usize) {
        self.dynamic_targets.push(DynamicTarget {
            from,
            expression,
            line,
        });
    }

    pub fn record_invalid(&mut self, from: NodeId, raw: String, line: usize, reason: String) {
        self.invalid_targets.push(InvalidTarget {
            from,
            raw,
            line,
            reason,
        });
    }

    pub fn node_id(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Freeze into an immutable graph with deterministic iteration order
    pub fn finish(self) -> DependencyGraph {
        let mut node_order: Vec<NodeId> = (0..self.nodes.len()).map(NodeId).collect();
        node_order.sort_by(|a, b| self.nodes[a.0].id.cmp(&self.nodes[b.0].id));

        let rank: HashMap<NodeId, usize> = node_order
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();

        let mut edge_order: Vec<usize> = (0..self.edges.len()).collect();
        edge_order.sort_by_key(|&i| (rank[&self.edges[i].from], i));

        let mut edges_from: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut edges_to: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for &i in &edge_order {
            edges_from.entry(self.edges[i].from).or_default().push(i);
            edges_to.entry(self.edges[i].to).or_default().push(i);
        }

        DependencyGraph {
            nodes: self.nodes,
            edges: self.edges,
            index: self.index,
            node_order,
            edge_order,
            edges_from,
            edges_to,
            dynamic_targets: self.dynamic_targets,
            invalid_targets: self.invalid_targets,
        }
    }
}

/// The immutable dependency graph produced by one analysis run
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: Vec<TemplateNode>,
    edges: Vec<DependencyEdge>,
    index: HashMap<String, NodeId>,
    node_order: Vec<NodeId>,
    edge_order: Vec<usize>,
    edges_from: HashMap<NodeId, Vec<usize>>,
    edges_to: HashMap<NodeId, Vec<usize>>,
    dynamic_targets: Vec<DynamicTarget>,
    invalid_targets: Vec<InvalidTarget>,
}

impl DependencyGraph {
    /// Nodes in stable order (sorted by canonical id)
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TemplateNode)> {
        self.node_order.iter().map(|&id| (id, &self.nodes[id.0]))
    }

    /// Edges in stable order (by source node order, then insertion order)
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edge_order.iter().map(|&i| &self.edges[i])
    }

    pub fn node(&self, id: NodeId) -> &TemplateNode {
        &self.nodes[id.0]
    }

    pub fn node_by_path(&self, path: &str) -> Option<(NodeId, &TemplateNode)> {
        self.index.get(path).map(|&id| (id, &self.nodes[id.0]))
    }

    /// Outgoing edges of a node, stable order
    pub fn edges_from(&self, node: NodeId) -> impl Iterator<Item = &DependencyEdge> {
        self.edges_from
            .get(&node)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    /// Incoming edges of a node, stable order
    pub fn edges_to(&self, node: NodeId) -> impl Iterator<Item = &DependencyEdge> {
        self.edges_to
            .get(&node)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn dynamic_targets(&self) -> &[DynamicTarget] {
        &self.dynamic_targets
    }

    pub fn invalid_targets(&self) -> &[InvalidTarget] {
        &self.invalid_targets
    }

    pub fn stats(&self) -> GraphStats {
        let discovered = self.nodes.iter().filter(|n| n.discovered).count();
        GraphStats {
            nodes: self.nodes.len(),
            discovered,
            stubs: self.nodes.len() - discovered,
            edges: self.edges.len(),
        }
    }
}
