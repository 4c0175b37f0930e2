use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use flowdeck_core::error::{FlowError, Result};
use flowdeck_core::types::NodeUpdate;

use super::edge::Edge;
use super::node::Node;

/// Raw graph as it appears on the wire, before edge ids are normalised.
#[derive(Debug, Clone, Default, Deserialize)]
struct GraphSpec {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl From<GraphSpec> for WorkflowGraph {
    fn from(spec: GraphSpec) -> Self {
        WorkflowGraph::new(spec.nodes, spec.edges)
    }
}

/// Nodes plus dependency edges of one workflow instance.
///
/// Node order is significant: it is the insertion order used to break ties
/// between nodes that have no dependency relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphSpec")]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Index-based adjacency of a validated graph.
#[derive(Debug, Clone)]
pub(crate) struct Adjacency {
    /// `preds[i]`: indices of the nodes `i` depends on.
    pub preds: Vec<Vec<usize>>,
    /// `succs[i]`: indices of the nodes depending on `i`.
    pub succs: Vec<Vec<usize>>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<Node>, mut edges: Vec<Edge>) -> Self {
        for edge in &mut edges {
            edge.ensure_id();
        }
        Self { nodes, edges }
    }

    /// Parse a graph from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of a node in insertion order.
    pub fn index_of(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Ids of the nodes that must finish before `node_id` may start.
    pub fn dependencies_of(&self, node_id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == node_id)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Ids of the nodes that directly depend on `node_id`.
    pub fn dependents_of(&self, node_id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Check structural invariants: unique ids, no dangling edges, no cycles.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(FlowError::DuplicateId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(FlowError::DanglingEdge {
                        edge: edge.id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        self.topological_order().map(|_| ())
    }

    /// Node indices in dependency order.
    ///
    /// Among nodes whose dependencies are all satisfied, the one inserted
    /// first goes first, so identical graphs always yield identical orders.
    /// Assumes unique ids; edges to unknown nodes are ignored here and
    /// reported by `validate`.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let adjacency = self.adjacency();
        let mut in_degree: Vec<usize> = adjacency.preds.iter().map(Vec::len).collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &next in &adjacency.succs[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() < self.nodes.len() {
            let nodes = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &deg)| deg > 0)
                .map(|(idx, _)| self.nodes[idx].id.clone())
                .collect();
            return Err(FlowError::Cycle { nodes });
        }

        Ok(order)
    }

    /// Index adjacency with duplicate edges collapsed.
    pub(crate) fn adjacency(&self) -> Adjacency {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id.as_str(), idx))
            .collect();

        let mut preds = vec![Vec::new(); self.nodes.len()];
        let mut succs = vec![Vec::new(); self.nodes.len()];
        let mut seen = HashSet::new();

        for edge in &self.edges {
            let (Some(&from), Some(&to)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                continue;
            };
            if seen.insert((from, to)) {
                preds[to].push(from);
                succs[from].push(to);
            }
        }

        Adjacency { preds, succs }
    }

    /// Merge a partial update into the named node.
    pub fn apply_update(&mut self, node_id: &str, update: &NodeUpdate) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| FlowError::NodeNotFound(node_id.to_string()))?;
        node.apply(update);
        Ok(())
    }

    /// Return every node to idle and drop previous results.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}
