//! Traversal algorithms over the adjacency index
//!
//! All algorithms are read-only and take `&GraphCore`; the facade runs
//! them under a read guard, so they never observe a partially mutated
//! adjacency state.

pub mod paths;
pub mod structure;

pub use paths::{all_shortest_paths, find_paths, shortest_path, SimplePaths};
pub use structure::{connected_components, has_cycles, topological_sort, weakly_connected_components};

use crate::graph::{GraphCore, GraphError, GraphResult, NodeId, Relation};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Result of a BFS/DFS expansion
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    /// Depth at which each node was first seen
    pub depths: FxHashMap<NodeId, usize>,
    /// Nodes in discovery order
    pub order: Vec<NodeId>,
    /// Deepest level reached
    pub max_depth_reached: usize,
    /// True when a depth limit cut off unvisited successors
    pub truncated: bool,
}

impl Traversal {
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.depths.contains_key(id)
    }

    pub fn depth_of(&self, id: &NodeId) -> Option<usize> {
        self.depths.get(id).copied()
    }
}

pub(crate) fn successors<'g>(
    graph: &'g GraphCore,
    id: &NodeId,
    rel: Option<&Relation>,
) -> impl Iterator<Item = &'g NodeId> + 'g {
    let rel = rel.cloned();
    graph
        .out_edge_keys(id)
        .iter()
        .filter(move |key| rel.as_ref().map_or(true, |r| &key.rel == r))
        .map(|key| &key.dst)
}

/// Breadth-first expansion over outgoing edges.
///
/// Ties (nodes reachable through several edges at one level) are visited
/// once; first-seen ordering fixes the depth assignment.
pub fn bfs(
    graph: &GraphCore,
    start: &NodeId,
    max_depth: Option<usize>,
    rel: Option<&Relation>,
) -> GraphResult<Traversal> {
    if !graph.contains_node(start) {
        return Err(GraphError::NodeNotFound(start.clone()));
    }

    let mut depths = FxHashMap::default();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    let mut max_reached = 0;
    let mut truncated = false;

    depths.insert(start.clone(), 0);
    order.push(start.clone());
    queue.push_back((start.clone(), 0usize));

    while let Some((node, depth)) = queue.pop_front() {
        max_reached = max_reached.max(depth);

        if max_depth.map_or(false, |limit| depth >= limit) {
            if successors(graph, &node, rel).any(|next| !depths.contains_key(next)) {
                truncated = true;
            }
            continue;
        }

        for next in successors(graph, &node, rel) {
            if !depths.contains_key(next) {
                depths.insert(next.clone(), depth + 1);
                order.push(next.clone());
                queue.push_back((next.clone(), depth + 1));
            }
        }
    }

    Ok(Traversal {
        depths,
        order,
        max_depth_reached: max_reached,
        truncated,
    })
}

/// Depth-first expansion over outgoing edges with a visited set, so cyclic
/// graphs terminate.
pub fn dfs(
    graph: &GraphCore,
    start: &NodeId,
    max_depth: Option<usize>,
    rel: Option<&Relation>,
) -> GraphResult<Traversal> {
    if !graph.contains_node(start) {
        return Err(GraphError::NodeNotFound(start.clone()));
    }

    let mut depths = FxHashMap::default();
    let mut order = Vec::new();
    let mut stack = vec![(start.clone(), 0usize)];
    let mut max_reached = 0;
    let mut truncated = false;

    while let Some((node, depth)) = stack.pop() {
        if depths.contains_key(&node) {
            continue;
        }
        depths.insert(node.clone(), depth);
        order.push(node.clone());
        max_reached = max_reached.max(depth);

        if max_depth.map_or(false, |limit| depth >= limit) {
            if successors(graph, &node, rel).any(|next| !depths.contains_key(next)) {
                truncated = true;
            }
            continue;
        }

        // Reversed so the first successor is explored first.
        let next_level: Vec<NodeId> = successors(graph, &node, rel).cloned().collect();
        for next in next_level.into_iter().rev() {
            if !depths.contains_key(&next) {
                stack.push((next, depth + 1));
            }
        }
    }

    Ok(Traversal {
        depths,
        order,
        max_depth_reached: max_reached,
        truncated,
    })
}
