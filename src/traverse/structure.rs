//! Whole-graph structure: components, topological order, cycle detection

use crate::graph::{GraphCore, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};

/// Partition of all nodes into connected components, treating every edge
/// as undirected. Components are sorted by their smallest member so the
/// partition is deterministic.
pub fn connected_components(graph: &GraphCore) -> Vec<BTreeSet<NodeId>> {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut components = Vec::new();

    for (start, _) in graph.nodes() {
        if visited.contains(start) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        visited.insert(start.clone());

        while let Some(node) = queue.pop_front() {
            component.insert(node.clone());
            let neighbors = graph
                .out_edge_keys(&node)
                .iter()
                .map(|key| &key.dst)
                .chain(graph.in_edge_keys(&node).iter().map(|key| &key.src));
            for next in neighbors {
                if visited.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        components.push(component);
    }

    components.sort_by(|a, b| a.iter().next().cmp(&b.iter().next()));
    components
}

/// Same construction applied to a directed graph: components of the
/// symmetric closure.
pub fn weakly_connected_components(graph: &GraphCore) -> Vec<BTreeSet<NodeId>> {
    connected_components(graph)
}

/// Kahn's algorithm. `None` when the graph has at least one cycle
/// (detectable because not every node gets removed).
pub fn topological_sort(graph: &GraphCore) -> Option<Vec<NodeId>> {
    let mut in_degree: FxHashMap<NodeId, usize> = FxHashMap::default();
    let mut queue = VecDeque::new();

    for (id, _) in graph.nodes() {
        let degree = graph.in_edge_keys(id).len();
        in_degree.insert(id.clone(), degree);
        if degree == 0 {
            queue.push_back(id.clone());
        }
    }

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(node) = queue.pop_front() {
        order.push(node.clone());
        for key in graph.out_edge_keys(&node) {
            if let Some(degree) = in_degree.get_mut(&key.dst) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(key.dst.clone());
                }
            }
        }
    }

    if order.len() == graph.node_count() {
        Some(order)
    } else {
        None
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Gray,
    Black,
}

/// Three-color DFS looking for a back-edge to a gray node. O(V+E),
/// iterative so deep graphs cannot blow the call stack.
pub fn has_cycles(graph: &GraphCore) -> bool {
    let mut colors: FxHashMap<NodeId, Color> = FxHashMap::default();

    for (root, _) in graph.nodes() {
        if colors.contains_key(root) {
            continue;
        }

        let mut stack: Vec<(NodeId, usize)> = vec![(root.clone(), 0)];
        colors.insert(root.clone(), Color::Gray);

        loop {
            let pending = match stack.last_mut() {
                None => break,
                Some((node, child)) => {
                    let out = graph.out_edge_keys(node);
                    if *child < out.len() {
                        let next = out[*child].dst.clone();
                        *child += 1;
                        Some(next)
                    } else {
                        None
                    }
                }
            };

            match pending {
                Some(next) => match colors.get(&next) {
                    Some(Color::Gray) => return true,
                    Some(Color::Black) => {}
                    None => {
                        colors.insert(next.clone(), Color::Gray);
                        stack.push((next, 0));
                    }
                },
                None => {
                    if let Some((node, _)) = stack.pop() {
                        colors.insert(node, Color::Black);
                    }
                }
            }
        }
    }

    false
}
