//! Shortest paths and simple-path enumeration

use super::successors;
use crate::graph::{GraphCore, GraphError, GraphResult, NodeId, Relation};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// One shortest path from `src` to `dst` by unweighted BFS.
///
/// `Ok(None)` when `dst` is unreachable; an error only when an endpoint
/// does not exist.
pub fn shortest_path(
    graph: &GraphCore,
    src: &NodeId,
    dst: &NodeId,
    rel: Option<&Relation>,
) -> GraphResult<Option<Vec<NodeId>>> {
    require_node(graph, src)?;
    require_node(graph, dst)?;

    if src == dst {
        return Ok(Some(vec![src.clone()]));
    }

    let mut predecessor: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut queue = VecDeque::new();
    queue.push_back(src.clone());
    predecessor.insert(src.clone(), src.clone());

    while let Some(node) = queue.pop_front() {
        for next in successors(graph, &node, rel) {
            if predecessor.contains_key(next) {
                continue;
            }
            predecessor.insert(next.clone(), node.clone());
            if next == dst {
                return Ok(Some(reconstruct(&predecessor, src, dst)));
            }
            queue.push_back(next.clone());
        }
    }

    Ok(None)
}

fn reconstruct(predecessor: &FxHashMap<NodeId, NodeId>, src: &NodeId, dst: &NodeId) -> Vec<NodeId> {
    let mut path = vec![dst.clone()];
    let mut current = dst;
    while current != src {
        current = &predecessor[current];
        path.push(current.clone());
    }
    path.reverse();
    path
}

/// Every path of minimum length from `src` to `dst`.
pub fn all_shortest_paths(
    graph: &GraphCore,
    src: &NodeId,
    dst: &NodeId,
    rel: Option<&Relation>,
) -> GraphResult<Vec<Vec<NodeId>>> {
    require_node(graph, src)?;
    require_node(graph, dst)?;

    if src == dst {
        return Ok(vec![vec![src.clone()]]);
    }

    // Level-order BFS recording every predecessor on a shortest path.
    let mut dist: FxHashMap<NodeId, usize> = FxHashMap::default();
    let mut preds: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    let mut queue = VecDeque::new();
    dist.insert(src.clone(), 0);
    queue.push_back(src.clone());

    while let Some(node) = queue.pop_front() {
        let depth = dist[&node];
        if let Some(target_depth) = dist.get(dst) {
            if depth >= *target_depth {
                break;
            }
        }
        for next in successors(graph, &node, rel) {
            match dist.get(next) {
                None => {
                    dist.insert(next.clone(), depth + 1);
                    preds.entry(next.clone()).or_default().push(node.clone());
                    queue.push_back(next.clone());
                }
                Some(d) if *d == depth + 1 => {
                    preds.entry(next.clone()).or_default().push(node.clone());
                }
                Some(_) => {}
            }
        }
    }

    if !dist.contains_key(dst) {
        return Ok(Vec::new());
    }

    // Backtrack from dst along every recorded predecessor.
    let mut paths = Vec::new();
    let mut stack = vec![vec![dst.clone()]];
    while let Some(partial) = stack.pop() {
        let head = partial.last().cloned().unwrap_or_else(|| dst.clone());
        if &head == src {
            let mut path = partial;
            path.reverse();
            paths.push(path);
            continue;
        }
        if let Some(parents) = preds.get(&head) {
            for parent in parents {
                let mut extended = partial.clone();
                extended.push(parent.clone());
                stack.push(extended);
            }
        }
    }
    paths.sort();
    Ok(paths)
}

/// Lazy enumeration of simple paths from `src` to `dst` with at most
/// `max_len` edges.
///
/// A node already on the current path is never revisited, so cyclic
/// graphs yield a finite sequence. The iterator borrows the core: hold a
/// read guard (or recreate it) to restart the enumeration.
pub fn find_paths<'g>(
    graph: &'g GraphCore,
    src: &NodeId,
    dst: &NodeId,
    max_len: Option<usize>,
    rel: Option<Relation>,
) -> GraphResult<SimplePaths<'g>> {
    require_node(graph, src)?;
    require_node(graph, dst)?;

    let children: Vec<NodeId> = successors(graph, src, rel.as_ref()).cloned().collect();
    Ok(SimplePaths {
        graph,
        dst: dst.clone(),
        rel,
        max_len: max_len.unwrap_or(usize::MAX),
        path: vec![src.clone()],
        on_path: std::iter::once(src.clone()).collect(),
        stack: vec![Frame { children, next: 0 }],
        trivial: src == dst,
        done: false,
    })
}

struct Frame {
    children: Vec<NodeId>,
    next: usize,
}

/// See [`find_paths`]
pub struct SimplePaths<'g> {
    graph: &'g GraphCore,
    dst: NodeId,
    rel: Option<Relation>,
    max_len: usize,
    path: Vec<NodeId>,
    on_path: FxHashSet<NodeId>,
    stack: Vec<Frame>,
    trivial: bool,
    done: bool,
}

impl Iterator for SimplePaths<'_> {
    type Item = Vec<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.trivial {
            // src == dst: the zero-length path is the only simple one.
            self.done = true;
            return Some(vec![self.dst.clone()]);
        }

        loop {
            let frame = match self.stack.last_mut() {
                Some(frame) => frame,
                None => {
                    self.done = true;
                    return None;
                }
            };

            if frame.next >= frame.children.len() {
                self.stack.pop();
                if let Some(left) = self.path.pop() {
                    self.on_path.remove(&left);
                }
                continue;
            }

            let child = frame.children[frame.next].clone();
            frame.next += 1;

            if child == self.dst {
                if self.path.len() <= self.max_len {
                    let mut path = self.path.clone();
                    path.push(child);
                    return Some(path);
                }
                continue;
            }

            if !self.on_path.contains(&child) && self.path.len() < self.max_len {
                let children: Vec<NodeId> =
                    successors(self.graph, &child, self.rel.as_ref()).cloned().collect();
                self.path.push(child.clone());
                self.on_path.insert(child);
                self.stack.push(Frame { children, next: 0 });
            }
        }
    }
}

fn require_node(graph: &GraphCore, id: &NodeId) -> GraphResult<()> {
    if graph.contains_node(id) {
        Ok(())
    } else {
        Err(GraphError::NodeNotFound(id.clone()))
    }
}
