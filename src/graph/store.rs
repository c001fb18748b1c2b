//! In-memory attribute store and adjacency index
//!
//! `GraphCore` holds the node/edge attribute maps and the three-way
//! adjacency structures (outgoing, incoming, per-relation), and keeps the
//! secondary indexes and the query cache consistent with every mutation.
//! It is not synchronized itself; the [`Graph`](crate::Graph) facade wraps
//! it in a reader/writer lock so each mutating call here runs as a single
//! critical section.

use super::edge::Edge;
use super::types::{EdgeKey, NodeId, Relation};
use super::value::AttrMap;
use crate::index::{IndexManager, IndexScope};
use crate::query::cache::QueryCache;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Errors from store-level operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("edge '{0}' not found")]
    EdgeNotFound(EdgeKey),

    #[error("edge '{edge}' references missing endpoint '{missing}'")]
    EndpointMissing { edge: EdgeKey, missing: NodeId },

    #[error("node '{0}' already exists")]
    DuplicateNode(NodeId),

    #[error("subgraph view '{0}' already exists")]
    DuplicateView(String),

    #[error("invalid {field}: {detail}")]
    Validation { field: String, detail: String },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Optional (src, dst, rel) filter for bulk edge removal and edge queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSelector {
    pub src: Option<NodeId>,
    pub dst: Option<NodeId>,
    pub rel: Option<Relation>,
}

impl EdgeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, src: impl Into<NodeId>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn dst(mut self, dst: impl Into<NodeId>) -> Self {
        self.dst = Some(dst.into());
        self
    }

    pub fn rel(mut self, rel: impl Into<Relation>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub(crate) fn matches(&self, key: &EdgeKey) -> bool {
        self.src.as_ref().map_or(true, |s| &key.src == s)
            && self.dst.as_ref().map_or(true, |d| &key.dst == d)
            && self.rel.as_ref().map_or(true, |r| &key.rel == r)
    }
}

/// Operation counters, readable without exclusive access
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    pub nodes_added: AtomicU64,
    pub nodes_removed: AtomicU64,
    pub edges_added: AtomicU64,
    pub edges_removed: AtomicU64,
    pub queries: AtomicU64,
}

/// Point-in-time copy of the operation counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub nodes_added: u64,
    pub nodes_removed: u64,
    pub edges_added: u64,
    pub edges_removed: u64,
    pub queries: u64,
}

impl Metrics {
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            nodes_added: self.nodes_added.load(Ordering::Relaxed),
            nodes_removed: self.nodes_removed.load(Ordering::Relaxed),
            edges_added: self.edges_added.load(Ordering::Relaxed),
            edges_removed: self.edges_removed.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.nodes_added.store(0, Ordering::Relaxed);
        self.nodes_removed.store(0, Ordering::Relaxed);
        self.edges_added.store(0, Ordering::Relaxed);
        self.edges_removed.store(0, Ordering::Relaxed);
        self.queries.store(0, Ordering::Relaxed);
    }
}

/// In-memory graph storage
///
/// Uses hash maps for O(1) lookup performance:
/// - nodes: NodeId -> AttrMap (insertion-ordered, so snapshots stream
///   deterministically)
/// - edges: EdgeKey -> AttrMap (direct keying on the identity triple)
/// - out_edges / in_edges: NodeId -> Vec<EdgeKey> (adjacency lists)
/// - rel_index: Relation -> set of EdgeKey
pub struct GraphCore {
    name: String,
    nodes: IndexMap<NodeId, AttrMap>,
    edges: FxHashMap<EdgeKey, AttrMap>,
    out_edges: FxHashMap<NodeId, Vec<EdgeKey>>,
    in_edges: FxHashMap<NodeId, Vec<EdgeKey>>,
    rel_index: FxHashMap<Relation, FxHashSet<EdgeKey>>,
    pub(crate) indexes: IndexManager,
    pub(crate) cache: Mutex<QueryCache>,
    pub(crate) metrics: Metrics,
}

impl GraphCore {
    pub(crate) fn new(name: String, cache: QueryCache, indexes: IndexManager) -> Self {
        GraphCore {
            name,
            nodes: IndexMap::new(),
            edges: FxHashMap::default(),
            out_edges: FxHashMap::default(),
            in_edges: FxHashMap::default(),
            rel_index: FxHashMap::default(),
            indexes,
            cache: Mutex::new(cache),
            metrics: Metrics::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// O(1) node lookup
    pub fn get_node(&self, id: &NodeId) -> Option<&AttrMap> {
        self.nodes.get(id)
    }

    /// O(1) edge lookup by identity triple
    pub fn get_edge(&self, key: &EdgeKey) -> Option<&AttrMap> {
        self.edges.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &AttrMap)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &AttrMap)> {
        self.edges.iter()
    }

    /// Outgoing edge keys of a node; empty for unknown ids
    pub fn out_edge_keys(&self, id: &NodeId) -> &[EdgeKey] {
        self.out_edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming edge keys of a node; empty for unknown ids
    pub fn in_edge_keys(&self, id: &NodeId) -> &[EdgeKey] {
        self.in_edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys of all edges carrying a relation label
    pub(crate) fn relation_edge_keys(&self, rel: &Relation) -> Vec<EdgeKey> {
        self.rel_index
            .get(rel)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All edges carrying a relation label
    pub fn edges_with_relation(&self, rel: &Relation) -> Vec<Edge> {
        self.rel_index
            .get(rel)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| {
                        self.edges
                            .get(k)
                            .map(|attrs| Edge::from_key(k.clone(), attrs.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Outgoing neighbors, O(out-degree)
    pub fn neighbors_out(&self, id: &NodeId, rel: Option<&Relation>) -> GraphResult<Vec<NodeId>> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        Ok(self
            .out_edge_keys(id)
            .iter()
            .filter(|k| rel.map_or(true, |r| &k.rel == r))
            .map(|k| k.dst.clone())
            .collect())
    }

    /// Incoming neighbors, O(in-degree)
    pub fn neighbors_in(&self, id: &NodeId, rel: Option<&Relation>) -> GraphResult<Vec<NodeId>> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        Ok(self
            .in_edge_keys(id)
            .iter()
            .filter(|k| rel.map_or(true, |r| &k.rel == r))
            .map(|k| k.src.clone())
            .collect())
    }

    /// Neighbors in both directions (may repeat a node reachable both ways)
    pub fn neighbors(&self, id: &NodeId, rel: Option<&Relation>) -> GraphResult<Vec<NodeId>> {
        let mut out = self.neighbors_out(id, rel)?;
        out.extend(self.neighbors_in(id, rel)?);
        Ok(out)
    }

    /// Degree as (out, in, total)
    pub fn degree(&self, id: &NodeId) -> GraphResult<(usize, usize, usize)> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        let out = self.out_edge_keys(id).len();
        let inc = self.in_edge_keys(id).len();
        Ok((out, inc, out + inc))
    }

    // ============================================================
    // Mutation
    // ============================================================

    /// Add or replace a node. Returns true when the node was newly created.
    pub(crate) fn upsert_node(&mut self, id: NodeId, attrs: AttrMap) -> GraphResult<bool> {
        validate_id(&id)?;
        let old = self.nodes.insert(id.clone(), attrs.clone());
        let created = old.is_none();
        self.indexes.node_attrs_changed(&id, old.as_ref(), Some(&attrs));

        let mut touched: FxHashSet<String> = attrs.keys().cloned().collect();
        if let Some(old) = &old {
            touched.extend(old.keys().cloned());
        }
        self.cache.get_mut().invalidate_attrs(&touched, created);

        self.metrics.nodes_added.fetch_add(1, Ordering::Relaxed);
        Ok(created)
    }

    /// Strict insert: fails with `DuplicateNode` when the id is taken.
    pub(crate) fn insert_node_strict(&mut self, id: NodeId, attrs: AttrMap) -> GraphResult<()> {
        if self.contains_node(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.upsert_node(id, attrs)?;
        Ok(())
    }

    /// Remove a node and cascade-delete every incident edge.
    ///
    /// Two phases: collect all edges touching the node, remove each one
    /// (keeping indexes consistent), then drop the node itself. Returns the
    /// number of edges removed.
    pub(crate) fn remove_node(&mut self, id: &NodeId) -> GraphResult<usize> {
        if !self.contains_node(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }

        let mut incident: Vec<EdgeKey> = self.out_edge_keys(id).to_vec();
        incident.extend(self.in_edge_keys(id).iter().cloned());
        // A self-loop appears in both lists; remove it once.
        incident.sort();
        incident.dedup();

        let removed = incident.len();
        for key in incident {
            self.remove_edge_internal(&key)?;
        }

        let attrs = self
            .nodes
            .swap_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        self.out_edges.remove(id);
        self.in_edges.remove(id);
        self.indexes.node_attrs_changed(id, Some(&attrs), None);

        let touched: FxHashSet<String> = attrs.keys().cloned().collect();
        self.cache.get_mut().invalidate_attrs(&touched, true);

        self.metrics.nodes_removed.fetch_add(1, Ordering::Relaxed);
        debug!(node = %id, edges_removed = removed, "removed node");
        Ok(removed)
    }

    /// Add an edge, or replace its attributes when the triple exists.
    ///
    /// Fails with `EndpointMissing` if either endpoint is absent. On a new
    /// edge the key is inserted into all three adjacency collections within
    /// this call; readers never observe a partial insertion because the
    /// facade holds the write lock for the whole operation.
    pub(crate) fn upsert_edge(&mut self, key: EdgeKey, attrs: AttrMap) -> GraphResult<bool> {
        if !self.contains_node(&key.src) {
            return Err(GraphError::EndpointMissing {
                missing: key.src.clone(),
                edge: key,
            });
        }
        if !self.contains_node(&key.dst) {
            return Err(GraphError::EndpointMissing {
                missing: key.dst.clone(),
                edge: key,
            });
        }

        let old = self.edges.insert(key.clone(), attrs.clone());
        let created = old.is_none();
        if created {
            self.out_edges
                .entry(key.src.clone())
                .or_default()
                .push(key.clone());
            self.in_edges
                .entry(key.dst.clone())
                .or_default()
                .push(key.clone());
            self.rel_index
                .entry(key.rel.clone())
                .or_default()
                .insert(key.clone());
        }
        self.indexes.edge_attrs_changed(&key, old.as_ref(), Some(&attrs));
        self.metrics.edges_added.fetch_add(1, Ordering::Relaxed);
        Ok(created)
    }

    /// Remove one edge by its identity triple.
    pub(crate) fn remove_edge(&mut self, key: &EdgeKey) -> GraphResult<AttrMap> {
        self.remove_edge_internal(key)
    }

    /// Remove every edge matching the selector; returns how many went away.
    ///
    /// Uses the adjacency lists / relation index to narrow candidates, so
    /// the cost is proportional to the candidate set, not the edge count.
    pub(crate) fn remove_edges_matching(&mut self, sel: &EdgeSelector) -> usize {
        let candidates: Vec<EdgeKey> = if let Some(src) = &sel.src {
            self.out_edge_keys(src)
                .iter()
                .filter(|k| sel.matches(k))
                .cloned()
                .collect()
        } else if let Some(dst) = &sel.dst {
            self.in_edge_keys(dst)
                .iter()
                .filter(|k| sel.matches(k))
                .cloned()
                .collect()
        } else if let Some(rel) = &sel.rel {
            self.rel_index
                .get(rel)
                .map(|keys| keys.iter().filter(|k| sel.matches(k)).cloned().collect())
                .unwrap_or_default()
        } else {
            self.edges.keys().cloned().collect()
        };

        let mut removed = 0;
        for key in candidates {
            if self.remove_edge_internal(&key).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn remove_edge_internal(&mut self, key: &EdgeKey) -> GraphResult<AttrMap> {
        let attrs = self
            .edges
            .remove(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.clone()))?;

        if let Some(list) = self.out_edges.get_mut(&key.src) {
            list.retain(|k| k != key);
        }
        if let Some(list) = self.in_edges.get_mut(&key.dst) {
            list.retain(|k| k != key);
        }
        if let Some(set) = self.rel_index.get_mut(&key.rel) {
            set.remove(key);
            if set.is_empty() {
                self.rel_index.remove(&key.rel);
            }
        }

        self.indexes.edge_attrs_changed(key, Some(&attrs), None);
        self.metrics.edges_removed.fetch_add(1, Ordering::Relaxed);
        Ok(attrs)
    }

    /// Drop all nodes, edges, indexes, and cached results.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.out_edges.clear();
        self.in_edges.clear();
        self.rel_index.clear();
        self.indexes.clear();
        self.cache.get_mut().clear();
        self.metrics.reset();
    }

    // ============================================================
    // Secondary indexes
    // ============================================================

    /// Build (or rebuild) a secondary index for an attribute.
    ///
    /// One full scan of the scoped entities; the index only becomes visible
    /// once complete, since the caller holds exclusive access throughout.
    pub(crate) fn build_index(&mut self, attr: &str, scope: IndexScope) -> GraphResult<()> {
        self.build_index_tagged(attr, scope, false)
    }

    pub(crate) fn build_index_tagged(
        &mut self,
        attr: &str,
        scope: IndexScope,
        auto_built: bool,
    ) -> GraphResult<()> {
        validate_attr_name(attr)?;
        let start = std::time::Instant::now();
        match scope {
            IndexScope::Node => {
                let entries = self
                    .nodes
                    .iter()
                    .filter_map(|(id, attrs)| attrs.get(attr).map(|v| (v.clone(), id.clone())));
                self.indexes.install_node_index(attr, entries, auto_built);
            }
            IndexScope::Edge => {
                let entries = self
                    .edges
                    .iter()
                    .filter_map(|(key, attrs)| attrs.get(attr).map(|v| (v.clone(), key.clone())));
                self.indexes.install_edge_index(attr, entries, auto_built);
            }
        }
        self.cache.get_mut().invalidate_all();
        debug!(
            attr,
            ?scope,
            auto_built,
            elapsed_us = start.elapsed().as_micros() as u64,
            "built index"
        );
        Ok(())
    }

    /// Drop an index; returns whether it existed. Stored attributes are
    /// unaffected.
    pub(crate) fn drop_index(&mut self, attr: &str, scope: IndexScope) -> bool {
        let existed = self.indexes.drop_index(attr, scope);
        if existed {
            self.cache.get_mut().invalidate_all();
        }
        existed
    }

    pub fn has_index(&self, attr: &str, scope: IndexScope) -> bool {
        self.indexes.has_index(attr, scope)
    }

    /// Direct indexed equality lookup; `None` when `attr` is un-indexed.
    pub fn index_lookup(&self, attr: &str, value: &super::AttrValue) -> Option<Vec<NodeId>> {
        self.indexes.lookup_nodes(attr, value)
    }

    /// Direct indexed range lookup over `[lo, hi]`; `None` when
    /// un-indexed.
    pub fn index_range(
        &self,
        attr: &str,
        lo: &super::AttrValue,
        hi: &super::AttrValue,
    ) -> Option<Vec<NodeId>> {
        self.indexes.range_nodes(attr, lo, hi)
    }

    pub fn index_stats(&self) -> crate::index::IndexStats {
        self.indexes.stats()
    }
}

fn validate_id(id: &NodeId) -> GraphResult<()> {
    if id.as_str().is_empty() {
        return Err(GraphError::Validation {
            field: "node id".to_string(),
            detail: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_attr_name(attr: &str) -> GraphResult<()> {
    if attr.is_empty() {
        return Err(GraphError::Validation {
            field: "attribute name".to_string(),
            detail: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attrs;
    use crate::index::AutoIndexPolicy;

    fn core() -> GraphCore {
        GraphCore::new(
            "test".to_string(),
            QueryCache::new(16, None),
            IndexManager::new(AutoIndexPolicy::default()),
        )
    }

    #[test]
    fn test_upsert_and_get_node() {
        let mut g = core();
        assert!(g.upsert_node("a".into(), attrs([("name", "Alice")])).unwrap());
        assert_eq!(g.node_count(), 1);
        assert_eq!(
            g.get_node(&"a".into()).unwrap().get("name").and_then(|v| v.as_str()),
            Some("Alice")
        );

        // Second add replaces attributes, does not duplicate.
        assert!(!g.upsert_node("a".into(), attrs([("name", "Alya")])).unwrap());
        assert_eq!(g.node_count(), 1);
        assert_eq!(
            g.get_node(&"a".into()).unwrap().get("name").and_then(|v| v.as_str()),
            Some("Alya")
        );
    }

    #[test]
    fn test_strict_insert_rejects_duplicates() {
        let mut g = core();
        g.insert_node_strict("a".into(), AttrMap::new()).unwrap();
        assert_eq!(
            g.insert_node_strict("a".into(), AttrMap::new()),
            Err(GraphError::DuplicateNode("a".into()))
        );
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut g = core();
        assert!(matches!(
            g.upsert_node("".into(), AttrMap::new()),
            Err(GraphError::Validation { .. })
        ));
    }

    #[test]
    fn test_edge_requires_endpoints() {
        let mut g = core();
        g.upsert_node("a".into(), AttrMap::new()).unwrap();
        let err = g
            .upsert_edge(EdgeKey::new("a", "ghost", "r"), AttrMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::EndpointMissing {
                edge: EdgeKey::new("a", "ghost", "r"),
                missing: "ghost".into(),
            }
        );
        // Nothing partial left behind.
        assert_eq!(g.edge_count(), 0);
        assert!(g.out_edge_keys(&"a".into()).is_empty());
    }

    #[test]
    fn test_edge_uniqueness() {
        let mut g = core();
        g.upsert_node("a".into(), AttrMap::new()).unwrap();
        g.upsert_node("b".into(), AttrMap::new()).unwrap();

        let key = EdgeKey::new("a", "b", "knows");
        assert!(g.upsert_edge(key.clone(), attrs([("w", 1i64)])).unwrap());
        assert!(!g.upsert_edge(key.clone(), attrs([("w", 2i64)])).unwrap());

        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.get_edge(&key).unwrap().get("w").and_then(|v| v.as_int()), Some(2));
        // Exactly one entry in each adjacency collection.
        assert_eq!(g.out_edge_keys(&"a".into()).len(), 1);
        assert_eq!(g.in_edge_keys(&"b".into()).len(), 1);
        assert_eq!(g.edges_with_relation(&"knows".into()).len(), 1);
    }

    #[test]
    fn test_adjacency_and_degree() {
        let mut g = core();
        for id in ["a", "b", "c"] {
            g.upsert_node(id.into(), AttrMap::new()).unwrap();
        }
        g.upsert_edge(EdgeKey::new("a", "b", "knows"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("a", "c", "knows"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("b", "c", "follows"), AttrMap::new()).unwrap();

        assert_eq!(g.degree(&"a".into()).unwrap(), (2, 0, 2));
        assert_eq!(g.degree(&"b".into()).unwrap(), (1, 1, 2));
        assert_eq!(g.degree(&"c".into()).unwrap(), (0, 2, 2));

        let mut out = g.neighbors_out(&"a".into(), None).unwrap();
        out.sort();
        assert_eq!(out, vec![NodeId::new("b"), NodeId::new("c")]);

        let knows_only = g
            .neighbors_out(&"b".into(), Some(&"knows".into()))
            .unwrap();
        assert!(knows_only.is_empty());
    }

    #[test]
    fn test_neighbors_of_unknown_node() {
        let g = core();
        assert_eq!(
            g.neighbors_out(&"nope".into(), None),
            Err(GraphError::NodeNotFound("nope".into()))
        );
    }

    #[test]
    fn test_cascade_delete() {
        let mut g = core();
        for id in ["a", "b", "c"] {
            g.upsert_node(id.into(), AttrMap::new()).unwrap();
        }
        g.upsert_edge(EdgeKey::new("a", "b", "r"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("b", "c", "r"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("c", "b", "s"), AttrMap::new()).unwrap();

        let removed = g.remove_node(&"b".into()).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 0);
        assert!(g.out_edge_keys(&"a".into()).is_empty());
        assert!(g.in_edge_keys(&"c".into()).is_empty());
        assert!(g.edges_with_relation(&"r".into()).is_empty());
    }

    #[test]
    fn test_self_loop_removed_once() {
        let mut g = core();
        g.upsert_node("a".into(), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("a", "a", "self"), AttrMap::new()).unwrap();

        assert_eq!(g.remove_node(&"a".into()).unwrap(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_remove_edges_matching() {
        let mut g = core();
        for id in ["a", "b", "c"] {
            g.upsert_node(id.into(), AttrMap::new()).unwrap();
        }
        g.upsert_edge(EdgeKey::new("a", "b", "r"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("a", "c", "r"), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("b", "c", "s"), AttrMap::new()).unwrap();

        let removed = g.remove_edges_matching(&EdgeSelector::new().src("a").rel("r"));
        assert_eq!(removed, 2);
        assert_eq!(g.edge_count(), 1);

        let removed = g.remove_edges_matching(&EdgeSelector::new());
        assert_eq!(removed, 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_remove_missing_edge() {
        let mut g = core();
        let key = EdgeKey::new("a", "b", "r");
        assert_eq!(g.remove_edge(&key), Err(GraphError::EdgeNotFound(key)));
    }

    #[test]
    fn test_clear() {
        let mut g = core();
        g.upsert_node("a".into(), attrs([("k", 1i64)])).unwrap();
        g.upsert_node("b".into(), AttrMap::new()).unwrap();
        g.upsert_edge(EdgeKey::new("a", "b", "r"), AttrMap::new()).unwrap();
        g.build_index("k", IndexScope::Node).unwrap();

        g.clear();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(!g.has_index("k", IndexScope::Node));
        assert_eq!(g.metrics.snapshot().nodes_added, 0);
    }
}
