//! The public graph engine facade
//!
//! `Graph` wraps one `GraphCore` behind a reader/writer lock: queries,
//! traversals, and saves share read access; every mutating call takes the
//! write lock for exactly one critical section, so concurrent readers see
//! either fully-before or fully-after state and never a torn update.
//! `Graph` is cheap to clone (shared state behind an `Arc`) and safe to
//! call from a worker pool.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::{
    AttrMap, Edge, EdgeKey, EdgeSelector, GraphCore, GraphError, MetricsSnapshot, NodeId, Relation,
};
use crate::index::{IndexManager, IndexScope, IndexStats};
use crate::persist::{Format, PersistenceManager};
use crate::query::{CacheStats, EdgeQuery, NodeQuery, QueryCache};
use crate::resource::{self, MemoryBreakdown};
use crate::traverse::{self, SimplePaths, Traversal};
use crate::view::{SubgraphView, ViewFilter};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

// Mutations between memory-budget checks; the estimate walks the whole
// store, so it cannot run on every write.
const RECLAIM_CHECK_INTERVAL: u64 = 1024;

/// State shared by the engine and its views
pub(crate) struct Shared {
    core: RwLock<GraphCore>,
    views: Mutex<FxHashMap<String, ViewFilter>>,
    lock_timeout: Option<Duration>,
}

impl Shared {
    pub(crate) fn read_guard(&self) -> Result<RwLockReadGuard<'_, GraphCore>, EngineError> {
        match self.lock_timeout {
            Some(timeout) => self
                .core
                .try_read_for(timeout)
                .ok_or(EngineError::ConcurrencyTimeout { waited: timeout }),
            None => Ok(self.core.read()),
        }
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, GraphCore>, EngineError> {
        match self.lock_timeout {
            Some(timeout) => self
                .core
                .try_write_for(timeout)
                .ok_or(EngineError::ConcurrencyTimeout { waited: timeout }),
            None => Ok(self.core.write()),
        }
    }
}

/// Engine-wide statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub name: String,
    pub nodes: usize,
    pub edges: usize,
    pub views: usize,
    pub indexes: usize,
    pub components: usize,
    pub metrics: MetricsSnapshot,
    pub cache: CacheStats,
    pub index_stats: IndexStats,
}

/// When a [`ScopedGraph`] writes its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    /// Save on every exit path, including drop during unwind
    Always,
    /// Save only through an explicit [`ScopedGraph::commit`]
    OnCommit,
}

/// An embeddable in-memory graph engine. See the crate docs for a tour.
#[derive(Clone)]
pub struct Graph {
    shared: Arc<Shared>,
    config: EngineConfig,
    persistence: PersistenceManager,
    mutation_ticks: Arc<AtomicU64>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Engine with default configuration
    pub fn new() -> Self {
        let config = EngineConfig::default();
        let persistence =
            PersistenceManager::new(Format::MsgPack, None, config.persistence.chunk_size);
        Self::assemble(config, persistence)
    }

    /// Engine from an explicit configuration; builds the configured
    /// default indexes before returning.
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        let persistence = PersistenceManager::from_config(&config.persistence)?;
        let graph = Self::assemble(config, persistence);
        for attr in graph.config.default_indexes.clone() {
            graph.build_index(&attr, IndexScope::Node)?;
        }
        Ok(graph)
    }

    fn assemble(config: EngineConfig, persistence: PersistenceManager) -> Self {
        let cache = QueryCache::new(config.cache.capacity, cache_ttl(&config));
        let indexes = IndexManager::new(config.auto_index.clone());
        let core = GraphCore::new(config.name.clone(), cache, indexes);
        Self {
            shared: Arc::new(Shared {
                core: RwLock::new(core),
                views: Mutex::new(FxHashMap::default()),
                lock_timeout: config.lock_timeout_ms.map(Duration::from_millis),
            }),
            config,
            persistence,
            mutation_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, GraphCore>> {
        self.shared.read_guard()
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, GraphCore>> {
        self.shared.write_guard()
    }

    /// Run `f` with shared read access to the core, e.g. to drive the lazy
    /// path iterator without collecting.
    pub fn read_with<R>(&self, f: impl FnOnce(&GraphCore) -> R) -> EngineResult<R> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    // ============================================================
    // Nodes
    // ============================================================

    /// Add or update a node (idempotent upsert: a second add replaces the
    /// attribute set). Returns true when the node was newly created.
    pub fn add_node(&self, id: impl Into<NodeId>, attrs: AttrMap) -> EngineResult<bool> {
        let id = id.into();
        let mut core = self.write()?;
        if !core.contains_node(&id) {
            self.check_node_limit(&core, 1)?;
        }
        let created = core.upsert_node(id, attrs)?;
        self.maybe_reclaim(&mut core);
        Ok(created)
    }

    /// Insert a node that must not already exist.
    pub fn try_insert_node(&self, id: impl Into<NodeId>, attrs: AttrMap) -> EngineResult<()> {
        let id = id.into();
        let mut core = self.write()?;
        if !core.contains_node(&id) {
            self.check_node_limit(&core, 1)?;
        }
        core.insert_node_strict(id, attrs)?;
        Ok(())
    }

    /// Add many nodes under one lock acquisition. Returns how many were
    /// newly created.
    pub fn add_nodes_batch(
        &self,
        nodes: impl IntoIterator<Item = (NodeId, AttrMap)>,
    ) -> EngineResult<usize> {
        let nodes: Vec<(NodeId, AttrMap)> = nodes.into_iter().collect();
        let mut core = self.write()?;

        let fresh: FxHashSet<&NodeId> = nodes
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !core.contains_node(id))
            .collect();
        self.check_node_limit(&core, fresh.len() as u64)?;

        let mut created = 0;
        for (id, attrs) in nodes {
            if core.upsert_node(id, attrs)? {
                created += 1;
            }
        }
        self.maybe_reclaim(&mut core);
        Ok(created)
    }

    pub fn get_node(&self, id: &NodeId) -> EngineResult<Option<AttrMap>> {
        Ok(self.read()?.get_node(id).cloned())
    }

    pub fn contains_node(&self, id: &NodeId) -> EngineResult<bool> {
        Ok(self.read()?.contains_node(id))
    }

    /// Remove a node, cascading over every incident edge. Returns the
    /// number of edges removed.
    pub fn remove_node(&self, id: &NodeId) -> EngineResult<usize> {
        Ok(self.write()?.remove_node(id)?)
    }

    pub fn node_count(&self) -> EngineResult<usize> {
        Ok(self.read()?.node_count())
    }

    // ============================================================
    // Edges
    // ============================================================

    /// Add an edge, or replace its attributes when the (src, dst, rel)
    /// triple already exists. Returns true when the edge was newly
    /// created.
    pub fn add_edge(
        &self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        rel: impl Into<Relation>,
        attrs: AttrMap,
    ) -> EngineResult<bool> {
        let key = EdgeKey::new(src, dst, rel);
        let mut core = self.write()?;
        if core.get_edge(&key).is_none() {
            self.check_edge_limit(&core, 1)?;
        }
        let created = core.upsert_edge(key, attrs)?;
        self.maybe_reclaim(&mut core);
        Ok(created)
    }

    /// Add many edges under one lock acquisition. Returns how many were
    /// newly created.
    pub fn add_edges_batch(&self, edges: impl IntoIterator<Item = Edge>) -> EngineResult<usize> {
        let edges: Vec<Edge> = edges.into_iter().collect();
        let mut core = self.write()?;

        let fresh: FxHashSet<EdgeKey> = edges
            .iter()
            .map(Edge::key)
            .filter(|key| core.get_edge(key).is_none())
            .collect();
        self.check_edge_limit(&core, fresh.len() as u64)?;

        let mut created = 0;
        for edge in edges {
            if core.upsert_edge(edge.key(), edge.attrs)? {
                created += 1;
            }
        }
        self.maybe_reclaim(&mut core);
        Ok(created)
    }

    /// O(1) attribute lookup by the identity triple
    pub fn get_edge(
        &self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        rel: impl Into<Relation>,
    ) -> EngineResult<Option<AttrMap>> {
        let key = EdgeKey::new(src, dst, rel);
        Ok(self.read()?.get_edge(&key).cloned())
    }

    /// Remove one edge; `EdgeNotFound` when the triple is absent.
    pub fn remove_edge(
        &self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        rel: impl Into<Relation>,
    ) -> EngineResult<()> {
        let key = EdgeKey::new(src, dst, rel);
        self.write()?.remove_edge(&key)?;
        Ok(())
    }

    /// Remove every edge matching the selector; returns the count.
    pub fn remove_edges(&self, selector: &EdgeSelector) -> EngineResult<usize> {
        Ok(self.write()?.remove_edges_matching(selector))
    }

    pub fn edge_count(&self) -> EngineResult<usize> {
        Ok(self.read()?.edge_count())
    }

    /// Degree as (out, in, total)
    pub fn degree(&self, id: &NodeId) -> EngineResult<(usize, usize, usize)> {
        Ok(self.read()?.degree(id)?)
    }

    pub fn neighbors_out(
        &self,
        id: &NodeId,
        rel: Option<&Relation>,
    ) -> EngineResult<Vec<NodeId>> {
        Ok(self.read()?.neighbors_out(id, rel)?)
    }

    pub fn neighbors_in(&self, id: &NodeId, rel: Option<&Relation>) -> EngineResult<Vec<NodeId>> {
        Ok(self.read()?.neighbors_in(id, rel)?)
    }

    /// Neighbors in both directions
    pub fn neighbors(&self, id: &NodeId, rel: Option<&Relation>) -> EngineResult<Vec<NodeId>> {
        Ok(self.read()?.neighbors(id, rel)?)
    }

    // ============================================================
    // Queries and indexes
    // ============================================================

    /// Find nodes matching the filter. May opportunistically build an
    /// index afterwards when the advisor recommends one; that build is
    /// advisory and any failure is swallowed.
    pub fn find_nodes(&self, query: &NodeQuery) -> EngineResult<Vec<(NodeId, AttrMap)>> {
        let (results, advice) = {
            let core = self.read()?;
            core.find_nodes_with_advice(query)?
        };

        if let Some(attr) = advice {
            // Opportunistic: skip entirely if the lock is contended.
            if let Some(mut core) = self.shared.core.try_write() {
                if !core.has_index(&attr, IndexScope::Node) {
                    if let Err(error) = core.build_index_tagged(&attr, IndexScope::Node, true) {
                        warn!(attr = %attr, %error, "auto-index build failed");
                    }
                }
            }
        }
        Ok(results)
    }

    pub fn find_edges(&self, query: &EdgeQuery) -> EngineResult<Vec<Edge>> {
        Ok(self.read()?.find_edges(query)?)
    }

    /// Build a secondary index over one attribute; a full scan now,
    /// incremental maintenance afterwards.
    pub fn build_index(&self, attr: &str, scope: IndexScope) -> EngineResult<()> {
        self.write()?.build_index(attr, scope)?;
        Ok(())
    }

    /// Drop an index; returns whether it existed.
    pub fn drop_index(&self, attr: &str, scope: IndexScope) -> EngineResult<bool> {
        Ok(self.write()?.drop_index(attr, scope))
    }

    pub fn has_index(&self, attr: &str, scope: IndexScope) -> EngineResult<bool> {
        Ok(self.read()?.has_index(attr, scope))
    }

    /// Raw indexed equality lookup; `Ok(None)` when `attr` has no index.
    /// Unlike [`find_nodes`](Self::find_nodes) this never falls back to a
    /// scan.
    pub fn index_lookup(
        &self,
        attr: &str,
        value: &crate::graph::AttrValue,
    ) -> EngineResult<Option<Vec<NodeId>>> {
        Ok(self.read()?.index_lookup(attr, value))
    }

    /// Raw indexed range lookup over `[lo, hi]`; `Ok(None)` when
    /// un-indexed.
    pub fn index_range(
        &self,
        attr: &str,
        lo: &crate::graph::AttrValue,
        hi: &crate::graph::AttrValue,
    ) -> EngineResult<Option<Vec<NodeId>>> {
        Ok(self.read()?.index_range(attr, lo, hi))
    }

    pub fn index_stats(&self) -> EngineResult<IndexStats> {
        Ok(self.read()?.index_stats())
    }

    // ============================================================
    // Traversal
    // ============================================================

    pub fn bfs(
        &self,
        start: &NodeId,
        max_depth: Option<usize>,
        rel: Option<&Relation>,
    ) -> EngineResult<Traversal> {
        let core = self.read()?;
        Ok(traverse::bfs(&core, start, max_depth, rel)?)
    }

    pub fn dfs(
        &self,
        start: &NodeId,
        max_depth: Option<usize>,
        rel: Option<&Relation>,
    ) -> EngineResult<Traversal> {
        let core = self.read()?;
        Ok(traverse::dfs(&core, start, max_depth, rel)?)
    }

    /// One unweighted shortest path; `Ok(None)` when unreachable.
    pub fn shortest_path(
        &self,
        src: &NodeId,
        dst: &NodeId,
        rel: Option<&Relation>,
    ) -> EngineResult<Option<Vec<NodeId>>> {
        let core = self.read()?;
        Ok(traverse::shortest_path(&core, src, dst, rel)?)
    }

    /// Every minimum-length path between two nodes
    pub fn all_shortest_paths(
        &self,
        src: &NodeId,
        dst: &NodeId,
        rel: Option<&Relation>,
    ) -> EngineResult<Vec<Vec<NodeId>>> {
        let core = self.read()?;
        Ok(traverse::all_shortest_paths(&core, src, dst, rel)?)
    }

    /// All simple paths up to `max_len` edges, collected. For lazy
    /// consumption use [`read_with`](Self::read_with) with
    /// [`traverse::find_paths`].
    pub fn find_paths(
        &self,
        src: &NodeId,
        dst: &NodeId,
        max_len: Option<usize>,
        rel: Option<Relation>,
    ) -> EngineResult<Vec<Vec<NodeId>>> {
        let core = self.read()?;
        let paths: SimplePaths<'_> = traverse::find_paths(&core, src, dst, max_len, rel)?;
        Ok(paths.collect())
    }

    pub fn connected_components(&self) -> EngineResult<Vec<BTreeSet<NodeId>>> {
        let core = self.read()?;
        Ok(traverse::connected_components(&core))
    }

    pub fn weakly_connected_components(&self) -> EngineResult<Vec<BTreeSet<NodeId>>> {
        let core = self.read()?;
        Ok(traverse::weakly_connected_components(&core))
    }

    /// Kahn's algorithm; `Ok(None)` when the graph is cyclic.
    pub fn topological_sort(&self) -> EngineResult<Option<Vec<NodeId>>> {
        let core = self.read()?;
        Ok(traverse::topological_sort(&core))
    }

    pub fn has_cycles(&self) -> EngineResult<bool> {
        let core = self.read()?;
        Ok(traverse::has_cycles(&core))
    }

    // ============================================================
    // Views
    // ============================================================

    /// Create a named live view whose membership is the predicate,
    /// re-evaluated on every access.
    pub fn create_view(
        &self,
        name: impl Into<String>,
        predicate: impl Fn(&NodeId, &AttrMap) -> bool + Send + Sync + 'static,
    ) -> EngineResult<SubgraphView> {
        self.register_view(name.into(), ViewFilter::Predicate(Arc::new(predicate)))
    }

    /// Create a named view over a frozen id set; members removed from the
    /// store report absent.
    pub fn create_view_frozen(
        &self,
        name: impl Into<String>,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> EngineResult<SubgraphView> {
        self.register_view(name.into(), ViewFilter::Frozen(ids.into_iter().collect()))
    }

    fn register_view(&self, name: String, filter: ViewFilter) -> EngineResult<SubgraphView> {
        let mut views = self.shared.views.lock();
        if views.contains_key(&name) {
            return Err(GraphError::DuplicateView(name).into());
        }
        views.insert(name.clone(), filter.clone());
        Ok(SubgraphView::new(name, Arc::downgrade(&self.shared), filter))
    }

    pub fn get_view(&self, name: &str) -> Option<SubgraphView> {
        let views = self.shared.views.lock();
        views.get(name).map(|filter| {
            SubgraphView::new(
                name.to_string(),
                Arc::downgrade(&self.shared),
                filter.clone(),
            )
        })
    }

    /// Drop a view by name; returns whether it existed. Outstanding view
    /// handles keep working against the live store.
    pub fn drop_view(&self, name: &str) -> bool {
        self.shared.views.lock().remove(name).is_some()
    }

    pub fn view_count(&self) -> usize {
        self.shared.views.lock().len()
    }

    // ============================================================
    // Persistence
    // ============================================================

    /// Save with format resolved from the path extension or the
    /// configured default. Returns the written location.
    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<PathBuf> {
        self.save_as(path, None, None)
    }

    /// Save with an explicit format name and/or compression override.
    /// The write is atomic: temp file plus rename.
    pub fn save_as(
        &self,
        path: impl AsRef<Path>,
        format: Option<&str>,
        compress: Option<bool>,
    ) -> EngineResult<PathBuf> {
        let core = self.read()?;
        Ok(self.persistence.save(&core, path.as_ref(), format, compress)?)
    }

    /// Replace the full graph state from a snapshot file. Either the
    /// whole state loads, or the current state is left untouched.
    pub fn load(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        self.load_from(path, None)
    }

    pub fn load_from(&self, path: impl AsRef<Path>, format: Option<&str>) -> EngineResult<()> {
        let snapshot = self.persistence.load(path.as_ref(), format)?;

        let mut guard = self.write()?;
        let cache = QueryCache::new(self.config.cache.capacity, cache_ttl(&self.config));
        let indexes = IndexManager::new(self.config.auto_index.clone());
        let mut staging = GraphCore::new(snapshot.meta.name.clone(), cache, indexes);

        for (id, attrs) in snapshot.nodes {
            staging.upsert_node(id, attrs)?;
        }
        for edge in snapshot.edges {
            staging.upsert_edge(edge.key(), edge.attrs)?;
        }
        // Carry the current index set over to the new state.
        for (attr, scope) in guard.indexes.index_names() {
            staging.build_index(&attr, scope)?;
        }

        *guard = staging;
        Ok(())
    }

    /// Re-encode a snapshot file into another format without touching
    /// this engine's state.
    pub fn translate(
        &self,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        source_format: Option<&str>,
        target_format: Option<&str>,
    ) -> EngineResult<PathBuf> {
        Ok(self.persistence.translate(
            source.as_ref(),
            target.as_ref(),
            source_format,
            target_format,
        )?)
    }

    /// Scope this graph to a snapshot target: the returned guard saves on
    /// drop (`SavePolicy::Always`) or only on [`ScopedGraph::commit`].
    pub fn scoped(
        &self,
        path: impl Into<PathBuf>,
        format: Option<&str>,
        policy: SavePolicy,
    ) -> ScopedGraph {
        ScopedGraph {
            graph: self.clone(),
            path: path.into(),
            format: format.map(str::to_string),
            policy,
            committed: false,
        }
    }

    // ============================================================
    // Maintenance
    // ============================================================

    /// Drop all nodes, edges, indexes, and cached results.
    pub fn clear(&self) -> EngineResult<()> {
        self.write()?.clear();
        Ok(())
    }

    pub fn stats(&self) -> EngineResult<GraphStats> {
        let core = self.read()?;
        let cache = core.cache.lock().stats();
        Ok(GraphStats {
            name: core.name().to_string(),
            nodes: core.node_count(),
            edges: core.edge_count(),
            views: self.view_count(),
            indexes: core.indexes.index_count(),
            components: traverse::connected_components(&core).len(),
            metrics: core.metrics.snapshot(),
            cache,
            index_stats: core.indexes.stats(),
        })
    }

    /// Current memory estimate by component
    pub fn memory_usage(&self) -> EngineResult<MemoryBreakdown> {
        let core = self.read()?;
        Ok(resource::estimate(&core))
    }

    /// Force a budget check now; returns the post-reclaim estimate when
    /// anything was shed.
    pub fn reclaim_memory(&self) -> EngineResult<Option<MemoryBreakdown>> {
        let Some(budget) = self.config.limits.memory_budget_bytes else {
            return Ok(None);
        };
        let mut core = self.write()?;
        Ok(resource::reclaim_if_over(&mut core, budget))
    }

    fn maybe_reclaim(&self, core: &mut GraphCore) {
        let Some(budget) = self.config.limits.memory_budget_bytes else {
            return;
        };
        let ticks = self.mutation_ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if ticks % RECLAIM_CHECK_INTERVAL == 0 {
            resource::reclaim_if_over(core, budget);
        }
    }

    fn check_node_limit(&self, core: &GraphCore, adding: u64) -> EngineResult<()> {
        if let Some(limit) = self.config.limits.max_nodes {
            if core.node_count() as u64 + adding > limit {
                return Err(EngineError::ResourceLimitExceeded {
                    resource: "node count",
                    limit,
                });
            }
        }
        Ok(())
    }

    fn check_edge_limit(&self, core: &GraphCore, adding: u64) -> EngineResult<()> {
        if let Some(limit) = self.config.limits.max_edges {
            if core.edge_count() as u64 + adding > limit {
                return Err(EngineError::ResourceLimitExceeded {
                    resource: "edge count",
                    limit,
                });
            }
        }
        Ok(())
    }
}

fn cache_ttl(config: &EngineConfig) -> Option<Duration> {
    match config.cache.ttl_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

/// Scoped-acquisition wrapper: guarantees the snapshot is written on
/// every exit path (or only on explicit commit, per policy).
pub struct ScopedGraph {
    graph: Graph,
    path: PathBuf,
    format: Option<String>,
    policy: SavePolicy,
    committed: bool,
}

impl ScopedGraph {
    /// Save now and disarm the drop-time save. Returns the written
    /// location.
    pub fn commit(mut self) -> EngineResult<PathBuf> {
        let written = self
            .graph
            .save_as(&self.path, self.format.as_deref(), None)?;
        self.committed = true;
        Ok(written)
    }
}

impl std::ops::Deref for ScopedGraph {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

impl Drop for ScopedGraph {
    fn drop(&mut self) {
        if self.committed || self.policy != SavePolicy::Always {
            return;
        }
        if let Err(error) = self
            .graph
            .save_as(&self.path, self.format.as_deref(), None)
        {
            warn!(path = %self.path.display(), %error, "scoped save on drop failed");
        }
    }
}
