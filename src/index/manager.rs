//! Manager for secondary attribute indexes
//!
//! Owns all node- and edge-scoped indexes, keeps them synchronized with
//! attribute writes, and runs the advisory auto-indexing heuristic. An
//! index is either complete or absent: builds happen under exclusive
//! access and install atomically.

use super::attr_index::AttrIndex;
use crate::graph::{AttrMap, AttrValue, EdgeKey, NodeId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Which entity population an index covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexScope {
    Node,
    Edge,
}

/// Tuning knobs for the opportunistic auto-indexer
///
/// Advisory only: whether an index exists never changes a query's result,
/// only its cost. Thresholds are deliberately configurable rather than
/// fixed constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoIndexPolicy {
    pub enabled: bool,
    /// Scans of an un-indexed attribute before a build is considered
    pub min_queries: u32,
    /// Maximum selectivity (distinct values / total entities) to index
    pub selectivity_threshold: f64,
}

impl Default for AutoIndexPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_queries: 3,
            selectivity_threshold: 0.5,
        }
    }
}

/// Per-index statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDetail {
    pub scope: IndexScope,
    pub distinct_values: usize,
    pub entries: usize,
    pub entries_per_value: f64,
    pub memory_estimate_bytes: usize,
    pub auto_built: bool,
}

/// Aggregate index statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub indexes: BTreeMap<String, IndexDetail>,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

pub struct IndexManager {
    node_indexes: FxHashMap<String, AttrIndex<NodeId>>,
    edge_indexes: FxHashMap<String, AttrIndex<EdgeKey>>,
    epoch: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    policy: AutoIndexPolicy,
    observations: Mutex<FxHashMap<String, u32>>,
}

impl IndexManager {
    pub fn new(policy: AutoIndexPolicy) -> Self {
        Self {
            node_indexes: FxHashMap::default(),
            edge_indexes: FxHashMap::default(),
            epoch: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            policy,
            observations: Mutex::new(FxHashMap::default()),
        }
    }

    /// Monotonic counter bumped on every build/drop; part of cache
    /// fingerprints so stale entries die with the index set.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_index(&self, attr: &str, scope: IndexScope) -> bool {
        match scope {
            IndexScope::Node => self.node_indexes.contains_key(attr),
            IndexScope::Edge => self.edge_indexes.contains_key(attr),
        }
    }

    /// Names of currently built indexes, with scope
    pub fn index_names(&self) -> Vec<(String, IndexScope)> {
        let mut names: Vec<(String, IndexScope)> = self
            .node_indexes
            .keys()
            .map(|k| (k.clone(), IndexScope::Node))
            .chain(
                self.edge_indexes
                    .keys()
                    .map(|k| (k.clone(), IndexScope::Edge)),
            )
            .collect();
        names.sort();
        names
    }

    pub(crate) fn install_node_index(
        &mut self,
        attr: &str,
        entries: impl Iterator<Item = (AttrValue, NodeId)>,
        auto_built: bool,
    ) {
        let mut index = AttrIndex::new(auto_built);
        for (value, id) in entries {
            index.insert(value, id);
        }
        self.node_indexes.insert(attr.to_string(), index);
        self.observations.lock().remove(attr);
        self.epoch += 1;
    }

    pub(crate) fn install_edge_index(
        &mut self,
        attr: &str,
        entries: impl Iterator<Item = (AttrValue, EdgeKey)>,
        auto_built: bool,
    ) {
        let mut index = AttrIndex::new(auto_built);
        for (value, key) in entries {
            index.insert(value, key);
        }
        self.edge_indexes.insert(attr.to_string(), index);
        self.epoch += 1;
    }

    pub(crate) fn drop_index(&mut self, attr: &str, scope: IndexScope) -> bool {
        let existed = match scope {
            IndexScope::Node => self.node_indexes.remove(attr).is_some(),
            IndexScope::Edge => self.edge_indexes.remove(attr).is_some(),
        };
        if existed {
            self.epoch += 1;
        }
        existed
    }

    /// Drop every auto-built index; used under memory pressure.
    pub(crate) fn prune_auto_built(&mut self) -> Vec<String> {
        let victims: Vec<String> = self
            .node_indexes
            .iter()
            .filter(|(_, idx)| idx.is_auto_built())
            .map(|(name, _)| name.clone())
            .collect();
        for name in &victims {
            self.node_indexes.remove(name);
            self.epoch += 1;
        }
        victims
    }

    pub(crate) fn clear(&mut self) {
        self.node_indexes.clear();
        self.edge_indexes.clear();
        self.observations.lock().clear();
        self.epoch += 1;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    // ============================================================
    // Lookup
    // ============================================================

    /// Indexed equality lookup; `None` when no index exists for `attr`.
    pub fn lookup_nodes(&self, attr: &str, value: &AttrValue) -> Option<Vec<NodeId>> {
        let index = self.node_indexes.get(attr)?;
        Some(self.record(index.get(value).map(|set| set.iter().cloned().collect())))
    }

    /// Indexed range lookup over `[lo, hi]`; `None` when un-indexed.
    pub fn range_nodes(&self, attr: &str, lo: &AttrValue, hi: &AttrValue) -> Option<Vec<NodeId>> {
        let index = self.node_indexes.get(attr)?;
        let hits = index.range(lo, hi);
        Some(self.record(if hits.is_empty() { None } else { Some(hits) }))
    }

    pub fn lookup_edges(&self, attr: &str, value: &AttrValue) -> Option<Vec<EdgeKey>> {
        let index = self.edge_indexes.get(attr)?;
        Some(self.record(index.get(value).map(|set| set.iter().cloned().collect())))
    }

    pub fn range_edges(&self, attr: &str, lo: &AttrValue, hi: &AttrValue) -> Option<Vec<EdgeKey>> {
        let index = self.edge_indexes.get(attr)?;
        let hits = index.range(lo, hi);
        Some(self.record(if hits.is_empty() { None } else { Some(hits) }))
    }

    fn record<K>(&self, hit: Option<Vec<K>>) -> Vec<K> {
        match hit {
            Some(keys) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                keys
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        }
    }

    // ============================================================
    // Incremental maintenance
    // ============================================================

    /// Synchronize node indexes with an attribute write.
    ///
    /// `old = None` is a create, `new = None` a delete; both present is an
    /// in-place update.
    pub(crate) fn node_attrs_changed(
        &mut self,
        id: &NodeId,
        old: Option<&AttrMap>,
        new: Option<&AttrMap>,
    ) {
        for (attr, index) in self.node_indexes.iter_mut() {
            let before = old.and_then(|m| m.get(attr));
            let after = new.and_then(|m| m.get(attr));
            if before == after {
                continue;
            }
            if let Some(value) = before {
                index.remove(value, id);
            }
            if let Some(value) = after {
                index.insert(value.clone(), id.clone());
            }
        }
    }

    pub(crate) fn edge_attrs_changed(
        &mut self,
        key: &EdgeKey,
        old: Option<&AttrMap>,
        new: Option<&AttrMap>,
    ) {
        for (attr, index) in self.edge_indexes.iter_mut() {
            let before = old.and_then(|m| m.get(attr));
            let after = new.and_then(|m| m.get(attr));
            if before == after {
                continue;
            }
            if let Some(value) = before {
                index.remove(value, key);
            }
            if let Some(value) = after {
                index.insert(value.clone(), key.clone());
            }
        }
    }

    // ============================================================
    // Auto-index advisor
    // ============================================================

    /// Record a full-scan sighting of an un-indexed attribute; returns the
    /// running count.
    pub(crate) fn observe_scan(&self, attr: &str) -> u32 {
        let mut observations = self.observations.lock();
        let count = observations.entry(attr.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Decide whether `attr` deserves an opportunistic index build.
    pub(crate) fn should_auto_index(
        &self,
        attr: &str,
        scan_count: u32,
        distinct_values: usize,
        total_entities: usize,
    ) -> bool {
        if !self.policy.enabled
            || total_entities == 0
            || scan_count < self.policy.min_queries
            || self.node_indexes.contains_key(attr)
        {
            return false;
        }
        let selectivity = distinct_values as f64 / total_entities as f64;
        let favorable = selectivity <= self.policy.selectivity_threshold;
        if favorable {
            debug!(attr, selectivity, scan_count, "auto-index candidate");
        }
        favorable
    }

    // ============================================================
    // Statistics
    // ============================================================

    pub fn stats(&self) -> IndexStats {
        let mut indexes = BTreeMap::new();
        for (name, index) in &self.node_indexes {
            indexes.insert(name.clone(), detail(index, IndexScope::Node));
        }
        for (name, index) in &self.edge_indexes {
            indexes.insert(format!("edge:{}", name), detail(index, IndexScope::Edge));
        }

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        IndexStats {
            indexes,
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn index_count(&self) -> usize {
        self.node_indexes.len() + self.edge_indexes.len()
    }

    pub fn memory_estimate(&self) -> usize {
        self.node_indexes
            .values()
            .map(|i| i.memory_estimate())
            .sum::<usize>()
            + self
                .edge_indexes
                .values()
                .map(|i| i.memory_estimate())
                .sum::<usize>()
    }
}

fn detail<K: Eq + std::hash::Hash + Clone>(index: &AttrIndex<K>, scope: IndexScope) -> IndexDetail {
    let values = index.value_count();
    let entries = index.entry_count();
    IndexDetail {
        scope,
        distinct_values: values,
        entries,
        entries_per_value: if values > 0 {
            entries as f64 / values as f64
        } else {
            0.0
        },
        memory_estimate_bytes: index.memory_estimate(),
        auto_built: index.is_auto_built(),
    }
}
