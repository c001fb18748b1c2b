//! Live, non-copying subgraph views
//!
//! A view is a named, filtered projection over its owning graph: a node
//! predicate (re-evaluated on every access) or a frozen id set, plus a
//! weak back-reference. No node or edge data is duplicated, so views
//! observe mutations immediately: a predicate view's `node_count` grows
//! when a matching node is added to the store, and a node removed from
//! the store reports absent through every view. Predicate re-evaluation
//! trades per-access cost for that liveness; freeze the id set when a
//! stable membership snapshot matters more.
//!
//! The back-reference is weak: dropping the owning graph deterministically
//! detaches every view, surfacing `ViewDetached` instead of dangling.

use crate::engine::Shared;
use crate::error::{EngineError, EngineResult};
use crate::graph::{AttrMap, Edge, GraphCore, NodeId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Membership rule of a view
#[derive(Clone)]
pub enum ViewFilter {
    /// Re-evaluated against live attributes on every access
    Predicate(Arc<dyn Fn(&NodeId, &AttrMap) -> bool + Send + Sync>),
    /// Fixed id set; members removed from the store simply report absent
    Frozen(FxHashSet<NodeId>),
}

impl ViewFilter {
    fn member(&self, core: &GraphCore, id: &NodeId) -> bool {
        match self {
            ViewFilter::Predicate(pred) => core.get_node(id).map_or(false, |attrs| pred(id, attrs)),
            ViewFilter::Frozen(ids) => ids.contains(id) && core.contains_node(id),
        }
    }
}

impl fmt::Debug for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewFilter::Predicate(_) => f.write_str("ViewFilter::Predicate(..)"),
            ViewFilter::Frozen(ids) => write!(f, "ViewFilter::Frozen({} ids)", ids.len()),
        }
    }
}

/// Statistics for one view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStats {
    pub nodes: usize,
    pub edges: usize,
    pub avg_degree: f64,
    pub density: f64,
}

/// A named, filtered projection of a graph. See the module docs.
#[derive(Clone)]
pub struct SubgraphView {
    name: String,
    shared: Weak<Shared>,
    filter: ViewFilter,
}

impl SubgraphView {
    pub(crate) fn new(name: String, shared: Weak<Shared>, filter: ViewFilter) -> Self {
        Self {
            name,
            shared,
            filter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn attach(&self) -> EngineResult<Arc<Shared>> {
        self.shared.upgrade().ok_or_else(|| EngineError::ViewDetached {
            name: self.name.clone(),
        })
    }

    /// Run `f` against the owning store under a read guard.
    fn with_core<R>(&self, f: impl FnOnce(&GraphCore) -> R) -> EngineResult<R> {
        let shared = self.attach()?;
        let guard = shared.read_guard()?;
        Ok(f(&guard))
    }

    pub fn contains(&self, id: &NodeId) -> EngineResult<bool> {
        self.with_core(|core| self.filter.member(core, id))
    }

    /// Number of live nodes currently matching the view
    pub fn node_count(&self) -> EngineResult<usize> {
        self.with_core(|core| match &self.filter {
            ViewFilter::Predicate(pred) => core
                .nodes()
                .filter(|(id, attrs)| pred(id, attrs))
                .count(),
            ViewFilter::Frozen(ids) => ids.iter().filter(|id| core.contains_node(id)).count(),
        })
    }

    /// Member ids, sorted
    pub fn node_ids(&self) -> EngineResult<Vec<NodeId>> {
        let mut ids = self.with_core(|core| match &self.filter {
            ViewFilter::Predicate(pred) => core
                .nodes()
                .filter(|(id, attrs)| pred(id, attrs))
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>(),
            ViewFilter::Frozen(ids) => ids
                .iter()
                .filter(|id| core.contains_node(id))
                .cloned()
                .collect(),
        })?;
        ids.sort();
        Ok(ids)
    }

    /// Attributes of a member node; `None` when outside the view or gone
    /// from the store
    pub fn get_node(&self, id: &NodeId) -> EngineResult<Option<AttrMap>> {
        self.with_core(|core| {
            if self.filter.member(core, id) {
                core.get_node(id).cloned()
            } else {
                None
            }
        })
    }

    /// Neighbors of a member, restricted to the view's node set.
    /// Deduplicated and sorted.
    pub fn neighbors(&self, id: &NodeId) -> EngineResult<Vec<NodeId>> {
        let mut ids = self.with_core(|core| {
            if !self.filter.member(core, id) {
                return Vec::new();
            }
            let mut seen = FxHashSet::default();
            for key in core.out_edge_keys(id) {
                if self.filter.member(core, &key.dst) {
                    seen.insert(key.dst.clone());
                }
            }
            for key in core.in_edge_keys(id) {
                if self.filter.member(core, &key.src) {
                    seen.insert(key.src.clone());
                }
            }
            seen.into_iter().collect::<Vec<_>>()
        })?;
        ids.sort();
        Ok(ids)
    }

    /// Edges whose endpoints are both inside the view
    pub fn edges(&self) -> EngineResult<Vec<Edge>> {
        let mut edges = self.with_core(|core| {
            core.edges()
                .filter(|(key, _)| {
                    self.filter.member(core, &key.src) && self.filter.member(core, &key.dst)
                })
                .map(|(key, attrs)| Edge::from_key(key.clone(), attrs.clone()))
                .collect::<Vec<_>>()
        })?;
        edges.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(edges)
    }

    pub fn edge_count(&self) -> EngineResult<usize> {
        self.with_core(|core| {
            core.edges()
                .filter(|(key, _)| {
                    self.filter.member(core, &key.src) && self.filter.member(core, &key.dst)
                })
                .count()
        })
    }

    pub fn stats(&self) -> EngineResult<ViewStats> {
        let nodes = self.node_count()?;
        let edges = self.edge_count()?;
        let max_edges = nodes.saturating_mul(nodes.saturating_sub(1));
        Ok(ViewStats {
            nodes,
            edges,
            avg_degree: if nodes > 0 {
                2.0 * edges as f64 / nodes as f64
            } else {
                0.0
            },
            density: if max_edges > 0 {
                edges as f64 / max_edges as f64
            } else {
                0.0
            },
        })
    }
}

impl fmt::Debug for SubgraphView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubgraphView")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish()
    }
}
