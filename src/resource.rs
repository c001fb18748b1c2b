//! Memory accounting and best-effort reclamation
//!
//! Estimates are arithmetic over the stored strings and values, not
//! allocator truth; they exist so a configured budget can trigger
//! proactive cache eviction and auto-index pruning. Reclamation never
//! blocks correctness: it only sheds derived state.

use crate::graph::GraphCore;
use crate::index::attr_index::attr_value_size;
use serde::{Deserialize, Serialize};
use std::mem;
use tracing::warn;

/// Estimated bytes per component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBreakdown {
    pub nodes_bytes: usize,
    pub edges_bytes: usize,
    pub adjacency_bytes: usize,
    pub index_bytes: usize,
    pub cache_bytes: usize,
    pub total_bytes: usize,
}

pub(crate) fn estimate(core: &GraphCore) -> MemoryBreakdown {
    let map_overhead = 48usize;

    let nodes_bytes: usize = core
        .nodes()
        .map(|(id, attrs)| {
            id.as_str().len()
                + map_overhead
                + attrs
                    .iter()
                    .map(|(k, v)| k.len() + attr_value_size(v))
                    .sum::<usize>()
        })
        .sum();

    let mut edges_bytes = 0usize;
    let mut key_bytes = 0usize;
    for (key, attrs) in core.edges() {
        let key_size = key.src.as_str().len()
            + key.dst.as_str().len()
            + key.rel.as_str().len()
            + 3 * mem::size_of::<String>();
        key_bytes += key_size;
        edges_bytes += key_size
            + map_overhead
            + attrs
                .iter()
                .map(|(k, v)| k.len() + attr_value_size(v))
                .sum::<usize>();
    }
    // Each edge key is mirrored in the outgoing, incoming, and relation
    // collections.
    let adjacency_bytes = key_bytes * 3;

    let index_bytes = core.indexes.memory_estimate();
    let cache_bytes = core.cache.lock().memory_estimate();

    MemoryBreakdown {
        nodes_bytes,
        edges_bytes,
        adjacency_bytes,
        index_bytes,
        cache_bytes,
        total_bytes: nodes_bytes + edges_bytes + adjacency_bytes + index_bytes + cache_bytes,
    }
}

/// Shed derived state while usage exceeds the budget: first the query
/// cache, then auto-built indexes. Returns the post-reclaim estimate when
/// anything was shed.
pub(crate) fn reclaim_if_over(core: &mut GraphCore, budget_bytes: u64) -> Option<MemoryBreakdown> {
    let usage = estimate(core);
    if usage.total_bytes as u64 <= budget_bytes {
        return None;
    }

    core.cache.get_mut().shrink_to(0);
    let mut after = estimate(core);

    if after.total_bytes as u64 > budget_bytes {
        let pruned = core.indexes.prune_auto_built();
        if !pruned.is_empty() {
            after = estimate(core);
            warn!(
                pruned = ?pruned,
                total_bytes = after.total_bytes,
                budget_bytes,
                "pruned auto-built indexes under memory pressure"
            );
        }
    } else {
        warn!(
            total_bytes = after.total_bytes,
            budget_bytes, "evicted query cache under memory pressure"
        );
    }

    Some(after)
}
