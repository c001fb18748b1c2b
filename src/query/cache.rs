//! Query result cache: capacity-bounded LRU with TTL expiry
//!
//! Keys are canonical query fingerprints. Invalidation is
//! attribute-scoped: each entry records the attribute names its filter
//! references, mutations report which names they touched, and only
//! intersecting entries are dropped. Filter-less (match-all) entries are
//! dropped on any structural mutation instead. Zero capacity disables
//! caching entirely without changing any result.

use crate::graph::NodeId;
use lru::LruCache;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct CacheEntry {
    ids: Arc<Vec<NodeId>>,
    attrs: Vec<String>,
    inserted_at: Instant,
}

/// Cache effectiveness counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub invalidations: u64,
    pub expirations: u64,
}

pub struct QueryCache {
    entries: Option<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
    hits: u64,
    misses: u64,
    invalidations: u64,
    expirations: u64,
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            ttl,
            hits: 0,
            misses: 0,
            invalidations: 0,
            expirations: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached ids for `fingerprint`, or run `compute`, store the
    /// result, and return it. `attrs` are the attribute names the query
    /// references (empty means match-all).
    pub fn get_or_compute(
        &mut self,
        fingerprint: String,
        attrs: Vec<String>,
        compute: impl FnOnce() -> Vec<NodeId>,
    ) -> Arc<Vec<NodeId>> {
        let ttl = self.ttl;
        if let Some(cache) = self.entries.as_mut() {
            let mut stale = false;
            let fresh = match cache.get(&fingerprint) {
                Some(entry) if !expired(entry, ttl) => Some(Arc::clone(&entry.ids)),
                Some(_) => {
                    stale = true;
                    None
                }
                None => None,
            };
            if let Some(ids) = fresh {
                self.hits += 1;
                return ids;
            }
            if stale {
                cache.pop(&fingerprint);
                self.expirations += 1;
            }
        }

        self.misses += 1;
        let ids = Arc::new(compute());
        if let Some(cache) = self.entries.as_mut() {
            cache.put(
                fingerprint,
                CacheEntry {
                    ids: Arc::clone(&ids),
                    attrs,
                    inserted_at: Instant::now(),
                },
            );
        }
        ids
    }

    /// Drop entries whose filter references any touched attribute name.
    /// `structural` additionally drops match-all entries (a node was
    /// created or removed, so unfiltered results changed).
    pub fn invalidate_attrs(&mut self, touched: &FxHashSet<String>, structural: bool) {
        let Some(cache) = self.entries.as_mut() else {
            return;
        };
        let victims: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| {
                if entry.attrs.is_empty() {
                    structural
                } else {
                    entry.attrs.iter().any(|a| touched.contains(a))
                }
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in victims {
            cache.pop(&key);
            self.invalidations += 1;
        }
    }

    /// Drop everything, counting the drops as invalidations.
    pub fn invalidate_all(&mut self) {
        if let Some(cache) = self.entries.as_mut() {
            self.invalidations += cache.len() as u64;
            cache.clear();
        }
    }

    /// Drop everything without touching the counters' semantics.
    pub fn clear(&mut self) {
        if let Some(cache) = self.entries.as_mut() {
            cache.clear();
        }
        self.hits = 0;
        self.misses = 0;
        self.invalidations = 0;
        self.expirations = 0;
    }

    /// Shrink to at most `target` entries, evicting the least recent.
    pub fn shrink_to(&mut self, target: usize) {
        if let Some(cache) = self.entries.as_mut() {
            while cache.len() > target {
                cache.pop_lru();
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            capacity: self.entries.as_ref().map_or(0, |c| c.cap().get()),
            entries: self.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
            invalidations: self.invalidations,
            expirations: self.expirations,
        }
    }

    /// Rough memory footprint in bytes
    pub fn memory_estimate(&self) -> usize {
        self.entries.as_ref().map_or(0, |cache| {
            cache
                .iter()
                .map(|(key, entry)| {
                    key.len()
                        + entry.attrs.iter().map(String::len).sum::<usize>()
                        + entry.ids.iter().map(|id| id.as_str().len() + 32).sum::<usize>()
                })
                .sum()
        })
    }
}

fn expired(entry: &CacheEntry, ttl: Option<Duration>) -> bool {
    ttl.map_or(false, |ttl| entry.inserted_at.elapsed() > ttl)
}
