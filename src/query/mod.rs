//! Attribute-filter queries over nodes and edges
//!
//! Queries are equality/range filters, canonicalized into a fingerprint
//! string that keys the result cache. Execution consults secondary indexes
//! when present and falls back to a full scan otherwise; the result set is
//! identical either way, only the cost differs. Scans feed the auto-index
//! advisor.

pub mod cache;

pub use cache::{CacheStats, QueryCache};

use crate::graph::store::validate_attr_name;
use crate::graph::{AttrMap, AttrValue, Edge, EdgeKey, EdgeSelector, GraphCore, GraphError, GraphResult, NodeId, Relation};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::Ordering;

/// Inclusive range term over one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub attr: String,
    pub lo: AttrValue,
    pub hi: AttrValue,
}

/// Node filter: attribute equality terms plus an optional range term
///
/// ```
/// use tantu::NodeQuery;
/// let q = NodeQuery::new().eq("type", "Person").range("age", 18i64, 65i64);
/// assert_eq!(q.referenced_attrs(), vec!["type".to_string(), "age".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeQuery {
    eq: BTreeMap<String, AttrValue>,
    range: Option<RangeFilter>,
}

impl NodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attr == value`
    pub fn eq(mut self, attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.eq.insert(attr.into(), value.into());
        self
    }

    /// Require `lo <= attr <= hi`
    pub fn range(
        mut self,
        attr: impl Into<String>,
        lo: impl Into<AttrValue>,
        hi: impl Into<AttrValue>,
    ) -> Self {
        self.range = Some(RangeFilter {
            attr: attr.into(),
            lo: lo.into(),
            hi: hi.into(),
        });
        self
    }

    pub fn is_match_all(&self) -> bool {
        self.eq.is_empty() && self.range.is_none()
    }

    /// Attribute names this filter references
    pub fn referenced_attrs(&self) -> Vec<String> {
        let mut attrs: Vec<String> = self.eq.keys().cloned().collect();
        if let Some(range) = &self.range {
            if !attrs.contains(&range.attr) {
                attrs.push(range.attr.clone());
            }
        }
        attrs
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        for attr in self.eq.keys() {
            validate_attr_name(attr)?;
        }
        if let Some(range) = &self.range {
            validate_attr_name(&range.attr)?;
            if range.lo > range.hi {
                return Err(GraphError::Validation {
                    field: format!("range filter on '{}'", range.attr),
                    detail: "lower bound exceeds upper bound".to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn matches(&self, attrs: &AttrMap) -> bool {
        for (attr, expected) in &self.eq {
            if attrs.get(attr) != Some(expected) {
                return false;
            }
        }
        if let Some(range) = &self.range {
            match attrs.get(&range.attr) {
                Some(value) => {
                    if value < &range.lo || value > &range.hi {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Canonical cache key: collection, index epoch, and every filter term
    /// in sorted order.
    pub(crate) fn fingerprint(&self, epoch: u64) -> String {
        let mut out = String::with_capacity(64);
        let _ = write!(out, "nodes|e{}", epoch);
        for (attr, value) in &self.eq {
            let _ = write!(out, "|{}:{}=", attr.len(), attr);
            push_canonical(&mut out, value);
        }
        if let Some(range) = &self.range {
            let _ = write!(out, "|{}:{}~", range.attr.len(), range.attr);
            push_canonical(&mut out, &range.lo);
            out.push_str("..");
            push_canonical(&mut out, &range.hi);
        }
        out
    }
}

/// Edge filter: endpoint/relation narrowing plus attribute equality
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeQuery {
    selector: EdgeSelector,
    eq: BTreeMap<String, AttrValue>,
}

impl EdgeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, src: impl Into<NodeId>) -> Self {
        self.selector.src = Some(src.into());
        self
    }

    pub fn dst(mut self, dst: impl Into<NodeId>) -> Self {
        self.selector.dst = Some(dst.into());
        self
    }

    pub fn rel(mut self, rel: impl Into<Relation>) -> Self {
        self.selector.rel = Some(rel.into());
        self
    }

    pub fn eq(mut self, attr: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.eq.insert(attr.into(), value.into());
        self
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        for attr in self.eq.keys() {
            validate_attr_name(attr)?;
        }
        Ok(())
    }

    fn matches(&self, key: &EdgeKey, attrs: &AttrMap) -> bool {
        if !self.selector.matches(key) {
            return false;
        }
        self.eq
            .iter()
            .all(|(attr, expected)| attrs.get(attr) == Some(expected))
    }
}

// Unambiguous value encoding for fingerprints. Strings are length-prefixed
// and floats use their bit pattern, so distinct values never collide.
fn push_canonical(out: &mut String, value: &AttrValue) {
    match value {
        AttrValue::Null => out.push('n'),
        AttrValue::Bool(b) => out.push_str(if *b { "b1" } else { "b0" }),
        AttrValue::Int(i) => {
            let _ = write!(out, "i{}", i);
        }
        AttrValue::Float(f) => {
            let _ = write!(out, "f{:016x}", f.to_bits());
        }
        AttrValue::Str(s) => {
            let _ = write!(out, "s{}:{}", s.len(), s);
        }
        AttrValue::List(list) => {
            out.push_str("l[");
            for item in list {
                push_canonical(out, item);
                out.push(',');
            }
            out.push(']');
        }
        AttrValue::Map(map) => {
            out.push_str("m{");
            for (key, item) in map {
                let _ = write!(out, "{}:{}=", key.len(), key);
                push_canonical(out, item);
                out.push(',');
            }
            out.push('}');
        }
    }
}

impl GraphCore {
    /// Find nodes matching the filter.
    ///
    /// Consults the result cache, then an index when one covers a filter
    /// term, then falls back to a full scan. Results are sorted by id so
    /// every execution path yields the same ordering.
    pub fn find_nodes(&self, query: &NodeQuery) -> GraphResult<Vec<(NodeId, AttrMap)>> {
        Ok(self.find_nodes_with_advice(query)?.0)
    }

    /// Like [`find_nodes`](Self::find_nodes), also reporting an attribute
    /// the auto-index advisor recommends building an index for.
    pub(crate) fn find_nodes_with_advice(
        &self,
        query: &NodeQuery,
    ) -> GraphResult<(Vec<(NodeId, AttrMap)>, Option<String>)> {
        query.validate()?;
        self.metrics.queries.fetch_add(1, Ordering::Relaxed);

        let fingerprint = query.fingerprint(self.indexes.epoch());
        let mut advice = None;
        let ids = {
            let mut cache = self.cache.lock();
            cache.get_or_compute(fingerprint, query.referenced_attrs(), || {
                let (ids, recommended) = self.execute_node_query(query);
                advice = recommended;
                ids
            })
        };

        let results = ids
            .iter()
            .filter_map(|id| self.get_node(id).map(|attrs| (id.clone(), attrs.clone())))
            .collect();
        Ok((results, advice))
    }

    fn execute_node_query(&self, query: &NodeQuery) -> (Vec<NodeId>, Option<String>) {
        // Most selective covering index wins: smallest candidate set.
        let mut candidates: Option<Vec<NodeId>> = None;
        for (attr, value) in &query.eq {
            if let Some(hits) = self.indexes.lookup_nodes(attr, value) {
                if candidates.as_ref().map_or(true, |c| hits.len() < c.len()) {
                    candidates = Some(hits);
                }
            }
        }
        if candidates.is_none() {
            if let Some(range) = &query.range {
                candidates = self.indexes.range_nodes(&range.attr, &range.lo, &range.hi);
            }
        }

        let mut ids: Vec<NodeId>;
        let mut advice = None;
        match candidates {
            Some(candidate_ids) => {
                ids = candidate_ids
                    .into_iter()
                    .filter(|id| self.get_node(id).map_or(false, |attrs| query.matches(attrs)))
                    .collect();
            }
            None => {
                // Full scan; gather selectivity evidence for the advisor
                // along the way.
                let observed = query
                    .eq
                    .keys()
                    .find(|attr| !self.indexes.has_index(attr, crate::index::IndexScope::Node));
                let mut distinct: FxHashSet<&AttrValue> = FxHashSet::default();

                ids = Vec::new();
                for (id, attrs) in self.nodes() {
                    if let Some(attr) = observed {
                        if let Some(value) = attrs.get(attr.as_str()) {
                            distinct.insert(value);
                        }
                    }
                    if query.matches(attrs) {
                        ids.push(id.clone());
                    }
                }

                if let Some(attr) = observed {
                    let scans = self.indexes.observe_scan(attr);
                    if self
                        .indexes
                        .should_auto_index(attr, scans, distinct.len(), self.node_count())
                    {
                        advice = Some(attr.clone());
                    }
                }
            }
        }

        ids.sort();
        (ids, advice)
    }

    /// Find edges matching the filter. Narrowing uses the adjacency lists,
    /// the relation index, or an edge-scoped secondary index before
    /// resorting to a scan of all edges. Uncached: edge result sets are
    /// cheap to recompute from the narrowed candidate sets.
    pub fn find_edges(&self, query: &EdgeQuery) -> GraphResult<Vec<Edge>> {
        query.validate()?;
        self.metrics.queries.fetch_add(1, Ordering::Relaxed);

        let candidates: Vec<EdgeKey> = if let Some(src) = &query.selector.src {
            self.out_edge_keys(src).to_vec()
        } else if let Some(dst) = &query.selector.dst {
            self.in_edge_keys(dst).to_vec()
        } else if let Some(rel) = &query.selector.rel {
            self.relation_edge_keys(rel)
        } else if let Some((attr, value)) = query
            .eq
            .iter()
            .find(|(attr, _)| self.indexes.has_index(attr, crate::index::IndexScope::Edge))
        {
            self.indexes.lookup_edges(attr, value).unwrap_or_default()
        } else {
            self.edges().map(|(key, _)| key.clone()).collect()
        };

        let mut results: Vec<Edge> = candidates
            .into_iter()
            .filter_map(|key| {
                self.get_edge(&key).and_then(|attrs| {
                    query
                        .matches(&key, attrs)
                        .then(|| Edge::from_key(key.clone(), attrs.clone()))
                })
            })
            .collect();
        results.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::attrs;
    use crate::index::{AutoIndexPolicy, IndexManager, IndexScope};

    fn populated_core() -> GraphCore {
        let mut g = GraphCore::new(
            "test".to_string(),
            QueryCache::new(16, None),
            IndexManager::new(AutoIndexPolicy::default()),
        );
        g.upsert_node("a".into(), attrs([("type", AttrValue::from("person")), ("age", AttrValue::Int(30))]))
            .unwrap();
        g.upsert_node("b".into(), attrs([("type", AttrValue::from("person")), ("age", AttrValue::Int(40))]))
            .unwrap();
        g.upsert_node("c".into(), attrs([("type", AttrValue::from("city"))])).unwrap();
        g.upsert_edge(
            EdgeKey::new("a", "b", "knows"),
            attrs([("since", AttrValue::Int(2020))]),
        )
        .unwrap();
        g.upsert_edge(
            EdgeKey::new("a", "c", "lives_in"),
            attrs([("since", AttrValue::Int(2015))]),
        )
        .unwrap();
        g
    }

    #[test]
    fn test_find_nodes_eq() {
        let g = populated_core();
        let hits = g.find_nodes(&NodeQuery::new().eq("type", "person")).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, NodeId::new("a"));
        assert_eq!(hits[1].0, NodeId::new("b"));
    }

    #[test]
    fn test_find_nodes_match_all() {
        let g = populated_core();
        assert_eq!(g.find_nodes(&NodeQuery::new()).unwrap().len(), 3);
    }

    #[test]
    fn test_find_nodes_range() {
        let g = populated_core();
        let hits = g
            .find_nodes(&NodeQuery::new().range("age", 35i64, 50i64))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, NodeId::new("b"));
    }

    #[test]
    fn test_index_and_scan_agree() {
        let mut g = populated_core();
        let query = NodeQuery::new().eq("type", "person").range("age", 0i64, 35i64);

        let scanned = g.find_nodes(&query).unwrap();
        g.build_index("type", IndexScope::Node).unwrap();
        let indexed = g.find_nodes(&query).unwrap();
        assert_eq!(scanned, indexed);

        g.build_index("age", IndexScope::Node).unwrap();
        let both_indexed = g.find_nodes(&query).unwrap();
        assert_eq!(scanned, both_indexed);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let g = populated_core();
        let err = g
            .find_nodes(&NodeQuery::new().range("age", 50i64, 35i64))
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation { .. }));
    }

    #[test]
    fn test_cached_result_reused_and_invalidated() {
        let mut g = populated_core();
        let query = NodeQuery::new().eq("type", "person");

        g.find_nodes(&query).unwrap();
        g.find_nodes(&query).unwrap();
        assert_eq!(g.cache.lock().stats().hits, 1);

        // Mutating a referenced attribute drops the entry.
        g.upsert_node("d".into(), attrs([("type", "person")])).unwrap();
        let hits = g.find_nodes(&query).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_find_edges_by_selector() {
        let g = populated_core();

        let from_a = g.find_edges(&EdgeQuery::new().src("a")).unwrap();
        assert_eq!(from_a.len(), 2);

        let knows = g.find_edges(&EdgeQuery::new().rel("knows")).unwrap();
        assert_eq!(knows.len(), 1);
        assert_eq!(knows[0].dst, NodeId::new("b"));

        let recent = g
            .find_edges(&EdgeQuery::new().src("a").eq("since", 2020i64))
            .unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn test_find_edges_with_edge_index() {
        let mut g = populated_core();
        let query = EdgeQuery::new().eq("since", 2015i64);

        let scanned = g.find_edges(&query).unwrap();
        g.build_index("since", IndexScope::Edge).unwrap();
        let indexed = g.find_edges(&query).unwrap();
        assert_eq!(scanned, indexed);
        assert_eq!(indexed.len(), 1);
    }

    #[test]
    fn test_fingerprints_distinguish_values() {
        let a = NodeQuery::new().eq("k", "1:x");
        let b = NodeQuery::new().eq("k", "1").eq("x", AttrValue::Null);
        assert_ne!(a.fingerprint(0), b.fingerprint(0));

        let c = NodeQuery::new().eq("k", 1i64);
        let d = NodeQuery::new().eq("k", 1.0f64);
        assert_ne!(c.fingerprint(0), d.fingerprint(0));

        // Epoch participates, so index changes retire old entries.
        assert_ne!(c.fingerprint(0), c.fingerprint(1));
    }

    #[test]
    fn test_advice_after_repeated_scans() {
        let mut g = GraphCore::new(
            "test".to_string(),
            QueryCache::new(0, None), // disable caching so every call scans
            IndexManager::new(AutoIndexPolicy {
                enabled: true,
                min_queries: 3,
                selectivity_threshold: 0.5,
            }),
        );
        for i in 0..20 {
            g.upsert_node(
                NodeId::new(format!("n{}", i)),
                attrs([("kind", AttrValue::from(if i % 2 == 0 { "even" } else { "odd" }))]),
            )
            .unwrap();
        }

        let query = NodeQuery::new().eq("kind", "even");
        let mut advice = None;
        for _ in 0..3 {
            advice = g.find_nodes_with_advice(&query).unwrap().1;
        }
        assert_eq!(advice, Some("kind".to_string()));
    }
}
