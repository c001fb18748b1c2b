//! Edge representation: identity triple plus attributes

use super::types::{EdgeKey, NodeId, Relation};
use super::value::AttrMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A directed, labeled edge with attributes
///
/// This is the materialized form handed back from queries and written to
/// snapshots; the store itself keys attribute sets directly by [`EdgeKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub rel: Relation,
    pub attrs: AttrMap,
}

impl Edge {
    pub fn new(src: impl Into<NodeId>, dst: impl Into<NodeId>, rel: impl Into<Relation>, attrs: AttrMap) -> Self {
        Edge {
            src: src.into(),
            dst: dst.into(),
            rel: rel.into(),
            attrs,
        }
    }

    pub fn from_key(key: EdgeKey, attrs: AttrMap) -> Self {
        Edge {
            src: key.src,
            dst: key.dst,
            rel: key.rel,
            attrs,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            src: self.src.clone(),
            dst: self.dst.clone(),
            rel: self.rel.clone(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.src, self.rel, self.dst)
    }
}
