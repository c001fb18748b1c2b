//! Core identifier types for the graph engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
///
/// Identifiers are opaque strings supplied by the caller; the engine never
/// generates or reinterprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// Relation label carried by an edge (e.g., "knows", "works_at")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Relation(String);

impl Relation {
    pub fn new(rel: impl Into<String>) -> Self {
        Relation(rel.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Relation {
    fn from(s: String) -> Self {
        Relation(s)
    }
}

impl From<&str> for Relation {
    fn from(s: &str) -> Self {
        Relation(s.to_string())
    }
}

/// Identity of an edge: the (source, destination, relation) triple.
///
/// The triple is unique within a store; re-adding an existing triple
/// replaces its attributes instead of duplicating the edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeKey {
    pub src: NodeId,
    pub dst: NodeId,
    pub rel: Relation,
}

impl EdgeKey {
    pub fn new(src: impl Into<NodeId>, dst: impl Into<NodeId>, rel: impl Into<Relation>) -> Self {
        EdgeKey {
            src: src.into(),
            dst: dst.into(),
            rel: rel.into(),
        }
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint of this edge.
    pub fn other_endpoint(&self, id: &NodeId) -> Option<&NodeId> {
        if &self.src == id {
            Some(&self.dst)
        } else if &self.dst == id {
            Some(&self.src)
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.src, self.rel, self.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new("alice");
        assert_eq!(id.as_str(), "alice");
        assert_eq!(format!("{}", id), "alice");

        let id2: NodeId = "bob".into();
        assert!(id < id2);
    }

    #[test]
    fn test_relation() {
        let rel = Relation::new("knows");
        assert_eq!(rel.as_str(), "knows");
        assert_eq!(format!("{}", rel), "knows");
    }

    #[test]
    fn test_edge_key_display() {
        let key = EdgeKey::new("a", "b", "knows");
        assert_eq!(format!("{}", key), "a-[knows]->b");
    }

    #[test]
    fn test_other_endpoint() {
        let key = EdgeKey::new("a", "b", "r");
        assert_eq!(key.other_endpoint(&NodeId::new("a")), Some(&NodeId::new("b")));
        assert_eq!(key.other_endpoint(&NodeId::new("b")), Some(&NodeId::new("a")));
        assert_eq!(key.other_endpoint(&NodeId::new("c")), None);
    }
}
