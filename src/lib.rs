//! Tantu Graph Engine
//!
//! An embeddable, in-memory graph data engine: typed, attributed nodes;
//! directed, labeled edges with O(1) triple addressing; adaptive secondary
//! indexes; traversal algorithms; live filtered subgraph views; an LRU/TTL
//! query cache; and multi-format, crash-safe persistence. One
//! reader/writer lock guards the whole store, so the engine is safe to
//! share across a caller's worker pool.
//!
//! # Example
//!
//! ```rust
//! use tantu::{Graph, NodeQuery};
//! use tantu::graph::{attrs, AttrMap, NodeId};
//!
//! let graph = Graph::new();
//! graph.add_node("alice", attrs([("type", "person"), ("city", "pune")]))?;
//! graph.add_node("bob", attrs([("type", "person")]))?;
//! graph.add_edge("alice", "bob", "knows", AttrMap::new())?;
//!
//! // Attribute filters work identically with or without an index.
//! let people = graph.find_nodes(&NodeQuery::new().eq("type", "person"))?;
//! assert_eq!(people.len(), 2);
//!
//! // Traversals run under a shared read lock.
//! let path = graph.shortest_path(&NodeId::new("alice"), &NodeId::new("bob"), None)?;
//! assert_eq!(path, Some(vec![NodeId::new("alice"), NodeId::new("bob")]));
//! # Ok::<(), tantu::EngineError>(())
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod persist;
pub mod query;
pub mod resource;
pub mod traverse;
pub mod view;

// Re-export main types for convenience
pub use config::{CacheConfig, EngineConfig, LimitsConfig, PersistenceConfig};
pub use engine::{Graph, GraphStats, SavePolicy, ScopedGraph};
pub use error::{EngineError, EngineResult};
pub use graph::{
    attrs, AttrMap, AttrValue, Edge, EdgeKey, EdgeSelector, GraphError, GraphResult, NodeId,
    Relation,
};
pub use index::{AutoIndexPolicy, IndexScope, IndexStats};
pub use persist::{Format, PersistenceError, PersistenceManager, Snapshot, SnapshotMeta};
pub use query::{CacheStats, EdgeQuery, NodeQuery};
pub use resource::MemoryBreakdown;
pub use traverse::Traversal;
pub use view::{SubgraphView, ViewStats};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "1.0.0");
    }
}
