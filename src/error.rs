//! Crate-level error taxonomy
//!
//! Lookup-style operations that may legitimately miss (`get_node`,
//! `shortest_path`) return `Option` instead of erring; everything that
//! violates a precondition surfaces one of these variants with enough
//! context to act on.

use crate::graph::GraphError;
use crate::persist::PersistenceError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("lock not acquired within {waited:?}")]
    ConcurrencyTimeout { waited: Duration },

    #[error("subgraph view '{name}' is detached: its graph was dropped")]
    ViewDetached { name: String },

    #[error("{resource} limit of {limit} exceeded")]
    ResourceLimitExceeded { resource: &'static str, limit: u64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
