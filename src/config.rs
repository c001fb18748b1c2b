//! Engine configuration
//!
//! A plain serde-derived value: the embedding application owns
//! file/env loading and hands the engine a finished `EngineConfig`.
//! Every knob has a usable default.

use crate::index::AutoIndexPolicy;
use serde::{Deserialize, Serialize};

/// Query-cache sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached result sets; 0 disables caching entirely
    pub capacity: usize,
    /// Entries expire this many seconds after insertion; 0 disables TTL
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl_secs: 3600,
        }
    }
}

/// Persistence defaults; all overridable per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Format used when neither the call nor the file extension says
    pub default_format: String,
    /// Force compression on/off regardless of format defaults
    pub compress: Option<bool>,
    /// Entities per frame in the streaming encoding
    pub chunk_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            default_format: "msgpack".to_string(),
            compress: None,
            chunk_size: 8192,
        }
    }
}

/// Optional hard ceilings; exceeding one fails the mutation with
/// `ResourceLimitExceeded`. The memory budget instead triggers
/// best-effort reclamation (cache shrink, auto-index pruning).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_nodes: Option<u64>,
    pub max_edges: Option<u64>,
    pub memory_budget_bytes: Option<u64>,
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Instance name, recorded in snapshot metadata
    pub name: String,
    pub cache: CacheConfig,
    pub auto_index: AutoIndexPolicy,
    pub persistence: PersistenceConfig,
    /// Node attribute indexes built at construction time
    pub default_indexes: Vec<String>,
    /// Bound lock acquisition; `None` blocks indefinitely
    pub lock_timeout_ms: Option<u64>,
    pub limits: LimitsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "tantu".to_string(),
            cache: CacheConfig::default(),
            auto_index: AutoIndexPolicy::default(),
            persistence: PersistenceConfig::default(),
            default_indexes: Vec::new(),
            lock_timeout_ms: None,
            limits: LimitsConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
