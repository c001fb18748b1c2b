//! Secondary index structures and their manager

pub mod attr_index;
pub mod manager;

pub use attr_index::AttrIndex;
pub use manager::{AutoIndexPolicy, IndexDetail, IndexManager, IndexScope, IndexStats};
