//! Cache Replacement Policies.
//!
//! Selects the entry to evict when a full bucket must accept a new block.
//! Only LRU is modeled: the cost estimates assume it, and the worst-case
//! address search ranks buckets by how soon LRU will evict from them.

/// Least Recently Used replacement policy.
pub mod lru;

pub use lru::LruPolicy;

use super::entry::CacheBucket;
use crate::common::BlockAddr;

/// Trait for cache replacement policies.
pub trait ReplacementPolicy {
    /// Selects the block to evict from `bucket`.
    ///
    /// Returns `None` only for an empty bucket.
    fn victim(&self, bucket: &CacheBucket) -> Option<BlockAddr>;
}
