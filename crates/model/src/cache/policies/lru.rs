//! Least Recently Used (LRU) Replacement Policy.
//!
//! Evicts the entry with the oldest logical use time. Entries carry their own
//! timestamps, so the policy itself is stateless and a cloned hierarchy needs
//! no policy state copied alongside its tables.
//!
//! # Performance
//!
//! - `victim()`: O(W) where W is the number of resident entries in the bucket.

use super::ReplacementPolicy;
use crate::cache::entry::CacheBucket;
use crate::common::BlockAddr;

/// LRU policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LruPolicy;

impl ReplacementPolicy for LruPolicy {
    /// Returns the least recently used block.
    ///
    /// Among entries sharing the oldest timestamp the lowest block wins.
    fn victim(&self, bucket: &CacheBucket) -> Option<BlockAddr> {
        bucket
            .iter()
            .min_by_key(|entry| entry.last_use)
            .map(|entry| entry.block)
    }
}
