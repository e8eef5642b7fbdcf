//! Cache entries and the buckets that hold them.
//!
//! A bucket is one line of a modulo-indexed level or one contention set. It
//! maps block addresses to their LRU timestamp and dirty bit; capacity is
//! enforced by the owning model, not by the bucket.

use std::collections::BTreeMap;

use crate::common::BlockAddr;

/// A resident block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Block held by the entry.
    pub block: BlockAddr,
    /// Logical time of the most recent use.
    pub last_use: u64,
    /// Modified since it was brought in (write-back levels only).
    pub dirty: bool,
}

/// The resident entries of one line or contention set.
///
/// Entries are kept ordered by block so iteration, and therefore victim
/// selection among equal timestamps, is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheBucket {
    entries: BTreeMap<BlockAddr, CacheEntry>,
}

impl CacheBucket {
    /// Number of resident entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `block` is resident.
    #[inline]
    pub fn contains(&self, block: BlockAddr) -> bool {
        self.entries.contains_key(&block)
    }

    /// Returns the entry for `block`, if resident.
    #[inline]
    pub fn get(&self, block: BlockAddr) -> Option<&CacheEntry> {
        self.entries.get(&block)
    }

    /// Returns the entry for `block` mutably, if resident.
    #[inline]
    pub fn get_mut(&mut self, block: BlockAddr) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&block)
    }

    /// Installs `entry`, returning the entry it replaced for the same block.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(entry.block, entry)
    }

    /// Removes `block`, returning its entry.
    pub fn remove(&mut self, block: BlockAddr) -> Option<CacheEntry> {
        self.entries.remove(&block)
    }

    /// Iterates over resident entries in block order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }
}
