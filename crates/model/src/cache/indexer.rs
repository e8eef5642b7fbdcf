//! Cache line indexing.
//!
//! Maps a concrete address to the bucket it competes for at a given level,
//! together with the number of entries that bucket can hold. Both indexers
//! are pure: the same `(address, level)` always yields the same bucket.

use std::sync::Arc;

use super::contention_sets::ContentionSetTable;
use crate::common::BlockAddr;
use crate::config::{ContentionSetConfig, GenericConfig};

/// Identifies a bucket within one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketId {
    /// A line of a modulo-indexed level.
    Line(u64),
    /// A contention set, by index into its table.
    Set(usize),
    /// Catch-all for addresses outside every known contention set.
    Unclassified,
}

/// A bucket and its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Which bucket.
    pub id: BucketId,
    /// Entries it holds before evicting.
    pub ways: usize,
}

/// Modulo indexing: `line = (address >> block_bits) % (size / ways / block_size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuloIndexer {
    block_bits: u32,
    /// `(lines, ways)` per level, closest level first.
    geometry: Vec<(u64, usize)>,
}

impl ModuloIndexer {
    /// Precomputes line counts for every configured level.
    pub fn new(config: &GenericConfig) -> Self {
        Self {
            block_bits: config.block_bits,
            geometry: config
                .levels
                .iter()
                .map(|level| (level.num_lines(config.block_bits) as u64, level.ways))
                .collect(),
        }
    }

    /// Log2 of the block size.
    #[inline]
    pub const fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// Number of lines at `level`, or zero past the last level.
    pub fn num_lines(&self, level: usize) -> u64 {
        self.geometry.get(level).map_or(0, |&(lines, _)| lines)
    }

    /// Returns the bucket `address` maps to at `level`.
    ///
    /// Returns `None` for the DRAM level (one past the last cache level).
    pub fn locate(&self, address: u64, level: usize) -> Option<Bucket> {
        let &(lines, ways) = self.geometry.get(level)?;
        let block = BlockAddr::containing(address, self.block_bits);
        Some(Bucket {
            id: BucketId::Line(block.val() % lines),
            ways,
        })
    }
}

/// Contention-set indexing.
///
/// An address competes in every set whose member list contains its
/// block-aligned page offset. Addresses outside every set fall into a
/// single fully associative bucket the size of the whole cache.
///
/// The catch-all bucket is a modeling approximation: real hardware maps those
/// addresses somewhere specific, so costs charged to them are not a bound.
#[derive(Debug, Clone)]
pub struct ContentionIndexer {
    table: Arc<ContentionSetTable>,
    page_key_mask: u64,
    capacity_blocks: usize,
}

impl ContentionIndexer {
    /// Builds an indexer over a loaded set table.
    pub fn new(config: &ContentionSetConfig, table: Arc<ContentionSetTable>) -> Self {
        Self {
            table,
            page_key_mask: config.page_key_mask(),
            capacity_blocks: config.capacity_blocks(),
        }
    }

    /// The underlying set table.
    #[inline]
    pub fn table(&self) -> &ContentionSetTable {
        &self.table
    }

    /// Key under which contention sets list an address.
    #[inline]
    pub const fn page_key(&self, address: u64) -> u64 {
        address & self.page_key_mask
    }

    /// Mask selecting the page-offset block bits.
    #[inline]
    pub const fn page_key_mask(&self) -> u64 {
        self.page_key_mask
    }

    /// Returns every bucket `address` competes in.
    pub fn locate(&self, address: u64) -> Vec<Bucket> {
        let sets = self.table.sets_containing(self.page_key(address));
        if sets.is_empty() {
            return vec![Bucket {
                id: BucketId::Unclassified,
                ways: self.capacity_blocks,
            }];
        }
        sets.iter()
            .map(|&idx| Bucket {
                id: BucketId::Set(idx),
                ways: self.table.associativity(idx),
            })
            .collect()
    }
}
