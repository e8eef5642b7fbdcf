//! Cache geometry constants.

/// Default log2 of the cache block size (64-byte blocks).
pub const DEFAULT_BLOCK_BITS: u32 = 6;

/// Default log2 of the page size used to key contention sets (1 GiB pages).
///
/// Contention sets are discovered on huge pages, so only the page-offset bits
/// of an address identify its set.
pub const DEFAULT_PAGE_BITS: u32 = 30;

