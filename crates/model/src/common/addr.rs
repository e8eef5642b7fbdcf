//! Block-aligned address type.
//!
//! Cache tables are keyed by block number rather than byte address. `BlockAddr`
//! keeps the two from being mixed up at the call sites that convert between them.

use std::fmt;

/// A block number: a byte address shifted right by the block bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockAddr(pub u64);

impl BlockAddr {
    /// Returns the block containing `address`.
    #[inline]
    pub const fn containing(address: u64, block_bits: u32) -> Self {
        Self(address >> block_bits)
    }

    /// Returns the first byte address of the block.
    #[inline]
    pub const fn base(self, block_bits: u32) -> u64 {
        self.0 << block_bits
    }

    /// Returns the raw block number.
    #[inline]
    pub const fn val(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {:#x}", self.0)
    }
}

/// Returns a mask clearing the low `bits` bits.
#[inline]
pub const fn align_mask(bits: u32) -> u64 {
    if bits >= 64 { 0 } else { !0u64 << bits }
}

/// Returns a mask keeping only the low `bits` bits.
#[inline]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { !0u64 } else { (1u64 << bits) - 1 }
}
