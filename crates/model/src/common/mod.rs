//! Common utilities and types used throughout the cost model.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Address Types:** A strong type for block-aligned addresses.
//! 2. **Constants:** Block and page geometry defaults.
//! 3. **Error Handling:** The configuration, solver, resolver, path, and search error taxonomy.

/// Block address type.
pub mod addr;

/// Geometry constants.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::{BlockAddr, align_mask, low_mask};
pub use constants::{DEFAULT_BLOCK_BITS, DEFAULT_PAGE_BITS};
pub use error::{ConfigError, PathError, PathFailure, ResolverFailure, SearchError, SolverError};
