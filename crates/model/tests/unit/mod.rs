//! # Unit Components
//!
//! Tests organized after the source tree: cache models, configuration,
//! statistics, address resolution, the ICFG analysis, the searcher, and the
//! engine hooks that tie them together.


/// Configuration defaults, JSON loading, and validation.
pub mod config;



/// Symbolic address resolution tests.
pub mod resolver;
