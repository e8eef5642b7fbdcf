//! Worst-case memory-hierarchy cost model for symbolic execution.
//!
//! This crate estimates the memory-hierarchy latency a marked loop incurs
//! across its iterations and steers a symbolic-execution engine toward the
//! inputs that maximize (or minimize) it. It provides:
//! 1. **Cache models:** A modulo-indexed multi-level hierarchy and a
//!    contention-set model, both with LRU and write-back/write-through levels.
//! 2. **Address resolution:** Worst-case concretization of symbolic addresses
//!    negotiated with an external constraint solver.
//! 3. **Static analysis:** Distance-to-loop-boundary lower bounds over the
//!    interprocedural control-flow graph.
//! 4. **Search:** A best-first searcher combining static bounds with live
//!    per-path cache statistics.
//! 5. **Engine boundary:** Traits and per-path state the host engine plugs into.

/// Common types and constants (block addresses, error taxonomy).
pub mod common;
/// Model configuration (defaults, serde structures, validation).
pub mod config;
/// Cache models (indexers, contention sets, hierarchies).
pub mod cache;
/// Symbolic address resolution with worst-case bias.
pub mod resolver;
/// Collaborator boundary: solver backend, per-path state, engine hooks.
pub mod engine;
/// Interprocedural control-flow graph and cost-to-boundary analysis.
pub mod icfg;
/// Directed best-first path scheduling.
pub mod search;
/// Per-iteration statistics and reporting.
pub mod stats;

/// Capability shared by all cache models; build one with [`cache::build_model`].
pub use crate::cache::CacheModel;
/// Root configuration type; use `Config::default()` or [`Config::from_json`].
pub use crate::config::Config;
/// Engine-facing facade; call it from load/store, loop marker, and step hooks.
pub use crate::engine::CostHooks;
/// Static cost map shared read-only by every path.
pub use crate::icfg::IcfgCostMap;
/// Best-first path scheduler.
pub use crate::search::DirectedSearcher;
