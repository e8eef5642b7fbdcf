//! Directed path scheduling.
//!
//! Chooses which exploration path the engine resumes next. Each path is
//! scored by its live cache cost per loop iteration plus the static distance
//! from its current instruction back to the loop boundary, and the searcher
//! always yields the best-scoring one.

/// Priorities and their order.
pub mod priority;

/// The scheduler.
pub mod searcher;

pub use priority::{Priority, PriorityKey};
pub use searcher::DirectedSearcher;

use crate::cache::CacheModel;
use crate::engine::PathId;
use crate::icfg::InstId;

/// What the searcher needs to know about a path.
pub trait ExplorationPath {
    /// Stable identifier.
    fn id(&self) -> PathId;
    /// The path's cache model.
    fn cache_model(&self) -> &dyn CacheModel;
    /// Instruction the path resumes at.
    fn current_instruction(&self) -> InstId;
    /// Call sites of the active frames, outermost first.
    fn call_stack(&self) -> &[InstId];
}
