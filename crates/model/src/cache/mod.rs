//! Cache Models.
//!
//! A cache model observes every memory access a symbolic path makes inside
//! the instrumented loop and keeps an estimate of what that loop costs on a
//! real memory hierarchy. It provides:
//! 1. **Two models:** A modulo-indexed multi-level LRU hierarchy ([`GenericHierarchy`])
//!    and a contention-set model driven by measured sets ([`ContentionSetHierarchy`]).
//! 2. **Loop accounting:** Per-iteration counters started at loop boundaries.
//! 3. **What-if queries:** The cost an access would have without performing it.
//! 4. **Candidate ranking:** Buckets ordered by how expensive the next access to
//!    them would be, and the address constraints that target each one.
//!
//! Models are owned by paths and deep-copied when a path forks. Configuration
//! and indexing tables are shared between copies.

/// Contention set tables and their text format.
pub mod contention_sets;

/// Cache entries and buckets.
pub mod entry;

/// Address to bucket mapping.
pub mod indexer;

/// Replacement policies.
pub mod policies;

/// Contention-set cache model.
pub mod contention;

/// Modulo-indexed multi-level cache model.
pub mod generic;

use std::sync::Arc;

pub use contention::ContentionSetHierarchy;
pub use contention_sets::{ContentionSet, ContentionSetTable};
pub use generic::GenericHierarchy;
pub use indexer::{Bucket, BucketId};

use crate::common::ConfigError;
use crate::config::{Config, ModelConfig};
use crate::engine::AddressConstraint;
use crate::stats::LoopIterationStats;

/// A bucket the next access could be steered into, with its ranking keys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateBucket {
    /// The bucket.
    pub id: BucketId,
    /// Cost of an access that misses there.
    pub miss_cost: f64,
    /// Free entries before the bucket starts evicting.
    pub slack: usize,
}

/// A cache model attached to one symbolic path.
pub trait CacheModel: std::fmt::Debug + Send {
    /// Simulates an access and returns the latency charged for it.
    ///
    /// Does nothing and returns zero until the model is armed.
    fn access(&mut self, address: u64, is_write: bool) -> f64;

    /// Marks a loop boundary.
    ///
    /// The first call arms the model. Returns false when the iteration cap is
    /// reached, meaning the path should stop.
    fn begin_iteration(&mut self) -> bool;

    /// Counts one executed instruction in the current iteration.
    fn record_instruction(&mut self);

    /// Estimated cost of every recorded iteration.
    fn estimate_total_cost(&self) -> f64;

    /// Number of recorded iterations.
    fn num_iterations(&self) -> usize {
        self.iterations().len()
    }

    /// Returns true once the loop was entered.
    fn is_armed(&self) -> bool;

    /// Recorded iterations, oldest first.
    fn iterations(&self) -> &[LoopIterationStats];

    /// Latency `access` would charge, without changing any state.
    fn cost(&self, address: u64, is_write: bool) -> f64;

    /// Every bucket the next access could target, unordered.
    fn rank_candidates(&self, is_write: bool) -> Vec<CandidateBucket>;

    /// Constraint lists that each steer an address into `bucket`.
    ///
    /// Lists are tried in order; the first satisfiable one wins.
    fn candidate_attempts(&self, bucket: BucketId) -> Vec<Vec<AddressConstraint>>;

    /// Deep copy for a forked path.
    fn clone_model(&self) -> Box<dyn CacheModel>;

    /// Human-readable per-iteration report.
    fn dump_stats(&self) -> String;
}

impl Clone for Box<dyn CacheModel> {
    fn clone(&self) -> Self {
        self.clone_model()
    }
}

/// Builds the model selected by `config`.
///
/// The contention-set model reads its sets from `sets_path`.
pub fn build_model(config: &Config) -> Result<Box<dyn CacheModel>, ConfigError> {
    build_model_with_table(config, None)
}

/// Builds the model selected by `config`, using `table` for the contention-set
/// model instead of loading `sets_path`.
pub fn build_model_with_table(
    config: &Config,
    table: Option<Arc<ContentionSetTable>>,
) -> Result<Box<dyn CacheModel>, ConfigError> {
    config.validate()?;
    match &config.model {
        ModelConfig::Generic(generic) => Ok(Box::new(GenericHierarchy::new(
            generic,
            config.timing,
            config.exploration.max_iterations,
        ))),
        ModelConfig::ContentionSets(sets) => {
            let table = match (table, &sets.sets_path) {
                (Some(table), _) => table,
                (None, Some(path)) => Arc::new(ContentionSetTable::load(path)?),
                (None, None) => return Err(ConfigError::MissingContentionSets),
            };
            Ok(Box::new(ContentionSetHierarchy::new(
                sets,
                table,
                config.timing,
                config.exploration.max_iterations,
            )))
        }
    }
}
