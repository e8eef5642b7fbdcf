//! Path priorities and their scheduling order.

use std::cmp::{Ordering, Reverse};

use crate::config::SearchMode;

/// A path's scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Priority {
    /// The loop was not entered yet; scheduled before any armed path.
    Unarmed,
    /// Cost estimate per recorded iteration.
    Armed {
        /// Estimated cost per iteration, including the distance to the boundary.
        per_iteration: f64,
        /// Estimated cost of all recorded iterations.
        total_cost: f64,
    },
}

impl Priority {
    /// Numeric value; unarmed paths report infinity.
    pub const fn value(&self) -> f64 {
        match *self {
            Self::Unarmed => f64::INFINITY,
            Self::Armed { per_iteration, .. } => per_iteration,
        }
    }
}

/// Total order over priorities for one search direction.
///
/// Greater keys are scheduled first: unarmed paths, then the best
/// per-iteration cost, then the best total cost, then the earliest inserted.
#[derive(Debug, Clone, Copy)]
pub struct PriorityKey {
    unarmed: bool,
    score: f64,
    total: f64,
    seq: Reverse<u64>,
}

impl PriorityKey {
    /// Builds the key of `priority` for path number `seq`.
    pub fn new(priority: Priority, mode: SearchMode, seq: u64) -> Self {
        let orient = |value: f64| match mode {
            SearchMode::WorstCase => value,
            SearchMode::BestCase => -value,
        };
        let (unarmed, score, total) = match priority {
            Priority::Unarmed => (true, 0.0, 0.0),
            Priority::Armed {
                per_iteration,
                total_cost,
            } => (false, orient(per_iteration), orient(total_cost)),
        };
        Self {
            unarmed,
            score,
            total,
            seq: Reverse(seq),
        }
    }

    /// Insertion sequence number.
    #[inline]
    pub const fn seq(&self) -> u64 {
        self.seq.0
    }
}

impl PartialEq for PriorityKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityKey {}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unarmed
            .cmp(&other.unarmed)
            .then_with(|| self.score.total_cmp(&other.score))
            .then_with(|| self.total.total_cmp(&other.total))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
