//! Best-first scheduling over live paths.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::ExplorationPath;
use super::priority::{Priority, PriorityKey};
use crate::common::SearchError;
use crate::config::SearchMode;
use crate::engine::PathId;
use crate::icfg::IcfgCostMap;

/// Keeps every live path ordered by priority.
#[derive(Debug, Clone)]
pub struct DirectedSearcher {
    costs: Arc<IcfgCostMap>,
    mode: SearchMode,
    queue: BTreeSet<(PriorityKey, PathId)>,
    keys: HashMap<PathId, PriorityKey>,
    next_seq: u64,
}

impl DirectedSearcher {
    /// Creates an empty searcher over a shared cost map.
    ///
    /// # Arguments
    ///
    /// * `costs` - Static cost-to-boundary map, shared with other searchers.
    /// * `mode` - Whether the highest or the lowest cost path runs first.
    pub fn new(costs: Arc<IcfgCostMap>, mode: SearchMode) -> Self {
        Self {
            costs,
            mode,
            queue: BTreeSet::new(),
            keys: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Number of scheduled paths.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no path is scheduled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns true if `path` is scheduled.
    #[inline]
    pub fn contains(&self, path: PathId) -> bool {
        self.keys.contains_key(&path)
    }

    /// Computes the priority of `path` from its cache model and position.
    ///
    /// The static cost of the current instruction is added to the recorded
    /// cost. When that instruction cannot reach the boundary within its
    /// function, the cost after each enclosing call returns is added too,
    /// innermost first, until a call site that can reach it.
    ///
    /// # Returns
    ///
    /// [`Priority::Unarmed`] before the path entered the loop, otherwise the
    /// estimated cost per iteration alongside the recorded total.
    pub fn priority(&self, path: &impl ExplorationPath) -> Priority {
        let model = path.cache_model();
        let iterations = model.num_iterations();
        if iterations == 0 {
            return Priority::Unarmed;
        }

        let total_cost = model.estimate_total_cost();
        let here = self.costs.entry(path.current_instruction());
        let mut estimate = total_cost + here.lower_bound_cost as f64;
        if !here.on_direct_path {
            for &call_site in path.call_stack().iter().rev() {
                estimate += self.costs.successor_cost(call_site) as f64;
                if self.costs.entry(call_site).on_direct_path {
                    break;
                }
            }
        }

        let per_iteration = estimate / iterations as f64;
        tracing::trace!(path = %path.id(), iterations, total_cost, per_iteration, "priority");
        Priority::Armed {
            per_iteration,
            total_cost,
        }
    }

    /// The path to resume next.
    ///
    /// # Returns
    ///
    /// The highest-keyed path, or `None` when nothing is scheduled.
    pub fn select_next(&self) -> Option<PathId> {
        self.queue.last().map(|&(_, id)| id)
    }

    /// Applies one scheduling step.
    ///
    /// `current` is re-keyed since it ran, `added` paths are scheduled, and
    /// `removed` paths are dropped, in that order.
    ///
    /// # Arguments
    ///
    /// * `current` - The path that just ran, if it is still live.
    /// * `added` - Paths forked or created during the step.
    /// * `removed` - Paths that finished or were terminated.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::UnknownPath`] if `current` or a removed path was
    /// never scheduled and [`SearchError::DuplicatePath`] if an added path
    /// already is. Updates before the offending path are kept.
    pub fn update<'p, P: ExplorationPath + 'p>(
        &mut self,
        current: Option<&P>,
        added: impl IntoIterator<Item = &'p P>,
        removed: impl IntoIterator<Item = PathId>,
    ) -> Result<(), SearchError> {
        if let Some(path) = current {
            let id = path.id();
            let old = self.keys.get(&id).copied().ok_or(SearchError::UnknownPath(id))?;
            let _ = self.queue.remove(&(old, id));
            let key = PriorityKey::new(self.priority(path), self.mode, old.seq());
            self.schedule(id, key);
        }

        for path in added {
            let id = path.id();
            if self.keys.contains_key(&id) {
                return Err(SearchError::DuplicatePath(id));
            }
            let key = PriorityKey::new(self.priority(path), self.mode, self.next_seq);
            self.next_seq += 1;
            self.schedule(id, key);
        }

        for id in removed {
            let key = self.keys.remove(&id).ok_or(SearchError::UnknownPath(id))?;
            let _ = self.queue.remove(&(key, id));
        }
        Ok(())
    }

    fn schedule(&mut self, id: PathId, key: PriorityKey) {
        let _ = self.keys.insert(id, key);
        let _ = self.queue.insert((key, id));
    }
}
