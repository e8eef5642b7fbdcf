//! Static cost-to-boundary analysis.
//!
//! For every instruction, computes whether some path from it reaches a call
//! to the loop boundary marker without first leaving the function, and a
//! lower bound on the weighted instruction count to get there (or to the
//! function exit when no such path exists).
//!
//! Costs flow backward from two kinds of seeds: instructions without
//! successors, and calls to the marker. Each instruction remembers the
//! multiset of instructions on the path its cost came from; a successor's
//! cost is only taken if the instruction appears on that path at most once,
//! which bounds how many times a cycle can be unrolled into a cost.

use std::collections::{BTreeSet, HashMap};

use super::graph::{Icfg, Node};
use super::{InstId, Program};
use crate::common::ConfigError;

/// Worklist rounds allowed per instruction before giving up.
const ROUNDS_PER_INSTRUCTION: usize = 1024;

/// Cost information for one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CostEntry {
    /// Some path from here reaches the loop boundary marker.
    pub on_direct_path: bool,
    /// Weighted instructions to the marker, or to the exit if not on a direct path.
    pub lower_bound_cost: u64,
}

/// The analysis result, shared read-only by all paths.
#[derive(Debug, Clone, Default)]
pub struct IcfgCostMap {
    costs: HashMap<InstId, CostEntry>,
    successor_costs: HashMap<InstId, u64>,
}

impl IcfgCostMap {
    /// Builds the graph of `program` and analyzes it.
    ///
    /// # Arguments
    ///
    /// * `program` - Static description of every function and basic block.
    /// * `marker` - Name of the function whose calls mark a loop boundary.
    ///
    /// # Returns
    ///
    /// Per-instruction lower bounds on the cost to the next boundary or
    /// program exit, plus the successor costs of composed call sites.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Program`] if the program is malformed.
    pub fn analyze(program: &Program, marker: &str) -> Result<Self, ConfigError> {
        let icfg = Icfg::build(program)?;
        Ok(Self::from_icfg(&icfg, marker))
    }

    /// Analyzes an already built graph.
    ///
    /// A program that never calls `marker` still gets exit costs; that case
    /// is logged as a warning.
    pub fn from_icfg(icfg: &Icfg, marker: &str) -> Self {
        tracing::info!(instructions = icfg.len(), marker, "computing ICFG cost map");
        let mut analysis = Analysis::new(icfg);
        analysis.seed(marker);
        analysis.run();

        let costs = (0..icfg.len())
            .map(|node| (icfg.id(node), analysis.costs[node]))
            .collect();
        let successor_costs = analysis
            .successor_costs
            .into_iter()
            .map(|(node, cost)| (icfg.id(node), cost))
            .collect();
        Self {
            costs,
            successor_costs,
        }
    }

    /// Cost entry of `inst`; unknown instructions get the default entry.
    #[inline]
    pub fn entry(&self, inst: InstId) -> CostEntry {
        self.costs.get(&inst).copied().unwrap_or_default()
    }

    /// Cost from a call site's return to the boundary, excluding the callee.
    ///
    /// Zero for call sites whose cost was not composed from the successor.
    #[inline]
    pub fn successor_cost(&self, call_site: InstId) -> u64 {
        self.successor_costs.get(&call_site).copied().unwrap_or(0)
    }

    /// Number of analyzed instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Returns true if nothing was analyzed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// All entries in ascending instruction order.
    pub fn entries(&self) -> Vec<(InstId, CostEntry)> {
        let mut entries: Vec<_> = self.costs.iter().map(|(&id, &cost)| (id, cost)).collect();
        entries.sort_unstable_by_key(|&(id, _)| id);
        entries
    }
}

type PathCounts = HashMap<Node, u32>;

/// Fixed-point state.
struct Analysis<'a> {
    icfg: &'a Icfg,
    marker: Option<usize>,
    costs: Vec<CostEntry>,
    paths: Vec<PathCounts>,
    successor_costs: HashMap<Node, u64>,
    worklist: BTreeSet<Node>,
}

impl<'a> Analysis<'a> {
    fn new(icfg: &'a Icfg) -> Self {
        Self {
            icfg,
            marker: None,
            costs: vec![CostEntry::default(); icfg.len()],
            paths: vec![PathCounts::new(); icfg.len()],
            successor_costs: HashMap::new(),
            worklist: BTreeSet::new(),
        }
    }

    fn seed(&mut self, marker: &str) {
        for node in 0..self.icfg.len() {
            if self.icfg.successors(node).is_empty() {
                self.set_seed(node, false);
            }
        }

        self.marker = self.icfg.function_index(marker);
        match self.marker {
            Some(func) => {
                for &call in self.icfg.callers(func) {
                    self.set_seed(call, true);
                }
            }
            None => tracing::warn!(marker, "loop boundary marker not found; no instruction is on a direct path"),
        }
    }

    fn set_seed(&mut self, node: Node, on_direct_path: bool) {
        self.costs[node] = CostEntry {
            on_direct_path,
            lower_bound_cost: 1,
        };
        self.paths[node] = PathCounts::from([(node, 1)]);
        self.schedule_upstream(node);
    }

    /// Queues everything whose cost may depend on `node`.
    fn schedule_upstream(&mut self, node: Node) {
        self.worklist.extend(self.icfg.predecessors(node));
        if self.icfg.is_entry(node) {
            self.worklist.extend(self.icfg.callers(self.icfg.function_of(node)));
        }
    }

    fn run(&mut self) {
        let budget = self.icfg.len().saturating_mul(ROUNDS_PER_INSTRUCTION).max(ROUNDS_PER_INSTRUCTION);
        let mut rounds = 0usize;
        while let Some(node) = self.worklist.pop_first() {
            rounds += 1;
            if rounds > budget {
                tracing::warn!(rounds, pending = self.worklist.len() + 1, "cost map did not converge, stopping");
                return;
            }

            let target = self.icfg.call_target(node);
            let changed = match target {
                Some(func) if Some(func) == self.marker => false,
                Some(func) => match self.icfg.entry(func) {
                    Some(entry) => self.compose_call(node, entry),
                    None => self.relax(node),
                },
                None => self.relax(node),
            };
            if changed {
                self.schedule_upstream(node);
            }
        }
        tracing::debug!(rounds, "cost map converged");
    }

    /// Takes the best successor cost for a plain instruction.
    fn relax(&mut self, node: Node) -> bool {
        let weight = self.icfg.kind(node).weight();
        let mut changed = false;
        for &succ in self.icfg.successors(node) {
            if self.paths[succ].get(&node).copied().unwrap_or(0) > 1 {
                continue;
            }
            let offered = self.costs[succ];
            let current = self.costs[node];
            let cost = offered.lower_bound_cost + weight;
            let better = if current.on_direct_path {
                offered.on_direct_path && cost > current.lower_bound_cost
            } else {
                offered.on_direct_path || cost > current.lower_bound_cost
            };
            if better {
                self.costs[node] = CostEntry {
                    on_direct_path: offered.on_direct_path,
                    lower_bound_cost: cost,
                };
                let mut path = self.paths[succ].clone();
                *path.entry(node).or_default() += 1;
                self.paths[node] = path;
                changed = true;
            }
        }
        changed
    }

    /// Composes the callee's cost into a call site.
    fn compose_call(&mut self, node: Node, callee_entry: Node) -> bool {
        if self.paths[callee_entry].contains_key(&node) {
            return false;
        }

        let callee = self.costs[callee_entry];
        let (cost, path) = if callee.on_direct_path {
            let mut path = self.paths[callee_entry].clone();
            *path.entry(node).or_default() += 1;
            let cost = CostEntry {
                on_direct_path: true,
                lower_bound_cost: callee.lower_bound_cost + 1,
            };
            (cost, path)
        } else {
            let Some(&succ) = self.icfg.successors(node).first() else {
                return self.relax(node);
            };
            let mut cost = CostEntry {
                on_direct_path: self.costs[succ].on_direct_path,
                lower_bound_cost: 0,
            };
            let mut path = PathCounts::new();
            if !self.paths[callee_entry].is_empty() && !self.paths[succ].is_empty() {
                let _ = path.insert(node, 1);
                for (&inst, &count) in self.paths[callee_entry].iter().chain(&self.paths[succ]) {
                    *path.entry(inst).or_default() += count;
                }
                let after = self.costs[succ].lower_bound_cost;
                cost.lower_bound_cost = 1 + callee.lower_bound_cost + after;
                let _ = self.successor_costs.insert(node, after);
            }
            (cost, path)
        };

        if cost == self.costs[node] {
            return false;
        }
        self.costs[node] = cost;
        self.paths[node] = path;
        true
    }
}
