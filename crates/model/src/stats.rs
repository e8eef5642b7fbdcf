//! Loop iteration statistics collection and reporting.
//!
//! This module tracks what each iteration of the instrumented loop did. It provides:
//! 1. **Counters:** Instructions, reads, writes, evictions, and write-backs per iteration.
//! 2. **Hit accounting:** Hits per level, with the last slot counting DRAM accesses.
//! 3. **Cost estimation:** Per-iteration and total latency under a [`TimingConfig`].
//! 4. **Reporting:** A human-readable per-iteration dump.

use std::fmt::Write as _;

use crate::config::TimingConfig;

/// Counters for one observed loop iteration.
///
/// One instance is appended per iteration; it is only mutated while it is the
/// last entry of its path's list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopIterationStats {
    /// Instructions executed during the iteration.
    pub instruction_count: u64,
    /// Loads issued.
    pub read_count: u64,
    /// Stores issued.
    pub write_count: u64,
    /// Hits per level; the last slot is DRAM (or "miss" for the contention model).
    pub hit_counts: Vec<u64>,
    /// Entries evicted to make room.
    pub eviction_count: u64,
    /// Dirty entries written back on eviction.
    pub writeback_count: u64,
}

impl LoopIterationStats {
    /// Creates an empty record with one hit counter per level.
    pub fn new(levels: usize) -> Self {
        Self {
            hit_counts: vec![0; levels],
            ..Self::default()
        }
    }

    /// Records a hit at `level`.
    #[inline]
    pub fn record_hit(&mut self, level: usize) {
        if let Some(count) = self.hit_counts.get_mut(level) {
            *count += 1;
        }
    }

    /// Estimated latency of this iteration.
    ///
    /// `overhead + instructions * ns_per_instruction + sum(hits[level] * latency[level])`.
    pub fn estimated_cost(&self, latencies: &[f64], timing: &TimingConfig) -> f64 {
        let memory: f64 = self
            .hit_counts
            .iter()
            .zip(latencies)
            .map(|(&hits, &latency)| hits as f64 * latency)
            .sum();
        timing.fixed_overhead_ns + self.instruction_count as f64 * timing.ns_per_instruction + memory
    }
}

/// Arming state and per-iteration records of one cache model.
///
/// Models are unarmed until the loop is first entered; nothing is recorded
/// before that. Every later boundary appends a fresh record, up to an
/// optional cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationLog {
    levels: usize,
    max_iterations: Option<usize>,
    armed: bool,
    iterations: Vec<LoopIterationStats>,
}

impl IterationLog {
    /// Creates an unarmed log whose records carry `levels` hit counters.
    pub const fn new(levels: usize, max_iterations: Option<usize>) -> Self {
        Self {
            levels,
            max_iterations,
            armed: false,
            iterations: Vec::new(),
        }
    }

    /// Returns true once the first loop boundary was seen.
    #[inline]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Starts a new iteration.
    ///
    /// The first call arms the log and always succeeds. Later calls fail once
    /// the cap is reached, leaving the records untouched.
    pub fn begin(&mut self) -> bool {
        if self.armed {
            if let Some(max) = self.max_iterations {
                if self.iterations.len() >= max {
                    return false;
                }
            }
        } else {
            self.armed = true;
        }
        self.iterations.push(LoopIterationStats::new(self.levels));
        true
    }

    /// The iteration being recorded, if armed.
    #[inline]
    pub fn current_mut(&mut self) -> Option<&mut LoopIterationStats> {
        self.iterations.last_mut()
    }

    /// All recorded iterations, oldest first.
    #[inline]
    pub fn iterations(&self) -> &[LoopIterationStats] {
        &self.iterations
    }
}

/// Sums the estimated cost of every recorded iteration.
pub fn total_cost(iterations: &[LoopIterationStats], latencies: &[f64], timing: &TimingConfig) -> f64 {
    iterations
        .iter()
        .map(|it| it.estimated_cost(latencies, timing))
        .sum()
}

/// Formats a per-iteration report.
///
/// `level_names` labels each hit counter; its length must match `latencies`.
pub fn dump_stats(
    iterations: &[LoopIterationStats],
    level_names: &[String],
    latencies: &[f64],
    timing: &TimingConfig,
) -> String {
    let mut out = String::new();
    for (idx, it) in iterations.iter().enumerate() {
        let _ = writeln!(out, "Loop Iteration {idx}");
        let _ = writeln!(out, "  Instructions: {}", it.instruction_count);
        let _ = writeln!(out, "  Reads: {}", it.read_count);
        let _ = writeln!(out, "  Writes: {}", it.write_count);
        for (name, hits) in level_names.iter().zip(&it.hit_counts) {
            let _ = writeln!(out, "  {name}: {hits}");
        }
        let _ = writeln!(out, "  Evictions: {}", it.eviction_count);
        let _ = writeln!(out, "  Write-backs: {}", it.writeback_count);
        let ns = it.estimated_cost(latencies, timing);
        let _ = writeln!(out, "  Estimated Execution Time: {ns:.2} ns");
        if ns > 0.0 {
            let _ = writeln!(out, "  Estimated Throughput (Single Core): {:.3} Mpps", 1e3 / ns);
        }
    }
    out
}
