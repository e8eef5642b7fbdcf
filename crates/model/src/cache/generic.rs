//! Modulo-indexed multi-level cache hierarchy.
//!
//! Each level is a set of lines selected by `block % lines`, each line an LRU
//! bucket of `ways` entries. Levels are write-back or write-through
//! independently; DRAM sits one past the last level and always hits.
//!
//! An access walks down the hierarchy only as far as it must:
//! - a hit stops at the level that holds the block, unless it is a write to a
//!   write-through level, which is forwarded down;
//! - a miss evicts the LRU entry of a full line (writing it back down first if
//!   dirty) and fetches from the next level, except a write to a write-back
//!   level, which allocates without fetching.

use std::collections::HashMap;
use std::sync::Arc;

use super::entry::{CacheBucket, CacheEntry};
use super::indexer::{BucketId, ModuloIndexer};
use super::policies::{LruPolicy, ReplacementPolicy};
use super::{CacheModel, CandidateBucket};
use crate::common::{BlockAddr, align_mask};
use crate::config::{CacheLevelConfig, GenericConfig, TimingConfig};
use crate::engine::AddressConstraint;
use crate::stats::{self, IterationLog, LoopIterationStats};

/// Shared, immutable description of a hierarchy.
#[derive(Debug)]
struct Layout {
    levels: Vec<CacheLevelConfig>,
    indexer: ModuloIndexer,
    max_lines: u64,
    /// Level latencies followed by DRAM.
    latencies: Vec<f64>,
    level_names: Vec<String>,
    timing: TimingConfig,
}

/// Multi-level modulo-indexed LRU cache model.
#[derive(Debug, Clone)]
pub struct GenericHierarchy {
    layout: Arc<Layout>,
    policy: LruPolicy,
    clock: u64,
    /// Resident lines per level.
    tables: Vec<HashMap<BucketId, CacheBucket>>,
    log: IterationLog,
}

impl GenericHierarchy {
    /// Creates an empty, unarmed hierarchy.
    pub fn new(config: &GenericConfig, timing: TimingConfig, max_iterations: Option<usize>) -> Self {
        for (idx, level) in config.levels.iter().enumerate() {
            tracing::info!(
                level = idx + 1,
                size_bytes = level.size_bytes,
                ways = level.ways,
                lines = level.num_lines(config.block_bits),
                latency_ns = level.latency,
                write_back = level.write_back,
                "cache level"
            );
        }

        let depth = config.levels.len();
        let mut latencies: Vec<f64> = config.levels.iter().map(|l| l.latency).collect();
        latencies.push(config.dram_latency);
        let mut level_names: Vec<String> = (1..=depth).map(|n| format!("L{n} Hits")).collect();
        level_names.push("DRAM Accesses".to_string());

        Self {
            layout: Arc::new(Layout {
                levels: config.levels.clone(),
                indexer: ModuloIndexer::new(config),
                max_lines: config.max_lines() as u64,
                latencies,
                level_names,
                timing,
            }),
            policy: LruPolicy,
            clock: 0,
            tables: vec![HashMap::new(); depth],
            log: IterationLog::new(depth + 1, max_iterations),
        }
    }

    /// Returns true if the block holding `address` is resident at `level`.
    pub fn is_resident(&self, address: u64, level: usize) -> bool {
        self.bucket_at(address, level)
            .is_some_and(|bucket| bucket.contains(self.block_of(address)))
    }

    /// Number of entries resident in the line `address` maps to at `level`.
    pub fn occupancy(&self, address: u64, level: usize) -> usize {
        self.bucket_at(address, level).map_or(0, CacheBucket::len)
    }

    /// Returns true if the block holding `address` is dirty at `level`.
    pub fn is_dirty(&self, address: u64, level: usize) -> bool {
        self.bucket_at(address, level)
            .and_then(|bucket| bucket.get(self.block_of(address)))
            .is_some_and(|entry| entry.dirty)
    }

    fn block_of(&self, address: u64) -> BlockAddr {
        BlockAddr::containing(address, self.layout.indexer.block_bits())
    }

    fn bucket_at(&self, address: u64, level: usize) -> Option<&CacheBucket> {
        let bucket = self.layout.indexer.locate(address, level)?;
        self.tables.get(level)?.get(&bucket.id)
    }

    fn record(&mut self, update: impl FnOnce(&mut LoopIterationStats)) {
        if let Some(current) = self.log.current_mut() {
            update(current);
        }
    }

    /// Performs an access at `level` and everything it forwards downward.
    fn update(&mut self, address: u64, is_write: bool, level: usize) -> f64 {
        let Some(bucket) = self.layout.indexer.locate(address, level) else {
            self.record(|it| it.record_hit(level));
            return self.layout.latencies[level];
        };
        let layout = Arc::clone(&self.layout);
        let config = &layout.levels[level];
        let block = self.block_of(address);

        if level == 0 {
            self.clock += 1;
        }
        let now = self.clock;

        let entries = self.tables[level].entry(bucket.id).or_default();
        if let Some(entry) = entries.get_mut(block) {
            entry.last_use = now;
            if is_write {
                entry.dirty = config.write_back;
            }
            if is_write && !config.write_back {
                return self.update(address, true, level + 1);
            }
            self.record(|it| it.record_hit(level));
            return config.latency;
        }

        let evicted = if entries.len() >= bucket.ways {
            self.policy
                .victim(entries)
                .and_then(|victim| entries.remove(victim))
        } else {
            None
        };

        let mut cost = 0.0;
        if let Some(evicted) = evicted {
            self.record(|it| it.eviction_count += 1);
            if evicted.dirty {
                self.record(|it| it.writeback_count += 1);
                let base = evicted.block.base(layout.indexer.block_bits());
                cost += self.update(base, true, level + 1);
            }
        }

        if !is_write || !config.write_back {
            cost += self.update(address, is_write, level + 1);
        }

        let _ = self.tables[level]
            .entry(bucket.id)
            .or_default()
            .insert(CacheEntry {
                block,
                last_use: now,
                dirty: is_write && config.write_back,
            });
        cost
    }

    /// Cost of writing back the victim a miss at `level` would evict.
    fn eviction_cost(&self, address: u64, level: usize) -> f64 {
        let Some(bucket) = self.layout.indexer.locate(address, level) else {
            return 0.0;
        };
        let Some(entries) = self.tables[level].get(&bucket.id) else {
            return 0.0;
        };
        if entries.len() < bucket.ways {
            return 0.0;
        }
        self.policy
            .victim(entries)
            .and_then(|victim| entries.get(victim))
            .filter(|entry| entry.dirty)
            .map_or(0.0, |entry| {
                self.cost_at(entry.block.base(self.layout.indexer.block_bits()), true, level + 1)
            })
    }

    fn cost_at(&self, address: u64, is_write: bool, level: usize) -> f64 {
        let Some(config) = self.layout.levels.get(level) else {
            return self.layout.latencies[level];
        };
        if self.is_resident(address, level) {
            return if is_write && !config.write_back {
                self.cost_at(address, true, level + 1)
            } else {
                config.latency
            };
        }
        let fill = if !is_write || !config.write_back {
            self.cost_at(address, is_write, level + 1)
        } else {
            config.latency
        };
        self.eviction_cost(address, level) + fill
    }

    fn miss_cost_at(&self, address: u64, is_write: bool, level: usize) -> f64 {
        let Some(config) = self.layout.levels.get(level) else {
            return self.layout.latencies[level];
        };
        let fill = if !is_write || !config.write_back {
            self.miss_cost_at(address, is_write, level + 1)
        } else {
            config.latency
        };
        self.eviction_cost(address, level) + fill
    }
}

impl CacheModel for GenericHierarchy {
    fn access(&mut self, address: u64, is_write: bool) -> f64 {
        if !self.log.is_armed() {
            return 0.0;
        }
        self.record(|it| {
            if is_write {
                it.write_count += 1;
            } else {
                it.read_count += 1;
            }
        });
        self.update(address, is_write, 0)
    }

    fn begin_iteration(&mut self) -> bool {
        let started = self.log.begin();
        if started {
            tracing::trace!(iteration = self.log.iterations().len(), "loop iteration");
        }
        started
    }

    fn record_instruction(&mut self) {
        self.record(|it| it.instruction_count += 1);
    }

    fn estimate_total_cost(&self) -> f64 {
        stats::total_cost(self.log.iterations(), &self.layout.latencies, &self.layout.timing)
    }

    fn is_armed(&self) -> bool {
        self.log.is_armed()
    }

    fn iterations(&self) -> &[LoopIterationStats] {
        self.log.iterations()
    }

    fn cost(&self, address: u64, is_write: bool) -> f64 {
        self.cost_at(address, is_write, 0)
    }

    fn rank_candidates(&self, is_write: bool) -> Vec<CandidateBucket> {
        let block_bits = self.layout.indexer.block_bits();
        let ways = self.layout.levels.first().map_or(0, |level| level.ways);
        (0..self.layout.max_lines)
            .map(|line| {
                let address = line << block_bits;
                CandidateBucket {
                    id: BucketId::Line(line),
                    miss_cost: self.miss_cost_at(address, is_write, 0),
                    slack: ways.saturating_sub(self.occupancy(address, 0)),
                }
            })
            .collect()
    }

    /// A single attempt: pin the index bits to `line` and exclude every block
    /// already resident in the lines it maps to, so the access is a miss
    /// down to DRAM.
    fn candidate_attempts(&self, bucket: BucketId) -> Vec<Vec<AddressConstraint>> {
        let BucketId::Line(line) = bucket else {
            return Vec::new();
        };
        let block_bits = self.layout.indexer.block_bits();
        let index_mask = (self.layout.max_lines.next_power_of_two() - 1) << block_bits;
        let address = line << block_bits;

        let mut constraints = vec![AddressConstraint::MaskedEq {
            mask: index_mask,
            value: address & index_mask,
        }];
        for level in 0..self.layout.levels.len() {
            if let Some(entries) = self.bucket_at(address, level) {
                constraints.extend(entries.iter().map(|entry| AddressConstraint::MaskedNe {
                    mask: align_mask(block_bits),
                    value: entry.block.base(block_bits),
                }));
            }
        }
        vec![constraints]
    }

    fn clone_model(&self) -> Box<dyn CacheModel> {
        Box::new(self.clone())
    }

    fn dump_stats(&self) -> String {
        stats::dump_stats(
            self.log.iterations(),
            &self.layout.level_names,
            &self.layout.latencies,
            &self.layout.timing,
        )
    }
}
