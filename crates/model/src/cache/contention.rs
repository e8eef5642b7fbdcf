//! Contention-set cache model.
//!
//! Instead of a geometric model, this hierarchy uses contention sets measured
//! on the target machine: an access competes in every set its page key is
//! listed in and hits if any of them still holds its block. Keys outside all
//! sets share one fully associative bucket sized to the whole cache.
//!
//! Accesses are counted as either hits or DRAM accesses; a dirty eviction
//! charges one extra DRAM access for the write-back.

use std::collections::HashMap;
use std::sync::Arc;

use super::contention_sets::ContentionSetTable;
use super::entry::{CacheBucket, CacheEntry};
use super::indexer::{BucketId, ContentionIndexer};
use super::policies::{LruPolicy, ReplacementPolicy};
use super::{CacheModel, CandidateBucket};
use crate::common::BlockAddr;
use crate::config::{ContentionSetConfig, TimingConfig};
use crate::engine::AddressConstraint;
use crate::stats::{self, IterationLog, LoopIterationStats};

const HIT: usize = 0;
const MISS: usize = 1;

#[derive(Debug)]
struct Layout {
    indexer: ContentionIndexer,
    block_bits: u32,
    write_back: bool,
    /// `[hit, miss]`.
    latencies: [f64; 2],
    level_names: [String; 2],
    timing: TimingConfig,
}

/// Cache model driven by measured contention sets.
#[derive(Debug, Clone)]
pub struct ContentionSetHierarchy {
    layout: Arc<Layout>,
    policy: LruPolicy,
    clock: u64,
    tables: HashMap<BucketId, CacheBucket>,
    log: IterationLog,
}

impl ContentionSetHierarchy {
    /// Creates an empty, unarmed model over `table`.
    pub fn new(
        config: &ContentionSetConfig,
        table: Arc<ContentionSetTable>,
        timing: TimingConfig,
        max_iterations: Option<usize>,
    ) -> Self {
        tracing::info!(
            sets = table.len(),
            cache_size_bytes = config.cache_size_bytes,
            unclassified_blocks = config.capacity_blocks(),
            hit_ns = config.hit_latency,
            miss_ns = config.miss_latency,
            "contention-set cache model"
        );
        Self {
            layout: Arc::new(Layout {
                indexer: ContentionIndexer::new(config, table),
                block_bits: config.block_bits,
                write_back: config.write_back,
                latencies: [config.hit_latency, config.miss_latency],
                level_names: ["Cache Hits".to_string(), "DRAM Accesses".to_string()],
                timing,
            }),
            policy: LruPolicy,
            clock: 0,
            tables: HashMap::new(),
            log: IterationLog::new(2, max_iterations),
        }
    }

    /// Number of blocks resident in `bucket`.
    pub fn occupancy(&self, bucket: BucketId) -> usize {
        self.tables.get(&bucket).map_or(0, CacheBucket::len)
    }

    /// Returns true if any bucket `address` competes in holds its block.
    pub fn is_resident(&self, address: u64) -> bool {
        let block = self.block_of(address);
        self.layout
            .indexer
            .locate(address)
            .iter()
            .any(|bucket| self.tables.get(&bucket.id).is_some_and(|b| b.contains(block)))
    }

    /// Returns true if some set listing `key` holds a block with that key.
    fn key_resident(&self, key: u64) -> bool {
        let indexer = &self.layout.indexer;
        indexer.table().sets_containing(key).iter().any(|&idx| {
            self.tables.get(&BucketId::Set(idx)).is_some_and(|entries| {
                entries
                    .iter()
                    .any(|entry| indexer.page_key(entry.block.base(self.layout.block_bits)) == key)
            })
        })
    }

    fn block_of(&self, address: u64) -> BlockAddr {
        BlockAddr::containing(address, self.layout.block_bits)
    }

    fn record(&mut self, update: impl FnOnce(&mut LoopIterationStats)) {
        if let Some(current) = self.log.current_mut() {
            update(current);
        }
    }

    /// Returns true if a miss in `bucket` would evict a dirty entry.
    fn evicts_dirty(&self, bucket: BucketId, ways: usize) -> bool {
        self.tables.get(&bucket).is_some_and(|entries| {
            entries.len() >= ways
                && self
                    .policy
                    .victim(entries)
                    .and_then(|victim| entries.get(victim))
                    .is_some_and(|entry| entry.dirty)
        })
    }

    fn fill_cost(&self, is_write: bool) -> f64 {
        let [hit, miss] = self.layout.latencies;
        if is_write && self.layout.write_back { hit } else { miss }
    }

    fn update(&mut self, address: u64, is_write: bool) -> f64 {
        let layout = Arc::clone(&self.layout);
        let block = self.block_of(address);
        self.clock += 1;
        let now = self.clock;

        let mut hit = false;
        let mut evictions = 0;
        let mut dirty_evictions = 0;
        for bucket in layout.indexer.locate(address) {
            let entries = self.tables.entry(bucket.id).or_default();
            if let Some(entry) = entries.get_mut(block) {
                entry.last_use = now;
                if is_write {
                    entry.dirty = layout.write_back;
                }
                hit |= !is_write || layout.write_back;
                continue;
            }
            if entries.len() >= bucket.ways {
                if let Some(evicted) = self
                    .policy
                    .victim(entries)
                    .and_then(|victim| entries.remove(victim))
                {
                    evictions += 1;
                    if evicted.dirty {
                        dirty_evictions += 1;
                    }
                }
            }
            let _ = entries.insert(CacheEntry {
                block,
                last_use: now,
                dirty: is_write && layout.write_back,
            });
        }

        let outcome = if hit { HIT } else { MISS };
        let writeback_miss = dirty_evictions > 0;
        self.record(|it| {
            it.record_hit(outcome);
            if writeback_miss {
                it.record_hit(MISS);
            }
            it.eviction_count += evictions;
            it.writeback_count += dirty_evictions;
        });

        let [hit_ns, miss_ns] = layout.latencies;
        let mut cost = if hit { hit_ns } else { miss_ns };
        if writeback_miss {
            cost += miss_ns;
        }
        cost
    }
}

impl CacheModel for ContentionSetHierarchy {
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
        self.update(address, is_write)
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
        let [hit_ns, miss_ns] = self.layout.latencies;
        if self.is_resident(address) && (!is_write || self.layout.write_back) {
            return hit_ns;
        }
        let block = self.block_of(address);
        let writeback = self.layout.indexer.locate(address).iter().any(|bucket| {
            let resident = self.tables.get(&bucket.id).is_some_and(|b| b.contains(block));
            !resident && self.evicts_dirty(bucket.id, bucket.ways)
        });
        miss_ns + if writeback { miss_ns } else { 0.0 }
    }

    fn rank_candidates(&self, is_write: bool) -> Vec<CandidateBucket> {
        let [_, miss_ns] = self.layout.latencies;
        let table = self.layout.indexer.table();
        table
            .sets()
            .iter()
            .enumerate()
            .map(|(idx, set)| {
                let id = BucketId::Set(idx);
                let writeback = if self.evicts_dirty(id, set.associativity) {
                    miss_ns
                } else {
                    0.0
                };
                CandidateBucket {
                    id,
                    miss_cost: writeback + self.fill_cost(is_write),
                    slack: set.associativity.saturating_sub(self.occupancy(id)),
                }
            })
            .collect()
    }

    /// One attempt per member key not already resident anywhere it is
    /// listed, each also excluding the keys resident in this set.
    fn candidate_attempts(&self, bucket: BucketId) -> Vec<Vec<AddressConstraint>> {
        let BucketId::Set(idx) = bucket else {
            return Vec::new();
        };
        let Some(set) = self.layout.indexer.table().get(idx) else {
            return Vec::new();
        };
        let mask = self.layout.indexer.page_key_mask();
        let resident_keys: Vec<u64> = self
            .tables
            .get(&bucket)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| entry.block.base(self.layout.block_bits) & mask)
                    .collect()
            })
            .unwrap_or_default();

        set.addresses
            .iter()
            .filter(|&&key| !self.key_resident(key))
            .map(|&key| {
                let mut attempt = vec![AddressConstraint::MaskedEq { mask, value: key }];
                attempt.extend(
                    resident_keys
                        .iter()
                        .map(|&value| AddressConstraint::MaskedNe { mask, value }),
                );
                attempt
            })
            .collect()
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
