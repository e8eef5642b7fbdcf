//! Contention-Set Model Unit Tests.
//!
//! Default geometry: 64-byte blocks, 1 GiB page keys, write-back, hits at the
//! L3 latency and misses at the DRAM latency.

use cachehunt_core::cache::{BucketId, CacheModel};
use cachehunt_core::config::defaults;
use cachehunt_core::engine::AddressConstraint;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::builders::armed_contention;

const THREE_IN_TWO: &str = "2\n4096\n8192\n12288\n";

/// Mask of the default page key: bits 6 through 29.
const KEY_MASK: u64 = 0x3FFF_FFC0;

// ──────────────────────────────────────────────────────────
// Access outcomes
// ──────────────────────────────────────────────────────────

#[test]
fn set_holds_at_most_its_associativity() {
    let mut model = armed_contention(THREE_IN_TWO);

    for address in [0x1000, 0x2000, 0x3000] {
        assert_eq!(model.access(address, false), defaults::DRAM_LATENCY);
    }

    let stats = &model.iterations()[0];
    assert_eq!(stats.hit_counts, vec![0, 3]);
    assert_eq!(stats.eviction_count, 1);
    assert_eq!(model.occupancy(BucketId::Set(0)), 2);
    assert!(!model.is_resident(0x1000), "oldest key was evicted");
}

#[test]
fn hit_in_any_listed_set_counts_as_hit() {
    let mut model = armed_contention("1\n4096\n\n1\n4096\n8192\n");

    let _ = model.access(0x1000, false);
    let _ = model.access(0x2000, false);
    assert_eq!(
        model.access(0x1000, false),
        defaults::L3_LATENCY,
        "set 0 still holds the block even though set 1 evicted it"
    );

    let stats = &model.iterations()[0];
    assert_eq!(stats.hit_counts, vec![1, 2]);
    assert_eq!(stats.eviction_count, 2);
}

#[test]
fn dirty_eviction_charges_an_extra_miss() {
    let mut model = armed_contention("1\n4096\n8192\n");

    let _ = model.access(0x1000, true);
    assert_eq!(model.access(0x2000, false), 2.0 * defaults::DRAM_LATENCY);

    let stats = &model.iterations()[0];
    assert_eq!(stats.hit_counts, vec![0, 3]);
    assert_eq!(stats.writeback_count, 1);
}

#[test]
fn unlisted_keys_share_the_catch_all_bucket() {
    let mut model = armed_contention(THREE_IN_TWO);

    let _ = model.access(0x7_0000, false);
    let _ = model.access(0x7_0040, false);

    assert_eq!(model.occupancy(BucketId::Unclassified), 2);
    assert_eq!(model.occupancy(BucketId::Set(0)), 0);
    assert_eq!(model.access(0x7_0000, false), defaults::L3_LATENCY);
}

#[test]
fn predicted_cost_sees_dirty_victims() {
    let mut model = armed_contention("1\n4096\n8192\n");
    let _ = model.access(0x1000, true);

    assert_eq!(model.cost(0x1000, false), defaults::L3_LATENCY);
    assert_eq!(model.cost(0x2000, false), 2.0 * defaults::DRAM_LATENCY);
}

// ──────────────────────────────────────────────────────────
// Candidate sets
// ──────────────────────────────────────────────────────────

#[test]
fn full_dirty_set_ranks_above_clean_one() {
    let mut model = armed_contention("2\n4096\n8192\n\n2\n16384\n20480\n");
    let _ = model.access(0x1000, true);
    let _ = model.access(0x2000, true);
    let _ = model.access(0x4000, false);
    let _ = model.access(0x5000, false);

    let candidates = model.rank_candidates(false);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].miss_cost, 2.0 * defaults::DRAM_LATENCY);
    assert_eq!(candidates[1].miss_cost, defaults::DRAM_LATENCY);
    assert!(candidates.iter().all(|c| c.slack == 0));
}

#[test]
fn attempts_skip_resident_keys_and_exclude_them() {
    let mut model = armed_contention(THREE_IN_TWO);
    let _ = model.access(0x1000, false);

    let exclude = AddressConstraint::MaskedNe {
        mask: KEY_MASK,
        value: 0x1000,
    };
    assert_eq!(
        model.candidate_attempts(BucketId::Set(0)),
        vec![
            vec![AddressConstraint::MaskedEq { mask: KEY_MASK, value: 0x2000 }, exclude],
            vec![AddressConstraint::MaskedEq { mask: KEY_MASK, value: 0x3000 }, exclude],
        ]
    );
    assert!(model.candidate_attempts(BucketId::Set(7)).is_empty());
}

proptest! {
    /// No access sequence overfills a set.
    #[test]
    fn occupancy_never_exceeds_associativity(
        ops in prop::collection::vec((0usize..4, any::<bool>()), 1..64)
    ) {
        const KEYS: [u64; 4] = [0x1000, 0x2000, 0x3000, 0x5000];
        let mut model = armed_contention(THREE_IN_TWO);
        for (key, is_write) in ops {
            let _ = model.access(KEYS[key], is_write);
            prop_assert!(model.occupancy(BucketId::Set(0)) <= 2);
        }
    }
}
