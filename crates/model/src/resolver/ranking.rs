//! Candidate bucket ordering.
//!
//! Most expensive miss first, then the bucket closest to evicting, then a
//! random key drawn per candidate so equal buckets are not always visited in
//! table order.

use std::cmp::Ordering;

use rand::Rng;

use crate::cache::CandidateBucket;

/// A candidate bucket with its tie-breaking key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCandidate {
    /// The bucket and its cost keys.
    pub bucket: CandidateBucket,
    /// Random final tie-break.
    pub tie: u64,
}

impl RankedCandidate {
    fn order(&self, other: &Self) -> Ordering {
        other
            .bucket
            .miss_cost
            .total_cmp(&self.bucket.miss_cost)
            .then_with(|| self.bucket.slack.cmp(&other.bucket.slack))
            .then_with(|| self.tie.cmp(&other.tie))
    }
}

/// Orders `candidates` best first, drawing tie-break keys from `rng`.
///
/// Keys are drawn in input order, so the same input and seed always yield the
/// same ranking.
pub fn rank(candidates: Vec<CandidateBucket>, rng: &mut impl Rng) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|bucket| RankedCandidate {
            bucket,
            tie: rng.random(),
        })
        .collect();
    ranked.sort_by(RankedCandidate::order);
    ranked
}
