//! Symbolic address resolution.
//!
//! When an access goes through an address the engine has not fixed yet, the
//! resolver picks a concrete value for it. In worst-case mode it steers the
//! choice toward the bucket whose miss would cost the most:
//!
//! 1. Simplify the address under the path constraints.
//! 2. Rank every bucket of the cache model (see [`ranking`]).
//! 3. For each bucket in order, try each of its constraint lists; the first
//!    one the solver can satisfy yields the value.
//! 4. Otherwise terminate (`terminate_on_unsat`) or fall back to any value.
//!
//! The caller pins the address to the returned value so later decisions on
//! the same path stay consistent.

/// Candidate ordering.
pub mod ranking;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cache::CacheModel;
use crate::common::{ResolverFailure, SolverError};
use crate::config::ResolverConfig;
use crate::engine::{AddressConstraint, SymbolicBackend};

/// A concrete value chosen for a symbolic address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The chosen address.
    pub value: u64,
    /// Constraint to add to the path; `None` when the address was already constant.
    pub constraint: Option<AddressConstraint>,
    /// Whether the value came from the worst-case search.
    pub biased: bool,
}

impl Resolution {
    const fn pinned(value: u64, biased: bool) -> Self {
        Self {
            value,
            constraint: Some(AddressConstraint::Equals(value)),
            biased,
        }
    }
}

/// Outcome of one candidate search.
enum Search {
    Found(u64),
    Exhausted { tried: usize },
}

/// Chooses concrete values for symbolic addresses.
///
/// Tie-break keys are drawn from a fresh stream seeded with the same value on
/// every call, so equal inputs always resolve to equal values regardless of
/// how many resolutions came before.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    config: ResolverConfig,
    seed: u64,
}

impl AddressResolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolution policy. Without `config.seed`, one seed is drawn
    ///   from the OS here and reused for the resolver's lifetime.
    pub fn new(config: ResolverConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self { config, seed }
    }

    /// Picks a concrete value for `address`.
    ///
    /// # Arguments
    ///
    /// * `backend` - Solver collaborator that owns `constraints` and `address`.
    /// * `constraints` - Path condition the value must satisfy.
    /// * `model` - Cache state of the path; ranks the candidate buckets.
    /// * `address` - The address expression being accessed.
    /// * `is_write` - Whether the access is a store.
    ///
    /// # Returns
    ///
    /// The chosen value, with the equality the caller should add to the path
    /// unless the address was already constant.
    ///
    /// # Errors
    ///
    /// - [`ResolverFailure::NoCandidate`] if worst-case search found nothing and
    ///   `terminate_on_unsat` is set.
    /// - [`ResolverFailure::Unsatisfiable`] if the path admits no value at all.
    /// - [`ResolverFailure::Solver`] on a fallback solver error, or on any solver
    ///   error when `fail_on_solver_error` is set.
    pub fn resolve<B: SymbolicBackend>(
        &self,
        backend: &mut B,
        constraints: &B::Constraints,
        model: &dyn CacheModel,
        address: &B::Expr,
        is_write: bool,
    ) -> Result<Resolution, ResolverFailure> {
        let expr = backend.simplify(address, constraints);
        if let Some(value) = backend.as_constant(&expr) {
            return Ok(Resolution {
                value,
                constraint: None,
                biased: false,
            });
        }

        if self.config.worst_case_indices {
            match self.search(backend, constraints, model, &expr, is_write)? {
                Search::Found(value) => return Ok(Resolution::pinned(value, true)),
                Search::Exhausted { tried } => {
                    if self.config.terminate_on_unsat {
                        tracing::warn!(tried, "no candidate bucket is reachable");
                        return Err(ResolverFailure::NoCandidate);
                    }
                    tracing::warn!(tried, "falling back to unbiased concretization");
                }
            }
        }

        match backend.get_value(constraints, &expr)? {
            Some(value) => Ok(Resolution::pinned(value, false)),
            None => Err(ResolverFailure::Unsatisfiable),
        }
    }

    fn search<B: SymbolicBackend>(
        &self,
        backend: &mut B,
        constraints: &B::Constraints,
        model: &dyn CacheModel,
        expr: &B::Expr,
        is_write: bool,
    ) -> Result<Search, ResolverFailure> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let ranked = ranking::rank(model.rank_candidates(is_write), &mut rng);
        if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
            tracing::debug!(
                candidates = ranked.len(),
                max_cost = best.bucket.miss_cost,
                min_cost = worst.bucket.miss_cost,
                "ranking candidate buckets"
            );
        }

        let mut tried = 0;
        for candidate in &ranked {
            for attempt in model.candidate_attempts(candidate.bucket.id) {
                tried += 1;
                match try_attempt(backend, constraints, expr, &attempt) {
                    Ok(Some(value)) => {
                        tracing::debug!(
                            bucket = ?candidate.bucket.id,
                            miss_cost = candidate.bucket.miss_cost,
                            value = format_args!("{value:#x}"),
                            "resolved symbolic address"
                        );
                        return Ok(Search::Found(value));
                    }
                    Ok(None) if self.config.give_up_on_complex_indices => {
                        return Ok(Search::Exhausted { tried });
                    }
                    Ok(None) => {}
                    Err(err) if self.config.fail_on_solver_error => return Err(err.into()),
                    Err(err) => {
                        tracing::warn!(bucket = ?candidate.bucket.id, %err, "solver error, skipping candidate");
                    }
                }
            }
        }
        Ok(Search::Exhausted { tried })
    }
}

/// Applies `attempt` on top of `constraints` and asks for a value of `expr`.
fn try_attempt<B: SymbolicBackend>(
    backend: &mut B,
    constraints: &B::Constraints,
    expr: &B::Expr,
    attempt: &[AddressConstraint],
) -> Result<Option<u64>, SolverError> {
    let mut augmented = constraints.clone();
    for &constraint in attempt {
        match backend.constrain(&augmented, expr, constraint) {
            Some(next) => augmented = next,
            None => return Ok(None),
        }
    }
    if !backend.is_satisfiable(&augmented)? {
        return Ok(None);
    }
    backend.get_value(&augmented, expr)
}
