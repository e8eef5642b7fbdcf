//! Address Resolver Unit Tests.
//!
//! Most scenarios use the `four_lines()` cache after dirty writes to `0x0`
//! and `0x100`: line 0 is full and evicting from it costs a write-back, so it
//! is the most expensive candidate at 200 ns against 100 ns elsewhere.

use cachehunt_core::cache::{CacheModel, GenericHierarchy};
use cachehunt_core::common::{ResolverFailure, SolverError};
use cachehunt_core::config::ResolverConfig;
use cachehunt_core::engine::{AddressConstraint, EnumConstraints, EnumerativeBackend, SymbolicBackend};
use cachehunt_core::resolver::{AddressResolver, Resolution};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builders::{armed_hierarchy, four_lines};
use crate::common::init_tracing;
use crate::common::mocks::symbolic_backend;

fn dirty_line_zero() -> GenericHierarchy {
    let mut model = armed_hierarchy(four_lines());
    let _ = model.access(0x0, true);
    let _ = model.access(0x100, true);
    model
}

fn resolver(config: ResolverConfig) -> AddressResolver {
    AddressResolver::new(ResolverConfig {
        seed: Some(42),
        ..config
    })
}

fn worst_case() -> ResolverConfig {
    ResolverConfig {
        worst_case_indices: true,
        ..ResolverConfig::default()
    }
}

// ──────────────────────────────────────────────────────────
// Worst-case search
// ──────────────────────────────────────────────────────────

/// Line 0 is chosen; its resident blocks are excluded, so the first address
/// that maps there and is not already cached is `0x200`.
#[test]
fn picks_most_expensive_line_avoiding_resident_blocks() {
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);

    let resolution = resolver(worst_case())
        .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false)
        .unwrap();

    assert_eq!(
        resolution,
        Resolution {
            value: 0x200,
            constraint: Some(AddressConstraint::Equals(0x200)),
            biased: true,
        }
    );
    assert_eq!(model.cost(resolution.value, false), 200.0);
}

/// Equal miss costs: the line with the least free space goes first.
#[test]
fn fuller_line_breaks_cost_ties() {
    let mut model = armed_hierarchy(four_lines());
    let _ = model.access(0x40, false);
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);

    let resolution = resolver(worst_case())
        .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false)
        .unwrap();
    assert_eq!(resolution.value, 0x140);
}

#[test]
fn same_seed_same_choice() {
    let model = armed_hierarchy(four_lines());
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);
    let constraints = EnumConstraints::default();

    let first = resolver(worst_case())
        .resolve(&mut backend, &constraints, &model, &address, true)
        .unwrap();
    let second = resolver(worst_case())
        .resolve(&mut backend, &constraints, &model, &address, true)
        .unwrap();

    assert_eq!(first, second);
    assert!(first.biased);
}

/// Earlier resolutions do not shift the tie-break order of later ones.
#[test]
fn repeated_resolutions_agree() {
    let model = armed_hierarchy(four_lines());
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);
    let constraints = EnumConstraints::default();
    let resolver = resolver(worst_case());

    let picks: Vec<u64> = (0..8)
        .map(|_| {
            resolver
                .resolve(&mut backend, &constraints, &model, &address, false)
                .unwrap()
                .value
        })
        .collect();

    assert!(picks.iter().all(|&value| value == picks[0]), "picks diverged: {picks:x?}");
}

/// Without a configured seed, one resolver still answers consistently.
#[test]
fn unseeded_resolver_is_stable_across_calls() {
    let model = armed_hierarchy(four_lines());
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);
    let constraints = EnumConstraints::default();
    let resolver = AddressResolver::new(worst_case());

    let first = resolver
        .resolve(&mut backend, &constraints, &model, &address, false)
        .unwrap();
    let second = resolver
        .resolve(&mut backend, &constraints, &model, &address, false)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn constant_address_needs_no_solver() {
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..1, 0x1234, 0x40);

    let resolution = resolver(worst_case())
        .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false)
        .unwrap();

    assert_eq!(
        resolution,
        Resolution {
            value: 0x1234,
            constraint: None,
            biased: false,
        }
    );
    assert_eq!(backend.queries(), 0);
}

// ──────────────────────────────────────────────────────────
// Fallback policy
// ──────────────────────────────────────────────────────────

#[test]
fn unbiased_mode_takes_any_value() {
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..64, 0, 0x40);

    let resolution = resolver(ResolverConfig::default())
        .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false)
        .unwrap();

    assert_eq!(resolution.value, 0x0);
    assert!(!resolution.biased);
    assert_eq!(backend.queries(), 1);
}

/// Both reachable addresses are already resident in line 0, and no other
/// line is reachable at all.
#[rstest]
#[case::terminate(true, Err(ResolverFailure::NoCandidate))]
#[case::fall_back(false, Ok(0x0))]
fn exhausted_search(#[case] terminate_on_unsat: bool, #[case] expected: Result<u64, ResolverFailure>) {
    init_tracing();
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..2, 0, 0x100);

    let outcome = resolver(ResolverConfig {
        terminate_on_unsat,
        ..worst_case()
    })
    .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false);

    assert_eq!(outcome.map(|r| r.value), expected);
}

/// Line 0 is unreachable from `{0x0, 0x40, 0x80}` once its residents are
/// excluded; lines 1 and 2 are reachable.
#[rstest]
#[case::give_up(true)]
#[case::keep_looking(false)]
fn giving_up_skips_remaining_candidates(#[case] give_up_on_complex_indices: bool) {
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..3, 0, 0x40);

    let resolution = resolver(ResolverConfig {
        give_up_on_complex_indices,
        ..worst_case()
    })
    .resolve(&mut backend, &EnumConstraints::default(), &model, &address, false)
    .unwrap();

    if give_up_on_complex_indices {
        assert_eq!((resolution.value, resolution.biased), (0x0, false));
    } else {
        assert!(resolution.biased);
        assert!([0x40, 0x80].contains(&resolution.value));
    }
}

#[test]
fn contradictory_path_is_unsatisfiable() {
    let model = dirty_line_zero();
    let mut backend = EnumerativeBackend::new();
    let address = backend.symbol(0..4, 0, 0x40);
    let constraints = backend
        .constrain(&EnumConstraints::default(), &address, AddressConstraint::MaskedEq { mask: 0xF, value: 1 })
        .unwrap();

    let outcome = resolver(ResolverConfig::default()).resolve(&mut backend, &constraints, &model, &address, false);
    assert_eq!(outcome, Err(ResolverFailure::Unsatisfiable));
}

// ──────────────────────────────────────────────────────────
// Solver errors
// ──────────────────────────────────────────────────────────

#[test]
fn solver_error_fails_fast_when_configured() {
    let model = armed_hierarchy(four_lines());
    let mut backend = symbolic_backend();
    backend
        .expect_is_satisfiable()
        .times(1)
        .returning(|_| Err(SolverError::Timeout));
    backend.expect_get_value().never();

    let outcome = resolver(ResolverConfig {
        fail_on_solver_error: true,
        ..worst_case()
    })
    .resolve(&mut backend, &Vec::new(), &model, &7, false);

    assert_eq!(outcome, Err(ResolverFailure::Solver(SolverError::Timeout)));
}

/// Every candidate times out; the fallback query still answers.
#[test]
fn solver_errors_are_skipped_otherwise() {
    init_tracing();
    let model = armed_hierarchy(four_lines());
    let mut backend = symbolic_backend();
    backend
        .expect_is_satisfiable()
        .times(4)
        .returning(|_| Err(SolverError::Timeout));
    backend
        .expect_get_value()
        .times(1)
        .withf(|constraints, _| constraints.is_empty())
        .returning(|_, _| Ok(Some(0x1234)));

    let resolution = resolver(worst_case())
        .resolve(&mut backend, &Vec::new(), &model, &7, false)
        .unwrap();

    assert_eq!(
        resolution,
        Resolution {
            value: 0x1234,
            constraint: Some(AddressConstraint::Equals(0x1234)),
            biased: false,
        }
    );
}

#[test]
fn fallback_solver_error_is_reported() {
    let model = armed_hierarchy(four_lines());
    let mut backend = symbolic_backend();
    backend
        .expect_get_value()
        .returning(|_, _| Err(SolverError::Unavailable("connection reset".into())));

    let outcome = resolver(ResolverConfig::default()).resolve(&mut backend, &Vec::new(), &model, &7, false);
    assert_eq!(
        outcome,
        Err(ResolverFailure::Solver(SolverError::Unavailable("connection reset".into())))
    );
}

#[test]
fn each_attempt_is_applied_before_solving() {
    let model = armed_hierarchy(four_lines());
    let mut backend = symbolic_backend();
    backend
        .expect_is_satisfiable()
        .withf(|constraints| matches!(constraints.as_slice(), [AddressConstraint::MaskedEq { mask: 0xC0, .. }]))
        .returning(|_| Ok(true));
    backend
        .expect_get_value()
        .times(1)
        .returning(|constraints, _| match constraints.as_slice() {
            [AddressConstraint::MaskedEq { value, .. }] => Ok(Some(0x4000 | value)),
            _ => Ok(None),
        });

    let resolution = resolver(worst_case())
        .resolve(&mut backend, &Vec::new(), &model, &7, false)
        .unwrap();
    assert!(resolution.biased);
    assert_eq!(resolution.value & !0xC0, 0x4000);
}
