//! Symbolic execution engine boundary.
//!
//! The engine itself (stepping, forking, constraint storage, solving) lives
//! outside this crate. This module defines what the cost model needs from
//! it and what it offers back:
//! 1. **[`SymbolicBackend`]:** simplification, satisfiability, and model
//!    queries over the engine's expressions and constraint sets.
//! 2. **[`AddressConstraint`]:** the only constraint shapes the cost model
//!    ever adds to a path.
//! 3. **[`PathState`]:** the per-path state the engine carries for us.
//! 4. **[`CostHooks`]:** the calls the engine makes on memory accesses, loop
//!    boundaries, and executed instructions.
//!
//! [`EnumerativeBackend`] is a small finite-domain backend for driving the
//! hooks without a real solver.

/// Finite-domain reference backend.
pub mod enumerative;

/// Engine-facing callbacks.
pub mod hooks;

/// Per-path state.
pub mod path;

pub use enumerative::{EnumConstraints, EnumerativeBackend, SymExpr};
pub use hooks::CostHooks;
pub use path::{PathId, PathState, PathStatus};

use std::fmt;

use crate::common::SolverError;

/// A constraint on the value of an address expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressConstraint {
    /// `address & mask == value`.
    MaskedEq {
        /// Bits that must match.
        mask: u64,
        /// Expected value of those bits.
        value: u64,
    },
    /// `address & mask != value`.
    MaskedNe {
        /// Bits compared.
        mask: u64,
        /// Value those bits must avoid.
        value: u64,
    },
    /// `address == value`.
    Equals(u64),
}

impl AddressConstraint {
    /// Returns true if a concrete `address` satisfies the constraint.
    #[inline]
    pub const fn holds(&self, address: u64) -> bool {
        match *self {
            Self::MaskedEq { mask, value } => address & mask == value & mask,
            Self::MaskedNe { mask, value } => address & mask != value & mask,
            Self::Equals(value) => address == value,
        }
    }
}

impl fmt::Display for AddressConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaskedEq { mask, value } => write!(f, "(addr & {mask:#x}) == {value:#x}"),
            Self::MaskedNe { mask, value } => write!(f, "(addr & {mask:#x}) != {value:#x}"),
            Self::Equals(value) => write!(f, "addr == {value:#x}"),
        }
    }
}

/// Queries the cost model makes against the symbolic execution engine.
///
/// Solver queries take `&mut self` so implementations may count, cache, or
/// time them.
pub trait SymbolicBackend {
    /// An address expression.
    type Expr: Clone + fmt::Debug;
    /// A path's accumulated constraints.
    type Constraints: Clone + fmt::Debug;

    /// Simplifies `expr` under `constraints`.
    fn simplify(&self, expr: &Self::Expr, constraints: &Self::Constraints) -> Self::Expr;

    /// Returns the value of `expr` if it is a known constant.
    fn as_constant(&self, expr: &Self::Expr) -> Option<u64>;

    /// Wraps a concrete value as an expression.
    fn constant(&self, value: u64) -> Self::Expr;

    /// Returns `constraints` extended with `constraint` applied to `expr`.
    ///
    /// Returns `None` if the result is trivially false.
    fn constrain(
        &self,
        constraints: &Self::Constraints,
        expr: &Self::Expr,
        constraint: AddressConstraint,
    ) -> Option<Self::Constraints>;

    /// Checks whether `constraints` admit any assignment.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the query cannot be answered.
    fn is_satisfiable(&mut self, constraints: &Self::Constraints) -> Result<bool, SolverError>;

    /// Returns some value of `expr` consistent with `constraints`.
    ///
    /// `Ok(None)` means the constraints are unsatisfiable.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the query cannot be answered.
    fn get_value(
        &mut self,
        constraints: &Self::Constraints,
        expr: &Self::Expr,
    ) -> Result<Option<u64>, SolverError>;
}
