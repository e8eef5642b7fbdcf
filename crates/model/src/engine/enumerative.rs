//! Finite-domain reference backend.
//!
//! Expressions are either constants or `base + stride * x` over a single
//! variable `x` drawn from a half-open range. Variables are independent, so
//! a constraint set is satisfiable iff every variable has a domain value
//! meeting all facts about it. Solving is plain enumeration bounded by a
//! per-query step budget; running out reports a solver timeout.

use std::ops::Range;

use super::{AddressConstraint, SymbolicBackend};
use crate::common::SolverError;

/// Steps a single query may spend enumerating before timing out.
pub const DEFAULT_STEP_BUDGET: u64 = 1 << 20;

/// An address expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymExpr {
    /// A known address.
    Const(u64),
    /// `base + stride * x`, wrapping.
    Affine {
        /// Variable index.
        var: usize,
        /// Value at `x = 0`.
        base: u64,
        /// Increment per step of `x`.
        stride: u64,
    },
}

impl SymExpr {
    /// Value of the expression when its variable is `x`.
    #[inline]
    pub const fn eval(&self, x: u64) -> u64 {
        match *self {
            Self::Const(value) => value,
            Self::Affine { base, stride, .. } => base.wrapping_add(stride.wrapping_mul(x)),
        }
    }

    const fn var(&self) -> Option<usize> {
        match *self {
            Self::Const(_) => None,
            Self::Affine { var, .. } => Some(var),
        }
    }
}

/// Facts accumulated on a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumConstraints {
    facts: Vec<(SymExpr, AddressConstraint)>,
}

impl EnumConstraints {
    /// Number of facts.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if no fact was added.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// Enumerating backend over independent finite-domain variables.
#[derive(Debug, Clone)]
pub struct EnumerativeBackend {
    domains: Vec<Range<u64>>,
    step_budget: u64,
    queries: u64,
}

impl Default for EnumerativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EnumerativeBackend {
    /// Creates a backend with no variables and the default step budget.
    pub const fn new() -> Self {
        Self {
            domains: Vec::new(),
            step_budget: DEFAULT_STEP_BUDGET,
            queries: 0,
        }
    }

    /// Replaces the per-query step budget.
    #[must_use]
    pub const fn with_step_budget(mut self, step_budget: u64) -> Self {
        self.step_budget = step_budget;
        self
    }

    /// Declares a fresh variable over `domain` and returns `base + stride * x`.
    pub fn symbol(&mut self, domain: Range<u64>, base: u64, stride: u64) -> SymExpr {
        self.domains.push(domain);
        SymExpr::Affine {
            var: self.domains.len() - 1,
            base,
            stride,
        }
    }

    /// Number of solver queries answered so far.
    pub const fn queries(&self) -> u64 {
        self.queries
    }

    /// Smallest domain value of `var` meeting every fact about it.
    fn solve_var(&self, constraints: &EnumConstraints, var: usize) -> Result<Option<u64>, SolverError> {
        let Some(domain) = self.domains.get(var) else {
            return Ok(None);
        };
        let facts: Vec<_> = constraints
            .facts
            .iter()
            .filter(|(expr, _)| expr.var() == Some(var))
            .collect();

        for (steps, x) in domain.clone().enumerate() {
            if steps as u64 >= self.step_budget {
                return Err(SolverError::Timeout);
            }
            if facts.iter().all(|(expr, fact)| fact.holds(expr.eval(x))) {
                return Ok(Some(x));
            }
        }
        Ok(None)
    }

    /// A full assignment, or `None` if the facts are contradictory.
    fn assignment(&self, constraints: &EnumConstraints) -> Result<Option<Vec<u64>>, SolverError> {
        let consts_hold = constraints
            .facts
            .iter()
            .filter(|(expr, _)| expr.var().is_none())
            .all(|(expr, fact)| fact.holds(expr.eval(0)));
        if !consts_hold {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.domains.len());
        for var in 0..self.domains.len() {
            match self.solve_var(constraints, var)? {
                Some(x) => values.push(x),
                None => return Ok(None),
            }
        }
        Ok(Some(values))
    }
}

impl SymbolicBackend for EnumerativeBackend {
    type Expr = SymExpr;
    type Constraints = EnumConstraints;

    fn simplify(&self, expr: &SymExpr, constraints: &EnumConstraints) -> SymExpr {
        let SymExpr::Affine { var, base, stride } = *expr else {
            return *expr;
        };
        let pinned = constraints.facts.iter().find_map(|(fact_expr, fact)| match fact {
            AddressConstraint::Equals(value) if fact_expr == expr => Some(*value),
            _ => None,
        });
        if let Some(value) = pinned {
            return SymExpr::Const(value);
        }
        let singleton = self
            .domains
            .get(var)
            .is_some_and(|domain| domain.end.saturating_sub(domain.start) == 1);
        if stride == 0 {
            SymExpr::Const(base)
        } else if singleton {
            SymExpr::Const(expr.eval(self.domains[var].start))
        } else {
            *expr
        }
    }

    fn as_constant(&self, expr: &SymExpr) -> Option<u64> {
        match *expr {
            SymExpr::Const(value) => Some(value),
            SymExpr::Affine { .. } => None,
        }
    }

    fn constant(&self, value: u64) -> SymExpr {
        SymExpr::Const(value)
    }

    fn constrain(
        &self,
        constraints: &EnumConstraints,
        expr: &SymExpr,
        constraint: AddressConstraint,
    ) -> Option<EnumConstraints> {
        if let SymExpr::Const(value) = *expr {
            if !constraint.holds(value) {
                return None;
            }
        }
        let mut extended = constraints.clone();
        extended.facts.push((*expr, constraint));
        Some(extended)
    }

    fn is_satisfiable(&mut self, constraints: &EnumConstraints) -> Result<bool, SolverError> {
        self.queries += 1;
        Ok(self.assignment(constraints)?.is_some())
    }

    fn get_value(
        &mut self,
        constraints: &EnumConstraints,
        expr: &SymExpr,
    ) -> Result<Option<u64>, SolverError> {
        self.queries += 1;
        let Some(values) = self.assignment(constraints)? else {
            return Ok(None);
        };
        Ok(match expr.var() {
            None => Some(expr.eval(0)),
            Some(var) => values.get(var).map(|&x| expr.eval(x)),
        })
    }
}
