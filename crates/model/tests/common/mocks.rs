//! Mocked symbolic backend.
//!
//! Expressions are plain `u64` symbols and constraints a list, so tests only
//! script the solver answers they care about.

use cachehunt_core::common::SolverError;
use cachehunt_core::engine::{AddressConstraint, SymbolicBackend};
use mockall::mock;

mock! {
    pub Backend {}
    impl SymbolicBackend for Backend {
        type Expr = u64;
        type Constraints = Vec<AddressConstraint>;

        fn simplify(&self, expr: &u64, constraints: &Vec<AddressConstraint>) -> u64;
        fn as_constant(&self, expr: &u64) -> Option<u64>;
        fn constant(&self, value: u64) -> u64;
        fn constrain(
            &self,
            constraints: &Vec<AddressConstraint>,
            expr: &u64,
            constraint: AddressConstraint,
        ) -> Option<Vec<AddressConstraint>>;
        fn is_satisfiable(&mut self, constraints: &Vec<AddressConstraint>) -> Result<bool, SolverError>;
        fn get_value(
            &mut self,
            constraints: &Vec<AddressConstraint>,
            expr: &u64,
        ) -> Result<Option<u64>, SolverError>;
    }
}

/// A backend that treats every expression as symbolic and appends constraints.
///
/// Solver queries are left for the test to script.
pub fn symbolic_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_simplify().returning(|expr, _| *expr);
    backend.expect_as_constant().returning(|_| None);
    backend.expect_constant().returning(|value| value);
    backend.expect_constrain().returning(|constraints, _, constraint| {
        let mut extended = constraints.clone();
        extended.push(constraint);
        Some(extended)
    });
    backend
}
