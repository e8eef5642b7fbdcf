//! Error taxonomy for the cost model.
//!
//! This module defines every error the library surfaces. It provides:
//! 1. **Configuration errors:** Fatal at startup (bad contention-set files, impossible geometry).
//! 2. **Solver and resolver failures:** Recoverable per path, according to the resolver policy.
//! 3. **Path failures:** Any per-path error, attributed to the path that raised it.
//! 4. **Search errors:** Bookkeeping mistakes by the engine when updating the searcher.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::PathId;

/// Errors detected while loading or validating configuration and static inputs.
///
/// These are the only errors that halt exploration as a whole.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration JSON could not be parsed.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration or contention-set file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A contention-set file line could not be parsed.
    #[error("contention-set file line {line}: {reason}")]
    MalformedContentionSets {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The contention-set model was selected but no set table was supplied.
    #[error("contention-set model requires a contention-set file")]
    MissingContentionSets,

    /// A cache level has zero capacity.
    #[error("cache level L{level} has zero size")]
    ZeroSizeLevel {
        /// One-based level number.
        level: usize,
    },

    /// A cache level has zero associativity.
    #[error("cache level L{level} has zero associativity")]
    ZeroAssociativity {
        /// One-based level number.
        level: usize,
    },

    /// A cache level's size does not divide into whole lines of `ways` blocks.
    #[error("cache level L{level}: {size_bytes} bytes is not a multiple of {ways} x {block_bytes}-byte blocks")]
    UnevenLevel {
        /// One-based level number.
        level: usize,
        /// Configured size in bytes.
        size_bytes: usize,
        /// Configured associativity.
        ways: usize,
        /// Block size in bytes.
        block_bytes: usize,
    },

    /// Block or page geometry is out of range.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// The static program description is inconsistent.
    #[error("invalid program: {0}")]
    Program(String),
}

/// Failures reported by the constraint-solver collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The query exceeded the solver's time or work budget.
    #[error("solver timed out")]
    Timeout,
    /// The solver could not be reached or refused the query.
    #[error("solver unavailable: {0}")]
    Unavailable(String),
}

/// Failure to pick a concrete value for a symbolic address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverFailure {
    /// The solver failed while a candidate or fallback query was in flight.
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// No candidate bucket admitted a satisfying address and the policy forbids falling back.
    #[error("unable to induce a cache miss")]
    NoCandidate,
    /// Not even an unbiased concretization exists under the path constraints.
    #[error("symbolic address has no satisfying value")]
    Unsatisfiable,
}

/// Errors that abort a single exploration path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Address resolution failed.
    #[error("address resolution failed: {0}")]
    Resolver(#[from] ResolverFailure),
    /// The path reached an inconsistent state.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// A [`PathError`] attributed to the path that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path {path}: {error}")]
pub struct PathFailure {
    /// Offending path.
    pub path: PathId,
    /// What went wrong.
    #[source]
    pub error: PathError,
}

/// Inconsistent updates handed to the searcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// A path was updated or removed without ever being added.
    #[error("unknown path {0}")]
    UnknownPath(PathId),
    /// A path was added twice.
    #[error("path {0} is already scheduled")]
    DuplicatePath(PathId),
}
