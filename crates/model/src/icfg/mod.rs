//! Interprocedural control-flow graph and static cost analysis.
//!
//! The static program is described as functions of basic blocks of typed
//! instructions, which is all the analysis needs to know about the target.
//! It is usually produced by a front end and loaded from JSON:
//!
//! ```json
//! {"functions": [
//!   {"name": "main", "blocks": [
//!     {"instructions": [{"id": 0, "op": "call", "callee": "loop_boundary"},
//!                       {"id": 1, "op": "load"},
//!                       {"id": 2, "op": "other"}],
//!      "successors": [0]}]},
//!   {"name": "loop_boundary"}
//! ]}
//! ```
//!
//! A function without blocks is a declaration. A block's `successors` index
//! into the blocks of the same function.

/// Cost-to-boundary analysis.
pub mod analyzer;

/// Graph construction.
pub mod graph;

pub use analyzer::{CostEntry, IcfgCostMap};
pub use graph::Icfg;

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;

/// Name of the loop boundary marker function unless configured otherwise.
pub const DEFAULT_LOOP_MARKER: &str = "loop_boundary";

/// Static instruction identifier, unique across the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// What an instruction does, as far as cost is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InstKind {
    /// Memory read.
    Load,
    /// Memory write.
    Store,
    /// Function call; `callee` is `None` for indirect calls.
    Call {
        /// Called function name.
        #[serde(default)]
        callee: Option<String>,
    },
    /// Anything else.
    #[default]
    Other,
}

impl InstKind {
    /// Weight of the instruction in cost-to-boundary estimates.
    #[inline]
    pub const fn weight(&self) -> u64 {
        match self {
            Self::Load | Self::Store => 4,
            Self::Call { .. } | Self::Other => 1,
        }
    }
}

/// One static instruction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instruction {
    /// Program-wide identifier.
    pub id: InstId,
    /// Operation class.
    #[serde(flatten)]
    pub kind: InstKind,
}

/// A straight-line run of instructions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct BasicBlock {
    /// Instructions in execution order; must not be empty.
    pub instructions: Vec<Instruction>,
    /// Indices of successor blocks within the function.
    #[serde(default)]
    pub successors: Vec<usize>,
}

/// A function; declarations have no blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Function {
    /// Symbol name, unique across the program.
    pub name: String,
    /// Body; the first block is the entry.
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    /// Returns true if the function has no body.
    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A whole program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Program {
    /// All functions, defined or declared.
    pub functions: Vec<Function>,
}

impl Program {
    /// Parses a program description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if the JSON does not describe a program.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a program description file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Program::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}
