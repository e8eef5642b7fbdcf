//! Per-path state carried by the engine.

use std::fmt;

use super::SymbolicBackend;
use crate::cache::CacheModel;
use crate::icfg::InstId;
use crate::search::ExplorationPath;

/// Engine-assigned path identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a path with respect to the measured loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStatus {
    /// The loop has not been entered yet.
    Unarmed,
    /// Inside the loop, recording iterations.
    Armed,
    /// The iteration cap was reached.
    Exhausted,
    /// Stopped by a failure.
    Terminated(String),
}

impl PathStatus {
    /// Returns true for states the path never leaves.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Terminated(_))
    }
}

/// Everything the cost model tracks for one exploration path.
///
/// Forking deep-copies the cache model and constraints, so sibling paths never
/// observe each other's accesses.
pub struct PathState<B: SymbolicBackend> {
    id: PathId,
    /// Accumulated path constraints.
    pub constraints: B::Constraints,
    model: Box<dyn CacheModel>,
    pc: InstId,
    call_stack: Vec<InstId>,
    status: PathStatus,
}

impl<B: SymbolicBackend> fmt::Debug for PathState<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathState")
            .field("id", &self.id)
            .field("constraints", &self.constraints)
            .field("model", &self.model)
            .field("pc", &self.pc)
            .field("call_stack", &self.call_stack)
            .field("status", &self.status)
            .finish()
    }
}

impl<B: SymbolicBackend> Clone for PathState<B> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            constraints: self.constraints.clone(),
            model: self.model.clone(),
            pc: self.pc,
            call_stack: self.call_stack.clone(),
            status: self.status.clone(),
        }
    }
}

impl<B: SymbolicBackend> PathState<B> {
    /// Creates an unarmed path at `pc`.
    pub fn new(id: PathId, constraints: B::Constraints, model: Box<dyn CacheModel>, pc: InstId) -> Self {
        Self {
            id,
            constraints,
            model,
            pc,
            call_stack: Vec::new(),
            status: PathStatus::Unarmed,
        }
    }

    /// Path identifier.
    #[inline]
    pub const fn id(&self) -> PathId {
        self.id
    }

    /// Current lifecycle state.
    #[inline]
    pub const fn status(&self) -> &PathStatus {
        &self.status
    }

    /// The path's cache model.
    #[inline]
    pub fn model(&self) -> &dyn CacheModel {
        self.model.as_ref()
    }

    /// The path's cache model, mutably.
    #[inline]
    pub fn model_mut(&mut self) -> &mut dyn CacheModel {
        self.model.as_mut()
    }

    /// Moves the path to `pc` within the current function.
    #[inline]
    pub fn set_pc(&mut self, pc: InstId) {
        self.pc = pc;
    }

    /// Enters a callee through `call_site`, continuing at `callee_entry`.
    pub fn push_call(&mut self, call_site: InstId, callee_entry: InstId) {
        self.call_stack.push(call_site);
        self.pc = callee_entry;
    }

    /// Returns from the innermost call, yielding its call site.
    pub fn pop_call(&mut self) -> Option<InstId> {
        self.call_stack.pop()
    }

    /// Copies the path under a new identifier.
    #[must_use]
    pub fn fork(&self, id: PathId) -> Self {
        let mut child = self.clone();
        child.id = id;
        child
    }

    pub(crate) fn set_status(&mut self, status: PathStatus) {
        self.status = status;
    }

    /// Stops the path for `reason`.
    pub fn terminate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(path = %self.id, %reason, "path terminated");
        self.status = PathStatus::Terminated(reason);
    }
}

impl<B: SymbolicBackend> ExplorationPath for PathState<B> {
    fn id(&self) -> PathId {
        self.id
    }

    fn cache_model(&self) -> &dyn CacheModel {
        self.model.as_ref()
    }

    fn current_instruction(&self) -> InstId {
        self.pc
    }

    fn call_stack(&self) -> &[InstId] {
        &self.call_stack
    }
}
