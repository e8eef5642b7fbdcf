//! Engine-facing callbacks.
//!
//! The engine calls these in place of raw memory operations, at loop
//! boundary markers, and after every executed instruction. Failures abort
//! only the path they occur on: the path is marked terminated and the error
//! is returned tagged with its id.

use super::path::{PathState, PathStatus};
use super::SymbolicBackend;
use crate::common::{PathError, PathFailure};
use crate::config::ResolverConfig;
use crate::resolver::AddressResolver;

/// Connects a symbolic execution engine to the cost model.
#[derive(Debug, Clone)]
pub struct CostHooks {
    resolver: AddressResolver,
}

impl CostHooks {
    /// Creates hooks resolving symbolic addresses under `config`.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            resolver: AddressResolver::new(config),
        }
    }

    /// Handles a load or store through `address`.
    ///
    /// Returns the address the engine should use: unchanged if it was already
    /// constant or the loop was not entered yet, otherwise the chosen concrete
    /// value, which is also pinned in the path constraints.
    ///
    /// # Arguments
    ///
    /// * `backend` - Solver collaborator owning the path's expressions.
    /// * `path` - The path performing the access.
    /// * `address` - Address expression of the load or store.
    /// * `is_write` - Whether the access is a store.
    ///
    /// # Errors
    ///
    /// Returns a [`PathFailure`] and terminates the path if resolution fails or
    /// the path already finished.
    pub fn on_memory_access<B: SymbolicBackend>(
        &self,
        backend: &mut B,
        path: &mut PathState<B>,
        address: &B::Expr,
        is_write: bool,
    ) -> Result<B::Expr, PathFailure> {
        ensure_live(path)?;
        if !path.model().is_armed() {
            return Ok(address.clone());
        }

        let resolution = match self.resolver.resolve(
            backend,
            &path.constraints,
            path.model(),
            address,
            is_write,
        ) {
            Ok(resolution) => resolution,
            Err(err) => return Err(fail(path, PathError::Resolver(err))),
        };

        let Some(constraint) = resolution.constraint else {
            let _ = path.model_mut().access(resolution.value, is_write);
            return Ok(backend.constant(resolution.value));
        };
        match backend.constrain(&path.constraints, address, constraint) {
            Some(pinned) => path.constraints = pinned,
            None => {
                let reason = format!("cannot pin address to {:#x}", resolution.value);
                return Err(fail(path, PathError::Invariant(reason)));
            }
        }
        let _ = path.model_mut().access(resolution.value, is_write);
        Ok(backend.constant(resolution.value))
    }

    /// Handles a loop boundary marker.
    ///
    /// Returns false once the path reached its iteration cap; the path is then
    /// exhausted and should not be extended further.
    ///
    /// # Errors
    ///
    /// Returns a [`PathFailure`] if the path already finished.
    pub fn on_loop_boundary<B: SymbolicBackend>(&self, path: &mut PathState<B>) -> Result<bool, PathFailure> {
        ensure_live(path)?;
        if path.model_mut().begin_iteration() {
            path.set_status(PathStatus::Armed);
            Ok(true)
        } else {
            tracing::debug!(path = %path.id(), iterations = path.model().num_iterations(), "iteration cap reached");
            path.set_status(PathStatus::Exhausted);
            Ok(false)
        }
    }

    /// Counts one executed instruction on `path`.
    pub fn on_instruction_executed<B: SymbolicBackend>(&self, path: &mut PathState<B>) {
        if !path.status().is_terminal() {
            path.model_mut().record_instruction();
        }
    }
}

fn ensure_live<B: SymbolicBackend>(path: &PathState<B>) -> Result<(), PathFailure> {
    if path.status().is_terminal() {
        return Err(PathFailure {
            path: path.id(),
            error: PathError::Invariant(format!("path already finished: {:?}", path.status())),
        });
    }
    Ok(())
}

fn fail<B: SymbolicBackend>(path: &mut PathState<B>, error: PathError) -> PathFailure {
    path.terminate(error.to_string());
    PathFailure {
        path: path.id(),
        error,
    }
}
