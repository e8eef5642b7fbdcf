//! Minimal exploration path for searcher tests.

use cachehunt_core::cache::CacheModel;
use cachehunt_core::engine::PathId;
use cachehunt_core::icfg::InstId;
use cachehunt_core::search::ExplorationPath;

use super::builders::{armed_hierarchy, four_lines, hierarchy};

/// A path that is only a model and a position.
#[derive(Debug)]
pub struct StubPath {
    pub id: PathId,
    pub model: Box<dyn CacheModel>,
    pub pc: InstId,
    pub stack: Vec<InstId>,
}

impl StubPath {
    /// Armed path at `pc` that executed `instructions` in its only iteration.
    pub fn armed(id: u64, instructions: u64, pc: InstId) -> Self {
        let mut model = armed_hierarchy(four_lines());
        for _ in 0..instructions {
            model.record_instruction();
        }
        Self {
            id: PathId(id),
            model: Box::new(model),
            pc,
            stack: Vec::new(),
        }
    }

    /// Path that has not reached the loop yet.
    pub fn unarmed(id: u64) -> Self {
        Self {
            id: PathId(id),
            model: Box::new(hierarchy(four_lines())),
            pc: InstId(0),
            stack: Vec::new(),
        }
    }
}

impl ExplorationPath for StubPath {
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
        &self.stack
    }
}
