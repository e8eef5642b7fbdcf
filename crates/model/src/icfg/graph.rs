//! ICFG construction.
//!
//! Instructions are renumbered densely in ascending [`InstId`] order. Edges
//! run between consecutive instructions of a block and from a block's last
//! instruction to the first instruction of each successor block. Calls do
//! not get an edge into the callee; the analysis composes callee costs
//! through [`Icfg::call_target`] and [`Icfg::callers`] instead.

use std::collections::HashMap;

use super::{InstId, InstKind, Program};
use crate::common::ConfigError;

/// Dense instruction index.
pub type Node = usize;

/// Interprocedural control-flow graph of a [`Program`].
#[derive(Debug, Clone, Default)]
pub struct Icfg {
    ids: Vec<InstId>,
    index: HashMap<InstId, Node>,
    kinds: Vec<InstKind>,
    function_of: Vec<usize>,
    successors: Vec<Vec<Node>>,
    predecessors: Vec<Vec<Node>>,
    function_names: Vec<String>,
    function_index: HashMap<String, usize>,
    entries: Vec<Option<Node>>,
    callers: Vec<Vec<Node>>,
    call_targets: Vec<Option<usize>>,
}

impl Icfg {
    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Program`] on duplicate function names or
    /// instruction ids, empty blocks, or successor indices out of range.
    pub fn build(program: &Program) -> Result<Self, ConfigError> {
        let mut function_index = HashMap::new();
        for (idx, function) in program.functions.iter().enumerate() {
            if function_index.insert(function.name.clone(), idx).is_some() {
                return Err(ConfigError::Program(format!(
                    "function `{}` defined twice",
                    function.name
                )));
            }
        }

        let mut located = Vec::new();
        for (fn_idx, function) in program.functions.iter().enumerate() {
            for (bb_idx, block) in function.blocks.iter().enumerate() {
                if block.instructions.is_empty() {
                    return Err(ConfigError::Program(format!(
                        "`{}` block {bb_idx} is empty",
                        function.name
                    )));
                }
                if let Some(&bad) = block.successors.iter().find(|&&s| s >= function.blocks.len()) {
                    return Err(ConfigError::Program(format!(
                        "`{}` block {bb_idx} jumps to missing block {bad}",
                        function.name
                    )));
                }
                for inst in &block.instructions {
                    located.push((inst.id, inst.kind.clone(), fn_idx));
                }
            }
        }
        located.sort_by_key(|&(id, _, _)| id);
        if let Some(pair) = located.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(ConfigError::Program(format!("instruction {} appears twice", pair[0].0)));
        }

        let n = located.len();
        let mut graph = Self {
            ids: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
            kinds: Vec::with_capacity(n),
            function_of: Vec::with_capacity(n),
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
            function_names: program.functions.iter().map(|f| f.name.clone()).collect(),
            function_index,
            entries: vec![None; program.functions.len()],
            callers: vec![Vec::new(); program.functions.len()],
            call_targets: vec![None; n],
        };
        for (node, (id, kind, fn_idx)) in located.into_iter().enumerate() {
            let _ = graph.index.insert(id, node);
            graph.ids.push(id);
            graph.kinds.push(kind);
            graph.function_of.push(fn_idx);
        }

        for (fn_idx, function) in program.functions.iter().enumerate() {
            let node = |id: InstId| graph.index[&id];
            let first = |bb: usize| node(function.blocks[bb].instructions[0].id);
            graph.entries[fn_idx] = function.blocks.first().map(|_| first(0));

            let mut edges = Vec::new();
            for block in &function.blocks {
                for pair in block.instructions.windows(2) {
                    edges.push((node(pair[0].id), node(pair[1].id)));
                }
                if let Some(last) = block.instructions.last() {
                    edges.extend(block.successors.iter().map(|&bb| (node(last.id), first(bb))));
                }
            }
            for (from, to) in edges {
                graph.add_edge(from, to);
            }
        }

        for node in 0..n {
            if let InstKind::Call { callee: Some(name) } = &graph.kinds[node] {
                if let Some(&target) = graph.function_index.get(name) {
                    graph.call_targets[node] = Some(target);
                    graph.callers[target].push(node);
                }
            }
        }

        Ok(graph)
    }

    fn add_edge(&mut self, from: Node, to: Node) {
        if !self.successors[from].contains(&to) {
            self.successors[from].push(to);
            self.predecessors[to].push(from);
        }
    }

    /// Number of instructions.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true for a program without instructions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier of `node`.
    #[inline]
    pub fn id(&self, node: Node) -> InstId {
        self.ids[node]
    }

    /// Node of instruction `id`.
    #[inline]
    pub fn node(&self, id: InstId) -> Option<Node> {
        self.index.get(&id).copied()
    }

    /// Operation class of `node`.
    #[inline]
    pub fn kind(&self, node: Node) -> &InstKind {
        &self.kinds[node]
    }

    /// Intraprocedural successors.
    #[inline]
    pub fn successors(&self, node: Node) -> &[Node] {
        &self.successors[node]
    }

    /// Intraprocedural predecessors.
    #[inline]
    pub fn predecessors(&self, node: Node) -> &[Node] {
        &self.predecessors[node]
    }

    /// Function containing `node`.
    #[inline]
    pub fn function_of(&self, node: Node) -> usize {
        self.function_of[node]
    }

    /// Name of function `func`.
    #[inline]
    pub fn function_name(&self, func: usize) -> &str {
        &self.function_names[func]
    }

    /// Index of the function called `name`.
    #[inline]
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.function_index.get(name).copied()
    }

    /// Entry instruction of `func`, `None` for declarations.
    #[inline]
    pub fn entry(&self, func: usize) -> Option<Node> {
        self.entries[func]
    }

    /// Returns true if `node` is the entry of its function.
    #[inline]
    pub fn is_entry(&self, node: Node) -> bool {
        self.entries[self.function_of[node]] == Some(node)
    }

    /// Direct call sites of `func`.
    #[inline]
    pub fn callers(&self, func: usize) -> &[Node] {
        &self.callers[func]
    }

    /// Function called directly by `node`, if it is a call to a known function.
    #[inline]
    pub fn call_target(&self, node: Node) -> Option<usize> {
        self.call_targets[node]
    }
}
