//! Builders for small, hand-checkable configurations and programs.

use std::sync::Arc;

use cachehunt_core::cache::{CacheModel, ContentionSetHierarchy, ContentionSetTable, GenericHierarchy};
use cachehunt_core::config::{CacheLevelConfig, ContentionSetConfig, GenericConfig, TimingConfig};
use cachehunt_core::icfg::{BasicBlock, Function, InstId, InstKind, Instruction, Program};

/// Latency of the DRAM level in test hierarchies.
pub const DRAM: f64 = 100.0;

/// One nanosecond per instruction, no fixed overhead.
pub const fn unit_timing() -> TimingConfig {
    TimingConfig {
        ns_per_instruction: 1.0,
        fixed_overhead_ns: 0.0,
    }
}

/// A cache level with 64-byte blocks in mind.
pub const fn level(size_bytes: usize, ways: usize, write_back: bool, latency: f64) -> CacheLevelConfig {
    CacheLevelConfig {
        size_bytes,
        ways,
        write_back,
        latency,
    }
}

/// Generic configuration with 64-byte blocks and [`DRAM`] latency.
pub fn generic_config(levels: Vec<CacheLevelConfig>) -> GenericConfig {
    GenericConfig {
        block_bits: 6,
        levels,
        dram_latency: DRAM,
    }
}

/// Unarmed hierarchy over `levels`.
pub fn hierarchy(levels: Vec<CacheLevelConfig>) -> GenericHierarchy {
    GenericHierarchy::new(&generic_config(levels), unit_timing(), None)
}

/// Armed hierarchy over `levels`.
pub fn armed_hierarchy(levels: Vec<CacheLevelConfig>) -> GenericHierarchy {
    let mut model = hierarchy(levels);
    assert!(model.begin_iteration());
    model
}

/// L1: 128 B, 2-way, write-back, 1 ns. A single line, so every block collides.
/// L2: 1 KiB, 4-way, write-back, 10 ns. Four lines.
pub fn two_level() -> Vec<CacheLevelConfig> {
    vec![level(128, 2, true, 1.0), level(1024, 4, true, 10.0)]
}

/// L1 only: 512 B, 2-way, write-back, 1 ns. Four lines.
pub fn four_lines() -> Vec<CacheLevelConfig> {
    vec![level(512, 2, true, 1.0)]
}

/// Parses a contention table, panicking on malformed input.
pub fn table(text: &str) -> Arc<ContentionSetTable> {
    Arc::new(ContentionSetTable::parse(text).expect("valid contention sets"))
}

/// Armed contention-set model over `text` with default geometry and latencies.
pub fn armed_contention(text: &str) -> ContentionSetHierarchy {
    let mut model = ContentionSetHierarchy::new(&ContentionSetConfig::default(), table(text), unit_timing(), None);
    assert!(model.begin_iteration());
    model
}

/// Shorthand for an instruction.
pub fn inst(id: u32, kind: InstKind) -> Instruction {
    Instruction { id: InstId(id), kind }
}

/// A call to `callee`.
pub fn call(callee: &str) -> InstKind {
    InstKind::Call {
        callee: Some(callee.to_string()),
    }
}

/// A basic block.
pub fn block(instructions: Vec<Instruction>, successors: &[usize]) -> BasicBlock {
    BasicBlock {
        instructions,
        successors: successors.to_vec(),
    }
}

/// A defined function.
pub fn function(name: &str, blocks: Vec<BasicBlock>) -> Function {
    Function {
        name: name.to_string(),
        blocks,
    }
}

/// A declared function.
pub fn declaration(name: &str) -> Function {
    function(name, Vec::new())
}

/// A program of `functions`.
pub fn program(functions: Vec<Function>) -> Program {
    Program { functions }
}

/// `other, load, other, other` in one block, no marker anywhere.
pub fn straight_line() -> Program {
    program(vec![function(
        "main",
        vec![block(
            vec![
                inst(0, InstKind::Other),
                inst(1, InstKind::Load),
                inst(2, InstKind::Other),
                inst(3, InstKind::Other),
            ],
            &[],
        )],
    )])
}

/// `main` calls `helper` (a load and a return), then reaches the marker.
///
/// Costs: helper `10 -> 5`, `11 -> 1`; main `2 -> 1` (marker), `1 -> 2`,
/// `0 -> 1 + 5 + 2 = 8` with a successor cost of 2.
pub fn helper_then_marker() -> Program {
    program(vec![
        function(
            "main",
            vec![block(
                vec![inst(0, call("helper")), inst(1, InstKind::Other), inst(2, call("mark"))],
                &[],
            )],
        ),
        function(
            "helper",
            vec![block(vec![inst(10, InstKind::Load), inst(11, InstKind::Other)], &[])],
        ),
        declaration("mark"),
    ])
}
