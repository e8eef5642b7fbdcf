//! Configuration system for the cost model.
//!
//! This module defines all configuration structures used to parameterize the
//! cache models, the address resolver, and the searcher. It provides:
//! 1. **Defaults:** Baseline hardware constants (an Intel Xeon E5-2667 v2).
//! 2. **Structures:** Model, timing, exploration, and resolver configuration.
//! 3. **Validation:** Rejection of impossible geometry before any path runs.
//!
//! Configuration is supplied as JSON (`Config::from_json`, `Config::from_file`)
//! or built with `Config::default()`. It is immutable once loaded and shared by
//! every path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{ConfigError, low_mask};

/// Default configuration constants.
///
/// These model an Intel(R) Xeon(R) CPU E5-2667 v2 with latencies expressed in
/// nanoseconds.
pub mod defaults {
    /// Clock period in nanoseconds.
    pub const CYCLE_NS: f64 = 0.23;

    /// L1 data cache size (32 KiB).
    pub const L1_SIZE: usize = 32 * 1024;
    /// L1 associativity.
    pub const L1_WAYS: usize = 8;
    /// L1 hit latency (4 cycles).
    pub const L1_LATENCY: f64 = 4.0 * CYCLE_NS;

    /// L2 size (256 KiB).
    pub const L2_SIZE: usize = 256 * 1024;
    /// L2 associativity.
    pub const L2_WAYS: usize = 8;
    /// L2 hit latency (12 cycles).
    pub const L2_LATENCY: f64 = 12.0 * CYCLE_NS;

    /// L3 size (25 MiB).
    pub const L3_SIZE: usize = 25600 * 1024;
    /// L3 associativity.
    pub const L3_WAYS: usize = 20;
    /// L3 hit latency (30 cycles).
    pub const L3_LATENCY: f64 = 30.0 * CYCLE_NS;

    /// DRAM access latency.
    pub const DRAM_LATENCY: f64 = 62.0;

    /// Cost of executing one instruction.
    pub const NS_PER_INSTRUCTION: f64 = 0.05;

    /// Fixed cost charged once per loop iteration.
    pub const FIXED_OVERHEAD_NS: f64 = 0.0;
}

/// Direction of the search: which extreme of the cost the exploration chases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SearchMode {
    /// Prefer paths with the highest estimated cost per iteration.
    #[default]
    #[serde(alias = "worst_case")]
    WorstCase,
    /// Prefer paths with the lowest estimated cost per iteration.
    #[serde(alias = "best_case")]
    BestCase,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use cachehunt_core::config::{Config, ModelConfig};
///
/// let json = r#"{
///     "model": {
///         "kind": "Generic",
///         "levels": [
///             { "size_bytes": 128, "ways": 2, "write_back": true, "latency": 1.0 }
///         ],
///         "dram_latency": 100.0
///     },
///     "exploration": { "max_iterations": 4 },
///     "resolver": { "worst_case_indices": true, "seed": 7 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.exploration.max_iterations, Some(4));
/// assert!(matches!(config.model, ModelConfig::Generic(ref g) if g.levels.len() == 1));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cache model selection and geometry.
    #[serde(default)]
    pub model: ModelConfig,
    /// Instruction and per-iteration timing.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Loop iteration cap and search direction.
    #[serde(default)]
    pub exploration: ExplorationConfig,
    /// Symbolic address resolution policy.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed JSON and any validation error
    /// from [`Config::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Config::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks that the configured geometry can actually be simulated.
    ///
    /// # Errors
    ///
    /// Returns the first zero-size level, zero-associativity level, uneven
    /// level, or out-of-range block/page geometry found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.model {
            ModelConfig::Generic(generic) => generic.validate(),
            ModelConfig::ContentionSets(sets) => sets.validate(),
        }
    }
}

/// Cache model selection.
///
/// Deserialized from an internally tagged object: `{"kind": "Generic", ...}` or
/// `{"kind": "ContentionSets", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum ModelConfig {
    /// Modulo-indexed multi-level hierarchy.
    Generic(GenericConfig),
    /// Single shared cache partitioned into empirically discovered contention sets.
    ContentionSets(ContentionSetConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::Generic(GenericConfig::default())
    }
}

/// Configuration of one level of a modulo-indexed hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CacheLevelConfig {
    /// Capacity in bytes.
    pub size_bytes: usize,
    /// Associativity (ways per line).
    pub ways: usize,
    /// Write-back when true, write-through otherwise.
    #[serde(default = "CacheLevelConfig::default_write_back")]
    pub write_back: bool,
    /// Hit latency in nanoseconds.
    pub latency: f64,
}

impl CacheLevelConfig {
    /// Levels are write-back unless stated otherwise.
    const fn default_write_back() -> bool {
        true
    }

    /// Number of lines (sets) at this level for the given block size.
    pub const fn num_lines(&self, block_bits: u32) -> usize {
        self.size_bytes / self.ways / (1 << block_bits)
    }
}

/// Modulo-indexed hierarchy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenericConfig {
    /// Log2 of the block size in bytes.
    #[serde(default = "GenericConfig::default_block_bits")]
    pub block_bits: u32,
    /// Cache levels ordered from closest to the core (L1) outward.
    #[serde(default = "GenericConfig::default_levels")]
    pub levels: Vec<CacheLevelConfig>,
    /// Latency of an access that misses every level.
    #[serde(default = "GenericConfig::default_dram_latency")]
    pub dram_latency: f64,
}

impl GenericConfig {
    /// Returns the default block size (64 bytes).
    const fn default_block_bits() -> u32 {
        crate::common::DEFAULT_BLOCK_BITS
    }

    /// Returns the default three-level hierarchy.
    fn default_levels() -> Vec<CacheLevelConfig> {
        vec![
            CacheLevelConfig {
                size_bytes: defaults::L1_SIZE,
                ways: defaults::L1_WAYS,
                write_back: true,
                latency: defaults::L1_LATENCY,
            },
            CacheLevelConfig {
                size_bytes: defaults::L2_SIZE,
                ways: defaults::L2_WAYS,
                write_back: true,
                latency: defaults::L2_LATENCY,
            },
            CacheLevelConfig {
                size_bytes: defaults::L3_SIZE,
                ways: defaults::L3_WAYS,
                write_back: true,
                latency: defaults::L3_LATENCY,
            },
        ]
    }

    /// Returns the default DRAM latency.
    const fn default_dram_latency() -> f64 {
        defaults::DRAM_LATENCY
    }

    /// Largest line count across all levels.
    pub fn max_lines(&self) -> usize {
        self.levels
            .iter()
            .map(|level| level.num_lines(self.block_bits))
            .max()
            .unwrap_or(0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_bits == 0 || self.block_bits >= 32 {
            return Err(ConfigError::Geometry(format!(
                "block bits must be in 1..32, got {}",
                self.block_bits
            )));
        }
        let block_bytes = 1usize << self.block_bits;
        for (idx, level) in self.levels.iter().enumerate() {
            let number = idx + 1;
            if level.size_bytes == 0 {
                return Err(ConfigError::ZeroSizeLevel { level: number });
            }
            if level.ways == 0 {
                return Err(ConfigError::ZeroAssociativity { level: number });
            }
            let line_bytes = level.ways.checked_mul(block_bytes).ok_or_else(|| {
                ConfigError::Geometry(format!(
                    "L{number}: {} ways of {block_bytes}-byte blocks overflow",
                    level.ways
                ))
            })?;
            if level.size_bytes % line_bytes != 0 {
                return Err(ConfigError::UnevenLevel {
                    level: number,
                    size_bytes: level.size_bytes,
                    ways: level.ways,
                    block_bytes,
                });
            }
        }
        Ok(())
    }
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self {
            block_bits: Self::default_block_bits(),
            levels: Self::default_levels(),
            dram_latency: Self::default_dram_latency(),
        }
    }
}

/// Contention-set model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentionSetConfig {
    /// Contention-set file produced by offline set discovery.
    #[serde(default)]
    pub sets_path: Option<PathBuf>,
    /// Total cache capacity; sizes the catch-all bucket for unclassified addresses.
    #[serde(default = "ContentionSetConfig::default_cache_size")]
    pub cache_size_bytes: usize,
    /// Log2 of the block size in bytes.
    #[serde(default = "ContentionSetConfig::default_block_bits")]
    pub block_bits: u32,
    /// Log2 of the page size whose offset bits key a contention set.
    #[serde(default = "ContentionSetConfig::default_page_bits")]
    pub page_bits: u32,
    /// Write-back when true, write-through otherwise.
    #[serde(default = "ContentionSetConfig::default_write_back")]
    pub write_back: bool,
    /// Latency of a cache hit.
    #[serde(default = "ContentionSetConfig::default_hit_latency")]
    pub hit_latency: f64,
    /// Latency of a miss (DRAM access).
    #[serde(default = "ContentionSetConfig::default_miss_latency")]
    pub miss_latency: f64,
}

impl ContentionSetConfig {
    /// Returns the default cache capacity.
    const fn default_cache_size() -> usize {
        defaults::L3_SIZE
    }

    /// Returns the default block size (64 bytes).
    const fn default_block_bits() -> u32 {
        crate::common::DEFAULT_BLOCK_BITS
    }

    /// Returns the default page size (1 GiB).
    const fn default_page_bits() -> u32 {
        crate::common::DEFAULT_PAGE_BITS
    }

    /// The shared cache is write-back by default.
    const fn default_write_back() -> bool {
        true
    }

    /// Returns the default hit latency (L3).
    const fn default_hit_latency() -> f64 {
        defaults::L3_LATENCY
    }

    /// Returns the default miss latency (DRAM).
    const fn default_miss_latency() -> f64 {
        defaults::DRAM_LATENCY
    }

    /// Mask selecting the block-aligned page-offset bits of an address.
    pub const fn page_key_mask(&self) -> u64 {
        low_mask(self.page_bits) & !low_mask(self.block_bits)
    }

    /// Number of blocks the whole cache holds.
    pub const fn capacity_blocks(&self) -> usize {
        self.cache_size_bytes >> self.block_bits
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_bits == 0 || self.block_bits >= self.page_bits || self.page_bits > 63 {
            return Err(ConfigError::Geometry(format!(
                "need 0 < block bits ({}) < page bits ({}) <= 63",
                self.block_bits, self.page_bits
            )));
        }
        if self.capacity_blocks() == 0 {
            return Err(ConfigError::ZeroSizeLevel { level: 1 });
        }
        Ok(())
    }
}

impl Default for ContentionSetConfig {
    fn default() -> Self {
        Self {
            sets_path: None,
            cache_size_bytes: Self::default_cache_size(),
            block_bits: Self::default_block_bits(),
            page_bits: Self::default_page_bits(),
            write_back: Self::default_write_back(),
            hit_latency: Self::default_hit_latency(),
            miss_latency: Self::default_miss_latency(),
        }
    }
}

/// Instruction and per-iteration timing.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TimingConfig {
    /// Cost of one executed instruction, excluding memory latency.
    #[serde(default = "TimingConfig::default_ns_per_instruction")]
    pub ns_per_instruction: f64,
    /// Fixed cost charged once per loop iteration.
    #[serde(default = "TimingConfig::default_fixed_overhead")]
    pub fixed_overhead_ns: f64,
}

impl TimingConfig {
    /// Returns the default per-instruction cost.
    const fn default_ns_per_instruction() -> f64 {
        defaults::NS_PER_INSTRUCTION
    }

    /// Returns the default per-iteration overhead.
    const fn default_fixed_overhead() -> f64 {
        defaults::FIXED_OVERHEAD_NS
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ns_per_instruction: Self::default_ns_per_instruction(),
            fixed_overhead_ns: Self::default_fixed_overhead(),
        }
    }
}

/// Loop exploration bounds and search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ExplorationConfig {
    /// Iterations recorded before a path is considered exhausted; `None` is unbounded.
    #[serde(default)]
    pub max_iterations: Option<usize>,
    /// Whether to chase the highest or the lowest cost.
    #[serde(default)]
    pub search_mode: SearchMode,
}

/// Symbolic address resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ResolverConfig {
    /// Pick symbolic addresses that exercise worst-case cache behavior.
    #[serde(default)]
    pub worst_case_indices: bool,
    /// Terminate a path when no worst-case candidate fits its constraints.
    #[serde(default)]
    pub terminate_on_unsat: bool,
    /// Abandon the worst-case search at the first unsatisfiable candidate.
    #[serde(default)]
    pub give_up_on_complex_indices: bool,
    /// Fail the path on a solver error instead of moving to the next candidate.
    #[serde(default)]
    pub fail_on_solver_error: bool,
    /// Seed for candidate tie-breaking; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}
