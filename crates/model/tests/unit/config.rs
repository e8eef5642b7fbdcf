//! Configuration Unit Tests.
//!
//! Defaults, JSON loading, geometry validation, and model construction.

use std::io::Write as _;
use std::sync::Arc;

use cachehunt_core::cache::{ContentionSetTable, build_model, build_model_with_table};
use cachehunt_core::common::ConfigError;
use cachehunt_core::config::{
    CacheLevelConfig, Config, ContentionSetConfig, ModelConfig, SearchMode, defaults,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::NamedTempFile;

use crate::common::builders::{generic_config, level};

fn with_levels(levels: Vec<CacheLevelConfig>) -> Config {
    Config {
        model: ModelConfig::Generic(generic_config(levels)),
        ..Config::default()
    }
}

fn contention_config(sets_path: Option<std::path::PathBuf>) -> Config {
    Config {
        model: ModelConfig::ContentionSets(ContentionSetConfig {
            sets_path,
            ..ContentionSetConfig::default()
        }),
        ..Config::default()
    }
}

// ──────────────────────────────────────────────────────────
// Defaults and parsing
// ──────────────────────────────────────────────────────────

#[test]
fn default_models_a_three_level_xeon() {
    let config = Config::default();
    let ModelConfig::Generic(generic) = &config.model else {
        panic!("default model should be generic");
    };

    assert_eq!(generic.block_bits, 6);
    assert_eq!(generic.levels.len(), 3);
    assert_eq!(generic.levels[0].size_bytes, 32 * 1024);
    assert_eq!(generic.levels[0].ways, 8);
    assert!((generic.levels[0].latency - 0.92).abs() < 1e-9);
    assert!(generic.levels.iter().all(|l| l.write_back));
    assert_eq!(generic.dram_latency, defaults::DRAM_LATENCY);
    assert_eq!(config.exploration.max_iterations, None);
    assert_eq!(config.exploration.search_mode, SearchMode::WorstCase);
    assert!(!config.resolver.worst_case_indices);
    assert_eq!(config.resolver.seed, None);
    assert!(config.validate().is_ok());
}

#[test]
fn parses_contention_model_and_best_case() {
    let config = Config::from_json(
        r#"{
            "model": { "kind": "ContentionSets", "sets_path": "sets.txt", "page_bits": 12 },
            "exploration": { "search_mode": "best_case", "max_iterations": 3 }
        }"#,
    )
    .unwrap();

    let ModelConfig::ContentionSets(sets) = &config.model else {
        panic!("expected the contention-set model");
    };
    assert_eq!(sets.sets_path.as_deref(), Some(std::path::Path::new("sets.txt")));
    assert_eq!(sets.page_key_mask(), 0xFC0);
    assert!(sets.write_back);
    assert_eq!(config.exploration.search_mode, SearchMode::BestCase);
    assert_eq!(config.exploration.max_iterations, Some(3));
}

#[test]
fn malformed_json_is_rejected() {
    let err = Config::from_json("{ \"model\": ").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn loads_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "resolver": {{ "worst_case_indices": true, "seed": 9 }} }}"#).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.resolver.worst_case_indices);
    assert_eq!(config.resolver.seed, Some(9));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = Config::from_file("/nonexistent/cachehunt.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

// ──────────────────────────────────────────────────────────
// Validation
// ──────────────────────────────────────────────────────────

#[rstest]
#[case::zero_size(vec![level(0, 2, true, 1.0)], "zero size")]
#[case::zero_ways(vec![level(128, 0, true, 1.0)], "zero associativity")]
#[case::uneven(vec![level(128, 2, true, 1.0), level(100, 2, true, 5.0)], "L2: 100 bytes")]
#[case::ways_overflow(vec![level(128, usize::MAX, true, 1.0)], "overflow")]
fn impossible_geometry_is_rejected(#[case] levels: Vec<CacheLevelConfig>, #[case] message: &str) {
    let err = with_levels(levels).validate().unwrap_err();
    assert!(err.to_string().contains(message), "unexpected error: {err}");
}

#[test]
fn uneven_level_reports_its_geometry() {
    let err = with_levels(vec![level(100, 2, true, 1.0)]).validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UnevenLevel {
            level: 1,
            size_bytes: 100,
            ways: 2,
            block_bytes: 64
        }
    ));
}

#[test]
fn oversized_associativity_in_json_is_a_geometry_error() {
    let err = Config::from_json(
        r#"{ "model": { "kind": "Generic", "levels": [
            { "size_bytes": 32768, "ways": 288230376151711744, "latency": 1.0 }
        ] } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Geometry(_)), "unexpected error: {err}");
}

#[test]
fn page_must_be_wider_than_block() {
    let mut config = contention_config(None);
    if let ModelConfig::ContentionSets(sets) = &mut config.model {
        sets.page_bits = 6;
    }
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));
}

// ──────────────────────────────────────────────────────────
// Model construction
// ──────────────────────────────────────────────────────────

#[test]
fn contention_model_needs_a_table() {
    let err = build_model(&contention_config(None)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingContentionSets));
}

#[test]
fn contention_model_loads_sets_path() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "2\n4096\n8192\n\n1\n12288\n").unwrap();

    let model = build_model(&contention_config(Some(file.path().to_path_buf()))).unwrap();
    assert_eq!(model.rank_candidates(false).len(), 2);
}

#[test]
fn supplied_table_wins_over_sets_path() {
    let table = Arc::new(ContentionSetTable::parse("1\n4096\n").unwrap());
    let config = contention_config(Some("/nonexistent/sets.txt".into()));

    let model = build_model_with_table(&config, Some(table)).unwrap();
    assert_eq!(model.rank_candidates(true).len(), 1);
}

#[test]
fn generic_model_carries_the_iteration_cap() {
    let mut config = with_levels(vec![level(128, 2, true, 1.0)]);
    config.exploration.max_iterations = Some(1);

    let mut model = build_model(&config).unwrap();
    assert!(model.begin_iteration());
    assert!(!model.begin_iteration());
}
