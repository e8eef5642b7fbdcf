//! Contention-set file loading.

use std::io::Write as _;

use cachehunt_core::cache::ContentionSetTable;
use cachehunt_core::common::ConfigError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::NamedTempFile;

#[test]
fn reverse_index_lists_every_set_of_a_key() {
    let table = ContentionSetTable::parse("# measured\n2\n0x1000\n0x2000\n\n3\n4096\n12288\n").unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.associativity(1), 3);
    assert_eq!(table.sets_containing(0x1000), &[0, 1]);
    assert_eq!(table.sets_containing(0x3000), &[1]);
    assert!(table.sets_containing(0x9000).is_empty());
}

#[rstest]
#[case::zero_ways("0\n4096\n", 1)]
#[case::bad_key("2\n4096\nfour\n", 3)]
#[case::bad_hex("1\n\n2\n0xZZ\n", 4)]
fn malformed_lines_are_reported(#[case] text: &str, #[case] expected_line: usize) {
    let err = ContentionSetTable::parse(text).unwrap_err();
    assert!(
        matches!(err, ConfigError::MalformedContentionSets { line, .. } if line == expected_line),
        "unexpected error: {err}"
    );
}

#[test]
fn loads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "2\n4096\n8192\n").unwrap();

    let table = ContentionSetTable::load(file.path()).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0).map(|s| s.addresses.len()), Some(2));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ContentionSetTable::load(dir.path().join("absent.txt")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
