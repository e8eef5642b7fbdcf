//! Contention set tables.
//!
//! A contention set is a group of page-offset keys that compete for the same
//! cache storage, with the number of them that fit at once. Sets are measured
//! offline on the target machine and loaded from a text file:
//!
//! ```text
//! 2
//! 4096
//! 8192
//! 12288
//!
//! 4
//! 0x40
//! ...
//! ```
//!
//! Each block is an associativity line followed by one key per line and
//! terminated by a blank line or end of input. Keys are decimal or `0x` hex.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::common::ConfigError;

/// One group of mutually contending keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentionSet {
    /// Page keys in the set.
    pub addresses: BTreeSet<u64>,
    /// How many of them can be resident at once.
    pub associativity: usize,
}

/// All known contention sets, with a reverse index from key to sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentionSetTable {
    sets: Vec<ContentionSet>,
    membership: HashMap<u64, Vec<usize>>,
}

impl ContentionSetTable {
    /// Builds a table from already parsed sets.
    pub fn from_sets(sets: Vec<ContentionSet>) -> Self {
        let mut membership: HashMap<u64, Vec<usize>> = HashMap::new();
        for (idx, set) in sets.iter().enumerate() {
            for &key in &set.addresses {
                membership.entry(key).or_default().push(idx);
            }
        }
        Self { sets, membership }
    }

    /// Reads and parses a contention set file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text)?;
        tracing::info!(
            path = %path.display(),
            sets = table.len(),
            "loaded contention sets"
        );
        Ok(table)
    }

    /// Parses contention sets from text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut sets = Vec::new();
        let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line.trim()));

        while let Some((line_no, line)) = lines.next() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let associativity = usize::try_from(parse_number(line, line_no)?).map_err(|_| {
                ConfigError::MalformedContentionSets {
                    line: line_no,
                    reason: format!("associativity {line} out of range"),
                }
            })?;
            if associativity == 0 {
                return Err(ConfigError::MalformedContentionSets {
                    line: line_no,
                    reason: "associativity must be positive".into(),
                });
            }

            let mut addresses = BTreeSet::new();
            for (line_no, line) in lines.by_ref() {
                if line.is_empty() {
                    break;
                }
                let _ = addresses.insert(parse_number(line, line_no)?);
            }
            sets.push(ContentionSet {
                addresses,
                associativity,
            });
        }

        Ok(Self::from_sets(sets))
    }

    /// Number of sets.
    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if no set was loaded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// All sets in file order.
    #[inline]
    pub fn sets(&self) -> &[ContentionSet] {
        &self.sets
    }

    /// Returns the set at `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&ContentionSet> {
        self.sets.get(idx)
    }

    /// Associativity of the set at `idx`, or zero if out of range.
    #[inline]
    pub fn associativity(&self, idx: usize) -> usize {
        self.sets.get(idx).map_or(0, |set| set.associativity)
    }

    /// Indices of every set listing `key`.
    pub fn sets_containing(&self, key: u64) -> &[usize] {
        self.membership.get(&key).map_or(&[], Vec::as_slice)
    }
}

fn parse_number(text: &str, line: usize) -> Result<u64, ConfigError> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| ConfigError::MalformedContentionSets {
        line,
        reason: format!("`{text}`: {err}"),
    })
}
