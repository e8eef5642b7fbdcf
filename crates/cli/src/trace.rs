//! Access trace format for `cachehunt replay`.
//!
//! One event per line; `#` starts a comment:
//!
//! ```text
//! L              loop boundary
//! I 12           12 executed instructions (count defaults to 1)
//! R 0x1040       load
//! W 4096         store
//! S R 0x0 64 32  symbolic load of 0x0 + 64 * x, x in [0, 32)
//! ```

use std::fmt;

/// One trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Loop boundary marker.
    Boundary,
    /// Executed instructions.
    Instructions(u64),
    /// Concrete access.
    Access { address: u64, is_write: bool },
    /// Access through `base + stride * x` with `x` in `[0, count)`.
    Symbolic {
        base: u64,
        stride: u64,
        count: u64,
        is_write: bool,
    },
}

/// A malformed trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceError {
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for TraceError {}

/// Parses a whole trace.
pub fn parse(text: &str) -> Result<Vec<Event>, TraceError> {
    let mut events = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let fail = |reason: String| TraceError { line: idx + 1, reason };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let event = match fields.as_slice() {
            ["L"] => Event::Boundary,
            ["I"] => Event::Instructions(1),
            ["I", n] => Event::Instructions(number(n).map_err(fail)?),
            [op @ ("R" | "W"), addr] => Event::Access {
                address: number(addr).map_err(fail)?,
                is_write: *op == "W",
            },
            ["S", op @ ("R" | "W"), base, stride, count] => Event::Symbolic {
                base: number(base).map_err(fail)?,
                stride: number(stride).map_err(fail)?,
                count: number(count).map_err(fail)?,
                is_write: *op == "W",
            },
            _ => return Err(fail(format!("unrecognized event `{line}`"))),
        };
        events.push(event);
    }
    Ok(events)
}

fn number(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|err| format!("`{text}`: {err}"))
}
