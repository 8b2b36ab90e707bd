// ── Service and system versions ──
//
// Dotted numeric versions as advertised by ATC info endpoints (`3.14.0`)
// and `sys/version` (`13.1.1.4`). Ordering is numeric per component with
// missing trailing components treated as zero, so `3.14` == `3.14.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
}

/// A `major.minor.patch` threshold.
pub type Threshold = (u64, u64, u64);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            parts: vec![major, minor, patch],
        }
    }

    fn component(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }

    /// True when `self >= threshold`.
    pub fn at_least(&self, (major, minor, patch): Threshold) -> bool {
        *self >= Self::new(major, minor, patch)
    }
}

impl FromStr for Version {
    type Err = CoreError;

    /// Parse leading numeric components. Parsing stops at the first
    /// component that does not start with a digit; a component such as
    /// `0-4` contributes its numeric prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for piece in s.trim().trim_start_matches(['v', 'V']).split('.') {
            let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            let value = digits.parse::<u64>().map_err(|e| {
                CoreError::Internal(format!("version component {piece:?} out of range: {e}"))
            })?;
            parts.push(value);
            if digits.len() != piece.len() {
                break;
            }
        }

        if parts.is_empty() {
            return Err(CoreError::Internal(format!("unparseable version string {s:?}")));
        }
        Ok(Self { parts })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.parts.iter().map(ToString::to_string).collect();
        f.write_str(&text.join("."))
    }
}
