//! Comparison of binary-string dumps.

use std::fmt;

/// One differing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMismatch {
    /// Position among the extracted values.
    pub index: usize,
    /// Value in the first dump.
    pub left: String,
    /// Value in the second dump.
    pub right: String,
}

impl fmt::Display for ValueMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {:3}: {} != {}", self.index, self.left, self.right)
    }
}

/// Outcome of comparing two dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpComparison {
    /// Same values in the same order.
    Identical {
        /// Number of values compared.
        count: usize,
    },
    /// The dumps hold a different number of values.
    CountMismatch {
        /// Values in the first dump.
        left: usize,
        /// Values in the second dump.
        right: usize,
    },
    /// Same count, differing values.
    Different {
        /// Number of values compared.
        compared: usize,
        /// Every differing position.
        mismatches: Vec<ValueMismatch>,
    },
}

impl DumpComparison {
    /// Returns true when the dumps match.
    #[must_use]
    pub const fn is_identical(&self) -> bool {
        matches!(self, Self::Identical { .. })
    }
}

/// Extracts the binary values of a dump, ignoring `//` comments, blank
/// lines and lines that are not binary digits.
#[must_use]
pub fn extract_values(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.find("//").map_or(line, |pos| &line[..pos]))
        .map(|data| data.split_whitespace().collect::<String>())
        .filter(|data| !data.is_empty() && data.chars().all(|c| c == '0' || c == '1'))
        .collect()
}

/// Compares the values of two dumps position by position.
#[must_use]
pub fn compare_dumps(left: &str, right: &str) -> DumpComparison {
    let left = extract_values(left);
    let right = extract_values(right);
    if left.len() != right.len() {
        return DumpComparison::CountMismatch {
            left: left.len(),
            right: right.len(),
        };
    }

    let mismatches: Vec<_> = left
        .iter()
        .zip(&right)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(index, (a, b))| ValueMismatch {
            index,
            left: a.clone(),
            right: b.clone(),
        })
        .collect();

    if mismatches.is_empty() {
        DumpComparison::Identical { count: left.len() }
    } else {
        DumpComparison::Different {
            compared: left.len(),
            mismatches,
        }
    }
}
