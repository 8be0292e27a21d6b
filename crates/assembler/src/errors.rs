//! Structured error reporting for assembler phases.
//!
//! Every phase (parsing, symbol assignment, encoding) reports through
//! [`AssembleError`], which carries the 1-indexed source line it came from.
//! Errors format in the usual style:
//!
//! ```text
//! line 3: invalid register: R9
//! ```

use std::fmt;

/// An assembly failure tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    /// 1-indexed source line.
    pub line: usize,
    /// Kind of error.
    pub kind: AssembleErrorKind,
}

impl AssembleError {
    /// Creates an error at `line`.
    #[must_use]
    pub const fn new(line: usize, kind: AssembleErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Classification of assembly errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleErrorKind {
    /// Mnemonic not in the instruction table.
    UnknownMnemonic(String),
    /// Instruction requires an operand but none was given.
    MissingOperand(String),
    /// Operand given to an instruction that takes none.
    UnexpectedOperand(String),
    /// Operand is not a register name.
    InvalidRegister(String),
    /// Operand is neither a number nor a label.
    InvalidImmediate(String),
    /// Immediate does not fit its field.
    ImmediateOutOfRange {
        /// Parsed value.
        value: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// Label defined twice.
    DuplicateLabel {
        /// Label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// Label referenced but never defined.
    UndefinedLabel(String),
    /// Instruction would be placed past the end of instruction memory.
    AddressOverflow {
        /// Byte address the instruction would occupy.
        address: usize,
    },
    /// Line does not match `label: MNEMONIC operand`.
    InvalidSyntax(String),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl fmt::Display for AssembleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMnemonic(m) => write!(f, "unknown mnemonic: {m}"),
            Self::MissingOperand(m) => write!(f, "{m} requires an operand"),
            Self::UnexpectedOperand(m) => write!(f, "{m} does not take an operand"),
            Self::InvalidRegister(r) => write!(f, "invalid register: {r}"),
            Self::InvalidImmediate(v) => write!(f, "invalid immediate: {v}"),
            Self::ImmediateOutOfRange { value, min, max } => {
                write!(f, "immediate {value} out of range ({min}..={max})")
            }
            Self::DuplicateLabel {
                name,
                first_definition,
            } => write!(
                f,
                "duplicate label '{name}' (first defined at line {first_definition})"
            ),
            Self::UndefinedLabel(l) => write!(f, "undefined label: {l}"),
            Self::AddressOverflow { address } => write!(
                f,
                "address overflow: 0x{address:04X} exceeds instruction memory"
            ),
            Self::InvalidSyntax(s) => write!(f, "invalid syntax: {s}"),
        }
    }
}

impl std::error::Error for AssembleError {}

#[cfg(test)]
mod tests {
    use super::{AssembleError, AssembleErrorKind};

    #[test]
    fn display_prefixes_the_line_number() {
        let error = AssembleError::new(3, AssembleErrorKind::InvalidRegister("R9".to_string()));
        assert_eq!(error.to_string(), "line 3: invalid register: R9");
    }

    #[test]
    fn duplicate_label_names_the_first_definition() {
        let error = AssembleError::new(
            7,
            AssembleErrorKind::DuplicateLabel {
                name: "loop".to_string(),
                first_definition: 2,
            },
        );
        assert_eq!(
            error.to_string(),
            "line 7: duplicate label 'loop' (first defined at line 2)"
        );
    }

    #[test]
    fn range_errors_show_the_accepted_bounds() {
        let kind = AssembleErrorKind::ImmediateOutOfRange {
            value: 256,
            min: -128,
            max: 255,
        };
        assert_eq!(kind.to_string(), "immediate 256 out of range (-128..=255)");
    }
}
