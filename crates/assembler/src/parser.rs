//! Assembly source line parser.
//!
//! Converts raw source lines into [`ParsedLine`] items ready for symbol
//! assignment and encoding. A line has the shape
//!
//! ```text
//! [label:] [MNEMONIC [operand]] [; comment]
//! ```
//!
//! Mnemonics and register names are case-insensitive; labels are not.

use simulator_core::Register;

use crate::errors::{AssembleError, AssembleErrorKind};
use crate::mnemonic::{resolve_mnemonic, InstructionForm, OperandKind};

/// A parsed operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Register name.
    Register(Register),
    /// Numeric immediate, not yet range-checked.
    Number(i64),
    /// Label reference, resolved during encoding.
    Label(String),
}

/// A parsed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    /// The mnemonic as written.
    pub mnemonic: String,
    /// Form resolved from the mnemonic table.
    pub form: InstructionForm,
    /// Operand, present exactly when the form takes one.
    pub operand: Option<Operand>,
}

/// A single parsed source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    /// Label defined on this line.
    pub label: Option<String>,
    /// Instruction on this line.
    pub instruction: Option<ParsedInstruction>,
}

impl ParsedLine {
    /// Returns true for blank and comment-only lines.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.label.is_none() && self.instruction.is_none()
    }
}

/// Parses one source line.
///
/// # Errors
///
/// Returns an [`AssembleError`] at `line_number` for malformed labels,
/// unknown mnemonics, and missing, unexpected or malformed operands.
pub fn parse_line(line: &str, line_number: usize) -> Result<ParsedLine, AssembleError> {
    let err = |kind| AssembleError::new(line_number, kind);
    let trimmed = strip_comment(line).trim();

    let (label, rest) = match trimmed.split_once(':') {
        Some((label, rest)) => {
            let label = label.trim();
            if !is_valid_label(label) {
                return Err(err(AssembleErrorKind::InvalidSyntax(trimmed.to_string())));
            }
            (Some(label.to_string()), rest.trim())
        }
        None => (None, trimmed),
    };

    let mut tokens = rest.split_whitespace();
    let Some(mnemonic) = tokens.next() else {
        return Ok(ParsedLine {
            label,
            instruction: None,
        });
    };
    let operand_text = tokens.next();
    if tokens.next().is_some() {
        return Err(err(AssembleErrorKind::InvalidSyntax(rest.to_string())));
    }

    let form = resolve_mnemonic(mnemonic).ok_or_else(|| {
        if mnemonic.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            err(AssembleErrorKind::UnknownMnemonic(mnemonic.to_string()))
        } else {
            err(AssembleErrorKind::InvalidSyntax(rest.to_string()))
        }
    })?;

    let operand = parse_operand(form.operand(), mnemonic, operand_text).map_err(err)?;

    Ok(ParsedLine {
        label,
        instruction: Some(ParsedInstruction {
            mnemonic: mnemonic.to_string(),
            form,
            operand,
        }),
    })
}

/// Returns `line` up to its `;` comment.
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    line.find(';').map_or(line, |pos| &line[..pos])
}

fn is_valid_label(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_operand(
    kind: OperandKind,
    mnemonic: &str,
    text: Option<&str>,
) -> Result<Option<Operand>, AssembleErrorKind> {
    let name = mnemonic.to_ascii_uppercase();
    let text = match (kind, text) {
        (OperandKind::None, None) => return Ok(None),
        (OperandKind::None, Some(_)) => return Err(AssembleErrorKind::UnexpectedOperand(name)),
        (_, None) => return Err(AssembleErrorKind::MissingOperand(name)),
        (_, Some(text)) => text,
    };

    let operand = match kind {
        OperandKind::Register => Register::from_name(text)
            .map(Operand::Register)
            .ok_or_else(|| AssembleErrorKind::InvalidRegister(text.to_string()))?,
        OperandKind::DataImmediate => parse_numeric_value(text)
            .map(Operand::Number)
            .ok_or_else(|| AssembleErrorKind::InvalidImmediate(text.to_string()))?,
        OperandKind::AddressImmediate => match parse_numeric_value(text) {
            Some(value) => Operand::Number(value),
            None if is_valid_label(text) => Operand::Label(text.to_string()),
            None => return Err(AssembleErrorKind::InvalidImmediate(text.to_string())),
        },
        OperandKind::None => return Err(AssembleErrorKind::UnexpectedOperand(name)),
    };
    Ok(Some(operand))
}

/// Parses `0x`/`0b` prefixed or decimal integers; `_` separators are
/// ignored and decimals may be negative.
#[must_use]
pub fn parse_numeric_value(s: &str) -> Option<i64> {
    let cleaned: String = s.trim().chars().filter(|&c| c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        return all_digits(hex, 16)
            .then(|| i64::from_str_radix(hex, 16).ok())
            .flatten();
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return all_digits(bin, 2)
            .then(|| i64::from_str_radix(bin, 2).ok())
            .flatten();
    }
    let magnitude = lower.strip_prefix('-').unwrap_or(&lower);
    all_digits(magnitude, 10)
        .then(|| lower.parse::<i64>().ok())
        .flatten()
}

fn all_digits(s: &str, radix: u32) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_digit(radix))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use simulator_core::{AluFunction, BranchCondition, Register};

    use super::{parse_line, parse_numeric_value, Operand, ParsedInstruction, ParsedLine};
    use crate::errors::AssembleErrorKind;
    use crate::mnemonic::InstructionForm;

    fn instruction(line: &str) -> ParsedInstruction {
        parse_line(line, 1)
            .expect("line parses")
            .instruction
            .expect("line has an instruction")
    }

    fn error_kind(line: &str) -> AssembleErrorKind {
        parse_line(line, 1).expect_err("line is invalid").kind
    }

    #[test]
    fn blank_and_comment_lines_are_empty() {
        assert!(parse_line("", 1).expect("blank").is_blank());
        assert!(parse_line("   ; only a comment", 1)
            .expect("comment")
            .is_blank());
    }

    #[test]
    fn label_only_line() {
        assert_eq!(
            parse_line("loop:", 4).expect("label"),
            ParsedLine {
                label: Some("loop".to_string()),
                instruction: None,
            }
        );
    }

    #[test]
    fn label_with_instruction_and_comment() {
        let parsed = parse_line("start: ADD r3 ; add r3", 1).expect("valid line");
        assert_eq!(parsed.label.as_deref(), Some("start"));
        let instruction = parsed.instruction.expect("instruction");
        assert_eq!(instruction.form, InstructionForm::Alu(AluFunction::Add));
        assert_eq!(instruction.operand, Some(Operand::Register(Register::R3)));
    }

    #[test]
    fn mnemonics_and_registers_are_case_insensitive() {
        let parsed = instruction("put doff");
        assert_eq!(parsed.form, InstructionForm::Put);
        assert_eq!(parsed.operand, Some(Operand::Register(Register::Doff)));
    }

    #[test]
    fn address_operands_may_name_labels() {
        let parsed = instruction("BNZ loop");
        assert_eq!(
            parsed.form,
            InstructionForm::Branch(BranchCondition::NotZero)
        );
        assert_eq!(parsed.operand, Some(Operand::Label("loop".to_string())));
    }

    #[test]
    fn data_operands_reject_labels() {
        assert_eq!(
            error_kind("SET value"),
            AssembleErrorKind::InvalidImmediate("value".to_string())
        );
    }

    #[rstest]
    #[case("0x1F", 0x1F)]
    #[case("0X1f", 0x1F)]
    #[case("0b1010", 0b1010)]
    #[case("0B1_0000", 0b1_0000)]
    #[case("42", 42)]
    #[case("-1", -1)]
    #[case("1_000", 1000)]
    fn numeric_forms(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_numeric_value(text), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("0x")]
    #[case("0b2")]
    #[case("+5")]
    #[case("-0x10")]
    #[case("12ab")]
    fn malformed_numbers(#[case] text: &str) {
        assert_eq!(parse_numeric_value(text), None);
    }

    #[rstest]
    #[case("FOO 1", AssembleErrorKind::UnknownMnemonic("FOO".to_string()))]
    #[case("ADD", AssembleErrorKind::MissingOperand("ADD".to_string()))]
    #[case("nop 1", AssembleErrorKind::UnexpectedOperand("NOP".to_string()))]
    #[case("INV R0", AssembleErrorKind::UnexpectedOperand("INV".to_string()))]
    #[case("GET R8", AssembleErrorKind::InvalidRegister("R8".to_string()))]
    #[case("ADDI 0xZZ", AssembleErrorKind::InvalidImmediate("0xZZ".to_string()))]
    #[case("ADDI 1 2", AssembleErrorKind::InvalidSyntax("ADDI 1 2".to_string()))]
    #[case("1abel: NOP", AssembleErrorKind::InvalidSyntax("1abel: NOP".to_string()))]
    fn malformed_lines(#[case] line: &str, #[case] expected: AssembleErrorKind) {
        assert_eq!(error_kind(line), expected);
    }

    #[test]
    fn errors_carry_the_line_number() {
        let error = parse_line("BOGUS", 12).expect_err("unknown mnemonic");
        assert_eq!(error.line, 12);
    }
}
