//! Arithmetic logic unit.

use crate::bus::DataValue;
use crate::encoding::AluFunction;

/// Result and flags produced by one ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AluOutput {
    /// Result written to the accumulator.
    pub result: DataValue,
    /// Signed overflow of `ADD`/`SUB`; clear for logic operations.
    pub signed_overflow: bool,
    /// Unsigned carry out of `ADD`, borrow of `SUB`; clear for logic operations.
    pub carry: bool,
}

impl AluOutput {
    const fn logic(result: u8) -> Self {
        Self {
            result: DataValue::new(result),
            signed_overflow: false,
            carry: false,
        }
    }
}

/// Applies `function` to the accumulator and the second operand.
///
/// `INV` ignores `operand`.
#[must_use]
pub const fn execute(acc: DataValue, operand: DataValue, function: AluFunction) -> AluOutput {
    let a = acc.unsigned();
    let b = operand.unsigned();
    match function {
        AluFunction::Add => {
            let (sum, carry) = a.overflowing_add(b);
            let result = DataValue::new(sum);
            AluOutput {
                result,
                signed_overflow: acc.is_negative() == operand.is_negative()
                    && result.is_negative() != acc.is_negative(),
                carry,
            }
        }
        AluFunction::Sub => {
            let result = DataValue::new(a.wrapping_sub(b));
            AluOutput {
                result,
                signed_overflow: acc.is_negative() != operand.is_negative()
                    && result.is_negative() != acc.is_negative(),
                carry: a < b,
            }
        }
        AluFunction::And => AluOutput::logic(a & b),
        AluFunction::Or => AluOutput::logic(a | b),
        AluFunction::Xor => AluOutput::logic(a ^ b),
        AluFunction::Inv => AluOutput::logic(!a),
    }
}
