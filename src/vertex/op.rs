//! The operation kinds a [`super::ComputeVertex`] may be configured with.

use crate::value::{Value, ValueKind};

/// One of the generic compute vertex's pluggable operations.
///
/// Per the redesign guidance, the source library's menagerie of individual
/// vertex subclasses (one per arithmetic/logic/comparison kind) collapses
/// to this single tagged enum, consumed by one generic vertex body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Integer division.
    Div,
    /// Bitwise AND.
    BitAnd,
    /// Bitwise OR.
    BitOr,
    /// Bitwise XOR.
    BitXor,
    /// Logical AND.
    LogicAnd,
    /// Logical OR.
    LogicOr,
    /// Logical NOT.
    LogicNot,
    /// `>=` comparison.
    GEqual,
    /// `<=` comparison.
    LEqual,
    /// `==` comparison.
    Equal,
    /// `!=` comparison.
    NotEqual,
    /// `>` comparison.
    Greater,
    /// `<` comparison.
    Less,
    /// Reports its single input's pre-increment value.
    PostInc,
    /// Reports its single input's pre-decrement value.
    PostDec,
    /// A 3-input multiplexer: `cond ? a : b`.
    Ternary,
    /// Reinterprets its single input as `ValueKind`.
    Cast(ValueKind),
    /// A 3-input multiplexer: `cond ? a : b`, same shape as `Ternary`.
    Select,
    /// Passes its single input through unchanged.
    Assign,
}

impl Op {
    /// How many inputs this operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Op::LogicNot | Op::PostInc | Op::PostDec | Op::Cast(_) | Op::Assign => 1,
            Op::Ternary | Op::Select => 3,
            _ => 2,
        }
    }

    /// Applies the operation to `inputs`, in declared-arity order.
    ///
    /// Panics if `inputs.len()` does not match [`Op::arity`] — a
    /// mismatch here is a construction-time bug, not a runtime condition
    /// this contract is meant to recover from.
    pub fn compute(&self, inputs: &[Value]) -> Value {
        assert_eq!(inputs.len(), self.arity(), "operand count mismatch for {self:?}");
        match self {
            Op::Add => binop(inputs, |a, b| a.wrapping_add(b)),
            Op::Sub => binop(inputs, |a, b| a.wrapping_sub(b)),
            Op::Mul => binop(inputs, |a, b| a.wrapping_mul(b)),
            Op::Div => binop(inputs, |a, b| a / b),
            Op::BitAnd => binop(inputs, |a, b| a & b),
            Op::BitOr => binop(inputs, |a, b| a | b),
            Op::BitXor => binop(inputs, |a, b| a ^ b),
            Op::LogicAnd => Value::Bool(inputs[0].as_bool() && inputs[1].as_bool()),
            Op::LogicOr => Value::Bool(inputs[0].as_bool() || inputs[1].as_bool()),
            Op::LogicNot => Value::Bool(!inputs[0].as_bool()),
            Op::GEqual => Value::Bool(inputs[0].as_i64() >= inputs[1].as_i64()),
            Op::LEqual => Value::Bool(inputs[0].as_i64() <= inputs[1].as_i64()),
            Op::Equal => Value::Bool(inputs[0].as_i64() == inputs[1].as_i64()),
            Op::NotEqual => Value::Bool(inputs[0].as_i64() != inputs[1].as_i64()),
            Op::Greater => Value::Bool(inputs[0].as_i64() > inputs[1].as_i64()),
            Op::Less => Value::Bool(inputs[0].as_i64() < inputs[1].as_i64()),
            // Both report the pre-operation value; the decrement/increment
            // itself has no observable effect beyond this one activation,
            // since a vertex holds no state across activations (§4.4).
            Op::PostInc => inputs[0],
            Op::PostDec => inputs[0],
            Op::Ternary | Op::Select => {
                if inputs[0].as_bool() {
                    inputs[1]
                } else {
                    inputs[2]
                }
            }
            Op::Cast(kind) => kind.with_value(inputs[0].as_i64()),
            Op::Assign => inputs[0],
        }
    }
}

fn binop(inputs: &[Value], f: impl Fn(i64, i64) -> i64) -> Value {
    let result = f(inputs[0].as_i64(), inputs[1].as_i64());
    inputs[0].with_same_kind(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitand_preserves_operand_kind() {
        let out = Op::BitAnd.compute(&[Value::U8(0xF0), Value::U8(0x0F)]);
        assert_eq!(out, Value::U8(0x00));
    }

    #[test]
    fn post_dec_reports_pre_decrement_value() {
        let out = Op::PostDec.compute(&[Value::I32(7)]);
        assert_eq!(out, Value::I32(7));
    }

    #[test]
    fn ternary_selects_by_condition() {
        let t = Op::Ternary.compute(&[Value::Bool(true), Value::I32(7), Value::I32(11)]);
        let f = Op::Ternary.compute(&[Value::Bool(false), Value::I32(7), Value::I32(11)]);
        assert_eq!(t, Value::I32(7));
        assert_eq!(f, Value::I32(11));
    }

    #[test]
    fn comparisons_return_bool() {
        assert_eq!(Op::Greater.compute(&[Value::I32(3), Value::I32(2)]), Value::Bool(true));
        assert_eq!(Op::Equal.compute(&[Value::I32(3), Value::I32(3)]), Value::Bool(true));
    }

    #[test]
    fn cast_reinterprets_kind() {
        let out = Op::Cast(ValueKind::U8).compute(&[Value::I32(300)]);
        assert_eq!(out, Value::U8(300i64 as u8));
    }
}
