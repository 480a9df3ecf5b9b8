//! Numeric semantics of the untyped arithmetic and comparison opcodes.
//!
//! Operands arrive already promoted to a common kind. Integer opcodes come
//! in two flavours: the plain/`Ovf` forms read the operand bits as signed,
//! the `Un` forms as unsigned of the same width.

use methodgen_core::bytecode::OpCode;
use methodgen_core::{PrimitiveKind, Value};

use super::RuntimeError;

type Result<T> = std::result::Result<T, RuntimeError>;

/// Integer operand bits with the operand's kind.
#[derive(Debug, Clone, Copy)]
struct Bits {
    kind: PrimitiveKind,
    raw: u64,
}

impl Bits {
    fn of(value: &Value) -> Option<Bits> {
        let (kind, raw) = match *value {
            Value::Int8(v) => (PrimitiveKind::Int8, v as u8 as u64),
            Value::Int16(v) => (PrimitiveKind::Int16, v as u16 as u64),
            Value::Int32(v) => (PrimitiveKind::Int32, v as u32 as u64),
            Value::Int64(v) => (PrimitiveKind::Int64, v as u64),
            Value::Uint8(v) => (PrimitiveKind::Uint8, v.into()),
            Value::Uint16(v) => (PrimitiveKind::Uint16, v.into()),
            Value::Uint32(v) => (PrimitiveKind::Uint32, v.into()),
            Value::Uint64(v) => (PrimitiveKind::Uint64, v),
            _ => return None,
        };
        Some(Bits { kind, raw })
    }

    fn width(self) -> u32 {
        self.kind.bit_width()
    }

    fn signed(self) -> i128 {
        let shift = 64 - self.width();
        (((self.raw << shift) as i64) >> shift) as i128
    }

    fn unsigned(self) -> i128 {
        self.raw as i128
    }

    /// Natural value of the kind.
    fn natural(self) -> i128 {
        if self.kind.is_signed_integer() {
            self.signed()
        } else {
            self.unsigned()
        }
    }
}

fn min_max(kind: PrimitiveKind, unsigned: bool) -> (i128, i128) {
    let width = kind.bit_width();
    if unsigned {
        (0, (1i128 << width) - 1)
    } else {
        (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
    }
}

/// Build a value of `kind` from the low bits of `x`.
fn wrap(kind: PrimitiveKind, x: i128) -> Value {
    let bits = x as u64;
    match kind {
        PrimitiveKind::Int8 => Value::Int8(bits as i8),
        PrimitiveKind::Int16 => Value::Int16(bits as i16),
        PrimitiveKind::Int32 => Value::Int32(bits as i32),
        PrimitiveKind::Int64 => Value::Int64(bits as i64),
        PrimitiveKind::Uint8 => Value::Uint8(bits as u8),
        PrimitiveKind::Uint16 => Value::Uint16(bits as u16),
        PrimitiveKind::Uint32 => Value::Uint32(bits as u32),
        _ => Value::Uint64(bits),
    }
}

fn checked(kind: PrimitiveKind, x: i128, unsigned: bool) -> Result<Value> {
    let (min, max) = min_max(kind, unsigned);
    if x < min || x > max {
        return Err(RuntimeError::Overflow);
    }
    Ok(wrap(kind, x))
}

fn float(value: &Value) -> Option<f64> {
    match *value {
        Value::Float(v) => Some(v.into()),
        Value::Double(v) => Some(v),
        _ => None,
    }
}

fn float_result(like: &Value, x: f64) -> Value {
    match like {
        Value::Float(_) => Value::Float(x as f32),
        _ => Value::Double(x),
    }
}

fn operands(op: OpCode, a: &Value, b: &Value) -> Result<(Bits, Bits)> {
    match (Bits::of(a), Bits::of(b)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(RuntimeError::InvalidOperands {
            op: op.name(),
            operands: format!("{a}, {b}"),
        }),
    }
}

/// Evaluate a binary arithmetic or bitwise opcode.
pub(crate) fn binary(op: OpCode, a: &Value, b: &Value) -> Result<Value> {
    if let (Some(x), Some(y)) = (float(a), float(b)) {
        let r = match op {
            OpCode::Add | OpCode::AddOvf | OpCode::AddOvfUn => x + y,
            OpCode::Sub | OpCode::SubOvf | OpCode::SubOvfUn => x - y,
            OpCode::Mul | OpCode::MulOvf | OpCode::MulOvfUn => x * y,
            OpCode::Div | OpCode::DivUn => x / y,
            OpCode::Rem | OpCode::RemUn => x % y,
            _ => {
                return Err(RuntimeError::InvalidOperands {
                    op: op.name(),
                    operands: format!("{a}, {b}"),
                });
            }
        };
        return Ok(float_result(a, r));
    }

    if let (Value::Bool(x), Value::Bool(y)) = (a, b) {
        return match op {
            OpCode::And => Ok(Value::Bool(*x && *y)),
            OpCode::Or => Ok(Value::Bool(*x || *y)),
            OpCode::Xor => Ok(Value::Bool(x ^ y)),
            _ => Err(RuntimeError::InvalidOperands {
                op: op.name(),
                operands: format!("{a}, {b}"),
            }),
        };
    }

    let (x, y) = operands(op, a, b)?;
    let kind = x.kind;
    match op {
        OpCode::Add => Ok(wrap(kind, x.signed() + y.signed())),
        OpCode::Sub => Ok(wrap(kind, x.signed() - y.signed())),
        OpCode::Mul => Ok(wrap(kind, x.signed() * y.signed())),
        OpCode::AddOvf => checked(kind, x.signed() + y.signed(), false),
        OpCode::SubOvf => checked(kind, x.signed() - y.signed(), false),
        OpCode::MulOvf => checked(kind, x.signed() * y.signed(), false),
        OpCode::AddOvfUn => checked(kind, x.unsigned() + y.unsigned(), true),
        OpCode::SubOvfUn => checked(kind, x.unsigned() - y.unsigned(), true),
        OpCode::MulOvfUn => checked(kind, x.unsigned() * y.unsigned(), true),
        OpCode::Div | OpCode::Rem => {
            if y.raw == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            let (n, d) = (x.signed(), y.signed());
            let r = if op == OpCode::Div { n / d } else { n % d };
            checked(kind, r, false)
        }
        OpCode::DivUn | OpCode::RemUn => {
            if y.raw == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            let (n, d) = (x.unsigned(), y.unsigned());
            Ok(wrap(kind, if op == OpCode::DivUn { n / d } else { n % d }))
        }
        OpCode::And => Ok(wrap(kind, (x.raw & y.raw) as i128)),
        OpCode::Or => Ok(wrap(kind, (x.raw | y.raw) as i128)),
        OpCode::Xor => Ok(wrap(kind, (x.raw ^ y.raw) as i128)),
        _ => Err(RuntimeError::InvalidOperands {
            op: op.name(),
            operands: format!("{a}, {b}"),
        }),
    }
}

/// Evaluate `Cgt`, `CgtUn`, `Clt` or `CltUn`.
pub(crate) fn compare(op: OpCode, a: &Value, b: &Value) -> Result<bool> {
    let greater = matches!(op, OpCode::Cgt | OpCode::CgtUn);
    let unsigned = matches!(op, OpCode::CgtUn | OpCode::CltUn);

    if let (Some(x), Some(y)) = (float(a), float(b)) {
        if x.is_nan() || y.is_nan() {
            return Ok(unsigned);
        }
        return Ok(if greater { x > y } else { x < y });
    }

    let (x, y) = operands(op, a, b)?;
    let (x, y) = if unsigned {
        (x.unsigned(), y.unsigned())
    } else {
        (x.signed(), y.signed())
    };
    Ok(if greater { x > y } else { x < y })
}

pub(crate) fn negate(value: &Value) -> Result<Value> {
    if let Some(x) = float(value) {
        return Ok(float_result(value, -x));
    }
    let bits = Bits::of(value).ok_or_else(|| RuntimeError::InvalidOperands {
        op: OpCode::Neg.name(),
        operands: value.to_string(),
    })?;
    Ok(wrap(bits.kind, -bits.signed()))
}

pub(crate) fn complement(value: &Value) -> Result<Value> {
    if let Value::Bool(b) = value {
        return Ok(Value::Bool(!b));
    }
    let bits = Bits::of(value).ok_or_else(|| RuntimeError::InvalidOperands {
        op: OpCode::Not.name(),
        operands: value.to_string(),
    })?;
    Ok(wrap(bits.kind, !bits.raw as i128))
}

/// Unchecked conversion to `kind`.
pub(crate) fn convert(value: &Value, kind: PrimitiveKind) -> Result<Value> {
    let invalid = || RuntimeError::InvalidOperands {
        op: OpCode::Convert.name(),
        operands: format!("{value} to {kind}"),
    };
    if kind == PrimitiveKind::Bool {
        return value.as_bool().map(Value::Bool).ok_or_else(invalid);
    }
    if kind.is_float() {
        let x = match float(value) {
            Some(x) => x,
            None => Bits::of(value).ok_or_else(invalid)?.natural() as f64,
        };
        return Ok(if kind == PrimitiveKind::Float {
            Value::Float(x as f32)
        } else {
            Value::Double(x)
        });
    }
    if !kind.is_integer() {
        return Err(invalid());
    }
    let x = match float(value) {
        Some(x) => x as i128,
        None => Bits::of(value).ok_or_else(invalid)?.natural(),
    };
    Ok(wrap(kind, x))
}
