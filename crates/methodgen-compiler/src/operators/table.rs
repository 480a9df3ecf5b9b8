//! Operator tables.
//!
//! Entries are tried top to bottom and the first one whose operator and
//! operand groups match wins. Within an operator, narrower canonical groups
//! come first so operands promote to the smallest width that holds both.
//! Every group member widens implicitly to the group's canonical type, so
//! pairs with no lossless common width (`int64` with `uint64` or `double`)
//! do not resolve.

use methodgen_core::bytecode::OpCode;
use methodgen_core::{PrimitiveKind, Signedness};

use super::{BinaryOp, UnaryOp};

use PrimitiveKind::*;

/// Operand types an entry accepts and the width they promote to.
///
/// An empty member list is a wildcard.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Group {
    pub members: &'static [PrimitiveKind],
    pub canonical: Option<PrimitiveKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultKind {
    /// The canonical operand type.
    Canonical,
    Bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BinaryEntry {
    pub op: BinaryOp,
    pub group: Group,
    pub result: ResultKind,
    pub emit: fn(Signedness) -> &'static [OpCode],
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct UnaryEntry {
    pub op: UnaryOp,
    pub group: Group,
    pub result: ResultKind,
    pub emit: fn(Signedness) -> &'static [OpCode],
}

// ==========================================================================
// Groups
// ==========================================================================

const U32: Group = Group {
    members: &[Uint8, Uint16, Uint32],
    canonical: Some(Uint32),
};
const U64: Group = Group {
    members: &[Uint8, Uint16, Uint32, Uint64],
    canonical: Some(Uint64),
};
const I32: Group = Group {
    members: &[Int8, Uint8, Int16, Uint16, Int32],
    canonical: Some(Int32),
};
const I64: Group = Group {
    members: &[Int8, Uint8, Int16, Uint16, Int32, Uint32, Int64],
    canonical: Some(Int64),
};
const F32: Group = Group {
    members: &[Int8, Uint8, Int16, Uint16, Float],
    canonical: Some(Float),
};
const F64: Group = Group {
    members: &[Int8, Uint8, Int16, Uint16, Int32, Uint32, Float, Double],
    canonical: Some(Double),
};
const BOOL: Group = Group {
    members: &[Bool],
    canonical: Some(Bool),
};
const ANY: Group = Group {
    members: &[],
    canonical: None,
};

// Negation promotes unsigned operands to the next signed width.
const NEG_I32: Group = Group {
    members: &[Int8, Uint8, Int16, Uint16, Int32],
    canonical: Some(Int32),
};
const NEG_I64: Group = Group {
    members: &[Uint32, Int64],
    canonical: Some(Int64),
};
const NEG_F32: Group = Group {
    members: &[Float],
    canonical: Some(Float),
};
const NEG_F64: Group = Group {
    members: &[Double],
    canonical: Some(Double),
};

// ==========================================================================
// Emission
// ==========================================================================

fn add_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Signed => &[OpCode::AddOvf],
        Signedness::Unsigned => &[OpCode::AddOvfUn],
        Signedness::Float => &[OpCode::Add],
    }
}

fn sub_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Signed => &[OpCode::SubOvf],
        Signedness::Unsigned => &[OpCode::SubOvfUn],
        Signedness::Float => &[OpCode::Sub],
    }
}

fn mul_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Signed => &[OpCode::MulOvf],
        Signedness::Unsigned => &[OpCode::MulOvfUn],
        Signedness::Float => &[OpCode::Mul],
    }
}

fn div_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Unsigned => &[OpCode::DivUn],
        _ => &[OpCode::Div],
    }
}

fn rem_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Unsigned => &[OpCode::RemUn],
        _ => &[OpCode::Rem],
    }
}

fn and_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::And]
}

fn or_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Or]
}

fn xor_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Xor]
}

fn lt_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Unsigned => &[OpCode::CltUn],
        _ => &[OpCode::Clt],
    }
}

fn gt_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Unsigned => &[OpCode::CgtUn],
        _ => &[OpCode::Cgt],
    }
}

/// `!(a > b)`. Floats use the unordered compare so NaN operands yield false.
fn le_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Signed => &[OpCode::Cgt, OpCode::PushFalse, OpCode::Ceq],
        _ => &[OpCode::CgtUn, OpCode::PushFalse, OpCode::Ceq],
    }
}

/// `!(a < b)`.
fn ge_ops(s: Signedness) -> &'static [OpCode] {
    match s {
        Signedness::Signed => &[OpCode::Clt, OpCode::PushFalse, OpCode::Ceq],
        _ => &[OpCode::CltUn, OpCode::PushFalse, OpCode::Ceq],
    }
}

fn eq_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Ceq]
}

fn ne_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Ceq, OpCode::PushFalse, OpCode::Ceq]
}

fn not_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::PushFalse, OpCode::Ceq]
}

fn bitwise_not_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Not]
}

fn neg_ops(_: Signedness) -> &'static [OpCode] {
    &[OpCode::Neg]
}

// ==========================================================================
// Tables
// ==========================================================================

macro_rules! binary_table {
    ($( $op:ident => $result:ident, $emit:ident, [$($group:ident),+] );* $(;)?) => {
        &[ $( $( BinaryEntry {
            op: BinaryOp::$op,
            group: $group,
            result: ResultKind::$result,
            emit: $emit,
        }, )+ )* ]
    };
}

macro_rules! unary_table {
    ($( $op:ident => $result:ident, $emit:ident, [$($group:ident),+] );* $(;)?) => {
        &[ $( $( UnaryEntry {
            op: UnaryOp::$op,
            group: $group,
            result: ResultKind::$result,
            emit: $emit,
        }, )+ )* ]
    };
}

pub(crate) static BINARY_TABLE: &[BinaryEntry] = binary_table! {
    Add => Canonical, add_ops, [U32, U64, I32, I64, F32, F64];
    Subtract => Canonical, sub_ops, [U32, U64, I32, I64, F32, F64];
    Multiply => Canonical, mul_ops, [U32, U64, I32, I64, F32, F64];
    Divide => Canonical, div_ops, [U32, U64, I32, I64, F32, F64];
    Remainder => Canonical, rem_ops, [U32, U64, I32, I64, F32, F64];

    BitwiseAnd => Canonical, and_ops, [U32, U64, I32, I64];
    BitwiseOr => Canonical, or_ops, [U32, U64, I32, I64];
    BitwiseXor => Canonical, xor_ops, [U32, U64, I32, I64];

    And => Canonical, and_ops, [BOOL];
    Or => Canonical, or_ops, [BOOL];

    LessThan => Bool, lt_ops, [U32, U64, I32, I64, F32, F64];
    GreaterThan => Bool, gt_ops, [U32, U64, I32, I64, F32, F64];
    LessOrEqual => Bool, le_ops, [U32, U64, I32, I64, F32, F64];
    GreaterOrEqual => Bool, ge_ops, [U32, U64, I32, I64, F32, F64];

    Equal => Bool, eq_ops, [U32, U64, I32, I64, F32, F64, BOOL, ANY];
    NotEqual => Bool, ne_ops, [U32, U64, I32, I64, F32, F64, BOOL, ANY];
};

pub(crate) static UNARY_TABLE: &[UnaryEntry] = unary_table! {
    Not => Bool, not_ops, [BOOL];
    BitwiseNot => Canonical, bitwise_not_ops, [U32, U64, I32, I64];
    Negate => Canonical, neg_ops, [NEG_I32, NEG_I64, NEG_F32, NEG_F64];
};
