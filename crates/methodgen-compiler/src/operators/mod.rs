//! Operator resolution for primitive operands.
//!
//! Resolution is a table lookup: the first entry whose operator matches and
//! whose operand group contains both operand types decides the canonical
//! width both operands convert to, the instructions to emit, and the result
//! type. Reference operands only match the wildcard equality entries.

mod table;

use std::fmt;

use methodgen_core::bytecode::OpCode;
use methodgen_core::{PrimitiveKind, TypeHash, primitives};

use table::{BINARY_TABLE, Group, ResultKind, UNARY_TABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    /// Logical and of two `bool` operands (both are evaluated).
    And,
    /// Logical or of two `bool` operands (both are evaluated).
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Remainder,
        BinaryOp::BitwiseAnd,
        BinaryOp::BitwiseOr,
        BinaryOp::BitwiseXor,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
        BinaryOp::LessThan,
        BinaryOp::LessOrEqual,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterOrEqual,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    BitwiseNot,
    Negate,
}

impl UnaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitwiseNot => "~",
            UnaryOp::Negate => "-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Outcome of binary operator resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryResolution {
    /// Conversion applied to the left operand, if its type is not canonical.
    pub left_conversion: Option<PrimitiveKind>,
    pub right_conversion: Option<PrimitiveKind>,
    pub ops: &'static [OpCode],
    pub result_type: TypeHash,
}

/// Outcome of unary operator resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryResolution {
    pub conversion: Option<PrimitiveKind>,
    pub ops: &'static [OpCode],
    pub result_type: TypeHash,
}

impl Group {
    fn accepts(&self, ty: TypeHash) -> bool {
        match PrimitiveKind::from_hash(ty) {
            Some(kind) => self.members.contains(&kind),
            None => false,
        }
    }

    fn accepts_pair(&self, left: TypeHash, right: TypeHash) -> bool {
        if self.members.is_empty() {
            return wildcard_pair(left, right);
        }
        self.accepts(left) && self.accepts(right)
    }

    fn conversion(&self, ty: TypeHash) -> Option<PrimitiveKind> {
        let canonical = self.canonical?;
        (PrimitiveKind::from_hash(ty) != Some(canonical)).then_some(canonical)
    }
}

/// Wildcard entries compare references, or two operands of one type.
fn wildcard_pair(left: TypeHash, right: TypeHash) -> bool {
    if left == primitives::VOID || right == primitives::VOID {
        return false;
    }
    let is_value = |ty| PrimitiveKind::from_hash(ty).is_some();
    left == right || (!is_value(left) && !is_value(right))
}

fn result_type(group: &Group, result: ResultKind, fallback: TypeHash) -> TypeHash {
    match result {
        ResultKind::Bool => primitives::BOOL,
        ResultKind::Canonical => group.canonical.map(PrimitiveKind::type_hash).unwrap_or(fallback),
    }
}

/// Resolve `left op right`.
///
/// Returns `None` when no table entry matches.
pub fn resolve_binary(op: BinaryOp, left: TypeHash, right: TypeHash) -> Option<BinaryResolution> {
    let entry = BINARY_TABLE
        .iter()
        .find(|entry| entry.op == op && entry.group.accepts_pair(left, right))?;

    let signedness = entry
        .group
        .canonical
        .map(PrimitiveKind::signedness)
        .unwrap_or(methodgen_core::Signedness::Signed);

    Some(BinaryResolution {
        left_conversion: entry.group.conversion(left),
        right_conversion: entry.group.conversion(right),
        ops: (entry.emit)(signedness),
        result_type: result_type(&entry.group, entry.result, left),
    })
}

/// Resolve `op operand`.
pub fn resolve_unary(op: UnaryOp, operand: TypeHash) -> Option<UnaryResolution> {
    let entry = UNARY_TABLE
        .iter()
        .find(|entry| entry.op == op && entry.group.accepts(operand))?;

    let signedness = entry
        .group
        .canonical
        .map(PrimitiveKind::signedness)
        .unwrap_or(methodgen_core::Signedness::Signed);

    Some(UnaryResolution {
        conversion: entry.group.conversion(operand),
        ops: (entry.emit)(signedness),
        result_type: result_type(&entry.group, entry.result, operand),
    })
}
