//! Instruction set of the stack-based target engine.
//!
//! Each opcode is a single byte, with operands following inline (big-endian).

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// Most operations pop their operands from the stack and push the result.
/// Arithmetic and comparison opcodes are untyped: they operate on whatever
/// primitive kind the operands carry, and the `Un` variants reinterpret
/// integer operands as unsigned of the same width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from the chunk's pool.
    /// Operand: u16 constant index
    Constant = 0,
    /// Push null reference.
    PushNull,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Push 32-bit integer 0.
    PushZero,
    /// Push 32-bit integer 1.
    PushOne,

    // =========================================================================
    // Stack
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Duplicate top of stack.
    Dup,

    // =========================================================================
    // Storage
    // =========================================================================
    /// Load local variable.
    /// Operand: u16 slot
    GetLocal,
    /// Store to local variable.
    /// Operand: u16 slot
    SetLocal,
    /// Load argument (slot 0 is the receiver for instance methods).
    /// Operand: u16 argument slot
    GetArg,
    /// Store to argument.
    /// Operand: u16 argument slot
    SetArg,
    /// Push the receiver.
    GetThis,
    /// Load instance field. Stack: [obj] -> [value]
    /// Operand: u16 constant index (field hash)
    GetField,
    /// Store instance field. Stack: [obj, value] -> []
    /// Operand: u16 constant index (field hash)
    SetField,
    /// Load static field.
    /// Operand: u16 constant index (field hash)
    GetStatic,
    /// Store static field.
    /// Operand: u16 constant index (field hash)
    SetStatic,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    /// Add without overflow check (floating point).
    Add,
    /// Add, trapping on signed overflow.
    AddOvf,
    /// Add, trapping on unsigned overflow.
    AddOvfUn,
    /// Subtract without overflow check (floating point).
    Sub,
    /// Subtract, trapping on signed overflow.
    SubOvf,
    /// Subtract, trapping on unsigned overflow.
    SubOvfUn,
    /// Multiply without overflow check (floating point).
    Mul,
    /// Multiply, trapping on signed overflow.
    MulOvf,
    /// Multiply, trapping on unsigned overflow.
    MulOvfUn,
    /// Signed or floating point division.
    Div,
    /// Unsigned division.
    DivUn,
    /// Signed or floating point remainder.
    Rem,
    /// Unsigned remainder.
    RemUn,
    /// Negate.
    Neg,

    // =========================================================================
    // Bitwise / Logical
    // =========================================================================
    /// Bitwise (or boolean) AND.
    And,
    /// Bitwise (or boolean) OR.
    Or,
    /// Bitwise (or boolean) XOR.
    Xor,
    /// Bitwise complement.
    Not,

    // =========================================================================
    // Comparison
    // =========================================================================
    /// Push true if the two operands are equal.
    Ceq,
    /// Signed / ordered greater-than.
    Cgt,
    /// Unsigned / unordered greater-than.
    CgtUn,
    /// Signed / ordered less-than.
    Clt,
    /// Unsigned / unordered less-than.
    CltUn,

    // =========================================================================
    // Conversion
    // =========================================================================
    /// Convert the top of stack to a primitive kind.
    /// Operand: u8 primitive kind
    Convert,
    /// Checked reference downcast.
    /// Operand: u16 constant index (type hash)
    CastClass,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Unconditional jump.
    /// Operand: u32 absolute offset
    Jump,
    /// Pop a boolean and jump if it is true.
    /// Operand: u32 absolute offset
    JumpIfTrue,
    /// Pop a boolean and jump if it is false.
    /// Operand: u32 absolute offset
    JumpIfFalse,

    // =========================================================================
    // Calls
    // =========================================================================
    /// Call a method directly. Stack: [receiver?, args...] -> [result?]
    /// Operand: u16 constant index (method hash)
    Call,
    /// Call a method through the receiver's runtime type.
    /// Operand: u16 constant index (method hash)
    CallVirtual,
    /// Return the top of stack.
    Return,
    /// Return from a void method.
    ReturnVoid,

    // =========================================================================
    // Objects
    // =========================================================================
    /// Allocate an object and run a constructor. Stack: [args...] -> [obj]
    /// Operand: u16 constant index (constructor hash)
    New,
    /// Allocate an array. Stack: [length] -> [array]
    /// Operand: u16 constant index (element type hash)
    NewArray,
    /// Stack: [array, index] -> [value]
    GetElement,
    /// Stack: [array, index, value] -> []
    SetElement,
    /// Push a runtime type object.
    /// Operand: u16 constant index (type hash)
    LoadType,
    /// Push a function reference.
    /// Operand: u16 constant index (method hash)
    LoadFunction,
    /// Bind a function reference to a target. Stack: [target, function] -> [delegate]
    /// Operand: u16 constant index (delegate type hash)
    NewDelegate,
    /// Throw the exception object on top of the stack.
    Throw,
}

impl OpCode {
    /// Create an OpCode from a byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Size in bytes of the inline operands following this opcode.
    pub const fn operand_size(self) -> usize {
        match self {
            OpCode::Convert => 1,
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetArg
            | OpCode::SetArg
            | OpCode::GetField
            | OpCode::SetField
            | OpCode::GetStatic
            | OpCode::SetStatic
            | OpCode::CastClass
            | OpCode::Call
            | OpCode::CallVirtual
            | OpCode::New
            | OpCode::NewArray
            | OpCode::LoadType
            | OpCode::LoadFunction
            | OpCode::NewDelegate => 2,
            OpCode::Jump | OpCode::JumpIfTrue | OpCode::JumpIfFalse => 4,
            _ => 0,
        }
    }

    /// Whether this opcode transfers control to a label.
    pub const fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIfTrue | OpCode::JumpIfFalse)
    }

    /// Get the name of this opcode (for disassembly and test output).
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetArg => "GET_ARG",
            OpCode::SetArg => "SET_ARG",
            OpCode::GetThis => "GET_THIS",
            OpCode::GetField => "GET_FIELD",
            OpCode::SetField => "SET_FIELD",
            OpCode::GetStatic => "GET_STATIC",
            OpCode::SetStatic => "SET_STATIC",
            OpCode::Add => "ADD",
            OpCode::AddOvf => "ADD_OVF",
            OpCode::AddOvfUn => "ADD_OVF_UN",
            OpCode::Sub => "SUB",
            OpCode::SubOvf => "SUB_OVF",
            OpCode::SubOvfUn => "SUB_OVF_UN",
            OpCode::Mul => "MUL",
            OpCode::MulOvf => "MUL_OVF",
            OpCode::MulOvfUn => "MUL_OVF_UN",
            OpCode::Div => "DIV",
            OpCode::DivUn => "DIV_UN",
            OpCode::Rem => "REM",
            OpCode::RemUn => "REM_UN",
            OpCode::Neg => "NEG",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Xor => "XOR",
            OpCode::Not => "NOT",
            OpCode::Ceq => "CEQ",
            OpCode::Cgt => "CGT",
            OpCode::CgtUn => "CGT_UN",
            OpCode::Clt => "CLT",
            OpCode::CltUn => "CLT_UN",
            OpCode::Convert => "CONVERT",
            OpCode::CastClass => "CAST_CLASS",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::Call => "CALL",
            OpCode::CallVirtual => "CALL_VIRTUAL",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
            OpCode::New => "NEW",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::GetElement => "GET_ELEMENT",
            OpCode::SetElement => "SET_ELEMENT",
            OpCode::LoadType => "LOAD_TYPE",
            OpCode::LoadFunction => "LOAD_FUNCTION",
            OpCode::NewDelegate => "NEW_DELEGATE",
            OpCode::Throw => "THROW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_repr() {
        assert_eq!(u8::from(OpCode::Constant), 0);
        assert_eq!(u8::from(OpCode::PushNull), 1);
    }

    #[test]
    fn opcode_from_u8() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Constant));
        assert_eq!(OpCode::from_u8(OpCode::Throw.into()), Some(OpCode::Throw));
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn opcode_name() {
        assert_eq!(OpCode::Constant.name(), "CONSTANT");
        assert_eq!(OpCode::CgtUn.name(), "CGT_UN");
        assert_eq!(OpCode::JumpIfFalse.name(), "JUMP_IF_FALSE");
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::Pop.operand_size(), 0);
        assert_eq!(OpCode::AddOvf.operand_size(), 0);
        assert_eq!(OpCode::Convert.operand_size(), 1);
        assert_eq!(OpCode::GetLocal.operand_size(), 2);
        assert_eq!(OpCode::Call.operand_size(), 2);
        assert_eq!(OpCode::Jump.operand_size(), 4);
    }
}
