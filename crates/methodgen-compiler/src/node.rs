//! Instruction nodes.
//!
//! A [`Node`] is a deferred action: it holds everything needed to append its
//! instructions but writes nothing until the owning body is flushed. Nodes
//! compose by nesting; a statement is a node whose value (if any) is dropped.

use methodgen_core::bytecode::{Label, OpCode};
use methodgen_core::{PrimitiveKind, Result, TypeHash, Value};

use crate::emit::Emitter;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Const(Value),

    // === Storage ===
    LoadArg(u16),
    StoreArg(u16, Box<Node>),
    LoadLocal(u16),
    StoreLocal(u16, Box<Node>),
    LoadThis,
    /// Field read; `None` target reads a static field.
    LoadField {
        target: Option<Box<Node>>,
        field: TypeHash,
    },
    StoreField {
        target: Option<Box<Node>>,
        field: TypeHash,
        value: Box<Node>,
    },

    // === Calls ===
    Call {
        method: TypeHash,
        target: Option<Box<Node>>,
        args: Vec<Node>,
        virtual_call: bool,
        returns_value: bool,
    },
    New {
        ctor: TypeHash,
        args: Vec<Node>,
    },
    NewDelegate {
        ty: TypeHash,
        target: Box<Node>,
        method: TypeHash,
    },

    // === Values ===
    Convert {
        value: Box<Node>,
        to: PrimitiveKind,
    },
    CastClass {
        value: Box<Node>,
        to: TypeHash,
    },
    /// Operands followed by a resolved operator sequence.
    Apply {
        operands: Vec<Node>,
        ops: &'static [OpCode],
    },
    NewArray {
        element: TypeHash,
        length: Box<Node>,
    },
    Element {
        array: Box<Node>,
        index: Box<Node>,
    },
    StoreElement {
        array: Box<Node>,
        index: Box<Node>,
        value: Box<Node>,
    },
    TypeOf(TypeHash),

    // === Control Flow ===
    Branch(Label),
    BranchIf {
        cond: Box<Node>,
        label: Label,
        when: bool,
    },
    Mark(Label),
    Return(Option<Box<Node>>),
    Throw(Box<Node>),
    /// Statements written in order.
    Sequence(Vec<Node>),

    // === Iterator Protocol ===
    SaveState(u32),
    RestoreState,
}

impl Node {
    pub fn store_field(target: Node, field: TypeHash, value: Node) -> Node {
        Node::StoreField {
            target: Some(Box::new(target)),
            field,
            value: Box::new(value),
        }
    }

    pub fn load_field(target: Node, field: TypeHash) -> Node {
        Node::LoadField {
            target: Some(Box::new(target)),
            field,
        }
    }

    /// Whether writing this node leaves a value on the stack.
    pub fn leaves_value(&self) -> bool {
        match self {
            Node::Call { returns_value, .. } => *returns_value,
            Node::Const(_)
            | Node::LoadArg(_)
            | Node::LoadLocal(_)
            | Node::LoadThis
            | Node::LoadField { .. }
            | Node::New { .. }
            | Node::NewDelegate { .. }
            | Node::Convert { .. }
            | Node::CastClass { .. }
            | Node::Apply { .. }
            | Node::NewArray { .. }
            | Node::Element { .. }
            | Node::TypeOf(_) => true,
            Node::StoreArg(..)
            | Node::StoreLocal(..)
            | Node::StoreField { .. }
            | Node::StoreElement { .. }
            | Node::Branch(_)
            | Node::BranchIf { .. }
            | Node::Mark(_)
            | Node::Return(_)
            | Node::Throw(_)
            | Node::Sequence(_)
            | Node::SaveState(_)
            | Node::RestoreState => false,
        }
    }

    /// Write as a statement, discarding any value.
    pub fn write_statement(&self, e: &mut Emitter<'_>) -> Result<()> {
        self.write(e)?;
        if self.leaves_value() {
            e.emit(OpCode::Pop);
        }
        Ok(())
    }

    pub fn write(&self, e: &mut Emitter<'_>) -> Result<()> {
        match self {
            Node::Const(value) => e.emit_value(value)?,

            Node::LoadArg(slot) => e.emit_slot(OpCode::GetArg, *slot),
            Node::StoreArg(slot, value) => {
                value.write(e)?;
                e.emit_slot(OpCode::SetArg, *slot);
            }
            Node::LoadLocal(slot) => e.emit_slot(OpCode::GetLocal, *slot),
            Node::StoreLocal(slot, value) => {
                value.write(e)?;
                e.emit_slot(OpCode::SetLocal, *slot);
            }
            Node::LoadThis => e.emit(OpCode::GetThis),
            Node::LoadField { target, field } => match target {
                Some(target) => {
                    target.write(e)?;
                    e.emit_hash(OpCode::GetField, *field)?;
                }
                None => e.emit_hash(OpCode::GetStatic, *field)?,
            },
            Node::StoreField { target, field, value } => match target {
                Some(target) => {
                    target.write(e)?;
                    value.write(e)?;
                    e.emit_hash(OpCode::SetField, *field)?;
                }
                None => {
                    value.write(e)?;
                    e.emit_hash(OpCode::SetStatic, *field)?;
                }
            },

            Node::Call {
                method,
                target,
                args,
                virtual_call,
                ..
            } => {
                if let Some(target) = target {
                    target.write(e)?;
                }
                for arg in args {
                    arg.write(e)?;
                }
                let op = if *virtual_call { OpCode::CallVirtual } else { OpCode::Call };
                e.emit_hash(op, *method)?;
            }
            Node::New { ctor, args } => {
                for arg in args {
                    arg.write(e)?;
                }
                e.emit_hash(OpCode::New, *ctor)?;
            }
            Node::NewDelegate { ty, target, method } => {
                target.write(e)?;
                e.emit_hash(OpCode::LoadFunction, *method)?;
                e.emit_hash(OpCode::NewDelegate, *ty)?;
            }

            Node::Convert { value, to } => {
                value.write(e)?;
                e.emit_convert(*to);
            }
            Node::CastClass { value, to } => {
                value.write(e)?;
                e.emit_hash(OpCode::CastClass, *to)?;
            }
            Node::Apply { operands, ops } => {
                for operand in operands {
                    operand.write(e)?;
                }
                e.emit_ops(ops);
            }
            Node::NewArray { element, length } => {
                length.write(e)?;
                e.emit_hash(OpCode::NewArray, *element)?;
            }
            Node::Element { array, index } => {
                array.write(e)?;
                index.write(e)?;
                e.emit(OpCode::GetElement);
            }
            Node::StoreElement { array, index, value } => {
                array.write(e)?;
                index.write(e)?;
                value.write(e)?;
                e.emit(OpCode::SetElement);
            }
            Node::TypeOf(ty) => e.emit_hash(OpCode::LoadType, *ty)?,

            Node::Branch(label) => e.emit_jump(OpCode::Jump, *label),
            Node::BranchIf { cond, label, when } => {
                cond.write(e)?;
                let op = if *when { OpCode::JumpIfTrue } else { OpCode::JumpIfFalse };
                e.emit_jump(op, *label);
            }
            Node::Mark(label) => e.mark(*label),
            Node::Return(value) => match value {
                Some(value) => {
                    value.write(e)?;
                    e.emit(OpCode::Return);
                }
                None => e.emit(OpCode::ReturnVoid),
            },
            Node::Throw(value) => {
                value.write(e)?;
                e.emit(OpCode::Throw);
            }
            Node::Sequence(nodes) => {
                for node in nodes {
                    node.write_statement(e)?;
                }
            }

            Node::SaveState(k) => e.write_save_state(*k)?,
            Node::RestoreState => e.write_restore_state()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_core::bytecode::BytecodeChunk;

    fn written(node: &Node) -> BytecodeChunk {
        let mut chunk = BytecodeChunk::new();
        node.write_statement(&mut Emitter::new(&mut chunk, true)).unwrap();
        chunk
    }

    #[test]
    fn store_field_writes_target_then_value() {
        let node = Node::store_field(Node::LoadThis, TypeHash(7), Node::LoadArg(1));
        written(&node).assert_opcodes(&[OpCode::GetThis, OpCode::GetArg, OpCode::SetField]);
    }

    #[test]
    fn call_result_is_popped_in_statement_position() {
        let call = Node::Call {
            method: TypeHash(1),
            target: None,
            args: vec![Node::Const(Value::Int32(5))],
            virtual_call: false,
            returns_value: true,
        };
        written(&call).assert_opcodes(&[OpCode::Constant, OpCode::Call, OpCode::Pop]);

        let void_call = Node::Call {
            method: TypeHash(1),
            target: None,
            args: vec![Node::Const(Value::Int32(5))],
            virtual_call: false,
            returns_value: false,
        };
        written(&void_call).assert_opcodes(&[OpCode::Constant, OpCode::Call]);
    }

    #[test]
    fn apply_writes_operator_sequence() {
        let node = Node::Apply {
            operands: vec![Node::LoadArg(0), Node::LoadArg(1)],
            ops: &[OpCode::Cgt, OpCode::PushFalse, OpCode::Ceq],
        };
        let chunk = written(&node);
        chunk.assert_opcodes(&[
            OpCode::GetArg,
            OpCode::GetArg,
            OpCode::Cgt,
            OpCode::PushFalse,
            OpCode::Ceq,
            OpCode::Pop,
        ]);
    }

    #[test]
    fn delegate_loads_function_then_binds() {
        let node = Node::NewDelegate {
            ty: TypeHash(3),
            target: Box::new(Node::LoadLocal(0)),
            method: TypeHash(4),
        };
        let chunk = written(&node);
        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::LoadFunction, OpCode::NewDelegate, OpCode::Pop]);
    }

    #[test]
    fn static_field_access_has_no_target() {
        let store = Node::StoreField {
            target: None,
            field: TypeHash(9),
            value: Box::new(Node::Const(Value::Bool(true))),
        };
        written(&store).assert_opcodes(&[OpCode::PushTrue, OpCode::SetStatic]);
    }

    #[test]
    fn save_state_outside_iterator_fails() {
        let mut chunk = BytecodeChunk::new();
        let result = Node::SaveState(1).write(&mut Emitter::new(&mut chunk, true));
        assert!(result.is_err());
    }
}
