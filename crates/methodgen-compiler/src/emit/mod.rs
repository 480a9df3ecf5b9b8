//! Instruction emitter.
//!
//! The [`Emitter`] is the only place that touches a [`BytecodeChunk`] while a
//! body is flushed. Instruction nodes write themselves through it, so constant
//! handling, jump encoding and the iterator save/restore protocol live in one
//! spot.

mod state;

pub(crate) use state::IteratorLayout;

use methodgen_core::bytecode::{BytecodeChunk, Label, OpCode};
use methodgen_core::{GenError, PrimitiveKind, Result, TypeHash, Value};

/// Writes instructions into a single chunk.
pub(crate) struct Emitter<'a> {
    chunk: &'a mut BytecodeChunk,
    /// State-machine layout when writing an iterator's `move_next` body.
    layout: Option<&'a IteratorLayout>,
    inline_small_constants: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(chunk: &'a mut BytecodeChunk, inline_small_constants: bool) -> Self {
        Self {
            chunk,
            layout: None,
            inline_small_constants,
        }
    }

    pub fn with_layout(mut self, layout: &'a IteratorLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub(crate) fn layout(&self) -> Result<&'a IteratorLayout> {
        self.layout.ok_or(GenError::NotAnIterator)
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op);
    }

    pub fn emit_ops(&mut self, ops: &[OpCode]) {
        for op in ops {
            self.chunk.write_op(*op);
        }
    }

    /// Emit an opcode with a 16-bit slot operand.
    pub fn emit_slot(&mut self, op: OpCode, slot: u16) {
        self.chunk.write_op(op);
        self.chunk.write_u16(slot);
    }

    /// Emit an opcode referencing a type, member or method identity.
    pub fn emit_hash(&mut self, op: OpCode, hash: TypeHash) -> Result<()> {
        self.chunk.write_with_hash(op, hash)
    }

    pub fn emit_convert(&mut self, kind: PrimitiveKind) {
        self.chunk.write_convert(kind);
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Emit a literal load.
    ///
    /// `null` and booleans have dedicated opcodes; `int` 0 and 1 use
    /// `PushZero`/`PushOne` when small-constant inlining is enabled.
    pub fn emit_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.emit(OpCode::PushNull),
            Value::Bool(true) => self.emit(OpCode::PushTrue),
            Value::Bool(false) => self.emit(OpCode::PushFalse),
            Value::Int32(0) if self.inline_small_constants => self.emit(OpCode::PushZero),
            Value::Int32(1) if self.inline_small_constants => self.emit(OpCode::PushOne),
            other => return self.chunk.write_value(other.clone()),
        }
        Ok(())
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    pub fn emit_jump(&mut self, op: OpCode, label: Label) {
        self.chunk.emit_jump(op, label);
    }

    pub fn mark(&mut self, label: Label) {
        self.chunk.mark_label(label);
    }
}
