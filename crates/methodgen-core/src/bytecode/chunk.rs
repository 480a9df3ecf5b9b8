//! Bytecode chunk for a single generated method.
//!
//! A `BytecodeChunk` is the instruction-stream primitive the generator writes
//! into: opcodes with inline operands, a constant pool, declared local slots
//! and labels. Jumps name a [`Label`]; their absolute target offsets are
//! patched when the chunk is finished.

use super::{Constant, ConstantPool, OpCode};
use crate::{GenError, PrimitiveKind, Result, TypeHash, Value};

/// A branch target inside one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Compiled bytecode for a single method.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    constants: ConstantPool,
    locals: Vec<TypeHash>,
    labels: Vec<Option<u32>>,
    /// Operand offsets waiting for a label position.
    fixups: Vec<(usize, Label)>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Writing
    // ==========================================================================

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op.into());
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8) {
        self.code.push(byte);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a 32-bit operand (big-endian).
    pub fn write_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Write an opcode whose operand is a constant-pool index.
    ///
    /// Fails once the pool would need more than `u16::MAX + 1` entries.
    pub fn write_with_constant(&mut self, op: OpCode, constant: Constant) -> Result<()> {
        let index = u16::try_from(self.constants.add(constant)).map_err(|_| GenError::BodyTooLarge {
            what: "constants",
            limit: u16::MAX as usize + 1,
        })?;
        self.write_op(op);
        self.write_u16(index);
        Ok(())
    }

    /// Write an opcode referencing a type, method or field identity.
    pub fn write_with_hash(&mut self, op: OpCode, hash: TypeHash) -> Result<()> {
        self.write_with_constant(op, Constant::TypeHash(hash))
    }

    /// Write a `Constant` instruction loading a literal.
    pub fn write_value(&mut self, value: Value) -> Result<()> {
        self.write_with_constant(OpCode::Constant, Constant::Value(value))
    }

    /// Write a `Convert` instruction.
    pub fn write_convert(&mut self, kind: PrimitiveKind) {
        self.write_op(OpCode::Convert);
        self.write_byte(kind.into());
    }

    /// Get current code offset.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    // ==========================================================================
    // Labels
    // ==========================================================================

    /// Allocate a new, unmarked label.
    pub fn define_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    /// Bind a label to the current offset.
    pub fn mark_label(&mut self, label: Label) {
        debug_assert!(
            self.labels[label.0 as usize].is_none(),
            "label {} marked twice",
            label.0
        );
        self.labels[label.0 as usize] = Some(self.code.len() as u32);
    }

    /// Emit a jump to a label; the target is patched by [`finish`](Self::finish).
    pub fn emit_jump(&mut self, op: OpCode, label: Label) {
        debug_assert!(op.is_jump());
        self.write_op(op);
        self.fixups.push((self.code.len(), label));
        self.write_u32(u32::MAX);
    }

    /// Offset a label was marked at.
    pub fn label_offset(&self, label: Label) -> Option<u32> {
        self.labels.get(label.0 as usize).copied().flatten()
    }

    /// Number of labels defined so far.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Patch all pending jumps. Fails if a referenced label was never marked.
    pub fn finish(&mut self) -> Result<()> {
        for (offset, label) in std::mem::take(&mut self.fixups) {
            let target = self
                .label_offset(label)
                .ok_or(GenError::UnresolvedLabel(label.0))?;
            self.code[offset..offset + 4].copy_from_slice(&target.to_be_bytes());
        }
        Ok(())
    }

    // ==========================================================================
    // Locals
    // ==========================================================================

    /// Declare a new local slot.
    pub fn declare_local(&mut self, ty: TypeHash) -> Result<u16> {
        let slot = u16::try_from(self.locals.len()).map_err(|_| GenError::BodyTooLarge {
            what: "locals",
            limit: u16::MAX as usize + 1,
        })?;
        self.locals.push(ty);
        Ok(slot)
    }

    pub fn locals(&self) -> &[TypeHash] {
        &self.locals
    }

    // ==========================================================================
    // Reading
    // ==========================================================================

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn constant(&self, index: u16) -> Option<&Constant> {
        self.constants.get(index.into())
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a u32 at the given offset (big-endian).
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Resolve the identity operand of the instruction at `offset`.
    pub fn hash_operand(&self, offset: usize) -> Option<TypeHash> {
        match self.constant(self.read_u16(offset + 1)?)? {
            Constant::TypeHash(hash) => Some(*hash),
            Constant::Value(_) => None,
        }
    }

    /// Decode the instruction stream into `(offset, opcode)` pairs.
    pub fn instructions(&self) -> Vec<(usize, OpCode)> {
        let mut out = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                out.push((offset, op));
                offset += 1 + op.operand_size();
            } else {
                offset += 1;
            }
        }

        out
    }

    /// Extract all opcodes from the chunk, skipping operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions().into_iter().map(|(_, op)| op).collect()
    }

    /// Count occurrences of an opcode.
    pub fn count_op(&self, op: OpCode) -> usize {
        self.instructions().iter().filter(|(_, o)| *o == op).count()
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check if this chunk contains the given opcodes in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}
