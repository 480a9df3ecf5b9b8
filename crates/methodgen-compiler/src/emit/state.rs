//! Save/restore protocol of iterator state machines.
//!
//! The iteration state field holds `0` before the first resume, `k > 0` while
//! suspended at resume label `k`, and a negative value once exhausted.

use methodgen_core::bytecode::{Label, OpCode};
use methodgen_core::{Result, TypeHash, Value};

use super::Emitter;

/// Fields and labels of a `move_next` body, fixed when the body is flushed.
#[derive(Debug, Clone)]
pub(crate) struct IteratorLayout {
    pub state_field: TypeHash,
    /// `(local slot, enumerator field)` for every persisted local.
    pub persisted: Vec<(u16, TypeHash)>,
    /// Resume label `k` is stored at index `k - 1`.
    pub resume: Vec<Label>,
    pub begin: Label,
    pub exhausted: Label,
}

impl Emitter<'_> {
    /// Persist every local and record resume point `k`.
    pub fn write_save_state(&mut self, k: u32) -> Result<()> {
        let layout = self.layout()?;
        for &(slot, field) in &layout.persisted {
            self.emit(OpCode::GetThis);
            self.emit_slot(OpCode::GetLocal, slot);
            self.emit_hash(OpCode::SetField, field)?;
        }
        self.emit(OpCode::GetThis);
        self.emit_value(&Value::Int32(k as i32))?;
        self.emit_hash(OpCode::SetField, layout.state_field)?;
        Ok(())
    }

    /// Dispatch on the iteration state.
    ///
    /// `0` falls through to the body start, a negative state returns `false`,
    /// `k` restores the persisted locals and jumps to resume label `k`.
    pub fn write_restore_state(&mut self) -> Result<()> {
        let layout = self.layout()?;

        self.load_state(layout.state_field)?;
        self.emit_value(&Value::Int32(0))?;
        self.emit(OpCode::Ceq);
        self.emit_jump(OpCode::JumpIfTrue, layout.begin);

        self.load_state(layout.state_field)?;
        self.emit_value(&Value::Int32(0))?;
        self.emit(OpCode::Clt);
        self.emit_jump(OpCode::JumpIfTrue, layout.exhausted);

        for &(slot, field) in &layout.persisted {
            self.emit(OpCode::GetThis);
            self.emit_hash(OpCode::GetField, field)?;
            self.emit_slot(OpCode::SetLocal, slot);
        }

        for (i, label) in layout.resume.iter().enumerate() {
            self.load_state(layout.state_field)?;
            self.emit_value(&Value::Int32(i as i32 + 1))?;
            self.emit(OpCode::Ceq);
            self.emit_jump(OpCode::JumpIfTrue, *label);
        }
        self.emit_jump(OpCode::Jump, layout.begin);

        self.mark(layout.exhausted);
        self.emit(OpCode::PushFalse);
        self.emit(OpCode::Return);

        self.mark(layout.begin);
        Ok(())
    }

    fn load_state(&mut self, state_field: TypeHash) -> Result<()> {
        self.emit(OpCode::GetThis);
        self.emit_hash(OpCode::GetField, state_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_core::bytecode::BytecodeChunk;

    fn layout(chunk: &mut BytecodeChunk, persisted: usize, resumes: usize) -> IteratorLayout {
        let persisted = (0..persisted)
            .map(|i| (chunk.declare_local(methodgen_core::primitives::INT32).unwrap(), TypeHash(i as u64 + 1)))
            .collect();
        IteratorLayout {
            state_field: TypeHash(99),
            persisted,
            resume: (0..resumes).map(|_| chunk.define_label()).collect(),
            begin: chunk.define_label(),
            exhausted: chunk.define_label(),
        }
    }

    #[test]
    fn save_state_stores_locals_then_state() {
        let mut chunk = BytecodeChunk::new();
        let layout = layout(&mut chunk, 2, 0);
        Emitter::new(&mut chunk, true)
            .with_layout(&layout)
            .write_save_state(1)
            .unwrap();
        chunk.assert_opcodes(&[
            OpCode::GetThis,
            OpCode::GetLocal,
            OpCode::SetField,
            OpCode::GetThis,
            OpCode::GetLocal,
            OpCode::SetField,
            OpCode::GetThis,
            OpCode::PushOne,
            OpCode::SetField,
        ]);
    }

    #[test]
    fn restore_state_dispatches_each_resume_label() {
        let mut chunk = BytecodeChunk::new();
        let layout = layout(&mut chunk, 1, 3);
        let mut emitter = Emitter::new(&mut chunk, true).with_layout(&layout);
        emitter.write_restore_state().unwrap();
        for label in &layout.resume {
            emitter.mark(*label);
        }
        chunk.finish().unwrap();

        // zero check, negative check, one per resume label
        assert_eq!(chunk.count_op(OpCode::JumpIfTrue), 2 + 3);
        assert_eq!(chunk.count_op(OpCode::SetLocal), 1);
        assert_eq!(chunk.count_op(OpCode::Clt), 1);
        assert_eq!(chunk.label_offset(layout.begin), Some(chunk.len() as u32));
    }
}
