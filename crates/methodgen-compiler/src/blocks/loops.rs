//! Loops and foreach.

use tracing::trace;

use methodgen_core::bytecode::Label;
use methodgen_core::{GenError, Result, TypeSystem, primitives};

use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::symbol::{FrameId, Symbol};

/// An open loop. The body repeats until a `break_` is taken.
#[derive(Debug)]
#[must_use = "a loop block must be ended"]
pub struct LoopBlock {
    level: usize,
    frame: FrameId,
    repeat: Label,
    escape: Label,
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    pub fn begin_loop(&mut self) -> Result<LoopBlock> {
        let level = self.enter_block()?;
        let frame = self.frame().id;
        let chunk = &mut self.frame_mut().chunk;
        let (repeat, escape) = (chunk.define_label(), chunk.define_label());
        self.sequencer.put(Node::Mark(repeat));
        trace!(level, "begin loop");
        Ok(LoopBlock {
            level,
            frame,
            repeat,
            escape,
        })
    }

    /// Open a loop over every element of `sequence`.
    ///
    /// Returns the loop and a local holding the current element.
    pub fn begin_foreach(&mut self, sequence: Symbol) -> Result<(LoopBlock, Symbol)> {
        let element = self.registry.sequence_element(sequence.ty()).ok_or_else(|| {
            GenError::type_mismatch(format!("'{}' is not enumerable", self.registry.type_name(sequence.ty())))
        })?;

        let enumerator = self.call(sequence, "get_enumerator", &[])?;
        let cursor = self.declare_local(enumerator.ty())?;
        self.assign(cursor, enumerator)?;

        let block = self.begin_loop()?;
        let more = self.call(cursor, "move_next", &[])?;
        let more = self.take(more, primitives::BOOL)?;
        self.sequencer.put(Node::BranchIf {
            cond: Box::new(more),
            label: block.escape,
            when: false,
        });

        let current = self.get(cursor, "current")?;
        let item = self.declare_local(element)?;
        self.assign(item, current)?;
        Ok((block, item))
    }
}

impl LoopBlock {
    /// Leave the loop.
    pub fn break_<R: TypeSystem>(&self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        g.check_open(self.level, self.frame, "break")?;
        g.sequencer.put(Node::Branch(self.escape));
        Ok(())
    }

    /// Start the next iteration.
    pub fn continue_<R: TypeSystem>(&self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        g.check_open(self.level, self.frame, "continue")?;
        g.sequencer.put(Node::Branch(self.repeat));
        Ok(())
    }

    /// Leave the loop when `cond` holds.
    pub fn break_if<R: TypeSystem>(&self, g: &mut MethodGenerator<'_, R>, cond: Symbol) -> Result<()> {
        g.check_open(self.level, self.frame, "break")?;
        let cond = g.take(cond, primitives::BOOL)?;
        g.sequencer.put(Node::BranchIf {
            cond: Box::new(cond),
            label: self.escape,
            when: true,
        });
        Ok(())
    }

    pub fn end<R: TypeSystem>(self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        g.check_innermost(self.level, self.frame, "loop")?;
        g.sequencer.put(Node::Branch(self.repeat));
        g.sequencer.put(Node::Mark(self.escape));
        g.exit_block();
        trace!(level = self.level, "end loop");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use methodgen_core::bytecode::OpCode;
    use methodgen_core::{TypeCatalog, TypeHash};
    use methodgen_registry::{MethodDef, TypeRegistry};

    use super::*;
    use crate::operators::BinaryOp;

    fn setup(def: MethodDef) -> (TypeRegistry, TypeHash) {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Host", None).unwrap();
        let method = registry.add_method(owner, def).unwrap();
        (registry, method)
    }

    #[test]
    fn counting_loop_layout() {
        let (mut registry, method) = setup(MethodDef::new("count").static_method());
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let i = g.declare_local(primitives::INT32).unwrap();
        let block = g.begin_loop().unwrap();
        let ten = g.constant(10i32);
        let done = g.binary(BinaryOp::GreaterOrEqual, i, ten).unwrap();
        block.break_if(&mut g, done).unwrap();
        let one = g.constant(1i32);
        let next = g.binary(BinaryOp::Add, i, one).unwrap();
        g.assign(i, next).unwrap();
        block.end(&mut g).unwrap();
        g.flush().unwrap();

        let chunk = registry.method(method).unwrap().bytecode().unwrap();
        chunk.assert_contains_opcodes(&[
            OpCode::GetLocal,
            OpCode::Constant,
            OpCode::JumpIfTrue,
            OpCode::AddOvf,
            OpCode::SetLocal,
            OpCode::Jump,
            OpCode::ReturnVoid,
        ]);
        // the back edge targets the loop head
        let (jump, _) = chunk
            .instructions()
            .into_iter()
            .find(|(_, op)| *op == OpCode::Jump)
            .unwrap();
        assert_eq!(chunk.read_u32(jump + 1), Some(0));
    }

    #[test]
    fn break_from_lambda_is_rejected() {
        let (mut registry, method) = setup(MethodDef::new("f").static_method());
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let block = g.begin_loop().unwrap();
        let mut lambda = g.begin_lambda(primitives::VOID, &[]).unwrap();
        assert!(matches!(block.break_(&mut g), Err(GenError::BlockDisciplineViolation { .. })));
        lambda.end(&mut g).unwrap();
        block.break_(&mut g).unwrap();
        block.end(&mut g).unwrap();
    }

    #[test]
    fn foreach_requires_a_sequence() {
        let (mut registry, method) = setup(MethodDef::new("f").param("n", primitives::INT32).static_method());
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let n = g.argument(0).unwrap();
        assert!(matches!(g.begin_foreach(n), Err(GenError::TypeMismatch { .. })));
    }

    #[test]
    fn foreach_drives_the_enumerator() {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Host", None).unwrap();
        let (enumerable, _) = methodgen_core::ContainerBuilder::sequence_types(&mut registry, primitives::INT32);
        let method = registry
            .add_method(owner, MethodDef::new("sum").param("items", enumerable).static_method())
            .unwrap();

        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let items = g.argument(0).unwrap();
        let (block, item) = g.begin_foreach(items).unwrap();
        assert_eq!(item.ty(), primitives::INT32);
        block.end(&mut g).unwrap();
        g.flush().unwrap();

        registry.method(method).unwrap().bytecode().unwrap().assert_contains_opcodes(&[
            OpCode::CallVirtual,
            OpCode::SetLocal,
            OpCode::CallVirtual,
            OpCode::JumpIfFalse,
            OpCode::CallVirtual,
            OpCode::SetLocal,
            OpCode::Jump,
        ]);
    }
}
