//! If / else-if / else.

use tracing::trace;

use methodgen_core::bytecode::Label;
use methodgen_core::{GenError, Result, TypeSystem, primitives};

use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::sequencer::ListId;
use crate::symbol::{FrameId, Symbol};

/// An open conditional.
///
/// Tests are written in order into the enclosing list; each guarded body
/// collects into its own list and is placed after the tests when the block
/// ends. The else body (if any) runs when every test fails.
#[derive(Debug)]
#[must_use = "an if block must be ended"]
pub struct IfBlock {
    level: usize,
    frame: FrameId,
    outer: ListId,
    branches: Vec<(Label, ListId)>,
    escape: Label,
    in_else: bool,
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Open `if (cond)`. Statements put next belong to the guarded body.
    pub fn begin_if(&mut self, cond: Symbol) -> Result<IfBlock> {
        let cond = self.take(cond, primitives::BOOL)?;
        let level = self.enter_block()?;
        let frame = self.frame().id;
        let escape = self.frame_mut().chunk.define_label();

        let mut block = IfBlock {
            level,
            frame,
            outer: self.sequencer.current(),
            branches: Vec::new(),
            escape,
            in_else: false,
        };
        block.add_branch(self, cond);
        trace!(level, "begin if");
        Ok(block)
    }
}

impl IfBlock {
    fn add_branch<R: TypeSystem>(&mut self, g: &mut MethodGenerator<'_, R>, cond: Node) {
        let label = g.frame_mut().chunk.define_label();
        g.sequencer.switch_to(self.outer);
        g.sequencer.put(Node::BranchIf {
            cond: Box::new(cond),
            label,
            when: true,
        });
        let body = g.sequencer.new_list();
        g.sequencer.switch_to(body);
        self.branches.push((label, body));
    }

    /// Close the current body and open `else if (cond)`.
    pub fn else_if<R: TypeSystem>(&mut self, g: &mut MethodGenerator<'_, R>, cond: Symbol) -> Result<()> {
        g.check_innermost(self.level, self.frame, "if block")?;
        if self.in_else {
            return Err(GenError::discipline("else-if after else"));
        }
        let cond = g.take(cond, primitives::BOOL)?;
        self.add_branch(g, cond);
        Ok(())
    }

    /// Close the current body and open the else body.
    pub fn else_<R: TypeSystem>(&mut self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        g.check_innermost(self.level, self.frame, "if block")?;
        if self.in_else {
            return Err(GenError::discipline("else already begun"));
        }
        g.sequencer.switch_to(self.outer);
        self.in_else = true;
        Ok(())
    }

    /// Close the block and lay out its bodies.
    pub fn end<R: TypeSystem>(self, g: &mut MethodGenerator<'_, R>) -> Result<()> {
        g.check_innermost(self.level, self.frame, "if block")?;
        g.sequencer.switch_to(self.outer);
        g.sequencer.put(Node::Branch(self.escape));
        for (label, body) in self.branches {
            g.sequencer.put(Node::Mark(label));
            g.sequencer.splice(body);
            g.sequencer.put(Node::Branch(self.escape));
        }
        g.sequencer.put(Node::Mark(self.escape));
        g.exit_block();
        trace!(level = self.level, "end if");
        Ok(())
    }
}
