//! Structured blocks: conditionals, loops and lambdas.
//!
//! Opening a block redirects the sequencer into a fresh statement list; the
//! block handle remembers where it was opened and splices its lists back
//! into the enclosing one when it ends. Blocks close innermost first.

mod conditional;
mod lambda;
mod loops;

pub use conditional::IfBlock;
pub use lambda::LambdaBlock;
pub use loops::LoopBlock;

use methodgen_core::{GenError, Result, TypeSystem};

use crate::generator::MethodGenerator;
use crate::symbol::FrameId;

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    /// Open a block, returning its nesting level.
    pub(crate) fn enter_block(&mut self) -> Result<usize> {
        if self.open_blocks >= self.config.max_nesting {
            return Err(GenError::discipline(format!(
                "blocks nested deeper than {}",
                self.config.max_nesting
            )));
        }
        let level = self.open_blocks;
        self.open_blocks += 1;
        Ok(level)
    }

    /// Fail unless the block at `level` is the innermost open block and was
    /// opened in the current body.
    pub(crate) fn check_innermost(&self, level: usize, frame: FrameId, what: &str) -> Result<()> {
        if self.open_blocks != level + 1 {
            return Err(GenError::discipline(format!(
                "{what} closed while an inner block is still open"
            )));
        }
        if self.frame().id != frame {
            return Err(GenError::discipline(format!("{what} closed from another body")));
        }
        Ok(())
    }

    /// Fail unless the block at `level` is still open in the current body.
    pub(crate) fn check_open(&self, level: usize, frame: FrameId, what: &str) -> Result<()> {
        if self.open_blocks <= level {
            return Err(GenError::discipline(format!("{what} used after its block ended")));
        }
        if self.frame().id != frame {
            return Err(GenError::discipline(format!("{what} used from another body")));
        }
        Ok(())
    }

    pub(crate) fn exit_block(&mut self) {
        self.open_blocks -= 1;
    }

    /// Number of blocks not yet ended.
    pub fn open_blocks(&self) -> usize {
        self.open_blocks
    }
}
