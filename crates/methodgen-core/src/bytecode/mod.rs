//! Bytecode types for generated method bodies.
//!
//! - [`OpCode`] - The instruction set of the target engine
//! - [`BytecodeChunk`] - Instructions, locals and labels for one method
//! - [`Constant`] and [`ConstantPool`] - Per-chunk constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::{BytecodeChunk, Label};
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
