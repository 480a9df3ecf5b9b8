//! A small stack machine for running generated bodies.
//!
//! The machine exists so generated code can be checked by behaviour rather
//! than by instruction layout alone: closures, iterator state machines and
//! operator tables are all exercised end to end through it.

mod arith;
mod memory;
#[allow(clippy::module_inception)]
mod vm;

use thiserror::Error;

use methodgen_core::TypeHash;

pub use memory::{Object, ObjectRef, Slot};
pub use vm::Vm;

/// Failure while executing a body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// An exception object reached the top of the call stack.
    #[error("unhandled exception '{type_name}'")]
    Thrown { ty: TypeHash, type_name: String },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivideByZero,

    #[error("null reference")]
    NullReference,

    #[error("cannot cast '{from}' to '{to}'")]
    InvalidCast { from: String, to: String },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{op} cannot be applied to {operands}")]
    InvalidOperands { op: &'static str, operands: String },

    #[error("unknown method {0:?}")]
    UnknownMethod(TypeHash),

    #[error("unknown field {0:?}")]
    UnknownField(TypeHash),

    #[error("'{ty}' has no member '{name}'")]
    MissingMember { ty: String, name: String },

    #[error("abstract method '{0}' called without an implementation")]
    AbstractCall(String),

    #[error("method '{0}' has no body")]
    MissingBody(String),

    #[error("native method '{method}' cannot take {found}")]
    NativeArgument { method: String, found: String },

    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("bad slot {0}")]
    BadSlot(usize),

    #[error("malformed body: {0}")]
    Malformed(String),
}

impl RuntimeError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RuntimeError::Malformed(message.into())
    }
}
