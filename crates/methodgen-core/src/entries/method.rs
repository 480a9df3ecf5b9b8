//! Method entries for the type catalog.
//!
//! A `MethodEntry` combines a signature with its implementation: a native
//! Rust callable, a generated bytecode chunk, an abstract slot, or a body that
//! is still being generated.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::bytecode::BytecodeChunk;
use crate::{TypeHash, Value};

bitflags! {
    /// Flags describing how a method is bound and dispatched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u32 {
        /// No receiver.
        const STATIC = 1 << 0;
        /// Constructor of the owning type.
        const CONSTRUCTOR = 1 << 1;
        /// Dispatched through the receiver's runtime type.
        const VIRTUAL = 1 << 2;
        /// Declared without a body (interfaces).
        const ABSTRACT = 1 << 3;
        /// The `invoke` method of a delegate type.
        const DELEGATE_INVOKE = 1 << 4;
        /// Declared by the generator on a generated shell.
        const GENERATED = 1 << 5;
    }
}

/// Type-erased native implementation over literal values.
#[derive(Clone)]
pub struct NativeFn(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFn")
    }
}

/// How a method is implemented.
#[derive(Debug, Clone)]
pub enum MethodImpl {
    /// Host function.
    Native(NativeFn),
    /// Generated body.
    Bytecode(Arc<BytecodeChunk>),
    /// Interface slot, resolved through the receiver's overrides.
    Abstract,
    /// Constructor that only default-initializes fields.
    DefaultConstructor,
    /// Declared; the body has not been installed yet.
    Pending,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub name: String,
    pub ty: TypeHash,
    /// Value used when the caller omits this (trailing) argument.
    pub default: Option<Value>,
}

impl ParamEntry {
    pub fn new(name: impl Into<String>, ty: TypeHash) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, ty: TypeHash, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default.into()),
        }
    }
}

/// Registry entry for a method or constructor.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub id: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub params: Vec<ParamEntry>,
    /// Generic parameters introduced by this method.
    pub generic_params: Vec<TypeHash>,
    pub return_type: TypeHash,
    pub flags: MethodFlags,
    pub implementation: MethodImpl,
}

impl MethodEntry {
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR)
    }

    /// Whether calls must go through the receiver's runtime type.
    pub fn is_virtual(&self) -> bool {
        self.flags.intersects(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT)
    }

    /// Number of stack values a call pops, including the receiver.
    ///
    /// Constructors receive their fresh instance from `New`, not the stack.
    pub fn arg_slots(&self) -> usize {
        self.params.len() + usize::from(!self.is_static() && !self.is_constructor())
    }

    /// Minimum number of arguments a caller must supply.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| p.default.is_none())
            .map_or(0, |i| i + 1)
    }

    pub fn param_types(&self) -> Vec<TypeHash> {
        self.params.iter().map(|p| p.ty).collect()
    }

    pub fn bytecode(&self) -> Option<&BytecodeChunk> {
        match &self.implementation {
            MethodImpl::Bytecode(chunk) => Some(chunk),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;

    fn entry(params: Vec<ParamEntry>, flags: MethodFlags) -> MethodEntry {
        MethodEntry {
            id: TypeHash::from_name("m"),
            owner: TypeHash::from_name("Owner"),
            name: "m".into(),
            params,
            generic_params: Vec::new(),
            return_type: primitives::VOID,
            flags,
            implementation: MethodImpl::Pending,
        }
    }

    #[test]
    fn required_params_stop_at_trailing_defaults() {
        let m = entry(
            vec![
                ParamEntry::new("a", primitives::INT32),
                ParamEntry::with_default("b", primitives::INT32, 5i32),
                ParamEntry::with_default("c", primitives::BOOL, true),
            ],
            MethodFlags::STATIC,
        );
        assert_eq!(m.required_params(), 1);
    }

    #[test]
    fn arg_slots_include_receiver() {
        let params = vec![ParamEntry::new("a", primitives::INT32)];
        assert_eq!(entry(params.clone(), MethodFlags::empty()).arg_slots(), 2);
        assert_eq!(entry(params, MethodFlags::STATIC).arg_slots(), 1);
    }

    #[test]
    fn native_fn_calls_through() {
        let f = NativeFn::new(|args| Value::Int32(args.len() as i32));
        assert_eq!(f.call(&[Value::Null, Value::Null]), Value::Int32(2));
    }
}
