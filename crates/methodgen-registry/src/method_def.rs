//! Builder for host method declarations.

use methodgen_core::{MethodFlags, MethodImpl, NativeFn, ParamEntry, TypeHash, Value, primitives};

/// Declarative description of a host method, registered with
/// [`TypeRegistry::add_method`](crate::TypeRegistry::add_method).
///
/// # Example
///
/// ```
/// use methodgen_core::{Value, primitives};
/// use methodgen_registry::MethodDef;
///
/// let max = MethodDef::new("max")
///     .param("a", primitives::INT32)
///     .param("b", primitives::INT32)
///     .returns(primitives::INT32)
///     .static_method()
///     .native(|args| match (&args[0], &args[1]) {
///         (Value::Int32(a), Value::Int32(b)) => Value::Int32(*a.max(b)),
///         _ => Value::Null,
///     });
/// assert_eq!(max.params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<ParamEntry>,
    pub generic_params: Vec<TypeHash>,
    pub return_type: TypeHash,
    pub flags: MethodFlags,
    pub implementation: MethodImpl,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            generic_params: Vec::new(),
            return_type: primitives::VOID,
            flags: MethodFlags::empty(),
            implementation: MethodImpl::Pending,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeHash) -> Self {
        self.params.push(ParamEntry::new(name, ty));
        self
    }

    /// Add a parameter callers may omit.
    pub fn param_with_default(mut self, name: impl Into<String>, ty: TypeHash, default: impl Into<Value>) -> Self {
        self.params.push(ParamEntry::with_default(name, ty, default));
        self
    }

    /// Introduce a generic parameter created with
    /// [`TypeRegistry::define_generic_param`](crate::TypeRegistry::define_generic_param).
    pub fn generic(mut self, param: TypeHash) -> Self {
        self.generic_params.push(param);
        self
    }

    pub fn returns(mut self, ty: TypeHash) -> Self {
        self.return_type = ty;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.flags |= MethodFlags::STATIC;
        self
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn native<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.implementation = MethodImpl::Native(NativeFn::new(f));
        self
    }

    pub(crate) fn param_types(&self) -> Vec<TypeHash> {
        self.params.iter().map(|p| p.ty).collect()
    }
}
