//! Runtime values and heap objects.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use methodgen_core::{PrimitiveKind, TypeHash, Value, primitives};

/// Shared handle to a heap object.
pub type ObjectRef = Rc<RefCell<Object>>;

/// A stack, local, argument or field slot.
#[derive(Clone)]
pub enum Slot {
    /// A literal, including `null`.
    Value(Value),
    /// A reference to a heap object.
    Object(ObjectRef),
    /// A function reference, only ever seen between `LoadFunction` and `NewDelegate`.
    Function(TypeHash),
}

/// A heap object.
#[derive(Debug)]
pub enum Object {
    Instance {
        ty: TypeHash,
        fields: FxHashMap<TypeHash, Slot>,
    },
    Array {
        element: TypeHash,
        items: Vec<Slot>,
    },
    Delegate {
        ty: TypeHash,
        target: Slot,
        method: TypeHash,
    },
    /// Result of `LoadType`.
    Type(TypeHash),
}

impl Slot {
    pub fn null() -> Self {
        Slot::Value(Value::Null)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Slot::Value(value.into())
    }

    pub(crate) fn alloc(object: Object) -> Self {
        Slot::Object(Rc::new(RefCell::new(object)))
    }

    /// Default contents of a slot declared with type `ty`.
    pub fn default_for(ty: TypeHash) -> Self {
        PrimitiveKind::from_hash(ty)
            .and_then(Value::zero)
            .map(Slot::Value)
            .unwrap_or_else(Slot::null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Slot::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Slot::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    /// Runtime type, or `None` for `null`.
    pub fn runtime_type(&self) -> Option<TypeHash> {
        match self {
            Slot::Value(Value::Null) => None,
            Slot::Value(v) => Some(v.type_hash()),
            Slot::Function(_) => None,
            Slot::Object(o) => Some(match &*o.borrow() {
                Object::Instance { ty, .. } | Object::Delegate { ty, .. } => *ty,
                Object::Array { element, .. } => TypeHash::from_template_instance(primitives::ARRAY_TEMPLATE, &[*element]),
                Object::Type(_) => primitives::TYPE,
            }),
        }
    }

    /// Read an instance field.
    pub fn field(&self, field: TypeHash) -> Option<Slot> {
        match &*self.as_object()?.borrow() {
            Object::Instance { fields, .. } => fields.get(&field).cloned(),
            _ => None,
        }
    }

    /// Elements of an array object.
    pub fn items(&self) -> Option<Vec<Slot>> {
        match &*self.as_object()?.borrow() {
            Object::Array { items, .. } => Some(items.clone()),
            _ => None,
        }
    }
}

/// Values compare by value, objects by identity.
impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::Value(a), Slot::Value(b)) => a == b,
            (Slot::Object(a), Slot::Object(b)) => Rc::ptr_eq(a, b),
            (Slot::Function(a), Slot::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Value(v) => write!(f, "{v}"),
            Slot::Function(m) => write!(f, "fn {m:?}"),
            // Shallow: closures and enumerators point back at each other.
            Slot::Object(o) => match o.try_borrow() {
                Ok(object) => match &*object {
                    Object::Instance { ty, .. } => write!(f, "instance {ty:?}"),
                    Object::Array { items, .. } => write!(f, "array[{}]", items.len()),
                    Object::Delegate { ty, .. } => write!(f, "delegate {ty:?}"),
                    Object::Type(ty) => write!(f, "type {ty:?}"),
                },
                Err(_) => f.write_str("<borrowed>"),
            },
        }
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}
