//! Field, property and generic parameter entries.

use crate::TypeHash;

/// Registry entry for a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub id: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub ty: TypeHash,
    pub is_static: bool,
}

/// A property backed by accessor methods.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub name: String,
    pub ty: TypeHash,
    pub getter: Option<TypeHash>,
    pub setter: Option<TypeHash>,
    pub is_static: bool,
}

impl PropertyEntry {
    pub fn read_only(name: impl Into<String>, ty: TypeHash, getter: TypeHash) -> Self {
        Self {
            name: name.into(),
            ty,
            getter: Some(getter),
            setter: None,
            is_static: false,
        }
    }
}

/// A generic type parameter introduced by a method.
///
/// Arguments bound to it must be assignable to every constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParamEntry {
    pub id: TypeHash,
    pub name: String,
    pub constraints: Vec<TypeHash>,
}
