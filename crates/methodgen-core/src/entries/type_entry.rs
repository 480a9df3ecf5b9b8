//! Type entries for the catalog.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use super::PropertyEntry;
use crate::{PrimitiveKind, TypeHash};

bitflags! {
    /// Flags describing the nature of a catalog type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Built-in value type (numbers, bool, void).
        const PRIMITIVE = 1 << 0;
        /// Heap-allocated, nullable reference type.
        const REFERENCE = 1 << 1;
        /// Interface: no fields, abstract methods only.
        const INTERFACE = 1 << 2;
        /// Callable reference type with an `invoke` method.
        const DELEGATE = 1 << 3;
        /// Instantiation of `array<T>`.
        const ARRAY = 1 << 4;
        /// Shell allocated by the generator (capture record, iterator state).
        const GENERATED = 1 << 5;
        /// No further members may be declared.
        const FINISHED = 1 << 6;
    }
}

/// Registry entry for a type.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    /// Fully qualified name.
    pub name: String,
    pub type_hash: TypeHash,
    pub flags: TypeFlags,
    /// Primitive kind for built-in value types.
    pub primitive: Option<PrimitiveKind>,

    // === Inheritance ===
    pub base: Option<TypeHash>,
    pub interfaces: Vec<TypeHash>,

    // === Members ===
    pub methods: Vec<TypeHash>,
    pub constructors: Vec<TypeHash>,
    pub fields: Vec<TypeHash>,
    pub properties: Vec<PropertyEntry>,
    /// Interface method -> implementing method on this type.
    pub overrides: FxHashMap<TypeHash, TypeHash>,

    // === Template Info ===
    /// Template this type instantiates (`array`, `Enumerable`, ...).
    pub template: Option<TypeHash>,
    pub type_args: Vec<TypeHash>,
}

impl TypeEntry {
    pub fn new(name: impl Into<String>, flags: TypeFlags) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            flags,
            primitive: None,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            overrides: FxHashMap::default(),
            template: None,
            type_args: Vec::new(),
        }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        let mut entry = Self::new(kind.name(), TypeFlags::PRIMITIVE | TypeFlags::FINISHED);
        entry.primitive = Some(kind);
        entry
    }

    pub fn is_reference(&self) -> bool {
        self.flags.contains(TypeFlags::REFERENCE)
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    pub fn is_delegate(&self) -> bool {
        self.flags.contains(TypeFlags::DELEGATE)
    }

    pub fn is_finished(&self) -> bool {
        self.flags.contains(TypeFlags::FINISHED)
    }

    /// Element type of an array instantiation.
    pub fn element_type(&self) -> Option<TypeHash> {
        if self.flags.contains(TypeFlags::ARRAY) {
            self.type_args.first().copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives;

    #[test]
    fn primitive_entry_uses_script_name() {
        let entry = TypeEntry::primitive(PrimitiveKind::Int32);
        assert_eq!(entry.name, "int");
        assert_eq!(entry.type_hash, primitives::INT32);
        assert!(entry.is_finished());
        assert!(!entry.is_reference());
    }

    #[test]
    fn element_type_only_for_arrays() {
        let mut entry = TypeEntry::new("array<int>", TypeFlags::REFERENCE | TypeFlags::ARRAY);
        entry.type_args.push(primitives::INT32);
        assert_eq!(entry.element_type(), Some(primitives::INT32));

        let mut seq = TypeEntry::new("Enumerable<int>", TypeFlags::REFERENCE | TypeFlags::INTERFACE);
        seq.type_args.push(primitives::INT32);
        assert_eq!(seq.element_type(), None);
    }
}
