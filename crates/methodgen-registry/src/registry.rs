//! TypeRegistry - in-memory type and member catalog.
//!
//! [`TypeRegistry`] stores every type, method, field and generic parameter the
//! generator can see, keyed by [`TypeHash`]. Host code registers its types
//! up front; the generator then adds shells (capture records, iterator state
//! machines) through the [`ContainerBuilder`](methodgen_core::ContainerBuilder)
//! implementation in `builder.rs`.
//!
//! # Thread Safety
//!
//! `TypeRegistry` is not thread-safe. Registration and generation happen on
//! one thread; independent registries may be used from different threads.
//!
//! # Example
//!
//! ```
//! use methodgen_core::{TypeCatalog, primitives};
//! use methodgen_registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_builtins();
//! assert!(registry.type_entry(primitives::INT32).is_some());
//! assert!(registry.is_assignable(primitives::INT32, primitives::INT64));
//! ```

use rustc_hash::FxHashMap;
use tracing::trace;

use methodgen_core::{
    FieldEntry, GenericParamEntry, MethodEntry, MethodFlags, MethodImpl, ParamEntry, PrimitiveKind, PropertyEntry,
    RegistrationError, TypeCatalog, TypeEntry, TypeFlags, TypeHash, primitives,
};

use crate::MethodDef;

/// Type and member catalog.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    pub(crate) types: FxHashMap<TypeHash, TypeEntry>,
    pub(crate) methods: FxHashMap<TypeHash, MethodEntry>,
    pub(crate) fields: FxHashMap<TypeHash, FieldEntry>,
    pub(crate) generic_params: FxHashMap<TypeHash, GenericParamEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with primitives, `object`, `string`, `Type`,
    /// `Exception` and `InvalidStateException` registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        for kind in [PrimitiveKind::Void, PrimitiveKind::Bool]
            .into_iter()
            .chain(PrimitiveKind::NUMERIC)
        {
            let entry = TypeEntry::primitive(kind);
            self.types.insert(entry.type_hash, entry);
        }

        for name in ["object", "string", "Type"] {
            let entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::FINISHED);
            self.types.insert(entry.type_hash, entry);
        }

        self.insert_exception("Exception", None);
        self.insert_exception("InvalidStateException", Some(primitives::EXCEPTION));
    }

    fn insert_exception(&mut self, name: &str, base: Option<TypeHash>) {
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE);
        entry.base = base;
        let hash = entry.type_hash;
        self.types.insert(hash, entry);

        let ctor = MethodEntry {
            id: TypeHash::from_constructor(hash, &[]),
            owner: hash,
            name: name.to_string(),
            params: Vec::new(),
            generic_params: Vec::new(),
            return_type: primitives::VOID,
            flags: MethodFlags::CONSTRUCTOR,
            implementation: MethodImpl::DefaultConstructor,
        };
        self.attach_method(ctor);
        if let Some(entry) = self.types.get_mut(&hash) {
            entry.flags |= TypeFlags::FINISHED;
        }
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a fully built type entry.
    pub fn register_type(&mut self, entry: TypeEntry) -> Result<TypeHash, RegistrationError> {
        if self.types.contains_key(&entry.type_hash) {
            return Err(RegistrationError::DuplicateType { name: entry.name });
        }
        let hash = entry.type_hash;
        trace!(name = %entry.name, "register type");
        self.types.insert(hash, entry);
        Ok(hash)
    }

    /// Register a reference class.
    pub fn define_class(&mut self, name: &str, base: Option<TypeHash>) -> Result<TypeHash, RegistrationError> {
        if let Some(base) = base {
            self.require_type(base)?;
        }
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE);
        entry.base = base;
        self.register_type(entry)
    }

    /// Register an interface extending `extends`.
    pub fn define_interface(&mut self, name: &str, extends: &[TypeHash]) -> Result<TypeHash, RegistrationError> {
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::INTERFACE);
        entry.interfaces = extends.to_vec();
        self.register_type(entry)
    }

    /// Declare that `ty` implements `interface`.
    pub fn add_interface(&mut self, ty: TypeHash, interface: TypeHash) -> Result<(), RegistrationError> {
        self.require_type(interface)?;
        let entry = self.open_type_mut(ty)?;
        if !entry.interfaces.contains(&interface) {
            entry.interfaces.push(interface);
        }
        Ok(())
    }

    /// Register a delegate type whose `invoke` method has the given signature.
    pub fn define_delegate(
        &mut self,
        name: &str,
        params: &[TypeHash],
        return_type: TypeHash,
    ) -> Result<TypeHash, RegistrationError> {
        let hash = self.register_type(TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::DELEGATE))?;
        let params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamEntry::new(format!("arg{i}"), *ty))
            .collect();
        let invoke = MethodEntry {
            id: TypeHash::EMPTY,
            owner: hash,
            name: "invoke".to_string(),
            params,
            generic_params: Vec::new(),
            return_type,
            flags: MethodFlags::DELEGATE_INVOKE,
            implementation: MethodImpl::Abstract,
        };
        self.insert_method(hash, invoke)?;
        if let Some(entry) = self.types.get_mut(&hash) {
            entry.flags |= TypeFlags::FINISHED;
        }
        Ok(hash)
    }

    /// Register a generic parameter usable in [`MethodDef::generic`].
    pub fn define_generic_param(&mut self, name: &str, constraints: &[TypeHash]) -> TypeHash {
        let id = TypeHash::from_name(name);
        self.generic_params.insert(
            id,
            GenericParamEntry {
                id,
                name: name.to_string(),
                constraints: constraints.to_vec(),
            },
        );
        id
    }

    /// Add an instance field.
    pub fn add_field(&mut self, owner: TypeHash, name: &str, ty: TypeHash) -> Result<TypeHash, RegistrationError> {
        self.insert_field(owner, name, ty, false)
    }

    /// Add a static field.
    pub fn add_static_field(&mut self, owner: TypeHash, name: &str, ty: TypeHash) -> Result<TypeHash, RegistrationError> {
        self.insert_field(owner, name, ty, true)
    }

    /// Add a method described by a [`MethodDef`].
    pub fn add_method(&mut self, owner: TypeHash, def: MethodDef) -> Result<TypeHash, RegistrationError> {
        trace!(name = %def.name, params = def.param_types().len(), "add method");
        let entry = MethodEntry {
            id: TypeHash::EMPTY,
            owner,
            name: def.name.clone(),
            params: def.params.clone(),
            generic_params: def.generic_params,
            return_type: def.return_type,
            flags: def.flags,
            implementation: def.implementation,
        };
        self.insert_method(owner, entry)
    }

    /// Add a constructor.
    pub fn add_constructor(
        &mut self,
        owner: TypeHash,
        params: Vec<ParamEntry>,
        implementation: MethodImpl,
    ) -> Result<TypeHash, RegistrationError> {
        let name = self.require_type(owner)?.name.clone();
        let entry = MethodEntry {
            id: TypeHash::EMPTY,
            owner,
            name,
            params,
            generic_params: Vec::new(),
            return_type: primitives::VOID,
            flags: MethodFlags::CONSTRUCTOR,
            implementation,
        };
        self.insert_method(owner, entry)
    }

    /// Add a property backed by accessor methods.
    pub fn add_property(&mut self, owner: TypeHash, property: PropertyEntry) -> Result<(), RegistrationError> {
        let entry = self.open_type_mut(owner)?;
        if entry.properties.iter().any(|p| p.name == property.name) {
            return Err(RegistrationError::DuplicateMember {
                owner: entry.name.clone(),
                name: property.name,
            });
        }
        entry.properties.push(property);
        Ok(())
    }

    pub(crate) fn insert_field(
        &mut self,
        owner: TypeHash,
        name: &str,
        ty: TypeHash,
        is_static: bool,
    ) -> Result<TypeHash, RegistrationError> {
        let id = TypeHash::from_field(owner, name);
        let entry = self.open_type_mut(owner)?;
        if entry.fields.contains(&id) {
            return Err(RegistrationError::DuplicateMember {
                owner: entry.name.clone(),
                name: name.to_string(),
            });
        }
        entry.fields.push(id);
        self.fields.insert(
            id,
            FieldEntry {
                id,
                owner,
                name: name.to_string(),
                ty,
                is_static,
            },
        );
        Ok(id)
    }

    /// Assign the identity of `method` and attach it to its (unfinished) owner.
    pub(crate) fn insert_method(&mut self, owner: TypeHash, mut method: MethodEntry) -> Result<TypeHash, RegistrationError> {
        let param_types: Vec<TypeHash> = method.params.iter().map(|p| p.ty).collect();
        method.id = if method.is_constructor() {
            TypeHash::from_constructor(owner, &param_types)
        } else {
            TypeHash::from_method(owner, &method.name, &param_types)
        };
        method.owner = owner;

        self.open_type_mut(owner)?;
        if self.methods.contains_key(&method.id) {
            return Err(RegistrationError::DuplicateMember {
                owner: self.type_name(owner),
                name: method.name,
            });
        }
        let id = method.id;
        self.attach_method(method);
        Ok(id)
    }

    fn attach_method(&mut self, method: MethodEntry) {
        if let Some(entry) = self.types.get_mut(&method.owner) {
            if method.is_constructor() {
                entry.constructors.push(method.id);
            } else {
                entry.methods.push(method.id);
            }
        }
        self.methods.insert(method.id, method);
    }

    pub(crate) fn require_type(&self, ty: TypeHash) -> Result<&TypeEntry, RegistrationError> {
        self.types.get(&ty).ok_or(RegistrationError::UnknownType(ty))
    }

    /// Mutable access to a type that still accepts declarations.
    pub(crate) fn open_type_mut(&mut self, ty: TypeHash) -> Result<&mut TypeEntry, RegistrationError> {
        let entry = self.types.get_mut(&ty).ok_or(RegistrationError::UnknownType(ty))?;
        if entry.is_finished() {
            return Err(RegistrationError::ShellFinished {
                name: entry.name.clone(),
            });
        }
        Ok(entry)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, ty: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&ty)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(&TypeHash::from_name(name))
    }

    /// First method named `name` visible on `owner`.
    pub fn method_by_name(&self, owner: TypeHash, name: &str) -> Option<&MethodEntry> {
        self.methods_named(owner, name).into_iter().next()
    }

    /// Fields declared directly on `owner`, in declaration order.
    pub fn fields_of(&self, owner: TypeHash) -> Vec<&FieldEntry> {
        self.types
            .get(&owner)
            .map(|entry| entry.fields.iter().filter_map(|id| self.fields.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn contains_type(&self, ty: TypeHash) -> bool {
        self.types.contains_key(&ty)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeEntry> {
        self.types.values()
    }
}

impl TypeCatalog for TypeRegistry {
    fn type_entry(&self, ty: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&ty)
    }

    fn method(&self, id: TypeHash) -> Option<&MethodEntry> {
        self.methods.get(&id)
    }

    fn field(&self, id: TypeHash) -> Option<&FieldEntry> {
        self.fields.get(&id)
    }

    fn generic_param(&self, ty: TypeHash) -> Option<&GenericParamEntry> {
        self.generic_params.get(&ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_core::Value;

    fn shapes() -> (TypeRegistry, TypeHash, TypeHash, TypeHash) {
        let mut registry = TypeRegistry::with_builtins();
        let shape = registry.define_class("Shape", None).unwrap();
        let circle = registry.define_class("Circle", Some(shape)).unwrap();
        let square = registry.define_class("Square", Some(shape)).unwrap();
        (registry, shape, circle, square)
    }

    #[test]
    fn builtins_are_registered() {
        let registry = TypeRegistry::with_builtins();
        for kind in PrimitiveKind::NUMERIC {
            assert!(registry.contains_type(kind.type_hash()), "{kind} missing");
        }
        assert!(registry.contains_type(primitives::OBJECT));
        assert!(registry.contains_type(primitives::STRING));
        assert!(registry.contains_type(primitives::EXCEPTION));
        assert_eq!(
            registry.get(primitives::INVALID_STATE).and_then(|e| e.base),
            Some(primitives::EXCEPTION)
        );
        assert_eq!(registry.constructors(primitives::INVALID_STATE).len(), 1);
    }

    #[test]
    fn duplicate_type_is_rejected() {
        let mut registry = TypeRegistry::with_builtins();
        registry.define_class("Point", None).unwrap();
        assert_eq!(
            registry.define_class("Point", None),
            Err(RegistrationError::DuplicateType { name: "Point".into() })
        );
    }

    #[test]
    fn assignability_follows_base_chain() {
        let (registry, shape, circle, square) = shapes();
        assert!(registry.is_assignable(circle, shape));
        assert!(registry.is_assignable(circle, primitives::OBJECT));
        assert!(!registry.is_assignable(shape, circle));
        assert!(!registry.is_assignable(circle, square));
        assert!(registry.is_assignable(primitives::NULL, circle));
        assert!(!registry.is_assignable(primitives::NULL, primitives::INT32));
    }

    #[test]
    fn assignability_of_primitives_is_widening() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.is_assignable(primitives::INT16, primitives::INT32));
        assert!(!registry.is_assignable(primitives::INT64, primitives::INT32));
        assert!(!registry.is_assignable(primitives::INT32, primitives::OBJECT));
        assert!(!registry.is_assignable(primitives::INT32, primitives::VOID));
    }

    #[test]
    fn interfaces_are_assignable_targets() {
        let mut registry = TypeRegistry::with_builtins();
        let drawable = registry.define_interface("Drawable", &[]).unwrap();
        let sprite = registry.define_class("Sprite", None).unwrap();
        registry.add_interface(sprite, drawable).unwrap();
        let fancy = registry.define_class("FancySprite", Some(sprite)).unwrap();

        assert!(registry.is_assignable(sprite, drawable));
        assert!(registry.is_assignable(fancy, drawable));
        assert!(!registry.is_assignable(drawable, sprite));
    }

    #[test]
    fn common_ancestor_walks_first_chain() {
        let (registry, shape, circle, square) = shapes();
        assert_eq!(registry.common_ancestor(circle, square), Some(shape));
        assert_eq!(registry.common_ancestor(circle, circle), Some(circle));
        assert_eq!(registry.common_ancestor(circle, primitives::STRING), Some(primitives::OBJECT));
        assert_eq!(
            registry.common_ancestor(primitives::INT16, primitives::INT32),
            Some(primitives::INT32)
        );
        assert_eq!(registry.common_ancestor(primitives::INT32, primitives::BOOL), None);
    }

    #[test]
    fn methods_named_hides_inherited_overload() {
        let (mut registry, shape, circle, _) = shapes();
        registry
            .add_method(shape, MethodDef::new("area").returns(primitives::DOUBLE))
            .unwrap();
        registry
            .add_method(circle, MethodDef::new("area").returns(primitives::DOUBLE))
            .unwrap();
        registry
            .add_method(shape, MethodDef::new("area").param("scale", primitives::DOUBLE).returns(primitives::DOUBLE))
            .unwrap();

        let found = registry.methods_named(circle, "area");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].owner, circle);
    }

    #[test]
    fn fields_are_found_through_bases() {
        let (mut registry, shape, circle, _) = shapes();
        let id = registry.add_field(shape, "name", primitives::STRING).unwrap();
        assert_eq!(registry.find_field(circle, "name").map(|f| f.id), Some(id));
        assert!(registry.find_field(circle, "radius").is_none());
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let (mut registry, shape, _, _) = shapes();
        registry.add_field(shape, "name", primitives::STRING).unwrap();
        assert!(matches!(
            registry.add_field(shape, "name", primitives::STRING),
            Err(RegistrationError::DuplicateMember { .. })
        ));
        registry.add_method(shape, MethodDef::new("draw")).unwrap();
        assert!(registry.add_method(shape, MethodDef::new("draw")).is_err());
    }

    #[test]
    fn default_parameters_are_recorded() {
        let mut registry = TypeRegistry::with_builtins();
        let math = registry.define_class("Math", None).unwrap();
        let id = registry
            .add_method(
                math,
                MethodDef::new("round")
                    .param("value", primitives::DOUBLE)
                    .param_with_default("digits", primitives::INT32, 0i32)
                    .returns(primitives::DOUBLE)
                    .static_method(),
            )
            .unwrap();
        let method = registry.method(id).unwrap();
        assert_eq!(method.required_params(), 1);
        assert_eq!(method.params[1].default, Some(Value::Int32(0)));
    }

    #[test]
    fn delegate_exposes_invoke() {
        let mut registry = TypeRegistry::with_builtins();
        let func = registry
            .define_delegate("IntFunc", &[primitives::INT32], primitives::INT32)
            .unwrap();
        let invoke = registry.delegate_invoke(func).unwrap();
        assert_eq!(invoke.param_types(), vec![primitives::INT32]);
        assert_eq!(invoke.return_type, primitives::INT32);
        assert!(registry.delegate_invoke(primitives::OBJECT).is_none());
    }
}
