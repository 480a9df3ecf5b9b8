//! [`ContainerBuilder`] implementation for [`TypeRegistry`].
//!
//! Generated shells start open (not `FINISHED`), collect fields and methods
//! while a body is authored, and are sealed with `finish_shell`. Template
//! instantiations (`array<T>`, `Enumerable<T>`, `Enumerator<T>`) are created
//! on first request and shared afterwards.

use std::sync::Arc;

use tracing::debug;

use methodgen_core::bytecode::BytecodeChunk;
use methodgen_core::{
    ContainerBuilder, MethodEntry, MethodFlags, MethodImpl, ParamEntry, PropertyEntry, RegistrationError,
    TypeCatalog, TypeEntry, TypeFlags, TypeHash, primitives,
};

use crate::TypeRegistry;

impl TypeRegistry {
    fn unique_name(&self, name: &str) -> String {
        if !self.types.contains_key(&TypeHash::from_name(name)) {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}_{n}");
            if !self.types.contains_key(&TypeHash::from_name(&candidate)) {
                return candidate;
            }
            n += 1;
        }
    }

    fn template_instance(&self, template: TypeHash, label: &str, element: TypeHash) -> (TypeHash, String) {
        let hash = TypeHash::from_template_instance(template, &[element]);
        let name = format!("{label}<{}>", self.type_name(element));
        (hash, name)
    }

    fn abstract_method(owner: TypeHash, name: &str, return_type: TypeHash) -> MethodEntry {
        MethodEntry {
            id: TypeHash::EMPTY,
            owner,
            name: name.to_string(),
            params: Vec::new(),
            generic_params: Vec::new(),
            return_type,
            flags: MethodFlags::ABSTRACT | MethodFlags::VIRTUAL,
            implementation: MethodImpl::Abstract,
        }
    }

    fn seal(&mut self, ty: TypeHash) {
        if let Some(entry) = self.types.get_mut(&ty) {
            entry.flags |= TypeFlags::FINISHED;
        }
    }

    fn enumerator_type(&mut self, element: TypeHash) -> Result<TypeHash, RegistrationError> {
        let (hash, name) = self.template_instance(primitives::ENUMERATOR_TEMPLATE, "Enumerator", element);
        if self.types.contains_key(&hash) {
            return Ok(hash);
        }
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::INTERFACE);
        entry.type_hash = hash;
        entry.template = Some(primitives::ENUMERATOR_TEMPLATE);
        entry.type_args = vec![element];
        self.types.insert(hash, entry);

        self.insert_method(hash, Self::abstract_method(hash, "move_next", primitives::BOOL))?;
        let getter = self.insert_method(hash, Self::abstract_method(hash, "get_current", element))?;
        self.add_property(hash, PropertyEntry::read_only("current", element, getter))?;
        self.seal(hash);
        Ok(hash)
    }

    fn enumerable_type(&mut self, element: TypeHash, enumerator: TypeHash) -> Result<TypeHash, RegistrationError> {
        let (hash, name) = self.template_instance(primitives::ENUMERABLE_TEMPLATE, "Enumerable", element);
        if self.types.contains_key(&hash) {
            return Ok(hash);
        }
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::INTERFACE);
        entry.type_hash = hash;
        entry.template = Some(primitives::ENUMERABLE_TEMPLATE);
        entry.type_args = vec![element];
        self.types.insert(hash, entry);

        self.insert_method(hash, Self::abstract_method(hash, "get_enumerator", enumerator))?;
        self.seal(hash);
        Ok(hash)
    }
}

impl ContainerBuilder for TypeRegistry {
    fn define_shell(
        &mut self,
        name: &str,
        base: Option<TypeHash>,
        interfaces: &[TypeHash],
    ) -> Result<TypeHash, RegistrationError> {
        if let Some(base) = base {
            self.require_type(base)?;
        }
        for iface in interfaces {
            self.require_type(*iface)?;
        }
        let name = self.unique_name(name);
        let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::GENERATED);
        entry.base = base;
        entry.interfaces = interfaces.to_vec();
        debug!(shell = %entry.name, "define shell");
        self.register_type(entry)
    }

    fn define_field(&mut self, owner: TypeHash, name: &str, ty: TypeHash) -> Result<TypeHash, RegistrationError> {
        self.insert_field(owner, name, ty, false)
    }

    fn define_method(
        &mut self,
        owner: TypeHash,
        name: &str,
        params: Vec<ParamEntry>,
        return_type: TypeHash,
        flags: MethodFlags,
    ) -> Result<TypeHash, RegistrationError> {
        let implementation = if flags.contains(MethodFlags::ABSTRACT) {
            MethodImpl::Abstract
        } else {
            MethodImpl::Pending
        };
        let method = MethodEntry {
            id: TypeHash::EMPTY,
            owner,
            name: name.to_string(),
            params,
            generic_params: Vec::new(),
            return_type,
            flags: flags | MethodFlags::GENERATED,
            implementation,
        };
        self.insert_method(owner, method)
    }

    fn define_default_constructor(&mut self, owner: TypeHash) -> Result<TypeHash, RegistrationError> {
        let name = self.require_type(owner)?.name.clone();
        let ctor = MethodEntry {
            id: TypeHash::EMPTY,
            owner,
            name,
            params: Vec::new(),
            generic_params: Vec::new(),
            return_type: primitives::VOID,
            flags: MethodFlags::CONSTRUCTOR | MethodFlags::GENERATED,
            implementation: MethodImpl::DefaultConstructor,
        };
        self.insert_method(owner, ctor)
    }

    fn implement(
        &mut self,
        owner: TypeHash,
        interface_method: TypeHash,
        implementation: TypeHash,
    ) -> Result<(), RegistrationError> {
        if !self.methods.contains_key(&interface_method) {
            return Err(RegistrationError::UnknownMethod(interface_method));
        }
        if !self.methods.contains_key(&implementation) {
            return Err(RegistrationError::UnknownMethod(implementation));
        }
        self.open_type_mut(owner)?
            .overrides
            .insert(interface_method, implementation);
        Ok(())
    }

    fn install_body(&mut self, method: TypeHash, chunk: BytecodeChunk) -> Result<(), RegistrationError> {
        let entry = self
            .methods
            .get_mut(&method)
            .ok_or(RegistrationError::UnknownMethod(method))?;
        if !matches!(entry.implementation, MethodImpl::Pending) {
            return Err(RegistrationError::BodyAlreadyInstalled {
                name: entry.name.clone(),
            });
        }
        debug!(method = %entry.name, bytes = chunk.len(), "install body");
        entry.implementation = MethodImpl::Bytecode(Arc::new(chunk));
        Ok(())
    }

    fn finish_shell(&mut self, owner: TypeHash) -> Result<(), RegistrationError> {
        self.open_type_mut(owner)?.flags |= TypeFlags::FINISHED;
        Ok(())
    }

    fn array_type(&mut self, element: TypeHash) -> TypeHash {
        let (hash, name) = self.template_instance(primitives::ARRAY_TEMPLATE, "array", element);
        if !self.types.contains_key(&hash) {
            let mut entry = TypeEntry::new(name, TypeFlags::REFERENCE | TypeFlags::ARRAY | TypeFlags::FINISHED);
            entry.type_hash = hash;
            entry.template = Some(primitives::ARRAY_TEMPLATE);
            entry.type_args = vec![element];
            self.types.insert(hash, entry);
        }
        hash
    }

    fn sequence_types(&mut self, element: TypeHash) -> (TypeHash, TypeHash) {
        // Both instantiations are created fresh here, so member insertion cannot
        // collide and the results are always present.
        let enumerator = self
            .enumerator_type(element)
            .unwrap_or_else(|_| TypeHash::from_template_instance(primitives::ENUMERATOR_TEMPLATE, &[element]));
        let enumerable = self
            .enumerable_type(element, enumerator)
            .unwrap_or_else(|_| TypeHash::from_template_instance(primitives::ENUMERABLE_TEMPLATE, &[element]));
        (enumerable, enumerator)
    }
}
