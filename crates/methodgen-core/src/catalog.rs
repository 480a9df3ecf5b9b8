//! Capabilities the generator consumes from its environment.
//!
//! [`TypeCatalog`] answers member and type queries; [`ContainerBuilder`]
//! allocates and finalizes generated shells. The generator is written against
//! these traits only, so any type system that can answer them can host
//! generated bodies.
//!
//! Only four lookups are required from an implementor. Everything else
//! (assignability, inheritance walks, member search) is provided on top of
//! them so all catalogs agree on the rules.

use crate::bytecode::BytecodeChunk;
use crate::entries::{
    FieldEntry, GenericParamEntry, MethodEntry, MethodFlags, ParamEntry, PropertyEntry, TypeEntry,
};
use crate::{PrimitiveKind, RegistrationError, TypeHash, primitives};

/// Read-only type and member queries.
pub trait TypeCatalog {
    fn type_entry(&self, ty: TypeHash) -> Option<&TypeEntry>;

    fn method(&self, id: TypeHash) -> Option<&MethodEntry>;

    fn field(&self, id: TypeHash) -> Option<&FieldEntry>;

    fn generic_param(&self, ty: TypeHash) -> Option<&GenericParamEntry>;

    /// Human-readable name for diagnostics.
    fn type_name(&self, ty: TypeHash) -> String {
        if let Some(entry) = self.type_entry(ty) {
            return entry.name.clone();
        }
        if let Some(param) = self.generic_param(ty) {
            return param.name.clone();
        }
        if ty == primitives::NULL {
            return "null".to_string();
        }
        ty.to_string()
    }

    fn is_reference(&self, ty: TypeHash) -> bool {
        ty == primitives::NULL || self.type_entry(ty).is_some_and(TypeEntry::is_reference)
    }

    /// Direct base type. Every reference type other than `object` derives from `object`.
    fn base_type(&self, ty: TypeHash) -> Option<TypeHash> {
        let entry = self.type_entry(ty)?;
        match entry.base {
            Some(base) => Some(base),
            None if entry.is_reference() && ty != primitives::OBJECT => Some(primitives::OBJECT),
            None => None,
        }
    }

    /// `ty` followed by its base chain, most derived first.
    fn ancestors(&self, ty: TypeHash) -> Vec<TypeHash> {
        let mut chain = vec![ty];
        let mut current = ty;
        while let Some(base) = self.base_type(current) {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Whether `ty` (or any ancestor) implements `interface`, directly or through
    /// interface inheritance.
    fn implements(&self, ty: TypeHash, interface: TypeHash) -> bool {
        let mut pending = self.ancestors(ty);
        let mut seen = Vec::new();
        while let Some(next) = pending.pop() {
            if seen.contains(&next) {
                continue;
            }
            seen.push(next);
            if let Some(entry) = self.type_entry(next) {
                if entry.interfaces.contains(&interface) {
                    return true;
                }
                pending.extend(entry.interfaces.iter().copied());
            }
        }
        false
    }

    /// Whether a value of type `from` may be stored where `to` is expected.
    ///
    /// Covers identity, implicit numeric widening, `null` to any reference,
    /// upcasts along the base chain and interface implementation.
    fn is_assignable(&self, from: TypeHash, to: TypeHash) -> bool {
        if from == to {
            return true;
        }
        if from == primitives::VOID || to == primitives::VOID {
            return false;
        }
        match (PrimitiveKind::from_hash(from), PrimitiveKind::from_hash(to)) {
            (Some(a), Some(b)) => return a.widens_to(b),
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }
        if from == primitives::NULL {
            return self.is_reference(to);
        }
        if !self.is_reference(from) {
            return false;
        }
        if to == primitives::OBJECT || self.ancestors(from).contains(&to) {
            return true;
        }
        self.type_entry(to).is_some_and(TypeEntry::is_interface) && self.implements(from, to)
    }

    /// Most derived type both `a` and `b` are assignable to, searching `a`'s
    /// ancestors first.
    fn common_ancestor(&self, a: TypeHash, b: TypeHash) -> Option<TypeHash> {
        if let (Some(ka), Some(kb)) = (PrimitiveKind::from_hash(a), PrimitiveKind::from_hash(b)) {
            return if kb.widens_to(ka) {
                Some(a)
            } else if ka.widens_to(kb) {
                Some(b)
            } else {
                None
            };
        }
        if b == primitives::NULL && self.is_reference(a) {
            return Some(a);
        }
        self.ancestors(a)
            .into_iter()
            .find(|&candidate| self.is_assignable(b, candidate))
    }

    /// Methods named `name` visible on `ty`, most derived first.
    ///
    /// A method hides inherited methods with the same parameter types.
    fn methods_named(&self, ty: TypeHash, name: &str) -> Vec<&MethodEntry> {
        let mut found: Vec<&MethodEntry> = Vec::new();
        let mut owners = self.ancestors(ty);
        let mut i = 0;
        while i < owners.len() {
            if let Some(entry) = self.type_entry(owners[i]) {
                for iface in &entry.interfaces {
                    if !owners.contains(iface) {
                        owners.push(*iface);
                    }
                }
                for id in &entry.methods {
                    let Some(method) = self.method(*id) else {
                        continue;
                    };
                    if method.name != name {
                        continue;
                    }
                    let hidden = found
                        .iter()
                        .any(|m| m.param_types() == method.param_types() && m.is_static() == method.is_static());
                    if !hidden {
                        found.push(method);
                    }
                }
            }
            i += 1;
        }
        found
    }

    fn constructors(&self, ty: TypeHash) -> Vec<&MethodEntry> {
        self.type_entry(ty)
            .map(|entry| entry.constructors.iter().filter_map(|id| self.method(*id)).collect())
            .unwrap_or_default()
    }

    fn find_field(&self, ty: TypeHash, name: &str) -> Option<&FieldEntry> {
        self.ancestors(ty).into_iter().find_map(|owner| {
            self.type_entry(owner)?
                .fields
                .iter()
                .filter_map(|id| self.field(*id))
                .find(|field| field.name == name)
        })
    }

    fn find_property(&self, ty: TypeHash, name: &str) -> Option<&PropertyEntry> {
        let mut owners = self.ancestors(ty);
        let mut i = 0;
        while i < owners.len() {
            if let Some(entry) = self.type_entry(owners[i]) {
                if let Some(prop) = entry.properties.iter().find(|p| p.name == name) {
                    return Some(prop);
                }
                for iface in &entry.interfaces {
                    if !owners.contains(iface) {
                        owners.push(*iface);
                    }
                }
            }
            i += 1;
        }
        None
    }

    /// Implementation of `method` for a receiver whose runtime type is `runtime`.
    fn resolve_override(&self, runtime: TypeHash, method: TypeHash) -> TypeHash {
        self.ancestors(runtime)
            .into_iter()
            .find_map(|owner| self.type_entry(owner)?.overrides.get(&method).copied())
            .unwrap_or(method)
    }

    /// Element type if `ty` is, or implements, `Enumerable<T>`.
    fn sequence_element(&self, ty: TypeHash) -> Option<TypeHash> {
        let is_sequence = |entry: &TypeEntry| entry.template == Some(primitives::ENUMERABLE_TEMPLATE);
        let mut pending = self.ancestors(ty);
        let mut seen = Vec::new();
        while let Some(next) = pending.pop() {
            if seen.contains(&next) {
                continue;
            }
            seen.push(next);
            let Some(entry) = self.type_entry(next) else {
                continue;
            };
            if is_sequence(entry) {
                return entry.type_args.first().copied();
            }
            pending.extend(entry.interfaces.iter().copied());
        }
        None
    }

    /// The `invoke` method of a delegate type.
    fn delegate_invoke(&self, ty: TypeHash) -> Option<&MethodEntry> {
        let entry = self.type_entry(ty)?;
        if !entry.is_delegate() {
            return None;
        }
        entry
            .methods
            .iter()
            .filter_map(|id| self.method(*id))
            .find(|m| m.flags.contains(MethodFlags::DELEGATE_INVOKE))
    }
}

/// Allocation and finalization of generated shells.
pub trait ContainerBuilder {
    /// Allocate a new reference shell. The name is made unique if taken.
    fn define_shell(
        &mut self,
        name: &str,
        base: Option<TypeHash>,
        interfaces: &[TypeHash],
    ) -> Result<TypeHash, RegistrationError>;

    fn define_field(&mut self, owner: TypeHash, name: &str, ty: TypeHash) -> Result<TypeHash, RegistrationError>;

    fn define_method(
        &mut self,
        owner: TypeHash,
        name: &str,
        params: Vec<ParamEntry>,
        return_type: TypeHash,
        flags: MethodFlags,
    ) -> Result<TypeHash, RegistrationError>;

    fn define_default_constructor(&mut self, owner: TypeHash) -> Result<TypeHash, RegistrationError>;

    /// Route calls of `interface_method` on `owner` instances to `implementation`.
    fn implement(
        &mut self,
        owner: TypeHash,
        interface_method: TypeHash,
        implementation: TypeHash,
    ) -> Result<(), RegistrationError>;

    fn install_body(&mut self, method: TypeHash, chunk: BytecodeChunk) -> Result<(), RegistrationError>;

    /// Finalize a shell; no further members may be declared on it.
    fn finish_shell(&mut self, owner: TypeHash) -> Result<(), RegistrationError>;

    /// `array<element>`, instantiated on demand.
    fn array_type(&mut self, element: TypeHash) -> TypeHash;

    /// `(Enumerable<element>, Enumerator<element>)`, instantiated on demand.
    fn sequence_types(&mut self, element: TypeHash) -> (TypeHash, TypeHash);
}

/// Everything a method generator needs from its host.
pub trait TypeSystem: TypeCatalog + ContainerBuilder {}

impl<T: TypeCatalog + ContainerBuilder> TypeSystem for T {}
