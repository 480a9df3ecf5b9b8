//! Member access, calls, construction and operators.

use tracing::trace;

use methodgen_core::{
    FieldEntry, GenError, MethodEntry, MethodFlags, PrimitiveKind, RegistrationError, Result, TypeHash, TypeSystem, Value,
    primitives,
};

use crate::generator::MethodGenerator;
use crate::node::Node;
use crate::operators::{BinaryOp, UnaryOp, resolve_binary, resolve_unary};
use crate::overload::{OverloadMatch, format_types, match_signature, resolve_overload};
use crate::symbol::Symbol;

/// What a resolved call needs to become a node.
struct ResolvedCall {
    method: TypeHash,
    virtual_call: bool,
    matched: OverloadMatch,
}

impl<'r, R: TypeSystem> MethodGenerator<'r, R> {
    // ==========================================================================
    // Calls
    // ==========================================================================

    fn resolve_call(
        &self,
        owner: TypeHash,
        name: &str,
        args: &[Symbol],
        filter: impl Fn(&MethodEntry) -> bool,
    ) -> Result<ResolvedCall> {
        let arg_types: Vec<TypeHash> = args.iter().map(Symbol::ty).collect();
        let candidates: Vec<TypeHash> = self
            .registry
            .methods_named(owner, name)
            .into_iter()
            .filter(|&m| filter(m))
            .map(|m| m.id)
            .collect();
        let matched = resolve_overload(&*self.registry, &candidates, &arg_types, owner, name)?;
        let method = self
            .registry
            .method(matched.method)
            .ok_or(RegistrationError::UnknownMethod(matched.method))?;
        Ok(ResolvedCall {
            method: method.id,
            virtual_call: dispatches_virtually(method),
            matched,
        })
    }

    fn method_entry(&self, method: TypeHash) -> Result<&MethodEntry> {
        Ok(self.registry.method(method).ok_or(RegistrationError::UnknownMethod(method))?)
    }

    /// Consume arguments against the substituted parameter types and append
    /// defaults for omitted trailing parameters.
    fn take_args(&mut self, args: &[Symbol], matched: &OverloadMatch) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(matched.param_types.len());
        for (arg, param) in args.iter().zip(&matched.param_types) {
            nodes.push(self.take(*arg, *param)?);
        }
        nodes.extend(matched.defaults.iter().cloned().map(Node::Const));
        Ok(nodes)
    }

    /// Call an instance method on `target`.
    ///
    /// The call is put as a statement immediately; the returned symbol
    /// withdraws it if its value is consumed.
    pub fn call(&mut self, target: Symbol, name: &str, args: &[Symbol]) -> Result<Symbol> {
        let owner = target.ty();
        let resolved = self.resolve_call(owner, name, args, |m| !m.is_static() && !m.is_constructor())?;
        let target = self.take(target, owner)?;
        let args = self.take_args(args, &resolved.matched)?;
        let return_type = resolved.matched.return_type;
        trace!(method = name, virtual_call = resolved.virtual_call, "call");
        let node = Node::Call {
            method: resolved.method,
            target: Some(Box::new(target)),
            args,
            virtual_call: resolved.virtual_call,
            returns_value: return_type != primitives::VOID,
        };
        Ok(self.put_intermediate(node, return_type, "call"))
    }

    /// Call a static method of `owner`.
    pub fn call_static(&mut self, owner: TypeHash, name: &str, args: &[Symbol]) -> Result<Symbol> {
        let has_instance = self
            .registry
            .methods_named(owner, name)
            .iter()
            .any(|m| !m.is_static() && !m.is_constructor());
        let resolved = match self.resolve_call(owner, name, args, MethodEntry::is_static) {
            Err(GenError::MemberNotFound { .. }) if has_instance => {
                return Err(GenError::StaticContext { name: name.to_string() });
            }
            other => other?,
        };
        let args = self.take_args(args, &resolved.matched)?;
        let return_type = resolved.matched.return_type;
        let node = Node::Call {
            method: resolved.method,
            target: None,
            args,
            virtual_call: false,
            returns_value: return_type != primitives::VOID,
        };
        Ok(self.put_intermediate(node, return_type, "call"))
    }

    /// Call a known instance method on `target`, bypassing overload
    /// resolution.
    ///
    /// `target` must be assignable to the method's owner and every argument
    /// is checked against its parameter; omitted trailing parameters take
    /// their defaults.
    pub fn call_method(&mut self, target: Symbol, method: TypeHash, args: &[Symbol]) -> Result<Symbol> {
        let entry = self.method_entry(method)?;
        if entry.is_static() || entry.is_constructor() {
            return Err(GenError::type_mismatch(format!("'{}' is not an instance method", entry.name)));
        }
        let (owner, virtual_call) = (entry.owner, dispatches_virtually(entry));
        let arg_types: Vec<TypeHash> = args.iter().map(Symbol::ty).collect();
        let matched = match_signature(&*self.registry, method, &arg_types)?;
        let target = self.take(target, owner)?;
        let args = self.take_args(args, &matched)?;
        let return_type = matched.return_type;
        trace!(?method, virtual_call, "call by handle");
        let node = Node::Call {
            method,
            target: Some(Box::new(target)),
            args,
            virtual_call,
            returns_value: return_type != primitives::VOID,
        };
        Ok(self.put_intermediate(node, return_type, "call"))
    }

    /// Call a known static method, bypassing overload resolution.
    pub fn call_static_method(&mut self, method: TypeHash, args: &[Symbol]) -> Result<Symbol> {
        let entry = self.method_entry(method)?;
        if !entry.is_static() {
            return Err(GenError::StaticContext {
                name: entry.name.clone(),
            });
        }
        let arg_types: Vec<TypeHash> = args.iter().map(Symbol::ty).collect();
        let matched = match_signature(&*self.registry, method, &arg_types)?;
        let args = self.take_args(args, &matched)?;
        let return_type = matched.return_type;
        let node = Node::Call {
            method,
            target: None,
            args,
            virtual_call: false,
            returns_value: return_type != primitives::VOID,
        };
        Ok(self.put_intermediate(node, return_type, "call"))
    }

    /// Construct an instance of `ty`.
    pub fn construct(&mut self, ty: TypeHash, args: &[Symbol]) -> Result<Symbol> {
        let arg_types: Vec<TypeHash> = args.iter().map(Symbol::ty).collect();
        let candidates: Vec<TypeHash> = self.registry.constructors(ty).iter().map(|m| m.id).collect();
        if self.registry.type_entry(ty).is_none() {
            return Err(GenError::UnknownType(ty));
        }
        let name = self.registry.type_name(ty);
        let matched = resolve_overload(&*self.registry, &candidates, &arg_types, ty, &name)?;
        let args = self.take_args(args, &matched)?;
        let node = Node::New {
            ctor: matched.method,
            args,
        };
        Ok(self.put_intermediate(node, ty, "construction"))
    }

    // ==========================================================================
    // Fields and properties
    // ==========================================================================

    /// Read a field or property of `target`.
    pub fn get(&mut self, target: Symbol, name: &str) -> Result<Symbol> {
        let owner = target.ty();
        if let Some(field) = self.registry.find_field(owner, name).filter(|f| !f.is_static) {
            let (id, ty) = (field.id, field.ty);
            let target = self.take(target, owner)?;
            return Ok(self.expression(Node::load_field(target, id), ty, "field read"));
        }
        let getter = self
            .registry
            .find_property(owner, name)
            .filter(|p| !p.is_static)
            .map(|p| (p.getter, p.ty));
        match getter {
            Some((Some(getter), ty)) => {
                let virtual_call = self.registry.method(getter).is_some_and(MethodEntry::is_virtual);
                let target = self.take(target, owner)?;
                let node = Node::Call {
                    method: getter,
                    target: Some(Box::new(target)),
                    args: Vec::new(),
                    virtual_call,
                    returns_value: true,
                };
                Ok(self.put_intermediate(node, ty, "property read"))
            }
            Some((None, _)) => Err(GenError::type_mismatch(format!("property '{name}' is write-only"))),
            None => Err(self.member_not_found(owner, name)),
        }
    }

    /// Write a field or property of `target`.
    pub fn set(&mut self, target: Symbol, name: &str, value: Symbol) -> Result<()> {
        let owner = target.ty();
        if let Some(field) = self.registry.find_field(owner, name).filter(|f| !f.is_static) {
            let (id, ty) = (field.id, field.ty);
            let target = self.take(target, owner)?;
            let value = self.take(value, ty)?;
            self.sequencer.put(Node::store_field(target, id, value));
            return Ok(());
        }
        let setter = self
            .registry
            .find_property(owner, name)
            .filter(|p| !p.is_static)
            .map(|p| (p.setter, p.ty));
        match setter {
            Some((Some(setter), ty)) => {
                let virtual_call = self.registry.method(setter).is_some_and(MethodEntry::is_virtual);
                let target = self.take(target, owner)?;
                let value = self.take(value, ty)?;
                self.sequencer.put(Node::Call {
                    method: setter,
                    target: Some(Box::new(target)),
                    args: vec![value],
                    virtual_call,
                    returns_value: false,
                });
                Ok(())
            }
            Some((None, _)) => Err(GenError::type_mismatch(format!("property '{name}' is read-only"))),
            None => Err(self.member_not_found(owner, name)),
        }
    }

    /// Read a static field or property of `owner`.
    pub fn get_static(&mut self, owner: TypeHash, name: &str) -> Result<Symbol> {
        if let Some(field) = self.registry.find_field(owner, name) {
            if !field.is_static {
                return Err(GenError::StaticContext { name: name.to_string() });
            }
            let (id, ty) = (field.id, field.ty);
            return Ok(self.expression(Node::LoadField { target: None, field: id }, ty, "static field read"));
        }
        let property = self.registry.find_property(owner, name).map(|p| (p.getter, p.ty, p.is_static));
        match property {
            Some((_, _, false)) => Err(GenError::StaticContext { name: name.to_string() }),
            Some((Some(getter), ty, true)) => {
                let node = Node::Call {
                    method: getter,
                    target: None,
                    args: Vec::new(),
                    virtual_call: false,
                    returns_value: true,
                };
                Ok(self.put_intermediate(node, ty, "property read"))
            }
            Some((None, _, true)) => Err(GenError::type_mismatch(format!("property '{name}' is write-only"))),
            None => Err(self.member_not_found(owner, name)),
        }
    }

    /// Write a static field or property of `owner`.
    pub fn set_static(&mut self, owner: TypeHash, name: &str, value: Symbol) -> Result<()> {
        if let Some(field) = self.registry.find_field(owner, name) {
            if !field.is_static {
                return Err(GenError::StaticContext { name: name.to_string() });
            }
            let (id, ty) = (field.id, field.ty);
            let value = self.take(value, ty)?;
            self.sequencer.put(Node::StoreField {
                target: None,
                field: id,
                value: Box::new(value),
            });
            return Ok(());
        }
        let property = self.registry.find_property(owner, name).map(|p| (p.setter, p.ty, p.is_static));
        match property {
            Some((_, _, false)) => Err(GenError::StaticContext { name: name.to_string() }),
            Some((Some(setter), ty, true)) => {
                let value = self.take(value, ty)?;
                self.sequencer.put(Node::Call {
                    method: setter,
                    target: None,
                    args: vec![value],
                    virtual_call: false,
                    returns_value: false,
                });
                Ok(())
            }
            Some((None, _, true)) => Err(GenError::type_mismatch(format!("property '{name}' is read-only"))),
            None => Err(self.member_not_found(owner, name)),
        }
    }

    fn field_entry(&self, field: TypeHash, is_static: bool) -> Result<&FieldEntry> {
        let entry = self.registry.field(field).ok_or(RegistrationError::UnknownField(field))?;
        match (entry.is_static, is_static) {
            (false, true) => Err(GenError::StaticContext {
                name: entry.name.clone(),
            }),
            (true, false) => Err(GenError::type_mismatch(format!("field '{}' is static", entry.name))),
            _ => Ok(entry),
        }
    }

    /// Read a known instance field of `target`.
    pub fn get_field(&mut self, target: Symbol, field: TypeHash) -> Result<Symbol> {
        let entry = self.field_entry(field, false)?;
        let (owner, ty) = (entry.owner, entry.ty);
        let target = self.take(target, owner)?;
        Ok(self.expression(Node::load_field(target, field), ty, "field read"))
    }

    /// Write a known instance field of `target`.
    pub fn set_field(&mut self, target: Symbol, field: TypeHash, value: Symbol) -> Result<()> {
        let entry = self.field_entry(field, false)?;
        let (owner, ty) = (entry.owner, entry.ty);
        let target = self.take(target, owner)?;
        let value = self.take(value, ty)?;
        self.sequencer.put(Node::store_field(target, field, value));
        Ok(())
    }

    /// Read a known static field.
    pub fn get_static_field(&mut self, field: TypeHash) -> Result<Symbol> {
        let ty = self.field_entry(field, true)?.ty;
        Ok(self.expression(Node::LoadField { target: None, field }, ty, "static field read"))
    }

    /// Write a known static field.
    pub fn set_static_field(&mut self, field: TypeHash, value: Symbol) -> Result<()> {
        let ty = self.field_entry(field, true)?.ty;
        let value = self.take(value, ty)?;
        self.sequencer.put(Node::StoreField {
            target: None,
            field,
            value: Box::new(value),
        });
        Ok(())
    }

    fn member_not_found(&self, owner: TypeHash, name: &str) -> GenError {
        GenError::MemberNotFound {
            owner: self.registry.type_name(owner),
            name: name.to_string(),
            arguments: String::new(),
        }
    }

    // ==========================================================================
    // Arrays
    // ==========================================================================

    /// Allocate `array<element>` of the given length.
    pub fn new_array(&mut self, element: TypeHash, length: Symbol) -> Result<Symbol> {
        if self.registry.type_entry(element).is_none() {
            return Err(GenError::UnknownType(element));
        }
        let length = self.take(length, primitives::INT32)?;
        let ty = self.registry.array_type(element);
        let node = Node::NewArray {
            element,
            length: Box::new(length),
        };
        Ok(self.expression(node, ty, "array"))
    }

    fn array_element(&self, array: TypeHash) -> Result<TypeHash> {
        self.registry
            .type_entry(array)
            .and_then(|entry| entry.element_type())
            .ok_or_else(|| GenError::type_mismatch(format!("'{}' is not an array", self.registry.type_name(array))))
    }

    /// Read `array[index]`.
    pub fn element(&mut self, array: Symbol, index: Symbol) -> Result<Symbol> {
        let element = self.array_element(array.ty())?;
        let array = self.take(array, array.ty())?;
        let index = self.take(index, primitives::INT32)?;
        let node = Node::Element {
            array: Box::new(array),
            index: Box::new(index),
        };
        Ok(self.expression(node, element, "element read"))
    }

    /// Write `array[index] = value`.
    pub fn set_element(&mut self, array: Symbol, index: Symbol, value: Symbol) -> Result<()> {
        let element = self.array_element(array.ty())?;
        let array = self.take(array, array.ty())?;
        let index = self.take(index, primitives::INT32)?;
        let value = self.take(value, element)?;
        self.sequencer.put(Node::StoreElement {
            array: Box::new(array),
            index: Box::new(index),
            value: Box::new(value),
        });
        Ok(())
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    /// Explicit conversion of `value` to `ty`.
    ///
    /// Numeric kinds convert freely. Reference upcasts are free; downcasts
    /// are checked at run time.
    pub fn cast(&mut self, value: Symbol, ty: TypeHash) -> Result<Symbol> {
        let from = value.ty();
        if from == ty {
            return Ok(value);
        }
        match (PrimitiveKind::from_hash(from), PrimitiveKind::from_hash(ty)) {
            (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                let node = self.load(value)?;
                return Ok(self.expression(Node::Convert { value: Box::new(node), to: b }, ty, "conversion"));
            }
            (None, None) => {}
            _ => return Err(self.invalid_cast(from, ty)),
        }

        if self.registry.is_assignable(from, ty) {
            let node = self.load(value)?;
            return Ok(self.expression(node, ty, "upcast"));
        }
        let related = self.registry.is_assignable(ty, from)
            || self.registry.type_entry(ty).is_some_and(|e| e.is_interface())
            || self.registry.type_entry(from).is_some_and(|e| e.is_interface());
        if !related || !self.registry.is_reference(ty) {
            return Err(self.invalid_cast(from, ty));
        }
        let node = self.load(value)?;
        Ok(self.put_intermediate(Node::CastClass { value: Box::new(node), to: ty }, ty, "cast"))
    }

    fn invalid_cast(&self, from: TypeHash, to: TypeHash) -> GenError {
        GenError::type_mismatch(format!(
            "cannot cast '{}' to '{}'",
            self.registry.type_name(from),
            self.registry.type_name(to)
        ))
    }

    /// Runtime type object for `ty`.
    pub fn type_of(&mut self, ty: TypeHash) -> Result<Symbol> {
        if self.registry.type_entry(ty).is_none() {
            return Err(GenError::UnknownType(ty));
        }
        Ok(self.expression(Node::TypeOf(ty), primitives::TYPE, "type object"))
    }

    // ==========================================================================
    // Delegates
    // ==========================================================================

    /// Bind instance method `name` of `target` to a delegate of type `ty`.
    pub fn delegate_to(&mut self, target: Symbol, name: &str, ty: TypeHash) -> Result<Symbol> {
        let owner = target.ty();
        let method = self.delegate_target(owner, name, ty, false)?;
        let target = self.take(target, owner)?;
        Ok(self.expression(
            Node::NewDelegate {
                ty,
                target: Box::new(target),
                method,
            },
            ty,
            "delegate",
        ))
    }

    /// Bind static method `name` of `owner` to a delegate of type `ty`.
    pub fn static_delegate(&mut self, owner: TypeHash, name: &str, ty: TypeHash) -> Result<Symbol> {
        let method = self.delegate_target(owner, name, ty, true)?;
        Ok(self.expression(
            Node::NewDelegate {
                ty,
                target: Box::new(Node::Const(Value::Null)),
                method,
            },
            ty,
            "delegate",
        ))
    }

    /// Method of `owner` named `name` whose signature matches delegate `ty`.
    pub(crate) fn delegate_target(&self, owner: TypeHash, name: &str, ty: TypeHash, is_static: bool) -> Result<TypeHash> {
        let invoke = self.registry.delegate_invoke(ty).ok_or_else(|| GenError::NotADelegate {
            ty: self.registry.type_name(ty),
        })?;
        let (params, return_type) = (invoke.param_types(), invoke.return_type);
        self.registry
            .methods_named(owner, name)
            .into_iter()
            .find(|m| m.is_static() == is_static && m.param_types() == params && m.return_type == return_type)
            .map(|m| m.id)
            .ok_or_else(|| GenError::MemberNotFound {
                owner: self.registry.type_name(owner),
                name: name.to_string(),
                arguments: format_types(&*self.registry, &params),
            })
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    /// Apply a binary operator.
    pub fn binary(&mut self, op: BinaryOp, left: Symbol, right: Symbol) -> Result<Symbol> {
        let resolution =
            resolve_binary(op, left.ty(), right.ty()).ok_or_else(|| GenError::OperatorTypeMismatch {
                op: op.to_string(),
                operands: format_types(&*self.registry, &[left.ty(), right.ty()]),
            })?;
        let left = widen(self.load(left)?, resolution.left_conversion);
        let right = widen(self.load(right)?, resolution.right_conversion);
        let node = Node::Apply {
            operands: vec![left, right],
            ops: resolution.ops,
        };
        Ok(self.expression(node, resolution.result_type, "operator"))
    }

    /// Apply a unary operator.
    pub fn unary(&mut self, op: UnaryOp, operand: Symbol) -> Result<Symbol> {
        let resolution = resolve_unary(op, operand.ty()).ok_or_else(|| GenError::OperatorTypeMismatch {
            op: op.to_string(),
            operands: format_types(&*self.registry, &[operand.ty()]),
        })?;
        let operand = widen(self.load(operand)?, resolution.conversion);
        let node = Node::Apply {
            operands: vec![operand],
            ops: resolution.ops,
        };
        Ok(self.expression(node, resolution.result_type, "operator"))
    }
}

fn dispatches_virtually(method: &MethodEntry) -> bool {
    method.is_virtual() || method.flags.contains(MethodFlags::DELEGATE_INVOKE)
}

fn widen(node: Node, to: Option<PrimitiveKind>) -> Node {
    match to {
        Some(to) => Node::Convert {
            value: Box::new(node),
            to,
        },
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use methodgen_core::bytecode::OpCode;
    use methodgen_core::{MethodFlags, TypeCatalog};
    use methodgen_registry::{MethodDef, TypeRegistry};

    use super::*;

    struct Fixture {
        registry: TypeRegistry,
        point: TypeHash,
        method: TypeHash,
    }

    fn fixture() -> Fixture {
        let mut registry = TypeRegistry::with_builtins();
        let point = registry.define_class("Point", None).unwrap();
        registry.add_field(point, "x", primitives::INT32).unwrap();
        registry.add_static_field(point, "count", primitives::INT32).unwrap();
        registry.add_constructor(point, vec![], methodgen_core::MethodImpl::DefaultConstructor).unwrap();
        registry
            .add_method(
                point,
                MethodDef::new("scale")
                    .param("by", primitives::INT32)
                    .returns(primitives::INT32)
                    .with_flags(MethodFlags::VIRTUAL),
            )
            .unwrap();
        let method = registry
            .add_method(point, MethodDef::new("run").returns(primitives::INT32))
            .unwrap();
        Fixture { registry, point, method }
    }

    fn body(registry: &TypeRegistry, method: TypeHash) -> &methodgen_core::bytecode::BytecodeChunk {
        registry.method(method).unwrap().bytecode().unwrap()
    }

    #[test]
    fn consumed_call_is_withdrawn_from_statement_position() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let this = g.this().unwrap();
        let two = g.constant(2i32);
        let scaled = g.call(this, "scale", &[two]).unwrap();
        g.ret_value(scaled).unwrap();
        g.flush().unwrap();

        body(&registry, method).assert_opcodes(&[OpCode::GetThis, OpCode::Constant, OpCode::CallVirtual, OpCode::Return]);
    }

    #[test]
    fn unconsumed_call_result_is_popped() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let this = g.this().unwrap();
        let two = g.constant(2i32);
        g.call(this, "scale", &[two]).unwrap();
        let zero = g.constant(0i32);
        g.ret_value(zero).unwrap();
        g.flush().unwrap();

        body(&registry, method).assert_opcodes(&[
            OpCode::GetThis,
            OpCode::Constant,
            OpCode::CallVirtual,
            OpCode::Pop,
            OpCode::PushZero,
            OpCode::Return,
        ]);
    }

    #[test]
    fn intermediate_is_consumed_once() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let a = g.constant(1i32);
        let b = g.constant(2i32);
        let sum = g.binary(BinaryOp::Add, a, b).unwrap();
        let _ = g.binary(BinaryOp::Add, sum, a).unwrap();
        assert!(matches!(
            g.binary(BinaryOp::Add, sum, a),
            Err(GenError::SymbolAlreadyConsumed { what: "operator", .. })
        ));
    }

    #[test]
    fn fields_and_static_fields() {
        let Fixture {
            mut registry,
            point,
            method,
        } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let this = g.this().unwrap();
        assert!(matches!(g.get_static(point, "x"), Err(GenError::StaticContext { .. })));
        let x = g.get(this, "x").unwrap();
        g.set_static(point, "count", x).unwrap();
        let count = g.get_static(point, "count").unwrap();
        g.ret_value(count).unwrap();
        g.flush().unwrap();

        body(&registry, method).assert_opcodes(&[
            OpCode::GetThis,
            OpCode::GetField,
            OpCode::SetStatic,
            OpCode::GetStatic,
            OpCode::Return,
        ]);
    }

    #[test]
    fn missing_member_is_reported() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let this = g.this().unwrap();
        assert!(matches!(g.get(this, "nope"), Err(GenError::MemberNotFound { .. })));
        assert!(matches!(g.call(this, "nope", &[]), Err(GenError::MemberNotFound { .. })));
    }

    #[test]
    fn instance_method_called_statically_needs_instance() {
        let Fixture {
            mut registry,
            point,
            method,
        } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let one = g.constant(1i32);
        assert!(matches!(
            g.call_static(point, "scale", &[one]),
            Err(GenError::StaticContext { .. })
        ));
    }

    #[test]
    fn operator_on_mismatched_types() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let s = g.constant("a");
        let n = g.constant(1i32);
        assert!(matches!(
            g.binary(BinaryOp::Add, s, n),
            Err(GenError::OperatorTypeMismatch { .. })
        ));
    }

    #[test]
    fn arrays() {
        let Fixture { mut registry, method, .. } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let len = g.constant(3i32);
        let array = g.new_array(primitives::INT32, len).unwrap();
        let local = g.declare_local(array.ty()).unwrap();
        g.assign(local, array).unwrap();
        let i = g.constant(0i32);
        let v = g.constant(9i8);
        g.set_element(local, i, v).unwrap();
        let i = g.constant(0i32);
        let read = g.element(local, i).unwrap();
        g.ret_value(read).unwrap();
        g.flush().unwrap();

        body(&registry, method).assert_contains_opcodes(&[
            OpCode::NewArray,
            OpCode::SetLocal,
            OpCode::Convert,
            OpCode::SetElement,
            OpCode::GetElement,
            OpCode::Return,
        ]);
    }

    #[test]
    fn casts() {
        let Fixture {
            mut registry,
            point,
            method,
        } = fixture();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let wide = g.constant(300i32);
        let narrow = g.cast(wide, primitives::UINT8).unwrap();
        assert_eq!(narrow.ty(), primitives::UINT8);

        let this = g.this().unwrap();
        let up = g.cast(this, primitives::OBJECT).unwrap();
        let down = g.cast(up, point).unwrap();
        assert_eq!(down.ty(), point);

        let text = g.constant("x");
        assert!(matches!(g.cast(text, primitives::INT32), Err(GenError::TypeMismatch { .. })));
    }

    #[test]
    fn delegate_binds_matching_method() {
        let Fixture { mut registry, method, .. } = fixture();
        let scale = registry
            .define_delegate("Scale", &[primitives::INT32], primitives::INT32)
            .unwrap();
        let mut g = MethodGenerator::new(&mut registry, method).unwrap();
        let this = g.this().unwrap();
        let d = g.delegate_to(this, "scale", scale).unwrap();
        assert_eq!(d.ty(), scale);
        let this = g.this().unwrap();
        assert!(matches!(
            g.delegate_to(this, "scale", primitives::INT32),
            Err(GenError::NotADelegate { .. })
        ));
    }
}
