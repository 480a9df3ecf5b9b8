//! Shared helpers for the integration tests.

#![allow(dead_code)]

use methodgen::prelude::*;

/// A registry with an empty `Host` class to hang generated methods on.
pub fn host() -> (TypeRegistry, TypeHash) {
    let mut registry = TypeRegistry::with_builtins();
    let host = registry.define_class("Host", None).expect("Host class");
    (registry, host)
}

/// Declare a static stub on `owner` to generate a body for.
pub fn declare_static(
    registry: &mut TypeRegistry,
    owner: TypeHash,
    name: &str,
    params: &[(&str, TypeHash)],
    returns: TypeHash,
) -> TypeHash {
    let def = params
        .iter()
        .fold(MethodDef::new(name), |def, (param, ty)| def.param(*param, *ty))
        .returns(returns)
        .static_method();
    registry.add_method(owner, def).expect("declare method")
}

/// Declare an instance stub on `owner`.
pub fn declare_instance(
    registry: &mut TypeRegistry,
    owner: TypeHash,
    name: &str,
    params: &[(&str, TypeHash)],
    returns: TypeHash,
) -> TypeHash {
    let def = params
        .iter()
        .fold(MethodDef::new(name), |def, (param, ty)| def.param(*param, *ty))
        .returns(returns);
    registry.add_method(owner, def).expect("declare method")
}

/// Run a static method and return its result.
pub fn run(registry: &TypeRegistry, method: TypeHash, args: Vec<Slot>) -> Option<Slot> {
    Vm::new(registry)
        .call_static(method, args)
        .unwrap_or_else(|e| panic!("execution failed: {e}"))
}

/// Run a static method expected to return an `int`.
pub fn run_int(registry: &TypeRegistry, method: TypeHash, args: Vec<Slot>) -> i64 {
    run(registry, method, args)
        .and_then(|slot| slot.as_i64())
        .expect("integer result")
}

/// Run a static method expected to return a `bool`.
pub fn run_bool(registry: &TypeRegistry, method: TypeHash, args: Vec<Slot>) -> bool {
    run(registry, method, args)
        .and_then(|slot| slot.as_bool())
        .expect("bool result")
}

pub fn int(value: i32) -> Slot {
    Slot::value(value)
}

/// Integer values of a collected sequence.
pub fn ints(items: &[Slot]) -> Vec<i64> {
    items
        .iter()
        .map(|slot| slot.as_i64().expect("integer element"))
        .collect()
}
