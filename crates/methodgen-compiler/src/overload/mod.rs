//! Overload resolution for member calls.
//!
//! Selects the best method among same-named candidates for a list of
//! argument types.
//!
//! ## Algorithm
//!
//! 1. Filter candidates by argument count, allowing trailing parameters
//!    with default values to be omitted
//! 2. Match each argument against its parameter, unifying generic
//!    parameters through a per-call substitution map
//! 3. Sum the conversion cost of every argument (and each default used)
//! 4. Rank viable candidates and report ambiguity when the best cost ties

mod ranking;

pub use ranking::find_best_match;

use rustc_hash::FxHashMap;

use methodgen_core::{GenError, MethodEntry, PrimitiveKind, Result, TypeCatalog, TypeHash, Value, primitives};

/// Conversion costs, lower is better.
pub mod cost {
    pub const EXACT: u32 = 0;
    pub const WIDENING: u32 = 1;
    pub const UPCAST: u32 = 2;
    pub const GENERIC: u32 = 3;
    pub const DEFAULT_ARG: u32 = 1;
}

/// Result of successful overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    pub method: TypeHash,
    /// Parameter types for the supplied arguments, generics substituted.
    pub param_types: Vec<TypeHash>,
    /// Values for omitted trailing parameters.
    pub defaults: Vec<Value>,
    /// Return type with generics substituted.
    pub return_type: TypeHash,
    pub total_cost: u32,
}

/// Resolve a call of `name` on `owner` with the given argument types.
///
/// # Returns
///
/// * `Ok(OverloadMatch)` - the unique best candidate
/// * `Err(GenError::MemberNotFound)` - no candidate accepts the arguments
/// * `Err(GenError::AmbiguousOverload)` - several candidates tie
pub fn resolve_overload<C: TypeCatalog + ?Sized>(
    catalog: &C,
    candidates: &[TypeHash],
    arg_types: &[TypeHash],
    owner: TypeHash,
    name: &str,
) -> Result<OverloadMatch> {
    let viable: Vec<OverloadMatch> = candidates
        .iter()
        .filter_map(|id| catalog.method(*id))
        .filter_map(|method| try_match(catalog, method, arg_types))
        .collect();

    if viable.is_empty() {
        return Err(GenError::MemberNotFound {
            owner: catalog.type_name(owner),
            name: name.to_string(),
            arguments: format_types(catalog, arg_types),
        });
    }

    find_best_match(catalog, &viable, owner, name)
}

/// Check a call of one known method against the argument types.
///
/// Generic parameters are unified and omitted defaults filled exactly as in
/// [`resolve_overload`], but a mismatch is a `TypeMismatch` on that method
/// rather than a failed lookup.
pub fn match_signature<C: TypeCatalog + ?Sized>(catalog: &C, method: TypeHash, arg_types: &[TypeHash]) -> Result<OverloadMatch> {
    let entry = catalog
        .method(method)
        .ok_or(methodgen_core::RegistrationError::UnknownMethod(method))?;
    try_match(catalog, entry, arg_types).ok_or_else(|| {
        GenError::type_mismatch(format!(
            "'{}.{}({})' cannot take ({})",
            catalog.type_name(entry.owner),
            entry.name,
            format_types(catalog, &entry.param_types()),
            format_types(catalog, arg_types)
        ))
    })
}

/// Match one candidate, returning `None` if it cannot accept the arguments.
fn try_match<C: TypeCatalog + ?Sized>(catalog: &C, method: &MethodEntry, arg_types: &[TypeHash]) -> Option<OverloadMatch> {
    if arg_types.len() < method.required_params() || arg_types.len() > method.params.len() {
        return None;
    }

    let mut bindings: FxHashMap<TypeHash, TypeHash> = FxHashMap::default();
    let mut total_cost = 0;

    for (param, &arg) in method.params.iter().zip(arg_types) {
        if method.generic_params.contains(&param.ty) {
            total_cost += cost::GENERIC;
            let bound = match bindings.get(&param.ty) {
                None => arg,
                Some(&previous) => catalog.common_ancestor(previous, arg)?,
            };
            if !satisfies_constraints(catalog, param.ty, bound) {
                return None;
            }
            bindings.insert(param.ty, bound);
        } else {
            total_cost += conversion_cost(catalog, arg, param.ty)?;
        }
    }

    let defaults: Vec<Value> = method.params[arg_types.len()..]
        .iter()
        .map(|param| param.default.clone())
        .collect::<Option<_>>()?;
    total_cost += cost::DEFAULT_ARG * defaults.len() as u32;

    let substitute = |ty: TypeHash| bindings.get(&ty).copied().unwrap_or(ty);

    // A generic return type with no binding cannot be typed.
    let return_type = substitute(method.return_type);
    if method.generic_params.contains(&return_type) {
        return None;
    }

    Some(OverloadMatch {
        method: method.id,
        param_types: method.params[..arg_types.len()].iter().map(|p| substitute(p.ty)).collect(),
        defaults,
        return_type,
        total_cost,
    })
}

fn satisfies_constraints<C: TypeCatalog + ?Sized>(catalog: &C, param: TypeHash, ty: TypeHash) -> bool {
    if ty == primitives::VOID {
        return false;
    }
    catalog
        .generic_param(param)
        .is_none_or(|entry| entry.constraints.iter().all(|c| catalog.is_assignable(ty, *c)))
}

/// Cost of passing `arg` where `param` is expected.
pub fn conversion_cost<C: TypeCatalog + ?Sized>(catalog: &C, arg: TypeHash, param: TypeHash) -> Option<u32> {
    if arg == param {
        return Some(cost::EXACT);
    }
    if !catalog.is_assignable(arg, param) {
        return None;
    }
    if PrimitiveKind::from_hash(arg).is_some() {
        Some(cost::WIDENING)
    } else {
        Some(cost::UPCAST)
    }
}

pub(crate) fn format_types<C: TypeCatalog + ?Sized>(catalog: &C, types: &[TypeHash]) -> String {
    types
        .iter()
        .map(|ty| catalog.type_name(*ty))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodgen_registry::{MethodDef, TypeRegistry};

    fn candidates(registry: &TypeRegistry, owner: TypeHash, name: &str) -> Vec<TypeHash> {
        registry.methods_named(owner, name).iter().map(|m| m.id).collect()
    }

    #[test]
    fn exact_match_beats_widening() {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Printer", None).unwrap();
        let int_id = registry
            .add_method(owner, MethodDef::new("print").param("v", primitives::INT32))
            .unwrap();
        registry
            .add_method(owner, MethodDef::new("print").param("v", primitives::INT64))
            .unwrap();

        let found = resolve_overload(
            &registry,
            &candidates(&registry, owner, "print"),
            &[primitives::INT32],
            owner,
            "print",
        )
        .unwrap();
        assert_eq!(found.method, int_id);
        assert_eq!(found.total_cost, cost::EXACT);
    }

    #[test]
    fn more_specific_widening_wins_tie() {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Printer", None).unwrap();
        let int_id = registry
            .add_method(owner, MethodDef::new("print").param("v", primitives::INT32))
            .unwrap();
        registry
            .add_method(owner, MethodDef::new("print").param("v", primitives::INT64))
            .unwrap();

        let found = resolve_overload(
            &registry,
            &candidates(&registry, owner, "print"),
            &[primitives::INT16],
            owner,
            "print",
        )
        .unwrap();
        assert_eq!(found.method, int_id);
    }

    #[test]
    fn defaults_fill_omitted_arguments() {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Math", None).unwrap();
        registry
            .add_method(
                owner,
                MethodDef::new("round")
                    .param("value", primitives::DOUBLE)
                    .param_with_default("digits", primitives::INT32, 2i32)
                    .returns(primitives::DOUBLE),
            )
            .unwrap();

        let found = resolve_overload(
            &registry,
            &candidates(&registry, owner, "round"),
            &[primitives::DOUBLE],
            owner,
            "round",
        )
        .unwrap();
        assert_eq!(found.defaults, vec![Value::Int32(2)]);
        assert_eq!(found.total_cost, cost::DEFAULT_ARG);
    }

    #[test]
    fn missing_required_argument_is_not_found() {
        let mut registry = TypeRegistry::with_builtins();
        let owner = registry.define_class("Math", None).unwrap();
        registry
            .add_method(owner, MethodDef::new("abs").param("v", primitives::INT32))
            .unwrap();

        let err = resolve_overload(&registry, &candidates(&registry, owner, "abs"), &[], owner, "abs").unwrap_err();
        assert!(matches!(err, GenError::MemberNotFound { .. }));
    }

    #[test]
    fn generic_parameters_unify_to_common_ancestor() {
        let mut registry = TypeRegistry::with_builtins();
        let shape = registry.define_class("Shape", None).unwrap();
        let circle = registry.define_class("Circle", Some(shape)).unwrap();
        let square = registry.define_class("Square", Some(shape)).unwrap();
        let t = registry.define_generic_param("T", &[]);
        let util = registry.define_class("Util", None).unwrap();
        registry
            .add_method(
                util,
                MethodDef::new("pick")
                    .generic(t)
                    .param("a", t)
                    .param("b", t)
                    .returns(t)
                    .static_method(),
            )
            .unwrap();

        let found = resolve_overload(
            &registry,
            &candidates(&registry, util, "pick"),
            &[circle, square],
            util,
            "pick",
        )
        .unwrap();
        assert_eq!(found.return_type, shape);
        assert_eq!(found.param_types, vec![shape, shape]);
        assert_eq!(found.total_cost, 2 * cost::GENERIC);
    }

    #[test]
    fn generic_constraints_are_checked() {
        let mut registry = TypeRegistry::with_builtins();
        let t = registry.define_generic_param("TError", &[primitives::EXCEPTION]);
        let util = registry.define_class("Util", None).unwrap();
        registry
            .add_method(util, MethodDef::new("raise").generic(t).param("e", t).static_method())
            .unwrap();
        let ids = candidates(&registry, util, "raise");

        assert!(resolve_overload(&registry, &ids, &[primitives::INVALID_STATE], util, "raise").is_ok());
        assert!(resolve_overload(&registry, &ids, &[primitives::STRING], util, "raise").is_err());
    }

    #[test]
    fn equal_cost_candidates_are_ambiguous() {
        let mut registry = TypeRegistry::with_builtins();
        let a = registry.define_interface("A", &[]).unwrap();
        let b = registry.define_interface("B", &[]).unwrap();
        let both = registry.define_class("Both", None).unwrap();
        registry.add_interface(both, a).unwrap();
        registry.add_interface(both, b).unwrap();
        let owner = registry.define_class("Sink", None).unwrap();
        registry.add_method(owner, MethodDef::new("put").param("v", a)).unwrap();
        registry.add_method(owner, MethodDef::new("put").param("v", b)).unwrap();

        let err = resolve_overload(&registry, &candidates(&registry, owner, "put"), &[both], owner, "put").unwrap_err();
        assert!(matches!(err, GenError::AmbiguousOverload { .. }));
    }

    #[test]
    fn known_method_is_matched_without_ranking() {
        let mut registry = TypeRegistry::with_builtins();
        let a = registry.define_interface("A", &[]).unwrap();
        let b = registry.define_interface("B", &[]).unwrap();
        let both = registry.define_class("Both", None).unwrap();
        registry.add_interface(both, a).unwrap();
        registry.add_interface(both, b).unwrap();
        let owner = registry.define_class("Sink", None).unwrap();
        registry.add_method(owner, MethodDef::new("put").param("v", a)).unwrap();
        let put_b = registry.add_method(owner, MethodDef::new("put").param("v", b)).unwrap();

        let found = match_signature(&registry, put_b, &[both]).unwrap();
        assert_eq!(found.method, put_b);
        assert_eq!(found.param_types, vec![b]);

        let err = match_signature(&registry, put_b, &[primitives::INT32]).unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }));
        let err = match_signature(&registry, put_b, &[]).unwrap_err();
        assert!(matches!(err, GenError::TypeMismatch { .. }));
    }
}
