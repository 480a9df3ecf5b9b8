//! Integration tests for operator resolution and the arithmetic it emits.

mod common;

use common::*;
use methodgen::prelude::*;
use methodgen::{GenError, resolve_binary, resolve_unary};

/// Generate a static `op(a, b)` over the given operand types and return it.
fn binary_method(op: BinaryOp, left: TypeHash, right: TypeHash) -> (TypeRegistry, TypeHash) {
    let (mut registry, host) = host();
    let result = resolve_binary(op, left, right).expect("operator resolves").result_type;
    let method = declare_static(&mut registry, host, "op", &[("a", left), ("b", right)], result);

    let mut g = MethodGenerator::new(&mut registry, method).unwrap();
    let a = g.argument(0).unwrap();
    let b = g.argument(1).unwrap();
    let value = g.binary(op, a, b).unwrap();
    g.ret_value(value).unwrap();
    g.flush().unwrap();
    (registry, method)
}

fn eval(op: BinaryOp, left: Value, right: Value) -> Result<Option<Slot>, RuntimeError> {
    let (registry, method) = binary_method(op, left.type_hash(), right.type_hash());
    Vm::new(&registry).call_static(method, vec![Slot::Value(left), Slot::Value(right)])
}

fn eval_value(op: BinaryOp, left: Value, right: Value) -> Value {
    eval(op, left, right)
        .unwrap()
        .and_then(|slot| slot.as_value().cloned())
        .expect("value result")
}

// =============================================================================
// Comparison
// =============================================================================

#[test]
fn test_signed_comparison() {
    assert_eq!(eval_value(BinaryOp::GreaterThan, Value::Int32(-1), Value::Int32(0)), Value::Bool(false));
    assert_eq!(eval_value(BinaryOp::GreaterThan, Value::Int32(1), Value::Int32(0)), Value::Bool(true));
    assert_eq!(eval_value(BinaryOp::LessThan, Value::Int32(-1), Value::Int32(0)), Value::Bool(true));
    assert_eq!(eval_value(BinaryOp::LessOrEqual, Value::Int32(4), Value::Int32(4)), Value::Bool(true));
    assert_eq!(eval_value(BinaryOp::GreaterOrEqual, Value::Int32(3), Value::Int32(4)), Value::Bool(false));
}

#[test]
fn test_unsigned_comparison() {
    assert_eq!(
        eval_value(BinaryOp::GreaterThan, Value::Uint32(u32::MAX), Value::Uint32(0)),
        Value::Bool(true)
    );
    assert_eq!(
        eval_value(BinaryOp::LessOrEqual, Value::Uint32(u32::MAX), Value::Uint32(1)),
        Value::Bool(false)
    );
}

#[test]
fn test_comparison_with_nan_is_false() {
    let nan = Value::Double(f64::NAN);
    for op in [
        BinaryOp::LessThan,
        BinaryOp::GreaterThan,
        BinaryOp::LessOrEqual,
        BinaryOp::GreaterOrEqual,
    ] {
        assert_eq!(eval_value(op, nan.clone(), Value::Double(1.0)), Value::Bool(false), "{op}");
    }
    assert_eq!(eval_value(BinaryOp::NotEqual, nan.clone(), nan), Value::Bool(true));
}

#[test]
fn test_reference_equality() {
    let (mut registry, host) = host();
    let same = declare_static(
        &mut registry,
        host,
        "same",
        &[("a", primitives::EXCEPTION), ("b", primitives::EXCEPTION)],
        primitives::BOOL,
    );
    let mut g = MethodGenerator::new(&mut registry, same).unwrap();
    let a = g.argument(0).unwrap();
    let b = g.argument(1).unwrap();
    let eq = g.binary(BinaryOp::Equal, a, b).unwrap();
    g.ret_value(eq).unwrap();
    g.flush().unwrap();

    let ctor = registry
        .constructors(primitives::EXCEPTION)
        .first()
        .map(|c| c.id)
        .unwrap();
    let mut vm = Vm::new(&registry);
    let first = vm.construct(ctor, vec![]).unwrap();
    let second = vm.construct(ctor, vec![]).unwrap();
    let result = vm.call_static(same, vec![first.clone(), first.clone()]).unwrap();
    assert_eq!(result, Some(Slot::value(true)));
    let result = vm.call_static(same, vec![first, second]).unwrap();
    assert_eq!(result, Some(Slot::value(false)));
}

// =============================================================================
// Arithmetic and promotion
// =============================================================================

#[test]
fn test_mixed_small_operands_promote_to_int() {
    let result = eval_value(BinaryOp::Add, Value::Int8(-1), Value::Uint8(255));
    assert_eq!(result, Value::Int32(254));
}

#[test]
fn test_small_unsigned_operands_promote_to_uint() {
    let result = eval_value(BinaryOp::Add, Value::Uint8(200), Value::Uint8(100));
    assert_eq!(result, Value::Uint32(300));
}

#[test]
fn test_uint_with_int_promotes_to_long() {
    let result = eval_value(BinaryOp::Add, Value::Uint32(4_000_000_000), Value::Int32(-1));
    assert_eq!(result, Value::Int64(3_999_999_999));
}

#[test]
fn test_float_with_double_promotes_to_double() {
    let result = eval_value(BinaryOp::Multiply, Value::Float(1.5), Value::Double(2.0));
    assert_eq!(result, Value::Double(3.0));
}

#[test]
fn test_int_with_float_promotes_to_double() {
    let result = eval_value(BinaryOp::Add, Value::Int32(3), Value::Float(0.5));
    assert_eq!(result, Value::Double(3.5));
}

#[test]
fn test_wide_integers_of_mixed_sign_are_rejected() {
    let (mut registry, host) = host();
    let method = declare_static(
        &mut registry,
        host,
        "bad",
        &[("a", primitives::INT64), ("b", primitives::UINT64), ("d", primitives::DOUBLE)],
        primitives::VOID,
    );

    let mut g = MethodGenerator::new(&mut registry, method).unwrap();
    let a = g.argument(0).unwrap();
    let b = g.argument(1).unwrap();
    let d = g.argument(2).unwrap();
    assert!(matches!(
        g.binary(BinaryOp::Add, a, b),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
    assert!(matches!(
        g.binary(BinaryOp::GreaterThan, b, a),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
    assert!(matches!(
        g.binary(BinaryOp::Multiply, a, d),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
}

#[test]
fn test_signed_overflow_traps() {
    let err = eval(BinaryOp::Add, Value::Int32(i32::MAX), Value::Int32(1)).unwrap_err();
    assert_eq!(err, RuntimeError::Overflow);
}

#[test]
fn test_unsigned_underflow_traps() {
    let err = eval(BinaryOp::Subtract, Value::Uint32(0), Value::Uint32(1)).unwrap_err();
    assert_eq!(err, RuntimeError::Overflow);
}

#[test]
fn test_division_and_remainder() {
    assert_eq!(eval_value(BinaryOp::Divide, Value::Int32(-7), Value::Int32(2)), Value::Int32(-3));
    assert_eq!(eval_value(BinaryOp::Remainder, Value::Int32(-7), Value::Int32(2)), Value::Int32(-1));
    assert_eq!(
        eval_value(BinaryOp::Divide, Value::Uint32(u32::MAX), Value::Uint32(2)),
        Value::Uint32(u32::MAX / 2)
    );
    let err = eval(BinaryOp::Divide, Value::Int32(1), Value::Int32(0)).unwrap_err();
    assert_eq!(err, RuntimeError::DivideByZero);
}

#[test]
fn test_bitwise_and_logical() {
    assert_eq!(eval_value(BinaryOp::BitwiseAnd, Value::Int32(12), Value::Int32(10)), Value::Int32(8));
    assert_eq!(eval_value(BinaryOp::BitwiseOr, Value::Int32(12), Value::Int32(10)), Value::Int32(14));
    assert_eq!(eval_value(BinaryOp::BitwiseXor, Value::Int32(12), Value::Int32(10)), Value::Int32(6));
    assert_eq!(eval_value(BinaryOp::And, Value::Bool(true), Value::Bool(false)), Value::Bool(false));
    assert_eq!(eval_value(BinaryOp::Or, Value::Bool(true), Value::Bool(false)), Value::Bool(true));
}

// =============================================================================
// Unary
// =============================================================================

fn eval_unary(op: UnaryOp, operand: Value) -> Value {
    let (mut registry, host) = host();
    let ty = operand.type_hash();
    let result = resolve_unary(op, ty).expect("operator resolves").result_type;
    let method = declare_static(&mut registry, host, "op", &[("v", ty)], result);

    let mut g = MethodGenerator::new(&mut registry, method).unwrap();
    let v = g.argument(0).unwrap();
    let value = g.unary(op, v).unwrap();
    g.ret_value(value).unwrap();
    g.flush().unwrap();

    run(&registry, method, vec![Slot::Value(operand)])
        .and_then(|slot| slot.as_value().cloned())
        .expect("value result")
}

#[test]
fn test_unary_operators() {
    assert_eq!(eval_unary(UnaryOp::Not, Value::Bool(true)), Value::Bool(false));
    assert_eq!(eval_unary(UnaryOp::Negate, Value::Int32(5)), Value::Int32(-5));
    assert_eq!(eval_unary(UnaryOp::Negate, Value::Uint32(5)), Value::Int64(-5));
    assert_eq!(eval_unary(UnaryOp::Negate, Value::Double(2.5)), Value::Double(-2.5));
    assert_eq!(eval_unary(UnaryOp::BitwiseNot, Value::Int32(0)), Value::Int32(-1));
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_mismatched_operands_are_rejected() {
    let (mut registry, host) = host();
    let method = declare_static(
        &mut registry,
        host,
        "bad",
        &[("flag", primitives::BOOL), ("n", primitives::INT32), ("s", primitives::STRING)],
        primitives::VOID,
    );

    let mut g = MethodGenerator::new(&mut registry, method).unwrap();
    let flag = g.argument(0).unwrap();
    let n = g.argument(1).unwrap();
    let s = g.argument(2).unwrap();
    assert!(matches!(
        g.binary(BinaryOp::Add, flag, n),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
    assert!(matches!(
        g.binary(BinaryOp::Add, s, n),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
    assert!(matches!(
        g.binary(BinaryOp::Equal, s, n),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
    assert!(matches!(
        g.unary(UnaryOp::Negate, flag),
        Err(GenError::OperatorTypeMismatch { .. })
    ));
}

#[test]
fn test_resolution_is_deterministic() {
    let types = [
        primitives::INT8,
        primitives::UINT8,
        primitives::INT32,
        primitives::UINT32,
        primitives::INT64,
        primitives::UINT64,
        primitives::FLOAT,
        primitives::DOUBLE,
        primitives::BOOL,
    ];
    for op in BinaryOp::ALL {
        for &left in &types {
            for &right in &types {
                assert_eq!(resolve_binary(op, left, right), resolve_binary(op, left, right));
            }
        }
    }
}

#[test]
fn test_operands_of_unrelated_classes_compare_by_reference() {
    let mut registry = TypeRegistry::with_builtins();
    let a = registry.define_class("A", None).unwrap();
    let b = registry.define_class("B", None).unwrap();
    let resolved = resolve_binary(BinaryOp::Equal, a, b).expect("reference equality");
    assert_eq!(resolved.result_type, primitives::BOOL);
    assert!(resolve_binary(BinaryOp::Add, a, b).is_none());
}
