//! Integration tests for iterator lowering.
//!
//! Each iterator is authored as a straight-line body with yields, flushed,
//! and then driven through its generated enumerable and enumerator.

mod common;

use common::*;
use methodgen::prelude::*;
use methodgen::{GenError, MethodImpl};

/// `range(n)`: yields 0, 1, .., n - 1.
fn define_range(registry: &mut TypeRegistry, host: TypeHash) -> TypeHash {
    let mut g = MethodGenerator::iterator(
        registry,
        host,
        "range",
        primitives::INT32,
        vec![ParamEntry::new("n", primitives::INT32)],
        MethodFlags::STATIC,
    )
    .unwrap();
    let n = g.argument(0).unwrap();
    let i = g.declare_local(primitives::INT32).unwrap();
    let zero = g.constant(0i32);
    g.assign(i, zero).unwrap();
    let block = g.begin_loop().unwrap();
    let done = g.binary(BinaryOp::GreaterOrEqual, i, n).unwrap();
    block.break_if(&mut g, done).unwrap();
    g.yield_return(i).unwrap();
    let one = g.constant(1i32);
    let next = g.binary(BinaryOp::Add, i, one).unwrap();
    g.assign(i, next).unwrap();
    block.end(&mut g).unwrap();
    g.flush().unwrap()
}

/// `three()`: yields 10, 20, 30.
fn define_three(registry: &mut TypeRegistry, host: TypeHash) -> TypeHash {
    let mut g = MethodGenerator::iterator(registry, host, "three", primitives::INT32, vec![], MethodFlags::STATIC)
        .unwrap();
    for value in [10i32, 20, 30] {
        let c = g.constant(value);
        g.yield_return(c).unwrap();
    }
    g.flush().unwrap()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_range_yields_in_order() {
    let (mut registry, host) = host();
    let range = define_range(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(range, vec![int(5)]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&sequence).unwrap()), vec![0, 1, 2, 3, 4]);

    let empty = vm.call_static(range, vec![int(0)]).unwrap().expect("enumerable");
    assert!(vm.collect_sequence(&empty).unwrap().is_empty());
}

#[test]
fn test_enumerable_can_be_walked_twice() {
    let (mut registry, host) = host();
    let range = define_range(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(range, vec![int(3)]).unwrap().expect("enumerable");
    let first = ints(&vm.collect_sequence(&sequence).unwrap());
    let second = ints(&vm.collect_sequence(&sequence).unwrap());
    assert_eq!(first, vec![0, 1, 2]);
    assert_eq!(first, second);
}

#[test]
fn test_explicit_yields() {
    let (mut registry, host) = host();
    let three = define_three(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(three, vec![]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&sequence).unwrap()), vec![10, 20, 30]);
}

#[test]
fn test_interleaved_enumerators_are_independent() {
    let (mut registry, host) = host();
    let three = define_three(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(three, vec![]).unwrap().expect("enumerable");
    let a = vm.call_named(&sequence, "get_enumerator", vec![]).unwrap().expect("enumerator");
    let b = vm.call_named(&sequence, "get_enumerator", vec![]).unwrap().expect("enumerator");

    assert!(vm.move_next(&a).unwrap());
    assert_eq!(vm.current(&a).unwrap(), int(10));
    assert!(vm.move_next(&a).unwrap());
    assert!(vm.move_next(&b).unwrap());
    assert_eq!(vm.current(&b).unwrap(), int(10));
    assert_eq!(vm.current(&a).unwrap(), int(20));
    assert!(vm.move_next(&a).unwrap());
    assert_eq!(vm.current(&a).unwrap(), int(30));
    assert!(!vm.move_next(&a).unwrap());
    assert!(vm.move_next(&b).unwrap());
    assert_eq!(vm.current(&b).unwrap(), int(20));
}

// =============================================================================
// Enumerator state
// =============================================================================

#[test]
fn test_current_before_move_next_throws() {
    let (mut registry, host) = host();
    let three = define_three(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(three, vec![]).unwrap().expect("enumerable");
    let enumerator = vm.call_named(&sequence, "get_enumerator", vec![]).unwrap().expect("enumerator");
    let err = vm.current(&enumerator).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Thrown { ref type_name, .. } if type_name == "InvalidStateException"
    ));
}

#[test]
fn test_exhausted_enumerator_stays_exhausted() {
    let (mut registry, host) = host();
    let range = define_range(&mut registry, host);

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(range, vec![int(1)]).unwrap().expect("enumerable");
    let enumerator = vm.call_named(&sequence, "get_enumerator", vec![]).unwrap().expect("enumerator");
    assert!(vm.move_next(&enumerator).unwrap());
    assert!(!vm.move_next(&enumerator).unwrap());
    assert!(!vm.move_next(&enumerator).unwrap());
    assert!(!vm.move_next(&enumerator).unwrap());
}

#[test]
fn test_yield_break_ends_sequence_early() {
    let (mut registry, host) = host();
    let mut g = MethodGenerator::iterator(
        &mut registry,
        host,
        "maybe",
        primitives::INT32,
        vec![ParamEntry::new("stop", primitives::BOOL)],
        MethodFlags::STATIC,
    )
    .unwrap();
    let one = g.constant(1i32);
    g.yield_return(one).unwrap();
    let stop = g.argument(0).unwrap();
    let block = g.begin_if(stop).unwrap();
    g.yield_break().unwrap();
    block.end(&mut g).unwrap();
    let two = g.constant(2i32);
    g.ret_value(two).unwrap();
    let maybe = g.flush().unwrap();

    let mut vm = Vm::new(&registry);
    let stopped = vm.call_static(maybe, vec![Slot::value(true)]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&stopped).unwrap()), vec![1]);
    let full = vm.call_static(maybe, vec![Slot::value(false)]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&full).unwrap()), vec![1, 2]);
}

#[test]
fn test_locals_survive_suspension() {
    let (mut registry, host) = host();
    let mut g = MethodGenerator::iterator(
        &mut registry,
        host,
        "running_total",
        primitives::INT32,
        vec![ParamEntry::new("step", primitives::INT32)],
        MethodFlags::STATIC,
    )
    .unwrap();
    let step = g.argument(0).unwrap();
    let total = g.declare_local(primitives::INT32).unwrap();
    for _ in 0..3 {
        let next = g.binary(BinaryOp::Add, total, step).unwrap();
        g.assign(total, next).unwrap();
        g.yield_return(total).unwrap();
    }
    let running_total = g.flush().unwrap();

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(running_total, vec![int(4)]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&sequence).unwrap()), vec![4, 8, 12]);
}

#[test]
fn test_instance_iterator_reads_receiver() {
    let mut registry = TypeRegistry::with_builtins();
    let bag = registry.define_class("Bag", None).unwrap();
    registry.add_field(bag, "size", primitives::INT32).unwrap();
    let ctor = registry.add_constructor(bag, vec![], MethodImpl::DefaultConstructor).unwrap();
    let resize = declare_instance(&mut registry, bag, "resize", &[("n", primitives::INT32)], primitives::VOID);

    let mut g = MethodGenerator::new(&mut registry, resize).unwrap();
    let this = g.this().unwrap();
    let n = g.argument(0).unwrap();
    g.set(this, "size", n).unwrap();
    g.flush().unwrap();

    let mut g = MethodGenerator::iterator(&mut registry, bag, "doubled", primitives::INT32, vec![], MethodFlags::empty())
        .unwrap();
    let this = g.this().unwrap();
    let size = g.get(this, "size").unwrap();
    let keep = g.declare_local(primitives::INT32).unwrap();
    g.assign(keep, size).unwrap();
    g.yield_return(keep).unwrap();
    let two = g.constant(2i32);
    let twice = g.binary(BinaryOp::Multiply, keep, two).unwrap();
    g.yield_return(twice).unwrap();
    let doubled = g.flush().unwrap();

    let mut vm = Vm::new(&registry);
    let instance = vm.construct(ctor, vec![]).unwrap();
    vm.call_method(&instance, resize, vec![int(3)]).unwrap();
    let sequence = vm.call_method(&instance, doubled, vec![]).unwrap().expect("enumerable");
    assert_eq!(ints(&vm.collect_sequence(&sequence).unwrap()), vec![3, 6]);
}

// =============================================================================
// Foreach
// =============================================================================

#[test]
fn test_foreach_over_generated_iterator() {
    let (mut registry, host) = host();
    let range = define_range(&mut registry, host);
    let (enumerable, _) = registry.sequence_types(primitives::INT32);
    let sum = declare_static(&mut registry, host, "sum", &[("items", enumerable)], primitives::INT32);

    let mut g = MethodGenerator::new(&mut registry, sum).unwrap();
    let items = g.argument(0).unwrap();
    let total = g.declare_local(primitives::INT32).unwrap();
    let (block, item) = g.begin_foreach(items).unwrap();
    let next = g.binary(BinaryOp::Add, total, item).unwrap();
    g.assign(total, next).unwrap();
    block.end(&mut g).unwrap();
    g.ret_value(total).unwrap();
    g.flush().unwrap();

    let mut vm = Vm::new(&registry);
    let sequence = vm.call_static(range, vec![int(5)]).unwrap().expect("enumerable");
    let result = vm.call_static(sum, vec![sequence]).unwrap().and_then(|s| s.as_i64());
    assert_eq!(result, Some(10));
}

// =============================================================================
// Shells and errors
// =============================================================================

#[test]
fn test_shells_are_named_after_method() {
    let (mut registry, host) = host();
    define_range(&mut registry, host);

    assert!(registry.get_by_name("Host.<>rangeEnumerable").is_some());
    assert!(registry.get_by_name("Host.<>rangeEnumerator").is_some());
}

#[test]
fn test_yield_outside_iterator_is_rejected() {
    let (mut registry, host) = host();
    let method = declare_static(&mut registry, host, "plain", &[], primitives::VOID);

    let mut g = MethodGenerator::new(&mut registry, method).unwrap();
    let one = g.constant(1i32);
    assert!(matches!(g.yield_return(one), Err(GenError::NotAnIterator)));
    assert!(matches!(g.yield_break(), Err(GenError::NotAnIterator)));
}

#[test]
fn test_yield_inside_lambda_is_rejected() {
    let (mut registry, host) = host();
    let mut g = MethodGenerator::iterator(&mut registry, host, "nested", primitives::INT32, vec![], MethodFlags::STATIC)
        .unwrap();
    let _lambda = g.begin_lambda(primitives::VOID, &[]).unwrap();
    let one = g.constant(1i32);
    assert!(matches!(g.yield_return(one), Err(GenError::NotAnIterator)));
}

#[test]
fn test_yielded_value_must_match_element() {
    let (mut registry, host) = host();
    let mut g = MethodGenerator::iterator(&mut registry, host, "wrong", primitives::INT32, vec![], MethodFlags::STATIC)
        .unwrap();
    let text = g.constant("text");
    assert!(matches!(g.yield_return(text), Err(GenError::TypeMismatch { .. })));
}
