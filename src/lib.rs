//! Method body authoring and lowering.
//!
//! `methodgen` ties together the catalog ([`TypeRegistry`]), the generator
//! ([`MethodGenerator`]) and a small interpreter ([`vm::Vm`]) that runs what
//! the generator produces.
//!
//! # Example
//!
//! ```
//! use methodgen::prelude::*;
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let math = registry.define_class("Math", None).unwrap();
//! let twice = registry
//!     .add_method(
//!         math,
//!         MethodDef::new("twice")
//!             .param("x", primitives::INT32)
//!             .returns(primitives::INT32)
//!             .static_method(),
//!     )
//!     .unwrap();
//!
//! let mut g = MethodGenerator::new(&mut registry, twice).unwrap();
//! let x = g.argument(0).unwrap();
//! let sum = g.binary(BinaryOp::Add, x, x).unwrap();
//! g.ret_value(sum).unwrap();
//! g.flush().unwrap();
//!
//! let mut vm = Vm::new(&registry);
//! let result = vm.call_static(twice, vec![Slot::value(21i32)]).unwrap();
//! assert_eq!(result, Some(Slot::value(42i32)));
//! ```

pub mod vm;

pub use methodgen_compiler::*;
pub use methodgen_core::{
    ContainerBuilder, GenError, MethodEntry, MethodFlags, MethodImpl, ParamEntry, PrimitiveKind, PropertyEntry,
    RegistrationError, TypeCatalog, TypeHash, TypeSystem, Value, bytecode, primitives,
};
pub use methodgen_registry::{MethodDef, TypeRegistry};

pub mod prelude {
    pub use crate::vm::{RuntimeError, Slot, Vm};
    pub use methodgen_compiler::{
        BinaryOp, GeneratorConfig, IfBlock, LambdaBlock, LoopBlock, MethodGenerator, Symbol, UnaryOp,
    };
    pub use methodgen_core::{
        ContainerBuilder, GenError, MethodFlags, ParamEntry, TypeCatalog, TypeHash, Value, primitives,
    };
    pub use methodgen_registry::{MethodDef, TypeRegistry};
}
