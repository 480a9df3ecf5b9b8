//! Type catalog and shell builder for the method generator.
//!
//! [`TypeRegistry`] implements both [`TypeCatalog`](methodgen_core::TypeCatalog)
//! and [`ContainerBuilder`](methodgen_core::ContainerBuilder), so it can be
//! handed straight to a `MethodGenerator`.
//!
//! # Example
//!
//! ```
//! use methodgen_core::{TypeCatalog, primitives};
//! use methodgen_registry::{MethodDef, TypeRegistry};
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let point = registry.define_class("Point", None).unwrap();
//! registry.add_field(point, "x", primitives::INT32).unwrap();
//! registry
//!     .add_method(point, MethodDef::new("length").returns(primitives::DOUBLE))
//!     .unwrap();
//!
//! assert!(registry.find_field(point, "x").is_some());
//! assert!(registry.method_by_name(point, "length").is_some());
//! ```

mod builder;
mod method_def;
mod registry;

pub use method_def::MethodDef;
pub use registry::TypeRegistry;
