//! Core types shared by the methodgen crates.
//!
//! This crate holds everything both sides of the generator agree on:
//!
//! - [`TypeHash`] identities and the built-in [`primitives`]
//! - [`PrimitiveKind`] and literal [`Value`]s
//! - catalog entries ([`TypeEntry`], [`MethodEntry`], [`FieldEntry`], ...)
//! - the instruction stream ([`bytecode`])
//! - the [`TypeCatalog`] and [`ContainerBuilder`] capabilities
//! - the error taxonomy ([`GenError`], [`RegistrationError`])

pub mod bytecode;
mod catalog;
mod entries;
mod error;
mod primitive_kind;
mod type_hash;
mod value;

pub use catalog::{ContainerBuilder, TypeCatalog, TypeSystem};
pub use entries::{
    FieldEntry, GenericParamEntry, MethodEntry, MethodFlags, MethodImpl, NativeFn, ParamEntry, PropertyEntry,
    TypeEntry, TypeFlags,
};
pub use error::{GenError, RegistrationError, Result};
pub use primitive_kind::{PrimitiveKind, Signedness};
pub use type_hash::{TypeHash, hash_constants, primitives};
pub use value::Value;
