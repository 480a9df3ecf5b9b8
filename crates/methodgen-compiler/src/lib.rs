//! Method body authoring and lowering.
//!
//! A [`MethodGenerator`] records a method body as a tree of deferred
//! instruction nodes and writes it as bytecode on [`flush`]. Along the way it
//! lowers three constructs the target engine has no notion of:
//!
//! - **lambdas** ([`LambdaBlock`]) become generated closure shells whose
//!   fields hold the captured storage, with relay fields for nested lambdas;
//! - **iterator methods** ([`MethodGenerator::iterator`]) become an
//!   enumerable / enumerator shell pair driven by a state machine;
//! - **operators** ([`BinaryOp`], [`UnaryOp`]) resolve through a fixed
//!   numeric promotion table.
//!
//! Overloaded calls are resolved by conversion cost ([`resolve_overload`]),
//! including unification of generic parameters.
//!
//! [`flush`]: MethodGenerator::flush

mod blocks;
mod closure;
mod config;
mod emit;
mod generator;
mod iterator;
mod members;
mod node;
mod operators;
mod overload;
mod sequencer;
mod symbol;

pub use blocks::{IfBlock, LambdaBlock, LoopBlock};
pub use config::GeneratorConfig;
pub use generator::MethodGenerator;
pub use operators::{BinaryOp, BinaryResolution, UnaryOp, UnaryResolution, resolve_binary, resolve_unary};
pub use overload::{OverloadMatch, conversion_cost, cost, find_best_match, match_signature, resolve_overload};
pub use symbol::Symbol;
