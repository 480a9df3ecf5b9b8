//! Constant pool for generated chunks.
//!
//! The constant pool stores literals and member identities referenced by
//! bytecode operands.

use rustc_hash::FxHashMap;

use crate::{TypeHash, Value};

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// A typed literal.
    Value(Value),
    /// Identity of a type, method, constructor or field.
    TypeHash(TypeHash),
}

/// Per-chunk constant pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

/// Hashable form of a constant. Floats are keyed by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(u32),
    Double(u64),
    String(String),
    TypeHash(TypeHash),
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = Self::to_key(&constant);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_value(&mut self, value: Value) -> u32 {
        self.add(Constant::Value(value))
    }

    pub fn add_type_hash(&mut self, hash: TypeHash) -> u32 {
        self.add(Constant::TypeHash(hash))
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Whether the pool references the given identity.
    pub fn contains_hash(&self, hash: TypeHash) -> bool {
        self.index.contains_key(&ConstantKey::TypeHash(hash))
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn to_key(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::TypeHash(h) => ConstantKey::TypeHash(*h),
            Constant::Value(value) => match value {
                Value::Null => ConstantKey::Null,
                Value::Bool(v) => ConstantKey::Bool(*v),
                Value::Int8(v) => ConstantKey::Int8(*v),
                Value::Int16(v) => ConstantKey::Int16(*v),
                Value::Int32(v) => ConstantKey::Int32(*v),
                Value::Int64(v) => ConstantKey::Int64(*v),
                Value::Uint8(v) => ConstantKey::Uint8(*v),
                Value::Uint16(v) => ConstantKey::Uint16(*v),
                Value::Uint32(v) => ConstantKey::Uint32(*v),
                Value::Uint64(v) => ConstantKey::Uint64(*v),
                Value::Float(v) => ConstantKey::Float(v.to_bits()),
                Value::Double(v) => ConstantKey::Double(v.to_bits()),
                Value::String(s) => ConstantKey::String(s.clone()),
            },
        }
    }
}
