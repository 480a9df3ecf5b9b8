//! Deterministic hash-based identity for types, methods, constructors and fields.
//!
//! Every entity the generator talks about is named by a [`TypeHash`]: a 64-bit
//! value computed from a qualified name (types) or from the owner, name and
//! parameter types (methods, constructors, fields). Because the hash is a pure
//! function of its inputs, a generated body can reference a member before the
//! container builder has finished declaring the owning shell.
//!
//! # Hash Computation
//!
//! Uses XXHash64 with domain-specific mixing constants so that a type and a
//! field with the same spelling never collide.
//!
//! # Examples
//!
//! ```
//! use methodgen_core::TypeHash;
//!
//! let point = TypeHash::from_name("Point");
//! assert_eq!(point, TypeHash::from_name("Point"));
//!
//! let x = TypeHash::from_field(point, "x");
//! let y = TypeHash::from_field(point, "y");
//! assert_ne!(x, y);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for chaining components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method hashes
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for field hashes
    pub const FIELD: u64 = 0xf2a74de452e6b438;

    /// Parameter position mixing constants.
    /// Each parameter position gets a unique constant to ensure parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit hash identifying a type, method, constructor or field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    ///
    /// ```
    /// use methodgen_core::{TypeHash, primitives};
    ///
    /// assert_eq!(TypeHash::from_name("int"), primitives::INT32);
    /// ```
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a method hash from owner type, method name and parameter types.
    ///
    /// Parameter order matters, so overloads get distinct identities.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a constructor hash from owner type and parameter types.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Create a field hash from owner type and field name.
    #[inline]
    pub fn from_field(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::FIELD ^ owner.0.wrapping_mul(hash_constants::SEP) ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a template instance hash from template hash and type argument hashes.
    ///
    /// ```
    /// use methodgen_core::{TypeHash, primitives};
    ///
    /// let ints = TypeHash::from_template_instance(primitives::ARRAY_TEMPLATE, &[primitives::INT32]);
    /// let floats = TypeHash::from_template_instance(primitives::ARRAY_TEMPLATE, &[primitives::FLOAT]);
    /// assert_ne!(ints, floats);
    /// ```
    #[inline]
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        TypeHash(mix_params(template.0, args))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in params.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the fold order-sensitive
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Well-known hashes for built-in types.
///
/// These are pre-computed from `TypeHash::from_name()`.
pub mod primitives {
    use super::TypeHash;

    /// Hash for `void` type
    pub const VOID: TypeHash = TypeHash(0xe4b3797ddcf989ea);

    /// Hash for `bool` type
    pub const BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);

    /// Hash for `int8` type
    pub const INT8: TypeHash = TypeHash(0x2b44191092e74388);

    /// Hash for `int16` type
    pub const INT16: TypeHash = TypeHash(0x95aebfc985e9b115);

    /// Hash for `int` type (32-bit signed integer)
    pub const INT32: TypeHash = TypeHash(0x4f5e5320cd1c92bf);

    /// Hash for `int64` type
    pub const INT64: TypeHash = TypeHash(0x7d6c550df59a1924);

    /// Hash for `uint8` type
    pub const UINT8: TypeHash = TypeHash(0x0e8b2d31cdfa9716);

    /// Hash for `uint16` type
    pub const UINT16: TypeHash = TypeHash(0x269d68dfde65ae7f);

    /// Hash for `uint` type (32-bit unsigned integer)
    pub const UINT32: TypeHash = TypeHash(0x543fb8f520aa3e26);

    /// Hash for `uint64` type
    pub const UINT64: TypeHash = TypeHash(0x32ba58d17fda82dd);

    /// Hash for `float` type
    pub const FLOAT: TypeHash = TypeHash(0x02d5a2fddaf5bb69);

    /// Hash for `double` type
    pub const DOUBLE: TypeHash = TypeHash(0xeb125587f6c2a79b);

    /// Hash for `string` type
    pub const STRING: TypeHash = TypeHash(0x7a8d5fb1ba695978);

    /// Hash for the null literal type (assignable to any reference type)
    pub const NULL: TypeHash = TypeHash(0x1165f1b6597b5a46);

    /// Hash for `object`, the root of every reference type
    pub const OBJECT: TypeHash = TypeHash(0x7453af4894759ab5);

    /// Hash for `Type`, the runtime type-object produced by `type_of`
    pub const TYPE: TypeHash = TypeHash(0x3720e6d3fe62ef14);

    /// Hash for `Exception`, the base of every throwable type
    pub const EXCEPTION: TypeHash = TypeHash(0x211c5c90941a91a5);

    /// Hash for `InvalidStateException`, thrown by generated iterators
    pub const INVALID_STATE: TypeHash = TypeHash(0x05df5db342f53c60);

    /// Template hash for `array<T>`
    pub const ARRAY_TEMPLATE: TypeHash = TypeHash(0x7158508e56a1b365);

    /// Template hash for `Enumerable<T>`
    pub const ENUMERABLE_TEMPLATE: TypeHash = TypeHash(0x78cbb60f969c809b);

    /// Template hash for `Enumerator<T>`
    pub const ENUMERATOR_TEMPLATE: TypeHash = TypeHash(0xf695d95a0575e72b);
}
