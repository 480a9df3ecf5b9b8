//! Primitive type kinds for the built-in numeric and boolean types.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{TypeHash, primitives};

/// Primitive type kinds.
///
/// The discriminant doubles as the operand of the `Convert` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
}

/// Signedness of an arithmetic or comparison code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signed,
    Unsigned,
    Float,
}

impl PrimitiveKind {
    /// All numeric kinds, narrowest integers first.
    pub const NUMERIC: [PrimitiveKind; 10] = [
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Uint8,
        PrimitiveKind::Uint16,
        PrimitiveKind::Uint32,
        PrimitiveKind::Uint64,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Get the TypeHash for this primitive type.
    pub const fn type_hash(self) -> TypeHash {
        match self {
            PrimitiveKind::Void => primitives::VOID,
            PrimitiveKind::Bool => primitives::BOOL,
            PrimitiveKind::Int8 => primitives::INT8,
            PrimitiveKind::Int16 => primitives::INT16,
            PrimitiveKind::Int32 => primitives::INT32,
            PrimitiveKind::Int64 => primitives::INT64,
            PrimitiveKind::Uint8 => primitives::UINT8,
            PrimitiveKind::Uint16 => primitives::UINT16,
            PrimitiveKind::Uint32 => primitives::UINT32,
            PrimitiveKind::Uint64 => primitives::UINT64,
            PrimitiveKind::Float => primitives::FLOAT,
            PrimitiveKind::Double => primitives::DOUBLE,
        }
    }

    /// Look up the primitive kind for a type hash, if it names one.
    pub fn from_hash(hash: TypeHash) -> Option<Self> {
        const ALL: [PrimitiveKind; 12] = [
            PrimitiveKind::Void,
            PrimitiveKind::Bool,
            PrimitiveKind::Int8,
            PrimitiveKind::Int16,
            PrimitiveKind::Int32,
            PrimitiveKind::Int64,
            PrimitiveKind::Uint8,
            PrimitiveKind::Uint16,
            PrimitiveKind::Uint32,
            PrimitiveKind::Uint64,
            PrimitiveKind::Float,
            PrimitiveKind::Double,
        ];
        ALL.into_iter().find(|kind| kind.type_hash() == hash)
    }

    /// Get the name of this primitive type.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Uint8 => "uint8",
            PrimitiveKind::Uint16 => "uint16",
            PrimitiveKind::Uint32 => "uint",
            PrimitiveKind::Uint64 => "uint64",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub const fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64
        )
    }

    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Uint8 | PrimitiveKind::Uint16 | PrimitiveKind::Uint32 | PrimitiveKind::Uint64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Signedness used to pick between signed, unsigned and float instructions.
    pub const fn signedness(self) -> Signedness {
        if self.is_unsigned_integer() {
            Signedness::Unsigned
        } else if self.is_float() {
            Signedness::Float
        } else {
            Signedness::Signed
        }
    }

    /// Width in bits of the storage for this kind (0 for void).
    pub const fn bit_width(self) -> u32 {
        match self {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Bool | PrimitiveKind::Int8 | PrimitiveKind::Uint8 => 8,
            PrimitiveKind::Int16 | PrimitiveKind::Uint16 => 16,
            PrimitiveKind::Int32 | PrimitiveKind::Uint32 | PrimitiveKind::Float => 32,
            PrimitiveKind::Int64 | PrimitiveKind::Uint64 | PrimitiveKind::Double => 64,
        }
    }

    /// Whether a value of this kind converts implicitly (losslessly) to `target`.
    ///
    /// Identity counts as a widening. Integers only reach a float type whose
    /// mantissa holds every value, so `int` goes to `double` but not `float`,
    /// and 64-bit integers never widen to a float.
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if self == target {
            return true;
        }
        match self {
            Int8 => matches!(target, Int16 | Int32 | Int64 | Float | Double),
            Uint8 => matches!(target, Int16 | Uint16 | Int32 | Uint32 | Int64 | Uint64 | Float | Double),
            Int16 => matches!(target, Int32 | Int64 | Float | Double),
            Uint16 => matches!(target, Int32 | Uint32 | Int64 | Uint64 | Float | Double),
            Int32 => matches!(target, Int64 | Double),
            Uint32 => matches!(target, Int64 | Uint64 | Double),
            Float => target == Double,
            Void | Bool | Int64 | Uint64 | Double => false,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_through_kind() {
        for kind in PrimitiveKind::NUMERIC {
            assert_eq!(PrimitiveKind::from_hash(kind.type_hash()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_hash(primitives::STRING), None);
    }

    #[test]
    fn signedness_classification() {
        assert_eq!(PrimitiveKind::Int16.signedness(), Signedness::Signed);
        assert_eq!(PrimitiveKind::Uint64.signedness(), Signedness::Unsigned);
        assert_eq!(PrimitiveKind::Double.signedness(), Signedness::Float);
    }

    #[test]
    fn widening_rules() {
        assert!(PrimitiveKind::Int8.widens_to(PrimitiveKind::Int32));
        assert!(PrimitiveKind::Uint8.widens_to(PrimitiveKind::Uint32));
        assert!(PrimitiveKind::Int32.widens_to(PrimitiveKind::Double));
        assert!(PrimitiveKind::Int16.widens_to(PrimitiveKind::Float));
        assert!(!PrimitiveKind::Int32.widens_to(PrimitiveKind::Float));
        assert!(!PrimitiveKind::Uint64.widens_to(PrimitiveKind::Double));
        assert!(!PrimitiveKind::Int64.widens_to(PrimitiveKind::Uint64));
        assert!(!PrimitiveKind::Int32.widens_to(PrimitiveKind::Uint32));
        assert!(!PrimitiveKind::Int64.widens_to(PrimitiveKind::Int32));
        assert!(!PrimitiveKind::Bool.widens_to(PrimitiveKind::Int32));
    }

    #[test]
    fn discriminant_round_trip() {
        let byte: u8 = PrimitiveKind::Uint16.into();
        assert_eq!(PrimitiveKind::try_from(byte).ok(), Some(PrimitiveKind::Uint16));
        assert!(PrimitiveKind::try_from(200u8).is_err());
    }

    #[test]
    fn display_uses_script_names() {
        assert_eq!(PrimitiveKind::Int32.to_string(), "int");
        assert_eq!(PrimitiveKind::Uint32.to_string(), "uint");
    }
}
