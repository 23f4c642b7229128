use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IrError;

/// Byte order of a multi-byte primitive on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// How a primitive's bits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Char,
    Signed,
    Unsigned,
    Float,
}

/// The closed set of SBE primitive types.
///
/// The discriminant indexes [`PRIMITIVES`], so every property of a primitive is
/// a table lookup and adding a variant without a table row fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Char = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Uint8 = 5,
    Uint16 = 6,
    Uint32 = 7,
    Uint64 = 8,
    Float = 9,
    Double = 10,
}

pub struct PrimitiveInfo {
    pub name: &'static str,
    pub size: usize,
    pub kind: PrimitiveKind,
}

pub const PRIMITIVES: [PrimitiveInfo; 11] = [
    PrimitiveInfo { name: "char", size: 1, kind: PrimitiveKind::Char },
    PrimitiveInfo { name: "int8", size: 1, kind: PrimitiveKind::Signed },
    PrimitiveInfo { name: "int16", size: 2, kind: PrimitiveKind::Signed },
    PrimitiveInfo { name: "int32", size: 4, kind: PrimitiveKind::Signed },
    PrimitiveInfo { name: "int64", size: 8, kind: PrimitiveKind::Signed },
    PrimitiveInfo { name: "uint8", size: 1, kind: PrimitiveKind::Unsigned },
    PrimitiveInfo { name: "uint16", size: 2, kind: PrimitiveKind::Unsigned },
    PrimitiveInfo { name: "uint32", size: 4, kind: PrimitiveKind::Unsigned },
    PrimitiveInfo { name: "uint64", size: 8, kind: PrimitiveKind::Unsigned },
    PrimitiveInfo { name: "float", size: 4, kind: PrimitiveKind::Float },
    PrimitiveInfo { name: "double", size: 8, kind: PrimitiveKind::Float },
];

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Char,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Uint8,
        PrimitiveType::Uint16,
        PrimitiveType::Uint32,
        PrimitiveType::Uint64,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    fn info(self) -> &'static PrimitiveInfo {
        &PRIMITIVES[self as usize]
    }

    /// The name used in SBE schemas and IR (`"uint32"`, `"char"`, ...).
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Width in bytes of a single element.
    pub fn size(self) -> usize {
        self.info().size
    }

    pub fn kind(self) -> PrimitiveKind {
        self.info().kind
    }

    /// Single-byte types are never byte swapped.
    pub fn needs_byte_order(self) -> bool {
        self.size() > 1
    }

    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        PrimitiveType::ALL.iter().copied().find(|p| p.name() == name)
    }

    fn bits(self) -> u32 {
        (self.size() * 8) as u32
    }

    /// Smallest value representable by an integer primitive.
    pub fn min_signed(self) -> i64 {
        i64::MIN >> (64 - self.bits())
    }

    pub fn max_signed(self) -> i64 {
        i64::MAX >> (64 - self.bits())
    }

    pub fn max_unsigned(self) -> u64 {
        u64::MAX >> (64 - self.bits())
    }

    /// The SBE null sentinel used for optional fields and enums.
    pub fn null_value(self) -> PrimitiveValue {
        match self.kind() {
            PrimitiveKind::Char => PrimitiveValue::UInt(0),
            PrimitiveKind::Signed => PrimitiveValue::Int(self.min_signed()),
            PrimitiveKind::Unsigned => PrimitiveValue::UInt(self.max_unsigned()),
            PrimitiveKind::Float => PrimitiveValue::Float(f64::NAN),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveType {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::from_name(s).ok_or_else(|| IrError::UnknownPrimitive(s.to_owned()))
    }
}

/// A literal carried by the IR: constant values, null values, enum values and
/// set choice bit indices.
///
/// Equality is numeric (see [matches](PrimitiveValue::matches)), so `UInt(5)`
/// read back from JSON as `Int(5)` still compares equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl PrimitiveValue {
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            PrimitiveValue::Int(value) => Some(value),
            PrimitiveValue::UInt(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            PrimitiveValue::Int(value) => u64::try_from(value).ok(),
            PrimitiveValue::UInt(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            PrimitiveValue::Int(value) => Some(value as f64),
            PrimitiveValue::UInt(value) => Some(value as f64),
            PrimitiveValue::Float(value) => Some(value),
            PrimitiveValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            PrimitiveValue::Bytes(ref bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Equality that treats a NaN sentinel as matching any NaN.
    pub fn matches(&self, other: &PrimitiveValue) -> bool {
        match (self, other) {
            (PrimitiveValue::Float(a), PrimitiveValue::Float(b)) if a.is_nan() || b.is_nan() => {
                a.is_nan() && b.is_nan()
            }
            (PrimitiveValue::Bytes(a), PrimitiveValue::Bytes(b)) => a == b,
            (PrimitiveValue::Float(a), b) | (b, PrimitiveValue::Float(a)) => b.as_f64() == Some(*a),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
            },
        }
    }
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &PrimitiveValue) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrimitiveValue::Int(value) => write!(f, "{}", value),
            PrimitiveValue::UInt(value) => write!(f, "{}", value),
            PrimitiveValue::Float(value) => write!(f, "{:?}", value),
            PrimitiveValue::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<&str> for PrimitiveValue {
    fn from(text: &str) -> Self {
        PrimitiveValue::Bytes(text.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_discriminants() {
        for (index, primitive) in PrimitiveType::ALL.iter().enumerate() {
            assert_eq!(*primitive as usize, index);
            assert_eq!(PrimitiveType::from_name(primitive.name()), Some(*primitive));
        }
    }

    #[test]
    fn widths() {
        let widths: Vec<usize> = PrimitiveType::ALL.iter().map(|p| p.size()).collect();
        assert_eq!(widths, vec![1, 1, 2, 4, 8, 1, 2, 4, 8, 4, 8]);
        assert!(!PrimitiveType::Char.needs_byte_order());
        assert!(!PrimitiveType::Uint8.needs_byte_order());
        assert!(PrimitiveType::Int16.needs_byte_order());
    }

    #[test]
    fn null_values() {
        assert_eq!(PrimitiveType::Uint8.null_value(), PrimitiveValue::UInt(255));
        assert_eq!(PrimitiveType::Int8.null_value(), PrimitiveValue::Int(-128));
        assert_eq!(PrimitiveType::Int16.null_value(), PrimitiveValue::Int(-32768));
        assert_eq!(PrimitiveType::Uint16.null_value(), PrimitiveValue::UInt(65535));
        assert_eq!(PrimitiveType::Int32.null_value(), PrimitiveValue::Int(i32::MIN as i64));
        assert_eq!(PrimitiveType::Uint32.null_value(), PrimitiveValue::UInt(u32::MAX as u64));
        assert_eq!(PrimitiveType::Int64.null_value(), PrimitiveValue::Int(i64::MIN));
        assert_eq!(PrimitiveType::Uint64.null_value(), PrimitiveValue::UInt(u64::MAX));
        assert_eq!(PrimitiveType::Char.null_value(), PrimitiveValue::UInt(0));
        assert!(PrimitiveType::Double.null_value().matches(&PrimitiveValue::Float(f64::NAN)));
    }

    #[test]
    fn unknown_name() {
        assert_eq!(
            "uint128".parse::<PrimitiveType>(),
            Err(IrError::UnknownPrimitive("uint128".to_owned()))
        );
        assert_eq!("int32".parse::<PrimitiveType>(), Ok(PrimitiveType::Int32));
    }

    #[test]
    fn value_matching() {
        assert!(PrimitiveValue::Int(7).matches(&PrimitiveValue::UInt(7)));
        assert!(!PrimitiveValue::Int(-1).matches(&PrimitiveValue::UInt(u64::MAX)));
        assert!(PrimitiveValue::UInt(u64::MAX).matches(&PrimitiveValue::UInt(u64::MAX)));
        assert!(PrimitiveValue::Float(1.0).matches(&PrimitiveValue::Int(1)));
        assert!(!PrimitiveValue::Float(f64::NAN).matches(&PrimitiveValue::Float(1.0)));
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&PrimitiveType::Uint32).unwrap();
        assert_eq!(json, "\"uint32\"");
        let order: ByteOrder = serde_json::from_str("\"BIG_ENDIAN\"").unwrap();
        assert_eq!(order, ByteOrder::BigEndian);
        let value: PrimitiveValue = serde_json::from_str("-3").unwrap();
        assert_eq!(value, PrimitiveValue::Int(-3));
    }
}
