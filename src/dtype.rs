use half::{bf16, f16};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, thiserror::Error)]
pub enum DTypeError {
    #[error("Unknown element type tag \"{0}\"")]
    UnknownTag(String),
    #[error("Cannot cast literal of dtype {0} to {1}")]
    UnsupportedCast(DType, DType),
}

#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize, strum_macros::EnumIter,
)]
pub enum DType {
    F64,
    F32,
    BF16,
    F16,
    U64,
    I64,
    U32,
    I32,
    U16,
    I16,
    U8,
    I8,
    BOOL,
}

impl DType {
    pub fn size(&self) -> usize {
        match self {
            DType::F64 => 8,
            DType::F32 => 4,
            DType::BF16 => 2,
            DType::F16 => 2,
            DType::U64 => 8,
            DType::I64 => 8,
            DType::U32 => 4,
            DType::I32 => 4,
            DType::U16 => 2,
            DType::I16 => 2,
            DType::U8 => 1,
            DType::I8 => 1,
            DType::BOOL => 1,
        }
    }

    /// Short element type tag, as used in string-valued attributes such as
    /// `destination_type` or `classes_index_type`.
    pub fn tag(&self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::F32 => "f32",
            DType::BF16 => "bf16",
            DType::F16 => "f16",
            DType::U64 => "u64",
            DType::I64 => "i64",
            DType::U32 => "u32",
            DType::I32 => "i32",
            DType::U16 => "u16",
            DType::I16 => "i16",
            DType::U8 => "u8",
            DType::I8 => "i8",
            DType::BOOL => "boolean",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, DTypeError> {
        Ok(match tag {
            "f64" => DType::F64,
            "f32" => DType::F32,
            "bf16" => DType::BF16,
            "f16" => DType::F16,
            "u64" => DType::U64,
            "i64" => DType::I64,
            "u32" => DType::U32,
            "i32" => DType::I32,
            "u16" => DType::U16,
            "i16" => DType::I16,
            "u8" => DType::U8,
            "i8" => DType::I8,
            "boolean" => DType::BOOL,
            _ => Err(DTypeError::UnknownTag(tag.to_string()))?,
        })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F64 | DType::F32 | DType::BF16 | DType::F16)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float() && *self != DType::BOOL
    }
}

impl FromStr for DType {
    type Err = DTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::F64 => write!(f, "Float64"),
            DType::F32 => write!(f, "Float32"),
            DType::BF16 => write!(f, "BFloat16"),
            DType::F16 => write!(f, "Float16"),
            DType::I64 => write!(f, "Int64"),
            DType::I32 => write!(f, "Int32"),
            DType::U64 => write!(f, "UInt64"),
            DType::U32 => write!(f, "UInt32"),
            DType::I16 => write!(f, "Int16"),
            DType::U16 => write!(f, "UInt16"),
            DType::U8 => write!(f, "UInt8"),
            DType::I8 => write!(f, "Int8"),
            DType::BOOL => write!(f, "Bool"),
        }
    }
}

/// Tags accepted by attributes that name an index element type.
pub const INDEX_TYPE_TAGS: &[&str] = &["i32", "i64"];

/// Tags accepted by attributes that name any element type.
pub const ELEMENT_TYPE_TAGS: &[&str] = &[
    "f64", "f32", "bf16", "f16", "u64", "i64", "u32", "i32", "u16", "i16", "u8", "i8", "boolean",
];

pub trait DTypeOfPrimitive {
    const DTYPE: DType;
}

impl DTypeOfPrimitive for f64 { const DTYPE: DType = DType::F64; }
impl DTypeOfPrimitive for f32 { const DTYPE: DType = DType::F32; }
impl DTypeOfPrimitive for bf16 { const DTYPE: DType = DType::BF16; }
impl DTypeOfPrimitive for f16 { const DTYPE: DType = DType::F16; }
impl DTypeOfPrimitive for i64 { const DTYPE: DType = DType::I64; }
impl DTypeOfPrimitive for u64 { const DTYPE: DType = DType::U64; }
impl DTypeOfPrimitive for i32 { const DTYPE: DType = DType::I32; }
impl DTypeOfPrimitive for u32 { const DTYPE: DType = DType::U32; }
impl DTypeOfPrimitive for i16 { const DTYPE: DType = DType::I16; }
impl DTypeOfPrimitive for u16 { const DTYPE: DType = DType::U16; }
impl DTypeOfPrimitive for i8 { const DTYPE: DType = DType::I8; }
impl DTypeOfPrimitive for u8 { const DTYPE: DType = DType::U8; }
impl DTypeOfPrimitive for bool { const DTYPE: DType = DType::BOOL; }

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tags_round_trip_for_every_dtype() {
        for dtype in DType::iter() {
            assert_eq!(DType::from_tag(dtype.tag()).unwrap(), dtype);
            assert!(ELEMENT_TYPE_TAGS.contains(&dtype.tag()));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(DType::from_str("u1"), Err(DTypeError::UnknownTag(_))));
    }
}
