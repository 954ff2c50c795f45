//! Storage type codes and field keys.

use serde::{Deserialize, Serialize};

/// Storage type of a field's elements, as recorded in its header.
///
/// The discriminant is the on-disk code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum DataType {
    String = 0,
    Binary = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    /// `f32` values stored through the float codec.
    Float32Compressed = 12,
    /// `f64` values stored through the float codec.
    Float64Compressed = 13,
    NoType = 14,
}

impl DataType {
    /// Every storage type in code order.
    pub const ALL: [DataType; 15] = [
        Self::String,
        Self::Binary,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Float32Compressed,
        Self::Float64Compressed,
        Self::NoType,
    ];

    /// On-disk code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parse an on-disk code.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Nominal width of one element in bytes.
    pub fn element_size(self) -> usize {
        match self {
            Self::String | Self::Binary | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::Float32Compressed => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Float64Compressed => 8,
            Self::NoType => 0,
        }
    }

    /// Bit width recorded in the field header.
    pub fn nbits(self) -> i32 {
        (self.element_size() * 8) as i32
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Float32Compressed | Self::Float64Compressed)
    }

    /// The type whose raw little-endian bytes a read of this type produces.
    pub fn decoded(self) -> Self {
        match self {
            Self::Float32Compressed => Self::Float32,
            Self::Float64Compressed => Self::Float64,
            other => other,
        }
    }

    /// Whether a slice of `element` values may be written as this type.
    ///
    /// Byte-oriented types accept `u8` buffers.
    pub fn accepts(self, element: DataType) -> bool {
        match self {
            Self::String | Self::Binary => element == Self::UInt8,
            other => other.decoded() == element,
        }
    }

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Binary => "binary",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Float32Compressed => "float32_compressed",
            Self::Float64Compressed => "float64_compressed",
            Self::NoType => "none",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to one field of an open session.
///
/// Bits 0..31 hold the file index within the session and bits 32..63 the
/// slot within that file's index. Bit 31 and bit 63 are unused, so every
/// valid key is non-negative. `-1` is the invalid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(i64);

impl FieldKey {
    /// The canonical "no field" key.
    pub const INVALID: FieldKey = FieldKey(-1);

    /// Largest file index or slot a key can hold.
    pub const MAX_INDEX: usize = 0x7FFF_FFFF;

    /// Build a key, or `None` if either index does not fit in 31 bits.
    pub fn new(file_index: usize, slot: usize) -> Option<Self> {
        if file_index > Self::MAX_INDEX || slot > Self::MAX_INDEX {
            return None;
        }
        Some(Self(((slot as i64) << 32) | file_index as i64))
    }

    /// Reinterpret a raw key value.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// Whether the key has the shape of a valid key. It may still not
    /// address a field of a given session.
    pub fn is_valid(self) -> bool {
        self.0 >= 0 && (self.0 & 0x8000_0000) == 0
    }

    pub fn file_index(self) -> usize {
        (self.0 & Self::MAX_INDEX as i64) as usize
    }

    pub fn slot(self) -> usize {
        ((self.0 >> 32) & Self::MAX_INDEX as i64) as usize
    }
}

impl Default for FieldKey {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}", self.file_index(), self.slot())
        } else {
            write!(f, "invalid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_declaration_order() {
        for (i, dtype) in DataType::ALL.iter().enumerate() {
            assert_eq!(dtype.code(), i as i32);
            assert_eq!(DataType::from_code(i as i32), Some(*dtype));
        }
        assert_eq!(DataType::from_code(15), None);
        assert_eq!(DataType::from_code(-1), None);
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(DataType::String.element_size(), 1);
        assert_eq!(DataType::Int16.element_size(), 2);
        assert_eq!(DataType::Float32Compressed.element_size(), 4);
        assert_eq!(DataType::Float64Compressed.nbits(), 64);
        assert_eq!(DataType::NoType.element_size(), 0);
    }

    #[test]
    fn test_decoded_and_accepts() {
        assert_eq!(DataType::Float32Compressed.decoded(), DataType::Float32);
        assert_eq!(DataType::Int16.decoded(), DataType::Int16);
        assert!(DataType::Float64Compressed.accepts(DataType::Float64));
        assert!(!DataType::Float64Compressed.accepts(DataType::Float32));
        assert!(DataType::Binary.accepts(DataType::UInt8));
        assert!(!DataType::Int8.accepts(DataType::UInt8));
    }

    #[test]
    fn test_key_layout() {
        let key = FieldKey::new(1, 5).unwrap();
        assert_eq!(key.raw(), (5i64 << 32) | 1);
        assert_eq!(key.file_index(), 1);
        assert_eq!(key.slot(), 5);
        assert!(key.is_valid());

        let max = FieldKey::new(FieldKey::MAX_INDEX, FieldKey::MAX_INDEX).unwrap();
        assert!(max.is_valid());
        assert_eq!(max.file_index(), FieldKey::MAX_INDEX);
        assert_eq!(max.slot(), FieldKey::MAX_INDEX);

        assert!(FieldKey::new(FieldKey::MAX_INDEX + 1, 0).is_none());
    }

    #[test]
    fn test_invalid_key() {
        assert!(!FieldKey::INVALID.is_valid());
        assert_eq!(FieldKey::default(), FieldKey::INVALID);
        assert_eq!(FieldKey::from_raw(-1), FieldKey::INVALID);
        assert!(!FieldKey::from_raw(0x8000_0000).is_valid());
        assert_eq!(FieldKey::INVALID.to_string(), "invalid");
    }
}
