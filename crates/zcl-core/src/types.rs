//! ZCL data types and multi-byte value decoding

use serde::{Deserialize, Serialize};

/// ZCL data types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    #[default]
    NoData = 0x00,
    Data8 = 0x08,
    Data16 = 0x09,
    Data24 = 0x0A,
    Data32 = 0x0B,
    Boolean = 0x10,
    Bitmap8 = 0x18,
    Bitmap16 = 0x19,
    Bitmap24 = 0x1A,
    Bitmap32 = 0x1B,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint24 = 0x22,
    Uint32 = 0x23,
    Uint40 = 0x24,
    Uint48 = 0x25,
    Int8 = 0x28,
    Int16 = 0x29,
    Int24 = 0x2A,
    Int32 = 0x2B,
    Enum8 = 0x30,
    Enum16 = 0x31,
    Float32 = 0x39,
    Float64 = 0x3A,
    String = 0x42,
    Array = 0x48,
    Struct = 0x4C,
    Utc = 0xE2,
    Ieee = 0xF0,
}

impl DataType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(DataType::NoData),
            0x08 => Some(DataType::Data8),
            0x09 => Some(DataType::Data16),
            0x0A => Some(DataType::Data24),
            0x0B => Some(DataType::Data32),
            0x10 => Some(DataType::Boolean),
            0x18 => Some(DataType::Bitmap8),
            0x19 => Some(DataType::Bitmap16),
            0x1A => Some(DataType::Bitmap24),
            0x1B => Some(DataType::Bitmap32),
            0x20 => Some(DataType::Uint8),
            0x21 => Some(DataType::Uint16),
            0x22 => Some(DataType::Uint24),
            0x23 => Some(DataType::Uint32),
            0x24 => Some(DataType::Uint40),
            0x25 => Some(DataType::Uint48),
            0x28 => Some(DataType::Int8),
            0x29 => Some(DataType::Int16),
            0x2A => Some(DataType::Int24),
            0x2B => Some(DataType::Int32),
            0x30 => Some(DataType::Enum8),
            0x31 => Some(DataType::Enum16),
            0x39 => Some(DataType::Float32),
            0x3A => Some(DataType::Float64),
            0x42 => Some(DataType::String),
            0x48 => Some(DataType::Array),
            0x4C => Some(DataType::Struct),
            0xE2 => Some(DataType::Utc),
            0xF0 => Some(DataType::Ieee),
            _ => None,
        }
    }

    /// The raw ZCL type tag, as it appears on the wire
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the type is analog in the ZCL sense (thresholded reporting)
    /// as opposed to discrete (any change reports).
    #[must_use]
    pub fn is_analog(self) -> bool {
        matches!(
            self,
            DataType::Uint8
                | DataType::Uint16
                | DataType::Uint24
                | DataType::Uint32
                | DataType::Uint40
                | DataType::Uint48
                | DataType::Int8
                | DataType::Int16
                | DataType::Int24
                | DataType::Int32
                | DataType::Float32
                | DataType::Float64
                | DataType::Utc
        )
    }

    /// Byte width of fixed-size types; `None` for variable-length types.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            DataType::NoData => Some(0),
            DataType::Data8
            | DataType::Boolean
            | DataType::Bitmap8
            | DataType::Uint8
            | DataType::Int8
            | DataType::Enum8 => Some(1),
            DataType::Data16
            | DataType::Bitmap16
            | DataType::Uint16
            | DataType::Int16
            | DataType::Enum16 => Some(2),
            DataType::Data24 | DataType::Bitmap24 | DataType::Uint24 | DataType::Int24 => Some(3),
            DataType::Data32
            | DataType::Bitmap32
            | DataType::Uint32
            | DataType::Int32
            | DataType::Float32
            | DataType::Utc => Some(4),
            DataType::Uint40 => Some(5),
            DataType::Uint48 => Some(6),
            DataType::Float64 => Some(8),
            DataType::Ieee => Some(8),
            DataType::String | DataType::Array | DataType::Struct => None,
        }
    }
}

/// Assemble an unsigned little-endian integer from up to 8 bytes.
///
/// The 48-bit case is why this returns `u64`: the widest analog attribute
/// (Uint48 summation counters) needs 64-bit intermediate arithmetic.
#[must_use]
pub fn decode_unsigned_le(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().take(8).enumerate() {
        value |= u64::from(b) << (8 * i);
    }
    value
}

/// Assemble a signed little-endian integer from up to 8 bytes,
/// sign-extending from the declared width.
#[must_use]
pub fn decode_signed_le(bytes: &[u8]) -> i64 {
    let len = bytes.len().min(8);
    if len == 0 {
        return 0;
    }
    let unsigned = decode_unsigned_le(bytes);
    let shift = 64 - 8 * len as u32;
    ((unsigned << shift) as i64) >> shift
}
