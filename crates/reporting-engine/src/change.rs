//! Reportable-change evaluation
//!
//! Decides whether a new attribute value differs from the last reported one
//! by at least the configured threshold. Analog integer types are decoded
//! at their declared width and signedness and compared with 64-bit
//! arithmetic; discrete types report on any byte-level difference.

use zcl_core::types::{decode_signed_le, decode_unsigned_le};
use zcl_core::DataType;

/// Comparison semantics for a given type tag
enum Comparison {
    Unsigned(usize),
    Signed(usize),
    ByteWise,
    Unsupported,
}

fn comparison_for(data_type: DataType) -> Comparison {
    match data_type {
        DataType::Uint8 => Comparison::Unsigned(1),
        DataType::Uint16 => Comparison::Unsigned(2),
        DataType::Uint24 => Comparison::Unsigned(3),
        DataType::Uint32 => Comparison::Unsigned(4),
        DataType::Uint48 => Comparison::Unsigned(6),
        DataType::Int8 => Comparison::Signed(1),
        DataType::Int16 => Comparison::Signed(2),
        DataType::Int24 => Comparison::Signed(3),
        DataType::Int32 => Comparison::Signed(4),
        // Analog types without a supported integer comparison never report.
        dt if dt.is_analog() => Comparison::Unsupported,
        _ => Comparison::ByteWise,
    }
}

/// Whether `current` differs from `previous` enough to warrant a report.
///
/// Equal values never trigger. For discrete types the threshold is ignored.
#[must_use]
pub fn exceeds_threshold(
    data_type: DataType,
    current: &[u8],
    previous: &[u8],
    threshold: &[u8],
) -> bool {
    match comparison_for(data_type) {
        Comparison::Unsigned(width) => {
            if current.len() < width || previous.len() < width {
                return false;
            }
            let cur = decode_unsigned_le(&current[..width]);
            let prev = decode_unsigned_le(&previous[..width]);
            let change = decode_unsigned_le(&threshold[..width.min(threshold.len())]);
            cur != prev && cur.abs_diff(prev) >= change
        }
        Comparison::Signed(width) => {
            if current.len() < width || previous.len() < width {
                return false;
            }
            let cur = decode_signed_le(&current[..width]);
            let prev = decode_signed_le(&previous[..width]);
            let change = decode_signed_le(&threshold[..width.min(threshold.len())]);
            cur != prev && (cur.abs_diff(prev) as i64) >= change
        }
        Comparison::ByteWise => current != previous,
        Comparison::Unsupported => false,
    }
}
