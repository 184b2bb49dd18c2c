//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use bytes::Bytes;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::util::unlikely;

/// Minimum value of a protobuf field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded each key-value pair
/// is turned into a record consisting of a field number, a [`WireType`], and a payload.
/// The [`WireType`] indicates how large the proceeding payload is.
///
/// The deprecated group wire types (3 and 4) are not representable, tags
/// carrying them fail to decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`.
    I32 = 5,
}

static_assertions::assert_eq_size!(WireType, u8);

#[allow(clippy::as_conversions)]
impl WireType {
    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::I32),
            _ => Err(DecodeError::UnsupportedWireType { value }),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, DecodeError> {
        WireType::try_from_val(value)
    }
}

/// A decoded field key: the field number and the [`WireType`] of its payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tag {
    pub field_number: u32,
    pub wire_type: WireType,
}

/// Decodes the tag of the next field.
///
/// Follows the specification from <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
///
/// N.B. The tag is read as a 64-bit varint. A valid tag always fits in u32,
/// the max field number is `2^29-1` and thus the max tag value is
/// `(2^29-1) << 3 | 7` which is `u32::MAX`. Anything larger carries a field
/// number outside `1..=MAXIMUM_FIELD_NUMBER` and is rejected, rather than
/// truncated onto a field we know.
#[inline]
pub fn decode_tag(cursor: &mut ByteCursor) -> Result<Tag, DecodeError> {
    let raw = cursor.read_varint::<u64>()?;

    // The first three bits of the key are the wire type.
    #[allow(clippy::as_conversions)]
    let wire_type = WireType::try_from_val((raw & 0b111) as u8)?;

    // The remaining bits are the field number, saturated so that anything past
    // u32 still fails the range check.
    let field_number = u32::try_from(raw >> 3).unwrap_or(u32::MAX);
    if unlikely(!(MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&field_number)) {
        return Err(DecodeError::InvalidFieldNumber {
            value: field_number,
        });
    }

    Ok(Tag {
        field_number,
        wire_type,
    })
}

/// Decodes the length prefix for a length-delimited field.
///
/// The length is not checked against the remaining bytes here, the read that
/// consumes the payload does that.
#[inline]
pub fn decode_len(cursor: &mut ByteCursor) -> Result<usize, DecodeError> {
    let len = cursor.read_varint::<u64>()?;
    usize::try_from(len).map_err(|_| DecodeError::out_of_bounds(len, cursor.remaining()))
}

/// Width of the varint read for a scalar field.
///
/// Decoding a 64-bit varint into a 32-bit field is a schema-level choice.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VarintWidth {
    W32,
    W64,
}

/// Raw payload of a single field, before any schema type is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Bytes(Bytes),
}

impl RawValue {
    /// The wire type this payload was read with.
    pub fn wire_type(&self) -> WireType {
        match self {
            RawValue::Varint(_) => WireType::Varint,
            RawValue::Fixed64(_) => WireType::I64,
            RawValue::Fixed32(_) => WireType::I32,
            RawValue::Bytes(_) => WireType::Len,
        }
    }
}

/// Reads the payload for `wire_type` from the cursor.
#[inline]
pub fn read_value(
    cursor: &mut ByteCursor,
    wire_type: WireType,
    width: VarintWidth,
) -> Result<RawValue, DecodeError> {
    let value = match wire_type {
        WireType::Varint => match width {
            VarintWidth::W32 => RawValue::Varint(u64::from(cursor.read_varint::<u32>()?)),
            VarintWidth::W64 => RawValue::Varint(cursor.read_varint::<u64>()?),
        },
        WireType::I64 => RawValue::Fixed64(u64::from_le_bytes(cursor.read_array()?)),
        WireType::I32 => RawValue::Fixed32(u32::from_le_bytes(cursor.read_array()?)),
        WireType::Len => {
            let len = decode_len(cursor)?;
            RawValue::Bytes(cursor.read_bytes(len)?)
        }
    };
    Ok(value)
}

/// Skips over a field value based on its wire type.
///
/// Protobuf supports backwards and forwards compatibility by skipping fields
/// we don't know about. We "skip" a field by reading past it.
#[inline]
pub fn skip_value(cursor: &mut ByteCursor, wire_type: WireType) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            cursor.read_varint::<u64>()?;
        }
        WireType::I64 => {
            cursor.read_array::<8>()?;
        }
        WireType::I32 => {
            cursor.read_array::<4>()?;
        }
        WireType::Len => {
            let len = decode_len(cursor)?;
            cursor.read_bytes(len)?;
        }
    }
    Ok(())
}
