//! Applies a field's proto type and output override to a raw wire value.

// Integer reinterpretation relies on `as` truncation and sign extension.
#![allow(clippy::as_conversions)]

use bytes::Bytes;

use crate::error::DecodeError;
use crate::schema::{FieldKind, FieldSchema, OutputType, ScalarKind};
use crate::value::Value;
use crate::wire::RawValue;

#[inline]
pub(crate) const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[inline]
pub(crate) const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Converts a single element of `field` from its raw wire payload.
///
/// Integer kinds never overflow, the bit pattern is truncated or
/// reinterpreted the way the wire format defines. Byte-like overrides
/// enforce their length rule and fail with
/// [`DecodeError::InvalidFixedLength`] rather than truncating or padding.
pub fn coerce(field: &FieldSchema, raw: RawValue) -> Result<Value, DecodeError> {
    let value = match (field.kind, raw) {
        (FieldKind::Scalar(kind), raw) => scalar(field, kind, raw)?,
        (FieldKind::Enum(_), RawValue::Varint(v)) => Value::Enum(v as i32),
        (_, raw) => return Err(mismatch(field, &raw)),
    };

    match field.output {
        Some(output) => apply_output(field, output, value),
        None => Ok(value),
    }
}

fn scalar(field: &FieldSchema, kind: ScalarKind, raw: RawValue) -> Result<Value, DecodeError> {
    let value = match (kind, raw) {
        (ScalarKind::Bool, RawValue::Varint(v)) => Value::Bool(v != 0),
        (ScalarKind::Uint32, RawValue::Varint(v)) => Value::Uint(u64::from(v as u32)),
        (ScalarKind::Uint64, RawValue::Varint(v)) => Value::Uint(v),
        (ScalarKind::Int32, RawValue::Varint(v)) => Value::Int(i64::from(v as i32)),
        (ScalarKind::Int64, RawValue::Varint(v)) => Value::Int(v as i64),
        (ScalarKind::Sint32, RawValue::Varint(v)) => {
            Value::Int(i64::from(zigzag_decode_32(v as u32)))
        }
        (ScalarKind::Sint64, RawValue::Varint(v)) => Value::Int(zigzag_decode_64(v)),
        (ScalarKind::Fixed32, RawValue::Fixed32(v)) => Value::Uint(u64::from(v)),
        (ScalarKind::Sfixed32, RawValue::Fixed32(v)) => Value::Int(i64::from(v as i32)),
        (ScalarKind::Fixed64, RawValue::Fixed64(v)) => Value::Uint(v),
        (ScalarKind::Sfixed64, RawValue::Fixed64(v)) => Value::Int(v as i64),
        (ScalarKind::Bytes, RawValue::Bytes(b)) => Value::Bytes(b),
        (ScalarKind::String, RawValue::Bytes(b)) => Value::Text(b),
        (_, raw) => return Err(mismatch(field, &raw)),
    };
    Ok(value)
}

fn apply_output(
    field: &FieldSchema,
    output: OutputType,
    value: Value,
) -> Result<Value, DecodeError> {
    let value = match (output, value) {
        (OutputType::Uint(bits), Value::Uint(v)) => Value::Uint(truncate_unsigned(v, bits)),
        (OutputType::Int(bits), Value::Int(v)) => Value::Int(truncate_signed(v, bits)),
        (output, Value::Bytes(bytes)) => {
            check_length(field, output, &bytes)?;
            match output {
                OutputType::Address | OutputType::AddressPayable => {
                    let mut addr = [0u8; 20];
                    addr.copy_from_slice(&bytes);
                    Value::Address(addr)
                }
                OutputType::FixedBytes(_) => Value::FixedBytes(bytes),
                OutputType::Uint256 => {
                    let mut word = [0u8; 32];
                    word[32 - bytes.len()..].copy_from_slice(&bytes);
                    Value::Uint256(word)
                }
                // Integer overrides are rejected on bytes fields when the
                // schema is built.
                OutputType::Uint(_) | OutputType::Int(_) => Value::Bytes(bytes),
            }
        }
        (_, value) => value,
    };
    Ok(value)
}

fn check_length(field: &FieldSchema, output: OutputType, bytes: &Bytes) -> Result<(), DecodeError> {
    if let Some(rule) = output.length_rule() {
        if !rule.admits(bytes.len()) {
            return Err(DecodeError::InvalidFixedLength {
                field: field.number,
                expected: rule.bound(),
                actual: bytes.len(),
            });
        }
    }
    Ok(())
}

/// Keep the low `bits` bits.
#[inline]
fn truncate_unsigned(v: u64, bits: u16) -> u64 {
    if bits >= 64 {
        v
    } else {
        v & ((1u64 << bits) - 1)
    }
}

/// Keep the low `bits` bits, sign-extending from the new top bit.
#[inline]
fn truncate_signed(v: i64, bits: u16) -> i64 {
    if bits >= 64 {
        v
    } else {
        let shift = 64 - u32::from(bits);
        (v << shift) >> shift
    }
}

#[cold]
fn mismatch(field: &FieldSchema, raw: &RawValue) -> DecodeError {
    DecodeError::WireTypeMismatch {
        field: field.number,
        expected: field.kind.wire_type(),
        actual: raw.wire_type(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;
    use crate::error::DecodeErrorKind;
    use crate::schema::{EnumId, SchemaBuilder};
    use crate::wire::WireType;

    fn field(kind: ScalarKind) -> FieldSchema {
        FieldSchema::scalar("f", 3, kind)
    }

    fn enum_id() -> EnumId {
        let mut builder = SchemaBuilder::new();
        builder.add_enum("E", [("ZERO", 0)])
    }

    #[test]
    fn test_bool() {
        let f = field(ScalarKind::Bool);
        assert_eq!(coerce(&f, RawValue::Varint(0)).unwrap(), Value::Bool(false));
        assert_eq!(coerce(&f, RawValue::Varint(1)).unwrap(), Value::Bool(true));
        assert_eq!(coerce(&f, RawValue::Varint(300)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_zigzag_decoding() {
        assert_eq!(zigzag_decode_32(0), 0);
        assert_eq!(zigzag_decode_32(1), -1);
        assert_eq!(zigzag_decode_32(2), 1);
        assert_eq!(zigzag_decode_32(4294967294), 2147483647);
        assert_eq!(zigzag_decode_32(4294967295), -2147483648);
        assert_eq!(zigzag_decode_64(3), -2);
        assert_eq!(zigzag_decode_64(u64::MAX), i64::MIN);
    }

    #[test]
    fn test_int32_sign_extension() {
        // -1 as int32 is sign-extended to ten bytes on the wire.
        let f = field(ScalarKind::Int32);
        assert_eq!(coerce(&f, RawValue::Varint(u64::MAX)).unwrap(), Value::Int(-1));
        // Upper bits are discarded.
        let f = field(ScalarKind::Uint32);
        assert_eq!(
            coerce(&f, RawValue::Varint(0x1_0000_0005)).unwrap(),
            Value::Uint(5)
        );
    }

    #[test]
    fn test_fixed_kinds() {
        let f = field(ScalarKind::Sfixed32);
        assert_eq!(coerce(&f, RawValue::Fixed32(u32::MAX)).unwrap(), Value::Int(-1));
        let f = field(ScalarKind::Fixed64);
        assert_eq!(
            coerce(&f, RawValue::Fixed64(u64::MAX)).unwrap(),
            Value::Uint(u64::MAX)
        );
    }

    #[test]
    fn test_enum_out_of_range_passes_through() {
        let f = FieldSchema::enumeration("e", 1, enum_id());
        assert_eq!(coerce(&f, RawValue::Varint(99)).unwrap(), Value::Enum(99));
        assert_eq!(coerce(&f, RawValue::Varint(u64::MAX)).unwrap(), Value::Enum(-1));
    }

    #[test]
    fn test_address_length_is_exact() {
        let f = field(ScalarKind::Bytes).with_output(OutputType::Address);
        let ok = coerce(&f, RawValue::Bytes(Bytes::from(vec![7u8; 20]))).unwrap();
        assert_eq!(ok, Value::Address([7; 20]));

        for len in [0, 19, 21, 32] {
            let err = coerce(&f, RawValue::Bytes(Bytes::from(vec![7u8; len]))).unwrap_err();
            assert_eq!(
                err,
                DecodeError::InvalidFixedLength {
                    field: 3,
                    expected: 20,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn test_fixed_bytes() {
        let f = field(ScalarKind::Bytes).with_output(OutputType::FixedBytes(4));
        let value = coerce(&f, RawValue::Bytes(Bytes::from_static(&[1, 2, 3, 4]))).unwrap();
        assert_eq!(value, Value::FixedBytes(Bytes::from_static(&[1, 2, 3, 4])));

        let err = coerce(&f, RawValue::Bytes(Bytes::from_static(&[1, 2, 3]))).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidFixedLength);
    }

    #[test]
    fn test_uint256_right_aligned() {
        let f = field(ScalarKind::Bytes).with_output(OutputType::Uint256);
        let value = coerce(&f, RawValue::Bytes(Bytes::from_static(&[0x01, 0x00]))).unwrap();
        let mut expected = [0u8; 32];
        expected[30] = 0x01;
        assert_eq!(value, Value::Uint256(expected));

        let value = coerce(&f, RawValue::Bytes(Bytes::new())).unwrap();
        assert_eq!(value, Value::Uint256([0; 32]));

        let err = coerce(&f, RawValue::Bytes(Bytes::from(vec![1u8; 33]))).unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidFixedLength {
                field: 3,
                expected: 32,
                actual: 33
            }
        );
    }

    #[test]
    fn test_narrow_integers() {
        let f = field(ScalarKind::Uint64).with_output(OutputType::Uint(8));
        assert_eq!(coerce(&f, RawValue::Varint(0x1FF)).unwrap(), Value::Uint(0xFF));

        let f = field(ScalarKind::Sint64).with_output(OutputType::Int(8));
        // zigzag(200) = 400, 200 wraps to -56 in eight bits.
        assert_eq!(coerce(&f, RawValue::Varint(400)).unwrap(), Value::Int(-56));

        let f = field(ScalarKind::Uint64).with_output(OutputType::Uint(256));
        assert_eq!(
            coerce(&f, RawValue::Varint(u64::MAX)).unwrap(),
            Value::Uint(u64::MAX)
        );
    }

    #[test]
    fn test_wire_mismatch() {
        let f = field(ScalarKind::Fixed32);
        let err = coerce(&f, RawValue::Varint(1)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::WireTypeMismatch {
                field: 3,
                expected: WireType::I32,
                actual: WireType::Varint
            }
        );
    }

    #[property_test]
    fn proptest_sint64(val: i64) {
        let encoded = ((val << 1) ^ (val >> 63)) as u64;
        let f = field(ScalarKind::Sint64);
        prop_assert_eq!(coerce(&f, RawValue::Varint(encoded)).unwrap(), Value::Int(val));
    }
}
