//! Accumulation of repeated fields.
//!
//! The protobuf wire spec denotes that repeated fields are stored either as
//! repeated instances of `<tag><item>`, or for packable scalars as a single
//! length-delimited run of back-to-back items. Both encodings may appear for
//! the same field within one message:
//!
//! ```text
//! message GameResult {
//!  string name = 2;
//!  repeated uint32 scores = 11;
//! }
//!
//! 11: 99
//! 2: { "Parker" }
//! 11: [91, 107]
//! ```
//!
//! Elements accumulate in wire encounter order, here `[99, 91, 107]`.

use crate::codec::{coerce, embedded};
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::schema::{FieldKind, FieldSchema, Schema};
use crate::value::Value;
use crate::wire::{self, WireType};

/// Decodes one occurrence of a repeated field, appending to `dst`.
///
/// `wire_type` is the wire type from the tag, already validated against the
/// field.
#[inline]
pub(crate) fn decode_into(
    schema: &Schema,
    field: &FieldSchema,
    wire_type: WireType,
    cursor: &mut ByteCursor,
    dst: &mut Vec<Value>,
) -> Result<(), DecodeError> {
    match field.kind {
        FieldKind::Message(id) => {
            let message = embedded::decode(schema, id, cursor)?;
            dst.push(Value::Message(message));
        }
        kind if wire_type == WireType::Len && kind.wire_type() != WireType::Len => {
            decode_packed_into(field, cursor, dst)?;
        }
        kind => {
            let raw = wire::read_value(cursor, kind.wire_type(), kind.varint_width())?;
            dst.push(coerce(field, raw)?);
        }
    }
    Ok(())
}

/// Decodes a packed run of elements.
///
/// An element that does not fit in the run fails like any other read past
/// a bound region.
fn decode_packed_into(
    field: &FieldSchema,
    cursor: &mut ByteCursor,
    dst: &mut Vec<Value>,
) -> Result<(), DecodeError> {
    let element_wire_type = field.kind.wire_type();
    let width = field.kind.varint_width();

    let len = wire::decode_len(cursor)?;
    let region = cursor.push_limit(len)?;
    match element_wire_type {
        WireType::I32 => dst.reserve(len / 4),
        WireType::I64 => dst.reserve(len / 8),
        WireType::Varint | WireType::Len => (),
    }
    while cursor.has_remaining() {
        let raw = wire::read_value(cursor, element_wire_type, width)?;
        dst.push(coerce(field, raw)?);
    }
    cursor.pop_limit(region)
}
