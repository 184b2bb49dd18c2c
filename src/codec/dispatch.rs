//! The per-message field dispatch loop.

use tracing::trace;

use crate::codec::{coerce, embedded, repeated};
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::schema::{FieldKind, MessageId, MessageSchema, Schema};
use crate::util::unlikely;
use crate::value::{DecodedMessage, Value};
use crate::wire::{self, Tag};

/// Decodes the fields of one message from a bound region of a cursor.
///
/// A dispatcher borrows the schema and holds no decode state, all of it
/// lives in the cursor and the destination message.
#[derive(Debug, Copy, Clone)]
pub struct FieldDispatcher<'s> {
    schema: &'s Schema,
    message: &'s MessageSchema,
}

impl<'s> FieldDispatcher<'s> {
    /// Create a dispatcher for message `id` of `schema`.
    pub fn new(schema: &'s Schema, id: MessageId) -> Self {
        FieldDispatcher {
            schema,
            message: schema.message(id),
        }
    }

    /// Decode fields until the current bound region of `cursor` is exhausted.
    ///
    /// `dst` must have been created for the same message. Fields may arrive
    /// in any order. A singular scalar that appears more than once keeps the
    /// last value, a singular message merges every occurrence, and repeated
    /// fields append. Unknown fields are skipped.
    pub fn dispatch(
        &self,
        cursor: &mut ByteCursor,
        dst: &mut DecodedMessage,
    ) -> Result<(), DecodeError> {
        while cursor.has_remaining() {
            let tag = wire::decode_tag(cursor)?;
            let Some(position) = self.message.position(tag.field_number) else {
                trace!(
                    message = self.message.name(),
                    field = tag.field_number,
                    wire_type = ?tag.wire_type,
                    "skipping unknown field"
                );
                wire::skip_value(cursor, tag.wire_type)?;
                continue;
            };
            self.decode_field(position, tag, cursor, dst)?;
        }
        Ok(())
    }

    #[inline]
    fn decode_field(
        &self,
        position: usize,
        tag: Tag,
        cursor: &mut ByteCursor,
        dst: &mut DecodedMessage,
    ) -> Result<(), DecodeError> {
        let field = &self.message.fields()[position];
        if unlikely(!field.accepts(tag.wire_type)) {
            return Err(DecodeError::WireTypeMismatch {
                field: tag.field_number,
                expected: field.kind.wire_type(),
                actual: tag.wire_type,
            });
        }

        let slot = dst.slot_mut(position);
        if field.is_repeated() {
            let mut values = match slot.take() {
                Some(Value::Repeated(values)) => values,
                _ => Vec::new(),
            };
            repeated::decode_into(self.schema, field, tag.wire_type, cursor, &mut values)?;
            *slot = Some(Value::Repeated(values));
            return Ok(());
        }

        let value = match field.kind {
            FieldKind::Message(id) => {
                let mut nested = match slot.take() {
                    Some(Value::Message(nested)) => nested,
                    _ => DecodedMessage::new(id, self.schema.message(id)),
                };
                embedded::decode_into(self.schema, id, cursor, &mut nested)?;
                Value::Message(nested)
            }
            kind => {
                let raw = wire::read_value(cursor, tag.wire_type, kind.varint_width())?;
                coerce(field, raw)?
            }
        };
        *slot = Some(value);
        Ok(())
    }
}
