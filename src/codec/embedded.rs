//! Decoding of length-delimited embedded messages.

use crate::codec::FieldDispatcher;
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::schema::{MessageId, Schema};
use crate::value::DecodedMessage;
use crate::wire;

/// Decodes one embedded message payload, merging it into `dst`.
///
/// The nested dispatcher only ever sees the declared `len` bytes. Once it
/// returns, the cursor must sit exactly at the end of that region.
#[inline]
pub(crate) fn decode_into(
    schema: &Schema,
    id: MessageId,
    cursor: &mut ByteCursor,
    dst: &mut DecodedMessage,
) -> Result<(), DecodeError> {
    let len = wire::decode_len(cursor)?;
    let region = cursor.push_limit(len)?;
    FieldDispatcher::new(schema, id).dispatch(cursor, dst)?;
    cursor.pop_limit(region)
}

/// Decodes one embedded message payload into a fresh message.
#[inline]
pub(crate) fn decode(
    schema: &Schema,
    id: MessageId,
    cursor: &mut ByteCursor,
) -> Result<DecodedMessage, DecodeError> {
    let mut message = DecodedMessage::new(id, schema.message(id));
    decode_into(schema, id, cursor, &mut message)?;
    Ok(message)
}
