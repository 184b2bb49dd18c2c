//! Top-level entry points.

use bytes::Bytes;
use tracing::debug;

use crate::codec::FieldDispatcher;
use crate::config::FlattenConfig;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::flatten::{self, OutputShape, OutputShapes, Part};
use crate::schema::{MessageId, Schema};
use crate::value::DecodedMessage;

/// Decodes messages of a fixed [`Schema`] and flattens them into parts.
///
/// Output shapes are computed once, up front. A `Decoder` holds no
/// per-call state and may be shared freely between threads.
///
/// ```
/// use protoflat::schema::{FieldSchema, ScalarKind, SchemaBuilder};
/// use protoflat::{Decoder, FlattenConfig, Value};
///
/// let mut builder = SchemaBuilder::new();
/// let msg = builder.declare_message("Msg");
/// builder.add_field(msg, FieldSchema::scalar("id", 1, ScalarKind::Uint32));
/// let decoder = Decoder::new(builder.build().unwrap(), FlattenConfig::new()).unwrap();
///
/// let decoded = decoder.decode(msg, &[0x08, 0x96, 0x01][..]).unwrap();
/// assert_eq!(decoded.get(1), Some(&Value::Uint(150)));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    schema: Schema,
    config: FlattenConfig,
    shapes: OutputShapes,
}

static_assertions::assert_impl_all!(Decoder: Send, Sync);

impl Decoder {
    /// Fails if the output shapes cannot be computed, e.g. when two slots of
    /// a message would share a name.
    pub fn new(schema: Schema, config: FlattenConfig) -> Result<Self, SchemaError> {
        let shapes = OutputShapes::for_schema(&schema, &config)?;
        Ok(Decoder {
            schema,
            config,
            shapes,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// The output shape of message `id`.
    pub fn shape(&self, id: MessageId) -> Option<&OutputShape> {
        self.shapes.get(id)
    }

    /// Decode `data` as a complete message `id`.
    ///
    /// The whole buffer must be consumed. Any error aborts the decode.
    pub fn decode(
        &self,
        id: MessageId,
        data: impl Into<Bytes>,
    ) -> Result<DecodedMessage, DecodeError> {
        let mut cursor = ByteCursor::new(data);
        let mut message = DecodedMessage::new(id, self.schema.message(id));
        FieldDispatcher::new(&self.schema, id)
            .dispatch(&mut cursor, &mut message)
            .map_err(|err| {
                debug!(
                    message = self.schema.message(id).name(),
                    position = cursor.position(),
                    error = %err,
                    "decode failed"
                );
                err
            })?;
        Ok(message)
    }

    /// Decode `data` as message `id` and flatten it into parts.
    ///
    /// On failure no parts are produced. A message left out of the output by
    /// [`FlattenConfig::output_message`] decodes, but yields no parts.
    pub fn decode_parts(
        &self,
        id: MessageId,
        data: impl Into<Bytes>,
    ) -> Result<Vec<Part>, DecodeError> {
        let message = self.decode(id, data)?;
        Ok(self.flatten(&message))
    }

    /// Flatten an already decoded message into parts.
    pub fn flatten(&self, message: &DecodedMessage) -> Vec<Part> {
        flatten::flatten(&self.schema, &self.shapes, message)
    }
}
