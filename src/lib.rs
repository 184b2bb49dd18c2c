//! Schema-driven protobuf decoding onto a flat, fixed-arity output surface.
//!
//! A [`Schema`] describes the messages to decode. A [`Decoder`] decodes
//! buffers into [`DecodedMessage`]s and flattens those into ordered
//! [`Part`]s of named, statically typed slots.

#![deny(clippy::as_conversions)]

pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod flatten;
// Public so callers can decode raw varints outside a schema.
pub mod leb128;
pub mod schema;
pub mod value;
pub mod wire;

mod decoder;
mod util;

pub use config::{FlattenConfig, NamingStyle};
pub use decoder::Decoder;
pub use error::{DecodeError, DecodeErrorKind, SchemaError};
pub use flatten::{OutputShape, Part, Slot, SlotValue};
pub use schema::{MessageId, Schema, SchemaBuilder};
pub use value::{DecodedMessage, Value};
