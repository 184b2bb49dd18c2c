//! Error types for decoding and schema validation.

use thiserror::Error;

use crate::wire::WireType;

/// A terminal decode failure.
///
/// Any error aborts the entire top-level decode. Callers never observe a
/// partially decoded message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A read demanded more bytes than remain in the current bound region.
    #[error("out of bounds: needed {needed} bytes, {remaining} remaining")]
    OutOfBounds { needed: u64, remaining: usize },
    /// A varint did not terminate within its byte budget.
    #[error("malformed varint")]
    MalformedVarint,
    /// The tag carried a wire type we cannot interpret, e.g. deprecated groups.
    #[error("unsupported wire type: {value}")]
    UnsupportedWireType { value: u8 },
    /// The tag carried field number 0.
    #[error("invalid field number: {value}")]
    InvalidFieldNumber { value: u32 },
    /// A known field arrived with a wire type the schema does not allow.
    #[error("field {field}: expected wire type {expected:?}, got {actual:?}")]
    WireTypeMismatch {
        field: u32,
        expected: WireType,
        actual: WireType,
    },
    /// A length-delimited payload did not match its output override's length.
    #[error("field {field}: expected {expected} bytes, got {actual}")]
    InvalidFixedLength {
        field: u32,
        expected: usize,
        actual: usize,
    },
    /// An embedded message did not consume exactly its declared length.
    #[error("embedded message declared {expected} bytes but consumed {consumed}")]
    SubMessageBoundsViolation { expected: usize, consumed: usize },
}

/// Flat classification of a [`DecodeError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    OutOfBounds,
    MalformedVarint,
    UnsupportedWireType,
    InvalidFieldNumber,
    WireTypeMismatch,
    InvalidFixedLength,
    SubMessageBoundsViolation,
}

impl DecodeError {
    #[inline]
    pub(crate) fn out_of_bounds(needed: impl TryInto<u64>, remaining: usize) -> Self {
        DecodeError::OutOfBounds {
            needed: needed.try_into().unwrap_or(u64::MAX),
            remaining,
        }
    }

    #[inline]
    pub(crate) fn malformed_varint() -> Self {
        DecodeError::MalformedVarint
    }

    /// Returns the flat classification of this error.
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::OutOfBounds { .. } => DecodeErrorKind::OutOfBounds,
            DecodeError::MalformedVarint => DecodeErrorKind::MalformedVarint,
            DecodeError::UnsupportedWireType { .. } => DecodeErrorKind::UnsupportedWireType,
            DecodeError::InvalidFieldNumber { .. } => DecodeErrorKind::InvalidFieldNumber,
            DecodeError::WireTypeMismatch { .. } => DecodeErrorKind::WireTypeMismatch,
            DecodeError::InvalidFixedLength { .. } => DecodeErrorKind::InvalidFixedLength,
            DecodeError::SubMessageBoundsViolation { .. } => {
                DecodeErrorKind::SubMessageBoundsViolation
            }
        }
    }
}

/// Errors raised while validating a [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("message '{message}': field number {number} is out of range")]
    FieldNumberOutOfRange { message: String, number: u32 },
    #[error("message '{message}': field number {number} is used more than once")]
    DuplicateFieldNumber { message: String, number: u32 },
    #[error("message '{message}': field name '{field}' is used more than once")]
    DuplicateFieldName { message: String, field: String },
    #[error("'{name}' is defined more than once")]
    DuplicateTypeName { name: String },
    #[error("message '{message}', field '{field}': {reason}")]
    IncompatibleOverride {
        message: String,
        field: String,
        reason: &'static str,
    },
    #[error("message '{message}', field '{field}': unknown type reference")]
    UnknownReference { message: String, field: String },
    #[error("message '{message}': slot name '{slot}' is used more than once")]
    DuplicateSlotName { message: String, slot: String },
    #[error("unknown output message '{name}'")]
    UnknownMessage { name: String },
}
