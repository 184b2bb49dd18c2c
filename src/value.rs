//! Decoded values.

use bytes::Bytes;

use crate::schema::{FieldKind, FieldSchema, MessageId, MessageSchema, OutputType, ScalarKind};

/// A single decoded value, after the schema type and any output override
/// have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    /// Unsigned integer kinds, and [`OutputType::Uint`] overrides.
    Uint(u64),
    /// Signed integer kinds, and [`OutputType::Int`] overrides.
    Int(i64),
    /// Enum ordinal, which need not be a declared enumerator.
    Enum(i32),
    Bytes(Bytes),
    /// Text, passed through without UTF-8 validation.
    Text(Bytes),
    /// [`OutputType::Address`] and [`OutputType::AddressPayable`].
    Address([u8; 20]),
    /// [`OutputType::FixedBytes`], always exactly the declared length.
    FixedBytes(Bytes),
    /// [`OutputType::Uint256`] as a right-aligned big-endian word.
    Uint256([u8; 32]),
    Message(DecodedMessage),
    /// Elements of a repeated field in wire encounter order.
    Repeated(Vec<Value>),
}

impl Value {
    /// The value a singular field takes when absent from the input.
    pub fn default_for(field: &FieldSchema) -> Value {
        match (field.kind, field.output) {
            (FieldKind::Message(id), _) => Value::Message(DecodedMessage::empty_for(id)),
            (_, Some(OutputType::Address | OutputType::AddressPayable)) => {
                Value::Address([0; 20])
            }
            (_, Some(OutputType::FixedBytes(n))) => {
                Value::FixedBytes(Bytes::from(vec![0u8; usize::from(n)]))
            }
            (_, Some(OutputType::Uint256)) => Value::Uint256([0; 32]),
            (_, Some(OutputType::Uint(_))) => Value::Uint(0),
            (_, Some(OutputType::Int(_))) => Value::Int(0),
            (FieldKind::Enum(_), None) => Value::Enum(0),
            (FieldKind::Scalar(kind), None) => match kind {
                ScalarKind::Bool => Value::Bool(false),
                ScalarKind::Uint32
                | ScalarKind::Uint64
                | ScalarKind::Fixed32
                | ScalarKind::Fixed64 => Value::Uint(0),
                ScalarKind::Int32
                | ScalarKind::Int64
                | ScalarKind::Sint32
                | ScalarKind::Sint64
                | ScalarKind::Sfixed32
                | ScalarKind::Sfixed64 => Value::Int(0),
                ScalarKind::Bytes => Value::Bytes(Bytes::new()),
                ScalarKind::String => Value::Text(Bytes::new()),
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Enum(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Raw bytes of any byte-like value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::Text(b) | Value::FixedBytes(b) => Some(b),
            Value::Address(a) => Some(a),
            Value::Uint256(w) => Some(w),
            _ => None,
        }
    }

    /// Text as `&str`, `None` if the value is not text or not valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(b) => core::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DecodedMessage> {
        match self {
            Value::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_repeated(&self) -> Option<&[Value]> {
        match self {
            Value::Repeated(values) => Some(values),
            _ => None,
        }
    }
}

/// A decoded field of a [`DecodedMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub number: u32,
    /// `None` if a singular field never appeared. Repeated fields are always
    /// present, possibly empty.
    pub value: Option<Value>,
}

/// The fully decoded field set of one message.
///
/// Fields are stored in schema declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    message: MessageId,
    fields: Vec<DecodedField>,
}

impl DecodedMessage {
    /// A message with every field in its absent state.
    pub fn new(id: MessageId, schema: &MessageSchema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|field| DecodedField {
                number: field.number,
                value: field.is_repeated().then(|| Value::Repeated(Vec::new())),
            })
            .collect();
        DecodedMessage {
            message: id,
            fields,
        }
    }

    /// A message without any field entries, all lookups on it return `None`.
    pub(crate) fn empty_for(id: MessageId) -> Self {
        DecodedMessage {
            message: id,
            fields: Vec::new(),
        }
    }

    /// The schema message this value was decoded as.
    pub fn message_id(&self) -> MessageId {
        self.message
    }

    pub fn fields(&self) -> &[DecodedField] {
        &self.fields
    }

    /// Value of field `number`, `None` if absent or not declared.
    pub fn get(&self, number: u32) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.number == number)
            .and_then(|field| field.value.as_ref())
    }

    /// Value of the field named `name`.
    pub fn get_by_name(&self, schema: &MessageSchema, name: &str) -> Option<&Value> {
        let field = schema.fields().iter().find(|field| field.name == name)?;
        self.get(field.number)
    }

    /// Elements of the repeated field `number`, empty if absent.
    pub fn repeated(&self, number: u32) -> &[Value] {
        self.get(number)
            .and_then(Value::as_repeated)
            .unwrap_or_default()
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, position: usize) -> &mut Option<Value> {
        &mut self.fields[position].value
    }

    pub(crate) fn value_at(&self, position: usize) -> Option<&Value> {
        self.fields.get(position).and_then(|f| f.value.as_ref())
    }
}
