//! Static description of the messages a [`Decoder`](crate::Decoder) understands.
//!
//! A [`Schema`] is an arena of messages and enums. Messages refer to each
//! other through [`MessageId`]s, so self-referencing and mutually recursive
//! schemas are representable without ownership cycles.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::SchemaError;
use crate::wire::{VarintWidth, WireType, MAXIMUM_FIELD_NUMBER, MINIMUM_FIELD_NUMBER};

/// Handle to a message in a [`Schema`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u32);

/// Handle to an enum in a [`Schema`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumId(u32);

impl MessageId {
    #[allow(clippy::as_conversions)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl EnumId {
    #[allow(clippy::as_conversions)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Protobuf scalar kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Uint32,
    Uint64,
    Int32,
    Int64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bytes,
    String,
}

impl ScalarKind {
    /// The wire type a single value of this kind is encoded with.
    pub const fn wire_type(self) -> WireType {
        match self {
            ScalarKind::Bool
            | ScalarKind::Uint32
            | ScalarKind::Uint64
            | ScalarKind::Int32
            | ScalarKind::Int64
            | ScalarKind::Sint32
            | ScalarKind::Sint64 => WireType::Varint,
            ScalarKind::Fixed64 | ScalarKind::Sfixed64 => WireType::I64,
            ScalarKind::Fixed32 | ScalarKind::Sfixed32 => WireType::I32,
            ScalarKind::Bytes | ScalarKind::String => WireType::Len,
        }
    }

    /// Width of the varint read for this kind.
    ///
    /// `int32` is sign-extended to 64 bits on the wire, so only the unsigned
    /// and zigzag 32-bit kinds use the narrow decoder.
    pub const fn varint_width(self) -> VarintWidth {
        match self {
            ScalarKind::Uint32 | ScalarKind::Sint32 => VarintWidth::W32,
            _ => VarintWidth::W64,
        }
    }

    /// Whether a repeated field of this kind may use the packed encoding.
    pub const fn is_packable(self) -> bool {
        !matches!(self, ScalarKind::Bytes | ScalarKind::String)
    }

    /// The proto keyword for this kind.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bytes => "bytes",
            ScalarKind::String => "string",
        }
    }

    const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::Uint32 | ScalarKind::Uint64 | ScalarKind::Fixed32 | ScalarKind::Fixed64
        )
    }

    const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            ScalarKind::Int32
                | ScalarKind::Int64
                | ScalarKind::Sint32
                | ScalarKind::Sint64
                | ScalarKind::Sfixed32
                | ScalarKind::Sfixed64
        )
    }
}

/// Logical type of a field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Enum(EnumId),
    Message(MessageId),
}

impl FieldKind {
    /// The wire type a single element of this kind is encoded with.
    pub const fn wire_type(self) -> WireType {
        match self {
            FieldKind::Scalar(kind) => kind.wire_type(),
            FieldKind::Enum(_) => WireType::Varint,
            FieldKind::Message(_) => WireType::Len,
        }
    }

    /// Width of the varint read for a single element.
    ///
    /// Enums are encoded like `int32`, sign-extended to 64 bits.
    pub const fn varint_width(self) -> VarintWidth {
        match self {
            FieldKind::Scalar(kind) => kind.varint_width(),
            FieldKind::Enum(_) | FieldKind::Message(_) => VarintWidth::W64,
        }
    }

    /// Whether a repeated field of this kind may use the packed encoding.
    pub const fn is_packable(self) -> bool {
        match self {
            FieldKind::Scalar(kind) => kind.is_packable(),
            FieldKind::Enum(_) => true,
            FieldKind::Message(_) => false,
        }
    }
}

/// Field cardinality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Label {
    #[default]
    Singular,
    Repeated,
}

/// A user declared output type that replaces a field's natural representation.
///
/// Byte-like overrides carry strict length rules: a payload of the wrong
/// size fails the whole decode rather than being truncated or padded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OutputType {
    /// A 20 byte account address, from a `bytes` field.
    Address,
    /// A 20 byte account address that may receive value, from a `bytes` field.
    AddressPayable,
    /// A byte string of exactly `n` bytes (`1..=32`), from a `bytes` field.
    FixedBytes(u8),
    /// A big-endian unsigned integer of at most 32 bytes, from a `bytes` field.
    Uint256,
    /// An unsigned integer narrowed to `bits` (`8..=256`, multiple of 8).
    Uint(u16),
    /// A signed integer narrowed to `bits` (`8..=256`, multiple of 8).
    Int(u16),
}

/// Length rule a byte-like [`OutputType`] enforces on its payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LengthRule {
    Exact(usize),
    AtMost(usize),
}

impl LengthRule {
    /// Whether a payload of `len` bytes satisfies the rule.
    pub fn admits(self, len: usize) -> bool {
        match self {
            LengthRule::Exact(n) => len == n,
            LengthRule::AtMost(n) => len <= n,
        }
    }

    /// The length reported when the rule is violated.
    pub fn bound(self) -> usize {
        match self {
            LengthRule::Exact(n) | LengthRule::AtMost(n) => n,
        }
    }
}

impl OutputType {
    /// Length rule for byte-like overrides, `None` for integer overrides.
    pub fn length_rule(self) -> Option<LengthRule> {
        match self {
            OutputType::Address | OutputType::AddressPayable => Some(LengthRule::Exact(20)),
            OutputType::FixedBytes(n) => Some(LengthRule::Exact(usize::from(n))),
            OutputType::Uint256 => Some(LengthRule::AtMost(32)),
            OutputType::Uint(_) | OutputType::Int(_) => None,
        }
    }

    /// Checks that the override may be applied to a field of `kind`.
    fn check(self, kind: FieldKind) -> Result<(), &'static str> {
        let scalar = match kind {
            FieldKind::Scalar(scalar) => scalar,
            FieldKind::Enum(_) => return Err("output overrides do not apply to enums"),
            FieldKind::Message(_) => return Err("output overrides do not apply to messages"),
        };
        match self {
            OutputType::Address
            | OutputType::AddressPayable
            | OutputType::FixedBytes(_)
            | OutputType::Uint256
                if scalar != ScalarKind::Bytes =>
            {
                Err("byte-like overrides require a bytes field")
            }
            OutputType::FixedBytes(n) if n == 0 || n > 32 => {
                Err("fixed byte length must be between 1 and 32")
            }
            OutputType::Uint(_) if !scalar.is_unsigned_integer() => {
                Err("unsigned overrides require an unsigned integer field")
            }
            OutputType::Int(_) if !scalar.is_signed_integer() => {
                Err("signed overrides require a signed integer field")
            }
            OutputType::Uint(bits) | OutputType::Int(bits)
                if bits == 0 || bits > 256 || bits % 8 != 0 =>
            {
                Err("integer width must be a multiple of 8 between 8 and 256")
            }
            _ => Ok(()),
        }
    }
}

/// Compile-time description of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub number: u32,
    pub kind: FieldKind,
    pub label: Label,
    pub output: Option<OutputType>,
}

impl FieldSchema {
    /// A singular scalar field.
    pub fn scalar(name: impl Into<String>, number: u32, kind: ScalarKind) -> Self {
        Self::new(name, number, FieldKind::Scalar(kind))
    }

    /// A singular enum field.
    pub fn enumeration(name: impl Into<String>, number: u32, id: EnumId) -> Self {
        Self::new(name, number, FieldKind::Enum(id))
    }

    /// A singular embedded message field.
    pub fn message(name: impl Into<String>, number: u32, id: MessageId) -> Self {
        Self::new(name, number, FieldKind::Message(id))
    }

    fn new(name: impl Into<String>, number: u32, kind: FieldKind) -> Self {
        FieldSchema {
            name: name.into(),
            number,
            kind,
            label: Label::Singular,
            output: None,
        }
    }

    /// Mark the field as `repeated`.
    pub fn repeated(mut self) -> Self {
        self.label = Label::Repeated;
        self
    }

    /// Attach an output override.
    pub fn with_output(mut self, output: OutputType) -> Self {
        self.output = Some(output);
        self
    }

    /// Returns `true` if the field is `repeated`.
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    /// Whether a payload with `wire_type` is acceptable for this field.
    ///
    /// Repeated packable fields accept both their element wire type and the
    /// packed, length-delimited form.
    pub fn accepts(&self, wire_type: WireType) -> bool {
        wire_type == self.kind.wire_type()
            || (self.is_repeated() && self.kind.is_packable() && wire_type == WireType::Len)
    }
}

/// Compile-time description of a message.
#[derive(Debug, Clone)]
pub struct MessageSchema {
    name: String,
    fields: Vec<FieldSchema>,
    /// Field number to position in `fields`.
    lookup: BTreeMap<u32, usize>,
}

impl MessageSchema {
    fn new(name: String) -> Self {
        MessageSchema {
            name,
            fields: Vec::new(),
            lookup: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Position of the field with `number`, if the message declares one.
    #[inline]
    pub fn position(&self, number: u32) -> Option<usize> {
        self.lookup.get(&number).copied()
    }

    pub fn field(&self, number: u32) -> Option<&FieldSchema> {
        self.position(number).map(|idx| &self.fields[idx])
    }
}

/// Compile-time description of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

impl EnumSchema {
    /// Name of the enumerator with `value`, if declared.
    ///
    /// Undeclared values are still valid on the wire.
    pub fn value_name(&self, value: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }
}

/// A validated set of messages and enums.
#[derive(Debug, Clone)]
pub struct Schema {
    messages: Vec<MessageSchema>,
    enums: Vec<EnumSchema>,
    by_name: HashMap<String, MessageId>,
}

impl Schema {
    /// Look up a message by id.
    ///
    /// # Panics
    ///
    /// Ids are only minted by the [`SchemaBuilder`] that produced this
    /// schema, using one from another schema is a programming error.
    pub fn message(&self, id: MessageId) -> &MessageSchema {
        &self.messages[id.index()]
    }

    pub fn enumeration(&self, id: EnumId) -> &EnumSchema {
        &self.enums[id.index()]
    }

    /// Look up a message id by name.
    pub fn message_id(&self, name: &str) -> Option<MessageId> {
        self.by_name.get(name).copied()
    }

    /// All message ids in declaration order.
    pub fn message_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        (0..self.messages.len()).map(|idx| MessageId(u32::try_from(idx).unwrap_or(u32::MAX)))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Incrementally builds a [`Schema`].
///
/// Messages are declared before their fields are added so that fields can
/// refer to messages declared later, or to their own message.
///
/// ```
/// use protoflat::schema::{FieldSchema, ScalarKind, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new();
/// let node = builder.declare_message("Node");
/// builder
///     .add_field(node, FieldSchema::scalar("value", 1, ScalarKind::Uint64))
///     .add_field(node, FieldSchema::message("next", 2, node));
/// let schema = builder.build().unwrap();
/// assert_eq!(schema.message(node).fields().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    messages: Vec<MessageSchema>,
    enums: Vec<EnumSchema>,
    /// Fields added to a message this builder never declared.
    undeclared: Vec<(MessageId, String)>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a message, returning the id fields can refer to.
    pub fn declare_message(&mut self, name: impl Into<String>) -> MessageId {
        let id = MessageId(u32::try_from(self.messages.len()).unwrap_or(u32::MAX));
        self.messages.push(MessageSchema::new(name.into()));
        id
    }

    /// Add an enum.
    pub fn add_enum<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (S, i32)>,
    ) -> EnumId {
        let id = EnumId(u32::try_from(self.enums.len()).unwrap_or(u32::MAX));
        self.enums.push(EnumSchema {
            name: name.into(),
            values: values.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        });
        id
    }

    /// Append a field to `message`.
    ///
    /// Validation is deferred to [`SchemaBuilder::build`], which also rejects
    /// a `message` id minted by another builder.
    pub fn add_field(&mut self, message: MessageId, field: FieldSchema) -> &mut Self {
        match self.messages.get_mut(message.index()) {
            Some(schema) => schema.fields.push(field),
            None => self.undeclared.push((message, field.name)),
        }
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some((id, field)) = self.undeclared.into_iter().next() {
            return Err(SchemaError::UnknownReference {
                message: format!("#{}", id.0),
                field,
            });
        }

        let mut seen_types = HashSet::new();
        for name in self
            .messages
            .iter()
            .map(|m| &m.name)
            .chain(self.enums.iter().map(|e| &e.name))
        {
            if !seen_types.insert(name.as_str()) {
                return Err(SchemaError::DuplicateTypeName { name: name.clone() });
            }
        }

        let message_count = self.messages.len();
        let enum_count = self.enums.len();
        let mut messages = self.messages;
        for message in &mut messages {
            let mut names = HashSet::new();
            for (idx, field) in message.fields.iter().enumerate() {
                if !(MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&field.number) {
                    return Err(SchemaError::FieldNumberOutOfRange {
                        message: message.name.clone(),
                        number: field.number,
                    });
                }
                if message.lookup.insert(field.number, idx).is_some() {
                    return Err(SchemaError::DuplicateFieldNumber {
                        message: message.name.clone(),
                        number: field.number,
                    });
                }
                if !names.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateFieldName {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }

                let dangling = match field.kind {
                    FieldKind::Message(id) => id.index() >= message_count,
                    FieldKind::Enum(id) => id.index() >= enum_count,
                    FieldKind::Scalar(_) => false,
                };
                if dangling {
                    return Err(SchemaError::UnknownReference {
                        message: message.name.clone(),
                        field: field.name.clone(),
                    });
                }

                if let Some(output) = field.output {
                    output
                        .check(field.kind)
                        .map_err(|reason| SchemaError::IncompatibleOverride {
                            message: message.name.clone(),
                            field: field.name.clone(),
                            reason,
                        })?;
                }
            }
        }

        let by_name = messages
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let id = MessageId(u32::try_from(idx).unwrap_or(u32::MAX));
                (m.name.clone(), id)
            })
            .collect();

        Ok(Schema {
            messages,
            enums: self.enums,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_types() {
        assert_eq!(ScalarKind::Sint64.wire_type(), WireType::Varint);
        assert_eq!(ScalarKind::Fixed32.wire_type(), WireType::I32);
        assert_eq!(ScalarKind::Sfixed64.wire_type(), WireType::I64);
        assert_eq!(ScalarKind::String.wire_type(), WireType::Len);
        assert_eq!(ScalarKind::Uint32.varint_width(), VarintWidth::W32);
        assert_eq!(ScalarKind::Int32.varint_width(), VarintWidth::W64);
    }

    #[test]
    fn test_accepts_packed_and_unpacked() {
        let field = FieldSchema::scalar("nums", 1, ScalarKind::Uint64).repeated();
        assert!(field.accepts(WireType::Varint));
        assert!(field.accepts(WireType::Len));
        assert!(!field.accepts(WireType::I64));

        let field = FieldSchema::scalar("num", 1, ScalarKind::Uint64);
        assert!(!field.accepts(WireType::Len));

        let field = FieldSchema::scalar("names", 1, ScalarKind::String).repeated();
        assert!(field.accepts(WireType::Len));
        assert!(!field.accepts(WireType::Varint));
    }

    #[test]
    fn test_build_and_lookup() {
        let mut builder = SchemaBuilder::new();
        let color = builder.add_enum("Color", [("RED", 0), ("GREEN", 1)]);
        let inner = builder.declare_message("Inner");
        let outer = builder.declare_message("Outer");
        builder
            .add_field(outer, FieldSchema::message("inner", 7, inner))
            .add_field(outer, FieldSchema::enumeration("color", 2, color))
            .add_field(inner, FieldSchema::scalar("id", 1, ScalarKind::Uint32));
        let schema = builder.build().unwrap();

        assert_eq!(schema.message_id("Outer"), Some(outer));
        let message = schema.message(outer);
        assert_eq!(message.name(), "Outer");
        assert_eq!(message.position(2), Some(1));
        assert_eq!(message.field(7).unwrap().name, "inner");
        assert!(message.field(3).is_none());
        assert_eq!(schema.enumeration(color).value_name(1), Some("GREEN"));
        assert_eq!(schema.enumeration(color).value_name(9), None);
        assert_eq!(schema.message_ids().collect::<Vec<_>>(), vec![inner, outer]);
    }

    #[test]
    fn test_rejects_duplicate_numbers() {
        let mut builder = SchemaBuilder::new();
        let msg = builder.declare_message("Msg");
        builder
            .add_field(msg, FieldSchema::scalar("a", 1, ScalarKind::Bool))
            .add_field(msg, FieldSchema::scalar("b", 1, ScalarKind::Bool));
        assert_eq!(
            builder.build().unwrap_err(),
            SchemaError::DuplicateFieldNumber {
                message: "Msg".into(),
                number: 1
            }
        );
    }

    #[test]
    fn test_rejects_field_on_foreign_message() {
        let mut other = SchemaBuilder::new();
        other.declare_message("A");
        let foreign = other.declare_message("B");

        let mut builder = SchemaBuilder::new();
        builder.declare_message("Only");
        builder.add_field(foreign, FieldSchema::scalar("lost", 1, ScalarKind::Bool));
        assert_eq!(
            builder.build().unwrap_err(),
            SchemaError::UnknownReference {
                message: "#1".into(),
                field: "lost".into()
            }
        );
    }

    #[test]
    fn test_rejects_field_number_zero() {
        let mut builder = SchemaBuilder::new();
        let msg = builder.declare_message("Msg");
        builder.add_field(msg, FieldSchema::scalar("a", 0, ScalarKind::Bool));
        assert!(matches!(
            builder.build(),
            Err(SchemaError::FieldNumberOutOfRange { number: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_type_names() {
        let mut builder = SchemaBuilder::new();
        builder.declare_message("Thing");
        builder.add_enum("Thing", [("A", 0)]);
        assert!(matches!(
            builder.build(),
            Err(SchemaError::DuplicateTypeName { .. })
        ));
    }

    #[test]
    fn test_override_compatibility() {
        #[track_caller]
        fn check(kind: ScalarKind, output: OutputType) -> Result<Schema, SchemaError> {
            let mut builder = SchemaBuilder::new();
            let msg = builder.declare_message("Msg");
            builder.add_field(msg, FieldSchema::scalar("f", 1, kind).with_output(output));
            builder.build()
        }

        assert!(check(ScalarKind::Bytes, OutputType::Address).is_ok());
        assert!(check(ScalarKind::Bytes, OutputType::FixedBytes(32)).is_ok());
        assert!(check(ScalarKind::Bytes, OutputType::Uint256).is_ok());
        assert!(check(ScalarKind::Uint32, OutputType::Uint(8)).is_ok());
        assert!(check(ScalarKind::Uint64, OutputType::Uint(256)).is_ok());
        assert!(check(ScalarKind::Sint64, OutputType::Int(16)).is_ok());

        assert!(check(ScalarKind::String, OutputType::Address).is_err());
        assert!(check(ScalarKind::Uint64, OutputType::Address).is_err());
        assert!(check(ScalarKind::Bytes, OutputType::FixedBytes(0)).is_err());
        assert!(check(ScalarKind::Bytes, OutputType::FixedBytes(33)).is_err());
        assert!(check(ScalarKind::Int32, OutputType::Uint(8)).is_err());
        assert!(check(ScalarKind::Uint32, OutputType::Uint(12)).is_err());
        assert!(check(ScalarKind::Bool, OutputType::Uint(8)).is_err());
    }

    #[test]
    fn test_rejects_override_on_message() {
        let mut builder = SchemaBuilder::new();
        let msg = builder.declare_message("Msg");
        builder.add_field(
            msg,
            FieldSchema::message("child", 1, msg).with_output(OutputType::Address),
        );
        assert!(matches!(
            builder.build(),
            Err(SchemaError::IncompatibleOverride { .. })
        ));
    }

    #[test]
    fn test_length_rules() {
        let rule = OutputType::Address.length_rule().unwrap();
        assert!(rule.admits(20));
        assert!(!rule.admits(19));
        assert!(!rule.admits(21));

        let rule = OutputType::Uint256.length_rule().unwrap();
        assert!(rule.admits(0));
        assert!(rule.admits(32));
        assert!(!rule.admits(33));

        assert_eq!(OutputType::Uint(8).length_rule(), None);
    }
}
