//! Mapping of decoded messages onto a fixed-arity output surface.
//!
//! The output surface accepts a bounded number of statically typed slots per
//! result and no variable-length element inside an array slot. A message is
//! therefore emitted as one or more ordered *parts*:
//!
//! - fields are split, in schema order, into parts of at most
//!   [`FlattenConfig::max_fields_per_part`] fields, named `{Message}Part{n}`;
//! - a singular scalar is one slot;
//! - a repeated fixed-width scalar is one array slot;
//! - a repeated text or bytes field becomes one slot per element,
//!   `name_0 .. name_{n-1}`, followed by a `name_len` count slot;
//! - a message field becomes a `name_len` count slot, and the nested
//!   messages are emitted as their own parts after the parent's.
//!
//! The split is a pure function of the schema, see [`OutputShape`]. Only the
//! number of indexed element slots depends on the decoded data. Slot names
//! are unique within a message, including the generated `_{i}` and `_len`
//! slots.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use smallvec::SmallVec;

use crate::config::FlattenConfig;
use crate::error::SchemaError;
use crate::schema::{FieldKind, FieldSchema, MessageId, OutputType, ScalarKind, Schema};
use crate::util::saturating_u64;
use crate::value::{DecodedMessage, Value};

/// Statically typed slot of the output surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SlotType {
    Bool,
    Uint(u16),
    Int(u16),
    Address,
    AddressPayable,
    FixedBytes(u8),
    Bytes,
    String,
}

impl SlotType {
    /// Slot type of a single element of `field`, `None` for message fields.
    pub fn for_field(field: &FieldSchema) -> Option<SlotType> {
        match field.kind {
            FieldKind::Message(_) => None,
            _ => Some(Self::element_type(field)),
        }
    }

    fn element_type(field: &FieldSchema) -> SlotType {
        if let Some(output) = field.output {
            return match output {
                OutputType::Address => SlotType::Address,
                OutputType::AddressPayable => SlotType::AddressPayable,
                OutputType::FixedBytes(n) => SlotType::FixedBytes(n),
                OutputType::Uint256 => SlotType::Uint(256),
                OutputType::Uint(bits) => SlotType::Uint(bits),
                OutputType::Int(bits) => SlotType::Int(bits),
            };
        }

        match field.kind {
            // Enums are open, undeclared values must survive.
            FieldKind::Enum(_) => SlotType::Int(32),
            FieldKind::Scalar(kind) => match kind {
                ScalarKind::Bool => SlotType::Bool,
                ScalarKind::Uint32 | ScalarKind::Fixed32 => SlotType::Uint(32),
                ScalarKind::Uint64 | ScalarKind::Fixed64 => SlotType::Uint(64),
                ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => SlotType::Int(32),
                ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => SlotType::Int(64),
                ScalarKind::Bytes => SlotType::Bytes,
                ScalarKind::String => SlotType::String,
            },
            FieldKind::Message(_) => SlotType::Bytes,
        }
    }

    /// Returns `true` if every value of this type has the same encoded size.
    pub fn is_fixed_width(self) -> bool {
        !matches!(self, SlotType::Bytes | SlotType::String)
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Bool => f.write_str("bool"),
            SlotType::Uint(bits) => write!(f, "uint{bits}"),
            SlotType::Int(bits) => write!(f, "int{bits}"),
            SlotType::Address => f.write_str("address"),
            SlotType::AddressPayable => f.write_str("address payable"),
            SlotType::FixedBytes(n) => write!(f, "bytes{n}"),
            SlotType::Bytes => f.write_str("bytes"),
            SlotType::String => f.write_str("string"),
        }
    }
}

/// Type of the `_len` count slots.
const COUNT_TYPE: SlotType = SlotType::Uint(64);

/// How a single field is laid out in its part.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotLayout {
    /// One slot holding the value.
    Scalar(SlotType),
    /// One array slot holding every element.
    Array(SlotType),
    /// One slot per element plus a count slot.
    Indexed(SlotType),
    /// A count slot, the messages follow as separate parts.
    Nested(MessageId),
}

/// A field's place in the output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotShape {
    /// Slot name, after the configured naming style is applied.
    pub name: String,
    pub field_number: u32,
    /// Position of the field in its message schema.
    position: usize,
    pub layout: SlotLayout,
}

/// Static shape of a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartShape {
    pub name: String,
    pub slots: Vec<SlotShape>,
}

/// Static output shape of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShape {
    message: MessageId,
    parts: Vec<PartShape>,
}

impl OutputShape {
    /// Computes the shape of message `id`.
    ///
    /// A message without fields still has one, empty, part. Fails if two
    /// slots of the message end up with the same name.
    pub fn for_message(
        schema: &Schema,
        id: MessageId,
        config: &FlattenConfig,
    ) -> Result<Self, SchemaError> {
        let message = schema.message(id);
        let slots: Vec<SlotShape> = message
            .fields()
            .iter()
            .enumerate()
            .map(|(position, field)| SlotShape {
                name: config.naming.apply(&field.name),
                field_number: field.number,
                position,
                layout: layout_of(field),
            })
            .collect();
        check_slot_names(message.name(), &slots)?;

        let part_name = |n: usize| format!("{}Part{}", message.name(), n + 1);
        let mut parts: Vec<PartShape> = slots
            .chunks(config.max_fields_per_part)
            .enumerate()
            .map(|(n, chunk)| PartShape {
                name: part_name(n),
                slots: chunk.to_vec(),
            })
            .collect();
        if parts.is_empty() {
            parts.push(PartShape {
                name: part_name(0),
                slots: Vec::new(),
            });
        }

        Ok(OutputShape { message: id, parts })
    }

    pub fn message_id(&self) -> MessageId {
        self.message
    }

    pub fn parts(&self) -> &[PartShape] {
        &self.parts
    }
}

/// Rejects slot names that clash once the `_len` and `_{i}` slots are
/// generated, e.g. a repeated `notes` next to a field named `notes_len`.
fn check_slot_names(message: &str, slots: &[SlotShape]) -> Result<(), SchemaError> {
    let duplicate = |slot: &str| SchemaError::DuplicateSlotName {
        message: message.to_owned(),
        slot: slot.to_owned(),
    };

    let mut names = HashSet::with_capacity(slots.len());
    for slot in slots {
        let name = match slot.layout {
            SlotLayout::Scalar(_) | SlotLayout::Array(_) => slot.name.clone(),
            SlotLayout::Indexed(_) | SlotLayout::Nested(_) => format!("{}_len", slot.name),
        };
        if names.contains(&name) {
            return Err(duplicate(name.as_str()));
        }
        names.insert(name);
    }

    // Element slots are only known at emit time, match their pattern instead.
    for slot in slots {
        if !matches!(slot.layout, SlotLayout::Indexed(_)) {
            continue;
        }
        let clash = names.iter().find(|name| {
            name.strip_prefix(slot.name.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(is_element_index)
        });
        if let Some(name) = clash {
            return Err(duplicate(name.as_str()));
        }
    }
    Ok(())
}

/// Returns `true` if `s` is an index as formatted in an element slot name.
fn is_element_index(s: &str) -> bool {
    let digits = !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits && (s == "0" || !s.starts_with('0'))
}

fn layout_of(field: &FieldSchema) -> SlotLayout {
    if let FieldKind::Message(id) = field.kind {
        return SlotLayout::Nested(id);
    }
    let ty = SlotType::element_type(field);
    if !field.is_repeated() {
        SlotLayout::Scalar(ty)
    } else if ty.is_fixed_width() {
        SlotLayout::Array(ty)
    } else {
        SlotLayout::Indexed(ty)
    }
}

impl fmt::Display for SlotShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.name;
        match self.layout {
            SlotLayout::Scalar(ty) => write!(f, "{ty} {name}"),
            SlotLayout::Array(ty) => write!(f, "{ty}[] {name}"),
            SlotLayout::Indexed(ty) => write!(f, "{ty} {name}_{{i}}, {COUNT_TYPE} {name}_len"),
            SlotLayout::Nested(_) => write!(f, "{COUNT_TYPE} {name}_len"),
        }
    }
}

impl fmt::Display for PartShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{slot}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Output shapes of every message in a schema.
#[derive(Debug, Clone)]
pub struct OutputShapes {
    shapes: BTreeMap<MessageId, OutputShape>,
}

impl OutputShapes {
    /// Computes the shapes of the configured output messages, and of every
    /// message nested in them. With no output messages configured every
    /// message is shaped.
    pub fn for_schema(schema: &Schema, config: &FlattenConfig) -> Result<Self, SchemaError> {
        let mut pending: Vec<MessageId> = if config.outputs.is_empty() {
            schema.message_ids().collect()
        } else {
            config
                .outputs
                .iter()
                .map(|name| {
                    schema
                        .message_id(name)
                        .ok_or_else(|| SchemaError::UnknownMessage { name: name.clone() })
                })
                .collect::<Result<_, _>>()?
        };

        let mut shapes = BTreeMap::new();
        while let Some(id) = pending.pop() {
            if shapes.contains_key(&id) {
                continue;
            }
            shapes.insert(id, OutputShape::for_message(schema, id, config)?);
            pending.extend(schema.message(id).fields().iter().filter_map(|field| {
                match field.kind {
                    FieldKind::Message(nested) => Some(nested),
                    _ => None,
                }
            }));
        }
        Ok(OutputShapes { shapes })
    }

    pub fn get(&self, id: MessageId) -> Option<&OutputShape> {
        self.shapes.get(&id)
    }
}

/// Value held by an emitted slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Scalar(Value),
    Array(Vec<Value>),
}

/// A named slot of an emitted part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub value: SlotValue,
}

/// One emitted result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    /// The message whose fields this part carries.
    pub message: MessageId,
    pub slots: SmallVec<[Slot; 8]>,
}

impl Part {
    /// The slot named `name`. Slot names are unique within a message.
    pub fn slot(&self, name: &str) -> Option<&SlotValue> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| &slot.value)
    }
}

/// Emits the parts of `message` followed by the parts of every message
/// nested in it, depth first, in field order and then element order.
///
/// Absent singular fields are emitted with their default value. Absent
/// singular messages have a count of 0 and emit no parts.
pub fn flatten(schema: &Schema, shapes: &OutputShapes, message: &DecodedMessage) -> Vec<Part> {
    let mut out = Vec::new();
    emit(schema, shapes, message, &mut out);
    out
}

fn emit(schema: &Schema, shapes: &OutputShapes, message: &DecodedMessage, out: &mut Vec<Part>) {
    let id = message.message_id();
    let Some(shape) = shapes.get(id) else {
        return;
    };
    let fields = schema.message(id).fields();

    let mut nested: Vec<&DecodedMessage> = Vec::new();
    for part_shape in &shape.parts {
        let mut part = Part {
            name: part_shape.name.clone(),
            message: id,
            slots: SmallVec::new(),
        };
        for slot in &part_shape.slots {
            let value = message.value_at(slot.position);
            match slot.layout {
                SlotLayout::Scalar(_) => {
                    let value = match (value, fields.get(slot.position)) {
                        (Some(value), _) => value.clone(),
                        (None, Some(field)) => Value::default_for(field),
                        (None, None) => continue,
                    };
                    part.slots.push(Slot {
                        name: slot.name.clone(),
                        value: SlotValue::Scalar(value),
                    });
                }
                SlotLayout::Array(_) => {
                    let elements = value.and_then(Value::as_repeated).unwrap_or_default();
                    part.slots.push(Slot {
                        name: slot.name.clone(),
                        value: SlotValue::Array(elements.to_vec()),
                    });
                }
                SlotLayout::Indexed(_) => {
                    let elements = value.and_then(Value::as_repeated).unwrap_or_default();
                    for (i, element) in elements.iter().enumerate() {
                        part.slots.push(Slot {
                            name: format!("{}_{i}", slot.name),
                            value: SlotValue::Scalar(element.clone()),
                        });
                    }
                    part.slots.push(count_slot(&slot.name, elements.len()));
                }
                SlotLayout::Nested(_) => {
                    let before = nested.len();
                    match value {
                        Some(Value::Message(m)) => nested.push(m),
                        Some(Value::Repeated(elements)) => {
                            nested.extend(elements.iter().filter_map(Value::as_message));
                        }
                        _ => (),
                    }
                    part.slots.push(count_slot(&slot.name, nested.len() - before));
                }
            }
        }
        out.push(part);
    }

    for m in nested {
        emit(schema, shapes, m, out);
    }
}

fn count_slot(name: &str, count: usize) -> Slot {
    Slot {
        name: format!("{name}_len"),
        value: SlotValue::Scalar(Value::Uint(saturating_u64(count))),
    }
}
