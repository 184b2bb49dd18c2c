//! Shared fixtures: prost messages used as the reference encoder, and the
//! matching schemas.

#![allow(dead_code)]

use protoflat::schema::{EnumId, FieldSchema, OutputType, ScalarKind};
use protoflat::{MessageId, Schema, SchemaBuilder};

/// The six field message from the basic decoding scenario.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Msg1 {
    #[prost(uint32, tag = "1")]
    pub f1: u32,
    #[prost(uint64, tag = "2")]
    pub f2: u64,
    #[prost(bool, tag = "3")]
    pub f3: bool,
    #[prost(bytes = "vec", tag = "4")]
    pub f4: Vec<u8>,
    #[prost(string, tag = "5")]
    pub f5: String,
    #[prost(uint32, repeated, tag = "6")]
    pub f6: Vec<u32>,
}

pub fn msg1_schema() -> (Schema, MessageId) {
    let mut builder = SchemaBuilder::new();
    let msg = builder.declare_message("Msg1");
    builder
        .add_field(msg, FieldSchema::scalar("f1", 1, ScalarKind::Uint32))
        .add_field(msg, FieldSchema::scalar("f2", 2, ScalarKind::Uint64))
        .add_field(msg, FieldSchema::scalar("f3", 3, ScalarKind::Bool))
        .add_field(
            msg,
            FieldSchema::scalar("f4", 4, ScalarKind::Bytes).with_output(OutputType::FixedBytes(4)),
        )
        .add_field(msg, FieldSchema::scalar("f5", 5, ScalarKind::String))
        .add_field(msg, FieldSchema::scalar("f6", 6, ScalarKind::Uint32).repeated());
    (builder.build().unwrap(), msg)
}

/// One field of every integer kind.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Scalars {
    #[prost(int32, tag = "1")]
    pub a: i32,
    #[prost(int64, tag = "2")]
    pub b: i64,
    #[prost(sint32, tag = "3")]
    pub c: i32,
    #[prost(sint64, tag = "4")]
    pub d: i64,
    #[prost(fixed32, tag = "5")]
    pub e: u32,
    #[prost(fixed64, tag = "6")]
    pub f: u64,
    #[prost(sfixed32, tag = "7")]
    pub g: i32,
    #[prost(sfixed64, tag = "8")]
    pub h: i64,
    #[prost(uint32, tag = "9")]
    pub i: u32,
    #[prost(uint64, tag = "10")]
    pub j: u64,
    #[prost(bool, tag = "11")]
    pub k: bool,
}

pub fn scalars_schema() -> (Schema, MessageId) {
    let mut builder = SchemaBuilder::new();
    let msg = builder.declare_message("Scalars");
    let kinds = [
        ("a", ScalarKind::Int32),
        ("b", ScalarKind::Int64),
        ("c", ScalarKind::Sint32),
        ("d", ScalarKind::Sint64),
        ("e", ScalarKind::Fixed32),
        ("f", ScalarKind::Fixed64),
        ("g", ScalarKind::Sfixed32),
        ("h", ScalarKind::Sfixed64),
        ("i", ScalarKind::Uint32),
        ("j", ScalarKind::Uint64),
        ("k", ScalarKind::Bool),
    ];
    for (number, (name, kind)) in (1..).zip(kinds) {
        builder.add_field(msg, FieldSchema::scalar(name, number, kind));
    }
    (builder.build().unwrap(), msg)
}

/// Repeated numeric fields in the packed encoding.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Packed {
    #[prost(sint64, repeated, tag = "1")]
    pub nums: Vec<i64>,
    #[prost(fixed32, repeated, tag = "2")]
    pub fixed: Vec<u32>,
    #[prost(int32, repeated, tag = "3")]
    pub colors: Vec<i32>,
}

/// The same fields as [`Packed`], one tag per element.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Unpacked {
    #[prost(sint64, repeated, packed = "false", tag = "1")]
    pub nums: Vec<i64>,
    #[prost(fixed32, repeated, packed = "false", tag = "2")]
    pub fixed: Vec<u32>,
    #[prost(int32, repeated, packed = "false", tag = "3")]
    pub colors: Vec<i32>,
}

pub fn repeated_schema() -> (Schema, MessageId) {
    let mut builder = SchemaBuilder::new();
    let color = builder.add_enum("Color", [("RED", 0), ("GREEN", 1), ("BLUE", 2)]);
    let msg = builder.declare_message("Numbers");
    builder
        .add_field(msg, FieldSchema::scalar("nums", 1, ScalarKind::Sint64).repeated())
        .add_field(msg, FieldSchema::scalar("fixed", 2, ScalarKind::Fixed32).repeated())
        .add_field(msg, FieldSchema::enumeration("colors", 3, color).repeated());
    (builder.build().unwrap(), msg)
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Account {
    #[prost(bytes = "vec", tag = "1")]
    pub owner: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub balance: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Ledger {
    #[prost(string, tag = "1")]
    pub ledger_name: String,
    #[prost(message, optional, tag = "2")]
    pub primary: Option<Account>,
    #[prost(message, repeated, tag = "3")]
    pub others: Vec<Account>,
    #[prost(string, repeated, tag = "4")]
    pub notes: Vec<String>,
    #[prost(int32, tag = "5")]
    pub status: i32,
}

pub struct LedgerSchema {
    pub schema: Schema,
    pub ledger: MessageId,
    pub account: MessageId,
    pub status: EnumId,
}

pub fn ledger_schema() -> LedgerSchema {
    let mut builder = SchemaBuilder::new();
    let status = builder.add_enum("Status", [("ACTIVE", 0), ("FROZEN", 1)]);
    let ledger = builder.declare_message("Ledger");
    let account = builder.declare_message("Account");
    builder
        .add_field(ledger, FieldSchema::scalar("ledger_name", 1, ScalarKind::String))
        .add_field(ledger, FieldSchema::message("primary", 2, account))
        .add_field(ledger, FieldSchema::message("others", 3, account).repeated())
        .add_field(ledger, FieldSchema::scalar("notes", 4, ScalarKind::String).repeated())
        .add_field(ledger, FieldSchema::enumeration("status", 5, status))
        .add_field(
            account,
            FieldSchema::scalar("owner", 1, ScalarKind::Bytes).with_output(OutputType::Address),
        )
        .add_field(
            account,
            FieldSchema::scalar("balance", 2, ScalarKind::Bytes).with_output(OutputType::Uint256),
        );
    LedgerSchema {
        schema: builder.build().unwrap(),
        ledger,
        account,
        status,
    }
}

/// Repeated byte fields carrying output overrides, and an embedded message
/// with one of its own.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Payouts {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub addrs: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub payables: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub hashes: Vec<Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub amounts: Vec<Vec<u8>>,
    #[prost(message, optional, tag = "5")]
    pub receipt: Option<Receipt>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Receipt {
    #[prost(bytes = "vec", tag = "1")]
    pub digest: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub block: u64,
}

pub struct PayoutsSchema {
    pub schema: Schema,
    pub payouts: MessageId,
    pub receipt: MessageId,
}

pub fn payouts_schema() -> PayoutsSchema {
    let mut builder = SchemaBuilder::new();
    let payouts = builder.declare_message("Payouts");
    let receipt = builder.declare_message("Receipt");
    let bytes = |name: &str, number: u32, output: OutputType| {
        FieldSchema::scalar(name, number, ScalarKind::Bytes).with_output(output)
    };
    builder
        .add_field(payouts, bytes("addrs", 1, OutputType::Address).repeated())
        .add_field(payouts, bytes("payables", 2, OutputType::AddressPayable).repeated())
        .add_field(payouts, bytes("hashes", 3, OutputType::FixedBytes(32)).repeated())
        .add_field(payouts, bytes("amounts", 4, OutputType::Uint256).repeated())
        .add_field(payouts, FieldSchema::message("receipt", 5, receipt))
        .add_field(receipt, bytes("digest", 1, OutputType::FixedBytes(32)))
        .add_field(receipt, FieldSchema::scalar("block", 2, ScalarKind::Uint64));
    PayoutsSchema {
        schema: builder.build().unwrap(),
        payouts,
        receipt,
    }
}

/// Encode a single field with wire type `wire_type` and the given payload.
///
/// `payload` is the raw payload for fixed-width wire types, the value bytes
/// for length-delimited fields, and is ignored for varints, which encode
/// `varint` instead.
pub fn encode_field(field_number: u32, wire_type: u8, varint: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    let tag = (u64::from(field_number) << 3) | u64::from(wire_type);
    leb128::write::unsigned(&mut buf, tag).unwrap();
    match wire_type {
        0 => {
            leb128::write::unsigned(&mut buf, varint).unwrap();
        }
        2 => {
            leb128::write::unsigned(&mut buf, payload.len() as u64).unwrap();
            buf.extend_from_slice(payload);
        }
        _ => buf.extend_from_slice(payload),
    }
    buf
}
