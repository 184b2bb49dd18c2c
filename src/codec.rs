//! Schema-driven decoding of protobuf messages.
//!
//! Merge semantics follow protobuf:
//! - Scalars: last value wins (overwrite)
//! - Embedded messages: recursive merge
//! - Repeated fields: append, packed and unpacked occurrences interleaved

mod coerce;
mod dispatch;
mod embedded;
mod repeated;

pub use coerce::coerce;
pub use dispatch::FieldDispatcher;
