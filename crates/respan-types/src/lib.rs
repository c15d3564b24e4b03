//! Persisted vocabulary for respan.
//!
//! This crate is the leaf everything else builds on: document identifiers,
//! formatting spans with their record codec, and edit-history entries. It has
//! **no internal respan dependencies**.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`DocumentId`]    | Which document (numeric, ordered)            |
//! | [`Span`]          | Formatting annotation over plain text        |
//! | [`SpanKind`]      | Closed set of span kinds with payloads       |
//! | [`SpanRecord`]    | Serializable span form                       |
//! | [`EditRecord`]    | Before-state of one committed edit           |
//! | [`EditMode`]      | Local-only vs remote-synchronized commit     |
//! |-------------------|----------------------------------------------|

pub mod history;
pub mod ids;
pub mod span;

pub use history::{ContentCopy, EditMode, EditRecord};
pub use ids::DocumentId;
pub use span::{
    Span, SpanError, SpanKind, SpanRecord, SpanTag, decode, decode_value, encode,
    encode_all, span_list, try_decode,
};
