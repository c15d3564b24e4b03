//! Span-consistent search-and-replace over rich text.
//!
//! Text is held as plain characters plus a set of formatting spans measured in
//! chars. A replacement rewrites the text and re-derives every span so that
//! formatting stays attached to the characters it covered.
//!
//! # Span resolution
//!
//! For each occurrence `[start, end)`, every span takes the first rule that
//! matches:
//!
//! - **After**: span starts at or past `end`, shifts by the length delta
//! - **Contains**: span covers the whole window, grows or shrinks by the delta
//! - **Overlap left**: window covers the span's start, the remainder begins
//!   right after the inserted text
//! - **Overlap right**: window covers the span's end, the span is cut at `start`
//! - **Before**: untouched
//!
//! Spans left with no length are dropped. URL payloads of text links get the
//! same substitution independently of the main text.
//!
//! # Display form
//!
//! [`DocumentSnapshot`] keeps a markup rendering of its content, re-derived on
//! every mutation by [`markup::render`]. Older records that stored only that
//! markup are read back through [`markup::parse`].

mod document;
mod error;
pub mod markup;
mod replace;

pub use document::DocumentSnapshot;
pub use error::CoreError;
pub use replace::{ReplaceParams, Replacement, Replacer, replace};

/// Result type for replacement and document operations.
pub type Result<T> = std::result::Result<T, CoreError>;
