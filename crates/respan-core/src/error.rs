//! Error types for the replacement engine and document model.

use thiserror::Error;

/// Errors that can occur while preparing or applying a replacement.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// The search string is empty; there is nothing to look for.
    #[error("search text cannot be empty")]
    EmptySearch,

    /// The escaped search pattern could not be compiled.
    #[error("invalid search pattern: {0}")]
    Pattern(String),

    /// A mutation carried a span that does not fit the new text.
    #[error("span at {offset}+{length} exceeds text length {text_len}")]
    SpanOutOfBounds {
        offset: usize,
        length: usize,
        text_len: usize,
    },
}
