//! Document snapshots: the owning record for one piece of rich text.
//!
//! A snapshot holds the authoritative `plain_text`, the spans measured
//! against it, a derived `display_text` and the append-only edit history.
//! Text and spans only ever change together through
//! [`DocumentSnapshot::apply_mutation`], which re-renders the display form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use respan_types::{ContentCopy, EditRecord, Span, span_list};

use crate::markup;
use crate::{CoreError, Result};

/// One versionable unit of rich text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    plain_text: String,
    #[serde(default, with = "span_list")]
    spans: Vec<Span>,
    #[serde(default)]
    display_text: String,
    #[serde(default)]
    edit_history: Vec<EditRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    edited_remotely: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    restored_from_backup: bool,
}

impl DocumentSnapshot {
    /// Snapshot of `text` with `spans`. Spans that do not fit are dropped.
    pub fn new(text: impl Into<String>, spans: Vec<Span>) -> Self {
        let plain_text = text.into();
        let spans = normalize(&plain_text, spans);
        let display_text = markup::render(&plain_text, &spans);
        Self {
            plain_text,
            spans,
            display_text,
            ..Default::default()
        }
    }

    /// Snapshot known only by its display markup, as older records were
    /// stored. Text and spans are recovered on demand by
    /// [`effective_spans`](Self::effective_spans).
    pub fn legacy(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            ..Default::default()
        }
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn edited_remotely(&self) -> bool {
        self.edited_remotely
    }

    pub fn restored_from_backup(&self) -> bool {
        self.restored_from_backup
    }

    /// Text and spans to run a replacement against.
    ///
    /// Stored spans win. Without them the display markup is parsed, unless it
    /// is nothing more than the escaped plain text. Markup that does not parse
    /// is taken verbatim as the text, with no spans.
    pub fn effective_spans(&self) -> (String, Vec<Span>) {
        if !self.spans.is_empty() {
            return (self.plain_text.clone(), self.spans.clone());
        }

        let plain_display = markup::render(&self.plain_text, &[]);
        if !self.display_text.is_empty() && self.display_text != plain_display {
            match markup::parse(&self.display_text) {
                Some((text, spans)) => {
                    debug!(spans = spans.len(), "recovered spans from display markup");
                    return (text, spans);
                }
                None => {
                    debug!("display markup did not parse, using it as raw text");
                    return (self.display_text.clone(), Vec::new());
                }
            }
        }

        (self.plain_text.clone(), Vec::new())
    }

    /// Current effective content as a history copy.
    pub fn content(&self) -> ContentCopy {
        let (text, spans) = self.effective_spans();
        ContentCopy::new(text, spans)
    }

    /// Replace text and spans as one unit and re-render the display form.
    ///
    /// Every span is checked against `new_text` first; on failure the
    /// snapshot is left exactly as it was.
    pub fn apply_mutation(&mut self, new_text: impl Into<String>, mut new_spans: Vec<Span>) -> Result<()> {
        let new_text = new_text.into();
        let text_len = new_text.chars().count();

        if let Some(bad) = new_spans.iter().find(|s| !s.fits(text_len)) {
            return Err(CoreError::SpanOutOfBounds {
                offset: bad.offset,
                length: bad.length,
                text_len,
            });
        }
        new_spans.sort_by_key(|s| s.offset);

        self.display_text = markup::render(&new_text, &new_spans);
        self.plain_text = new_text;
        self.spans = new_spans;
        self.last_modified = Some(Utc::now());
        Ok(())
    }

    pub fn history(&self) -> &[EditRecord] {
        &self.edit_history
    }

    /// Append a history entry, returning its index.
    pub fn push_history(&mut self, record: EditRecord) -> usize {
        self.edit_history.push(record);
        self.edit_history.len() - 1
    }

    pub fn record(&self, index: usize) -> Option<&EditRecord> {
        self.edit_history.get(index)
    }

    pub fn record_mut(&mut self, index: usize) -> Option<&mut EditRecord> {
        self.edit_history.get_mut(index)
    }

    pub fn set_edited_remotely(&mut self, edited: bool) {
        self.edited_remotely = edited;
    }

    pub fn set_restored_from_backup(&mut self, restored: bool) {
        self.restored_from_backup = restored;
    }
}

fn normalize(text: &str, mut spans: Vec<Span>) -> Vec<Span> {
    let text_len = text.chars().count();
    spans.retain(|s| s.fits(text_len));
    spans.sort_by_key(|s| s.offset);
    spans
}

fn is_false(v: &bool) -> bool {
    !v
}
