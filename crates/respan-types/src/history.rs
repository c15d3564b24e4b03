//! Edit history entries.
//!
//! Every committed replacement appends one [`EditRecord`] to its document's
//! history. The record carries the complete before-state, so any entry that is
//! still `restorable` can be replayed back onto the document later, once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::span::{Span, span_list};

/// Where an edit was committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditMode {
    /// Only the local snapshot changed.
    #[serde(rename = "local")]
    LocalOnly,
    /// The remote store was updated first, then mirrored locally.
    #[serde(rename = "remote")]
    RemoteSynchronized,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::LocalOnly => "local",
            EditMode::RemoteSynchronized => "remote",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, EditMode::RemoteSynchronized)
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Text plus spans, as persisted inside a history entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCopy {
    pub plain_text: String,
    #[serde(default, with = "span_list")]
    pub spans: Vec<Span>,
}

impl ContentCopy {
    pub fn new(plain_text: impl Into<String>, spans: Vec<Span>) -> Self {
        Self {
            plain_text: plain_text.into(),
            spans,
        }
    }
}

/// One audit/undo unit in a document's history.
///
/// Immutable once written except for the restore markers, which flip exactly
/// once via [`EditRecord::mark_restored`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRecord {
    pub mode: EditMode,
    pub search: String,
    pub replace: String,
    pub timestamp: DateTime<Utc>,
    /// Text before the edit. For remote edits this is the authoritative copy
    /// fetched immediately before committing, not the local cache.
    pub before_plain_text: String,
    #[serde(default, with = "span_list")]
    pub before_spans: Vec<Span>,
    /// The local copy the remote edit overwrote, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_local: Option<ContentCopy>,
    /// Text replacements plus URL payload changes this edit made.
    #[serde(default)]
    pub changes: usize,
    pub restorable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub restored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub restored_locally_only: bool,
}

impl EditRecord {
    /// Record for an edit committed against the local snapshot only.
    pub fn local(
        search: impl Into<String>,
        replace: impl Into<String>,
        before: ContentCopy,
        changes: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::build(EditMode::LocalOnly, search, replace, before, None, changes, timestamp)
    }

    /// Record for an edit pushed to the remote store.
    ///
    /// `fresh` is the remote content fetched right before the push; `local` is
    /// whatever the local snapshot held at that moment.
    pub fn remote(
        search: impl Into<String>,
        replace: impl Into<String>,
        fresh: ContentCopy,
        local: ContentCopy,
        changes: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::build(
            EditMode::RemoteSynchronized,
            search,
            replace,
            fresh,
            Some(local),
            changes,
            timestamp,
        )
    }

    fn build(
        mode: EditMode,
        search: impl Into<String>,
        replace: impl Into<String>,
        before: ContentCopy,
        replaced_local: Option<ContentCopy>,
        changes: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            mode,
            search: search.into(),
            replace: replace.into(),
            timestamp,
            before_plain_text: before.plain_text,
            before_spans: before.spans,
            replaced_local,
            changes,
            restorable: true,
            restored: false,
            restore_timestamp: None,
            restored_locally_only: false,
        }
    }

    /// The before-state this record restores to.
    pub fn before(&self) -> ContentCopy {
        ContentCopy::new(self.before_plain_text.clone(), self.before_spans.clone())
    }

    /// Consume the record: it can never be restored again.
    pub fn mark_restored(&mut self, locally_only: bool, at: DateTime<Utc>) {
        self.restorable = false;
        self.restored = true;
        self.restore_timestamp = Some(at);
        self.restored_locally_only = locally_only;
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SpanKind;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_mode_serializes_as_local_and_remote() {
        assert_eq!(serde_json::to_string(&EditMode::LocalOnly).unwrap(), "\"local\"");
        assert_eq!(
            serde_json::to_string(&EditMode::RemoteSynchronized).unwrap(),
            "\"remote\""
        );
    }

    #[test]
    fn test_new_record_is_restorable() {
        let before = ContentCopy::new("abc", vec![Span::new(SpanKind::Bold, 0, 3)]);
        let record = EditRecord::local("abc", "xy", before.clone(), 1, at());
        assert!(record.restorable);
        assert!(!record.restored);
        assert_eq!(record.before(), before);
        assert!(record.replaced_local.is_none());
    }

    #[test]
    fn test_mark_restored_consumes() {
        let mut record = EditRecord::remote(
            "a",
            "b",
            ContentCopy::new("a", vec![]),
            ContentCopy::new("a", vec![]),
            1,
            at(),
        );
        record.mark_restored(false, at());
        assert!(!record.restorable);
        assert!(record.restored);
        assert_eq!(record.restore_timestamp, Some(at()));
    }

    #[test]
    fn test_json_shape() {
        let record = EditRecord::local(
            "foo",
            "bar",
            ContentCopy::new("foo", vec![Span::new(SpanKind::Italic, 0, 3)]),
            1,
            at(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "local");
        assert_eq!(json["timestamp"], "2026-03-01T12:00:00Z");
        assert_eq!(json["before_spans"][0]["kind"], "italic");
        assert_eq!(json["restorable"], true);
        assert!(json.get("restored").is_none());

        let parsed: EditRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
