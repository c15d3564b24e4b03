//! Formatting spans and their persisted record form.
//!
//! A [`Span`] annotates `length` characters of a plain-text buffer starting at
//! `offset`. Offsets and lengths count Unicode scalar values (`char`s), never
//! bytes.
//!
//! ## Codec
//!
//! Spans persist as [`SpanRecord`]s: a `kind` discriminator, the range, and a
//! flat set of optional payload fields. Decoding is lenient: an unknown kind,
//! a missing payload or an empty range yields `None`, and the caller drops
//! that one span instead of failing the whole document.
//!
//! ```text
//! Span { offset: 3, length: 3, kind: TextLink { url: "http://foo.com" } }
//!     ↕ encode / decode
//! { "kind": "text_link", "offset": 3, "length": 3, "url": "http://foo.com" }
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

/// What a span does to the text it covers, with any kind-specific payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Code,
    /// Preformatted block with an optional language tag (empty = none).
    Pre { language: String },
    /// Text hyperlinked to `url`. The URL is a second text domain that
    /// search-and-replace also rewrites.
    TextLink { url: String },
    Url,
    Mention,
    /// Mention of a user that has no public handle.
    MentionById { user_id: i64 },
    Hashtag,
    Cashtag,
    BotCommand,
    Email,
    Phone,
    Blockquote { collapsed: bool },
    Spoiler,
    /// Custom emoji rendered from an uploaded asset.
    CustomEmoji { asset_id: i64 },
}

impl SpanKind {
    /// The payload-free discriminator.
    pub fn tag(&self) -> SpanTag {
        match self {
            SpanKind::Bold => SpanTag::Bold,
            SpanKind::Italic => SpanTag::Italic,
            SpanKind::Strikethrough => SpanTag::Strikethrough,
            SpanKind::Underline => SpanTag::Underline,
            SpanKind::Code => SpanTag::Code,
            SpanKind::Pre { .. } => SpanTag::Pre,
            SpanKind::TextLink { .. } => SpanTag::TextLink,
            SpanKind::Url => SpanTag::Url,
            SpanKind::Mention => SpanTag::Mention,
            SpanKind::MentionById { .. } => SpanTag::MentionById,
            SpanKind::Hashtag => SpanTag::Hashtag,
            SpanKind::Cashtag => SpanTag::Cashtag,
            SpanKind::BotCommand => SpanTag::BotCommand,
            SpanKind::Email => SpanTag::Email,
            SpanKind::Phone => SpanTag::Phone,
            SpanKind::Blockquote { .. } => SpanTag::Blockquote,
            SpanKind::Spoiler => SpanTag::Spoiler,
            SpanKind::CustomEmoji { .. } => SpanTag::CustomEmoji,
        }
    }
}

/// Span discriminator as it appears in persisted records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SpanTag {
    #[strum(serialize = "bold")]
    Bold,
    #[strum(serialize = "italic")]
    Italic,
    #[strum(serialize = "strikethrough", serialize = "strike")]
    Strikethrough,
    #[strum(serialize = "underline")]
    Underline,
    #[strum(serialize = "code")]
    Code,
    #[strum(serialize = "pre")]
    Pre,
    #[strum(serialize = "text_link", serialize = "text_url")]
    TextLink,
    #[strum(serialize = "url")]
    Url,
    #[strum(serialize = "mention")]
    Mention,
    #[strum(serialize = "mention_by_id", serialize = "mention_name")]
    MentionById,
    #[strum(serialize = "hashtag")]
    Hashtag,
    #[strum(serialize = "cashtag")]
    Cashtag,
    #[strum(serialize = "bot_command")]
    BotCommand,
    #[strum(serialize = "email")]
    Email,
    #[strum(serialize = "phone")]
    Phone,
    #[strum(serialize = "blockquote")]
    Blockquote,
    #[strum(serialize = "spoiler")]
    Spoiler,
    #[strum(serialize = "custom_emoji")]
    CustomEmoji,
}

impl SpanTag {
    /// Parse from string (case-insensitive, accepts aliases).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Canonical record discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanTag::Bold => "bold",
            SpanTag::Italic => "italic",
            SpanTag::Strikethrough => "strikethrough",
            SpanTag::Underline => "underline",
            SpanTag::Code => "code",
            SpanTag::Pre => "pre",
            SpanTag::TextLink => "text_link",
            SpanTag::Url => "url",
            SpanTag::Mention => "mention",
            SpanTag::MentionById => "mention_by_id",
            SpanTag::Hashtag => "hashtag",
            SpanTag::Cashtag => "cashtag",
            SpanTag::BotCommand => "bot_command",
            SpanTag::Email => "email",
            SpanTag::Phone => "phone",
            SpanTag::Blockquote => "blockquote",
            SpanTag::Spoiler => "spoiler",
            SpanTag::CustomEmoji => "custom_emoji",
        }
    }
}

impl std::fmt::Display for SpanTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A formatting annotation over a text buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(kind: SpanKind, offset: usize, length: usize) -> Self {
        Self { offset, length, kind }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// The URL payload, for kinds that carry one.
    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            SpanKind::TextLink { url } => Some(url),
            _ => None,
        }
    }

    pub fn url_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            SpanKind::TextLink { url } => Some(url),
            _ => None,
        }
    }

    /// Whether this span may persist against a text of `text_len` chars.
    pub fn fits(&self, text_len: usize) -> bool {
        self.length > 0 && self.end() <= text_len
    }
}

/// Why a record did not decode into a [`Span`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpanError {
    #[error("unknown span kind: {0}")]
    UnknownKind(String),

    #[error("span range is negative (offset {offset}, length {length})")]
    NegativeRange { offset: i64, length: i64 },

    #[error("span has zero length")]
    ZeroLength,

    #[error("{kind} span is missing its {field} payload")]
    MissingPayload { kind: SpanTag, field: &'static str },
}

/// Persisted, serializable form of a [`Span`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub kind: String,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub length: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl SpanRecord {
    fn bare(tag: SpanTag, offset: usize, length: usize) -> Self {
        Self {
            kind: tag.as_str().to_string(),
            offset: offset as i64,
            length: length as i64,
            url: None,
            language: None,
            user_id: None,
            asset_id: None,
            collapsed: None,
        }
    }
}

/// Encode a span into its record form.
pub fn encode(span: &Span) -> SpanRecord {
    let mut record = SpanRecord::bare(span.kind.tag(), span.offset, span.length);
    match &span.kind {
        SpanKind::Pre { language } if !language.is_empty() => {
            record.language = Some(language.clone());
        }
        SpanKind::TextLink { url } => record.url = Some(url.clone()),
        SpanKind::MentionById { user_id } => record.user_id = Some(*user_id),
        SpanKind::CustomEmoji { asset_id } => record.asset_id = Some(*asset_id),
        SpanKind::Blockquote { collapsed: true } => record.collapsed = Some(true),
        _ => {}
    }
    record
}

/// Decode a record, explaining any rejection.
pub fn try_decode(record: &SpanRecord) -> Result<Span, SpanError> {
    let tag = SpanTag::from_str(&record.kind)
        .ok_or_else(|| SpanError::UnknownKind(record.kind.clone()))?;

    if record.offset < 0 || record.length < 0 {
        return Err(SpanError::NegativeRange {
            offset: record.offset,
            length: record.length,
        });
    }
    if record.length == 0 {
        return Err(SpanError::ZeroLength);
    }

    let missing = |field| SpanError::MissingPayload { kind: tag, field };
    let kind = match tag {
        SpanTag::Bold => SpanKind::Bold,
        SpanTag::Italic => SpanKind::Italic,
        SpanTag::Strikethrough => SpanKind::Strikethrough,
        SpanTag::Underline => SpanKind::Underline,
        SpanTag::Code => SpanKind::Code,
        SpanTag::Pre => SpanKind::Pre {
            language: record.language.clone().unwrap_or_default(),
        },
        SpanTag::TextLink => SpanKind::TextLink {
            url: record.url.clone().ok_or_else(|| missing("url"))?,
        },
        SpanTag::Url => SpanKind::Url,
        SpanTag::Mention => SpanKind::Mention,
        SpanTag::MentionById => SpanKind::MentionById {
            user_id: record.user_id.ok_or_else(|| missing("user_id"))?,
        },
        SpanTag::Hashtag => SpanKind::Hashtag,
        SpanTag::Cashtag => SpanKind::Cashtag,
        SpanTag::BotCommand => SpanKind::BotCommand,
        SpanTag::Email => SpanKind::Email,
        SpanTag::Phone => SpanKind::Phone,
        SpanTag::Blockquote => SpanKind::Blockquote {
            collapsed: record.collapsed.unwrap_or(false),
        },
        SpanTag::Spoiler => SpanKind::Spoiler,
        SpanTag::CustomEmoji => SpanKind::CustomEmoji {
            asset_id: record.asset_id.ok_or_else(|| missing("asset_id"))?,
        },
    };

    Ok(Span::new(kind, record.offset as usize, record.length as usize))
}

/// Decode a record; `None` means "drop this span".
pub fn decode(record: &SpanRecord) -> Option<Span> {
    try_decode(record).ok()
}

/// Decode an arbitrary JSON value, tolerating records whose fields have the
/// wrong shape entirely.
pub fn decode_value(value: &serde_json::Value) -> Option<Span> {
    let record: SpanRecord = serde_json::from_value(value.clone()).ok()?;
    decode(&record)
}

/// Encode a span list, excluding zero-length spans.
pub fn encode_all(spans: &[Span]) -> Vec<SpanRecord> {
    spans.iter().filter(|s| s.length > 0).map(encode).collect()
}

/// `#[serde(with = "span_list")]` adapter for `Vec<Span>` fields.
///
/// Serializes through [`encode_all`]. Deserializes each element as a loose
/// JSON value so one malformed span never fails the enclosing record.
pub mod span_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Span, decode_value, encode_all};

    pub fn serialize<S: Serializer>(spans: &[Span], serializer: S) -> Result<S::Ok, S::Error> {
        encode_all(spans).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Span>, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(values.iter().filter_map(decode_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_kind() -> Vec<SpanKind> {
        vec![
            SpanKind::Bold,
            SpanKind::Italic,
            SpanKind::Strikethrough,
            SpanKind::Underline,
            SpanKind::Code,
            SpanKind::Pre { language: String::new() },
            SpanKind::Pre { language: "rust".into() },
            SpanKind::TextLink { url: "https://example.com/a?b=c".into() },
            SpanKind::Url,
            SpanKind::Mention,
            SpanKind::MentionById { user_id: 123_456_789 },
            SpanKind::Hashtag,
            SpanKind::Cashtag,
            SpanKind::BotCommand,
            SpanKind::Email,
            SpanKind::Phone,
            SpanKind::Blockquote { collapsed: false },
            SpanKind::Blockquote { collapsed: true },
            SpanKind::Spoiler,
            SpanKind::CustomEmoji { asset_id: 5_368_324_170_671_202_286 },
        ]
    }

    #[test]
    fn test_roundtrip_every_kind() {
        for (i, kind) in every_kind().into_iter().enumerate() {
            let span = Span::new(kind, i, i + 1);
            let decoded = decode(&encode(&span));
            assert_eq!(decoded.as_ref(), Some(&span), "kind {:?}", span.kind);
        }
    }

    #[test]
    fn test_roundtrip_through_json() {
        for kind in every_kind() {
            let span = Span::new(kind, 2, 5);
            let json = serde_json::to_value(encode(&span)).unwrap();
            assert_eq!(decode_value(&json), Some(span));
        }
    }

    #[test]
    fn test_tag_strings_roundtrip() {
        for kind in every_kind() {
            let tag = kind.tag();
            assert_eq!(SpanTag::from_str(tag.as_str()), Some(tag));
        }
        assert_eq!(SpanTag::from_str("TEXT_URL"), Some(SpanTag::TextLink));
        assert_eq!(SpanTag::from_str("strike"), Some(SpanTag::Strikethrough));
    }

    #[test]
    fn test_unknown_kind_is_absent() {
        let record = SpanRecord::bare(SpanTag::Bold, 0, 3);
        let record = SpanRecord { kind: "sparkles".into(), ..record };
        assert_eq!(try_decode(&record), Err(SpanError::UnknownKind("sparkles".into())));
        assert!(decode(&record).is_none());
    }

    #[test]
    fn test_missing_payload_is_absent() {
        let record = SpanRecord::bare(SpanTag::TextLink, 0, 3);
        assert!(matches!(
            try_decode(&record),
            Err(SpanError::MissingPayload { field: "url", .. })
        ));

        let record = SpanRecord::bare(SpanTag::MentionById, 0, 3);
        assert!(decode(&record).is_none());
    }

    #[test]
    fn test_zero_and_negative_lengths_are_absent() {
        assert_eq!(try_decode(&SpanRecord::bare(SpanTag::Bold, 4, 0)), Err(SpanError::ZeroLength));

        let negative = SpanRecord { offset: -1, ..SpanRecord::bare(SpanTag::Bold, 0, 2) };
        assert!(matches!(try_decode(&negative), Err(SpanError::NegativeRange { .. })));
    }

    #[test]
    fn test_encode_all_skips_zero_length() {
        let spans = vec![
            Span::new(SpanKind::Bold, 0, 2),
            Span::new(SpanKind::Italic, 2, 0),
            Span::new(SpanKind::Code, 3, 1),
        ];
        let records = encode_all(&spans);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, "bold");
        assert_eq!(records[1].kind, "code");
    }

    #[test]
    fn test_optional_payloads_are_omitted() {
        let json = serde_json::to_value(encode(&Span::new(SpanKind::Bold, 0, 1))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "bold", "offset": 0, "length": 1}));

        let json = serde_json::to_value(encode(&Span::new(
            SpanKind::Blockquote { collapsed: false },
            0,
            1,
        )))
        .unwrap();
        assert!(json.get("collapsed").is_none());
    }

    #[test]
    fn test_span_list_drops_malformed_elements() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(with = "span_list")]
            spans: Vec<Span>,
        }

        let holder: Holder = serde_json::from_value(serde_json::json!({
            "spans": [
                {"kind": "bold", "offset": 0, "length": 3},
                {"kind": "text_link", "offset": 0, "length": 3, "url": 5},
                {"kind": "wiggle", "offset": 0, "length": 3},
                "garbage",
                {"kind": "italic", "offset": 1, "length": 1}
            ]
        }))
        .unwrap();

        assert_eq!(
            holder.spans,
            vec![Span::new(SpanKind::Bold, 0, 3), Span::new(SpanKind::Italic, 1, 1)]
        );
    }

    #[test]
    fn test_span_helpers() {
        let mut span = Span::new(SpanKind::TextLink { url: "http://a".into() }, 2, 3);
        assert_eq!(span.end(), 5);
        assert_eq!(span.url(), Some("http://a"));
        span.url_mut().unwrap().push('b');
        assert_eq!(span.url(), Some("http://ab"));
        assert!(span.fits(5));
        assert!(!span.fits(4));
        assert!(Span::new(SpanKind::Bold, 0, 1).url().is_none());
    }
}
