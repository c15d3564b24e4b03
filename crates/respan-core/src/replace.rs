//! Span-consistent search and replace.
//!
//! Replaces every non-overlapping occurrence of a literal search string and
//! carries the span set along with the text, so that formatting keeps covering
//! the same words after the edit.
//!
//! # Span resolution
//!
//! Occurrences are applied left to right. For each occurrence, every span is
//! resolved against the window the occurrence occupies, first matching rule
//! wins:
//!
//! ```text
//! window:             [start ........ end)
//! after:                                   [span)        offset += diff
//! contains:     [span ..................... )            length += diff
//! overlaps start:              [span ............)       offset = start + len(replace)
//!                                                        length -= end - offset
//! overlaps end:    [span .......)                        length -= span_end - start
//! before:  [span)                                        unchanged
//! ```
//!
//! `diff = len(replace) - len(match)`. Spans are kept in the coordinates of
//! the text as it stands after the previous occurrences, and each window is
//! shifted by the accumulated delta, so a span that an earlier occurrence
//! already moved is compared against the right position. Spans whose length
//! reaches zero are dropped.
//!
//! URL payloads are a second text domain: the same substitution runs inside
//! every link URL regardless of where the link sits in the main buffer.

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use respan_types::Span;

use crate::{CoreError, Result};

/// What to search for and what to put in its place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceParams {
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl ReplaceParams {
    pub fn new(search: impl Into<String>, replace: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
            case_sensitive,
        }
    }
}

/// Result of one replacement pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replacement {
    pub text: String,
    /// Surviving spans, sorted by offset.
    pub spans: Vec<Span>,
    /// Occurrences replaced in the main buffer.
    pub matches: usize,
    /// Span URL payloads whose value changed.
    pub url_changes: usize,
}

impl Replacement {
    /// Whether the pass changed anything at all.
    pub fn changed(&self) -> bool {
        self.matches > 0 || self.url_changes > 0
    }

    /// Text replacements plus URL changes.
    pub fn total_changes(&self) -> usize {
        self.matches + self.url_changes
    }
}

/// Literal matcher honoring case sensitivity.
#[derive(Clone, Debug)]
enum Matcher {
    Exact(String),
    Folded(Regex),
}

impl Matcher {
    fn new(search: &str, case_sensitive: bool) -> Result<Self> {
        if search.is_empty() {
            return Err(CoreError::EmptySearch);
        }
        if case_sensitive {
            return Ok(Matcher::Exact(search.to_string()));
        }
        RegexBuilder::new(&regex::escape(search))
            .case_insensitive(true)
            .build()
            .map(Matcher::Folded)
            .map_err(|e| CoreError::Pattern(e.to_string()))
    }

    /// Byte ranges of non-overlapping occurrences, left to right.
    fn find_all(&self, haystack: &str) -> Vec<(usize, usize)> {
        match self {
            Matcher::Exact(needle) => haystack
                .match_indices(needle.as_str())
                .map(|(i, m)| (i, i + m.len()))
                .collect(),
            Matcher::Folded(re) => re.find_iter(haystack).map(|m| (m.start(), m.end())).collect(),
        }
    }

    fn replace_all(&self, haystack: &str, replacement: &str) -> String {
        match self {
            Matcher::Exact(needle) => haystack.replace(needle.as_str(), replacement),
            Matcher::Folded(re) => re.replace_all(haystack, NoExpand(replacement)).into_owned(),
        }
    }
}

/// A compiled search/replace pair, reusable across documents.
#[derive(Clone, Debug)]
pub struct Replacer {
    params: ReplaceParams,
    matcher: Matcher,
    replace_len: i64,
}

impl Replacer {
    pub fn new(params: ReplaceParams) -> Result<Self> {
        let matcher = Matcher::new(&params.search, params.case_sensitive)?;
        let replace_len = params.replace.chars().count() as i64;
        Ok(Self {
            params,
            matcher,
            replace_len,
        })
    }

    pub fn params(&self) -> &ReplaceParams {
        &self.params
    }

    /// Run the replacement over `text` and `spans`, returning fresh values.
    ///
    /// Inputs are never modified. Empty text comes back unchanged with no
    /// matches and untouched payloads.
    pub fn apply(&self, text: &str, spans: &[Span]) -> Replacement {
        if text.is_empty() {
            return Replacement {
                text: String::new(),
                spans: sorted(spans),
                matches: 0,
                url_changes: 0,
            };
        }

        let mut working: Vec<Working> = sorted(spans).into_iter().map(Working::from).collect();

        let mut out = String::with_capacity(text.len());
        let mut last_byte = 0;
        let mut char_pos: i64 = 0;
        let mut delta: i64 = 0;
        let mut matches = 0;

        for (start_byte, end_byte) in self.matcher.find_all(text) {
            let start = char_pos + text[last_byte..start_byte].chars().count() as i64;
            let match_len = text[start_byte..end_byte].chars().count() as i64;
            let end = start + match_len;

            out.push_str(&text[last_byte..start_byte]);
            out.push_str(&self.params.replace);

            let diff = self.replace_len - match_len;
            for span in working.iter_mut() {
                span.resolve(start + delta, end + delta, self.replace_len, diff);
            }

            delta += diff;
            matches += 1;
            char_pos = end;
            last_byte = end_byte;
        }
        out.push_str(&text[last_byte..]);

        let new_len = out.chars().count();
        let mut url_changes = 0;
        let spans: Vec<Span> = working
            .into_iter()
            .filter_map(|w| w.finish(new_len))
            .map(|mut span| {
                if let Some(url) = span.url_mut() {
                    let rewritten = self.matcher.replace_all(url, &self.params.replace);
                    if rewritten != *url {
                        *url = rewritten;
                        url_changes += 1;
                    }
                }
                span
            })
            .collect();

        Replacement {
            text: out,
            spans,
            matches,
            url_changes,
        }
    }
}

/// Replace `search` with `replace` in `text`, keeping `spans` aligned.
pub fn replace(
    text: &str,
    spans: &[Span],
    search: &str,
    replace: &str,
    case_sensitive: bool,
) -> Result<Replacement> {
    let replacer = Replacer::new(ReplaceParams::new(search, replace, case_sensitive))?;
    Ok(replacer.apply(text, spans))
}

fn sorted(spans: &[Span]) -> Vec<Span> {
    let mut spans = spans.to_vec();
    spans.sort_by_key(|s| s.offset);
    spans
}

/// A span mid-resolution, in signed current-text coordinates.
struct Working {
    offset: i64,
    length: i64,
    span: Span,
}

impl From<Span> for Working {
    fn from(span: Span) -> Self {
        Self {
            offset: span.offset as i64,
            length: span.length as i64,
            span,
        }
    }
}

impl Working {
    /// Apply one occurrence occupying `[start, end)` of the current text.
    fn resolve(&mut self, start: i64, end: i64, replace_len: i64, diff: i64) {
        if self.length <= 0 {
            return;
        }
        let span_end = self.offset + self.length;

        if self.offset >= end {
            self.offset += diff;
        } else if self.offset <= start && span_end >= end {
            self.length += diff;
        } else if start < self.offset && self.offset < end {
            self.length = (self.length - (end - self.offset)).max(0);
            self.offset = start + replace_len;
        } else if start < span_end && span_end <= end {
            self.length = (self.length - (span_end - start)).max(0);
        }
    }

    /// Drop dead spans and clamp survivors to the final text.
    fn finish(self, text_len: usize) -> Option<Span> {
        if self.length <= 0 || self.offset < 0 {
            return None;
        }
        let offset = self.offset as usize;
        if offset >= text_len {
            return None;
        }
        let length = (self.length as usize).min(text_len - offset);
        let mut span = self.span;
        span.offset = offset;
        span.length = length;
        Some(span)
    }
}
