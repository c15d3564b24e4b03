//! Plain text + spans ↔ display markup.
//!
//! The display form is CommonMark with strikethrough, so any markdown viewer
//! shows it sensibly and pulldown-cmark (the same parser as rustdoc) can read
//! it back for records that predate stored spans.
//!
//! ```text
//! "bold and link" + [Bold(0,4), TextLink(9,4,"https://x.io")]
//!     ↓ render
//! "**bold** and [link](https://x.io)"
//!     ↓ parse
//! "bold and link" + [Bold(0,4), TextLink(9,4,"https://x.io")]
//! ```
//!
//! Only kinds with a markdown spelling get markers: bold, italic,
//! strikethrough, code, pre, text links, id mentions and custom emoji. The
//! rest (auto-detected entities, underline, spoiler, blockquote) render as
//! their bare text.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use respan_types::{Span, SpanKind};

const MENTION_SCHEME: &str = "mention://";
const EMOJI_SCHEME: &str = "emoji://";

/// Render `text` with `spans` as display markup.
///
/// Spans that do not fit the text are ignored. Overlapping spans that are not
/// properly nested are closed and reopened around the inner boundary.
pub fn render(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut marked: Vec<&Span> = spans
        .iter()
        .filter(|s| s.fits(chars.len()) && markers(&s.kind).is_some())
        .collect();
    // Longer spans open first so they close last.
    marked.sort_by(|a, b| a.offset.cmp(&b.offset).then(b.length.cmp(&a.length)));

    let mut out = String::with_capacity(text.len() + marked.len() * 4);
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut at_line_start = true;

    for pos in 0..=chars.len() {
        if open.iter().any(|s| s.end() == pos) {
            let mut reopen = Vec::new();
            while let Some(top) = open.pop() {
                push_close(&mut out, top);
                if top.end() != pos {
                    reopen.push(top);
                }
                if !open.iter().any(|s| s.end() == pos) {
                    break;
                }
            }
            for span in reopen.into_iter().rev() {
                push_open(&mut out, span);
                open.push(span);
            }
        }

        while next < marked.len() && marked[next].offset == pos {
            push_open(&mut out, marked[next]);
            open.push(marked[next]);
            next += 1;
        }

        let Some(&ch) = chars.get(pos) else { break };
        let verbatim = open
            .iter()
            .any(|s| matches!(s.kind, SpanKind::Code | SpanKind::Pre { .. }));
        if !verbatim && needs_escape(ch, at_line_start) {
            out.push('\\');
        }
        out.push(ch);
        at_line_start = ch == '\n';
    }

    out
}

fn markers(kind: &SpanKind) -> Option<(String, String)> {
    let pair = match kind {
        SpanKind::Bold => ("**".to_string(), "**".to_string()),
        SpanKind::Italic => ("*".to_string(), "*".to_string()),
        SpanKind::Strikethrough => ("~~".to_string(), "~~".to_string()),
        SpanKind::Code => ("`".to_string(), "`".to_string()),
        SpanKind::Pre { language } => (format!("```{language}\n"), "\n```".to_string()),
        SpanKind::TextLink { url } => ("[".to_string(), format!("]({})", link_dest(url))),
        SpanKind::MentionById { user_id } => {
            ("[".to_string(), format!("]({MENTION_SCHEME}{user_id})"))
        }
        SpanKind::CustomEmoji { asset_id } => {
            ("[".to_string(), format!("]({EMOJI_SCHEME}{asset_id})"))
        }
        _ => return None,
    };
    Some(pair)
}

fn push_open(out: &mut String, span: &Span) {
    if let Some((open, _)) = markers(&span.kind) {
        out.push_str(&open);
    }
}

fn push_close(out: &mut String, span: &Span) {
    if let Some((_, close)) = markers(&span.kind) {
        out.push_str(&close);
    }
}

fn needs_escape(ch: char, at_line_start: bool) -> bool {
    matches!(ch, '\\' | '*' | '_' | '~' | '`' | '[' | ']' | '<' | '>' | '&')
        || (at_line_start && matches!(ch, '#' | '-' | '+' | '='))
}

fn link_dest(url: &str) -> String {
    let mut dest = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            '(' | ')' | '\\' => {
                dest.push('\\');
                dest.push(ch);
            }
            ' ' => dest.push_str("%20"),
            _ => dest.push(ch),
        }
    }
    dest
}

/// Parse display markup back into plain text and spans.
///
/// Returns `None` when the markup yields no text at all although the input was
/// not blank (e.g. nothing but a thematic break); callers then fall back to
/// the raw string with no spans.
pub fn parse(markup: &str) -> Option<(String, Vec<Span>)> {
    if markup.trim().is_empty() {
        return Some((String::new(), Vec::new()));
    }

    let mut builder = Builder::default();
    for event in Parser::new_ext(markup, Options::ENABLE_STRIKETHROUGH) {
        builder.event(event);
    }

    if builder.text.is_empty() {
        return None;
    }
    builder.spans.sort_by_key(|s| s.offset);
    Some((builder.text, builder.spans))
}

#[derive(Default)]
struct Builder {
    text: String,
    /// Length of `text` in chars.
    len: usize,
    spans: Vec<Span>,
    /// Open inline spans: kind and start offset.
    stack: Vec<(SpanKind, usize)>,
    /// Open fenced block: language and start offset.
    pre: Option<(String, usize)>,
    last_block_was_pre: bool,
}

impl Builder {
    fn push(&mut self, s: &str) {
        self.text.push_str(s);
        self.len += s.chars().count();
    }

    fn close(&mut self, kind: SpanKind, start: usize) {
        if self.len > start {
            self.spans.push(Span::new(kind, start, self.len - start));
        }
    }

    /// Separate a new block from whatever precedes it.
    fn block_break(&mut self, is_pre: bool) {
        let tight = is_pre || self.last_block_was_pre;
        if self.text.is_empty() || (tight && self.text.ends_with('\n')) {
            return;
        }
        if tight {
            self.push("\n");
        } else {
            self.push("\n\n");
        }
    }

    fn pop_inline(&mut self, want: fn(&SpanKind) -> bool) {
        if let Some(idx) = self.stack.iter().rposition(|(k, _)| want(k)) {
            let (kind, start) = self.stack.remove(idx);
            self.close(kind, start);
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) | Event::Start(Tag::Heading { .. }) => {
                self.block_break(false);
                self.last_block_was_pre = false;
            }
            Event::Start(Tag::Item) => {
                if !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.push("\n");
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.block_break(true);
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or_default().to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.pre = Some((language, self.len));
            }
            Event::End(TagEnd::CodeBlock) => {
                if self.text.ends_with('\n') {
                    self.text.pop();
                    self.len -= 1;
                }
                if let Some((language, start)) = self.pre.take() {
                    self.close(SpanKind::Pre { language }, start);
                }
                self.last_block_was_pre = true;
            }

            Event::Start(Tag::Strong) => self.stack.push((SpanKind::Bold, self.len)),
            Event::End(TagEnd::Strong) => self.pop_inline(|k| matches!(k, SpanKind::Bold)),
            Event::Start(Tag::Emphasis) => self.stack.push((SpanKind::Italic, self.len)),
            Event::End(TagEnd::Emphasis) => self.pop_inline(|k| matches!(k, SpanKind::Italic)),
            Event::Start(Tag::Strikethrough) => {
                self.stack.push((SpanKind::Strikethrough, self.len))
            }
            Event::End(TagEnd::Strikethrough) => {
                self.pop_inline(|k| matches!(k, SpanKind::Strikethrough))
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.stack.push((link_kind(&dest_url), self.len));
            }
            Event::End(TagEnd::Link) => self.pop_inline(|k| {
                matches!(
                    k,
                    SpanKind::TextLink { .. } | SpanKind::MentionById { .. } | SpanKind::CustomEmoji { .. }
                )
            }),

            Event::Code(code) => {
                let start = self.len;
                self.push(&code);
                self.close(SpanKind::Code, start);
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.push(&text),
            Event::SoftBreak | Event::HardBreak => self.push("\n"),
            _ => {}
        }
    }
}

fn link_kind(dest: &str) -> SpanKind {
    if let Some(user_id) = dest.strip_prefix(MENTION_SCHEME).and_then(|id| id.parse().ok()) {
        return SpanKind::MentionById { user_id };
    }
    if let Some(asset_id) = dest.strip_prefix(EMOJI_SCHEME).and_then(|id| id.parse().ok()) {
        return SpanKind::CustomEmoji { asset_id };
    }
    SpanKind::TextLink {
        url: dest.replace("%20", " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str, spans: Vec<Span>) {
        let markup = render(text, &spans);
        let (parsed_text, parsed_spans) = parse(&markup).expect("markup parses");
        assert_eq!(parsed_text, text, "markup was {markup:?}");
        assert_eq!(parsed_spans, spans, "markup was {markup:?}");
    }

    #[test]
    fn test_render_plain_text_escapes() {
        assert_eq!(render("a*b_c", &[]), "a\\*b\\_c");
        assert_eq!(render("# not a heading", &[]), "\\# not a heading");
        assert_eq!(render("", &[]), "");
    }

    #[test]
    fn test_render_bold_and_link() {
        let spans = vec![
            Span::new(SpanKind::Bold, 0, 4),
            Span::new(SpanKind::TextLink { url: "https://x.io".into() }, 9, 4),
        ];
        assert_eq!(render("bold and link", &spans), "**bold** and [link](https://x.io)");
    }

    #[test]
    fn test_render_ignores_unmarked_and_out_of_range() {
        let spans = vec![
            Span::new(SpanKind::Hashtag, 0, 4),
            Span::new(SpanKind::Bold, 2, 40),
        ];
        assert_eq!(render("#tag", &spans), "\\#tag");
    }

    #[test]
    fn test_render_code_is_verbatim() {
        let spans = vec![Span::new(SpanKind::Code, 4, 5)];
        assert_eq!(render("run a_b_c now", &spans), "run `a_b_c` now");
    }

    #[test]
    fn test_render_crossing_spans_reopen() {
        // bold 0..4 and italic 2..6 cross at 4
        let spans = vec![Span::new(SpanKind::Bold, 0, 4), Span::new(SpanKind::Italic, 2, 4)];
        assert_eq!(render("abcdef", &spans), "**ab*cd****ef*");
    }

    #[test]
    fn test_roundtrip_inline_kinds() {
        roundtrip("bold and link", vec![
            Span::new(SpanKind::Bold, 0, 4),
            Span::new(SpanKind::TextLink { url: "https://x.io/a".into() }, 9, 4),
        ]);
        roundtrip("say hi to bob", vec![
            Span::new(SpanKind::Italic, 0, 3),
            Span::new(SpanKind::Strikethrough, 4, 2),
            Span::new(SpanKind::MentionById { user_id: 42 }, 10, 3),
        ]);
        roundtrip("use x_y here", vec![Span::new(SpanKind::Code, 4, 3)]);
        roundtrip("party 🎉", vec![Span::new(SpanKind::CustomEmoji { asset_id: 9001 }, 6, 1)]);
    }

    #[test]
    fn test_roundtrip_nested() {
        roundtrip("very important", vec![
            Span::new(SpanKind::Bold, 0, 14),
            Span::new(SpanKind::Italic, 5, 9),
        ]);
    }

    #[test]
    fn test_roundtrip_escaped_text() {
        roundtrip("2 * 3 = 6 [approx] a_b", vec![]);
    }

    #[test]
    fn test_roundtrip_paragraphs_and_lines() {
        roundtrip("first line\nsecond line\n\nnew paragraph", vec![
            Span::new(SpanKind::Bold, 0, 5),
        ]);
    }

    #[test]
    fn test_parse_pre_block() {
        let (text, spans) = parse("look:\n```rust\nfn main() {}\n```").unwrap();
        assert_eq!(text, "look:\nfn main() {}");
        assert_eq!(spans, vec![Span::new(SpanKind::Pre { language: "rust".into() }, 6, 12)]);
    }

    #[test]
    fn test_parse_blank_and_textless() {
        assert_eq!(parse("   "), Some((String::new(), Vec::new())));
        assert_eq!(parse("---"), None);
    }

    #[test]
    fn test_parse_html_passthrough() {
        let (text, spans) = parse("<b>raw</b>").unwrap();
        assert!(text.contains("raw"));
        assert!(spans.is_empty());
    }
}
