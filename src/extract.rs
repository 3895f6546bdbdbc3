//! Markdown parsing: heading anchors and local link targets in one pass.

use std::ops::Range;

use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use url::Url;

use crate::slug::SlugGenerator;
use crate::types::{Document, LinkInfo};

/// Parser configuration shared by every document of one scan.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    options: Options,
}

impl Default for Extractor {
    /// CommonMark plus the GitHub table, strikethrough, and task list syntax.
    fn default() -> Self {
        return Self::new(
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS,
        );
    }
}

impl Extractor {
    /// Build an extractor with explicit parser options.
    pub const fn new(options: Options) -> Self {
        return Self { options };
    }

    /// Parse `source` and collect its heading anchors and local links.
    ///
    /// Malformed markdown is tolerated; the parser recovers rather than fails.
    pub fn extract(&self, source: &str) -> Document {
        let mut slugs = SlugGenerator::default();
        let mut links: Vec<LinkInfo> = Vec::new();
        // Currently open block elements, innermost last.
        let mut blocks: Vec<OpenBlock> = Vec::new();
        let mut heading: Option<String> = None;

        for (event, range) in Parser::new_ext(source, self.options).into_offset_iter() {
            let opens_or_closes_block = match &event {
                Event::Start(tag) | Event::End(tag) => block_kind(tag).is_some(),
                _ => false,
            };
            if !opens_or_closes_block {
                if let Some(top) = blocks.last_mut() {
                    top.note_inline(&range);
                }
            }

            match event {
                Event::Start(tag) => {
                    if let Some(mut link) = link_target(&tag).and_then(local_link) {
                        match blocks.last_mut() {
                            Some(top) if top.defers_span() => top.pending.push(links.len()),
                            // For items this is text after a nested block; the whole item is the span.
                            Some(top) => link.set_span(line_span(source, top.range.clone())),
                            None => {},
                        }
                        links.push(link);
                    }
                    if matches!(tag, Tag::Heading(..)) {
                        heading = Some(String::new());
                    }
                    if let Some(kind) = block_kind(&tag) {
                        if let Some(top) = blocks.last_mut() {
                            top.note_nested_block(range.start);
                        }
                        blocks.push(OpenBlock::new(kind, range));
                    }
                },
                Event::End(tag) => {
                    if block_kind(&tag).is_some() {
                        if let Some(block) = blocks.pop() {
                            let span = line_span(source, block.span_range());
                            for idx in block.pending {
                                if let Some(link) = links.get_mut(idx) {
                                    link.set_span(span);
                                }
                            }
                        }
                    }
                    if matches!(tag, Tag::Heading(..)) {
                        if let Some(text) = heading.take() {
                            slugs.generate(&text);
                        }
                    }
                },
                Event::Text(text) | Event::Code(text) => {
                    if let Some(buf) = heading.as_mut() {
                        buf.push_str(&text);
                    }
                },
                _ => {},
            }
        }

        Document {
            anchors: slugs.into_anchors(),
            links,
        }
    }
}

/// Destination of a link or image tag. Email auto-links are not file links.
fn link_target<'a>(tag: &'a Tag<'_>) -> Option<&'a str> {
    match tag {
        Tag::Link(LinkType::Email, ..) => None,
        Tag::Link(_, dest, _) | Tag::Image(_, dest, _) => Some(&**dest),
        _ => None,
    }
}

/// Block elements whose line span may be reported for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    /// Span covers only the inline content, not a setext underline.
    Heading,
    /// Span stops before the first nested block (tight list items).
    Item,
    Other,
}

fn block_kind(tag: &Tag<'_>) -> Option<BlockKind> {
    match tag {
        Tag::Heading(..) => Some(BlockKind::Heading),
        Tag::Item => Some(BlockKind::Item),
        Tag::Paragraph
        | Tag::BlockQuote
        | Tag::CodeBlock(_)
        | Tag::List(_)
        | Tag::FootnoteDefinition(_)
        | Tag::Table(_)
        | Tag::TableHead
        | Tag::TableRow
        | Tag::TableCell => Some(BlockKind::Other),
        _ => None,
    }
}

/// An open block and the links whose span waits for it to close.
struct OpenBlock {
    /// Heading: extent of the inline content. Item: empty range at the start
    /// of the first nested block.
    content: Option<Range<usize>>,
    kind: BlockKind,
    /// Indices into the link list.
    pending: Vec<usize>,
    range: Range<usize>,
}

impl OpenBlock {
    const fn new(kind: BlockKind, range: Range<usize>) -> Self {
        return Self {
            content: None,
            kind,
            pending: Vec::new(),
            range,
        };
    }

    /// Whether a link seen now can only get its span once the block closes.
    const fn defers_span(&self) -> bool {
        return match self.kind {
            BlockKind::Heading => true,
            BlockKind::Item => self.content.is_none(),
            BlockKind::Other => false,
        };
    }

    fn note_inline(&mut self, range: &Range<usize>) {
        if self.kind != BlockKind::Heading {
            return;
        }
        self.content = Some(match self.content.take() {
            None => range.clone(),
            Some(c) => c.start.min(range.start)..c.end.max(range.end),
        });
    }

    fn note_nested_block(&mut self, start: usize) {
        if self.kind == BlockKind::Item && self.content.is_none() {
            self.content = Some(start..start);
        }
    }

    /// Source range reported for links deferred until the block closed.
    fn span_range(&self) -> Range<usize> {
        return match (self.kind, &self.content) {
            (BlockKind::Heading, Some(content)) => content.clone(),
            (BlockKind::Item, Some(nested)) => self.range.start..nested.start,
            _ => self.range.clone(),
        };
    }
}

/// First and last 1-based line of `range` within `source`, or `(0, 0)` when
/// the range is empty or does not map onto the source.
fn line_span(source: &str, range: Range<usize>) -> (u32, u32) {
    let start = range.start;
    let Some(block) = source.get(range) else {
        return (0, 0);
    };
    let block = block.trim_end();
    if block.is_empty() {
        return (0, 0);
    }
    let before = source.get(..start).unwrap_or_default();
    let first = count_newlines(before).saturating_add(1);
    let last = first.saturating_add(count_newlines(block));
    (first, last)
}

fn count_newlines(text: &str) -> u32 {
    let count = text.bytes().filter(|&b| b == b'\n').count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Turn a link destination into a `LinkInfo` if it is local: no scheme, no
/// host, and at least one of path and fragment present.
fn local_link(raw: &str) -> Option<LinkInfo> {
    let local = strip_to_local(raw)?;
    let (before_fragment, fragment) = local.split_once('#').unwrap_or((local, ""));
    let path = before_fragment
        .split_once('?')
        .map_or(before_fragment, |(path, _query)| path);

    // Rejected by URI parsing: `a:b` reads as a scheme, malformed `%` escapes.
    if path.split('/').next().is_some_and(|first| first.contains(':'))
        || !has_valid_escapes(path)
        || !has_valid_escapes(fragment)
    {
        return None;
    }

    let path = percent_decode(path)?;
    let fragment = percent_decode(fragment)?;
    if path.is_empty() && fragment.is_empty() {
        return None;
    }

    Some(LinkInfo {
        fragment,
        line_end: 0,
        line_start: 0,
        path,
        raw: raw.to_string(),
    })
}

/// The part of `raw` to split into path and fragment, or `None` when the
/// target is empty or carries a scheme or host.
fn strip_to_local(raw: &str) -> Option<&str> {
    if raw.is_empty() {
        return None;
    }
    // Protocol-relative: `//host/path`. An empty authority leaves a rooted path.
    if let Some(after) = raw.strip_prefix("//") {
        let host_end = after.find(['/', '?', '#']).unwrap_or(after.len());
        if host_end > 0 {
            return None;
        }
        return after.get(host_end..);
    }
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(raw),
        // Parsed with a scheme, or unparseable as a URL at all.
        _ => None,
    }
}

/// Every `%` is followed by two hex digits.
fn has_valid_escapes(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || bytes
                .get(i.saturating_add(1)..i.saturating_add(3))
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    })
}

fn percent_decode(text: &str) -> Option<String> {
    percent_decode_str(text)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> Document {
        Extractor::default().extract(source)
    }

    fn single_anchor(heading: &str) -> String {
        let doc = extract(&format!("# {heading}\n\nText\n"));
        assert_eq!(doc.anchors.len(), 1, "anchors: {:?}", doc.anchors);
        doc.anchors.into_iter().next().unwrap()
    }

    #[test]
    fn heading_markup_is_stripped() {
        assert_eq!(single_anchor("A [Link](https://example.org/) Inside"), "a-link-inside");
        assert_eq!(single_anchor("Header *with formatting*"), "header-with-formatting");
        assert_eq!(single_anchor("Using `cargo test`"), "using-cargo-test");
    }

    #[test]
    fn setext_headings_produce_anchors() {
        let doc = extract("Title\n=====\n\nSub\n---\n");
        assert!(doc.has_anchor("title"));
        assert!(doc.has_anchor("sub"));
    }

    #[test]
    fn repeated_headings_get_suffixes() {
        let doc = extract("## Usage\n\n## Usage\n\n## Usage\n");
        let mut anchors: Vec<_> = doc.anchors.into_iter().collect();
        anchors.sort();
        assert_eq!(anchors, ["usage", "usage-1", "usage-2"]);
    }

    #[test]
    fn external_links_are_skipped() {
        let doc = extract(
            "[a](https://example.org/x.md) [b](http://x) [c](mailto:me@example.org)\n\
             [d](//cdn.example.org/lib.js) <https://example.org> <me@example.org>\n",
        );
        assert!(doc.links.is_empty(), "links: {:?}", doc.links);
    }

    #[test]
    fn local_links_split_path_and_fragment() {
        let doc = extract("See [x](../three.md#hi), [y](#top) and ![img](pic.png).\n");
        let parts: Vec<_> = doc
            .links
            .iter()
            .map(|l| (l.raw.as_str(), l.path.as_str(), l.fragment.as_str()))
            .collect();
        assert_eq!(
            parts,
            [
                ("../three.md#hi", "../three.md", "hi"),
                ("#top", "", "top"),
                ("pic.png", "pic.png", ""),
            ]
        );
    }

    #[test]
    fn path_is_percent_decoded_and_query_dropped() {
        let doc = extract("[x](my%20notes.md?plain=1#part%201)\n");
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].path, "my notes.md");
        assert_eq!(doc.links[0].fragment, "part 1");
    }

    #[test]
    fn empty_targets_are_dropped() {
        let doc = extract("[x](#) [y](<>) [z]()\n");
        assert!(doc.links.is_empty(), "links: {:?}", doc.links);
    }

    #[test]
    fn reference_links_are_resolved() {
        let doc = extract("No such [reference][1].\n\n[1]: #invalid-ref\n");
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].raw, "#invalid-ref");
        assert_eq!((doc.links[0].line_start, doc.links[0].line_end), (1, 1));
    }

    #[test]
    fn line_span_covers_enclosing_paragraph() {
        let doc = extract("# Two\n\nSome text\nwith [x](../three.md#hi) link.\n\nlast [y](y.md)\n");
        let spans: Vec<_> = doc.links.iter().map(|l| (l.line_start, l.line_end)).collect();
        assert_eq!(spans, [(3, 4), (6, 6)]);
    }

    #[test]
    fn tight_list_item_span_stops_before_nested_list() {
        let doc = extract("- a\n- see [x](x.md)\n  - nested\n  - more\n\ntext\n");
        assert_eq!(doc.links.len(), 1);
        assert_eq!((doc.links[0].line_start, doc.links[0].line_end), (2, 2));
    }

    #[test]
    fn multi_line_item_text_spans_its_own_lines() {
        let doc = extract("- first line\n  then [x](x.md)\n  - nested\n");
        assert_eq!((doc.links[0].line_start, doc.links[0].line_end), (1, 2));
    }

    #[test]
    fn setext_heading_span_excludes_underline() {
        let doc = extract("See [x](x.md)\n===\n\nAnd [y](y.md)\ntoo\n---\n");
        let spans: Vec<_> = doc.links.iter().map(|l| (l.line_start, l.line_end)).collect();
        assert_eq!(spans, [(1, 1), (4, 5)]);
        assert!(doc.has_anchor("see-x"));
    }

    #[test]
    fn colon_in_first_segment_is_not_local() {
        let doc = extract("[a](1:foo.md) [b](./1:foo.md) [c](#a:b)\n");
        let raws: Vec<_> = doc.links.iter().map(|l| l.raw.as_str()).collect();
        assert_eq!(raws, ["./1:foo.md", "#a:b"]);
    }

    #[test]
    fn malformed_escapes_are_dropped() {
        let doc = extract("[a](%zz.md) [b](ok.md#%4) [c](ok%2Dname.md)\n");
        let paths: Vec<_> = doc.links.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, ["ok-name.md"]);
    }

    #[test]
    fn links_inside_headings_are_extracted() {
        let doc = extract("## See [guide](guide.md)\n");
        assert!(doc.has_anchor("see-guide"));
        assert_eq!(doc.links.len(), 1);
        assert_eq!((doc.links[0].line_start, doc.links[0].line_end), (1, 1));
    }

    #[test]
    fn links_keep_document_order() {
        let doc = extract("[a](a.md)\n\n> quoted [b](b.md)\n\n- item [c](c.md)\n");
        let raws: Vec<_> = doc.links.iter().map(|l| l.raw.as_str()).collect();
        assert_eq!(raws, ["a.md", "b.md", "c.md"]);
    }
}
