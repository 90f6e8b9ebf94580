//! Line classification.
//!
//! Markdown is consumed one source line at a time. Every line maps to one
//! [`Block`]; a fenced code block is the only construct that consumes more
//! than one line. The only context a line's classification depends on is
//! whether the document is inside a table of contents ([`TocState`]).

use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("Invalid heading regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+]\s+(.*)$").expect("Invalid bullet regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)(\d+)\.\s+(.*)$").expect("Invalid numbered item regex"));
static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>(?:\s+(.*))?$").expect("Invalid blockquote regex"));
static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").expect("Invalid rule regex")
});
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(`{3,}|~{3,})\s*([^`\s]*)").expect("Invalid fence regex"));
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<a\s([^>]*)>.*</a>\s*$").expect("Invalid anchor regex"));
static ANCHOR_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:name|id)\s*=\s*["']([^"']+)["']"#).expect("Invalid anchor name regex")
});
static TOC_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]\([^)]*\)").expect("Invalid TOC link regex"));

const TOC_TITLE: &str = "table of contents";
const BULLET_GLYPH: &str = "\u{2022}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Levels past 3 are clamped to 3.
    Heading { level: u8, text: String },
    BulletItem { depth: usize, text: String },
    NumberedItem { depth: usize, ordinal: u32, text: String },
    TocItem { depth: usize, prefix: String, text: String },
    Blockquote(String),
    CodeBlock { language: Option<String>, lines: Vec<String> },
    HorizontalRule,
    Paragraph(String),
    /// Blank line, or an anchor tag that only marks a link target.
    Skip { anchor: Option<String> },
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::BulletItem { .. } => "bullet item",
            Block::NumberedItem { .. } => "numbered item",
            Block::TocItem { .. } => "toc item",
            Block::Blockquote(_) => "blockquote",
            Block::CodeBlock { .. } => "code block",
            Block::HorizontalRule => "horizontal rule",
            Block::Paragraph(_) => "paragraph",
            Block::Skip { .. } => "skip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TocState {
    #[default]
    Normal,
    InTableOfContents,
}

impl TocState {
    /// Apply the transition a block triggers. A level-1 heading enters the
    /// table of contents when it mentions one and leaves it otherwise; a
    /// horizontal rule always leaves it.
    pub fn observe(&mut self, block: &Block) {
        match block {
            Block::Heading { level: 1, text } => {
                *self = if text.to_lowercase().contains(TOC_TITLE) {
                    TocState::InTableOfContents
                } else {
                    TocState::Normal
                };
            }
            Block::HorizontalRule => *self = TocState::Normal,
            _ => {}
        }
    }

    pub fn in_toc(self) -> bool {
        self == TocState::InTableOfContents
    }
}

/// Nesting depth from leading indentation: two columns per level, a tab
/// counting as two.
fn indent_depth(indent: &str) -> usize {
    let columns: usize = indent.chars().map(|c| if c == '\t' { 2 } else { 1 }).sum();
    columns / 2
}

/// An opening code fence: its marker and optional info string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub marker: String,
    pub language: Option<String>,
}

impl Fence {
    pub fn open(line: &str) -> Option<Fence> {
        let caps = FENCE_RE.captures(line)?;
        let marker = caps.get(1)?.as_str().to_string();
        let language = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(Fence { marker, language })
    }

    /// A closing fence repeats the opening marker character at least as many
    /// times and carries nothing else.
    pub fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let Some(ch) = self.marker.chars().next() else {
            return false;
        };
        let run = trimmed.chars().take_while(|c| *c == ch).count();
        run >= self.marker.len() && run == trimmed.chars().count()
    }
}

/// Classify a single source line. A fence opener seen on its own is an
/// empty code block; [`BlockStream`] does the lookahead that fills it.
pub fn classify_line(line: &str, toc: TocState) -> Block {
    let line = line.trim_end();
    let trimmed = line.trim_start();

    if trimmed.is_empty() {
        return Block::Skip { anchor: None };
    }

    if let Some(fence) = Fence::open(line) {
        return Block::CodeBlock {
            language: fence.language,
            lines: Vec::new(),
        };
    }

    if let Some(caps) = HEADING_RE.captures(trimmed) {
        let level = caps.get(1).map_or(1, |m| m.len()).min(3) as u8;
        let text = caps.get(2).map_or("", |m| m.as_str()).to_string();
        return Block::Heading { level, text };
    }

    if toc.in_toc() {
        if let Some(caps) = NUMBERED_RE.captures(line) {
            return Block::TocItem {
                depth: indent_depth(&caps[1]),
                prefix: format!("{}.", &caps[2]),
                text: caps[3].to_string(),
            };
        }
        if let Some(caps) = BULLET_RE.captures(line) {
            if TOC_LINK_RE.is_match(&caps[2]) {
                return Block::TocItem {
                    depth: indent_depth(&caps[1]),
                    prefix: BULLET_GLYPH.to_string(),
                    text: caps[2].to_string(),
                };
            }
        }
    }

    if RULE_RE.is_match(line) {
        return Block::HorizontalRule;
    }

    if let Some(caps) = BULLET_RE.captures(line) {
        return Block::BulletItem {
            depth: indent_depth(&caps[1]),
            text: caps[2].to_string(),
        };
    }

    if let Some(caps) = NUMBERED_RE.captures(line) {
        match caps[2].parse::<u32>() {
            Ok(ordinal) => {
                return Block::NumberedItem {
                    depth: indent_depth(&caps[1]),
                    ordinal,
                    text: caps[3].to_string(),
                };
            }
            Err(_) => log::warn!("List ordinal '{}' out of range; treating as text", &caps[2]),
        }
    }

    if let Some(caps) = BLOCKQUOTE_RE.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        return Block::Blockquote(text.to_string());
    }

    if let Some(caps) = ANCHOR_RE.captures(line) {
        let anchor = ANCHOR_NAME_RE
            .captures(&caps[1])
            .map(|c| c[1].to_string());
        return Block::Skip { anchor };
    }

    Block::Paragraph(trimmed.to_string())
}

/// A block with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedBlock {
    pub block: Block,
    /// 1-based source line the block starts on.
    pub line: usize,
    /// No source lines remain after this block.
    pub last: bool,
}

/// Iterates the blocks of a document, carrying the TOC state and doing the
/// code-fence lookahead.
pub struct BlockStream<'a> {
    lines: Vec<&'a str>,
    index: usize,
    toc: TocState,
}

impl<'a> BlockStream<'a> {
    pub fn new(markdown: &'a str) -> Self {
        Self {
            lines: markdown.lines().collect(),
            index: 0,
            toc: TocState::default(),
        }
    }

    pub fn toc_state(&self) -> TocState {
        self.toc
    }

    fn read_fence(&mut self, fence: Fence) -> Block {
        let start = self.index;
        let mut body = Vec::new();
        let mut i = start + 1;
        let mut closed = false;

        while i < self.lines.len() {
            let line = self.lines[i];
            i += 1;
            if fence.is_closed_by(line) {
                closed = true;
                break;
            }
            body.push(line.to_string());
        }

        if !closed {
            log::warn!(
                "Code fence opened on line {} is never closed; the rest of the document is code",
                start + 1
            );
        }

        self.index = i;
        Block::CodeBlock {
            language: fence.language,
            lines: body,
        }
    }
}

impl Iterator for BlockStream<'_> {
    type Item = ClassifiedBlock;

    fn next(&mut self) -> Option<Self::Item> {
        let line = *self.lines.get(self.index)?;
        let start = self.index;

        let block = match Fence::open(line) {
            Some(fence) => self.read_fence(fence),
            None => {
                self.index += 1;
                classify_line(line, self.toc)
            }
        };
        self.toc.observe(&block);

        Some(ClassifiedBlock {
            block,
            line: start + 1,
            last: self.index >= self.lines.len(),
        })
    }
}

/// Classify a whole document.
pub fn classify_document(markdown: &str) -> Vec<Block> {
    BlockStream::new(markdown).map(|c| c.block).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(line: &str) -> Block {
        classify_line(line, TocState::Normal)
    }

    #[test]
    fn headings_by_prefix() {
        assert_eq!(normal("# Title"), Block::Heading { level: 1, text: "Title".into() });
        assert_eq!(normal("## Sub"), Block::Heading { level: 2, text: "Sub".into() });
        assert_eq!(normal("### Third ###"), Block::Heading { level: 3, text: "Third".into() });
        assert_eq!(normal("##### Deep"), Block::Heading { level: 3, text: "Deep".into() });
        assert_eq!(normal("#hashtag"), Block::Paragraph("#hashtag".into()));
    }

    #[test]
    fn list_items_and_depth() {
        assert_eq!(normal("- Alpha"), Block::BulletItem { depth: 0, text: "Alpha".into() });
        assert_eq!(normal("* Beta"), Block::BulletItem { depth: 0, text: "Beta".into() });
        assert_eq!(normal("    - Nested"), Block::BulletItem { depth: 2, text: "Nested".into() });
        assert_eq!(
            normal("12. Twelfth"),
            Block::NumberedItem { depth: 0, ordinal: 12, text: "Twelfth".into() }
        );
        assert_eq!(
            normal("\t3. Tabbed"),
            Block::NumberedItem { depth: 1, ordinal: 3, text: "Tabbed".into() }
        );
        assert_eq!(normal("3.14 is pi"), Block::Paragraph("3.14 is pi".into()));
    }

    #[test]
    fn rules_quotes_and_paragraphs() {
        assert_eq!(normal("---"), Block::HorizontalRule);
        assert_eq!(normal("* * *"), Block::HorizontalRule);
        assert_eq!(normal("____"), Block::HorizontalRule);
        assert_eq!(normal("> Quoted"), Block::Blockquote("Quoted".into()));
        assert_eq!(normal(">"), Block::Blockquote(String::new()));
        assert_eq!(normal("  plain text  "), Block::Paragraph("plain text".into()));
        assert_eq!(normal("   "), Block::Skip { anchor: None });
    }

    #[test]
    fn anchor_tags_are_skipped_with_their_name() {
        assert_eq!(
            normal(r#"<a name="usage"></a>"#),
            Block::Skip { anchor: Some("usage".into()) }
        );
        assert_eq!(normal("<a id='x'></a>"), Block::Skip { anchor: Some("x".into()) });
        assert_eq!(
            normal(r#"<a href="https://example.com">site</a> and more"#),
            Block::Paragraph(r#"<a href="https://example.com">site</a> and more"#.into())
        );
    }

    #[test]
    fn toc_items_only_inside_toc() {
        let toc = TocState::InTableOfContents;
        assert_eq!(
            classify_line("1. [Intro](#intro)", toc),
            Block::TocItem { depth: 0, prefix: "1.".into(), text: "[Intro](#intro)".into() }
        );
        assert_eq!(
            classify_line("  - [Usage](#usage)", toc),
            Block::TocItem { depth: 1, prefix: "\u{2022}".into(), text: "[Usage](#usage)".into() }
        );
        assert_eq!(
            classify_line("- no link here", toc),
            Block::BulletItem { depth: 0, text: "no link here".into() }
        );
        assert!(matches!(normal("1. [Intro](#intro)"), Block::NumberedItem { .. }));
    }

    #[test]
    fn toc_boundary_follows_heading_and_rule() {
        let md = "# Table of Contents\n1. [A](#a)\n- [B](#b)\n- plain\n---\n1. After";
        let blocks = classify_document(md);
        assert!(matches!(blocks[1], Block::TocItem { .. }));
        assert!(matches!(blocks[2], Block::TocItem { .. }));
        assert!(matches!(blocks[3], Block::BulletItem { .. }));
        assert_eq!(blocks[4], Block::HorizontalRule);
        assert!(matches!(blocks[5], Block::NumberedItem { .. }));
    }

    #[test]
    fn another_h1_leaves_toc() {
        let mut state = TocState::default();
        state.observe(&Block::Heading { level: 1, text: "TABLE OF CONTENTS".into() });
        assert!(state.in_toc());
        state.observe(&Block::Heading { level: 2, text: "Part".into() });
        assert!(state.in_toc());
        state.observe(&Block::Heading { level: 1, text: "Introduction".into() });
        assert!(!state.in_toc());
    }

    #[test]
    fn fenced_code_keeps_lines_verbatim() {
        let md = "Intro\n```rust\nfn main() {\n    println!(\"hi\");\n```\nAfter";
        let blocks = classify_document(md);
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("Intro".into()),
                Block::CodeBlock {
                    language: Some("rust".into()),
                    lines: vec!["fn main() {".into(), "    println!(\"hi\");".into()],
                },
                Block::Paragraph("After".into()),
            ]
        );
    }

    #[test]
    fn code_fence_contents_are_not_classified() {
        let blocks = classify_document("~~~\n# not a heading\n- not a list\n~~~");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                lines: vec!["# not a heading".into(), "- not a list".into()],
            }]
        );
    }

    #[test]
    fn unterminated_fence_takes_the_rest() {
        let blocks = classify_document("```\nline one\n\nline three");
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0],
            Block::CodeBlock {
                language: None,
                lines: vec!["line one".into(), String::new(), "line three".into()],
            }
        );
    }

    #[test]
    fn tilde_fence_is_not_closed_by_backticks() {
        let fence = Fence::open("~~~~").expect("fence");
        assert!(!fence.is_closed_by("```"));
        assert!(!fence.is_closed_by("~~~"));
        assert!(fence.is_closed_by("~~~~~ "));
    }

    #[test]
    fn stream_marks_last_block_and_lines() {
        let items: Vec<_> = BlockStream::new("# A\n\ntext").collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].line, 3);
        assert!(items[2].last);
        assert!(!items[0].last);
    }

    #[test]
    fn classification_is_repeatable() {
        for line in ["- item", "1. one", "# Table of contents", "> q", "***", "text"] {
            for toc in [TocState::Normal, TocState::InTableOfContents] {
                assert_eq!(classify_line(line, toc), classify_line(line, toc));
            }
        }
    }
}
