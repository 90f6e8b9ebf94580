//! Inline spans: tokenizing a line into styled runs and drawing them as one
//! continuous, wrapped line.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::surface::{Color, DrawingSurface, TextOptions};
use crate::theme::Theme;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)|(https?://[^\s<>]+)").expect("Invalid link regex")
});
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("Invalid code span regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("Invalid bold regex"));
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b_([^_]+?)_\b|\*([^*\s][^*]*?)\*").expect("Invalid italic regex")
});

const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '\'', '"'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStyle {
    Plain,
    Bold,
    Italic,
    Code,
    Link(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, SpanStyle::Plain)
    }

    pub fn is_plain(&self) -> bool {
        self.style == SpanStyle::Plain
    }
}

/// Split plain spans with `re`. `styled` turns a match into the span that
/// replaces it plus how many bytes of the match it consumed; the rest of the
/// match stays plain.
fn split_plain<F>(spans: Vec<Span>, re: &Regex, styled: F) -> Vec<Span>
where
    F: Fn(&Captures) -> (Span, usize),
{
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        if !span.is_plain() {
            out.push(span);
            continue;
        }

        let text = span.text.as_str();
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() < last {
                continue;
            }
            let (token, consumed) = styled(&caps);
            if token.text.is_empty() {
                continue;
            }
            if whole.start() > last {
                out.push(Span::plain(&text[last..whole.start()]));
            }
            out.push(token);
            last = whole.start() + consumed;
        }
        if last < text.len() {
            out.push(Span::plain(&text[last..]));
        }
    }
    out
}

fn link_span(caps: &Captures) -> (Span, usize) {
    if let (Some(label), Some(target)) = (caps.get(1), caps.get(2)) {
        let len = caps.get(0).map_or(0, |m| m.len());
        return (
            Span::new(label.as_str(), SpanStyle::Link(target.as_str().to_string())),
            len,
        );
    }

    let url = caps
        .get(3)
        .map_or("", |m| m.as_str())
        .trim_end_matches(URL_TRAILING_PUNCTUATION);
    (Span::new(url, SpanStyle::Link(url.to_string())), url.len())
}

fn delimited_span(caps: &Captures, style: SpanStyle) -> (Span, usize) {
    let inner = caps
        .iter()
        .skip(1)
        .flatten()
        .next()
        .map_or("", |m| m.as_str());
    let len = caps.get(0).map_or(0, |m| m.len());
    (Span::new(inner, style), len)
}

/// Tokenize one line of Markdown into spans, in document order.
///
/// Links are found first, then inline code, then bold, then italic. Each
/// pass only looks inside text the previous passes left plain, so markup
/// never nests: `**a `b` c**` yields a code span flanked by literal text.
pub fn tokenize(text: &str) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }

    let spans = vec![Span::plain(text)];
    let spans = split_plain(spans, &LINK_RE, link_span);
    let spans = split_plain(spans, &CODE_RE, |c| delimited_span(c, SpanStyle::Code));
    let spans = split_plain(spans, &BOLD_RE, |c| delimited_span(c, SpanStyle::Bold));
    split_plain(spans, &ITALIC_RE, |c| delimited_span(c, SpanStyle::Italic))
}

/// Whether `text` carries any link or inline markup.
pub fn has_formatting(text: &str) -> bool {
    tokenize(text).iter().any(|s| !s.is_plain())
}

pub fn contains_url(text: &str) -> bool {
    first_link(&tokenize(text)).is_some()
}

/// Target of the first link span, if any.
pub fn first_link(spans: &[Span]) -> Option<&str> {
    spans.iter().find_map(|s| match &s.style {
        SpanStyle::Link(target) => Some(target.as_str()),
        _ => None,
    })
}

/// The line as it reads once markup is removed.
pub fn plain_text(text: &str) -> String {
    tokenize(text).into_iter().map(|s| s.text).collect()
}

fn span_options(span: &Span, theme: &Theme, width: f32) -> TextOptions {
    let body_color = Color::from_theme(&theme.colors.text);
    let options = TextOptions::new().continued(true).with_width(width);
    match &span.style {
        SpanStyle::Plain => options.with_font(&theme.fonts.body).with_color(body_color),
        SpanStyle::Bold => options.with_font(&theme.fonts.bold).with_color(body_color),
        SpanStyle::Italic => options.with_font(&theme.fonts.italic).with_color(body_color),
        SpanStyle::Code => options
            .with_font(&theme.fonts.code)
            .with_color(body_color)
            .with_background(Color::from_theme(&theme.colors.code_background)),
        SpanStyle::Link(target) => options
            .with_font(&theme.fonts.body)
            .with_color(Color::from_theme(&theme.colors.link))
            .with_underline(true)
            .with_link(target.clone()),
    }
}

/// Draw `text` as one flowed line starting at `start_x` and the surface's
/// current y, wrapping inside `width`.
///
/// Plain text is one non-continued call. Anything else becomes a continued
/// chain: the first span is anchored, the rest flow on without coordinates,
/// and an empty terminal write closes the chain and restores the body font.
pub fn format_inline(
    surface: &mut dyn DrawingSurface,
    theme: &Theme,
    text: &str,
    start_x: f32,
    width: f32,
) {
    if text.is_empty() {
        return;
    }

    let body_color = Color::from_theme(&theme.colors.text);
    surface.set_font(&theme.fonts.body);
    surface.set_font_size(theme.font_size.body);
    surface.set_fill_color(body_color);

    let spans = tokenize(text);
    if let [only] = spans.as_slice() {
        if only.is_plain() {
            surface.text(
                &only.text,
                Some(start_x),
                None,
                &TextOptions::new().with_width(width),
            );
            return;
        }
    }

    let anchor_y = surface.y();
    for (i, span) in spans.iter().enumerate() {
        let options = span_options(span, theme, width);
        if i == 0 {
            surface.text(&span.text, Some(start_x), Some(anchor_y), &options);
        } else {
            surface.text(&span.text, None, None, &options);
        }
    }

    surface.text(
        "",
        None,
        None,
        &TextOptions::new()
            .with_font(&theme.fonts.body)
            .with_color(body_color),
    );
}
