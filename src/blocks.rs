//! One renderer per block kind.
//!
//! Renderers take a [`RenderContext`] and explicit horizontal geometry (`x`
//! and `width`). They never take a vertical position: every block is drawn
//! at the surface's live cursor, which may have moved to a new page since
//! the caller last looked.

use std::borrow::Cow;

use crate::inline;
use crate::surface::{Align, Color, DrawingSurface, TextOptions};
use crate::theme::Theme;

const CODE_PADDING: f32 = 4.0;
const QUOTE_BAR_OFFSET: f32 = 8.0;
const QUOTE_BAR_WIDTH: f32 = 2.0;
const RULE_WIDTH: f32 = 0.5;

/// The single mutable handle renderers draw through.
pub struct RenderContext<'a> {
    pub surface: &'a mut dyn DrawingSurface,
    pub theme: &'a Theme,
}

impl<'a> RenderContext<'a> {
    pub fn new(surface: &'a mut dyn DrawingSurface, theme: &'a Theme) -> Self {
        Self { surface, theme }
    }

    pub(crate) fn use_body_font(&mut self) {
        self.surface.set_font(&self.theme.fonts.body);
        self.surface.set_font_size(self.theme.font_size.body);
        self.surface
            .set_fill_color(Color::from_theme(&self.theme.colors.text));
    }
}

/// Strip control characters a text run cannot carry. Newlines and tabs
/// survive when `multiline` is set.
fn clean(content: &str, multiline: bool) -> Cow<'_, str> {
    let keep = |c: char| !c.is_control() || (multiline && (c == '\n' || c == '\t'));
    if content.chars().all(keep) {
        return Cow::Borrowed(content);
    }
    log::warn!("Stripping control characters from block content");
    Cow::Owned(content.chars().filter(|c| keep(*c)).collect())
}

pub fn render_heading(ctx: &mut RenderContext<'_>, level: u8, text: &str, x: f32, width: f32, spacing: f32) {
    let text = inline::plain_text(&clean(text, false));
    let theme = ctx.theme;
    let surface = &mut *ctx.surface;

    surface.set_font(&theme.fonts.heading);
    surface.set_font_size(theme.heading_size(level));
    surface.set_fill_color(Color::from_theme(&theme.colors.heading));
    surface.text(
        &text,
        Some(x),
        None,
        &TextOptions::new().with_width(width).with_align(Align::Left),
    );
    surface.move_down(spacing);
}

/// Trailing spacing for a list item. Items carrying a URL get the larger
/// `list_with_url` spacing.
pub fn list_item_spacing(theme: &Theme, text: &str) -> f32 {
    if inline::contains_url(text) {
        theme.spacing.list_with_url
    } else {
        theme.spacing.list
    }
}

/// Compose `"<marker> <content>"` and draw it as one wrapped block. The
/// item's first link, if any, covers the whole item.
pub fn render_list_item(ctx: &mut RenderContext<'_>, marker: &str, text: &str, x: f32, width: f32) {
    let cleaned = clean(text, false);
    let spans = inline::tokenize(&cleaned);
    let spacing = list_item_spacing(ctx.theme, &cleaned);

    let mut options = TextOptions::new().with_width(width);
    if let Some(target) = inline::first_link(&spans) {
        options = options.with_link(target);
    }
    let content: String = spans.into_iter().map(|s| s.text).collect();
    let composed = format!("{marker} {content}");

    ctx.use_body_font();
    ctx.surface.text(&composed, Some(x), None, &options);
    ctx.surface.move_down(spacing);
}

pub fn render_bullet_item(ctx: &mut RenderContext<'_>, text: &str, x: f32, width: f32) {
    render_list_item(ctx, "\u{2022}", text, x, width);
}

pub fn render_numbered_item(ctx: &mut RenderContext<'_>, ordinal: u32, text: &str, x: f32, width: f32) {
    render_list_item(ctx, &format!("{ordinal}."), text, x, width);
}

/// A table-of-contents entry: prefix and title in one call. When the entry
/// links somewhere, the whole line becomes the link.
pub fn render_toc_item(ctx: &mut RenderContext<'_>, prefix: &str, text: &str, x: f32, width: f32) {
    let cleaned = clean(text, false);
    let spans = inline::tokenize(&cleaned);
    let target = inline::first_link(&spans).map(str::to_string);
    let title: String = spans.into_iter().map(|s| s.text).collect();
    let composed = format!("{prefix} {title}");

    let mut options = TextOptions::new().with_width(width);
    if let Some(target) = target {
        options = options.with_link(target);
    }

    ctx.use_body_font();
    ctx.surface.text(&composed, Some(x), None, &options);
    ctx.surface.move_down(ctx.theme.spacing.toc);
}

pub fn render_blockquote(ctx: &mut RenderContext<'_>, text: &str, x: f32, width: f32, spacing: f32) {
    let text = inline::plain_text(&clean(text, false));
    let theme = ctx.theme;
    let color = Color::from_theme(&theme.colors.blockquote);
    let surface = &mut *ctx.surface;

    surface.set_font(&theme.fonts.italic);
    surface.set_font_size(theme.font_size.body);
    surface.set_fill_color(color);

    let top = surface.y();
    let page = surface.page_count();
    surface.text(&text, Some(x), None, &TextOptions::new().with_width(width));

    let bar_top = if surface.page_count() == page {
        top
    } else {
        surface.geometry().margins.top
    };
    let bar_x = x - QUOTE_BAR_OFFSET;
    let bar_bottom = surface.y();
    surface.move_to(bar_x, bar_top);
    surface.line_to(bar_x, bar_bottom);
    surface.stroke(color, QUOTE_BAR_WIDTH);

    surface.set_fill_color(Color::from_theme(&theme.colors.text));
    surface.move_down(spacing);
}

/// Verbatim code in the code font. The block moves to a fresh page when it
/// fits on one page but not in the space left; the background is only
/// drawn when the whole block lands on one page.
pub fn render_code_block(ctx: &mut RenderContext<'_>, lines: &[String], x: f32, width: f32, spacing: f32) {
    let joined = lines.join("\n");
    let body = clean(&joined, true);
    let theme = ctx.theme;
    let surface = &mut *ctx.surface;

    surface.set_font(&theme.fonts.code);
    surface.set_font_size(theme.font_size.code);
    surface.set_fill_color(Color::from_theme(&theme.colors.text));

    let options = TextOptions::new().with_width(width);
    let text_height = if body.is_empty() {
        surface.current_line_height()
    } else {
        surface.text_height(&body, &options)
    };
    let box_height = text_height + 2.0 * CODE_PADDING;
    let geometry = surface.geometry();
    let fits_on_a_page = box_height <= geometry.content_height();

    if fits_on_a_page && box_height > surface.space_remaining() && surface.y() > geometry.margins.top {
        log::debug!("Code block of {:.1}pt moved to a new page", box_height);
        surface.add_page();
    }

    let top = surface.y();
    if fits_on_a_page {
        surface.fill_rect(
            x - CODE_PADDING,
            top,
            width + CODE_PADDING,
            box_height,
            Color::from_theme(&theme.colors.code_background),
            1.0,
        );
    }

    surface.set_y(top + CODE_PADDING);
    if body.is_empty() {
        surface.move_down(1.0);
    } else {
        surface.text(&body, Some(x), None, &options);
    }
    let after = surface.y() + CODE_PADDING;
    surface.set_y(after);

    ctx.use_body_font();
    ctx.surface.move_down(spacing);
}

pub fn render_horizontal_rule(ctx: &mut RenderContext<'_>, x: f32, width: f32, spacing: f32) {
    let color = Color::from_theme(&ctx.theme.colors.footer);
    let surface = &mut *ctx.surface;
    let y = surface.y();
    surface.move_to(x, y);
    surface.line_to(x + width, y);
    surface.stroke(color, RULE_WIDTH);

    ctx.use_body_font();
    ctx.surface.move_down(spacing);
}

pub fn render_paragraph(ctx: &mut RenderContext<'_>, text: &str, x: f32, width: f32, spacing: f32) {
    let text = clean(text, false);
    inline::format_inline(&mut *ctx.surface, ctx.theme, &text, x, width);
    ctx.surface.move_down(spacing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardMetrics;
    use crate::surface::{DrawOp, Margins, PageGeometry, PageSize, PageSurface};

    const X: f32 = 72.0;
    const WIDTH: f32 = 451.28;

    fn surface() -> PageSurface<StandardMetrics> {
        let mut s = PageSurface::new(
            PageGeometry::new(PageSize::A4, Margins::uniform(72.0)),
            StandardMetrics::new(),
        );
        s.set_line_gap(Theme::default().spacing.line_gap);
        s
    }

    #[test]
    fn heading_uses_heading_font_and_size() {
        let theme = Theme::default();
        let mut s = surface();
        render_heading(&mut RenderContext::new(&mut s, &theme), 2, "Install **now**", X, WIDTH, 0.6);

        let run = s.current_page().text_runs().next().expect("run").clone();
        assert_eq!(run.text, "Install now");
        assert_eq!(run.font, "Helvetica-Bold");
        assert_eq!(run.size, 18.0);
        assert!(!s.chain_open());
    }

    #[test]
    fn list_item_is_one_composed_draw() {
        let theme = Theme::default();
        let mut s = surface();
        render_bullet_item(&mut RenderContext::new(&mut s, &theme), "Alpha", X, WIDTH);
        assert_eq!(s.current_page().lines(), vec!["\u{2022} Alpha"]);
        assert_eq!(s.current_page().text_runs().count(), 1);
    }

    #[test]
    fn long_list_item_wraps_at_words() {
        let theme = Theme::default();
        let mut s = surface();
        let text = "A very long line of forty or more characters that must wrap across two lines";
        render_bullet_item(&mut RenderContext::new(&mut s, &theme), text, X, 200.0);

        let lines = s.current_page().lines();
        assert!(lines.len() >= 2, "{lines:?}");
        assert!(lines.iter().all(|l| l.trim().chars().count() > 1), "{lines:?}");
    }

    #[test]
    fn url_items_get_the_larger_spacing() {
        let theme = Theme::default();
        assert_eq!(list_item_spacing(&theme, "See https://example.com for details"), 0.6);
        assert_eq!(list_item_spacing(&theme, "Plain item"), 0.3);

        let mut with_url = surface();
        render_numbered_item(
            &mut RenderContext::new(&mut with_url, &theme),
            1,
            "See https://example.com",
            X,
            WIDTH,
        );
        let mut without = surface();
        render_numbered_item(&mut RenderContext::new(&mut without, &theme), 1, "See example", X, WIDTH);

        let line_height = with_url.current_line_height();
        let extra = with_url.y() - without.y();
        assert!((extra - 0.3 * line_height).abs() < 0.01, "extra = {extra}");
    }

    #[test]
    fn list_item_links_its_first_url() {
        let theme = Theme::default();
        let mut s = surface();
        render_bullet_item(
            &mut RenderContext::new(&mut s, &theme),
            "Docs at https://example.com and [mirror](https://mirror.example.com)",
            X,
            WIDTH,
        );

        let page = s.current_page();
        assert_eq!(page.lines(), vec!["\u{2022} Docs at https://example.com and mirror"]);
        assert_eq!(page.text_runs().count(), 1);
        let links: Vec<&str> = page
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Link(l) => Some(l.target.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec!["https://example.com"]);
    }

    #[test]
    fn plain_list_item_has_no_link() {
        let theme = Theme::default();
        let mut s = surface();
        render_numbered_item(&mut RenderContext::new(&mut s, &theme), 3, "Nothing to click", X, WIDTH);
        assert!(!s.current_page().ops.iter().any(|op| matches!(op, DrawOp::Link(_))));
    }

    #[test]
    fn toc_item_links_the_whole_entry() {
        let theme = Theme::default();
        let mut s = surface();
        render_toc_item(&mut RenderContext::new(&mut s, &theme), "1.", "[Usage](#usage)", X, WIDTH);
        assert_eq!(s.current_page().lines(), vec!["1. Usage"]);
        assert!(
            s.current_page()
                .ops
                .iter()
                .any(|op| matches!(op, DrawOp::Link(l) if l.target == "#usage"))
        );
    }

    #[test]
    fn blockquote_draws_bar_and_restores_color() {
        let theme = Theme::default();
        let mut s = surface();
        render_blockquote(&mut RenderContext::new(&mut s, &theme), "Quoted words", X + 20.0, WIDTH - 20.0, 0.5);

        let run = s.current_page().text_runs().next().expect("run").clone();
        assert_eq!(run.font, "Helvetica-Oblique");
        assert_eq!(run.color, Color::from_theme("#666666"));
        assert!(s.current_page().ops.iter().any(|op| matches!(op, DrawOp::Line(l) if l.x1 == X + 12.0)));
        assert_eq!(s.fill_color(), Color::from_theme("#333333"));
    }

    #[test]
    fn code_block_is_verbatim_with_background() {
        let theme = Theme::default();
        let mut s = surface();
        let lines = vec!["fn main() {".to_string(), "    body();".to_string()];
        render_code_block(&mut RenderContext::new(&mut s, &theme), &lines, X + 10.0, WIDTH - 10.0, 0.5);

        assert_eq!(s.current_page().lines(), vec!["fn main() {", "    body();"]);
        assert!(matches!(s.current_page().ops[0], DrawOp::Rect(_)));
        assert_eq!(s.font(), "Helvetica");
        assert_eq!(s.font_size(), 11.0);
    }

    #[test]
    fn code_block_moves_to_a_fresh_page_when_it_would_split() {
        let theme = Theme::default();
        let mut s = surface();
        s.set_y(700.0);
        let lines: Vec<String> = (0..6).map(|i| format!("line {i}")).collect();
        render_code_block(&mut RenderContext::new(&mut s, &theme), &lines, X + 10.0, WIDTH - 10.0, 0.5);

        assert_eq!(s.page_count(), 2);
        assert!(s.pages()[0].is_blank());
        assert_eq!(s.pages()[1].lines().len(), 6);
    }

    #[test]
    fn horizontal_rule_spans_the_width() {
        let theme = Theme::default();
        let mut s = surface();
        render_horizontal_rule(&mut RenderContext::new(&mut s, &theme), X, WIDTH, 1.0);
        match &s.current_page().ops[0] {
            DrawOp::Line(l) => {
                assert_eq!(l.x1, X);
                assert!((l.x2 - (X + WIDTH)).abs() < 0.001);
            }
            other => panic!("expected a rule, got {other:?}"),
        }
        assert!(s.y() > 72.0);
    }

    #[test]
    fn horizontal_rule_advance_ignores_the_previous_font_size() {
        let theme = Theme::default();
        let mut s = surface();
        render_heading(&mut RenderContext::new(&mut s, &theme), 1, "Big", X, WIDTH, 0.0);
        let before = s.y();
        render_horizontal_rule(&mut RenderContext::new(&mut s, &theme), X, WIDTH, 1.0);

        assert_eq!(s.font_size(), theme.font_size.body);
        assert!((s.y() - before - s.current_line_height()).abs() < 0.01);
    }

    #[test]
    fn paragraph_closes_its_chain() {
        let theme = Theme::default();
        let mut s = surface();
        render_paragraph(&mut RenderContext::new(&mut s, &theme), "Some **bold** text", X, WIDTH, 0.5);
        assert!(!s.chain_open());
        assert_eq!(s.current_page().lines(), vec!["Some bold text"]);
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(clean("a\u{0}b", false), "ab");
        assert_eq!(clean("a\n\tb", true), "a\n\tb");
        assert!(matches!(clean("fine", false), Cow::Borrowed(_)));
    }
}
