use super::display::{DrawOp, FilledRect, LineSegment, LinkArea, NamedAnchor, Page, RenderedDocument, TextRun};
use super::wrap::{self, Piece, WrapState};
use super::{
    Align, Color, DocumentInfo, DrawingSurface, LINE_HEIGHT_RATIO, PageGeometry, PageListener,
    TextOptions,
};
use crate::fonts::TextMeasure;

const DEFAULT_FONT: &str = "Helvetica";
const DEFAULT_FONT_SIZE: f32 = 12.0;
const MIN_WRAP_WIDTH: f32 = 1.0;
const EPSILON: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
struct RunStyle {
    font: String,
    size: f32,
    color: Color,
    underline: bool,
    link: Option<String>,
    background: Option<Color>,
}

#[derive(Debug, Clone)]
struct Fragment {
    text: String,
    x_offset: f32,
    width: f32,
    style: RunStyle,
}

/// An open line of flowed text. Fragments are buffered until the line is
/// complete so alignment can be applied to the whole line.
#[derive(Debug, Clone)]
struct Chain {
    start_x: f32,
    width: f32,
    align: Align,
    line_break: bool,
    wrap: WrapState,
    pending: Vec<Fragment>,
    max_size: f32,
    /// Pieces may merge into the last fragment (same call, same line).
    merge_open: bool,
}

impl Chain {
    fn new(start_x: f32, width: f32, align: Align, line_break: bool) -> Self {
        Self {
            start_x,
            width,
            align,
            line_break,
            wrap: WrapState::default(),
            pending: Vec::new(),
            max_size: 0.0,
            merge_open: false,
        }
    }

    fn wrap_width(&self) -> f32 {
        if self.line_break { self.width } else { f32::MAX }
    }
}

/// Cursor and graphics state. Snapshotted around page listeners.
#[derive(Debug, Clone)]
struct FlowState {
    x: f32,
    y: f32,
    font: String,
    font_size: f32,
    color: Color,
    line_gap: f32,
    chain: Option<Chain>,
}

#[derive(Debug, Clone, Copy)]
enum PathCmd {
    Move(f32, f32),
    Line(f32, f32),
}

/// A [`DrawingSurface`] that lays text out with a [`TextMeasure`] and
/// records the result as one display list per page.
pub struct PageSurface<M: TextMeasure> {
    measure: M,
    geometry: PageGeometry,
    pages: Vec<Page>,
    state: FlowState,
    path: Vec<PathCmd>,
    listener: Option<Box<dyn PageListener>>,
    info: DocumentInfo,
}

impl<M: TextMeasure> PageSurface<M> {
    pub fn new(geometry: PageGeometry, measure: M) -> Self {
        Self {
            measure,
            geometry,
            pages: vec![Page::new(0, geometry.width, geometry.height)],
            state: FlowState {
                x: geometry.margins.left,
                y: geometry.margins.top,
                font: DEFAULT_FONT.to_string(),
                font_size: DEFAULT_FONT_SIZE,
                color: Color::BLACK,
                line_gap: 0.0,
                chain: None,
            },
            path: Vec::new(),
            listener: None,
            info: DocumentInfo::default(),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_page(&self) -> &Page {
        &self.pages[self.pages.len() - 1]
    }

    /// Close any open chain and hand over the pages.
    pub fn finish(mut self) -> RenderedDocument {
        self.close_chain();
        RenderedDocument {
            pages: self.pages,
            info: self.info,
        }
    }

    fn push_op(&mut self, op: DrawOp) {
        let last = self.pages.len() - 1;
        self.pages[last].ops.push(op);
    }

    fn line_height_for(&self, size: f32) -> f32 {
        size * LINE_HEIGHT_RATIO + self.state.line_gap
    }

    fn apply_options(&mut self, options: &TextOptions) {
        if let Some(font) = &options.font {
            self.state.font = font.clone();
        }
        if let Some(size) = options.size {
            self.set_font_size(size);
        }
        if let Some(color) = options.color {
            self.state.color = color;
        }
    }

    fn close_chain(&mut self) {
        if let Some(mut chain) = self.state.chain.take() {
            if !chain.pending.is_empty() {
                self.flush_line(&mut chain);
            }
            self.state.x = chain.start_x;
        }
    }

    fn push_piece(&mut self, chain: &mut Chain, text: String, width: f32, style: &RunStyle) {
        chain.max_size = chain.max_size.max(style.size);

        if chain.merge_open {
            if let Some(last) = chain.pending.last_mut() {
                if last.style == *style {
                    last.text.push_str(&text);
                    last.width += width;
                    return;
                }
            }
        }

        let x_offset = chain
            .pending
            .last()
            .map(|f| f.x_offset + f.width)
            .unwrap_or(0.0);
        chain.pending.push(Fragment {
            text,
            x_offset,
            width,
            style: style.clone(),
        });
        chain.merge_open = true;
    }

    /// Width of the line without trailing whitespace.
    fn visible_width(&mut self, fragments: &[Fragment]) -> f32 {
        for frag in fragments.iter().rev() {
            let trimmed = frag.text.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let width = if trimmed.len() == frag.text.len() {
                frag.width
            } else {
                self.measure
                    .text_width(trimmed, &frag.style.font, frag.style.size)
            };
            return frag.x_offset + width;
        }
        0.0
    }

    /// Emit the open line at the cursor and move below it, starting a new
    /// page first when the line would cross the bottom margin.
    fn flush_line(&mut self, chain: &mut Chain) {
        let size = if chain.max_size > 0.0 {
            chain.max_size
        } else {
            self.state.font_size
        };
        let line_height = self.line_height_for(size);

        if chain.line_break
            && self.state.y + line_height > self.geometry.bottom_limit() + EPSILON
            && self.state.y > self.geometry.margins.top + EPSILON
        {
            log::debug!(
                "Line at y={:.1} overflows page {}; breaking",
                self.state.y,
                self.pages.len()
            );
            self.begin_page();
        }

        let top = self.state.y;
        let fragments = std::mem::take(&mut chain.pending);
        let visible = self.visible_width(&fragments);
        let shift = match chain.align {
            Align::Left => 0.0,
            Align::Center => ((chain.width - visible) / 2.0).max(0.0),
            Align::Right => (chain.width - visible).max(0.0),
        };

        let mut ascent: f32 = 0.0;
        for frag in &fragments {
            ascent = ascent.max(self.measure.ascent(&frag.style.font, frag.style.size));
        }

        for frag in fragments {
            let style = frag.style;
            if frag.text.trim().is_empty() && style.background.is_none() {
                continue;
            }
            let x = chain.start_x + shift + frag.x_offset;
            let baseline = top + ascent;

            if let Some(background) = style.background {
                self.push_op(DrawOp::Rect(FilledRect {
                    x,
                    y: top,
                    width: frag.width,
                    height: line_height,
                    color: background,
                    opacity: 1.0,
                }));
            }

            if style.underline {
                let underline_y = baseline + style.size * 0.12;
                self.push_op(DrawOp::Line(LineSegment {
                    x1: x,
                    y1: underline_y,
                    x2: x + frag.width,
                    y2: underline_y,
                    width: (style.size * 0.06).max(0.5),
                    color: style.color,
                }));
            }

            if let Some(target) = style.link {
                self.push_op(DrawOp::Link(LinkArea {
                    x,
                    y: top,
                    width: frag.width,
                    height: line_height,
                    target,
                }));
            }

            self.push_op(DrawOp::Text(TextRun {
                x,
                y: top,
                baseline,
                width: frag.width,
                text: frag.text,
                font: style.font,
                size: style.size,
                color: style.color,
            }));
        }

        self.state.y = top + line_height;
        chain.max_size = 0.0;
        chain.merge_open = false;
    }

    fn begin_page(&mut self) {
        let index = self.pages.len();
        self.pages
            .push(Page::new(index, self.geometry.width, self.geometry.height));
        self.state.x = self.geometry.margins.left;
        self.state.y = self.geometry.margins.top;
        self.path.clear();
        log::debug!("Page {} started", index + 1);
        self.fire_listener();
    }

    fn fire_listener(&mut self) {
        let Some(mut listener) = self.listener.take() else {
            return;
        };
        let saved = self.state.clone();
        self.state.chain = None;
        listener.page_added(self);
        self.close_chain();
        self.state = saved;
        if self.listener.is_none() {
            self.listener = Some(listener);
        }
    }
}

impl<M: TextMeasure> DrawingSurface for PageSurface<M> {
    fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    fn x(&self) -> f32 {
        self.state.x
    }

    fn y(&self) -> f32 {
        self.state.y
    }

    fn set_x(&mut self, x: f32) {
        self.state.x = x;
    }

    fn set_y(&mut self, y: f32) {
        self.state.y = y;
    }

    fn font(&self) -> &str {
        &self.state.font
    }

    fn font_size(&self) -> f32 {
        self.state.font_size
    }

    fn fill_color(&self) -> Color {
        self.state.color
    }

    fn line_gap(&self) -> f32 {
        self.state.line_gap
    }

    fn set_font(&mut self, name: &str) {
        self.state.font = name.to_string();
    }

    fn set_font_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.state.font_size = size;
        } else {
            log::warn!("Ignoring invalid font size {}", size);
        }
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state.color = color;
    }

    fn set_line_gap(&mut self, gap: f32) {
        self.state.line_gap = gap.max(0.0);
    }

    fn text(&mut self, content: &str, x: Option<f32>, y: Option<f32>, options: &TextOptions) {
        self.apply_options(options);
        let content: String = content
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        if (x.is_some() || y.is_some()) && self.state.chain.is_some() {
            log::warn!("Explicit position inside a continued text chain; restarting line flow");
            self.close_chain();
        }

        let mut chain = match self.state.chain.take() {
            Some(chain) => chain,
            None => {
                if let Some(x) = x {
                    self.state.x = x;
                }
                if let Some(y) = y {
                    self.state.y = y;
                }
                if content.is_empty() {
                    return;
                }
                let start_x = self.state.x;
                let width = options
                    .width
                    .unwrap_or(self.geometry.width - self.geometry.margins.right - start_x)
                    .max(MIN_WRAP_WIDTH);
                Chain::new(start_x, width, options.align, options.line_break)
            }
        };

        chain.merge_open = false;
        let style = RunStyle {
            font: self.state.font.clone(),
            size: self.state.font_size,
            color: self.state.color,
            underline: options.underline,
            link: options.link.clone(),
            background: options.background,
        };

        let wrap_width = chain.wrap_width();
        let pieces = wrap::wrap(
            &mut self.measure,
            &style.font,
            style.size,
            wrap_width,
            &content,
            &mut chain.wrap,
        );
        for piece in pieces {
            match piece {
                Piece::Text { text, width } => self.push_piece(&mut chain, text, width, &style),
                Piece::LineBreak => self.flush_line(&mut chain),
            }
        }

        if options.continued {
            self.state.x = chain.start_x + chain.wrap.offset;
            self.state.chain = Some(chain);
        } else {
            if !chain.pending.is_empty() {
                self.flush_line(&mut chain);
            }
            self.state.x = chain.start_x;
        }
    }

    fn text_height(&mut self, content: &str, options: &TextOptions) -> f32 {
        let font = options.font.clone().unwrap_or_else(|| self.state.font.clone());
        let size = options.size.unwrap_or(self.state.font_size);
        let width = options
            .width
            .unwrap_or(self.geometry.width - self.geometry.margins.right - self.state.x)
            .max(MIN_WRAP_WIDTH);
        let lines = if content.is_empty() {
            0
        } else if options.line_break {
            wrap::line_count(&mut self.measure, &font, size, width, content)
        } else {
            content.split('\n').count()
        };
        lines as f32 * self.line_height_for(size)
    }

    fn string_width(&mut self, text: &str, font: &str, size: f32) -> f32 {
        self.measure.text_width(text, font, size)
    }

    fn current_line_height(&self) -> f32 {
        self.line_height_for(self.state.font_size)
    }

    fn move_down(&mut self, lines: f32) {
        self.close_chain();
        self.state.y += lines * self.current_line_height();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.path.push(PathCmd::Move(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.push(PathCmd::Line(x, y));
    }

    fn stroke(&mut self, color: Color, width: f32) {
        let mut current: Option<(f32, f32)> = None;
        let commands = std::mem::take(&mut self.path);
        for cmd in commands {
            match cmd {
                PathCmd::Move(x, y) => current = Some((x, y)),
                PathCmd::Line(x, y) => {
                    if let Some((x1, y1)) = current {
                        self.push_op(DrawOp::Line(LineSegment {
                            x1,
                            y1,
                            x2: x,
                            y2: y,
                            width,
                            color,
                        }));
                    }
                    current = Some((x, y));
                }
            }
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color, opacity: f32) {
        self.push_op(DrawOp::Rect(FilledRect {
            x,
            y,
            width,
            height,
            color,
            opacity: opacity.clamp(0.0, 1.0),
        }));
    }

    fn add_page(&mut self) {
        self.close_chain();
        self.begin_page();
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn set_page_listener(&mut self, listener: Option<Box<dyn PageListener>>) {
        self.listener = listener;
    }

    fn decorate_current_page(&mut self) {
        self.fire_listener();
    }

    fn chain_open(&self) -> bool {
        self.state.chain.is_some()
    }

    fn add_anchor(&mut self, name: &str) {
        let anchor = NamedAnchor {
            name: name.to_string(),
            x: self.state.x,
            y: self.state.y,
        };
        let last = self.pages.len() - 1;
        self.pages[last].anchors.push(anchor);
    }

    fn set_document_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardMetrics;
    use crate::surface::{Margins, PageSize};

    fn small_surface() -> PageSurface<StandardMetrics> {
        let geometry = PageGeometry::new(
            PageSize::Custom {
                width: 200.0,
                height: 200.0,
            },
            Margins::uniform(20.0),
        );
        let mut surface = PageSurface::new(geometry, StandardMetrics::new());
        surface.set_font("Courier");
        surface.set_font_size(10.0);
        surface
    }

    struct Footer;

    impl PageListener for Footer {
        fn page_added(&mut self, surface: &mut dyn DrawingSurface) {
            let n = surface.page_count();
            surface.set_font("Helvetica-Bold");
            surface.set_font_size(6.0);
            surface.text(
                &format!("Page {n}"),
                Some(20.0),
                Some(190.0),
                &TextOptions::new().with_line_break(false),
            );
        }
    }

    #[test]
    fn single_call_draws_one_run_and_moves_below() {
        let mut s = small_surface();
        s.text("hello", None, None, &TextOptions::default());

        let runs: Vec<_> = s.current_page().text_runs().collect();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].x, 20.0);
        assert_eq!(runs[0].y, 20.0);
        assert_eq!(s.y(), 32.0);
        assert_eq!(s.x(), 20.0);
        assert!(!s.chain_open());
    }

    #[test]
    fn continued_segments_share_a_line_until_closed() {
        let mut s = small_surface();
        s.text("ab", Some(20.0), Some(20.0), &TextOptions::new().continued(true));
        assert!(s.chain_open());
        assert_eq!(s.x(), 32.0);
        s.text("cd", None, None, &TextOptions::new().continued(true).with_font("Courier-Bold"));
        assert!(s.current_page().text_runs().next().is_none(), "line is buffered");

        s.text("", None, None, &TextOptions::default());
        assert!(!s.chain_open());
        let runs: Vec<_> = s.current_page().text_runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].y, runs[1].y);
        assert_eq!(runs[1].x, 32.0);
        assert_eq!(runs[1].font, "Courier-Bold");
        assert_eq!(s.current_page().lines(), vec!["abcd"]);
    }

    #[test]
    fn chain_wraps_as_one_paragraph() {
        let mut s = small_surface();
        // 160pt content width, Courier 10pt = 6pt per char: 26 chars per line.
        s.text("aaaaaaaaaa ", None, None, &TextOptions::new().continued(true));
        s.text("bbbbbbbbbb ", None, None, &TextOptions::new().continued(true));
        s.text("cccccccccc", None, None, &TextOptions::default());
        assert_eq!(
            s.current_page().lines(),
            vec!["aaaaaaaaaa bbbbbbbbbb ", "cccccccccc"]
        );
    }

    #[test]
    fn explicit_coordinates_mid_chain_restart_flow() {
        let mut s = small_surface();
        s.text("first", None, None, &TextOptions::new().continued(true));
        s.text("second", Some(100.0), Some(100.0), &TextOptions::default());
        let runs: Vec<_> = s.current_page().text_runs().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].y, 20.0);
        assert_eq!((runs[1].x, runs[1].y), (100.0, 100.0));
    }

    #[test]
    fn empty_write_without_chain_is_a_no_op() {
        let mut s = small_surface();
        s.text("", None, None, &TextOptions::default());
        assert_eq!(s.y(), 20.0);
        assert!(s.current_page().is_blank());
    }

    #[test]
    fn overflow_starts_a_new_page_and_fires_listener() {
        let mut s = small_surface();
        s.set_page_listener(Some(Box::new(Footer)));
        // 160pt of content height at 12pt per line holds 13 lines.
        let body = vec!["line"; 20].join("\n");
        s.text(&body, None, None, &TextOptions::default());

        assert_eq!(s.page_count(), 2);
        assert_eq!(s.pages()[0].lines().len(), 13);
        let second = s.pages()[1].lines();
        assert_eq!(second.last().map(String::as_str), Some("Page 2"));
        assert_eq!(second.iter().filter(|l| *l == "line").count(), 7);

        // The listener's font change did not leak into the flow.
        assert_eq!(s.font(), "Courier");
        assert_eq!(s.font_size(), 10.0);
        let body_run = s.pages()[1]
            .text_runs()
            .find(|r| r.text == "line")
            .expect("body line on page 2");
        assert_eq!(body_run.y, 20.0);
    }

    #[test]
    fn text_without_line_break_never_breaks_pages() {
        let mut s = small_surface();
        s.text("footer", Some(20.0), Some(195.0), &TextOptions::new().with_line_break(false));
        assert_eq!(s.page_count(), 1);
    }

    #[test]
    fn center_alignment_shifts_complete_lines() {
        let mut s = small_surface();
        s.text("abcd", None, None, &TextOptions::new().with_align(Align::Center).with_width(160.0));
        let run = s.current_page().text_runs().next().expect("run");
        // 24pt of text centred in 160pt.
        assert_eq!(run.x, 20.0 + 68.0);
    }

    #[test]
    fn text_height_counts_wrapped_lines() {
        let mut s = small_surface();
        let options = TextOptions::new().with_width(30.0);
        assert_eq!(s.text_height("abc abc abc", &options), 36.0);
        assert_eq!(s.text_height("", &options), 0.0);
    }

    #[test]
    fn move_down_uses_current_line_height() {
        let mut s = small_surface();
        s.set_line_gap(3.0);
        s.move_down(2.0);
        assert_eq!(s.y(), 20.0 + 2.0 * 15.0);
    }

    #[test]
    fn stroke_turns_path_into_segments() {
        let mut s = small_surface();
        s.move_to(20.0, 50.0);
        s.line_to(180.0, 50.0);
        s.stroke(Color::BLACK, 1.0);
        let ops = &s.current_page().ops;
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], DrawOp::Line(seg) if seg.x2 == 180.0 && seg.y1 == 50.0));
    }

    #[test]
    fn link_runs_record_a_clickable_area() {
        let mut s = small_surface();
        s.text(
            "site",
            None,
            None,
            &TextOptions::new().with_link("https://example.com").with_underline(true),
        );
        let ops = &s.current_page().ops;
        assert!(ops.iter().any(|op| matches!(op, DrawOp::Link(l) if l.target == "https://example.com")));
        assert!(ops.iter().any(|op| matches!(op, DrawOp::Line(_))));
    }

    #[test]
    fn anchors_record_cursor_position() {
        let mut s = small_surface();
        s.move_down(1.0);
        s.add_anchor("intro");
        let doc = s.finish();
        let (page, anchor) = doc.find_anchor("intro").expect("anchor");
        assert_eq!(page, 0);
        assert_eq!(anchor.y, 32.0);
    }

    #[test]
    fn control_characters_are_dropped() {
        let mut s = small_surface();
        s.text("a\u{7}b\r", None, None, &TextOptions::default());
        assert_eq!(s.current_page().lines(), vec!["ab"]);
    }
}
