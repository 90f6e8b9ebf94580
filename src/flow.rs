//! The flow controller: classify each source line, work out where the block
//! goes horizontally, hand it to its renderer, and keep the surface in a
//! known state between blocks.

use crate::blocks::{self, RenderContext};
use crate::classify::{Block, BlockStream, ClassifiedBlock};
use crate::debug::{self, DebugOptions};
use crate::surface::{
    Align, Color, DrawingSurface, LINE_HEIGHT_RATIO, PageGeometry, PageListener, TextOptions,
};
use crate::theme::Theme;

pub const LIST_INDENT: f32 = 15.0;
pub const TOC_INDENT: f32 = 10.0;
pub const BLOCKQUOTE_INDENT: f32 = 20.0;
pub const CODE_INDENT: f32 = 10.0;
/// Kept free at the right of list and TOC items.
pub const MARKER_SAFETY_MARGIN: f32 = 5.0;
/// Line units a blank source line advances.
pub const BLANK_LINE_ADVANCE: f32 = 0.3;
pub const RULE_ADVANCE: f32 = 1.0;

/// Left edge and available width for a block.
pub fn block_geometry(geometry: &PageGeometry, block: &Block) -> (f32, f32) {
    let content = geometry.content_width();
    let (indent, trailing) = match block {
        Block::BulletItem { depth, .. } | Block::NumberedItem { depth, .. } => {
            (LIST_INDENT * (*depth as f32 + 1.0), MARKER_SAFETY_MARGIN)
        }
        Block::TocItem { depth, .. } => (TOC_INDENT * (*depth as f32 + 1.0), MARKER_SAFETY_MARGIN),
        Block::Blockquote(_) => (BLOCKQUOTE_INDENT, 0.0),
        Block::CodeBlock { .. } => (CODE_INDENT, 0.0),
        _ => (0.0, 0.0),
    };
    // Deep nesting never eats more than half the line.
    let indent = indent.min(content / 2.0);
    let width = (content - indent - trailing).max(1.0);
    (geometry.margins.left + indent, width)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSummary {
    /// Blocks handed to a renderer (blank lines and anchors excluded).
    pub blocks_rendered: usize,
    pub anchors: Vec<String>,
}

pub struct FlowController<'a> {
    ctx: RenderContext<'a>,
    debug: DebugOptions,
    summary: FlowSummary,
}

impl<'a> FlowController<'a> {
    pub fn new(surface: &'a mut dyn DrawingSurface, theme: &'a Theme, debug: DebugOptions) -> Self {
        Self {
            ctx: RenderContext::new(surface, theme),
            debug,
            summary: FlowSummary::default(),
        }
    }

    /// Lay out every block of `markdown` from the current cursor onwards.
    pub fn run(mut self, markdown: &str) -> FlowSummary {
        self.ctx.surface.set_line_gap(self.ctx.theme.spacing.line_gap);
        for item in BlockStream::new(markdown) {
            self.render(&item);
            if !item.last {
                self.realign();
            }
        }
        self.summary
    }

    fn render(&mut self, item: &ClassifiedBlock) {
        debug::log_cursor(&self.debug, &*self.ctx.surface, item.block.kind(), item.line);

        let geometry = self.ctx.surface.geometry();
        let (x, width) = block_geometry(&geometry, &item.block);
        let theme: &'a Theme = self.ctx.theme;
        let spacing = &theme.spacing;
        let ctx = &mut self.ctx;

        match &item.block {
            Block::Skip { anchor: Some(name) } => {
                ctx.surface.add_anchor(name);
                self.summary.anchors.push(name.clone());
                return;
            }
            Block::Skip { anchor: None } => {
                ctx.use_body_font();
                ctx.surface.move_down(BLANK_LINE_ADVANCE);
                return;
            }
            Block::Heading { level, text } => {
                let spacing = theme.heading_spacing(*level);
                blocks::render_heading(ctx, *level, text, x, width, spacing);
            }
            Block::BulletItem { text, .. } => blocks::render_bullet_item(ctx, text, x, width),
            Block::NumberedItem { ordinal, text, .. } => {
                blocks::render_numbered_item(ctx, *ordinal, text, x, width)
            }
            Block::TocItem { prefix, text, .. } => blocks::render_toc_item(ctx, prefix, text, x, width),
            Block::Blockquote(text) => {
                blocks::render_blockquote(ctx, text, x, width, spacing.blockquote)
            }
            Block::CodeBlock { lines, .. } => {
                blocks::render_code_block(ctx, lines, x, width, spacing.code_block)
            }
            Block::HorizontalRule => blocks::render_horizontal_rule(ctx, x, width, RULE_ADVANCE),
            Block::Paragraph(text) => blocks::render_paragraph(ctx, text, x, width, spacing.paragraph),
        }
        self.summary.blocks_rendered += 1;
    }

    /// Close whatever chain a renderer left open and put x back on the left
    /// margin.
    fn realign(&mut self) {
        let surface = &mut *self.ctx.surface;
        surface.text("", None, None, &TextOptions::default());
        let left = surface.geometry().margins.left;
        surface.set_x(left);
    }
}

/// What gets drawn on every content page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDecorations {
    pub footer: bool,
    pub header: Option<String>,
    pub debug: DebugOptions,
}

impl Default for PageDecorations {
    fn default() -> Self {
        Self {
            footer: true,
            header: None,
            debug: DebugOptions::default(),
        }
    }
}

/// Page listener numbering content pages and drawing the footer, the
/// running header and the diagnostics overlay.
pub struct PageDecorator {
    theme: Theme,
    decorations: PageDecorations,
    page_number: usize,
}

impl PageDecorator {
    pub fn new(theme: Theme, decorations: PageDecorations) -> Self {
        Self {
            theme,
            decorations,
            page_number: 0,
        }
    }

    fn draw_centered(&self, surface: &mut dyn DrawingSurface, content: &str, y: f32) {
        let geometry = surface.geometry();
        surface.text(
            content,
            Some(geometry.margins.left),
            Some(y),
            &TextOptions::new()
                .with_font(&self.theme.fonts.body)
                .with_size(self.theme.font_size.footer)
                .with_color(Color::from_theme(&self.theme.colors.footer))
                .with_width(geometry.content_width())
                .with_align(Align::Center)
                .with_line_break(false),
        );
    }
}

impl PageListener for PageDecorator {
    fn page_added(&mut self, surface: &mut dyn DrawingSurface) {
        self.page_number += 1;
        debug::log_page_break(&self.decorations.debug, self.page_number);

        if self.decorations.debug.draws_overlay() {
            debug::draw_overlay(surface, &self.decorations.debug);
        }

        let geometry = surface.geometry();
        let line_height = self.theme.font_size.footer * LINE_HEIGHT_RATIO;

        if let Some(header) = self.decorations.header.clone() {
            let y = ((geometry.margins.top - line_height) / 2.0).max(0.0);
            self.draw_centered(surface, &header, y);
        }

        if self.decorations.footer {
            let y = geometry.bottom_limit() + ((geometry.margins.bottom - line_height) / 2.0).max(0.0);
            self.draw_centered(surface, &format!("Page {}", self.page_number), y);
        }
    }
}

/// Subscribe the decorator and decorate the page already under the cursor.
pub fn install_page_decorator(
    surface: &mut dyn DrawingSurface,
    theme: &Theme,
    decorations: PageDecorations,
) {
    surface.set_page_listener(Some(Box::new(PageDecorator::new(theme.clone(), decorations))));
    surface.decorate_current_page();
}
