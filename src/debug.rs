//! Layout diagnostics. Nothing here moves the cursor: overlays are drawn with
//! paths and fills only, so turning diagnostics on never changes where text
//! lands.

use log::Level;

use crate::surface::{Color, DrawingSurface};

const OVERLAY_COLOR: Color = Color::rgb(255, 0, 0);
const OVERLAY_OPACITY: f32 = 0.06;
const RULER_COLOR: Color = Color::rgb(0, 120, 255);
const RULER_WIDTH: f32 = 0.25;
/// Ruler spacings below this many points are ignored.
pub const MIN_RULER_SPACING: f32 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugOptions {
    /// Tint the content box on every page.
    pub show_margins: bool,
    /// Draw a horizontal ruler line every this many points.
    pub ruler_spacing: Option<f32>,
    /// Report each block's cursor position at debug level instead of trace.
    pub log_cursor: bool,
    /// Report page starts at info level instead of debug.
    pub log_page_breaks: bool,
}

impl DebugOptions {
    pub fn draws_overlay(&self) -> bool {
        self.show_margins || self.ruler().is_some()
    }

    /// Ruler spacing in points, if it is usable.
    fn ruler(&self) -> Option<f32> {
        self.ruler_spacing
            .filter(|s| s.is_finite() && *s >= MIN_RULER_SPACING)
    }
}

pub fn draw_overlay(surface: &mut dyn DrawingSurface, options: &DebugOptions) {
    let geometry = surface.geometry();
    let m = geometry.margins;

    if options.show_margins {
        surface.fill_rect(
            m.left,
            m.top,
            geometry.content_width(),
            geometry.content_height(),
            OVERLAY_COLOR,
            OVERLAY_OPACITY,
        );
    }

    match (options.ruler(), options.ruler_spacing) {
        (Some(spacing), _) => draw_ruler(surface, spacing),
        (None, Some(spacing)) if spacing != 0.0 => {
            log::warn!("Ignoring ruler spacing {spacing}pt; minimum is {MIN_RULER_SPACING}pt");
        }
        _ => {}
    }
}

fn draw_ruler(surface: &mut dyn DrawingSurface, spacing: f32) {
    let geometry = surface.geometry();
    let m = geometry.margins;
    let right = geometry.width - m.right;
    let mut y = m.top;
    while y <= geometry.bottom_limit() {
        surface.move_to(m.left, y);
        surface.line_to(right, y);
        y += spacing;
    }
    surface.stroke(RULER_COLOR, RULER_WIDTH);
}

pub fn log_cursor(options: &DebugOptions, surface: &dyn DrawingSurface, block: &str, line: usize) {
    let level = if options.log_cursor {
        Level::Debug
    } else {
        Level::Trace
    };
    log::log!(
        level,
        "line {line}: {block} at page {} ({:.1}, {:.1})",
        surface.page_count(),
        surface.x(),
        surface.y()
    );
}

pub fn log_page_break(options: &DebugOptions, page_number: usize) {
    let level = if options.log_page_breaks {
        Level::Info
    } else {
        Level::Debug
    };
    log::log!(level, "Content page {page_number} begins");
}
