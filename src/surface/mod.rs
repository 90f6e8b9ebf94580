//! The drawing surface the layout engine writes into.
//!
//! [`DrawingSurface`] is the capability every renderer is written against: a
//! cursor, persistent font/size/color state, flowed text with continued
//! chains, simple paths, and page management. [`PageSurface`] implements it
//! on top of a [`TextMeasure`](crate::fonts::TextMeasure) and records a
//! per-page display list that the `output` serializers turn into PDF or SVG.

mod display;
mod page_surface;
mod wrap;

pub use display::{DrawOp, FilledRect, LineSegment, LinkArea, NamedAnchor, Page, RenderedDocument, TextRun};
pub use page_surface::PageSurface;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Line height as a multiple of font size, before the line gap is added.
pub const LINE_HEIGHT_RATIO: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `#rgb`, or one of a few CSS names.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "black" => return Some(Self::BLACK),
            "white" => return Some(Self::WHITE),
            "gray" | "grey" => return Some(Self::rgb(128, 128, 128)),
            "red" => return Some(Self::rgb(255, 0, 0)),
            "blue" => return Some(Self::rgb(0, 0, 255)),
            _ => {}
        }

        let hex = value.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(Self::rgb(
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            )),
            3 => {
                let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|d| d * 17);
                Some(Self::rgb(digit(0).ok()?, digit(1).ok()?, digit(2).ok()?))
            }
            _ => None,
        }
    }

    /// Parse a theme color, falling back to black.
    pub fn from_theme(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            log::warn!("Unparsable color '{}', using black", value);
            Self::BLACK
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Components scaled to 0.0..=1.0, as PDF color operators expect.
    pub fn to_unit_rgb(&self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// Page size presets, in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    pub fn dimensions(&self) -> (f32, f32) {
        match *self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

/// Page dimensions and margins. Identical for every page of a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn new(size: PageSize, margins: Margins) -> Self {
        let (width, height) = size.dimensions();
        Self {
            width,
            height,
            margins,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margins.left - self.margins.right).max(0.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - self.margins.top - self.margins.bottom).max(0.0)
    }

    /// Lowest y a flowed line may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margins.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Options for [`DrawingSurface::text`]. `font`, `size` and `color`, when
/// set, persist on the surface after the call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub continued: bool,
    pub width: Option<f32>,
    pub align: Align,
    pub line_break: bool,
    pub font: Option<String>,
    pub size: Option<f32>,
    pub color: Option<Color>,
    pub link: Option<String>,
    pub underline: bool,
    pub background: Option<Color>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            continued: false,
            width: None,
            align: Align::Left,
            line_break: true,
            font: None,
            size: None,
            color: None,
            link: None,
            underline: false,
            background: None,
        }
    }
}

impl TextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continued(mut self, continued: bool) -> Self {
        self.continued = continued;
        self
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_line_break(mut self, line_break: bool) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_link(mut self, target: impl Into<String>) -> Self {
        self.link = Some(target.into());
        self
    }

    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

/// Document-level fields written to the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<DateTime<Local>>,
}

/// Notified whenever a page begins. The surface saves its cursor, font and
/// color before calling and restores them afterwards, so whatever the
/// listener draws is invisible to the surrounding flow.
pub trait PageListener {
    fn page_added(&mut self, surface: &mut dyn DrawingSurface);
}

/// The drawing capability renderers are written against.
///
/// Coordinates are in points from the top-left corner of the page. `y` is
/// the top of the current line.
pub trait DrawingSurface {
    fn geometry(&self) -> PageGeometry;

    fn x(&self) -> f32;
    fn y(&self) -> f32;
    fn set_x(&mut self, x: f32);
    fn set_y(&mut self, y: f32);

    fn font(&self) -> &str;
    fn font_size(&self) -> f32;
    fn fill_color(&self) -> Color;
    fn line_gap(&self) -> f32;
    fn set_font(&mut self, name: &str);
    fn set_font_size(&mut self, size: f32);
    fn set_fill_color(&mut self, color: Color);
    fn set_line_gap(&mut self, gap: f32);

    /// Flow `content` onto the page. Omitting `x`/`y` continues from the
    /// current flow position. With `continued`, the line stays open for the
    /// next call; a non-continued call (including an empty one) closes it.
    fn text(&mut self, content: &str, x: Option<f32>, y: Option<f32>, options: &TextOptions);

    /// Height `content` would occupy if drawn now with `options`.
    fn text_height(&mut self, content: &str, options: &TextOptions) -> f32;

    fn string_width(&mut self, text: &str, font: &str, size: f32) -> f32;

    /// Height of one line at the current font size, including the line gap.
    fn current_line_height(&self) -> f32;

    /// Advance the cursor by `lines` current line heights.
    fn move_down(&mut self, lines: f32);

    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn stroke(&mut self, color: Color, width: f32);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color, opacity: f32);

    fn add_page(&mut self);
    fn page_count(&self) -> usize;

    /// Subscribe to page starts, replacing any previous listener.
    fn set_page_listener(&mut self, listener: Option<Box<dyn PageListener>>);

    /// Run the page listener for the page already under the cursor.
    fn decorate_current_page(&mut self);

    /// Whether a continued text chain is open.
    fn chain_open(&self) -> bool;

    /// Register a named link target at the current cursor.
    fn add_anchor(&mut self, name: &str);

    fn set_document_info(&mut self, info: DocumentInfo);

    /// Vertical space left above the bottom margin.
    fn space_remaining(&self) -> f32 {
        self.geometry().bottom_limit() - self.y()
    }
}
