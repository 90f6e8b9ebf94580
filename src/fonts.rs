use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};

/// Broad family classes. Font names are mapped onto one of these for
/// measurement and for the SVG `font-family` fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilyKind {
    SansSerif,
    Serif,
    Monospace,
}

/// What a font name asks for: family class, weight, slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontDescriptor {
    pub family: FamilyKind,
    pub bold: bool,
    pub italic: bool,
}

impl FontDescriptor {
    /// Classify a font name such as `Helvetica-BoldOblique`, `Times-Italic`
    /// or `Courier`. Unknown names are treated as sans-serif.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let family = if lower.contains("courier") || lower.contains("mono") || lower.contains("code")
        {
            FamilyKind::Monospace
        } else if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            FamilyKind::Serif
        } else {
            FamilyKind::SansSerif
        };

        Self {
            family,
            bold: lower.contains("bold"),
            italic: lower.contains("italic") || lower.contains("oblique"),
        }
    }

    /// The standard-14 PDF font closest to this descriptor.
    pub fn standard_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (FamilyKind::SansSerif, false, false) => "Helvetica",
            (FamilyKind::SansSerif, true, false) => "Helvetica-Bold",
            (FamilyKind::SansSerif, false, true) => "Helvetica-Oblique",
            (FamilyKind::SansSerif, true, true) => "Helvetica-BoldOblique",
            (FamilyKind::Serif, false, false) => "Times-Roman",
            (FamilyKind::Serif, true, false) => "Times-Bold",
            (FamilyKind::Serif, false, true) => "Times-Italic",
            (FamilyKind::Serif, true, true) => "Times-BoldItalic",
            (FamilyKind::Monospace, false, false) => "Courier",
            (FamilyKind::Monospace, true, false) => "Courier-Bold",
            (FamilyKind::Monospace, false, true) => "Courier-Oblique",
            (FamilyKind::Monospace, true, true) => "Courier-BoldOblique",
        }
    }

    pub fn css_family(&self) -> &'static str {
        match self.family {
            FamilyKind::SansSerif => "sans-serif",
            FamilyKind::Serif => "serif",
            FamilyKind::Monospace => "monospace",
        }
    }
}

/// Map any font name onto a standard-14 PDF base font name.
pub fn standard_font_name(name: &str) -> &'static str {
    FontDescriptor::from_name(name).standard_name()
}

pub trait TextMeasure {
    /// Advance width of `text` set in `font` at `font_size`, in points.
    fn text_width(&mut self, text: &str, font: &str, font_size: f32) -> f32;

    /// Distance from the top of a line to its baseline.
    fn ascent(&mut self, font: &str, font_size: f32) -> f32 {
        let _ = font;
        font_size * 0.75
    }
}

impl<T: TextMeasure + ?Sized> TextMeasure for Box<T> {
    fn text_width(&mut self, text: &str, font: &str, font_size: f32) -> f32 {
        (**self).text_width(text, font, font_size)
    }

    fn ascent(&mut self, font: &str, font_size: f32) -> f32 {
        (**self).ascent(font, font_size)
    }
}

// AFM advance widths for printable ASCII (0x20..=0x7E), 1/1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;
const FALLBACK_WIDTH: u16 = 556;

/// Deterministic metrics for the standard-14 fonts the PDF backend emits.
///
/// Helvetica and Helvetica-Bold use their AFM tables (oblique faces share
/// the upright widths), Courier is fixed pitch. Times faces are measured
/// with the Helvetica tables, which runs slightly wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetrics;

impl StandardMetrics {
    pub fn new() -> Self {
        Self
    }

    fn char_units(descriptor: &FontDescriptor, ch: char) -> u16 {
        if descriptor.family == FamilyKind::Monospace {
            return COURIER_WIDTH;
        }

        let table = if descriptor.bold {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };

        match ch {
            ' '..='~' => table[(ch as usize) - 0x20],
            '\t' => table[0] * 4,
            '\u{a0}' => table[0],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' | '\u{2026}' => 1000,
            '\u{2018}' | '\u{2019}' => {
                if descriptor.bold {
                    278
                } else {
                    222
                }
            }
            '\u{201c}' | '\u{201d}' => {
                if descriptor.bold {
                    500
                } else {
                    333
                }
            }
            _ => FALLBACK_WIDTH,
        }
    }
}

impl TextMeasure for StandardMetrics {
    fn text_width(&mut self, text: &str, font: &str, font_size: f32) -> f32 {
        let descriptor = FontDescriptor::from_name(font);
        let units: u32 = text
            .chars()
            .map(|ch| u32::from(Self::char_units(&descriptor, ch)))
            .sum();
        units as f32 * font_size / 1000.0
    }

    fn ascent(&mut self, font: &str, font_size: f32) -> f32 {
        let units = match FontDescriptor::from_name(font).family {
            FamilyKind::SansSerif => 718.0,
            FamilyKind::Serif => 683.0,
            FamilyKind::Monospace => 629.0,
        };
        units * font_size / 1000.0
    }
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    descriptor: FontDescriptor,
    font_size_bits: u32,
}

/// Measures with cosmic-text against the system font database. Used when
/// pages are rendered to SVG/PNG, where text is drawn with system fonts.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, f32>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn text_width(&mut self, text: &str, font: &str, font_size: f32) -> f32 {
        let descriptor = FontDescriptor::from_name(font);
        let key = MeasureKey {
            text: text.to_string(),
            descriptor,
            font_size_bits: font_size.to_bits(),
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );

        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new()
            .family(match descriptor.family {
                FamilyKind::SansSerif => Family::SansSerif,
                FamilyKind::Serif => Family::Serif,
                FamilyKind::Monospace => Family::Monospace,
            })
            .weight(if descriptor.bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            })
            .style(if descriptor.italic {
                Style::Italic
            } else {
                Style::Normal
            });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);

        self.cache.insert(key, width);
        width
    }
}
