use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::surface::Margins;

const DEFAULT_HEADING_FONT: &str = "Helvetica-Bold";
const DEFAULT_BODY_FONT: &str = "Helvetica";
const DEFAULT_ITALIC_FONT: &str = "Helvetica-Oblique";
const DEFAULT_BOLD_FONT: &str = "Helvetica-Bold";
const DEFAULT_CODE_FONT: &str = "Courier";

const FONT_SIZE_H1: f32 = 24.0;
const FONT_SIZE_H2: f32 = 18.0;
const FONT_SIZE_H3: f32 = 14.0;
const FONT_SIZE_BODY: f32 = 11.0;
const FONT_SIZE_CODE: f32 = 9.0;
const FONT_SIZE_FOOTER: f32 = 8.0;

const COLOR_TEXT: &str = "#333333";
const COLOR_HEADING: &str = "#111111";
const COLOR_BLOCKQUOTE: &str = "#666666";
const COLOR_CODE_BACKGROUND: &str = "#f5f5f5";
const COLOR_FOOTER: &str = "#999999";
const COLOR_LINK: &str = "#0366d6";

const MARGIN: f32 = 72.0;

const SPACING_PARAGRAPH: f32 = 0.5;
const SPACING_HEADING1: f32 = 0.8;
const SPACING_HEADING2: f32 = 0.6;
const SPACING_HEADING3: f32 = 0.5;
const SPACING_LIST: f32 = 0.3;
const SPACING_LIST_WITH_URL: f32 = 0.6;
const SPACING_TOC: f32 = 0.15;
const SPACING_BLOCKQUOTE: f32 = 0.5;
const SPACING_CODE_BLOCK: f32 = 0.5;
const SPACING_LINE_GAP: f32 = 2.0;

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("academic", include_str!("../themes/academic.toml")),
    ("compact", include_str!("../themes/compact.toml")),
    ("default", include_str!("../themes/default.toml")),
];

/// Font names for each text role. Names are PDF standard font names
/// (`Helvetica-Bold`, `Times-Italic`, `Courier`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fonts {
    pub heading: String,
    pub body: String,
    pub italic: String,
    pub bold: String,
    pub code: String,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            heading: DEFAULT_HEADING_FONT.to_string(),
            body: DEFAULT_BODY_FONT.to_string(),
            italic: DEFAULT_ITALIC_FONT.to_string(),
            bold: DEFAULT_BOLD_FONT.to_string(),
            code: DEFAULT_CODE_FONT.to_string(),
        }
    }
}

/// Font sizes in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSizes {
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
    pub body: f32,
    pub code: f32,
    pub footer: f32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            h1: FONT_SIZE_H1,
            h2: FONT_SIZE_H2,
            h3: FONT_SIZE_H3,
            body: FONT_SIZE_BODY,
            code: FONT_SIZE_CODE,
            footer: FONT_SIZE_FOOTER,
        }
    }
}

/// Hex color strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colors {
    pub text: String,
    pub heading: String,
    pub blockquote: String,
    pub code_background: String,
    pub footer: String,
    pub link: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            text: COLOR_TEXT.to_string(),
            heading: COLOR_HEADING.to_string(),
            blockquote: COLOR_BLOCKQUOTE.to_string(),
            code_background: COLOR_CODE_BACKGROUND.to_string(),
            footer: COLOR_FOOTER.to_string(),
            link: COLOR_LINK.to_string(),
        }
    }
}

/// Vertical spacing left below each block kind, in line-height units.
/// `line_gap` is the exception: extra points between wrapped lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub paragraph: f32,
    pub heading1: f32,
    pub heading2: f32,
    pub heading3: f32,
    pub list: f32,
    pub list_with_url: f32,
    pub toc: f32,
    pub blockquote: f32,
    pub code_block: f32,
    pub line_gap: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            paragraph: SPACING_PARAGRAPH,
            heading1: SPACING_HEADING1,
            heading2: SPACING_HEADING2,
            heading3: SPACING_HEADING3,
            list: SPACING_LIST,
            list_with_url: SPACING_LIST_WITH_URL,
            toc: SPACING_TOC,
            blockquote: SPACING_BLOCKQUOTE,
            code_block: SPACING_CODE_BLOCK,
            line_gap: SPACING_LINE_GAP,
        }
    }
}

fn default_margins() -> Margins {
    Margins::uniform(MARGIN)
}

/// A complete theme. Renderers only ever see values of this type, which is
/// always produced by [`merge_theme`] or `Theme::default()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub fonts: Fonts,
    pub font_size: FontSizes,
    pub colors: Colors,
    pub margins: Margins,
    pub spacing: Spacing,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fonts: Fonts::default(),
            font_size: FontSizes::default(),
            colors: Colors::default(),
            margins: default_margins(),
            spacing: Spacing::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialFonts {
    pub heading: Option<String>,
    pub body: Option<String>,
    pub italic: Option<String>,
    pub bold: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialFontSizes {
    pub h1: Option<f32>,
    pub h2: Option<f32>,
    pub h3: Option<f32>,
    pub body: Option<f32>,
    pub code: Option<f32>,
    pub footer: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialColors {
    pub text: Option<String>,
    pub heading: Option<String>,
    pub blockquote: Option<String>,
    #[serde(alias = "codeBackground")]
    pub code_background: Option<String>,
    pub footer: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMargins {
    pub top: Option<f32>,
    pub bottom: Option<f32>,
    pub left: Option<f32>,
    pub right: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialSpacing {
    pub paragraph: Option<f32>,
    pub heading1: Option<f32>,
    pub heading2: Option<f32>,
    pub heading3: Option<f32>,
    pub list: Option<f32>,
    #[serde(alias = "listWithUrl")]
    pub list_with_url: Option<f32>,
    pub toc: Option<f32>,
    pub blockquote: Option<f32>,
    #[serde(alias = "codeBlock")]
    pub code_block: Option<f32>,
    #[serde(alias = "lineGap")]
    pub line_gap: Option<f32>,
}

/// A user-supplied theme override. Every leaf is optional; unknown keys are
/// ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTheme {
    #[serde(default)]
    pub fonts: PartialFonts,
    #[serde(default, alias = "fontSize")]
    pub font_size: PartialFontSizes,
    #[serde(default)]
    pub colors: PartialColors,
    #[serde(default)]
    pub margins: PartialMargins,
    #[serde(default)]
    pub spacing: PartialSpacing,
}

fn pick_string(value: &Option<String>, fallback: &str) -> String {
    value.clone().unwrap_or_else(|| fallback.to_string())
}

/// Sizes must be positive; anything else keeps the default.
fn pick_size(value: Option<f32>, fallback: f32, key: &str) -> f32 {
    match value {
        Some(size) if size.is_finite() && size > 0.0 => size,
        Some(size) => {
            log::warn!("Ignoring non-positive theme size {key} = {size}, using {fallback}");
            fallback
        }
        None => fallback,
    }
}

/// Margins and spacing must be non-negative.
fn pick_non_negative(value: Option<f32>, fallback: f32, key: &str) -> f32 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => {
            log::warn!("Ignoring negative theme value {key} = {v}, using {fallback}");
            fallback
        }
        None => fallback,
    }
}

/// Merge a partial theme over the defaults, one category at a time.
pub fn merge_theme(partial: &PartialTheme) -> Theme {
    Theme::default().merged(partial)
}

impl Theme {
    /// Overlay `partial` on this theme. Leaves the partial does not set keep
    /// this theme's values.
    pub fn merged(&self, partial: &PartialTheme) -> Theme {
        let f = &partial.fonts;
        let s = &partial.font_size;
        let c = &partial.colors;
        let m = &partial.margins;
        let sp = &partial.spacing;

        Theme {
            fonts: Fonts {
                heading: pick_string(&f.heading, &self.fonts.heading),
                body: pick_string(&f.body, &self.fonts.body),
                italic: pick_string(&f.italic, &self.fonts.italic),
                bold: pick_string(&f.bold, &self.fonts.bold),
                code: pick_string(&f.code, &self.fonts.code),
            },
            font_size: FontSizes {
                h1: pick_size(s.h1, self.font_size.h1, "font_size.h1"),
                h2: pick_size(s.h2, self.font_size.h2, "font_size.h2"),
                h3: pick_size(s.h3, self.font_size.h3, "font_size.h3"),
                body: pick_size(s.body, self.font_size.body, "font_size.body"),
                code: pick_size(s.code, self.font_size.code, "font_size.code"),
                footer: pick_size(s.footer, self.font_size.footer, "font_size.footer"),
            },
            colors: Colors {
                text: pick_string(&c.text, &self.colors.text),
                heading: pick_string(&c.heading, &self.colors.heading),
                blockquote: pick_string(&c.blockquote, &self.colors.blockquote),
                code_background: pick_string(&c.code_background, &self.colors.code_background),
                footer: pick_string(&c.footer, &self.colors.footer),
                link: pick_string(&c.link, &self.colors.link),
            },
            margins: Margins {
                top: pick_non_negative(m.top, self.margins.top, "margins.top"),
                bottom: pick_non_negative(m.bottom, self.margins.bottom, "margins.bottom"),
                left: pick_non_negative(m.left, self.margins.left, "margins.left"),
                right: pick_non_negative(m.right, self.margins.right, "margins.right"),
            },
            spacing: Spacing {
                paragraph: pick_non_negative(sp.paragraph, self.spacing.paragraph, "spacing.paragraph"),
                heading1: pick_non_negative(sp.heading1, self.spacing.heading1, "spacing.heading1"),
                heading2: pick_non_negative(sp.heading2, self.spacing.heading2, "spacing.heading2"),
                heading3: pick_non_negative(sp.heading3, self.spacing.heading3, "spacing.heading3"),
                list: pick_non_negative(sp.list, self.spacing.list, "spacing.list"),
                list_with_url: pick_non_negative(
                    sp.list_with_url,
                    self.spacing.list_with_url,
                    "spacing.list_with_url",
                ),
                toc: pick_non_negative(sp.toc, self.spacing.toc, "spacing.toc"),
                blockquote: pick_non_negative(sp.blockquote, self.spacing.blockquote, "spacing.blockquote"),
                code_block: pick_non_negative(sp.code_block, self.spacing.code_block, "spacing.code_block"),
                line_gap: pick_non_negative(sp.line_gap, self.spacing.line_gap, "spacing.line_gap"),
            },
        }
    }

    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                Error::Theme(format!(
                    "Unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ))
            })?;
        Self::from_toml_str(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let partial: PartialTheme = toml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse theme TOML: {}", e)))?;
        Ok(merge_theme(&partial))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let partial: PartialTheme = serde_yaml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse theme YAML: {}", e)))?;
        Ok(merge_theme(&partial))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let partial: PartialTheme = serde_json::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse theme JSON: {}", e)))?;
        Ok(merge_theme(&partial))
    }

    /// Load a theme file. The extension picks the format; files without a
    /// known extension are tried as TOML, then YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content).or_else(|_| Self::from_yaml_str(&content)),
        }
    }

    /// Resolve a `--theme` argument: an existing file path wins, otherwise
    /// the value names a built-in theme.
    pub fn resolve(spec: &str) -> Result<Self> {
        let path = Path::new(spec);
        if path.is_file() {
            Self::from_path(path)
        } else {
            Self::from_builtin(spec)
        }
    }

    /// Size for a heading level; levels past 3 use the h3 size.
    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.font_size.h1,
            2 => self.font_size.h2,
            _ => self.font_size.h3,
        }
    }

    /// Trailing spacing for a heading level.
    pub fn heading_spacing(&self, level: u8) -> f32 {
        match level {
            1 => self.spacing.heading1,
            2 => self.spacing.heading2,
            _ => self.spacing.heading3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_builtin_ignores_case_and_surrounding_whitespace() {
        let lower = Theme::from_builtin("academic").expect("lowercase name");
        let mixed = Theme::from_builtin(" Academic ").expect("mixed case name");
        let upper = Theme::from_builtin("COMPACT").expect("uppercase name");

        assert_eq!(lower, mixed);
        assert_eq!(lower.fonts.body, "Times-Roman");
        assert_eq!(upper, Theme::from_builtin("compact").expect("compact"));
        assert!(Theme::from_builtin("acad emic").is_err());
    }

    #[test]
    fn unknown_builtin_lists_available_themes() {
        let err = Theme::from_builtin("neon").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("neon"));
        assert!(message.contains("default"));
    }

    #[test]
    fn every_builtin_parses() {
        for name in Theme::list_builtins() {
            Theme::from_builtin(name).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn merge_keeps_unset_leaves_per_category() {
        let partial = PartialTheme {
            fonts: PartialFonts {
                body: Some("Times-Roman".to_string()),
                ..Default::default()
            },
            spacing: PartialSpacing {
                list: Some(0.9),
                ..Default::default()
            },
            ..Default::default()
        };

        let theme = merge_theme(&partial);
        let defaults = Theme::default();

        assert_eq!(theme.fonts.body, "Times-Roman");
        assert_eq!(theme.fonts.heading, defaults.fonts.heading);
        assert_eq!(theme.fonts.code, defaults.fonts.code);
        assert_eq!(theme.spacing.list, 0.9);
        assert_eq!(theme.spacing.paragraph, defaults.spacing.paragraph);
        assert_eq!(theme.colors, defaults.colors);
        assert_eq!(theme.margins, defaults.margins);
    }

    #[test]
    fn empty_partial_yields_defaults() {
        assert_eq!(merge_theme(&PartialTheme::default()), Theme::default());
    }

    #[test]
    fn json_accepts_camel_case_keys_and_ignores_unknown_ones() {
        let theme = Theme::from_json_str(
            r##"{
                "fontSize": { "body": 12 },
                "colors": { "codeBackground": "#eeeeee" },
                "spacing": { "listWithUrl": 1.0, "lineGap": 4 },
                "watermark": { "text": "draft" }
            }"##,
        )
        .expect("json theme");

        assert_eq!(theme.font_size.body, 12.0);
        assert_eq!(theme.font_size.h1, Theme::default().font_size.h1);
        assert_eq!(theme.colors.code_background, "#eeeeee");
        assert_eq!(theme.spacing.list_with_url, 1.0);
        assert_eq!(theme.spacing.line_gap, 4.0);
    }

    #[test]
    fn yaml_partial_merges() {
        let theme = Theme::from_yaml_str("margins:\n  left: 36\n  right: 36\n").expect("yaml");
        assert_eq!(theme.margins.left, 36.0);
        assert_eq!(theme.margins.top, 72.0);
    }

    #[test]
    fn non_positive_sizes_fall_back_to_defaults() {
        let theme = Theme::from_toml_str("[font_size]\nbody = 0\nh1 = -3\n").expect("toml");
        assert_eq!(theme.font_size.body, FONT_SIZE_BODY);
        assert_eq!(theme.font_size.h1, FONT_SIZE_H1);
    }

    #[test]
    fn heading_helpers_clamp_deep_levels_to_h3() {
        let theme = Theme::default();
        assert_eq!(theme.heading_size(1), theme.font_size.h1);
        assert_eq!(theme.heading_size(5), theme.font_size.h3);
        assert_eq!(theme.heading_spacing(2), theme.spacing.heading2);
    }
}
