//! Document assembly: metadata, the cover page, and the entry points that
//! drive a whole render.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::debug::DebugOptions;
use crate::error::{Error, Result};
use crate::flow::{self, FlowController, PageDecorations};
use crate::fonts::{StandardMetrics, TextMeasure};
use crate::output;
use crate::surface::{
    Align, Color, DocumentInfo, DrawingSurface, PageGeometry, PageSize, PageSurface,
    RenderedDocument, TextOptions,
};
use crate::theme::Theme;

pub const DEFAULT_SUBJECT: &str = "Markdown Document";
const UNTITLED: &str = "Untitled";
const COVER_TITLE_SCALE: f32 = 1.5;
const DATE_DISPLAY_FORMAT: &str = "%B %-d, %Y";
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
}

impl MetaValue {
    /// Text reads as its comma-separated parts.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            MetaValue::Text(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            MetaValue::List(items) => items.clone(),
        }
    }
}

/// Document metadata as read from front matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, MetaValue::Text(value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            MetaValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.text("author")
    }

    pub fn date(&self) -> Option<&str> {
        self.text("date")
    }

    pub fn subject(&self) -> Option<&str> {
        self.text("subject").or_else(|| self.text("description"))
    }

    /// `keywords`, falling back to `tags`.
    pub fn keywords(&self) -> Vec<String> {
        self.0
            .get("keywords")
            .or_else(|| self.0.get("tags"))
            .map(MetaValue::as_list)
            .unwrap_or_default()
    }
}

/// Parse a metadata date. Accepts RFC 3339 and a few common day formats.
pub fn parse_date(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }
    DATE_FORMATS.iter().find_map(|format| {
        let date = NaiveDate::parse_from_str(value, format).ok()?;
        Local.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest()
    })
}

/// The document date: the metadata date when it parses, otherwise now.
pub fn resolve_date(metadata: &Metadata) -> DateTime<Local> {
    match metadata.date() {
        Some(raw) => parse_date(raw).unwrap_or_else(|| {
            log::warn!("Unrecognised date '{}', using the current date", raw);
            Local::now()
        }),
        None => Local::now(),
    }
}

pub fn format_date(date: &DateTime<Local>) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

/// Document info fields derived from metadata.
pub fn document_info(metadata: &Metadata) -> DocumentInfo {
    let keywords = metadata.keywords();
    DocumentInfo {
        title: metadata.title().map(str::to_string),
        author: metadata.author().map(str::to_string),
        subject: Some(metadata.subject().unwrap_or(DEFAULT_SUBJECT).to_string()),
        keywords: (!keywords.is_empty()).then(|| keywords.join(", ")),
        creation_date: Some(resolve_date(metadata)),
    }
}

fn draw_centered_line(
    surface: &mut dyn DrawingSurface,
    content: &str,
    font: &str,
    size: f32,
    color: Color,
) {
    let geometry = surface.geometry();
    let left = geometry.margins.left;
    let available = geometry.content_width();

    surface.set_font(font);
    surface.set_font_size(size);
    surface.set_fill_color(color);

    let measured = surface.string_width(content, font, size);
    if measured <= available {
        let x = left + (available - measured) / 2.0;
        surface.text(content, Some(x), None, &TextOptions::new().with_width(measured + 1.0));
    } else {
        surface.text(
            content,
            Some(left),
            None,
            &TextOptions::new().with_width(available).with_align(Align::Center),
        );
    }
}

/// Draw the cover page: title, author and date centred on the page, then
/// start the first content page with a clean flow state.
pub fn render_cover_page(surface: &mut dyn DrawingSurface, metadata: &Metadata, theme: &Theme) {
    let info = document_info(metadata);
    let date = info.creation_date.unwrap_or_else(Local::now);
    surface.set_document_info(info);

    let geometry = surface.geometry();
    surface.set_y(geometry.margins.top + geometry.content_height() / 3.0);

    let heading = Color::from_theme(&theme.colors.heading);
    let muted = Color::from_theme(&theme.colors.blockquote);

    draw_centered_line(
        surface,
        metadata.title().unwrap_or(UNTITLED),
        &theme.fonts.heading,
        theme.font_size.h1 * COVER_TITLE_SCALE,
        heading,
    );
    surface.move_down(1.0);

    if let Some(author) = metadata.author() {
        draw_centered_line(
            surface,
            &format!("By: {author}"),
            &theme.fonts.body,
            theme.font_size.h3,
            heading,
        );
        surface.move_down(0.5);
    }

    draw_centered_line(surface, &format_date(&date), &theme.fonts.body, theme.font_size.body, muted);

    surface.add_page();
    surface.text("", None, None, &TextOptions::new().with_align(Align::Left));
    surface.set_x(geometry.margins.left);
    surface.set_font(&theme.fonts.body);
    surface.set_font_size(theme.font_size.body);
    surface.set_fill_color(Color::from_theme(&theme.colors.text));
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub page_size: PageSize,
    /// Draw a cover page when the metadata has a title.
    pub cover: bool,
    pub header: Option<String>,
    pub footer: bool,
    pub debug: DebugOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            cover: true,
            header: None,
            footer: true,
            debug: DebugOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderSummary {
    pub pages: usize,
    pub content_pages: usize,
    pub blocks_rendered: usize,
    pub anchors: Vec<String>,
    pub cover: bool,
}

/// Lay out `markdown` on `surface`, starting on the page under the cursor.
///
/// Fails with [`Error::InvalidInput`] before drawing anything when there is
/// no Markdown to render.
pub fn render_markdown_document(
    surface: &mut dyn DrawingSurface,
    markdown: &str,
    theme: &Theme,
    metadata: &Metadata,
    options: &RenderOptions,
) -> Result<RenderSummary> {
    if markdown.trim().is_empty() {
        return Err(Error::InvalidInput("markdown document is empty".to_string()));
    }

    surface.set_document_info(document_info(metadata));
    let first_page = surface.page_count();

    flow::install_page_decorator(
        surface,
        theme,
        PageDecorations {
            footer: options.footer,
            header: options.header.clone(),
            debug: options.debug.clone(),
        },
    );

    let left = surface.geometry().margins.left;
    surface.set_x(left);
    let flow = FlowController::new(&mut *surface, theme, options.debug.clone()).run(markdown);
    surface.set_page_listener(None);

    let pages = surface.page_count();
    log::info!(
        "Rendered {} blocks on {} content page(s)",
        flow.blocks_rendered,
        pages - first_page + 1
    );

    Ok(RenderSummary {
        pages,
        content_pages: pages - first_page + 1,
        blocks_rendered: flow.blocks_rendered,
        anchors: flow.anchors,
        cover: false,
    })
}

/// Cover page (when enabled and titled) followed by the document body.
pub fn render_document(
    surface: &mut dyn DrawingSurface,
    markdown: &str,
    theme: &Theme,
    metadata: &Metadata,
    options: &RenderOptions,
) -> Result<RenderSummary> {
    if markdown.trim().is_empty() {
        return Err(Error::InvalidInput("markdown document is empty".to_string()));
    }

    let cover = options.cover && metadata.title().is_some();
    if cover {
        render_cover_page(surface, metadata, theme);
    }
    let mut summary = render_markdown_document(surface, markdown, theme, metadata, options)?;
    summary.cover = cover;
    Ok(summary)
}

/// Lay out a document on a fresh [`PageSurface`] and hand back its pages.
pub fn layout<M: TextMeasure>(
    markdown: &str,
    metadata: &Metadata,
    theme: &Theme,
    options: &RenderOptions,
    measure: M,
) -> Result<(RenderedDocument, RenderSummary)> {
    let geometry = PageGeometry::new(options.page_size, theme.margins);
    if geometry.content_width() <= 0.0 || geometry.content_height() <= 0.0 {
        return Err(Error::InvalidInput(
            "page margins leave no room for content".to_string(),
        ));
    }
    let mut surface = PageSurface::new(geometry, measure);
    let summary = render_document(&mut surface, markdown, theme, metadata, options)?;
    Ok((surface.finish(), summary))
}

/// Render straight to PDF bytes using the standard-14 font metrics.
pub fn render_pdf(
    markdown: &str,
    metadata: &Metadata,
    theme: &Theme,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let (document, _) = layout(markdown, metadata, theme, options, StandardMetrics::new())?;
    output::pdf::write_pdf(&document)
}

/// Render to one SVG document per page.
pub fn render_svg_pages<M: TextMeasure>(
    markdown: &str,
    metadata: &Metadata,
    theme: &Theme,
    options: &RenderOptions,
    measure: M,
) -> Result<Vec<String>> {
    let (document, _) = layout(markdown, metadata, theme, options, measure)?;
    Ok(output::svg::document_to_svg(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use crate::surface::Margins;

    fn surface() -> PageSurface<StandardMetrics> {
        PageSurface::new(
            PageGeometry::new(PageSize::A4, Margins::uniform(72.0)),
            StandardMetrics::new(),
        )
    }

    #[test]
    fn parses_supported_date_formats() {
        let d = parse_date("2024-03-05").expect("iso day");
        assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 5));
        assert!(parse_date("2024/03/05").is_some());
        assert!(parse_date("March 5, 2024").is_some());
        assert!(parse_date("2024-03-05T10:00:00Z").is_some());
        assert!(parse_date("not-a-date").is_none());
    }

    #[test]
    fn bad_date_falls_back_to_today() {
        let meta = Metadata::new().with("date", "not-a-date");
        let resolved = resolve_date(&meta);
        assert_eq!(resolved.date_naive(), Local::now().date_naive());
    }

    #[test]
    fn info_defaults_subject_and_joins_keywords() {
        let mut meta = Metadata::new().with("title", "Guide");
        meta.insert("keywords", MetaValue::List(vec!["a".into(), "b".into()]));
        let info = document_info(&meta);
        assert_eq!(info.title.as_deref(), Some("Guide"));
        assert_eq!(info.subject.as_deref(), Some(DEFAULT_SUBJECT));
        assert_eq!(info.keywords.as_deref(), Some("a, b"));
        assert!(info.creation_date.is_some());
    }

    #[test]
    fn cover_page_centres_title_and_shows_date() {
        let theme = Theme::default();
        let mut s = surface();
        let meta = Metadata::new()
            .with("title", "Annual Report")
            .with("author", "Dana")
            .with("date", "not-a-date");
        render_cover_page(&mut s, &meta, &theme);

        assert_eq!(s.page_count(), 2);
        let cover = &s.pages()[0];
        let today = format_date(&Local::now());
        assert_eq!(cover.lines(), vec!["Annual Report".to_string(), "By: Dana".into(), today]);

        let title = cover.text_runs().next().expect("title");
        let centre = title.x + title.width / 2.0;
        assert!((centre - 595.28 / 2.0).abs() < 0.5, "centre at {centre}");
        assert_eq!(title.size, 36.0);

        assert_eq!((s.x(), s.y()), (72.0, 72.0));
        assert!(!s.chain_open());
        assert_eq!(s.font(), "Helvetica");
    }

    #[test]
    fn empty_markdown_is_rejected_before_drawing() {
        let theme = Theme::default();
        let mut s = surface();
        let err = render_markdown_document(&mut s, "  \n", &theme, &Metadata::new(), &RenderOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(s.current_page().is_blank());
    }

    #[test]
    fn cover_page_is_not_numbered() {
        let theme = Theme::default();
        let meta = Metadata::new().with("title", "T");
        let (doc, summary) = layout(
            "# Intro\n\nHello.",
            &meta,
            &theme,
            &RenderOptions::default(),
            StandardMetrics::new(),
        )
        .expect("layout");

        assert!(summary.cover);
        assert_eq!(summary.content_pages, 1);
        assert_eq!(doc.page_count(), 2);
        assert!(!doc.pages[0].lines().iter().any(|l| l.starts_with("Page ")));
        assert_eq!(doc.pages[1].lines().last().map(String::as_str), Some("Page 1"));
        assert_eq!(doc.info.title.as_deref(), Some("T"));
    }

    #[test]
    fn untitled_documents_skip_the_cover() {
        let (doc, summary) = layout(
            "Body",
            &Metadata::new(),
            &Theme::default(),
            &RenderOptions::default(),
            StandardMetrics::new(),
        )
        .expect("layout");
        assert!(!summary.cover);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.pages[0].lines()[0], "Body");
    }

    #[test]
    fn metadata_deserializes_text_and_lists() {
        let meta: Metadata = serde_json::from_str(r#"{"title":"T","tags":["x","y"]}"#).expect("json");
        assert_eq!(meta.title(), Some("T"));
        assert_eq!(meta.keywords(), vec!["x", "y"]);
    }
}
