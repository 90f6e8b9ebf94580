//! folio lays Markdown out onto fixed-size pages and serializes the result
//! as PDF, SVG or PNG.
//!
//! Layout is line-oriented: each source line is classified into a block,
//! every block is drawn through a [`surface::DrawingSurface`], and the
//! surface owns wrapping, pagination and page decoration.
//!
//! ```no_run
//! use folio::{render_pdf, Metadata, RenderOptions, Theme};
//!
//! let metadata = Metadata::new().with("title", "Notes");
//! let pdf = render_pdf("# Hello\n\nSome **bold** text.", &metadata, &Theme::default(), &RenderOptions::default())?;
//! std::fs::write("notes.pdf", pdf)?;
//! # Ok::<(), folio::Error>(())
//! ```

pub mod blocks;
pub mod classify;
pub mod debug;
pub mod document;
pub mod error;
pub mod flow;
pub mod fonts;
pub mod front_matter;
pub mod inline;
pub mod output;
pub mod surface;
pub mod theme;

pub use debug::DebugOptions;
pub use document::{
    Metadata, MetaValue, RenderOptions, RenderSummary, layout, render_cover_page, render_document,
    render_markdown_document, render_pdf, render_svg_pages,
};
pub use error::{Error, Result};
pub use fonts::{CosmicTextMeasure, StandardMetrics, TextMeasure};
pub use surface::{DrawingSurface, PageSize, PageSurface, RenderedDocument};
pub use theme::{PartialTheme, Theme, merge_theme};
