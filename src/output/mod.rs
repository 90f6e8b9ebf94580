//! Serializers turning a laid-out [`RenderedDocument`](crate::surface::RenderedDocument)
//! into bytes.

pub mod pdf;
pub mod png;
pub mod svg;

pub use pdf::write_pdf;
pub use png::svg_to_png;
pub use svg::{document_to_svg, page_to_svg};
