//! One standalone SVG document per page.

use std::fmt::Write;

use crate::fonts::FontDescriptor;
use crate::surface::{DrawOp, Page, RenderedDocument};

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|c| is_valid_xml_char(*c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn font_attrs(font: &str) -> String {
    let descriptor = FontDescriptor::from_name(font);
    let mut attrs = format!(r#"font-family="{}""#, descriptor.css_family());
    if descriptor.bold {
        attrs.push_str(r#" font-weight="bold""#);
    }
    if descriptor.italic {
        attrs.push_str(r#" font-style="italic""#);
    }
    attrs
}

pub fn page_to_svg(page: &Page) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = page.width,
        h = page.height
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    for op in &page.ops {
        match op {
            DrawOp::Rect(r) => {
                let _ = write!(
                    svg,
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}""#,
                    r.x,
                    r.y,
                    r.width,
                    r.height,
                    r.color.to_hex()
                );
                if r.opacity < 1.0 {
                    let _ = write!(svg, r#" fill-opacity="{:.3}""#, r.opacity);
                }
                svg.push_str("/>\n");
            }
            DrawOp::Line(l) => {
                let _ = writeln!(
                    svg,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
                    l.x1,
                    l.y1,
                    l.x2,
                    l.y2,
                    l.color.to_hex(),
                    l.width
                );
            }
            DrawOp::Text(t) => {
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.2}" y="{:.2}" {} font-size="{:.2}" fill="{}" xml:space="preserve">{}</text>"#,
                    t.x,
                    t.baseline,
                    font_attrs(&t.font),
                    t.size,
                    t.color.to_hex(),
                    escape_xml(&t.text)
                );
            }
            DrawOp::Link(link) => {
                let _ = writeln!(
                    svg,
                    r#"<a xlink:href="{}"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="transparent"/></a>"#,
                    escape_xml(&link.target),
                    link.x,
                    link.y,
                    link.width,
                    link.height
                );
            }
        }
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn document_to_svg(document: &RenderedDocument) -> Vec<String> {
    document.pages.iter().map(page_to_svg).collect()
}
