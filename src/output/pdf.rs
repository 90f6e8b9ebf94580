//! PDF serialization of a [`RenderedDocument`] with pdf-writer.
//!
//! Text is set in the standard-14 Type1 fonts with WinAnsiEncoding, so
//! nothing is embedded. Page coordinates are flipped from the top-left
//! origin the surface uses to PDF's bottom-left origin.

use std::collections::BTreeMap;

use chrono::{Datelike, Offset, Timelike};
use pdf_writer::types::{ActionType, AnnotationType};
use pdf_writer::{Content, Date, Finish, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Result;
use crate::fonts::standard_font_name;
use crate::surface::{Color, DocumentInfo, DrawOp, Page, RenderedDocument};

const PRODUCER: &str = concat!("folio ", env!("CARGO_PKG_VERSION"));
const UNMAPPED: u8 = b'?';

/// Map a character onto its WinAnsiEncoding byte.
fn winansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7e | 0xa0..=0xff => Some(code as u8),
        _ => Some(match c {
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02c6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8a,
            '\u{2039}' => 0x8b,
            '\u{0152}' => 0x8c,
            '\u{017d}' => 0x8e,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02dc}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9a,
            '\u{203a}' => 0x9b,
            '\u{0153}' => 0x9c,
            '\u{017e}' => 0x9e,
            '\u{0178}' => 0x9f,
            '\t' => b' ',
            _ => return None,
        }),
    }
}

/// Encode text for a WinAnsi font. Returns the bytes and how many
/// characters had no mapping.
pub fn to_winansi(text: &str) -> (Vec<u8>, usize) {
    let mut unmapped = 0;
    let bytes = text
        .chars()
        .map(|c| {
            winansi_byte(c).unwrap_or_else(|| {
                unmapped += 1;
                UNMAPPED
            })
        })
        .collect();
    (bytes, unmapped)
}

fn pdf_date(info: &DocumentInfo) -> Option<Date> {
    let dt = info.creation_date?;
    let offset_minutes = dt.offset().fix().local_minus_utc() / 60;
    Some(
        Date::new(dt.year().clamp(0, 9999) as u16)
            .month(dt.month() as u8)
            .day(dt.day() as u8)
            .hour(dt.hour() as u8)
            .minute(dt.minute() as u8)
            .second(dt.second() as u8)
            .utc_offset_hour((offset_minutes / 60) as i8)
            .utc_offset_minute((offset_minutes % 60).unsigned_abs() as u8),
    )
}

fn write_info(pdf: &mut Pdf, id: Ref, info: &DocumentInfo) {
    let mut dict = pdf.document_info(id);
    if let Some(title) = &info.title {
        dict.title(TextStr(title));
    }
    if let Some(author) = &info.author {
        dict.author(TextStr(author));
    }
    if let Some(subject) = &info.subject {
        dict.subject(TextStr(subject));
    }
    if let Some(keywords) = &info.keywords {
        dict.keywords(TextStr(keywords));
    }
    dict.producer(TextStr(PRODUCER));
    if let Some(date) = pdf_date(info) {
        dict.creation_date(date);
    }
    dict.finish();
}

/// Resource names shared by every page.
struct Resources {
    fonts: BTreeMap<&'static str, (String, Ref)>,
    alphas: BTreeMap<u16, (String, Ref)>,
}

impl Resources {
    fn collect(document: &RenderedDocument, alloc: &mut impl FnMut() -> Ref) -> Self {
        let mut fonts = BTreeMap::new();
        let mut alphas = BTreeMap::new();
        for op in document.pages.iter().flat_map(|p| p.ops.iter()) {
            match op {
                DrawOp::Text(run) => {
                    let base = standard_font_name(&run.font);
                    if !fonts.contains_key(base) {
                        let name = format!("F{}", fonts.len() + 1);
                        fonts.insert(base, (name, alloc()));
                    }
                }
                DrawOp::Rect(rect) if rect.opacity < 1.0 => {
                    let key = alpha_key(rect.opacity);
                    if !alphas.contains_key(&key) {
                        let name = format!("GS{}", alphas.len() + 1);
                        alphas.insert(key, (name, alloc()));
                    }
                }
                _ => {}
            }
        }
        Self { fonts, alphas }
    }

    fn font_name(&self, font: &str) -> Option<&str> {
        self.fonts
            .get(standard_font_name(font))
            .map(|(name, _)| name.as_str())
    }
}

fn alpha_key(opacity: f32) -> u16 {
    (opacity.clamp(0.0, 1.0) * 1000.0).round() as u16
}

fn set_fill(content: &mut Content, color: Color) {
    let (r, g, b) = color.to_unit_rgb();
    content.set_fill_rgb(r, g, b);
}

fn page_content(page: &Page, resources: &Resources, unmapped: &mut usize) -> Vec<u8> {
    let height = page.height;
    let mut content = Content::new();

    for op in &page.ops {
        match op {
            DrawOp::Rect(rect) => {
                content.save_state();
                if rect.opacity < 1.0 {
                    if let Some((name, _)) = resources.alphas.get(&alpha_key(rect.opacity)) {
                        content.set_parameters(Name(name.as_bytes()));
                    }
                }
                set_fill(&mut content, rect.color);
                content.rect(rect.x, height - rect.y - rect.height, rect.width, rect.height);
                content.fill_nonzero();
                content.restore_state();
            }
            DrawOp::Line(line) => {
                let (r, g, b) = line.color.to_unit_rgb();
                content.save_state();
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(line.width);
                content.move_to(line.x1, height - line.y1);
                content.line_to(line.x2, height - line.y2);
                content.stroke();
                content.restore_state();
            }
            DrawOp::Text(run) => {
                let Some(font) = resources.font_name(&run.font) else {
                    continue;
                };
                let (bytes, missing) = to_winansi(&run.text);
                *unmapped += missing;
                set_fill(&mut content, run.color);
                content
                    .begin_text()
                    .set_font(Name(font.as_bytes()), run.size)
                    .next_line(run.x, height - run.baseline)
                    .show(Str(&bytes))
                    .end_text();
            }
            DrawOp::Link(_) => {}
        }
    }

    content.finish()
}

/// Serialize a laid-out document to PDF bytes.
pub fn write_pdf(document: &RenderedDocument) -> Result<Vec<u8>> {
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();
    let resources = Resources::collect(document, &mut alloc);

    let page_ids: Vec<Ref> = document.pages.iter().map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = document.pages.iter().map(|_| alloc()).collect();

    for (base, (_, id)) in &resources.fonts {
        pdf.type1_font(*id)
            .base_font(Name(base.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }
    for (key, (_, id)) in &resources.alphas {
        pdf.ext_graphics(*id)
            .non_stroking_alpha(f32::from(*key) / 1000.0);
    }

    let mut unmapped = 0;
    let mut annotations: Vec<Vec<Ref>> = Vec::with_capacity(document.pages.len());
    for (i, page) in document.pages.iter().enumerate() {
        pdf.stream(content_ids[i], &page_content(page, &resources, &mut unmapped));

        let mut refs = Vec::new();
        for op in &page.ops {
            let DrawOp::Link(link) = op else { continue };
            let rect = Rect::new(
                link.x,
                page.height - link.y - link.height,
                link.x + link.width,
                page.height - link.y,
            );

            if let Some(name) = link.target.strip_prefix('#') {
                let Some((target_page, anchor)) = document.find_anchor(name) else {
                    log::warn!("Link to unknown anchor '#{}' left inactive", name);
                    continue;
                };
                let annot_ref = alloc();
                let mut annot = pdf.annotation(annot_ref);
                annot
                    .subtype(AnnotationType::Link)
                    .rect(rect)
                    .border(0.0, 0.0, 0.0, None);
                annot
                    .action()
                    .action_type(ActionType::GoTo)
                    .destination()
                    .page(page_ids[target_page])
                    .xyz(anchor.x, document.pages[target_page].height - anchor.y, None);
                annot.finish();
                refs.push(annot_ref);
            } else {
                let annot_ref = alloc();
                let mut annot = pdf.annotation(annot_ref);
                annot
                    .subtype(AnnotationType::Link)
                    .rect(rect)
                    .border(0.0, 0.0, 0.0, None);
                annot
                    .action()
                    .action_type(ActionType::Uri)
                    .uri(Str(link.target.as_bytes()));
                annot.finish();
                refs.push(annot_ref);
            }
        }
        annotations.push(refs);
    }

    if unmapped > 0 {
        log::warn!(
            "{} character(s) have no WinAnsi mapping and were replaced with '?'",
            unmapped
        );
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (i, page) in document.pages.iter().enumerate() {
        let mut writer = pdf.page(page_ids[i]);
        writer
            .media_box(Rect::new(0.0, 0.0, page.width, page.height))
            .parent(pages_id)
            .contents(content_ids[i]);
        if !annotations[i].is_empty() {
            writer.annotations(annotations[i].iter().copied());
        }
        {
            let mut res = writer.resources();
            {
                let mut fonts = res.fonts();
                for (name, id) in resources.fonts.values() {
                    fonts.pair(Name(name.as_bytes()), *id);
                }
            }
            if !resources.alphas.is_empty() {
                let mut states = res.ext_g_states();
                for (name, id) in resources.alphas.values() {
                    states.pair(Name(name.as_bytes()), *id);
                }
            }
        }
        writer.finish();
    }

    write_info(&mut pdf, info_id, &document.info);

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{FilledRect, LinkArea, NamedAnchor, TextRun};

    fn run(text: &str, font: &str) -> DrawOp {
        DrawOp::Text(TextRun {
            x: 72.0,
            y: 72.0,
            baseline: 80.0,
            width: 40.0,
            text: text.to_string(),
            font: font.to_string(),
            size: 11.0,
            color: Color::BLACK,
        })
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn winansi_maps_latin1_and_punctuation() {
        assert_eq!(to_winansi("caf\u{e9} \u{2022} \u{2014}"), (vec![b'c', b'a', b'f', 0xe9, b' ', 0x95, b' ', 0x97], 0));
        assert_eq!(to_winansi("\u{4e2d}x"), (vec![b'?', b'x'], 1));
    }

    #[test]
    fn writes_fonts_pages_and_info() {
        let mut first = Page::new(0, 595.0, 842.0);
        first.ops.push(run("Hello", "Helvetica"));
        first.ops.push(run("code", "Courier"));
        first.ops.push(DrawOp::Rect(FilledRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            color: Color::rgb(255, 0, 0),
            opacity: 0.5,
        }));
        let second = Page::new(1, 595.0, 842.0);
        let document = RenderedDocument {
            pages: vec![first, second],
            info: DocumentInfo {
                title: Some("Report".into()),
                subject: Some("Markdown Document".into()),
                ..Default::default()
            },
        };

        let bytes = write_pdf(&document).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, b"/BaseFont /Helvetica"));
        assert!(contains(&bytes, b"/BaseFont /Courier"));
        assert!(contains(&bytes, b"/WinAnsiEncoding"));
        assert!(contains(&bytes, b"/Count 2"));
        assert!(contains(&bytes, b"/Title (Report)"));
        assert!(contains(&bytes, b"/ca 0.5"));
    }

    #[test]
    fn internal_links_resolve_to_goto_actions() {
        let mut page = Page::new(0, 595.0, 842.0);
        page.ops.push(DrawOp::Link(LinkArea {
            x: 72.0,
            y: 72.0,
            width: 50.0,
            height: 13.0,
            target: "#usage".into(),
        }));
        page.ops.push(DrawOp::Link(LinkArea {
            x: 72.0,
            y: 90.0,
            width: 50.0,
            height: 13.0,
            target: "https://example.com".into(),
        }));
        page.anchors.push(NamedAnchor {
            name: "usage".into(),
            x: 72.0,
            y: 400.0,
        });
        let document = RenderedDocument {
            pages: vec![page],
            info: DocumentInfo::default(),
        };

        let bytes = write_pdf(&document).expect("pdf");
        assert!(contains(&bytes, b"/S /GoTo"));
        assert!(contains(&bytes, b"/S /URI"));
        assert!(contains(&bytes, b"(https://example.com)"));
    }
}
