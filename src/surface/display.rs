use super::{Color, DocumentInfo};

/// A run of text already placed on the page. `y` is the top of its line,
/// `baseline` where the glyphs sit.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub baseline: f32,
    pub width: f32,
    pub text: String,
    pub font: String,
    pub size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilledRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
    pub opacity: f32,
}

/// Clickable area. Targets starting with `#` name an anchor in the same
/// document; anything else is a URI.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text(TextRun),
    Line(LineSegment),
    Rect(FilledRect),
    Link(LinkArea),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedAnchor {
    pub name: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
    pub anchors: Vec<NamedAnchor>,
}

impl Page {
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            ops: Vec::new(),
            anchors: Vec::new(),
        }
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(run) => Some(run),
            _ => None,
        })
    }

    /// Visible text grouped into lines, top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let mut rows: Vec<(f32, Vec<&TextRun>)> = Vec::new();
        for run in self.text_runs() {
            match rows.iter_mut().find(|(y, _)| (*y - run.y).abs() < 0.01) {
                Some((_, row)) => row.push(run),
                None => rows.push((run.y, vec![run])),
            }
        }
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        rows.into_iter()
            .map(|(_, mut row)| {
                row.sort_by(|a, b| a.x.total_cmp(&b.x));
                row.iter().map(|r| r.text.as_str()).collect::<String>()
            })
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Everything a finished surface produced, ready for serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub pages: Vec<Page>,
    pub info: DocumentInfo,
}

impl RenderedDocument {
    /// Page index and position of a named anchor.
    pub fn find_anchor(&self, name: &str) -> Option<(usize, &NamedAnchor)> {
        self.pages.iter().find_map(|page| {
            page.anchors
                .iter()
                .find(|a| a.name == name)
                .map(|a| (page.index, a))
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
