//! Word wrapping for flowed text.
//!
//! Wrapping is computed per `text` call against the offset the open line
//! already has, so a continued chain wraps as one paragraph no matter how
//! many calls it took to build.

use crate::fonts::TextMeasure;

const EPSILON: f32 = 0.01;
const TAB_STOP: &str = "    ";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Text { text: String, width: f32 },
    /// End of the current line, from a wrap or a newline in the source.
    LineBreak,
}

/// Where the open line stands.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct WrapState {
    pub offset: f32,
    /// The open line was started by a wrap; leading whitespace is dropped.
    pub soft_line_start: bool,
}

/// Split `text` into alternating runs of whitespace and non-whitespace.
fn runs(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let ws = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != ws)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some(run)
    })
}

pub(crate) fn wrap<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &str,
    size: f32,
    width: f32,
    content: &str,
    state: &mut WrapState,
) -> Vec<Piece> {
    let mut out = Vec::new();
    let content = content.replace('\t', TAB_STOP);

    for (i, hard_line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push(Piece::LineBreak);
            state.offset = 0.0;
            state.soft_line_start = false;
        }

        for run in runs(hard_line) {
            let is_space = run.starts_with(char::is_whitespace);
            let run_width = measure.text_width(run, font, size);

            if is_space {
                if state.offset == 0.0 && state.soft_line_start {
                    continue;
                }
                out.push(Piece::Text {
                    text: run.to_string(),
                    width: run_width,
                });
                state.offset += run_width;
                continue;
            }

            if state.offset > 0.0 && state.offset + run_width > width + EPSILON {
                out.push(Piece::LineBreak);
                state.offset = 0.0;
                state.soft_line_start = true;
            }

            if run_width <= width + EPSILON {
                out.push(Piece::Text {
                    text: run.to_string(),
                    width: run_width,
                });
                state.offset += run_width;
                continue;
            }

            // A single word wider than the line: split it between characters.
            let mut piece = String::new();
            let mut piece_width = 0.0;
            for ch in run.chars() {
                let mut buf = [0u8; 4];
                let ch_width = measure.text_width(ch.encode_utf8(&mut buf), font, size);
                if !piece.is_empty() && state.offset + piece_width + ch_width > width + EPSILON {
                    out.push(Piece::Text {
                        text: std::mem::take(&mut piece),
                        width: piece_width,
                    });
                    out.push(Piece::LineBreak);
                    state.offset = 0.0;
                    state.soft_line_start = true;
                    piece_width = 0.0;
                }
                piece.push(ch);
                piece_width += ch_width;
            }
            if !piece.is_empty() {
                out.push(Piece::Text {
                    text: piece,
                    width: piece_width,
                });
                state.offset += piece_width;
            }
        }
    }

    out
}

/// Number of lines `content` occupies when wrapped from a fresh line.
pub(crate) fn line_count<M: TextMeasure + ?Sized>(
    measure: &mut M,
    font: &str,
    size: f32,
    width: f32,
    content: &str,
) -> usize {
    if content.is_empty() {
        return 0;
    }
    let mut state = WrapState::default();
    let pieces = wrap(measure, font, size, width, content, &mut state);
    let breaks = pieces
        .iter()
        .filter(|p| matches!(p, Piece::LineBreak))
        .count();
    breaks + 1
}
