//! Positioned text spans and line reconstruction.
//!
//! PDF pages are walked operation by operation to recover where each string
//! was drawn. Plain-text pages are mapped onto the same coordinate model so
//! both go through one table detector.

use super::backend::{PageId, PdfBackend, PdfValue};

/// Approximate glyph advance as a fraction of the font size.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

/// Grid used when laying out plain text: one character cell per column.
pub const TEXT_CHAR_WIDTH: f32 = 6.0;
pub const TEXT_LINE_HEIGHT: f32 = 12.0;
pub const TEXT_FONT_SIZE: f32 = 10.0;

/// A text span with position information.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline, larger is higher on the page)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span, estimating its width from the character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = text.chars().count() as f32 * font_size * GLYPH_WIDTH_FACTOR;
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
}

impl TextLine {
    fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
        let y = if spans.is_empty() {
            0.0
        } else {
            spans.iter().map(|s| s.y).sum::<f32>() / spans.len() as f32
        };
        Self { spans, y }
    }

    /// Join span texts, inserting a space where spans do not touch.
    pub fn text(&self) -> String {
        let mut result = String::new();
        let mut prev: Option<&TextSpan> = None;
        for span in &self.spans {
            if let Some(p) = prev {
                let gap = span.x - p.right();
                let threshold = span.font_size * GLYPH_WIDTH_FACTOR * 0.2;
                if gap > threshold && !result.ends_with(' ') && !span.text.starts_with(' ') {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
            prev = Some(span);
        }
        result
    }
}

/// Group spans into lines, top of page first.
pub fn group_into_lines(spans: &[TextSpan], y_tolerance_factor: f32) -> Vec<TextLine> {
    let mut sorted = spans.to_vec();
    sorted.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in sorted {
        let tolerance = span.font_size * y_tolerance_factor;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }
    lines
}

/// Lay out a plain-text page as spans.
///
/// Cells are separated by tabs or runs of two or more spaces; each cell
/// becomes one span positioned at its character offset.
pub fn spans_from_text(text: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let y = -(line_idx as f32) * TEXT_LINE_HEIGHT;
        let expanded = line.replace('\t', "    ");
        for (offset, cell) in split_aligned_cells(&expanded) {
            spans.push(TextSpan {
                width: cell.chars().count() as f32 * TEXT_CHAR_WIDTH,
                text: cell.to_string(),
                x: offset as f32 * TEXT_CHAR_WIDTH,
                y,
                font_size: TEXT_FONT_SIZE,
            });
        }
    }
    spans
}

/// Split a line on runs of 2+ spaces, returning (char offset, cell text).
fn split_aligned_cells(line: &str) -> Vec<(usize, &str)> {
    let mut cells = Vec::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut start: Option<(usize, usize)> = None; // (char offset, byte offset)
    let mut i = 0;

    while i < chars.len() {
        let (byte, c) = chars[i];
        if c == ' ' {
            let run = chars[i..].iter().take_while(|(_, c)| *c == ' ').count();
            let at_end = i + run >= chars.len();
            if run >= 2 || at_end {
                if let Some((off, b)) = start.take() {
                    cells.push((off, line[b..byte].trim_end()));
                }
                i += run;
                continue;
            }
        } else if start.is_none() {
            start = Some((i, byte));
        }
        i += 1;
    }
    if let Some((off, b)) = start {
        cells.push((off, line[b..].trim_end()));
    }
    cells.retain(|(_, c)| !c.is_empty());
    cells
}

/// Extracts positioned spans from one PDF page.
pub struct SpanExtractor<'a, B: PdfBackend> {
    backend: &'a B,
}

#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            leading: 12.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, m: [f32; 6]) {
        let leading = self.leading;
        *self = Self {
            a: m[0],
            b: m[1],
            c: m[2],
            d: m[3],
            e: m[4],
            f: m[5],
            leading,
        };
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

impl<'a, B: PdfBackend> SpanExtractor<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Extract spans from a page.
    pub fn extract(&self, page: PageId) -> crate::Result<Vec<TextSpan>> {
        let ops = self.backend.page_operations(page)?;

        let mut spans = Vec::new();
        let mut font: Vec<u8> = Vec::new();
        let mut font_size: f32 = 12.0;
        let mut tm = TextMatrix::default();
        let mut line_start = tm;
        let mut in_text = false;

        for op in &ops {
            match op.operator.as_str() {
                "BT" => {
                    in_text = true;
                    tm = TextMatrix {
                        leading: tm.leading,
                        ..TextMatrix::default()
                    };
                    line_start = tm;
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        font = name.clone();
                    }
                    font_size = op.number(1, 12.0);
                }
                "TL" => tm.leading = op.number(0, 12.0),
                "Td" => {
                    line_start.translate(op.number(0, 0.0), op.number(1, 0.0));
                    tm = line_start;
                }
                "TD" => {
                    let ty = op.number(1, 0.0);
                    line_start.leading = -ty;
                    line_start.translate(op.number(0, 0.0), ty);
                    tm = line_start;
                }
                "Tm" => {
                    tm.set([
                        op.number(0, 1.0),
                        op.number(1, 0.0),
                        op.number(2, 0.0),
                        op.number(3, 1.0),
                        op.number(4, 0.0),
                        op.number(5, 0.0),
                    ]);
                    line_start = tm;
                }
                "T*" => {
                    line_start.next_line();
                    tm = line_start;
                }
                "Tj" | "TJ" | "'" | "\"" if in_text => {
                    if op.operator == "'" || op.operator == "\"" {
                        line_start.next_line();
                        tm = line_start;
                    }
                    let text = self.show_text(page, &font, op.operator.as_str(), &op.operands);
                    if !text.trim().is_empty() {
                        let size = font_size * tm.scale();
                        let span = TextSpan::new(text, tm.e, tm.f, size);
                        tm.e += span.width;
                        spans.push(span);
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    fn show_text(&self, page: PageId, font: &[u8], operator: &str, operands: &[PdfValue]) -> String {
        let decode = |bytes: &[u8]| self.backend.decode_text(page, font, bytes);
        match operator {
            "TJ" => {
                let mut combined = String::new();
                if let Some(PdfValue::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            PdfValue::Str(bytes) => combined.push_str(&decode(bytes)),
                            // Large negative kerning is a word gap.
                            other => {
                                if let Some(n) = other.as_number() {
                                    if -n > 200.0 && !combined.is_empty() && !combined.ends_with(' ')
                                    {
                                        combined.push(' ');
                                    }
                                }
                            }
                        }
                    }
                }
                combined
            }
            "\"" => match operands.get(2) {
                Some(PdfValue::Str(bytes)) => decode(bytes),
                _ => String::new(),
            },
            _ => match operands.first() {
                Some(PdfValue::Str(bytes)) => decode(bytes),
                _ => String::new(),
            },
        }
    }
}
