//! Page layout: turn a [`ComposedDocument`] into positioned draw operations.
//!
//! Pure geometry with no I/O and no PDF types, so it can be unit-tested by
//! inspecting the operations directly. [`crate::pipeline::render`] replays
//! them onto printpdf layers.
//!
//! ## Coordinates
//!
//! Millimetres, origin at the top-left corner of the page, y growing
//! downwards. Text `y` is the baseline. The PDF emitter flips the y axis.
//!
//! ## Why approximate metrics?
//!
//! The output uses the base-14 fonts, which are never embedded, so there
//! are no font files to read metrics from. A per-character width table
//! close to Helvetica's AFM values is enough for greedy word wrapping.

use crate::document::{Alignment, Block, ComposedDocument, Inline, Table};
use crate::style::{FontFamily, Rgb, StyleSheet, PT_TO_MM};

/// One of the five base-14 faces the layout uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl Face {
    fn new(family: FontFamily, bold: bool, italic: bool) -> Self {
        match (family, bold, italic) {
            (FontFamily::Mono, _, _) => Face::Mono,
            (FontFamily::Sans, true, true) => Face::BoldItalic,
            (FontFamily::Sans, true, false) => Face::Bold,
            (FontFamily::Sans, false, true) => Face::Italic,
            (FontFamily::Sans, false, false) => Face::Regular,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, Face::Bold | Face::BoldItalic)
    }
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        /// Baseline.
        y: f32,
        size_pt: f32,
        face: Face,
        color: Rgb,
        text: String,
    },
    /// Filled rectangle, `(x, y)` is the top-left corner.
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    StrokeLine {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width_pt: f32,
        color: Rgb,
    },
}

/// Everything drawn on one page, in painting order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    /// Text runs on this page, in painting order.
    pub fn texts(&self) -> impl Iterator<Item = (&str, Face)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, face, .. } => Some((text.as_str(), *face)),
            _ => None,
        })
    }
}

/// Lay out `doc` on as many pages as it needs. Always returns at least one.
pub fn layout(doc: &ComposedDocument) -> Vec<PageLayout> {
    let mut engine = Engine::new(doc.style);
    let frame = Frame {
        left: doc.style.page.margin_mm,
        width: doc.style.page.content_width(),
        bars: Vec::new(),
        color: None,
    };
    for (i, block) in doc.blocks.iter().enumerate() {
        engine.block(block, &frame, i == 0);
    }
    engine.pages
}

/// Width of `text` in millimetres.
pub fn text_width(text: &str, face: Face, size_pt: f32) -> f32 {
    let em: f32 = text.chars().map(|c| char_em(c, face)).sum();
    em * size_pt * PT_TO_MM
}

fn char_em(c: char, face: Face) -> f32 {
    if face == Face::Mono {
        return 0.6;
    }
    let base = match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 0.25,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' | '/' => 0.33,
        'm' | 'w' | 'M' | 'W' | '@' => 0.85,
        '0'..='9' => 0.556,
        'A'..='Z' => 0.68,
        'a'..='z' => 0.53,
        _ => 0.6,
    };
    if face.is_bold() {
        base * 1.06
    } else {
        base
    }
}

// ── Inline flow ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct RunStyle {
    face: Face,
    size_pt: f32,
    color: Rgb,
    background: Option<Rgb>,
}

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    style: RunStyle,
}

enum Token {
    /// Pieces with no break opportunity between them.
    Word(Vec<Piece>),
    Space(RunStyle),
    Break,
}

#[derive(Debug, Clone)]
struct Placed {
    x: f32,
    width: f32,
    text: String,
    style: RunStyle,
}

#[derive(Debug, Clone, Default)]
struct Line {
    items: Vec<Placed>,
    width: f32,
    /// Largest font size on the line.
    size_pt: f32,
}

/// Font and colour applied to inline text that carries no emphasis.
#[derive(Debug, Clone, Copy)]
struct BaseStyle {
    family: FontFamily,
    size_pt: f32,
    bold: bool,
    color: Rgb,
}

fn tokenize(inlines: &[Inline], base: BaseStyle, style: &StyleSheet) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Vec<Piece> = Vec::new();

    let flush = |word: &mut Vec<Piece>, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for inline in inlines {
        let (text, run) = match inline {
            Inline::Text(span) => (
                span.text.as_str(),
                RunStyle {
                    face: Face::new(base.family, base.bold || span.bold, span.italic),
                    size_pt: base.size_pt,
                    color: if span.link.is_some() {
                        style.body.link_color
                    } else {
                        base.color
                    },
                    background: None,
                },
            ),
            Inline::Code(code) => (
                code.as_str(),
                RunStyle {
                    face: Face::Mono,
                    size_pt: base.size_pt * style.code.size_ratio,
                    color: base.color,
                    background: Some(style.code.background),
                },
            ),
            Inline::LineBreak => {
                flush(&mut word, &mut tokens);
                tokens.push(Token::Break);
                continue;
            }
            Inline::Image { alt, .. } => {
                flush(&mut word, &mut tokens);
                let label = if alt.is_empty() {
                    "[image]".to_string()
                } else {
                    format!("[image: {alt}]")
                };
                let run = RunStyle {
                    face: Face::Italic,
                    size_pt: base.size_pt,
                    color: style.image.caption_color,
                    background: None,
                };
                for (i, part) in label.split(' ').enumerate() {
                    if i > 0 {
                        flush(&mut word, &mut tokens);
                        tokens.push(Token::Space(run));
                    }
                    word.push(Piece {
                        text: part.to_string(),
                        style: run,
                    });
                }
                flush(&mut word, &mut tokens);
                continue;
            }
        };

        let mut current = String::new();
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !current.is_empty() {
                    word.push(Piece {
                        text: std::mem::take(&mut current),
                        style: run,
                    });
                }
                flush(&mut word, &mut tokens);
                tokens.push(Token::Space(run));
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            word.push(Piece {
                text: current,
                style: run,
            });
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

/// Greedy line breaking into `avail` millimetres.
fn break_lines(tokens: Vec<Token>, avail: f32, base_size: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line {
        size_pt: base_size,
        ..Line::default()
    };
    let mut pending_space: Option<RunStyle> = None;

    let finish = |line: &mut Line, lines: &mut Vec<Line>| {
        let done = std::mem::replace(
            line,
            Line {
                size_pt: base_size,
                ..Line::default()
            },
        );
        lines.push(done);
    };

    for token in tokens {
        match token {
            Token::Break => {
                finish(&mut line, &mut lines);
                pending_space = None;
            }
            Token::Space(style) => {
                if !line.items.is_empty() {
                    pending_space = Some(style);
                }
            }
            Token::Word(pieces) => {
                let widths: Vec<f32> = pieces
                    .iter()
                    .map(|p| text_width(&p.text, p.style.face, p.style.size_pt))
                    .collect();
                let word_width: f32 = widths.iter().sum();
                let space_width = pending_space
                    .map(|s| text_width(" ", s.face, s.size_pt))
                    .unwrap_or(0.0);

                if !line.items.is_empty() && line.width + space_width + word_width > avail {
                    finish(&mut line, &mut lines);
                    pending_space = None;
                }

                if line.items.is_empty() && word_width > avail {
                    place_split(&mut line, &mut lines, pieces, avail, base_size);
                    pending_space = None;
                    continue;
                }

                if let Some(space) = pending_space.take() {
                    let w = text_width(" ", space.face, space.size_pt);
                    line.items.push(Placed {
                        x: line.width,
                        width: w,
                        text: " ".to_string(),
                        style: space,
                    });
                    line.width += w;
                }
                for (piece, w) in pieces.into_iter().zip(widths) {
                    line.size_pt = line.size_pt.max(piece.style.size_pt);
                    line.items.push(Placed {
                        x: line.width,
                        width: w,
                        text: piece.text,
                        style: piece.style,
                    });
                    line.width += w;
                }
            }
        }
    }
    if !line.items.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    for line in &mut lines {
        trim_trailing_space(line);
    }
    lines
}

/// Hard-break a word wider than the whole line, character by character.
fn place_split(line: &mut Line, lines: &mut Vec<Line>, pieces: Vec<Piece>, avail: f32, base_size: f32) {
    for piece in pieces {
        let mut chunk = String::new();
        let mut chunk_x = line.width;
        for ch in piece.text.chars() {
            let w = text_width(&ch.to_string(), piece.style.face, piece.style.size_pt);
            if line.width + w > avail && (!chunk.is_empty() || !line.items.is_empty()) {
                if !chunk.is_empty() {
                    let width = line.width - chunk_x;
                    line.items.push(Placed {
                        x: chunk_x,
                        width,
                        text: std::mem::take(&mut chunk),
                        style: piece.style,
                    });
                }
                lines.push(std::mem::replace(
                    line,
                    Line {
                        size_pt: base_size,
                        ..Line::default()
                    },
                ));
                chunk_x = 0.0;
            }
            chunk.push(ch);
            line.width += w;
            line.size_pt = line.size_pt.max(piece.style.size_pt);
        }
        if !chunk.is_empty() {
            let width = line.width - chunk_x;
            line.items.push(Placed {
                x: chunk_x,
                width,
                text: chunk,
                style: piece.style,
            });
        }
    }
}

fn trim_trailing_space(line: &mut Line) {
    while line.items.last().is_some_and(|p| p.text == " ") {
        if let Some(p) = line.items.pop() {
            line.width -= p.width;
        }
    }
}

// ── Page engine ─────────────────────────────────────────────────────────

/// Horizontal extent of the current block plus decorations drawn per line.
#[derive(Debug, Clone)]
struct Frame {
    left: f32,
    width: f32,
    /// x positions of blockquote bars enclosing this frame.
    bars: Vec<f32>,
    /// Overrides the body colour (blockquotes).
    color: Option<Rgb>,
}

/// Narrowest frame nesting can produce.
const MIN_FRAME_WIDTH_MM: f32 = 10.0;

impl Frame {
    /// Shift the left edge by `by`, keeping the right edge fixed. Once the
    /// frame is down to its minimum width further nesting stops indenting.
    fn indented(&self, by: f32) -> Frame {
        let by = by.min((self.width - MIN_FRAME_WIDTH_MM).max(0.0));
        Frame {
            left: self.left + by,
            width: self.width - by,
            ..self.clone()
        }
    }
}

/// A laid-out table row, ready to be drawn in one or more strips.
struct RowSlice<'r> {
    cells: &'r [Vec<Line>],
    widths: &'r [f32],
    alignments: &'r [Alignment],
    background: Option<Rgb>,
    lh: f32,
}

struct Engine<'a> {
    style: &'a StyleSheet,
    pages: Vec<PageLayout>,
    /// Top of the next thing to place.
    y: f32,
    /// List marker waiting for the first line of the current item.
    pending_marker: Option<(String, f32)>,
}

impl<'a> Engine<'a> {
    fn new(style: &'a StyleSheet) -> Self {
        Self {
            style,
            pages: vec![PageLayout::default()],
            y: style.page.margin_mm,
            pending_marker: None,
        }
    }

    fn top(&self) -> f32 {
        self.style.page.margin_mm
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.top() + f32::EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = self.top();
    }

    /// Start a new page unless `height` still fits on this one.
    fn ensure_space(&mut self, height: f32) {
        if self.y + height > self.style.page.content_bottom() && !self.at_page_top() {
            self.new_page();
        }
    }

    /// Vertical gap that is dropped at the top of a page.
    fn gap(&mut self, mm: f32) {
        if !self.at_page_top() {
            self.y += mm;
        }
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    fn em(&self, size_pt: f32) -> f32 {
        size_pt * PT_TO_MM
    }

    fn line_height(&self, size_pt: f32) -> f32 {
        size_pt * self.style.body.line_height * PT_TO_MM
    }

    fn body_base(&self, frame: &Frame) -> BaseStyle {
        BaseStyle {
            family: self.style.body.family,
            size_pt: self.style.body.size_pt,
            bold: false,
            color: frame.color.unwrap_or(self.style.body.color),
        }
    }

    fn block(&mut self, block: &Block, frame: &Frame, first: bool) {
        let body = self.style.body.size_pt;
        match block {
            Block::Heading { level, content } => {
                let hs = *self.style.heading(*level);
                if !first {
                    self.gap(self.em(hs.size_pt) * hs.space_before_em * 0.5);
                }
                let base = BaseStyle {
                    family: self.style.body.family,
                    size_pt: hs.size_pt,
                    bold: true,
                    color: frame.color.unwrap_or(self.style.heading_color),
                };
                // Keep the heading with at least one following line.
                self.ensure_space(self.line_height(hs.size_pt) + self.line_height(body));
                self.flow(content, base, frame, Alignment::Left);
                if let Some(rule) = hs.rule_below {
                    self.y += 1.0;
                    self.push(DrawOp::StrokeLine {
                        x1: frame.left,
                        y1: self.y,
                        x2: frame.left + frame.width,
                        y2: self.y,
                        width_pt: 0.75,
                        color: rule,
                    });
                }
                self.y += self.em(hs.size_pt) * hs.space_after_em;
            }
            Block::Paragraph(content) => {
                let base = self.body_base(frame);
                self.flow(content, base, frame, Alignment::Left);
                self.y += self.em(body) * self.style.body.paragraph_spacing_em;
            }
            Block::CodeBlock { text, .. } => self.code_block(text, frame),
            Block::Table(table) => self.table(table, frame),
            Block::BlockQuote(children) => {
                let bar_x = frame.left;
                let mut inner = frame.indented(
                    self.style.blockquote.border_width_mm + self.style.blockquote.padding_left_mm,
                );
                inner.bars.push(bar_x);
                inner.color = Some(self.style.blockquote.color);
                for (i, child) in children.iter().enumerate() {
                    self.block(child, &inner, first && i == 0);
                }
            }
            Block::List(list) => {
                let inner = frame.indented(self.style.list.indent_mm);
                for (n, item) in list.items.iter().enumerate() {
                    let marker = match list.start {
                        Some(start) => format!("{}.", start + n as u64),
                        None => "-".to_string(),
                    };
                    self.pending_marker = Some((marker, frame.left + 1.0));
                    for (i, child) in item.iter().enumerate() {
                        self.block(child, &inner, first && n == 0 && i == 0);
                    }
                    if let Some((marker, x)) = self.pending_marker.take() {
                        // Empty item: the marker stands alone.
                        let lh = self.line_height(body);
                        self.ensure_space(lh);
                        self.marker(&marker, x, self.y + lh * 0.78, frame);
                        self.y += lh;
                    }
                }
                self.y += self.em(body) * 0.4;
            }
            Block::Rule => {
                self.gap(self.em(body) * 0.5);
                self.ensure_space(1.0);
                self.push(DrawOp::StrokeLine {
                    x1: frame.left,
                    y1: self.y,
                    x2: frame.left + frame.width,
                    y2: self.y,
                    width_pt: 0.75,
                    color: self.style.rule_color,
                });
                self.y += self.em(body);
            }
        }
    }

    fn marker(&mut self, marker: &str, x: f32, baseline: f32, frame: &Frame) {
        self.push(DrawOp::Text {
            x,
            y: baseline,
            size_pt: self.style.body.size_pt,
            face: Face::Regular,
            color: frame.color.unwrap_or(self.style.body.color),
            text: marker.to_string(),
        });
    }

    /// Wrap and place inline content inside `frame`.
    fn flow(&mut self, content: &[Inline], base: BaseStyle, frame: &Frame, align: Alignment) {
        let tokens = tokenize(content, base, self.style);
        let lines = break_lines(tokens, frame.width, base.size_pt);
        for line in lines {
            let lh = self.line_height(line.size_pt);
            self.ensure_space(lh);
            let top = self.y;
            self.emit_line(&line, frame.left, frame.width, top, lh, align);
            self.bars(frame, top, lh);
            if let Some((marker, x)) = self.pending_marker.take() {
                self.marker(&marker, x, top + lh * 0.78, frame);
            }
            self.y += lh;
        }
    }

    fn bars(&mut self, frame: &Frame, top: f32, height: f32) {
        for &x in &frame.bars {
            self.push(DrawOp::FillRect {
                x,
                y: top,
                w: self.style.blockquote.border_width_mm,
                h: height,
                color: self.style.blockquote.border,
            });
        }
    }

    fn emit_line(&mut self, line: &Line, left: f32, width: f32, top: f32, lh: f32, align: Alignment) {
        let offset = match align {
            Alignment::Left => 0.0,
            Alignment::Center => ((width - line.width) / 2.0).max(0.0),
            Alignment::Right => (width - line.width).max(0.0),
        };
        let baseline = top + lh * 0.78;
        for item in &line.items {
            let x = left + offset + item.x;
            let st = item.style;
            if let Some(bg) = st.background {
                self.push(DrawOp::FillRect {
                    x: x - 0.3,
                    y: top + lh * 0.1,
                    w: item.width + 0.6,
                    h: lh * 0.85,
                    color: bg,
                });
            }
            if item.text != " " {
                self.push(DrawOp::Text {
                    x,
                    y: baseline,
                    size_pt: st.size_pt,
                    face: st.face,
                    color: st.color,
                    text: item.text.clone(),
                });
            }
        }
    }

    fn code_block(&mut self, text: &str, frame: &Frame) {
        let size = self.style.code_size_pt();
        let pad = self.style.code.padding_mm;
        let lh = self.line_height(size);
        let inner_width = frame.width - 2.0 * pad;
        let chars_per_line = (inner_width / text_width("m", Face::Mono, size)).floor().max(1.0) as usize;

        let mut lines: Vec<String> = Vec::new();
        for raw in text.split('\n') {
            let expanded = raw.replace('\t', "    ");
            let chars: Vec<char> = expanded.chars().collect();
            if chars.is_empty() {
                lines.push(String::new());
            }
            for chunk in chars.chunks(chars_per_line) {
                lines.push(chunk.iter().collect());
            }
        }

        let last = lines.len().saturating_sub(1);
        for (i, line) in lines.iter().enumerate() {
            let extra_top = if i == 0 { pad } else { 0.0 };
            let extra_bottom = if i == last { pad } else { 0.0 };
            let h = extra_top + lh + extra_bottom;
            self.ensure_space(h);
            let top = self.y;
            self.push(DrawOp::FillRect {
                x: frame.left,
                y: top,
                w: frame.width,
                h,
                color: self.style.code.background,
            });
            self.bars(frame, top, h);
            if !line.is_empty() {
                self.push(DrawOp::Text {
                    x: frame.left + pad,
                    y: top + extra_top + lh * 0.78,
                    size_pt: size,
                    face: Face::Mono,
                    color: frame.color.unwrap_or(self.style.body.color),
                    text: line.clone(),
                });
            }
            if let Some((marker, x)) = self.pending_marker.take() {
                self.marker(&marker, x, top + extra_top + lh * 0.78, frame);
            }
            self.y += h;
        }
        self.y += self.em(self.style.body.size_pt) * self.style.body.paragraph_spacing_em;
    }

    fn table(&mut self, table: &Table, frame: &Frame) {
        let ts = self.style.table;
        let size = self.style.table_size_pt();
        let columns = table.column_count();
        if columns == 0 {
            return;
        }
        let style = self.style;
        let color = frame.color.unwrap_or(style.body.color);
        let cell_base = |bold: bool| BaseStyle {
            family: style.body.family,
            size_pt: size,
            bold,
            color,
        };

        // Column widths proportional to the widest single-line cell content,
        // stretched to the full frame width.
        let mut natural = vec![0.0f32; columns];
        let rows: Vec<(bool, &Vec<Vec<Inline>>)> = std::iter::once((true, &table.header))
            .filter(|(_, r)| !r.is_empty())
            .chain(table.rows.iter().map(|r| (false, r)))
            .collect();
        for (is_header, row) in &rows {
            for (c, cell) in row.iter().enumerate() {
                let tokens = tokenize(cell, cell_base(*is_header), style);
                let w = break_lines(tokens, f32::INFINITY, size)
                    .iter()
                    .map(|l| l.width)
                    .fold(0.0, f32::max);
                natural[c] = natural[c].max(w + 2.0 * ts.padding_x_mm);
            }
        }
        let floor = 2.0 * ts.padding_x_mm + 4.0;
        natural.iter_mut().for_each(|w| *w = w.max(floor));
        let total: f32 = natural.iter().sum();
        let widths: Vec<f32> = natural.iter().map(|w| frame.width * w / total).collect();

        let lh = self.line_height(size);
        let mut body_index = 0usize;
        for (is_header, row) in rows {
            let cells: Vec<Vec<Line>> = (0..columns)
                .map(|c| {
                    let content = row.get(c).map(Vec::as_slice).unwrap_or(&[]);
                    let tokens = tokenize(content, cell_base(is_header), style);
                    break_lines(tokens, (widths[c] - 2.0 * ts.padding_x_mm).max(1.0), size)
                })
                .collect();
            let row_lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_h = row_lines as f32 * lh + 2.0 * ts.padding_y_mm;
            let background = if is_header {
                Some(ts.header_background)
            } else {
                let zebra = body_index % 2 == 1;
                body_index += 1;
                zebra.then_some(ts.zebra_background)
            };
            let row = RowSlice {
                cells: &cells,
                widths: &widths,
                alignments: &table.alignments,
                background,
                lh,
            };

            // Rows are kept whole unless one alone is taller than a page.
            if row_h <= self.style.page.content_bottom() - self.top() {
                self.ensure_space(row_h);
                self.table_row(&row, 0..row_lines, frame);
                continue;
            }
            let mut start = 0;
            while start < row_lines {
                let room = self.style.page.content_bottom() - self.y - 2.0 * ts.padding_y_mm;
                let fits = (room / lh).floor().max(0.0) as usize;
                if fits == 0 && !self.at_page_top() {
                    self.new_page();
                    continue;
                }
                let end = (start + fits.max(1)).min(row_lines);
                self.table_row(&row, start..end, frame);
                start = end;
                if start < row_lines {
                    self.new_page();
                }
            }
        }
        self.y += self.em(self.style.body.size_pt) * ts.space_after_em;
    }

    /// Draw lines `range` of every cell in `row` as one bordered strip.
    fn table_row(&mut self, row: &RowSlice<'_>, range: std::ops::Range<usize>, frame: &Frame) {
        let ts = self.style.table;
        let top = self.y;
        let h = range.len() as f32 * row.lh + 2.0 * ts.padding_y_mm;
        if let Some(bg) = row.background {
            self.push(DrawOp::FillRect {
                x: frame.left,
                y: top,
                w: frame.width,
                h,
                color: bg,
            });
        }
        self.bars(frame, top, h);

        let mut x = frame.left;
        for (c, lines) in row.cells.iter().enumerate() {
            let align = row.alignments.get(c).copied().unwrap_or(Alignment::Left);
            let inner_left = x + ts.padding_x_mm;
            let inner_width = row.widths[c] - 2.0 * ts.padding_x_mm;
            let shown = lines.iter().skip(range.start).take(range.len());
            for (i, line) in shown.enumerate() {
                let line_top = top + ts.padding_y_mm + i as f32 * row.lh;
                self.emit_line(line, inner_left, inner_width, line_top, row.lh, align);
            }
            x += row.widths[c];
        }
        self.grid(frame, row.widths, top, h);
        self.y += h;
    }

    /// Cell borders for one row.
    fn grid(&mut self, frame: &Frame, widths: &[f32], top: f32, height: f32) {
        let ts = self.style.table;
        let right = frame.left + frame.width;
        let bottom = top + height;
        for y in [top, bottom] {
            self.push(DrawOp::StrokeLine {
                x1: frame.left,
                y1: y,
                x2: right,
                y2: y,
                width_pt: ts.border_width_pt,
                color: ts.border,
            });
        }
        let mut x = frame.left;
        self.push(DrawOp::StrokeLine {
            x1: x,
            y1: top,
            x2: x,
            y2: bottom,
            width_pt: ts.border_width_pt,
            color: ts.border,
        });
        for w in widths {
            x += w;
            self.push(DrawOp::StrokeLine {
                x1: x,
                y1: top,
                x2: x,
                y2: bottom,
                width_pt: ts.border_width_pt,
                color: ts.border,
            });
        }
    }
}
