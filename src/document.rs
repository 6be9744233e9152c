//! The composed document: parsed Markdown content plus the style sheet it
//! will be presented with. Produced by [`crate::pipeline::markdown`],
//! consumed by [`crate::pipeline::render`].

use crate::style::StyleSheet;

/// A complete document ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDocument {
    /// PDF title metadata: the first heading, if any.
    pub title: Option<String>,
    pub blocks: Vec<Block>,
    pub style: &'static StyleSheet,
}

impl ComposedDocument {
    /// Use `title` when the content had no heading to take one from.
    pub fn with_fallback_title(mut self, title: impl Into<String>) -> Self {
        if self.title.is_none() {
            self.title = Some(title.into());
        }
        self
    }

    /// Concatenated plain text of every block, in reading order.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            block.collect_text(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    CodeBlock { language: Option<String>, text: String },
    Table(Table),
    BlockQuote(Vec<Block>),
    List(List),
    Rule,
}

impl Block {
    fn collect_text(&self, out: &mut String) {
        match self {
            Block::Heading { content, .. } | Block::Paragraph(content) => {
                push_inlines(content, out);
                out.push('\n');
            }
            Block::CodeBlock { text, .. } => {
                out.push_str(text);
                out.push('\n');
            }
            Block::Table(table) => {
                for row in std::iter::once(&table.header).chain(&table.rows) {
                    for cell in row {
                        push_inlines(cell, out);
                        out.push('\t');
                    }
                    out.push('\n');
                }
            }
            Block::BlockQuote(blocks) => blocks.iter().for_each(|b| b.collect_text(out)),
            Block::List(list) => list
                .items
                .iter()
                .flatten()
                .for_each(|b| b.collect_text(out)),
            Block::Rule => {}
        }
    }
}

fn push_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(span) => out.push_str(&span.text),
            Inline::Code(code) => out.push_str(code),
            Inline::LineBreak => out.push('\n'),
            Inline::Image { alt, .. } => out.push_str(alt),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// `Some(n)` for ordered lists, numbering from `n`.
    pub start: Option<u64>,
    pub items: Vec<Vec<Block>>,
}

/// Inline content.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(Span),
    Code(String),
    LineBreak,
    Image { src: String, alt: String },
}

/// A run of text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub link: Option<String>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            link: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::STYLE_SHEET;

    #[test]
    fn plain_text_walks_nested_blocks() {
        let doc = ComposedDocument {
            title: None,
            blocks: vec![
                Block::Heading {
                    level: 1,
                    content: vec![Inline::Text(Span::plain("Title"))],
                },
                Block::BlockQuote(vec![Block::Paragraph(vec![
                    Inline::Text(Span::plain("quoted ")),
                    Inline::Code("x".into()),
                ])]),
            ],
            style: &STYLE_SHEET,
        };
        assert_eq!(doc.plain_text(), "Title\nquoted x\n");
        assert_eq!(doc.with_fallback_title("stem").title.as_deref(), Some("stem"));
    }

    #[test]
    fn column_count_uses_widest_row() {
        let cell = || vec![Inline::Text(Span::plain("c"))];
        let table = Table {
            alignments: vec![Alignment::Left],
            header: vec![cell()],
            rows: vec![vec![cell(), cell(), cell()]],
        };
        assert_eq!(table.column_count(), 3);
    }
}
