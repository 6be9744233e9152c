//! Markdown → composed document.
//!
//! Parsing is delegated to `pulldown-cmark`; this module folds its flat event
//! stream into the nested [`Block`]/[`Inline`] tree and attaches the style
//! sheet. The walk keeps a stack of open tags so every `End` event is matched
//! to its `Start` without inspecting the end tag itself.
//!
//! Output depends only on the input text and the enabled extensions, so
//! normalizing the same file twice yields equal documents.

use crate::config::MarkdownExtension;
use crate::document::{Alignment, Block, ComposedDocument, Inline, List, Span, Table};
use crate::style::StyleSheet;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::collections::BTreeSet;

/// Parses Markdown with a fixed set of extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    extensions: BTreeSet<MarkdownExtension>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(MarkdownExtension::all())
    }
}

impl Normalizer {
    pub fn new(extensions: BTreeSet<MarkdownExtension>) -> Self {
        Self { extensions }
    }

    fn has(&self, ext: MarkdownExtension) -> bool {
        self.extensions.contains(&ext)
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::ENABLE_TASKLISTS;
        if self.has(MarkdownExtension::Tables) {
            options |= Options::ENABLE_TABLES;
        }
        options
    }

    /// Parse `raw_text` and wrap it with `style`.
    pub fn normalize(&self, raw_text: &str, style: &'static StyleSheet) -> ComposedDocument {
        let mut builder = TreeBuilder::new(self);
        for event in Parser::new_ext(raw_text, self.parser_options()) {
            builder.event(event);
        }
        let blocks = builder.finish();
        ComposedDocument {
            title: first_heading_text(&blocks),
            blocks,
            style,
        }
    }
}

/// A tag that has been started and not yet ended.
enum Open {
    Paragraph,
    Heading(u8),
    CodeBlock,
    BlockQuote,
    List,
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Link,
    Image { mark: usize, src: String },
    Other,
}

/// Where finished blocks are appended.
enum Container {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    Item(Vec<Block>),
    List { start: Option<u64>, items: Vec<Vec<Block>> },
}

struct CodeState {
    fenced: bool,
    language: Option<String>,
    text: String,
}

struct TableState {
    alignments: Vec<Alignment>,
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    current: Vec<Vec<Inline>>,
}

struct TreeBuilder {
    fenced_code: bool,
    sane_lists: bool,
    nl2br: bool,
    containers: Vec<Container>,
    open: Vec<Open>,
    inlines: Vec<Inline>,
    strong: u32,
    emphasis: u32,
    links: Vec<String>,
    code: Option<CodeState>,
    table: Option<TableState>,
}

impl TreeBuilder {
    fn new(normalizer: &Normalizer) -> Self {
        Self {
            fenced_code: normalizer.has(MarkdownExtension::FencedCode),
            sane_lists: normalizer.has(MarkdownExtension::SaneLists),
            nl2br: normalizer.has(MarkdownExtension::Nl2Br),
            containers: vec![Container::Root(Vec::new())],
            open: Vec::new(),
            inlines: Vec::new(),
            strong: 0,
            emphasis: 0,
            links: Vec::new(),
            code: None,
            table: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => match self.code.as_mut() {
                Some(code) => code.text.push_str(&text),
                None => self.push_text(&text),
            },
            Event::Code(code) => self.inlines.push(Inline::Code(code.to_string())),
            Event::SoftBreak => {
                if self.nl2br {
                    self.inlines.push(Inline::LineBreak);
                } else {
                    self.push_text(" ");
                }
            }
            Event::HardBreak => self.inlines.push(Inline::LineBreak),
            Event::Rule => {
                self.flush_inlines();
                self.push_block(Block::Rule);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if is_line_break_tag(&html) {
                    self.inlines.push(Inline::LineBreak);
                }
            }
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(name) => self.push_text(&format!("[{name}]")),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                self.flush_inlines();
                Open::Paragraph
            }
            Tag::Heading { level, .. } => {
                self.flush_inlines();
                Open::Heading(level as u8)
            }
            Tag::CodeBlock(kind) => {
                self.flush_inlines();
                let (fenced, language) = match kind {
                    CodeBlockKind::Fenced(info) => (
                        true,
                        info.split_whitespace().next().map(str::to_string),
                    ),
                    CodeBlockKind::Indented => (false, None),
                };
                self.code = Some(CodeState {
                    fenced,
                    language,
                    text: String::new(),
                });
                Open::CodeBlock
            }
            Tag::BlockQuote(_) => {
                self.flush_inlines();
                self.containers.push(Container::Quote(Vec::new()));
                Open::BlockQuote
            }
            Tag::List(start) => {
                self.flush_inlines();
                let start = start.map(|n| if self.sane_lists { n } else { 1 });
                self.containers.push(Container::List {
                    start,
                    items: Vec::new(),
                });
                Open::List
            }
            Tag::Item => {
                self.containers.push(Container::Item(Vec::new()));
                Open::Item
            }
            Tag::Table(alignments) => {
                self.flush_inlines();
                self.table = Some(TableState {
                    alignments: alignments.into_iter().map(map_alignment).collect(),
                    header: Vec::new(),
                    rows: Vec::new(),
                    current: Vec::new(),
                });
                Open::Table
            }
            Tag::TableHead => {
                self.start_row();
                Open::TableHead
            }
            Tag::TableRow => {
                self.start_row();
                Open::TableRow
            }
            Tag::TableCell => {
                self.inlines.clear();
                Open::TableCell
            }
            Tag::Emphasis => {
                self.emphasis += 1;
                Open::Emphasis
            }
            Tag::Strong => {
                self.strong += 1;
                Open::Strong
            }
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                Open::Link
            }
            Tag::Image { dest_url, .. } => Open::Image {
                mark: self.inlines.len(),
                src: dest_url.to_string(),
            },
            _ => Open::Other,
        };
        self.open.push(open);
    }

    fn end(&mut self) {
        let Some(open) = self.open.pop() else {
            return;
        };
        match open {
            Open::Paragraph => {
                let content = std::mem::take(&mut self.inlines);
                if !content.is_empty() {
                    self.push_block(Block::Paragraph(content));
                }
            }
            Open::Heading(level) => {
                let content = std::mem::take(&mut self.inlines);
                self.push_block(Block::Heading { level, content });
            }
            Open::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.finish_code(code);
                }
            }
            Open::BlockQuote => {
                self.flush_inlines();
                if let Some(Container::Quote(blocks)) = self.containers.pop() {
                    self.push_block(Block::BlockQuote(blocks));
                }
            }
            Open::List => {
                self.flush_inlines();
                if let Some(Container::List { start, items }) = self.containers.pop() {
                    self.push_block(Block::List(List { start, items }));
                }
            }
            Open::Item => {
                self.flush_inlines();
                if let Some(Container::Item(blocks)) = self.containers.pop() {
                    match self.containers.last_mut() {
                        Some(Container::List { items, .. }) => items.push(blocks),
                        _ => blocks.into_iter().for_each(|b| self.push_block(b)),
                    }
                }
            }
            Open::TableCell => {
                let cell = std::mem::take(&mut self.inlines);
                if let Some(table) = self.table.as_mut() {
                    table.current.push(cell);
                }
            }
            Open::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current);
                    table.rows.push(row);
                }
            }
            Open::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.current);
                }
            }
            Open::Table => {
                if let Some(t) = self.table.take() {
                    self.push_block(Block::Table(Table {
                        alignments: t.alignments,
                        header: t.header,
                        rows: t.rows,
                    }));
                }
            }
            Open::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Open::Strong => self.strong = self.strong.saturating_sub(1),
            Open::Link => {
                self.links.pop();
            }
            Open::Image { mark, src } => {
                let alt_inlines = self.inlines.split_off(mark.min(self.inlines.len()));
                let alt = alt_inlines
                    .iter()
                    .map(|i| match i {
                        Inline::Text(span) => span.text.as_str(),
                        Inline::Code(code) => code.as_str(),
                        _ => "",
                    })
                    .collect::<String>();
                self.inlines.push(Inline::Image { src, alt });
            }
            Open::Other => {}
        }
    }

    fn start_row(&mut self) {
        if let Some(table) = self.table.as_mut() {
            table.current.clear();
        }
    }

    fn finish_code(&mut self, code: CodeState) {
        if code.fenced && !self.fenced_code {
            // Without fenced-code support the fence reads as inline code.
            let mut content = Vec::new();
            for (i, line) in code.text.trim_end_matches('\n').lines().enumerate() {
                if i > 0 {
                    content.push(Inline::LineBreak);
                }
                content.push(Inline::Code(line.to_string()));
            }
            if !content.is_empty() {
                self.push_block(Block::Paragraph(content));
            }
            return;
        }
        let text = code.text.trim_end_matches('\n').to_string();
        self.push_block(Block::CodeBlock {
            language: code.language,
            text,
        });
    }

    fn current_span(&self, text: &str) -> Span {
        Span {
            text: text.to_string(),
            bold: self.strong > 0,
            italic: self.emphasis > 0,
            link: self.links.last().cloned(),
        }
    }

    /// Append text, merging with the previous run when emphasis matches.
    fn push_text(&mut self, text: &str) {
        let span = self.current_span(text);
        if let Some(Inline::Text(prev)) = self.inlines.last_mut() {
            if prev.bold == span.bold
                && prev.italic == span.italic
                && prev.link == span.link
            {
                prev.text.push_str(text);
                return;
            }
        }
        self.inlines.push(Inline::Text(span));
    }

    /// Loose text directly inside a list item becomes a paragraph.
    fn flush_inlines(&mut self) {
        if self.inlines.is_empty() || self.table.is_some() {
            return;
        }
        let content = std::mem::take(&mut self.inlines);
        let blank = content.iter().all(|i| match i {
            Inline::Text(span) => span.text.trim().is_empty(),
            Inline::LineBreak => true,
            _ => false,
        });
        if !blank {
            self.push_block(Block::Paragraph(content));
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Root(blocks))
            | Some(Container::Quote(blocks))
            | Some(Container::Item(blocks)) => blocks.push(block),
            Some(Container::List { items, .. }) => items.push(vec![block]),
            None => self.containers.push(Container::Root(vec![block])),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_inlines();
        // Unwind anything left open by truncated input.
        while self.containers.len() > 1 {
            match self.containers.pop() {
                Some(Container::Quote(blocks)) => self.push_block(Block::BlockQuote(blocks)),
                Some(Container::Item(blocks)) => match self.containers.last_mut() {
                    Some(Container::List { items, .. }) => items.push(blocks),
                    _ => blocks.into_iter().for_each(|b| self.push_block(b)),
                },
                Some(Container::List { start, items }) => {
                    self.push_block(Block::List(List { start, items }))
                }
                Some(Container::Root(blocks)) => blocks.into_iter().for_each(|b| self.push_block(b)),
                None => break,
            }
        }
        match self.containers.pop() {
            Some(Container::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}

fn map_alignment(a: pulldown_cmark::Alignment) -> Alignment {
    match a {
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
        pulldown_cmark::Alignment::Left | pulldown_cmark::Alignment::None => Alignment::Left,
    }
}

fn is_line_break_tag(html: &str) -> bool {
    let compact: String = html
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(compact.as_str(), "<br>" | "<br/>")
}

fn first_heading_text(blocks: &[Block]) -> Option<String> {
    let text_of = |content: &[Inline]| {
        content
            .iter()
            .map(|i| match i {
                Inline::Text(span) => span.text.as_str(),
                Inline::Code(code) => code.as_str(),
                Inline::Image { alt, .. } => alt.as_str(),
                Inline::LineBreak => " ",
            })
            .collect::<String>()
            .trim()
            .to_string()
    };
    let headings = || {
        blocks.iter().filter_map(|b| match b {
            Block::Heading { level, content } => Some((*level, content)),
            _ => None,
        })
    };
    headings()
        .find(|(level, _)| *level == 1)
        .or_else(|| headings().next())
        .map(|(_, content)| text_of(content))
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::STYLE_SHEET;

    fn normalize(md: &str) -> ComposedDocument {
        Normalizer::default().normalize(md, &STYLE_SHEET)
    }

    fn normalize_with(md: &str, exts: &[MarkdownExtension]) -> ComposedDocument {
        Normalizer::new(exts.iter().copied().collect()).normalize(md, &STYLE_SHEET)
    }

    fn text(s: &str) -> Inline {
        Inline::Text(Span::plain(s))
    }

    #[test]
    fn heading_and_bold_paragraph() {
        let doc = normalize("# Title\n\nHello **world**.");
        assert_eq!(doc.title.as_deref(), Some("Title"));
        assert_eq!(
            doc.blocks[0],
            Block::Heading {
                level: 1,
                content: vec![text("Title")]
            }
        );
        let Block::Paragraph(content) = &doc.blocks[1] else {
            panic!("expected paragraph, got {:?}", doc.blocks[1]);
        };
        assert_eq!(content[0], text("Hello "));
        match &content[1] {
            Inline::Text(span) => {
                assert_eq!(span.text, "world");
                assert!(span.bold);
            }
            other => panic!("expected bold span, got {other:?}"),
        }
        assert_eq!(content[2], text("."));
    }

    #[test]
    fn pipe_table_becomes_table_block() {
        let doc = normalize("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let Block::Table(table) = &doc.blocks[0] else {
            panic!("expected table, got {:?}", doc.blocks);
        };
        assert_eq!(table.header, vec![vec![text("a")], vec![text("b")]]);
        assert_eq!(table.rows, vec![vec![vec![text("1")], vec![text("2")]]]);
        assert!(!doc.plain_text().contains('|'));
    }

    #[test]
    fn tables_disabled_keeps_pipes() {
        let doc = normalize_with("| a | b |\n|---|---|\n| 1 | 2 |\n", &[]);
        assert!(matches!(doc.blocks[0], Block::Paragraph(_)));
        assert!(doc.plain_text().contains("| a | b |"));
    }

    #[test]
    fn fenced_code_keeps_language_and_text() {
        let doc = normalize("```rust\nfn main() {}\n```\n");
        assert_eq!(
            doc.blocks[0],
            Block::CodeBlock {
                language: Some("rust".into()),
                text: "fn main() {}".into()
            }
        );
    }

    #[test]
    fn fenced_code_disabled_renders_inline_code() {
        let doc = normalize_with("```\na\nb\n```\n", &[MarkdownExtension::Tables]);
        assert_eq!(
            doc.blocks[0],
            Block::Paragraph(vec![
                Inline::Code("a".into()),
                Inline::LineBreak,
                Inline::Code("b".into())
            ])
        );
    }

    #[test]
    fn nl2br_turns_soft_breaks_into_line_breaks() {
        let on = normalize("one\ntwo");
        assert_eq!(
            on.blocks[0],
            Block::Paragraph(vec![text("one"), Inline::LineBreak, text("two")])
        );
        let off = normalize_with("one\ntwo", &[]);
        assert_eq!(off.blocks[0], Block::Paragraph(vec![text("one two")]));
    }

    #[test]
    fn sane_lists_honour_start_number() {
        let md = "3. c\n4. d\n";
        let Block::List(list) = &normalize(md).blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.start, Some(3));
        assert_eq!(list.items.len(), 2);

        let Block::List(list) = &normalize_with(md, &[]).blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.start, Some(1));
    }

    #[test]
    fn nested_list_in_tight_item() {
        let doc = normalize("- outer\n  - inner\n- second\n");
        let Block::List(list) = &doc.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.start, None);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0][0], Block::Paragraph(vec![text("outer")]));
        assert!(matches!(list.items[0][1], Block::List(_)));
    }

    #[test]
    fn blockquote_wraps_children() {
        let doc = normalize("> quoted *text*\n");
        let Block::BlockQuote(children) = &doc.blocks[0] else {
            panic!("expected blockquote");
        };
        let Block::Paragraph(content) = &children[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(&content[1], Inline::Text(s) if s.italic && s.text == "text"));
    }

    #[test]
    fn image_alt_text_is_collected() {
        let doc = normalize("![a *diagram*](fig.png)");
        assert_eq!(
            doc.blocks[0],
            Block::Paragraph(vec![Inline::Image {
                src: "fig.png".into(),
                alt: "a diagram".into()
            }])
        );
    }

    #[test]
    fn links_carry_destination() {
        let doc = normalize("[site](https://example.com)");
        let Block::Paragraph(content) = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(
            matches!(&content[0], Inline::Text(s) if s.link.as_deref() == Some("https://example.com"))
        );
    }

    #[test]
    fn tildes_stay_literal() {
        assert!(normalize("~~kept~~").plain_text().contains("~~kept~~"));
    }

    #[test]
    fn html_br_is_a_line_break_other_html_is_dropped() {
        let doc = normalize("a<br/>b <span>c</span>");
        let Block::Paragraph(content) = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(content.contains(&Inline::LineBreak));
        assert!(!doc.plain_text().contains("span"));
    }

    #[test]
    fn title_prefers_first_h1() {
        assert_eq!(normalize("## Intro\n\n# Main\n").title.as_deref(), Some("Main"));
        assert_eq!(normalize("## Intro\n").title.as_deref(), Some("Intro"));
        assert_eq!(normalize("just text").title, None);
    }

    #[test]
    fn normalization_is_deterministic() {
        let md = "# T\n\n| a |\n|---|\n| 1 |\n\n- x\n- y\n\n> q\n";
        assert_eq!(normalize(md), normalize(md));
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(normalize("").blocks.is_empty());
        assert!(normalize("\n\n   \n").blocks.is_empty());
    }
}
