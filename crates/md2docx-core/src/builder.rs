//! Token stream to document tree
//!
//! Walks a flat token sequence once, in order, and hands one block at a
//! time to a [`BlockSink`]. Nested constructs are handled by recursing over
//! index ranges of the shared sequence.

use crate::diagram::{self, DiagramKind};
use crate::highlight;
use crate::images;
use crate::inline::{InlineOutput, format_inline};
use log::{debug, warn};
use md_tokens::{Token, TokenKind};
use md2docx_docx::theme::IMAGE_MAX_WIDTH_EMU;
use md2docx_docx::{
    Align, Block, BlockSink, CodeBlock, EmbeddedImage, ImageFormat, Indent, Inline, ListMarker,
    MathContent, RunStyle, Table, TableCell, TableRow,
};
use md2docx_math::{MathMode, latex_to_math};
use std::collections::HashMap;
use std::path::PathBuf;

/// Bullet glyphs, cycled by list depth
const BULLETS: [char; 4] = ['•', '◦', '▪', '▹'];

/// Options for token stream to document conversion
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Directory that relative image paths are resolved against
    pub base_dir: PathBuf,
    /// Widest an image may be, in EMU
    pub image_max_width_emu: u64,
    /// Label above the footnote list
    pub notes_label: String,
    /// Colour fenced code by language
    pub highlight_code: bool,
    /// Draw `matrix`, `chart`, `graph` and `workflow` fences as images
    pub render_diagrams: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            image_max_width_emu: IMAGE_MAX_WIDTH_EMU,
            notes_label: "Notes".to_string(),
            highlight_code: true,
            render_diagrams: true,
        }
    }
}

/// Nesting state of one traversal
#[derive(Debug, Default)]
struct TraversalState {
    blockquote_depth: usize,
    list_depth: usize,
    /// Last number used by the ordered list open at each depth
    ordered_counters: HashMap<usize, u32>,
}

/// Builds blocks from a token sequence into a sink
pub struct Builder<'a, S: BlockSink> {
    options: &'a ConverterOptions,
    sink: &'a mut S,
    state: TraversalState,
}

impl<'a, S: BlockSink> Builder<'a, S> {
    pub fn new(options: &'a ConverterOptions, sink: &'a mut S) -> Self {
        Self {
            options,
            sink,
            state: TraversalState::default(),
        }
    }

    /// Consume the whole token sequence
    pub fn build(mut self, tokens: &[Token]) {
        self.walk(tokens, 0, tokens.len());
    }

    fn walk(&mut self, tokens: &[Token], start: usize, end: usize) {
        let mut i = start;
        while i < end {
            i = self.dispatch(tokens, i, end);
        }
    }

    /// Handle the construct starting at `i`; returns the index after it
    fn dispatch(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let token = &tokens[i];
        match token.kind {
            TokenKind::HeadingOpen => self.heading(tokens, i, end),
            TokenKind::ParagraphOpen => self.paragraph(tokens, i, end),
            TokenKind::Fence | TokenKind::CodeBlock => {
                self.code(token);
                i + 1
            }
            TokenKind::MathBlock => {
                self.math_block(&token.content);
                i + 1
            }
            TokenKind::BulletListOpen | TokenKind::OrderedListOpen => self.list(tokens, i, end),
            TokenKind::BlockquoteOpen => self.blockquote(tokens, i, end),
            TokenKind::TableOpen => self.table(tokens, i, end),
            TokenKind::Hr => {
                self.sink.push_block(Block::HorizontalRule);
                i + 1
            }
            TokenKind::FootnoteBlockOpen => self.footnotes(tokens, i, end),

            // Ignored kinds
            TokenKind::HtmlBlock | TokenKind::FrontMatter => {
                debug!("skipping {:?}", token.kind);
                i + 1
            }

            // Only meaningful inside the constructs above
            TokenKind::HeadingClose
            | TokenKind::ParagraphClose
            | TokenKind::Inline
            | TokenKind::BulletListClose
            | TokenKind::OrderedListClose
            | TokenKind::ListItemOpen
            | TokenKind::ListItemClose
            | TokenKind::BlockquoteClose
            | TokenKind::TableClose
            | TokenKind::TheadOpen
            | TokenKind::TheadClose
            | TokenKind::TbodyOpen
            | TokenKind::TbodyClose
            | TokenKind::TrOpen
            | TokenKind::TrClose
            | TokenKind::ThOpen
            | TokenKind::ThClose
            | TokenKind::TdOpen
            | TokenKind::TdClose
            | TokenKind::FootnoteBlockClose
            | TokenKind::FootnoteOpen
            | TokenKind::FootnoteClose
            | TokenKind::Text
            | TokenKind::CodeInline
            | TokenKind::StrongOpen
            | TokenKind::StrongClose
            | TokenKind::EmOpen
            | TokenKind::EmClose
            | TokenKind::SOpen
            | TokenKind::SClose
            | TokenKind::LinkOpen
            | TokenKind::LinkClose
            | TokenKind::Image
            | TokenKind::MathInline
            | TokenKind::MathInlineDouble
            | TokenKind::Softbreak
            | TokenKind::Hardbreak
            | TokenKind::HtmlInline
            | TokenKind::FootnoteRef => {
                debug!("skipping stray {:?} at token {i}", token.kind);
                i + 1
            }
        }
    }

    fn indent(&self) -> Indent {
        Indent {
            list_level: self.state.list_depth,
            quote_depth: self.state.blockquote_depth,
        }
    }

    fn push_all(&mut self, blocks: Vec<Block>) {
        for block in blocks {
            self.sink.push_block(block);
        }
    }

    /// Format the first `Inline` token in `start..end`
    fn inline_in(&self, tokens: &[Token], start: usize, end: usize) -> InlineOutput {
        tokens[start..end]
            .iter()
            .find(|t| t.kind == TokenKind::Inline)
            .map(|t| format_inline(&t.children, self.options))
            .unwrap_or_default()
    }

    fn heading(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        let level = tokens[i]
            .tag
            .as_deref()
            .and_then(|tag| tag.strip_prefix('h'))
            .and_then(|rank| rank.parse::<u8>().ok())
            .unwrap_or(1)
            .clamp(1, 6);
        let InlineOutput { spans, trailing } = self.inline_in(tokens, i + 1, close);
        let indent = self.indent();
        self.sink.push_block(Block::Heading {
            level,
            spans,
            indent,
        });
        self.push_all(trailing);
        after(close, end)
    }

    fn paragraph(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        let InlineOutput { spans, trailing } = self.inline_in(tokens, i + 1, close);
        let indent = self.indent();
        self.sink.push_block(Block::Paragraph { spans, indent });
        self.push_all(trailing);
        after(close, end)
    }

    fn code(&mut self, token: &Token) {
        let language = token
            .info
            .as_deref()
            .and_then(|info| info.split_whitespace().next())
            .unwrap_or_default();
        let code = token.content.trim_end_matches(['\n', '\r']);
        if code.trim().is_empty() {
            debug!("skipping empty code block");
            return;
        }

        if self.options.render_diagrams
            && let Some(kind) = DiagramKind::from_language(language)
        {
            self.diagram(code, kind);
            return;
        }

        let lines = if self.options.highlight_code {
            highlight::highlight(code, language).unwrap_or_else(|e| {
                warn!("highlighting {language:?} failed, using plain text: {e}");
                highlight::plain_lines(code)
            })
        } else {
            highlight::plain_lines(code)
        };
        let indent = self.indent();
        self.sink.push_block(Block::CodeBlock(CodeBlock {
            language: (!language.is_empty()).then(|| language.to_string()),
            lines,
            indent,
        }));
    }

    fn diagram(&mut self, code: &str, kind: DiagramKind) {
        let name = kind.name();
        match diagram::render(code, kind) {
            Ok(Some(diagram)) => {
                let (width_emu, height_emu) = images::fit_width(
                    diagram.width,
                    diagram.height,
                    self.options.image_max_width_emu,
                );
                self.sink.push_block(Block::Image(EmbeddedImage {
                    data: diagram.png,
                    format: ImageFormat::Png,
                    width_emu,
                    height_emu,
                    description: format!("{name} diagram"),
                }));
                if let Some(caption) = diagram.caption {
                    self.sink.push_block(Block::Caption(caption));
                }
            }
            Ok(None) => {
                warn!("{name} diagram produced no image");
                self.sink
                    .push_block(Block::Notice(format!("[Failed to render {name} diagram]")));
            }
            Err(e) => {
                warn!("{name} diagram failed: {e}");
                self.sink.push_block(Block::Notice(format!(
                    "[Error rendering {name} diagram: {e}]"
                )));
            }
        }
    }

    fn math_block(&mut self, content: &str) {
        let latex = content.trim();
        if latex.is_empty() {
            return;
        }
        let content = match latex_to_math(latex, MathMode::Display) {
            Ok(node) => MathContent::Native(node),
            Err(e) => {
                warn!("display math {latex:?} kept as text: {e}");
                MathContent::Literal(latex.to_string())
            }
        };
        let indent = self.indent();
        self.sink.push_block(Block::Math { content, indent });
    }

    fn list(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        let ordered = tokens[i].kind == TokenKind::OrderedListOpen;

        self.state.list_depth += 1;
        let depth = self.state.list_depth;
        if ordered {
            let start = tokens[i]
                .attr("start")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(1);
            self.state
                .ordered_counters
                .insert(depth, start.saturating_sub(1));
        }

        let mut j = i + 1;
        while j < close {
            if tokens[j].kind != TokenKind::ListItemOpen {
                debug!("skipping {:?} directly inside a list", tokens[j].kind);
                j += 1;
                continue;
            }
            let item_close = find_close(tokens, j, close);
            let marker = if ordered {
                let counter = self.state.ordered_counters.entry(depth).or_insert(0);
                *counter += 1;
                ListMarker::Ordered(*counter)
            } else {
                ListMarker::Bullet(BULLETS[(depth - 1) % BULLETS.len()])
            };
            self.list_item(tokens, j + 1, item_close, marker);
            j = after(item_close, close);
        }

        self.state.ordered_counters.remove(&depth);
        self.state.list_depth -= 1;
        after(close, end)
    }

    /// Content of one list item; the first paragraph carries the marker
    fn list_item(&mut self, tokens: &[Token], start: usize, end: usize, marker: ListMarker) {
        let mut marker = Some(marker);
        let mut k = start;
        while k < end {
            if tokens[k].kind == TokenKind::ParagraphOpen {
                let close = find_close(tokens, k, end);
                let InlineOutput { spans, trailing } = self.inline_in(tokens, k + 1, close);
                let indent = self.indent();
                self.sink.push_block(Block::ListItem {
                    marker: marker.take(),
                    spans,
                    indent,
                });
                self.push_all(trailing);
                k = after(close, end);
            } else {
                if let Some(marker) = marker.take() {
                    self.push_marker_only(marker);
                }
                k = self.dispatch(tokens, k, end);
            }
        }
        if let Some(marker) = marker {
            self.push_marker_only(marker);
        }
    }

    fn push_marker_only(&mut self, marker: ListMarker) {
        let indent = self.indent();
        self.sink.push_block(Block::ListItem {
            marker: Some(marker),
            spans: Vec::new(),
            indent,
        });
    }

    fn blockquote(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        let saved = self.state.blockquote_depth;
        self.state.blockquote_depth += 1;
        self.walk(tokens, i + 1, close);
        self.state.blockquote_depth = saved;
        after(close, end)
    }

    fn table(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        let mut rows: Vec<TableRow> = Vec::new();
        let mut row: Option<TableRow> = None;
        let mut cell: Option<TableCell> = None;
        let mut in_header = false;
        let mut trailing = Vec::new();

        for token in &tokens[i + 1..close] {
            match token.kind {
                TokenKind::TheadOpen => in_header = true,
                TokenKind::TheadClose => in_header = false,
                TokenKind::TrOpen => row = Some(TableRow::default()),
                TokenKind::TrClose => rows.extend(row.take()),
                TokenKind::ThOpen | TokenKind::TdOpen => {
                    cell = Some(TableCell {
                        spans: Vec::new(),
                        header: in_header || token.kind == TokenKind::ThOpen,
                        align: cell_align(token.attr("style")),
                    });
                }
                TokenKind::ThClose | TokenKind::TdClose => {
                    if let Some(cell) = cell.take() {
                        row.get_or_insert_with(TableRow::default).cells.push(cell);
                    }
                }
                TokenKind::Inline => {
                    if let Some(cell) = cell.as_mut() {
                        let output = format_inline(&token.children, self.options);
                        cell.spans.extend(output.spans);
                        trailing.extend(output.trailing);
                    }
                }
                TokenKind::TbodyOpen | TokenKind::TbodyClose => {}
                kind => debug!("skipping {kind:?} inside a table"),
            }
        }

        let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        if columns == 0 {
            debug!("skipping table without cells");
        } else {
            for row in &mut rows {
                let header = row.cells.iter().any(|c| c.header);
                row.cells.resize_with(columns, || TableCell {
                    header,
                    ..Default::default()
                });
            }
            self.sink.push_block(Block::Table(Table { columns, rows }));
        }
        self.push_all(trailing);
        after(close, end)
    }

    fn footnotes(&mut self, tokens: &[Token], i: usize, end: usize) -> usize {
        let close = find_close(tokens, i, end);
        self.sink.push_block(Block::HorizontalRule);
        self.sink
            .push_block(Block::FootnoteHeader(self.options.notes_label.clone()));

        let mut number: Option<usize> = None;
        let mut k = i + 1;
        while k < close {
            let token = &tokens[k];
            match token.kind {
                TokenKind::FootnoteOpen => {
                    number = token.footnote_id.map(|id| id + 1);
                    k += 1;
                }
                TokenKind::ParagraphOpen => {
                    let paragraph_close = find_close(tokens, k, close);
                    let InlineOutput { mut spans, trailing } =
                        self.inline_in(tokens, k + 1, paragraph_close);
                    if let Some(n) = number.take() {
                        spans.insert(0, Inline::styled(format!("[{n}] "), RunStyle::bold()));
                    }
                    self.sink.push_block(Block::Footnote(spans));
                    self.push_all(trailing);
                    k = after(paragraph_close, close);
                }
                _ => k += 1,
            }
        }
        after(close, end)
    }
}

/// Index of the token closing the one at `open`, or `end` when unmatched
fn find_close(tokens: &[Token], open: usize, end: usize) -> usize {
    let kind = tokens[open].kind;
    let Some(closing) = kind.closing() else {
        return open;
    };
    let mut depth = 0usize;
    for (offset, token) in tokens[open..end].iter().enumerate() {
        if token.kind == kind {
            depth += 1;
        } else if token.kind == closing {
            depth -= 1;
            if depth == 0 {
                return open + offset;
            }
        }
    }
    end
}

/// Index after a close token, never beyond `end`
fn after(close: usize, end: usize) -> usize {
    (close + 1).min(end)
}

/// Alignment from a `text-align` style declaration
fn cell_align(style: Option<&str>) -> Align {
    let Some(style) = style else {
        return Align::Left;
    };
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .find(|(property, _)| property.trim().eq_ignore_ascii_case("text-align"))
        .map_or(Align::Left, |(_, value)| {
            match value.trim().to_ascii_lowercase().as_str() {
                "center" => Align::Center,
                "right" => Align::Right,
                _ => Align::Left,
            }
        })
}

/// Build the blocks of a token sequence into `sink`
pub fn build_into<S: BlockSink>(tokens: &[Token], options: &ConverterOptions, sink: &mut S) {
    Builder::new(options, sink).build(tokens);
}

/// Build the blocks of a token sequence into a vector
pub fn build_document(tokens: &[Token], options: &ConverterOptions) -> Vec<Block> {
    let mut blocks = Vec::new();
    build_into(tokens, options, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests;
