//! pulldown-cmark adapter
//!
//! Converts the nested event stream of pulldown-cmark into the flat token
//! sequence described in [`crate::token`]. The adapter keeps its own stack of
//! open containers, so closing events are interpreted by what was opened
//! rather than by their own shape.

use crate::token::{Token, TokenKind};
use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag};
use std::collections::HashMap;

/// Parser options: tables, strikethrough, footnotes, task lists, dollar math
/// and YAML front matter
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

/// Parse Markdown into a flat, well-nested token sequence
pub fn parse(markdown: &str) -> Vec<Token> {
    let mut builder = TokenBuilder::default();
    for event in Parser::new_ext(markdown, parser_options()) {
        builder.event(event);
    }
    builder.finish()
}

/// An open container on the adapter stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Paragraph,
    Heading,
    BlockQuote,
    List { ordered: bool },
    Item,
    CodeBlock,
    HtmlBlock,
    Metadata,
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Other,
}

impl Frame {
    fn is_inline(self) -> bool {
        matches!(
            self,
            Frame::Emphasis | Frame::Strong | Frame::Strikethrough | Frame::Link | Frame::Image
        )
    }
}

/// Literal text being collected for a leaf block
#[derive(Debug)]
struct Literal {
    kind: TokenKind,
    info: Option<String>,
    content: String,
}

#[derive(Debug, Default)]
struct TokenBuilder {
    tokens: Vec<Token>,
    level: usize,
    stack: Vec<Frame>,
    /// Children of the inline token currently being built
    inline: Option<Vec<Token>>,
    /// An implicit paragraph was opened for a tight list item
    implicit_paragraph: bool,
    literal: Option<Literal>,
    /// Image token whose alt text is being collected
    image: Option<Token>,
    alignments: Vec<Alignment>,
    cell_index: usize,
    in_table_head: bool,
    tbody_open: bool,
    /// Footnote definition being diverted: label, saved level, tokens
    footnote: Option<(String, usize, Vec<Token>)>,
    definitions: Vec<(String, Vec<Token>)>,
    /// Footnote labels in first-reference order
    references: Vec<String>,
}

impl TokenBuilder {
    fn event(&mut self, event: Event<'_>) {
        if self.image.is_some() {
            self.image_event(event);
            return;
        }
        if let Some(literal) = self.literal.as_mut() {
            match event {
                Event::Text(text) | Event::Html(text) => {
                    literal.content.push_str(&text);
                    return;
                }
                Event::End(_) => {}
                _ => return,
            }
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.push_inline(Token::text(text.to_string())),
            Event::Code(code) => {
                self.push_inline(Token::new(TokenKind::CodeInline, 0).with_content(code.to_string()))
            }
            Event::InlineMath(math) => {
                self.push_inline(Token::new(TokenKind::MathInline, 0).with_content(math.to_string()))
            }
            Event::DisplayMath(math) => self.push_inline(
                Token::new(TokenKind::MathInlineDouble, 0).with_content(math.to_string()),
            ),
            Event::InlineHtml(html) => {
                self.push_inline(Token::new(TokenKind::HtmlInline, 0).with_content(html.to_string()))
            }
            Event::Html(html) => {
                // Raw HTML outside an HTML block container
                self.close_implicit_paragraph();
                self.push_block(Token::new(TokenKind::HtmlBlock, self.level).with_content(html.to_string()));
            }
            Event::FootnoteReference(label) => {
                let id = self.reference_id(&label);
                let mut token = Token::new(TokenKind::FootnoteRef, 0).with_attr("label", label.to_string());
                token.footnote_id = Some(id);
                self.push_inline(token);
            }
            Event::SoftBreak => self.push_inline(Token::new(TokenKind::Softbreak, 0)),
            Event::HardBreak => self.push_inline(Token::new(TokenKind::Hardbreak, 0)),
            Event::Rule => {
                self.close_implicit_paragraph();
                self.push_block(Token::new(TokenKind::Hr, self.level));
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "\u{2611} " } else { "\u{2610} " };
                self.push_inline(Token::text(marker));
            }
            #[allow(unreachable_patterns)]
            _ => log::debug!("ignoring unsupported markdown event"),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Emphasis => {
                self.push_inline(Token::new(TokenKind::EmOpen, 0));
                Frame::Emphasis
            }
            Tag::Strong => {
                self.push_inline(Token::new(TokenKind::StrongOpen, 0));
                Frame::Strong
            }
            Tag::Strikethrough => {
                self.push_inline(Token::new(TokenKind::SOpen, 0));
                Frame::Strikethrough
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut token =
                    Token::new(TokenKind::LinkOpen, 0).with_attr("href", dest_url.to_string());
                if !title.is_empty() {
                    token = token.with_attr("title", title.to_string());
                }
                self.push_inline(token);
                Frame::Link
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.ensure_inline();
                let mut token =
                    Token::new(TokenKind::Image, 0).with_attr("src", dest_url.to_string());
                if !title.is_empty() {
                    token = token.with_attr("title", title.to_string());
                }
                self.image = Some(token);
                Frame::Image
            }
            block => {
                self.close_implicit_paragraph();
                self.start_block(block)
            }
        };
        self.stack.push(frame);
    }

    fn start_block(&mut self, tag: Tag<'_>) -> Frame {
        match tag {
            Tag::Paragraph => {
                self.open(TokenKind::ParagraphOpen, |t| t);
                self.inline = Some(Vec::new());
                Frame::Paragraph
            }
            Tag::Heading { level, .. } => {
                let rank = level as usize;
                self.open(TokenKind::HeadingOpen, |t| t.with_tag(format!("h{rank}")));
                self.inline = Some(Vec::new());
                Frame::Heading
            }
            Tag::BlockQuote(_) => {
                self.open(TokenKind::BlockquoteOpen, |t| t.with_tag("blockquote"));
                Frame::BlockQuote
            }
            Tag::CodeBlock(kind) => {
                let (kind, info) = match kind {
                    CodeBlockKind::Fenced(info) => (TokenKind::Fence, Some(info.trim().to_string())),
                    CodeBlockKind::Indented => (TokenKind::CodeBlock, None),
                };
                self.literal = Some(Literal {
                    kind,
                    info,
                    content: String::new(),
                });
                Frame::CodeBlock
            }
            Tag::HtmlBlock => {
                self.literal = Some(Literal {
                    kind: TokenKind::HtmlBlock,
                    info: None,
                    content: String::new(),
                });
                Frame::HtmlBlock
            }
            Tag::MetadataBlock(_) => {
                self.literal = Some(Literal {
                    kind: TokenKind::FrontMatter,
                    info: None,
                    content: String::new(),
                });
                Frame::Metadata
            }
            Tag::List(Some(start)) => {
                self.open(TokenKind::OrderedListOpen, |t| {
                    t.with_tag("ol").with_attr("start", start.to_string())
                });
                Frame::List { ordered: true }
            }
            Tag::List(None) => {
                self.open(TokenKind::BulletListOpen, |t| t.with_tag("ul"));
                Frame::List { ordered: false }
            }
            Tag::Item => {
                self.open(TokenKind::ListItemOpen, |t| t.with_tag("li"));
                Frame::Item
            }
            Tag::Table(alignments) => {
                self.alignments = alignments;
                self.tbody_open = false;
                self.open(TokenKind::TableOpen, |t| t.with_tag("table"));
                Frame::Table
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell_index = 0;
                self.open(TokenKind::TheadOpen, |t| t.with_tag("thead"));
                self.open(TokenKind::TrOpen, |t| t.with_tag("tr"));
                Frame::TableHead
            }
            Tag::TableRow => {
                if !self.tbody_open {
                    self.open(TokenKind::TbodyOpen, |t| t.with_tag("tbody"));
                    self.tbody_open = true;
                }
                self.cell_index = 0;
                self.open(TokenKind::TrOpen, |t| t.with_tag("tr"));
                Frame::TableRow
            }
            Tag::TableCell => {
                let style = match self.alignments.get(self.cell_index) {
                    Some(Alignment::Center) => Some("text-align:center"),
                    Some(Alignment::Right) => Some("text-align:right"),
                    Some(Alignment::Left) => Some("text-align:left"),
                    _ => None,
                };
                let kind = if self.in_table_head {
                    TokenKind::ThOpen
                } else {
                    TokenKind::TdOpen
                };
                self.open(kind, |t| match style {
                    Some(style) => t.with_attr("style", style),
                    None => t,
                });
                self.inline = Some(Vec::new());
                Frame::TableCell
            }
            Tag::FootnoteDefinition(label) => {
                self.footnote = Some((label.to_string(), self.level, Vec::new()));
                self.level = 2;
                Frame::FootnoteDefinition
            }
            _ => Frame::Other,
        }
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if !frame.is_inline() {
            self.close_implicit_paragraph();
        }

        match frame {
            Frame::Emphasis => self.push_inline(Token::new(TokenKind::EmClose, 0)),
            Frame::Strong => self.push_inline(Token::new(TokenKind::StrongClose, 0)),
            Frame::Strikethrough => self.push_inline(Token::new(TokenKind::SClose, 0)),
            Frame::Link => self.push_inline(Token::new(TokenKind::LinkClose, 0)),
            Frame::Image => {}
            Frame::Paragraph => self.close_paragraph(),
            Frame::Heading => {
                self.flush_inline();
                self.close(TokenKind::HeadingClose);
            }
            Frame::BlockQuote => self.close(TokenKind::BlockquoteClose),
            Frame::CodeBlock | Frame::HtmlBlock | Frame::Metadata => {
                if let Some(literal) = self.literal.take() {
                    let mut token =
                        Token::new(literal.kind, self.level).with_content(literal.content);
                    token.info = literal.info;
                    self.push_block(token);
                }
            }
            Frame::List { ordered: true } => self.close(TokenKind::OrderedListClose),
            Frame::List { ordered: false } => self.close(TokenKind::BulletListClose),
            Frame::Item => self.close(TokenKind::ListItemClose),
            Frame::Table => {
                if self.tbody_open {
                    self.close(TokenKind::TbodyClose);
                    self.tbody_open = false;
                }
                self.close(TokenKind::TableClose);
            }
            Frame::TableHead => {
                self.close(TokenKind::TrClose);
                self.close(TokenKind::TheadClose);
                self.in_table_head = false;
            }
            Frame::TableRow => self.close(TokenKind::TrClose),
            Frame::TableCell => {
                self.flush_inline();
                let kind = if self.in_table_head {
                    TokenKind::ThClose
                } else {
                    TokenKind::TdClose
                };
                self.close(kind);
                self.cell_index += 1;
            }
            Frame::FootnoteDefinition => {
                if let Some((label, level, tokens)) = self.footnote.take() {
                    self.level = level;
                    self.definitions.push((label, tokens));
                }
            }
            Frame::Other => {}
        }
    }

    /// Events while collecting an image's alt text
    fn image_event(&mut self, event: Event<'_>) {
        match event {
            Event::Text(text) | Event::Code(text) | Event::InlineMath(text) => {
                if let Some(image) = self.image.as_mut() {
                    image.content.push_str(&text);
                }
            }
            Event::Start(_) => self.stack.push(Frame::Other),
            Event::End(_) => {
                if self.stack.pop() == Some(Frame::Image)
                    && let Some(image) = self.image.take()
                {
                    self.push_inline(image);
                }
            }
            _ => {}
        }
    }

    /// A paragraph containing only display math becomes a math block
    fn close_paragraph(&mut self) {
        let children = self.inline.take().unwrap_or_default();
        let mut meaningful = children
            .iter()
            .filter(|t| !(t.kind == TokenKind::Text && t.content.trim().is_empty()));
        if let (Some(math), None) = (meaningful.next(), meaningful.next())
            && math.kind == TokenKind::MathInlineDouble
        {
            let content = math.content.clone();
            let out = self.out();
            if out.last().map(|t| t.kind) == Some(TokenKind::ParagraphOpen) {
                out.pop();
            }
            self.level = self.level.saturating_sub(1);
            self.push_block(Token::new(TokenKind::MathBlock, self.level).with_content(content));
            return;
        }
        self.inline = Some(children);
        self.flush_inline();
        self.close(TokenKind::ParagraphClose);
    }

    fn close_implicit_paragraph(&mut self) {
        if self.implicit_paragraph {
            self.implicit_paragraph = false;
            self.close_paragraph();
        }
    }

    /// Open an implicit paragraph for inline content outside any paragraph
    fn ensure_inline(&mut self) {
        if self.inline.is_none() {
            self.open(TokenKind::ParagraphOpen, |t| t);
            self.inline = Some(Vec::new());
            self.implicit_paragraph = true;
        }
    }

    fn push_inline(&mut self, token: Token) {
        self.ensure_inline();
        let Some(children) = self.inline.as_mut() else {
            return;
        };
        if token.kind == TokenKind::Text
            && let Some(last) = children.last_mut()
            && last.kind == TokenKind::Text
        {
            last.content.push_str(&token.content);
            return;
        }
        children.push(token);
    }

    fn flush_inline(&mut self) {
        let children = self.inline.take().unwrap_or_default();
        let level = self.level;
        self.push_block(Token::new(TokenKind::Inline, level).with_children(children));
    }

    fn open(&mut self, kind: TokenKind, build: impl FnOnce(Token) -> Token) {
        let token = build(Token::new(kind, self.level));
        self.push_block(token);
        self.level += 1;
    }

    fn close(&mut self, kind: TokenKind) {
        self.level = self.level.saturating_sub(1);
        self.push_block(Token::new(kind, self.level));
    }

    fn push_block(&mut self, token: Token) {
        self.out().push(token);
    }

    fn out(&mut self) -> &mut Vec<Token> {
        match self.footnote.as_mut() {
            Some((_, _, tokens)) => tokens,
            None => &mut self.tokens,
        }
    }

    fn reference_id(&mut self, label: &str) -> usize {
        match self.references.iter().position(|l| l == label) {
            Some(id) => id,
            None => {
                self.references.push(label.to_string());
                self.references.len() - 1
            }
        }
    }

    /// Append collected footnote definitions in first-reference order
    fn finish(mut self) -> Vec<Token> {
        self.close_implicit_paragraph();
        if self.definitions.is_empty() {
            return self.tokens;
        }

        let mut definitions: HashMap<String, Vec<Token>> = HashMap::new();
        let mut unreferenced = Vec::new();
        for (label, tokens) in std::mem::take(&mut self.definitions) {
            if self.references.contains(&label) {
                definitions.insert(label, tokens);
            } else {
                unreferenced.push((label, tokens));
            }
        }

        let mut ordered = Vec::new();
        for label in &self.references {
            if let Some(tokens) = definitions.remove(label) {
                ordered.push((label.clone(), tokens));
            }
        }
        ordered.extend(unreferenced);

        let mut out = std::mem::take(&mut self.tokens);
        out.push(Token::new(TokenKind::FootnoteBlockOpen, 0));
        for (label, tokens) in ordered {
            let id = self.reference_id(&label);
            let mut open = Token::new(TokenKind::FootnoteOpen, 1).with_attr("label", label);
            open.footnote_id = Some(id);
            out.push(open);
            out.extend(tokens);
            out.push(Token::new(TokenKind::FootnoteClose, 1));
        }
        out.push(Token::new(TokenKind::FootnoteBlockClose, 0));
        out
    }
}

/// Serialize a token stream to pretty JSON
#[cfg(feature = "json")]
pub fn tokens_to_json(tokens: &[Token]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tokens)
}
