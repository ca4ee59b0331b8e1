//! Output document tree
//!
//! Blocks are produced one at a time and handed to a [`BlockSink`]; the
//! builder never holds the whole document.

use md2docx_math::MathNode;
use thiserror::Error;

/// Character formatting of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: bool,
    pub monospace: bool,
    pub superscript: bool,
    /// Background fill, hex RGB
    pub shading: Option<&'static str>,
    /// Text colour, hex RGB
    pub color: Option<&'static str>,
    /// Size in half-points
    pub size: Option<u32>,
}

impl RunStyle {
    pub fn bold() -> Self {
        RunStyle {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        RunStyle {
            italic: true,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: &'static str) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// A run of uniformly formatted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: RunStyle,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("empty link target")]
    Empty,
    #[error("invalid character in link target: {0:?}")]
    InvalidChar(char),
}

/// A clickable link around one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    target: String,
    pub run: TextRun,
}

impl Hyperlink {
    /// Build a link, rejecting targets that cannot be stored as a relationship
    pub fn new(target: impl Into<String>, run: TextRun) -> Result<Self, LinkError> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(LinkError::Empty);
        }
        if let Some(c) = target
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(LinkError::InvalidChar(c));
        }
        Ok(Self { target, run })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Raster formats accepted for embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }
}

/// Image bytes with their display size in EMU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width_emu: u64,
    pub height_emu: u64,
    pub description: String,
}

/// Inline content of a block
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(TextRun),
    Link(Hyperlink),
    Math(MathNode),
    Image(EmbeddedImage),
    Break,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::styled(text, RunStyle::default())
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Inline::Text(TextRun {
            text: text.into(),
            style,
        })
    }
}

/// Nesting context of a block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indent {
    /// List nesting level (0 outside lists)
    pub list_level: usize,
    /// Blockquote nesting depth (0 outside blockquotes)
    pub quote_depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet(char),
    Ordered(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub spans: Vec<Inline>,
    pub header: bool,
    pub align: Align,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// A rectangular table; every row has `columns` cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: usize,
    pub rows: Vec<TableRow>,
}

/// A piece of highlighted source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub text: String,
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub language: Option<String>,
    /// Source lines, each split into coloured fragments
    pub lines: Vec<Vec<CodeFragment>>,
    pub indent: Indent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MathContent {
    Native(MathNode),
    /// Source shown as text when translation failed
    Literal(String),
}

/// A block-level node of the output document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<Inline>,
        indent: Indent,
    },
    Paragraph {
        spans: Vec<Inline>,
        indent: Indent,
    },
    ListItem {
        /// `None` for a continuation paragraph of the same item
        marker: Option<ListMarker>,
        spans: Vec<Inline>,
        indent: Indent,
    },
    Table(Table),
    CodeBlock(CodeBlock),
    Math {
        content: MathContent,
        indent: Indent,
    },
    /// Centered standalone image
    Image(EmbeddedImage),
    Caption(String),
    /// Visible error marker
    Notice(String),
    HorizontalRule,
    FootnoteHeader(String),
    Footnote(Vec<Inline>),
}

impl Block {
    pub fn paragraph(spans: Vec<Inline>) -> Self {
        Block::Paragraph {
            spans,
            indent: Indent::default(),
        }
    }

    pub fn heading(level: u8, spans: Vec<Inline>) -> Self {
        Block::Heading {
            level,
            spans,
            indent: Indent::default(),
        }
    }

    /// Plain text of the block's spans, for inspection
    pub fn plain_text(&self) -> String {
        let spans = match self {
            Block::Heading { spans, .. }
            | Block::Paragraph { spans, .. }
            | Block::ListItem { spans, .. }
            | Block::Footnote(spans) => spans,
            Block::Caption(text) | Block::Notice(text) | Block::FootnoteHeader(text) => {
                return text.clone();
            }
            Block::CodeBlock(code) => {
                return code
                    .lines
                    .iter()
                    .map(|line| line.iter().map(|f| f.text.as_str()).collect::<String>())
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            _ => return String::new(),
        };
        spans_text(spans)
    }
}

pub fn spans_text(spans: &[Inline]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Inline::Text(run) => out.push_str(&run.text),
            Inline::Link(link) => out.push_str(&link.run.text),
            Inline::Break => out.push('\n'),
            Inline::Math(_) | Inline::Image(_) => {}
        }
    }
    out
}

/// Receiver of finished blocks, in document order
pub trait BlockSink {
    fn push_block(&mut self, block: Block);
}

impl BlockSink for Vec<Block> {
    fn push_block(&mut self, block: Block) {
        self.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> TextRun {
        TextRun {
            text: text.to_string(),
            style: RunStyle::default(),
        }
    }

    #[test]
    fn test_hyperlink_validation() {
        assert!(Hyperlink::new("https://example.com/a?b=c", run("x")).is_ok());
        assert_eq!(Hyperlink::new("  ", run("x")), Err(LinkError::Empty));
        assert_eq!(
            Hyperlink::new("https://exa mple.com", run("x")),
            Err(LinkError::InvalidChar(' '))
        );
    }

    #[test]
    fn test_plain_text() {
        let block = Block::paragraph(vec![
            Inline::text("a "),
            Inline::styled("b", RunStyle::bold()),
            Inline::Break,
            Inline::text("c"),
        ]);
        assert_eq!(block.plain_text(), "a b\nc");
    }

    #[test]
    fn test_vec_sink() {
        let mut blocks: Vec<Block> = Vec::new();
        blocks.push_block(Block::HorizontalRule);
        assert_eq!(blocks, vec![Block::HorizontalRule]);
    }
}
