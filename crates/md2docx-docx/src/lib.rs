//! md2docx-docx: document tree and `.docx` writer
//!
//! This crate provides:
//! - [`Block`] and [`Inline`]: the output document model
//! - [`BlockSink`]: the receiving end of the document builder
//! - [`DocxWriter`]: a sink that streams WordprocessingML and packages it
//!
//! # Example
//!
//! ```
//! use md2docx_docx::{Block, BlockSink, DocxWriter, Inline};
//!
//! let mut writer = DocxWriter::new();
//! writer.push_block(Block::heading(1, vec![Inline::text("Title")]));
//! writer.push_block(Block::paragraph(vec![Inline::text("Body")]));
//! let bytes = writer.finish().unwrap();
//! assert_eq!(&bytes[..2], b"PK");
//! ```

pub mod document;
pub mod package;
pub mod theme;
pub mod writer;

pub use document::{
    Align, Block, BlockSink, CodeBlock, CodeFragment, EmbeddedImage, Hyperlink, ImageFormat,
    Indent, Inline, LinkError, ListMarker, MathContent, RunStyle, Table, TableCell, TableRow,
    TextRun, spans_text,
};
pub use package::PackageError;
pub use writer::DocxWriter;
