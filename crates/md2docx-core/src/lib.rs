//! md2docx-core: Markdown to Word document conversion
//!
//! This crate provides:
//! - The document builder walking a Markdown token stream
//! - Inline run formatting (emphasis, links, math, images, footnote references)
//! - Syntax highlighting of fenced code
//! - Matrix, chart, graph and workflow diagrams rendered to PNG
//! - Local image probing and sizing
//!
//! # Example
//!
//! ```
//! use md2docx_core::{ConverterOptions, markdown_to_docx};
//!
//! let bytes = markdown_to_docx("# Title\n\nArea is $\\pi r^2$.", &ConverterOptions::default()).unwrap();
//! assert_eq!(&bytes[..2], b"PK");
//! ```

pub mod builder;
pub mod diagram;
pub mod highlight;
pub mod images;
pub mod inline;

pub use builder::{Builder, ConverterOptions, build_document, build_into};
pub use inline::{InlineOutput, format_inline};

use md_tokens::Token;
use md2docx_docx::{DocxWriter, PackageError};

/// Build a token stream straight into a packaged `.docx`
pub fn tokens_to_docx(tokens: &[Token], options: &ConverterOptions) -> Result<Vec<u8>, PackageError> {
    let mut writer = DocxWriter::new();
    build_into(tokens, options, &mut writer);
    log::debug!("wrote {} blocks", writer.block_count());
    writer.finish()
}

/// Convert Markdown source to `.docx` bytes
pub fn markdown_to_docx(markdown: &str, options: &ConverterOptions) -> Result<Vec<u8>, PackageError> {
    let tokens = md_tokens::parse(markdown);
    tokens_to_docx(&tokens, options)
}
