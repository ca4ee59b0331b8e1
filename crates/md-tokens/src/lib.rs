//! md-tokens: Markdown token stream for document builders
//!
//! This crate provides:
//! - A flat token model with explicit open/close pairing
//! - An adapter from the pulldown-cmark event stream to that model
//!
//! # Example
//!
//! ```
//! use md_tokens::{parse, TokenKind};
//!
//! let tokens = parse("# Title\n\nSome *text*.");
//! assert_eq!(tokens[0].kind, TokenKind::HeadingOpen);
//! assert_eq!(tokens[0].tag.as_deref(), Some("h1"));
//! ```

pub mod parser;
pub mod token;

pub use parser::{parse, parser_options};
#[cfg(feature = "json")]
pub use parser::tokens_to_json;
pub use token::{Token, TokenKind};
