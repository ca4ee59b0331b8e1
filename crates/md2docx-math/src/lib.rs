//! md2docx-math: LaTeX math to Office Math translation
//!
//! This crate provides:
//! - Shorthand macro normalization for LaTeX input
//! - LaTeX to MathML rendering and MathML parsing
//! - Translation of MathML into a native [`MathNode`] tree
//! - OMML serialization of that tree
//!
//! # Example
//!
//! ```
//! use md2docx_math::{latex_to_math, MathMode};
//!
//! let node = latex_to_math(r"\frac{1}{2}", MathMode::Inline).unwrap();
//! assert!(node.to_omml().contains("<m:f>"));
//! ```

pub mod mathml;
pub mod normalize;
pub mod omml;
pub mod translate;

pub use mathml::{MathmlNode, MathmlTag};
pub use normalize::normalize_latex;
pub use omml::{IdentStyle, MathNode, MatrixRow};
pub use translate::{MathMode, TranslateError, latex_to_math, translate_mathml};
