//! LaTeX to MathML rendering and MathML parsing
//!
//! LaTeX is rendered to MathML by pulldown-latex, then parsed into a small
//! owned tree with a closed set of element tags.

use crate::translate::TranslateError;
use pulldown_latex::config::{DisplayMode, RenderConfig};
use pulldown_latex::{Parser, Storage, push_mathml};
use std::panic::{self, AssertUnwindSafe};

/// MathML presentation elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathmlTag {
    Math,
    Mrow,
    Mi,
    Mn,
    Mo,
    Mtext,
    Ms,
    Mspace,
    Mfrac,
    Msqrt,
    Mroot,
    Msup,
    Msub,
    Msubsup,
    Mover,
    Munder,
    Munderover,
    Mfenced,
    Mtable,
    Mtr,
    Mlabeledtr,
    Mtd,
    Mpadded,
    Mstyle,
    Menclose,
    Mphantom,
    Merror,
    Semantics,
    Annotation,
    AnnotationXml,
    Other(String),
}

impl MathmlTag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "math" => MathmlTag::Math,
            "mrow" => MathmlTag::Mrow,
            "mi" => MathmlTag::Mi,
            "mn" => MathmlTag::Mn,
            "mo" => MathmlTag::Mo,
            "mtext" => MathmlTag::Mtext,
            "ms" => MathmlTag::Ms,
            "mspace" => MathmlTag::Mspace,
            "mfrac" => MathmlTag::Mfrac,
            "msqrt" => MathmlTag::Msqrt,
            "mroot" => MathmlTag::Mroot,
            "msup" => MathmlTag::Msup,
            "msub" => MathmlTag::Msub,
            "msubsup" => MathmlTag::Msubsup,
            "mover" => MathmlTag::Mover,
            "munder" => MathmlTag::Munder,
            "munderover" => MathmlTag::Munderover,
            "mfenced" => MathmlTag::Mfenced,
            "mtable" => MathmlTag::Mtable,
            "mtr" => MathmlTag::Mtr,
            "mlabeledtr" => MathmlTag::Mlabeledtr,
            "mtd" => MathmlTag::Mtd,
            "mpadded" => MathmlTag::Mpadded,
            "mstyle" => MathmlTag::Mstyle,
            "menclose" => MathmlTag::Menclose,
            "mphantom" => MathmlTag::Mphantom,
            "merror" => MathmlTag::Merror,
            "semantics" => MathmlTag::Semantics,
            "annotation" => MathmlTag::Annotation,
            "annotation-xml" => MathmlTag::AnnotationXml,
            other => MathmlTag::Other(other.to_string()),
        }
    }
}

/// An owned MathML element
#[derive(Debug, Clone, PartialEq)]
pub struct MathmlNode {
    pub tag: MathmlTag,
    pub attrs: Vec<(String, String)>,
    /// Concatenated direct text content
    pub text: String,
    /// Element children, in document order
    pub children: Vec<MathmlNode>,
}

impl MathmlNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All descendant text, trimmed
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out.trim().to_string()
    }

    pub fn is(&self, tag: &MathmlTag) -> bool {
        &self.tag == tag
    }
}

fn collect_text(node: &MathmlNode, out: &mut String) {
    out.push_str(&node.text);
    for child in &node.children {
        collect_text(child, out);
    }
}

/// Render LaTeX to a MathML string
///
/// Any parser error event fails the whole expression. The renderer is
/// guarded against panics on constructs it does not implement.
pub fn render_mathml(latex: &str, display: bool) -> Result<String, TranslateError> {
    let storage = Storage::new();
    let events: Vec<_> = Parser::new(latex, &storage).collect();
    if let Some(Err(e)) = events.iter().find(|event| event.is_err()) {
        return Err(TranslateError::Parse(e.to_string()));
    }

    let config = RenderConfig {
        display_mode: if display {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        },
        xml: true,
        ..Default::default()
    };

    let mut mathml = String::new();
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
        push_mathml(&mut mathml, events.into_iter(), config)
    }));
    match rendered {
        Ok(Ok(())) => Ok(mathml.replace("&nbsp;", "&#160;")),
        Ok(Err(e)) => Err(TranslateError::Render(e.to_string())),
        Err(_) => Err(TranslateError::Unsupported),
    }
}

/// Parse a MathML document into an owned tree
pub fn parse_mathml(mathml: &str) -> Result<MathmlNode, TranslateError> {
    let doc = roxmltree::Document::parse(mathml)
        .map_err(|e| TranslateError::Mathml(e.to_string()))?;
    Ok(convert_element(doc.root_element()))
}

fn convert_element(node: roxmltree::Node<'_, '_>) -> MathmlNode {
    let mut text = String::new();
    let mut children = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert_element(child));
        } else if child.is_text()
            && let Some(t) = child.text()
        {
            text.push_str(t);
        }
    }

    MathmlNode {
        tag: MathmlTag::from_name(node.tag_name().name()),
        attrs: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        text,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_mathml() {
        let node = parse_mathml(
            r#"<math xmlns="http://www.w3.org/1998/Math/MathML"><mrow><mi>x</mi><mo>=</mo><mn>1</mn></mrow></math>"#,
        )
        .unwrap();
        assert_eq!(node.tag, MathmlTag::Math);
        assert_eq!(node.children[0].tag, MathmlTag::Mrow);
        assert_eq!(node.children[0].children.len(), 3);
        assert_eq!(node.full_text(), "x=1");
    }

    #[test]
    fn test_unknown_tag_kept() {
        let node = parse_mathml("<math><mglyph alt=\"g\"/></math>").unwrap();
        assert_eq!(
            node.children[0].tag,
            MathmlTag::Other("mglyph".to_string())
        );
        assert_eq!(node.children[0].attr("alt"), Some("g"));
    }

    #[test]
    fn test_render_simple_expression() {
        let mathml = render_mathml("x^2", false).unwrap();
        assert!(mathml.contains("<msup>"));
        assert!(parse_mathml(&mathml).is_ok());
    }

    #[test]
    fn test_render_rejects_unbalanced_group() {
        assert!(render_mathml(r"\frac{a}{b", false).is_err());
    }
}
