//! Native math expression tree and its OMML serialization
//!
//! Argument slots (numerator, base, limits, cells) hold flattened sibling
//! sequences, so a [`MathNode::Group`] only ever appears as the outermost
//! translation result.

use quick_xml::escape::escape;

/// Run styling for identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentStyle {
    Italic,
    Plain,
}

/// A math expression node
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    /// Sibling sequence
    Group(Vec<MathNode>),
    Identifier {
        text: String,
        style: IdentStyle,
    },
    Number(String),
    Operator(String),
    Text(String),
    Space,
    Fraction {
        num: Vec<MathNode>,
        den: Vec<MathNode>,
        bar: bool,
    },
    Radical {
        degree: Option<Vec<MathNode>>,
        base: Vec<MathNode>,
    },
    Sup {
        base: Vec<MathNode>,
        sup: Vec<MathNode>,
    },
    Sub {
        base: Vec<MathNode>,
        sub: Vec<MathNode>,
    },
    SubSup {
        base: Vec<MathNode>,
        sub: Vec<MathNode>,
        sup: Vec<MathNode>,
    },
    Accent {
        chr: char,
        base: Vec<MathNode>,
    },
    UpperLimit {
        base: Vec<MathNode>,
        limit: Vec<MathNode>,
    },
    LowerLimit {
        base: Vec<MathNode>,
        limit: Vec<MathNode>,
    },
    /// Big operator with limits
    Nary {
        chr: char,
        sub: Vec<MathNode>,
        sup: Vec<MathNode>,
        base: Vec<MathNode>,
    },
    /// Bracketed expression; either delimiter may be empty
    Delimited {
        open: String,
        close: String,
        separator: String,
        items: Vec<Vec<MathNode>>,
    },
    Matrix {
        columns: usize,
        rows: Vec<MatrixRow>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub cells: Vec<Vec<MathNode>>,
}

impl MathNode {
    pub fn identifier(text: impl Into<String>) -> Self {
        let text = text.into();
        let style = identifier_style(&text);
        MathNode::Identifier { text, style }
    }

    /// Serialize as an inline `m:oMath` element
    pub fn to_omml(&self) -> String {
        let mut out = String::from("<m:oMath>");
        match self {
            MathNode::Group(children) => write_all(&mut out, children),
            node => write_node(&mut out, node),
        }
        out.push_str("</m:oMath>");
        out
    }

    /// Serialize as a display `m:oMathPara` element
    pub fn to_omml_para(&self) -> String {
        format!("<m:oMathPara>{}</m:oMathPara>", self.to_omml())
    }

    /// Whether the tree holds any visible content
    pub fn is_empty(&self) -> bool {
        match self {
            MathNode::Group(children) => children.iter().all(MathNode::is_empty),
            MathNode::Identifier { text, .. }
            | MathNode::Number(text)
            | MathNode::Operator(text)
            | MathNode::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

/// Single letters are italic, digits and multi-letter names upright
fn identifier_style(text: &str) -> IdentStyle {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_digit() => IdentStyle::Plain,
        (Some(_), None) => IdentStyle::Italic,
        _ => IdentStyle::Plain,
    }
}

fn write_all(out: &mut String, nodes: &[MathNode]) {
    for node in nodes {
        write_node(out, node);
    }
}

fn write_run(out: &mut String, text: &str, plain: bool) {
    out.push_str("<m:r>");
    if plain {
        out.push_str(r#"<m:rPr><m:sty m:val="p"/></m:rPr>"#);
    }
    out.push_str(r#"<m:t xml:space="preserve">"#);
    out.push_str(&escape(text));
    out.push_str("</m:t></m:r>");
}

/// `<m:{tag}>...</m:{tag}>`, or an empty element for an empty slot
fn write_slot(out: &mut String, tag: &str, nodes: &[MathNode]) {
    if nodes.is_empty() {
        out.push_str(&format!("<m:{tag}/>"));
        return;
    }
    out.push_str(&format!("<m:{tag}>"));
    write_all(out, nodes);
    out.push_str(&format!("</m:{tag}>"));
}

fn write_val(out: &mut String, tag: &str, value: &str) {
    out.push_str(&format!(r#"<m:{tag} m:val="{}"/>"#, escape(value)));
}

fn write_node(out: &mut String, node: &MathNode) {
    match node {
        MathNode::Group(children) => write_all(out, children),
        MathNode::Identifier { text, style } => write_run(out, text, *style == IdentStyle::Plain),
        MathNode::Number(text) | MathNode::Operator(text) => write_run(out, text, false),
        MathNode::Text(text) => write_run(out, text, true),
        MathNode::Space => write_run(out, "\u{2003}", false),
        MathNode::Fraction { num, den, bar } => {
            out.push_str("<m:f>");
            if !bar {
                out.push_str("<m:fPr>");
                write_val(out, "type", "noBar");
                out.push_str("</m:fPr>");
            }
            write_slot(out, "num", num);
            write_slot(out, "den", den);
            out.push_str("</m:f>");
        }
        MathNode::Radical { degree, base } => {
            out.push_str("<m:rad>");
            match degree {
                Some(degree) => write_slot(out, "deg", degree),
                None => {
                    out.push_str("<m:radPr>");
                    write_val(out, "degHide", "1");
                    out.push_str("</m:radPr><m:deg/>");
                }
            }
            write_slot(out, "e", base);
            out.push_str("</m:rad>");
        }
        MathNode::Sup { base, sup } => {
            out.push_str("<m:sSup>");
            write_slot(out, "e", base);
            write_slot(out, "sup", sup);
            out.push_str("</m:sSup>");
        }
        MathNode::Sub { base, sub } => {
            out.push_str("<m:sSub>");
            write_slot(out, "e", base);
            write_slot(out, "sub", sub);
            out.push_str("</m:sSub>");
        }
        MathNode::SubSup { base, sub, sup } => {
            out.push_str("<m:sSubSup>");
            write_slot(out, "e", base);
            write_slot(out, "sub", sub);
            write_slot(out, "sup", sup);
            out.push_str("</m:sSubSup>");
        }
        MathNode::Accent { chr, base } => {
            out.push_str("<m:acc><m:accPr>");
            write_val(out, "chr", &chr.to_string());
            out.push_str("</m:accPr>");
            write_slot(out, "e", base);
            out.push_str("</m:acc>");
        }
        MathNode::UpperLimit { base, limit } => {
            out.push_str("<m:limUpp>");
            write_slot(out, "e", base);
            write_slot(out, "lim", limit);
            out.push_str("</m:limUpp>");
        }
        MathNode::LowerLimit { base, limit } => {
            out.push_str("<m:limLow>");
            write_slot(out, "e", base);
            write_slot(out, "lim", limit);
            out.push_str("</m:limLow>");
        }
        MathNode::Nary {
            chr,
            sub,
            sup,
            base,
        } => {
            out.push_str("<m:nary><m:naryPr>");
            write_val(out, "chr", &chr.to_string());
            write_val(out, "limLoc", "undOvr");
            if sub.is_empty() {
                write_val(out, "subHide", "1");
            }
            if sup.is_empty() {
                write_val(out, "supHide", "1");
            }
            out.push_str("</m:naryPr>");
            write_slot(out, "sub", sub);
            write_slot(out, "sup", sup);
            write_slot(out, "e", base);
            out.push_str("</m:nary>");
        }
        MathNode::Delimited {
            open,
            close,
            separator,
            items,
        } => {
            out.push_str("<m:d><m:dPr>");
            write_val(out, "begChr", open);
            if items.len() > 1 {
                write_val(out, "sepChr", separator);
            }
            write_val(out, "endChr", close);
            out.push_str("</m:dPr>");
            if items.is_empty() {
                out.push_str("<m:e/>");
            }
            for item in items {
                write_slot(out, "e", item);
            }
            out.push_str("</m:d>");
        }
        MathNode::Matrix { columns, rows } => {
            out.push_str("<m:m><m:mPr><m:mcs><m:mc><m:mcPr>");
            write_val(out, "count", &(*columns).max(1).to_string());
            write_val(out, "mcJc", "center");
            out.push_str("</m:mcPr></m:mc></m:mcs></m:mPr>");
            for row in rows {
                out.push_str("<m:mr>");
                for cell in &row.cells {
                    write_slot(out, "e", cell);
                }
                out.push_str("</m:mr>");
            }
            out.push_str("</m:m>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_style() {
        assert_eq!(identifier_style("x"), IdentStyle::Italic);
        assert_eq!(identifier_style("7"), IdentStyle::Plain);
        assert_eq!(identifier_style("sin"), IdentStyle::Plain);
    }

    #[test]
    fn test_superscript_omml() {
        let node = MathNode::Sup {
            base: vec![MathNode::identifier("x")],
            sup: vec![MathNode::Number("2".to_string())],
        };
        insta::assert_snapshot!(node.to_omml(), @r#"<m:oMath><m:sSup><m:e><m:r><m:t xml:space="preserve">x</m:t></m:r></m:e><m:sup><m:r><m:t xml:space="preserve">2</m:t></m:r></m:sup></m:sSup></m:oMath>"#);
    }

    #[test]
    fn test_fraction_without_bar() {
        let node = MathNode::Fraction {
            num: vec![MathNode::identifier("n")],
            den: vec![MathNode::identifier("k")],
            bar: false,
        };
        let xml = node.to_omml();
        assert!(xml.contains(r#"<m:type m:val="noBar"/>"#));
        assert!(xml.find("<m:num>") < xml.find("<m:den>"));
    }

    #[test]
    fn test_radical_hides_missing_degree() {
        let node = MathNode::Radical {
            degree: None,
            base: vec![MathNode::identifier("x")],
        };
        insta::assert_snapshot!(node.to_omml(), @r#"<m:oMath><m:rad><m:radPr><m:degHide m:val="1"/></m:radPr><m:deg/><m:e><m:r><m:t xml:space="preserve">x</m:t></m:r></m:e></m:rad></m:oMath>"#);
    }

    #[test]
    fn test_delimited_matrix() {
        let cell = |s: &str| vec![MathNode::Number(s.to_string())];
        let node = MathNode::Delimited {
            open: "[".to_string(),
            close: "]".to_string(),
            separator: String::new(),
            items: vec![vec![MathNode::Matrix {
                columns: 2,
                rows: vec![
                    MatrixRow {
                        cells: vec![cell("1"), cell("2")],
                    },
                    MatrixRow {
                        cells: vec![cell("3"), cell("4")],
                    },
                ],
            }]],
        };
        let xml = node.to_omml_para();
        assert!(xml.starts_with("<m:oMathPara><m:oMath><m:d>"));
        assert!(xml.contains(r#"<m:begChr m:val="["/>"#));
        assert!(xml.contains(r#"<m:count m:val="2"/>"#));
        assert_eq!(xml.matches("<m:mr>").count(), 2);
        assert!(!xml.contains("sepChr"));
    }

    #[test]
    fn test_escapes_operator_text() {
        let node = MathNode::Group(vec![
            MathNode::identifier("a"),
            MathNode::Operator("<".to_string()),
            MathNode::identifier("b"),
        ]);
        assert!(node.to_omml().contains("&lt;"));
    }

    #[test]
    fn test_nary_hides_empty_limits() {
        let node = MathNode::Nary {
            chr: '∫',
            sub: vec![],
            sup: vec![],
            base: vec![],
        };
        let xml = node.to_omml();
        assert!(xml.contains(r#"<m:subHide m:val="1"/>"#));
        assert!(xml.contains(r#"<m:supHide m:val="1"/>"#));
        assert!(xml.contains("<m:e/>"));
    }
}
