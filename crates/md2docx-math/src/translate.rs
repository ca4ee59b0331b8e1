//! MathML to native math tree translation
//!
//! Row-like elements are scanned for a table wrapped in operator
//! delimiters, which is how matrices, determinants and case tables arrive
//! from the MathML stage. Everything else maps node by node. Incomplete
//! elements (a fraction with one operand, a script without its base) are
//! dropped rather than reported.

use crate::mathml::{MathmlNode, MathmlTag, parse_mathml, render_mathml};
use crate::normalize::normalize_latex;
use crate::omml::{IdentStyle, MathNode, MatrixRow};
use thiserror::Error;

/// Reasons a LaTeX expression cannot be translated
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("empty expression")]
    Empty,
    #[error("LaTeX parse error: {0}")]
    Parse(String),
    #[error("MathML render error: {0}")]
    Render(String),
    #[error("unsupported LaTeX construct")]
    Unsupported,
    #[error("invalid MathML: {0}")]
    Mathml(String),
    #[error("expression produced no output")]
    NoOutput,
}

/// Inline or display rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MathMode {
    #[default]
    Inline,
    Display,
}

/// Big operators that take limits
const NARY_OPERATORS: &[char] = &[
    '∑', '∏', '∐', '∫', '∬', '∭', '∮', '∯', '∰', '⋃', '⋂', '⋁', '⋀', '⨀', '⨁', '⨂', '⨄',
    '⨆',
];

/// Translate a LaTeX expression (without delimiters) into a math tree
pub fn latex_to_math(latex: &str, mode: MathMode) -> Result<MathNode, TranslateError> {
    let normalized = normalize_latex(latex.trim());
    if normalized.trim().is_empty() {
        return Err(TranslateError::Empty);
    }
    let mathml = render_mathml(&normalized, mode == MathMode::Display)?;
    translate_mathml(&mathml)
}

/// Translate a MathML document into a math tree
pub fn translate_mathml(mathml: &str) -> Result<MathNode, TranslateError> {
    let root = parse_mathml(mathml)?;
    let mut nodes = match root.tag {
        MathmlTag::Math => translate_row(&root.children),
        _ => args(&root),
    };
    nodes.retain(|n| !n.is_empty());
    match nodes.len() {
        0 => Err(TranslateError::NoOutput),
        1 => Ok(nodes.remove(0)),
        _ => Ok(MathNode::Group(nodes)),
    }
}

/// Append a translated node, splicing group children into `out`
fn push_flattened(out: &mut Vec<MathNode>, node: Option<MathNode>) {
    match node {
        Some(MathNode::Group(children)) => out.extend(children),
        Some(node) => out.push(node),
        None => {}
    }
}

/// Translate a node into a flattened argument slot
fn args(node: &MathmlNode) -> Vec<MathNode> {
    let mut out = Vec::new();
    push_flattened(&mut out, translate(node));
    out
}

fn group(mut nodes: Vec<MathNode>) -> Option<MathNode> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(MathNode::Group(nodes)),
    }
}

/// A table, possibly wrapped in single-child rows
fn is_table(node: &MathmlNode) -> bool {
    match node.tag {
        MathmlTag::Mtable => true,
        MathmlTag::Mrow | MathmlTag::Mstyle => {
            node.children.len() == 1 && node.text.trim().is_empty() && is_table(&node.children[0])
        }
        _ => false,
    }
}

/// Translate a row of siblings, detecting delimiter-wrapped tables
fn translate_row(children: &[MathmlNode]) -> Vec<MathNode> {
    let mut out = Vec::new();

    if let Some(idx) = children.iter().position(is_table) {
        let has_open = idx > 0 && children[idx - 1].is(&MathmlTag::Mo);
        let has_close = children
            .get(idx + 1)
            .is_some_and(|c| c.is(&MathmlTag::Mo));

        if has_open || has_close {
            let start = if has_open { idx - 1 } else { idx };
            for child in &children[..start] {
                push_flattened(&mut out, translate(child));
            }

            let open = if has_open {
                children[idx - 1].full_text()
            } else {
                String::new()
            };
            let close = if has_close {
                children[idx + 1].full_text()
            } else {
                String::new()
            };
            out.push(MathNode::Delimited {
                open,
                close,
                separator: String::new(),
                items: vec![args(&children[idx])],
            });

            let end = if has_close { idx + 2 } else { idx + 1 };
            out.extend(translate_row(&children[end..]));
            return out;
        }
    }

    for child in children {
        push_flattened(&mut out, translate(child));
    }
    out
}

fn leaf_text(node: &MathmlNode) -> Option<String> {
    let text = node.full_text();
    if text.is_empty() { None } else { Some(text) }
}

fn translate(node: &MathmlNode) -> Option<MathNode> {
    let children = &node.children;
    match &node.tag {
        MathmlTag::Math | MathmlTag::Mrow | MathmlTag::Mtr | MathmlTag::Mtd => {
            let mut nodes = translate_row(children);
            if let Some(text) = direct_text(node) {
                nodes.insert(0, MathNode::Text(text));
            }
            group(nodes)
        }
        MathmlTag::Mi => leaf_text(node).map(|text| identifier(node, text)),
        MathmlTag::Mn => leaf_text(node).map(MathNode::Number),
        MathmlTag::Mo => leaf_text(node).map(MathNode::Operator),
        MathmlTag::Mtext | MathmlTag::Ms => leaf_text(node).map(MathNode::Text),
        MathmlTag::Mspace => Some(MathNode::Space),
        MathmlTag::Mfrac => {
            if children.len() < 2 {
                return None;
            }
            let bar = !matches!(
                node.attr("linethickness").map(str::trim),
                Some("0" | "0px" | "0em" | "0pt")
            );
            Some(MathNode::Fraction {
                num: args(&children[0]),
                den: args(&children[1]),
                bar,
            })
        }
        MathmlTag::Msqrt => Some(MathNode::Radical {
            degree: None,
            base: translate_row(children),
        }),
        MathmlTag::Mroot => {
            if children.len() < 2 {
                return None;
            }
            Some(MathNode::Radical {
                degree: Some(args(&children[1])),
                base: args(&children[0]),
            })
        }
        MathmlTag::Msup => {
            if children.len() < 2 {
                return None;
            }
            Some(MathNode::Sup {
                base: args(&children[0]),
                sup: args(&children[1]),
            })
        }
        MathmlTag::Msub => {
            if children.len() < 2 {
                return None;
            }
            Some(MathNode::Sub {
                base: args(&children[0]),
                sub: args(&children[1]),
            })
        }
        MathmlTag::Msubsup => {
            if children.len() < 3 {
                return None;
            }
            if let Some(chr) = nary_char(&children[0]) {
                return Some(MathNode::Nary {
                    chr,
                    sub: args(&children[1]),
                    sup: args(&children[2]),
                    base: Vec::new(),
                });
            }
            Some(MathNode::SubSup {
                base: args(&children[0]),
                sub: args(&children[1]),
                sup: args(&children[2]),
            })
        }
        MathmlTag::Mover => {
            if children.len() < 2 {
                return None;
            }
            let base = args(&children[0]);
            match accent_char(&children[1].full_text()) {
                Some(chr) => Some(MathNode::Accent { chr, base }),
                None => Some(MathNode::UpperLimit {
                    base,
                    limit: args(&children[1]),
                }),
            }
        }
        MathmlTag::Munder => {
            if children.len() < 2 {
                return None;
            }
            Some(MathNode::LowerLimit {
                base: args(&children[0]),
                limit: args(&children[1]),
            })
        }
        MathmlTag::Munderover => {
            if children.len() < 3 {
                return None;
            }
            if let Some(chr) = nary_char(&children[0]) {
                return Some(MathNode::Nary {
                    chr,
                    sub: args(&children[1]),
                    sup: args(&children[2]),
                    base: Vec::new(),
                });
            }
            Some(MathNode::Sup {
                base: vec![MathNode::LowerLimit {
                    base: args(&children[0]),
                    limit: args(&children[1]),
                }],
                sup: args(&children[2]),
            })
        }
        MathmlTag::Mfenced => {
            let separator = node
                .attr("separators")
                .unwrap_or(",")
                .trim()
                .chars()
                .next()
                .map(String::from)
                .unwrap_or_default();
            Some(MathNode::Delimited {
                open: node.attr("open").unwrap_or("(").to_string(),
                close: node.attr("close").unwrap_or(")").to_string(),
                separator,
                items: children
                    .iter()
                    .map(args)
                    .filter(|item| !item.is_empty())
                    .collect(),
            })
        }
        MathmlTag::Mtable => matrix(node),
        MathmlTag::Mlabeledtr => group(translate_row(children.get(1..).unwrap_or_default())),
        MathmlTag::Mpadded
        | MathmlTag::Mstyle
        | MathmlTag::Menclose
        | MathmlTag::Mphantom
        | MathmlTag::Merror
        | MathmlTag::Semantics => group(translate_row(children)),
        MathmlTag::Annotation | MathmlTag::AnnotationXml => None,
        MathmlTag::Other(name) => {
            log::debug!("translating unknown MathML element <{name}> by content");
            match direct_text(node) {
                Some(text) if children.is_empty() => Some(MathNode::Text(text)),
                _ => group(translate_row(children)),
            }
        }
    }
}

/// Direct (non-element) text of a container, trimmed
fn direct_text(node: &MathmlNode) -> Option<String> {
    let text = node.text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn identifier(node: &MathmlNode, text: String) -> MathNode {
    match node.attr("mathvariant") {
        Some("double-struck") => MathNode::Identifier {
            text: text.chars().map(double_struck).collect(),
            style: IdentStyle::Plain,
        },
        Some("normal") => MathNode::Identifier {
            text,
            style: IdentStyle::Plain,
        },
        _ => MathNode::identifier(text),
    }
}

fn double_struck(c: char) -> char {
    match c {
        'C' => 'ℂ',
        'H' => 'ℍ',
        'N' => 'ℕ',
        'P' => 'ℙ',
        'Q' => 'ℚ',
        'R' => 'ℝ',
        'Z' => 'ℤ',
        'A'..='Z' => char::from_u32(0x1D538 + (c as u32 - 'A' as u32)).unwrap_or(c),
        'a'..='z' => char::from_u32(0x1D552 + (c as u32 - 'a' as u32)).unwrap_or(c),
        _ => c,
    }
}

/// Build a matrix from `mtable`, padding short rows
fn matrix(node: &MathmlNode) -> Option<MathNode> {
    let mut rows: Vec<MatrixRow> = node
        .children
        .iter()
        .map(|row| {
            let cells = match row.tag {
                MathmlTag::Mtr => row.children.iter().map(cell).collect(),
                MathmlTag::Mlabeledtr => row.children.iter().skip(1).map(cell).collect(),
                _ => vec![cell(row)],
            };
            MatrixRow { cells }
        })
        .collect();

    if rows.is_empty() {
        return None;
    }
    let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0).max(1);
    for row in &mut rows {
        row.cells.resize_with(columns, Vec::new);
    }
    Some(MathNode::Matrix { columns, rows })
}

fn cell(node: &MathmlNode) -> Vec<MathNode> {
    match node.tag {
        MathmlTag::Mtd => {
            let mut out = Vec::new();
            if let Some(text) = direct_text(node) {
                out.push(MathNode::Text(text));
            }
            out.extend(translate_row(&node.children));
            out
        }
        _ => args(node),
    }
}

fn nary_char(node: &MathmlNode) -> Option<char> {
    if !matches!(node.tag, MathmlTag::Mo | MathmlTag::Mi) {
        return None;
    }
    let text = node.full_text();
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if NARY_OPERATORS.contains(&c) => Some(c),
        _ => None,
    }
}

/// Map an over-script to a combining accent character
fn accent_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(match c {
        '^' | 'ˆ' | '\u{0302}' => '\u{0302}',
        '~' | '˜' | '\u{0303}' => '\u{0303}',
        '¯' | 'ˉ' | '‾' | '―' | '\u{0304}' | '\u{0305}' => '\u{0305}',
        '→' | '\u{20D7}' => '\u{20D7}',
        '˙' | '\u{0307}' => '\u{0307}',
        '¨' | '\u{0308}' => '\u{0308}',
        'ˇ' | '\u{030C}' => '\u{030C}',
        '˘' | '\u{0306}' => '\u{0306}',
        '´' | '\u{0301}' => '\u{0301}',
        '`' | '\u{0300}' => '\u{0300}',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math(body: &str) -> String {
        format!(r#"<math xmlns="http://www.w3.org/1998/Math/MathML">{body}</math>"#)
    }

    /// No group appears inside another node's argument slots
    fn assert_flat(node: &MathNode, root: bool) {
        let slots: Vec<&Vec<MathNode>> = match node {
            MathNode::Group(children) => {
                assert!(root, "nested group found");
                vec![children]
            }
            MathNode::Fraction { num, den, .. } => vec![num, den],
            MathNode::Radical { degree, base } => {
                let mut v = vec![base];
                if let Some(d) = degree {
                    v.push(d);
                }
                v
            }
            MathNode::Sup { base, sup } => vec![base, sup],
            MathNode::Sub { base, sub } => vec![base, sub],
            MathNode::SubSup { base, sub, sup } => vec![base, sub, sup],
            MathNode::Accent { base, .. } => vec![base],
            MathNode::UpperLimit { base, limit } | MathNode::LowerLimit { base, limit } => {
                vec![base, limit]
            }
            MathNode::Nary { sub, sup, base, .. } => vec![sub, sup, base],
            MathNode::Delimited { items, .. } => items.iter().collect(),
            MathNode::Matrix { rows, .. } => rows.iter().flat_map(|r| r.cells.iter()).collect(),
            _ => vec![],
        };
        for slot in slots {
            for child in slot {
                assert!(!matches!(child, MathNode::Group(_)), "group in slot");
                assert_flat(child, false);
            }
        }
    }

    #[test]
    fn test_superscript_from_mathml() {
        let node = translate_mathml(&math("<msup><mi>x</mi><mn>2</mn></msup>")).unwrap();
        assert_eq!(
            node,
            MathNode::Sup {
                base: vec![MathNode::Identifier {
                    text: "x".to_string(),
                    style: IdentStyle::Italic
                }],
                sup: vec![MathNode::Number("2".to_string())],
            }
        );
    }

    #[test]
    fn test_bracketed_matrix_pattern() {
        let node = translate_mathml(&math(
            "<mrow><mo>[</mo><mtable><mtr><mtd><mn>1</mn></mtd><mtd><mn>2</mn></mtd></mtr>\
             <mtr><mtd><mn>3</mn></mtd></mtr></mtable><mo>]</mo></mrow>",
        ))
        .unwrap();
        let MathNode::Delimited {
            open, close, items, ..
        } = &node
        else {
            panic!("expected delimited group, got {node:?}");
        };
        assert_eq!(open, "[");
        assert_eq!(close, "]");
        let MathNode::Matrix { columns, rows } = &items[0][0] else {
            panic!("expected matrix");
        };
        assert_eq!(*columns, 2);
        // short row padded
        assert_eq!(rows[1].cells.len(), 2);
        assert!(rows[1].cells[1].is_empty());
    }

    #[test]
    fn test_cases_pattern_has_empty_close() {
        let node = translate_mathml(&math(
            "<mrow><mi>f</mi><mo>=</mo><mo>{</mo><mtable><mtr><mtd><mn>1</mn></mtd></mtr></mtable></mrow>",
        ))
        .unwrap();
        let MathNode::Group(children) = node else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[0], MathNode::Identifier { text, .. } if text == "f"));
        assert!(matches!(&children[1], MathNode::Operator(op) if op == "="));
        assert!(matches!(
            &children[2],
            MathNode::Delimited { open, close, .. } if open == "{" && close.is_empty()
        ));
    }

    #[test]
    fn test_embedded_matrix_keeps_suffix() {
        let node = translate_mathml(&math(
            "<mi>I</mi><mo>=</mo><mo>(</mo><mtable><mtr><mtd><mn>1</mn></mtd></mtr></mtable><mo>)</mo><mi>v</mi>",
        ))
        .unwrap();
        let MathNode::Group(children) = &node else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 4);
        assert!(matches!(&children[2], MathNode::Delimited { open, close, .. } if open == "(" && close == ")"));
        assert!(matches!(&children[3], MathNode::Identifier { text, .. } if text == "v"));
        assert_flat(&node, true);
    }

    #[test]
    fn test_incomplete_nodes_are_skipped() {
        let node = translate_mathml(&math("<mi>a</mi><mfrac><mn>1</mn></mfrac><msup><mi>b</mi></msup>"))
            .unwrap();
        assert!(matches!(node, MathNode::Identifier { ref text, .. } if text == "a"));
        assert!(matches!(
            translate_mathml(&math("<mfrac><mn>1</mn></mfrac>")),
            Err(TranslateError::NoOutput)
        ));
    }

    #[test]
    fn test_accent_and_upper_limit() {
        let accent = translate_mathml(&math("<mover><mi>x</mi><mo>^</mo></mover>")).unwrap();
        assert!(matches!(accent, MathNode::Accent { chr: '\u{0302}', .. }));

        let upper = translate_mathml(&math("<mover><mo>=</mo><mtext>def</mtext></mover>")).unwrap();
        assert!(matches!(upper, MathNode::UpperLimit { .. }));
    }

    #[test]
    fn test_underover_classification() {
        let sum = translate_mathml(&math(
            "<munderover><mo>∑</mo><mrow><mi>i</mi><mo>=</mo><mn>1</mn></mrow><mi>n</mi></munderover>",
        ))
        .unwrap();
        let MathNode::Nary { chr, sub, sup, .. } = &sum else {
            panic!("expected n-ary");
        };
        assert_eq!(*chr, '∑');
        assert_eq!(sub.len(), 3);
        assert_eq!(sup.len(), 1);

        let generic = translate_mathml(&math(
            "<munderover><mo>→</mo><mi>a</mi><mi>b</mi></munderover>",
        ))
        .unwrap();
        let MathNode::Sup { base, .. } = &generic else {
            panic!("expected superscript");
        };
        assert!(matches!(base[0], MathNode::LowerLimit { .. }));

        let under = translate_mathml(&math("<munder><mo>∑</mo><mi>i</mi></munder>")).unwrap();
        assert!(matches!(under, MathNode::LowerLimit { .. }));
    }

    #[test]
    fn test_fenced_and_fraction_attrs() {
        let fenced =
            translate_mathml(&math(r#"<mfenced open="[" close=")"><mi>a</mi><mi>b</mi></mfenced>"#))
                .unwrap();
        assert!(matches!(
            fenced,
            MathNode::Delimited { ref open, ref close, ref separator, ref items }
                if open == "[" && close == ")" && separator == "," && items.len() == 2
        ));

        let binom = translate_mathml(&math(
            r#"<mfrac linethickness="0"><mi>n</mi><mi>k</mi></mfrac>"#,
        ))
        .unwrap();
        assert!(matches!(binom, MathNode::Fraction { bar: false, .. }));
    }

    #[test]
    fn test_latex_fraction() {
        let node = latex_to_math(r"\frac{1}{2}", MathMode::Inline).unwrap();
        assert!(!node.is_empty());
        assert!(node.to_omml().contains("<m:f>"));
    }

    #[test]
    fn test_latex_accent() {
        let node = latex_to_math(r"\hat{x}", MathMode::Inline).unwrap();
        assert!(!node.is_empty());
        assert!(node.to_omml().contains("<m:acc>"));
    }

    #[test]
    fn test_latex_bmatrix() {
        let node = latex_to_math(
            r"\begin{bmatrix} a & b \\ c & d \end{bmatrix}",
            MathMode::Display,
        )
        .unwrap();
        assert!(!node.is_empty());
        let xml = node.to_omml();
        assert!(xml.contains("<m:m>"));
        assert_eq!(xml.matches("<m:mr>").count(), 2);
        assert_flat(&node, true);
    }

    #[test]
    fn test_latex_superscript() {
        let node = latex_to_math("x^2", MathMode::Inline).unwrap();
        assert!(matches!(node, MathNode::Sup { .. }));
    }

    #[test]
    fn test_latex_malformed_is_error() {
        assert!(latex_to_math(r"\frac{a}{b", MathMode::Inline).is_err());
        assert!(matches!(
            latex_to_math("   ", MathMode::Inline),
            Err(TranslateError::Empty)
        ));
    }

    #[test]
    fn test_latex_shorthand_expanded() {
        let node = latex_to_math(r"x \in \R", MathMode::Inline).unwrap();
        let xml = node.to_omml();
        assert!(xml.contains('ℝ') || xml.contains('R'));
    }
}
