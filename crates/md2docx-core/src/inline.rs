//! Inline run formatting
//!
//! Turns the children of one `Inline` token into styled spans. Images may
//! also produce caption blocks, which the caller places after the block
//! holding the spans.

use crate::builder::ConverterOptions;
use crate::images;
use log::{debug, warn};
use md_tokens::{Token, TokenKind};
use md2docx_docx::theme::{
    COLOR_ERROR, COLOR_INLINE_CODE_BG, COLOR_LINK, SIZE_CODE_INLINE, SIZE_SUPERSCRIPT,
};
use md2docx_docx::{Block, Hyperlink, Inline, RunStyle, TextRun};
use md2docx_math::{MathMode, latex_to_math};

/// Spans of one block plus blocks that must follow it
#[derive(Debug, Default)]
pub struct InlineOutput {
    pub spans: Vec<Inline>,
    pub trailing: Vec<Block>,
}

/// Format a sequence of inline tokens
pub fn format_inline(children: &[Token], options: &ConverterOptions) -> InlineOutput {
    let mut formatter = InlineFormatter::new(options);
    for token in children {
        formatter.token(token);
    }
    formatter.output
}

/// Formatting context, fresh for every block
struct InlineFormatter<'a> {
    options: &'a ConverterOptions,
    bold: bool,
    italic: bool,
    strike: bool,
    /// Target of the enclosing link, if any
    link: Option<String>,
    output: InlineOutput,
}

impl<'a> InlineFormatter<'a> {
    fn new(options: &'a ConverterOptions) -> Self {
        Self {
            options,
            bold: false,
            italic: false,
            strike: false,
            link: None,
            output: InlineOutput::default(),
        }
    }

    fn style(&self) -> RunStyle {
        RunStyle {
            bold: self.bold,
            italic: self.italic,
            strike: self.strike,
            ..Default::default()
        }
    }

    fn push(&mut self, span: Inline) {
        self.output.spans.push(span);
    }

    fn token(&mut self, token: &Token) {
        match token.kind {
            TokenKind::Text => self.text(&token.content),
            TokenKind::CodeInline => {
                let style = RunStyle {
                    monospace: true,
                    shading: Some(COLOR_INLINE_CODE_BG),
                    size: Some(SIZE_CODE_INLINE),
                    ..self.style()
                };
                self.push(Inline::styled(token.content.clone(), style));
            }
            TokenKind::StrongOpen => self.bold = true,
            TokenKind::StrongClose => self.bold = false,
            TokenKind::EmOpen => self.italic = true,
            TokenKind::EmClose => self.italic = false,
            TokenKind::SOpen => self.strike = true,
            TokenKind::SClose => self.strike = false,
            TokenKind::LinkOpen => self.link = token.attr("href").map(str::to_string),
            TokenKind::LinkClose => self.link = None,
            TokenKind::MathInline => self.math(&token.content, MathMode::Inline),
            TokenKind::MathInlineDouble => self.math(&token.content, MathMode::Display),
            TokenKind::Image => self.image(token),
            TokenKind::Softbreak | TokenKind::Hardbreak => self.push(Inline::Break),
            TokenKind::HtmlInline => {
                if is_line_break(&token.content) {
                    self.push(Inline::Break);
                } else {
                    debug!("skipping inline HTML: {}", token.content.trim());
                }
            }
            TokenKind::FootnoteRef => {
                let number = token.footnote_id.map_or(0, |id| id + 1);
                let style = RunStyle {
                    superscript: true,
                    color: Some(COLOR_LINK),
                    size: Some(SIZE_SUPERSCRIPT),
                    ..Default::default()
                };
                self.push(Inline::styled(format!("[{number}]"), style));
            }
            kind => debug!("skipping {kind:?} in inline content"),
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(target) = self.link.clone() else {
            let style = self.style();
            self.push(Inline::styled(text, style));
            return;
        };

        let style = RunStyle {
            underline: true,
            color: Some(COLOR_LINK),
            ..self.style()
        };
        let run = TextRun {
            text: text.to_string(),
            style,
        };
        match Hyperlink::new(target.as_str(), run.clone()) {
            Ok(link) => self.push(Inline::Link(link)),
            Err(e) => {
                warn!("link to {target:?} rendered as text: {e}");
                self.push(Inline::Text(run));
            }
        }
    }

    fn math(&mut self, latex: &str, mode: MathMode) {
        match latex_to_math(latex, mode) {
            Ok(node) => self.push(Inline::Math(node)),
            Err(e) => {
                warn!("math {latex:?} kept as text: {e}");
                let delimiter = if mode == MathMode::Display { "$$" } else { "$" };
                let style = RunStyle {
                    italic: true,
                    monospace: true,
                    size: Some(SIZE_CODE_INLINE),
                    ..Default::default()
                };
                self.push(Inline::styled(
                    format!("{delimiter}{latex}{delimiter}"),
                    style,
                ));
            }
        }
    }

    fn image(&mut self, token: &Token) {
        let alt = token.content.trim();
        let src = token.attr("src").unwrap_or_default().trim();
        if src.is_empty() {
            self.push(Inline::text(format!("[Image: {alt}]")));
            return;
        }

        let loaded = images::resolve_source(src, &self.options.base_dir).and_then(|path| {
            images::load_image(&path, self.options.image_max_width_emu, alt)
        });
        match loaded {
            Ok(image) => {
                self.push(Inline::Image(image));
                if !alt.is_empty() {
                    self.output.trailing.push(Block::Caption(alt.to_string()));
                }
            }
            Err(e) if e.is_missing() => {
                warn!("{e}");
                let style = RunStyle::italic().with_color(COLOR_ERROR);
                self.push(Inline::styled(format!("[Image not found: {src}]"), style));
            }
            Err(e) => {
                warn!("cannot embed {src}: {e}");
                self.push(Inline::text(format!("[Image: {}]", alt_or(alt, src))));
            }
        }
    }
}

fn alt_or<'a>(alt: &'a str, src: &'a str) -> &'a str {
    if alt.is_empty() { src } else { alt }
}

/// `<br>`, `<br/>` or `<br />`, in any case
fn is_line_break(html: &str) -> bool {
    let tag: String = html
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    tag == "<br>" || tag == "<br/>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_tokens::parse;
    use tempfile::TempDir;

    fn inline_children(markdown: &str) -> Vec<Token> {
        parse(markdown)
            .into_iter()
            .find(|t| t.kind == TokenKind::Inline)
            .map(|t| t.children)
            .unwrap_or_default()
    }

    fn format(markdown: &str) -> InlineOutput {
        format_inline(&inline_children(markdown), &ConverterOptions::default())
    }

    fn runs(spans: &[Inline]) -> Vec<(String, RunStyle)> {
        spans
            .iter()
            .filter_map(|span| match span {
                Inline::Text(run) => Some((run.text.clone(), run.style.clone())),
                Inline::Link(link) => Some((link.run.text.clone(), link.run.style.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_emphasis_toggles() {
        let output = format("a **b *c*** ~~d~~");
        let runs = runs(&output.spans);
        assert_eq!(runs[0].0, "a ");
        assert_eq!(runs[1], ("b ".to_string(), RunStyle::bold()));
        assert!(runs[2].1.bold && runs[2].1.italic);
        let strike = runs.iter().find(|(text, _)| text == "d").unwrap();
        assert!(strike.1.strike && !strike.1.bold);
    }

    #[test]
    fn test_stray_close_is_noop() {
        let children = vec![
            Token::new(TokenKind::StrongClose, 0),
            Token::text("plain"),
        ];
        let output = format_inline(&children, &ConverterOptions::default());
        assert_eq!(output.spans, vec![Inline::text("plain")]);
    }

    #[test]
    fn test_inline_code_keeps_emphasis() {
        let output = format("**`x`**");
        let (_, style) = &runs(&output.spans)[0];
        assert!(style.monospace && style.bold);
        assert_eq!(style.shading, Some(COLOR_INLINE_CODE_BG));
    }

    #[test]
    fn test_link_and_fallback() {
        let output = format("[site](https://example.com) and **[x](<a b>)**");
        let Inline::Link(link) = &output.spans[0] else {
            panic!("expected a hyperlink, got {:?}", output.spans[0]);
        };
        assert_eq!(link.target(), "https://example.com");
        assert!(link.run.style.underline);

        // A target with a space cannot be a relationship
        let last = output.spans.last().unwrap();
        let Inline::Text(run) = last else {
            panic!("expected plain text, got {last:?}");
        };
        assert_eq!(run.text, "x");
        assert!(run.style.underline && run.style.bold);
        assert_eq!(run.style.color, Some(COLOR_LINK));
    }

    #[test]
    fn test_math_and_fallback() {
        let children = vec![
            Token::new(TokenKind::MathInline, 0).with_content("x^2"),
            Token::text(" and "),
            Token::new(TokenKind::MathInline, 0).with_content(r"\frac{a}{b"),
        ];
        let output = format_inline(&children, &ConverterOptions::default());
        assert!(matches!(output.spans[0], Inline::Math(_)));
        let runs = runs(&output.spans);
        let fallback = runs.last().unwrap();
        assert_eq!(fallback.0, r"$\frac{a}{b$");
        assert!(fallback.1.monospace && fallback.1.italic);
    }

    #[test]
    fn test_breaks() {
        let output = format("one\ntwo  \nthree<br/>four");
        let breaks = output
            .spans
            .iter()
            .filter(|s| matches!(s, Inline::Break))
            .count();
        assert_eq!(breaks, 3);
        assert!(is_line_break("<BR />"));
        assert!(!is_line_break("<span>"));
    }

    #[test]
    fn test_footnote_reference_number() {
        let output = format("Text[^a].\n\n[^a]: Note");
        let runs = runs(&output.spans);
        let reference = runs.iter().find(|(text, _)| text == "[1]").unwrap();
        assert!(reference.1.superscript);
        assert_eq!(reference.1.size, Some(SIZE_SUPERSCRIPT));
    }

    #[test]
    fn test_missing_and_remote_images() {
        let output = format("![alt](missing.png) ![](https://example.com/a.png)");
        let runs = runs(&output.spans);
        assert_eq!(runs[0].0, "[Image not found: missing.png]");
        assert_eq!(runs[0].1.color, Some(COLOR_ERROR));
        assert_eq!(runs.last().unwrap().0, "[Image not found: https://example.com/a.png]");
        assert!(output.trailing.is_empty());
    }

    #[test]
    fn test_image_embeds_with_caption() {
        let dir = TempDir::new().unwrap();
        image::RgbImage::new(4, 2)
            .save(dir.path().join("pic.png"))
            .unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

        let options = ConverterOptions {
            base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let output = format_inline(
            &inline_children("![A picture](pic.png) ![](broken.png)"),
            &options,
        );
        let Inline::Image(image) = &output.spans[0] else {
            panic!("expected an image, got {:?}", output.spans[0]);
        };
        assert_eq!(image.width_emu, 2 * image.height_emu);
        assert_eq!(output.trailing, vec![Block::Caption("A picture".to_string())]);
        assert_eq!(
            output.spans.last(),
            Some(&Inline::text("[Image: broken.png]"))
        );
    }
}
