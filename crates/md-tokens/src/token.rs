//! Token types
//!
//! A document is a flat sequence of tokens. Container constructs are
//! represented by an `*Open` token and a matching `*Close` token at the
//! same nesting level; inline content of a paragraph, heading or table
//! cell lives in the `children` of a single [`TokenKind::Inline`] token.

use serde::Serialize;

/// A single token of the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Block nesting level (0 at the document root)
    pub level: usize,
    /// Element tag, e.g. `h2` for a heading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Fence info string (language and attributes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Literal content (code, math source, image alt text, raw HTML)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Inline children, only present on [`TokenKind::Inline`]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
    /// Attributes such as `href`, `src`, `style` or `start`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    /// 0-based footnote number, in first-reference order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footnote_id: Option<usize>,
}

/// The kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // Block level
    HeadingOpen,
    HeadingClose,
    ParagraphOpen,
    ParagraphClose,
    Inline,
    Fence,
    CodeBlock,
    MathBlock,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    ListItemOpen,
    ListItemClose,
    BlockquoteOpen,
    BlockquoteClose,
    TableOpen,
    TableClose,
    TheadOpen,
    TheadClose,
    TbodyOpen,
    TbodyClose,
    TrOpen,
    TrClose,
    ThOpen,
    ThClose,
    TdOpen,
    TdClose,
    Hr,
    HtmlBlock,
    FrontMatter,
    FootnoteBlockOpen,
    FootnoteBlockClose,
    FootnoteOpen,
    FootnoteClose,

    // Inline level
    Text,
    CodeInline,
    StrongOpen,
    StrongClose,
    EmOpen,
    EmClose,
    SOpen,
    SClose,
    LinkOpen,
    LinkClose,
    Image,
    MathInline,
    MathInlineDouble,
    Softbreak,
    Hardbreak,
    HtmlInline,
    FootnoteRef,
}

impl TokenKind {
    /// The closing kind paired with an opening kind
    pub fn closing(self) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match self {
            HeadingOpen => HeadingClose,
            ParagraphOpen => ParagraphClose,
            BulletListOpen => BulletListClose,
            OrderedListOpen => OrderedListClose,
            ListItemOpen => ListItemClose,
            BlockquoteOpen => BlockquoteClose,
            TableOpen => TableClose,
            TheadOpen => TheadClose,
            TbodyOpen => TbodyClose,
            TrOpen => TrClose,
            ThOpen => ThClose,
            TdOpen => TdClose,
            FootnoteBlockOpen => FootnoteBlockClose,
            FootnoteOpen => FootnoteClose,
            StrongOpen => StrongClose,
            EmOpen => EmClose,
            SOpen => SClose,
            LinkOpen => LinkClose,
            _ => return None,
        })
    }

    pub fn is_open(self) -> bool {
        self.closing().is_some()
    }
}

impl Token {
    pub fn new(kind: TokenKind, level: usize) -> Self {
        Self {
            kind,
            level,
            tag: None,
            info: None,
            content: String::new(),
            children: Vec::new(),
            attrs: Vec::new(),
            footnote_id: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    /// Text leaf
    pub fn text(content: impl Into<String>) -> Self {
        Token::new(TokenKind::Text, 0).with_content(content)
    }

    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_pairs() {
        assert_eq!(
            TokenKind::BlockquoteOpen.closing(),
            Some(TokenKind::BlockquoteClose)
        );
        assert_eq!(TokenKind::Fence.closing(), None);
        assert!(TokenKind::LinkOpen.is_open());
        assert!(!TokenKind::LinkClose.is_open());
    }

    #[test]
    fn test_attr_lookup() {
        let token = Token::new(TokenKind::Image, 0)
            .with_attr("src", "a.png")
            .with_attr("title", "A");
        assert_eq!(token.attr("src"), Some("a.png"));
        assert_eq!(token.attr("alt"), None);
    }
}
