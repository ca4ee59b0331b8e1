//! Syntax highlighting of code blocks
//!
//! Source is split into scope-annotated fragments by syntect, and each
//! fragment is coloured from a fixed table keyed by scope name.

use md2docx_docx::CodeFragment;
use once_cell::sync::Lazy;
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Common fence names and the syntax token they stand for
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("rb", "ruby"),
    ("cs", "csharp"),
    ("c#", "csharp"),
    ("c++", "cpp"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("yml", "yaml"),
    ("md", "markdown"),
    ("tex", "latex"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("m", "objectivec"),
    ("dockerfile", "docker"),
    ("plaintext", "text"),
    ("plain", "text"),
    ("txt", "text"),
    ("", "text"),
];

/// Scope names and their colours, matched from most to least specific
const SCOPE_COLORS: &[(&str, &str)] = &[
    ("keyword", "0000CC"),
    ("keyword.operator.word", "0000CC"),
    ("keyword.operator", "333333"),
    ("keyword.control.import", "7B307B"),
    ("storage.type", "267F99"),
    ("storage.modifier", "7B307B"),
    ("support.type", "267F99"),
    ("support.function", "795E26"),
    ("support.function.builtin", "267F99"),
    ("entity.name.type", "267F99"),
    ("entity.name.class", "267F99"),
    ("entity.name.function", "795E26"),
    ("entity.name.decorator", "795E26"),
    ("entity.name.tag", "800000"),
    ("entity.other.attribute-name", "FF0000"),
    ("meta.annotation", "795E26"),
    ("string", "A31515"),
    ("constant.character.escape", "EE0000"),
    ("constant.numeric", "098858"),
    ("comment", "6A9955"),
    ("punctuation", "333333"),
];

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("parse error: {0}")]
    Parse(#[from] syntect::parsing::ParsingError),
    #[error("scope error: {0:?}")]
    Scope(syntect::parsing::ScopeError),
}

/// Find the syntax for a fence language, falling back to plain text
pub fn find_syntax(language: &str) -> &'static SyntaxReference {
    let lang = language.trim().to_lowercase();
    let canonical = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lang)
        .map_or(lang.as_str(), |(_, name)| *name);

    [canonical, lang.as_str()]
        .into_iter()
        .find_map(|token| SYNTAXES.find_syntax_by_token(token))
        .or_else(|| {
            SYNTAXES
                .syntaxes()
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(canonical))
        })
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text())
}

/// Colour of the innermost scope that matches the table
fn scope_color(stack: &ScopeStack) -> Option<&'static str> {
    stack.as_slice().iter().rev().find_map(|scope| {
        let name = scope.build_string();
        let mut prefix = name.as_str();
        loop {
            if let Some((_, color)) = SCOPE_COLORS.iter().find(|(s, _)| *s == prefix) {
                return Some(*color);
            }
            match prefix.rfind('.') {
                Some(pos) => prefix = &prefix[..pos],
                None => return None,
            }
        }
    })
}

fn push_fragment(line: &mut Vec<CodeFragment>, text: &str, color: Option<&'static str>) {
    let text = text.trim_end_matches(['\n', '\r']);
    if text.is_empty() {
        return;
    }
    match line.last_mut() {
        Some(last) if last.color == color => last.text.push_str(text),
        _ => line.push(CodeFragment {
            text: text.to_string(),
            color,
        }),
    }
}

/// Split source into lines of coloured fragments
pub fn highlight(code: &str, language: &str) -> Result<Vec<Vec<CodeFragment>>, HighlightError> {
    let syntax = find_syntax(language);
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut lines = Vec::new();

    for source_line in LinesWithEndings::from(code) {
        let ops = state.parse_line(source_line, &SYNTAXES)?;
        let mut line = Vec::new();
        let mut pos = 0;
        for (offset, op) in ops {
            if offset > pos {
                push_fragment(&mut line, &source_line[pos..offset], scope_color(&stack));
                pos = offset;
            }
            stack.apply(&op).map_err(HighlightError::Scope)?;
        }
        push_fragment(&mut line, &source_line[pos..], scope_color(&stack));
        lines.push(line);
    }
    Ok(lines)
}

/// Uncoloured lines, used when highlighting is off or fails
pub fn plain_lines(code: &str) -> Vec<Vec<CodeFragment>> {
    code.lines()
        .map(|line| {
            let mut fragments = Vec::new();
            push_fragment(&mut fragments, line, None);
            fragments
        })
        .collect()
}
