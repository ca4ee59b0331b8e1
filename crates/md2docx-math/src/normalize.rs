//! Shorthand macro normalization

/// Blackboard-bold shorthands and their expansions
const SHORTHANDS: &[(&str, &str)] = &[
    ("R", r"\mathbb{R}"),
    ("N", r"\mathbb{N}"),
    ("Z", r"\mathbb{Z}"),
    ("Q", r"\mathbb{Q}"),
    ("C", r"\mathbb{C}"),
];

/// Expand shorthand macros such as `\R` into forms the LaTeX parser knows.
///
/// A shorthand only matches as a whole control word, so `\Rightarrow` and
/// `\Complex` are left untouched.
pub fn normalize_latex(latex: &str) -> String {
    let mut out = String::with_capacity(latex.len() + 16);
    let mut rest = latex;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let word_len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());

        if word_len == 0 {
            // Control symbol such as `\\` or `\{`: copy it verbatim
            let symbol_len = after.chars().next().map_or(0, char::len_utf8);
            out.push('\\');
            out.push_str(&after[..symbol_len]);
            rest = &after[symbol_len..];
            continue;
        }

        let word = &after[..word_len];
        match SHORTHANDS.iter().find(|(name, _)| *name == word) {
            Some((_, expansion)) => out.push_str(expansion),
            None => {
                out.push('\\');
                out.push_str(word);
            }
        }
        rest = &after[word_len..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_shorthands() {
        assert_eq!(normalize_latex(r"x \in \R"), r"x \in \mathbb{R}");
        assert_eq!(
            normalize_latex(r"\N\subset\Z"),
            r"\mathbb{N}\subset\mathbb{Z}"
        );
        assert_eq!(normalize_latex(r"f: \C^2"), r"f: \mathbb{C}^2");
    }

    #[test]
    fn test_keeps_longer_control_words() {
        assert_eq!(normalize_latex(r"a \Rightarrow b"), r"a \Rightarrow b");
        assert_eq!(normalize_latex(r"\Complex"), r"\Complex");
        assert_eq!(normalize_latex(r"\Qquad"), r"\Qquad");
    }

    #[test]
    fn test_control_symbols_untouched() {
        assert_eq!(normalize_latex(r"a \\ \{ b \}"), r"a \\ \{ b \}");
        assert_eq!(normalize_latex("trailing \\"), "trailing \\");
    }
}
