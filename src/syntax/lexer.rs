//! Automatic statement termination.
//!
//! Go terminates a statement at a line break when the line's final token is
//! an identifier, a literal, one of the keywords `break continue fallthrough
//! return`, or one of `++ -- ) ] }`. The grammar cannot see "final token of
//! the line", so this pass marks those line breaks ahead of parsing by
//! replacing them with [`TERMINATOR`]. Both characters are one byte wide, so
//! every offset in the prepared text is an offset in the original.

/// Stands in for a line break that ends a statement.
pub const TERMINATOR: char = '\u{1E}';

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

const TERMINATING_KEYWORDS: &[&str] = &["break", "continue", "fallthrough", "return"];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Returns `source` with statement-ending line breaks replaced by [`TERMINATOR`].
pub fn insert_terminators(source: &str) -> String {
    scan(source, |_| {})
}

/// Whether `name` occurs as an identifier token, outside comments and literals.
pub fn mentions_ident(source: &str, name: &str) -> bool {
    let mut found = false;
    scan(source, |word| found |= word == name);
    found
}

fn scan(source: &str, mut on_word: impl FnMut(&str)) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut terminates = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                out.push(if terminates { TERMINATOR } else { '\n' });
                terminates = false;
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() {
                    out.push_str("*/");
                    i += 2;
                }
            }
            '"' | '\'' => {
                i = copy_quoted(&chars, i, c, &mut out);
                terminates = true;
            }
            '`' => {
                out.push(c);
                i += 1;
                while i < chars.len() && chars[i] != '`' {
                    out.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() {
                    out.push('`');
                    i += 1;
                }
                terminates = true;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                on_word(word.as_str());
                terminates = !is_keyword(&word) || TERMINATING_KEYWORDS.contains(&word.as_str());
                out.push_str(&word);
            }
            c if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                i = copy_number(&chars, i, &mut out);
                terminates = true;
            }
            ')' | ']' | '}' => {
                out.push(c);
                terminates = true;
                i += 1;
            }
            '+' | '-' if chars.get(i + 1) == Some(&c) => {
                out.push(c);
                out.push(c);
                terminates = true;
                i += 2;
            }
            ' ' | '\t' | '\r' => {
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                terminates = false;
                i += 1;
            }
        }
    }
    out
}

fn copy_quoted(chars: &[char], mut i: usize, quote: char, out: &mut String) -> usize {
    out.push(quote);
    i += 1;
    while i < chars.len() && chars[i] != quote && chars[i] != '\n' {
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(chars[i]);
            i += 1;
        }
        out.push(chars[i]);
        i += 1;
    }
    if i < chars.len() && chars[i] == quote {
        out.push(quote);
        i += 1;
    }
    i
}

fn copy_number(chars: &[char], mut i: usize, out: &mut String) -> usize {
    while i < chars.len() {
        let c = chars[i];
        let exponent_sign = (c == '+' || c == '-')
            && i > 0
            && matches!(chars[i - 1], 'e' | 'E' | 'p' | 'P')
            && !is_hex_prefixed(chars, i);
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
            out.push(c);
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// `0x1e+2` is an addition, `1e+2` is an exponent.
fn is_hex_prefixed(chars: &[char], sign_at: usize) -> bool {
    let mut start = sign_at;
    while start > 0 && (chars[start - 1].is_ascii_alphanumeric() || chars[start - 1] == '_' || chars[start - 1] == '.') {
        start -= 1;
    }
    let literal: String = chars[start..sign_at].iter().collect();
    let lower = literal.to_ascii_lowercase();
    lower.starts_with("0x") && !lower.contains('p')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(source: &str) -> String {
        insert_terminators(source).replace(TERMINATOR, ";")
    }

    #[test]
    fn terminates_after_identifiers_literals_and_closers() {
        assert_eq!(marks("x := f()\ny++\n"), "x := f();y++;");
        assert_eq!(marks("return\n}\n"), "return;};");
        assert_eq!(marks("s := \"a\"\nr := 'b'\n"), "s := \"a\";r := 'b';");
    }

    #[test]
    fn does_not_terminate_after_operators_or_openers() {
        assert_eq!(marks("a &&\nb\n"), "a &&\nb;");
        assert_eq!(marks("f(a,\nb)\n"), "f(a,\nb);");
        assert_eq!(marks("if x {\n"), "if x {\n");
    }

    #[test]
    fn keywords_other_than_terminators_do_not_end_lines() {
        assert_eq!(marks("func\n"), "func\n");
        assert_eq!(marks("break\n"), "break;");
        assert_eq!(marks("returned\n"), "returned;");
    }

    #[test]
    fn comments_keep_the_pending_terminator() {
        assert_eq!(marks("x := 1 // one\ny := 2\n"), "x := 1 // one;y := 2;");
        assert_eq!(marks("// only a comment\n"), "// only a comment\n");
    }

    #[test]
    fn strings_and_raw_strings_are_opaque() {
        assert_eq!(marks("s := `a\nb`\n"), "s := `a\nb`;");
        assert_eq!(marks("s := \"}\"\n"), "s := \"}\";");
    }

    #[test]
    fn identifier_mentions_skip_comments_and_literals() {
        assert!(mentions_ident("x := guard(f())\n", "guard"));
        assert!(!mentions_ident("// guard(f())\ns := \"guard\"\n", "guard"));
        assert!(!mentions_ident("guarded := 1\n", "guard"));
    }

    #[test]
    fn offsets_are_preserved() {
        let source = "package main\n\nfunc main() {\n\tx := 1e+3 // note\n}\n";
        let prepared = insert_terminators(source);
        assert_eq!(prepared.len(), source.len());
    }
}
