//! Query text → position-tagged token stream.
//!
//! The tokenizer is a single left-to-right pass that never fails. Its output
//! partitions the input: token spans are contiguous, non-overlapping byte
//! ranges whose concatenation is the query itself. Both the filter compiler
//! and the highlighter consume the same stream.
//!
//! | input | token |
//! |-------|-------|
//! | whitespace run | `Grammar(Splitter)` |
//! | `\|` | `Grammar(Alternation)` |
//! | `-` `#` `@` at the start of a term | `Grammar(Marker(..))` |
//! | `"…"` (`\"` escapes, may be unterminated) | `Quoted` |
//! | anything else | `Literal` |

use std::borrow::Cow;
use std::ops::Range;

use serde::Serialize;

/// Prefix operator written at the start of a term. Markers stack (`-#ore`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Negate,
    Tag,
    Namespace,
}

impl Marker {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Self::Negate),
            '#' => Some(Self::Tag),
            '@' => Some(Self::Namespace),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Negate => '-',
            Self::Tag => '#',
            Self::Namespace => '@',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    /// AND between the terms of a group.
    Splitter,
    /// OR between groups.
    Alternation,
    Marker(Marker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Literal,
    Quoted,
    Grammar(Grammar),
}

/// A classified byte span of the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// The raw text this token covers.
    pub fn text<'q>(&self, query: &'q str) -> &'q str {
        &query[self.span.clone()]
    }
}

fn flush_literal(tokens: &mut Vec<Token>, start: &mut Option<usize>, end: usize) {
    if let Some(start) = start.take() {
        tokens.push(Token::new(TokenKind::Literal, start..end));
    }
}

/// Scans `query` into tokens.
pub fn tokenize(query: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = query.char_indices().peekable();
    let mut literal: Option<usize> = None;
    let mut term_start = true;

    while let Some((i, c)) = chars.next() {
        if c == '"' {
            flush_literal(&mut tokens, &mut literal, i);
            let mut end = query.len();
            let mut escaped = false;
            for (j, d) in chars.by_ref() {
                if escaped {
                    escaped = false;
                } else if d == '\\' {
                    escaped = true;
                } else if d == '"' {
                    end = j + 1;
                    break;
                }
            }
            tokens.push(Token::new(TokenKind::Quoted, i..end));
            term_start = false;
        } else if c.is_whitespace() {
            flush_literal(&mut tokens, &mut literal, i);
            let mut end = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_whitespace() {
                    break;
                }
                end = j + d.len_utf8();
                chars.next();
            }
            tokens.push(Token::new(TokenKind::Grammar(Grammar::Splitter), i..end));
            term_start = true;
        } else if c == '|' {
            flush_literal(&mut tokens, &mut literal, i);
            tokens.push(Token::new(
                TokenKind::Grammar(Grammar::Alternation),
                i..i + 1,
            ));
            term_start = true;
        } else if let Some(marker) = Marker::from_char(c).filter(|_| term_start) {
            tokens.push(Token::new(
                TokenKind::Grammar(Grammar::Marker(marker)),
                i..i + 1,
            ));
        } else {
            literal.get_or_insert(i);
            term_start = false;
        }
    }
    flush_literal(&mut tokens, &mut literal, query.len());
    tokens
}

/// Content of a quoted token with the surrounding quotes removed and `\"`,
/// `\\` unescaped. An unterminated quote has no closing quote to strip.
pub fn quoted_text(raw: &str) -> Cow<'_, str> {
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = match inner.strip_suffix('"') {
        Some(stripped) if !ends_with_escape(stripped) => stripped,
        _ => inner,
    };
    if !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// True when `s` ends in an odd run of backslashes, i.e. its last character
/// escapes whatever follows.
fn ends_with_escape(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(query: &str) -> Vec<(TokenKind, &str)> {
        tokenize(query)
            .into_iter()
            .map(|t| (t.kind, &query[t.span]))
            .collect()
    }

    const SPLIT: TokenKind = TokenKind::Grammar(Grammar::Splitter);
    const OR: TokenKind = TokenKind::Grammar(Grammar::Alternation);
    const NEG: TokenKind = TokenKind::Grammar(Grammar::Marker(Marker::Negate));
    const TAG: TokenKind = TokenKind::Grammar(Grammar::Marker(Marker::Tag));

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn words_and_whitespace_runs() {
        assert_eq!(
            kinds("iron   ingot"),
            vec![
                (TokenKind::Literal, "iron"),
                (SPLIT, "   "),
                (TokenKind::Literal, "ingot"),
            ]
        );
        assert_eq!(kinds(" \t "), vec![(SPLIT, " \t ")]);
    }

    #[test]
    fn markers_stack_at_term_start_only() {
        assert_eq!(
            kinds("-#ore a-b"),
            vec![
                (NEG, "-"),
                (TAG, "#"),
                (TokenKind::Literal, "ore"),
                (SPLIT, " "),
                (TokenKind::Literal, "a-b"),
            ]
        );
    }

    #[test]
    fn alternation_resets_term_start() {
        assert_eq!(
            kinds("a|-b"),
            vec![
                (TokenKind::Literal, "a"),
                (OR, "|"),
                (NEG, "-"),
                (TokenKind::Literal, "b"),
            ]
        );
    }

    #[test]
    fn quoted_with_escape_and_unterminated() {
        let query = r#"say "he said \"hi\"" "open"#;
        let toks = kinds(query);
        assert_eq!(toks[2], (TokenKind::Quoted, r#""he said \"hi\"""#));
        assert_eq!(toks[4], (TokenKind::Quoted, r#""open"#));
        assert_eq!(toks.len(), 5);
    }

    #[test]
    fn quote_closes_literal() {
        assert_eq!(
            kinds(r#"ab"c d"e"#),
            vec![
                (TokenKind::Literal, "ab"),
                (TokenKind::Quoted, r#""c d""#),
                (TokenKind::Literal, "e"),
            ]
        );
    }

    #[test]
    fn spans_cover_multibyte_input() {
        let query = "épée  \u{3000}#日本";
        let rebuilt: String = tokenize(query).iter().map(|t| t.text(query)).collect();
        assert_eq!(rebuilt, query);
    }

    #[test]
    fn quoted_text_unescapes() {
        assert_eq!(quoted_text(r#""a b""#), "a b");
        assert_eq!(quoted_text(r#""he said \"hi\"""#), r#"he said "hi""#);
        assert_eq!(quoted_text(r#""open"#), "open");
        assert_eq!(quoted_text(r#""trailing \""#), r#"trailing ""#);
        assert_eq!(quoted_text(r#""back\\""#), r"back\");
        assert_eq!(quoted_text(r#""""#), "");
    }
}
