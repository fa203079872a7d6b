//! Syntax highlighting for the search field.
//!
//! The highlighter re-tokenizes the query and attaches a [`Style`] to every
//! token span. It never fails: a query with no results simply renders in the
//! error color.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::search::tokenizer::{Grammar, TokenKind, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxHighlightingMode {
    Plain,
    PlainUnderscored,
    #[default]
    Colorful,
    ColorfulUnderscored,
}

impl SyntaxHighlightingMode {
    pub fn is_colorful(self) -> bool {
        matches!(self, Self::Colorful | Self::ColorfulUnderscored)
    }

    pub fn is_underscored(self) -> bool {
        matches!(self, Self::PlainUnderscored | Self::ColorfulUnderscored)
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const SPLITTER: Rgb = Rgb(0xAAAAAA);
    pub const QUOTE: Rgb = Rgb(0xFFAA00);
    pub const ACCENT: Rgb = Rgb(0x55FFFF);
    pub const ERROR: Rgb = Rgb(0xFF5555);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Presentation of one span. `color: None` means the host's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Style {
    pub color: Option<Rgb>,
    pub underlined: bool,
}

impl Style {
    pub const EMPTY: Style = Style {
        color: None,
        underlined: false,
    };

    fn colored(color: Rgb) -> Self {
        Self {
            color: Some(color),
            underlined: false,
        }
    }
}

/// One highlighted span of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub span: Range<usize>,
    pub kind: TokenKind,
    pub style: Style,
}

/// Styles every token of `query`.
///
/// `has_results` is whether the current filter matches anything; a
/// non-empty query without results starts every span from the error color.
/// Colorful modes then recolor splitters, quotes and operators, while
/// underscored modes underline operator tokens (markers and `|`).
pub fn highlight(query: &str, mode: SyntaxHighlightingMode, has_results: bool) -> Vec<Highlight> {
    let base = if !has_results && !query.is_empty() {
        Style::colored(Rgb::ERROR)
    } else {
        Style::EMPTY
    };

    tokenize(query)
        .into_iter()
        .map(|token| {
            let mut style = base;
            if mode.is_colorful() {
                match token.kind {
                    TokenKind::Literal => {}
                    TokenKind::Quoted => style = Style::colored(Rgb::QUOTE),
                    TokenKind::Grammar(Grammar::Splitter) => style = Style::colored(Rgb::SPLITTER),
                    TokenKind::Grammar(_) => style = Style::colored(Rgb::ACCENT),
                }
            }
            let operator = matches!(
                token.kind,
                TokenKind::Grammar(Grammar::Marker(_) | Grammar::Alternation)
            );
            if operator && mode.is_underscored() {
                style.underlined = true;
            }
            Highlight {
                span: token.span,
                kind: token.kind,
                style,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tokenizer::Marker;

    #[test]
    fn colorful_mode_colors_grammar_and_quotes() {
        let spans = highlight(r#"-iron "ore block""#, SyntaxHighlightingMode::Colorful, true);
        let styles: Vec<_> = spans.iter().map(|h| (h.kind, h.style.color)).collect();
        assert_eq!(
            styles,
            vec![
                (TokenKind::Grammar(Grammar::Marker(Marker::Negate)), Some(Rgb::ACCENT)),
                (TokenKind::Literal, None),
                (TokenKind::Grammar(Grammar::Splitter), Some(Rgb::SPLITTER)),
                (TokenKind::Quoted, Some(Rgb::QUOTE)),
            ]
        );
        assert!(spans.iter().all(|h| !h.style.underlined));
    }

    #[test]
    fn plain_mode_leaves_everything_default() {
        let spans = highlight("a | -b", SyntaxHighlightingMode::Plain, true);
        assert!(spans.iter().all(|h| h.style == Style::EMPTY));
    }

    #[test]
    fn underscored_modes_underline_operators_only() {
        let spans = highlight("a | -b", SyntaxHighlightingMode::PlainUnderscored, true);
        let underlined: Vec<_> = spans
            .iter()
            .filter(|h| h.style.underlined)
            .map(|h| h.span.clone())
            .collect();
        assert_eq!(underlined, vec![2..3, 4..5]);
    }

    #[test]
    fn no_results_uses_error_color() {
        let spans = highlight("zzz qq", SyntaxHighlightingMode::Plain, false);
        assert!(spans.iter().all(|h| h.style.color == Some(Rgb::ERROR)));

        let colorful = highlight("zzz qq", SyntaxHighlightingMode::Colorful, false);
        assert_eq!(colorful[0].style.color, Some(Rgb::ERROR));
        assert_eq!(colorful[1].style.color, Some(Rgb::SPLITTER));

        assert!(highlight("", SyntaxHighlightingMode::Plain, false).is_empty());
    }

    #[test]
    fn mode_parses_from_snake_case() {
        let mode: SyntaxHighlightingMode =
            serde_json::from_str(r#""colorful_underscored""#).unwrap();
        assert_eq!(mode, SyntaxHighlightingMode::ColorfulUnderscored);
    }
}
