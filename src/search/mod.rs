//! Search layer facade.
//!
//! - **[`tokenizer`]**: Query text → position-tagged token stream.
//! - **[`filter`]**: Token stream → predicate tree, evaluated per entry.
//! - **[`highlight`]**: Styled spans for the search field.
//! - **[`history`]**: Submitted-query history with up/down navigation.
//! - **[`canonicalize`]**: NFC + lower-case text used on both sides of a match.

pub mod canonicalize;
pub mod filter;
pub mod highlight;
pub mod history;
pub mod tokenizer;

pub use filter::{FilterGrammar, Predicate, SearchFacts, SearchFilter};
pub use highlight::{Highlight, SyntaxHighlightingMode, highlight};
pub use history::QueryHistory;
pub use tokenizer::{Token, TokenKind, tokenize};
