//! Token stream → predicate tree, evaluated against entry search facts.
//!
//! Compilation is total. `|` splits the stream into groups joined with OR,
//! whitespace splits a group into terms joined with AND, and each term's
//! leading markers apply to every atom in it:
//!
//! ```text
//! -#ore iron | "gold block"
//! Any[ All[ Not(Match tags ~ "ore"), Match text ~ "iron" ],
//!      Match text ~ "gold block" ]
//! ```
//!
//! Empty groups are dropped and a query without any atom compiles to
//! [`Predicate::Always`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::entry::identity::EntryIdentity;
use crate::model::types::EntryValue;
use crate::search::canonicalize::canonicalize_for_search;
use crate::search::tokenizer::{Grammar, Marker, Token, TokenKind, quoted_text, tokenize};

/// Which markers take part in matching.
///
/// A disabled marker is still tokenized (and highlighted) as grammar, but the
/// compiler folds its character back into the term's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGrammar {
    pub negate: bool,
    pub tag: bool,
    pub namespace: bool,
}

impl Default for FilterGrammar {
    fn default() -> Self {
        Self {
            negate: true,
            tag: true,
            namespace: true,
        }
    }
}

impl FilterGrammar {
    pub fn is_significant(&self, marker: Marker) -> bool {
        match marker {
            Marker::Negate => self.negate,
            Marker::Tag => self.tag,
            Marker::Namespace => self.namespace,
        }
    }
}

/// Derived, canonicalized view of an entry used for matching.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFacts {
    pub text: String,
    pub tags: Vec<String>,
    pub namespace: String,
}

impl SearchFacts {
    pub fn from_value(value: &EntryValue) -> Self {
        Self {
            text: canonicalize_for_search(&value.display_text()),
            tags: value
                .tags
                .iter()
                .map(|t| canonicalize_for_search(t))
                .collect(),
            namespace: canonicalize_for_search(&value.id.namespace),
        }
    }

    pub fn from_entry(entry: &EntryIdentity) -> Self {
        Self::from_value(entry.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Text,
    Tags,
    Namespace,
}

/// Case-insensitive substring test against one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matcher {
    pub field: Field,
    /// Already canonicalized.
    pub needle: String,
}

impl Matcher {
    pub fn new(field: Field, needle: &str) -> Self {
        Self {
            field,
            needle: canonicalize_for_search(needle),
        }
    }

    pub fn matches(&self, facts: &SearchFacts) -> bool {
        match self.field {
            Field::Text => facts.text.contains(&self.needle),
            Field::Tags => facts.tags.iter().any(|t| t.contains(&self.needle)),
            Field::Namespace => facts.namespace.contains(&self.needle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Always,
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
    Not(Box<Predicate>),
    Match(Matcher),
}

impl Predicate {
    pub fn eval(&self, facts: &SearchFacts) -> bool {
        match self {
            Self::Always => true,
            Self::Any(children) => children.iter().any(|p| p.eval(facts)),
            Self::All(children) => children.iter().all(|p| p.eval(facts)),
            Self::Not(inner) => !inner.eval(facts),
            Self::Match(matcher) => matcher.matches(facts),
        }
    }

    fn all(mut children: Vec<Predicate>) -> Option<Predicate> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Self::All(children)),
        }
    }
}

/// Flags collected from a term's leading markers.
#[derive(Debug, Default)]
struct TermMarkers {
    negate: bool,
    tag: bool,
    namespace: bool,
}

impl TermMarkers {
    fn field(&self) -> Field {
        // Tag wins when both are written.
        if self.tag {
            Field::Tags
        } else if self.namespace {
            Field::Namespace
        } else {
            Field::Text
        }
    }
}

fn compile_term(query: &str, term: &[Token], grammar: &FilterGrammar) -> Option<Predicate> {
    let mut markers = TermMarkers::default();
    let mut atoms: SmallVec<[String; 2]> = SmallVec::new();
    let mut text = String::new();
    let mut leading = true;

    for token in term {
        match token.kind {
            TokenKind::Grammar(Grammar::Marker(marker)) if leading => {
                if grammar.is_significant(marker) {
                    match marker {
                        Marker::Negate => markers.negate = true,
                        Marker::Tag => markers.tag = true,
                        Marker::Namespace => markers.namespace = true,
                    }
                } else {
                    text.push(marker.symbol());
                }
            }
            TokenKind::Quoted => {
                leading = false;
                if !text.is_empty() {
                    atoms.push(std::mem::take(&mut text));
                }
                let content = quoted_text(token.text(query));
                if !content.is_empty() {
                    atoms.push(content.into_owned());
                }
            }
            _ => {
                leading = false;
                text.push_str(token.text(query));
            }
        }
    }
    if !text.is_empty() {
        atoms.push(text);
    }

    let field = markers.field();
    let predicate = Predicate::all(
        atoms
            .iter()
            .map(|atom| Predicate::Match(Matcher::new(field, atom)))
            .collect(),
    )?;
    Some(if markers.negate {
        Predicate::Not(Box::new(predicate))
    } else {
        predicate
    })
}

fn compile_group(query: &str, group: &[Token], grammar: &FilterGrammar) -> Option<Predicate> {
    let terms = group
        .split(|t| t.kind == TokenKind::Grammar(Grammar::Splitter))
        .filter_map(|term| compile_term(query, term, grammar))
        .collect();
    Predicate::all(terms)
}

/// Builds the predicate for a tokenized query.
pub fn compile(query: &str, tokens: &[Token], grammar: &FilterGrammar) -> Predicate {
    let mut groups: Vec<Predicate> = tokens
        .split(|t| t.kind == TokenKind::Grammar(Grammar::Alternation))
        .filter_map(|group| compile_group(query, group, grammar))
        .collect();
    match groups.len() {
        0 => Predicate::Always,
        1 => groups.pop().unwrap_or(Predicate::Always),
        _ => Predicate::Any(groups),
    }
}

/// A compiled query, ready to be run over the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    query: String,
    predicate: Predicate,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::always()
    }
}

impl SearchFilter {
    pub fn always() -> Self {
        Self {
            query: String::new(),
            predicate: Predicate::Always,
        }
    }

    pub fn compile(query: &str, grammar: &FilterGrammar) -> Self {
        let tokens = tokenize(query);
        Self::from_tokens(query, &tokens, grammar)
    }

    pub fn from_tokens(query: &str, tokens: &[Token], grammar: &FilterGrammar) -> Self {
        Self {
            query: query.to_string(),
            predicate: compile(query, tokens, grammar),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn is_always(&self) -> bool {
        matches!(self.predicate, Predicate::Always)
    }

    /// Empty and unsearchable entries never match, not even `Always`.
    pub fn test(&self, entry: &EntryIdentity) -> bool {
        self.test_with_facts(entry, &SearchFacts::from_entry(entry))
    }

    /// Like [`SearchFilter::test`], with facts the caller already derived.
    pub fn test_with_facts(&self, entry: &EntryIdentity, facts: &SearchFacts) -> bool {
        if entry.is_empty() || !entry.settings().searchable {
            return false;
        }
        self.predicate.eval(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{EntrySettings, ResourceId};

    fn named(name: &str) -> EntryIdentity {
        let path = name.to_lowercase().replace(' ', "_");
        EntryIdentity::item(
            EntryValue::new(ResourceId::new("minecraft", path)).with_display_name(name),
        )
    }

    fn matching<'a>(query: &str, entries: &'a [EntryIdentity]) -> Vec<&'a str> {
        let filter = SearchFilter::compile(query, &FilterGrammar::default());
        entries
            .iter()
            .filter(|e| filter.test(e))
            .map(|e| e.value().display_name.as_str())
            .collect()
    }

    fn sample() -> Vec<EntryIdentity> {
        vec![named("Stick"), named("Diamond Stick"), named("Torch")]
    }

    #[test]
    fn substring_match() {
        assert_eq!(matching("stick", &sample()), ["Stick", "Diamond Stick"]);
    }

    #[test]
    fn negation() {
        assert_eq!(matching("-diamond", &sample()), ["Stick", "Torch"]);
    }

    #[test]
    fn empty_query_matches_non_empty_entries() {
        let mut entries = sample();
        entries.push(EntryIdentity::item(
            EntryValue::new(ResourceId::new("minecraft", "air")).with_count(0),
        ));
        assert_eq!(matching("", &entries), ["Stick", "Diamond Stick", "Torch"]);
        assert_eq!(matching("   ", &entries).len(), 3);
    }

    #[test]
    fn quoted_phrase_keeps_spaces() {
        let entries = vec![named("a b"), named("b a"), named("a x b")];
        assert_eq!(matching(r#""a b""#, &entries), ["a b"]);
        assert_eq!(matching("a b", &entries).len(), 3);
    }

    #[test]
    fn alternation_is_outermost() {
        assert_eq!(matching("torch | diamond", &sample()), ["Diamond Stick", "Torch"]);
        assert_eq!(matching("| torch |", &sample()), ["Torch"]);
    }

    #[test]
    fn tag_and_namespace_markers() {
        let entries = vec![
            EntryIdentity::item(
                EntryValue::new(ResourceId::new("create", "brass_ingot"))
                    .with_tags(["c:ingots", "c:brass"]),
            ),
            EntryIdentity::item(
                EntryValue::new(ResourceId::new("minecraft", "iron_ingot")).with_tags(["c:ingots"]),
            ),
        ];
        let filter = |q: &str| SearchFilter::compile(q, &FilterGrammar::default());
        assert!(entries.iter().all(|e| filter("#ingots").test(e)));
        assert!(filter("@create").test(&entries[0]));
        assert!(!filter("@create").test(&entries[1]));
        assert!(filter("-@create ingot").test(&entries[1]));
        assert!(!filter("-@create ingot").test(&entries[0]));
    }

    #[test]
    fn disabled_marker_folds_into_text() {
        let grammar = FilterGrammar {
            negate: false,
            ..FilterGrammar::default()
        };
        let filter = SearchFilter::compile("-dash", &grammar);
        assert_eq!(
            filter.predicate(),
            &Predicate::Match(Matcher::new(Field::Text, "-dash"))
        );
        assert!(filter.test(&named("Em-Dash")));
        assert!(!filter.test(&named("Dash")));
    }

    #[test]
    fn marker_only_term_contributes_nothing() {
        let filter = SearchFilter::compile("- # stick", &FilterGrammar::default());
        assert_eq!(
            filter.predicate(),
            &Predicate::Match(Matcher::new(Field::Text, "stick"))
        );
        assert!(SearchFilter::compile("-#@", &FilterGrammar::default()).is_always());
    }

    #[test]
    fn literal_and_quote_in_one_term_share_markers() {
        let filter = SearchFilter::compile(r#"-dia"mond s""#, &FilterGrammar::default());
        assert_eq!(
            filter.predicate(),
            &Predicate::Not(Box::new(Predicate::All(vec![
                Predicate::Match(Matcher::new(Field::Text, "dia")),
                Predicate::Match(Matcher::new(Field::Text, "mond s")),
            ])))
        );
        assert_eq!(matching(r#"-dia"mond s""#, &sample()), ["Stick", "Torch"]);
    }

    #[test]
    fn unsearchable_entries_never_match() {
        let mut stick = named("Stick");
        stick.set_settings(EntrySettings {
            searchable: false,
            ..EntrySettings::default()
        });
        assert!(!SearchFilter::always().test(&stick));
    }

    #[test]
    fn case_and_normalization_insensitive() {
        let entries = vec![named("Caf\u{00E9} Table")];
        assert_eq!(matching("CAFE\u{0301}", &entries).len(), 1);
    }
}
