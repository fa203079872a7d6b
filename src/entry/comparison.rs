//! Per-type equality and hashing strategies.
//!
//! Every catalog entry type can register an [`EntryComparator`] that decides
//! when two values are "the same" under a [`ComparisonContext`]:
//!
//! - **Exact** distinguishes values that differ in any stored attribute
//!   (damage, components).
//! - **Fuzzy** treats values as identical when they are the same kind of
//!   thing, ignoring incidental state.
//!
//! Strategies must keep `equals(a, b, ctx) ⇒ hash(a, ctx) == hash(b, ctx)`.
//! The converse need not hold, so callers that merge by fingerprint still
//! confirm with `equals`.
//!
//! # Registration discipline
//!
//! Strategies are registered during single-threaded start-up, before the
//! first fingerprint of that type is computed. Registering later replaces the
//! strategy and bumps the registry [generation](ComparatorRegistry::generation).
//!
//! # Failures
//!
//! A strategy may fail. The registry catches the error at the call site,
//! flags the type as blacklisted (once, with a single `warn!`), and from
//! then on compares that type by resource id only. Blacklisting also bumps
//! the generation, so fingerprints memoized under the old hash are
//! recomputed on next use.

use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fxhash::{FxHashMap, FxHasher64};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::types::{EntryValue, Fingerprint, TypeTag};

/// Strictness of an identity comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonContext {
    Exact,
    Fuzzy,
}

impl ComparisonContext {
    pub const ALL: [ComparisonContext; 2] = [ComparisonContext::Exact, ComparisonContext::Fuzzy];

    pub fn is_exact(self) -> bool {
        matches!(self, Self::Exact)
    }

    /// Dense index, used for per-context memo slots.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Exact => 0,
            Self::Fuzzy => 1,
        }
    }
}

impl fmt::Display for ComparisonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Fuzzy => f.write_str("fuzzy"),
        }
    }
}

/// Error raised by a comparator strategy.
#[derive(Error, Debug)]
pub enum ComparatorError {
    #[error("component `{key}` cannot be compared: {reason}")]
    Component { key: String, reason: String },

    #[error("comparator failed: {0}")]
    Other(String),
}

/// Pluggable hash/equality strategy for one entry type.
pub trait EntryComparator: Send + Sync {
    fn hash(&self, value: &EntryValue, ctx: ComparisonContext) -> Result<u64, ComparatorError>;

    fn equals(
        &self,
        a: &EntryValue,
        b: &EntryValue,
        ctx: ComparisonContext,
    ) -> Result<bool, ComparatorError>;
}

fn finish_with(write: impl FnOnce(&mut FxHasher64)) -> u64 {
    let mut hasher = FxHasher64::default();
    write(&mut hasher);
    hasher.finish()
}

fn write_str(hasher: &mut FxHasher64, s: &str) {
    hasher.write(s.as_bytes());
    // Length suffix keeps ("ab","c") and ("a","bc") apart.
    hasher.write_usize(s.len());
}

fn write_id(hasher: &mut FxHasher64, value: &EntryValue) {
    write_str(hasher, &value.id.namespace);
    write_str(hasher, &value.id.path);
}

fn write_component(hasher: &mut FxHasher64, key: &str, component: &serde_json::Value) {
    write_str(hasher, key);
    write_str(hasher, &component.to_string());
}

/// Identity-only comparison: same type, same resource id.
///
/// This is what blacklisted types fall back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityComparator;

impl IdentityComparator {
    pub fn hash_of(value: &EntryValue) -> u64 {
        finish_with(|h| write_id(h, value))
    }

    pub fn equals_of(a: &EntryValue, b: &EntryValue) -> bool {
        a.id == b.id
    }
}

impl EntryComparator for IdentityComparator {
    fn hash(&self, value: &EntryValue, _ctx: ComparisonContext) -> Result<u64, ComparatorError> {
        Ok(Self::hash_of(value))
    }

    fn equals(
        &self,
        a: &EntryValue,
        b: &EntryValue,
        _ctx: ComparisonContext,
    ) -> Result<bool, ComparatorError> {
        Ok(Self::equals_of(a, b))
    }
}

/// Structural comparison over every stored attribute except quantity.
///
/// Ignores the context, so it is only really meaningful for `Exact`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator;

impl EntryComparator for DefaultComparator {
    fn hash(&self, value: &EntryValue, _ctx: ComparisonContext) -> Result<u64, ComparatorError> {
        Ok(finish_with(|h| {
            write_id(h, value);
            h.write_u32(value.damage);
            for (key, component) in &value.components {
                write_component(h, key, component);
            }
            write_str(h, &value.display_name);
            for tag in &value.tags {
                write_str(h, tag);
            }
        }))
    }

    fn equals(
        &self,
        a: &EntryValue,
        b: &EntryValue,
        _ctx: ComparisonContext,
    ) -> Result<bool, ComparatorError> {
        Ok(a.id == b.id
            && a.damage == b.damage
            && a.components == b.components
            && a.display_name == b.display_name
            && a.tags == b.tags)
    }
}

/// Stack comparison: fuzzy looks at the resource id only, exact also at
/// damage and components.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemComparator;

impl ItemComparator {
    fn exact_hash(value: &EntryValue) -> u64 {
        finish_with(|h| {
            write_id(h, value);
            h.write_u32(value.damage);
            for (key, component) in &value.components {
                write_component(h, key, component);
            }
        })
    }

    fn exact_equals(a: &EntryValue, b: &EntryValue) -> bool {
        a.id == b.id && a.damage == b.damage && a.components == b.components
    }
}

impl EntryComparator for ItemComparator {
    fn hash(&self, value: &EntryValue, ctx: ComparisonContext) -> Result<u64, ComparatorError> {
        Ok(match ctx {
            ComparisonContext::Exact => Self::exact_hash(value),
            ComparisonContext::Fuzzy => IdentityComparator::hash_of(value),
        })
    }

    fn equals(
        &self,
        a: &EntryValue,
        b: &EntryValue,
        ctx: ComparisonContext,
    ) -> Result<bool, ComparatorError> {
        Ok(match ctx {
            ComparisonContext::Exact => Self::exact_equals(a, b),
            ComparisonContext::Fuzzy => IdentityComparator::equals_of(a, b),
        })
    }
}

/// Like [`ItemComparator`], but fuzzy comparison also honors a fixed set of
/// component keys (e.g. `potion` for potions that must not merge).
#[derive(Debug, Clone, Default)]
pub struct ComponentComparator {
    keys: Vec<String>,
}

impl ComponentComparator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Self { keys }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl EntryComparator for ComponentComparator {
    fn hash(&self, value: &EntryValue, ctx: ComparisonContext) -> Result<u64, ComparatorError> {
        if ctx.is_exact() {
            return Ok(ItemComparator::exact_hash(value));
        }
        Ok(finish_with(|h| {
            write_id(h, value);
            for key in &self.keys {
                match value.components.get(key) {
                    Some(component) => write_component(h, key, component),
                    None => h.write_u8(0),
                }
            }
        }))
    }

    fn equals(
        &self,
        a: &EntryValue,
        b: &EntryValue,
        ctx: ComparisonContext,
    ) -> Result<bool, ComparatorError> {
        if ctx.is_exact() {
            return Ok(ItemComparator::exact_equals(a, b));
        }
        Ok(a.id == b.id
            && self
                .keys
                .iter()
                .all(|key| a.components.get(key) == b.components.get(key)))
    }
}

struct ComparatorRecord {
    comparator: Arc<dyn EntryComparator>,
    blacklisted: AtomicBool,
}

impl ComparatorRecord {
    fn new(comparator: Arc<dyn EntryComparator>) -> Self {
        Self {
            comparator,
            blacklisted: AtomicBool::new(false),
        }
    }

    fn is_blacklisted(&self) -> bool {
        self.blacklisted.load(Ordering::Relaxed)
    }

    /// Flags the record; returns true only for the first failure.
    fn blacklist(&self) -> bool {
        !self.blacklisted.swap(true, Ordering::Relaxed)
    }
}

/// Type tag → comparator strategy, with a structural default.
///
/// Read-only after start-up, so it can be shared across threads behind an
/// `Arc` once registration is done.
#[derive(Default)]
pub struct ComparatorRegistry {
    records: FxHashMap<TypeTag, ComparatorRecord>,
    default: DefaultComparator,
    generation: AtomicU64,
}

impl fmt::Debug for ComparatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.records.keys().map(TypeTag::as_str).collect();
        types.sort_unstable();
        f.debug_struct("ComparatorRegistry")
            .field("types", &types)
            .finish()
    }
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`ItemComparator`] installed for items and fluids.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(TypeTag::ITEM, ItemComparator);
        registry.register(TypeTag::FLUID, ItemComparator);
        registry
    }

    /// Associates `type_tag` with `comparator`. Returns true when an earlier
    /// strategy was replaced.
    pub fn register(
        &mut self,
        type_tag: TypeTag,
        comparator: impl EntryComparator + 'static,
    ) -> bool {
        self.register_arc(type_tag, Arc::new(comparator))
    }

    pub fn register_arc(&mut self, type_tag: TypeTag, comparator: Arc<dyn EntryComparator>) -> bool {
        let replaced = self
            .records
            .insert(type_tag.clone(), ComparatorRecord::new(comparator))
            .is_some();
        if replaced {
            *self.generation.get_mut() += 1;
            debug!(type_tag = %type_tag, "comparator replaced");
        }
        replaced
    }

    /// Strategy for `type_tag`, or the structural default.
    pub fn resolve(&self, type_tag: &TypeTag) -> &dyn EntryComparator {
        match self.records.get(type_tag) {
            Some(record) => record.comparator.as_ref(),
            None => &self.default,
        }
    }

    pub fn is_registered(&self, type_tag: &TypeTag) -> bool {
        self.records.contains_key(type_tag)
    }

    pub fn is_blacklisted(&self, type_tag: &TypeTag) -> bool {
        self.records
            .get(type_tag)
            .is_some_and(ComparatorRecord::is_blacklisted)
    }

    /// Changes whenever a fingerprint computed earlier may no longer match
    /// one computed now: a strategy was replaced or a type was blacklisted.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn note_failure(&self, type_tag: &TypeTag, record: &ComparatorRecord, err: &ComparatorError) {
        if record.blacklist() {
            self.generation.fetch_add(1, Ordering::AcqRel);
            warn!(
                type_tag = %type_tag,
                error = %err,
                "comparator failed; falling back to identity comparison for this type"
            );
        }
    }

    /// Comparator hash of `value`, never failing.
    pub fn hash(&self, type_tag: &TypeTag, value: &EntryValue, ctx: ComparisonContext) -> u64 {
        let Some(record) = self.records.get(type_tag) else {
            return self.default.hash(value, ctx).unwrap_or_default();
        };
        if record.is_blacklisted() {
            return IdentityComparator::hash_of(value);
        }
        match record.comparator.hash(value, ctx) {
            Ok(hash) => hash,
            Err(err) => {
                self.note_failure(type_tag, record, &err);
                IdentityComparator::hash_of(value)
            }
        }
    }

    /// Comparator equality of two values of the same type, never failing.
    pub fn equals(
        &self,
        type_tag: &TypeTag,
        a: &EntryValue,
        b: &EntryValue,
        ctx: ComparisonContext,
    ) -> bool {
        let Some(record) = self.records.get(type_tag) else {
            return self.default.equals(a, b, ctx).unwrap_or(false);
        };
        if record.is_blacklisted() {
            return IdentityComparator::equals_of(a, b);
        }
        match record.comparator.equals(a, b, ctx) {
            Ok(equal) => equal,
            Err(err) => {
                self.note_failure(type_tag, record, &err);
                IdentityComparator::equals_of(a, b)
            }
        }
    }

    /// Fingerprint of `value`: the type's stable identity folded with the
    /// comparator hash.
    pub fn fingerprint(
        &self,
        type_tag: &TypeTag,
        value: &EntryValue,
        ctx: ComparisonContext,
    ) -> Fingerprint {
        let hash = self.hash(type_tag, value, ctx);
        Fingerprint(finish_with(|h| {
            write_str(h, type_tag.as_str());
            h.write_u64(hash);
        }))
    }
}
