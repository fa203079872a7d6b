//! The value type every catalog layer passes around.

use std::sync::{Mutex, PoisonError};

use crate::entry::comparison::{ComparatorRegistry, ComparisonContext};
use crate::model::types::{EntrySettings, EntryValue, Fingerprint, RawEntry, TypeTag};

/// Fingerprint tagged with the registry generation it was computed under.
#[derive(Debug, Default)]
struct Memo(Mutex<Option<(u64, Fingerprint)>>);

impl Memo {
    fn get_or_compute(&self, generation: u64, compute: impl FnOnce() -> Fingerprint) -> Fingerprint {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Some((seen, fp)) if seen == generation => fp,
            _ => {
                let fp = compute();
                *slot = Some((generation, fp));
                fp
            }
        }
    }

    fn peek(&self) -> Option<(u64, Fingerprint)> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for Memo {
    fn clone(&self) -> Self {
        Self(Mutex::new(self.peek()))
    }
}

/// A catalog entry: type tag, exclusively owned value and per-instance
/// settings, plus one memoized fingerprint per comparison context.
///
/// The memo is cleared by [`EntryIdentity::set_settings`] and recomputed
/// whenever the registry generation moves on (a strategy was replaced or a
/// type was blacklisted). A memo is only meaningful for the one registry an
/// entry is used with.
#[derive(Debug, Clone)]
pub struct EntryIdentity {
    type_tag: TypeTag,
    value: EntryValue,
    settings: EntrySettings,
    fingerprints: [Memo; 2],
}

impl EntryIdentity {
    pub fn new(type_tag: TypeTag, value: EntryValue, settings: EntrySettings) -> Self {
        Self {
            type_tag,
            value,
            settings,
            fingerprints: Default::default(),
        }
    }

    pub fn item(value: EntryValue) -> Self {
        Self::new(TypeTag::ITEM, value, EntrySettings::default())
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn value(&self) -> &EntryValue {
        &self.value
    }

    pub fn settings(&self) -> EntrySettings {
        self.settings
    }

    pub fn count(&self) -> i64 {
        self.value.count
    }

    /// Replaces the settings bag. Memoized fingerprints are dropped when the
    /// settings actually change.
    pub fn set_settings(&mut self, settings: EntrySettings) {
        if self.settings != settings {
            self.settings = settings;
            self.fingerprints = Default::default();
        }
    }

    /// Context actually handed to the comparator. Strict entries never
    /// compare fuzzily.
    fn effective(&self, ctx: ComparisonContext) -> ComparisonContext {
        if self.settings.strict_components {
            ComparisonContext::Exact
        } else {
            ctx
        }
    }

    /// Fingerprint under `ctx` as adjusted by this entry's settings.
    pub fn fingerprint(&self, registry: &ComparatorRegistry, ctx: ComparisonContext) -> Fingerprint {
        // Read before hashing: a blacklist raised mid-hash only costs a
        // recompute on the next call.
        let generation = registry.generation();
        self.fingerprints[ctx.index()].get_or_compute(generation, || {
            registry.fingerprint(&self.type_tag, &self.value, self.effective(ctx))
        })
    }

    /// Fuzzy fingerprint of the value alone, ignoring settings. Snapshots
    /// aggregate held stacks under this key.
    pub fn stock_fingerprint(&self, registry: &ComparatorRegistry) -> Fingerprint {
        registry.fingerprint(&self.type_tag, &self.value, ComparisonContext::Fuzzy)
    }

    /// Authoritative identity check. Differing types are never equal, and
    /// neither are entries whose settings resolve `ctx` differently.
    pub fn equals(
        &self,
        other: &EntryIdentity,
        registry: &ComparatorRegistry,
        ctx: ComparisonContext,
    ) -> bool {
        if self.type_tag != other.type_tag {
            return false;
        }
        let resolved = self.effective(ctx);
        if other.effective(ctx) != resolved {
            return false;
        }
        registry.equals(&self.type_tag, &self.value, &other.value, resolved)
    }

    /// Count ≤ 0 or no resource id.
    pub fn is_empty(&self) -> bool {
        self.value.count <= 0 || self.value.id.is_empty()
    }

    /// Canonical representative of this entry with a count of one.
    pub fn normalize(&self) -> Self {
        let mut value = self.value.clone();
        value.count = 1;
        Self::new(self.type_tag.clone(), value, self.settings)
    }

    /// Combines two interchangeable entries into one with the summed count.
    ///
    /// `None` unless both share a type, a fuzzy fingerprint, and fuzzy
    /// comparator equality. Fingerprint equality alone is not enough since
    /// collisions are tolerated.
    pub fn merge(&self, other: &EntryIdentity, registry: &ComparatorRegistry) -> Option<Self> {
        if self.type_tag != other.type_tag {
            return None;
        }
        let ctx = ComparisonContext::Fuzzy;
        if self.fingerprint(registry, ctx) != other.fingerprint(registry, ctx) {
            return None;
        }
        if !self.equals(other, registry, ctx) {
            return None;
        }
        let mut value = self.value.clone();
        value.count = self.value.count.saturating_add(other.value.count);
        Some(Self::new(self.type_tag.clone(), value, self.settings))
    }

}

impl From<RawEntry> for EntryIdentity {
    fn from(raw: RawEntry) -> Self {
        Self::new(raw.type_tag, raw.value, raw.settings)
    }
}
