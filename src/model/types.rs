//! Normalized catalog entry structs.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace assumed when a resource id is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Declared type of a catalog entry (`item`, `fluid`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const ITEM: TypeTag = TypeTag(Cow::Borrowed("item"));
    pub const FLUID: TypeTag = TypeTag(Cow::Borrowed("fluid"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TypeTag {
    fn default() -> Self {
        Self::ITEM
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResourceIdError {
    #[error("resource id `{0}` has more than one namespace separator")]
    Malformed(String),

    #[error("resource id `{0}` has an empty namespace or path")]
    EmptyPart(String),
}

/// `namespace:path` identifier of the thing an entry represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    pub namespace: String,
    pub path: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    /// The absence marker. Entries carrying it are empty.
    pub fn empty() -> Self {
        Self {
            namespace: String::new(),
            path: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let mut parts = s.split(':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self::new(DEFAULT_NAMESPACE, first)),
            (Some(path), None) => {
                if first.is_empty() || path.is_empty() {
                    return Err(ResourceIdError::EmptyPart(s.to_string()));
                }
                Ok(Self::new(first, path))
            }
            (Some(_), Some(_)) => Err(ResourceIdError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// 64-bit identity hash of an entry under one comparison context.
///
/// Only meaningful within the process that computed it; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

fn default_count() -> i64 {
    1
}

/// The stored value of a catalog entry.
///
/// `components` holds nested per-stack data. It is an ordered map so the
/// serialized form, and therefore every hash derived from it, is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryValue {
    pub id: ResourceId,
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub damage: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EntryValue {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            count: 1,
            damage: 0,
            components: BTreeMap::new(),
            display_name: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_component(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.components.insert(key.into(), value);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Text shown for this value. Falls back to a title-cased path
    /// (`diamond_sword` -> `Diamond Sword`) when no display name is set.
    pub fn display_text(&self) -> Cow<'_, str> {
        if !self.display_name.is_empty() {
            return Cow::Borrowed(&self.display_name);
        }
        let words: Vec<String> = self
            .id
            .path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        Cow::Owned(words.join(" "))
    }
}

fn default_searchable() -> bool {
    true
}

/// Per-instance boolean flags attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySettings {
    /// Treat component variants as distinct even under fuzzy comparison.
    #[serde(default)]
    pub strict_components: bool,
    #[serde(default = "default_searchable")]
    pub searchable: bool,
}

impl Default for EntrySettings {
    fn default() -> Self {
        Self {
            strict_components: false,
            searchable: true,
        }
    }
}

/// One entry as yielded by a catalog provider, before wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(rename = "type", default)]
    pub type_tag: TypeTag,
    #[serde(flatten)]
    pub value: EntryValue,
    #[serde(default)]
    pub settings: EntrySettings,
}

impl RawEntry {
    pub fn item(value: EntryValue) -> Self {
        Self {
            type_tag: TypeTag::ITEM,
            value,
            settings: EntrySettings::default(),
        }
    }
}
