//! Data model shared by the catalog, search and snapshot layers.

pub mod types;

pub use types::{EntrySettings, EntryValue, Fingerprint, RawEntry, ResourceId, TypeTag};
