//! Entry identity and the comparator strategies behind it.

pub mod comparison;
pub mod identity;

pub use comparison::{
    ComparatorError, ComparatorRegistry, ComparisonContext, ComponentComparator,
    DefaultComparator, EntryComparator, IdentityComparator, ItemComparator,
};
pub use identity::EntryIdentity;
