//! Sorted-list-based concurrent sets.

mod node;

mod lazy;

pub use lazy::LazySet;
