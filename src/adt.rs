//! Abstract data type contracts shared by the set implementations and the
//! generic test harness in [`crate::test`].

/// A concurrent set supporting membership test, insertion and removal.
///
/// Reconstructed from the teacher crate's call sites (`set.contains(&key)`,
/// `set.insert(key)`, `set.remove(&key)`) with `insert` renamed to `add` to
/// match this crate's external interface.
pub trait ConcurrentSet<T> {
    /// Returns whether `item` is a member of the set.
    fn contains(&self, item: &T) -> bool;

    /// Inserts `item`. Returns `true` iff the set was modified.
    fn add(&self, item: T) -> bool;

    /// Removes `item`. Returns `true` iff the set was modified.
    fn remove(&self, item: &T) -> bool;
}

/// Extends [`ConcurrentSet`] with the atomic replace operation.
pub trait ConcurrentReplaceSet<T>: ConcurrentSet<T> {
    /// Atomically removes `old` (if present) and inserts `new` (if absent).
    /// Returns `true` iff the set was observably modified.
    fn replace(&self, old: T, new: T) -> bool;
}
