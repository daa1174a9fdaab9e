//! A concurrent ordered set built on lazy synchronization with optimistic
//! validation: traversal is lock-free, mutators lock only the window of
//! nodes they touch, and a short validation step confirms that window is
//! still live before committing.
//!
//! Elements are ordered solely by a 32-bit [`Fingerprint`]; two elements
//! with the same fingerprint are indistinguishable to the set. This is a
//! known, intentional limitation (see [`fingerprint`]), not an oversight.
//!
//! [`list_set::LazySet::replace`] is the hardest operation: it atomically
//! observes "remove one element, insert another" across two potentially
//! disjoint windows of the list, using a four-node global lock order to
//! stay deadlock-free.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub mod adt;
pub mod fingerprint;
pub mod list_set;

#[cfg(any(test, feature = "test-util"))]
pub mod test;

pub use adt::{ConcurrentReplaceSet, ConcurrentSet};
pub use fingerprint::Fingerprint;
pub use list_set::LazySet;
