//! The element contract for [`crate::list_set::LazySet`].
//!
//! The set never compares whole elements: it orders and identifies them
//! solely by a 32-bit fingerprint, and treats fingerprint collisions as
//! equality. This is a known, intentional limitation of the design (see the
//! crate-level docs), not an oversight.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Supplies the 32-bit fingerprint used to order and identify an element.
///
/// Two elements with the same fingerprint are indistinguishable to
/// [`crate::list_set::LazySet`]: whichever one is inserted first "wins", and
/// a later insert of a fingerprint-equal-but-distinct value is reported as
/// already present.
pub trait Fingerprint {
    /// Returns this element's fingerprint.
    fn fingerprint(&self) -> i32;
}

fn hash_fingerprint<T: Hash + ?Sized>(value: &T) -> i32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish() as i32
}

macro_rules! impl_fingerprint_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Fingerprint for $ty {
                fn fingerprint(&self) -> i32 {
                    *self as i32
                }
            }
        )*
    };
}

impl_fingerprint_identity!(i8, i16, i32, u8, u16, u32);

macro_rules! impl_fingerprint_hashed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Fingerprint for $ty {
                fn fingerprint(&self) -> i32 {
                    hash_fingerprint(self)
                }
            }
        )*
    };
}

impl_fingerprint_hashed!(i64, u64, isize, usize, String);

impl Fingerprint for str {
    fn fingerprint(&self) -> i32 {
        hash_fingerprint(self)
    }
}
