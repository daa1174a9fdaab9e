use std::sync::atomic::AtomicBool;
use std::sync::Mutex;

use crossbeam_epoch::{Atomic, Shared};

use crate::fingerprint::Fingerprint;

/// Total order used to place the sentinel nodes at -infinity / +infinity
/// regardless of any real fingerprint value.
///
/// `head` and `tail` never carry an `item`, so they have no fingerprint of
/// their own; giving them dedicated order variants (rather than, say,
/// `i32::MIN`/`i32::MAX`) keeps sentinel ordering correct even for elements
/// whose fingerprint happens to collide with those bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum OrderKey {
    NegInf,
    Key(i32),
    PosInf,
}

/// A list cell: a sentinel (`item: None`) or a node holding one element.
#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) item: Option<T>,
    pub(crate) key: OrderKey,
    pub(crate) marked: AtomicBool,
    pub(crate) next: Atomic<Node<T>>,
    /// Transient back-link to the node this one is displacing, set for the
    /// duration of a `replace`'s atomic window (see `LazySet::replace`).
    pub(crate) replacement: Atomic<Node<T>>,
    /// Per-node mutex. Guards `next`/`marked`/`replacement` against other
    /// mutators; wait-free readers (`contains`, `is_sorted`) never take it.
    pub(crate) lock: Mutex<()>,
}

impl<T> Node<T> {
    fn sentinel(key: OrderKey, next: Shared<'_, Node<T>>) -> Self {
        Self {
            item: None,
            key,
            marked: AtomicBool::new(false),
            next: Atomic::from(next),
            replacement: Atomic::null(),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn head(tail: Shared<'_, Node<T>>) -> Self {
        Self::sentinel(OrderKey::NegInf, tail)
    }

    pub(crate) fn tail() -> Self {
        Self::sentinel(OrderKey::PosInf, Shared::null())
    }
}

impl<T: Fingerprint> Node<T> {
    pub(crate) fn new(item: T, next: Shared<'_, Node<T>>) -> Self {
        let key = OrderKey::Key(item.fingerprint());
        Self {
            item: Some(item),
            key,
            marked: AtomicBool::new(false),
            next: Atomic::from(next),
            replacement: Atomic::null(),
            lock: Mutex::new(()),
        }
    }

    /// Builds a freshly-allocated node that temporarily hides itself behind
    /// `replacement` until that node is marked — see `LazySet::replace`.
    pub(crate) fn new_replacing(
        item: T,
        next: Shared<'_, Node<T>>,
        replacement: Shared<'_, Node<T>>,
    ) -> Self {
        let mut node = Self::new(item, next);
        node.replacement = Atomic::from(replacement);
        node
    }
}
