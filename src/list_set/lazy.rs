//! The lazy-synchronization sorted set: the core of this crate.
//!
//! Traversal (`locate`) never blocks. Mutators lock only the window(s) of
//! nodes they intend to touch, in ascending list-position order, validate
//! that the window is still live, and only then commit. `contains` and
//! `is_sorted` never take a lock.

use std::sync::atomic::Ordering;
use std::sync::MutexGuard;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;

use crate::adt::{ConcurrentReplaceSet, ConcurrentSet};
use crate::fingerprint::Fingerprint;
use crate::list_set::node::{Node, OrderKey};

/// A concurrent ordered set using lazy synchronization with optimistic
/// validation over a sorted singly-linked list of nodes keyed by
/// [`Fingerprint`].
///
/// See the crate-level docs for the concurrency and linearizability
/// argument; see [`LazySet::replace`] for the atomic two-window commit
/// protocol.
pub struct LazySet<T> {
    /// Always points at the immortal head sentinel; never null, never
    /// reassigned after construction.
    head: Atomic<Node<T>>,
}

unsafe impl<T: Send> Send for LazySet<T> {}
unsafe impl<T: Send> Sync for LazySet<T> {}

/// The window `(pred, curr)` straddling a key: `pred.key < target <=
/// curr.key` under [`OrderKey`]'s sentinel-aware ordering.
struct Window<'g, T> {
    pred: Shared<'g, Node<T>>,
    curr: Shared<'g, Node<T>>,
}

impl<T> LazySet<T> {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        // SAFETY: no other thread can observe this set yet.
        let guard = unsafe { epoch::unprotected() };
        let tail = Owned::new(Node::tail()).into_shared(guard);
        let head = Owned::new(Node::head(tail)).into_shared(guard);
        Self {
            head: Atomic::from(head),
        }
    }

    /// Walks from `head` to the first node whose key is not less than
    /// `target`, without locking and without filtering marked nodes — that
    /// is `validate`'s responsibility, not traversal's.
    fn locate<'g>(&self, target: OrderKey, guard: &'g Guard) -> Window<'g, T> {
        let mut pred = self.head.load(Ordering::Acquire, guard);
        // SAFETY: `head` is never null and never reclaimed while `self` is alive.
        let mut curr = unsafe { pred.deref() }.next.load(Ordering::Acquire, guard);
        loop {
            // SAFETY: every node reachable from `head` stays valid for the
            // life of `guard` (the epoch protects it even if concurrently
            // unlinked).
            let curr_ref = unsafe { curr.deref() };
            if curr_ref.key >= target {
                return Window { pred, curr };
            }
            pred = curr;
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }
    }

    /// Holding both `pred` and `curr` locked, confirms the window observed
    /// during the unlocked walk has not since been invalidated.
    fn validate(pred: &Node<T>, curr: Shared<'_, Node<T>>, guard: &Guard) -> bool {
        !pred.marked.load(Ordering::Acquire)
            && !unsafe { curr.deref() }.marked.load(Ordering::Acquire)
            && pred.next.load(Ordering::Acquire, guard) == curr
    }
}

impl<T> std::fmt::Debug for LazySet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySet").finish_non_exhaustive()
    }
}

impl<T> Default for LazySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Fingerprint> LazySet<T> {
    /// Wait-free membership test. Never blocks, never retries.
    ///
    /// A node counts as present only if it is unmarked *and* either it
    /// carries no `replacement` back-link or the node it points to is
    /// already marked — this is what keeps a `replace`'s new node
    /// invisible until its old node is logically gone.
    pub fn contains(&self, item: &T) -> bool {
        let guard = &epoch::pin();
        let target = OrderKey::Key(item.fingerprint());

        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            if curr_ref.key >= target {
                break;
            }
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }

        // SAFETY: see `locate`.
        let curr_ref = unsafe { curr.deref() };
        if curr_ref.key != target || curr_ref.marked.load(Ordering::Acquire) {
            return false;
        }

        let replacement = curr_ref.replacement.load(Ordering::Acquire, guard);
        if replacement.is_null() {
            return true;
        }
        // SAFETY: a non-null `replacement` always points at a node that is
        // still reachable (or was, and is pinned by this guard) until it is
        // marked, at which point the pointer is cleared by the thread that
        // published it.
        unsafe { replacement.deref() }.marked.load(Ordering::Acquire)
    }

    /// Inserts `item`. Returns `true` iff the set did not already contain an
    /// element with the same fingerprint.
    pub fn add(&self, item: T) -> bool {
        let target = OrderKey::Key(item.fingerprint());
        let backoff = Backoff::new();
        loop {
            let guard = &epoch::pin();
            let window = self.locate(target, guard);
            // SAFETY: see `locate`.
            let pred_ref = unsafe { window.pred.deref() };
            let curr_ref = unsafe { window.curr.deref() };

            let _pred_guard = pred_ref.lock.lock().unwrap();
            let _curr_guard = curr_ref.lock.lock().unwrap();

            if !Self::validate(pred_ref, window.curr, guard) {
                drop(_curr_guard);
                drop(_pred_guard);
                backoff.snooze();
                continue;
            }

            if curr_ref.key == target {
                return false;
            }

            let new_node = Owned::new(Node::new(item, window.curr)).into_shared(guard);
            pred_ref.next.store(new_node, Ordering::Release);
            return true;
        }
    }

    /// Removes `item`. Returns `true` iff it was present.
    pub fn remove(&self, item: &T) -> bool {
        let target = OrderKey::Key(item.fingerprint());
        let backoff = Backoff::new();
        loop {
            let guard = &epoch::pin();
            let window = self.locate(target, guard);
            // SAFETY: see `locate`.
            let pred_ref = unsafe { window.pred.deref() };
            let curr_ref = unsafe { window.curr.deref() };

            let _pred_guard = pred_ref.lock.lock().unwrap();
            let _curr_guard = curr_ref.lock.lock().unwrap();

            if !Self::validate(pred_ref, window.curr, guard) {
                drop(_curr_guard);
                drop(_pred_guard);
                backoff.snooze();
                continue;
            }

            if curr_ref.key != target {
                return false;
            }

            // Linearization point: from this store on, every reader rejects
            // `curr` regardless of reachability.
            curr_ref.marked.store(true, Ordering::Release);
            let next = curr_ref.next.load(Ordering::Acquire, guard);
            pred_ref.next.store(next, Ordering::Release);
            // SAFETY: `curr` is now unreachable and was unlinked by us alone.
            unsafe { guard.defer_destroy(window.curr) };
            return true;
        }
    }

    /// Atomically removes `old` (if present) and inserts `new` (if absent).
    ///
    /// If `old` and `new` share a fingerprint, this is defined to be
    /// equivalent to `add(new)` (the two keys map to the same list slot, so
    /// remove-then-add would be a no-op). Otherwise the two windows are
    /// located, their up-to-four candidate nodes are locked in ascending
    /// list-position order (deduplicated, since the windows may overlap),
    /// both are validated, and the set is committed per the case table in
    /// the crate docs.
    pub fn replace(&self, old: T, new: T) -> bool {
        let old_fp = old.fingerprint();
        let new_fp = new.fingerprint();
        if old_fp == new_fp {
            return self.add(new);
        }
        let old_key = OrderKey::Key(old_fp);
        let new_key = OrderKey::Key(new_fp);

        let backoff = Backoff::new();
        loop {
            let guard = &epoch::pin();
            let w_old = self.locate(old_key, guard);
            let w_new = self.locate(new_key, guard);

            let mut unique: Vec<Shared<'_, Node<T>>> = Vec::with_capacity(4);
            for candidate in [w_old.pred, w_old.curr, w_new.pred, w_new.curr] {
                if !unique.contains(&candidate) {
                    unique.push(candidate);
                }
            }
            // SAFETY: see `locate`. No two distinct live nodes share an
            // `OrderKey` (P2/P3), so sorting by key is a total, stable order
            // over these (already deduplicated) pointers.
            unique.sort_by_key(|node| unsafe { node.deref() }.key);

            let guards: Vec<MutexGuard<'_, ()>> = unique
                .iter()
                .map(|node| unsafe { node.deref() }.lock.lock().unwrap())
                .collect();

            // SAFETY: see `locate`.
            let pred_old_ref = unsafe { w_old.pred.deref() };
            let curr_old_ref = unsafe { w_old.curr.deref() };
            let pred_new_ref = unsafe { w_new.pred.deref() };
            let curr_new_ref = unsafe { w_new.curr.deref() };

            let old_valid = Self::validate(pred_old_ref, w_old.curr, guard);
            let new_valid = Self::validate(pred_new_ref, w_new.curr, guard);
            if !old_valid || !new_valid {
                drop(guards);
                backoff.snooze();
                continue;
            }

            let old_present = curr_old_ref.key == old_key;
            let new_present = curr_new_ref.key == new_key;

            let modified = match (old_present, new_present) {
                (false, false) => {
                    let node = Owned::new(Node::new(new, w_new.curr)).into_shared(guard);
                    pred_new_ref.next.store(node, Ordering::Release);
                    true
                }
                (false, true) => false,
                (true, false) => {
                    let replacement_node =
                        Owned::new(Node::new_replacing(new, w_new.curr, w_old.curr))
                            .into_shared(guard);
                    pred_new_ref.next.store(replacement_node, Ordering::Release);

                    // Linearization point: `old` becomes logically absent,
                    // and `replacement_node` becomes visible in the same
                    // instant (see `contains`'s replacement-pointer check).
                    curr_old_ref.marked.store(true, Ordering::Release);

                    let replacement_ref = unsafe { replacement_node.deref() };
                    let next_after_old = curr_old_ref.next.load(Ordering::Acquire, guard);
                    if pred_old_ref.next.load(Ordering::Acquire, guard) == w_old.curr {
                        pred_old_ref.next.store(next_after_old, Ordering::Release);
                    } else {
                        // The two windows overlapped so that `replacement_node`
                        // itself now sits immediately before `curr_old`.
                        replacement_ref.next.store(next_after_old, Ordering::Release);
                    }
                    replacement_ref
                        .replacement
                        .store(Shared::null(), Ordering::Release);

                    // SAFETY: `curr_old` is now unreachable and was unlinked
                    // by us alone.
                    unsafe { guard.defer_destroy(w_old.curr) };
                    true
                }
                (true, true) => {
                    curr_old_ref.marked.store(true, Ordering::Release);
                    let next_after_old = curr_old_ref.next.load(Ordering::Acquire, guard);
                    pred_old_ref.next.store(next_after_old, Ordering::Release);
                    // SAFETY: as above.
                    unsafe { guard.defer_destroy(w_old.curr) };
                    true
                }
            };

            drop(guards);
            return modified;
        }
    }

    /// Debug-only sortedness check: walks the physical chain from `head` to
    /// `tail`, confirming strict key increase. Ignores marks — it inspects
    /// only the physical chain, not logical membership. Not part of the
    /// operational contract; used by tests.
    pub fn is_sorted(&self) -> bool {
        let guard = &epoch::pin();
        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            // SAFETY: see `locate`.
            let curr_ref = unsafe { curr.deref() };
            let next = curr_ref.next.load(Ordering::Acquire, guard);
            if next.is_null() {
                return true;
            }
            // SAFETY: `next` just loaded non-null, valid for `guard`.
            let next_ref = unsafe { next.deref() };
            if curr_ref.key >= next_ref.key {
                return false;
            }
            curr = next;
        }
    }
}

impl<T: Fingerprint> ConcurrentSet<T> for LazySet<T> {
    fn contains(&self, item: &T) -> bool {
        LazySet::contains(self, item)
    }

    fn add(&self, item: T) -> bool {
        LazySet::add(self, item)
    }

    fn remove(&self, item: &T) -> bool {
        LazySet::remove(self, item)
    }
}

impl<T: Fingerprint> ConcurrentReplaceSet<T> for LazySet<T> {
    fn replace(&self, old: T, new: T) -> bool {
        LazySet::replace(self, old, new)
    }
}

impl<T> Drop for LazySet<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread can hold a reference
        // into this set any more.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next.load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}
