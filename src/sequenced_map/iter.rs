use alloc::rc::Rc;
use core::marker::PhantomData;

use super::Shared;
use super::sequence::Core;
use super::sequence::Direction;
use super::view::EntryProjection;
use super::view::KeyProjection;
use super::view::Projection;
use super::view::ValueProjection;
use crate::MapError;
use crate::Ptr;
use crate::RandomState;

#[cold]
#[inline(never)]
fn modified_during_iteration() -> ! {
    panic!("SequencedMap was structurally modified outside of this iterator");
}

/// An iterator over a map's sequence in one direction, able to remove the
/// element it yielded last.
///
/// Items are clones taken at the moment `next` runs: keys for
/// [`KeyIter`], values for [`ValueIter`] and snapshot entries for
/// [`EntryIter`]. The iterator keeps the storage alive but holds no borrow of
/// it between calls.
///
/// Removing through [`remove`](SeqIter::remove) is the only supported way to
/// change the structure of the map mid-traversal. Any other insertion or
/// removal makes the next call to `next` or `remove` panic. Replacing the
/// value of an existing key is not a structural change.
///
/// # Examples
///
/// ```
/// use sequenced_map::SequencedMap;
///
/// let map = SequencedMap::new();
/// for (k, v) in [(1, "a"), (2, "b"), (3, "c")] {
///     map.put(k, v);
/// }
///
/// let mut keys = map.key_set().iter();
/// while let Some(key) = keys.next() {
///     if key % 2 == 1 {
///         keys.remove().unwrap();
///     }
/// }
/// assert_eq!(map.len(), 1);
/// assert_eq!(map.get(&2), Some("b"));
/// ```
pub struct SeqIter<K, V, S, P> {
    shared: Option<Rc<Shared<K, V, S>>>,
    cursor: Option<Ptr>,
    last: Option<Ptr>,
    direction: Direction,
    expected_mod_count: u64,
    _projection: PhantomData<fn() -> P>,
}

/// Iterator over keys, see [`SeqIter`].
pub type KeyIter<K, V, S = RandomState> = SeqIter<K, V, S, KeyProjection>;
/// Iterator over values, see [`SeqIter`].
pub type ValueIter<K, V, S = RandomState> = SeqIter<K, V, S, ValueProjection>;
/// Iterator over snapshot entries, see [`SeqIter`].
pub type EntryIter<K, V, S = RandomState> = SeqIter<K, V, S, EntryProjection>;

#[inline]
fn ensure_unmodified<K, V, S>(expected: u64, core: &Core<K, V, S>) {
    if core.mod_count() != expected {
        modified_during_iteration();
    }
}

impl<K, V, S, P> SeqIter<K, V, S, P> {
    /// Seeds the iterator at the first node in `direction`. `None` storage
    /// yields an iterator that is already exhausted.
    pub(crate) fn new(shared: Option<Rc<Shared<K, V, S>>>, direction: Direction) -> Self {
        let (cursor, expected_mod_count) = match &shared {
            Some(shared) => {
                let core = shared.core.borrow();
                (core.first(direction), core.mod_count())
            }
            None => (None, 0),
        };

        SeqIter {
            shared,
            cursor,
            last: None,
            direction,
            expected_mod_count,
            _projection: PhantomData,
        }
    }

    /// The direction this iterator walks in.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` if a call to `next` would yield an element.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    /// Removes the element most recently returned by `next` from the map.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidIteratorState`] if `next` has not yielded
    /// anything yet, or if the last yielded element was already removed. The
    /// map is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::MapError;
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// map.put(2, "b");
    ///
    /// let mut values = map.values().iter();
    /// assert_eq!(values.remove(), Err(MapError::InvalidIteratorState));
    /// assert_eq!(values.next(), Some("a"));
    /// assert_eq!(values.remove(), Ok(()));
    /// assert_eq!(values.remove(), Err(MapError::InvalidIteratorState));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn remove(&mut self) -> Result<(), MapError> {
        let (Some(shared), Some(ptr)) = (self.shared.as_ref(), self.last) else {
            return Err(MapError::InvalidIteratorState);
        };

        let mut core = shared.core.borrow_mut();
        ensure_unmodified(self.expected_mod_count, &core);
        core.remove_ptr(ptr);
        self.expected_mod_count = core.mod_count();
        self.last = None;

        tracing::trace!(
            direction = ?self.direction,
            remaining = core.len(),
            "removed entry through iterator"
        );
        Ok(())
    }
}

impl<K, V, S, P: Projection<K, V>> Iterator for SeqIter<K, V, S, P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let shared = self.shared.as_ref()?;
        let ptr = self.cursor?;

        let core = shared.core.borrow();
        ensure_unmodified(self.expected_mod_count, &core);
        self.cursor = core.step(ptr, self.direction);
        self.last = Some(ptr);

        Some(P::project(core.key(ptr), core.value(ptr)))
    }
}

impl<K, V, S, P> core::fmt::Debug for SeqIter<K, V, S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeqIter")
            .field("direction", &self.direction)
            .field("cursor", &self.cursor)
            .field("last", &self.last)
            .finish()
    }
}
