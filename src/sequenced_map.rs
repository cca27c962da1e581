//! Sequenced map implementation.
//!
//! This module provides the [`SequencedMap`] handle together with its live
//! views. The map keeps every entry in a doubly linked sequence (insertion
//! order unless an entry is placed with `put_first`) and indexes the sequence
//! by key through a hash table, so lookups, insertions at either end and
//! removals are all O(1).
//!
//! # Examples
//!
//! ```
//! use sequenced_map::sequenced_map::SequencedMap;
//!
//! let map: SequencedMap<_, _> = SequencedMap::default();
//! map.put("first", 1);
//! map.put("second", 2);
//!
//! let entries: Vec<_> = map.iter().map(|e| e.into_parts()).collect();
//! assert_eq!(entries, [("first", 1), ("second", 2)]);
//! ```

use alloc::rc::Rc;
use core::cell::Cell;
use core::cell::RefCell;
use core::cmp::Ordering;
use core::hash::BuildHasher;
use core::hash::Hash;

mod entry;
mod iter;
mod sequence;
mod view;

pub use entry::Entry;
pub use iter::EntryIter;
pub use iter::KeyIter;
pub use iter::SeqIter;
pub use iter::ValueIter;
pub use sequence::Direction;
pub use view::EntryProjection;
pub use view::EntrySet;
pub use view::KeyProjection;
pub use view::KeySet;
pub use view::Projection;
pub use view::ValueProjection;
pub use view::Values;
pub use view::View;

use crate::RandomState;
use sequence::Core;
use view::ViewCache;

/// Storage shared by every handle, view and iterator of one map.
pub(crate) struct Shared<K, V, S> {
    pub(crate) core: RefCell<Core<K, V, S>>,
    pub(crate) views: RefCell<ViewCache<K, V, S>>,
    /// Bumped by `clear`; views remember the epoch they were created in.
    pub(crate) epoch: Cell<u64>,
}

impl<K, V, S> Shared<K, V, S> {
    fn new(core: Core<K, V, S>) -> Rc<Self> {
        Rc::new(Shared {
            core: RefCell::new(core),
            views: RefCell::new(ViewCache::default()),
            epoch: Cell::new(0),
        })
    }

    pub(crate) fn clear(&self) {
        let dropped = {
            let mut core = self.core.borrow_mut();
            let len = core.len();
            core.clear();
            len
        };

        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);
        let detached = core::mem::take(&mut *self.views.borrow_mut());
        drop(detached);

        tracing::debug!(dropped, epoch, "cleared map; cached views detached");
    }
}

/// A hash map that keeps its entries in a mutable sequence.
///
/// New keys are appended at the tail by [`put`](Self::put) and
/// [`put_last`](Self::put_last), or placed at the head by
/// [`put_first`](Self::put_first). Replacing the value of an existing key
/// never moves it. The sequence can be read from either end through
/// [`key_set`](Self::key_set), [`values`](Self::values),
/// [`entry_set`](Self::entry_set) and [`reversed`](Self::reversed).
///
/// `SequencedMap` is a handle: it carries a reference to shared storage and a
/// [`Direction`]. All operations take `&self`. [`reversed`](Self::reversed)
/// returns another handle to the same storage with the direction flipped, so
/// everything that talks about "first" and "last" is mirrored, while
/// [`Clone`] makes an independent copy. Values cannot be borrowed out of the
/// shared storage, so lookups and iteration hand out clones.
///
/// The map is single-threaded (`!Send`, `!Sync`).
///
/// Equality and hashing ignore order. Ordering compares sizes only, so two
/// maps of the same length compare as `Ordering::Equal` even when they are
/// not equal.
///
/// # Examples
///
/// ```
/// use sequenced_map::SequencedMap;
///
/// let map = SequencedMap::new();
/// map.put(1, "a");
/// map.put(2, "b");
/// map.put(3, "c");
///
/// // Updating keeps the position.
/// assert_eq!(map.put(2, "B"), Some("b"));
/// let keys: Vec<_> = map.key_set().iter().collect();
/// assert_eq!(keys, [1, 2, 3]);
///
/// // The reversed handle mirrors first/last.
/// let reversed = map.reversed();
/// assert_eq!(reversed.first_entry().unwrap().into_parts(), (3, "c"));
/// reversed.put(0, "z"); // "last" in reverse order is the head
/// assert_eq!(map.first_entry().unwrap().into_parts(), (0, "z"));
/// assert!(SequencedMap::ptr_eq(&reversed.reversed(), &map));
/// ```
pub struct SequencedMap<K, V, S = RandomState> {
    shared: Rc<Shared<K, V, S>>,
    direction: Direction,
}

impl<K, V> SequencedMap<K, V> {
    /// Creates an empty map. It does not allocate until the first insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map: SequencedMap<&str, i32> = SequencedMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty map able to hold `capacity` entries without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::default())
    }
}

impl<K, V, S> SequencedMap<K, V, S> {
    /// Creates an empty map that hashes keys with `hasher`.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Creates an empty map with room for `capacity` entries that hashes keys
    /// with `hasher`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hashbrown::DefaultHashBuilder as RandomState;
    /// use sequenced_map::sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::with_capacity_and_hasher(10, RandomState::default());
    /// map.put("key", 42);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        SequencedMap {
            shared: Shared::new(Core::with_capacity_and_hasher(capacity, hasher)),
            direction: Direction::Forward,
        }
    }

    /// Returns `true` if both handles use the same storage in the same
    /// direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map: SequencedMap<i32, i32> = SequencedMap::new();
    /// assert!(SequencedMap::ptr_eq(&map.reversed().reversed(), &map));
    /// assert!(!SequencedMap::ptr_eq(&map.reversed(), &map));
    /// assert!(!SequencedMap::ptr_eq(&map.clone(), &map));
    /// ```
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.shared, &other.shared) && this.direction == other.direction
    }

    /// The direction this handle reads the sequence in.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns a handle to the same storage with first and last swapped.
    ///
    /// `put` and `put_last` on the reversed handle insert new keys at the head
    /// of the original sequence, `put_first` at its tail. Reversing twice gives
    /// a handle for which [`ptr_eq`](Self::ptr_eq) with the original holds.
    pub fn reversed(&self) -> Self {
        SequencedMap {
            shared: Rc::clone(&self.shared),
            direction: self.direction.flip(),
        }
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.core.borrow().len()
    }

    /// Returns `true` if the map has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    ///
    /// Every key, value and entry view obtained before the call is detached
    /// and stays empty; the views handed out afterwards are new objects.
    /// Handles, including reversed ones, keep working.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::rc::Rc;
    ///
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// let keys = map.key_set();
    ///
    /// map.clear();
    /// map.put(2, "b");
    ///
    /// assert!(keys.is_empty());
    /// assert!(!Rc::ptr_eq(&keys, &map.key_set()));
    /// assert_eq!(map.key_set().len(), 1);
    /// ```
    pub fn clear(&self) {
        self.shared.clear();
    }

    /// Releases spare capacity.
    pub fn shrink_to_fit(&self) {
        self.shared.core.borrow_mut().shrink_to_fit();
    }

    /// Removes and returns the first entry in this handle's direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// map.put(2, "b");
    ///
    /// assert_eq!(map.poll_first_entry().unwrap().into_parts(), (1, "a"));
    /// assert_eq!(map.reversed().poll_first_entry().unwrap().into_parts(), (2, "b"));
    /// assert!(map.poll_first_entry().is_none());
    /// ```
    pub fn poll_first_entry(&self) -> Option<Entry<K, V>> {
        self.poll(self.direction)
    }

    /// Removes and returns the last entry in this handle's direction.
    pub fn poll_last_entry(&self) -> Option<Entry<K, V>> {
        self.poll(self.direction.flip())
    }

    fn poll(&self, direction: Direction) -> Option<Entry<K, V>> {
        let mut core = self.shared.core.borrow_mut();
        let ptr = core.first(direction)?;
        let (key, value) = core.remove_ptr(ptr);
        Some(Entry::new(key, value))
    }

    /// Returns `true` if any key maps to `value`. This scans the sequence.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.shared
            .core
            .borrow()
            .find_value(value, Direction::Forward)
            .is_some()
    }

    /// Keeps only the entries for which `f` returns `true`, visiting them in
    /// this handle's direction. `f` may modify values but must not touch the
    /// map itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// for i in 1..=4 {
    ///     map.put(i, i * 10);
    /// }
    /// map.retain(|key, value| {
    ///     *value += 1;
    ///     key % 2 == 0
    /// });
    /// let entries: Vec<_> = map.iter().map(|e| e.into_parts()).collect();
    /// assert_eq!(entries, [(2, 21), (4, 41)]);
    /// ```
    pub fn retain<F>(&self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut core = self.shared.core.borrow_mut();
        let mut cursor = core.first(self.direction);
        while let Some(ptr) = cursor {
            cursor = core.step(ptr, self.direction);
            let keep = {
                let (key, value) = core.entry_mut(ptr);
                f(key, value)
            };
            if !keep {
                core.remove_ptr(ptr);
            }
        }
    }
}

impl<K: Clone, V: Clone, S> SequencedMap<K, V, S> {
    /// Returns a snapshot of the first entry in this handle's direction.
    pub fn first_entry(&self) -> Option<Entry<K, V>> {
        self.snapshot(self.direction)
    }

    /// Returns a snapshot of the last entry in this handle's direction.
    pub fn last_entry(&self) -> Option<Entry<K, V>> {
        self.snapshot(self.direction.flip())
    }

    fn snapshot(&self, direction: Direction) -> Option<Entry<K, V>> {
        let core = self.shared.core.borrow();
        let ptr = core.first(direction)?;
        Some(Entry::new(core.key(ptr).clone(), core.value(ptr).clone()))
    }

    /// Iterates snapshot entries in this handle's direction. Same as
    /// `self.entry_set().iter()`.
    pub fn iter(&self) -> EntryIter<K, V, S> {
        SeqIter::new(Some(Rc::clone(&self.shared)), self.direction)
    }

    /// The live view of this map's keys, in this handle's direction.
    pub fn key_set(&self) -> Rc<KeySet<K, V, S>> {
        View::obtain(&self.shared, self.direction)
    }

    /// The live view of this map's values, in this handle's direction.
    pub fn values(&self) -> Rc<Values<K, V, S>> {
        View::obtain(&self.shared, self.direction)
    }

    /// The live view of this map's entries, in this handle's direction.
    pub fn entry_set(&self) -> Rc<EntrySet<K, V, S>> {
        View::obtain(&self.shared, self.direction)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> SequencedMap<K, V, S> {
    /// Returns a clone of the value for `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// assert_eq!(map.get(&1), Some("a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let core = self.shared.core.borrow();
        core.find(key).map(|ptr| core.value(ptr).clone())
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shared.core.borrow().find(key).is_some()
    }

    /// Inserts `value` for `key`.
    ///
    /// An existing key keeps its position and its old value is returned. A new
    /// key is placed last in this handle's direction: at the tail for a
    /// forward handle, at the head for a reversed one.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// assert_eq!(map.put(37, "a"), None);
    /// assert_eq!(map.put(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some("b"));
    /// ```
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.put_last(key, value)
    }

    /// Like [`put`](Self::put), but a new key is placed first in this
    /// handle's direction.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// map.put(2, "b");
    /// map.put_first(3, "c");
    /// assert_eq!(map.put_first(2, "B"), Some("b"));
    ///
    /// let keys: Vec<_> = map.key_set().iter().collect();
    /// assert_eq!(keys, [3, 1, 2]);
    /// ```
    pub fn put_first(&self, key: K, value: V) -> Option<V> {
        self.shared
            .core
            .borrow_mut()
            .insert(key, value, self.direction.first_end())
    }

    /// Like [`put`](Self::put): a new key is placed last in this handle's
    /// direction, an existing key keeps its position.
    pub fn put_last(&self, key: K, value: V) -> Option<V> {
        self.shared
            .core
            .borrow_mut()
            .insert(key, value, self.direction.last_end())
    }

    /// Applies [`put_last`](Self::put_last) to every entry of `other`, in
    /// `other`'s order.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    ///
    /// let other = SequencedMap::new();
    /// other.put(2, "b");
    /// other.put(1, "A");
    /// other.put(3, "c");
    ///
    /// map.put_all(&other);
    /// let entries: Vec<_> = map.iter().map(|e| e.into_parts()).collect();
    /// assert_eq!(entries, [(1, "A"), (2, "b"), (3, "c")]);
    /// ```
    pub fn put_all(&self, other: &SequencedMap<K, V, S>)
    where
        K: Clone,
        V: Clone,
    {
        // Every put_last would rewrite an entry with itself.
        if Rc::ptr_eq(&self.shared, &other.shared) {
            return;
        }

        let source = other.shared.core.borrow();
        let mut core = self.shared.core.borrow_mut();
        let end = self.direction.last_end();
        for (key, value) in source.iter(other.direction) {
            core.insert(key.clone(), value.clone(), end);
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry(&self, key: &K) -> Option<(K, V)> {
        self.shared.core.borrow_mut().remove(key)
    }

    /// Removes `key` only if it currently maps to a value equal to `value`.
    /// Returns whether the entry was removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use sequenced_map::SequencedMap;
    ///
    /// let map = SequencedMap::new();
    /// map.put(1, "a");
    /// assert!(!map.remove_mapping(&1, &"b"));
    /// assert!(map.remove_mapping(&1, &"a"));
    /// assert!(map.is_empty());
    /// ```
    pub fn remove_mapping(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let mut core = self.shared.core.borrow_mut();
        match core.find(key) {
            Some(ptr) if core.value(ptr) == value => {
                core.remove_ptr(ptr);
                true
            }
            _ => false,
        }
    }
}

impl<K, V, S: BuildHasher + Default> Default for SequencedMap<K, V, S> {
    fn default() -> Self {
        SequencedMap::with_capacity_and_hasher(0, S::default())
    }
}

/// Copies the entries into new storage. The copy has the same order and
/// direction but shares nothing with `self`.
impl<K: Clone, V: Clone, S: Clone> Clone for SequencedMap<K, V, S> {
    fn clone(&self) -> Self {
        let core = self.shared.core.borrow().clone();
        SequencedMap {
            shared: Shared::new(core),
            direction: self.direction,
        }
    }
}

impl<K: core::fmt::Debug, V: core::fmt::Debug, S> core::fmt::Debug for SequencedMap<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let core = self.shared.core.borrow();
        f.debug_map().entries(core.iter(self.direction)).finish()
    }
}

impl<K, V, S> PartialEq for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        let this = self.shared.core.borrow();
        let that = other.shared.core.borrow();
        if this.len() != that.len() {
            return false;
        }

        this.iter(Direction::Forward)
            .all(|(key, value)| that.find(key).is_some_and(|ptr| that.value(ptr) == value))
    }
}

impl<K, V, S> Eq for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

/// Sum of per-entry hashes, so equal maps hash equally regardless of order
/// or hasher. Entries are hashed with a fixed-seed hasher.
impl<K: Hash, V: Hash, S> Hash for SequencedMap<K, V, S> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        let entry_hasher = foldhash::fast::FixedState::default();
        let core = self.shared.core.borrow();
        let sum = core
            .iter(Direction::Forward)
            .fold(0u64, |sum, entry| sum.wrapping_add(entry_hasher.hash_one(entry)));
        state.write_u64(sum);
    }
}

/// Orders by length only. Maps of equal length compare `Equal` even when
/// their contents differ.
impl<K, V, S> PartialOrd for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.len().cmp(&other.len()))
    }
}

impl<K, V, S> Ord for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.len().cmp(&other.len())
    }
}

impl<K, V, S> FromIterator<(K, V)> for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for SequencedMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<'a, K: Clone, V: Clone, S> IntoIterator for &'a SequencedMap<K, V, S> {
    type IntoIter = EntryIter<K, V, S>;
    type Item = Entry<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
