use alloc::rc::Rc;
use alloc::rc::Weak;
use core::cell::OnceCell;
use core::cell::RefCell;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::marker::PhantomData;

use super::Shared;
use super::entry::Entry;
use super::iter::SeqIter;
use super::sequence::Direction;
use crate::MapError;
use crate::RandomState;

mod sealed {
    use alloc::rc::Rc;

    use super::View;
    use super::ViewCache;

    pub trait Sealed<K, V>: Sized {
        fn slot<S>(cache: &mut ViewCache<K, V, S>) -> &mut [Option<Rc<View<K, V, S, Self>>>; 2];
    }
}

/// Selects which part of an entry a [`View`] or [`SeqIter`] hands out.
///
/// Implemented by [`KeyProjection`], [`ValueProjection`] and
/// [`EntryProjection`]; the trait is sealed.
pub trait Projection<K, V>: sealed::Sealed<K, V> {
    /// The element type of the view.
    type Item;

    /// Name used in diagnostics.
    const KIND: &'static str;

    #[doc(hidden)]
    fn project(key: &K, value: &V) -> Self::Item;
}

/// Projects keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyProjection;

/// Projects values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValueProjection;

/// Projects snapshot [`Entry`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntryProjection;

impl<K, V> sealed::Sealed<K, V> for KeyProjection {
    #[inline]
    fn slot<S>(cache: &mut ViewCache<K, V, S>) -> &mut [Option<Rc<KeySet<K, V, S>>>; 2] {
        &mut cache.keys
    }
}

impl<K, V> sealed::Sealed<K, V> for ValueProjection {
    #[inline]
    fn slot<S>(cache: &mut ViewCache<K, V, S>) -> &mut [Option<Rc<Values<K, V, S>>>; 2] {
        &mut cache.values
    }
}

impl<K, V> sealed::Sealed<K, V> for EntryProjection {
    #[inline]
    fn slot<S>(cache: &mut ViewCache<K, V, S>) -> &mut [Option<Rc<EntrySet<K, V, S>>>; 2] {
        &mut cache.entries
    }
}

impl<K: Clone, V> Projection<K, V> for KeyProjection {
    type Item = K;

    const KIND: &'static str = "keys";

    #[inline]
    fn project(key: &K, _value: &V) -> K {
        key.clone()
    }
}

impl<K, V: Clone> Projection<K, V> for ValueProjection {
    type Item = V;

    const KIND: &'static str = "values";

    #[inline]
    fn project(_key: &K, value: &V) -> V {
        value.clone()
    }
}

impl<K: Clone, V: Clone> Projection<K, V> for EntryProjection {
    type Item = Entry<K, V>;

    const KIND: &'static str = "entries";

    #[inline]
    fn project(key: &K, value: &V) -> Entry<K, V> {
        Entry::new(key.clone(), value.clone())
    }
}

/// The views handed out by one storage epoch, one slot per direction.
/// Replaced wholesale by `clear`.
pub struct ViewCache<K, V, S> {
    keys: [Option<Rc<KeySet<K, V, S>>>; 2],
    values: [Option<Rc<Values<K, V, S>>>; 2],
    entries: [Option<Rc<EntrySet<K, V, S>>>; 2],
}

impl<K, V, S> Default for ViewCache<K, V, S> {
    fn default() -> Self {
        ViewCache {
            keys: [None, None],
            values: [None, None],
            entries: [None, None],
        }
    }
}

/// A live projection of a map's sequence as a collection of keys, values or
/// entries.
///
/// Views never copy the map. Every query reads the current contents, and
/// removals through a view remove from the map. Each map caches one view per
/// kind and direction, so asking twice returns the same `Rc`, and
/// [`reversed`](View::reversed) on a reversed view returns the original.
///
/// [`SequencedMap::clear`](crate::sequenced_map::SequencedMap::clear)
/// detaches every view handed out before it: a detached view is permanently
/// empty, and the map hands out fresh views afterwards. A view whose map has
/// been dropped behaves the same way. Detached views stay paired with their
/// reversed counterpart, so reversing twice still returns the same view.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
///
/// use sequenced_map::SequencedMap;
///
/// let map = SequencedMap::new();
/// map.put("a", 1);
/// map.put("b", 2);
///
/// let keys = map.key_set();
/// assert!(Rc::ptr_eq(&keys, &map.key_set()));
/// assert!(Rc::ptr_eq(&keys.reversed().reversed(), &keys));
///
/// assert_eq!(keys.get_last(), Ok("b"));
/// assert_eq!(keys.reversed().get_last(), Ok("a"));
///
/// assert!(keys.remove(&"a"));
/// assert_eq!(map.len(), 1);
/// ```
pub struct View<K, V, S, P> {
    shared: Weak<Shared<K, V, S>>,
    epoch: u64,
    direction: Direction,
    this: Weak<Self>,
    /// The view for the opposite direction, once both exist.
    counterpart: RefCell<Weak<Self>>,
    /// Counterpart created after detaching; nothing else keeps it alive.
    owned_counterpart: OnceCell<Rc<Self>>,
    _projection: PhantomData<fn() -> P>,
}

/// Live view of a map's keys.
pub type KeySet<K, V, S = RandomState> = View<K, V, S, KeyProjection>;
/// Live view of a map's values.
pub type Values<K, V, S = RandomState> = View<K, V, S, ValueProjection>;
/// Live view of a map's entries, as snapshots.
pub type EntrySet<K, V, S = RandomState> = View<K, V, S, EntryProjection>;

impl<K, V, S, P> View<K, V, S, P> {
    fn new_rc(
        shared: Weak<Shared<K, V, S>>,
        epoch: u64,
        direction: Direction,
        counterpart: Weak<Self>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| View {
            shared,
            epoch,
            direction,
            this: this.clone(),
            counterpart: RefCell::new(counterpart),
            owned_counterpart: OnceCell::new(),
            _projection: PhantomData,
        })
    }

    /// The storage behind this view, if the view has not been detached.
    fn live(&self) -> Option<Rc<Shared<K, V, S>>> {
        self.shared
            .upgrade()
            .filter(|shared| shared.epoch.get() == self.epoch)
    }

    /// The direction this view presents the sequence in.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` once `clear` (or dropping the map) has detached this
    /// view.
    pub fn is_detached(&self) -> bool {
        self.live().is_none()
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.live().map_or(0, |shared| shared.core.borrow().len())
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the backing map. This view is detached by the call.
    pub fn clear(&self) {
        if let Some(shared) = self.live() {
            shared.clear();
        }
    }
}

impl<K, V, S, P: Projection<K, V>> View<K, V, S, P> {
    /// Returns the cached view of kind `P` for `direction`, creating it on
    /// first use in the current epoch.
    pub(crate) fn obtain(shared: &Rc<Shared<K, V, S>>, direction: Direction) -> Rc<Self> {
        let mut cache = shared.views.borrow_mut();
        let slots = P::slot(&mut *cache);
        if let Some(view) = &slots[direction.index()] {
            return Rc::clone(view);
        }

        let epoch = shared.epoch.get();
        tracing::trace!(kind = P::KIND, ?direction, epoch, "creating view");
        let opposite = slots[direction.flip().index()]
            .as_ref()
            .map_or_else(Weak::new, Rc::downgrade);
        let view = View::new_rc(Rc::downgrade(shared), epoch, direction, opposite.clone());
        if let Some(opposite) = opposite.upgrade() {
            *opposite.counterpart.borrow_mut() = Rc::downgrade(&view);
        }
        slots[direction.index()] = Some(Rc::clone(&view));
        view
    }

    /// Returns the view presenting the same contents in the opposite
    /// direction. Reversing twice yields this view again.
    ///
    /// A detached view reverses into a detached, empty view, and reversing
    /// that again returns this view.
    pub fn reversed(&self) -> Rc<Self> {
        if let Some(shared) = self.live() {
            return View::obtain(&shared, self.direction.flip());
        }
        if let Some(counterpart) = self.counterpart.borrow().upgrade() {
            return counterpart;
        }

        let counterpart = self.owned_counterpart.get_or_init(|| {
            View::new_rc(
                self.shared.clone(),
                self.epoch,
                self.direction.flip(),
                self.this.clone(),
            )
        });
        *self.counterpart.borrow_mut() = Rc::downgrade(counterpart);
        Rc::clone(counterpart)
    }

    /// Iterates the sequence in this view's direction.
    pub fn iter(&self) -> SeqIter<K, V, S, P> {
        SeqIter::new(self.live(), self.direction)
    }

    /// The first element in this view's direction.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Empty`] if the map is empty or the view detached.
    pub fn get_first(&self) -> Result<P::Item, MapError> {
        self.element_at(self.direction)
    }

    /// The last element in this view's direction.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Empty`] if the map is empty or the view detached.
    pub fn get_last(&self) -> Result<P::Item, MapError> {
        self.element_at(self.direction.flip())
    }

    fn element_at(&self, direction: Direction) -> Result<P::Item, MapError> {
        let shared = self.live().ok_or(MapError::Empty)?;
        let core = shared.core.borrow();
        let ptr = core.first(direction).ok_or(MapError::Empty)?;
        Ok(P::project(core.key(ptr), core.value(ptr)))
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> View<K, V, S, KeyProjection> {
    /// Returns `true` if the map contains `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.live()
            .is_some_and(|shared| shared.core.borrow().find(key).is_some())
    }

    /// Removes `key` from the map. Returns whether anything was removed.
    pub fn remove(&self, key: &K) -> bool {
        self.live()
            .is_some_and(|shared| shared.core.borrow_mut().remove(key).is_some())
    }
}

impl<K, V: PartialEq, S> View<K, V, S, ValueProjection> {
    /// Returns `true` if any key maps to `value`.
    pub fn contains(&self, value: &V) -> bool {
        self.live().is_some_and(|shared| {
            shared
                .core
                .borrow()
                .find_value(value, Direction::Forward)
                .is_some()
        })
    }

    /// Removes the first entry, in this view's direction, whose value equals
    /// `value`. Returns whether anything was removed.
    pub fn remove(&self, value: &V) -> bool {
        let Some(shared) = self.live() else {
            return false;
        };
        let mut core = shared.core.borrow_mut();
        match core.find_value(value, self.direction) {
            Some(ptr) => {
                core.remove_ptr(ptr);
                true
            }
            None => false,
        }
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> View<K, V, S, EntryProjection> {
    /// Returns `true` if the map currently maps the entry's key to an equal
    /// value.
    pub fn contains(&self, entry: &Entry<K, V>) -> bool {
        self.live().is_some_and(|shared| {
            let core = shared.core.borrow();
            core.find(entry.key())
                .is_some_and(|ptr| core.value(ptr) == entry.value())
        })
    }

    /// Removes the entry's key only if it currently maps to an equal value.
    pub fn remove(&self, entry: &Entry<K, V>) -> bool {
        let Some(shared) = self.live() else {
            return false;
        };
        let mut core = shared.core.borrow_mut();
        match core.find(entry.key()) {
            Some(ptr) if core.value(ptr) == entry.value() => {
                core.remove_ptr(ptr);
                true
            }
            _ => false,
        }
    }
}

impl<'a, K, V, S, P: Projection<K, V>> IntoIterator for &'a View<K, V, S, P> {
    type IntoIter = SeqIter<K, V, S, P>;
    type Item = P::Item;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S, P> core::fmt::Debug for View<K, V, S, P>
where
    P: Projection<K, V>,
    P::Item: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
