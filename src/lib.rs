#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]

mod arena;
mod error;
pub mod sequenced_map;

extern crate alloc;

use core::num::NonZeroU32;

#[cfg(feature = "std")]
type RandomState = std::hash::RandomState;
#[cfg(not(feature = "std"))]
type RandomState = hashbrown::DefaultHashBuilder;

/// A hash map that keeps its entries in a mutable sequence and exposes that
/// sequence through live key, value and entry views.
///
/// This is the main type alias using the default hasher. For custom hashers,
/// use [`sequenced_map::SequencedMap`] directly.
///
/// # Examples
///
/// ```
/// use sequenced_map::SequencedMap;
///
/// let map = SequencedMap::new();
/// map.put("a", 1);
/// map.put("b", 2);
/// map.put_first("z", 0);
///
/// let keys: Vec<_> = map.key_set().iter().collect();
/// assert_eq!(keys, ["z", "a", "b"]);
/// ```
pub type SequencedMap<K, V> = crate::sequenced_map::SequencedMap<K, V, RandomState>;

pub use error::MapError;
pub use sequenced_map::Direction;
pub use sequenced_map::Entry;
pub use sequenced_map::EntryIter;
pub use sequenced_map::EntryProjection;
pub use sequenced_map::EntrySet;
pub use sequenced_map::KeyIter;
pub use sequenced_map::KeyProjection;
pub use sequenced_map::KeySet;
pub use sequenced_map::Projection;
pub use sequenced_map::SeqIter;
pub use sequenced_map::ValueIter;
pub use sequenced_map::ValueProjection;
pub use sequenced_map::Values;
pub use sequenced_map::View;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
/// Index of a node slot in the map's arena.
///
/// Slots are reused after removal, so a `Ptr` only identifies a node for as
/// long as that node stays in the map. `Option<Ptr>` is the same size as
/// `Ptr`, which is how neighbor links encode "no neighbor".
pub(crate) struct Ptr(NonZeroU32);

impl core::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Ptr({})", self.0.get() - 1)
    }
}

impl Ptr {
    pub(crate) fn unchecked_from(index: usize) -> Self {
        debug_assert!(
            index < u32::MAX as usize,
            "Index too large to fit in Ptr: {index}"
        );
        match NonZeroU32::new((index as u32).saturating_add(1)) {
            Some(raw) => Ptr(raw),
            None => unreachable!("saturating_add(1) is never zero"),
        }
    }

    pub(crate) fn unchecked_get(self) -> usize {
        self.0.get() as usize - 1
    }
}
