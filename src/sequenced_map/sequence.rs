use core::hash::BuildHasher;
use core::hash::Hash;

use hashbrown::HashTable;
use hashbrown::hash_table;

use crate::Ptr;
use crate::arena::Arena;

/// Which way a handle, view or iterator walks the shared sequence.
///
/// A reversed view is the same storage read with the opposite direction, so
/// "first" and "last" swap meaning while no entries move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Head to tail: insertion order.
    Forward,
    /// Tail to head.
    Backward,
}

impl Direction {
    /// Returns the opposite direction.
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    #[inline]
    pub(crate) fn first_end(self) -> End {
        match self {
            Direction::Forward => End::Head,
            Direction::Backward => End::Tail,
        }
    }

    #[inline]
    pub(crate) fn last_end(self) -> End {
        self.flip().first_end()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }
}

/// A physical end of the sequence, independent of any view's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum End {
    Head,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadTail {
    pub(crate) head: Ptr,
    pub(crate) tail: Ptr,
}

/// Hash index plus doubly linked sequence. Every mutation of the map, whether
/// it comes from the handle, a view or an iterator, ends up in one of the
/// primitives here.
#[derive(Debug, Clone)]
pub(crate) struct Core<K, V, S> {
    table: HashTable<Ptr>,
    nodes: Arena<K, V>,
    head_tail: Option<HeadTail>,
    hasher: S,
    mod_count: u64,
}

impl<K, V, S> Core<K, V, S> {
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Core {
            table: HashTable::with_capacity(capacity),
            nodes: Arena::with_capacity(capacity),
            head_tail: None,
            hasher,
            mod_count: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    /// Bumped by every structural change (link, unlink, clear), never by an
    /// in-place value update.
    #[inline]
    pub(crate) fn mod_count(&self) -> u64 {
        self.mod_count
    }

    #[inline]
    pub(crate) fn end(&self, end: End) -> Option<Ptr> {
        self.head_tail.map(|ht| match end {
            End::Head => ht.head,
            End::Tail => ht.tail,
        })
    }

    #[inline]
    pub(crate) fn first(&self, direction: Direction) -> Option<Ptr> {
        self.end(direction.first_end())
    }

    #[inline]
    pub(crate) fn step(&self, ptr: Ptr, direction: Direction) -> Option<Ptr> {
        let slot = self.nodes.slot(ptr);
        match direction {
            Direction::Forward => slot.next(),
            Direction::Backward => slot.prev(),
        }
    }

    #[inline]
    pub(crate) fn key(&self, ptr: Ptr) -> &K {
        &self.nodes[ptr].key
    }

    #[inline]
    pub(crate) fn value(&self, ptr: Ptr) -> &V {
        &self.nodes[ptr].value
    }

    pub(crate) fn entry_mut(&mut self, ptr: Ptr) -> (&K, &mut V) {
        let node = &mut self.nodes[ptr];
        (&node.key, &mut node.value)
    }

    pub(crate) fn iter(&self, direction: Direction) -> CoreIter<'_, K, V, S> {
        CoreIter {
            ptr: self.first(direction),
            direction,
            core: self,
        }
    }

    /// Scans in `direction` for the first node whose value equals `value`.
    pub(crate) fn find_value(&self, value: &V, direction: Direction) -> Option<Ptr>
    where
        V: PartialEq,
    {
        let mut cursor = self.first(direction);
        while let Some(ptr) = cursor {
            if self.nodes[ptr].value == *value {
                return Some(ptr);
            }
            cursor = self.step(ptr, direction);
        }
        None
    }

    fn link_at(&mut self, ptr: Ptr, end: End) {
        self.mod_count += 1;
        let Some(mut ht) = self.head_tail else {
            self.head_tail = Some(HeadTail {
                head: ptr,
                tail: ptr,
            });
            return;
        };

        match end {
            End::Head => {
                self.nodes.set_next(ptr, Some(ht.head));
                self.nodes.set_prev(ht.head, Some(ptr));
                ht.head = ptr;
            }
            End::Tail => {
                self.nodes.set_prev(ptr, Some(ht.tail));
                self.nodes.set_next(ht.tail, Some(ptr));
                ht.tail = ptr;
            }
        }
        self.head_tail = Some(ht);
    }

    fn unlink(&mut self, ptr: Ptr) {
        self.mod_count += 1;
        let slot = self.nodes.slot(ptr);
        let (prev, next) = (slot.prev(), slot.next());

        if let Some(prev) = prev {
            self.nodes.set_next(prev, next);
        }
        if let Some(next) = next {
            self.nodes.set_prev(next, prev);
        }

        self.head_tail = match (self.head_tail, prev, next) {
            (Some(ht), None, Some(next)) => Some(HeadTail { head: next, ..ht }),
            (Some(ht), Some(prev), None) => Some(HeadTail { tail: prev, ..ht }),
            (ht, Some(_), Some(_)) => ht,
            _ => None,
        };
    }

    /// Unlinks `ptr`, drops it from the hash index and frees its slot.
    pub(crate) fn remove_ptr(&mut self, ptr: Ptr) -> (K, V) {
        let hash = self.nodes[ptr].hash;
        match self.table.find_entry(hash, |candidate| *candidate == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => {
                #[cold]
                #[inline(never)]
                fn die() -> ! {
                    panic!("Pointer not found in table");
                }
                die()
            }
        }

        self.unlink(ptr);
        let node = self.nodes.free(ptr);
        (node.key, node.value)
    }

    pub(crate) fn clear(&mut self) {
        self.mod_count += 1;
        self.table.clear();
        self.nodes.clear();
        self.head_tail = None;
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        let nodes = &self.nodes;
        self.table.shrink_to_fit(|ptr| nodes[*ptr].hash);
        self.nodes.shrink_to_fit();
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Core<K, V, S> {
    pub(crate) fn find(&self, key: &K) -> Option<Ptr> {
        let hash = self.hasher.hash_one(key);
        self.table
            .find(hash, |ptr| self.nodes[*ptr].key == *key)
            .copied()
    }

    /// Replaces the value of an existing key without moving it, or links a new
    /// node at `end`. Returns the replaced value, if any.
    pub(crate) fn insert(&mut self, key: K, value: V, end: End) -> Option<V> {
        let hash = self.hasher.hash_one(&key);
        let nodes = &self.nodes;
        match self.table.entry(
            hash,
            |ptr| nodes[*ptr].key == key,
            |ptr| nodes[*ptr].hash,
        ) {
            hash_table::Entry::Occupied(occupied) => {
                let ptr = *occupied.get();
                Some(core::mem::replace(&mut self.nodes[ptr].value, value))
            }
            hash_table::Entry::Vacant(vacant) => {
                let ptr = self.nodes.alloc(key, value, hash);
                vacant.insert(ptr);
                self.link_at(ptr, end);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let ptr = self.find(key)?;
        Some(self.remove_ptr(ptr))
    }
}

/// Borrowing walk over a core, used where the whole walk happens under one
/// borrow (equality, hashing, formatting, cloning).
pub(crate) struct CoreIter<'a, K, V, S> {
    ptr: Option<Ptr>,
    direction: Direction,
    core: &'a Core<K, V, S>,
}

impl<'a, K, V, S> Iterator for CoreIter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let ptr = self.ptr?;
        self.ptr = self.core.step(ptr, self.direction);
        let node = &self.core.nodes[ptr];
        Some((&node.key, &node.value))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::RandomState;

    fn core() -> Core<i32, &'static str, RandomState> {
        Core::with_capacity_and_hasher(0, RandomState::default())
    }

    fn keys(core: &Core<i32, &'static str, RandomState>, direction: Direction) -> Vec<i32> {
        core.iter(direction).map(|(k, _)| *k).collect()
    }

    /// Walks the links both ways and checks them against the hash index.
    fn assert_consistent(core: &Core<i32, &'static str, RandomState>) {
        let forward = keys(core, Direction::Forward);
        let mut backward = keys(core, Direction::Backward);
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), core.len());
        for key in &forward {
            assert!(core.find(key).is_some());
        }
        match core.head_tail {
            None => assert_eq!(core.len(), 0),
            Some(ht) => {
                assert!(core.nodes.slot(ht.head).prev().is_none());
                assert!(core.nodes.slot(ht.tail).next().is_none());
            }
        }
    }

    #[test]
    fn test_direction_ends() {
        assert_eq!(Direction::Forward.first_end(), End::Head);
        assert_eq!(Direction::Forward.last_end(), End::Tail);
        assert_eq!(Direction::Backward.first_end(), End::Tail);
        assert_eq!(Direction::Backward.last_end(), End::Head);
        assert_eq!(Direction::Forward.flip().flip(), Direction::Forward);
    }

    #[test]
    fn test_insert_at_both_ends() {
        let mut core = core();
        assert_eq!(core.insert(1, "a", End::Tail), None);
        assert_eq!(core.insert(2, "b", End::Tail), None);
        assert_eq!(core.insert(0, "z", End::Head), None);

        assert_eq!(keys(&core, Direction::Forward), [0, 1, 2]);
        assert_eq!(keys(&core, Direction::Backward), [2, 1, 0]);
        assert_consistent(&core);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut core = core();
        core.insert(1, "a", End::Tail);
        core.insert(2, "b", End::Tail);
        core.insert(3, "c", End::Tail);
        let mods = core.mod_count();

        assert_eq!(core.insert(2, "B", End::Head), Some("b"));
        assert_eq!(core.insert(1, "A", End::Tail), Some("a"));

        assert_eq!(keys(&core, Direction::Forward), [1, 2, 3]);
        assert_eq!(core.value(core.find(&2).unwrap()), &"B");
        assert_eq!(core.mod_count(), mods);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut core = core();
        for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
            core.insert(k, v, End::Tail);
        }

        assert_eq!(core.remove(&2), Some((2, "b")));
        assert_consistent(&core);
        assert_eq!(core.remove(&1), Some((1, "a")));
        assert_consistent(&core);
        assert_eq!(core.remove(&4), Some((4, "d")));
        assert_consistent(&core);
        assert_eq!(keys(&core, Direction::Forward), [3]);
        assert_eq!(core.remove(&9), None);

        assert_eq!(core.remove(&3), Some((3, "c")));
        assert_consistent(&core);
        assert!(core.head_tail.is_none());
    }

    #[test]
    fn test_slot_reuse_keeps_links_valid() {
        let mut core = core();
        for k in 0..5 {
            core.insert(k, "x", End::Tail);
        }
        core.remove(&1);
        core.remove(&3);
        core.insert(10, "y", End::Head);
        core.insert(11, "y", End::Tail);

        assert_eq!(keys(&core, Direction::Forward), [10, 0, 2, 4, 11]);
        assert_consistent(&core);
    }

    #[test]
    fn test_find_value_respects_direction() {
        let mut core = core();
        core.insert(1, "dup", End::Tail);
        core.insert(2, "other", End::Tail);
        core.insert(3, "dup", End::Tail);

        let forward = core.find_value(&"dup", Direction::Forward).unwrap();
        let backward = core.find_value(&"dup", Direction::Backward).unwrap();
        assert_eq!(core.key(forward), &1);
        assert_eq!(core.key(backward), &3);
        assert!(core.find_value(&"missing", Direction::Forward).is_none());
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut core = core();
        core.insert(1, "a", End::Tail);
        core.insert(2, "b", End::Tail);
        let mods = core.mod_count();

        core.clear();
        assert_eq!(core.len(), 0);
        assert!(core.first(Direction::Forward).is_none());
        assert!(core.mod_count() > mods);

        core.insert(3, "c", End::Tail);
        assert_eq!(keys(&core, Direction::Forward), [3]);
        assert_consistent(&core);
    }

    #[test]
    fn test_shrink_to_fit_keeps_lookups() {
        let mut core = core();
        for k in 0..64 {
            core.insert(k, "v", End::Tail);
        }
        for k in 0..60 {
            core.remove(&k);
        }
        core.shrink_to_fit();
        assert_eq!(keys(&core, Direction::Forward), [60, 61, 62, 63]);
        assert!(core.find(&62).is_some());
    }
}
