use alloc::vec::Vec;
use core::ops::{
    Index,
    IndexMut,
};

use crate::Ptr;

#[cold]
#[inline(never)]
fn assert_free() -> ! {
    panic!("Attempted to access data of free slot");
}

/// The payload of an occupied slot. `prev` lives here rather than in the slot
/// because free slots only need the forward link for the free list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Node<K, V> {
    pub(crate) prev: Option<Ptr>,
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Debug, Clone, Copy)]
enum Occupancy<K, V> {
    Free,
    Node(Node<K, V>),
}

/// One arena cell. For occupied slots `next` is the sequence successor; for
/// free slots it is the next entry of the free list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<K, V> {
    next: Option<Ptr>,
    data: Occupancy<K, V>,
}

impl<K, V> Slot<K, V> {
    pub(crate) fn prev(&self) -> Option<Ptr> {
        self.node().prev
    }

    pub(crate) fn next(&self) -> Option<Ptr> {
        self.next
    }

    pub(crate) fn into_node(self) -> Node<K, V> {
        match self.data {
            Occupancy::Node(node) => node,
            Occupancy::Free => assert_free(),
        }
    }

    pub(crate) fn node(&self) -> &Node<K, V> {
        match &self.data {
            Occupancy::Node(node) => node,
            Occupancy::Free => assert_free(),
        }
    }

    fn node_mut(&mut self) -> &mut Node<K, V> {
        match &mut self.data {
            Occupancy::Node(node) => node,
            Occupancy::Free => assert_free(),
        }
    }
}

/// Slot table owning every node of a map. Nodes reference their neighbors by
/// `Ptr`, never by address, so the table can grow freely.
#[derive(Debug, Clone)]
pub(crate) struct Arena<K, V> {
    slots: Vec<Slot<K, V>>,
    free_head: Option<Ptr>,
}

impl<K, V> Arena<K, V> {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_head: None,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Arena {
            slots: Vec::with_capacity(capacity),
            free_head: None,
        }
    }

    pub(crate) fn slot(&self, ptr: Ptr) -> &Slot<K, V> {
        &self.slots[ptr.unchecked_get()]
    }

    pub(crate) fn set_next(&mut self, ptr: Ptr, next: Option<Ptr>) {
        let slot = &mut self.slots[ptr.unchecked_get()];
        if matches!(slot.data, Occupancy::Free) {
            assert_free();
        }
        slot.next = next;
    }

    pub(crate) fn set_prev(&mut self, ptr: Ptr, prev: Option<Ptr>) {
        self.slots[ptr.unchecked_get()].node_mut().prev = prev;
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Occupied slots cannot be compacted because live links and the hash
        // index refer to them by position. Only trailing capacity is released.
        self.slots.shrink_to_fit();
    }

    pub(crate) fn alloc(&mut self, key: K, value: V, hash: u64) -> Ptr {
        let slot = Slot {
            next: None,
            data: Occupancy::Node(Node {
                prev: None,
                hash,
                key,
                value,
            }),
        };

        match self.free_head {
            Some(ptr) => {
                let old = core::mem::replace(&mut self.slots[ptr.unchecked_get()], slot);
                self.free_head = old.next;
                ptr
            }
            None => {
                let ptr = Ptr::unchecked_from(self.slots.len());
                self.slots.push(slot);
                ptr
            }
        }
    }

    pub(crate) fn is_occupied(&self, ptr: Ptr) -> bool {
        self.slots
            .get(ptr.unchecked_get())
            .is_some_and(|slot| matches!(slot.data, Occupancy::Node(_)))
    }

    pub(crate) fn free(&mut self, ptr: Ptr) -> Node<K, V> {
        assert!(self.is_occupied(ptr), "Pointer to free must be occupied");
        let freed = core::mem::replace(
            &mut self.slots[ptr.unchecked_get()],
            Slot {
                next: self.free_head,
                data: Occupancy::Free,
            },
        );
        self.free_head = Some(ptr);

        freed.into_node()
    }
}

impl<K, V> Index<Ptr> for Arena<K, V> {
    type Output = Node<K, V>;

    fn index(&self, index: Ptr) -> &Self::Output {
        self.slots[index.unchecked_get()].node()
    }
}

impl<K, V> IndexMut<Ptr> for Arena<K, V> {
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        self.slots[index.unchecked_get()].node_mut()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{
        format,
        string::{
            String,
            ToString,
        },
        vec,
        vec::Vec,
    };
    use core::assert_eq;

    use super::*;

    #[test]
    fn test_ptr_round_trip_and_debug() {
        let ptr = Ptr::unchecked_from(42);
        assert_eq!(ptr.unchecked_get(), 42);
        assert_eq!(format!("{:?}", ptr), "Ptr(42)");
        assert_eq!(
            core::mem::size_of::<Option<Ptr>>(),
            core::mem::size_of::<Ptr>()
        );
    }

    #[test]
    fn test_arena_with_capacity() {
        let arena: Arena<i32, Vec<i32>> = Arena::with_capacity(10);
        assert_eq!(arena.slots.capacity(), 10);
        assert!(arena.free_head.is_none());
    }

    #[test]
    fn test_arena_alloc_multiple() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111);
        let ptr2 = arena.alloc(2, "two".to_string(), 222);
        let ptr3 = arena.alloc(3, "three".to_string(), 333);

        assert_ne!(ptr1, ptr2);
        assert_ne!(ptr2, ptr3);

        assert_eq!(arena[ptr1].key, 1);
        assert_eq!(arena[ptr2].value, "two");
        assert_eq!(arena[ptr3].hash, 333);
        assert!(arena.slot(ptr1).prev().is_none());
        assert!(arena.slot(ptr1).next().is_none());
    }

    #[test]
    fn test_arena_free_and_reuse() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111);
        let ptr2 = arena.alloc(2, "two".to_string(), 222);

        let node = arena.free(ptr1);
        assert_eq!(node.key, 1);
        assert_eq!(node.value, "one");
        assert!(!arena.is_occupied(ptr1));
        assert!(arena.is_occupied(ptr2));

        let ptr3 = arena.alloc(3, "three".to_string(), 333);
        assert_eq!(ptr3, ptr1);
        assert_eq!(arena[ptr3].key, 3);
        assert!(arena.free_head.is_none());
    }

    #[test]
    fn test_arena_free_list_is_lifo() {
        let mut arena = Arena::new();
        let ptrs: Vec<_> = (0..4).map(|i| arena.alloc(i, i, 0)).collect();
        arena.free(ptrs[1]);
        arena.free(ptrs[3]);

        assert_eq!(arena.alloc(10, 10, 0), ptrs[3]);
        assert_eq!(arena.alloc(11, 11, 0), ptrs[1]);
        assert_eq!(arena.alloc(12, 12, 0), Ptr::unchecked_from(4));
    }

    #[test]
    fn test_arena_links() {
        let mut arena = Arena::new();
        let a = arena.alloc(1, vec![1], 0);
        let b = arena.alloc(2, vec![2], 0);

        arena.set_next(a, Some(b));
        arena.set_prev(b, Some(a));

        assert_eq!(arena.slot(a).next(), Some(b));
        assert_eq!(arena.slot(b).prev(), Some(a));
        assert!(arena.slot(b).next().is_none());
    }

    #[test]
    fn test_arena_index_mut() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(42, String::from("hello"), 0);
        arena[ptr].value = "world".to_string();
        assert_eq!(arena[ptr].value, "world");
    }

    #[test]
    fn test_arena_clear() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(1, 1, 0);
        arena.alloc(2, 2, 0);
        arena.free(ptr);

        arena.clear();

        assert!(arena.slots.is_empty());
        assert!(arena.free_head.is_none());
        assert!(!arena.is_occupied(ptr));
    }

    #[test]
    fn test_arena_clone_with_free_slots() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111);
        let ptr2 = arena.alloc(2, "two".to_string(), 222);
        arena.free(ptr2);

        let cloned = arena.clone();
        assert!(cloned.is_occupied(ptr1));
        assert!(!cloned.is_occupied(ptr2));
        assert_eq!(cloned.free_head, arena.free_head);
    }

    #[test]
    #[should_panic]
    fn test_arena_index_unoccupied_ptr() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(1, "one".to_string(), 111);
        arena.free(ptr);
        let _ = &arena[ptr];
    }

    #[test]
    #[should_panic]
    fn test_arena_free_unoccupied_ptr() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(1, "one".to_string(), 111);
        arena.free(ptr);
        arena.free(ptr);
    }

    #[test]
    #[should_panic]
    fn test_arena_link_free_slot() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(1, 1, 0);
        arena.free(ptr);
        arena.set_next(ptr, None);
    }
}
