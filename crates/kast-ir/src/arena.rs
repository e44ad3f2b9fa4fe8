//! Append-only node storage with typed handles.
//!
//! Every expression and scope recorded while building a function lives in an
//! [`Arena`] owned by that function's builder. Nodes refer to each other by
//! [`Handle`], never by reference, so the arena can move into the finished
//! [`Function`](crate::Function) without invalidating anything.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Index;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// A typed index into an [`Arena`].
///
/// Handles are only meaningful for the arena that produced them. Each one
/// carries the id of its arena, so a handle from another function is
/// rejected instead of resolving to an unrelated node.
pub struct Handle<T> {
    arena: u32,
    index: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.arena, self.index).cmp(&(other.arena, other.index))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.index)
    }
}

impl<T> Handle<T> {
    pub(crate) fn new(arena: u32, index: u32) -> Self {
        Self {
            arena,
            index,
            _phantom: PhantomData,
        }
    }

    /// Returns the zero-based index of this handle.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// An append-only arena. Values are never removed or individually freed.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    id: u32,
    data: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty arena with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, AtomicOrdering::Relaxed),
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a value and returns its handle.
    pub fn append(&mut self, value: T) -> Handle<T> {
        let index = u32::try_from(self.data.len()).unwrap_or_else(|_| {
            panic!("arena overflow: {} items exceeds u32::MAX", self.data.len())
        });
        self.data.push(value);
        Handle::new(self.id, index)
    }

    /// Returns `true` if `handle` was produced by this arena.
    pub fn owns(&self, handle: Handle<T>) -> bool {
        handle.arena == self.id
    }

    /// Returns `true` if `handle` was produced by this arena and points
    /// inside it.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.owns(handle) && handle.index() < self.data.len()
    }

    /// Returns a reference to the value if the handle is valid.
    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        if self.owns(handle) {
            self.data.get(handle.index())
        } else {
            None
        }
    }

    /// Mutable access is crate-private: nodes are immutable once the
    /// builder hands out their handle, only scopes keep growing.
    pub(crate) fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if self.owns(handle) {
            self.data.get_mut(handle.index())
        } else {
            None
        }
    }

    /// Iterates over `(handle, &value)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        // append() keeps the length within u32
        let id = self.id;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (Handle::new(id, i as u32), v))
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        debug_assert!(self.owns(handle), "handle {handle:?} used with a foreign arena");
        &self.data[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_index() {
        let mut arena = Arena::new();
        let h0 = arena.append("thread_id");
        let h1 = arena.append("block_id");
        assert_eq!(arena[h0], "thread_id");
        assert_eq!(arena[h1], "block_id");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn handles_follow_allocation_order() {
        let mut arena = Arena::with_capacity(4);
        arena.append(10);
        arena.append(20);
        arena.append(30);
        let items: Vec<_> = arena.iter().map(|(h, &v)| (h.index(), v)).collect();
        assert_eq!(items, vec![(0, 10), (1, 20), (2, 30)]);
    }

    #[test]
    fn handle_ordering() {
        let h0: Handle<u32> = Handle::new(1, 0);
        let h1: Handle<u32> = Handle::new(1, 1);
        assert!(h0 < h1);
        assert_eq!(h0, h0);
        assert_eq!(format!("{h1:?}"), "%1");
    }

    #[test]
    fn foreign_handles_are_detected() {
        let mut arena = Arena::new();
        let h0 = arena.append(42);
        assert!(arena.contains(h0));
        assert_eq!(arena.try_get(h0), Some(&42));
        assert!(!arena.contains(Handle::new(arena.id, 7)));
        assert_eq!(arena.try_get(Handle::new(arena.id, 7)), None);
    }

    #[test]
    fn handles_from_another_arena_are_rejected() {
        let mut first = Arena::new();
        let mut second = Arena::new();
        let mine = first.append("a");
        second.append("b");
        assert!(first.owns(mine));
        assert!(!second.owns(mine));
        assert!(!second.contains(mine));
        assert_eq!(second.try_get(mine), None);
        assert_ne!(mine, second.iter().next().map(|(h, _)| h).unwrap());
    }

    #[test]
    fn get_mut_grows_in_place() {
        let mut arena = Arena::new();
        let h = arena.append(Vec::new());
        if let Some(v) = arena.get_mut(h) {
            v.push(1);
        }
        assert_eq!(arena[h], vec![1]);
    }
}
