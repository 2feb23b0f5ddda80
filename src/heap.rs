//! Heap: array-backed binary heap ordered by an `i64` key.
//!
//! The ordering mode is fixed at construction. Capacity is tracked
//! explicitly and doubles when a push finds the array full; it never shrinks.
//! Positions are 0-based, so the parent of slot `i` is `(i - 1) / 2`.

use crate::error::{Error, Result};
use crate::reentrancy::SanityGuard;
use core::fmt;
use log::{debug, trace};

/// Capacity used by [`Heap::new`].
pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HeapKind {
    /// Smallest key at the root.
    Min,
    /// Largest key at the root.
    Max,
}

impl HeapKind {
    // Push-side swap predicate: equal keys move up.
    #[inline]
    fn promotes(self, parent: i64, child: i64) -> bool {
        match self {
            HeapKind::Max => parent <= child,
            HeapKind::Min => parent >= child,
        }
    }

    // Strict ordering used when sinking and when checking the invariant.
    #[inline]
    fn outranks(self, a: i64, b: i64) -> bool {
        match self {
            HeapKind::Max => a > b,
            HeapKind::Min => a < b,
        }
    }
}

/// A key and its payload as stored in one heap slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeapEntry<T> {
    key: i64,
    value: T,
}

impl<T> HeapEntry<T> {
    pub fn key(&self) -> i64 {
        self.key
    }
    pub fn value(&self) -> &T {
        &self.value
    }
    pub fn into_parts(self) -> (i64, T) {
        (self.key, self.value)
    }
}

fn sift_up<T>(slots: &mut [HeapEntry<T>], kind: HeapKind, mut i: usize) -> usize {
    while i > 0 {
        let parent = (i - 1) / 2;
        if !kind.promotes(slots[parent].key, slots[i].key) {
            break;
        }
        slots.swap(parent, i);
        i = parent;
    }
    i
}

fn sift_down<T>(slots: &mut [HeapEntry<T>], kind: HeapKind, mut i: usize) -> usize {
    let len = slots.len();
    loop {
        let left = 2 * i + 1;
        let right = left + 1;
        let mut best = i;
        if left < len && kind.outranks(slots[left].key, slots[best].key) {
            best = left;
        }
        if right < len && kind.outranks(slots[right].key, slots[best].key) {
            best = right;
        }
        if best == i {
            return i;
        }
        slots.swap(i, best);
        i = best;
    }
}

pub struct Heap<T> {
    kind: HeapKind,
    slots: Vec<HeapEntry<T>>,
    capacity: usize,
    resizes: usize,
    guard: SanityGuard,
}

impl<T> Heap<T> {
    /// Empty heap with room for [`DEFAULT_CAPACITY`] entries.
    pub fn new(kind: HeapKind) -> Self {
        Self {
            kind,
            slots: Vec::with_capacity(DEFAULT_CAPACITY),
            capacity: DEFAULT_CAPACITY,
            resizes: 0,
            guard: SanityGuard::new("Heap"),
        }
    }

    /// Empty heap with room for `capacity` entries. A capacity of zero is
    /// allowed and becomes one on the first push.
    pub fn with_capacity(kind: HeapKind, capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        debug!("created {:?} heap with capacity {}", kind, capacity);
        Ok(Self {
            kind,
            slots,
            capacity,
            resizes: 0,
            guard: SanityGuard::new("Heap"),
        })
    }

    pub fn kind(&self) -> HeapKind {
        self.kind
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn entries(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn is_not_empty(&self) -> bool {
        !self.slots.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of times the backing array has doubled.
    pub fn resizes(&self) -> usize {
        self.resizes
    }

    /// Insert `value` under `key`.
    ///
    /// A full heap doubles its capacity first. If that allocation fails the
    /// heap is left as it was and [`Error::OutOfMemory`] is returned.
    pub fn push(&mut self, key: i64, value: T) -> Result<()> {
        let _busy = self.guard.enter();
        if self.slots.len() == self.capacity {
            let grown = match self.capacity {
                0 => 1,
                c => c.checked_mul(2).ok_or(Error::OutOfMemory)?,
            };
            self.slots.try_reserve_exact(grown - self.slots.len())?;
            debug!("heap grew from {} to {} slots", self.capacity, grown);
            self.capacity = grown;
            self.resizes += 1;
        }
        self.slots.push(HeapEntry { key, value });
        let last = self.slots.len() - 1;
        let at = sift_up(&mut self.slots, self.kind, last);
        trace!("pushed key {} settled at slot {}", key, at);
        Ok(())
    }

    /// The root: smallest key for [`HeapKind::Min`], largest for [`HeapKind::Max`].
    pub fn peek(&self) -> Option<&HeapEntry<T>> {
        let _busy = self.guard.enter();
        self.slots.first()
    }

    /// The last occupied slot, i.e. the leaf position filled most recently.
    pub fn peek_last(&self) -> Option<&HeapEntry<T>> {
        let _busy = self.guard.enter();
        self.slots.last()
    }

    /// Remove and return the root.
    pub fn pop(&mut self) -> Option<HeapEntry<T>> {
        let _busy = self.guard.enter();
        if self.slots.is_empty() {
            return None;
        }
        let last = self.slots.len() - 1;
        self.slots.swap(0, last);
        let top = self.slots.pop();
        if !self.slots.is_empty() {
            let at = sift_down(&mut self.slots, self.kind, 0);
            trace!("moved last entry down to slot {}", at);
        }
        top
    }

    /// Entry at array position `position`.
    pub fn get(&self, position: usize) -> Option<&HeapEntry<T>> {
        self.slots.get(position)
    }

    /// Entries in array order.
    pub fn iter(&self) -> core::slice::Iter<'_, HeapEntry<T>> {
        self.slots.iter()
    }

    /// Check the ordering invariant for every non-root slot against its parent.
    pub fn is_heap(&self) -> bool {
        (1..self.slots.len()).all(|i| {
            let parent = (i - 1) / 2;
            !self.kind.outranks(self.slots[i].key, self.slots[parent].key)
        })
    }

    /// Drop every entry. Capacity is kept.
    pub fn clear(&mut self) {
        let _busy = self.guard.enter();
        self.slots.clear();
    }

    /// Entries in pop order.
    pub fn into_sorted_vec(mut self) -> Vec<HeapEntry<T>> {
        let mut out = Vec::with_capacity(self.slots.len());
        while let Some(e) = self.pop() {
            out.push(e);
        }
        out
    }
}

impl<T: fmt::Debug> fmt::Display for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Heap({:?}) entries={} capacity={}",
            self.kind,
            self.len(),
            self.capacity
        )?;
        for (i, e) in self.slots.iter().enumerate() {
            writeln!(f, "  [{}] {} => {:?}", i, e.key, e.value)?;
        }
        Ok(())
    }
}

impl<T> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("kind", &self.kind)
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .field("resizes", &self.resizes)
            .finish()
    }
}
