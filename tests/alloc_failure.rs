// Allocation failure suite.
//
// The global allocator below refuses any single allocation at or above a
// configurable size. Invariants exercised:
// - Heap push: a failed doubling reports OutOfMemory and leaves length,
//   capacity, resize count and every slot as they were.
// - Table resize: a failed bucket allocation reports OutOfMemory and leaves
//   capacity, chains and collision counters as they were.
mod common;

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chainheap::{ChainedHashTable, Error, Heap, HeapKind};

struct FailingAlloc;

static LIMIT: AtomicUsize = AtomicUsize::new(usize::MAX);
static FAILURES: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for FailingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() >= LIMIT.load(Ordering::SeqCst) {
            FAILURES.fetch_add(1, Ordering::SeqCst);
            return ptr::null_mut();
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if new_size >= LIMIT.load(Ordering::SeqCst) {
            FAILURES.fetch_add(1, Ordering::SeqCst);
            return ptr::null_mut();
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: FailingAlloc = FailingAlloc;

// The limit is process-wide, so tests in this binary take turns.
static SERIAL: Mutex<()> = Mutex::new(());

// Lifts the limit on drop, including when an assertion panics.
struct Limited;

impl Limited {
    fn at(bytes: usize) -> Self {
        LIMIT.store(bytes, Ordering::SeqCst);
        Limited
    }
}

impl Drop for Limited {
    fn drop(&mut self) {
        LIMIT.store(usize::MAX, Ordering::SeqCst);
    }
}

fn all_chains(t: &ChainedHashTable<u32, String>) -> Vec<(Vec<u32>, Vec<u32>)> {
    (0..t.capacity())
        .map(|b| {
            let fwd = t.chain(b).map(|(_, k, _)| *k).collect();
            let bwd = t.chain_rev(b).map(|(_, k, _)| *k).collect();
            (fwd, bwd)
        })
        .collect()
}

// Test: push into a full 1024-slot heap while 32 KiB allocations fail.
// Verifies: OutOfMemory, then len/capacity/resizes/get(i) unchanged and a
// later push succeeds once memory is available again.
#[test]
fn heap_push_failure_leaves_heap_unchanged() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    common::initialize_logger();

    let mut h: Heap<u64> = Heap::with_capacity(HeapKind::Min, 1024).unwrap();
    for i in 0..1024u64 {
        h.push(((i * 7919) % 1024) as i64, i).unwrap();
    }
    let before: Vec<(i64, u64)> = h.iter().map(|e| (e.key(), *e.value())).collect();
    assert_eq!(h.len(), 1024);
    assert_eq!(h.capacity(), 1024);

    let failures = FAILURES.load(Ordering::SeqCst);
    let err = {
        let _limit = Limited::at(24 * 1024);
        h.push(-1, u64::MAX).unwrap_err()
    };
    assert_eq!(err, Error::OutOfMemory);
    assert!(FAILURES.load(Ordering::SeqCst) > failures);

    assert_eq!(h.len(), 1024);
    assert_eq!(h.capacity(), 1024);
    assert_eq!(h.resizes(), 0);
    for (i, &(k, v)) in before.iter().enumerate() {
        let e = h.get(i).unwrap();
        assert_eq!((e.key(), *e.value()), (k, v), "slot {} changed", i);
    }
    assert!(h.get(1024).is_none());
    assert!(h.is_heap());

    h.push(-1, u64::MAX).unwrap();
    assert_eq!(h.capacity(), 2048);
    assert_eq!(h.resizes(), 1);
    assert_eq!(h.peek().unwrap().key(), -1);
}

// Test: resize an 11-bucket table to 8191 while 32 KiB allocations fail.
// Verifies: OutOfMemory, then capacity, every chain in both directions,
// collisions and the dump are unchanged; the same resize then succeeds.
#[test]
fn table_resize_failure_leaves_table_unchanged() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    common::initialize_logger();

    let mut t = ChainedHashTable::new(11).unwrap();
    for k in [5u32, 16, 27, 3] {
        t.insert(k, format!("v{}", k)).unwrap();
    }
    let chains = all_chains(&t);
    let dump = t.to_string();
    assert_eq!(chains[5].0, vec![27, 16, 5]);
    assert_eq!(t.collisions(), 2);

    let failures = FAILURES.load(Ordering::SeqCst);
    let err = {
        let _limit = Limited::at(32 * 1024);
        t.resize(8191).unwrap_err()
    };
    assert_eq!(err, Error::OutOfMemory);
    assert!(FAILURES.load(Ordering::SeqCst) > failures);

    assert_eq!(t.capacity(), 11);
    assert_eq!(all_chains(&t), chains);
    assert_eq!(t.collisions(), 2);
    assert_eq!(t.max_collisions(), 2);
    assert_eq!(t.len(), 4);
    assert_eq!(t.to_string(), dump);
    for k in [5u32, 16, 27, 3] {
        assert_eq!(t.get(&k), Some(&format!("v{}", k)));
    }

    t.resize(8191).unwrap();
    assert_eq!(t.capacity(), 8191);
    assert_eq!(t.collisions(), 0);
    assert_eq!(t.len(), 4);
}
