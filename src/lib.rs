//! chainheap: a separately chained hash table over a prime number of
//! buckets, and an array-backed min/max binary heap.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two small containers whose structural invariants can each be
//!   checked in isolation: chain links in the table, parent/child ordering
//!   in the heap.
//! - Layers:
//!   - SanityGuard: debug-only busy flag embedded in every container;
//!     overlapping calls into one instance panic instead of corrupting it.
//!   - KeyHasher: maps `(key, capacity)` to a bucket. `ModuloHasher` is the
//!     default for integer keys; any `BuildHasher` or closure also works.
//!   - ChainedHashTable<K, V, H>: bucket array of chain heads plus a
//!     generational arena of nodes with `prev`/`next` links.
//!   - Heap<T>: `Vec`-backed binary heap keyed by `i64`, min or max.
//!
//! Constraints
//! - No internal locking. Callers serialize access to an instance; the
//!   guard only reports when they did not.
//! - Table capacity is always prime.
//! - Keys are unique under `Eq`; duplicate inserts fail and leave the table
//!   unchanged.
//! - Insert prepends to the chain, so a bucket reads newest-first. Rehash
//!   preserves that order.
//! - Heap capacity doubles on exhaustion and never shrinks.
//!
//! Ownership
//! - Both containers own their entries. Callers hold `Handle`s (table) or
//!   positions (heap) rather than pointers into internal nodes; a removed
//!   entry's handle never resolves again, even after its arena slot is reused.
//!
//! Resizing
//! - A table with `ResizePolicy::Growable` rehashes every entry when it
//!   grows past its maximum load factor or drains below its minimum. A
//!   `Fixed` table only changes capacity through an explicit `resize`,
//!   which also rehashes.
//! - Growth of either container goes through fallible reservations; when
//!   they fail the container is left exactly as it was.
//!
//! Heap peek and pop
//! - `peek` returns the root. `peek_last` returns the most recently filled
//!   slot. `pop` removes the root and sinks the last entry into its place.

pub mod chain_table;
mod chain_table_proptest;
pub mod error;
pub mod hash;
pub mod heap;
pub mod primes;
mod reentrancy;
#[cfg(test)]
mod test_logger;

// Public surface
pub use chain_table::{ChainedHashTable, Handle, ResizePolicy, TableOptions};
pub use error::{Error, Result};
pub use hash::{BuildHasherAdapter, IntegerKey, KeyHasher, ModuloHasher};
pub use heap::{Heap, HeapEntry, HeapKind};
pub use reentrancy::{Busy, SanityGuard};
