//! ChainedHashTable: separate chaining over a prime number of buckets.
//!
//! Nodes live in a generational arena owned by the table; each bucket holds
//! the arena key of its chain head and nodes carry `prev`/`next` links, so a
//! chain is a doubly linked list threaded through the arena. New entries are
//! prepended, which makes iteration within a bucket newest-first.

use crate::error::{Error, Result};
use crate::hash::{IntegerKey, KeyHasher, ModuloHasher};
use crate::primes::{is_prime, next_prime, prev_prime};
use crate::reentrancy::SanityGuard;
use core::fmt;
use log::{debug, trace, warn};
use slotmap::{DefaultKey, SlotMap};

/// Stable reference to one entry. Stale handles never resolve, even when
/// the arena slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, K, V, H>(&self, table: &'a ChainedHashTable<K, V, H>) -> Option<&'a K> {
        let _busy = table.guard.enter();
        table.core.nodes.get(self.0).map(|n| &n.key)
    }

    pub fn value<'a, K, V, H>(&self, table: &'a ChainedHashTable<K, V, H>) -> Option<&'a V> {
        let _busy = table.guard.enter();
        table.core.nodes.get(self.0).map(|n| &n.value)
    }

    pub fn value_mut<'a, K, V, H>(
        &self,
        table: &'a mut ChainedHashTable<K, V, H>,
    ) -> Option<&'a mut V> {
        let _busy = table.guard.enter();
        table.core.nodes.get_mut(self.0).map(|n| &mut n.value)
    }
}

/// When the bucket array changes size on its own.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ResizePolicy {
    /// Capacity only changes through [`ChainedHashTable::resize`].
    #[default]
    Fixed,
    /// Grow to the next prime above twice the capacity once
    /// `len / capacity > max_load_factor`; shrink to the prime at or below
    /// half the capacity once `len / capacity < min_load_factor`, never
    /// below the initial capacity.
    Growable {
        max_load_factor: f64,
        min_load_factor: f64,
    },
}

impl ResizePolicy {
    /// Growable with a maximum load factor of 1.0 and a minimum of 0.25.
    pub const fn growable() -> Self {
        ResizePolicy::Growable {
            max_load_factor: 1.0,
            min_load_factor: 0.25,
        }
    }

    fn validate(&self) -> Result<()> {
        if let ResizePolicy::Growable {
            max_load_factor,
            min_load_factor,
        } = *self
        {
            if !(max_load_factor.is_finite() && max_load_factor > 0.0) {
                return Err(Error::InvalidArgument {
                    reason: "max_load_factor must be finite and positive",
                });
            }
            if !(min_load_factor >= 0.0 && min_load_factor < max_load_factor / 2.0) {
                return Err(Error::InvalidArgument {
                    reason: "min_load_factor must be in [0, max_load_factor / 2)",
                });
            }
        }
        Ok(())
    }
}

/// Construction parameters for [`ChainedHashTable::with_options`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableOptions {
    capacity: usize,
    round_to_prime: bool,
    resize: ResizePolicy,
}

impl TableOptions {
    /// Fixed-size table with exactly `capacity` buckets (must be prime).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            round_to_prime: false,
            resize: ResizePolicy::Fixed,
        }
    }

    /// Use the next prime at or above the requested capacity instead of
    /// rejecting a composite one.
    pub fn round_to_prime(mut self) -> Self {
        self.round_to_prime = true;
        self
    }

    pub fn resize(mut self, policy: ResizePolicy) -> Self {
        self.resize = policy;
        self
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    bucket: usize,
    // Insertion stamp; rehash relinks in stamp order to keep chains newest-first.
    seq: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

// Bucket array plus arena. Kept apart from the guard so mutating helpers can
// run while a guarded section is open.
struct Chains<K, V> {
    buckets: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    occupied: usize,
    max_collisions: usize,
    next_seq: u64,
}

fn alloc_buckets(capacity: usize) -> Result<Vec<Option<DefaultKey>>> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(capacity)?;
    buckets.resize(capacity, None);
    Ok(buckets)
}

fn bucket_for<K, H: KeyHasher<K>>(hasher: &H, key: &K, capacity: usize) -> usize {
    let b = hasher.bucket(key, capacity);
    debug_assert!(b < capacity, "hasher returned bucket {} for capacity {}", b, capacity);
    b % capacity
}

impl<K, V> Chains<K, V> {
    fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            buckets: alloc_buckets(capacity)?,
            nodes: SlotMap::with_key(),
            occupied: 0,
            max_collisions: 0,
            next_seq: 0,
        })
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn collisions(&self) -> usize {
        self.nodes.len() - self.occupied
    }

    fn find_in(&self, bucket: usize, key: &K) -> Option<DefaultKey>
    where
        K: Eq,
    {
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if node.key == *key {
                return Some(k);
            }
            cur = node.next;
        }
        None
    }

    fn link_front(&mut self, bucket: usize, key: K, value: V) -> DefaultKey {
        let head = self.buckets[bucket];
        let seq = self.next_seq;
        self.next_seq += 1;
        let k = self.nodes.insert(Node {
            key,
            value,
            bucket,
            seq,
            prev: None,
            next: head,
        });
        match head {
            Some(h) => self.nodes[h].prev = Some(k),
            None => self.occupied += 1,
        }
        self.buckets[bucket] = Some(k);
        self.max_collisions = self.max_collisions.max(self.collisions());
        trace!("linked entry at head of bucket {}", bucket);
        k
    }

    fn unlink(&mut self, k: DefaultKey) -> Option<Node<K, V>> {
        let node = self.nodes.remove(k)?;
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => {
                debug_assert_eq!(self.buckets[node.bucket], Some(k));
                self.buckets[node.bucket] = node.next;
            }
        }
        if let Some(n) = node.next {
            self.nodes[n].prev = node.prev;
        }
        if node.prev.is_none() && node.next.is_none() {
            self.occupied -= 1;
        }
        trace!("unlinked entry from bucket {}", node.bucket);
        Some(node)
    }

    /// Rebuild every chain for `capacity` buckets. On allocation failure the
    /// table is left exactly as it was.
    fn rehash<H: KeyHasher<K>>(&mut self, hasher: &H, capacity: usize) -> Result<()> {
        let mut buckets = alloc_buckets(capacity)?;
        let mut order: Vec<(u64, DefaultKey)> = Vec::new();
        order.try_reserve_exact(self.nodes.len())?;
        order.extend(self.nodes.iter().map(|(k, n)| (n.seq, k)));
        // Oldest first, so each prepend leaves the newest entry at the head.
        order.sort_unstable_by_key(|&(seq, _)| seq);

        let mut occupied = 0;
        for (_, k) in order {
            let b = bucket_for(hasher, &self.nodes[k].key, capacity);
            let head = buckets[b];
            match head {
                Some(h) => self.nodes[h].prev = Some(k),
                None => occupied += 1,
            }
            let node = &mut self.nodes[k];
            node.bucket = b;
            node.prev = None;
            node.next = head;
            buckets[b] = Some(k);
        }
        debug!(
            "rehashed {} entries from {} to {} buckets",
            self.nodes.len(),
            self.buckets.len(),
            capacity
        );
        self.buckets = buckets;
        self.occupied = occupied;
        self.max_collisions = self.max_collisions.max(self.collisions());
        Ok(())
    }

    fn grow_if_loaded<H: KeyHasher<K>>(&mut self, hasher: &H, policy: ResizePolicy) {
        let ResizePolicy::Growable {
            max_load_factor, ..
        } = policy
        else {
            return;
        };
        let cap = self.capacity();
        if (self.nodes.len() as f64) / (cap as f64) <= max_load_factor {
            return;
        }
        match cap.checked_mul(2).and_then(next_prime) {
            Some(target) => {
                if let Err(e) = self.rehash(hasher, target) {
                    warn!("growth to {} buckets failed ({}); keeping {}", target, e, cap);
                }
            }
            None => warn!("no larger prime capacity available; keeping {}", cap),
        }
    }

    fn shrink_if_sparse<H: KeyHasher<K>>(&mut self, hasher: &H, policy: ResizePolicy, floor: usize) {
        let ResizePolicy::Growable {
            max_load_factor,
            min_load_factor,
        } = policy
        else {
            return;
        };
        let cap = self.capacity();
        let len = self.nodes.len() as f64;
        if cap <= floor || len / (cap as f64) >= min_load_factor {
            return;
        }
        let target = prev_prime(cap / 2).unwrap_or(floor).max(floor);
        if target < cap && len / (target as f64) <= max_load_factor {
            if let Err(e) = self.rehash(hasher, target) {
                warn!("shrink to {} buckets failed ({}); keeping {}", target, e, cap);
            }
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.buckets.iter_mut().for_each(|b| *b = None);
        self.occupied = 0;
    }
}

/// Separately chained hash table with a prime bucket count.
///
/// Keys are unique under `Eq`; a second insert of an equal key fails with
/// [`Error::DuplicateKey`]. `H` maps keys to buckets and defaults to
/// [`ModuloHasher`] for integer keys.
pub struct ChainedHashTable<K, V, H = ModuloHasher> {
    hasher: H,
    core: Chains<K, V>,
    initial_capacity: usize,
    resize: ResizePolicy,
    guard: SanityGuard,
}

impl<K, V> ChainedHashTable<K, V>
where
    K: Eq + IntegerKey,
{
    /// Fixed-size table of `capacity` buckets using [`ModuloHasher`].
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_hasher(capacity, ModuloHasher)
    }
}

/// Iterator over the entries of one chain.
pub struct Chain<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    cur: Option<DefaultKey>,
    forward: bool,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let node = self.nodes.get(k)?;
        self.cur = if self.forward { node.next } else { node.prev };
        Some((Handle(k), &node.key, &node.value))
    }
}

/// Iterator over all entries, bucket by bucket, head to tail.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Option<DefaultKey>>,
    chain: Chain<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.chain.next() {
                return Some(item);
            }
            self.chain.cur = *self.buckets.next()?;
        }
    }
}

impl<K, V, H> ChainedHashTable<K, V, H> {
    pub fn len(&self) -> usize {
        self.core.nodes.len()
    }
    pub fn entries(&self) -> usize {
        self.core.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.core.nodes.is_empty()
    }
    pub fn is_not_empty(&self) -> bool {
        !self.core.nodes.is_empty()
    }
    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }
    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize
    }

    /// Entries currently sharing a bucket with an older entry.
    pub fn collisions(&self) -> usize {
        self.core.collisions()
    }

    /// Highest value `collisions()` has reached over the table's lifetime.
    pub fn max_collisions(&self) -> usize {
        self.core.max_collisions
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Length of the longest chain. Walks every bucket.
    pub fn longest_chain(&self) -> usize {
        (0..self.capacity())
            .map(|b| self.chain(b).count())
            .max()
            .unwrap_or(0)
    }

    /// Entries of bucket `bucket` from head (newest) to tail (oldest).
    /// Out-of-range buckets yield nothing.
    pub fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            nodes: &self.core.nodes,
            cur: self.core.buckets.get(bucket).copied().flatten(),
            forward: true,
        }
    }

    /// Entries of bucket `bucket` from tail (oldest) to head (newest).
    pub fn chain_rev(&self, bucket: usize) -> Chain<'_, K, V> {
        let mut tail = self.core.buckets.get(bucket).copied().flatten();
        while let Some(next) = tail.and_then(|t| self.core.nodes[t].next) {
            tail = Some(next);
        }
        Chain {
            nodes: &self.core.nodes,
            cur: tail,
            forward: false,
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.core.buckets.iter(),
            chain: Chain {
                nodes: &self.core.nodes,
                cur: None,
                forward: true,
            },
        }
    }

    /// Insertion stamps along bucket `bucket`, head to tail.
    #[cfg(test)]
    pub(crate) fn chain_stamps(&self, bucket: usize) -> Vec<u64> {
        self.chain(bucket)
            .map(|(h, _, _)| self.core.nodes[h.0].seq)
            .collect()
    }

    /// Drop every entry. Capacity and the lifetime collision maximum are kept.
    pub fn clear(&mut self) {
        let _busy = self.guard.enter();
        self.core.clear();
    }
}

impl<K, V, H> ChainedHashTable<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    /// Fixed-size table of `capacity` buckets. `capacity` must be prime.
    pub fn with_hasher(capacity: usize, hasher: H) -> Result<Self> {
        Self::with_options(TableOptions::new(capacity), hasher)
    }

    pub fn with_options(options: TableOptions, hasher: H) -> Result<Self> {
        options.resize.validate()?;
        let capacity = if options.round_to_prime {
            next_prime(options.capacity).ok_or(Error::InvalidArgument {
                reason: "no prime capacity fits in usize",
            })?
        } else if is_prime(options.capacity) {
            options.capacity
        } else {
            return Err(Error::InvalidArgument {
                reason: "capacity must be prime",
            });
        };
        let core = Chains::with_capacity(capacity)?;
        debug!(
            "created chained hash table with {} buckets ({:?})",
            capacity, options.resize
        );
        Ok(Self {
            hasher,
            core,
            initial_capacity: capacity,
            resize: options.resize,
            guard: SanityGuard::new("ChainedHashTable"),
        })
    }

    /// Bucket index `key` maps to at the current capacity.
    pub fn bucket_of(&self, key: &K) -> usize {
        let _busy = self.guard.enter();
        bucket_for(&self.hasher, key, self.core.capacity())
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<Handle> {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, &key, self.core.capacity());
        if self.core.find_in(bucket, &key).is_some() {
            return Err(Error::DuplicateKey);
        }
        let k = self.core.link_front(bucket, key, value);
        self.core.grow_if_loaded(&self.hasher, self.resize);
        Ok(Handle(k))
    }

    pub fn remove(&mut self, key: &K) -> Result<(K, V)> {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, key, self.core.capacity());
        let k = self.core.find_in(bucket, key).ok_or(Error::NotFound)?;
        let node = self.core.unlink(k).ok_or(Error::NotFound)?;
        self.core
            .shrink_if_sparse(&self.hasher, self.resize, self.initial_capacity);
        Ok((node.key, node.value))
    }

    /// Remove an entry by identity. Stale handles return `None`.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let _busy = self.guard.enter();
        let node = self.core.unlink(handle.0)?;
        self.core
            .shrink_if_sparse(&self.hasher, self.resize, self.initial_capacity);
        Some((node.key, node.value))
    }

    pub fn find(&self, key: &K) -> Option<Handle> {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, key, self.core.capacity());
        self.core.find_in(bucket, key).map(Handle)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, key, self.core.capacity());
        let k = self.core.find_in(bucket, key)?;
        self.core.nodes.get(k).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, key, self.core.capacity());
        let k = self.core.find_in(bucket, key)?;
        self.core.nodes.get_mut(k).map(|n| &mut n.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let _busy = self.guard.enter();
        let bucket = bucket_for(&self.hasher, key, self.core.capacity());
        self.core.find_in(bucket, key).is_some()
    }

    /// Move to `capacity` buckets (must be prime) and rehash every entry.
    /// On failure the table is unchanged.
    pub fn resize(&mut self, capacity: usize) -> Result<()> {
        let _busy = self.guard.enter();
        if !is_prime(capacity) {
            return Err(Error::InvalidArgument {
                reason: "capacity must be prime",
            });
        }
        if capacity == self.core.capacity() {
            return Ok(());
        }
        self.core.rehash(&self.hasher, capacity)
    }
}

impl<K, V, H> fmt::Display for ChainedHashTable<K, V, H>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ChainedHashTable capacity={} entries={} collisions={} max_collisions={}",
            self.capacity(),
            self.len(),
            self.collisions(),
            self.max_collisions()
        )?;
        for bucket in 0..self.capacity() {
            let mut chain = self.chain(bucket).peekable();
            if chain.peek().is_none() {
                continue;
            }
            write!(f, "  [{}]", bucket)?;
            for (_, k, v) in chain {
                write!(f, " {:?} => {:?};", k, v)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<K, V, H> fmt::Debug for ChainedHashTable<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedHashTable")
            .field("capacity", &self.capacity())
            .field("entries", &self.len())
            .field("collisions", &self.collisions())
            .field("max_collisions", &self.max_collisions())
            .field("resize", &self.resize)
            .finish()
    }
}
