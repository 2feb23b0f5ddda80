//! Key-to-bucket mapping.
//!
//! A [`KeyHasher`] turns a key and the current bucket count into a bucket
//! index. The table calls it on insert, lookup, removal, and once per entry
//! when it rehashes into a new capacity.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Maps a key to a bucket index in `0..capacity`.
///
/// Implemented for [`ModuloHasher`], [`BuildHasherAdapter`], and any
/// `Fn(&K, usize) -> usize`, so a plain closure works as a hash function.
pub trait KeyHasher<K: ?Sized> {
    fn bucket(&self, key: &K, capacity: usize) -> usize;
}

impl<K: ?Sized, F> KeyHasher<K> for F
where
    F: Fn(&K, usize) -> usize,
{
    #[inline]
    fn bucket(&self, key: &K, capacity: usize) -> usize {
        self(key, capacity)
    }
}

/// Integer keys that [`ModuloHasher`] can reduce directly.
pub trait IntegerKey {
    fn to_i128(&self) -> i128;
}

macro_rules! impl_integer_key {
    ($($t:ty),*) => {
        $(impl IntegerKey for $t {
            #[inline]
            fn to_i128(&self) -> i128 {
                *self as i128
            }
        })*
    };
}

impl_integer_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Default hash function: the key's value modulo the bucket count.
///
/// Negative keys wrap with Euclidean remainder, so `-6` lands in bucket 5
/// of an 11-bucket table.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ModuloHasher;

impl<K: IntegerKey> KeyHasher<K> for ModuloHasher {
    #[inline]
    fn bucket(&self, key: &K, capacity: usize) -> usize {
        key.to_i128().rem_euclid(capacity as i128) as usize
    }
}

/// Buckets arbitrary `Hash` keys through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct BuildHasherAdapter<S = DefaultHashBuilder> {
    build: S,
}

impl<S> BuildHasherAdapter<S> {
    pub fn new(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyHasher<K> for BuildHasherAdapter<S>
where
    K: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn bucket(&self, key: &K, capacity: usize) -> usize {
        (self.build.hash_one(key) % capacity as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    #[test]
    fn modulo_matches_plain_remainder_for_non_negative_keys() {
        for k in [0u32, 5, 16, 27, 10, 11, 1000] {
            assert_eq!(ModuloHasher.bucket(&k, 11), (k % 11) as usize);
        }
    }

    #[test]
    fn modulo_wraps_negative_keys_into_range() {
        assert_eq!(ModuloHasher.bucket(&-6i64, 11), 5);
        assert_eq!(ModuloHasher.bucket(&-11i32, 11), 0);
        assert_eq!(ModuloHasher.bucket(&i64::MIN, 13), (i64::MIN as i128).rem_euclid(13) as usize);
    }

    #[test]
    fn closure_is_a_key_hasher() {
        let always_three = |_: &String, _: usize| 3usize;
        assert_eq!(always_three.bucket(&"x".to_string(), 7), 3);
    }

    #[test]
    fn adapter_is_deterministic_and_in_range() {
        let h = BuildHasherAdapter::new(RandomState::new());
        for cap in [2usize, 11, 97] {
            for key in ["a", "bb", "ccc"] {
                let b = h.bucket(key, cap);
                assert!(b < cap);
                assert_eq!(b, h.bucket(key, cap));
            }
        }
    }
}
