//! Prime sizing helpers for bucket arrays.
//!
//! Modulo hashing spreads integer keys better over a prime number of
//! buckets, so every table capacity is prime.

/// Trial division. Bucket counts are small enough that this never shows up
/// next to the rehash it precedes.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5usize;
    while let Some(sq) = i.checked_mul(i) {
        if sq > n {
            break;
        }
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Smallest prime `>= n`, or `None` if it would overflow `usize`.
pub fn next_prime(n: usize) -> Option<usize> {
    let mut c = n.max(2);
    loop {
        if is_prime(c) {
            return Some(c);
        }
        c = c.checked_add(1)?;
    }
}

/// Largest prime `<= n`, or `None` when `n < 2`.
pub fn prev_prime(n: usize) -> Option<usize> {
    (2..=n).rev().find(|&c| is_prime(c))
}
