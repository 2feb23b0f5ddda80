#![cfg(test)]

// Property tests for ChainedHashTable kept inside the crate so they can
// share one driver across hashers and resize policies.

use crate::chain_table::{ChainedHashTable, Handle, ResizePolicy, TableOptions};
use crate::error::Error;
use crate::hash::{KeyHasher, ModuloHasher};
use hashbrown::HashMap;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;

// Pool-indexed operations: indices shrink toward earlier keys and the pool
// mixes keys that collide modulo small primes.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    RemoveHandle(usize),
    Find(usize),
    Mutate(usize, i32),
    Resize(usize),
    Iterate,
}

const PRIMES: [usize; 6] = [2, 3, 7, 11, 13, 31];

fn arb_scenario() -> impl Strategy<Value = (Vec<i64>, Vec<Op>)> {
    proptest::collection::vec(-60i64..60, 1..=10).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::RemoveHandle),
            1 => idx.clone().prop_map(Op::Find),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => (0..PRIMES.len()).prop_map(Op::Resize),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Structural invariants that must hold between any two operations:
// - each chain walked backward is the forward walk reversed;
// - every entry sits in the bucket its key hashes to;
// - insertion stamps strictly decrease from head to tail (newest-first);
// - collisions == len - occupied buckets, and never exceeds the lifetime max.
fn check_chains<H: KeyHasher<i64>>(
    t: &ChainedHashTable<i64, i32, H>,
) -> Result<(), TestCaseError> {
    let mut occupied = 0;
    let mut total = 0;
    for b in 0..t.capacity() {
        let mut fwd: Vec<i64> = t.chain(b).map(|(_, k, _)| *k).collect();
        let bwd: Vec<i64> = t.chain_rev(b).map(|(_, k, _)| *k).collect();
        for k in &fwd {
            prop_assert_eq!(t.bucket_of(k), b);
        }
        if !fwd.is_empty() {
            occupied += 1;
        }
        total += fwd.len();
        let stamps = t.chain_stamps(b);
        prop_assert!(
            stamps.windows(2).all(|w| w[0] > w[1]),
            "bucket {} not newest-first: {:?}",
            b,
            stamps
        );
        fwd.reverse();
        prop_assert_eq!(fwd, bwd);
    }
    prop_assert_eq!(total, t.len());
    prop_assert_eq!(t.collisions(), t.len() - occupied);
    prop_assert!(t.collisions() <= t.max_collisions());
    Ok(())
}

// State-machine equivalence against hashbrown::HashMap.
// - Duplicate keys are rejected; successful inserts return a fresh handle.
// - Removal by key or by handle returns the model's pair and stales the handle.
// - Stale handles never resolve; len/is_empty match the model after each op.
fn run_state_machine<H: KeyHasher<i64>>(
    mut sut: ChainedHashTable<i64, i32, H>,
    pool: Vec<i64>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<i64, i32> = HashMap::new();
    let mut live: HashMap<i64, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = pool[i];
                let already = model.contains_key(&k);
                let before = sut.len();
                match sut.insert(k, v) {
                    Ok(h) => {
                        prop_assert!(!already, "insert must fail on duplicate");
                        prop_assert!(live.insert(k, h).is_none());
                        model.insert(k, v);
                    }
                    Err(e) => {
                        prop_assert_eq!(e, Error::DuplicateKey);
                        prop_assert!(already, "duplicate error only when key exists");
                        prop_assert_eq!(sut.len(), before);
                    }
                }
            }
            Op::Remove(i) => {
                let k = pool[i];
                match sut.remove(&k) {
                    Ok((kk, vv)) => {
                        prop_assert_eq!(kk, k);
                        prop_assert_eq!(Some(vv), model.remove(&k));
                        stale.extend(live.remove(&k));
                    }
                    Err(e) => {
                        prop_assert_eq!(e, Error::NotFound);
                        prop_assert!(!model.contains_key(&k));
                    }
                }
            }
            Op::RemoveHandle(i) => {
                let k = pool[i];
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove_handle(h).expect("live handle removes");
                    prop_assert_eq!(kk, k);
                    prop_assert_eq!(Some(vv), model.remove(&k));
                    stale.push(h);
                }
            }
            Op::Find(i) => {
                let k = pool[i];
                let found = sut.find(&k);
                prop_assert_eq!(found, live.get(&k).copied());
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::Mutate(i, d) => {
                let k = pool[i];
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.wrapping_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.wrapping_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            Op::Resize(p) => {
                sut.resize(PRIMES[p]).expect("prime resize succeeds");
                prop_assert_eq!(sut.capacity(), PRIMES[p]);
            }
            Op::Iterate => {
                let s_keys: BTreeSet<i64> = sut.iter().map(|(_, k, _)| *k).collect();
                let m_keys: BTreeSet<i64> = model.keys().copied().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check_chains(&sut)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine_fixed((pool, ops) in arb_scenario()) {
        let sut = ChainedHashTable::new(11).unwrap();
        run_state_machine(sut, pool, ops)?;
    }

    #[test]
    fn prop_state_machine_growable((pool, ops) in arb_scenario()) {
        let sut = ChainedHashTable::with_options(
            TableOptions::new(2).resize(ResizePolicy::growable()),
            ModuloHasher,
        )
        .unwrap();
        run_state_machine(sut, pool, ops)?;
    }

    // Worst case: every key in one chain.
    #[test]
    fn prop_state_machine_single_chain((pool, ops) in arb_scenario()) {
        let sut = ChainedHashTable::with_hasher(5, |_: &i64, _: usize| 0usize).unwrap();
        run_state_machine(sut, pool, ops)?;
    }
}
