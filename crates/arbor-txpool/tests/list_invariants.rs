//! Randomized consistency checks for the nonce-indexed transaction map.
//!
//! Drives arbitrary operation sequences against a `TxSortedMap` while
//! mirroring the expected membership in a plain `BTreeSet`, then verifies
//! that the map, its heap index and its sorted snapshot all agree.

use std::collections::BTreeSet;
use std::sync::Arc;

use arbor_txpool::{PooledTx, TxSortedMap};
use arbor_types::{Transaction, U256};
use bytes::Bytes;
use proptest::prelude::*;
use rand::seq::SliceRandom;

fn test_tx(nonce: u64) -> PooledTx {
    Arc::new(Transaction::new(
        nonce,
        U256::from(1_000_000_000u64),
        21_000,
        None,
        U256::zero(),
        Bytes::new(),
    ))
}

fn nonces(txs: &[PooledTx]) -> Vec<u64> {
    txs.iter().map(|tx| tx.nonce()).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Put(u64),
    Forward(u64),
    Cap(usize),
    Remove(u64, bool),
    Ready(u64),
    Filter(u64, bool),
    Flatten,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..64).prop_map(Op::Put),
        (0u64..64).prop_map(Op::Forward),
        (0usize..48).prop_map(Op::Cap),
        ((0u64..64), any::<bool>()).prop_map(|(n, s)| Op::Remove(n, s)),
        (0u64..64).prop_map(Op::Ready),
        ((2u64..6), any::<bool>()).prop_map(|(d, s)| Op::Filter(d, s)),
        Just(Op::Flatten),
    ]
}

/// Apply `op` to the reference model, which tracks nonce membership only.
fn apply_model(model: &mut BTreeSet<u64>, op: &Op) {
    match *op {
        Op::Put(n) => {
            model.insert(n);
        }
        Op::Forward(threshold) => {
            *model = model.split_off(&threshold);
        }
        Op::Cap(limit) => {
            while model.len() > limit {
                let highest = *model.iter().next_back().unwrap();
                model.remove(&highest);
            }
        }
        Op::Remove(n, strict) => {
            if model.remove(&n) && strict {
                model.retain(|&m| m < n);
            }
        }
        Op::Ready(start) => {
            if let Some(&min) = model.iter().next() {
                if min <= start {
                    let mut next = min;
                    while model.remove(&next) {
                        next += 1;
                    }
                }
            }
        }
        Op::Filter(divisor, strict) => {
            if strict {
                if let Some(&first) = model.iter().find(|&&n| n % divisor == 0) {
                    model.retain(|&m| m < first);
                }
            } else {
                model.retain(|&n| n % divisor != 0);
            }
        }
        Op::Flatten => {}
    }
}

fn apply_map(map: &mut TxSortedMap, op: &Op) {
    match *op {
        Op::Put(n) => map.put(test_tx(n)),
        Op::Forward(threshold) => map.forward(threshold, |_| {}),
        Op::Cap(limit) => map.cap(limit, |_| {}),
        Op::Remove(n, strict) => {
            map.remove(n, strict, |_| {});
        }
        Op::Ready(start) => map.ready(start, |_| {}),
        Op::Filter(divisor, strict) => {
            map.filter(|tx| tx.nonce() % divisor == 0, strict, |_| {}, |_| {})
        }
        Op::Flatten => {
            map.flatten();
        }
    }
}

proptest! {
    /// After any operation sequence the sorted snapshot matches the model,
    /// and draining through the heap index yields exactly the same set: the
    /// index never diverges from the stored items.
    #[test]
    fn map_matches_model(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut map = TxSortedMap::new();
        let mut model = BTreeSet::new();

        for op in &ops {
            apply_map(&mut map, op);
            apply_model(&mut model, op);

            prop_assert_eq!(map.len(), model.len());
            let snapshot = nonces(&map.flatten());
            let expected: Vec<u64> = model.iter().copied().collect();
            prop_assert_eq!(snapshot, expected);
        }

        // Drain everything through the heap index; a stale, missing or
        // duplicated index entry would surface as a mismatch here.
        let mut drained = Vec::new();
        map.forward(u64::MAX, |tx| drained.push(tx.nonce()));
        let expected: Vec<u64> = model.iter().copied().collect();
        prop_assert_eq!(drained, expected);
        prop_assert!(map.is_empty());
    }

    /// Reported removals complement the survivors exactly.
    #[test]
    fn forward_partitions_contents(
        inserts in proptest::collection::btree_set(0u64..128, 0..40),
        threshold in 0u64..128,
    ) {
        let mut map = TxSortedMap::new();
        for &n in &inserts {
            map.put(test_tx(n));
        }

        let mut removed = Vec::new();
        map.forward(threshold, |tx| removed.push(tx.nonce()));

        let expected_removed: Vec<u64> =
            inserts.iter().copied().filter(|&n| n < threshold).collect();
        prop_assert_eq!(removed, expected_removed);

        let survivors: Vec<u64> = nonces(&map.flatten());
        let expected_kept: Vec<u64> =
            inserts.iter().copied().filter(|&n| n >= threshold).collect();
        prop_assert_eq!(survivors, expected_kept);
    }
}

#[test]
fn flatten_is_sorted_regardless_of_insertion_order() {
    let mut order: Vec<u64> = (0..100).collect();
    order.shuffle(&mut rand::thread_rng());

    let mut map = TxSortedMap::new();
    for &n in &order {
        map.put(test_tx(n));
    }

    assert_eq!(nonces(&map.flatten()), (0..100).collect::<Vec<u64>>());
}
