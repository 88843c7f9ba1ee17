//! Nonce-indexed transaction storage for a single account.

use crate::heap::NonceHeap;
use arbor_types::{Transaction, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Shared handle to an immutable pooled transaction.
///
/// The map, its sorted cache and every callback recipient share the same
/// allocation, so reporting a removed transaction never copies it.
pub type PooledTx = Arc<Transaction>;

/// A nonce -> transaction map with a heap based index, allowing iteration
/// over the contents in a nonce-incrementing way.
///
/// Three views of the same data are maintained: the map itself for exact
/// lookups, the nonce heap for cheap minimum extraction, and an optional
/// fully sorted snapshot. Every mutation either trims the snapshot
/// incrementally or drops it; it is never left stale.
#[derive(Debug, Default)]
pub struct TxSortedMap {
    /// Map storing the transaction data
    items: HashMap<u64, PooledTx>,
    /// Heap of nonces of all the stored transactions
    index: NonceHeap,
    /// Cache of the transactions already sorted by nonce
    cache: Option<Vec<PooledTx>>,
}

impl TxSortedMap {
    /// Create a new, empty nonce-sorted transaction map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve the transaction stored under the given nonce, if any.
    pub fn get(&self, nonce: u64) -> Option<&PooledTx> {
        self.items.get(&nonce)
    }

    /// Insert a new transaction, updating the nonce index. A transaction
    /// already stored under the same nonce is overwritten without adding a
    /// second index entry.
    pub fn put(&mut self, tx: PooledTx) {
        let nonce = tx.nonce();
        if !self.items.contains_key(&nonce) {
            self.index.push(nonce);
        }
        self.items.insert(nonce, tx);
        self.cache = None;
        self.assert_invariants();
    }

    /// Remove all transactions with a nonce lower than `threshold`, passing
    /// each removed transaction to `f` in ascending nonce order.
    pub fn forward<F: FnMut(PooledTx)>(&mut self, threshold: u64, mut f: F) {
        let mut removed = 0;
        // Pop off heap items until the threshold is reached.
        while let Some(min) = self.index.peek() {
            if min >= threshold {
                break;
            }
            self.index.pop();
            if let Some(item) = self.items.remove(&min) {
                f(item);
                removed += 1;
            }
        }
        // If we had a cached order, shift the front. The popped nonces were
        // the smallest, so they occupied the leading cache slots.
        if let Some(cache) = self.cache.as_mut() {
            cache.drain(..removed);
        }
        self.assert_invariants();
    }

    /// Remove every transaction matching `pred`, passing each match to
    /// `removed`. If `strict` is true, all transactions with nonces higher
    /// than the first match are also dropped and passed to `invalid`: a
    /// nonce sequence with a hole cannot be executed past the hole.
    pub fn filter<P, R, I>(&mut self, pred: P, strict: bool, mut removed: R, mut invalid: I)
    where
        P: Fn(&Transaction) -> bool,
        R: FnMut(PooledTx),
        I: FnMut(PooledTx),
    {
        if strict {
            // Iterate in order so everything above the first match can be
            // sliced off in one go.
            self.ensure_cache();
            let mut cache = self.cache.take().unwrap_or_default();
            if let Some(i) = cache.iter().position(|tx| pred(tx)) {
                let mut tail = cache.split_off(i).into_iter();
                if let Some(first) = tail.next() {
                    self.items.remove(&first.nonce());
                    removed(first);
                }
                for tx in tail {
                    self.items.remove(&tx.nonce());
                    invalid(tx);
                }
                // The break point is data dependent, so the heap cannot be
                // repaired incrementally.
                self.index.rebuild(self.items.keys().copied());
            }
            self.cache = Some(cache);
            self.assert_invariants();
            return;
        }

        let before = self.items.len();
        self.items.retain(|_, tx| {
            if pred(tx) {
                removed(tx.clone());
                false
            } else {
                true
            }
        });
        // If transactions were removed, the heap and cache are ruined.
        if self.items.len() != before {
            self.index.rebuild(self.items.keys().copied());
            self.cache = None;
        }
        self.assert_invariants();
    }

    /// Place a hard limit on the number of stored transactions, dropping
    /// the highest nonces until the limit is met and passing each dropped
    /// transaction to `removed`.
    pub fn cap<F: FnMut(PooledTx)>(&mut self, threshold: usize, mut removed: F) {
        // Short circuit if the number of items is under the limit.
        let len = self.items.len();
        if len <= threshold {
            return;
        }
        trace!(drops = len - threshold, threshold, "capping transaction map");

        // Resort the index so the highest nonces sit at the back.
        self.index.sort_unstable();
        for i in (threshold..len).rev() {
            let nonce = self.index.at(i);
            if let Some(item) = self.items.remove(&nonce) {
                removed(item);
            }
        }
        self.index.truncate(threshold);
        // Restore the heap over the retained prefix.
        self.index.heapify();

        // If we had a cache, shift off the back: the tail held the highest
        // nonces, matching exactly what was dropped.
        if let Some(cache) = self.cache.as_mut() {
            cache.truncate(threshold);
        }
        self.assert_invariants();
    }

    /// Delete the transaction stored under `nonce`, returning whether it
    /// was found. If `strict` is true, every transaction with a higher
    /// nonce is also dropped and passed to `invalid`.
    pub fn remove<F: FnMut(PooledTx)>(&mut self, nonce: u64, strict: bool, mut invalid: F) -> bool {
        // Short circuit if no transaction is present.
        if !self.items.contains_key(&nonce) {
            return false;
        }
        self.ensure_cache();
        let mut cache = self.cache.take().unwrap_or_default();
        self.items.remove(&nonce);
        let pos = match cache.binary_search_by_key(&nonce, |tx| tx.nonce()) {
            Ok(pos) => pos,
            // The cache mirrors the items, so the nonce is always found.
            Err(pos) => pos,
        };

        if !strict {
            // Splice the single entry out of the cache and the heap.
            cache.remove(pos);
            self.index.remove(nonce);
            self.cache = Some(cache);
            self.assert_invariants();
            return true;
        }

        // Drop everything above the removed nonce.
        for tx in cache.split_off(pos).into_iter().skip(1) {
            self.items.remove(&tx.nonce());
            invalid(tx);
        }
        self.index.rebuild(self.items.keys().copied());
        self.cache = Some(cache);
        self.assert_invariants();
        true
    }

    /// Drain a maximal contiguous run of transactions beginning at the
    /// lowest stored nonce, passing each to `f` in ascending order and
    /// stopping at the first gap.
    ///
    /// Transactions with nonces lower than `start` are included too: the
    /// pool should never hand us such state, but draining them keeps the
    /// account usable instead of wedging it.
    pub fn ready<F: FnMut(PooledTx)>(&mut self, start: u64, mut f: F) {
        // Short circuit if no transactions are available.
        let Some(min) = self.index.peek() else { return };
        if min > start {
            return;
        }

        match self.cache.take() {
            None => {
                let mut next = min;
                while self.index.peek() == Some(next) {
                    self.index.pop();
                    if let Some(item) = self.items.remove(&next) {
                        f(item);
                    }
                    next += 1;
                }
            }
            Some(mut cache) => {
                // Measure the contiguous run off the cache front, then
                // drain it.
                let mut run = 0;
                let mut expected = None;
                for tx in cache.iter() {
                    if let Some(n) = expected {
                        if tx.nonce() != n {
                            break;
                        }
                    }
                    expected = Some(tx.nonce() + 1);
                    run += 1;
                }
                for tx in cache.drain(..run) {
                    self.items.remove(&tx.nonce());
                    f(tx);
                }
                self.cache = Some(cache);
                self.index.rebuild(self.items.keys().copied());
            }
        }
        self.assert_invariants();
    }

    /// The number of stored transactions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the map holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A nonce-sorted snapshot of the stored transactions. The sort is
    /// cached and reused until the next mutation.
    pub fn flatten(&mut self) -> Vec<PooledTx> {
        // Copy the cache to prevent accidental modifications.
        self.ensure_cache().clone()
    }

    /// Remove the last `n` transactions in nonce order (all of them if
    /// fewer are stored), passing each to `f` in ascending order.
    pub fn for_last<F: FnMut(PooledTx)>(&mut self, n: usize, mut f: F) {
        self.ensure_cache();
        let mut cache = self.cache.take().unwrap_or_default();
        let split = cache.len().saturating_sub(n);
        for tx in cache.split_off(split) {
            self.items.remove(&tx.nonce());
            f(tx);
        }
        self.cache = Some(cache);
        self.index.rebuild(self.items.keys().copied());
        self.assert_invariants();
    }

    /// The highest-nonce transaction, or `None` when the map is empty.
    pub fn last(&mut self) -> Option<PooledTx> {
        self.ensure_cache().last().cloned()
    }

    /// Build the sorted snapshot if it is absent. This is the only
    /// O(n log n) path; mutations either maintain the snapshot
    /// incrementally or clear it, so repeated reads sort at most once.
    fn ensure_cache(&mut self) -> &mut Vec<PooledTx> {
        let items = &self.items;
        self.cache.get_or_insert_with(|| {
            let mut txs: Vec<PooledTx> = items.values().cloned().collect();
            txs.sort_unstable_by_key(|tx| tx.nonce());
            txs
        })
    }

    /// Index/items/cache disagreement is a programming error, not a
    /// runtime condition; checked in debug builds only.
    fn assert_invariants(&self) {
        debug_assert_eq!(self.index.len(), self.items.len());
        if let Some(cache) = &self.cache {
            debug_assert_eq!(cache.len(), self.items.len());
            debug_assert!(cache.windows(2).all(|w| w[0].nonce() < w[1].nonce()));
            debug_assert!(cache.iter().all(|tx| self.items.contains_key(&tx.nonce())));
        }
    }
}

/// A "list" of transactions belonging to an account, sorted by nonce. The
/// same type serves both the contiguous executable/pending queue and the
/// gapped future queue, with minor behavioral changes.
#[derive(Debug)]
pub struct TxList {
    /// Whether nonces are strictly continuous or not
    strict: bool,
    /// Heap indexed sorted map of the transactions
    txs: TxSortedMap,
    /// Cost of the highest costing transaction, only lowered by `filter`
    costcap: U256,
    /// Gas limit of the highest spending transaction, only lowered by `filter`
    gascap: u64,
}

impl TxList {
    /// Create a new transaction list. A strict list invalidates every
    /// higher nonce when one of its transactions is dropped; a non-strict
    /// list tolerates gaps.
    pub fn new(strict: bool) -> Self {
        TxList {
            strict,
            txs: TxSortedMap::new(),
            costcap: U256::zero(),
            gascap: 0,
        }
    }

    /// Whether the list was created in strict mode.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// Whether a transaction with the same nonce as `tx` is already stored.
    pub fn overlaps(&self, tx: &Transaction) -> bool {
        self.txs.get(tx.nonce()).is_some()
    }

    /// Try to insert a new transaction, returning whether it was accepted
    /// and, if so, any previous transaction it replaced.
    ///
    /// A replacement must exceed the old gas price by at least `price_bump`
    /// percent (truncating division). The new price must also be strictly
    /// higher than the old one; wei-level differences alone cannot satisfy
    /// the percentage check at low denominations.
    pub fn add(&mut self, tx: PooledTx, price_bump: u64) -> (bool, Option<PooledTx>) {
        // If there's an older better transaction, abort.
        let old = self.txs.get(tx.nonce()).cloned();
        if let Some(old) = &old {
            let threshold = old
                .gas_price()
                .saturating_mul(U256::from(100 + price_bump))
                / U256::from(100);
            if old.cmp_gas_price(&tx).is_ge() || tx.cmp_gas_price_to(&threshold).is_lt() {
                return (false, None);
            }
        }
        // Otherwise overwrite the old transaction with the current one,
        // raising the cost and gas high-water marks as needed.
        if self.costcap < tx.cost() {
            self.costcap = tx.cost();
        }
        if self.gascap < tx.gas() {
            self.gascap = tx.gas();
        }
        self.txs.put(tx);
        (true, old)
    }

    /// Remove all transactions with a nonce lower than `threshold`, passing
    /// each removed transaction to `f` in ascending nonce order.
    pub fn forward<F: FnMut(PooledTx)>(&mut self, threshold: u64, f: F) {
        self.txs.forward(threshold, f)
    }

    /// Remove all transactions with a cost above `cost_limit` or a gas
    /// limit above `gas_limit`. Matches go to `removed`; in strict mode the
    /// transactions invalidated above the first match go to `invalid`.
    ///
    /// The cached cost and gas caps decide quickly whether there is any
    /// point in scanning at all: they are upper bounds over everything
    /// stored, so limits that cover them cannot be violated. An effective
    /// pass lowers both caps to the now-authoritative limits.
    pub fn filter<R, I>(&mut self, cost_limit: U256, gas_limit: u64, removed: R, invalid: I)
    where
        R: FnMut(PooledTx),
        I: FnMut(PooledTx),
    {
        // If all transactions are below the thresholds, short circuit.
        if self.costcap <= cost_limit && self.gascap <= gas_limit {
            return;
        }
        trace!(%cost_limit, gas_limit, "filtering account transactions over limits");
        self.costcap = cost_limit;
        self.gascap = gas_limit;

        self.txs.filter(
            move |tx| tx.cost() > cost_limit || tx.gas() > gas_limit,
            self.strict,
            removed,
            invalid,
        )
    }

    /// Place a hard limit on the number of stored transactions, dropping
    /// the highest nonces and passing each dropped transaction to `removed`.
    pub fn cap<F: FnMut(PooledTx)>(&mut self, threshold: usize, removed: F) {
        self.txs.cap(threshold, removed)
    }

    /// Delete `tx` from the list, returning whether it was found. In strict
    /// mode every transaction invalidated by the deletion is passed to
    /// `invalid`.
    pub fn remove<F: FnMut(PooledTx)>(&mut self, tx: &Transaction, invalid: F) -> bool {
        self.txs.remove(tx.nonce(), self.strict, invalid)
    }

    /// Drain a contiguous run of transactions ready for processing,
    /// starting at the lowest stored nonce; see [`TxSortedMap::ready`].
    pub fn ready<F: FnMut(PooledTx)>(&mut self, start: u64, f: F) {
        self.txs.ready(start, f)
    }

    /// The number of stored transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether the list holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// A nonce-sorted snapshot of the stored transactions.
    pub fn flatten(&mut self) -> Vec<PooledTx> {
        self.txs.flatten()
    }

    /// Remove the last `n` transactions in nonce order, passing each to `f`
    /// in ascending order.
    pub fn for_last<F: FnMut(PooledTx)>(&mut self, n: usize, f: F) {
        self.txs.for_last(n, f)
    }

    /// The highest-nonce transaction, or `None` when the list is empty.
    pub fn last(&mut self) -> Option<PooledTx> {
        self.txs.last()
    }
}
