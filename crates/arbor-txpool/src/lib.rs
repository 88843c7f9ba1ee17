//! # arbor-txpool
//!
//! Per-account transaction index for the Arbor transaction pool.
//!
//! This crate provides:
//! - Nonce-keyed transaction storage with O(1) lookup
//! - Replace-by-fee admission with a configurable price bump
//! - Threshold, predicate and capacity based eviction
//! - Gap-aware draining of executable transactions
//!
//! ## Architecture
//!
//! ```text
//! +------------------+
//! |      TxList      |  <- strict flag, price bump, cost/gas caps
//! +------------------+
//!          |
//! +------------------+
//! |   TxSortedMap    |  <- nonce -> tx map, sorted snapshot cache
//! +------------------+
//!          |
//! +------------------+
//! |    NonceHeap     |  <- min-heap over the stored nonces
//! +------------------+
//! ```
//!
//! One [`TxList`] holds the transactions of a single account. The owning
//! pool is expected to keep one list per sender and to serialize access to
//! each list; no operation here takes a lock or blocks.
//!
//! ## Usage
//!
//! ```ignore
//! use arbor_txpool::TxList;
//!
//! let mut pending = TxList::new(true);
//! let (accepted, replaced) = pending.add(tx, 10);
//! pending.ready(account_nonce, |tx| include_in_block(tx));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod heap;
mod list;

pub use list::{PooledTx, TxList, TxSortedMap};
