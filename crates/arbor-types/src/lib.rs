//! # arbor-types
//!
//! Primitive and transaction types for the Arbor transaction pool.
//!
//! This crate provides:
//! - [`Address`] - 20-byte account address
//! - [`Transaction`] - The transaction as seen by the pool index
//! - [`U256`] - Re-exported 256-bit integer used for prices and costs

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod transaction;

pub use address::{Address, AddressError};
pub use transaction::Transaction;

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Transaction nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;
