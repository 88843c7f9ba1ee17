//! Transaction type consumed by the pool index

use crate::{Address, U256};
use bytes::Bytes;
use std::cmp::Ordering;

/// A transaction as seen by the pool.
///
/// Immutable once constructed; the pool never mutates stored transactions
/// and treats prices and costs as opaque non-negative integers. Values near
/// `U256::MAX` saturate in [`cost`](Transaction::cost) rather than panic.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    /// Sender account nonce
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient address (None for contract creation)
    pub to: Option<Address>,
    /// Value to transfer in wei
    pub value: U256,
    /// Input data
    pub data: Bytes,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        nonce: u64,
        gas_price: U256,
        gas_limit: u64,
        to: Option<Address>,
        value: U256,
        data: Bytes,
    ) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
        }
    }

    /// Get nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Get the gas limit
    pub fn gas(&self) -> u64 {
        self.gas_limit
    }

    /// Get the gas price
    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    /// Total funds the transaction can consume: gas price * gas limit + value
    pub fn cost(&self) -> U256 {
        self.gas_price
            .saturating_mul(U256::from(self.gas_limit))
            .saturating_add(self.value)
    }

    /// Compare this transaction's gas price against another transaction's
    pub fn cmp_gas_price(&self, other: &Transaction) -> Ordering {
        self.gas_price.cmp(&other.gas_price)
    }

    /// Compare this transaction's gas price against a raw price
    pub fn cmp_gas_price_to(&self, price: &U256) -> Ordering {
        self.gas_price.cmp(price)
    }

    /// Check if this is a contract creation (no recipient)
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}
