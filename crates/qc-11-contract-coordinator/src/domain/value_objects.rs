//! # Value Objects
//!
//! Immutable domain primitives for contract coordination.
//! These types represent concepts that are defined by their value, not identity.

use crate::errors::ContractError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for coin amounts
pub use primitive_types::U256;

/// Code identifier, assigned monotonically and never reused.
pub type CodeId = u64;

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account or contract address.
///
/// The human-readable form is `0x` followed by 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Length of a canonical address.
    pub const LEN: usize = 20;

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == Self::LEN {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| ContractError::Invalid(format!("address {s:?} lacks 0x prefix")))?;
        if digits.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(ContractError::Invalid(format!(
                "address {s:?} is not lowercase"
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|e| ContractError::Invalid(format!("address {s:?}: {e}")))?;
        Self::from_slice(&bytes).ok_or_else(|| {
            ContractError::Invalid(format!(
                "address {s:?} has {} bytes, expected {}",
                bytes.len(),
                Self::LEN
            ))
        })
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for [u8; 20] {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

// =============================================================================
// CHECKSUM (32 bytes)
// =============================================================================

/// SHA-256 checksum of uploaded bytecode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Checksum(pub [u8; 32]);

impl Checksum {
    /// Creates a checksum from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// COIN
// =============================================================================

/// An amount of a single denomination.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount.
    pub amount: U256,
}

impl Coin {
    /// Creates a coin.
    #[must_use]
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: U256::from(amount),
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Single-denomination coin list.
#[must_use]
pub fn coins(amount: u128, denom: impl Into<String>) -> Vec<Coin> {
    vec![Coin::new(amount, denom)]
}

/// Formats a coin list as `100denom,5other`.
#[must_use]
pub fn format_coins(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// =============================================================================
// LEDGER POSITION
// =============================================================================

/// Absolute position of a transaction in the ledger.
///
/// Orders history entries and creation positions; compared by block height
/// first, then by index within the block.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct LedgerPosition {
    /// Block height.
    pub block_height: u64,
    /// Transaction index within the block.
    pub tx_index: u64,
}

impl LedgerPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(block_height: u64, tx_index: u64) -> Self {
        Self {
            block_height,
            tx_index,
        }
    }

    /// Big-endian encoding that sorts like the position itself.
    #[must_use]
    pub fn to_key_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.block_height.to_be_bytes());
        out[8..].copy_from_slice(&self.tx_index.to_be_bytes());
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
