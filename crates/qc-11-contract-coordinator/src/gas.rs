//! # Gas Bridge
//!
//! Bounded gas meter in host units plus the conversion to and from the
//! engine's finer-grained units. The multiplier is a keeper parameter; the
//! engine only reports how much it used.

use crate::errors::ContractError;

// =============================================================================
// HOST GAS COSTS
// =============================================================================

/// Gas costs charged by the host bridge for contract storage access.
pub mod costs {
    /// Flat cost of a storage read.
    pub const READ_COST_FLAT: u64 = 1_000;
    /// Cost per byte read (key + value).
    pub const READ_COST_PER_BYTE: u64 = 3;
    /// Flat cost of a storage write.
    pub const WRITE_COST_FLAT: u64 = 2_000;
    /// Cost per byte written (key + value).
    pub const WRITE_COST_PER_BYTE: u64 = 30;
    /// Cost of a delete.
    pub const DELETE_COST: u64 = 1_000;
    /// Flat cost of each entry returned by a scan.
    pub const ITER_NEXT_COST_FLAT: u64 = 30;
}

/// Descriptor used when charging engine-reported gas.
pub const WASM_CONTRACT_DESCRIPTOR: &str = "wasm contract";

// =============================================================================
// GAS METER
// =============================================================================

/// Bounded gas meter in host units.
///
/// Consumption is recorded even when it overshoots the limit so the caller
/// can report how far the meter went; `consumed_to_limit` caps that at the
/// limit for charging a parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    /// Creates a meter with nothing consumed.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    /// Returns the gas limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns gas consumed so far, possibly above the limit.
    #[must_use]
    pub const fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns remaining gas.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Consumed gas, capped at the limit.
    #[must_use]
    pub fn consumed_to_limit(&self) -> u64 {
        self.consumed.min(self.limit)
    }

    /// Returns true once the meter has reached its limit.
    #[must_use]
    pub const fn is_out_of_gas(&self) -> bool {
        self.consumed >= self.limit
    }

    /// Consumes gas.
    ///
    /// # Errors
    ///
    /// `OutOfGas` if consumption goes past the limit. The overshoot stays
    /// recorded.
    pub fn consume(&mut self, amount: u64, descriptor: &str) -> Result<(), ContractError> {
        self.consumed = self.consumed.saturating_add(amount);
        if self.consumed > self.limit {
            return Err(self.out_of_gas(descriptor));
        }
        Ok(())
    }

    /// Builds the out-of-gas error for this meter.
    #[must_use]
    pub fn out_of_gas(&self, descriptor: &str) -> ContractError {
        ContractError::OutOfGas {
            descriptor: descriptor.to_string(),
            limit: self.limit,
            consumed: self.consumed,
        }
    }
}

// =============================================================================
// UNIT CONVERSION
// =============================================================================

/// Scales remaining host gas into an engine gas limit.
#[must_use]
pub fn to_engine_gas(remaining: u64, multiplier: u64) -> u64 {
    remaining.saturating_mul(multiplier)
}

/// Converts engine gas back to host gas (integer division).
#[must_use]
pub fn from_engine_gas(engine_gas: u64, multiplier: u64) -> u64 {
    if multiplier == 0 {
        return engine_gas;
    }
    engine_gas / multiplier
}

/// Charges engine-reported gas to `meter`.
///
/// Returns the host gas charged.
///
/// # Errors
///
/// `OutOfGas` if the meter is at or past its limit afterwards.
pub fn charge_back(
    meter: &mut GasMeter,
    engine_gas_used: u64,
    multiplier: u64,
) -> Result<u64, ContractError> {
    let host_gas = from_engine_gas(engine_gas_used, multiplier);
    meter.consume(host_gas, WASM_CONTRACT_DESCRIPTOR)?;
    if meter.is_out_of_gas() {
        return Err(meter.out_of_gas(WASM_CONTRACT_DESCRIPTOR));
    }
    Ok(host_gas)
}

// =============================================================================
// TESTS
// =============================================================================
