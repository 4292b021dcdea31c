//! # Driving Ports (API - Inbound)
//!
//! The interface other subsystems use to run contract operations. Each
//! call is one transaction: it commits entirely or not at all, and gas is
//! reported either way.

use crate::domain::entities::{AccessConfig, Event};
use crate::domain::value_objects::{Address, Checksum, Coin, CodeId};
use crate::errors::ContractError;
use async_trait::async_trait;

/// Outcome of one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReceipt<T> {
    /// Operation result; on `Err` nothing was committed.
    pub result: Result<T, ContractError>,
    /// Gas used, reported on success and failure.
    pub gas_used: u64,
    /// Events of the committed transaction; empty on failure.
    pub events: Vec<Event>,
}

impl<T> ExecutionReceipt<T> {
    /// Returns true if the transaction committed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Maps the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExecutionReceipt<U> {
        ExecutionReceipt {
            result: self.result.map(f),
            gas_used: self.gas_used,
            events: self.events,
        }
    }
}

/// Primary API of the contract coordinator.
///
/// ## Usage
///
/// ```ignore
/// let receipt = api.execute(sender, contract, msg, funds).await;
/// ```
#[async_trait]
pub trait SmartContractApi: Send + Sync {
    /// Uploads bytecode.
    async fn store_code(
        &self,
        sender: Address,
        wasm_code: Vec<u8>,
        instantiate_permission: Option<AccessConfig>,
    ) -> ExecutionReceipt<(CodeId, Checksum)>;

    /// Instantiates a stored code.
    #[allow(clippy::too_many_arguments)]
    async fn instantiate(
        &self,
        sender: Address,
        code_id: CodeId,
        admin: Option<Address>,
        msg: Vec<u8>,
        label: String,
        funds: Vec<Coin>,
    ) -> ExecutionReceipt<(Address, Option<Vec<u8>>)>;

    /// Executes a contract.
    async fn execute(
        &self,
        sender: Address,
        contract: Address,
        msg: Vec<u8>,
        funds: Vec<Coin>,
    ) -> ExecutionReceipt<Option<Vec<u8>>>;

    /// Migrates a contract.
    async fn migrate(
        &self,
        sender: Address,
        contract: Address,
        new_code_id: CodeId,
        msg: Vec<u8>,
    ) -> ExecutionReceipt<Option<Vec<u8>>>;

    /// Replaces or clears a contract's admin.
    async fn update_admin(
        &self,
        sender: Address,
        contract: Address,
        new_admin: Option<Address>,
    ) -> ExecutionReceipt<()>;

    /// Smart query. Never commits state.
    async fn query_smart(&self, contract: Address, msg: Vec<u8>) -> Result<Vec<u8>, ContractError>;

    /// Raw read of a contract's store.
    async fn query_raw(&self, contract: Address, key: Vec<u8>) -> Option<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_map_keeps_gas_and_events() {
        let receipt = ExecutionReceipt {
            result: Ok(2u64),
            gas_used: 77,
            events: vec![Event::new("execute")],
        };
        let mapped = receipt.map(|v| v * 10);
        assert_eq!(mapped.result, Ok(20));
        assert_eq!(mapped.gas_used, 77);
        assert_eq!(mapped.events.len(), 1);
        assert!(mapped.is_success());
    }
}
