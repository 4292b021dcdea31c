//! Host API Bridge.
//!
//! The callback surface handed to the engine for one contract call: scoped
//! storage, address conversion, callable points, interface checks and
//! queries. Every call is gas-charged on the caller's context.
//!
//! Failures that must not be swallowed by the contract (out-of-gas, missing
//! registry entries, call-stack and read-only violations) are recorded as an
//! abort; the keeper re-raises the first abort after the engine returns.

use super::ContractKeeper;
use crate::domain::value_objects::{Address, U256};
use crate::errors::ContractError;
use crate::gas::costs;
use crate::ports::outbound::{
    prefix_end, ContractStorage, HostApi, KvPair, Order, Querier,
};
use crate::registry::keys;
use crate::state::Context;

/// Host surface for one engine call.
pub struct HostBridge<'k, 'c, 's> {
    keeper: &'k ContractKeeper,
    ctx: &'c mut Context<'s>,
    contract: Address,
    prefix: Vec<u8>,
    call_stack: Vec<Address>,
    read_only: bool,
    abort: Option<ContractError>,
}

impl<'k, 'c, 's> HostBridge<'k, 'c, 's> {
    /// Creates a bridge for a call into `contract`.
    pub fn new(
        keeper: &'k ContractKeeper,
        ctx: &'c mut Context<'s>,
        contract: Address,
        call_stack: Vec<Address>,
        read_only: bool,
    ) -> Self {
        Self {
            keeper,
            ctx,
            contract,
            prefix: keys::contract_store(&contract),
            call_stack,
            read_only,
            abort: None,
        }
    }

    /// Contract this bridge is scoped to.
    #[must_use]
    pub fn contract(&self) -> &Address {
        &self.contract
    }

    /// Returns true if writes are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The first recorded abort, if any.
    #[must_use]
    pub fn into_abort(self) -> Option<ContractError> {
        self.abort
    }

    fn fail(&mut self, err: ContractError) -> ContractError {
        if self.abort.is_none() {
            self.abort = Some(err.clone());
        }
        err
    }

    fn charge(&mut self, amount: u64, descriptor: &str) -> Result<(), ContractError> {
        self.ctx
            .consume_gas(amount, descriptor)
            .map_err(|err| self.fail(err))
    }

    fn require_writable(&mut self) -> Result<(), ContractError> {
        if self.read_only {
            return Err(self.fail(ContractError::Invalid(format!(
                "write to {} in a read-only context",
                self.contract
            ))));
        }
        Ok(())
    }

    fn scoped(&self, key: &[u8]) -> Vec<u8> {
        let mut full = self.prefix.clone();
        full.extend_from_slice(key);
        full
    }
}

fn per_byte(len: usize, cost: u64) -> u64 {
    (len as u64).saturating_mul(cost)
}

// =============================================================================
// STORAGE
// =============================================================================

impl ContractStorage for HostBridge<'_, '_, '_> {
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, ContractError> {
        let value = self.ctx.store().get(&self.scoped(key));
        let len = key.len() + value.as_ref().map_or(0, Vec::len);
        self.charge(
            costs::READ_COST_FLAT.saturating_add(per_byte(len, costs::READ_COST_PER_BYTE)),
            "ReadFlat",
        )?;
        Ok(value)
    }

    fn write(&mut self, key: &[u8], value: &[u8]) -> Result<(), ContractError> {
        self.require_writable()?;
        self.charge(
            costs::WRITE_COST_FLAT
                .saturating_add(per_byte(key.len() + value.len(), costs::WRITE_COST_PER_BYTE)),
            "WriteFlat",
        )?;
        let full = self.scoped(key);
        self.ctx.store_mut().set(&full, value);
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> Result<(), ContractError> {
        self.require_writable()?;
        self.charge(costs::DELETE_COST, "Delete")?;
        let full = self.scoped(key);
        self.ctx.store_mut().delete(&full);
        Ok(())
    }

    fn scan(
        &mut self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Vec<KvPair>, ContractError> {
        let lower = self.scoped(start.unwrap_or_default());
        let upper = match end {
            Some(end) => Some(self.scoped(end)),
            None => prefix_end(&self.prefix),
        };
        let prefix_len = self.prefix.len();
        // One entry past what the remaining gas pays for is enough to run out.
        let affordable = self.ctx.gas().remaining() / costs::ITER_NEXT_COST_FLAT;
        let limit = usize::try_from(affordable)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let raw = self
            .ctx
            .store()
            .range_limited(Some(lower.as_slice()), upper.as_deref(), order, limit);

        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let key = key[prefix_len..].to_vec();
            self.charge(
                costs::ITER_NEXT_COST_FLAT
                    .saturating_add(per_byte(key.len() + value.len(), costs::READ_COST_PER_BYTE)),
                "IterNextFlat",
            )?;
            entries.push((key, value));
        }
        Ok(entries)
    }
}

// =============================================================================
// HOST API
// =============================================================================

impl HostApi for HostBridge<'_, '_, '_> {
    fn canonicalize_address(&mut self, human: &str) -> Result<Address, ContractError> {
        self.charge(self.keeper.config().canonicalize_cost, "canonicalize address")?;
        human.parse()
    }

    fn humanize_address(&mut self, canonical: &[u8]) -> Result<String, ContractError> {
        self.charge(self.keeper.config().humanize_cost, "humanize address")?;
        Address::from_slice(canonical)
            .map(|addr| addr.to_string())
            .ok_or_else(|| {
                ContractError::Invalid(format!(
                    "canonical address must be {} bytes, got {}",
                    Address::LEN,
                    canonical.len()
                ))
            })
    }

    fn call_callable_point(
        &mut self,
        contract: &Address,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        gas_limit: u64,
    ) -> Result<Vec<u8>, ContractError> {
        if self.read_only && !is_readonly {
            return Err(self.fail(ContractError::Invalid(format!(
                "mutating callable point {name} from a read-only context"
            ))));
        }
        let outcome = self
            .keeper
            .call_callable_point(
                self.ctx,
                &self.call_stack,
                contract,
                name,
                args,
                is_readonly,
                gas_limit,
            )
            .map_err(|err| self.fail(err))?;
        outcome.map_err(ContractError::ExecuteFailed)
    }

    fn validate_interface(
        &mut self,
        contract: &Address,
        expected: &[u8],
    ) -> Result<Option<String>, ContractError> {
        self.charge(
            self.keeper.config().validate_interface_cost,
            "validate interface",
        )?;
        let (_, code) = self
            .keeper
            .contract_instance(self.ctx, contract)
            .map_err(|err| self.fail(err))?;
        self.keeper
            .engine()
            .validate_interface(&code.code_hash, expected)
            .map_err(|err| self.fail(err.into()))
    }
}

// =============================================================================
// QUERIER
// =============================================================================

impl Querier for HostBridge<'_, '_, '_> {
    fn query_smart(&mut self, contract: &Address, msg: &[u8]) -> Result<Vec<u8>, ContractError> {
        let outcome = self
            .keeper
            .query_smart_from(self.ctx, &self.call_stack, contract, msg)
            .map_err(|err| self.fail(err))?;
        outcome.map_err(ContractError::QueryFailed)
    }

    fn query_raw(
        &mut self,
        contract: &Address,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let value = self.keeper.query_raw(self.ctx, contract, key);
        let len = key.len() + value.as_ref().map_or(0, Vec::len);
        self.charge(
            costs::READ_COST_FLAT.saturating_add(per_byte(len, costs::READ_COST_PER_BYTE)),
            "ReadFlat",
        )?;
        Ok(value)
    }

    fn query_balance(&mut self, address: &Address, denom: &str) -> Result<U256, ContractError> {
        self.charge(costs::READ_COST_FLAT, "query balance")?;
        Ok(self.keeper.bank().balance(self.ctx, address, denom))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, MockEngine, StoreBank};
    use crate::domain::entities::BlockInfo;
    use crate::domain::params::KeeperConfig;
    use crate::ports::outbound::KvStore;
    use std::sync::Arc;

    const ENTRY_COST: u64 = costs::ITER_NEXT_COST_FLAT + 2 * costs::READ_COST_PER_BYTE;

    fn keeper() -> ContractKeeper {
        ContractKeeper::new(
            KeeperConfig::default(),
            Arc::new(MockEngine::new()),
            Arc::new(StoreBank::new()),
        )
        .unwrap()
    }

    fn block() -> BlockInfo {
        BlockInfo {
            height: 1,
            time_nanos: 0,
            chain_id: "test".into(),
        }
    }

    /// Store with 100 single-byte entries under `contract`.
    fn populated(contract: &Address) -> MemoryStore {
        let mut store = MemoryStore::new();
        for n in 0..100u8 {
            let mut key = keys::contract_store(contract);
            key.push(n);
            store.set(&key, &[n]);
        }
        store
    }

    #[test]
    fn test_scan_charges_per_entry() {
        let keeper = keeper();
        let contract = Address::new([3u8; 20]);
        let mut store = populated(&contract);
        let mut ctx = Context::new(&mut store, block(), 0, 1_000_000);

        let mut host = HostBridge::new(&keeper, &mut ctx, contract, vec![contract], true);
        let entries = host.scan(None, None, Order::Ascending).unwrap();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0], (vec![0], vec![0]));
        assert!(host.into_abort().is_none());
        assert_eq!(ctx.gas().consumed(), 100 * ENTRY_COST);
    }

    #[test]
    fn test_scan_stops_when_gas_runs_out() {
        let keeper = keeper();
        let contract = Address::new([3u8; 20]);
        let mut store = populated(&contract);
        let mut ctx = Context::new(&mut store, block(), 0, 5 * ENTRY_COST + 1);

        let mut host = HostBridge::new(&keeper, &mut ctx, contract, vec![contract], true);
        let err = host.scan(None, None, Order::Descending).unwrap_err();
        assert!(err.is_out_of_gas());
        assert!(host.into_abort().is_some_and(|abort| abort.is_out_of_gas()));
        assert!(ctx.gas().is_out_of_gas());
    }
}
