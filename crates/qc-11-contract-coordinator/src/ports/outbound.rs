//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators the coordinator depends on:
//! - the ledger key-value store
//! - the contract engine and the host surface it calls back into
//! - the bank (`CoinTransferrer`)
//! - the outgoing message router (`Messenger`)
//! - the `AuthorizationPolicy`
//!
//! Dependencies point INWARD: adapters implement these traits.

use crate::domain::entities::{AccessConfig, Env, Event, MessageInfo};
use crate::domain::messages::{CallablePointResponse, CosmosMsg, Reply, Response};
use crate::domain::value_objects::{Address, Checksum, Coin, U256};
use crate::errors::{ContractError, EngineError};
use crate::keeper::ContractKeeper;
use crate::state::Context;

// =============================================================================
// LEDGER STORE
// =============================================================================

/// Iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Ascending key order.
    Ascending,
    /// Descending key order.
    Descending,
}

/// Key/value pair returned by iteration.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Ordered key-value store without transaction semantics.
///
/// Branching is layered on top by [`crate::state::CacheStore`].
pub trait KvStore {
    /// Reads a value.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Writes a value.
    fn set(&mut self, key: &[u8], value: &[u8]);

    /// Deletes a key. Deleting a missing key is a no-op.
    fn delete(&mut self, key: &[u8]);

    /// Entries with `start <= key < end`, unbounded where `None`.
    fn range(&self, start: Option<&[u8]>, end: Option<&[u8]>, order: Order) -> Vec<KvPair> {
        self.range_limited(start, end, order, usize::MAX)
    }

    /// The first `limit` entries of [`KvStore::range`] in `order`, without
    /// materializing the rest.
    fn range_limited(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
        limit: usize,
    ) -> Vec<KvPair>;

    /// Returns true if `key` is present.
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Entries whose key starts with `prefix`.
    fn prefix_range(&self, prefix: &[u8], order: Order) -> Vec<KvPair> {
        let end = prefix_end(prefix);
        self.range(Some(prefix), end.as_deref(), order)
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// `None` when the prefix is empty or all `0xff`.
#[must_use]
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

// =============================================================================
// CONTRACT ENGINE
// =============================================================================

/// What static analysis of compiled code reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    /// The code exports cross-chain entry points.
    pub has_ibc_entry_points: bool,
    /// Capabilities the code requires.
    pub required_capabilities: Vec<String>,
}

/// Result of an engine entry point call.
///
/// `outcome` carries the contract's own failure text; `gas_used` is in
/// engine units and is reported on success and failure alike.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOutput<T> {
    /// Contract result.
    pub outcome: Result<T, String>,
    /// Engine gas used.
    pub gas_used: u64,
}

impl<T> EngineOutput<T> {
    /// Successful call.
    pub fn ok(value: T, gas_used: u64) -> Self {
        Self {
            outcome: Ok(value),
            gas_used,
        }
    }

    /// Failed call.
    pub fn err(reason: impl Into<String>, gas_used: u64) -> Self {
        Self {
            outcome: Err(reason.into()),
            gas_used,
        }
    }
}

/// Opaque bytecode host.
///
/// Gas limits passed in are engine units.
pub trait ContractEngine: Send + Sync {
    /// Compiles and caches bytecode.
    fn create(&self, code: &[u8]) -> Result<Checksum, EngineError>;

    /// Analyzes compiled code.
    fn analyze(&self, checksum: &Checksum) -> Result<AnalysisReport, EngineError>;

    /// Returns the original bytecode.
    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, EngineError>;

    /// Keeps compiled code in the priority cache. Idempotent.
    fn pin(&self, checksum: &Checksum) -> Result<(), EngineError>;

    /// Releases code from the priority cache. Idempotent.
    fn unpin(&self, checksum: &Checksum) -> Result<(), EngineError>;

    /// Calls `instantiate`.
    fn instantiate(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response>;

    /// Calls `execute`.
    fn execute(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response>;

    /// Calls `migrate` on the new code.
    fn migrate(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response>;

    /// Calls `sudo`.
    fn sudo(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response>;

    /// Calls `reply`.
    fn reply(
        &self,
        checksum: &Checksum,
        env: &Env,
        reply: &Reply,
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response>;

    /// Calls `query`. The host rejects writes.
    fn query(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Vec<u8>>;

    /// Calls a named callable point.
    #[allow(clippy::too_many_arguments)]
    fn call_callable_point(
        &self,
        checksum: &Checksum,
        env: &Env,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        callstack: &[Address],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<CallablePointResponse>;

    /// Checks that the code exports the callable points described by
    /// `expected`. Returns a description of what is missing, if anything.
    fn validate_interface(
        &self,
        checksum: &Checksum,
        expected: &[u8],
    ) -> Result<Option<String>, EngineError>;
}

// =============================================================================
// HOST SURFACE (called by the engine)
// =============================================================================

/// Contract-scoped storage.
pub trait ContractStorage {
    /// Reads a key.
    fn read(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, ContractError>;
    /// Writes a key.
    fn write(&mut self, key: &[u8], value: &[u8]) -> Result<(), ContractError>;
    /// Removes a key.
    fn remove(&mut self, key: &[u8]) -> Result<(), ContractError>;
    /// Scans `[start, end)`.
    fn scan(
        &mut self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Vec<KvPair>, ContractError>;
}

/// Host functions beyond storage.
pub trait HostApi {
    /// Parses a human address.
    fn canonicalize_address(&mut self, human: &str) -> Result<Address, ContractError>;
    /// Formats a canonical address.
    fn humanize_address(&mut self, canonical: &[u8]) -> Result<String, ContractError>;
    /// Invokes a callable point of another contract and returns its data.
    fn call_callable_point(
        &mut self,
        contract: &Address,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        gas_limit: u64,
    ) -> Result<Vec<u8>, ContractError>;
    /// Validates another contract's callable point interface.
    fn validate_interface(
        &mut self,
        contract: &Address,
        expected: &[u8],
    ) -> Result<Option<String>, ContractError>;
}

/// Read access to other contracts and balances.
pub trait Querier {
    /// Smart query of another contract.
    fn query_smart(&mut self, contract: &Address, msg: &[u8]) -> Result<Vec<u8>, ContractError>;
    /// Raw read of another contract's store.
    fn query_raw(&mut self, contract: &Address, key: &[u8])
        -> Result<Option<Vec<u8>>, ContractError>;
    /// Balance of `address` in `denom`.
    fn query_balance(&mut self, address: &Address, denom: &str) -> Result<U256, ContractError>;
}

/// Everything the engine can call back into during a contract call.
pub trait ContractHost: ContractStorage + HostApi + Querier {}

impl<T: ContractStorage + HostApi + Querier> ContractHost for T {}

// =============================================================================
// BANK
// =============================================================================

/// Native coin transfers.
pub trait CoinTransferrer: Send + Sync {
    /// Moves coins; emits `transfer` and `message` events into `ctx`.
    fn transfer(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), ContractError>;

    /// Balance of `address` in `denom`.
    fn balance(&self, ctx: &Context<'_>, address: &Address, denom: &str) -> U256;

    /// Returns true if the account exists.
    fn has_account(&self, ctx: &Context<'_>, address: &Address) -> bool;

    /// Creates an empty account.
    fn create_account(&self, ctx: &mut Context<'_>, address: &Address);

    /// Blocks `address` from receiving funds.
    fn add_blocked_addr(&self, ctx: &mut Context<'_>, address: &Address);

    /// Unblocks `address`.
    fn delete_blocked_addr(&self, ctx: &mut Context<'_>, address: &Address);

    /// Returns true if `address` may not receive funds.
    fn is_blocked_addr(&self, ctx: &Context<'_>, address: &Address) -> bool;
}

// =============================================================================
// MESSENGER
// =============================================================================

/// What dispatching one message produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutput {
    /// Events to emit after those the handler already emitted into the context.
    pub events: Vec<Event>,
    /// Data of each handled message, in order.
    pub data: Vec<Vec<u8>>,
}

/// Routes a contract's outgoing messages.
pub trait Messenger: Send + Sync {
    /// Dispatches `msg` on behalf of `contract`.
    fn dispatch_msg(
        &self,
        keeper: &ContractKeeper,
        ctx: &mut Context<'_>,
        contract: &Address,
        port: Option<&str>,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutput, ContractError>;
}

// =============================================================================
// AUTHORIZATION
// =============================================================================

/// Capability checks consulted by the coordinator.
pub trait AuthorizationPolicy: Send + Sync {
    /// May `actor` upload code under `config`?
    fn can_create_code(&self, config: &AccessConfig, actor: &Address) -> bool;
    /// May `actor` instantiate code with instantiate rule `config`?
    fn can_instantiate_contract(&self, config: &AccessConfig, actor: &Address) -> bool;
    /// May `actor` administer a contract whose admin is `admin`?
    fn can_modify_contract(&self, admin: Option<&Address>, actor: &Address) -> bool;
    /// May contract status be changed through this policy?
    fn can_update_contract_status(&self) -> bool;
}

// =============================================================================
// TESTS
// =============================================================================
