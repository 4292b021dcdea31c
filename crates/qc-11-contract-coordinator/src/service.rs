//! # Contract Service
//!
//! Async boundary around the keeper. Owns the ledger store and runs every
//! request as one transaction inside a top-level branch: committed on
//! success, discarded on failure, gas reported either way.
//!
//! ## Security
//!
//! - Validates `sender_id` from the envelope (Consensus, Transaction Ordering)
//! - `sudo` is reachable only as an in-process method, never over IPC

use crate::adapters::MemoryStore;
use crate::domain::entities::{AccessConfig, BlockInfo, CodeProvenance};
use crate::domain::params::KeeperConfig;
use crate::domain::value_objects::{Address, Checksum, Coin, CodeId};
use crate::errors::{ContractError, IpcError};
use crate::events::{
    subsystem_ids, ContractOperation, ContractRequestPayload, ContractResponsePayload,
    OperationOutput,
};
use crate::keeper::ContractKeeper;
use crate::ports::inbound::{ExecutionReceipt, SmartContractApi};
use crate::ports::outbound::{CoinTransferrer, ContractEngine, KvStore};
use crate::state::{CacheStore, Context};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Contract service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Keeper parameters.
    pub keeper: KeeperConfig,
    /// Chain id reported in `Env`.
    pub chain_id: String,
    /// Gas limit of a request that does not name one.
    pub default_gas_limit: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            keeper: KeeperConfig::default(),
            chain_id: "quantum-chain".to_string(),
            default_gas_limit: 10_000_000,
        }
    }
}

/// Statistics for the contract service.
#[derive(Debug, Default, Clone)]
pub struct ServiceStats {
    /// Transactions run.
    pub transactions_executed: u64,
    /// Committed transactions.
    pub successful_executions: u64,
    /// Discarded transactions.
    pub failed_executions: u64,
    /// Total gas consumed, failures included.
    pub total_gas_used: u64,
    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
    /// Rejected requests (unauthorized sender).
    pub rejected_requests: u64,
}

struct LedgerState {
    store: Box<dyn KvStore + Send + Sync>,
    block: BlockInfo,
    tx_index: u64,
}

/// The contract service.
pub struct ContractService {
    config: ServiceConfig,
    keeper: Arc<ContractKeeper>,
    ledger: Arc<RwLock<LedgerState>>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl ContractService {
    /// Creates a service over an empty in-memory ledger.
    ///
    /// # Errors
    ///
    /// `Invalid` if the keeper config does not validate.
    pub fn new(
        config: ServiceConfig,
        engine: Arc<dyn ContractEngine>,
        bank: Arc<dyn CoinTransferrer>,
    ) -> Result<Self, ContractError> {
        let keeper = ContractKeeper::new(config.keeper.clone(), engine, bank)?;
        Ok(Self::with_keeper(config, keeper, Box::new(MemoryStore::new())))
    }

    /// Creates a service around an existing keeper and ledger store.
    #[must_use]
    pub fn with_keeper(
        config: ServiceConfig,
        keeper: ContractKeeper,
        store: Box<dyn KvStore + Send + Sync>,
    ) -> Self {
        let block = BlockInfo {
            height: 1,
            time_nanos: 0,
            chain_id: config.chain_id.clone(),
        };
        Self {
            config,
            keeper: Arc::new(keeper),
            ledger: Arc::new(RwLock::new(LedgerState {
                store,
                block,
                tx_index: 0,
            })),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// The keeper.
    #[must_use]
    pub fn keeper(&self) -> &ContractKeeper {
        &self.keeper
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Current block.
    pub async fn block(&self) -> BlockInfo {
        self.ledger.read().await.block.clone()
    }

    /// Starts the next block.
    pub async fn advance_block(&self, elapsed_nanos: u64) {
        let mut ledger = self.ledger.write().await;
        ledger.block.height += 1;
        ledger.block.time_nanos = ledger.block.time_nanos.saturating_add(elapsed_nanos);
        ledger.tx_index = 0;
        debug!(height = ledger.block.height, "block advanced");
    }

    /// Writes directly to the ledger without gas or a branch. Genesis setup
    /// (balances, codes) only.
    pub async fn genesis<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&ContractKeeper, &mut Context<'_>) -> R + Send,
    {
        let mut ledger = self.ledger.write().await;
        let LedgerState { store, block, .. } = &mut *ledger;
        let mut ctx = Context::new(store.as_mut(), block.clone(), 0, u64::MAX);
        f(&self.keeper, &mut ctx)
    }

    /// Runs `f` as one transaction with `gas_limit`.
    pub async fn run_transaction<T, F>(&self, gas_limit: u64, f: F) -> ExecutionReceipt<T>
    where
        T: Send,
        F: FnOnce(&ContractKeeper, &mut Context<'_>) -> Result<T, ContractError> + Send,
    {
        let start = Instant::now();
        let receipt = {
            let mut ledger = self.ledger.write().await;
            let LedgerState {
                store,
                block,
                tx_index,
            } = &mut *ledger;

            let mut cache = CacheStore::new(store.as_mut());
            let (result, gas_used, events) = {
                let mut ctx = Context::new(&mut cache, block.clone(), *tx_index, gas_limit);
                let result = f(&self.keeper, &mut ctx);
                (result, ctx.gas().consumed_to_limit(), ctx.take_events())
            };
            *tx_index += 1;

            match result {
                Ok(value) => {
                    cache.commit();
                    ExecutionReceipt {
                        result: Ok(value),
                        gas_used,
                        events,
                    }
                }
                Err(err) => {
                    cache.discard();
                    warn!(error = %err, gas_used, "transaction discarded");
                    ExecutionReceipt {
                        result: Err(err),
                        gas_used,
                        events: Vec::new(),
                    }
                }
            }
        };

        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        let mut stats = self.stats.write().await;
        stats.transactions_executed += 1;
        stats.total_gas_used = stats.total_gas_used.saturating_add(receipt.gas_used);
        if receipt.is_success() {
            stats.successful_executions += 1;
        } else {
            stats.failed_executions += 1;
        }
        let total = stats.transactions_executed;
        stats.avg_execution_time_us = (stats.avg_execution_time_us * (total - 1) + elapsed_us) / total;
        receipt
    }

    /// Runs `f` against a throwaway branch; nothing is committed.
    async fn run_read_only<T, F>(&self, f: F) -> Result<T, ContractError>
    where
        T: Send,
        F: FnOnce(&ContractKeeper, &mut Context<'_>) -> Result<T, ContractError> + Send,
    {
        let mut ledger = self.ledger.write().await;
        let LedgerState {
            store,
            block,
            tx_index,
        } = &mut *ledger;
        let mut cache = CacheStore::new(store.as_mut());
        let result = {
            let mut ctx = Context::new(
                &mut cache,
                block.clone(),
                *tx_index,
                self.config.default_gas_limit,
            );
            f(&self.keeper, &mut ctx)
        };
        cache.discard();
        result
    }

    /// Privileged call. In-process only.
    pub async fn sudo(&self, contract: Address, msg: Vec<u8>) -> ExecutionReceipt<Option<Vec<u8>>> {
        info!(%contract, "sudo");
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.sudo(ctx, &contract, &msg)
        })
        .await
    }

    /// Handle a contract request from the event bus.
    ///
    /// # Security
    ///
    /// `sender_id` must be 8 (Consensus) or 12 (Transaction Ordering).
    #[instrument(skip(self, payload), fields(correlation_id = %correlation_id))]
    pub async fn handle_request(
        &self,
        sender_id: u8,
        correlation_id: Uuid,
        payload: ContractRequestPayload,
    ) -> Result<ContractResponsePayload, IpcError> {
        if !subsystem_ids::is_authorized_request_sender(sender_id) {
            warn!(sender_id, "Unauthorized sender for ContractRequest");
            self.stats.write().await.rejected_requests += 1;
            return Err(IpcError::UnauthorizedSender {
                sender_id,
                allowed: vec![
                    subsystem_ids::CONSENSUS,
                    subsystem_ids::TRANSACTION_ORDERING,
                ],
            });
        }

        let gas_limit = payload.gas_limit.unwrap_or(self.config.default_gas_limit);
        if gas_limit == 0 {
            return Err(IpcError::ValidationFailed("gas limit must be positive".into()));
        }

        let receipt = match payload.operation {
            ContractOperation::QuerySmart { contract, msg } => {
                let result = self
                    .run_read_only(move |keeper, ctx| keeper.query_smart(ctx, &contract, &msg))
                    .await;
                ExecutionReceipt {
                    result: result.map(OperationOutput::QueryResult),
                    gas_used: 0,
                    events: Vec::new(),
                }
            }
            ContractOperation::QueryRaw { contract, key } => ExecutionReceipt {
                result: Ok(OperationOutput::RawValue(self.query_raw(contract, key).await)),
                gas_used: 0,
                events: Vec::new(),
            },
            operation => {
                self.run_transaction(gas_limit, move |keeper, ctx| {
                    Self::apply(keeper, ctx, operation)
                })
                .await
            }
        };

        debug!(
            success = receipt.is_success(),
            gas_used = receipt.gas_used,
            events = receipt.events.len(),
            "Contract request completed"
        );
        Ok(Self::response(receipt))
    }

    fn apply(
        keeper: &ContractKeeper,
        ctx: &mut Context<'_>,
        operation: ContractOperation,
    ) -> Result<OperationOutput, ContractError> {
        match operation {
            ContractOperation::StoreCode {
                sender,
                wasm_code,
                instantiate_permission,
            } => {
                let (code_id, checksum) = keeper.create(
                    ctx,
                    &sender,
                    &wasm_code,
                    CodeProvenance::default(),
                    instantiate_permission,
                )?;
                Ok(OperationOutput::CodeStored { code_id, checksum })
            }
            ContractOperation::Instantiate {
                sender,
                code_id,
                admin,
                msg,
                label,
                funds,
            } => {
                let (address, data) =
                    keeper.instantiate(ctx, code_id, &sender, admin, &msg, &label, &funds)?;
                Ok(OperationOutput::Instantiated { address, data })
            }
            ContractOperation::Execute {
                sender,
                contract,
                msg,
                funds,
            } => keeper
                .execute(ctx, &contract, &sender, &msg, &funds)
                .map(OperationOutput::Data),
            ContractOperation::Migrate {
                sender,
                contract,
                new_code_id,
                msg,
            } => keeper
                .migrate(ctx, &contract, &sender, new_code_id, &msg)
                .map(OperationOutput::Data),
            ContractOperation::UpdateAdmin {
                sender,
                contract,
                new_admin,
            } => {
                keeper.update_admin(ctx, &contract, &sender, new_admin)?;
                Ok(OperationOutput::AdminUpdated)
            }
            ContractOperation::QuerySmart { contract, msg } => keeper
                .query_smart(ctx, &contract, &msg)
                .map(OperationOutput::QueryResult),
            ContractOperation::QueryRaw { contract, key } => Ok(OperationOutput::RawValue(
                keeper.query_raw(ctx, &contract, &key),
            )),
        }
    }

    fn response(receipt: ExecutionReceipt<OperationOutput>) -> ContractResponsePayload {
        let ExecutionReceipt {
            result,
            gas_used,
            events,
        } = receipt;
        match result {
            Ok(output) => ContractResponsePayload {
                success: true,
                gas_used,
                output: Some(output),
                events,
                error: None,
            },
            Err(err) => ContractResponsePayload {
                success: false,
                gas_used,
                output: None,
                events: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

// =============================================================================
// SmartContractApi Implementation
// =============================================================================

#[async_trait]
impl SmartContractApi for ContractService {
    async fn store_code(
        &self,
        sender: Address,
        wasm_code: Vec<u8>,
        instantiate_permission: Option<AccessConfig>,
    ) -> ExecutionReceipt<(CodeId, Checksum)> {
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.create(
                ctx,
                &sender,
                &wasm_code,
                CodeProvenance::default(),
                instantiate_permission,
            )
        })
        .await
    }

    async fn instantiate(
        &self,
        sender: Address,
        code_id: CodeId,
        admin: Option<Address>,
        msg: Vec<u8>,
        label: String,
        funds: Vec<Coin>,
    ) -> ExecutionReceipt<(Address, Option<Vec<u8>>)> {
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.instantiate(ctx, code_id, &sender, admin, &msg, &label, &funds)
        })
        .await
    }

    async fn execute(
        &self,
        sender: Address,
        contract: Address,
        msg: Vec<u8>,
        funds: Vec<Coin>,
    ) -> ExecutionReceipt<Option<Vec<u8>>> {
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.execute(ctx, &contract, &sender, &msg, &funds)
        })
        .await
    }

    async fn migrate(
        &self,
        sender: Address,
        contract: Address,
        new_code_id: CodeId,
        msg: Vec<u8>,
    ) -> ExecutionReceipt<Option<Vec<u8>>> {
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.migrate(ctx, &contract, &sender, new_code_id, &msg)
        })
        .await
    }

    async fn update_admin(
        &self,
        sender: Address,
        contract: Address,
        new_admin: Option<Address>,
    ) -> ExecutionReceipt<()> {
        self.run_transaction(self.config.default_gas_limit, move |keeper, ctx| {
            keeper.update_admin(ctx, &contract, &sender, new_admin)
        })
        .await
    }

    async fn query_smart(&self, contract: Address, msg: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        self.run_read_only(move |keeper, ctx| keeper.query_smart(ctx, &contract, &msg))
            .await
    }

    async fn query_raw(&self, contract: Address, key: Vec<u8>) -> Option<Vec<u8>> {
        let mut ledger = self.ledger.write().await;
        let LedgerState {
            store,
            block,
            tx_index,
        } = &mut *ledger;
        let ctx = Context::new(store.as_mut(), block.clone(), *tx_index, 0);
        self.keeper.query_raw(&ctx, &contract, &key)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockContract, MockEngine, StoreBank};
    use crate::domain::entities::{Env, MessageInfo};
    use crate::domain::messages::Response;
    use crate::domain::value_objects::{coins, U256};
    use crate::ports::outbound::ContractHost;

    const CODE: &[u8] = b"\0asm-counter";

    struct Counter;

    impl MockContract for Counter {
        fn execute(
            &self,
            _env: &Env,
            _info: &MessageInfo,
            msg: &[u8],
            host: &mut dyn ContractHost,
        ) -> Result<Response, String> {
            if msg == b"fail" {
                host.write(b"count", b"poisoned").map_err(|e| e.to_string())?;
                return Err("asked to fail".into());
            }
            let count = host
                .read(b"count")
                .map_err(|e| e.to_string())?
                .map_or(0, |v| v[0]);
            host.write(b"count", &[count + 1]).map_err(|e| e.to_string())?;
            Ok(Response::new().add_attribute("count", (count + 1).to_string()))
        }

        fn query(&self, _env: &Env, _msg: &[u8], host: &mut dyn ContractHost) -> Result<Vec<u8>, String> {
            Ok(host.read(b"count").map_err(|e| e.to_string())?.unwrap_or_default())
        }
    }

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn create_test_service() -> (ContractService, Arc<StoreBank>) {
        let engine = Arc::new(MockEngine::new());
        engine.register(CODE, Arc::new(Counter));
        let bank = Arc::new(StoreBank::new());
        let service =
            ContractService::new(ServiceConfig::default(), engine, Arc::clone(&bank) as Arc<dyn CoinTransferrer>)
                .unwrap();
        (service, bank)
    }

    async fn deploy(service: &ContractService) -> Address {
        let (code_id, _) = service.store_code(addr(1), CODE.to_vec(), None).await.result.unwrap();
        let (address, _) = service
            .instantiate(addr(1), code_id, None, b"{}".to_vec(), "counter".into(), vec![])
            .await
            .result
            .unwrap();
        address
    }

    fn request(operation: ContractOperation) -> ContractRequestPayload {
        ContractRequestPayload {
            gas_limit: None,
            operation,
        }
    }

    #[tokio::test]
    async fn test_create_service() {
        let (service, _) = create_test_service();
        let stats = service.stats().await;
        assert_eq!(stats.transactions_executed, 0);
        assert_eq!(service.block().await.height, 1);
    }

    #[tokio::test]
    async fn test_unauthorized_sender_rejected() {
        let (service, _) = create_test_service();
        for sender in [2u8, 4, 9, 11, 15] {
            let result = service
                .handle_request(
                    sender,
                    Uuid::new_v4(),
                    request(ContractOperation::QueryRaw {
                        contract: addr(9),
                        key: vec![],
                    }),
                )
                .await;
            assert!(matches!(result, Err(IpcError::UnauthorizedSender { .. })));
        }
        assert_eq!(service.stats().await.rejected_requests, 5);
    }

    #[tokio::test]
    async fn test_authorized_senders_accepted() {
        let (service, _) = create_test_service();
        for sender in [subsystem_ids::CONSENSUS, subsystem_ids::TRANSACTION_ORDERING] {
            let response = service
                .handle_request(
                    sender,
                    Uuid::new_v4(),
                    request(ContractOperation::StoreCode {
                        sender: addr(1),
                        wasm_code: CODE.to_vec(),
                        instantiate_permission: None,
                    }),
                )
                .await
                .unwrap();
            assert!(response.success);
            assert!(response.gas_used > 0);
        }
    }

    #[tokio::test]
    async fn test_failed_transaction_is_discarded_but_charged() {
        let (service, _) = create_test_service();
        let contract = deploy(&service).await;

        let ok = service.execute(addr(2), contract, b"inc".to_vec(), vec![]).await;
        assert!(ok.is_success());

        let failed = service.execute(addr(2), contract, b"fail".to_vec(), vec![]).await;
        assert!(matches!(failed.result, Err(ContractError::ExecuteFailed(_))));
        assert!(failed.gas_used > 0);
        assert!(failed.events.is_empty());

        assert_eq!(service.query_raw(contract, b"count".to_vec()).await, Some(vec![1]));
        assert_eq!(service.query_smart(contract, vec![]).await.unwrap(), vec![1]);

        let stats = service.stats().await;
        assert_eq!(stats.failed_executions, 1);
        assert_eq!(stats.successful_executions, 3);
    }

    #[tokio::test]
    async fn test_sudo_is_in_process() {
        let (service, _) = create_test_service();
        let contract = deploy(&service).await;
        let receipt = service.sudo(contract, b"{}".to_vec()).await;
        assert!(matches!(receipt.result, Err(ContractError::ExecuteFailed(_))));
    }

    #[tokio::test]
    async fn test_genesis_mint_and_funded_instantiate() {
        let (service, bank) = create_test_service();
        service
            .genesis(|_, ctx| bank.mint(ctx, &addr(1), &coins(100, "denom")))
            .await;
        let (code_id, _) = service.store_code(addr(1), CODE.to_vec(), None).await.result.unwrap();

        let receipt = service
            .instantiate(addr(1), code_id, None, vec![], "funded".into(), coins(30, "denom"))
            .await;
        let (contract, _) = receipt.result.unwrap();

        let balance = service
            .genesis(|keeper, ctx| keeper.bank().balance(ctx, &contract, "denom"))
            .await;
        assert_eq!(balance, U256::from(30));
    }

    #[tokio::test]
    async fn test_advance_block_resets_tx_index() {
        let (service, _) = create_test_service();
        service.advance_block(5_000).await;
        let block = service.block().await;
        assert_eq!(block.height, 2);
        assert_eq!(block.time_nanos, 5_000);
    }
}
