//! # QC-11 Contract Coordinator - Contract Lifecycle & Message Dispatch
//!
//! **Subsystem ID:** 11
//!
//! ## Purpose
//!
//! Coordinates smart contract lifecycles on top of an opaque contract
//! engine: code upload, instantiation, execution, migration, privileged
//! calls and replies. Bridges host gas and engine gas, exposes the host
//! callback surface to running contracts, and dispatches the messages and
//! submessages contracts emit inside rollback-capable branches.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Code ids and instance ids are sequential from 1 | `registry.rs` - `Registry::auto_increment_id()` |
//! | Contract addresses are derived deterministically | `domain/services.rs` - `contract_address()` |
//! | History entries are ordered by ledger position | `registry.rs` - `Registry::append_history()` |
//! | Only active contracts execute or migrate | `keeper/lifecycle.rs` - `require_active()` |
//! | A failed branch leaves no state and no events | `state/context.rs` - `Context::run_in_branch()` |
//! | Out-of-gas is caught only at a submessage gas cap | `keeper/dispatcher.rs` - `dispatch_submessages()` |
//! | Reserved `_` attribute keys are rejected | `domain/invariants.rs` - `validate_attribute_key()` |
//!
//! ## Security
//!
//! | Message | Authorized Sender(s) | Enforcement |
//! |---------|---------------------|-------------|
//! | `ContractRequestPayload` | Consensus (8), Tx Ordering (12) | `service.rs` - `handle_request()` |
//! | `sudo` | in-process only | `service.rs` - `ContractService::sudo()` |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Ledger store | `KvStore` | Registry and contract state |
//! | Contract engine | `ContractEngine` | Compile and run bytecode |
//! | Bank | `CoinTransferrer` | Native coin transfers, blocked addresses |
//! | Router | `Messenger` | Contract-emitted messages |
//! | Policy | `AuthorizationPolicy` | Upload, instantiate and admin checks |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_contract_coordinator::prelude::*;
//!
//! let receipt = service.execute(sender, contract, msg, funds).await;
//! println!("gas used: {}", receipt.gas_used);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod gas;
pub mod keeper;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod service;
pub mod state;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccessConfig, AccessType, Attribute, BlockInfo, CodeInfo, CodeProvenance,
        ContractCodeHistoryEntry, ContractInfo, ContractStatus, Env, Event, HistoryOperation,
        MessageInfo,
    };

    // Messages
    pub use crate::domain::messages::{
        BankMsg, CallablePointResponse, CosmosMsg, IbcMsg, InstantiateResponse, Reply, ReplyOn,
        Response, SubMsg, SubcallResponse, SubcallResult, WasmMsg,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        coins, format_coins, Address, Checksum, CodeId, Coin, LedgerPosition, U256,
    };

    // Parameters
    pub use crate::domain::params::KeeperConfig;

    // Domain services
    pub use crate::domain::services::{checksum, contract_address, port_id_for_contract};

    // Gas
    pub use crate::gas::{GasMeter, WASM_CONTRACT_DESCRIPTOR};

    // State
    pub use crate::state::{BranchOutcome, CacheStore, Context};

    // Keeper
    pub use crate::keeper::{attributes, event_types, ContractKeeper, HostBridge};
    pub use crate::registry::Registry;

    // Ports
    pub use crate::ports::inbound::{ExecutionReceipt, SmartContractApi};
    pub use crate::ports::outbound::{
        AuthorizationPolicy, CoinTransferrer, ContractEngine, ContractHost, ContractStorage,
        DispatchOutput, EngineOutput, HostApi, KvStore, Messenger, Order, Querier,
    };

    // Events
    pub use crate::events::{
        subsystem_ids, topics, ContractOperation, ContractRequestPayload,
        ContractResponsePayload, OperationOutput,
    };

    // Errors
    pub use crate::errors::{ContractError, EngineError, IpcError};

    // Adapters
    pub use crate::adapters::{
        DefaultAuthorizationPolicy, DefaultMessenger, GovAuthorizationPolicy, MemoryStore,
        MockContract, MockEngine, StoreBank,
    };

    // Service
    pub use crate::service::{ContractService, ServiceConfig, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID for IPC.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Coordinator";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 11);
        assert_eq!(SUBSYSTEM_ID, events::subsystem_ids::CONTRACTS);
    }

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = KeeperConfig::default();
        let _ = Address::ZERO;
        let _ = GasMeter::new(1);
    }
}
