//! # Event Schema (IPC Payloads)
//!
//! Request and response payloads for the contract coordinator. Payloads
//! carry no requester identity; the sender comes from the envelope and is
//! validated by the service.
//!
//! ## Authorized Senders
//!
//! | Message Type | Authorized Sender(s) |
//! |--------------|---------------------|
//! | `ContractRequestPayload` | Subsystems 8, 12 ONLY |

use crate::domain::entities::{AccessConfig, Event};
use crate::domain::value_objects::{Address, Checksum, Coin, CodeId};
use serde::{Deserialize, Serialize};

// =============================================================================
// INBOUND
// =============================================================================

/// One state-changing or read-only contract operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractOperation {
    /// Upload bytecode.
    StoreCode {
        /// Uploader.
        sender: Address,
        /// Raw or gzip-compressed bytecode.
        wasm_code: Vec<u8>,
        /// Instantiate permission; the keeper default when absent.
        instantiate_permission: Option<AccessConfig>,
    },
    /// Instantiate a stored code.
    Instantiate {
        /// Creator.
        sender: Address,
        /// Code to instantiate.
        code_id: CodeId,
        /// Admin of the new contract.
        admin: Option<Address>,
        /// Init message.
        msg: Vec<u8>,
        /// Label.
        label: String,
        /// Funds sent with the call.
        funds: Vec<Coin>,
    },
    /// Execute a contract.
    Execute {
        /// Caller.
        sender: Address,
        /// Target contract.
        contract: Address,
        /// Execute message.
        msg: Vec<u8>,
        /// Funds sent with the call.
        funds: Vec<Coin>,
    },
    /// Migrate a contract.
    Migrate {
        /// Caller; must be the admin.
        sender: Address,
        /// Target contract.
        contract: Address,
        /// New code.
        new_code_id: CodeId,
        /// Migrate message.
        msg: Vec<u8>,
    },
    /// Replace (`Some`) or clear (`None`) a contract's admin.
    UpdateAdmin {
        /// Caller; must be the admin.
        sender: Address,
        /// Target contract.
        contract: Address,
        /// New admin.
        new_admin: Option<Address>,
    },
    /// Smart query.
    QuerySmart {
        /// Target contract.
        contract: Address,
        /// Query message.
        msg: Vec<u8>,
    },
    /// Raw store read.
    QueryRaw {
        /// Target contract.
        contract: Address,
        /// Key within the contract's store.
        key: Vec<u8>,
    },
}

/// Request to run one contract operation as a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRequestPayload {
    /// Gas limit; the service default when absent.
    pub gas_limit: Option<u64>,
    /// Operation to run.
    pub operation: ContractOperation,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// What a successful operation returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutput {
    /// Code stored.
    CodeStored {
        /// New code id.
        code_id: CodeId,
        /// Checksum of the uncompressed code.
        checksum: Checksum,
    },
    /// Contract instantiated.
    Instantiated {
        /// New contract address.
        address: Address,
        /// Returned data.
        data: Option<Vec<u8>>,
    },
    /// Execute or migrate data.
    Data(Option<Vec<u8>>),
    /// Admin updated.
    AdminUpdated,
    /// Smart query result.
    QueryResult(Vec<u8>),
    /// Raw store value.
    RawValue(Option<Vec<u8>>),
}

/// Response to a contract request. Gas is reported on failure too.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResponsePayload {
    /// Whether the operation committed.
    pub success: bool,
    /// Gas used.
    pub gas_used: u64,
    /// Output, on success.
    pub output: Option<OperationOutput>,
    /// Events of the committed transaction.
    pub events: Vec<Event>,
    /// Failure reason.
    pub error: Option<String>,
}

// =============================================================================
// EVENT BUS TOPICS
// =============================================================================

/// Event topics for the contract coordinator.
pub mod topics {
    /// Topic for receiving contract requests.
    pub const CONTRACT_REQUEST: &str = "contracts.request";

    /// Topic for publishing contract responses.
    pub const CONTRACT_RESPONSE: &str = "contracts.response";

    /// Dead letter queue for failed requests.
    pub const DLQ: &str = "dlq.contracts";
}

// =============================================================================
// SUBSYSTEM ID VALIDATION
// =============================================================================

/// Subsystem IDs for validation.
pub mod subsystem_ids {
    /// Consensus.
    pub const CONSENSUS: u8 = 8;

    /// Transaction Ordering.
    pub const TRANSACTION_ORDERING: u8 = 12;

    /// This subsystem.
    pub const CONTRACTS: u8 = 11;

    /// Validates that sender is authorized for `ContractRequestPayload`.
    #[must_use]
    pub fn is_authorized_request_sender(sender_id: u8) -> bool {
        sender_id == CONSENSUS || sender_id == TRANSACTION_ORDERING
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::coins;

    #[test]
    fn test_subsystem_id_validation() {
        assert!(subsystem_ids::is_authorized_request_sender(8));
        assert!(subsystem_ids::is_authorized_request_sender(12));
        assert!(!subsystem_ids::is_authorized_request_sender(11));
        assert!(!subsystem_ids::is_authorized_request_sender(15));
    }

    #[test]
    fn test_request_payload_json() {
        let payload = ContractRequestPayload {
            gas_limit: Some(500_000),
            operation: ContractOperation::Execute {
                sender: Address::new([1; 20]),
                contract: Address::new([2; 20]),
                msg: b"{}".to_vec(),
                funds: coins(5, "denom"),
            },
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("Execute"));
        let back: ContractRequestPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
