//! # Error Types
//!
//! All error types for contract lifecycle coordination and message dispatch.

use crate::domain::value_objects::{Address, Checksum, U256};
use thiserror::Error;

// =============================================================================
// CONTRACT ERRORS
// =============================================================================

/// Errors raised by the coordinator, the registry and the host bridge.
///
/// `OutOfGas` is the only variant treated as an abort signal: it is converted
/// into a reply only at a per-submessage gas cap and otherwise unwinds to the
/// transaction boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Bytecode could not be decompressed, validated or compiled.
    #[error("create wasm contract failed: {0}")]
    CreateFailed(String),

    /// The generated contract address is already occupied.
    #[error("account already exists: {0}")]
    AccountExists(Address),

    /// The engine reported a failure during instantiation.
    #[error("instantiate wasm contract failed: {0}")]
    InstantiateFailed(String),

    /// The engine reported a failure during execute, sudo or reply.
    #[error("execute wasm contract failed: {0}")]
    ExecuteFailed(String),

    /// The engine reported a failure during migration, or the migration
    /// would drop the contract's cross-chain entry points.
    #[error("migrate wasm contract failed: {0}")]
    MigrationFailed(String),

    /// The engine reported a failure during a smart query.
    #[error("query wasm contract failed: {0}")]
    QueryFailed(String),

    /// Missing code, contract or history.
    #[error("not found: {0}")]
    NotFound(String),

    /// Inactive contract, malformed status transition or invalid input.
    #[error("invalid: {0}")]
    Invalid(String),

    /// A registry entry that must be unique already exists.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The authorization policy rejected the actor.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The gas meter was exhausted.
    #[error("out of gas in location: {descriptor}; gas limit: {limit}, consumed: {consumed}")]
    OutOfGas {
        /// What was being charged when the meter ran out.
        descriptor: String,
        /// Limit of the exhausted meter.
        limit: u64,
        /// Gas consumed on that meter.
        consumed: u64,
    },

    /// The sender cannot cover a transfer.
    #[error("insufficient funds: {address} has {available}{denom}, required {required}{denom}")]
    InsufficientFunds {
        /// Account being debited.
        address: Address,
        /// Coin denomination.
        denom: String,
        /// Amount requested.
        required: U256,
        /// Amount held.
        available: U256,
    },

    /// Registry value could not be encoded or decoded.
    #[error("registry codec error: {0}")]
    Codec(String),

    /// The contract engine failed outside of a contract call.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl ContractError {
    /// Returns true if this error is the out-of-gas abort signal.
    #[must_use]
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, Self::OutOfGas { .. })
    }

    /// Short kind label, used for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateFailed(_) => "create_failed",
            Self::AccountExists(_) => "account_exists",
            Self::InstantiateFailed(_) => "instantiate_failed",
            Self::ExecuteFailed(_) => "execute_failed",
            Self::MigrationFailed(_) => "migration_failed",
            Self::QueryFailed(_) => "query_failed",
            Self::NotFound(_) => "not_found",
            Self::Invalid(_) => "invalid",
            Self::Duplicate(_) => "duplicate",
            Self::Unauthorized(_) => "unauthorized",
            Self::OutOfGas { .. } => "out_of_gas",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Codec(_) => "codec",
            Self::Engine(_) => "engine",
        }
    }
}

impl From<bincode::Error> for ContractError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

// =============================================================================
// ENGINE ERRORS
// =============================================================================

/// Errors from contract engine calls that are not contract executions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not compile the bytecode.
    #[error("compile error: {0}")]
    Compile(String),

    /// No compiled code is cached for this checksum.
    #[error("unknown checksum: {0:?}")]
    UnknownChecksum(Checksum),

    /// Any other engine-side failure.
    #[error("vm error: {0}")]
    Vm(String),
}

// =============================================================================
// IPC ERRORS
// =============================================================================

/// Errors related to IPC communication.
#[derive(Debug, Error, Clone)]
pub enum IpcError {
    /// Message validation failed.
    #[error("message validation failed: {0}")]
    ValidationFailed(String),

    /// Unauthorized sender.
    #[error("unauthorized sender: {sender_id} not in allowed list {allowed:?}")]
    UnauthorizedSender {
        /// Subsystem id that sent the request.
        sender_id: u8,
        /// Subsystem ids allowed to send it.
        allowed: Vec<u8>,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_gas_display() {
        let err = ContractError::OutOfGas {
            descriptor: "wasm contract".to_string(),
            limit: 100,
            consumed: 120,
        };
        assert_eq!(
            err.to_string(),
            "out of gas in location: wasm contract; gas limit: 100, consumed: 120"
        );
        assert!(err.is_out_of_gas());
    }

    #[test]
    fn test_only_out_of_gas_is_abort() {
        assert!(!ContractError::Invalid("inactive".into()).is_out_of_gas());
        assert!(!ContractError::ExecuteFailed("boom".into()).is_out_of_gas());
        assert!(!ContractError::Unauthorized("no".into()).is_out_of_gas());
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: ContractError = EngineError::Compile("bad magic".into()).into();
        assert!(matches!(err, ContractError::Engine(_)));
        assert_eq!(err.kind(), "engine");
    }

    #[test]
    fn test_ipc_error_display() {
        let err = IpcError::UnauthorizedSender {
            sender_id: 5,
            allowed: vec![8, 12],
        };
        assert!(err.to_string().contains("unauthorized"));
        assert!(err.to_string().contains('5'));
    }
}
