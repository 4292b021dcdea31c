//! # Core Domain Entities
//!
//! Registry records (code, contracts, history), access rules and the
//! environment handed to the contract engine on every call.

use crate::domain::value_objects::{Address, Checksum, Coin, CodeId, LedgerPosition};
use serde::{Deserialize, Serialize};

// =============================================================================
// ACCESS CONFIG
// =============================================================================

/// Who may perform an access-controlled action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessType {
    /// Nobody.
    Nobody,
    /// A single address.
    OnlyAddress,
    /// Anyone.
    #[default]
    Everybody,
}

impl AccessType {
    /// Builds a concrete config, binding `OnlyAddress` to `actor`.
    #[must_use]
    pub fn with(self, actor: Address) -> AccessConfig {
        match self {
            Self::Nobody => AccessConfig::nobody(),
            Self::OnlyAddress => AccessConfig::only(actor),
            Self::Everybody => AccessConfig::everybody(),
        }
    }
}

/// Access rule consulted before upload, instantiation and status changes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Permission kind.
    pub permission: AccessType,
    /// Allowed address, set only for `OnlyAddress`.
    pub address: Option<Address>,
}

impl AccessConfig {
    /// Nobody is allowed.
    #[must_use]
    pub const fn nobody() -> Self {
        Self {
            permission: AccessType::Nobody,
            address: None,
        }
    }

    /// Everybody is allowed.
    #[must_use]
    pub const fn everybody() -> Self {
        Self {
            permission: AccessType::Everybody,
            address: None,
        }
    }

    /// Only `address` is allowed.
    #[must_use]
    pub const fn only(address: Address) -> Self {
        Self {
            permission: AccessType::OnlyAddress,
            address: Some(address),
        }
    }

    /// Returns true if `actor` passes this rule.
    #[must_use]
    pub fn allowed(&self, actor: &Address) -> bool {
        match self.permission {
            AccessType::Nobody => false,
            AccessType::OnlyAddress => self.address.as_ref() == Some(actor),
            AccessType::Everybody => true,
        }
    }

    /// Returns true if the shape is consistent: an address exactly when the
    /// permission is `OnlyAddress`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self.permission {
            AccessType::OnlyAddress => self.address.is_some(),
            AccessType::Nobody | AccessType::Everybody => self.address.is_none(),
        }
    }
}

// =============================================================================
// CODE INFO
// =============================================================================

/// Where uploaded code came from.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeProvenance {
    /// Source URL.
    pub source: String,
    /// Builder tag (e.g. an optimizer image).
    pub builder: String,
}

/// Metadata of uploaded code, keyed by its code id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    /// Checksum of the uncompressed bytecode. Immutable.
    pub code_hash: Checksum,
    /// Uploader.
    pub creator: Address,
    /// Source URL.
    pub source: String,
    /// Builder tag.
    pub builder: String,
    /// Who may instantiate this code.
    pub instantiate_config: AccessConfig,
}

impl CodeInfo {
    /// Creates a code record.
    #[must_use]
    pub fn new(
        code_hash: Checksum,
        creator: Address,
        provenance: CodeProvenance,
        instantiate_config: AccessConfig,
    ) -> Self {
        Self {
            code_hash,
            creator,
            source: provenance.source,
            builder: provenance.builder,
            instantiate_config,
        }
    }
}

// =============================================================================
// CONTRACT INFO
// =============================================================================

/// Lifecycle status of a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContractStatus {
    /// Accepts execute, migrate and sudo.
    #[default]
    Active,
    /// Rejects execute, migrate and sudo; cannot receive funds.
    Inactive,
}

impl ContractStatus {
    /// Lowercase label for events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Metadata of an instantiated contract, keyed by its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// Contract address.
    pub address: Address,
    /// Code currently backing the contract. Changes only through migration.
    pub code_id: CodeId,
    /// Instantiating account.
    pub creator: Address,
    /// Account allowed to migrate and administer the contract.
    pub admin: Option<Address>,
    /// Human label.
    pub label: String,
    /// Position of the instantiating transaction.
    pub created: Option<LedgerPosition>,
    /// Lifecycle status.
    pub status: ContractStatus,
    /// Port bound for cross-chain entry points.
    pub ibc_port_id: Option<String>,
    /// Opaque chain-specific extension.
    pub extension: Option<Vec<u8>>,
}

impl ContractInfo {
    /// Creates an active contract record.
    #[must_use]
    pub fn new(
        address: Address,
        code_id: CodeId,
        creator: Address,
        admin: Option<Address>,
        label: impl Into<String>,
        created: LedgerPosition,
    ) -> Self {
        Self {
            address,
            code_id,
            creator,
            admin,
            label: label.into(),
            created: Some(created),
            status: ContractStatus::Active,
            ibc_port_id: None,
            extension: None,
        }
    }

    /// Returns true if the contract accepts state-changing calls.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }
}

// =============================================================================
// CODE HISTORY
// =============================================================================

/// Kind of code history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryOperation {
    /// Imported at genesis.
    Genesis,
    /// Instantiated.
    Init,
    /// Migrated to a new code id.
    Migrate,
}

/// One append-only entry of a contract's code history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCodeHistoryEntry {
    /// What happened.
    pub operation: HistoryOperation,
    /// Code id in effect after this entry.
    pub code_id: CodeId,
    /// When it happened.
    pub updated: Option<LedgerPosition>,
    /// Init or migrate message.
    pub msg: Vec<u8>,
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Block information visible to contracts.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Block time in nanoseconds since the unix epoch.
    pub time_nanos: u64,
    /// Chain identifier.
    pub chain_id: String,
}

/// Environment passed to every engine call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// Current block.
    pub block: BlockInfo,
    /// Transaction index within the block.
    pub transaction_index: u64,
    /// Address of the called contract.
    pub contract: Address,
}

/// Caller information passed to instantiate and execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Direct caller.
    pub sender: Address,
    /// Funds sent along with the call, already transferred.
    pub funds: Vec<Coin>,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Key/value pair on an event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Key.
    pub key: String,
    /// Value.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Typed event with attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// Event type.
    pub ty: String,
    /// Attributes in emission order.
    pub attributes: Vec<Attribute>,
}

impl Event {
    /// Creates an event without attributes.
    #[must_use]
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    #[must_use]
    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Appends several attributes.
    #[must_use]
    pub fn add_attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// First value for `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
