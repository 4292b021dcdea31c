//! # Registry
//!
//! Durable mapping from code id to code metadata and from contract address
//! to contract metadata, history and indexes, stored in the ledger store
//! under one-byte key prefixes with bincode values.
//!
//! Reads of missing keys return `None`; only a corrupt value is an error.

use crate::domain::entities::{CodeInfo, ContractCodeHistoryEntry, ContractInfo};
use crate::domain::invariants::check_history_ordered;
use crate::domain::value_objects::{Address, CodeId, LedgerPosition};
use crate::errors::ContractError;
use crate::ports::outbound::{KvStore, Order};
use serde::de::DeserializeOwned;
use serde::Serialize;

// =============================================================================
// KEY LAYOUT
// =============================================================================

/// Key prefixes.
pub mod keys {
    use crate::domain::value_objects::{Address, CodeId, LedgerPosition};

    /// Code id -> `CodeInfo`.
    pub const CODE_PREFIX: u8 = 0x01;
    /// Address -> `ContractInfo`.
    pub const CONTRACT_PREFIX: u8 = 0x02;
    /// Address ++ key -> contract storage.
    pub const CONTRACT_STORE_PREFIX: u8 = 0x03;
    /// Sequence name -> next value.
    pub const SEQUENCE_PREFIX: u8 = 0x04;
    /// Address ++ counter -> history entry.
    pub const HISTORY_PREFIX: u8 = 0x05;
    /// Code id ++ created ++ address -> empty.
    pub const CONTRACT_BY_CODE_PREFIX: u8 = 0x06;
    /// Code id -> pinned marker.
    pub const PINNED_PREFIX: u8 = 0x07;
    /// Port id -> owning address.
    pub const PORT_PREFIX: u8 = 0x08;

    /// Sequence of code ids.
    pub const SEQUENCE_CODE_ID: &[u8] = b"lastCodeId";
    /// Global sequence of contract instances.
    pub const SEQUENCE_INSTANCE_ID: &[u8] = b"lastContractId";

    fn with_prefix(prefix: u8, parts: &[&[u8]]) -> Vec<u8> {
        let len = 1 + parts.iter().map(|p| p.len()).sum::<usize>();
        let mut key = Vec::with_capacity(len);
        key.push(prefix);
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    /// Code key.
    #[must_use]
    pub fn code(code_id: CodeId) -> Vec<u8> {
        with_prefix(CODE_PREFIX, &[&code_id.to_be_bytes()[..]])
    }

    /// Contract key.
    #[must_use]
    pub fn contract(address: &Address) -> Vec<u8> {
        with_prefix(CONTRACT_PREFIX, &[&address.as_bytes()[..]])
    }

    /// Prefix of a contract's own storage.
    #[must_use]
    pub fn contract_store(address: &Address) -> Vec<u8> {
        with_prefix(CONTRACT_STORE_PREFIX, &[&address.as_bytes()[..]])
    }

    /// Sequence key.
    #[must_use]
    pub fn sequence(name: &[u8]) -> Vec<u8> {
        with_prefix(SEQUENCE_PREFIX, &[name])
    }

    /// Prefix of a contract's history.
    #[must_use]
    pub fn history_prefix(address: &Address) -> Vec<u8> {
        with_prefix(HISTORY_PREFIX, &[&address.as_bytes()[..]])
    }

    /// History entry key.
    #[must_use]
    pub fn history(address: &Address, counter: u64) -> Vec<u8> {
        with_prefix(HISTORY_PREFIX, &[&address.as_bytes()[..], &counter.to_be_bytes()[..]])
    }

    /// Prefix of the contracts instantiated from a code.
    #[must_use]
    pub fn contract_by_code_prefix(code_id: CodeId) -> Vec<u8> {
        with_prefix(CONTRACT_BY_CODE_PREFIX, &[&code_id.to_be_bytes()[..]])
    }

    /// Contract-by-code index key.
    #[must_use]
    pub fn contract_by_code(
        code_id: CodeId,
        created: Option<LedgerPosition>,
        address: &Address,
    ) -> Vec<u8> {
        let created = created.unwrap_or_default().to_key_bytes();
        with_prefix(
            CONTRACT_BY_CODE_PREFIX,
            &[&code_id.to_be_bytes()[..], &created[..], &address.as_bytes()[..]],
        )
    }

    /// Pinned marker key.
    #[must_use]
    pub fn pinned(code_id: CodeId) -> Vec<u8> {
        with_prefix(PINNED_PREFIX, &[&code_id.to_be_bytes()[..]])
    }

    /// Port binding key.
    #[must_use]
    pub fn port(port_id: &str) -> Vec<u8> {
        with_prefix(PORT_PREFIX, &[port_id.as_bytes()])
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Registry of codes, contracts and their indexes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Registry;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ContractError> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ContractError> {
    Ok(bincode::deserialize(bytes)?)
}

fn read<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>, ContractError> {
    store.get(key).map(|bytes| decode(&bytes)).transpose()
}

impl Registry {
    /// Creates a registry handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // -------------------------------------------------------------------------
    // Sequences
    // -------------------------------------------------------------------------

    /// Returns the next value of a sequence and advances it. Starts at 1.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt counter.
    pub fn auto_increment_id(
        &self,
        store: &mut dyn KvStore,
        name: &[u8],
    ) -> Result<u64, ContractError> {
        let id = self.peek_auto_increment_id(store, name)?;
        store.set(&keys::sequence(name), &(id + 1).to_be_bytes());
        Ok(id)
    }

    /// Returns the next value of a sequence without advancing it.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt counter.
    pub fn peek_auto_increment_id(
        &self,
        store: &dyn KvStore,
        name: &[u8],
    ) -> Result<u64, ContractError> {
        match store.get(&keys::sequence(name)) {
            None => Ok(1),
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    ContractError::Codec(format!("sequence {} is corrupt", hex::encode(name)))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Codes
    // -------------------------------------------------------------------------

    /// Stores code metadata under a fresh code id.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the id is taken.
    pub fn store_code(
        &self,
        store: &mut dyn KvStore,
        code_id: CodeId,
        info: &CodeInfo,
    ) -> Result<(), ContractError> {
        let key = keys::code(code_id);
        if store.has(&key) {
            return Err(ContractError::Duplicate(format!("code id {code_id}")));
        }
        store.set(&key, &encode(info)?);
        Ok(())
    }

    /// Code metadata.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn get_code(
        &self,
        store: &dyn KvStore,
        code_id: CodeId,
    ) -> Result<Option<CodeInfo>, ContractError> {
        read(store, &keys::code(code_id))
    }

    /// All codes in id order.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn iterate_codes(
        &self,
        store: &dyn KvStore,
    ) -> Result<Vec<(CodeId, CodeInfo)>, ContractError> {
        store
            .prefix_range(&[keys::CODE_PREFIX], Order::Ascending)
            .into_iter()
            .map(|(key, value)| {
                let id_bytes: [u8; 8] = key[1..]
                    .try_into()
                    .map_err(|_| ContractError::Codec("code key is corrupt".into()))?;
                Ok((u64::from_be_bytes(id_bytes), decode(&value)?))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Contracts
    // -------------------------------------------------------------------------

    /// Writes contract metadata, replacing any previous value.
    ///
    /// # Errors
    ///
    /// `Codec` if encoding fails.
    pub fn store_contract(
        &self,
        store: &mut dyn KvStore,
        info: &ContractInfo,
    ) -> Result<(), ContractError> {
        store.set(&keys::contract(&info.address), &encode(info)?);
        Ok(())
    }

    /// Contract metadata.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn get_contract(
        &self,
        store: &dyn KvStore,
        address: &Address,
    ) -> Result<Option<ContractInfo>, ContractError> {
        read(store, &keys::contract(address))
    }

    /// Returns true if a contract lives at `address`.
    #[must_use]
    pub fn has_contract(&self, store: &dyn KvStore, address: &Address) -> bool {
        store.has(&keys::contract(address))
    }

    /// All contracts in address order.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn iterate_contracts(
        &self,
        store: &dyn KvStore,
    ) -> Result<Vec<ContractInfo>, ContractError> {
        store
            .prefix_range(&[keys::CONTRACT_PREFIX], Order::Ascending)
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Appends entries to a contract's code history.
    ///
    /// # Errors
    ///
    /// `Codec` if encoding fails or if the entries would move the history
    /// back in ledger position.
    pub fn append_history(
        &self,
        store: &mut dyn KvStore,
        address: &Address,
        entries: &[ContractCodeHistoryEntry],
    ) -> Result<(), ContractError> {
        let existing = store.prefix_range(&keys::history_prefix(address), Order::Ascending);
        let mut tail = match existing.last() {
            Some((_, value)) => vec![decode::<ContractCodeHistoryEntry>(value)?],
            None => Vec::new(),
        };
        tail.extend_from_slice(entries);
        if !entries.is_empty() && !check_history_ordered(&tail) {
            return Err(ContractError::Codec(format!(
                "history of {address} would go back in ledger position"
            )));
        }

        let mut counter = existing.len() as u64;
        for entry in entries {
            store.set(&keys::history(address, counter), &encode(entry)?);
            counter += 1;
        }
        Ok(())
    }

    /// A contract's code history in append order.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn get_history(
        &self,
        store: &dyn KvStore,
        address: &Address,
    ) -> Result<Vec<ContractCodeHistoryEntry>, ContractError> {
        store
            .prefix_range(&keys::history_prefix(address), Order::Ascending)
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Contract-by-code index
    // -------------------------------------------------------------------------

    /// Adds a contract to its code's index.
    pub fn index_contract_by_code(
        &self,
        store: &mut dyn KvStore,
        code_id: CodeId,
        created: Option<LedgerPosition>,
        address: &Address,
    ) {
        store.set(&keys::contract_by_code(code_id, created, address), &[]);
    }

    /// Removes a contract from its code's index.
    pub fn remove_contract_by_code(
        &self,
        store: &mut dyn KvStore,
        code_id: CodeId,
        created: Option<LedgerPosition>,
        address: &Address,
    ) {
        store.delete(&keys::contract_by_code(code_id, created, address));
    }

    /// Contracts of a code in creation order.
    #[must_use]
    pub fn contracts_by_code(&self, store: &dyn KvStore, code_id: CodeId) -> Vec<Address> {
        store
            .prefix_range(&keys::contract_by_code_prefix(code_id), Order::Ascending)
            .into_iter()
            .filter_map(|(key, _)| Address::from_slice(&key[key.len() - Address::LEN..]))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Pinning
    // -------------------------------------------------------------------------

    /// Marks a code as pinned. Idempotent.
    pub fn pin(&self, store: &mut dyn KvStore, code_id: CodeId) {
        store.set(&keys::pinned(code_id), &[1]);
    }

    /// Clears the pinned marker. Idempotent.
    pub fn unpin(&self, store: &mut dyn KvStore, code_id: CodeId) {
        store.delete(&keys::pinned(code_id));
    }

    /// Returns true if the code is pinned.
    #[must_use]
    pub fn is_pinned(&self, store: &dyn KvStore, code_id: CodeId) -> bool {
        store.has(&keys::pinned(code_id))
    }

    // -------------------------------------------------------------------------
    // Ports
    // -------------------------------------------------------------------------

    /// Binds a port to a contract.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the port is already bound.
    pub fn bind_port(
        &self,
        store: &mut dyn KvStore,
        port_id: &str,
        address: &Address,
    ) -> Result<(), ContractError> {
        let key = keys::port(port_id);
        if store.has(&key) {
            return Err(ContractError::Duplicate(format!("port {port_id}")));
        }
        store.set(&key, address.as_bytes());
        Ok(())
    }

    /// Contract bound to a port.
    #[must_use]
    pub fn port_owner(&self, store: &dyn KvStore, port_id: &str) -> Option<Address> {
        store
            .get(&keys::port(port_id))
            .and_then(|bytes| Address::from_slice(&bytes))
    }
}

// =============================================================================
// TESTS
// =============================================================================
