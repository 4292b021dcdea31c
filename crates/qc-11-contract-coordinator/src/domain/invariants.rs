//! # Domain Invariants
//!
//! Checks that must hold across the contract lifecycle:
//!
//! - code history is non-empty and ordered by ledger position
//! - labels are non-empty and bounded
//! - `_`-prefixed attribute keys are reserved for the coordinator
//! - status changes must actually change the status
//! - a migration may not drop cross-chain entry points

use crate::domain::entities::{Attribute, ContractCodeHistoryEntry, ContractStatus, Event};
use crate::errors::ContractError;

/// Prefix reserved for attributes the coordinator adds itself.
pub const RESERVED_ATTRIBUTE_PREFIX: char = '_';

// =============================================================================
// HISTORY
// =============================================================================

/// Returns true if `history` is non-empty and never goes back in ledger
/// position. Entries within one transaction share a position; the registry
/// keeps their order with its own counter.
#[must_use]
pub fn check_history_ordered(history: &[ContractCodeHistoryEntry]) -> bool {
    !history.is_empty()
        && history
            .windows(2)
            .all(|pair| match (pair[0].updated, pair[1].updated) {
                (Some(a), Some(b)) => a <= b,
                (None, _) => true,
                (Some(_), None) => false,
            })
}

// =============================================================================
// INPUT VALIDATION
// =============================================================================

/// Validates a contract label.
///
/// # Errors
///
/// `Invalid` for an empty, blank or oversized label.
pub fn validate_label(label: &str, max_size: usize) -> Result<(), ContractError> {
    if label.trim().is_empty() {
        return Err(ContractError::Invalid("label is empty".into()));
    }
    if label.len() > max_size {
        return Err(ContractError::Invalid(format!(
            "label exceeds {max_size} bytes"
        )));
    }
    Ok(())
}

/// Rejects empty and reserved attribute keys.
///
/// # Errors
///
/// `Invalid` naming the offending key.
pub fn validate_attribute_key(key: &str) -> Result<(), ContractError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(ContractError::Invalid("empty attribute key".into()));
    }
    if trimmed.starts_with(RESERVED_ATTRIBUTE_PREFIX) {
        return Err(ContractError::Invalid(format!(
            "attribute key {key:?} is reserved"
        )));
    }
    Ok(())
}

/// Validates every attribute key in `attributes`.
///
/// # Errors
///
/// The first `Invalid` key.
pub fn validate_attributes(attributes: &[Attribute]) -> Result<(), ContractError> {
    attributes
        .iter()
        .try_for_each(|attr| validate_attribute_key(&attr.key))
}

/// Validates a contract-emitted custom event: non-empty type, valid keys.
///
/// # Errors
///
/// `Invalid` for an empty type or a bad attribute key.
pub fn validate_custom_event(event: &Event) -> Result<(), ContractError> {
    if event.ty.trim().is_empty() {
        return Err(ContractError::Invalid("empty event type".into()));
    }
    validate_attributes(&event.attributes)
}

// =============================================================================
// STATUS
// =============================================================================

/// Checks a status change request.
///
/// # Errors
///
/// `Invalid` if `next` equals `current`.
pub fn check_status_transition(
    current: ContractStatus,
    next: ContractStatus,
) -> Result<(), ContractError> {
    if current == next {
        return Err(ContractError::Invalid(format!(
            "contract is already {}",
            current.as_str()
        )));
    }
    Ok(())
}

// =============================================================================
// PORTS
// =============================================================================

/// What a migration must do with the contract's port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortTransition {
    /// Nothing changes.
    Unchanged,
    /// The new code exposes cross-chain entry points; bind a port.
    Bind,
    /// The new code would drop cross-chain entry points of a bound port.
    Reject,
}

/// Decides the port action for a migration.
#[must_use]
pub fn check_port_compatibility(has_port: bool, new_code_has_ibc: bool) -> PortTransition {
    match (has_port, new_code_has_ibc) {
        (false, true) => PortTransition::Bind,
        (true, false) => PortTransition::Reject,
        _ => PortTransition::Unchanged,
    }
}

// =============================================================================
// TESTS
// =============================================================================
