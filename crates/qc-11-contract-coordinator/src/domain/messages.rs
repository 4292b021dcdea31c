//! # Message Kinds
//!
//! Closed sum types for everything that crosses the engine boundary:
//! outgoing messages, submessages, reply results and the engine `Response`.

use crate::domain::entities::{Attribute, Event};
use crate::domain::value_objects::{Address, Coin, CodeId};
use serde::{Deserialize, Serialize};

// =============================================================================
// OUTGOING MESSAGES
// =============================================================================

/// Message a contract asks the chain to dispatch on its behalf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CosmosMsg {
    /// Native coin operations.
    Bank(BankMsg),
    /// Calls into other contracts.
    Wasm(WasmMsg),
    /// Cross-chain packet operations, routed through the contract's port.
    Ibc(IbcMsg),
    /// Chain-specific payload handled by a pluggable messenger.
    Custom(Vec<u8>),
}

/// Bank messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankMsg {
    /// Send coins from the contract to `to_address`.
    Send {
        /// Recipient.
        to_address: Address,
        /// Coins to send.
        amount: Vec<Coin>,
    },
}

/// Contract-to-contract messages, sent with the contract as the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WasmMsg {
    /// Execute another contract.
    Execute {
        /// Target contract.
        contract_addr: Address,
        /// Execute message.
        msg: Vec<u8>,
        /// Funds to attach.
        funds: Vec<Coin>,
    },
    /// Instantiate a new contract.
    Instantiate {
        /// Admin of the new contract.
        admin: Option<Address>,
        /// Code to instantiate.
        code_id: CodeId,
        /// Init message.
        msg: Vec<u8>,
        /// Funds to attach.
        funds: Vec<Coin>,
        /// Label.
        label: String,
    },
    /// Migrate a contract this contract administers.
    Migrate {
        /// Target contract.
        contract_addr: Address,
        /// Code to migrate to.
        new_code_id: CodeId,
        /// Migrate message.
        msg: Vec<u8>,
    },
    /// Replace the admin of a contract this contract administers.
    UpdateAdmin {
        /// Target contract.
        contract_addr: Address,
        /// New admin.
        admin: Address,
    },
    /// Remove the admin of a contract this contract administers.
    ClearAdmin {
        /// Target contract.
        contract_addr: Address,
    },
}

/// Cross-chain messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IbcMsg {
    /// Send a packet over a channel bound to the contract's port.
    SendPacket {
        /// Channel.
        channel_id: String,
        /// Packet payload.
        data: Vec<u8>,
        /// Timeout height.
        timeout_height: u64,
    },
    /// Close a channel bound to the contract's port.
    CloseChannel {
        /// Channel.
        channel_id: String,
    },
}

// =============================================================================
// SUBMESSAGES & REPLIES
// =============================================================================

/// When the dispatcher calls back into the emitting contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyOn {
    /// Reply on success and on error.
    Always,
    /// Reply only on error; success continues without a callback.
    Error,
    /// Reply only on success; an error aborts the whole dispatch.
    Success,
}

/// Outgoing message that requests a reply with its outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubMsg {
    /// Identifier echoed back in the reply.
    pub id: u64,
    /// Message to dispatch.
    pub msg: CosmosMsg,
    /// Local gas cap; exceeding it becomes a caught error.
    pub gas_limit: Option<u64>,
    /// Reply policy.
    pub reply_on: ReplyOn,
}

impl SubMsg {
    /// Submessage replying on success and on error.
    #[must_use]
    pub fn reply_always(id: u64, msg: CosmosMsg) -> Self {
        Self {
            id,
            msg,
            gas_limit: None,
            reply_on: ReplyOn::Always,
        }
    }

    /// Submessage replying only on error.
    #[must_use]
    pub fn reply_on_error(id: u64, msg: CosmosMsg) -> Self {
        Self {
            reply_on: ReplyOn::Error,
            ..Self::reply_always(id, msg)
        }
    }

    /// Submessage replying only on success.
    #[must_use]
    pub fn reply_on_success(id: u64, msg: CosmosMsg) -> Self {
        Self {
            reply_on: ReplyOn::Success,
            ..Self::reply_always(id, msg)
        }
    }

    /// Caps the gas available to this submessage.
    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// Successful submessage outcome.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubcallResponse {
    /// Events emitted while dispatching the submessage.
    pub events: Vec<Event>,
    /// Data of the first dispatched message, if any.
    pub data: Option<Vec<u8>>,
}

/// Outcome of a submessage as seen by the reply entry point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubcallResult {
    /// Dispatch succeeded and its state was committed.
    Ok(SubcallResponse),
    /// Dispatch failed and its state was discarded.
    Err(String),
}

impl SubcallResult {
    /// Returns true for `Ok`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Payload of the reply entry point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Submessage id.
    pub id: u64,
    /// Outcome.
    pub result: SubcallResult,
}

// =============================================================================
// ENGINE RESPONSE
// =============================================================================

/// What a contract entry point returns.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Response {
    /// Attributes of the contract's `wasm` event.
    pub attributes: Vec<Attribute>,
    /// Custom events, emitted as `wasm-<type>`.
    pub events: Vec<Event>,
    /// Result bytes returned to the caller.
    pub data: Option<Vec<u8>>,
    /// Fire-and-forget messages.
    pub messages: Vec<CosmosMsg>,
    /// Messages that request a reply.
    pub submessages: Vec<SubMsg>,
}

impl Response {
    /// Empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    #[must_use]
    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    /// Adds a custom event.
    #[must_use]
    pub fn add_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Adds a plain message.
    #[must_use]
    pub fn add_message(mut self, msg: CosmosMsg) -> Self {
        self.messages.push(msg);
        self
    }

    /// Adds a submessage.
    #[must_use]
    pub fn add_submessage(mut self, msg: SubMsg) -> Self {
        self.submessages.push(msg);
        self
    }

    /// Sets the data bytes.
    #[must_use]
    pub fn set_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Data returned by a `WasmMsg::Instantiate` dispatched for a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantiateResponse {
    /// New contract address.
    pub address: Address,
    /// Data returned by the new contract.
    pub data: Option<Vec<u8>>,
}

/// Result of a callable point invoked through the host bridge.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallablePointResponse {
    /// Returned bytes.
    pub data: Vec<u8>,
    /// Attributes of the callee's `wasm` event.
    pub attributes: Vec<Attribute>,
    /// Custom callee events.
    pub events: Vec<Event>,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submsg_constructors() {
        let msg = CosmosMsg::Custom(vec![1]);
        assert_eq!(SubMsg::reply_always(1, msg.clone()).reply_on, ReplyOn::Always);
        assert_eq!(SubMsg::reply_on_error(2, msg.clone()).reply_on, ReplyOn::Error);
        let capped = SubMsg::reply_on_success(3, msg).with_gas_limit(500);
        assert_eq!(capped.reply_on, ReplyOn::Success);
        assert_eq!(capped.gas_limit, Some(500));
    }

    #[test]
    fn test_response_builder() {
        let response = Response::new()
            .add_attribute("action", "send")
            .add_message(CosmosMsg::Custom(vec![]))
            .set_data(b"ok".to_vec());
        assert_eq!(response.attributes.len(), 1);
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.data.as_deref(), Some(&b"ok"[..]));
    }

    #[test]
    fn test_cosmos_msg_json_shape() {
        let msg = CosmosMsg::Bank(BankMsg::Send {
            to_address: Address::new([2u8; 20]),
            amount: vec![Coin::new(15, "denom")],
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("Bank"));
        let back: CosmosMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
