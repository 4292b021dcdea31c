//! # Default Messenger
//!
//! Routes contract-emitted messages: bank sends to the bank, wasm messages
//! back into the keeper with the emitting contract as caller, cross-chain
//! packets onto the contract's port. Anything else goes to an optional
//! fallback messenger.

use crate::domain::entities::Event;
use crate::domain::messages::{BankMsg, CosmosMsg, IbcMsg, InstantiateResponse, WasmMsg};
use crate::domain::value_objects::Address;
use crate::errors::ContractError;
use crate::keeper::ContractKeeper;
use crate::ports::outbound::{CoinTransferrer, DispatchOutput, Messenger};
use crate::state::Context;
use std::sync::Arc;
use tracing::debug;

/// Message router used unless the keeper is given another one.
pub struct DefaultMessenger {
    bank: Arc<dyn CoinTransferrer>,
    fallback: Option<Arc<dyn Messenger>>,
}

impl DefaultMessenger {
    /// Creates a messenger sending coins through `bank`.
    #[must_use]
    pub fn new(bank: Arc<dyn CoinTransferrer>) -> Self {
        Self {
            bank,
            fallback: None,
        }
    }

    /// Delegates custom and cross-chain messages to `fallback`.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn Messenger>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    fn module_event(module: &str, sender: &Address) -> Event {
        Event::new("message")
            .add_attribute("module", module)
            .add_attribute("sender", sender.to_string())
    }

    fn dispatch_bank(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        msg: &BankMsg,
    ) -> Result<DispatchOutput, ContractError> {
        match msg {
            BankMsg::Send { to_address, amount } => {
                self.bank.transfer(ctx, contract, to_address, amount)?;
                Ok(DispatchOutput {
                    events: vec![Event::new("message").add_attribute("module", "bank")],
                    data: Vec::new(),
                })
            }
        }
    }

    fn dispatch_wasm(
        keeper: &ContractKeeper,
        ctx: &mut Context<'_>,
        contract: &Address,
        msg: &WasmMsg,
    ) -> Result<DispatchOutput, ContractError> {
        let data = match msg {
            WasmMsg::Execute {
                contract_addr,
                msg,
                funds,
            } => keeper.execute(ctx, contract_addr, contract, msg, funds)?,
            WasmMsg::Instantiate {
                admin,
                code_id,
                msg,
                funds,
                label,
            } => {
                let (address, data) =
                    keeper.instantiate(ctx, *code_id, contract, *admin, msg, label, funds)?;
                let encoded = serde_json::to_vec(&InstantiateResponse { address, data })
                    .map_err(|e| ContractError::Codec(e.to_string()))?;
                Some(encoded)
            }
            WasmMsg::Migrate {
                contract_addr,
                new_code_id,
                msg,
            } => keeper.migrate(ctx, contract_addr, contract, *new_code_id, msg)?,
            WasmMsg::UpdateAdmin {
                contract_addr,
                admin,
            } => {
                keeper.update_admin(ctx, contract_addr, contract, Some(*admin))?;
                None
            }
            WasmMsg::ClearAdmin { contract_addr } => {
                keeper.clear_admin(ctx, contract_addr, contract)?;
                None
            }
        };
        Ok(DispatchOutput {
            events: vec![Self::module_event("wasm", contract)],
            data: data.into_iter().collect(),
        })
    }

    fn dispatch_ibc(
        contract: &Address,
        port: Option<&str>,
        msg: &IbcMsg,
    ) -> Result<DispatchOutput, ContractError> {
        let port = port.ok_or_else(|| {
            ContractError::Invalid(format!("contract {contract} has no ibc port"))
        })?;
        let event = match msg {
            IbcMsg::SendPacket {
                channel_id,
                data,
                timeout_height,
            } => Event::new("send_packet")
                .add_attribute("packet_src_port", port)
                .add_attribute("packet_src_channel", channel_id.as_str())
                .add_attribute("packet_data_hex", hex::encode(data))
                .add_attribute("packet_timeout_height", timeout_height.to_string()),
            IbcMsg::CloseChannel { channel_id } => Event::new("channel_close_init")
                .add_attribute("port_id", port)
                .add_attribute("channel_id", channel_id.as_str()),
        };
        Ok(DispatchOutput {
            events: vec![event],
            data: Vec::new(),
        })
    }
}

impl Messenger for DefaultMessenger {
    fn dispatch_msg(
        &self,
        keeper: &ContractKeeper,
        ctx: &mut Context<'_>,
        contract: &Address,
        port: Option<&str>,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutput, ContractError> {
        debug!(%contract, ?msg, "dispatching message");
        match msg {
            CosmosMsg::Bank(bank) => self.dispatch_bank(ctx, contract, bank),
            CosmosMsg::Wasm(wasm) => Self::dispatch_wasm(keeper, ctx, contract, wasm),
            CosmosMsg::Ibc(ibc) => match &self.fallback {
                Some(fallback) => fallback.dispatch_msg(keeper, ctx, contract, port, msg),
                None => Self::dispatch_ibc(contract, port, ibc),
            },
            CosmosMsg::Custom(_) => match &self.fallback {
                Some(fallback) => fallback.dispatch_msg(keeper, ctx, contract, port, msg),
                None => Err(ContractError::Invalid(format!(
                    "no handler for custom message from {contract}"
                ))),
            },
        }
    }
}

impl std::fmt::Debug for DefaultMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultMessenger")
            .field("has_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}
