//! Response handling and message dispatch.
//!
//! Submessages run first, each in its own branch; plain messages follow in
//! order on the current context. A failing plain message aborts the call.

use super::lifecycle::attributes;
use super::ContractKeeper;
use crate::domain::entities::{Attribute, Event};
use crate::domain::invariants::{validate_attributes, validate_custom_event};
use crate::domain::messages::{
    CosmosMsg, Reply, ReplyOn, Response, SubMsg, SubcallResponse, SubcallResult,
};
use crate::domain::value_objects::Address;
use crate::errors::ContractError;
use crate::metrics;
use crate::state::Context;
use tracing::{debug, warn};

const SUBMESSAGE_DESCRIPTOR: &str = "submessage";

impl ContractKeeper {
    /// Emits the contract's events, dispatches its submessages and messages
    /// and returns the resulting data.
    ///
    /// Data produced by a reply overrides the contract's own `data`.
    pub(crate) fn handle_contract_response(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        port: Option<&str>,
        response: Response,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let Response {
            attributes,
            events,
            data,
            messages,
            submessages,
        } = response;

        self.emit_contract_events(ctx, contract, attributes, events, |event| event)?;
        let sub_data = self.dispatch_submessages(ctx, contract, port, submessages)?;
        self.dispatch_messages(ctx, contract, port, &messages)?;
        Ok(sub_data.or(data))
    }

    /// Emits a contract's attributes as one `wasm` event and its custom
    /// events as `wasm-<type>`, each tagged with the contract address.
    /// `decorate` is applied to the `wasm` event.
    pub(crate) fn emit_contract_events(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        attrs: Vec<Attribute>,
        events: Vec<Event>,
        decorate: impl FnOnce(Event) -> Event,
    ) -> Result<(), ContractError> {
        validate_attributes(&attrs)?;
        for event in &events {
            validate_custom_event(event)?;
        }

        if !attrs.is_empty() {
            let event = Event::new("wasm")
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string())
                .add_attributes(attrs);
            ctx.emit(decorate(event));
        }
        for event in events {
            ctx.emit(
                Event::new(format!("wasm-{}", event.ty.trim()))
                    .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string())
                    .add_attributes(event.attributes),
            );
        }
        Ok(())
    }

    /// Dispatches plain messages in order on the current context.
    ///
    /// # Errors
    ///
    /// The first failing message's error.
    pub fn dispatch_messages(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        port: Option<&str>,
        messages: &[CosmosMsg],
    ) -> Result<(), ContractError> {
        for msg in messages {
            let output = self
                .messenger
                .dispatch_msg(self, ctx, contract, port, msg)?;
            ctx.emit_events(output.events);
        }
        Ok(())
    }

    /// Dispatches submessages and delivers replies.
    ///
    /// Each submessage runs in a branch committed only on success. A gas
    /// limit below the remaining gas turns out-of-gas into an ordinary
    /// failure of that submessage; the gas spent is charged either way.
    ///
    /// # Errors
    ///
    /// A failure under `ReplyOn::Success`, an uncapped out-of-gas, or any
    /// error of a reply call.
    pub fn dispatch_submessages(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        port: Option<&str>,
        submessages: Vec<SubMsg>,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let mut data: Option<Vec<u8>> = None;

        for sub in submessages {
            let remaining = ctx.gas().remaining();
            let (limit, capped) = match sub.gas_limit {
                Some(limit) if limit < remaining => (limit, true),
                _ => (remaining, false),
            };
            debug!(%contract, id = sub.id, limit, capped, reply_on = ?sub.reply_on, "dispatching submessage");

            let outcome = ctx.run_in_branch(limit, |child| {
                let output = self
                    .messenger
                    .dispatch_msg(self, child, contract, port, &sub.msg)?;
                child.emit_events(output.events);
                Ok(output.data)
            });
            ctx.consume_gas(outcome.gas_used, SUBMESSAGE_DESCRIPTOR)?;

            let result = match outcome.result {
                Ok(msg_data) => {
                    metrics::record_submessage("ok");
                    ctx.emit_events(outcome.events.iter().cloned());
                    Ok(SubcallResponse {
                        events: outcome.events,
                        data: msg_data.into_iter().next(),
                    })
                }
                Err(err) if err.is_out_of_gas() && !capped => {
                    metrics::record_submessage("out_of_gas");
                    return Err(err);
                }
                Err(err) => {
                    metrics::record_submessage("err");
                    warn!(%contract, id = sub.id, error = %err, "submessage rolled back");
                    Err(err)
                }
            };

            let result = match (sub.reply_on, result) {
                (ReplyOn::Success, Err(err)) => return Err(err),
                (ReplyOn::Error, Ok(_)) => continue,
                (_, Ok(response)) => SubcallResult::Ok(response),
                (_, Err(err)) => SubcallResult::Err(err.to_string()),
            };

            let reply = Reply {
                id: sub.id,
                result,
            };
            if let Some(reply_data) = self.reply(ctx, contract, &reply)? {
                data = Some(reply_data);
            }
        }

        Ok(data)
    }
}
