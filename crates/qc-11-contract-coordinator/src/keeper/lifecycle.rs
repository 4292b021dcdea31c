//! Lifecycle operations: upload, instantiate, execute, migrate, sudo, reply,
//! admin and status management, pinning and queries.

use super::{ContractKeeper, HostBridge};
use crate::domain::entities::{
    AccessConfig, CodeInfo, CodeProvenance, ContractCodeHistoryEntry, ContractInfo,
    ContractStatus, Env, Event, HistoryOperation, MessageInfo,
};
use crate::domain::invariants::{
    check_port_compatibility, check_status_transition, validate_label, PortTransition,
};
use crate::domain::messages::{CallablePointResponse, Reply};
use crate::domain::services::{compile_cost, contract_address, port_id_for_contract, uncompress};
use crate::domain::value_objects::{Address, Checksum, Coin, CodeId};
use crate::errors::ContractError;
use crate::gas::{charge_back, to_engine_gas};
use crate::metrics;
use crate::ports::outbound::{ContractEngine, ContractHost, EngineOutput};
use crate::registry::keys;
use crate::state::Context;
use tracing::{debug, info, warn};

/// Event types emitted by lifecycle operations.
pub mod event_types {
    /// Code upload.
    pub const STORE_CODE: &str = "store_code";
    /// Instantiation.
    pub const INSTANTIATE: &str = "instantiate";
    /// Execution.
    pub const EXECUTE: &str = "execute";
    /// Migration.
    pub const MIGRATE: &str = "migrate";
    /// Privileged call.
    pub const SUDO: &str = "sudo";
    /// Submessage reply.
    pub const REPLY: &str = "reply";
    /// Code pinned.
    pub const PIN_CODE: &str = "pin_code";
    /// Code unpinned.
    pub const UNPIN_CODE: &str = "unpin_code";
    /// Admin changed or cleared.
    pub const UPDATE_CONTRACT_ADMIN: &str = "update_contract_admin";
    /// Status changed.
    pub const UPDATE_CONTRACT_STATUS: &str = "update_contract_status";
}

/// Attribute keys set by the coordinator.
pub mod attributes {
    /// Address of the emitting contract.
    pub const CONTRACT_ADDRESS: &str = "_contract_address";
    /// Call stack of a callable point invocation.
    pub const CALLSTACK: &str = "_callstack";
    /// Code id.
    pub const CODE_ID: &str = "code_id";
    /// Code checksum.
    pub const CODE_CHECKSUM: &str = "code_checksum";
    /// New admin.
    pub const NEW_ADMIN: &str = "new_admin_address";
    /// New status.
    pub const STATUS: &str = "status";
}

/// One callable point invocation, shared by the read-only and branched paths.
struct CallablePointCall<'a> {
    callee: &'a Address,
    code: &'a CodeInfo,
    name: &'a str,
    args: &'a [u8],
    is_readonly: bool,
    call_stack: &'a [Address],
    engine_gas_limit: u64,
}

const LOAD_INSTANCE_DESCRIPTOR: &str = "Loading CosmWasm module";
const COMPILE_DESCRIPTOR: &str = "Compiling WASM Bytecode";

impl ContractKeeper {
    // =========================================================================
    // CODE
    // =========================================================================

    /// Uploads bytecode and registers it under a new code id.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the upload rule rejects `creator`, `CreateFailed` for
    /// bad bytecode, `Invalid` for a malformed instantiate permission and
    /// `OutOfGas` if the compile cost cannot be paid.
    pub fn create(
        &self,
        ctx: &mut Context<'_>,
        creator: &Address,
        wasm_code: &[u8],
        provenance: CodeProvenance,
        instantiate_permission: Option<AccessConfig>,
    ) -> Result<(CodeId, Checksum), ContractError> {
        if !self
            .authz
            .can_create_code(&self.config.code_upload_access, creator)
        {
            warn!(%creator, "code upload rejected");
            return Err(ContractError::Unauthorized(format!(
                "{creator} may not upload code"
            )));
        }

        let code = uncompress(wasm_code, self.config.max_wasm_code_size)?;
        ctx.consume_gas(
            compile_cost(code.len(), self.config.compile_cost_per_byte),
            COMPILE_DESCRIPTOR,
        )?;

        let checksum = self
            .engine
            .create(&code)
            .map_err(|e| ContractError::CreateFailed(e.to_string()))?;
        self.engine
            .analyze(&checksum)
            .map_err(|e| ContractError::CreateFailed(e.to_string()))?;

        let instantiate_config = instantiate_permission
            .unwrap_or_else(|| self.config.instantiate_default_permission.with(*creator));
        if !instantiate_config.is_well_formed() {
            return Err(ContractError::Invalid(
                "instantiate permission is malformed".into(),
            ));
        }

        let code_id = self
            .registry
            .auto_increment_id(ctx.store_mut(), keys::SEQUENCE_CODE_ID)?;
        let info = CodeInfo::new(checksum, *creator, provenance, instantiate_config);
        self.registry.store_code(ctx.store_mut(), code_id, &info)?;

        ctx.emit(
            Event::new(event_types::STORE_CODE)
                .add_attribute(attributes::CODE_CHECKSUM, checksum.to_hex())
                .add_attribute(attributes::CODE_ID, code_id.to_string()),
        );
        metrics::record_operation(event_types::STORE_CODE);
        info!(code_id, %checksum, %creator, size = code.len(), "code stored");
        Ok((code_id, checksum))
    }

    /// Pins a code in the engine cache; pinned code pays no instance cost.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown code id, `Engine` if the engine refuses.
    pub fn pin_code(&self, ctx: &mut Context<'_>, code_id: CodeId) -> Result<(), ContractError> {
        let code = self.code_info(ctx, code_id)?;
        self.engine.pin(&code.code_hash)?;
        self.registry.pin(ctx.store_mut(), code_id);
        ctx.emit(
            Event::new(event_types::PIN_CODE)
                .add_attribute(attributes::CODE_ID, code_id.to_string()),
        );
        metrics::record_operation(event_types::PIN_CODE);
        info!(code_id, "code pinned");
        Ok(())
    }

    /// Unpins a code.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown code id, `Engine` if the engine refuses.
    pub fn unpin_code(&self, ctx: &mut Context<'_>, code_id: CodeId) -> Result<(), ContractError> {
        let code = self.code_info(ctx, code_id)?;
        self.engine.unpin(&code.code_hash)?;
        self.registry.unpin(ctx.store_mut(), code_id);
        ctx.emit(
            Event::new(event_types::UNPIN_CODE)
                .add_attribute(attributes::CODE_ID, code_id.to_string()),
        );
        metrics::record_operation(event_types::UNPIN_CODE);
        info!(code_id, "code unpinned");
        Ok(())
    }

    // =========================================================================
    // INSTANTIATE / EXECUTE / MIGRATE / SUDO / REPLY
    // =========================================================================

    /// Instantiates a contract from a stored code.
    ///
    /// The contract record and its `Init` history entry are persisted before
    /// the response is dispatched, so re-entrant calls see the new contract.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `AccountExists`, `Invalid` (label),
    /// `InstantiateFailed` for an engine failure, plus dispatch errors.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        &self,
        ctx: &mut Context<'_>,
        code_id: CodeId,
        creator: &Address,
        admin: Option<Address>,
        init_msg: &[u8],
        label: &str,
        funds: &[Coin],
    ) -> Result<(Address, Option<Vec<u8>>), ContractError> {
        validate_label(label, self.config.max_label_size)?;
        let code = self.code_info(ctx, code_id)?;
        if !self
            .authz
            .can_instantiate_contract(&code.instantiate_config, creator)
        {
            warn!(code_id, %creator, "instantiation rejected");
            return Err(ContractError::Unauthorized(format!(
                "{creator} may not instantiate code {code_id}"
            )));
        }

        let instance_id = self
            .registry
            .auto_increment_id(ctx.store_mut(), keys::SEQUENCE_INSTANCE_ID)?;
        let address = contract_address(code_id, instance_id);
        if self.registry.has_contract(ctx.store(), &address) {
            return Err(ContractError::AccountExists(address));
        }

        self.charge_instance_cost(ctx, code_id)?;

        if funds.iter().all(Coin::is_zero) {
            if !self.bank.has_account(ctx, &address) {
                self.bank.create_account(ctx, &address);
            }
        } else {
            self.bank.transfer(ctx, creator, &address, funds)?;
        }

        let env = Self::env(ctx, &address);
        let info = MessageInfo {
            sender: *creator,
            funds: funds.to_vec(),
        };
        let response = self
            .invoke_engine(ctx, &address, vec![address], false, |engine, host, gas| {
                engine.instantiate(&code.code_hash, &env, &info, init_msg, host, gas)
            })?
            .map_err(ContractError::InstantiateFailed)?;

        let position = ctx.position();
        let mut contract = ContractInfo::new(address, code_id, *creator, admin, label, position);
        let report = self.engine.analyze(&code.code_hash)?;
        if report.has_ibc_entry_points {
            let port_id = port_id_for_contract(&address);
            self.registry.bind_port(ctx.store_mut(), &port_id, &address)?;
            contract.ibc_port_id = Some(port_id);
        }

        self.registry.store_contract(ctx.store_mut(), &contract)?;
        self.registry.append_history(
            ctx.store_mut(),
            &address,
            &[ContractCodeHistoryEntry {
                operation: HistoryOperation::Init,
                code_id,
                updated: Some(position),
                msg: init_msg.to_vec(),
            }],
        )?;
        self.registry
            .index_contract_by_code(ctx.store_mut(), code_id, Some(position), &address);

        ctx.emit(
            Event::new(event_types::INSTANTIATE)
                .add_attribute(attributes::CONTRACT_ADDRESS, address.to_string())
                .add_attribute(attributes::CODE_ID, code_id.to_string()),
        );
        metrics::record_operation(event_types::INSTANTIATE);
        info!(%address, code_id, label, "contract instantiated");

        let data = self.handle_contract_response(
            ctx,
            &address,
            contract.ibc_port_id.as_deref(),
            response,
        )?;
        Ok((address, data))
    }

    /// Executes an active contract.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Invalid` if inactive, `ExecuteFailed` for an engine
    /// failure, plus transfer and dispatch errors.
    pub fn execute(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
        msg: &[u8],
        funds: &[Coin],
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let (info, code) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id)?;
        Self::require_active(&info)?;

        if !funds.iter().all(Coin::is_zero) {
            self.bank.transfer(ctx, caller, contract, funds)?;
        }

        let env = Self::env(ctx, contract);
        let message_info = MessageInfo {
            sender: *caller,
            funds: funds.to_vec(),
        };
        let response = self
            .invoke_engine(ctx, contract, vec![*contract], false, |engine, host, gas| {
                engine.execute(&code.code_hash, &env, &message_info, msg, host, gas)
            })?
            .map_err(ContractError::ExecuteFailed)?;

        ctx.emit(
            Event::new(event_types::EXECUTE)
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string()),
        );
        metrics::record_operation(event_types::EXECUTE);
        debug!(%contract, %caller, "contract executed");

        self.handle_contract_response(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Migrates an active contract to a new code id.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Invalid` if inactive, `Unauthorized` if `caller` may not
    /// administer the contract, `MigrationFailed` for an engine failure or a
    /// migration that would drop cross-chain entry points.
    pub fn migrate(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
        new_code_id: CodeId,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let mut info = self.contract_info(ctx, contract)?;
        let new_code = self.code_info(ctx, new_code_id)?;
        self.charge_instance_cost(ctx, new_code_id)?;
        Self::require_active(&info)?;

        if !self.authz.can_modify_contract(info.admin.as_ref(), caller) {
            warn!(%contract, %caller, "migration rejected");
            return Err(ContractError::Unauthorized(format!(
                "{caller} may not migrate {contract}"
            )));
        }

        let report = self.engine.analyze(&new_code.code_hash)?;
        match check_port_compatibility(info.ibc_port_id.is_some(), report.has_ibc_entry_points) {
            PortTransition::Unchanged => {}
            PortTransition::Bind => {
                let port_id = port_id_for_contract(contract);
                self.registry.bind_port(ctx.store_mut(), &port_id, contract)?;
                info.ibc_port_id = Some(port_id);
            }
            PortTransition::Reject => {
                return Err(ContractError::MigrationFailed(
                    "new code drops the contract's ibc entry points".into(),
                ));
            }
        }

        let env = Self::env(ctx, contract);
        let response = self
            .invoke_engine(ctx, contract, vec![*contract], false, |engine, host, gas| {
                engine.migrate(&new_code.code_hash, &env, msg, host, gas)
            })?
            .map_err(ContractError::MigrationFailed)?;

        let position = ctx.position();
        self.registry
            .remove_contract_by_code(ctx.store_mut(), info.code_id, info.created, contract);
        let old_code_id = info.code_id;
        info.code_id = new_code_id;
        self.registry.store_contract(ctx.store_mut(), &info)?;
        self.registry.append_history(
            ctx.store_mut(),
            contract,
            &[ContractCodeHistoryEntry {
                operation: HistoryOperation::Migrate,
                code_id: new_code_id,
                updated: Some(position),
                msg: msg.to_vec(),
            }],
        )?;
        self.registry
            .index_contract_by_code(ctx.store_mut(), new_code_id, info.created, contract);

        ctx.emit(
            Event::new(event_types::MIGRATE)
                .add_attribute(attributes::CODE_ID, new_code_id.to_string())
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string()),
        );
        metrics::record_operation(event_types::MIGRATE);
        info!(%contract, old_code_id, new_code_id, "contract migrated");

        self.handle_contract_response(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Calls the privileged `sudo` entry point. No authorization check;
    /// only in-process collaborators reach this.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Invalid` if inactive, `ExecuteFailed` for an engine
    /// failure, plus dispatch errors.
    pub fn sudo(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let (info, code) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id)?;
        Self::require_active(&info)?;

        let env = Self::env(ctx, contract);
        let response = self
            .invoke_engine(ctx, contract, vec![*contract], false, |engine, host, gas| {
                engine.sudo(&code.code_hash, &env, msg, host, gas)
            })?
            .map_err(ContractError::ExecuteFailed)?;

        ctx.emit(
            Event::new(event_types::SUDO)
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string()),
        );
        metrics::record_operation(event_types::SUDO);
        debug!(%contract, "sudo executed");

        self.handle_contract_response(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Calls the reply entry point with a submessage outcome.
    pub(crate) fn reply(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        reply: &Reply,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let (info, code) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id)?;

        let env = Self::env(ctx, contract);
        let response = self
            .invoke_engine(ctx, contract, vec![*contract], false, |engine, host, gas| {
                engine.reply(&code.code_hash, &env, reply, host, gas)
            })?
            .map_err(ContractError::ExecuteFailed)?;

        ctx.emit(
            Event::new(event_types::REPLY)
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string()),
        );
        metrics::record_operation(event_types::REPLY);
        debug!(%contract, id = reply.id, ok = reply.result.is_ok(), "reply delivered");

        self.handle_contract_response(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Replaces or clears a contract's admin.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`.
    pub fn update_admin(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
        new_admin: Option<Address>,
    ) -> Result<(), ContractError> {
        let mut info = self.contract_info(ctx, contract)?;
        if !self.authz.can_modify_contract(info.admin.as_ref(), caller) {
            return Err(ContractError::Unauthorized(format!(
                "{caller} may not change the admin of {contract}"
            )));
        }
        info.admin = new_admin;
        self.registry.store_contract(ctx.store_mut(), &info)?;

        let new_admin = new_admin.map(|a| a.to_string()).unwrap_or_default();
        ctx.emit(
            Event::new(event_types::UPDATE_CONTRACT_ADMIN)
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string())
                .add_attribute(attributes::NEW_ADMIN, new_admin.clone()),
        );
        metrics::record_operation(event_types::UPDATE_CONTRACT_ADMIN);
        info!(%contract, new_admin = %new_admin, "contract admin updated");
        Ok(())
    }

    /// Removes a contract's admin, making it immutable.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`.
    pub fn clear_admin(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
    ) -> Result<(), ContractError> {
        self.update_admin(ctx, contract, caller, None)
    }

    /// Activates or deactivates a contract. An inactive contract is blocked
    /// from receiving funds.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the policy forbids status changes, `NotFound`,
    /// `Invalid` if the status does not change.
    pub fn update_contract_status(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
        status: ContractStatus,
    ) -> Result<(), ContractError> {
        if !self.authz.can_update_contract_status() {
            warn!(%contract, %caller, "status change rejected");
            return Err(ContractError::Unauthorized(format!(
                "{caller} may not change contract status"
            )));
        }
        let mut info = self.contract_info(ctx, contract)?;
        check_status_transition(info.status, status)?;

        info.status = status;
        self.registry.store_contract(ctx.store_mut(), &info)?;
        match status {
            ContractStatus::Inactive => self.bank.add_blocked_addr(ctx, contract),
            ContractStatus::Active => self.bank.delete_blocked_addr(ctx, contract),
        }

        ctx.emit(
            Event::new(event_types::UPDATE_CONTRACT_STATUS)
                .add_attribute(attributes::CONTRACT_ADDRESS, contract.to_string())
                .add_attribute(attributes::STATUS, status.as_str()),
        );
        metrics::record_operation(event_types::UPDATE_CONTRACT_STATUS);
        info!(%contract, status = status.as_str(), "contract status updated");
        Ok(())
    }

    /// Stores an opaque extension on a contract.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`.
    pub fn set_contract_extension(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        caller: &Address,
        extension: Vec<u8>,
    ) -> Result<(), ContractError> {
        let mut info = self.contract_info(ctx, contract)?;
        if !self.authz.can_modify_contract(info.admin.as_ref(), caller) {
            return Err(ContractError::Unauthorized(format!(
                "{caller} may not set the extension of {contract}"
            )));
        }
        info.extension = Some(extension);
        self.registry.store_contract(ctx.store_mut(), &info)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Read-only query of a contract. Writes are rejected by the host.
    ///
    /// # Errors
    ///
    /// `NotFound`, `QueryFailed` for an engine failure, `OutOfGas`.
    pub fn query_smart(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        msg: &[u8],
    ) -> Result<Vec<u8>, ContractError> {
        self.query_smart_from(ctx, &[], contract, msg)?
            .map_err(ContractError::QueryFailed)
    }

    /// Raw read of a contract's store.
    #[must_use]
    pub fn query_raw(&self, ctx: &Context<'_>, contract: &Address, key: &[u8]) -> Option<Vec<u8>> {
        let mut full_key = keys::contract_store(contract);
        full_key.extend_from_slice(key);
        ctx.store().get(&full_key)
    }

    /// Original bytecode of a stored code.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Engine`.
    pub fn get_byte_code(&self, ctx: &Context<'_>, code_id: CodeId) -> Result<Vec<u8>, ContractError> {
        let code = self.code_info(ctx, code_id)?;
        Ok(self.engine.get_code(&code.code_hash)?)
    }

    /// Contract metadata, if any.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn get_contract_info(
        &self,
        ctx: &Context<'_>,
        contract: &Address,
    ) -> Result<Option<ContractInfo>, ContractError> {
        self.registry.get_contract(ctx.store(), contract)
    }

    /// Code metadata, if any.
    ///
    /// # Errors
    ///
    /// `Codec` on a corrupt entry.
    pub fn get_code_info(
        &self,
        ctx: &Context<'_>,
        code_id: CodeId,
    ) -> Result<Option<CodeInfo>, ContractError> {
        self.registry.get_code(ctx.store(), code_id)
    }

    /// A contract's code history.
    ///
    /// # Errors
    ///
    /// `NotFound` if the contract has no history.
    pub fn get_contract_history(
        &self,
        ctx: &Context<'_>,
        contract: &Address,
    ) -> Result<Vec<ContractCodeHistoryEntry>, ContractError> {
        let history = self.registry.get_history(ctx.store(), contract)?;
        if history.is_empty() {
            return Err(ContractError::NotFound(format!("history of {contract}")));
        }
        Ok(history)
    }

    /// Contracts instantiated from (or migrated to) a code, in creation order.
    #[must_use]
    pub fn contracts_by_code(&self, ctx: &Context<'_>, code_id: CodeId) -> Vec<Address> {
        self.registry.contracts_by_code(ctx.store(), code_id)
    }

    /// Returns true if the code is pinned.
    #[must_use]
    pub fn is_pinned_code(&self, ctx: &Context<'_>, code_id: CodeId) -> bool {
        self.registry.is_pinned(ctx.store(), code_id)
    }

    // =========================================================================
    // NESTED CALLS (reached through the host bridge)
    // =========================================================================

    /// Smart query issued with `call_stack` already on the stack.
    pub(crate) fn query_smart_from(
        &self,
        ctx: &mut Context<'_>,
        call_stack: &[Address],
        contract: &Address,
        msg: &[u8],
    ) -> Result<Result<Vec<u8>, String>, ContractError> {
        self.check_depth(call_stack)?;
        let (info, code) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id)?;

        let env = Self::env(ctx, contract);
        let mut stack = call_stack.to_vec();
        stack.push(*contract);
        self.invoke_engine(ctx, contract, stack, true, |engine, host, gas| {
            engine.query(&code.code_hash, &env, msg, host, gas)
        })
    }

    /// Invokes a callable point of `callee`.
    ///
    /// Mutating calls run in a branch that is committed only on success and
    /// emit the callee's attributes as a `wasm` event tagged with the call
    /// stack. The inner `Err` is the callee's own failure.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn call_callable_point(
        &self,
        ctx: &mut Context<'_>,
        call_stack: &[Address],
        callee: &Address,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        engine_gas_limit: u64,
    ) -> Result<Result<Vec<u8>, String>, ContractError> {
        if call_stack.contains(callee) {
            return Err(ContractError::Invalid(format!(
                "reentrant call into {callee}"
            )));
        }
        self.check_depth(call_stack)?;

        let (info, code) = self.contract_instance(ctx, callee)?;
        self.charge_instance_cost(ctx, info.code_id)?;
        if !is_readonly {
            Self::require_active(&info)?;
        }

        let mut stack = call_stack.to_vec();
        stack.push(*callee);
        let call = CallablePointCall {
            callee,
            code: &code,
            name,
            args,
            is_readonly,
            call_stack: &stack,
            engine_gas_limit,
        };

        if is_readonly {
            return Ok(self.invoke_callable_point(ctx, &call)?.map(|response| response.data));
        }

        let remaining = ctx.gas().remaining();
        let outcome = ctx.run_in_branch(remaining, |child| {
            let response = self
                .invoke_callable_point(child, &call)?
                .map_err(ContractError::ExecuteFailed)?;
            self.emit_callable_point_events(child, callee, &stack, response)
        });
        ctx.consume_gas(outcome.gas_used, "callable point")?;
        match outcome.result {
            Ok(data) => {
                ctx.emit_events(outcome.events);
                Ok(Ok(data))
            }
            Err(ContractError::ExecuteFailed(reason)) => Ok(Err(reason)),
            Err(err) => Err(err),
        }
    }

    fn invoke_callable_point(
        &self,
        ctx: &mut Context<'_>,
        call: &CallablePointCall<'_>,
    ) -> Result<Result<CallablePointResponse, String>, ContractError> {
        let env = Self::env(ctx, call.callee);
        self.invoke_engine(
            ctx,
            call.callee,
            call.call_stack.to_vec(),
            call.is_readonly,
            |engine, host, gas| {
                engine.call_callable_point(
                    &call.code.code_hash,
                    &env,
                    call.name,
                    call.args,
                    call.is_readonly,
                    call.call_stack,
                    host,
                    gas.min(call.engine_gas_limit),
                )
            },
        )
    }

    fn emit_callable_point_events(
        &self,
        ctx: &mut Context<'_>,
        callee: &Address,
        call_stack: &[Address],
        response: CallablePointResponse,
    ) -> Result<Vec<u8>, ContractError> {
        let stack: Vec<String> = call_stack.iter().map(ToString::to_string).collect();
        let stack_json =
            serde_json::to_string(&stack).map_err(|e| ContractError::Codec(e.to_string()))?;
        self.emit_contract_events(ctx, callee, response.attributes, response.events, |event| {
            event.add_attribute(attributes::CALLSTACK, stack_json.clone())
        })?;
        Ok(response.data)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    pub(crate) fn env(ctx: &Context<'_>, contract: &Address) -> Env {
        Env {
            block: ctx.block().clone(),
            transaction_index: ctx.tx_index(),
            contract: *contract,
        }
    }

    fn code_info(&self, ctx: &Context<'_>, code_id: CodeId) -> Result<CodeInfo, ContractError> {
        self.registry
            .get_code(ctx.store(), code_id)?
            .ok_or_else(|| ContractError::NotFound(format!("code {code_id}")))
    }

    fn contract_info(
        &self,
        ctx: &Context<'_>,
        contract: &Address,
    ) -> Result<ContractInfo, ContractError> {
        self.registry
            .get_contract(ctx.store(), contract)?
            .ok_or_else(|| ContractError::NotFound(format!("contract {contract}")))
    }

    /// Contract and code metadata; both must exist.
    pub(crate) fn contract_instance(
        &self,
        ctx: &Context<'_>,
        contract: &Address,
    ) -> Result<(ContractInfo, CodeInfo), ContractError> {
        let info = self.contract_info(ctx, contract)?;
        let code = self.code_info(ctx, info.code_id)?;
        Ok((info, code))
    }

    fn require_active(info: &ContractInfo) -> Result<(), ContractError> {
        if info.is_active() {
            Ok(())
        } else {
            Err(ContractError::Invalid(format!(
                "contract {} is inactive",
                info.address
            )))
        }
    }

    fn check_depth(&self, call_stack: &[Address]) -> Result<(), ContractError> {
        if call_stack.len() >= self.config.max_call_depth {
            return Err(ContractError::Invalid(format!(
                "call depth exceeds {}",
                self.config.max_call_depth
            )));
        }
        Ok(())
    }

    pub(crate) fn charge_instance_cost(
        &self,
        ctx: &mut Context<'_>,
        code_id: CodeId,
    ) -> Result<(), ContractError> {
        if self.registry.is_pinned(ctx.store(), code_id) {
            return Ok(());
        }
        ctx.consume_gas(self.config.instance_cost, LOAD_INSTANCE_DESCRIPTOR)
    }

    /// Runs one engine call behind a fresh host bridge and charges the
    /// reported gas back to `ctx`.
    ///
    /// An abort recorded by the bridge wins over whatever the engine
    /// returned. The inner `Err` is the contract's own failure text.
    pub(crate) fn invoke_engine<T, F>(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        call_stack: Vec<Address>,
        read_only: bool,
        call: F,
    ) -> Result<Result<T, String>, ContractError>
    where
        F: FnOnce(&dyn ContractEngine, &mut dyn ContractHost, u64) -> EngineOutput<T>,
    {
        let gas_limit = to_engine_gas(ctx.gas().remaining(), self.config.gas_multiplier);
        let (output, abort) = {
            let mut host = HostBridge::new(self, ctx, *contract, call_stack, read_only);
            let output = call(self.engine.as_ref(), &mut host, gas_limit);
            (output, host.into_abort())
        };
        // Engine gas is owed even when the host aborted the call.
        let charged = charge_back(ctx.gas_mut(), output.gas_used, self.config.gas_multiplier);
        if let Some(err) = abort {
            if err.is_out_of_gas() || charged.is_err() {
                metrics::record_out_of_gas();
            }
            warn!(%contract, error = %err, "engine call aborted by host");
            return Err(err);
        }

        let charged = charged.inspect_err(|_| metrics::record_out_of_gas())?;
        metrics::record_gas_used(charged);
        debug!(%contract, engine_gas = output.gas_used, host_gas = charged, "engine gas charged");
        Ok(output.outcome)
    }
}
