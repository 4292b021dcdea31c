//! Shared fixtures: a scripted contract driven by JSON instructions, a
//! keeper wired to the in-memory engine and bank, and small helpers.

#![allow(dead_code)]

use qc_11_contract_coordinator::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SCRIPTED_CODE: &[u8] = b"\0asm scripted v1";
pub const SCRIPTED_CODE_V2: &[u8] = b"\0asm scripted v2";
pub const IBC_CODE: &[u8] = b"\0asm scripted ibc";

pub const GAS: u64 = 10_000_000;
pub const DENOM: &str = "denom";

pub fn addr(n: u8) -> Address {
    Address::new([n; 20])
}

pub const CREATOR: Address = Address::new([1; 20]);

// =============================================================================
// SCRIPT
// =============================================================================

/// Callable point invocation made by a script.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CallSpec {
    pub contract: Address,
    pub name: String,
    pub args: Vec<u8>,
    pub is_readonly: bool,
    /// Record a callee failure under `call_error` instead of failing.
    pub tolerate_failure: bool,
}

/// What a scripted entry point does, in order: writes, burn, call, query,
/// interface check, fail, respond.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Script {
    pub writes: Vec<(Vec<u8>, Vec<u8>)>,
    pub burn: bool,
    pub call: Option<CallSpec>,
    pub query: Option<(Address, Vec<u8>)>,
    pub validate: Option<(Address, Vec<String>)>,
    pub fail: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub events: Vec<Event>,
    pub messages: Vec<CosmosMsg>,
    pub submessages: Vec<SubMsg>,
    pub data: Option<Vec<u8>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(mut self, key: &[u8], value: &[u8]) -> Self {
        self.writes.push((key.to_vec(), value.to_vec()));
        self
    }

    pub fn attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn message(mut self, msg: CosmosMsg) -> Self {
        self.messages.push(msg);
        self
    }

    pub fn submessage(mut self, msg: SubMsg) -> Self {
        self.submessages.push(msg);
        self
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = Some(data.to_vec());
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.fail = Some(reason.to_string());
        self
    }

    pub fn burn(mut self) -> Self {
        self.burn = true;
        self
    }

    pub fn call(mut self, spec: CallSpec) -> Self {
        self.call = Some(spec);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("script encodes")
    }
}

pub fn reply_key(id: u64) -> Vec<u8> {
    format!("reply:{id}").into_bytes()
}

fn err(e: ContractError) -> String {
    e.to_string()
}

/// Contract whose behaviour is the [`Script`] it receives.
///
/// - `reply` stores the reply under `reply:<id>` and sets data
///   `reply-<id>` for ids of 100 and above
/// - `query` returns the raw value stored under the message bytes
/// - callable points: `echo`, `store`, `fail`, `recurse`
pub struct ScriptedContract {
    pub ibc: bool,
}

impl ScriptedContract {
    fn run(&self, msg: &[u8], host: &mut dyn ContractHost) -> Result<Response, String> {
        if msg.is_empty() {
            return Ok(Response::new());
        }
        let script: Script = serde_json::from_slice(msg).map_err(|e| e.to_string())?;

        for (key, value) in &script.writes {
            host.write(key, value).map_err(err)?;
        }
        if script.burn {
            let mut i: u64 = 0;
            loop {
                host.write(&i.to_be_bytes(), &[0xab; 64]).map_err(err)?;
                i += 1;
            }
        }

        let mut data = script.data.clone();
        if let Some(call) = &script.call {
            match host.call_callable_point(
                &call.contract,
                &call.name,
                &call.args,
                call.is_readonly,
                u64::MAX,
            ) {
                Ok(returned) => data = Some(returned),
                Err(e) if call.tolerate_failure => {
                    host.write(b"call_error", e.to_string().as_bytes()).map_err(err)?;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
        if let Some((contract, key)) = &script.query {
            data = Some(host.query_smart(contract, key).map_err(err)?);
        }
        if let Some((contract, names)) = &script.validate {
            let expected = serde_json::to_vec(names).map_err(|e| e.to_string())?;
            let missing = host.validate_interface(contract, &expected).map_err(err)?;
            data = Some(missing.unwrap_or_else(|| "ok".into()).into_bytes());
        }
        if let Some(reason) = script.fail {
            return Err(reason);
        }

        let mut response = Response::new();
        for (key, value) in script.attributes {
            response = response.add_attribute(key, value);
        }
        for event in script.events {
            response = response.add_event(event);
        }
        for msg in script.messages {
            response = response.add_message(msg);
        }
        for sub in script.submessages {
            response = response.add_submessage(sub);
        }
        if let Some(data) = data {
            response = response.set_data(data);
        }
        Ok(response)
    }
}

impl MockContract for ScriptedContract {
    fn instantiate(
        &self,
        _env: &Env,
        _info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
    ) -> Result<Response, String> {
        self.run(msg, host)
    }

    fn execute(
        &self,
        _env: &Env,
        _info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
    ) -> Result<Response, String> {
        self.run(msg, host)
    }

    fn migrate(&self, _env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Response, String> {
        self.run(msg, host)
    }

    fn sudo(&self, _env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Response, String> {
        self.run(msg, host)
    }

    fn reply(&self, _env: &Env, reply: &Reply, host: &mut dyn ContractHost) -> Result<Response, String> {
        let encoded = serde_json::to_vec(reply).map_err(|e| e.to_string())?;
        host.write(&reply_key(reply.id), &encoded).map_err(err)?;
        let mut response = Response::new();
        if reply.id >= 100 {
            response = response.set_data(format!("reply-{}", reply.id).into_bytes());
        }
        Ok(response)
    }

    fn query(&self, _env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Vec<u8>, String> {
        Ok(host.read(msg).map_err(err)?.unwrap_or_default())
    }

    fn callable_point(
        &self,
        _env: &Env,
        name: &str,
        args: &[u8],
        _is_readonly: bool,
        callstack: &[Address],
        host: &mut dyn ContractHost,
    ) -> Result<CallablePointResponse, String> {
        match name {
            "echo" => Ok(CallablePointResponse {
                data: args.to_vec(),
                ..CallablePointResponse::default()
            }),
            "store" => {
                host.write(b"cp", args).map_err(err)?;
                Ok(CallablePointResponse {
                    data: b"stored".to_vec(),
                    attributes: vec![Attribute::new("stored", "yes")],
                    events: Vec::new(),
                })
            }
            "recurse" => {
                let origin = callstack.first().ok_or("empty callstack")?;
                let data = host
                    .call_callable_point(origin, "echo", args, true, u64::MAX)
                    .map_err(err)?;
                Ok(CallablePointResponse {
                    data,
                    ..CallablePointResponse::default()
                })
            }
            "fail" => {
                host.write(b"cp", b"lost").map_err(err)?;
                Err("callable point failed".into())
            }
            other => Err(format!("unknown callable point {other}")),
        }
    }

    fn callable_points(&self) -> Vec<String> {
        ["echo", "store", "recurse", "fail"]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn has_ibc_entry_points(&self) -> bool {
        self.ibc
    }
}

// =============================================================================
// FIXTURE
// =============================================================================

pub struct Fixture {
    pub keeper: ContractKeeper,
    pub gov: ContractKeeper,
    pub engine: Arc<MockEngine>,
    pub bank: Arc<StoreBank>,
}

pub fn fixture() -> Fixture {
    fixture_with(KeeperConfig::default())
}

/// Routes keeper logs to the test writer; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture_with(config: KeeperConfig) -> Fixture {
    init_tracing();
    let engine = Arc::new(MockEngine::new());
    engine.register(SCRIPTED_CODE, Arc::new(ScriptedContract { ibc: false }));
    engine.register(SCRIPTED_CODE_V2, Arc::new(ScriptedContract { ibc: false }));
    engine.register(IBC_CODE, Arc::new(ScriptedContract { ibc: true }));
    let bank = Arc::new(StoreBank::new());

    let keeper = ContractKeeper::new(config.clone(), engine.clone(), bank.clone())
        .expect("valid config");
    let gov = ContractKeeper::new(config, engine.clone(), bank.clone())
        .expect("valid config")
        .with_authorization_policy(Arc::new(GovAuthorizationPolicy));
    Fixture {
        keeper,
        gov,
        engine,
        bank,
    }
}

pub fn block() -> BlockInfo {
    BlockInfo {
        height: 10,
        time_nanos: 1_000,
        chain_id: "testing".into(),
    }
}

pub fn context(store: &mut MemoryStore, gas_limit: u64) -> Context<'_> {
    Context::new(store, block(), 0, gas_limit)
}

impl Fixture {
    pub fn store_code(&self, ctx: &mut Context<'_>, code: &[u8]) -> CodeId {
        self.keeper
            .create(ctx, &CREATOR, code, CodeProvenance::default(), None)
            .expect("code stored")
            .0
    }

    pub fn instantiate(&self, ctx: &mut Context<'_>, code_id: CodeId, script: &Script) -> Address {
        self.keeper
            .instantiate(ctx, code_id, &CREATOR, Some(CREATOR), &script.encode(), "scripted", &[])
            .expect("contract instantiated")
            .0
    }

    /// Stores the scripted code and instantiates `n` empty contracts.
    pub fn deploy(&self, ctx: &mut Context<'_>, n: usize) -> Vec<Address> {
        let code_id = self.store_code(ctx, SCRIPTED_CODE);
        (0..n)
            .map(|_| self.instantiate(ctx, code_id, &Script::new()))
            .collect()
    }

    pub fn fund(&self, ctx: &mut Context<'_>, to: &Address, amount: u128) {
        self.bank.mint(ctx, to, &coins(amount, DENOM));
    }

    pub fn balance(&self, ctx: &Context<'_>, address: &Address) -> U256 {
        self.bank.balance(ctx, address, DENOM)
    }

    pub fn execute(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        script: &Script,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        self.keeper.execute(ctx, contract, &CREATOR, &script.encode(), &[])
    }

    pub fn stored_reply(&self, ctx: &Context<'_>, contract: &Address, id: u64) -> Option<Reply> {
        self.keeper
            .query_raw(ctx, contract, &reply_key(id))
            .map(|bytes| serde_json::from_slice(&bytes).expect("reply decodes"))
    }
}

pub fn bank_send(to: Address, amount: u128) -> CosmosMsg {
    CosmosMsg::Bank(BankMsg::Send {
        to_address: to,
        amount: coins(amount, DENOM),
    })
}

pub fn wasm_execute(contract: Address, script: &Script) -> CosmosMsg {
    CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: contract,
        msg: script.encode(),
        funds: Vec::new(),
    })
}
