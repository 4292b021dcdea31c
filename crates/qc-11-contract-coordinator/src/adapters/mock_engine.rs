//! # Scripted Contract Engine
//!
//! In-memory `ContractEngine` for tests and local tooling. Contract
//! behaviour is Rust code implementing [`MockContract`], registered under
//! the checksum of some placeholder bytecode; uploading that bytecode then
//! "compiles" to the registered behaviour.
//!
//! Every entry point call costs a flat amount of engine gas. A call whose
//! flat cost exceeds the limit fails with `out of gas` and reports the whole
//! limit as used.

use crate::domain::entities::{Env, MessageInfo};
use crate::domain::messages::{CallablePointResponse, Reply, Response};
use crate::domain::services::checksum;
use crate::domain::value_objects::{Address, Checksum};
use crate::errors::EngineError;
use crate::ports::outbound::{AnalysisReport, ContractEngine, ContractHost, EngineOutput};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Scripted contract behaviour. Unimplemented entry points fail.
#[allow(unused_variables)]
pub trait MockContract: Send + Sync {
    /// `instantiate` entry point.
    fn instantiate(
        &self,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
    ) -> Result<Response, String> {
        Ok(Response::new())
    }

    /// `execute` entry point.
    fn execute(
        &self,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
    ) -> Result<Response, String> {
        Err("execute not implemented".into())
    }

    /// `migrate` entry point.
    fn migrate(&self, env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Response, String> {
        Err("migrate not implemented".into())
    }

    /// `sudo` entry point.
    fn sudo(&self, env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Response, String> {
        Err("sudo not implemented".into())
    }

    /// `reply` entry point.
    fn reply(&self, env: &Env, reply: &Reply, host: &mut dyn ContractHost) -> Result<Response, String> {
        Err("reply not implemented".into())
    }

    /// `query` entry point.
    fn query(&self, env: &Env, msg: &[u8], host: &mut dyn ContractHost) -> Result<Vec<u8>, String> {
        Err("query not implemented".into())
    }

    /// Named callable point.
    fn callable_point(
        &self,
        env: &Env,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        callstack: &[Address],
        host: &mut dyn ContractHost,
    ) -> Result<CallablePointResponse, String> {
        Err(format!("callable point {name} not implemented"))
    }

    /// Names of the exported callable points.
    fn callable_points(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the code exports cross-chain entry points.
    fn has_ibc_entry_points(&self) -> bool {
        false
    }
}

/// In-memory engine running [`MockContract`] scripts.
pub struct MockEngine {
    scripts: RwLock<HashMap<Checksum, Arc<dyn MockContract>>>,
    codes: RwLock<HashMap<Checksum, Vec<u8>>>,
    pinned: RwLock<HashSet<Checksum>>,
    gas_per_call: u64,
}

impl MockEngine {
    /// Engine gas charged per entry point call by default.
    pub const DEFAULT_GAS_PER_CALL: u64 = 1_400_000_000;

    /// Create an engine with no registered contracts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            codes: RwLock::new(HashMap::new()),
            pinned: RwLock::new(HashSet::new()),
            gas_per_call: Self::DEFAULT_GAS_PER_CALL,
        }
    }

    /// Sets the flat engine gas charged per call.
    #[must_use]
    pub fn with_gas_per_call(mut self, gas_per_call: u64) -> Self {
        self.gas_per_call = gas_per_call;
        self
    }

    /// Registers `contract` as the behaviour of `bytecode`.
    pub fn register(&self, bytecode: &[u8], contract: Arc<dyn MockContract>) -> Checksum {
        let hash = checksum(bytecode);
        self.scripts.write().insert(hash, contract);
        hash
    }

    /// Returns true if the checksum is pinned.
    #[must_use]
    pub fn is_pinned(&self, checksum: &Checksum) -> bool {
        self.pinned.read().contains(checksum)
    }

    fn script(&self, checksum: &Checksum) -> Result<Arc<dyn MockContract>, EngineError> {
        if !self.codes.read().contains_key(checksum) {
            return Err(EngineError::UnknownChecksum(*checksum));
        }
        self.scripts
            .read()
            .get(checksum)
            .cloned()
            .ok_or(EngineError::UnknownChecksum(*checksum))
    }

    fn run<T>(
        &self,
        checksum: &Checksum,
        gas_limit: u64,
        call: impl FnOnce(&dyn MockContract) -> Result<T, String>,
    ) -> EngineOutput<T> {
        if self.gas_per_call > gas_limit {
            return EngineOutput::err("out of gas", gas_limit);
        }
        match self.script(checksum) {
            Ok(script) => EngineOutput {
                outcome: call(script.as_ref()),
                gas_used: self.gas_per_call,
            },
            Err(err) => EngineOutput::err(err.to_string(), self.gas_per_call),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractEngine for MockEngine {
    fn create(&self, code: &[u8]) -> Result<Checksum, EngineError> {
        let hash = checksum(code);
        if !self.scripts.read().contains_key(&hash) {
            return Err(EngineError::Compile(format!(
                "no contract registered for checksum {hash}"
            )));
        }
        self.codes.write().insert(hash, code.to_vec());
        debug!(%hash, size = code.len(), "mock code compiled");
        Ok(hash)
    }

    fn analyze(&self, checksum: &Checksum) -> Result<AnalysisReport, EngineError> {
        let script = self.script(checksum)?;
        Ok(AnalysisReport {
            has_ibc_entry_points: script.has_ibc_entry_points(),
            required_capabilities: Vec::new(),
        })
    }

    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, EngineError> {
        self.codes
            .read()
            .get(checksum)
            .cloned()
            .ok_or(EngineError::UnknownChecksum(*checksum))
    }

    fn pin(&self, checksum: &Checksum) -> Result<(), EngineError> {
        self.script(checksum)?;
        self.pinned.write().insert(*checksum);
        Ok(())
    }

    fn unpin(&self, checksum: &Checksum) -> Result<(), EngineError> {
        self.pinned.write().remove(checksum);
        Ok(())
    }

    fn instantiate(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response> {
        self.run(checksum, gas_limit, |c| c.instantiate(env, info, msg, host))
    }

    fn execute(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response> {
        self.run(checksum, gas_limit, |c| c.execute(env, info, msg, host))
    }

    fn migrate(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response> {
        self.run(checksum, gas_limit, |c| c.migrate(env, msg, host))
    }

    fn sudo(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response> {
        self.run(checksum, gas_limit, |c| c.sudo(env, msg, host))
    }

    fn reply(
        &self,
        checksum: &Checksum,
        env: &Env,
        reply: &Reply,
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Response> {
        self.run(checksum, gas_limit, |c| c.reply(env, reply, host))
    }

    fn query(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<Vec<u8>> {
        self.run(checksum, gas_limit, |c| c.query(env, msg, host))
    }

    fn call_callable_point(
        &self,
        checksum: &Checksum,
        env: &Env,
        name: &str,
        args: &[u8],
        is_readonly: bool,
        callstack: &[Address],
        host: &mut dyn ContractHost,
        gas_limit: u64,
    ) -> EngineOutput<CallablePointResponse> {
        self.run(checksum, gas_limit, |c| {
            c.callable_point(env, name, args, is_readonly, callstack, host)
        })
    }

    /// `expected` is a JSON array of callable point names.
    fn validate_interface(
        &self,
        checksum: &Checksum,
        expected: &[u8],
    ) -> Result<Option<String>, EngineError> {
        let expected: Vec<String> =
            serde_json::from_slice(expected).map_err(|e| EngineError::Vm(e.to_string()))?;
        let exported = self.script(checksum)?.callable_points();
        let missing: Vec<String> = expected
            .into_iter()
            .filter(|name| !exported.contains(name))
            .collect();
        if missing.is_empty() {
            Ok(None)
        } else {
            Ok(Some(format!("missing callable points: {}", missing.join(", "))))
        }
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("scripts", &self.scripts.read().len())
            .field("gas_per_call", &self.gas_per_call)
            .finish_non_exhaustive()
    }
}
