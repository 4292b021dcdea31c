//! Keeper parameters and their validation.
//!
//! # Example
//!
//! ```ignore
//! let config = KeeperConfig::from_json(r#"{"gas_multiplier": 100}"#)?
//!     .with_max_call_depth(4);
//! ```

use crate::domain::entities::{AccessConfig, AccessType};
use crate::errors::ContractError;
use serde::{Deserialize, Serialize};

/// Host gas to engine gas conversion factor.
pub const DEFAULT_GAS_MULTIPLIER: u64 = 140_000_000;
/// Gas charged for loading a non-pinned contract instance.
pub const DEFAULT_INSTANCE_COST: u64 = 60_000;
/// Gas charged per byte of uploaded code.
pub const DEFAULT_COMPILE_COST: u64 = 3;
/// Maximum uncompressed code size.
pub const DEFAULT_MAX_WASM_CODE_SIZE: usize = 800 * 1024;
/// Maximum label length in bytes.
pub const DEFAULT_MAX_LABEL_SIZE: usize = 128;
/// Maximum nesting of callable points and smart queries.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10;
/// Gas for converting a canonical address to its human form.
pub const DEFAULT_HUMANIZE_COST: u64 = 5;
/// Gas for converting a human address to its canonical form.
pub const DEFAULT_CANONICALIZE_COST: u64 = 4;
/// Gas for an interface validation request.
pub const DEFAULT_VALIDATE_INTERFACE_COST: u64 = 10;

/// Keeper configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperConfig {
    /// Who may upload code.
    pub code_upload_access: AccessConfig,
    /// Instantiate permission for uploads that do not set one.
    pub instantiate_default_permission: AccessType,
    /// Host gas to engine gas conversion factor.
    pub gas_multiplier: u64,
    /// Instance load cost for non-pinned code.
    pub instance_cost: u64,
    /// Compile cost per byte of uncompressed code.
    pub compile_cost_per_byte: u64,
    /// Maximum uncompressed code size in bytes.
    pub max_wasm_code_size: usize,
    /// Maximum label size in bytes.
    pub max_label_size: usize,
    /// Maximum callable point / smart query nesting.
    pub max_call_depth: usize,
    /// Humanize address cost.
    pub humanize_cost: u64,
    /// Canonicalize address cost.
    pub canonicalize_cost: u64,
    /// Interface validation cost.
    pub validate_interface_cost: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            code_upload_access: AccessConfig::everybody(),
            instantiate_default_permission: AccessType::Everybody,
            gas_multiplier: DEFAULT_GAS_MULTIPLIER,
            instance_cost: DEFAULT_INSTANCE_COST,
            compile_cost_per_byte: DEFAULT_COMPILE_COST,
            max_wasm_code_size: DEFAULT_MAX_WASM_CODE_SIZE,
            max_label_size: DEFAULT_MAX_LABEL_SIZE,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            humanize_cost: DEFAULT_HUMANIZE_COST,
            canonicalize_cost: DEFAULT_CANONICALIZE_COST,
            validate_interface_cost: DEFAULT_VALIDATE_INTERFACE_COST,
        }
    }
}

impl KeeperConfig {
    /// Parses and validates a JSON config; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// `Invalid` for malformed JSON or a config rejected by [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, ContractError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ContractError::Invalid(format!("keeper config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// `Invalid` describing the first bad field.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.gas_multiplier == 0 {
            return Err(ContractError::Invalid(
                "gas_multiplier cannot be 0".to_string(),
            ));
        }
        if self.max_wasm_code_size == 0 {
            return Err(ContractError::Invalid(
                "max_wasm_code_size cannot be 0".to_string(),
            ));
        }
        if self.max_label_size == 0 {
            return Err(ContractError::Invalid(
                "max_label_size cannot be 0".to_string(),
            ));
        }
        if !self.code_upload_access.is_well_formed() {
            return Err(ContractError::Invalid(
                "code_upload_access is malformed".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style method to set the gas multiplier
    #[must_use]
    pub fn with_gas_multiplier(mut self, multiplier: u64) -> Self {
        self.gas_multiplier = multiplier;
        self
    }

    /// Builder-style method to set the instance cost
    #[must_use]
    pub fn with_instance_cost(mut self, cost: u64) -> Self {
        self.instance_cost = cost;
        self
    }

    /// Builder-style method to set the upload rule
    #[must_use]
    pub fn with_code_upload_access(mut self, access: AccessConfig) -> Self {
        self.code_upload_access = access;
        self
    }

    /// Builder-style method to set the maximum call depth
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
