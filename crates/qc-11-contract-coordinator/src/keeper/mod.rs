//! # Contract Keeper
//!
//! The coordinator: one explicit struct holding the registry, the engine
//! and the pluggable collaborators, passed by reference into every
//! operation.
//!
//! - `lifecycle` - Create / Instantiate / Execute / Migrate / Sudo / Reply,
//!   admin and status management, pinning, queries
//! - `dispatcher` - response handling, messages and submessages
//! - `host` - the callback surface the engine sees during a call

mod dispatcher;
mod host;
mod lifecycle;

pub use host::HostBridge;
pub use lifecycle::{attributes, event_types};

use crate::adapters::{DefaultAuthorizationPolicy, DefaultMessenger};
use crate::domain::params::KeeperConfig;
use crate::errors::ContractError;
use crate::ports::outbound::{AuthorizationPolicy, CoinTransferrer, ContractEngine, Messenger};
use crate::registry::Registry;
use std::sync::Arc;

/// Contract lifecycle coordinator and message dispatcher.
pub struct ContractKeeper {
    config: KeeperConfig,
    registry: Registry,
    engine: Arc<dyn ContractEngine>,
    bank: Arc<dyn CoinTransferrer>,
    messenger: Arc<dyn Messenger>,
    authz: Arc<dyn AuthorizationPolicy>,
}

impl ContractKeeper {
    /// Creates a keeper with the default messenger and authorization policy.
    ///
    /// # Errors
    ///
    /// `Invalid` if `config` does not validate.
    pub fn new(
        config: KeeperConfig,
        engine: Arc<dyn ContractEngine>,
        bank: Arc<dyn CoinTransferrer>,
    ) -> Result<Self, ContractError> {
        config.validate()?;
        let messenger = Arc::new(DefaultMessenger::new(Arc::clone(&bank)));
        Ok(Self {
            config,
            registry: Registry::new(),
            engine,
            bank,
            messenger,
            authz: Arc::new(DefaultAuthorizationPolicy),
        })
    }

    /// Replaces the messenger.
    #[must_use]
    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = messenger;
        self
    }

    /// Replaces the authorization policy.
    #[must_use]
    pub fn with_authorization_policy(mut self, authz: Arc<dyn AuthorizationPolicy>) -> Self {
        self.authz = authz;
        self
    }

    /// Keeper parameters.
    #[must_use]
    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Registry handle.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bank collaborator.
    #[must_use]
    pub fn bank(&self) -> &Arc<dyn CoinTransferrer> {
        &self.bank
    }

    /// Contract engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn ContractEngine> {
        &self.engine
    }
}

impl std::fmt::Debug for ContractKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractKeeper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
