//! # Authorization Policies
//!
//! - `DefaultAuthorizationPolicy` - ordinary transactions: access configs
//!   are enforced, only the admin may modify a contract, status changes are
//!   refused.
//! - `GovAuthorizationPolicy` - governance-privileged path: everything is
//!   allowed.

use crate::domain::entities::AccessConfig;
use crate::domain::value_objects::Address;
use crate::ports::outbound::AuthorizationPolicy;

/// Policy for ordinary transactions.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthorizationPolicy;

impl AuthorizationPolicy for DefaultAuthorizationPolicy {
    fn can_create_code(&self, config: &AccessConfig, actor: &Address) -> bool {
        config.allowed(actor)
    }

    fn can_instantiate_contract(&self, config: &AccessConfig, actor: &Address) -> bool {
        config.allowed(actor)
    }

    fn can_modify_contract(&self, admin: Option<&Address>, actor: &Address) -> bool {
        admin == Some(actor)
    }

    fn can_update_contract_status(&self) -> bool {
        false
    }
}

/// Policy for governance-privileged operations.
#[derive(Clone, Copy, Debug, Default)]
pub struct GovAuthorizationPolicy;

impl AuthorizationPolicy for GovAuthorizationPolicy {
    fn can_create_code(&self, _config: &AccessConfig, _actor: &Address) -> bool {
        true
    }

    fn can_instantiate_contract(&self, _config: &AccessConfig, _actor: &Address) -> bool {
        true
    }

    fn can_modify_contract(&self, _admin: Option<&Address>, _actor: &Address) -> bool {
        true
    }

    fn can_update_contract_status(&self) -> bool {
        true
    }
}
