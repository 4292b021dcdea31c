//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the coordinator and the outside world.
//!
//! - **Driving Ports (Inbound)**: `SmartContractApi`
//! - **Driven Ports (Outbound)**: `KvStore`, `ContractEngine`, `ContractHost`,
//!   `CoinTransferrer`, `Messenger`, `AuthorizationPolicy`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
