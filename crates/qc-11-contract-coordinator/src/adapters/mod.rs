//! # Adapters Layer (Outer Hexagon)
//!
//! In-process implementations of the outbound ports.
//!
//! - `memory_store` - ordered in-memory ledger store
//! - `bank` - balances kept in the ledger store
//! - `messenger` - default router for contract-emitted messages
//! - `authz` - ordinary and governance authorization policies
//! - `mock_engine` - scripted contract engine for tests and tooling

pub mod authz;
pub mod bank;
pub mod memory_store;
pub mod messenger;
pub mod mock_engine;

pub use authz::{DefaultAuthorizationPolicy, GovAuthorizationPolicy};
pub use bank::StoreBank;
pub use memory_store::MemoryStore;
pub use messenger::DefaultMessenger;
pub use mock_engine::{MockContract, MockEngine};
