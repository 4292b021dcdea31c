//! # Domain Layer (Inner Hexagon)
//!
//! Pure types and functions for contract coordination.
//! NO I/O, NO async.
//!
//! - Dependencies point INWARD only (adapters depend on this, not vice versa).
//! - Everything here is deterministic so every validating node agrees.

pub mod entities;
pub mod invariants;
pub mod messages;
pub mod params;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use messages::*;
pub use params::*;
pub use services::*;
pub use value_objects::*;
