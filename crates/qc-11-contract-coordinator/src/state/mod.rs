//! # Branch-and-Commit State
//!
//! Copy-on-write overlays over the ledger store and the per-frame execution
//! context. A child branch is either committed into its parent or dropped.

pub mod cache;
pub mod context;

pub use cache::CacheStore;
pub use context::{BranchOutcome, Context};
