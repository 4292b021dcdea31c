//! # Contract Coordinator Metrics
//!
//! Prometheus metrics for contract lifecycle and dispatch.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-11-contract-coordinator = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `contracts_operations_total` - Counter of lifecycle operations (by operation)
//! - `contracts_submessages_total` - Counter of dispatched submessages (by outcome)
//! - `contracts_out_of_gas_total` - Counter of out-of-gas aborts
//! - `contracts_gas_used_total` - Counter of host gas charged for engine calls

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Lifecycle operations, labeled by operation
    pub static ref OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "contracts_operations_total",
        "Total number of contract lifecycle operations",
        &["operation"]
    )
    .expect("Failed to create OPERATIONS metric");

    /// Submessages, labeled by outcome
    pub static ref SUBMESSAGES: IntCounterVec = register_int_counter_vec!(
        "contracts_submessages_total",
        "Total number of dispatched submessages",
        &["outcome"]
    )
    .expect("Failed to create SUBMESSAGES metric");

    /// Out-of-gas aborts
    pub static ref OUT_OF_GAS: IntCounter = register_int_counter!(
        "contracts_out_of_gas_total",
        "Total number of out-of-gas aborts"
    )
    .expect("Failed to create OUT_OF_GAS metric");

    /// Host gas charged for engine calls
    pub static ref GAS_USED: IntCounter = register_int_counter!(
        "contracts_gas_used_total",
        "Total host gas charged for contract engine calls"
    )
    .expect("Failed to create GAS_USED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a lifecycle operation
#[cfg(feature = "metrics")]
pub fn record_operation(operation: &str) {
    OPERATIONS.with_label_values(&[operation]).inc();
}

/// Record a submessage outcome ("ok", "err", "out_of_gas")
#[cfg(feature = "metrics")]
pub fn record_submessage(outcome: &str) {
    SUBMESSAGES.with_label_values(&[outcome]).inc();
}

/// Record an out-of-gas abort
#[cfg(feature = "metrics")]
pub fn record_out_of_gas() {
    OUT_OF_GAS.inc();
}

/// Record host gas charged for an engine call
#[cfg(feature = "metrics")]
pub fn record_gas_used(gas: u64) {
    GAS_USED.inc_by(gas);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

/// Record a lifecycle operation
#[cfg(not(feature = "metrics"))]
pub fn record_operation(_operation: &str) {}

/// Record a submessage outcome
#[cfg(not(feature = "metrics"))]
pub fn record_submessage(_outcome: &str) {}

/// Record an out-of-gas abort
#[cfg(not(feature = "metrics"))]
pub fn record_out_of_gas() {}

/// Record host gas charged for an engine call
#[cfg(not(feature = "metrics"))]
pub fn record_gas_used(_gas: u64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        // These should compile and run without panic even without metrics feature
        record_operation("execute");
        record_submessage("ok");
        record_out_of_gas();
        record_gas_used(42);
    }
}
