//! Execution context threaded through every keeper call.

use crate::domain::entities::{BlockInfo, Event};
use crate::domain::value_objects::LedgerPosition;
use crate::errors::ContractError;
use crate::gas::GasMeter;
use crate::ports::outbound::KvStore;
use crate::state::cache::CacheStore;

/// Ledger store handle, gas meter and event stream of the current frame.
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    gas: GasMeter,
    events: Vec<Event>,
    block: BlockInfo,
    tx_index: u64,
}

/// What a branch produced.
#[derive(Debug)]
pub struct BranchOutcome<T> {
    /// Result of the branch body.
    pub result: Result<T, ContractError>,
    /// Gas the branch consumed, capped at its limit.
    pub gas_used: u64,
    /// Events of a committed branch; empty when discarded.
    pub events: Vec<Event>,
}

impl<'a> Context<'a> {
    /// Creates a context over `store`.
    pub fn new(store: &'a mut dyn KvStore, block: BlockInfo, tx_index: u64, gas_limit: u64) -> Self {
        Self {
            store,
            gas: GasMeter::new(gas_limit),
            events: Vec::new(),
            block,
            tx_index,
        }
    }

    /// Read access to the ledger store.
    #[must_use]
    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    /// Write access to the ledger store.
    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    /// The gas meter.
    #[must_use]
    pub fn gas(&self) -> &GasMeter {
        &self.gas
    }

    /// The gas meter, mutably.
    pub fn gas_mut(&mut self) -> &mut GasMeter {
        &mut self.gas
    }

    /// Consumes gas on this context's meter.
    ///
    /// # Errors
    ///
    /// `OutOfGas` past the limit.
    pub fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), ContractError> {
        self.gas.consume(amount, descriptor)
    }

    /// Current block.
    #[must_use]
    pub fn block(&self) -> &BlockInfo {
        &self.block
    }

    /// Transaction index within the block.
    #[must_use]
    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    /// Ledger position of the current transaction.
    #[must_use]
    pub fn position(&self) -> LedgerPosition {
        LedgerPosition::new(self.block.height, self.tx_index)
    }

    /// Appends an event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Appends several events.
    pub fn emit_events(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Events emitted so far.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Takes all emitted events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Runs `f` in a rollback-capable branch with its own gas meter.
    ///
    /// The branch meter is limited to `gas_limit` and never more than this
    /// context's remaining gas. The branch's state and events are committed
    /// only if `f` succeeds. This context's meter is not charged; the caller
    /// charges `gas_used`.
    pub fn run_in_branch<T, F>(&mut self, gas_limit: u64, f: F) -> BranchOutcome<T>
    where
        F: FnOnce(&mut Context<'_>) -> Result<T, ContractError>,
    {
        let limit = gas_limit.min(self.gas.remaining());
        let mut cache = CacheStore::new(&mut *self.store);

        let (result, gas_used, events) = {
            let mut child = Context {
                store: &mut cache,
                gas: GasMeter::new(limit),
                events: Vec::new(),
                block: self.block.clone(),
                tx_index: self.tx_index,
            };
            let result = f(&mut child);
            (result, child.gas.consumed_to_limit(), child.events)
        };

        let events = if result.is_ok() {
            cache.commit();
            events
        } else {
            cache.discard();
            Vec::new()
        };

        BranchOutcome {
            result,
            gas_used,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;

    fn block() -> BlockInfo {
        BlockInfo {
            height: 5,
            time_nanos: 0,
            chain_id: "test".into(),
        }
    }

    #[test]
    fn test_branch_commit_forwards_state_and_events() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 2, 1_000);
        let outcome = ctx.run_in_branch(500, |child| {
            child.store_mut().set(b"k", b"v");
            child.emit(Event::new("inner"));
            child.consume_gas(120, "work")
        });
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.gas_used, 120);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(ctx.store().get(b"k"), Some(b"v".to_vec()));
        assert_eq!(ctx.gas().consumed(), 0);
    }

    #[test]
    fn test_branch_failure_discards_everything() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000);
        let outcome: BranchOutcome<()> = ctx.run_in_branch(1_000, |child| {
            child.store_mut().set(b"k", b"v");
            child.emit(Event::new("lost"));
            child.consume_gas(40, "work")?;
            Err(ContractError::ExecuteFailed("boom".into()))
        });
        assert!(outcome.result.is_err());
        assert_eq!(outcome.gas_used, 40);
        assert!(outcome.events.is_empty());
        assert!(!ctx.store().has(b"k"));
    }

    #[test]
    fn test_branch_limit_capped_by_remaining() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 100);
        ctx.consume_gas(70, "setup").unwrap();
        let outcome = ctx.run_in_branch(1_000, |child| Ok(child.gas().limit()));
        assert_eq!(outcome.result.unwrap(), 30);
    }

    #[test]
    fn test_branch_out_of_gas_reports_limit() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000);
        let outcome = ctx.run_in_branch(50, |child| child.consume_gas(80, "loop"));
        assert!(outcome.result.unwrap_err().is_out_of_gas());
        assert_eq!(outcome.gas_used, 50);
    }

    #[test]
    fn test_position() {
        let mut store = MemoryStore::new();
        let ctx = Context::new(&mut store, block(), 3, 10);
        assert_eq!(ctx.position(), LedgerPosition::new(5, 3));
    }
}
