//! # Store Bank
//!
//! Native balances kept in the ledger store next to the registry, so that
//! transfers made inside a branch roll back with it.
//!
//! Layout:
//! - `0x20 | address | denom` → 32-byte big-endian amount
//! - `0x21 | address` → account marker
//! - `0x22 | address` → blocked marker

use crate::domain::entities::Event;
use crate::domain::value_objects::{format_coins, Address, Coin, U256};
use crate::errors::ContractError;
use crate::ports::outbound::CoinTransferrer;
use crate::state::Context;
use tracing::debug;

const BALANCE_PREFIX: u8 = 0x20;
const ACCOUNT_PREFIX: u8 = 0x21;
const BLOCKED_PREFIX: u8 = 0x22;

fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Address::LEN + denom.len());
    key.push(BALANCE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(denom.as_bytes());
    key
}

fn address_key(prefix: u8, address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Address::LEN);
    key.push(prefix);
    key.extend_from_slice(address.as_bytes());
    key
}

fn encode_amount(amount: U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    amount.to_big_endian(&mut bytes);
    bytes
}

/// Bank backed by the ledger store.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreBank;

impl StoreBank {
    /// Creates the bank.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Credits coins out of thin air. Genesis and tests only.
    pub fn mint(&self, ctx: &mut Context<'_>, to: &Address, amount: &[Coin]) {
        for coin in amount {
            let balance = self.balance(ctx, to, &coin.denom).saturating_add(coin.amount);
            Self::set_balance(ctx, to, &coin.denom, balance);
        }
        self.create_account(ctx, to);
    }

    fn set_balance(ctx: &mut Context<'_>, address: &Address, denom: &str, amount: U256) {
        let key = balance_key(address, denom);
        if amount.is_zero() {
            ctx.store_mut().delete(&key);
        } else {
            ctx.store_mut().set(&key, &encode_amount(amount));
        }
    }
}

impl CoinTransferrer for StoreBank {
    fn transfer(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), ContractError> {
        if self.is_blocked_addr(ctx, to) {
            return Err(ContractError::Unauthorized(format!(
                "{to} is not allowed to receive funds"
            )));
        }

        // Check every denomination before moving anything.
        for coin in amount {
            let available = self.balance(ctx, from, &coin.denom);
            if available < coin.amount {
                return Err(ContractError::InsufficientFunds {
                    address: *from,
                    denom: coin.denom.clone(),
                    required: coin.amount,
                    available,
                });
            }
        }

        for coin in amount.iter().filter(|c| !c.is_zero()) {
            let available = self.balance(ctx, from, &coin.denom);
            let from_balance = available.checked_sub(coin.amount).ok_or_else(|| {
                ContractError::InsufficientFunds {
                    address: *from,
                    denom: coin.denom.clone(),
                    required: coin.amount,
                    available,
                }
            })?;
            Self::set_balance(ctx, from, &coin.denom, from_balance);
            let to_balance = self.balance(ctx, to, &coin.denom).saturating_add(coin.amount);
            Self::set_balance(ctx, to, &coin.denom, to_balance);
        }
        if !self.has_account(ctx, to) {
            self.create_account(ctx, to);
        }

        let formatted = format_coins(amount);
        ctx.emit(
            Event::new("transfer")
                .add_attribute("recipient", to.to_string())
                .add_attribute("sender", from.to_string())
                .add_attribute("amount", formatted.clone()),
        );
        ctx.emit(Event::new("message").add_attribute("sender", from.to_string()));
        debug!(%from, %to, amount = %formatted, "coins transferred");
        Ok(())
    }

    fn balance(&self, ctx: &Context<'_>, address: &Address, denom: &str) -> U256 {
        ctx.store()
            .get(&balance_key(address, denom))
            .map_or_else(U256::zero, |bytes| U256::from_big_endian(&bytes))
    }

    fn has_account(&self, ctx: &Context<'_>, address: &Address) -> bool {
        ctx.store().has(&address_key(ACCOUNT_PREFIX, address))
    }

    fn create_account(&self, ctx: &mut Context<'_>, address: &Address) {
        ctx.store_mut().set(&address_key(ACCOUNT_PREFIX, address), &[1]);
    }

    fn add_blocked_addr(&self, ctx: &mut Context<'_>, address: &Address) {
        ctx.store_mut().set(&address_key(BLOCKED_PREFIX, address), &[1]);
    }

    fn delete_blocked_addr(&self, ctx: &mut Context<'_>, address: &Address) {
        ctx.store_mut().delete(&address_key(BLOCKED_PREFIX, address));
    }

    fn is_blocked_addr(&self, ctx: &Context<'_>, address: &Address) -> bool {
        ctx.store().has(&address_key(BLOCKED_PREFIX, address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::entities::BlockInfo;
    use crate::domain::value_objects::coins;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn block() -> BlockInfo {
        BlockInfo {
            height: 1,
            time_nanos: 0,
            chain_id: "test".into(),
        }
    }

    #[test]
    fn test_transfer_moves_balance_and_emits_events() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000_000);
        let bank = StoreBank::new();
        bank.mint(&mut ctx, &addr(1), &coins(100, "denom"));

        bank.transfer(&mut ctx, &addr(1), &addr(2), &coins(40, "denom"))
            .unwrap();

        assert_eq!(bank.balance(&ctx, &addr(1), "denom"), U256::from(60));
        assert_eq!(bank.balance(&ctx, &addr(2), "denom"), U256::from(40));
        assert!(bank.has_account(&ctx, &addr(2)));

        let events = ctx.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].ty, "transfer");
        assert_eq!(events[0].attribute("amount"), Some("40denom"));
        assert_eq!(events[1].ty, "message");
    }

    #[test]
    fn test_insufficient_funds_moves_nothing() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000_000);
        let bank = StoreBank::new();
        bank.mint(&mut ctx, &addr(1), &coins(10, "a"));

        let err = bank
            .transfer(
                &mut ctx,
                &addr(1),
                &addr(2),
                &[Coin::new(5, "a"), Coin::new(1, "b")],
            )
            .unwrap_err();

        assert!(matches!(err, ContractError::InsufficientFunds { ref denom, .. } if denom == "b"));
        assert_eq!(bank.balance(&ctx, &addr(1), "a"), U256::from(10));
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_blocked_recipient_rejected() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000_000);
        let bank = StoreBank::new();
        bank.mint(&mut ctx, &addr(1), &coins(10, "a"));
        bank.add_blocked_addr(&mut ctx, &addr(2));

        assert!(matches!(
            bank.transfer(&mut ctx, &addr(1), &addr(2), &coins(1, "a")),
            Err(ContractError::Unauthorized(_))
        ));

        bank.delete_blocked_addr(&mut ctx, &addr(2));
        assert!(!bank.is_blocked_addr(&ctx, &addr(2)));
        bank.transfer(&mut ctx, &addr(1), &addr(2), &coins(1, "a"))
            .unwrap();
    }

    #[test]
    fn test_transfer_in_failed_branch_rolls_back() {
        let mut store = MemoryStore::new();
        let mut ctx = Context::new(&mut store, block(), 0, 1_000_000);
        let bank = StoreBank::new();
        bank.mint(&mut ctx, &addr(1), &coins(10, "a"));

        let outcome = ctx.run_in_branch(1_000, |child| {
            bank.transfer(child, &addr(1), &addr(2), &coins(10, "a"))?;
            Err::<(), _>(ContractError::ExecuteFailed("later failure".into()))
        });

        assert!(outcome.result.is_err());
        assert_eq!(bank.balance(&ctx, &addr(1), "a"), U256::from(10));
        assert_eq!(bank.balance(&ctx, &addr(2), "a"), U256::zero());
    }
}
