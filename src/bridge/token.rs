//! Wrapped Token Boundary
//!
//! The bridge only mints on a confirmed issue and only burns on a redeem.
//! Everything else about the token lives behind [`WrappedToken`].

use std::collections::HashMap;
use thiserror::Error;

use crate::types::AccountId;

/// Token ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("insufficient balance for {account}: have {balance}, need {requested}")]
    InsufficientBalance {
        account: AccountId,
        balance: u64,
        requested: u64,
    },

    #[error("token supply overflow")]
    SupplyOverflow,
}

/// Fungible wrapped token on the issuing chain
pub trait WrappedToken: Send + Sync {
    fn mint(&mut self, to: &AccountId, amount: u64) -> Result<(), TokenError>;

    /// Fails without side effects when `from` holds less than `amount`
    fn burn(&mut self, from: &AccountId, amount: u64) -> Result<(), TokenError>;

    fn balance_of(&self, account: &AccountId) -> u64;

    fn total_supply(&self) -> u64;
}

/// Reference in-memory ledger
#[derive(Debug, Default, Clone)]
pub struct InMemoryToken {
    balances: HashMap<AccountId, u64>,
    supply: u64,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with pre-funded accounts
    pub fn with_balances(balances: impl IntoIterator<Item = (AccountId, u64)>) -> Self {
        let mut token = Self::new();
        for (account, amount) in balances {
            let entry = token.balances.entry(account).or_insert(0);
            *entry = entry.saturating_add(amount);
            token.supply = token.supply.saturating_add(amount);
        }
        token
    }
}

impl WrappedToken for InMemoryToken {
    fn mint(&mut self, to: &AccountId, amount: u64) -> Result<(), TokenError> {
        let supply = self
            .supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow)?;
        let balance = self.balance_of(to);
        // balance <= supply, so this cannot overflow once supply did not
        self.balances.insert(*to, balance + amount);
        self.supply = supply;
        Ok(())
    }

    fn burn(&mut self, from: &AccountId, amount: u64) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                account: *from,
                balance,
                requested: amount,
            });
        }
        self.balances.insert(*from, balance - amount);
        self.supply -= amount;
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u64 {
        self.supply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn() {
        let alice = AccountId([1; 32]);
        let mut token = InMemoryToken::new();

        token.mint(&alice, 100).unwrap();
        token.burn(&alice, 30).unwrap();
        assert_eq!(token.balance_of(&alice), 70);
        assert_eq!(token.total_supply(), 70);

        let err = token.burn(&alice, 71).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { balance: 70, .. }));
        assert_eq!(token.total_supply(), 70);
    }

    #[test]
    fn test_supply_overflow() {
        let mut token = InMemoryToken::with_balances([(AccountId([1; 32]), u64::MAX)]);
        assert_eq!(
            token.mint(&AccountId([2; 32]), 1),
            Err(TokenError::SupplyOverflow)
        );
        assert_eq!(token.balance_of(&AccountId([2; 32])), 0);
    }
}
