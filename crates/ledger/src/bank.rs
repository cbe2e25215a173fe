//! In-memory asset custody shared by the reference collaborators.
//!
//! Balances are keyed by `(asset, account)`. Transfers are conservative:
//! they fail on insufficient funds and never create or destroy value.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use thiserror::Error;

/// Custody errors.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("account {account} holds {available} of {asset}, needs {required}")]
    InsufficientFunds {
        asset: Address,
        account: Address,
        available: U256,
        required: U256,
    },
}

/// Balance book for every asset and account in the simulated world.
#[derive(Debug, Default)]
pub struct AssetBank {
    balances: DashMap<(Address, Address), U256>,
}

impl AssetBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `account` in `asset`.
    pub fn balance_of(&self, asset: Address, account: Address) -> U256 {
        self.balances
            .get(&(asset, account))
            .map(|b| *b)
            .unwrap_or(U256::ZERO)
    }

    /// Credit `account` with freshly issued units of `asset`.
    pub fn mint(&self, asset: Address, account: Address, amount: U256) {
        let mut balance = self.balances.entry((asset, account)).or_insert(U256::ZERO);
        *balance += amount;
    }

    /// Move `amount` of `asset` from `from` to `to`.
    pub fn transfer(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), BankError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        {
            let mut source = self.balances.entry((asset, from)).or_insert(U256::ZERO);
            if *source < amount {
                return Err(BankError::InsufficientFunds {
                    asset,
                    account: from,
                    available: *source,
                    required: amount,
                });
            }
            *source -= amount;
        }
        let mut destination = self.balances.entry((asset, to)).or_insert(U256::ZERO);
        *destination += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_moves_balance() {
        let bank = AssetBank::new();
        let asset = Address::repeat_byte(1);
        let alice = Address::repeat_byte(2);
        let bob = Address::repeat_byte(3);

        bank.mint(asset, alice, U256::from(100u64));
        bank.transfer(asset, alice, bob, U256::from(40u64)).unwrap();

        assert_eq!(bank.balance_of(asset, alice), U256::from(60u64));
        assert_eq!(bank.balance_of(asset, bob), U256::from(40u64));
    }

    #[test]
    fn test_transfer_rejects_overdraft() {
        let bank = AssetBank::new();
        let asset = Address::repeat_byte(1);
        let alice = Address::repeat_byte(2);
        let bob = Address::repeat_byte(3);

        bank.mint(asset, alice, U256::from(10u64));
        let err = bank
            .transfer(asset, alice, bob, U256::from(11u64))
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));

        // Nothing moved.
        assert_eq!(bank.balance_of(asset, alice), U256::from(10u64));
        assert_eq!(bank.balance_of(asset, bob), U256::ZERO);
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let bank = AssetBank::new();
        let asset = Address::repeat_byte(1);
        let alice = Address::repeat_byte(2);

        bank.mint(asset, alice, U256::from(5u64));
        bank.transfer(asset, alice, alice, U256::from(5u64)).unwrap();
        assert_eq!(bank.balance_of(asset, alice), U256::from(5u64));
    }
}
