//! Position ledger surface: the vault books the engine reads from and
//! settles against.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::bank::{AssetBank, BankError};
use crate::vault::{Vault, VaultManagerConfig, VaultSnapshot};

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown vault manager {0}")]
    UnknownManager(Address),
    #[error("vault {vault_id} under manager {manager} is closed or does not exist")]
    VaultClosed { manager: Address, vault_id: u64 },
    #[error("vault settlement failed: {0}")]
    Settlement(#[from] BankError),
}

/// Outcome of a successful vault close.
#[derive(Debug, Clone, Copy)]
pub struct ClosedVault {
    /// Full collateral transferred to the close recipient.
    pub collateral_seized: U256,
    /// Full debt pulled from the close recipient.
    pub debt_repaid: U256,
}

/// The vault books for one or more vault managers.
///
/// The ledger owns vault lifecycle and guarantees exclusive, serialized
/// mutation per vault; the engine only reads amounts and requests closes.
#[async_trait]
pub trait PositionLedger: Send + Sync + Debug {
    /// Manager-wide parameters (safety ratio, token pair).
    async fn manager_config(&self, manager: Address) -> Result<VaultManagerConfig, LedgerError>;

    /// Number of vaults ever opened under `manager`. Ids are dense from 1.
    async fn vault_count(&self, manager: Address) -> Result<u64, LedgerError>;

    /// Amounts for a vault id. Total over ids: unknown and closed ids read
    /// as the zeroed snapshot so scans never fail mid-sweep.
    async fn vault(&self, manager: Address, vault_id: u64) -> Result<VaultSnapshot, LedgerError>;

    /// Close a vault: pull its full debt from `recipient`, pay the full
    /// collateral out to `recipient`, and zero the slot. Fails if the vault
    /// is already closed or the id is invalid.
    async fn close_vault(
        &self,
        manager: Address,
        vault_id: u64,
        recipient: Address,
    ) -> Result<ClosedVault, LedgerError>;
}

#[derive(Debug)]
struct ManagerBook {
    config: VaultManagerConfig,
    vaults: DashMap<u64, Vault>,
    next_id: AtomicU64,
}

/// Reference in-memory ledger.
///
/// Collateral custody and debt issuance are modeled through the shared
/// [`AssetBank`], with the manager address acting as the custody account.
/// Vault bookkeeping methods (`create_vault`, `deposit_collateral`,
/// `borrow`) are harness-side helpers outside the [`PositionLedger`]
/// contract the engine sees.
#[derive(Debug)]
pub struct InMemoryLedger {
    bank: Arc<AssetBank>,
    books: DashMap<Address, ManagerBook>,
}

impl InMemoryLedger {
    pub fn new(bank: Arc<AssetBank>) -> Self {
        Self {
            bank,
            books: DashMap::new(),
        }
    }

    /// Register a manager and its parameters.
    pub fn register_manager(&self, manager: Address, config: VaultManagerConfig) {
        info!(
            manager = %manager,
            safety_ratio_bps = config.safety_ratio_bps,
            collateral = %config.collateral_token,
            debt = %config.debt_token,
            "vault manager registered"
        );
        self.books.insert(
            manager,
            ManagerBook {
                config,
                vaults: DashMap::new(),
                next_id: AtomicU64::new(1),
            },
        );
    }

    /// Open an empty vault for `owner`, returning its id.
    pub fn create_vault(&self, manager: Address, owner: Address) -> Result<u64, LedgerError> {
        let book = self
            .books
            .get(&manager)
            .ok_or(LedgerError::UnknownManager(manager))?;
        let id = book.next_id.fetch_add(1, Ordering::SeqCst);
        book.vaults.insert(
            id,
            Vault {
                id,
                owner,
                collateral_amount: U256::ZERO,
                debt_amount: U256::ZERO,
                closed: false,
            },
        );
        debug!(manager = %manager, vault_id = id, owner = %owner, "vault created");
        Ok(id)
    }

    /// Move collateral from the vault owner into manager custody.
    pub fn deposit_collateral(
        &self,
        manager: Address,
        vault_id: u64,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let book = self
            .books
            .get(&manager)
            .ok_or(LedgerError::UnknownManager(manager))?;
        let mut vault = book
            .vaults
            .get_mut(&vault_id)
            .ok_or(LedgerError::VaultClosed { manager, vault_id })?;
        if vault.closed {
            return Err(LedgerError::VaultClosed { manager, vault_id });
        }
        self.bank
            .transfer(book.config.collateral_token, vault.owner, manager, amount)?;
        vault.collateral_amount += amount;
        Ok(())
    }

    /// Issue debt tokens to the vault owner and record the debt.
    pub fn borrow(&self, manager: Address, vault_id: u64, amount: U256) -> Result<(), LedgerError> {
        let book = self
            .books
            .get(&manager)
            .ok_or(LedgerError::UnknownManager(manager))?;
        let mut vault = book
            .vaults
            .get_mut(&vault_id)
            .ok_or(LedgerError::VaultClosed { manager, vault_id })?;
        if vault.closed {
            return Err(LedgerError::VaultClosed { manager, vault_id });
        }
        self.bank.mint(book.config.debt_token, vault.owner, amount);
        vault.debt_amount += amount;
        Ok(())
    }
}

#[async_trait]
impl PositionLedger for InMemoryLedger {
    async fn manager_config(&self, manager: Address) -> Result<VaultManagerConfig, LedgerError> {
        self.books
            .get(&manager)
            .map(|book| book.config)
            .ok_or(LedgerError::UnknownManager(manager))
    }

    async fn vault_count(&self, manager: Address) -> Result<u64, LedgerError> {
        self.books
            .get(&manager)
            .map(|book| book.next_id.load(Ordering::SeqCst) - 1)
            .ok_or(LedgerError::UnknownManager(manager))
    }

    async fn vault(&self, manager: Address, vault_id: u64) -> Result<VaultSnapshot, LedgerError> {
        let book = self
            .books
            .get(&manager)
            .ok_or(LedgerError::UnknownManager(manager))?;
        Ok(book
            .vaults
            .get(&vault_id)
            .map(|vault| VaultSnapshot {
                collateral_amount: vault.collateral_amount,
                debt_amount: vault.debt_amount,
            })
            .unwrap_or_default())
    }

    async fn close_vault(
        &self,
        manager: Address,
        vault_id: u64,
        recipient: Address,
    ) -> Result<ClosedVault, LedgerError> {
        let book = self
            .books
            .get(&manager)
            .ok_or(LedgerError::UnknownManager(manager))?;
        // The entry guard serializes mutation of this vault; a racing close
        // sees `closed` and fails without touching balances.
        let mut vault = book
            .vaults
            .get_mut(&vault_id)
            .ok_or(LedgerError::VaultClosed { manager, vault_id })?;
        if vault.closed || vault.debt_amount.is_zero() {
            return Err(LedgerError::VaultClosed { manager, vault_id });
        }

        let closed = ClosedVault {
            collateral_seized: vault.collateral_amount,
            debt_repaid: vault.debt_amount,
        };
        // Debt flows back to manager custody, collateral out to the recipient.
        self.bank
            .transfer(book.config.debt_token, recipient, manager, closed.debt_repaid)?;
        self.bank.transfer(
            book.config.collateral_token,
            manager,
            recipient,
            closed.collateral_seized,
        )?;

        vault.collateral_amount = U256::ZERO;
        vault.debt_amount = U256::ZERO;
        vault.closed = true;

        info!(
            manager = %manager,
            vault_id,
            collateral_seized = %closed.collateral_seized,
            debt_repaid = %closed.debt_repaid,
            recipient = %recipient,
            "vault closed"
        );
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WETH: Address = Address::repeat_byte(0xE1);
    const MUSD: Address = Address::repeat_byte(0xD1);

    fn setup() -> (Arc<AssetBank>, InMemoryLedger, Address, Address) {
        let bank = Arc::new(AssetBank::new());
        let ledger = InMemoryLedger::new(bank.clone());
        let manager = Address::repeat_byte(0x11);
        let owner = Address::repeat_byte(0x22);
        ledger.register_manager(
            manager,
            VaultManagerConfig {
                safety_ratio_bps: 12_000,
                debt_token: MUSD,
                collateral_token: WETH,
            },
        );
        (bank, ledger, manager, owner)
    }

    #[tokio::test]
    async fn test_vault_ids_are_dense_from_one() {
        let (_, ledger, manager, owner) = setup();
        assert_eq!(ledger.create_vault(manager, owner).unwrap(), 1);
        assert_eq!(ledger.create_vault(manager, owner).unwrap(), 2);
        assert_eq!(ledger.vault_count(manager).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_vault_reads_as_zeroed() {
        let (_, ledger, manager, _) = setup();
        let snapshot = ledger.vault(manager, 7).await.unwrap();
        assert_eq!(snapshot, VaultSnapshot::default());
    }

    #[tokio::test]
    async fn test_close_vault_settles_and_conflicts_on_repeat() {
        let (bank, ledger, manager, owner) = setup();
        let recipient = Address::repeat_byte(0x33);

        bank.mint(WETH, owner, U256::from(100u64));
        let id = ledger.create_vault(manager, owner).unwrap();
        ledger
            .deposit_collateral(manager, id, U256::from(100u64))
            .unwrap();
        ledger.borrow(manager, id, U256::from(80u64)).unwrap();

        // The recipient must fund the debt repayment.
        bank.mint(MUSD, recipient, U256::from(80u64));
        let closed = ledger.close_vault(manager, id, recipient).await.unwrap();
        assert_eq!(closed.collateral_seized, U256::from(100u64));
        assert_eq!(closed.debt_repaid, U256::from(80u64));
        assert_eq!(bank.balance_of(WETH, recipient), U256::from(100u64));
        assert_eq!(bank.balance_of(MUSD, recipient), U256::ZERO);

        // Slot zeroed, id still counted, second close conflicts.
        assert_eq!(
            ledger.vault(manager, id).await.unwrap(),
            VaultSnapshot::default()
        );
        assert_eq!(ledger.vault_count(manager).await.unwrap(), 1);
        let err = ledger.close_vault(manager, id, recipient).await.unwrap_err();
        assert!(matches!(err, LedgerError::VaultClosed { .. }));
    }

    #[tokio::test]
    async fn test_close_requires_funded_recipient() {
        let (bank, ledger, manager, owner) = setup();
        let recipient = Address::repeat_byte(0x33);

        bank.mint(WETH, owner, U256::from(100u64));
        let id = ledger.create_vault(manager, owner).unwrap();
        ledger
            .deposit_collateral(manager, id, U256::from(100u64))
            .unwrap();
        ledger.borrow(manager, id, U256::from(80u64)).unwrap();

        let err = ledger.close_vault(manager, id, recipient).await.unwrap_err();
        assert!(matches!(err, LedgerError::Settlement(_)));
        // The failed close left the vault untouched.
        let snapshot = ledger.vault(manager, id).await.unwrap();
        assert_eq!(snapshot.debt_amount, U256::from(80u64));
    }
}
