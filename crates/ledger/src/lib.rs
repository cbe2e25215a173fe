//! Vault ledger and price surface for the stabpool liquidation engine.
//!
//! This crate defines the external collaborators the engine reads from and
//! settles against:
//! - [`PositionLedger`]: the vault books (counts, amounts, close/settle)
//! - [`PriceOracle`] and [`OracleRegistry`]: collateral pricing per manager
//! - [`AssetBank`]: the custody layer the reference collaborators move
//!   balances through
//!
//! The engine itself never mutates a vault directly; it only asks the ledger
//! to close one as the final step of a successful liquidation.

mod bank;
mod ledger;
mod oracle;
mod vault;

pub use bank::{AssetBank, BankError};
pub use ledger::{ClosedVault, InMemoryLedger, LedgerError, PositionLedger};
pub use oracle::{
    OracleError, OracleRegistry, PriceData, PriceOracle, StaticOracle, PRICE_DECIMALS,
};
pub use vault::{Vault, VaultManagerConfig, VaultSnapshot};
