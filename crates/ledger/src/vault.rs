//! Vault data model owned by the position ledger.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A collateral-backed debt position.
///
/// Vaults are created and mutated by the ledger; the engine only reads the
/// amounts and, on a successful liquidation, asks the ledger to close the
/// slot. Closed vaults keep their id so the id space stays dense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    /// Vault id, assigned densely starting at 1. Id 0 is never valid.
    pub id: u64,
    /// Owner identity.
    pub owner: Address,
    /// Raw collateral balance (token decimals).
    pub collateral_amount: U256,
    /// Raw debt balance (token decimals).
    pub debt_amount: U256,
    /// Whether the vault has been closed by a liquidation.
    pub closed: bool,
}

/// Read-only view of a vault's amounts.
///
/// Unknown or closed ids read as the zeroed snapshot, which the engine
/// treats as "not eligible" rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub collateral_amount: U256,
    pub debt_amount: U256,
}

/// Per-manager parameters, owned by the ledger administrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VaultManagerConfig {
    /// Minimum collateral-value-to-debt ratio in basis points
    /// (12000 = 120%). A vault strictly below this ratio is liquidable.
    pub safety_ratio_bps: u32,
    /// Asset vault debt is denominated in.
    pub debt_token: Address,
    /// Asset vault collateral is denominated in.
    pub collateral_token: Address,
}
