//! Engine error taxonomy.
//!
//! Every failure aborts the whole orchestrated operation; there is no
//! retry and no partial-success mode. Collaborator errors are either
//! reclassified (a close conflict, an over-bound swap) or carried through
//! transparently.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use stabpool_ledger::{BankError, LedgerError, OracleError};
use stabpool_market::RouterError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or missing engine configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Administrative mutation attempted by a non-owner identity.
    #[error("caller {0} is not the engine owner")]
    Authorization(Address),

    /// The vault failed the eligibility re-check.
    #[error("vault {vault_id} under manager {manager} is not liquidable")]
    NotLiquidable { manager: Address, vault_id: u64 },

    /// The market cannot deliver the required output within the input bound.
    #[error("slippage exceeded: required input {required} above maximum {max}")]
    SlippageExceeded { required: U256, max: U256 },

    /// The vault was closed under us, or the ledger refused the close.
    #[error("ledger conflict: {0}")]
    LedgerConflict(LedgerError),

    /// Seized collateral cannot fund the exact-output swap.
    #[error("bad debt: swap requires {required} collateral, vault holds {available}")]
    BadDebt { required: U256, available: U256 },

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Router(RouterError),

    #[error(transparent)]
    Custody(#[from] BankError),
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownManager(manager) => {
                Self::Configuration(format!("unknown vault manager {manager}"))
            }
            LedgerError::VaultClosed { .. } => Self::LedgerConflict(err),
            LedgerError::Settlement(bank) => Self::Custody(bank),
        }
    }
}

impl From<RouterError> for EngineError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::ExcessiveInputAmount { required, max } => {
                Self::SlippageExceeded { required, max }
            }
            RouterError::Settlement(bank) => Self::Custody(bank),
            other => Self::Router(other),
        }
    }
}
