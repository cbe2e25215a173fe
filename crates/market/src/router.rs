//! Market router trait and errors.

use std::fmt::Debug;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

use stabpool_ledger::BankError;

/// Routing and execution errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("swap path must contain at least two assets")]
    InvalidPath,
    #[error("requested swap amount is zero")]
    ZeroAmount,
    #[error("no pool for pair {0} / {1}")]
    UnknownPair(Address, Address),
    #[error("insufficient liquidity for requested output {amount_out}")]
    InsufficientLiquidity { amount_out: U256 },
    #[error("required input {required} exceeds maximum {max}")]
    ExcessiveInputAmount { required: U256, max: U256 },
    #[error("swap settlement failed: {0}")]
    Settlement(#[from] BankError),
}

/// Exact-output swap execution along an ordered asset path.
///
/// Quotes are computed against current pool reserves and carry no
/// reservation; the price can move between quoting and execution, which is
/// why execution takes an input bound and fails rather than overspend.
#[async_trait]
pub trait MarketRouter: Send + Sync + Debug {
    /// Input amount of `path[0]` required to obtain exactly `amount_out`
    /// of the terminal asset under current reserves.
    async fn quote_amounts_in(
        &self,
        path: &[Address],
        amount_out: U256,
    ) -> Result<U256, RouterError>;

    /// Swap for exactly `amount_out` of the terminal asset, debiting
    /// `recipient` by at most `amount_in_max` of `path[0]` and crediting
    /// the output to `recipient`. Returns the input actually spent.
    async fn swap_for_exact_output(
        &self,
        path: &[Address],
        amount_out: U256,
        amount_in_max: U256,
        recipient: Address,
    ) -> Result<U256, RouterError>;
}
