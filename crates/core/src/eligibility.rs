//! Vault eligibility evaluation against the live oracle price.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::trace;

use stabpool_ledger::{OracleRegistry, PositionLedger};

use crate::error::EngineError;
use crate::math;

/// Pure read: decides whether one vault is currently liquidable.
#[derive(Debug)]
pub struct EligibilityEvaluator {
    ledger: Arc<dyn PositionLedger>,
    oracles: Arc<OracleRegistry>,
}

impl EligibilityEvaluator {
    pub fn new(ledger: Arc<dyn PositionLedger>, oracles: Arc<OracleRegistry>) -> Self {
        Self { ledger, oracles }
    }

    /// A vault is liquidable iff its collateral value at the current price
    /// falls strictly below `debt * safety_ratio`. Equality is safe; zero
    /// debt and unknown ids are never eligible and never an error, so
    /// scans over the whole id range stay total.
    pub async fn is_liquidable(&self, manager: Address, vault_id: u64) -> Result<bool, EngineError> {
        let snapshot = self.ledger.vault(manager, vault_id).await?;
        if snapshot.debt_amount.is_zero() {
            return Ok(false);
        }

        let config = self.ledger.manager_config(manager).await?;
        let oracle = self.oracles.get(manager)?;
        let price = oracle.current_price().await?;

        let value = math::collateral_value(snapshot.collateral_amount, price.price, oracle.decimals());
        let liquidable = value * U256::from(math::BPS_DENOMINATOR)
            < snapshot.debt_amount * U256::from(config.safety_ratio_bps);

        trace!(
            manager = %manager,
            vault_id,
            collateral_value = %value,
            debt = %snapshot.debt_amount,
            safety_ratio_bps = config.safety_ratio_bps,
            liquidable,
            "vault evaluated"
        );
        Ok(liquidable)
    }
}
