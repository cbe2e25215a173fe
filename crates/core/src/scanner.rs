//! Read-only enumeration of liquidation candidates.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, instrument};

use stabpool_ledger::PositionLedger;

use crate::eligibility::EligibilityEvaluator;
use crate::error::EngineError;

/// Sweeps a manager's whole vault id range and reports the liquidable
/// subset.
///
/// The result is a point-in-time snapshot with no reservation attached:
/// by the time a caller acts, an id may already be safe again or closed by
/// a faster liquidator. The orchestrator re-checks eligibility itself.
#[derive(Debug)]
pub struct PositionScanner {
    ledger: Arc<dyn PositionLedger>,
    evaluator: Arc<EligibilityEvaluator>,
}

impl PositionScanner {
    pub fn new(ledger: Arc<dyn PositionLedger>, evaluator: Arc<EligibilityEvaluator>) -> Self {
        Self { ledger, evaluator }
    }

    /// Liquidable vault ids under `manager`, ascending.
    #[instrument(skip(self), fields(manager = %manager))]
    pub async fn check_liquidable_vaults(&self, manager: Address) -> Result<Vec<u64>, EngineError> {
        let count = self.ledger.vault_count(manager).await?;
        let mut liquidable = Vec::new();
        for vault_id in 1..=count {
            if self.evaluator.is_liquidable(manager, vault_id).await? {
                liquidable.push(vault_id);
            }
        }
        debug!(total = count, eligible = liquidable.len(), "scan complete");
        Ok(liquidable)
    }
}
