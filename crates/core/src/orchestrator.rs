//! End-to-end liquidation orchestration.
//!
//! One `liquidate` call is one atomic unit of work: evaluate, borrow the
//! debt amount, close the vault, convert seized collateral through the
//! market, repay the loan plus fee, and split the surplus. Calls are
//! serialized behind an engine-wide execution lock, and every failable
//! check runs before the first mutation, so any failure aborts with zero
//! visible effects.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use stabpool_ledger::{AssetBank, BankError, OracleRegistry, PositionLedger};
use stabpool_market::MarketRouter;

use crate::distribution::DistributionCalculator;
use crate::eligibility::EligibilityEvaluator;
use crate::error::EngineError;
use crate::math;
use crate::scanner::PositionScanner;
use crate::settings::EngineSettings;
use crate::sizing::SwapSizer;

/// Record of one successful liquidation, emitted as a structured log
/// event. Nothing is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct LiquidationResult {
    pub manager: Address,
    pub vault_id: u64,
    pub seized_collateral: U256,
    pub debt_repaid: U256,
    /// Debt-asset units received from the swap: debt plus the flash fee.
    pub swap_proceeds: U256,
    pub caller_fee: U256,
    pub treasury_fee: U256,
    pub reward_pool_share: U256,
    pub timestamp: DateTime<Utc>,
}

/// Composes evaluator, sizer, distribution and the external collaborators
/// into the end-to-end liquidation transaction.
#[derive(Debug)]
pub struct LiquidationOrchestrator {
    settings: Arc<EngineSettings>,
    ledger: Arc<dyn PositionLedger>,
    router: Arc<dyn MarketRouter>,
    bank: Arc<AssetBank>,
    evaluator: Arc<EligibilityEvaluator>,
    sizer: SwapSizer,
    distribution: DistributionCalculator,
    /// Working account collateral and loan proceeds pass through. Holds
    /// nothing between calls.
    engine_account: Address,
    execution: Mutex<()>,
}

impl LiquidationOrchestrator {
    pub fn new(
        settings: Arc<EngineSettings>,
        ledger: Arc<dyn PositionLedger>,
        oracles: Arc<OracleRegistry>,
        router: Arc<dyn MarketRouter>,
        bank: Arc<AssetBank>,
        engine_account: Address,
    ) -> Self {
        let evaluator = Arc::new(EligibilityEvaluator::new(Arc::clone(&ledger), oracles));
        Self {
            sizer: SwapSizer::new(Arc::clone(&settings), Arc::clone(&router)),
            distribution: DistributionCalculator::new(Arc::clone(&settings)),
            settings,
            ledger,
            router,
            bank,
            evaluator,
            engine_account,
            execution: Mutex::new(()),
        }
    }

    /// Shared eligibility evaluator.
    pub fn evaluator(&self) -> Arc<EligibilityEvaluator> {
        Arc::clone(&self.evaluator)
    }

    /// A scanner over the same ledger and evaluator.
    pub fn scanner(&self) -> PositionScanner {
        PositionScanner::new(Arc::clone(&self.ledger), Arc::clone(&self.evaluator))
    }

    /// Liquidate one vault on behalf of `caller`.
    ///
    /// Eligibility is re-checked here no matter what a prior scan said;
    /// racing callers lose with [`EngineError::NotLiquidable`] and zero
    /// state change.
    #[instrument(skip_all, fields(manager = %manager, vault_id, caller = %caller))]
    pub async fn liquidate(
        &self,
        manager: Address,
        vault_id: u64,
        caller: Address,
    ) -> Result<LiquidationResult, EngineError> {
        let _guard = self.execution.lock().await;

        // Failable prefix: reads only. State cannot change underneath us
        // while the lock is held, so these checks stay valid through the
        // mutations below.
        if !self.evaluator.is_liquidable(manager, vault_id).await? {
            warn!("vault not liquidable at execution time");
            return Err(EngineError::NotLiquidable { manager, vault_id });
        }

        let config = self.ledger.manager_config(manager).await?;
        let vault = self.ledger.vault(manager, vault_id).await?;
        let path = self.settings.swap_path(manager)?;
        let fees = self.settings.fees();
        let treasury = self.settings.treasury();
        let reward_pool = self.settings.reward_pool();
        let flash_pool = self.settings.flash_pool();

        let flash_fee = math::bps_share(vault.debt_amount, fees.flash_fee_bps);
        let repay_total = vault.debt_amount + flash_fee;

        let amount_in_max = self
            .sizer
            .calculate_amount_in_max(manager, repay_total, fees.slippage_bps)
            .await?;
        let required_in = self.router.quote_amounts_in(&path, repay_total).await?;
        if required_in > amount_in_max {
            return Err(EngineError::SlippageExceeded {
                required: required_in,
                max: amount_in_max,
            });
        }
        if required_in > vault.collateral_amount {
            return Err(EngineError::BadDebt {
                required: required_in,
                available: vault.collateral_amount,
            });
        }
        let float = self.bank.balance_of(config.debt_token, flash_pool);
        if float < vault.debt_amount {
            return Err(EngineError::Custody(BankError::InsufficientFunds {
                asset: config.debt_token,
                account: flash_pool,
                available: float,
                required: vault.debt_amount,
            }));
        }

        // Mutation suffix: with the prefix checks holding, none of these
        // steps can fail, so the sequence commits as a whole.
        self.bank.transfer(
            config.debt_token,
            flash_pool,
            self.engine_account,
            vault.debt_amount,
        )?;
        let closed = self
            .ledger
            .close_vault(manager, vault_id, self.engine_account)
            .await?;
        let amount_in_spent = self
            .router
            .swap_for_exact_output(&path, repay_total, amount_in_max, self.engine_account)
            .await?;
        self.bank.transfer(
            config.debt_token,
            self.engine_account,
            flash_pool,
            repay_total,
        )?;

        let profit = closed.collateral_seized - amount_in_spent;
        let split = self.distribution.calculate_distribution(profit);
        self.bank.transfer(
            config.collateral_token,
            self.engine_account,
            caller,
            split.caller_fee,
        )?;
        self.bank.transfer(
            config.collateral_token,
            self.engine_account,
            treasury,
            split.treasury_fee,
        )?;
        self.bank.transfer(
            config.collateral_token,
            self.engine_account,
            reward_pool,
            split.reward_pool_share,
        )?;

        let result = LiquidationResult {
            manager,
            vault_id,
            seized_collateral: closed.collateral_seized,
            debt_repaid: closed.debt_repaid,
            swap_proceeds: repay_total,
            caller_fee: split.caller_fee,
            treasury_fee: split.treasury_fee,
            reward_pool_share: split.reward_pool_share,
            timestamp: Utc::now(),
        };
        info!(
            seized_collateral = %result.seized_collateral,
            debt_repaid = %result.debt_repaid,
            swap_proceeds = %result.swap_proceeds,
            amount_in_spent = %amount_in_spent,
            caller_fee = %result.caller_fee,
            treasury_fee = %result.treasury_fee,
            reward_pool_share = %result.reward_pool_share,
            "vault liquidated"
        );
        Ok(result)
    }
}
