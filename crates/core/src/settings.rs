//! Engine configuration: deploy-time parameters and the owner-gated
//! runtime settings every orchestrator call reads.

use alloy::primitives::Address;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::info;

use crate::error::EngineError;

/// Ceiling for `caller_fee_bps + treasury_fee_bps`: half of 100%.
pub const FEE_CEILING_BPS: u32 = 5_000;

/// Deploy-time fee and slippage parameters.
///
/// Loadable from a TOML file; every field has a reference default so a
/// partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Caller incentive, in basis points of liquidation profit
    #[serde(default = "default_caller_fee_bps")]
    pub caller_fee_bps: u32,

    /// Treasury share, in basis points of liquidation profit
    #[serde(default = "default_treasury_fee_bps")]
    pub treasury_fee_bps: u32,

    /// Short-term loan fee, in basis points of the borrowed amount
    #[serde(default = "default_flash_fee_bps")]
    pub flash_fee_bps: u32,

    /// Swap input buffer over the quoted amount, in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
}

fn default_caller_fee_bps() -> u32 {
    200
}
fn default_treasury_fee_bps() -> u32 {
    2_000
}
fn default_flash_fee_bps() -> u32 {
    30
}
fn default_slippage_bps() -> u32 {
    200
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            caller_fee_bps: default_caller_fee_bps(),
            treasury_fee_bps: default_treasury_fee_bps(),
            flash_fee_bps: default_flash_fee_bps(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

impl EngineParams {
    /// Load parameters from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params: Self = toml::from_str(&content)?;
        Ok(params)
    }
}

/// Fee schedule snapshot read by one orchestrator call.
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub caller_fee_bps: u32,
    pub treasury_fee_bps: u32,
    pub flash_fee_bps: u32,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, Copy)]
struct PayoutAccounts {
    treasury: Address,
    reward_pool: Address,
    flash_pool: Address,
}

/// Process-wide engine settings.
///
/// Set once at deployment, mutable only through the owner-gated setters
/// afterwards. `liquidate` only ever reads.
#[derive(Debug)]
pub struct EngineSettings {
    owner: Address,
    accounts: RwLock<PayoutAccounts>,
    fees: RwLock<FeeSchedule>,
    swap_paths: DashMap<Address, SmallVec<[Address; 4]>>,
}

impl EngineSettings {
    /// Validate and install the deployment configuration.
    pub fn new(
        owner: Address,
        treasury: Address,
        reward_pool: Address,
        flash_pool: Address,
        params: EngineParams,
    ) -> Result<Self, EngineError> {
        validate_account(treasury, "treasury")?;
        validate_account(reward_pool, "reward pool")?;
        validate_account(flash_pool, "flash pool")?;
        validate_flash_fee(params.flash_fee_bps)?;
        validate_distribution_fees(params.caller_fee_bps, params.treasury_fee_bps)?;
        validate_slippage(params.slippage_bps)?;

        Ok(Self {
            owner,
            accounts: RwLock::new(PayoutAccounts {
                treasury,
                reward_pool,
                flash_pool,
            }),
            fees: RwLock::new(FeeSchedule {
                caller_fee_bps: params.caller_fee_bps,
                treasury_fee_bps: params.treasury_fee_bps,
                flash_fee_bps: params.flash_fee_bps,
                slippage_bps: params.slippage_bps,
            }),
            swap_paths: DashMap::new(),
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn treasury(&self) -> Address {
        self.accounts.read().treasury
    }

    pub fn reward_pool(&self) -> Address {
        self.accounts.read().reward_pool
    }

    pub fn flash_pool(&self) -> Address {
        self.accounts.read().flash_pool
    }

    pub fn fees(&self) -> FeeSchedule {
        *self.fees.read()
    }

    /// Configured swap path for `manager`: collateral asset first, debt
    /// asset last. Missing paths are a configuration error, never a
    /// default.
    pub fn swap_path(&self, manager: Address) -> Result<SmallVec<[Address; 4]>, EngineError> {
        self.swap_paths
            .get(&manager)
            .map(|path| path.clone())
            .ok_or_else(|| {
                EngineError::Configuration(format!("no swap path configured for manager {manager}"))
            })
    }

    pub fn set_treasury(&self, caller: Address, treasury: Address) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_account(treasury, "treasury")?;
        self.accounts.write().treasury = treasury;
        info!(treasury = %treasury, "treasury updated");
        Ok(())
    }

    pub fn set_reward_pool(&self, caller: Address, reward_pool: Address) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_account(reward_pool, "reward pool")?;
        self.accounts.write().reward_pool = reward_pool;
        info!(reward_pool = %reward_pool, "reward pool updated");
        Ok(())
    }

    pub fn set_flash_pool(&self, caller: Address, flash_pool: Address) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_account(flash_pool, "flash pool")?;
        self.accounts.write().flash_pool = flash_pool;
        info!(flash_pool = %flash_pool, "flash pool updated");
        Ok(())
    }

    pub fn set_flash_fee_bps(&self, caller: Address, flash_fee_bps: u32) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_flash_fee(flash_fee_bps)?;
        self.fees.write().flash_fee_bps = flash_fee_bps;
        info!(flash_fee_bps, "flash loan fee updated");
        Ok(())
    }

    /// Caller and treasury fees are set jointly so the ceiling check always
    /// sees the final pair.
    pub fn set_distribution_fees(
        &self,
        caller: Address,
        caller_fee_bps: u32,
        treasury_fee_bps: u32,
    ) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_distribution_fees(caller_fee_bps, treasury_fee_bps)?;
        let mut fees = self.fees.write();
        fees.caller_fee_bps = caller_fee_bps;
        fees.treasury_fee_bps = treasury_fee_bps;
        info!(caller_fee_bps, treasury_fee_bps, "distribution fees updated");
        Ok(())
    }

    pub fn set_slippage_bps(&self, caller: Address, slippage_bps: u32) -> Result<(), EngineError> {
        self.authorize(caller)?;
        validate_slippage(slippage_bps)?;
        self.fees.write().slippage_bps = slippage_bps;
        info!(slippage_bps, "slippage tolerance updated");
        Ok(())
    }

    pub fn set_swap_path(
        &self,
        caller: Address,
        manager: Address,
        path: &[Address],
    ) -> Result<(), EngineError> {
        self.authorize(caller)?;
        if path.len() < 2 {
            return Err(EngineError::Configuration(
                "swap path must contain at least two assets".into(),
            ));
        }
        if path.first() == path.last() {
            return Err(EngineError::Configuration(
                "swap path endpoints must differ".into(),
            ));
        }
        self.swap_paths
            .insert(manager, SmallVec::from_slice(path));
        info!(manager = %manager, hops = path.len() - 1, "swap path updated");
        Ok(())
    }

    fn authorize(&self, caller: Address) -> Result<(), EngineError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(EngineError::Authorization(caller))
        }
    }
}

fn validate_account(account: Address, name: &str) -> Result<(), EngineError> {
    if account.is_zero() {
        return Err(EngineError::Configuration(format!(
            "{name} address cannot be zero"
        )));
    }
    Ok(())
}

fn validate_flash_fee(flash_fee_bps: u32) -> Result<(), EngineError> {
    if flash_fee_bps == 0 {
        return Err(EngineError::Configuration(
            "flash loan fee cannot be zero".into(),
        ));
    }
    Ok(())
}

fn validate_distribution_fees(caller_fee_bps: u32, treasury_fee_bps: u32) -> Result<(), EngineError> {
    if caller_fee_bps as u64 + treasury_fee_bps as u64 >= FEE_CEILING_BPS as u64 {
        return Err(EngineError::Configuration("distribution fees too high".into()));
    }
    Ok(())
}

fn validate_slippage(slippage_bps: u32) -> Result<(), EngineError> {
    if slippage_bps >= 10_000 {
        return Err(EngineError::Configuration(
            "slippage tolerance must stay below 100%".into(),
        ));
    }
    Ok(())
}
