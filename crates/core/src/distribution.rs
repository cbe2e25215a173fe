//! Three-way split of liquidation profit.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::math;
use crate::settings::EngineSettings;

/// One liquidation's profit split. The three parts always sum to the
/// input amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    pub caller_fee: U256,
    pub treasury_fee: U256,
    pub reward_pool_share: U256,
}

/// Splits profit per the configured fee schedule.
#[derive(Debug)]
pub struct DistributionCalculator {
    settings: Arc<EngineSettings>,
}

impl DistributionCalculator {
    pub fn new(settings: Arc<EngineSettings>) -> Self {
        Self { settings }
    }

    pub fn calculate_distribution(&self, amount: U256) -> Distribution {
        let fees = self.settings.fees();
        split(amount, fees.caller_fee_bps, fees.treasury_fee_bps)
    }
}

/// Fee shares floor; the reward-pool remainder is the subtraction, never a
/// third multiplication, so rounding cannot leak value.
pub fn split(amount: U256, caller_fee_bps: u32, treasury_fee_bps: u32) -> Distribution {
    let caller_fee = math::bps_share(amount, caller_fee_bps);
    let treasury_fee = math::bps_share(amount, treasury_fee_bps);
    Distribution {
        caller_fee,
        treasury_fee,
        reward_pool_share: amount - caller_fee - treasury_fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * math::pow10(18)
    }

    #[test]
    fn test_reference_split() {
        // 2% caller, 20% treasury over 100 units
        let d = split(ether(100), 200, 2_000);
        assert_eq!(d.caller_fee, ether(2));
        assert_eq!(d.treasury_fee, ether(20));
        assert_eq!(d.reward_pool_share, ether(78));
    }

    #[test]
    fn test_split_conserves_every_amount() {
        let amounts = [
            U256::ZERO,
            U256::from(1u64),
            U256::from(7u64),
            U256::from(33u64),
            U256::from(9_999u64),
            ether(1) + U256::from(7u64),
        ];
        for amount in amounts {
            let d = split(amount, 200, 2_000);
            assert_eq!(d.caller_fee + d.treasury_fee + d.reward_pool_share, amount);

            let d = split(amount, 1, 4_998);
            assert_eq!(d.caller_fee + d.treasury_fee + d.reward_pool_share, amount);
        }
    }

    #[test]
    fn test_zero_fees_route_everything_to_the_reward_pool() {
        let d = split(ether(5), 0, 0);
        assert_eq!(d.caller_fee, U256::ZERO);
        assert_eq!(d.treasury_fee, U256::ZERO);
        assert_eq!(d.reward_pool_share, ether(5));
    }
}
