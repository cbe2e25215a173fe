//! Slippage-bounded input sizing for exact-output swaps.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::debug;

use stabpool_market::MarketRouter;

use crate::error::EngineError;
use crate::math;
use crate::settings::EngineSettings;

/// Computes the most collateral the engine is willing to spend to obtain
/// an exact debt-asset output.
#[derive(Debug)]
pub struct SwapSizer {
    settings: Arc<EngineSettings>,
    router: Arc<dyn MarketRouter>,
}

impl SwapSizer {
    pub fn new(settings: Arc<EngineSettings>, router: Arc<dyn MarketRouter>) -> Self {
        Self { settings, router }
    }

    /// Quote the no-slippage input for `amount_out` along the manager's
    /// configured path, then grow it by `slippage_bps`, rounding up so the
    /// buffer is never smaller than requested. A missing path or an
    /// unquotable route fails the call; the orchestrator never proceeds on
    /// a guess.
    pub async fn calculate_amount_in_max(
        &self,
        manager: Address,
        amount_out: U256,
        slippage_bps: u32,
    ) -> Result<U256, EngineError> {
        let path = self.settings.swap_path(manager)?;
        let no_slippage_amount_in = self.router.quote_amounts_in(&path, amount_out).await?;
        let amount_in_max = math::bps_markup_ceil(no_slippage_amount_in, slippage_bps);
        debug!(
            manager = %manager,
            amount_out = %amount_out,
            quoted = %no_slippage_amount_in,
            amount_in_max = %amount_in_max,
            slippage_bps,
            "swap input sized"
        );
        Ok(amount_in_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stabpool_market::RouterError;

    /// Router that answers every quote with a fixed amount.
    #[derive(Debug)]
    struct FixedQuote(U256);

    #[async_trait]
    impl MarketRouter for FixedQuote {
        async fn quote_amounts_in(
            &self,
            _path: &[Address],
            _amount_out: U256,
        ) -> Result<U256, RouterError> {
            Ok(self.0)
        }

        async fn swap_for_exact_output(
            &self,
            _path: &[Address],
            _amount_out: U256,
            _amount_in_max: U256,
            _recipient: Address,
        ) -> Result<U256, RouterError> {
            unimplemented!("quote-only mock")
        }
    }

    const OWNER: Address = Address::repeat_byte(0x01);
    const MANAGER: Address = Address::repeat_byte(0x11);

    fn sizer(quote: u64) -> SwapSizer {
        let settings = Arc::new(
            EngineSettings::new(
                OWNER,
                Address::repeat_byte(0x02),
                Address::repeat_byte(0x03),
                Address::repeat_byte(0x04),
                crate::settings::EngineParams::default(),
            )
            .unwrap(),
        );
        settings
            .set_swap_path(
                OWNER,
                MANAGER,
                &[Address::repeat_byte(0xE1), Address::repeat_byte(0xD1)],
            )
            .unwrap();
        SwapSizer::new(settings, Arc::new(FixedQuote(U256::from(quote))))
    }

    #[tokio::test]
    async fn test_exact_two_percent_buffer() {
        let sizer = sizer(1_000);
        let max = sizer
            .calculate_amount_in_max(MANAGER, U256::from(1u64), 200)
            .await
            .unwrap();
        assert_eq!(max, U256::from(1_020u64));
    }

    #[tokio::test]
    async fn test_buffer_rounds_up() {
        let sizer = sizer(999);
        let max = sizer
            .calculate_amount_in_max(MANAGER, U256::from(1u64), 200)
            .await
            .unwrap();
        // 999 * 1.02 = 1018.98
        assert_eq!(max, U256::from(1_019u64));
    }

    #[tokio::test]
    async fn test_monotone_in_slippage_and_quote() {
        let low = sizer(1_000);
        let high = sizer(2_000);
        let out = U256::from(1u64);

        let at_100 = low.calculate_amount_in_max(MANAGER, out, 100).await.unwrap();
        let at_200 = low.calculate_amount_in_max(MANAGER, out, 200).await.unwrap();
        assert!(at_100 <= at_200);

        let bigger_quote = high.calculate_amount_in_max(MANAGER, out, 100).await.unwrap();
        assert!(at_100 <= bigger_quote);
    }

    #[tokio::test]
    async fn test_missing_path_is_a_configuration_error() {
        let sizer = sizer(1_000);
        let other_manager = Address::repeat_byte(0x77);
        assert!(matches!(
            sizer
                .calculate_amount_in_max(other_manager, U256::from(1u64), 200)
                .await,
            Err(EngineError::Configuration(_))
        ));
    }
}
