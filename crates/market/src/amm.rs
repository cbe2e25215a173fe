//! Constant-product reference router.
//!
//! Pools are kept in sorted-pair order with x*y=k semantics and the
//! standard 0.3% input fee. Quoting for an exact output walks the path
//! backwards; each hop rounds its required input up by one smallest unit so
//! the invariant never loses value to truncation.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, info};

use stabpool_ledger::AssetBank;

use crate::router::{MarketRouter, RouterError};

/// Swap fee taken on input: 3 per mille.
const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;

type PairKey = (Address, Address);

fn pair_key(a: Address, b: Address) -> PairKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Reserves in sorted-pair order.
#[derive(Debug, Clone, Copy)]
struct PoolReserves {
    reserve0: U256,
    reserve1: U256,
}

/// In-memory constant-product market.
///
/// Pooled liquidity is held in a single custody account on the shared
/// [`AssetBank`]; only the path endpoints touch external balances, the
/// intermediate legs stay inside the pool account.
#[derive(Debug)]
pub struct AmmRouter {
    bank: Arc<AssetBank>,
    account: Address,
    pools: DashMap<PairKey, PoolReserves>,
}

impl AmmRouter {
    pub fn new(bank: Arc<AssetBank>, account: Address) -> Self {
        Self {
            bank,
            account,
            pools: DashMap::new(),
        }
    }

    /// Seed or grow a pool from `provider`'s balances.
    pub fn add_liquidity(
        &self,
        asset_a: Address,
        asset_b: Address,
        amount_a: U256,
        amount_b: U256,
        provider: Address,
    ) -> Result<(), RouterError> {
        self.bank.transfer(asset_a, provider, self.account, amount_a)?;
        self.bank.transfer(asset_b, provider, self.account, amount_b)?;

        let key = pair_key(asset_a, asset_b);
        let (amount0, amount1) = if asset_a == key.0 {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        let mut pool = self.pools.entry(key).or_insert(PoolReserves {
            reserve0: U256::ZERO,
            reserve1: U256::ZERO,
        });
        pool.reserve0 += amount0;
        pool.reserve1 += amount1;
        let (reserve_a, reserve_b) = if asset_a == key.0 {
            (pool.reserve0, pool.reserve1)
        } else {
            (pool.reserve1, pool.reserve0)
        };
        info!(
            asset_a = %asset_a,
            asset_b = %asset_b,
            reserve_a = %reserve_a,
            reserve_b = %reserve_b,
            "liquidity added"
        );
        Ok(())
    }

    /// Current reserves oriented as `(asset_a, asset_b)`.
    pub fn reserves(&self, asset_a: Address, asset_b: Address) -> Option<(U256, U256)> {
        let key = pair_key(asset_a, asset_b);
        self.pools.get(&key).map(|pool| {
            if asset_a == key.0 {
                (pool.reserve0, pool.reserve1)
            } else {
                (pool.reserve1, pool.reserve0)
            }
        })
    }

    /// Required inputs per path position for an exact terminal output.
    fn amounts_in(
        &self,
        path: &[Address],
        amount_out: U256,
    ) -> Result<SmallVec<[U256; 4]>, RouterError> {
        if path.len() < 2 {
            return Err(RouterError::InvalidPath);
        }
        if amount_out.is_zero() {
            return Err(RouterError::ZeroAmount);
        }
        let mut amounts: SmallVec<[U256; 4]> = smallvec![U256::ZERO; path.len()];
        amounts[path.len() - 1] = amount_out;
        for i in (0..path.len() - 1).rev() {
            amounts[i] = self.amount_in_for(path[i], path[i + 1], amounts[i + 1])?;
        }
        Ok(amounts)
    }

    /// `in = in_reserve * out * 1000 / ((out_reserve - out) * 997) + 1`
    fn amount_in_for(
        &self,
        asset_in: Address,
        asset_out: Address,
        amount_out: U256,
    ) -> Result<U256, RouterError> {
        let (reserve_in, reserve_out) = self.oriented_reserves(asset_in, asset_out)?;
        if reserve_in.is_zero() || amount_out >= reserve_out {
            return Err(RouterError::InsufficientLiquidity { amount_out });
        }
        let numerator = reserve_in * amount_out * U256::from(FEE_DENOMINATOR);
        let denominator = (reserve_out - amount_out) * U256::from(FEE_NUMERATOR);
        Ok(numerator / denominator + U256::from(1u64))
    }

    fn oriented_reserves(
        &self,
        asset_in: Address,
        asset_out: Address,
    ) -> Result<(U256, U256), RouterError> {
        let key = pair_key(asset_in, asset_out);
        let pool = self
            .pools
            .get(&key)
            .ok_or(RouterError::UnknownPair(asset_in, asset_out))?;
        if asset_in == key.0 {
            Ok((pool.reserve0, pool.reserve1))
        } else {
            Ok((pool.reserve1, pool.reserve0))
        }
    }

    fn apply_hop(&self, asset_in: Address, asset_out: Address, amount_in: U256, amount_out: U256) {
        let key = pair_key(asset_in, asset_out);
        if let Some(mut pool) = self.pools.get_mut(&key) {
            if asset_in == key.0 {
                pool.reserve0 += amount_in;
                pool.reserve1 -= amount_out;
            } else {
                pool.reserve1 += amount_in;
                pool.reserve0 -= amount_out;
            }
        }
    }
}

#[async_trait]
impl MarketRouter for AmmRouter {
    async fn quote_amounts_in(
        &self,
        path: &[Address],
        amount_out: U256,
    ) -> Result<U256, RouterError> {
        self.amounts_in(path, amount_out).map(|amounts| amounts[0])
    }

    async fn swap_for_exact_output(
        &self,
        path: &[Address],
        amount_out: U256,
        amount_in_max: U256,
        recipient: Address,
    ) -> Result<U256, RouterError> {
        let amounts = self.amounts_in(path, amount_out)?;
        let amount_in = amounts[0];
        if amount_in > amount_in_max {
            return Err(RouterError::ExcessiveInputAmount {
                required: amount_in,
                max: amount_in_max,
            });
        }

        self.bank
            .transfer(path[0], recipient, self.account, amount_in)?;
        self.bank
            .transfer(path[path.len() - 1], self.account, recipient, amount_out)?;
        for i in 0..path.len() - 1 {
            self.apply_hop(path[i], path[i + 1], amounts[i], amounts[i + 1]);
        }

        debug!(
            amount_in = %amount_in,
            amount_out = %amount_out,
            hops = path.len() - 1,
            recipient = %recipient,
            "exact-output swap executed"
        );
        Ok(amount_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: Address = Address::repeat_byte(0xC1);
    const MUSD: Address = Address::repeat_byte(0xD1);
    const WETH: Address = Address::repeat_byte(0xE1);

    fn setup() -> (Arc<AssetBank>, AmmRouter, Address) {
        let bank = Arc::new(AssetBank::new());
        let router = AmmRouter::new(bank.clone(), Address::repeat_byte(0xAA));
        let market_maker = Address::repeat_byte(0xBB);
        (bank, router, market_maker)
    }

    fn seed_flat_pool(bank: &AssetBank, router: &AmmRouter, provider: Address) {
        bank.mint(USDC, provider, U256::from(1_000_000u64));
        bank.mint(MUSD, provider, U256::from(1_000_000u64));
        router
            .add_liquidity(
                USDC,
                MUSD,
                U256::from(1_000_000u64),
                U256::from(1_000_000u64),
                provider,
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_single_hop_quote() {
        let (bank, router, market_maker) = setup();
        seed_flat_pool(&bank, &router, market_maker);

        // 1_000_000 * 50_000 * 1000 / (950_000 * 997) + 1
        let quote = router
            .quote_amounts_in(&[USDC, MUSD], U256::from(50_000u64))
            .await
            .unwrap();
        assert_eq!(quote, U256::from(52_790u64));
    }

    #[tokio::test]
    async fn test_multi_hop_quote_composes_single_hops() {
        let (bank, router, market_maker) = setup();
        seed_flat_pool(&bank, &router, market_maker);
        bank.mint(WETH, market_maker, U256::from(10_000u64));
        bank.mint(USDC, market_maker, U256::from(9_000_000u64));
        router
            .add_liquidity(
                WETH,
                USDC,
                U256::from(10_000u64),
                U256::from(9_000_000u64),
                market_maker,
            )
            .unwrap();

        let amount_out = U256::from(50_000u64);
        let usdc_leg = router
            .quote_amounts_in(&[USDC, MUSD], amount_out)
            .await
            .unwrap();
        let weth_leg = router
            .quote_amounts_in(&[WETH, USDC], usdc_leg)
            .await
            .unwrap();
        let full = router
            .quote_amounts_in(&[WETH, USDC, MUSD], amount_out)
            .await
            .unwrap();
        assert_eq!(full, weth_leg);
    }

    #[tokio::test]
    async fn test_quote_rejects_bad_requests() {
        let (bank, router, market_maker) = setup();
        seed_flat_pool(&bank, &router, market_maker);

        assert!(matches!(
            router.quote_amounts_in(&[USDC], U256::from(1u64)).await,
            Err(RouterError::InvalidPath)
        ));
        assert!(matches!(
            router.quote_amounts_in(&[USDC, MUSD], U256::ZERO).await,
            Err(RouterError::ZeroAmount)
        ));
        assert!(matches!(
            router.quote_amounts_in(&[WETH, MUSD], U256::from(1u64)).await,
            Err(RouterError::UnknownPair(_, _))
        ));
        // Cannot drain the entire output reserve.
        assert!(matches!(
            router
                .quote_amounts_in(&[USDC, MUSD], U256::from(1_000_000u64))
                .await,
            Err(RouterError::InsufficientLiquidity { .. })
        ));
    }

    #[tokio::test]
    async fn test_swap_settles_and_moves_reserves() {
        let (bank, router, market_maker) = setup();
        seed_flat_pool(&bank, &router, market_maker);

        let trader = Address::repeat_byte(0xCC);
        bank.mint(USDC, trader, U256::from(60_000u64));

        let spent = router
            .swap_for_exact_output(
                &[USDC, MUSD],
                U256::from(50_000u64),
                U256::from(60_000u64),
                trader,
            )
            .await
            .unwrap();
        assert_eq!(spent, U256::from(52_790u64));
        assert_eq!(bank.balance_of(USDC, trader), U256::from(7_210u64));
        assert_eq!(bank.balance_of(MUSD, trader), U256::from(50_000u64));

        let (usdc_reserve, musd_reserve) = router.reserves(USDC, MUSD).unwrap();
        assert_eq!(usdc_reserve, U256::from(1_052_790u64));
        assert_eq!(musd_reserve, U256::from(950_000u64));
    }

    #[tokio::test]
    async fn test_swap_respects_input_bound() {
        let (bank, router, market_maker) = setup();
        seed_flat_pool(&bank, &router, market_maker);

        let trader = Address::repeat_byte(0xCC);
        bank.mint(USDC, trader, U256::from(60_000u64));

        let err = router
            .swap_for_exact_output(
                &[USDC, MUSD],
                U256::from(50_000u64),
                U256::from(52_789u64),
                trader,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RouterError::ExcessiveInputAmount {
                required, max
            } if required == U256::from(52_790u64) && max == U256::from(52_789u64)
        ));

        // The rejected swap left balances and reserves untouched.
        assert_eq!(bank.balance_of(USDC, trader), U256::from(60_000u64));
        let (usdc_reserve, musd_reserve) = router.reserves(USDC, MUSD).unwrap();
        assert_eq!(usdc_reserve, U256::from(1_000_000u64));
        assert_eq!(musd_reserve, U256::from(1_000_000u64));
    }
}
