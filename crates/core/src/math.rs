//! Fixed-point basis-point arithmetic on U256 amounts.
//!
//! Every decision path in the engine is integer math with explicit rounding
//! direction: slippage buffers round up so the tolerance is never
//! under-covered, fee shares round down with the remainder taken by
//! subtraction.

use alloy::primitives::U256;

/// Basis points denominator (10000 = 100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// 10^exp.
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `value * numerator / denominator`, rounding down.
#[inline(always)]
pub fn mul_div(value: U256, numerator: U256, denominator: U256) -> U256 {
    value * numerator / denominator
}

/// `value * numerator / denominator`, rounding up.
#[inline(always)]
pub fn mul_div_ceil(value: U256, numerator: U256, denominator: U256) -> U256 {
    let product = value * numerator;
    let floor = product / denominator;
    if floor * denominator == product {
        floor
    } else {
        floor + U256::from(1u64)
    }
}

/// Floor share of `amount` at `bps` basis points.
#[inline(always)]
pub fn bps_share(amount: U256, bps: u32) -> U256 {
    mul_div(amount, U256::from(bps), U256::from(BPS_DENOMINATOR))
}

/// `amount` grown by `bps` basis points, rounded up.
#[inline(always)]
pub fn bps_markup_ceil(amount: U256, bps: u32) -> U256 {
    mul_div_ceil(
        amount,
        U256::from(BPS_DENOMINATOR + bps as u64),
        U256::from(BPS_DENOMINATOR),
    )
}

/// Collateral value in debt-asset units at an oracle price with `decimals`
/// fractional digits. The division floors, so a vault is valued
/// conservatively.
#[inline(always)]
pub fn collateral_value(amount: U256, price: U256, decimals: u8) -> U256 {
    amount * price / pow10(decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_ceil_rounds_up_only_on_remainder() {
        let ten = U256::from(10u64);
        assert_eq!(mul_div_ceil(U256::from(100u64), ten, ten), U256::from(100u64));
        assert_eq!(
            mul_div_ceil(U256::from(101u64), U256::from(1u64), ten),
            U256::from(11u64)
        );
        assert_eq!(
            mul_div(U256::from(101u64), U256::from(1u64), ten),
            U256::from(10u64)
        );
    }

    #[test]
    fn test_bps_share_floors() {
        // 2% of 100
        assert_eq!(bps_share(U256::from(100u64), 200), U256::from(2u64));
        // 2% of 99 floors to 1
        assert_eq!(bps_share(U256::from(99u64), 200), U256::from(1u64));
        assert_eq!(bps_share(U256::from(100u64), 0), U256::ZERO);
    }

    #[test]
    fn test_bps_markup_ceil() {
        // Exact 2% markup
        assert_eq!(bps_markup_ceil(U256::from(1000u64), 200), U256::from(1020u64));
        // 999 * 1.02 = 1018.98, rounds up
        assert_eq!(bps_markup_ceil(U256::from(999u64), 200), U256::from(1019u64));
        // Zero slippage is the identity
        assert_eq!(bps_markup_ceil(U256::from(1000u64), 0), U256::from(1000u64));
    }

    #[test]
    fn test_collateral_value_scales_out_price_decimals() {
        let amount = pow10(18) * U256::from(100u64); // 100 units
        let price = U256::from(90_000_000_000u64); // 900.00000000
        let value = collateral_value(amount, price, 8);
        assert_eq!(value, pow10(18) * U256::from(90_000u64));
    }
}
