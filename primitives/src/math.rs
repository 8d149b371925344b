//! Share and basis-point arithmetic.
//!
//! All conversions widen to 256 bits before dividing so that `u128` balances
//! never overflow in the intermediate product.

use alloc::vec::Vec;
use sp_core::U256;
use sp_runtime::ArithmeticError;

use crate::{BasisPoints, MAX_BPS};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// Safe multiplication then division with configurable rounding.
///
/// Computes: (value × numerator) / denominator
pub fn mul_div(
    value: u128,
    numerator: u128,
    denominator: u128,
    rounding: Rounding,
) -> Result<u128, ArithmeticError> {
    if denominator == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }

    let product = U256::from(value) * U256::from(numerator);
    let denom = U256::from(denominator);

    let result = match rounding {
        Rounding::Floor => product / denom,
        Rounding::Ceiling => {
            let (quotient, remainder) = product.div_mod(denom);
            if remainder.is_zero() {
                quotient
            } else {
                quotient + U256::one()
            }
        }
    };

    if result > U256::from(u128::MAX) {
        return Err(ArithmeticError::Overflow);
    }
    Ok(result.low_u128())
}

fn virtual_totals(
    total_assets: u128,
    total_shares: u128,
    decimals_offset: u8,
) -> Result<(u128, u128), ArithmeticError> {
    let offset = 10u128
        .checked_pow(decimals_offset as u32)
        .ok_or(ArithmeticError::Overflow)?;
    let virtual_shares = total_shares.checked_add(offset).ok_or(ArithmeticError::Overflow)?;
    let virtual_assets = total_assets.checked_add(1).ok_or(ArithmeticError::Overflow)?;
    Ok((virtual_assets, virtual_shares))
}

/// Convert assets to shares with virtual offset protection against inflation attacks.
///
/// Formula: shares = assets × (total_shares + 10^offset) / (total_assets + 1)
///
/// With a zero offset an empty vault mints 1:1.
pub fn convert_to_shares(
    assets: u128,
    total_assets: u128,
    total_shares: u128,
    decimals_offset: u8,
    rounding: Rounding,
) -> Result<u128, ArithmeticError> {
    let (virtual_assets, virtual_shares) = virtual_totals(total_assets, total_shares, decimals_offset)?;
    mul_div(assets, virtual_shares, virtual_assets, rounding)
}

/// Convert shares to assets with virtual offset protection.
///
/// Formula: assets = shares × (total_assets + 1) / (total_shares + 10^offset)
pub fn convert_to_assets(
    shares: u128,
    total_assets: u128,
    total_shares: u128,
    decimals_offset: u8,
    rounding: Rounding,
) -> Result<u128, ArithmeticError> {
    let (virtual_assets, virtual_shares) = virtual_totals(total_assets, total_shares, decimals_offset)?;
    mul_div(shares, virtual_assets, virtual_shares, rounding)
}

/// `amount × bps / 10_000`, rounded down.
pub fn bps_of(amount: u128, bps: BasisPoints) -> u128 {
    // bps is at most u32::MAX, so the product fits in 256 bits and the
    // quotient fits back into u128 whenever bps <= MAX_BPS.
    mul_div(amount, bps as u128, MAX_BPS as u128, Rounding::Floor).unwrap_or(u128::MAX)
}

/// Smallest outcome accepted for `amount` under a slippage tolerance.
pub fn min_after_slippage(amount: u128, slippage_bps: BasisPoints) -> u128 {
    amount.saturating_sub(bps_of(amount, slippage_bps.min(MAX_BPS)))
}

/// Split `amount` proportionally to `weights`, rounding each part down.
///
/// The rounding remainder goes to the first entry with a non-zero weight, so
/// the parts always sum to `amount`. Returns all zeros when every weight is zero.
pub fn split_by_weight(amount: u128, weights: &[u32]) -> Vec<u128> {
    let total: u128 = weights.iter().map(|w| *w as u128).sum();
    if total == 0 {
        return weights.iter().map(|_| 0).collect();
    }

    let mut parts: Vec<u128> = weights
        .iter()
        .map(|w| mul_div(amount, *w as u128, total, Rounding::Floor).unwrap_or(0))
        .collect();

    let assigned: u128 = parts.iter().sum();
    let dust = amount.saturating_sub(assigned);
    if let Some(first) = weights.iter().position(|w| *w > 0) {
        parts[first] = parts[first].saturating_add(dust);
    }
    parts
}
