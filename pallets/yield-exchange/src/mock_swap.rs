//! # Mock Swap Venue
//!
//! [`SwapVenueApi`] for test runtimes. The input token is parked on a pot account
//! and the output token is minted to the holder at a configurable rate
//! (1:1 unless set). State lives in unhashed runtime storage so it rolls back
//! with the surrounding transaction.

use crate::{Config, RouterInfo, SwapVenueApi};
use alloc::vec::Vec;
use codec::Encode;
use frame_support::storage::unhashed;
use frame_support::traits::fungibles::Mutate;
use frame_support::traits::tokens::Preservation;
use frame_support::PalletId;
use sp_runtime::traits::AccountIdConversion;
use sp_runtime::DispatchError;
use yield_primitives::math::{mul_div, Rounding};
use yield_primitives::{PathKey, VenueId};

const PREFIX: &[u8] = b":mock_swap_venue:";
const POT: PalletId = PalletId(*b"mockswap");

fn key(tag: &[u8], sub: &[u8]) -> Vec<u8> {
    (PREFIX, tag, sub).encode()
}

/// Price `asset_in -> asset_out` at `numerator / denominator`.
pub fn set_rate<AssetId: Encode>(asset_in: AssetId, asset_out: AssetId, numerator: u128, denominator: u128) {
    unhashed::put(&key(b"rate", &(asset_in, asset_out).encode()), &(numerator, denominator));
}

/// Make every swap on `venue` fail.
pub fn set_halted(venue: VenueId, halted: bool) {
    let key = key(b"halted", &venue.encode());
    if halted {
        unhashed::put(&key, &true);
    } else {
        unhashed::kill(&key);
    }
}

/// Report `amount` more output than is actually delivered.
pub fn set_overreport(amount: u128) {
    unhashed::put(&key(b"overreport", &[]), &amount);
}

pub struct MockSwapVenue<T>(core::marker::PhantomData<T>);

impl<T: Config> MockSwapVenue<T> {
    /// Account that absorbs every swapped input
    pub fn pot() -> T::AccountId {
        POT.into_account_truncating()
    }
}

impl<T: Config> SwapVenueApi<T::AccountId, T::AssetId> for MockSwapVenue<T>
where
    T::Assets: Mutate<T::AccountId>,
{
    type Balance = T::Balance;

    fn swap(
        router: &RouterInfo,
        path: &PathKey<T::AssetId>,
        holder: &T::AccountId,
        amount_in: T::Balance,
    ) -> Result<T::Balance, DispatchError> {
        if unhashed::get::<bool>(&key(b"halted", &router.venue.encode())).unwrap_or(false) {
            return Err(DispatchError::Other("MockSwapVenue: venue halted"));
        }

        let asset_in = *path.asset_in().ok_or(DispatchError::Other("MockSwapVenue: empty path"))?;
        let asset_out = *path.asset_out().ok_or(DispatchError::Other("MockSwapVenue: empty path"))?;

        let (numerator, denominator) =
            unhashed::get::<(u128, u128)>(&key(b"rate", &(asset_in, asset_out).encode())).unwrap_or((1, 1));
        let amount_out = mul_div(amount_in.into(), numerator, denominator, Rounding::Floor)
            .map_err(DispatchError::Arithmetic)?;

        T::Assets::transfer(asset_in, holder, &Self::pot(), amount_in, Preservation::Expendable)?;
        if amount_out > 0 {
            T::Assets::mint_into(asset_out, holder, amount_out.into())?;
        }

        let overreport = unhashed::get::<u128>(&key(b"overreport", &[])).unwrap_or(0);

        log::info!(
            target: "yield-exchange",
            "🔧 [MOCK] Venue {} swapped {} -> {}",
            router.venue,
            amount_in.into(),
            amount_out
        );
        Ok(amount_out.saturating_add(overreport).into())
    }
}
