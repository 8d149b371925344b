//! # Mock Yield Venue
//!
//! In-memory [`YieldVenueApi`] for test runtimes. Supplied capital is parked on a
//! per-venue pot account and positions live in unhashed runtime storage, so a
//! failed call rolls the venue back together with everything else.
//!
//! Knobs:
//! - `set_supply_loss_bps` / `set_redeem_loss_bps`: haircut applied on entry / exit
//! - `set_redeem_cap`: liquidity limit reported by `max_redeemable`
//! - `set_pending_reward`: reward minted to the next claimer of a token
//! - `MockYieldVenue::accrue`: interest credited to a position

use crate::{Config, YieldVenueApi};
use alloc::vec::Vec;
use codec::Encode;
use frame_support::storage::unhashed;
use frame_support::traits::fungibles::Mutate;
use frame_support::traits::tokens::Preservation;
use frame_support::traits::Get;
use sp_runtime::traits::AccountIdConversion;
use sp_runtime::DispatchError;
use yield_primitives::{math, BasisPoints, VenueId};

const PREFIX: &[u8] = b":mock_yield_venue:";

fn key(tag: &[u8], venue: VenueId, sub: &[u8]) -> Vec<u8> {
    (PREFIX, tag, venue, sub).encode()
}

fn read(tag: &[u8], venue: VenueId, sub: &[u8]) -> Option<u128> {
    unhashed::get::<u128>(&key(tag, venue, sub))
}

fn write(tag: &[u8], venue: VenueId, sub: &[u8], value: Option<u128>) {
    match value {
        Some(value) => unhashed::put(&key(tag, venue, sub), &value),
        None => unhashed::kill(&key(tag, venue, sub)),
    }
}

pub fn set_supply_loss_bps(venue: VenueId, bps: BasisPoints) {
    write(b"supply_loss", venue, &[], Some(bps as u128));
}

pub fn set_redeem_loss_bps(venue: VenueId, bps: BasisPoints) {
    write(b"redeem_loss", venue, &[], Some(bps as u128));
}

/// `None` removes the cap.
pub fn set_redeem_cap(venue: VenueId, cap: Option<u128>) {
    write(b"redeem_cap", venue, &[], cap);
}

pub fn set_pending_reward<AssetId: Encode>(venue: VenueId, token: AssetId, amount: u128) {
    write(b"reward", venue, &token.encode(), Some(amount));
}

fn position(venue: VenueId, holder: &[u8]) -> u128 {
    read(b"position", venue, holder).unwrap_or(0)
}

fn set_position(venue: VenueId, holder: &[u8], value: u128) {
    write(b"position", venue, holder, (value > 0).then_some(value));
}

fn haircut(tag: &[u8], venue: VenueId, amount: u128) -> u128 {
    let bps = read(tag, venue, &[]).unwrap_or(0);
    math::bps_of(amount, bps as BasisPoints)
}

pub struct MockYieldVenue<T>(core::marker::PhantomData<T>);

impl<T: Config> MockYieldVenue<T> {
    /// Account holding everything supplied to `venue`
    pub fn pot(venue: VenueId) -> T::AccountId {
        T::PalletId::get().into_sub_account_truncating((*b"venu", venue))
    }

    /// Credit `amount` of interest to `holder`'s position, backed by freshly minted base asset.
    pub fn accrue(venue: VenueId, holder: &T::AccountId, amount: u128) -> Result<(), DispatchError> {
        T::Assets::mint_into(T::BaseAssetId::get(), &Self::pot(venue), amount.into())?;
        let holder = holder.encode();
        set_position(venue, &holder, position(venue, &holder).saturating_add(amount));
        Ok(())
    }

    fn pay_out(venue: VenueId, holder: &T::AccountId, value: u128) -> Result<T::Balance, DispatchError> {
        let key = holder.encode();
        let current = position(venue, &key);
        if value > current {
            return Err(DispatchError::Other("MockYieldVenue: position too small"));
        }
        set_position(venue, &key, current - value);

        let realised = value.saturating_sub(haircut(b"redeem_loss", venue, value));
        if realised > 0 {
            T::Assets::transfer(
                T::BaseAssetId::get(),
                &Self::pot(venue),
                holder,
                realised.into(),
                Preservation::Expendable,
            )?;
        }
        Ok(realised.into())
    }
}

impl<T: Config> YieldVenueApi<T::AccountId, T::AssetId> for MockYieldVenue<T> {
    type Balance = T::Balance;

    fn supply(venue: VenueId, holder: &T::AccountId, amount: T::Balance) -> Result<T::Balance, DispatchError> {
        let amount_u128: u128 = amount.into();
        T::Assets::transfer(T::BaseAssetId::get(), holder, &Self::pot(venue), amount, Preservation::Expendable)?;

        let credited = amount_u128.saturating_sub(haircut(b"supply_loss", venue, amount_u128));
        let key = holder.encode();
        set_position(venue, &key, position(venue, &key).saturating_add(credited));

        log::info!(
            target: "sub-strategy",
            "🔧 [MOCK] Venue {} supplied {}, credited {}",
            venue,
            amount_u128,
            credited
        );
        Ok(credited.into())
    }

    fn redeem(venue: VenueId, holder: &T::AccountId, value: T::Balance) -> Result<T::Balance, DispatchError> {
        Self::pay_out(venue, holder, value.into())
    }

    fn redeem_all(venue: VenueId, holder: &T::AccountId) -> Result<T::Balance, DispatchError> {
        let value = position(venue, &holder.encode());
        Self::pay_out(venue, holder, value)
    }

    fn position_value(venue: VenueId, holder: &T::AccountId) -> T::Balance {
        position(venue, &holder.encode()).into()
    }

    fn max_redeemable(venue: VenueId, holder: &T::AccountId) -> T::Balance {
        let value = position(venue, &holder.encode());
        read(b"redeem_cap", venue, &[]).map_or(value, |cap| value.min(cap)).into()
    }

    fn claim_reward(venue: VenueId, holder: &T::AccountId, token: T::AssetId) -> Result<T::Balance, DispatchError> {
        let token_key = token.encode();
        let amount = read(b"reward", venue, &token_key).unwrap_or(0);
        if amount > 0 {
            write(b"reward", venue, &token_key, None);
            T::Assets::mint_into(token, holder, amount.into())?;
        }
        Ok(amount.into())
    }
}
