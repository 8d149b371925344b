//! # Yield Vault Pallet
//!
//! Single-asset vault that issues proportional shares and delegates every
//! non-buffer liquidity movement to the yield controller.
//!
//! ## Overview
//!
//! Depositors contribute the base asset and receive shares priced at
//! `total_assets / total_supply`, where
//! `total_assets = idle balance + Σ sub-strategy total assets`. A virtual offset
//! keeps the first depositor from inflating the share price.
//!
//! Deposited capital lands in the idle buffer. Whatever exceeds the configured
//! buffer target is offered to the controller, which fans it out to
//! sub-strategies (or leaves it idle when none is eligible).
//!
//! Withdrawals drain the idle buffer first and request any shortfall from the
//! controller. A shortfall the controller cannot cover fails the whole call.
//!
//! ## Rounding
//!
//! - Deposit: shares minted rounded down
//! - Withdraw: shares burned rounded up
//!
//! Both directions favour the vault, so rounding can never be used to extract
//! value from other shareholders.

#![cfg_attr(not(feature = "std"), no_std)]

pub use pallet::*;

#[cfg(test)]
mod mock;

use frame_support::traits::fungibles::{Inspect, Mutate};
use frame_support::traits::tokens::Preservation;
use frame_support::traits::Get;
use sp_runtime::traits::{AccountIdConversion, Zero};
use yield_primitives::math::{self, Rounding};
use yield_primitives::{ControllerApi, VaultInspect};

/// Number of shares `share_price` quotes a price for
pub const SHARE_PRICE_UNIT: u128 = 1_000_000_000_000;

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_support::PalletId;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::Saturating;
    use yield_primitives::{BasisPoints, MAX_BPS};

    // =========================================================================
    //                                  Config
    // =========================================================================

    #[pallet::config]
    pub trait Config: frame_system::Config {
        type RuntimeEvent: From<Event<Self>> + IsType<<Self as frame_system::Config>::RuntimeEvent>;

        /// Balance type
        type Balance: Parameter
            + Member
            + From<u128>
            + Into<u128>
            + Copy
            + Default
            + MaxEncodedLen
            + Zero
            + Ord
            + Saturating;

        /// Asset ID type
        type AssetId: Parameter + Member + Copy + MaxEncodedLen;

        /// Fungibles implementation holding the base asset
        type Assets: Mutate<Self::AccountId, AssetId = Self::AssetId, Balance = Self::Balance>;

        /// Asset the vault accounts in
        #[pallet::constant]
        type BaseAssetId: Get<Self::AssetId>;

        /// Pallet ID for the vault account
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Origin allowed to pause the vault and change its limits
        type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Allocation and withdrawal liquidity beyond the idle buffer
        type Controller: ControllerApi<Balance = Self::Balance>;

        /// Virtual share offset exponent (shares = 10^offset per asset unit when empty)
        #[pallet::constant]
        type DecimalsOffset: Get<u8>;

        /// Weight info for this pallet
        type WeightInfo: WeightInfo;
    }

    /// Weight info trait
    pub trait WeightInfo {
        fn deposit() -> Weight;
        fn withdraw() -> Weight;
        fn set_config() -> Weight;
        fn allocate_idle() -> Weight;
        fn transfer_shares() -> Weight;
    }

    impl WeightInfo for () {
        fn deposit() -> Weight {
            Weight::from_parts(80_000, 0)
        }
        fn withdraw() -> Weight {
            Weight::from_parts(100_000, 0)
        }
        fn set_config() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn allocate_idle() -> Weight {
            Weight::from_parts(60_000, 0)
        }
        fn transfer_shares() -> Weight {
            Weight::from_parts(20_000, 0)
        }
    }

    // =========================================================================
    //                                  Storage
    // =========================================================================

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    #[pallet::type_value]
    pub fn Unlimited<T: Config>() -> T::Balance {
        u128::MAX.into()
    }

    /// Outstanding shares
    #[pallet::storage]
    #[pallet::getter(fn total_supply)]
    pub type TotalSupply<T: Config> = StorageValue<_, T::Balance, ValueQuery>;

    /// Shares per holder
    #[pallet::storage]
    #[pallet::getter(fn shares)]
    pub type Shares<T: Config> = StorageMap<_, Blake2_128Concat, T::AccountId, T::Balance, ValueQuery>;

    /// Base asset held by the vault account and not yet allocated
    #[pallet::storage]
    #[pallet::getter(fn idle_balance)]
    pub type IdleBalance<T: Config> = StorageValue<_, T::Balance, ValueQuery>;

    #[pallet::storage]
    #[pallet::getter(fn is_paused)]
    pub type Paused<T: Config> = StorageValue<_, bool, ValueQuery>;

    /// Per-call deposit ceiling
    #[pallet::storage]
    #[pallet::getter(fn max_deposit)]
    pub type MaxDeposit<T: Config> = StorageValue<_, T::Balance, ValueQuery, Unlimited<T>>;

    /// Per-call withdraw ceiling
    #[pallet::storage]
    #[pallet::getter(fn max_withdraw)]
    pub type MaxWithdraw<T: Config> = StorageValue<_, T::Balance, ValueQuery, Unlimited<T>>;

    /// Fraction of total assets kept idle
    #[pallet::storage]
    #[pallet::getter(fn idle_buffer_bps)]
    pub type IdleBufferBps<T: Config> = StorageValue<_, BasisPoints, ValueQuery>;

    /// Reentrancy lock
    #[pallet::storage]
    pub type Locked<T: Config> = StorageValue<_, bool, ValueQuery>;

    // =========================================================================
    //                                  Genesis
    // =========================================================================

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        /// Per-call deposit ceiling, unlimited when `None`
        pub max_deposit: Option<u128>,
        /// Per-call withdraw ceiling, unlimited when `None`
        pub max_withdraw: Option<u128>,
        pub idle_buffer_bps: BasisPoints,
        #[serde(skip)]
        pub _phantom: core::marker::PhantomData<T>,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            assert!(self.idle_buffer_bps <= MAX_BPS, "Idle buffer above 100%");

            if let Some(cap) = self.max_deposit {
                MaxDeposit::<T>::put(T::Balance::from(cap));
            }
            if let Some(cap) = self.max_withdraw {
                MaxWithdraw::<T>::put(T::Balance::from(cap));
            }
            IdleBufferBps::<T>::put(self.idle_buffer_bps);
        }
    }

    // =========================================================================
    //                                  Events
    // =========================================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Base asset deposited. [who, receiver, assets, shares]
        Deposited { who: T::AccountId, receiver: T::AccountId, assets: T::Balance, shares: T::Balance },
        /// Base asset withdrawn. [who, receiver, assets, shares]
        Withdrawn { who: T::AccountId, receiver: T::AccountId, assets: T::Balance, shares: T::Balance },
        /// Deposits suspended.
        Paused,
        /// Deposits resumed.
        Resumed,
        MaxDepositSet { amount: T::Balance },
        MaxWithdrawSet { amount: T::Balance },
        IdleBufferSet { bps: BasisPoints },
        /// Idle capital handed to the controller.
        IdleAllocated { amount: T::Balance },
        SharesTransferred { from: T::AccountId, to: T::AccountId, shares: T::Balance },
    }

    // =========================================================================
    //                                  Errors
    // =========================================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Deposits are paused.
        VaultPaused,
        /// Amount is zero.
        ZeroAssets,
        /// Caller holds less base asset than the deposit amount.
        InsufficientAmount,
        /// Deposit above the per-call ceiling.
        ExceedOneTimeMaxDeposit,
        /// Withdraw above the per-call ceiling.
        ExceedOneTimeMaxWithdraw,
        /// Withdraw above the caller's redeemable balance.
        ExceedTotalDeposit,
        /// Deposit too small to mint a share.
        ZeroShares,
        /// Not enough shares.
        InsufficientShares,
        /// Idle buffer above 100%.
        InvalidBuffer,
        /// Entry point re-entered while locked.
        Reentrancy,
        /// Arithmetic overflow.
        ArithmeticOverflow,
    }

    // =========================================================================
    //                                Extrinsics
    // =========================================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Deposit `amount` of base asset and mint shares to `receiver`.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::deposit())]
        pub fn deposit(origin: OriginFor<T>, amount: T::Balance, receiver: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let _guard = EntryGuard::<T>::acquire()?;

            ensure!(!Paused::<T>::get(), Error::<T>::VaultPaused);
            ensure!(!amount.is_zero(), Error::<T>::ZeroAssets);
            ensure!(amount <= MaxDeposit::<T>::get(), Error::<T>::ExceedOneTimeMaxDeposit);
            ensure!(
                T::Assets::reducible_balance(
                    T::BaseAssetId::get(),
                    &who,
                    Preservation::Expendable,
                    frame_support::traits::tokens::Fortitude::Polite,
                ) >= amount,
                Error::<T>::InsufficientAmount
            );

            let shares = Self::convert_to_shares(amount, Rounding::Floor)?;
            ensure!(!shares.is_zero(), Error::<T>::ZeroShares);

            T::Assets::transfer(
                T::BaseAssetId::get(),
                &who,
                &Self::account_id(),
                amount,
                Preservation::Expendable,
            )?;
            IdleBalance::<T>::mutate(|idle| *idle = idle.saturating_add(amount));
            Self::mint_shares(&receiver, shares)?;

            log::info!(
                target: "yield-vault",
                "💰 Deposit of {} minted {} shares",
                amount.into(),
                shares.into()
            );

            Self::deposit_event(Event::Deposited { who, receiver, assets: amount, shares });

            // A controller that cannot take the excess leaves it idle.
            if let Err(e) = Self::allocate_excess_idle() {
                log::warn!(target: "yield-vault", "⚠️ Allocation after deposit failed: {:?}", e);
            }
            Ok(())
        }

        /// Withdraw `amount` of base asset to `receiver`, burning the caller's shares.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::withdraw())]
        pub fn withdraw(origin: OriginFor<T>, amount: T::Balance, receiver: T::AccountId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let _guard = EntryGuard::<T>::acquire()?;

            ensure!(!amount.is_zero(), Error::<T>::ZeroAssets);
            ensure!(amount <= MaxWithdraw::<T>::get(), Error::<T>::ExceedOneTimeMaxWithdraw);
            ensure!(amount <= Self::max_redeemable(&who), Error::<T>::ExceedTotalDeposit);

            let shares = Self::convert_to_shares(amount, Rounding::Ceiling)?;
            Self::burn_shares(&who, shares)?;

            let idle = IdleBalance::<T>::get();
            let available = if idle < amount {
                let shortfall = amount.saturating_sub(idle);
                let delivered = T::Controller::request_withdraw(shortfall)?;
                log::debug!(
                    target: "yield-vault",
                    "Idle {} short by {}, controller delivered {}",
                    idle.into(),
                    shortfall.into(),
                    delivered.into()
                );
                idle.saturating_add(delivered)
            } else {
                idle
            };
            let assets = available.min(amount);

            IdleBalance::<T>::put(available.saturating_sub(assets));
            T::Assets::transfer(
                T::BaseAssetId::get(),
                &Self::account_id(),
                &receiver,
                assets,
                Preservation::Expendable,
            )?;

            log::info!(
                target: "yield-vault",
                "💸 Withdrawal of {} burned {} shares",
                assets.into(),
                shares.into()
            );

            Self::deposit_event(Event::Withdrawn { who, receiver, assets, shares });
            Ok(())
        }

        /// Suspend deposits. Withdrawals stay open.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn pause(origin: OriginFor<T>) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            Paused::<T>::put(true);
            log::info!(target: "yield-vault", "⏸️ Vault paused");
            Self::deposit_event(Event::Paused);
            Ok(())
        }

        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn resume(origin: OriginFor<T>) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            Paused::<T>::put(false);
            log::info!(target: "yield-vault", "▶️ Vault resumed");
            Self::deposit_event(Event::Resumed);
            Ok(())
        }

        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_max_deposit(origin: OriginFor<T>, amount: T::Balance) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            MaxDeposit::<T>::put(amount);
            Self::deposit_event(Event::MaxDepositSet { amount });
            Ok(())
        }

        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_max_withdraw(origin: OriginFor<T>, amount: T::Balance) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            MaxWithdraw::<T>::put(amount);
            Self::deposit_event(Event::MaxWithdrawSet { amount });
            Ok(())
        }

        /// Set the fraction of total assets kept idle after each deposit.
        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_idle_buffer(origin: OriginFor<T>, bps: BasisPoints) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(bps <= MAX_BPS, Error::<T>::InvalidBuffer);
            IdleBufferBps::<T>::put(bps);
            Self::deposit_event(Event::IdleBufferSet { bps });
            Ok(())
        }

        /// Offer idle capital above the buffer target to the controller.
        #[pallet::call_index(7)]
        #[pallet::weight(T::WeightInfo::allocate_idle())]
        pub fn allocate_idle(origin: OriginFor<T>) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            let _guard = EntryGuard::<T>::acquire()?;
            Self::allocate_excess_idle()?;
            Ok(())
        }

        /// Move `shares` from the caller to `dest`.
        #[pallet::call_index(8)]
        #[pallet::weight(T::WeightInfo::transfer_shares())]
        pub fn transfer_shares(origin: OriginFor<T>, dest: T::AccountId, shares: T::Balance) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(!shares.is_zero(), Error::<T>::ZeroShares);

            Self::burn_from_holder(&who, shares)?;
            Shares::<T>::mutate(&dest, |balance| *balance = balance.saturating_add(shares));

            Self::deposit_event(Event::SharesTransferred { from: who, to: dest, shares });
            Ok(())
        }
    }

    // =========================================================================
    //                           Internal Functions
    // =========================================================================

    /// Holds the reentrancy lock until dropped.
    pub struct EntryGuard<T: Config>(core::marker::PhantomData<T>);

    impl<T: Config> EntryGuard<T> {
        pub fn acquire() -> Result<Self, Error<T>> {
            ensure!(!Locked::<T>::get(), Error::<T>::Reentrancy);
            Locked::<T>::put(true);
            Ok(Self(core::marker::PhantomData))
        }
    }

    impl<T: Config> Drop for EntryGuard<T> {
        fn drop(&mut self) {
            Locked::<T>::kill();
        }
    }

    impl<T: Config> Pallet<T> {
        /// Account holding the idle base asset
        pub fn account_id() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        /// Idle balance plus everything the controller has deployed
        pub fn total_assets() -> T::Balance {
            IdleBalance::<T>::get().saturating_add(T::Controller::total_strategy_assets())
        }

        pub fn convert_to_shares(assets: T::Balance, rounding: Rounding) -> Result<T::Balance, DispatchError> {
            let shares = math::convert_to_shares(
                assets.into(),
                Self::total_assets().into(),
                TotalSupply::<T>::get().into(),
                T::DecimalsOffset::get(),
                rounding,
            )
            .map_err(|_| Error::<T>::ArithmeticOverflow)?;
            Ok(shares.into())
        }

        pub fn convert_to_assets(shares: T::Balance, rounding: Rounding) -> Result<T::Balance, DispatchError> {
            let assets = math::convert_to_assets(
                shares.into(),
                Self::total_assets().into(),
                TotalSupply::<T>::get().into(),
                T::DecimalsOffset::get(),
                rounding,
            )
            .map_err(|_| Error::<T>::ArithmeticOverflow)?;
            Ok(assets.into())
        }

        /// Base asset `who` can withdraw right now
        pub fn max_redeemable(who: &T::AccountId) -> T::Balance {
            Self::convert_to_assets(Shares::<T>::get(who), Rounding::Floor).unwrap_or_else(|_| Zero::zero())
        }

        /// Assets per `SHARE_PRICE_UNIT` shares
        pub fn share_price() -> T::Balance {
            Self::convert_to_assets(SHARE_PRICE_UNIT.into(), Rounding::Floor).unwrap_or_else(|_| Zero::zero())
        }

        /// Shares a deposit of `assets` would mint now
        pub fn preview_deposit(assets: T::Balance) -> Result<T::Balance, DispatchError> {
            Self::convert_to_shares(assets, Rounding::Floor)
        }

        /// Shares a withdrawal of `assets` would burn now
        pub fn preview_withdraw(assets: T::Balance) -> Result<T::Balance, DispatchError> {
            Self::convert_to_shares(assets, Rounding::Ceiling)
        }

        fn mint_shares(to: &T::AccountId, shares: T::Balance) -> DispatchResult {
            let supply: u128 = TotalSupply::<T>::get().into();
            let new_supply = supply.checked_add(shares.into()).ok_or(Error::<T>::ArithmeticOverflow)?;
            TotalSupply::<T>::put(T::Balance::from(new_supply));
            Shares::<T>::mutate(to, |balance| *balance = balance.saturating_add(shares));
            Ok(())
        }

        fn burn_shares(from: &T::AccountId, shares: T::Balance) -> DispatchResult {
            Self::burn_from_holder(from, shares)?;
            TotalSupply::<T>::mutate(|supply| *supply = supply.saturating_sub(shares));
            Ok(())
        }

        fn burn_from_holder(from: &T::AccountId, shares: T::Balance) -> DispatchResult {
            Shares::<T>::try_mutate_exists(from, |maybe_balance| -> DispatchResult {
                let balance = maybe_balance.unwrap_or_default();
                ensure!(balance >= shares, Error::<T>::InsufficientShares);
                let remaining = balance.saturating_sub(shares);
                *maybe_balance = (!remaining.is_zero()).then_some(remaining);
                Ok(())
            })
        }

        /// Hand idle capital above the buffer target to the controller.
        pub(crate) fn allocate_excess_idle() -> DispatchResult {
            let idle = IdleBalance::<T>::get();
            let target: T::Balance =
                math::bps_of(Self::total_assets().into(), IdleBufferBps::<T>::get()).into();
            if idle <= target {
                return Ok(());
            }

            let taken = T::Controller::allocate(idle.saturating_sub(target))?;
            if taken.is_zero() {
                return Ok(());
            }
            IdleBalance::<T>::put(idle.saturating_sub(taken));

            log::info!(
                target: "yield-vault",
                "📤 Allocated {} idle to the controller",
                taken.into()
            );

            Self::deposit_event(Event::IdleAllocated { amount: taken });
            Ok(())
        }
    }
}

// =============================================================================
//                       VaultInspect Implementation
// =============================================================================

impl<T: Config> VaultInspect<T::AccountId, T::AssetId> for Pallet<T> {
    fn vault_account() -> T::AccountId {
        Pallet::<T>::account_id()
    }

    fn base_asset() -> T::AssetId {
        T::BaseAssetId::get()
    }
}

impl<T: Config> Pallet<T> {
    /// Base asset actually held by the vault account, including unsolicited transfers
    pub fn held_balance() -> T::Balance {
        T::Assets::balance(T::BaseAssetId::get(), &Pallet::<T>::account_id())
    }
}
