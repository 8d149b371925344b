//! # Sub-Strategy Pallet
//!
//! Generic lifecycle for sub-strategies: each instance owns one position in one
//! external yield venue and presents the same deposit / withdraw / harvest /
//! valuation surface to the controller.
//!
//! ## Overview
//!
//! A strategy is created by its owner against a venue handle. While `Active` it
//! accepts capital from the controller (and top-ups from its owner), enforcing
//! its own deposit and withdraw slippage tolerances against what the venue
//! reports. `emergency_withdraw` pulls everything out of the venue back into
//! base form and moves the strategy to `EmergencyExited`; the recovered capital
//! stays on the strategy account as un-swept idle and remains withdrawable.
//!
//! The protocol-specific part (how capital is supplied to a lending market or
//! an LP pool) lives behind [`YieldVenueApi`].
//!
//! ## Key Invariants
//!
//! 1. **Read-only valuation**: `total_assets` never mutates state
//! 2. **One-way exit**: `EmergencyExited` never returns to `Active`
//! 3. **Bounded loss**: every venue entry or exit is checked against the
//!    strategy's slippage tolerance

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_venue;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_venue::MockYieldVenue;

#[cfg(test)]
mod mock;

use frame_support::storage::with_storage_layer;
use frame_support::traits::fungibles::{Inspect, Mutate};
use frame_support::traits::tokens::Preservation;
use frame_support::traits::Get;
use sp_runtime::traits::{AccountIdConversion, Zero};
use sp_runtime::DispatchError;
use yield_primitives::{math, StrategyId, SubStrategyApi, VenueId};

// =============================================================================
//                              Traits
// =============================================================================

/// An external yield venue (lending market, LP pool, staking contract).
///
/// Implementations encapsulate the venue's calling convention. All amounts are
/// in base-asset units; `holder` is the strategy's sovereign account.
pub trait YieldVenueApi<AccountId, AssetId> {
    type Balance;

    /// Move `amount` of base asset from `holder` into the venue.
    ///
    /// Returns the base-asset value credited to the position.
    fn supply(venue: VenueId, holder: &AccountId, amount: Self::Balance) -> Result<Self::Balance, DispatchError>;

    /// Exit `value` of the position back to `holder` as base asset.
    ///
    /// Returns the base asset actually realised.
    fn redeem(venue: VenueId, holder: &AccountId, value: Self::Balance) -> Result<Self::Balance, DispatchError>;

    /// Exit the whole position regardless of liquidity limits.
    fn redeem_all(venue: VenueId, holder: &AccountId) -> Result<Self::Balance, DispatchError>;

    /// Current value of the position, including accrued but unclaimed interest.
    fn position_value(venue: VenueId, holder: &AccountId) -> Self::Balance;

    /// Largest value `redeem` can currently honour.
    fn max_redeemable(venue: VenueId, holder: &AccountId) -> Self::Balance;

    /// Claim `token` rewards accrued to `holder`. Returns the amount received.
    fn claim_reward(venue: VenueId, holder: &AccountId, token: AssetId) -> Result<Self::Balance, DispatchError>;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_support::PalletId;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::Saturating;
    use yield_primitives::{BasisPoints, MAX_BPS};

    // =========================================================================
    //                                  Types
    // =========================================================================

    /// Lifecycle state of a sub-strategy
    #[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen, Default)]
    pub enum StrategyStatus {
        /// Accepting and deploying capital
        #[default]
        Active,
        /// Capital pulled out of the venue; only withdrawals remain
        EmergencyExited,
    }

    /// Per-strategy configuration and un-swept balance
    #[derive(Encode, Decode, Clone, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    #[scale_info(skip_type_params(T))]
    pub struct StrategyInfo<T: Config> {
        /// Account allowed to configure, top up and exit the strategy
        pub owner: T::AccountId,
        /// External venue the position lives in
        pub venue: VenueId,
        pub status: StrategyStatus,
        /// Tolerated loss when entering the venue
        pub deposit_slippage_bps: BasisPoints,
        /// Tolerated loss when exiting the venue
        pub withdraw_slippage_bps: BasisPoints,
        /// Tokens `harvest` claims
        pub reward_tokens: BoundedVec<T::AssetId, T::MaxRewardTokens>,
        /// Base asset held by the strategy account outside the venue
        pub idle: T::Balance,
    }

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
        type AssetId: Parameter + Member + Copy + Default + MaxEncodedLen;

        /// Fungibles implementation for base asset and reward token transfers
        type Assets: Mutate<Self::AccountId, AssetId = Self::AssetId, Balance = Self::Balance>
            + Inspect<Self::AccountId>;

        /// Base asset every strategy accounts in
        #[pallet::constant]
        type BaseAssetId: Get<Self::AssetId>;

        /// Seed for strategy sovereign accounts
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Maximum reward tokens per strategy
        #[pallet::constant]
        type MaxRewardTokens: Get<u32>;

        /// Slippage tolerance given to new strategies
        #[pallet::constant]
        type DefaultSlippageBps: Get<BasisPoints>;

        /// The external venue adapter
        type Venue: YieldVenueApi<Self::AccountId, Self::AssetId, Balance = Self::Balance>;

        /// Weight info for this pallet
        type WeightInfo: WeightInfo;
    }

    /// Weight info trait
    pub trait WeightInfo {
        fn create_strategy() -> Weight;
        fn set_slippage() -> Weight;
        fn add_reward_token() -> Weight;
        fn owner_deposit() -> Weight;
        fn emergency_withdraw() -> Weight;
    }

    impl WeightInfo for () {
        fn create_strategy() -> Weight {
            Weight::from_parts(20_000, 0)
        }
        fn set_slippage() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn add_reward_token() -> Weight {
            Weight::from_parts(15_000, 0)
        }
        fn owner_deposit() -> Weight {
            Weight::from_parts(60_000, 0)
        }
        fn emergency_withdraw() -> Weight {
            Weight::from_parts(80_000, 0)
        }
    }

    // =========================================================================
    //                                  Storage
    // =========================================================================

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Next strategy ID
    #[pallet::storage]
    #[pallet::getter(fn next_strategy_id)]
    pub type NextStrategyId<T: Config> = StorageValue<_, StrategyId, ValueQuery>;

    /// Strategy configuration by ID
    #[pallet::storage]
    #[pallet::getter(fn strategies)]
    pub type Strategies<T: Config> = StorageMap<_, Blake2_128Concat, StrategyId, StrategyInfo<T>, OptionQuery>;

    // =========================================================================
    //                                  Events
    // =========================================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Strategy created. [strategy, owner, venue]
        StrategyCreated { strategy: StrategyId, owner: T::AccountId, venue: VenueId },
        /// Deposit slippage tolerance updated.
        DepositSlippageSet { strategy: StrategyId, bps: BasisPoints },
        /// Withdraw slippage tolerance updated.
        WithdrawSlippageSet { strategy: StrategyId, bps: BasisPoints },
        /// Reward token registered for harvesting.
        RewardTokenAdded { strategy: StrategyId, token: T::AssetId },
        /// Capital supplied to the venue. [strategy, amount, credited]
        Deposited { strategy: StrategyId, amount: T::Balance, credited: T::Balance },
        /// Owner topped up the strategy outside the controller's routing.
        OwnerDeposited { strategy: StrategyId, owner: T::AccountId, amount: T::Balance },
        /// Capital withdrawn. [strategy, requested, delivered]
        Withdrawn { strategy: StrategyId, requested: T::Balance, delivered: T::Balance },
        /// Reward claimed from the venue.
        RewardClaimed { strategy: StrategyId, token: T::AssetId, amount: T::Balance },
        /// Harvest proceeds credited back.
        Reinvested { strategy: StrategyId, amount: T::Balance },
        /// Position fully exited. [strategy, recovered]
        EmergencyWithdrawn { strategy: StrategyId, recovered: T::Balance },
    }

    // =========================================================================
    //                                  Errors
    // =========================================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Strategy does not exist.
        StrategyNotFound,
        /// Caller is not the strategy owner.
        NotOwner,
        /// Strategy has been emergency-exited.
        StrategyNotActive,
        /// Slippage above 100%.
        InvalidSlippage,
        /// Reward token already registered.
        RewardTokenAlreadyAdded,
        /// Reward token list is full.
        TooManyRewardTokens,
        /// Amount must be > 0.
        ZeroAmount,
        /// Venue credited less than the deposit slippage tolerance allows.
        DepositSlippageExceeded,
        /// Venue returned less than the withdraw slippage tolerance allows.
        WithdrawSlippageExceeded,
        /// Requested more than the strategy can currently yield.
        NotWithdrawable,
        /// Strategy ID space exhausted.
        ArithmeticOverflow,
    }

    // =========================================================================
    //                                Extrinsics
    // =========================================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Create a strategy positioned in `venue`. The caller becomes its owner.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::create_strategy())]
        pub fn create_strategy(origin: OriginFor<T>, venue: VenueId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            let strategy = NextStrategyId::<T>::get();
            let next = strategy.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;

            let default_slippage = T::DefaultSlippageBps::get().min(MAX_BPS);
            Strategies::<T>::insert(
                strategy,
                StrategyInfo::<T> {
                    owner: who.clone(),
                    venue,
                    status: StrategyStatus::Active,
                    deposit_slippage_bps: default_slippage,
                    withdraw_slippage_bps: default_slippage,
                    reward_tokens: BoundedVec::default(),
                    idle: Zero::zero(),
                },
            );
            NextStrategyId::<T>::put(next);

            log::info!(
                target: "sub-strategy",
                "🌱 Strategy {} created on venue {}",
                strategy,
                venue
            );

            Self::deposit_event(Event::StrategyCreated { strategy, owner: who, venue });
            Ok(())
        }

        /// Set the tolerated loss when entering the venue.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::set_slippage())]
        pub fn set_deposit_slippage(origin: OriginFor<T>, strategy: StrategyId, bps: BasisPoints) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(bps <= MAX_BPS, Error::<T>::InvalidSlippage);

            Self::mutate_owned(strategy, &who, |info| {
                info.deposit_slippage_bps = bps;
                Ok(())
            })?;

            Self::deposit_event(Event::DepositSlippageSet { strategy, bps });
            Ok(())
        }

        /// Set the tolerated loss when exiting the venue.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::set_slippage())]
        pub fn set_withdraw_slippage(origin: OriginFor<T>, strategy: StrategyId, bps: BasisPoints) -> DispatchResult {
            let who = ensure_signed(origin)?;
            ensure!(bps <= MAX_BPS, Error::<T>::InvalidSlippage);

            Self::mutate_owned(strategy, &who, |info| {
                info.withdraw_slippage_bps = bps;
                Ok(())
            })?;

            Self::deposit_event(Event::WithdrawSlippageSet { strategy, bps });
            Ok(())
        }

        /// Register a token that `harvest` should claim.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::add_reward_token())]
        pub fn add_reward_token(origin: OriginFor<T>, strategy: StrategyId, token: T::AssetId) -> DispatchResult {
            let who = ensure_signed(origin)?;

            Self::mutate_owned(strategy, &who, |info| {
                ensure!(!info.reward_tokens.contains(&token), Error::<T>::RewardTokenAlreadyAdded);
                info.reward_tokens
                    .try_push(token)
                    .map_err(|_| Error::<T>::TooManyRewardTokens)?;
                Ok(())
            })?;

            Self::deposit_event(Event::RewardTokenAdded { strategy, token });
            Ok(())
        }

        /// Top up the strategy from the owner's own base-asset balance.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::owner_deposit())]
        pub fn owner_deposit(origin: OriginFor<T>, strategy: StrategyId, amount: T::Balance) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;
            ensure!(info.owner == who, Error::<T>::NotOwner);

            Self::do_deposit(strategy, &who, amount)?;

            Self::deposit_event(Event::OwnerDeposited { strategy, owner: who, amount });
            Ok(())
        }

        /// Pull the whole position out of the venue. One-way.
        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::emergency_withdraw())]
        pub fn emergency_withdraw(origin: OriginFor<T>, strategy: StrategyId) -> DispatchResult {
            let who = ensure_signed(origin)?;
            let mut info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;
            ensure!(info.owner == who, Error::<T>::NotOwner);
            ensure!(info.status == StrategyStatus::Active, Error::<T>::StrategyNotActive);

            let account = Self::strategy_account(strategy);
            let value_before = T::Venue::position_value(info.venue, &account);
            let recovered = T::Venue::redeem_all(info.venue, &account)?;

            let floor = math::min_after_slippage(value_before.into(), info.withdraw_slippage_bps);
            ensure!(recovered.into() >= floor, Error::<T>::WithdrawSlippageExceeded);

            info.idle = info.idle.saturating_add(recovered);
            info.status = StrategyStatus::EmergencyExited;
            Strategies::<T>::insert(strategy, info);

            log::warn!(
                target: "sub-strategy",
                "🚨 Strategy {} emergency exited: position {} recovered {}",
                strategy,
                value_before.into(),
                recovered.into()
            );

            Self::deposit_event(Event::EmergencyWithdrawn { strategy, recovered });
            Ok(())
        }
    }

    // =========================================================================
    //                           Internal Functions
    // =========================================================================

    impl<T: Config> Pallet<T> {
        /// Sovereign account holding a strategy's base asset and rewards
        pub fn strategy_account(strategy: StrategyId) -> T::AccountId {
            T::PalletId::get().into_sub_account_truncating(strategy)
        }

        fn mutate_owned(
            strategy: StrategyId,
            who: &T::AccountId,
            f: impl FnOnce(&mut StrategyInfo<T>) -> DispatchResult,
        ) -> DispatchResult {
            Strategies::<T>::try_mutate(strategy, |maybe_info| {
                let info = maybe_info.as_mut().ok_or(Error::<T>::StrategyNotFound)?;
                ensure!(&info.owner == who, Error::<T>::NotOwner);
                f(info)
            })
        }

        /// Current redeemable value: un-swept idle plus the venue position
        pub fn total_assets_of(strategy: StrategyId) -> T::Balance {
            match Strategies::<T>::get(strategy) {
                Some(info) => {
                    let account = Self::strategy_account(strategy);
                    info.idle.saturating_add(T::Venue::position_value(info.venue, &account))
                }
                None => Zero::zero(),
            }
        }

        /// Value that can be withdrawn right now
        pub fn withdrawable_of(strategy: StrategyId) -> T::Balance {
            match Strategies::<T>::get(strategy) {
                Some(info) => {
                    let account = Self::strategy_account(strategy);
                    let position = T::Venue::position_value(info.venue, &account);
                    let liquid = T::Venue::max_redeemable(info.venue, &account).min(position);
                    info.idle.saturating_add(liquid)
                }
                None => Zero::zero(),
            }
        }

        /// Move `amount` from `from` into the strategy and supply it to the venue.
        pub fn do_deposit(strategy: StrategyId, from: &T::AccountId, amount: T::Balance) -> DispatchResult {
            ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);
            let info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;
            ensure!(info.status == StrategyStatus::Active, Error::<T>::StrategyNotActive);

            let account = Self::strategy_account(strategy);
            T::Assets::transfer(T::BaseAssetId::get(), from, &account, amount, Preservation::Expendable)?;

            let credited = T::Venue::supply(info.venue, &account, amount)?;
            let floor = math::min_after_slippage(amount.into(), info.deposit_slippage_bps);
            ensure!(credited.into() >= floor, Error::<T>::DepositSlippageExceeded);

            log::debug!(
                target: "sub-strategy",
                "Strategy {} supplied {} to venue {}, credited {}",
                strategy,
                amount.into(),
                info.venue,
                credited.into()
            );

            Self::deposit_event(Event::Deposited { strategy, amount, credited });
            Ok(())
        }

        /// Exit `amount` of value, idle first, and send the proceeds to `to`.
        pub fn do_withdraw(
            strategy: StrategyId,
            to: &T::AccountId,
            amount: T::Balance,
        ) -> Result<T::Balance, DispatchError> {
            ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);
            let mut info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;
            ensure!(amount <= Self::withdrawable_of(strategy), Error::<T>::NotWithdrawable);

            let account = Self::strategy_account(strategy);
            let from_idle = info.idle.min(amount);
            let from_venue = amount.saturating_sub(from_idle);

            let realised = if from_venue.is_zero() {
                Zero::zero()
            } else {
                T::Venue::redeem(info.venue, &account, from_venue)?
            };
            let floor = math::min_after_slippage(from_venue.into(), info.withdraw_slippage_bps);
            ensure!(realised.into() >= floor, Error::<T>::WithdrawSlippageExceeded);

            let delivered = from_idle.saturating_add(realised);
            info.idle = info.idle.saturating_sub(from_idle);
            Strategies::<T>::insert(strategy, info);

            if !delivered.is_zero() {
                T::Assets::transfer(T::BaseAssetId::get(), &account, to, delivered, Preservation::Expendable)?;
            }

            Self::deposit_event(Event::Withdrawn { strategy, requested: amount, delivered });
            Ok(delivered)
        }

        /// Claim reward `token` into `to`. Unregistered tokens are never claimed.
        pub fn do_harvest(strategy: StrategyId, to: &T::AccountId, token: T::AssetId) -> Result<T::Balance, DispatchError> {
            let info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;
            if !info.reward_tokens.contains(&token) {
                log::debug!(target: "sub-strategy", "Strategy {} has no reward token {:?}", strategy, token);
                return Ok(Zero::zero());
            }

            let account = Self::strategy_account(strategy);
            let amount = T::Venue::claim_reward(info.venue, &account, token)?;
            if amount.is_zero() {
                return Ok(amount);
            }
            T::Assets::transfer(token, &account, to, amount, Preservation::Expendable)?;

            Self::deposit_event(Event::RewardClaimed { strategy, token, amount });
            Ok(amount)
        }

        /// Credit harvest proceeds. Exited strategies keep them as idle.
        pub fn do_reinvest(strategy: StrategyId, from: &T::AccountId, amount: T::Balance) -> DispatchResult {
            if amount.is_zero() {
                return Ok(());
            }
            let info = Strategies::<T>::get(strategy).ok_or(Error::<T>::StrategyNotFound)?;

            match info.status {
                StrategyStatus::Active => Self::do_deposit(strategy, from, amount)?,
                StrategyStatus::EmergencyExited => {
                    let account = Self::strategy_account(strategy);
                    T::Assets::transfer(T::BaseAssetId::get(), from, &account, amount, Preservation::Expendable)?;
                    Strategies::<T>::mutate(strategy, |maybe_info| {
                        if let Some(info) = maybe_info {
                            info.idle = info.idle.saturating_add(amount);
                        }
                    });
                }
            }

            Self::deposit_event(Event::Reinvested { strategy, amount });
            Ok(())
        }
    }
}

// =============================================================================
//                       SubStrategyApi Implementation
// =============================================================================

impl<T: Config> SubStrategyApi<T::AccountId, T::AssetId> for Pallet<T> {
    type Balance = T::Balance;

    fn exists(strategy: StrategyId) -> bool {
        Strategies::<T>::contains_key(strategy)
    }

    fn is_active(strategy: StrategyId) -> bool {
        Strategies::<T>::get(strategy)
            .map(|info| info.status == StrategyStatus::Active)
            .unwrap_or(false)
    }

    fn deposit(strategy: StrategyId, from: &T::AccountId, amount: Self::Balance) -> Result<(), DispatchError> {
        with_storage_layer(|| Pallet::<T>::do_deposit(strategy, from, amount))
    }

    fn withdraw(strategy: StrategyId, to: &T::AccountId, amount: Self::Balance) -> Result<Self::Balance, DispatchError> {
        with_storage_layer(|| Pallet::<T>::do_withdraw(strategy, to, amount))
    }

    fn withdrawable(strategy: StrategyId) -> Self::Balance {
        Pallet::<T>::withdrawable_of(strategy)
    }

    fn total_assets(strategy: StrategyId) -> Self::Balance {
        Pallet::<T>::total_assets_of(strategy)
    }

    fn harvest(strategy: StrategyId, to: &T::AccountId, token: T::AssetId) -> Result<Self::Balance, DispatchError> {
        with_storage_layer(|| Pallet::<T>::do_harvest(strategy, to, token))
    }

    fn reinvest(strategy: StrategyId, from: &T::AccountId, amount: Self::Balance) -> Result<(), DispatchError> {
        with_storage_layer(|| Pallet::<T>::do_reinvest(strategy, from, amount))
    }
}
