//! # Yield Controller Pallet
//!
//! Capital allocation and harvest routing for the yield vault.
//!
//! ## Overview
//!
//! The controller owns the registry of sub-strategies. Each registry entry pairs
//! a strategy with an allocation weight (`alloc_point`); a separate permutation
//! of registry indices (`ApySort`) defines the order withdrawals drain
//! strategies in.
//!
//! - **Fan-out**: capital the vault hands over is split across eligible
//!   strategies (registered, non-zero weight, still active) in proportion to
//!   their weights. With nothing eligible the capital stays with the vault.
//! - **Withdrawal pull**: `ApySort` is walked in order, taking
//!   `min(remaining, withdrawable)` from each strategy. A strategy whose exit
//!   breaches its slippage tolerance is skipped. Running out of strategies
//!   before the request is covered fails the whole call.
//! - **Rebalance**: `move_fund` exits one strategy and re-deposits the proceeds
//!   into another. Round-trip slippage is accepted.
//! - **Harvest**: for each selected strategy, the reward token the route starts
//!   from is claimed, routed through the exchange registry into the base asset
//!   and reinvested net of a treasury fee. Other reward tokens stay pending for
//!   a harvest along their own route. One failing strategy, or total proceeds
//!   below the caller's minimum, reverts the whole harvest.
//!
//! ## Registry Invariants
//!
//! 1. Indices are append-only and stable
//! 2. A strategy is registered at most once
//! 3. `TotalAllocPoint` equals the sum of registered weights
//! 4. `ApySort` is always a permutation of `0..SubStrategyLength`

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(test)]
mod mock;

use alloc::vec::Vec;
use frame_support::storage::with_storage_layer;
use frame_support::traits::fungibles::Mutate;
use frame_support::traits::tokens::Preservation;
use frame_support::traits::Get;
use sp_runtime::traits::{AccountIdConversion, Zero};
use sp_runtime::DispatchError;
use yield_primitives::{math, ControllerApi, ExchangeApi, StrategyIndex, SubStrategyApi, VaultInspect};

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_support::PalletId;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::Saturating;
    use yield_primitives::{BasisPoints, PathIndex, RouterId, StrategyId};

    // =========================================================================
    //                                  Types
    // =========================================================================

    /// One registry entry
    #[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
    pub struct SubStrategyInfo {
        pub strategy: StrategyId,
        /// Allocation weight
        pub alloc_point: u32,
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
        type AssetId: Parameter + Member + Copy + MaxEncodedLen;

        /// Fungibles implementation used for treasury fee transfers
        type Assets: Mutate<Self::AccountId, AssetId = Self::AssetId, Balance = Self::Balance>;

        /// Pallet ID for the controller account that holds rewards in flight
        #[pallet::constant]
        type PalletId: Get<PalletId>;

        /// Origin allowed to manage the registry and fees
        type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Origin allowed to trigger harvests
        type HarvestOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// The vault whose capital is managed
        type Vault: VaultInspect<Self::AccountId, Self::AssetId>;

        /// Sub-strategy lifecycle
        type SubStrategies: SubStrategyApi<Self::AccountId, Self::AssetId, Balance = Self::Balance>;

        /// Exchange registry used to route rewards
        type Exchange: ExchangeApi<Self::AccountId, Self::AssetId, Balance = Self::Balance>;

        /// Maximum registered sub-strategies
        #[pallet::constant]
        type MaxSubStrategies: Get<u32>;

        /// Upper bound for the harvest fee
        #[pallet::constant]
        type MaxHarvestFee: Get<BasisPoints>;

        /// Weight info for this pallet
        type WeightInfo: WeightInfo;
    }

    /// Weight info trait
    pub trait WeightInfo {
        fn register_sub_strategy() -> Weight;
        fn set_config() -> Weight;
        fn set_apy_sort(n: u32) -> Weight;
        fn move_fund() -> Weight;
        fn harvest(n: u32) -> Weight;
    }

    impl WeightInfo for () {
        fn register_sub_strategy() -> Weight {
            Weight::from_parts(30_000, 0)
        }
        fn set_config() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn set_apy_sort(n: u32) -> Weight {
            Weight::from_parts(10_000, 0).saturating_add(Weight::from_parts(2_000, 0).saturating_mul(n as u64))
        }
        fn move_fund() -> Weight {
            Weight::from_parts(150_000, 0)
        }
        fn harvest(n: u32) -> Weight {
            Weight::from_parts(50_000, 0).saturating_add(Weight::from_parts(200_000, 0).saturating_mul(n as u64))
        }
    }

    // =========================================================================
    //                                  Storage
    // =========================================================================

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Registry entries by index
    #[pallet::storage]
    #[pallet::getter(fn registry)]
    pub type Registry<T: Config> = StorageMap<_, Twox64Concat, StrategyIndex, SubStrategyInfo, OptionQuery>;

    /// Registry index of each registered strategy
    #[pallet::storage]
    #[pallet::getter(fn index_of)]
    pub type RegisteredIndex<T: Config> = StorageMap<_, Twox64Concat, StrategyId, StrategyIndex, OptionQuery>;

    /// Number of registry entries
    #[pallet::storage]
    #[pallet::getter(fn sub_strategy_length)]
    pub type SubStrategyLength<T: Config> = StorageValue<_, u32, ValueQuery>;

    /// Sum of registered allocation weights
    #[pallet::storage]
    #[pallet::getter(fn total_alloc_point)]
    pub type TotalAllocPoint<T: Config> = StorageValue<_, u32, ValueQuery>;

    /// Withdrawal priority: a permutation of registry indices
    #[pallet::storage]
    #[pallet::getter(fn apy_sort)]
    pub type ApySort<T: Config> = StorageValue<_, BoundedVec<StrategyIndex, T::MaxSubStrategies>, ValueQuery>;

    /// Harvest fee recipient
    #[pallet::storage]
    #[pallet::getter(fn treasury)]
    pub type Treasury<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

    /// Share of harvest proceeds sent to the treasury
    #[pallet::storage]
    #[pallet::getter(fn harvest_fee_bps)]
    pub type HarvestFeeBps<T: Config> = StorageValue<_, BasisPoints, ValueQuery>;

    /// Reentrancy lock
    #[pallet::storage]
    pub type Locked<T: Config> = StorageValue<_, bool, ValueQuery>;

    // =========================================================================
    //                                  Genesis
    // =========================================================================

    #[pallet::genesis_config]
    #[derive(frame_support::DefaultNoBound)]
    pub struct GenesisConfig<T: Config> {
        pub treasury: Option<T::AccountId>,
        pub harvest_fee_bps: BasisPoints,
    }

    #[pallet::genesis_build]
    impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
        fn build(&self) {
            assert!(self.harvest_fee_bps <= T::MaxHarvestFee::get(), "Harvest fee above MaxHarvestFee");

            if let Some(treasury) = &self.treasury {
                Treasury::<T>::put(treasury);
            }
            HarvestFeeBps::<T>::put(self.harvest_fee_bps);
        }
    }

    // =========================================================================
    //                                  Events
    // =========================================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Strategy appended to the registry. [index, strategy, alloc_point]
        SubStrategyRegistered { index: StrategyIndex, strategy: StrategyId, alloc_point: u32 },
        AllocPointSet { index: StrategyIndex, alloc_point: u32 },
        /// Withdrawal priority replaced.
        ApySortSet { order: Vec<StrategyIndex> },
        /// Vault capital fanned out to strategies.
        FundsAllocated { amount: T::Balance },
        /// Liquidity pulled back to the vault. [requested, delivered]
        FundsWithdrawn { requested: T::Balance, delivered: T::Balance },
        /// Capital moved between strategies. [from, to, amount, moved]
        FundMoved { from: StrategyIndex, to: StrategyIndex, amount: T::Balance, moved: T::Balance },
        /// Rewards routed and reinvested. [index, reward, proceeds, fee]
        Harvested { index: StrategyIndex, reward: T::Balance, proceeds: T::Balance, fee: T::Balance },
        /// Strategy had no reward in the route's input token.
        HarvestSkipped { index: StrategyIndex },
        TreasurySet { treasury: T::AccountId },
        HarvestFeeSet { bps: BasisPoints },
    }

    // =========================================================================
    //                                  Errors
    // =========================================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Strategy does not exist.
        UnknownSubStrategy,
        /// Strategy is already in the registry.
        AlreadyRegistered,
        /// Registry is full.
        TooManySubStrategies,
        /// No registry entry at this index.
        InvalidSubStrategyIndex,
        /// Order is not a permutation of the registry indices.
        InvalidApySort,
        /// Source strategy cannot yield the requested amount.
        NotWithdrawableAmountFrom,
        /// Strategies could not cover the withdrawal.
        InsufficientLiquidity,
        /// Source and destination are the same entry.
        SameSubStrategy,
        /// Amount must be > 0.
        ZeroAmount,
        /// Fee above `MaxHarvestFee`.
        FeeTooHigh,
        /// More harvest targets than registry entries allow.
        TooManyHarvestTargets,
        /// Entry point re-entered while locked.
        Reentrancy,
        /// Harvest routes returned less base asset than the caller's minimum.
        HarvestProceedsTooLow,
        /// Arithmetic overflow.
        ArithmeticOverflow,
    }

    // =========================================================================
    //                                Extrinsics
    // =========================================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Append `strategy` to the registry with weight `alloc_point`.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::register_sub_strategy())]
        pub fn register_sub_strategy(origin: OriginFor<T>, strategy: StrategyId, alloc_point: u32) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(T::SubStrategies::exists(strategy), Error::<T>::UnknownSubStrategy);
            ensure!(!RegisteredIndex::<T>::contains_key(strategy), Error::<T>::AlreadyRegistered);

            let index = SubStrategyLength::<T>::get();
            let total = TotalAllocPoint::<T>::get()
                .checked_add(alloc_point)
                .ok_or(Error::<T>::ArithmeticOverflow)?;
            ApySort::<T>::try_append(index).map_err(|_| Error::<T>::TooManySubStrategies)?;

            Registry::<T>::insert(index, SubStrategyInfo { strategy, alloc_point });
            RegisteredIndex::<T>::insert(strategy, index);
            SubStrategyLength::<T>::put(index.saturating_add(1));
            TotalAllocPoint::<T>::put(total);

            log::info!(
                target: "yield-controller",
                "📋 Strategy {} registered at index {} with {} alloc points",
                strategy,
                index,
                alloc_point
            );

            Self::deposit_event(Event::SubStrategyRegistered { index, strategy, alloc_point });
            Ok(())
        }

        /// Change the allocation weight of registry entry `index`.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_alloc_point(origin: OriginFor<T>, index: StrategyIndex, alloc_point: u32) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;

            Registry::<T>::try_mutate(index, |maybe_info| -> DispatchResult {
                let info = maybe_info.as_mut().ok_or(Error::<T>::InvalidSubStrategyIndex)?;
                let total = TotalAllocPoint::<T>::get()
                    .saturating_sub(info.alloc_point)
                    .checked_add(alloc_point)
                    .ok_or(Error::<T>::ArithmeticOverflow)?;
                TotalAllocPoint::<T>::put(total);
                info.alloc_point = alloc_point;
                Ok(())
            })?;

            Self::deposit_event(Event::AllocPointSet { index, alloc_point });
            Ok(())
        }

        /// Replace the withdrawal priority order.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::set_apy_sort(new_order.len() as u32))]
        pub fn set_apy_sort(origin: OriginFor<T>, new_order: Vec<StrategyIndex>) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;

            let length = SubStrategyLength::<T>::get();
            ensure!(new_order.len() == length as usize, Error::<T>::InvalidApySort);
            ensure!(Self::is_permutation(&new_order, length), Error::<T>::InvalidApySort);

            let bounded: BoundedVec<StrategyIndex, T::MaxSubStrategies> =
                new_order.clone().try_into().map_err(|_| Error::<T>::InvalidApySort)?;
            ApySort::<T>::put(bounded);

            Self::deposit_event(Event::ApySortSet { order: new_order });
            Ok(())
        }

        /// Withdraw `amount` from entry `from` and deposit the proceeds into entry `to`.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::move_fund())]
        pub fn move_fund(
            origin: OriginFor<T>,
            from: StrategyIndex,
            to: StrategyIndex,
            amount: T::Balance,
        ) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            let _guard = EntryGuard::<T>::acquire()?;

            ensure!(from != to, Error::<T>::SameSubStrategy);
            ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);
            let source = Registry::<T>::get(from).ok_or(Error::<T>::InvalidSubStrategyIndex)?;
            let destination = Registry::<T>::get(to).ok_or(Error::<T>::InvalidSubStrategyIndex)?;
            ensure!(
                amount <= T::SubStrategies::withdrawable(source.strategy),
                Error::<T>::NotWithdrawableAmountFrom
            );

            let account = Self::account_id();
            let moved = T::SubStrategies::withdraw(source.strategy, &account, amount).map_err(|e| {
                log::warn!(
                    target: "yield-controller",
                    "⚠️ Index {} cannot release {}: {:?}",
                    from,
                    amount.into(),
                    e
                );
                Error::<T>::NotWithdrawableAmountFrom
            })?;
            if !moved.is_zero() {
                T::SubStrategies::deposit(destination.strategy, &account, moved)?;
            }

            log::info!(
                target: "yield-controller",
                "🔄 Moved {} from index {} to index {} ({} arrived)",
                amount.into(),
                from,
                to,
                moved.into()
            );

            Self::deposit_event(Event::FundMoved { from, to, amount, moved });
            Ok(())
        }

        /// Claim rewards from each listed strategy, route them into the base asset
        /// through `routers[i]`/`path_indices[i]` and reinvest the proceeds.
        ///
        /// Fails with `HarvestProceedsTooLow` when the route yields less than
        /// `min_proceeds` base asset over all strategies.
        #[pallet::call_index(4)]
        #[pallet::weight(T::WeightInfo::harvest(strategy_indices.len() as u32))]
        pub fn harvest(
            origin: OriginFor<T>,
            strategy_indices: Vec<StrategyIndex>,
            path_indices: Vec<PathIndex>,
            routers: Vec<RouterId>,
            min_proceeds: T::Balance,
        ) -> DispatchResult {
            T::HarvestOrigin::ensure_origin(origin)?;
            let _guard = EntryGuard::<T>::acquire()?;

            ensure!(
                strategy_indices.len() <= T::MaxSubStrategies::get() as usize,
                Error::<T>::TooManyHarvestTargets
            );
            let route = T::Exchange::resolve_route(&routers, &path_indices, T::Vault::base_asset())?;

            let mut proceeds: T::Balance = Zero::zero();
            for index in strategy_indices {
                proceeds = proceeds.saturating_add(Self::harvest_one(index, &route)?);
            }
            ensure!(proceeds >= min_proceeds, Error::<T>::HarvestProceedsTooLow);
            Ok(())
        }

        #[pallet::call_index(5)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_treasury(origin: OriginFor<T>, treasury: T::AccountId) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            Treasury::<T>::put(&treasury);
            Self::deposit_event(Event::TreasurySet { treasury });
            Ok(())
        }

        #[pallet::call_index(6)]
        #[pallet::weight(T::WeightInfo::set_config())]
        pub fn set_harvest_fee(origin: OriginFor<T>, bps: BasisPoints) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(bps <= T::MaxHarvestFee::get(), Error::<T>::FeeTooHigh);
            HarvestFeeBps::<T>::put(bps);
            Self::deposit_event(Event::HarvestFeeSet { bps });
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
        /// Account holding rewards and rebalanced capital in flight
        pub fn account_id() -> T::AccountId {
            T::PalletId::get().into_account_truncating()
        }

        fn is_permutation(order: &[StrategyIndex], length: u32) -> bool {
            let mut seen = alloc::vec![false; length as usize];
            for index in order.iter().copied() {
                match seen.get_mut(index as usize) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return false,
                }
            }
            true
        }

        /// Registry entries in index order
        pub fn entries() -> Vec<(StrategyIndex, SubStrategyInfo)> {
            (0..SubStrategyLength::<T>::get())
                .filter_map(|index| Registry::<T>::get(index).map(|info| (index, info)))
                .collect()
        }

        pub fn total_strategy_assets_of() -> T::Balance {
            Self::entries().into_iter().fold(Zero::zero(), |total: T::Balance, (_, info)| {
                total.saturating_add(T::SubStrategies::total_assets(info.strategy))
            })
        }

        /// Split `amount` held by the vault across eligible strategies.
        pub(crate) fn do_allocate(amount: T::Balance) -> Result<T::Balance, DispatchError> {
            if amount.is_zero() {
                return Ok(Zero::zero());
            }

            let eligible: Vec<SubStrategyInfo> = Self::entries()
                .into_iter()
                .map(|(_, info)| info)
                .filter(|info| info.alloc_point > 0 && T::SubStrategies::is_active(info.strategy))
                .collect();
            if eligible.is_empty() {
                log::debug!(target: "yield-controller", "No eligible strategy, capital stays idle");
                return Ok(Zero::zero());
            }

            let weights: Vec<u32> = eligible.iter().map(|info| info.alloc_point).collect();
            let parts = math::split_by_weight(amount.into(), &weights);
            let vault = T::Vault::vault_account();

            for (info, part) in eligible.iter().zip(parts) {
                if part == 0 {
                    continue;
                }
                T::SubStrategies::deposit(info.strategy, &vault, part.into())?;
                log::debug!(
                    target: "yield-controller",
                    "Allocated {} to strategy {}",
                    part,
                    info.strategy
                );
            }

            log::info!(
                target: "yield-controller",
                "📥 Allocated {} across {} strategies",
                amount.into(),
                eligible.len()
            );

            Self::deposit_event(Event::FundsAllocated { amount });
            Ok(amount)
        }

        /// Walk `ApySort` until `amount` of value has been pulled into the vault.
        pub(crate) fn do_request_withdraw(amount: T::Balance) -> Result<T::Balance, DispatchError> {
            if amount.is_zero() {
                return Ok(Zero::zero());
            }

            let vault = T::Vault::vault_account();
            let mut remaining = amount;
            let mut delivered: T::Balance = Zero::zero();

            for index in ApySort::<T>::get() {
                if remaining.is_zero() {
                    break;
                }
                let Some(info) = Registry::<T>::get(index) else { continue };

                let available = T::SubStrategies::withdrawable(info.strategy);
                if available.is_zero() {
                    continue;
                }
                let take = remaining.min(available);
                // The exit runs in its own storage layer, so a refused source leaves no writes.
                let received = match T::SubStrategies::withdraw(info.strategy, &vault, take) {
                    Ok(received) => received,
                    Err(e) => {
                        log::warn!(
                            target: "yield-controller",
                            "⚠️ Index {} refused to release {}: {:?}, trying the next source",
                            index,
                            take.into(),
                            e
                        );
                        continue;
                    }
                };

                log::debug!(
                    target: "yield-controller",
                    "Index {} yielded {} of {} requested",
                    index,
                    received.into(),
                    take.into()
                );

                delivered = delivered.saturating_add(received);
                remaining = remaining.saturating_sub(take);
            }

            ensure!(remaining.is_zero(), Error::<T>::InsufficientLiquidity);

            Self::deposit_event(Event::FundsWithdrawn { requested: amount, delivered });
            Ok(delivered)
        }

        /// Harvest one registry entry along an already validated route.
        ///
        /// Only the route's input token is claimed. Returns the base asset the
        /// route produced.
        fn harvest_one(
            index: StrategyIndex,
            route: &yield_primitives::SwapRoute<T::AssetId>,
        ) -> Result<T::Balance, DispatchError> {
            let info = Registry::<T>::get(index).ok_or(Error::<T>::InvalidSubStrategyIndex)?;
            let account = Self::account_id();

            let reward = T::SubStrategies::harvest(info.strategy, &account, route.asset_in)?;
            if reward.is_zero() {
                Self::deposit_event(Event::HarvestSkipped { index });
                return Ok(Zero::zero());
            }

            let proceeds = T::Exchange::execute_route(&account, route, reward)?;
            let fee = Self::charge_fee(&account, proceeds)?;
            let net = proceeds.saturating_sub(fee);
            T::SubStrategies::reinvest(info.strategy, &account, net)?;

            log::info!(
                target: "yield-controller",
                "🌾 Harvested index {}: {} reward -> {} base, fee {}",
                index,
                reward.into(),
                proceeds.into(),
                fee.into()
            );

            Self::deposit_event(Event::Harvested { index, reward, proceeds, fee });
            Ok(proceeds)
        }

        fn charge_fee(account: &T::AccountId, proceeds: T::Balance) -> Result<T::Balance, DispatchError> {
            let bps = HarvestFeeBps::<T>::get();
            if bps == 0 {
                return Ok(Zero::zero());
            }
            let Some(treasury) = Treasury::<T>::get() else {
                log::warn!(target: "yield-controller", "⚠️ Harvest fee skipped: no treasury set");
                return Ok(Zero::zero());
            };

            let fee: T::Balance = math::bps_of(proceeds.into(), bps).into();
            if !fee.is_zero() {
                T::Assets::transfer(T::Vault::base_asset(), account, &treasury, fee, Preservation::Expendable)?;
            }
            Ok(fee)
        }
    }
}

// =============================================================================
//                       ControllerApi Implementation
// =============================================================================

impl<T: Config> ControllerApi for Pallet<T> {
    type Balance = T::Balance;

    fn total_strategy_assets() -> Self::Balance {
        Pallet::<T>::total_strategy_assets_of()
    }

    fn allocate(amount: Self::Balance) -> Result<Self::Balance, DispatchError> {
        let _guard = EntryGuard::<T>::acquire()?;
        with_storage_layer(|| Pallet::<T>::do_allocate(amount))
    }

    fn request_withdraw(amount: Self::Balance) -> Result<Self::Balance, DispatchError> {
        let _guard = EntryGuard::<T>::acquire()?;
        with_storage_layer(|| Pallet::<T>::do_request_withdraw(amount))
    }
}
