//! Yield Vault Shared Primitives
//!
//! Common types and cross-pallet interfaces used by the vault, controller,
//! exchange and sub-strategy pallets.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_runtime::DispatchError;

pub mod math;
pub mod route;

pub use route::{PathError, PathKey};

// ============================================================================
// Common ID Types
// ============================================================================

/// Sub-strategy identifier (one per yield source instance)
pub type StrategyId = u32;

/// Position of a sub-strategy in the controller registry
pub type StrategyIndex = u32;

/// Router adapter identifier
pub type RouterId = u32;

/// Stable handle of a registered swap path within one router adapter
pub type PathIndex = u32;

/// Handle of an external venue (lending market, LP pool, swap router)
pub type VenueId = u32;

/// Pool handle used by stable-swap and weighted-pool venues
pub type PoolId = u32;

/// Basis points (10_000 = 100%)
pub type BasisPoints = u32;

/// One hundred percent in basis points
pub const MAX_BPS: BasisPoints = 10_000;

/// Maximum number of assets in a single venue path (so at most 4 hops)
pub const MAX_PATH_ASSETS: u32 = 5;

// ============================================================================
// Venue Types
// ============================================================================

/// The swap venue family a router adapter speaks to.
///
/// Each family has its own path encoding, see [`PathKey`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Encode, Decode, DecodeWithMemTracking, TypeInfo, MaxEncodedLen)]
pub enum VenueKind {
    /// Constant-product AMM, routed over a token hop list
    ConstantProduct,
    /// Concentrated-liquidity AMM, routed over a hop list with one fee tier per hop
    ConcentratedLiquidity,
    /// Stable-swap pool addressed by pool handle and coin indices
    StableSwap,
    /// Weighted-pool batch swap over a pool list and an asset list
    WeightedBatch,
}

/// A validated swap chain: consecutive `(router, path)` pairs whose tokens line up.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SwapRoute<AssetId> {
    /// Token consumed by the first hop
    pub asset_in: AssetId,
    /// Token produced by the last hop
    pub asset_out: AssetId,
    /// Hops in execution order
    pub hops: Vec<(RouterId, PathIndex)>,
}

// ============================================================================
// Cross-pallet Interfaces
// ============================================================================

/// Read-only view of vault configuration for the controller.
pub trait VaultInspect<AccountId, AssetId> {
    /// Account holding the vault's idle base asset
    fn vault_account() -> AccountId;

    /// Base asset the vault accounts in
    fn base_asset() -> AssetId;
}

/// Interface the vault uses to move non-buffer liquidity.
pub trait ControllerApi {
    type Balance;

    /// Sum of `total_assets` over every registered sub-strategy.
    fn total_strategy_assets() -> Self::Balance;

    /// Push up to `amount` of base asset from the vault account into sub-strategies.
    ///
    /// Returns the amount actually taken from the vault. Zero means the capital
    /// stays idle (no eligible strategy).
    fn allocate(amount: Self::Balance) -> Result<Self::Balance, DispatchError>;

    /// Pull exactly `amount` of base-asset value out of sub-strategies into the
    /// vault account, walking the withdrawal priority order.
    ///
    /// Fails when the priority order is exhausted before `amount` is covered.
    /// Returns the base asset actually delivered, which can be below `amount`
    /// by at most the strategies' withdraw slippage.
    fn request_withdraw(amount: Self::Balance) -> Result<Self::Balance, DispatchError>;
}

/// Lifecycle contract every sub-strategy presents to the controller.
pub trait SubStrategyApi<AccountId, AssetId> {
    type Balance;

    /// Whether `strategy` has been created
    fn exists(strategy: StrategyId) -> bool;

    /// Whether `strategy` still accepts capital
    fn is_active(strategy: StrategyId) -> bool;

    /// Move `amount` of base asset from `from` into the strategy and supply it.
    fn deposit(strategy: StrategyId, from: &AccountId, amount: Self::Balance) -> Result<(), DispatchError>;

    /// Exit `amount` of base-asset value and send the proceeds to `to`.
    ///
    /// Returns the base asset delivered.
    fn withdraw(
        strategy: StrategyId,
        to: &AccountId,
        amount: Self::Balance,
    ) -> Result<Self::Balance, DispatchError>;

    /// Upper bound on the value that can be withdrawn right now.
    ///
    /// An exit of this size can still fail when the venue loses more than the
    /// strategy's withdraw slippage tolerance.
    fn withdrawable(strategy: StrategyId) -> Self::Balance;

    /// Current redeemable value in base-asset terms. Side-effect free.
    fn total_assets(strategy: StrategyId) -> Self::Balance;

    /// Claim the pending amount of reward `token` and send it to `to`.
    ///
    /// Returns zero when `token` is not registered with the strategy or nothing is
    /// claimable. Other reward tokens stay pending at the venue.
    fn harvest(strategy: StrategyId, to: &AccountId, token: AssetId) -> Result<Self::Balance, DispatchError>;

    /// Credit harvest proceeds held by `from` back into the strategy.
    fn reinvest(strategy: StrategyId, from: &AccountId, amount: Self::Balance) -> Result<(), DispatchError>;
}

/// Interface the controller uses to route harvested rewards.
pub trait ExchangeApi<AccountId, AssetId> {
    type Balance;

    /// Check that `routers[i]`/`path_indices[i]` form a listed, token-continuous
    /// chain ending in `asset_out`.
    fn resolve_route(
        routers: &[RouterId],
        path_indices: &[PathIndex],
        asset_out: AssetId,
    ) -> Result<SwapRoute<AssetId>, DispatchError>;

    /// Execute every hop of `route` in order on behalf of `holder`.
    ///
    /// Returns the amount of `route.asset_out` received.
    fn execute_route(
        holder: &AccountId,
        route: &SwapRoute<AssetId>,
        amount_in: Self::Balance,
    ) -> Result<Self::Balance, DispatchError>;
}
