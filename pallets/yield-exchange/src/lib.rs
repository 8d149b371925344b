//! # Yield Exchange Pallet
//!
//! Registry of swap router adapters and the multi-hop pipeline that turns
//! harvested reward tokens back into the base asset.
//!
//! ## Overview
//!
//! A router adapter speaks to one external swap venue of a given [`VenueKind`]
//! (constant-product AMM, concentrated-liquidity AMM, stable-swap pool or
//! weighted-pool batch swap). Each adapter keeps its own path registry: paths are
//! registered in the venue's native encoding ([`PathKey`]) and receive a stable
//! index in registration order. Re-registering a known path returns the existing
//! index.
//!
//! Listing is a separate capability. Only listed adapters can be addressed by a
//! harvest route, and the registry itself never picks an adapter: callers name
//! the `(router, path index)` pairs they want executed.
//!
//! ## Route Execution
//!
//! 1. Every hop's router must be listed and know the requested path index
//! 2. Each hop's output token must be the next hop's input token
//! 3. The last hop must produce the requested output asset
//! 4. Hops run strictly in the given order; any failure unwinds the whole route

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_swap;
#[cfg(any(test, feature = "test-utils"))]
pub use mock_swap::MockSwapVenue;

#[cfg(test)]
mod mock;

use alloc::vec::Vec;
use codec::{Decode, Encode, MaxEncodedLen};
use frame_support::storage::with_storage_layer;
use frame_support::traits::fungibles::Inspect;
use scale_info::TypeInfo;
use sp_runtime::traits::Zero;
use sp_runtime::{DispatchError, RuntimeDebug};
use yield_primitives::{ExchangeApi, PathIndex, PathKey, RouterId, SwapRoute, VenueId, VenueKind};

// =============================================================================
//                              Types
// =============================================================================

/// A router adapter: which venue family it speaks and which venue instance it targets
#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct RouterInfo {
    pub kind: VenueKind,
    pub venue: VenueId,
}

// =============================================================================
//                              Traits
// =============================================================================

/// Low-level call encoding for external swap venues.
///
/// Executes exactly one venue-native swap along `path` (a single hop, or a
/// venue-native multi-hop route such as a multi-fee-tier path). The input is
/// taken from `holder` and the output delivered back to `holder`. Amount bounds
/// are the caller's concern.
pub trait SwapVenueApi<AccountId, AssetId> {
    type Balance;

    fn swap(
        router: &RouterInfo,
        path: &PathKey<AssetId>,
        holder: &AccountId,
        amount_in: Self::Balance,
    ) -> Result<Self::Balance, DispatchError>;
}

#[frame_support::pallet]
pub mod pallet {
    use super::*;
    use frame_support::pallet_prelude::*;
    use frame_system::pallet_prelude::*;
    use sp_runtime::traits::Saturating;

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

        /// Balance lookups used to measure what each hop actually delivered
        type Assets: Inspect<Self::AccountId, AssetId = Self::AssetId, Balance = Self::Balance>;

        /// Origin allowed to add routers, list them and register paths
        type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

        /// Venue call encoding
        type SwapVenues: SwapVenueApi<Self::AccountId, Self::AssetId, Balance = Self::Balance>;

        /// Maximum hops in one route
        #[pallet::constant]
        type MaxRouteHops: Get<u32>;

        /// Maximum paths a single router can register
        #[pallet::constant]
        type MaxPathsPerRouter: Get<u32>;

        /// Weight info for this pallet
        type WeightInfo: WeightInfo;
    }

    /// Weight info trait
    pub trait WeightInfo {
        fn add_router() -> Weight;
        fn list_router() -> Weight;
        fn add_path() -> Weight;
    }

    impl WeightInfo for () {
        fn add_router() -> Weight {
            Weight::from_parts(15_000, 0)
        }
        fn list_router() -> Weight {
            Weight::from_parts(10_000, 0)
        }
        fn add_path() -> Weight {
            Weight::from_parts(25_000, 0)
        }
    }

    // =========================================================================
    //                                  Storage
    // =========================================================================

    #[pallet::pallet]
    pub struct Pallet<T>(_);

    /// Next router ID
    #[pallet::storage]
    #[pallet::getter(fn next_router_id)]
    pub type NextRouterId<T: Config> = StorageValue<_, RouterId, ValueQuery>;

    /// Router adapters by ID
    #[pallet::storage]
    #[pallet::getter(fn routers)]
    pub type Routers<T: Config> = StorageMap<_, Twox64Concat, RouterId, RouterInfo, OptionQuery>;

    /// Routers the controller may address during harvest
    #[pallet::storage]
    pub type ListedRouters<T: Config> = StorageMap<_, Twox64Concat, RouterId, (), OptionQuery>;

    /// Registered paths: router -> path index -> key
    #[pallet::storage]
    #[pallet::getter(fn paths)]
    pub type Paths<T: Config> =
        StorageDoubleMap<_, Twox64Concat, RouterId, Twox64Concat, PathIndex, PathKey<T::AssetId>, OptionQuery>;

    /// Reverse lookup: router -> key -> path index
    #[pallet::storage]
    pub type PathIndices<T: Config> =
        StorageDoubleMap<_, Twox64Concat, RouterId, Blake2_128Concat, PathKey<T::AssetId>, PathIndex, OptionQuery>;

    /// Number of paths registered per router
    #[pallet::storage]
    #[pallet::getter(fn path_count)]
    pub type PathCount<T: Config> = StorageMap<_, Twox64Concat, RouterId, u32, ValueQuery>;

    // =========================================================================
    //                                  Events
    // =========================================================================

    #[pallet::event]
    #[pallet::generate_deposit(pub(super) fn deposit_event)]
    pub enum Event<T: Config> {
        /// Router adapter added. [router, kind, venue]
        RouterAdded { router: RouterId, kind: VenueKind, venue: VenueId },
        /// Router made addressable by harvest routes.
        RouterListed { router: RouterId },
        /// Router removed from the harvest capability list.
        RouterDelisted { router: RouterId },
        /// Path registered. [router, path_index]
        PathAdded { router: RouterId, path_index: PathIndex },
        /// One hop executed. [router, path_index, amount_in, amount_out]
        Swapped { router: RouterId, path_index: PathIndex, amount_in: T::Balance, amount_out: T::Balance },
    }

    // =========================================================================
    //                                  Errors
    // =========================================================================

    #[pallet::error]
    pub enum Error<T> {
        /// Router does not exist.
        RouterNotFound,
        /// Router is not listed.
        RouterNotListed,
        /// Path encoding does not match the router's venue kind.
        PathKindMismatch,
        /// Path key is malformed.
        InvalidPath,
        /// Router path registry is full.
        TooManyPaths,
        /// Router has no path at this index.
        PathNotFound,
        /// Router and path index lists differ in length.
        RouteLengthMismatch,
        /// Route has no hops.
        EmptyRoute,
        /// Route has more hops than allowed.
        RouteTooLong,
        /// A hop's input token is not the previous hop's output token.
        RouteAssetMismatch,
        /// The route does not end in the requested asset.
        RouteOutputMismatch,
        /// Venue reported more output than the holder received.
        SwapOutputMismatch,
        /// Router ID space exhausted.
        ArithmeticOverflow,
    }

    // =========================================================================
    //                                Extrinsics
    // =========================================================================

    #[pallet::call]
    impl<T: Config> Pallet<T> {
        /// Add a router adapter for `venue`. The adapter starts unlisted.
        #[pallet::call_index(0)]
        #[pallet::weight(T::WeightInfo::add_router())]
        pub fn add_router(origin: OriginFor<T>, kind: VenueKind, venue: VenueId) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;

            let router = NextRouterId::<T>::get();
            let next = router.checked_add(1).ok_or(Error::<T>::ArithmeticOverflow)?;
            Routers::<T>::insert(router, RouterInfo { kind, venue });
            NextRouterId::<T>::put(next);

            log::info!(
                target: "yield-exchange",
                "🔀 Router {} added ({:?} on venue {})",
                router,
                kind,
                venue
            );

            Self::deposit_event(Event::RouterAdded { router, kind, venue });
            Ok(())
        }

        /// Allow harvest routes to address `router`. Listing twice is a no-op.
        #[pallet::call_index(1)]
        #[pallet::weight(T::WeightInfo::list_router())]
        pub fn list_router(origin: OriginFor<T>, router: RouterId) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(Routers::<T>::contains_key(router), Error::<T>::RouterNotFound);

            if ListedRouters::<T>::contains_key(router) {
                return Ok(());
            }
            ListedRouters::<T>::insert(router, ());

            Self::deposit_event(Event::RouterListed { router });
            Ok(())
        }

        /// Revoke `router`'s listing.
        #[pallet::call_index(2)]
        #[pallet::weight(T::WeightInfo::list_router())]
        pub fn delist_router(origin: OriginFor<T>, router: RouterId) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            ensure!(ListedRouters::<T>::contains_key(router), Error::<T>::RouterNotListed);

            ListedRouters::<T>::remove(router);

            Self::deposit_event(Event::RouterDelisted { router });
            Ok(())
        }

        /// Register `key` with `router`. A known key keeps its existing index.
        #[pallet::call_index(3)]
        #[pallet::weight(T::WeightInfo::add_path())]
        pub fn add_path(origin: OriginFor<T>, router: RouterId, key: PathKey<T::AssetId>) -> DispatchResult {
            T::AdminOrigin::ensure_origin(origin)?;
            Self::do_add_path(router, key)?;
            Ok(())
        }
    }

    // =========================================================================
    //                           Internal Functions
    // =========================================================================

    impl<T: Config> Pallet<T> {
        /// Register a path, returning its index.
        pub fn do_add_path(router: RouterId, key: PathKey<T::AssetId>) -> Result<PathIndex, DispatchError> {
            let info = Routers::<T>::get(router).ok_or(Error::<T>::RouterNotFound)?;
            ensure!(key.kind() == info.kind, Error::<T>::PathKindMismatch);
            key.validate().map_err(|_| Error::<T>::InvalidPath)?;

            if let Some(existing) = PathIndices::<T>::get(router, &key) {
                return Ok(existing);
            }

            let path_index = PathCount::<T>::get(router);
            ensure!(path_index < T::MaxPathsPerRouter::get(), Error::<T>::TooManyPaths);

            Paths::<T>::insert(router, path_index, &key);
            PathIndices::<T>::insert(router, &key, path_index);
            PathCount::<T>::insert(router, path_index.saturating_add(1));

            log::info!(
                target: "yield-exchange",
                "🛣️ Router {} registered path {}",
                router,
                path_index
            );

            Self::deposit_event(Event::PathAdded { router, path_index });
            Ok(path_index)
        }

        /// Index of `key` within `router`'s registry, if registered
        pub fn get_path_index(router: RouterId, key: &PathKey<T::AssetId>) -> Option<PathIndex> {
            PathIndices::<T>::get(router, key)
        }

        pub fn is_listed(router: RouterId) -> bool {
            ListedRouters::<T>::contains_key(router)
        }

        /// Run one adapter swap on behalf of `holder` and return what `holder` received.
        pub fn swap(
            router: RouterId,
            path_index: PathIndex,
            holder: &T::AccountId,
            amount_in: T::Balance,
        ) -> Result<T::Balance, DispatchError> {
            let info = Routers::<T>::get(router).ok_or(Error::<T>::RouterNotFound)?;
            let path = Paths::<T>::get(router, path_index).ok_or(Error::<T>::PathNotFound)?;
            let asset_out = *path.asset_out().ok_or(Error::<T>::InvalidPath)?;

            let before = T::Assets::balance(asset_out, holder);
            let reported = T::SwapVenues::swap(&info, &path, holder, amount_in)?;
            let received = T::Assets::balance(asset_out, holder).saturating_sub(before);
            ensure!(received >= reported, Error::<T>::SwapOutputMismatch);

            log::debug!(
                target: "yield-exchange",
                "Router {} path {}: {} in, {} out",
                router,
                path_index,
                amount_in.into(),
                received.into()
            );

            Self::deposit_event(Event::Swapped { router, path_index, amount_in, amount_out: received });
            Ok(received)
        }

        pub(crate) fn do_resolve_route(
            routers: &[RouterId],
            path_indices: &[PathIndex],
            asset_out: T::AssetId,
        ) -> Result<SwapRoute<T::AssetId>, DispatchError> {
            ensure!(routers.len() == path_indices.len(), Error::<T>::RouteLengthMismatch);
            ensure!(!routers.is_empty(), Error::<T>::EmptyRoute);
            ensure!(routers.len() <= T::MaxRouteHops::get() as usize, Error::<T>::RouteTooLong);

            let mut hops = Vec::with_capacity(routers.len());
            let mut first_in: Option<T::AssetId> = None;
            let mut previous_out: Option<T::AssetId> = None;

            for (router, path_index) in routers.iter().copied().zip(path_indices.iter().copied()) {
                ensure!(Self::is_listed(router), Error::<T>::RouterNotListed);
                let path = Paths::<T>::get(router, path_index).ok_or(Error::<T>::PathNotFound)?;
                let hop_in = *path.asset_in().ok_or(Error::<T>::InvalidPath)?;
                let hop_out = *path.asset_out().ok_or(Error::<T>::InvalidPath)?;

                match previous_out {
                    Some(expected) => ensure!(expected == hop_in, Error::<T>::RouteAssetMismatch),
                    None => first_in = Some(hop_in),
                }
                previous_out = Some(hop_out);
                hops.push((router, path_index));
            }

            let (asset_in, last_out) = first_in.zip(previous_out).ok_or(Error::<T>::EmptyRoute)?;
            ensure!(last_out == asset_out, Error::<T>::RouteOutputMismatch);

            Ok(SwapRoute { asset_in, asset_out, hops })
        }

        pub(crate) fn do_execute_route(
            holder: &T::AccountId,
            route: &SwapRoute<T::AssetId>,
            amount_in: T::Balance,
        ) -> Result<T::Balance, DispatchError> {
            let mut amount = amount_in;
            for (router, path_index) in route.hops.iter().copied() {
                ensure!(Self::is_listed(router), Error::<T>::RouterNotListed);
                amount = Self::swap(router, path_index, holder, amount)?;
            }
            Ok(amount)
        }
    }
}

// =============================================================================
//                       ExchangeApi Implementation
// =============================================================================

impl<T: Config> ExchangeApi<T::AccountId, T::AssetId> for Pallet<T> {
    type Balance = T::Balance;

    fn resolve_route(
        routers: &[RouterId],
        path_indices: &[PathIndex],
        asset_out: T::AssetId,
    ) -> Result<SwapRoute<T::AssetId>, DispatchError> {
        Pallet::<T>::do_resolve_route(routers, path_indices, asset_out)
    }

    fn execute_route(
        holder: &T::AccountId,
        route: &SwapRoute<T::AssetId>,
        amount_in: Self::Balance,
    ) -> Result<Self::Balance, DispatchError> {
        if amount_in.is_zero() {
            return Ok(Zero::zero());
        }
        with_storage_layer(|| Pallet::<T>::do_execute_route(holder, route, amount_in))
    }
}
