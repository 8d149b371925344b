//! Venue-specific swap path keys.
//!
//! A router adapter registers paths in the encoding its venue understands.
//! Whatever the encoding, every key resolves to one input token and one
//! output token, which is all the harvest chain needs to check continuity.

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use sp_core::ConstU32;
use sp_runtime::BoundedVec;

use crate::{PoolId, VenueKind, MAX_PATH_ASSETS};

/// Bounded list used for hop sequences, fee tiers and pool lists.
pub type PathVec<T> = BoundedVec<T, ConstU32<MAX_PATH_ASSETS>>;

/// Path registered with a router adapter.
#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode, DecodeWithMemTracking, TypeInfo, MaxEncodedLen)]
pub enum PathKey<AssetId> {
    /// Token hop sequence, e.g. `[CRV, WETH, USDC]`
    ConstantProduct { hops: PathVec<AssetId> },
    /// Token hop sequence with one fee tier (in hundredths of a bip) per hop
    ConcentratedLiquidity { hops: PathVec<AssetId>, fee_tiers: PathVec<u32> },
    /// Pool handle plus the coin indices to exchange between
    StableSwap { pool: PoolId, i: u8, j: u8, asset_in: AssetId, asset_out: AssetId },
    /// Batch swap: `pools[k]` swaps `assets[k]` into `assets[k + 1]`
    WeightedBatch { pools: PathVec<PoolId>, assets: PathVec<AssetId> },
}

/// Why a path key is malformed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathError {
    /// Fewer than two tokens
    TooShort,
    /// Two consecutive hops name the same token, or the path ends where it starts
    RepeatedAsset,
    /// Fee tier count is not one per hop
    FeeTierCount,
    /// Pool count is not one per hop
    PoolCount,
    /// Stable-swap path exchanges a coin index with itself
    SameCoinIndex,
}

impl<AssetId: PartialEq> PathKey<AssetId> {
    /// The venue family this key is encoded for
    pub fn kind(&self) -> VenueKind {
        match self {
            PathKey::ConstantProduct { .. } => VenueKind::ConstantProduct,
            PathKey::ConcentratedLiquidity { .. } => VenueKind::ConcentratedLiquidity,
            PathKey::StableSwap { .. } => VenueKind::StableSwap,
            PathKey::WeightedBatch { .. } => VenueKind::WeightedBatch,
        }
    }

    /// Token the path consumes
    pub fn asset_in(&self) -> Option<&AssetId> {
        match self {
            PathKey::ConstantProduct { hops } | PathKey::ConcentratedLiquidity { hops, .. } => hops.first(),
            PathKey::StableSwap { asset_in, .. } => Some(asset_in),
            PathKey::WeightedBatch { assets, .. } => assets.first(),
        }
    }

    /// Token the path produces
    pub fn asset_out(&self) -> Option<&AssetId> {
        match self {
            PathKey::ConstantProduct { hops } | PathKey::ConcentratedLiquidity { hops, .. } => hops.last(),
            PathKey::StableSwap { asset_out, .. } => Some(asset_out),
            PathKey::WeightedBatch { assets, .. } => assets.last(),
        }
    }

    /// Structural checks shared by every adapter.
    pub fn validate(&self) -> Result<(), PathError> {
        match self {
            PathKey::ConstantProduct { hops } => check_hops(hops),
            PathKey::ConcentratedLiquidity { hops, fee_tiers } => {
                check_hops(hops)?;
                if fee_tiers.len() + 1 != hops.len() {
                    return Err(PathError::FeeTierCount);
                }
                Ok(())
            }
            PathKey::StableSwap { i, j, asset_in, asset_out, .. } => {
                if i == j {
                    return Err(PathError::SameCoinIndex);
                }
                if asset_in == asset_out {
                    return Err(PathError::RepeatedAsset);
                }
                Ok(())
            }
            PathKey::WeightedBatch { pools, assets } => {
                check_hops(assets)?;
                if pools.len() + 1 != assets.len() {
                    return Err(PathError::PoolCount);
                }
                Ok(())
            }
        }
    }
}

fn check_hops<AssetId: PartialEq>(hops: &[AssetId]) -> Result<(), PathError> {
    if hops.len() < 2 {
        return Err(PathError::TooShort);
    }
    if hops.windows(2).any(|pair| pair[0] == pair[1]) || hops.first() == hops.last() {
        return Err(PathError::RepeatedAsset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded<T: Clone + core::fmt::Debug>(items: &[T]) -> PathVec<T> {
        PathVec::try_from(items.to_vec()).unwrap()
    }

    #[test]
    fn constant_product_endpoints() {
        let key = PathKey::ConstantProduct { hops: bounded(&[7u32, 2, 1]) };
        assert_eq!(key.validate(), Ok(()));
        assert_eq!(key.asset_in(), Some(&7));
        assert_eq!(key.asset_out(), Some(&1));
        assert_eq!(key.kind(), VenueKind::ConstantProduct);
    }

    #[test]
    fn single_token_path_is_rejected() {
        let key = PathKey::ConstantProduct { hops: bounded(&[7u32]) };
        assert_eq!(key.validate(), Err(PathError::TooShort));
    }

    #[test]
    fn repeated_hop_is_rejected() {
        let key = PathKey::ConstantProduct { hops: bounded(&[7u32, 7, 1]) };
        assert_eq!(key.validate(), Err(PathError::RepeatedAsset));

        let cycle = PathKey::ConstantProduct { hops: bounded(&[7u32, 2, 7]) };
        assert_eq!(cycle.validate(), Err(PathError::RepeatedAsset));
    }

    #[test]
    fn concentrated_liquidity_needs_one_fee_per_hop() {
        let good = PathKey::ConcentratedLiquidity { hops: bounded(&[7u32, 2, 1]), fee_tiers: bounded(&[3000, 500]) };
        assert_eq!(good.validate(), Ok(()));

        let bad = PathKey::ConcentratedLiquidity { hops: bounded(&[7u32, 2, 1]), fee_tiers: bounded(&[3000]) };
        assert_eq!(bad.validate(), Err(PathError::FeeTierCount));
    }

    #[test]
    fn stable_swap_coin_indices_must_differ() {
        let key = PathKey::StableSwap { pool: 3, i: 1, j: 1, asset_in: 2u32, asset_out: 1 };
        assert_eq!(key.validate(), Err(PathError::SameCoinIndex));

        let key = PathKey::StableSwap { pool: 3, i: 2, j: 1, asset_in: 2u32, asset_out: 1 };
        assert_eq!(key.validate(), Ok(()));
        assert_eq!(key.asset_in(), Some(&2));
    }

    #[test]
    fn weighted_batch_needs_one_pool_per_hop() {
        let good = PathKey::WeightedBatch { pools: bounded(&[11, 12]), assets: bounded(&[9u32, 2, 1]) };
        assert_eq!(good.validate(), Ok(()));
        assert_eq!(good.asset_out(), Some(&1));

        let bad = PathKey::WeightedBatch { pools: bounded(&[11]), assets: bounded(&[9u32, 2, 1]) };
        assert_eq!(bad.validate(), Err(PathError::PoolCount));
    }
}
