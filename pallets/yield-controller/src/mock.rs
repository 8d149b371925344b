use crate as pallet_yield_controller;
use frame_support::{
    construct_runtime, derive_impl, parameter_types,
    traits::{AsEnsureOriginWithArg, ConstU128, ConstU32, ConstU8},
    PalletId,
};
use frame_system::{EnsureRoot, EnsureSigned};
use sp_runtime::{traits::IdentityLookup, AccountId32, BuildStorage};

pub type AccountId = AccountId32;
pub type Balance = u128;
pub type AssetId = u32;

type Block = frame_system::mocking::MockBlock<Test>;

pub const BASE: AssetId = 1;
pub const CRV: AssetId = 2;
pub const CVX: AssetId = 3;
pub const WETH: AssetId = 4;

/// Yield venues backing the strategies
pub const VENUE_A: u32 = 7;
pub const VENUE_B: u32 = 8;
pub const VENUE_C: u32 = 9;

/// Swap venue behind every router
pub const SWAP_VENUE: u32 = 21;

pub fn alice() -> AccountId {
    AccountId32::new([1u8; 32])
}

pub fn bob() -> AccountId {
    AccountId32::new([2u8; 32])
}

/// Owner of every sub-strategy in these tests
pub fn manager() -> AccountId {
    AccountId32::new([9u8; 32])
}

pub fn treasury() -> AccountId {
    AccountId32::new([7u8; 32])
}

construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Assets: pallet_assets,
        SubStrategy: pallet_sub_strategy,
        Exchange: pallet_yield_exchange,
        YieldVault: pallet_yield_vault,
        Controller: pallet_yield_controller,
    }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
    type Block = Block;
    type AccountId = AccountId;
    type Lookup = IdentityLookup<AccountId>;
    type AccountData = pallet_balances::AccountData<Balance>;
}

parameter_types! {
    pub const ExistentialDeposit: Balance = 1;
}

impl pallet_balances::Config for Test {
    type MaxLocks = ConstU32<50>;
    type MaxReserves = ConstU32<50>;
    type ReserveIdentifier = [u8; 8];
    type Balance = Balance;
    type RuntimeEvent = RuntimeEvent;
    type DustRemoval = ();
    type ExistentialDeposit = ExistentialDeposit;
    type AccountStore = System;
    type WeightInfo = ();
    type FreezeIdentifier = ();
    type MaxFreezes = ConstU32<0>;
    type RuntimeHoldReason = ();
    type RuntimeFreezeReason = ();
    type DoneSlashHandler = ();
}

impl pallet_assets::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type AssetIdParameter = codec::Compact<AssetId>;
    type Currency = Balances;
    type CreateOrigin = AsEnsureOriginWithArg<EnsureSigned<AccountId>>;
    type ForceOrigin = EnsureRoot<AccountId>;
    type AssetDeposit = ConstU128<1>;
    type AssetAccountDeposit = ConstU128<1>;
    type MetadataDepositBase = ConstU128<1>;
    type MetadataDepositPerByte = ConstU128<1>;
    type ApprovalDeposit = ConstU128<1>;
    type StringLimit = ConstU32<50>;
    type Freezer = ();
    type Extra = ();
    type WeightInfo = ();
    type Holder = ();
    type CallbackHandle = ();
    type RemoveItemsLimit = ConstU32<1000>;
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper = ();
}

parameter_types! {
    pub const BaseAssetId: AssetId = BASE;
    pub const SubStrategyPalletId: PalletId = PalletId(*b"yv/strat");
    pub const VaultPalletId: PalletId = PalletId(*b"yv/vault");
    pub const ControllerPalletId: PalletId = PalletId(*b"yv/ctrlr");
}

impl pallet_sub_strategy::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type Assets = Assets;
    type BaseAssetId = BaseAssetId;
    type PalletId = SubStrategyPalletId;
    type MaxRewardTokens = ConstU32<4>;
    type DefaultSlippageBps = ConstU32<100>;
    type Venue = pallet_sub_strategy::MockYieldVenue<Test>;
    type WeightInfo = ();
}

impl pallet_yield_exchange::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type Assets = Assets;
    type AdminOrigin = EnsureRoot<AccountId>;
    type SwapVenues = pallet_yield_exchange::MockSwapVenue<Test>;
    type MaxRouteHops = ConstU32<4>;
    type MaxPathsPerRouter = ConstU32<8>;
    type WeightInfo = ();
}

impl pallet_yield_vault::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type Assets = Assets;
    type BaseAssetId = BaseAssetId;
    type PalletId = VaultPalletId;
    type AdminOrigin = EnsureRoot<AccountId>;
    type Controller = Controller;
    type DecimalsOffset = ConstU8<0>;
    type WeightInfo = ();
}

impl pallet_yield_controller::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type Assets = Assets;
    type PalletId = ControllerPalletId;
    type AdminOrigin = EnsureRoot<AccountId>;
    type HarvestOrigin = EnsureRoot<AccountId>;
    type Vault = YieldVault;
    type SubStrategies = SubStrategy;
    type Exchange = Exchange;
    type MaxSubStrategies = ConstU32<4>;
    type MaxHarvestFee = ConstU32<2_000>;
    type WeightInfo = ();
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();

    pallet_assets::GenesisConfig::<Test> {
        assets: vec![(BASE, alice(), true, 1), (CRV, alice(), true, 1), (CVX, alice(), true, 1), (WETH, alice(), true, 1)],
        accounts: vec![(BASE, alice(), 1_000_000), (BASE, bob(), 1_000_000)],
        ..Default::default()
    }
    .assimilate_storage(&mut t)
    .unwrap();

    pallet_yield_controller::GenesisConfig::<Test> { treasury: Some(treasury()), harvest_fee_bps: 1_000 }
        .assimilate_storage(&mut t)
        .unwrap();

    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}
