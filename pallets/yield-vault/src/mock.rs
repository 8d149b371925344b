use crate as pallet_yield_vault;
use frame_support::{
    construct_runtime, derive_impl, parameter_types,
    traits::{AsEnsureOriginWithArg, ConstU128, ConstU32, ConstU8},
    PalletId,
};
use frame_support::storage::unhashed;
use frame_support::traits::{fungibles::Mutate, tokens::Preservation};
use frame_system::{EnsureRoot, EnsureSigned};
use sp_runtime::{
    traits::{AccountIdConversion, IdentityLookup},
    AccountId32, BuildStorage, DispatchError,
};
use yield_primitives::{math, ControllerApi};

pub type AccountId = AccountId32;
pub type Balance = u128;
pub type AssetId = u32;

type Block = frame_system::mocking::MockBlock<Test>;

pub const BASE: AssetId = 1;

pub fn alice() -> AccountId {
    AccountId32::new([1u8; 32])
}

pub fn bob() -> AccountId {
    AccountId32::new([2u8; 32])
}

construct_runtime!(
    pub enum Test {
        System: frame_system,
        Balances: pallet_balances,
        Assets: pallet_assets,
        YieldVault: pallet_yield_vault,
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
    pub const VaultPalletId: PalletId = PalletId(*b"yv/vault");
}

impl pallet_yield_vault::Config for Test {
    type RuntimeEvent = RuntimeEvent;
    type Balance = Balance;
    type AssetId = AssetId;
    type Assets = Assets;
    type BaseAssetId = BaseAssetId;
    type PalletId = VaultPalletId;
    type AdminOrigin = EnsureRoot<AccountId>;
    type Controller = MockController;
    type DecimalsOffset = ConstU8<0>;
    type WeightInfo = ();
}

// =============================================================================
//                              Mock Controller
// =============================================================================

/// Controller stand-in that parks allocations on a pot account.
///
/// State lives in unhashed storage so it reverts with the calling extrinsic.
pub struct MockController;

const DEPLOYED: &[u8] = b":mock_controller:deployed";
const REFUSE: &[u8] = b":mock_controller:refuse";
const LOSS: &[u8] = b":mock_controller:loss";
const REENTER: &[u8] = b":mock_controller:reenter";

impl MockController {
    pub fn pot() -> AccountId {
        PalletId(*b"mockctrl").into_account_truncating()
    }

    pub fn deployed() -> Balance {
        unhashed::get_or_default(DEPLOYED)
    }

    /// Take nothing on `allocate`.
    pub fn set_refuse(refuse: bool) {
        unhashed::put(REFUSE, &refuse);
    }

    /// Deliver `bps` less than requested on `request_withdraw`.
    pub fn set_withdraw_loss_bps(bps: u32) {
        unhashed::put(LOSS, &bps);
    }

    /// Call back into the vault from inside the controller.
    pub fn set_reenter(reenter: bool) {
        unhashed::put(REENTER, &reenter);
    }

    /// Grow deployed capital by `amount` of freshly minted base asset.
    pub fn accrue(amount: Balance) {
        <Assets as Mutate<AccountId>>::mint_into(BASE, &Self::pot(), amount).unwrap();
        unhashed::put(DEPLOYED, &(Self::deployed() + amount));
    }

    fn maybe_reenter() -> Result<(), DispatchError> {
        if unhashed::get_or_default::<bool>(REENTER) {
            YieldVault::deposit(RuntimeOrigin::signed(bob()), 10, bob())?;
        }
        Ok(())
    }
}

impl ControllerApi for MockController {
    type Balance = Balance;

    fn total_strategy_assets() -> Balance {
        Self::deployed()
    }

    fn allocate(amount: Balance) -> Result<Balance, DispatchError> {
        Self::maybe_reenter()?;
        if unhashed::get_or_default::<bool>(REFUSE) {
            return Ok(0);
        }
        <Assets as Mutate<AccountId>>::transfer(BASE, &YieldVault::account_id(), &Self::pot(), amount, Preservation::Expendable)?;
        unhashed::put(DEPLOYED, &(Self::deployed() + amount));
        Ok(amount)
    }

    fn request_withdraw(amount: Balance) -> Result<Balance, DispatchError> {
        Self::maybe_reenter()?;
        let deployed = Self::deployed();
        if amount > deployed {
            return Err(DispatchError::Other("MockController: insufficient liquidity"));
        }
        unhashed::put(DEPLOYED, &(deployed - amount));

        let loss = math::bps_of(amount, unhashed::get_or_default(LOSS));
        let delivered = amount - loss;
        <Assets as Mutate<AccountId>>::transfer(BASE, &Self::pot(), &YieldVault::account_id(), delivered, Preservation::Expendable)?;
        Ok(delivered)
    }
}

pub fn new_test_ext() -> sp_io::TestExternalities {
    let mut t = frame_system::GenesisConfig::<Test>::default().build_storage().unwrap();

    pallet_assets::GenesisConfig::<Test> {
        assets: vec![(BASE, alice(), true, 1)],
        accounts: vec![(BASE, alice(), 1_000_000), (BASE, bob(), 1_000_000)],
        ..Default::default()
    }
    .assimilate_storage(&mut t)
    .unwrap();

    let mut ext = sp_io::TestExternalities::new(t);
    ext.execute_with(|| System::set_block_number(1));
    ext
}
