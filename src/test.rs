#![cfg(test)]
extern crate std;

use arbitrary::{Arbitrary, Unstructured};
use soroban_sdk::{
    contract, contractimpl, symbol_short,
    testutils::{Address as _, Events as _, Ledger as _},
    token, vec, Address, Env,
};

use crate::lock::DAY;
use crate::pricing::TOKEN_UNIT;
use crate::{
    CurveParams, LaunchLock, LaunchLockClient, LaunchLockError, Ledger, LockConfig, Quote,
};

pub(crate) const U: i128 = TOKEN_UNIT;
pub(crate) const T0: u64 = 1_700_000_000;
pub(crate) const LOCK_SPAN: u64 = 365 * DAY;

// ── fakes ─────────────────────────────────────────────────────

#[contract]
pub struct MockOracle;

#[contractimpl]
impl MockOracle {
    pub fn set_value(env: Env, value: i128) {
        env.storage().instance().set(&symbol_short!("value"), &value);
    }

    pub fn collateral_value(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&symbol_short!("value"))
            .unwrap_or(0)
    }
}

#[contract]
pub struct MockRoyalty;

#[contractimpl]
impl MockRoyalty {
    pub fn profit_mode_changed(env: Env, lock: Address, profit_in_time: bool) {
        env.storage()
            .instance()
            .set(&symbol_short!("mode"), &(lock, profit_in_time));
    }

    pub fn last_mode(env: Env) -> Option<(Address, bool)> {
        env.storage().instance().get(&symbol_short!("mode"))
    }
}

mod broken {
    use soroban_sdk::{contract, contractimpl, Address, Env};

    #[contract]
    pub struct BrokenRoyalty;

    #[contractimpl]
    impl BrokenRoyalty {
        pub fn profit_mode_changed(_env: Env, _lock: Address, _profit_in_time: bool) {
            panic!("royalty contract rejects notifications");
        }
    }
}
use broken::BrokenRoyalty;

/// Recipient that pulls whatever it was approved for.
#[contract]
pub struct MockReceiver;

#[contractimpl]
impl MockReceiver {
    pub fn init(env: Env, launch: Address, collateral: Address) {
        env.storage()
            .instance()
            .set(&symbol_short!("tokens"), &(launch, collateral));
    }

    pub fn deposit_launch_tokens(env: Env, caller: Address, amount: i128) {
        let (launch, _): (Address, Address) =
            env.storage().instance().get(&symbol_short!("tokens")).unwrap();
        let this = env.current_contract_address();
        token::Client::new(&env, &launch).transfer_from(&this, &caller, &this, &amount);
    }

    pub fn deposit_collateral(env: Env, caller: Address, amount: i128) {
        let (_, collateral): (Address, Address) =
            env.storage().instance().get(&symbol_short!("tokens")).unwrap();
        let this = env.current_contract_address();
        token::Client::new(&env, &collateral).transfer_from(&this, &caller, &this, &amount);
    }
}

// ── helpers ───────────────────────────────────────────────────

pub(crate) fn curve() -> CurveParams {
    CurveParams {
        initial_price: 10_000_000,
        first_level_quantity: 100 * U,
        price_increment_multiplier: 100,
        level_increase_multiplier: 500,
        level_decrease_after_trend: -200,
        trend_change_step: 2,
        profit_percentage: 100,
        profit_before_trend_change: 200,
    }
}

pub(crate) fn set_time(env: &Env, timestamp: u64) {
    env.ledger().with_mut(|li| li.timestamp = timestamp);
}

pub(crate) fn create_token(env: &Env) -> Address {
    let admin = Address::generate(env);
    env.register_stellar_asset_contract(admin)
}

pub(crate) fn mint(env: &Env, token: &Address, to: &Address, amount: i128) {
    token::StellarAssetClient::new(env, token).mint(to, &amount);
}

pub(crate) fn balance(env: &Env, token: &Address, who: &Address) -> i128 {
    token::Client::new(env, token).balance(who)
}

pub(crate) struct Setup {
    pub env: Env,
    pub client: LaunchLockClient<'static>,
    pub id: Address,
    pub owner: Address,
    pub reserve_owner: Address,
    pub royalty_wallet: Address,
    pub market_maker: Address,
    pub return_wallet: Address,
    pub launch: Address,
    pub collateral: Address,
}

pub(crate) fn base_config(
    env: &Env,
    owner: &Address,
    launch: &Address,
    collateral: &Address,
) -> LockConfig {
    LockConfig {
        owner: owner.clone(),
        reserve_owner: Address::generate(env),
        royalty_wallet: Address::generate(env),
        launch_token: launch.clone(),
        collateral_token: collateral.clone(),
        curve: curve(),
        royalty_profit_percent: 200,
        profit_in_time: false,
        lock_end_time: T0 + LOCK_SPAN,
        control_day: T0 + 10 * DAY,
        control_period: 30 * DAY,
        collateral_min_oracle_value: 0,
        market_makers: vec![env, Address::generate(env)],
        return_wallets: vec![env, Address::generate(env)],
        old_contracts: vec![env],
    }
}

/// Optional contracts passed next to the config at initialization.
#[derive(Default)]
pub(crate) struct Collaborators {
    pub dao: Option<Address>,
    pub royalty_contract: Option<Address>,
    pub oracle: Option<Address>,
}

pub(crate) fn setup_with(
    customize: impl FnOnce(&Env, &mut LockConfig, &mut Collaborators),
) -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|li| {
        li.timestamp = T0;
        li.sequence_number = 100;
    });
    let id = env.register_contract(None, LaunchLock);
    let client = LaunchLockClient::new(&env, &id);
    let owner = Address::generate(&env);
    let launch = create_token(&env);
    let collateral = create_token(&env);

    let mut config = base_config(&env, &owner, &launch, &collateral);
    let mut extra = Collaborators::default();
    customize(&env, &mut config, &mut extra);
    let market_maker = config.market_makers.get(0).unwrap();
    let return_wallet = config.return_wallets.get(0).unwrap();
    client.initialize(&config, &extra.dao, &extra.royalty_contract, &extra.oracle);

    let roles = client.get_roles();
    Setup {
        env,
        client,
        id,
        owner: roles.owner,
        reserve_owner: roles.reserve_owner,
        royalty_wallet: roles.royalty_wallet,
        market_maker,
        return_wallet,
        launch,
        collateral,
    }
}

pub(crate) fn setup() -> Setup {
    setup_with(|_, _, _| {})
}

impl Setup {
    /// Owner deposits 1000 launch tokens; the market maker gets 10_000
    /// collateral tokens and the return wallet 1000 launch tokens.
    pub fn fund(&self) {
        mint(&self.env, &self.launch, &self.owner, 1_000 * U);
        self.client.deposit_launch_tokens(&self.owner, &(1_000 * U));
        mint(&self.env, &self.collateral, &self.market_maker, 10_000 * U);
        mint(&self.env, &self.launch, &self.return_wallet, 1_000 * U);
    }

    pub fn at(&self, timestamp: u64) {
        set_time(&self.env, timestamp);
    }

    pub fn ledger(&self) -> Ledger {
        self.client.get_ledger()
    }

    pub fn balance(&self, token: &Address, who: &Address) -> i128 {
        balance(&self.env, token, who)
    }
}

// ── initialization ────────────────────────────────────────────

#[test]
fn initialize_stores_roles_and_emits_event() {
    let s = setup();
    let roles = s.client.get_roles();
    assert_eq!(roles.owner, s.owner);
    assert_eq!(s.client.get_dao(), s.owner);
    assert!(s.client.is_market_maker(&s.market_maker));
    assert!(s.client.is_return_wallet(&s.return_wallet));
    assert!(!s.client.is_market_maker(&s.return_wallet));
    assert_eq!(s.client.get_profit_shares(), (200, 800));
    assert_eq!(s.client.get_curve(), curve());
    assert!(!s.env.events().all().is_empty());

    let ledger = s.ledger();
    assert!(ledger.is_active);
    assert!(!ledger.is_initialized);
    assert!(!ledger.profit_in_time);
}

#[test]
fn initialize_twice_fails() {
    let s = setup();
    let config = base_config(&s.env, &s.owner, &s.launch, &s.collateral);
    assert_eq!(
        s.client.try_initialize(&config, &None, &None, &None),
        Err(Ok(LaunchLockError::AlreadyInitialized))
    );
}

fn try_init(customize: impl FnOnce(&Env, &mut LockConfig)) -> Result<(), LaunchLockError> {
    let env = Env::default();
    env.mock_all_auths();
    set_time(&env, T0);
    let client = LaunchLockClient::new(&env, &env.register_contract(None, LaunchLock));
    let owner = Address::generate(&env);
    let mut config = base_config(&env, &owner, &create_token(&env), &create_token(&env));
    customize(&env, &mut config);
    match client.try_initialize(&config, &None, &None, &None) {
        Ok(_) => Ok(()),
        Err(Ok(err)) => Err(err),
        Err(Err(_)) => panic!("host error"),
    }
}

#[test]
fn initial_price_zero_is_rejected_and_one_accepted() {
    assert_eq!(
        try_init(|_, c| c.curve.initial_price = 0),
        Err(LaunchLockError::InvalidPrice)
    );
    assert_eq!(try_init(|_, c| c.curve.initial_price = 1), Ok(()));
}

#[test]
fn initialize_validates_percentages_tokens_and_lock_end() {
    assert_eq!(
        try_init(|_, c| c.royalty_profit_percent = 1),
        Err(LaunchLockError::InvalidPercentage)
    );
    assert_eq!(
        try_init(|_, c| c.royalty_profit_percent = 1_001),
        Err(LaunchLockError::InvalidPercentage)
    );
    assert_eq!(try_init(|_, c| c.royalty_profit_percent = 1_000), Ok(()));
    assert_eq!(
        try_init(|_, c| c.curve.level_increase_multiplier = -1_000),
        Err(LaunchLockError::InvalidPercentage)
    );
    assert_eq!(
        try_init(|_, c| c.collateral_token = c.launch_token.clone()),
        Err(LaunchLockError::InvalidAddress)
    );
    assert_eq!(
        try_init(|_, c| c.lock_end_time = T0),
        Err(LaunchLockError::InvalidTimePeriod)
    );
    assert_eq!(
        try_init(|_, c| c.lock_end_time = T0 + 5 * 365 * DAY + 1),
        Err(LaunchLockError::LockCannotExceedFiveYears)
    );
}

#[test]
fn control_period_is_clamped_not_rejected() {
    let s = setup_with(|_, c, _| c.control_period = 1);
    assert_eq!(s.client.get_lock_state().control_period, 15 * DAY);
    let s = setup_with(|_, c, _| c.control_period = 1_000 * DAY);
    assert_eq!(s.client.get_lock_state().control_period, 90 * DAY);
}

// ── deposits ──────────────────────────────────────────────────

#[test]
fn first_deposit_registers_prefunded_tokens() {
    let s = setup();
    mint(&s.env, &s.launch, &s.id, 5 * U);
    mint(&s.env, &s.launch, &s.owner, 100 * U);

    s.client.deposit_launch_tokens(&s.owner, &(100 * U));
    let ledger = s.ledger();
    assert!(ledger.is_initialized);
    assert_eq!(ledger.unaccounted_offset, 5 * U);
    assert_eq!(ledger.launch_balance, 105 * U);
    assert_eq!(s.balance(&s.launch, &s.id), 105 * U);
}

#[test]
fn deposits_are_owner_only_and_positive() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    mint(&s.env, &s.collateral, &s.owner, 100 * U);

    assert_eq!(
        s.client.try_deposit_collateral(&s.owner, &0),
        Err(Ok(LaunchLockError::InvalidAmount))
    );
    assert_eq!(
        s.client.try_deposit_collateral(&stranger, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client.try_deposit_launch_tokens(&stranger, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    s.client.deposit_collateral(&s.owner, &(100 * U));
    assert_eq!(s.ledger().contract_collateral_balance, 100 * U);
    assert_eq!(s.balance(&s.collateral, &s.id), 100 * U);
}

// ── trading ───────────────────────────────────────────────────

#[test]
fn trading_requires_launch_deposit() {
    let s = setup();
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.market_maker, &U),
        Err(Ok(LaunchLockError::NotInitialized))
    );
}

#[test]
fn buy_charges_the_curve_and_accumulates_profit() {
    let s = setup();
    s.fund();

    let quote = s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    assert_eq!(
        quote,
        Quote {
            gross: 1_550_000_000,
            backing: 1_240_000_000,
            profit: 310_000_000,
        }
    );

    let ledger = s.ledger();
    assert_eq!(ledger.total_launch_sold, 150 * U);
    assert_eq!(ledger.launch_balance, 850 * U);
    assert_eq!(ledger.contract_collateral_balance, 1_240_000_000);
    assert_eq!(ledger.royalty_profit, 62_000_000);
    assert_eq!(ledger.owner_profit, 248_000_000);
    assert_eq!(s.client.launch_available(), 150 * U);
    assert_eq!(s.client.current_price(), 11_000_000);

    assert_eq!(s.balance(&s.launch, &s.market_maker), 150 * U);
    assert_eq!(s.balance(&s.collateral, &s.id), 1_550_000_000);
    assert_eq!(
        s.balance(&s.collateral, &s.market_maker),
        10_000 * U - 1_550_000_000
    );
}

#[test]
fn buy_rejects_zero_owner_and_strangers() {
    let s = setup();
    s.fund();
    let stranger = Address::generate(&s.env);

    assert_eq!(
        s.client.try_buy_launch_tokens(&s.market_maker, &0),
        Err(Ok(LaunchLockError::InvalidAmount))
    );
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.owner, &U),
        Err(Ok(LaunchLockError::UseDepositFunctionForOwners))
    );
    assert_eq!(
        s.client.try_buy_launch_tokens(&stranger, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(s.ledger().total_launch_sold, 0);
}

#[test]
fn anyone_trades_in_the_last_sixty_days() {
    let s = setup();
    s.fund();
    let holder = Address::generate(&s.env);
    mint(&s.env, &s.collateral, &holder, 100 * U);

    s.at(T0 + LOCK_SPAN - 60 * DAY);
    assert!(!s.client.trading_opportunity());
    assert_eq!(
        s.client.try_buy_launch_tokens(&holder, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    s.at(T0 + LOCK_SPAN - 60 * DAY + 1);
    assert!(s.client.trading_opportunity());
    s.client.buy_launch_tokens(&holder, &U);
    assert_eq!(s.balance(&s.launch, &holder), U);
}

#[test]
fn profit_in_time_pays_royalty_and_owner_on_every_buy() {
    let s = setup_with(|_, c, _| c.profit_in_time = true);
    s.fund();

    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    assert_eq!(s.balance(&s.collateral, &s.royalty_wallet), 62_000_000);
    assert_eq!(s.balance(&s.collateral, &s.owner), 248_000_000);
    assert_eq!(s.balance(&s.collateral, &s.id), 1_240_000_000);

    let ledger = s.ledger();
    assert_eq!(ledger.owner_profit, 0);
    assert_eq!(ledger.royalty_profit, 0);
    assert_eq!(
        s.client.try_claim_profit_on_request(&s.owner),
        Err(Ok(LaunchLockError::NoProfitAvailable))
    );
}

#[test]
fn sell_returns_backing_and_restores_price() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));

    assert_eq!(s.client.quote_sell(&(50 * U)), 440_000_000);
    let refund = s.client.sell_launch_tokens(&s.market_maker, &(50 * U));
    assert_eq!(refund, 440_000_000);

    let ledger = s.ledger();
    assert_eq!(ledger.total_launch_sold, 100 * U);
    assert_eq!(ledger.launch_balance, 900 * U);
    assert_eq!(ledger.contract_collateral_balance, 800_000_000);
    assert_eq!(s.client.current_price(), 11_000_000);

    s.client.sell_launch_tokens(&s.market_maker, &U);
    assert_eq!(s.client.current_price(), 10_000_000);
}

#[test]
fn sell_cannot_exceed_available() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &(10 * U));
    let before = s.ledger();

    assert_eq!(
        s.client.try_sell_launch_tokens(&s.market_maker, &(11 * U)),
        Err(Ok(LaunchLockError::InsufficientAmount))
    );
    assert_eq!(
        s.client.try_sell_launch_tokens(&s.market_maker, &0),
        Err(Ok(LaunchLockError::InvalidAmount))
    );
    assert_eq!(s.ledger(), before);
}

#[test]
fn return_wallet_buyback_adds_to_balance_and_earned() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));

    let payout = s
        .client
        .sell_launch_tokens_return_wallet(&s.return_wallet, &(10 * U));
    assert_eq!(payout, 80_000_000);

    let ledger = s.ledger();
    assert_eq!(ledger.launch_balance, 860 * U);
    assert_eq!(ledger.launch_tokens_earned, 10 * U);
    assert_eq!(ledger.total_launch_sold, 150 * U);
    assert_eq!(ledger.contract_collateral_balance, 1_160_000_000);
    assert_eq!(s.client.launch_available(), 140 * U);
    assert_eq!(s.balance(&s.collateral, &s.return_wallet), 80_000_000);
    assert_eq!(s.balance(&s.launch, &s.return_wallet), 990 * U);

    assert_eq!(
        s.client
            .try_sell_launch_tokens_return_wallet(&s.market_maker, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client
            .try_sell_launch_tokens_return_wallet(&s.return_wallet, &(141 * U)),
        Err(Ok(LaunchLockError::InsufficientAmount))
    );
}

#[test]
fn claim_profit_pays_each_side_once() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    let stranger = Address::generate(&s.env);

    assert_eq!(
        s.client.try_claim_profit_on_request(&stranger),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(s.client.claim_profit_on_request(&s.owner), 248_000_000);
    assert_eq!(s.client.claim_profit_on_request(&s.royalty_wallet), 62_000_000);
    assert_eq!(s.balance(&s.collateral, &s.owner), 248_000_000);
    assert_eq!(s.balance(&s.collateral, &s.royalty_wallet), 62_000_000);
    assert_eq!(
        s.client.try_claim_profit_on_request(&s.owner),
        Err(Ok(LaunchLockError::NoProfitAvailable))
    );
    assert_eq!(s.balance(&s.collateral, &s.id), 1_240_000_000);
}

// ── collaborators ─────────────────────────────────────────────

#[test]
fn switch_profit_mode_notifies_royalty_contract() {
    let mut royalty_id = None;
    let s = setup_with(|env, _, extra| {
        let id = env.register_contract(None, MockRoyalty);
        royalty_id = Some(id.clone());
        extra.royalty_contract = Some(id);
    });
    let royalty = MockRoyaltyClient::new(&s.env, &royalty_id.unwrap());

    s.client.switch_profit_mode(&s.owner, &true);
    assert!(s.ledger().profit_in_time);
    assert_eq!(royalty.last_mode(), Some((s.id.clone(), true)));

    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_switch_profit_mode(&stranger, &false),
        Err(Ok(LaunchLockError::AccessDenied))
    );
}

#[test]
fn failing_royalty_contract_does_not_block_mode_switch() {
    let s = setup_with(|env, _, extra| {
        extra.royalty_contract = Some(env.register_contract(None, BrokenRoyalty));
    });
    s.client.switch_profit_mode(&s.owner, &true);
    assert!(s.ledger().profit_in_time);
    s.client.switch_profit_mode(&s.owner, &false);
    assert!(!s.ledger().profit_in_time);
}

#[test]
fn oracle_floor_guards_collateral_operations() {
    let mut oracle_id = None;
    let s = setup_with(|env, c, extra| {
        let id = env.register_contract(None, MockOracle);
        oracle_id = Some(id.clone());
        extra.oracle = Some(id);
        c.collateral_min_oracle_value = 1_000;
    });
    let oracle = MockOracleClient::new(&s.env, &oracle_id.unwrap());
    oracle.set_value(&1_000);
    s.fund();

    oracle.set_value(&999);
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.market_maker, &U),
        Err(Ok(LaunchLockError::CollateralBelowOracleFloor))
    );
    mint(&s.env, &s.collateral, &s.owner, U);
    assert_eq!(
        s.client.try_deposit_collateral(&s.owner, &U),
        Err(Ok(LaunchLockError::CollateralBelowOracleFloor))
    );

    oracle.set_value(&1_000);
    s.client.buy_launch_tokens(&s.market_maker, &U);
    s.client.deposit_collateral(&s.owner, &U);
}

// ── DAO emergency paths ───────────────────────────────────────

#[test]
fn dao_launch_sweep_waits_for_lock_end_and_closes_the_lock() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &(10 * U));
    let dao = s.client.get_dao();

    assert_eq!(
        s.client.try_withdraw_all_launch_tokens(&dao),
        Err(Ok(LaunchLockError::LockPeriodNotEnded))
    );
    s.at(T0 + LOCK_SPAN);
    assert_eq!(
        s.client.try_withdraw_all_launch_tokens(&s.market_maker),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    assert_eq!(s.client.withdraw_all_launch_tokens(&dao), 990 * U);
    assert_eq!(s.balance(&s.launch, &s.id), 0);
    let ledger = s.ledger();
    assert!(!ledger.is_active);
    assert_eq!(ledger.launch_balance, 0);

    assert_eq!(
        s.client.try_withdraw_all_launch_tokens(&dao),
        Err(Ok(LaunchLockError::NoTokensToWithdraw))
    );
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.market_maker, &U),
        Err(Ok(LaunchLockError::ContractNotActive))
    );
    assert_eq!(
        s.client.try_deposit_launch_tokens(&s.owner, &U),
        Err(Ok(LaunchLockError::ContractNotActive))
    );
}

#[test]
fn dao_collateral_sweep_takes_everything() {
    let s = setup();
    s.fund();
    let dao = Address::generate(&s.env);
    s.client.set_dao_address(&s.owner, &dao);

    s.at(T0 + LOCK_SPAN);
    assert_eq!(
        s.client.try_withdraw_all_collateral_tokens(&dao),
        Err(Ok(LaunchLockError::NoCollateralTokensToWithdraw))
    );

    s.at(T0);
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    s.at(T0 + LOCK_SPAN);
    assert_eq!(
        s.client.try_withdraw_all_collateral_tokens(&s.owner),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(s.client.withdraw_all_collateral_tokens(&dao), 1_550_000_000);
    assert_eq!(s.balance(&s.collateral, &dao), 1_550_000_000);

    let ledger = s.ledger();
    assert_eq!(ledger.contract_collateral_balance, 0);
    assert_eq!(ledger.owner_profit, 0);
    assert!(ledger.is_active);
}

#[test]
fn rescue_rejects_lock_tokens_and_returns_strays() {
    let s = setup();
    let stray = create_token(&s.env);
    mint(&s.env, &stray, &s.id, 42);

    assert_eq!(
        s.client.try_withdraw_token(&s.owner, &s.launch, &1),
        Err(Ok(LaunchLockError::InvalidTokenForWithdrawal))
    );
    assert_eq!(
        s.client.try_withdraw_token(&s.owner, &s.collateral, &1),
        Err(Ok(LaunchLockError::InvalidTokenForWithdrawal))
    );
    s.client.withdraw_token(&s.owner, &stray, &42);
    assert_eq!(s.balance(&stray, &s.owner), 42);
}

// ── ledger invariants ─────────────────────────────────────────

#[derive(Arbitrary, Debug)]
enum Op {
    Buy(u8),
    Sell(u8),
    Buyback(u8),
}

// Fixed fuzz corpus; each run starts at a different offset.
const TRADE_BYTES: [u8; 96] = [
    0x00, 0x2a, 0x91, 0x07, 0x3c, 0xe4, 0x55, 0x18, 0xb2, 0x6f, 0x01, 0xd9, 0x47, 0x80, 0x13,
    0xfe, 0x22, 0x9b, 0x5d, 0x02, 0xc7, 0x38, 0x74, 0x0e, 0xa1, 0x66, 0x01, 0x3f, 0xee, 0x29,
    0x50, 0x8d, 0x00, 0x17, 0xb8, 0x62, 0x4b, 0xf1, 0x02, 0x0a, 0x9e, 0x35, 0xc0, 0x71, 0x01,
    0x5a, 0x2e, 0xd3, 0x88, 0x00, 0x44, 0x19, 0xaf, 0x63, 0x02, 0x7c, 0xe9, 0x31, 0x0b, 0x96,
    0x01, 0x4e, 0xc5, 0x20, 0x00, 0x8a, 0x3d, 0xf7, 0x12, 0x02, 0x59, 0xb4, 0x6a, 0x01, 0xdb,
    0x27, 0x93, 0x00, 0x7e, 0x45, 0x0c, 0xba, 0x02, 0x68, 0x1f, 0xcd, 0x36, 0x01, 0xa7, 0x54,
    0x00, 0x81, 0xe2, 0x2b, 0x02, 0x9f,
];

#[test]
fn ledger_invariants_hold_over_random_trading() {
    for offset in [0usize, 17, 41] {
        let s = setup();
        s.fund();
        let curve = s.client.get_curve();
        let mut u = Unstructured::new(&TRADE_BYTES[offset..]);

        for _ in 0..40 {
            let op = Op::arbitrary(&mut u).unwrap_or(Op::Buy(1));
            let available = s.client.launch_available();
            match op {
                Op::Buy(n) => {
                    let _ = s
                        .client
                        .try_buy_launch_tokens(&s.market_maker, &((n as i128 % 60 + 1) * U));
                }
                Op::Sell(n) => {
                    let held = s.balance(&s.launch, &s.market_maker);
                    let amount = ((n as i128 % 60 + 1) * U).min(available).min(held);
                    if amount > 0 {
                        s.client.sell_launch_tokens(&s.market_maker, &amount);
                    }
                }
                Op::Buyback(n) => {
                    let amount = ((n as i128 % 20 + 1) * U).min(available);
                    if amount > 0 {
                        s.client
                            .sell_launch_tokens_return_wallet(&s.return_wallet, &amount);
                    }
                }
            }

            let ledger = s.ledger();
            assert_eq!(
                s.client.launch_available(),
                ledger.total_launch_sold - ledger.launch_tokens_earned
            );
            assert!(ledger.launch_tokens_earned <= ledger.total_launch_sold);
            assert_eq!(s.balance(&s.launch, &s.id), ledger.launch_balance);
            assert_eq!(
                s.balance(&s.collateral, &s.id),
                ledger.contract_collateral_balance + ledger.owner_profit + ledger.royalty_profit
            );
            let backing = curve.cumulative(ledger.total_launch_sold).unwrap().backing
                - curve.cumulative(ledger.launch_tokens_earned).unwrap().backing;
            assert_eq!(ledger.contract_collateral_balance, backing);
        }
    }
}
