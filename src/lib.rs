#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    IntoVal, Symbol, TryFromVal, Val, Vec,
};

pub mod external;
pub mod ledger;
pub mod lock;
pub mod pricing;
pub mod withdrawal;

use external::{CollateralOracleClient, DepositReceiverClient, RoyaltyNotifierClient};
pub use ledger::{creator_percent, Ledger, ProfitSplit};
pub use lock::LockState;
pub use pricing::{CurveParams, Quote, PERCENTAGE_DIVISOR};
pub use withdrawal::{DeferredWithdrawal, WithdrawalAsset};

/// Contract error codes. Auth failures are signaled by host panic (require_auth).
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum LaunchLockError {
    /// `initialize` was already called.
    AlreadyInitialized = 1,
    /// Contract not initialized, or no launch tokens deposited yet.
    NotInitialized = 2,
    /// Caller does not hold the role this operation needs.
    AccessDenied = 3,
    OnlyReserveOwner = 4,
    OnlyRoyaltyWalletCanChange = 5,
    /// The owner funds the lock through the deposit entry points, not by buying.
    UseDepositFunctionForOwners = 6,
    InvalidAmount = 7,
    InvalidAddress = 8,
    InvalidPercentage = 9,
    /// Initial curve price must be positive.
    InvalidPrice = 10,
    ArithmeticOverflow = 11,
    InvalidTimePeriod = 12,
    LockCannotExceedFiveYears = 13,
    /// Deferred withdrawal can only be re-enabled within 60 days of the lock end.
    CannotActivateWithdrawalTooCloseToLockEnd = 14,
    LockPeriodNotEnded = 15,
    NoTokensToWithdraw = 16,
    NoCollateralTokensToWithdraw = 17,
    /// Launch and collateral tokens only leave through their dedicated paths.
    InvalidTokenForWithdrawal = 18,
    NoProfitAvailable = 19,
    DeferredWithdrawalBlocked = 20,
    InvalidRecipientOrAmount = 21,
    InvalidRecipient = 22,
    LaunchWithdrawalAlreadyScheduled = 23,
    CollateralWithdrawalAlreadyScheduled = 24,
    NoDeferredWithdrawalScheduled = 25,
    WithdrawalDateNotReached = 26,
    CollateralTokenWithdrawalWindowExpired = 27,
    InsufficientTokenBalance = 28,
    InsufficientAmount = 29,
    InsufficientCollateralBalance = 30,
    /// The DAO swept the launch tokens; the lock is closed for good.
    ContractNotActive = 31,
    /// Operation is not allowed while the control window is open.
    ControlWindowOpen = 32,
    /// Oracle reports the collateral below the configured floor.
    CollateralBelowOracleFloor = 33,
    /// Quote walked past `MAX_CURVE_LEVELS`.
    CurveExhausted = 34,
}

// ── Event symbols ────────────────────────────────────────────
const EVENT_INIT: Symbol = symbol_short!("init");
const EVENT_LOCK_EXTENDED: Symbol = symbol_short!("lock_ext");
const EVENT_WITHDRAWAL_TOGGLED: Symbol = symbol_short!("wd_toggle");
const EVENT_OLD_CONTRACT: Symbol = symbol_short!("old_reg");
const EVENT_MARKET_MAKER: Symbol = symbol_short!("mm_set");
const EVENT_RETURN_WALLET: Symbol = symbol_short!("rw_set");
const EVENT_OWNER: Symbol = symbol_short!("owner");
const EVENT_RESERVE_OWNER: Symbol = symbol_short!("rsv_owner");
const EVENT_DAO: Symbol = symbol_short!("dao_set");
const EVENT_ROYALTY_WALLET: Symbol = symbol_short!("roy_wall");
const EVENT_PROFIT_PERCENT: Symbol = symbol_short!("prof_pct");
const EVENT_PROFIT_MODE: Symbol = symbol_short!("prof_mode");
const EVENT_BUY: Symbol = symbol_short!("buy");
const EVENT_SELL: Symbol = symbol_short!("sell");
const EVENT_BUYBACK: Symbol = symbol_short!("buyback");
const EVENT_DEPOSIT_LAUNCH: Symbol = symbol_short!("dep_lnch");
const EVENT_DEPOSIT_COLLATERAL: Symbol = symbol_short!("dep_coll");
const EVENT_CLAIM: Symbol = symbol_short!("claim");
const EVENT_DAO_LAUNCH: Symbol = symbol_short!("dao_lnch");
const EVENT_DAO_COLLATERAL: Symbol = symbol_short!("dao_coll");
const EVENT_RESCUE: Symbol = symbol_short!("rescue");
const EVENT_LAUNCH_WD_SCHEDULED: Symbol = symbol_short!("lwd_sch");
const EVENT_LAUNCH_WD_CANCELLED: Symbol = symbol_short!("lwd_can");
const EVENT_LAUNCH_WD_CONFIRMED: Symbol = symbol_short!("lwd_conf");
const EVENT_COLLATERAL_WD_SCHEDULED: Symbol = symbol_short!("cwd_sch");
const EVENT_COLLATERAL_WD_CANCELLED: Symbol = symbol_short!("cwd_can");
const EVENT_COLLATERAL_WD_CONFIRMED: Symbol = symbol_short!("cwd_conf");

/// Upper bound for the royalty share of profit, parts-per-mille.
pub const MAX_ROYALTY_PERCENT: u32 = 1_000;

// ── Data structures ──────────────────────────────────────────

/// Everything `initialize` needs, validated before anything is stored.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct LockConfig {
    pub owner: Address,
    /// Authorizes ownership succession.
    pub reserve_owner: Address,
    pub royalty_wallet: Address,
    pub launch_token: Address,
    pub collateral_token: Address,
    pub curve: CurveParams,
    pub royalty_profit_percent: u32,
    pub profit_in_time: bool,
    pub lock_end_time: u64,
    pub control_day: u64,
    /// Clamped into `[MIN_CONTROL_PERIOD, MAX_CONTROL_PERIOD]`.
    pub control_period: u64,
    /// Floor for the optional collateral oracle.
    pub collateral_min_oracle_value: i128,
    pub market_makers: Vec<Address>,
    pub return_wallets: Vec<Address>,
    /// Previously deployed locks allowed to deposit into this one.
    pub old_contracts: Vec<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Roles {
    pub owner: Address,
    pub reserve_owner: Address,
    pub royalty_wallet: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tokens {
    pub launch: Address,
    pub collateral: Address,
}

#[contracttype]
pub enum DataKey {
    Roles,
    /// Emergency authority after the lock ends. Absent means the owner.
    Dao,
    Tokens,
    Curve,
    /// Royalty share of profit, parts-per-mille.
    RoyaltyPercent,
    /// Notified on profit mode switches. Optional.
    RoyaltyContract,
    /// Collateral oracle. Optional; absent disables the floor check.
    Oracle,
    OracleFloor,
    Lock,
    Ledger,
    LaunchWithdrawal,
    CollateralWithdrawal,
    MarketMaker(Address),
    ReturnWallet(Address),
    /// Retired deployments of this contract.
    OldContract(Address),
}

// ── Contract ─────────────────────────────────────────────────
#[contract]
pub struct LaunchLock;

impl LaunchLock {
    fn read<V: TryFromVal<Env, Val>>(env: &Env, key: &DataKey) -> Result<V, LaunchLockError> {
        env.storage()
            .persistent()
            .get(key)
            .ok_or(LaunchLockError::NotInitialized)
    }

    fn write<V: IntoVal<Env, Val>>(env: &Env, key: &DataKey, value: &V) {
        env.storage().persistent().set(key, value);
    }

    fn flag(env: &Env, key: &DataKey) -> bool {
        env.storage()
            .persistent()
            .get::<DataKey, bool>(key)
            .unwrap_or(false)
    }

    fn roles(env: &Env) -> Result<Roles, LaunchLockError> {
        Self::read(env, &DataKey::Roles)
    }

    fn ledger(env: &Env) -> Result<Ledger, LaunchLockError> {
        Self::read(env, &DataKey::Ledger)
    }

    fn lock_state(env: &Env) -> Result<LockState, LaunchLockError> {
        Self::read(env, &DataKey::Lock)
    }

    fn curve(env: &Env) -> Result<CurveParams, LaunchLockError> {
        Self::read(env, &DataKey::Curve)
    }

    fn tokens(env: &Env) -> Result<Tokens, LaunchLockError> {
        Self::read(env, &DataKey::Tokens)
    }

    /// Outstanding request; `None` while idle.
    fn withdrawal(env: &Env, key: &DataKey) -> Option<DeferredWithdrawal> {
        env.storage().persistent().get(key)
    }

    fn dao(env: &Env, roles: &Roles) -> Address {
        env.storage()
            .persistent()
            .get(&DataKey::Dao)
            .unwrap_or_else(|| roles.owner.clone())
    }

    /// Requires `caller`'s auth and that it is the owner.
    fn require_owner(env: &Env, caller: &Address) -> Result<Roles, LaunchLockError> {
        caller.require_auth();
        let roles = Self::roles(env)?;
        if *caller != roles.owner {
            return Err(LaunchLockError::AccessDenied);
        }
        Ok(roles)
    }

    fn require_dao(env: &Env, caller: &Address) -> Result<Roles, LaunchLockError> {
        caller.require_auth();
        let roles = Self::roles(env)?;
        if *caller != Self::dao(env, &roles) {
            return Err(LaunchLockError::AccessDenied);
        }
        Ok(roles)
    }

    /// Market makers trade at any time; everyone else on a control day or in
    /// the last 60 days of the lock.
    fn require_trader(env: &Env, caller: &Address, lock: &LockState) -> Result<(), LaunchLockError> {
        let now = env.ledger().timestamp();
        if Self::flag(env, &DataKey::MarketMaker(caller.clone())) || lock.is_open_trading(now) {
            return Ok(());
        }
        Err(LaunchLockError::AccessDenied)
    }

    /// Rejects when a configured oracle values the collateral below the floor.
    fn check_collateral_value(env: &Env) -> Result<(), LaunchLockError> {
        let oracle: Option<Address> = env.storage().persistent().get(&DataKey::Oracle);
        if let Some(oracle) = oracle {
            let floor: i128 = Self::read(env, &DataKey::OracleFloor)?;
            let value = CollateralOracleClient::new(env, &oracle).collateral_value();
            if value < floor {
                return Err(LaunchLockError::CollateralBelowOracleFloor);
            }
        }
        Ok(())
    }

    fn pay(env: &Env, token: &Address, from: &Address, to: &Address, amount: i128) {
        if amount > 0 {
            token::Client::new(env, token).transfer(from, to, &amount);
        }
    }

    /// Pulls a deposit from `caller`. Old contracts approve before invoking
    /// the deposit hook, so their tokens are taken with `transfer_from`.
    fn pull_deposit(env: &Env, token: &Address, caller: &Address, roles: &Roles, amount: i128) {
        let this = env.current_contract_address();
        let client = token::Client::new(env, token);
        if *caller == roles.owner {
            client.transfer(caller, &this, &amount);
        } else {
            client.transfer_from(&this, caller, &this, &amount);
        }
    }

    /// Approves `amount` for `recipient` and invokes its deposit hook. The
    /// hook must pull exactly `amount`, otherwise the whole call reverts.
    fn push_to_receiver(
        env: &Env,
        token: &Address,
        recipient: &Address,
        amount: i128,
        asset: WithdrawalAsset,
    ) -> Result<(), LaunchLockError> {
        let this = env.current_contract_address();
        let client = token::Client::new(env, token);
        let before = client.balance(&this);
        let expiration_ledger = env.ledger().sequence();
        client.approve(&this, recipient, &amount, &expiration_ledger);
        let receiver = DepositReceiverClient::new(env, recipient);
        match asset {
            WithdrawalAsset::Launch => receiver.deposit_launch_tokens(&this, &amount),
            WithdrawalAsset::Collateral => receiver.deposit_collateral(&this, &amount),
        }
        if before.checked_sub(client.balance(&this)) != Some(amount) {
            return Err(LaunchLockError::InsufficientAmount);
        }
        Ok(())
    }

    fn require_depositor(env: &Env, caller: &Address, roles: &Roles) -> Result<(), LaunchLockError> {
        if *caller == roles.owner || Self::flag(env, &DataKey::OldContract(caller.clone())) {
            return Ok(());
        }
        Err(LaunchLockError::AccessDenied)
    }

    fn require_positive_amount(amount: i128) -> Result<(), LaunchLockError> {
        if amount <= 0 {
            return Err(LaunchLockError::InvalidAmount);
        }
        Ok(())
    }

    fn cancel_withdrawal(
        env: &Env,
        caller: &Address,
        key: DataKey,
        event: Symbol,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        let roles = Self::roles(env)?;
        if *caller != roles.owner && *caller != roles.royalty_wallet {
            return Err(LaunchLockError::AccessDenied);
        }
        let cancelled = DeferredWithdrawal::require_scheduled(Self::withdrawal(env, &key))?;
        env.storage().persistent().remove(&key);
        env.events().publish(
            (event, caller.clone()),
            (cancelled.recipient, cancelled.amount),
        );
        Ok(())
    }
}

#[contractimpl]
impl LaunchLock {
    /// One-shot setup. Every parameter is validated before anything is stored.
    /// The DAO defaults to the owner; royalty contract and oracle are optional.
    pub fn initialize(
        env: Env,
        config: LockConfig,
        dao: Option<Address>,
        royalty_contract: Option<Address>,
        collateral_oracle: Option<Address>,
    ) -> Result<(), LaunchLockError> {
        if env.storage().persistent().has(&DataKey::Roles) {
            return Err(LaunchLockError::AlreadyInitialized);
        }
        config.owner.require_auth();

        config.curve.validate()?;
        if config.royalty_profit_percent <= 1 || config.royalty_profit_percent > MAX_ROYALTY_PERCENT
        {
            return Err(LaunchLockError::InvalidPercentage);
        }
        if config.launch_token == config.collateral_token {
            return Err(LaunchLockError::InvalidAddress);
        }
        if config.collateral_min_oracle_value < 0 {
            return Err(LaunchLockError::InvalidAmount);
        }
        let now = env.ledger().timestamp();
        let lock = LockState::new(
            now,
            config.lock_end_time,
            config.control_day,
            config.control_period,
        )?;

        let roles = Roles {
            owner: config.owner.clone(),
            reserve_owner: config.reserve_owner,
            royalty_wallet: config.royalty_wallet,
        };
        Self::write(&env, &DataKey::Roles, &roles);
        if let Some(dao) = dao {
            Self::write(&env, &DataKey::Dao, &dao);
        }
        Self::write(
            &env,
            &DataKey::Tokens,
            &Tokens {
                launch: config.launch_token,
                collateral: config.collateral_token,
            },
        );
        Self::write(&env, &DataKey::Curve, &config.curve);
        Self::write(&env, &DataKey::RoyaltyPercent, &config.royalty_profit_percent);
        if let Some(royalty_contract) = royalty_contract {
            Self::write(&env, &DataKey::RoyaltyContract, &royalty_contract);
        }
        if let Some(oracle) = collateral_oracle {
            Self::write(&env, &DataKey::Oracle, &oracle);
        }
        Self::write(
            &env,
            &DataKey::OracleFloor,
            &config.collateral_min_oracle_value,
        );
        Self::write(&env, &DataKey::Lock, &lock);
        Self::write(&env, &DataKey::Ledger, &Ledger::new(config.profit_in_time));
        for mm in config.market_makers.iter() {
            Self::write(&env, &DataKey::MarketMaker(mm), &true);
        }
        for rw in config.return_wallets.iter() {
            Self::write(&env, &DataKey::ReturnWallet(rw), &true);
        }
        for old in config.old_contracts.iter() {
            Self::write(&env, &DataKey::OldContract(old), &true);
        }

        env.events()
            .publish((EVENT_INIT, config.owner), (lock.lock_end_time, lock.control_period));
        Ok(())
    }

    // ── Lock control ─────────────────────────────────────────

    /// Move the lock end further out. Never more than five years from now.
    pub fn extend_lock(env: Env, caller: Address, new_end: u64) -> Result<(), LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        let mut lock = Self::lock_state(&env)?;
        lock.extend(env.ledger().timestamp(), new_end)?;
        Self::write(&env, &DataKey::Lock, &lock);
        env.events().publish((EVENT_LOCK_EXTENDED, caller), new_end);
        Ok(())
    }

    /// Flip the deferred-withdrawal switch. Returns the new state.
    pub fn toggle_deferred_withdrawal(env: Env, caller: Address) -> Result<bool, LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        let mut lock = Self::lock_state(&env)?;
        let enabled = lock.toggle_withdrawal(env.ledger().timestamp())?;
        Self::write(&env, &DataKey::Lock, &lock);
        env.events().publish((EVENT_WITHDRAWAL_TOGGLED, caller), enabled);
        Ok(enabled)
    }

    pub fn trading_opportunity(env: Env) -> Result<bool, LaunchLockError> {
        Ok(Self::lock_state(&env)?.trading_opportunity(env.ledger().timestamp()))
    }

    pub fn remaining_seconds(env: Env) -> Result<u64, LaunchLockError> {
        Ok(Self::lock_state(&env)?.remaining_seconds(env.ledger().timestamp()))
    }

    pub fn is_control_day(env: Env) -> Result<bool, LaunchLockError> {
        Ok(Self::lock_state(&env)?.is_control_day(env.ledger().timestamp()))
    }

    pub fn get_lock_state(env: Env) -> Result<LockState, LaunchLockError> {
        Self::lock_state(&env)
    }

    /// Register a retired deployment. Not while the control window is open.
    pub fn register_old_contract(
        env: Env,
        caller: Address,
        old_contract: Address,
    ) -> Result<(), LaunchLockError> {
        let roles = Self::require_owner(&env, &caller)?;
        Self::lock_state(&env)?.require_outside_control_day(env.ledger().timestamp())?;
        if old_contract == roles.owner || old_contract == env.current_contract_address() {
            return Err(LaunchLockError::InvalidAddress);
        }
        Self::write(&env, &DataKey::OldContract(old_contract.clone()), &true);
        env.events().publish((EVENT_OLD_CONTRACT, caller), old_contract);
        Ok(())
    }

    // ── Roles ────────────────────────────────────────────────

    /// Reserve owner hands the owner role on. When one address held both
    /// roles, both move.
    pub fn transfer_ownership(
        env: Env,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        let mut roles = Self::roles(&env)?;
        if caller != roles.reserve_owner {
            return Err(LaunchLockError::OnlyReserveOwner);
        }
        if Self::flag(&env, &DataKey::OldContract(new_owner.clone())) {
            return Err(LaunchLockError::InvalidAddress);
        }
        if roles.owner == roles.reserve_owner {
            roles.reserve_owner = new_owner.clone();
        }
        let previous = core::mem::replace(&mut roles.owner, new_owner.clone());
        Self::write(&env, &DataKey::Roles, &roles);
        env.events().publish((EVENT_OWNER, previous), new_owner);
        Ok(())
    }

    pub fn set_reserve_owner(
        env: Env,
        caller: Address,
        new_reserve_owner: Address,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        let mut roles = Self::roles(&env)?;
        if caller != roles.reserve_owner {
            return Err(LaunchLockError::OnlyReserveOwner);
        }
        if Self::flag(&env, &DataKey::OldContract(new_reserve_owner.clone())) {
            return Err(LaunchLockError::InvalidAddress);
        }
        roles.reserve_owner = new_reserve_owner.clone();
        Self::write(&env, &DataKey::Roles, &roles);
        env.events()
            .publish((EVENT_RESERVE_OWNER, caller), new_reserve_owner);
        Ok(())
    }

    /// The DAO (the owner while none is set) names its successor.
    pub fn set_dao_address(env: Env, caller: Address, new_dao: Address) -> Result<(), LaunchLockError> {
        Self::require_dao(&env, &caller)?;
        Self::write(&env, &DataKey::Dao, &new_dao);
        env.events().publish((EVENT_DAO, caller), new_dao);
        Ok(())
    }

    /// Only the current royalty wallet can move the royalty role.
    pub fn set_royalty_wallet(
        env: Env,
        caller: Address,
        new_wallet: Address,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        let mut roles = Self::roles(&env)?;
        if caller != roles.royalty_wallet {
            return Err(LaunchLockError::OnlyRoyaltyWalletCanChange);
        }
        roles.royalty_wallet = new_wallet.clone();
        Self::write(&env, &DataKey::Roles, &roles);
        env.events().publish((EVENT_ROYALTY_WALLET, caller), new_wallet);
        Ok(())
    }

    pub fn set_market_maker(
        env: Env,
        caller: Address,
        market_maker: Address,
        enabled: bool,
    ) -> Result<(), LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        Self::write(&env, &DataKey::MarketMaker(market_maker.clone()), &enabled);
        env.events()
            .publish((EVENT_MARKET_MAKER, market_maker), enabled);
        Ok(())
    }

    pub fn set_return_wallet(
        env: Env,
        caller: Address,
        wallet: Address,
        enabled: bool,
    ) -> Result<(), LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        Self::write(&env, &DataKey::ReturnWallet(wallet.clone()), &enabled);
        env.events().publish((EVENT_RETURN_WALLET, wallet), enabled);
        Ok(())
    }

    pub fn get_roles(env: Env) -> Result<Roles, LaunchLockError> {
        Self::roles(&env)
    }

    /// Effective DAO address (the owner while none is set).
    pub fn get_dao(env: Env) -> Result<Address, LaunchLockError> {
        Ok(Self::dao(&env, &Self::roles(&env)?))
    }

    pub fn is_market_maker(env: Env, address: Address) -> bool {
        Self::flag(&env, &DataKey::MarketMaker(address))
    }

    pub fn is_return_wallet(env: Env, address: Address) -> bool {
        Self::flag(&env, &DataKey::ReturnWallet(address))
    }

    pub fn is_old_contract(env: Env, address: Address) -> bool {
        Self::flag(&env, &DataKey::OldContract(address))
    }

    // ── Profit settings ──────────────────────────────────────

    /// The owner may only raise the royalty share, the royalty wallet may
    /// only lower it.
    pub fn change_profit_percentage(
        env: Env,
        caller: Address,
        new_royalty_percent: u32,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        let roles = Self::roles(&env)?;
        let is_owner = caller == roles.owner;
        let is_royalty = caller == roles.royalty_wallet;
        if !is_owner && !is_royalty {
            return Err(LaunchLockError::AccessDenied);
        }
        let current: u32 = Self::read(&env, &DataKey::RoyaltyPercent)?;
        if new_royalty_percent == 0
            || new_royalty_percent as i128 > PERCENTAGE_DIVISOR
            || new_royalty_percent == current
        {
            return Err(LaunchLockError::InvalidPercentage);
        }
        let raising = new_royalty_percent > current;
        if (raising && !is_owner) || (!raising && !is_royalty) {
            return Err(LaunchLockError::InvalidPercentage);
        }
        Self::write(&env, &DataKey::RoyaltyPercent, &new_royalty_percent);
        env.events().publish(
            (EVENT_PROFIT_PERCENT, caller),
            (new_royalty_percent, creator_percent(new_royalty_percent)),
        );
        Ok(())
    }

    /// `(royalty, creator)` shares of profit; they sum to `PERCENTAGE_DIVISOR`.
    pub fn get_profit_shares(env: Env) -> Result<(u32, u32), LaunchLockError> {
        let royalty: u32 = Self::read(&env, &DataKey::RoyaltyPercent)?;
        Ok((royalty, creator_percent(royalty)))
    }

    /// Switch between paying profit on every buy and accumulating it for
    /// `claim_profit_on_request`. The royalty contract is told, but a failing
    /// notification does not stop the switch.
    pub fn switch_profit_mode(
        env: Env,
        caller: Address,
        profit_in_time: bool,
    ) -> Result<(), LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        let mut ledger = Self::ledger(&env)?;
        ledger.profit_in_time = profit_in_time;
        Self::write(&env, &DataKey::Ledger, &ledger);
        env.events()
            .publish((EVENT_PROFIT_MODE, caller), profit_in_time);

        let royalty_contract: Option<Address> =
            env.storage().persistent().get(&DataKey::RoyaltyContract);
        if let Some(royalty_contract) = royalty_contract {
            let notifier = RoyaltyNotifierClient::new(&env, &royalty_contract);
            match notifier.try_profit_mode_changed(&env.current_contract_address(), &profit_in_time)
            {
                Ok(Ok(())) => {}
                _ => log!(&env, "royalty notification failed: {}", royalty_contract),
            }
        }
        Ok(())
    }

    /// Pay out accumulated profit to the owner and/or royalty wallet.
    pub fn claim_profit_on_request(env: Env, caller: Address) -> Result<i128, LaunchLockError> {
        caller.require_auth();
        let roles = Self::roles(&env)?;
        let is_owner = caller == roles.owner;
        let is_royalty = caller == roles.royalty_wallet;
        if !is_owner && !is_royalty {
            return Err(LaunchLockError::AccessDenied);
        }
        let mut ledger = Self::ledger(&env)?;
        let mut amount: i128 = 0;
        if is_owner {
            amount = amount.saturating_add(ledger.take_profit(false));
        }
        if is_royalty {
            amount = amount.saturating_add(ledger.take_profit(true));
        }
        if amount <= 0 {
            return Err(LaunchLockError::NoProfitAvailable);
        }
        Self::write(&env, &DataKey::Ledger, &ledger);

        let tokens = Self::tokens(&env)?;
        Self::pay(
            &env,
            &tokens.collateral,
            &env.current_contract_address(),
            &caller,
            amount,
        );
        env.events().publish((EVENT_CLAIM, caller), amount);
        Ok(amount)
    }

    // ── Trading ──────────────────────────────────────────────

    /// Buy `amount` launch tokens along the curve, paying collateral.
    /// Returns the quote that was charged.
    pub fn buy_launch_tokens(
        env: Env,
        caller: Address,
        amount: i128,
    ) -> Result<Quote, LaunchLockError> {
        caller.require_auth();
        Self::require_positive_amount(amount)?;
        let roles = Self::roles(&env)?;
        if caller == roles.owner {
            return Err(LaunchLockError::UseDepositFunctionForOwners);
        }
        let mut ledger = Self::ledger(&env)?;
        ledger.require_trading()?;
        Self::require_trader(&env, &caller, &Self::lock_state(&env)?)?;
        Self::check_collateral_value(&env)?;

        let quote = Self::curve(&env)?.quote_buy(ledger.total_launch_sold, amount)?;
        let royalty_percent: u32 = Self::read(&env, &DataKey::RoyaltyPercent)?;
        let split = ProfitSplit::new(quote.profit, royalty_percent)?;
        ledger.record_buy(amount, &quote, &split)?;
        Self::write(&env, &DataKey::Ledger, &ledger);

        let tokens = Self::tokens(&env)?;
        let this = env.current_contract_address();
        Self::pay(&env, &tokens.collateral, &caller, &this, quote.gross);
        if ledger.profit_in_time {
            Self::pay(&env, &tokens.collateral, &this, &roles.royalty_wallet, split.royalty);
            Self::pay(&env, &tokens.collateral, &this, &roles.owner, split.creator);
        }
        Self::pay(&env, &tokens.launch, &this, &caller, amount);

        env.events()
            .publish((EVENT_BUY, caller), (amount, quote.gross, quote.profit));
        Ok(quote)
    }

    /// Sell `amount` launch tokens back into the curve. Returns the
    /// collateral paid out.
    pub fn sell_launch_tokens(env: Env, caller: Address, amount: i128) -> Result<i128, LaunchLockError> {
        caller.require_auth();
        Self::require_positive_amount(amount)?;
        let mut ledger = Self::ledger(&env)?;
        ledger.require_trading()?;
        Self::require_trader(&env, &caller, &Self::lock_state(&env)?)?;
        Self::check_collateral_value(&env)?;
        if amount > ledger.launch_available()? {
            return Err(LaunchLockError::InsufficientAmount);
        }

        let refund = Self::curve(&env)?.quote_sell(ledger.total_launch_sold, amount)?;
        ledger.record_sell(amount, refund)?;
        Self::write(&env, &DataKey::Ledger, &ledger);

        let tokens = Self::tokens(&env)?;
        let this = env.current_contract_address();
        Self::pay(&env, &tokens.launch, &caller, &this, amount);
        Self::pay(&env, &tokens.collateral, &this, &caller, refund);

        env.events().publish((EVENT_SELL, caller), (amount, refund));
        Ok(refund)
    }

    /// Guaranteed buyback from a return wallet. Returns the collateral paid out.
    pub fn sell_launch_tokens_return_wallet(
        env: Env,
        caller: Address,
        amount: i128,
    ) -> Result<i128, LaunchLockError> {
        caller.require_auth();
        Self::require_positive_amount(amount)?;
        if !Self::flag(&env, &DataKey::ReturnWallet(caller.clone())) {
            return Err(LaunchLockError::AccessDenied);
        }
        let mut ledger = Self::ledger(&env)?;
        ledger.require_trading()?;
        Self::check_collateral_value(&env)?;
        if amount > ledger.launch_available()? {
            return Err(LaunchLockError::InsufficientAmount);
        }

        let payout = Self::curve(&env)?.quote_buyback(ledger.launch_tokens_earned, amount)?;
        ledger.record_buyback(amount, payout)?;
        Self::write(&env, &DataKey::Ledger, &ledger);

        let tokens = Self::tokens(&env)?;
        let this = env.current_contract_address();
        Self::pay(&env, &tokens.launch, &caller, &this, amount);
        Self::pay(&env, &tokens.collateral, &this, &caller, payout);

        env.events().publish((EVENT_BUYBACK, caller), (amount, payout));
        Ok(payout)
    }

    /// Launch tokens `sold - earned` that the buyback paths can still take back.
    pub fn launch_available(env: Env) -> Result<i128, LaunchLockError> {
        Self::ledger(&env)?.launch_available()
    }

    /// Unit price of the next launch token, collateral per whole token.
    pub fn current_price(env: Env) -> Result<i128, LaunchLockError> {
        let ledger = Self::ledger(&env)?;
        Self::curve(&env)?.price_at(ledger.total_launch_sold)
    }

    pub fn quote_buy(env: Env, amount: i128) -> Result<Quote, LaunchLockError> {
        Self::require_positive_amount(amount)?;
        let ledger = Self::ledger(&env)?;
        Self::curve(&env)?.quote_buy(ledger.total_launch_sold, amount)
    }

    pub fn quote_sell(env: Env, amount: i128) -> Result<i128, LaunchLockError> {
        Self::require_positive_amount(amount)?;
        let ledger = Self::ledger(&env)?;
        if amount > ledger.launch_available()? {
            return Err(LaunchLockError::InsufficientAmount);
        }
        Self::curve(&env)?.quote_sell(ledger.total_launch_sold, amount)
    }

    pub fn get_ledger(env: Env) -> Result<Ledger, LaunchLockError> {
        Self::ledger(&env)
    }

    pub fn get_curve(env: Env) -> Result<CurveParams, LaunchLockError> {
        Self::curve(&env)
    }

    // ── Deposits ─────────────────────────────────────────────

    /// Fund the curve with launch tokens. Owner or a retired deployment.
    /// The first deposit also registers tokens sent to the contract before it.
    pub fn deposit_launch_tokens(
        env: Env,
        caller: Address,
        amount: i128,
    ) -> Result<(), LaunchLockError> {
        caller.require_auth();
        Self::require_positive_amount(amount)?;
        let roles = Self::roles(&env)?;
        Self::require_depositor(&env, &caller, &roles)?;
        let mut ledger = Self::ledger(&env)?;
        ledger.require_active()?;

        let tokens = Self::tokens(&env)?;
        let prefunded = if ledger.is_initialized {
            0
        } else {
            token::Client::new(&env, &tokens.launch).balance(&env.current_contract_address())
        };
        ledger.record_launch_deposit(amount, prefunded)?;
        Self::write(&env, &DataKey::Ledger, &ledger);
        Self::pull_deposit(&env, &tokens.launch, &caller, &roles, amount);

        env.events()
            .publish((EVENT_DEPOSIT_LAUNCH, caller), (amount, prefunded));
        Ok(())
    }

    /// Add collateral backing. Owner or a retired deployment.
    pub fn deposit_collateral(env: Env, caller: Address, amount: i128) -> Result<(), LaunchLockError> {
        caller.require_auth();
        Self::require_positive_amount(amount)?;
        let roles = Self::roles(&env)?;
        Self::require_depositor(&env, &caller, &roles)?;
        let mut ledger = Self::ledger(&env)?;
        ledger.require_active()?;
        Self::check_collateral_value(&env)?;

        ledger.record_collateral_deposit(amount)?;
        Self::write(&env, &DataKey::Ledger, &ledger);
        let tokens = Self::tokens(&env)?;
        Self::pull_deposit(&env, &tokens.collateral, &caller, &roles, amount);

        env.events()
            .publish((EVENT_DEPOSIT_COLLATERAL, caller), amount);
        Ok(())
    }

    // ── DAO emergency paths ──────────────────────────────────

    /// Sweep every launch token to the DAO after the lock ends. Closes the
    /// lock permanently.
    pub fn withdraw_all_launch_tokens(env: Env, caller: Address) -> Result<i128, LaunchLockError> {
        Self::require_dao(&env, &caller)?;
        if !Self::lock_state(&env)?.is_lock_over(env.ledger().timestamp()) {
            return Err(LaunchLockError::LockPeriodNotEnded);
        }
        let tokens = Self::tokens(&env)?;
        let this = env.current_contract_address();
        let launch = token::Client::new(&env, &tokens.launch);
        let balance = launch.balance(&this);
        if balance <= 0 {
            return Err(LaunchLockError::NoTokensToWithdraw);
        }
        let mut ledger = Self::ledger(&env)?;
        ledger.shut_down();
        Self::write(&env, &DataKey::Ledger, &ledger);
        launch.transfer(&this, &caller, &balance);

        env.events().publish((EVENT_DAO_LAUNCH, caller), balance);
        Ok(balance)
    }

    /// Sweep every collateral token, unclaimed profit included, to the DAO
    /// after the lock ends.
    pub fn withdraw_all_collateral_tokens(
        env: Env,
        caller: Address,
    ) -> Result<i128, LaunchLockError> {
        Self::require_dao(&env, &caller)?;
        if !Self::lock_state(&env)?.is_lock_over(env.ledger().timestamp()) {
            return Err(LaunchLockError::LockPeriodNotEnded);
        }
        let tokens = Self::tokens(&env)?;
        let this = env.current_contract_address();
        let collateral = token::Client::new(&env, &tokens.collateral);
        let balance = collateral.balance(&this);
        if balance <= 0 {
            return Err(LaunchLockError::NoCollateralTokensToWithdraw);
        }
        let mut ledger = Self::ledger(&env)?;
        ledger.clear_collateral();
        Self::write(&env, &DataKey::Ledger, &ledger);
        collateral.transfer(&this, &caller, &balance);

        env.events()
            .publish((EVENT_DAO_COLLATERAL, caller), balance);
        Ok(balance)
    }

    /// Rescue any other token sent to the contract by mistake.
    pub fn withdraw_token(
        env: Env,
        caller: Address,
        token: Address,
        amount: i128,
    ) -> Result<(), LaunchLockError> {
        Self::require_dao(&env, &caller)?;
        let tokens = Self::tokens(&env)?;
        if token == tokens.launch || token == tokens.collateral {
            return Err(LaunchLockError::InvalidTokenForWithdrawal);
        }
        Self::require_positive_amount(amount)?;
        Self::pay(&env, &token, &env.current_contract_address(), &caller, amount);
        env.events().publish((EVENT_RESCUE, caller), (token, amount));
        Ok(())
    }

    // ── Deferred withdrawals ─────────────────────────────────

    /// Schedule `amount` launch tokens for `recipient`, confirmable 30 days
    /// from now for 7 days.
    pub fn schedule_launch_withdrawal(
        env: Env,
        caller: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<u64, LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        Self::ledger(&env)?.require_active()?;
        if !Self::lock_state(&env)?.can_withdrawal {
            return Err(LaunchLockError::DeferredWithdrawalBlocked);
        }
        if amount <= 0 || recipient == env.current_contract_address() {
            return Err(LaunchLockError::InvalidRecipientOrAmount);
        }
        let request = DeferredWithdrawal::schedule(
            Self::withdrawal(&env, &DataKey::LaunchWithdrawal).as_ref(),
            WithdrawalAsset::Launch,
            recipient.clone(),
            amount,
            env.ledger().timestamp(),
        )?;
        Self::write(&env, &DataKey::LaunchWithdrawal, &request);
        env.events().publish(
            (EVENT_LAUNCH_WD_SCHEDULED, recipient),
            (amount, request.scheduled_date),
        );
        Ok(request.scheduled_date)
    }

    /// Owner or royalty wallet.
    pub fn cancel_launch_withdrawal(env: Env, caller: Address) -> Result<(), LaunchLockError> {
        Self::cancel_withdrawal(
            &env,
            &caller,
            DataKey::LaunchWithdrawal,
            EVENT_LAUNCH_WD_CANCELLED,
        )
    }

    pub fn confirm_launch_withdrawal(env: Env, caller: Address) -> Result<i128, LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        if !Self::lock_state(&env)?.can_withdrawal {
            return Err(LaunchLockError::DeferredWithdrawalBlocked);
        }
        let request =
            DeferredWithdrawal::require_scheduled(Self::withdrawal(&env, &DataKey::LaunchWithdrawal))?;
        request.check_confirmable(WithdrawalAsset::Launch, env.ledger().timestamp())?;
        let mut ledger = Self::ledger(&env)?;
        ledger.record_launch_withdrawal(request.amount)?;
        Self::write(&env, &DataKey::Ledger, &ledger);
        env.storage().persistent().remove(&DataKey::LaunchWithdrawal);

        let tokens = Self::tokens(&env)?;
        Self::push_to_receiver(
            &env,
            &tokens.launch,
            &request.recipient,
            request.amount,
            WithdrawalAsset::Launch,
        )?;
        env.events().publish(
            (EVENT_LAUNCH_WD_CONFIRMED, request.recipient),
            request.amount,
        );
        Ok(request.amount)
    }

    /// Schedule the whole collateral backing for `recipient`. The amount is
    /// taken at confirmation; the event reports the balance at scheduling.
    pub fn schedule_collateral_withdrawal(
        env: Env,
        caller: Address,
        recipient: Address,
    ) -> Result<u64, LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        let ledger = Self::ledger(&env)?;
        ledger.require_active()?;
        if !Self::lock_state(&env)?.can_withdrawal {
            return Err(LaunchLockError::DeferredWithdrawalBlocked);
        }
        if recipient == env.current_contract_address() {
            return Err(LaunchLockError::InvalidRecipient);
        }
        let request = DeferredWithdrawal::schedule(
            Self::withdrawal(&env, &DataKey::CollateralWithdrawal).as_ref(),
            WithdrawalAsset::Collateral,
            recipient.clone(),
            0,
            env.ledger().timestamp(),
        )?;
        Self::write(&env, &DataKey::CollateralWithdrawal, &request);
        env.events().publish(
            (EVENT_COLLATERAL_WD_SCHEDULED, recipient),
            (ledger.contract_collateral_balance, request.scheduled_date),
        );
        Ok(request.scheduled_date)
    }

    /// Owner or royalty wallet.
    pub fn cancel_collateral_withdrawal(env: Env, caller: Address) -> Result<(), LaunchLockError> {
        Self::cancel_withdrawal(
            &env,
            &caller,
            DataKey::CollateralWithdrawal,
            EVENT_COLLATERAL_WD_CANCELLED,
        )
    }

    pub fn confirm_collateral_withdrawal(
        env: Env,
        caller: Address,
    ) -> Result<i128, LaunchLockError> {
        Self::require_owner(&env, &caller)?;
        if !Self::lock_state(&env)?.can_withdrawal {
            return Err(LaunchLockError::DeferredWithdrawalBlocked);
        }
        let request = DeferredWithdrawal::require_scheduled(Self::withdrawal(
            &env,
            &DataKey::CollateralWithdrawal,
        ))?;
        request.check_confirmable(WithdrawalAsset::Collateral, env.ledger().timestamp())?;
        let mut ledger = Self::ledger(&env)?;
        let amount = ledger.take_collateral_balance()?;
        Self::write(&env, &DataKey::Ledger, &ledger);
        env.storage().persistent().remove(&DataKey::CollateralWithdrawal);

        let tokens = Self::tokens(&env)?;
        Self::push_to_receiver(
            &env,
            &tokens.collateral,
            &request.recipient,
            amount,
            WithdrawalAsset::Collateral,
        )?;
        env.events()
            .publish((EVENT_COLLATERAL_WD_CONFIRMED, request.recipient), amount);
        Ok(amount)
    }

    pub fn get_launch_withdrawal(env: Env) -> Option<DeferredWithdrawal> {
        Self::withdrawal(&env, &DataKey::LaunchWithdrawal)
    }

    pub fn get_collateral_withdrawal(env: Env) -> Option<DeferredWithdrawal> {
        Self::withdrawal(&env, &DataKey::CollateralWithdrawal)
    }

    /// Recipient of the launch request; the owner while idle.
    pub fn deferred_launch_recipient(env: Env) -> Result<Address, LaunchLockError> {
        Ok(match Self::withdrawal(&env, &DataKey::LaunchWithdrawal) {
            Some(request) => request.recipient,
            None => Self::roles(&env)?.owner,
        })
    }

    /// Recipient of the collateral request; the owner while idle.
    pub fn deferred_collateral_recipient(env: Env) -> Result<Address, LaunchLockError> {
        Ok(match Self::withdrawal(&env, &DataKey::CollateralWithdrawal) {
            Some(request) => request.recipient,
            None => Self::roles(&env)?.owner,
        })
    }
}

mod test;
mod test_auth;
mod test_withdrawal;
