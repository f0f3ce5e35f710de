#![cfg(test)]
use soroban_sdk::{
    contract, contractimpl, symbol_short, testutils::Address as _, token, vec, Address, Env,
};

use crate::lock::DAY;
use crate::test::{
    base_config, mint, setup, MockReceiver, MockReceiverClient, Setup, LOCK_SPAN, T0, U,
};
use crate::withdrawal::{WITHDRAWAL_CONFIRM_WINDOW, WITHDRAWAL_DELAY};
use crate::{LaunchLock, LaunchLockClient, LaunchLockError};

fn receiver(s: &Setup) -> Address {
    let id = s.env.register_contract(None, MockReceiver);
    MockReceiverClient::new(&s.env, &id).init(&s.launch, &s.collateral);
    id
}

/// Recipient whose hook pulls one stroop less than approved.
#[contract]
pub struct ShortReceiver;

#[contractimpl]
impl ShortReceiver {
    pub fn init(env: Env, launch: Address, collateral: Address) {
        env.storage()
            .instance()
            .set(&symbol_short!("tokens"), &(launch, collateral));
    }

    pub fn deposit_launch_tokens(env: Env, caller: Address, amount: i128) {
        let (launch, _): (Address, Address) =
            env.storage().instance().get(&symbol_short!("tokens")).unwrap();
        let this = env.current_contract_address();
        token::Client::new(&env, &launch).transfer_from(&this, &caller, &this, &(amount - 1));
    }

    pub fn deposit_collateral(env: Env, caller: Address, amount: i128) {
        let (_, collateral): (Address, Address) =
            env.storage().instance().get(&symbol_short!("tokens")).unwrap();
        let this = env.current_contract_address();
        token::Client::new(&env, &collateral).transfer_from(&this, &caller, &this, &(amount - 1));
    }
}

fn short_receiver(s: &Setup) -> Address {
    let id = s.env.register_contract(None, ShortReceiver);
    ShortReceiverClient::new(&s.env, &id).init(&s.launch, &s.collateral);
    id
}

// ── switch ────────────────────────────────────────────────────

#[test]
fn withdrawal_switch_reenables_only_near_lock_end() {
    let s = setup();
    assert!(s.client.get_lock_state().can_withdrawal);
    assert!(!s.client.toggle_deferred_withdrawal(&s.owner));
    assert_eq!(
        s.client.try_toggle_deferred_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::CannotActivateWithdrawalTooCloseToLockEnd))
    );

    s.at(T0 + LOCK_SPAN - 60 * DAY);
    assert_eq!(
        s.client.try_toggle_deferred_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::CannotActivateWithdrawalTooCloseToLockEnd))
    );
    s.at(T0 + LOCK_SPAN - 60 * DAY + 1);
    assert!(s.client.toggle_deferred_withdrawal(&s.owner));
}

#[test]
fn disabled_switch_blocks_schedule_and_confirm() {
    let s = setup();
    s.fund();
    let to = receiver(&s);
    s.client.schedule_launch_withdrawal(&s.owner, &to, &U);
    s.client.toggle_deferred_withdrawal(&s.owner);

    assert_eq!(
        s.client.try_schedule_collateral_withdrawal(&s.owner, &to),
        Err(Ok(LaunchLockError::DeferredWithdrawalBlocked))
    );
    s.at(T0 + WITHDRAWAL_DELAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::DeferredWithdrawalBlocked))
    );
    // cancelling stays possible
    s.client.cancel_launch_withdrawal(&s.owner);
}

// ── scheduling ────────────────────────────────────────────────

#[test]
fn schedule_rejects_bad_requests() {
    let s = setup();
    let to = Address::generate(&s.env);
    assert_eq!(
        s.client.try_schedule_launch_withdrawal(&s.owner, &to, &0),
        Err(Ok(LaunchLockError::InvalidRecipientOrAmount))
    );
    assert_eq!(
        s.client.try_schedule_launch_withdrawal(&s.owner, &s.id, &U),
        Err(Ok(LaunchLockError::InvalidRecipientOrAmount))
    );
    assert_eq!(
        s.client.try_schedule_collateral_withdrawal(&s.owner, &s.id),
        Err(Ok(LaunchLockError::InvalidRecipient))
    );

    assert_eq!(
        s.client.schedule_launch_withdrawal(&s.owner, &to, &U),
        T0 + WITHDRAWAL_DELAY
    );
    assert_eq!(
        s.client.try_schedule_launch_withdrawal(&s.owner, &to, &U),
        Err(Ok(LaunchLockError::LaunchWithdrawalAlreadyScheduled))
    );
    s.client.schedule_collateral_withdrawal(&s.owner, &to);
    assert_eq!(
        s.client.try_schedule_collateral_withdrawal(&s.owner, &to),
        Err(Ok(LaunchLockError::CollateralWithdrawalAlreadyScheduled))
    );
}

#[test]
fn owner_or_royalty_wallet_cancels() {
    let s = setup();
    let to = Address::generate(&s.env);
    let stranger = Address::generate(&s.env);
    assert_eq!(s.client.deferred_launch_recipient(), s.owner);
    assert_eq!(
        s.client.try_cancel_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::NoDeferredWithdrawalScheduled))
    );

    s.client.schedule_launch_withdrawal(&s.owner, &to, &(5 * U));
    assert_eq!(s.client.deferred_launch_recipient(), to);
    assert_eq!(
        s.client.try_cancel_launch_withdrawal(&stranger),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    s.client.cancel_launch_withdrawal(&s.royalty_wallet);
    assert_eq!(s.client.deferred_launch_recipient(), s.owner);
    assert!(s.client.get_launch_withdrawal().is_none());

    s.client.schedule_collateral_withdrawal(&s.owner, &to);
    assert_eq!(s.client.deferred_collateral_recipient(), to);
    s.client.cancel_collateral_withdrawal(&s.owner);
    assert_eq!(s.client.deferred_collateral_recipient(), s.owner);
}

// ── launch confirmation ───────────────────────────────────────

#[test]
fn launch_confirmation_follows_the_window_and_headroom() {
    let s = setup();
    s.fund();
    let to = receiver(&s);
    s.client.buy_launch_tokens(&s.market_maker, &(500 * U));
    s.client.schedule_launch_withdrawal(&s.owner, &to, &(1_000 * U));
    let ledger = s.client.get_ledger();
    let pending = s.client.get_launch_withdrawal();

    s.at(T0 + 29 * DAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::WithdrawalDateNotReached))
    );
    s.at(T0 + 30 * DAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::InsufficientTokenBalance))
    );
    s.at(T0 + 38 * DAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::WithdrawalDateNotReached))
    );
    assert_eq!(s.client.get_ledger(), ledger);
    assert_eq!(s.client.get_launch_withdrawal(), pending);

    // buyback frees 10 tokens of headroom, not 1000
    s.client.cancel_launch_withdrawal(&s.owner);
    s.client
        .sell_launch_tokens_return_wallet(&s.return_wallet, &(10 * U));
    s.client.schedule_launch_withdrawal(&s.owner, &to, &(1_000 * U));
    s.at(T0 + 38 * DAY + WITHDRAWAL_DELAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::InsufficientAmount))
    );

    s.client.cancel_launch_withdrawal(&s.owner);
    s.client.schedule_launch_withdrawal(&s.owner, &to, &(10 * U));
    s.at(T0 + 38 * DAY + 2 * WITHDRAWAL_DELAY + WITHDRAWAL_CONFIRM_WINDOW);
    assert_eq!(s.client.confirm_launch_withdrawal(&s.owner), 10 * U);

    assert_eq!(s.balance(&s.launch, &to), 10 * U);
    assert_eq!(s.client.get_ledger().launch_balance, 500 * U);
    assert_eq!(s.balance(&s.launch, &s.id), 500 * U);
    assert!(s.client.get_launch_withdrawal().is_none());
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::NoDeferredWithdrawalScheduled))
    );
}

#[test]
fn confirm_to_recipient_without_hook_reverts() {
    let s = setup();
    s.fund();
    let plain = Address::generate(&s.env);
    s.client.schedule_launch_withdrawal(&s.owner, &plain, &U);
    let ledger = s.client.get_ledger();

    s.at(T0 + WITHDRAWAL_DELAY);
    assert!(s.client.try_confirm_launch_withdrawal(&s.owner).is_err());
    assert_eq!(s.client.get_ledger(), ledger);
    assert!(s.client.get_launch_withdrawal().is_some());
    assert_eq!(s.balance(&s.launch, &plain), 0);
}

#[test]
fn confirm_reverts_when_recipient_pulls_less() {
    let s = setup();
    s.fund();
    let to = short_receiver(&s);
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    s.client.schedule_launch_withdrawal(&s.owner, &to, &(10 * U));
    s.client.schedule_collateral_withdrawal(&s.owner, &to);
    let ledger = s.client.get_ledger();

    s.at(T0 + WITHDRAWAL_DELAY);
    assert_eq!(
        s.client.try_confirm_launch_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::InsufficientAmount))
    );
    assert_eq!(
        s.client.try_confirm_collateral_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::InsufficientAmount))
    );

    assert_eq!(s.client.get_ledger(), ledger);
    assert!(s.client.get_launch_withdrawal().is_some());
    assert!(s.client.get_collateral_withdrawal().is_some());
    assert_eq!(s.balance(&s.launch, &to), 0);
    assert_eq!(s.balance(&s.collateral, &to), 0);
    assert_eq!(s.balance(&s.launch, &s.id), 850 * U);
}

// ── collateral confirmation ───────────────────────────────────

#[test]
fn collateral_confirmation_releases_backing_only() {
    let s = setup();
    s.fund();
    let to = receiver(&s);
    s.client.buy_launch_tokens(&s.market_maker, &(150 * U));
    s.client.schedule_collateral_withdrawal(&s.owner, &to);

    s.at(T0 + WITHDRAWAL_DELAY - 1);
    assert_eq!(
        s.client.try_confirm_collateral_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::WithdrawalDateNotReached))
    );
    s.at(T0 + WITHDRAWAL_DELAY);
    assert_eq!(s.client.confirm_collateral_withdrawal(&s.owner), 1_240_000_000);

    assert_eq!(s.balance(&s.collateral, &to), 1_240_000_000);
    assert_eq!(s.balance(&s.collateral, &s.id), 310_000_000);
    let ledger = s.client.get_ledger();
    assert_eq!(ledger.contract_collateral_balance, 0);
    assert_eq!(ledger.owner_profit + ledger.royalty_profit, 310_000_000);
}

#[test]
fn collateral_window_expires() {
    let s = setup();
    s.fund();
    let to = receiver(&s);
    s.client.buy_launch_tokens(&s.market_maker, &(10 * U));
    s.client.schedule_collateral_withdrawal(&s.owner, &to);

    s.at(T0 + 38 * DAY);
    assert_eq!(
        s.client.try_confirm_collateral_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::CollateralTokenWithdrawalWindowExpired))
    );
    s.client.cancel_collateral_withdrawal(&s.royalty_wallet);
    assert_eq!(
        s.client.schedule_collateral_withdrawal(&s.owner, &to),
        T0 + 38 * DAY + WITHDRAWAL_DELAY
    );
}

#[test]
fn collateral_confirmation_needs_backing() {
    let s = setup();
    let to = receiver(&s);
    s.client.schedule_collateral_withdrawal(&s.owner, &to);
    s.at(T0 + WITHDRAWAL_DELAY);
    assert_eq!(
        s.client.try_confirm_collateral_withdrawal(&s.owner),
        Err(Ok(LaunchLockError::NoCollateralTokensToWithdraw))
    );
    assert!(s.client.get_collateral_withdrawal().is_some());
}

// ── migration ─────────────────────────────────────────────────

#[test]
fn migration_into_successor_lock() {
    let s = setup();
    s.fund();
    mint(&s.env, &s.collateral, &s.owner, 50 * U);
    s.client.deposit_collateral(&s.owner, &(50 * U));

    let successor_id = s.env.register_contract(None, LaunchLock);
    let successor = LaunchLockClient::new(&s.env, &successor_id);
    let mut config = base_config(&s.env, &s.owner, &s.launch, &s.collateral);
    config.old_contracts = vec![&s.env, s.id.clone()];
    successor.initialize(&config, &None, &None, &None);
    assert!(successor.is_old_contract(&s.id));

    s.client
        .schedule_launch_withdrawal(&s.owner, &successor_id, &(100 * U));
    s.client
        .schedule_collateral_withdrawal(&s.owner, &successor_id);

    s.at(T0 + WITHDRAWAL_DELAY);
    assert_eq!(s.client.confirm_launch_withdrawal(&s.owner), 100 * U);
    assert_eq!(s.client.confirm_collateral_withdrawal(&s.owner), 50 * U);

    let moved = successor.get_ledger();
    assert!(moved.is_initialized);
    assert_eq!(moved.launch_balance, 100 * U);
    assert_eq!(moved.unaccounted_offset, 0);
    assert_eq!(moved.contract_collateral_balance, 50 * U);
    assert_eq!(s.balance(&s.launch, &successor_id), 100 * U);
    assert_eq!(s.balance(&s.collateral, &successor_id), 50 * U);

    let left = s.client.get_ledger();
    assert_eq!(left.launch_balance, 900 * U);
    assert_eq!(left.contract_collateral_balance, 0);
}
