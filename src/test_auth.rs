#![cfg(test)]
use soroban_sdk::{
    testutils::{Address as _, Events as _},
    vec, Address,
};

use crate::lock::DAY;
use crate::test::{mint, setup, setup_with, LOCK_SPAN, T0, U};
use crate::LaunchLockError;

const CONTROL_DAY: u64 = T0 + 10 * DAY;

// ── auth ──────────────────────────────────────────────────────

#[test]
fn extend_lock_records_owner_auth() {
    let s = setup();
    let new_end = T0 + LOCK_SPAN + DAY;
    let before = s.env.events().all().len();
    s.client.extend_lock(&s.owner, &new_end);
    assert!(s.env.events().all().len() > before);

    let auths = s.env.auths();
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].0, s.owner);
    assert_eq!(s.client.get_lock_state().lock_end_time, new_end);
    assert_eq!(s.client.remaining_seconds(), LOCK_SPAN + DAY);
}

#[test]
fn calls_without_auth_fail_and_change_nothing() {
    let s = setup();
    s.env.set_auths(&[]);
    assert!(s
        .client
        .try_extend_lock(&s.owner, &(T0 + LOCK_SPAN + DAY))
        .is_err());
    assert!(s.client.try_switch_profit_mode(&s.owner, &true).is_err());
    assert_eq!(s.client.get_lock_state().lock_end_time, T0 + LOCK_SPAN);
    assert!(!s.client.get_ledger().profit_in_time);
}

#[test]
fn owner_only_operations_reject_others() {
    let s = setup();
    let attacker = Address::generate(&s.env);
    assert_eq!(
        s.client.try_extend_lock(&attacker, &(T0 + LOCK_SPAN + DAY)),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client.try_toggle_deferred_withdrawal(&s.royalty_wallet),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client
            .try_schedule_launch_withdrawal(&attacker, &attacker, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client.try_withdraw_token(&attacker, &s.launch, &1),
        Err(Ok(LaunchLockError::AccessDenied))
    );
}

// ── ownership ─────────────────────────────────────────────────

#[test]
fn reserve_owner_transfers_ownership() {
    let s = setup();
    let successor = Address::generate(&s.env);

    assert_eq!(
        s.client.try_transfer_ownership(&s.owner, &successor),
        Err(Ok(LaunchLockError::OnlyReserveOwner))
    );
    s.client.transfer_ownership(&s.reserve_owner, &successor);

    let roles = s.client.get_roles();
    assert_eq!(roles.owner, successor);
    assert_eq!(roles.reserve_owner, s.reserve_owner);
    assert_eq!(
        s.client.try_extend_lock(&s.owner, &(T0 + LOCK_SPAN + DAY)),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    s.client.extend_lock(&successor, &(T0 + LOCK_SPAN + DAY));
}

#[test]
fn combined_owner_and_reserve_move_together() {
    let s = setup_with(|_, c, _| c.reserve_owner = c.owner.clone());
    assert_eq!(s.reserve_owner, s.owner);
    let successor = Address::generate(&s.env);

    s.client.transfer_ownership(&s.owner, &successor);
    let roles = s.client.get_roles();
    assert_eq!(roles.owner, successor);
    assert_eq!(roles.reserve_owner, successor);
}

#[test]
fn old_contract_cannot_become_owner() {
    let mut retired = None;
    let s = setup_with(|env, c, _| {
        let old = Address::generate(env);
        retired = Some(old.clone());
        c.old_contracts = vec![env, old];
    });
    let retired = retired.unwrap();
    assert!(s.client.is_old_contract(&retired));

    assert_eq!(
        s.client.try_transfer_ownership(&s.reserve_owner, &retired),
        Err(Ok(LaunchLockError::InvalidAddress))
    );
    assert_eq!(
        s.client.try_set_reserve_owner(&s.reserve_owner, &retired),
        Err(Ok(LaunchLockError::InvalidAddress))
    );
    assert_eq!(s.client.get_roles().owner, s.owner);
}

#[test]
fn reserve_owner_names_its_successor() {
    let s = setup();
    let next = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_reserve_owner(&s.owner, &next),
        Err(Ok(LaunchLockError::OnlyReserveOwner))
    );
    s.client.set_reserve_owner(&s.reserve_owner, &next);
    assert_eq!(s.client.get_roles().reserve_owner, next);
}

// ── DAO and royalty wallet ────────────────────────────────────

#[test]
fn dao_defaults_to_owner_until_set() {
    let s = setup();
    assert_eq!(s.client.get_dao(), s.owner);

    let dao = Address::generate(&s.env);
    s.client.set_dao_address(&s.owner, &dao);
    assert_eq!(s.client.get_dao(), dao);

    let other = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_dao_address(&s.owner, &other),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    s.client.set_dao_address(&dao, &other);
    assert_eq!(s.client.get_dao(), other);
}

#[test]
fn dao_given_at_initialization_is_used() {
    let mut named = None;
    let s = setup_with(|env, _, extra| {
        let dao = Address::generate(env);
        named = Some(dao.clone());
        extra.dao = Some(dao);
    });
    let dao = named.unwrap();
    assert_eq!(s.client.get_dao(), dao);
    assert_eq!(
        s.client.try_set_dao_address(&s.owner, &s.owner),
        Err(Ok(LaunchLockError::AccessDenied))
    );
}

#[test]
fn only_royalty_wallet_moves_royalty_role() {
    let s = setup();
    let next = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_royalty_wallet(&s.owner, &next),
        Err(Ok(LaunchLockError::OnlyRoyaltyWalletCanChange))
    );
    s.client.set_royalty_wallet(&s.royalty_wallet, &next);
    assert_eq!(s.client.get_roles().royalty_wallet, next);

    // the new wallet inherits the right to lower the share
    s.client.change_profit_percentage(&next, &150);
    assert_eq!(
        s.client.try_change_profit_percentage(&s.royalty_wallet, &100),
        Err(Ok(LaunchLockError::AccessDenied))
    );
}

// ── profit percentage ─────────────────────────────────────────

#[test]
fn owner_raises_and_royalty_lowers_the_share() {
    let s = setup();
    s.client.change_profit_percentage(&s.owner, &300);
    assert_eq!(s.client.get_profit_shares(), (300, 700));
    assert_eq!(
        s.client.try_change_profit_percentage(&s.owner, &250),
        Err(Ok(LaunchLockError::InvalidPercentage))
    );

    s.client.change_profit_percentage(&s.royalty_wallet, &100);
    assert_eq!(s.client.get_profit_shares(), (100, 900));
    assert_eq!(
        s.client.try_change_profit_percentage(&s.royalty_wallet, &150),
        Err(Ok(LaunchLockError::InvalidPercentage))
    );
}

#[test]
fn profit_share_rejects_zero_same_and_above_divisor() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_change_profit_percentage(&stranger, &300),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    for bad in [0u32, 200, 1_001] {
        assert_eq!(
            s.client.try_change_profit_percentage(&s.owner, &bad),
            Err(Ok(LaunchLockError::InvalidPercentage))
        );
    }
    s.client.change_profit_percentage(&s.owner, &1_000);
    assert_eq!(s.client.get_profit_shares(), (1_000, 0));
}

// ── control day ───────────────────────────────────────────────

#[test]
fn control_day_opens_trading_to_any_holder() {
    let s = setup();
    s.fund();
    let holder = Address::generate(&s.env);
    mint(&s.env, &s.collateral, &holder, 100 * U);

    s.at(CONTROL_DAY - 1);
    assert!(!s.client.is_control_day());
    assert_eq!(
        s.client.try_buy_launch_tokens(&holder, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    s.at(CONTROL_DAY);
    assert!(s.client.is_control_day());
    s.client.buy_launch_tokens(&holder, &U);

    s.at(CONTROL_DAY + DAY - 1);
    s.client.sell_launch_tokens(&holder, &U);
    s.client.buy_launch_tokens(&holder, &U);

    s.at(CONTROL_DAY + DAY);
    assert!(!s.client.is_control_day());
    assert_eq!(
        s.client.try_buy_launch_tokens(&holder, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client.try_sell_launch_tokens(&holder, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    // next period
    s.at(CONTROL_DAY + 30 * DAY);
    assert!(s.client.is_control_day());
    s.client.sell_launch_tokens(&holder, &U);
    assert_eq!(s.balance(&s.launch, &holder), 0);
}

#[test]
fn role_lists_change_any_day() {
    let s = setup();
    let mm = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_market_maker(&mm, &mm, &true),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    s.client.set_market_maker(&s.owner, &mm, &true);
    s.client.set_market_maker(&s.owner, &s.market_maker, &false);
    assert!(s.client.is_market_maker(&mm));
    assert!(!s.client.is_market_maker(&s.market_maker));

    s.at(CONTROL_DAY);
    s.client.set_return_wallet(&s.owner, &mm, &true);
    assert!(s.client.is_return_wallet(&mm));
}

#[test]
fn removed_market_maker_can_no_longer_trade() {
    let s = setup();
    s.fund();
    s.client.buy_launch_tokens(&s.market_maker, &U);

    s.client.set_market_maker(&s.owner, &s.market_maker, &false);
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.market_maker, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );
    assert_eq!(
        s.client.try_sell_launch_tokens(&s.market_maker, &U),
        Err(Ok(LaunchLockError::AccessDenied))
    );

    // like any holder, it trades again on the control day
    s.at(CONTROL_DAY);
    s.client.sell_launch_tokens(&s.market_maker, &U);
}

#[test]
fn old_contracts_register_outside_the_control_window() {
    let s = setup();
    let old = Address::generate(&s.env);
    let later = Address::generate(&s.env);
    assert_eq!(
        s.client.try_register_old_contract(&s.owner, &s.owner),
        Err(Ok(LaunchLockError::InvalidAddress))
    );
    assert_eq!(
        s.client.try_register_old_contract(&s.owner, &s.id),
        Err(Ok(LaunchLockError::InvalidAddress))
    );
    s.client.register_old_contract(&s.owner, &old);
    assert!(s.client.is_old_contract(&old));

    s.at(CONTROL_DAY);
    assert_eq!(
        s.client.try_register_old_contract(&s.owner, &later),
        Err(Ok(LaunchLockError::ControlWindowOpen))
    );
    s.at(CONTROL_DAY + DAY - 1);
    assert_eq!(
        s.client.try_register_old_contract(&s.owner, &later),
        Err(Ok(LaunchLockError::ControlWindowOpen))
    );
    assert!(!s.client.is_old_contract(&later));

    s.at(CONTROL_DAY + DAY);
    s.client.register_old_contract(&s.owner, &later);
    assert!(s.client.is_old_contract(&later));
}

#[test]
fn owner_cannot_buy_own_tokens() {
    let s = setup();
    s.fund();
    s.at(T0 + LOCK_SPAN - DAY);
    assert_eq!(
        s.client.try_buy_launch_tokens(&s.owner, &U),
        Err(Ok(LaunchLockError::UseDepositFunctionForOwners))
    );
}
