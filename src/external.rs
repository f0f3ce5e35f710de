//! Interfaces of the contracts the lock talks to besides the two tokens.

use soroban_sdk::{contractclient, Address, Env};

/// Receives notice when the lock switches between paying profit on every
/// buy and accumulating it. Implementations may fail; the lock ignores it.
#[contractclient(name = "RoyaltyNotifierClient")]
pub trait RoyaltyNotifier {
    fn profit_mode_changed(env: Env, lock: Address, profit_in_time: bool);
}

/// Reports the current value of the collateral token.
#[contractclient(name = "CollateralOracleClient")]
pub trait CollateralOracle {
    fn collateral_value(env: Env) -> i128;
}

/// Deposit hooks invoked on the recipient of a confirmed deferred
/// withdrawal. The lock approves `amount` for the recipient first, so the
/// recipient pulls the tokens with `transfer_from`. `LaunchLock` itself
/// implements both hooks.
#[contractclient(name = "DepositReceiverClient")]
pub trait DepositReceiver {
    fn deposit_launch_tokens(env: Env, caller: Address, amount: i128);
    fn deposit_collateral(env: Env, caller: Address, amount: i128);
}
