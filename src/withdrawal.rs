//! Deferred withdrawal state machine.
//!
//! One request per asset, absent from storage while idle. A request is
//! scheduled by the owner, becomes confirmable `WITHDRAWAL_DELAY` later and
//! stays confirmable for `WITHDRAWAL_CONFIRM_WINDOW`. Afterwards it has to
//! be cancelled and scheduled again.

use soroban_sdk::{contracttype, Address};

use crate::lock::DAY;
use crate::LaunchLockError;

pub const WITHDRAWAL_DELAY: u64 = 30 * DAY;
pub const WITHDRAWAL_CONFIRM_WINDOW: u64 = 7 * DAY;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WithdrawalAsset {
    Launch,
    Collateral,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeferredWithdrawal {
    pub recipient: Address,
    /// Requested launch amount. Zero for collateral, which releases the
    /// whole backing at confirmation.
    pub amount: i128,
    pub scheduled_date: u64,
}

impl DeferredWithdrawal {
    /// Starts a request unless `pending` is still outstanding.
    pub fn schedule(
        pending: Option<&DeferredWithdrawal>,
        asset: WithdrawalAsset,
        recipient: Address,
        amount: i128,
        now: u64,
    ) -> Result<DeferredWithdrawal, LaunchLockError> {
        if pending.is_some() {
            return Err(match asset {
                WithdrawalAsset::Launch => LaunchLockError::LaunchWithdrawalAlreadyScheduled,
                WithdrawalAsset::Collateral => {
                    LaunchLockError::CollateralWithdrawalAlreadyScheduled
                }
            });
        }
        let scheduled_date = now
            .checked_add(WITHDRAWAL_DELAY)
            .ok_or(LaunchLockError::ArithmeticOverflow)?;
        Ok(Self {
            recipient,
            amount,
            scheduled_date,
        })
    }

    pub fn require_scheduled(
        pending: Option<DeferredWithdrawal>,
    ) -> Result<DeferredWithdrawal, LaunchLockError> {
        pending.ok_or(LaunchLockError::NoDeferredWithdrawalScheduled)
    }

    /// Checks that `now` falls inside the confirmation window. An expired
    /// launch request reports the same error as one that is not due yet.
    pub fn check_confirmable(
        &self,
        asset: WithdrawalAsset,
        now: u64,
    ) -> Result<(), LaunchLockError> {
        if now < self.scheduled_date {
            return Err(LaunchLockError::WithdrawalDateNotReached);
        }
        if now > self.scheduled_date.saturating_add(WITHDRAWAL_CONFIRM_WINDOW) {
            return Err(match asset {
                WithdrawalAsset::Launch => LaunchLockError::WithdrawalDateNotReached,
                WithdrawalAsset::Collateral => {
                    LaunchLockError::CollateralTokenWithdrawalWindowExpired
                }
            });
        }
        Ok(())
    }
}
