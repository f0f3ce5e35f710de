//! Lock period, deferred-withdrawal switch and the periodic control day.

use soroban_sdk::contracttype;

use crate::LaunchLockError;

pub const DAY: u64 = 86_400;
pub const FIVE_YEARS: u64 = 5 * 365 * DAY;
/// Open-access trading and withdrawal re-activation start this close to the lock end.
pub const TRADING_OPPORTUNITY_WINDOW: u64 = 60 * DAY;
pub const MIN_CONTROL_PERIOD: u64 = 15 * DAY;
pub const MAX_CONTROL_PERIOD: u64 = 90 * DAY;
pub const CONTROL_DAY_DURATION: u64 = DAY;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockState {
    pub lock_end_time: u64,
    pub can_withdrawal: bool,
    /// Timestamp at which the first control day starts.
    pub control_day: u64,
    /// Seconds between two control days.
    pub control_period: u64,
}

impl LockState {
    /// Builds the initial state. `control_period` is clamped, not rejected.
    pub fn new(
        now: u64,
        lock_end_time: u64,
        control_day: u64,
        control_period: u64,
    ) -> Result<Self, LaunchLockError> {
        validate_lock_end(now, lock_end_time)?;
        Ok(Self {
            lock_end_time,
            can_withdrawal: true,
            control_day,
            control_period: control_period.clamp(MIN_CONTROL_PERIOD, MAX_CONTROL_PERIOD),
        })
    }

    pub fn remaining_seconds(&self, now: u64) -> u64 {
        self.lock_end_time.saturating_sub(now)
    }

    pub fn is_lock_over(&self, now: u64) -> bool {
        now >= self.lock_end_time
    }

    pub fn trading_opportunity(&self, now: u64) -> bool {
        self.remaining_seconds(now) < TRADING_OPPORTUNITY_WINDOW
    }

    pub fn extend(&mut self, now: u64, new_end: u64) -> Result<(), LaunchLockError> {
        validate_lock_end(now, new_end)?;
        if new_end <= self.lock_end_time {
            return Err(LaunchLockError::InvalidTimePeriod);
        }
        self.lock_end_time = new_end;
        Ok(())
    }

    /// Flips `can_withdrawal`. Re-enabling is only allowed inside the last
    /// 60 days of the lock.
    pub fn toggle_withdrawal(&mut self, now: u64) -> Result<bool, LaunchLockError> {
        if !self.can_withdrawal && !self.trading_opportunity(now) {
            return Err(LaunchLockError::CannotActivateWithdrawalTooCloseToLockEnd);
        }
        self.can_withdrawal = !self.can_withdrawal;
        Ok(self.can_withdrawal)
    }

    /// True during the one-day control window that recurs every
    /// `control_period` seconds from `control_day`. Any holder may trade
    /// inside it; migration administration waits until it closes.
    pub fn is_control_day(&self, now: u64) -> bool {
        if now < self.control_day {
            return false;
        }
        (now - self.control_day) % self.control_period < CONTROL_DAY_DURATION
    }

    /// Any holder may trade on a control day or near the lock end.
    pub fn is_open_trading(&self, now: u64) -> bool {
        self.is_control_day(now) || self.trading_opportunity(now)
    }

    pub fn require_outside_control_day(&self, now: u64) -> Result<(), LaunchLockError> {
        if self.is_control_day(now) {
            return Err(LaunchLockError::ControlWindowOpen);
        }
        Ok(())
    }
}

fn validate_lock_end(now: u64, end: u64) -> Result<(), LaunchLockError> {
    if end <= now {
        return Err(LaunchLockError::InvalidTimePeriod);
    }
    if end > now.saturating_add(FIVE_YEARS) {
        return Err(LaunchLockError::LockCannotExceedFiveYears);
    }
    Ok(())
}
