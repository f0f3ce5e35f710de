//! Accounting state of the lock.
//!
//! Every mutation computes the new values first, checks the invariants on
//! them and only then writes, so a failed operation leaves the ledger as it
//! was.

use soroban_sdk::contracttype;

use crate::pricing::{percent_of, Quote, PERCENTAGE_DIVISOR};
use crate::LaunchLockError;

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ledger {
    /// Launch tokens accounted to the contract.
    pub launch_balance: i128,
    pub total_launch_sold: i128,
    /// Launch tokens bought back from return wallets.
    pub launch_tokens_earned: i128,
    /// Collateral backing the curve.
    pub contract_collateral_balance: i128,
    pub owner_profit: i128,
    pub royalty_profit: i128,
    /// Set by the first launch token deposit.
    pub is_initialized: bool,
    /// Launch tokens that reached the contract before the first deposit.
    pub unaccounted_offset: i128,
    /// Cleared for good by the DAO's full launch token withdrawal.
    pub is_active: bool,
    /// Pay profit out on every buy instead of accumulating it.
    pub profit_in_time: bool,
}

/// Profit of one buy split between royalty wallet and owner.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ProfitSplit {
    pub royalty: i128,
    pub creator: i128,
}

impl ProfitSplit {
    pub fn new(profit: i128, royalty_percent: u32) -> Result<Self, LaunchLockError> {
        let royalty = percent_of(profit, royalty_percent as i128)?;
        Ok(Self {
            royalty,
            creator: profit - royalty,
        })
    }
}

impl Ledger {
    pub fn new(profit_in_time: bool) -> Self {
        Self {
            is_active: true,
            profit_in_time,
            ..Self::default()
        }
    }

    /// Tokens still held by buyers that the buyback paths may take back.
    pub fn launch_available(&self) -> Result<i128, LaunchLockError> {
        self.total_launch_sold
            .checked_sub(self.launch_tokens_earned)
            .filter(|available| *available >= 0)
            .ok_or(LaunchLockError::ArithmeticOverflow)
    }

    /// Launch tokens above what is reserved for sold supply.
    pub fn launch_headroom(&self) -> i128 {
        self.launch_balance.saturating_sub(self.total_launch_sold)
    }

    pub fn require_active(&self) -> Result<(), LaunchLockError> {
        if !self.is_active {
            return Err(LaunchLockError::ContractNotActive);
        }
        Ok(())
    }

    pub fn require_trading(&self) -> Result<(), LaunchLockError> {
        self.require_active()?;
        if !self.is_initialized {
            return Err(LaunchLockError::NotInitialized);
        }
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), LaunchLockError> {
        self.launch_available()?;
        if self.launch_balance < 0
            || self.contract_collateral_balance < 0
            || self.owner_profit < 0
            || self.royalty_profit < 0
        {
            return Err(LaunchLockError::ArithmeticOverflow);
        }
        Ok(())
    }

    /// Registers the first launch deposit together with anything pre-funded.
    pub fn record_launch_deposit(
        &mut self,
        amount: i128,
        prefunded: i128,
    ) -> Result<(), LaunchLockError> {
        let mut next = self.clone();
        if !next.is_initialized {
            next.unaccounted_offset = prefunded;
            next.launch_balance = add(next.launch_balance, prefunded)?;
            next.is_initialized = true;
        }
        next.launch_balance = add(next.launch_balance, amount)?;
        self.commit(next)
    }

    pub fn record_collateral_deposit(&mut self, amount: i128) -> Result<(), LaunchLockError> {
        let mut next = self.clone();
        next.contract_collateral_balance = add(next.contract_collateral_balance, amount)?;
        self.commit(next)
    }

    /// Applies a buy of `amount` tokens priced at `quote`. When profit is
    /// accumulated the split is credited here; otherwise the caller pays it out.
    pub fn record_buy(
        &mut self,
        amount: i128,
        quote: &Quote,
        split: &ProfitSplit,
    ) -> Result<(), LaunchLockError> {
        if self.launch_balance < amount {
            return Err(LaunchLockError::InsufficientTokenBalance);
        }
        let mut next = self.clone();
        next.launch_balance = sub(next.launch_balance, amount)?;
        next.total_launch_sold = add(next.total_launch_sold, amount)?;
        next.contract_collateral_balance = add(next.contract_collateral_balance, quote.backing)?;
        if !next.profit_in_time {
            next.royalty_profit = add(next.royalty_profit, split.royalty)?;
            next.owner_profit = add(next.owner_profit, split.creator)?;
        }
        self.commit(next)
    }

    /// Market maker sale back into the curve.
    pub fn record_sell(&mut self, amount: i128, refund: i128) -> Result<(), LaunchLockError> {
        if amount > self.launch_available()? {
            return Err(LaunchLockError::InsufficientAmount);
        }
        if refund > self.contract_collateral_balance {
            return Err(LaunchLockError::InsufficientCollateralBalance);
        }
        let mut next = self.clone();
        next.total_launch_sold = sub(next.total_launch_sold, amount)?;
        next.launch_balance = add(next.launch_balance, amount)?;
        next.contract_collateral_balance = sub(next.contract_collateral_balance, refund)?;
        self.commit(next)
    }

    /// Guaranteed buyback from a return wallet.
    pub fn record_buyback(&mut self, amount: i128, payout: i128) -> Result<(), LaunchLockError> {
        if amount > self.launch_available()? {
            return Err(LaunchLockError::InsufficientAmount);
        }
        if payout > self.contract_collateral_balance {
            return Err(LaunchLockError::InsufficientCollateralBalance);
        }
        let mut next = self.clone();
        next.launch_balance = add(next.launch_balance, amount)?;
        next.launch_tokens_earned = add(next.launch_tokens_earned, amount)?;
        next.contract_collateral_balance = sub(next.contract_collateral_balance, payout)?;
        self.commit(next)
    }

    /// Checks run before a deferred launch withdrawal of `amount` executes.
    pub fn check_launch_withdrawal(&self, amount: i128) -> Result<(), LaunchLockError> {
        if self.launch_balance <= self.total_launch_sold {
            return Err(LaunchLockError::InsufficientTokenBalance);
        }
        if self.launch_headroom() < amount {
            return Err(LaunchLockError::InsufficientAmount);
        }
        Ok(())
    }

    pub fn record_launch_withdrawal(&mut self, amount: i128) -> Result<(), LaunchLockError> {
        self.check_launch_withdrawal(amount)?;
        let mut next = self.clone();
        next.launch_balance = sub(next.launch_balance, amount)?;
        self.commit(next)
    }

    /// Empties the collateral backing. Returns the amount released.
    pub fn take_collateral_balance(&mut self) -> Result<i128, LaunchLockError> {
        let amount = self.contract_collateral_balance;
        if amount <= 0 {
            return Err(LaunchLockError::NoCollateralTokensToWithdraw);
        }
        self.contract_collateral_balance = 0;
        Ok(amount)
    }

    /// DAO sweep of every launch token; the lock stops for good.
    pub fn shut_down(&mut self) {
        self.launch_balance = 0;
        self.is_active = false;
    }

    /// DAO sweep of every collateral token, profits included.
    pub fn clear_collateral(&mut self) {
        self.contract_collateral_balance = 0;
        self.owner_profit = 0;
        self.royalty_profit = 0;
    }

    /// Zeroes and returns the accumulated profit of one side.
    pub fn take_profit(&mut self, royalty_side: bool) -> i128 {
        let slot = if royalty_side {
            &mut self.royalty_profit
        } else {
            &mut self.owner_profit
        };
        core::mem::take(slot)
    }

    fn commit(&mut self, next: Ledger) -> Result<(), LaunchLockError> {
        next.check_invariants()?;
        *self = next;
        Ok(())
    }
}

/// Creator share for a given royalty share; the two always sum to the divisor.
pub fn creator_percent(royalty_percent: u32) -> u32 {
    (PERCENTAGE_DIVISOR as u32).saturating_sub(royalty_percent)
}

fn add(a: i128, b: i128) -> Result<i128, LaunchLockError> {
    a.checked_add(b).ok_or(LaunchLockError::ArithmeticOverflow)
}

fn sub(a: i128, b: i128) -> Result<i128, LaunchLockError> {
    a.checked_sub(b).ok_or(LaunchLockError::ArithmeticOverflow)
}
