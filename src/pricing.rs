//! Stepped bonding curve.
//!
//! Launch tokens are sold in levels. Every level has a quantity and a unit
//! price; crossing into the next level raises the price by
//! `price_increment_multiplier` and resizes the level by the increase
//! multiplier (before the trend change step) or the decrease multiplier
//! (after it). All multipliers are parts-per-mille of [`PERCENTAGE_DIVISOR`].
//!
//! Everything here is a pure function of `(sold, CurveParams)`. Prices are
//! path independent: a buy of `a` at `s` and a sell of `a` at `s + a` value
//! the same segment of the curve.

use soroban_sdk::contracttype;

use crate::LaunchLockError;

/// Parts-per-mille divisor for every percentage in the contract.
pub const PERCENTAGE_DIVISOR: i128 = 1_000;

/// Smallest units per whole launch token. Curve prices are quoted per whole token.
pub const TOKEN_UNIT: i128 = 10_000_000;

/// Upper bound on levels walked in one quote. Every quote walks from level 0,
/// so this also bounds the host budget a trade can consume.
pub const MAX_CURVE_LEVELS: u32 = 1_000;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CurveParams {
    /// Collateral units per whole launch token at level 0. Each level adds
    /// at least one unit, so tiny prices still climb.
    pub initial_price: i128,
    /// Launch token units sold in level 0.
    pub first_level_quantity: i128,
    pub price_increment_multiplier: u32,
    pub level_increase_multiplier: i32,
    pub level_decrease_after_trend: i32,
    /// Level index at which level sizing switches to the decrease multiplier.
    pub trend_change_step: u32,
    /// Profit rate from the trend change step on.
    pub profit_percentage: u32,
    /// Profit rate for levels below the trend change step.
    pub profit_before_trend_change: u32,
}

/// A single level of the curve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Level {
    pub index: u32,
    pub start: i128,
    pub quantity: i128,
    pub price: i128,
}

/// Collateral value of a segment of the curve.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Quote {
    /// What a buyer pays.
    pub gross: i128,
    /// Part of `gross` that stays in the contract as backing.
    pub backing: i128,
    /// `gross - backing`, split between royalty and creator.
    pub profit: i128,
}

impl CurveParams {
    pub fn validate(&self) -> Result<(), LaunchLockError> {
        if self.initial_price <= 0 {
            return Err(LaunchLockError::InvalidPrice);
        }
        if self.first_level_quantity <= 0 {
            return Err(LaunchLockError::InvalidAmount);
        }
        if self.price_increment_multiplier == 0 {
            return Err(LaunchLockError::InvalidPercentage);
        }
        if !in_open_range(self.level_increase_multiplier)
            || !in_open_range(self.level_decrease_after_trend)
        {
            return Err(LaunchLockError::InvalidPercentage);
        }
        if self.profit_percentage as i128 > PERCENTAGE_DIVISOR
            || self.profit_before_trend_change as i128 > PERCENTAGE_DIVISOR
        {
            return Err(LaunchLockError::InvalidPercentage);
        }
        Ok(())
    }

    pub fn first_level(&self) -> Level {
        Level {
            index: 0,
            start: 0,
            quantity: self.first_level_quantity,
            price: self.initial_price,
        }
    }

    /// Profit rate (parts-per-mille) applied to sales inside level `index`.
    pub fn profit_rate(&self, index: u32) -> i128 {
        if index < self.trend_change_step {
            self.profit_before_trend_change as i128
        } else {
            self.profit_percentage as i128
        }
    }

    pub fn next_level(&self, level: &Level) -> Result<Level, LaunchLockError> {
        let multiplier = if level.index < self.trend_change_step {
            self.level_increase_multiplier
        } else {
            self.level_decrease_after_trend
        };
        let quantity = compound(level.quantity, multiplier as i128)?;
        let price = compound_up(level.price, self.price_increment_multiplier as i128)?;
        Ok(Level {
            index: level.index.checked_add(1).ok_or(LaunchLockError::ArithmeticOverflow)?,
            start: level
                .start
                .checked_add(level.quantity)
                .ok_or(LaunchLockError::ArithmeticOverflow)?,
            quantity,
            price,
        })
    }

    /// Level containing the next unit to be sold once `sold` units are out.
    /// A boundary value belongs to the upper level.
    pub fn level_at(&self, sold: i128) -> Result<Level, LaunchLockError> {
        if sold < 0 {
            return Err(LaunchLockError::InvalidAmount);
        }
        let mut level = self.first_level();
        while sold >= level.end()? {
            if level.index >= MAX_CURVE_LEVELS {
                return Err(LaunchLockError::CurveExhausted);
            }
            level = self.next_level(&level)?;
        }
        Ok(level)
    }

    pub fn price_at(&self, sold: i128) -> Result<i128, LaunchLockError> {
        Ok(self.level_at(sold)?.price)
    }

    /// Cumulative value of the first `sold` units of the curve.
    pub fn cumulative(&self, sold: i128) -> Result<Quote, LaunchLockError> {
        self.value_between(0, sold)
    }

    /// Value of `take` units bought inside `level`.
    fn segment(&self, level: &Level, take: i128) -> Result<Quote, LaunchLockError> {
        let gross = take
            .checked_mul(level.price)
            .ok_or(LaunchLockError::ArithmeticOverflow)?
            / TOKEN_UNIT;
        let profit = percent_of(gross, self.profit_rate(level.index))?;
        Ok(Quote {
            gross,
            backing: gross - profit,
            profit,
        })
    }

    /// Value of the units between `from` and `to` (`from <= to`), walking the
    /// levels once. Per level it equals the difference of the two cumulative
    /// values, so splitting a trade never changes the total.
    pub fn value_between(&self, from: i128, to: i128) -> Result<Quote, LaunchLockError> {
        if from < 0 || from > to {
            return Err(LaunchLockError::InvalidAmount);
        }
        let mut total = Quote::default();
        let mut level = self.first_level();
        loop {
            let end = level.end()?;
            if from < end {
                let upper = to.min(end) - level.start;
                let lower = from.max(level.start) - level.start;
                total = total
                    .add(&self.segment(&level, upper)?)?
                    .sub(&self.segment(&level, lower)?)?;
            }
            if to <= end {
                return Ok(total);
            }
            if level.index >= MAX_CURVE_LEVELS {
                return Err(LaunchLockError::CurveExhausted);
            }
            level = self.next_level(&level)?;
        }
    }

    /// What a buyer pays for `amount` units when `sold` are already out.
    pub fn quote_buy(&self, sold: i128, amount: i128) -> Result<Quote, LaunchLockError> {
        let to = sold
            .checked_add(amount)
            .ok_or(LaunchLockError::ArithmeticOverflow)?;
        self.value_between(sold, to)
    }

    /// Collateral returned for `amount` units sold back from the top of the curve.
    pub fn quote_sell(&self, sold: i128, amount: i128) -> Result<i128, LaunchLockError> {
        let from = sold
            .checked_sub(amount)
            .ok_or(LaunchLockError::ArithmeticOverflow)?;
        Ok(self.value_between(from, sold)?.backing)
    }

    /// Collateral paid to a return wallet for `amount` units when `earned`
    /// units have already been bought back. Buybacks consume the curve from
    /// the bottom so the two sell paths never value the same segment twice.
    pub fn quote_buyback(&self, earned: i128, amount: i128) -> Result<i128, LaunchLockError> {
        let to = earned
            .checked_add(amount)
            .ok_or(LaunchLockError::ArithmeticOverflow)?;
        Ok(self.value_between(earned, to)?.backing)
    }
}

impl Level {
    pub fn end(&self) -> Result<i128, LaunchLockError> {
        self.start
            .checked_add(self.quantity)
            .ok_or(LaunchLockError::ArithmeticOverflow)
    }
}

impl Quote {
    fn add(&self, other: &Quote) -> Result<Quote, LaunchLockError> {
        Ok(Quote {
            gross: checked(self.gross.checked_add(other.gross))?,
            backing: checked(self.backing.checked_add(other.backing))?,
            profit: checked(self.profit.checked_add(other.profit))?,
        })
    }

    fn sub(&self, other: &Quote) -> Result<Quote, LaunchLockError> {
        Ok(Quote {
            gross: checked(self.gross.checked_sub(other.gross))?,
            backing: checked(self.backing.checked_sub(other.backing))?,
            profit: checked(self.profit.checked_sub(other.profit))?,
        })
    }
}

/// `value * percent / D`, truncating.
pub fn percent_of(value: i128, percent: i128) -> Result<i128, LaunchLockError> {
    Ok(checked(value.checked_mul(percent))? / PERCENTAGE_DIVISOR)
}

/// `value + value * multiplier / D`. Never drops below 1 for `value >= 1`
/// since `|multiplier| < D`.
fn compound(value: i128, multiplier: i128) -> Result<i128, LaunchLockError> {
    let delta = percent_of(value, multiplier)?;
    checked(value.checked_add(delta))
}

/// `value + ceil(value * multiplier / D)` for a positive multiplier.
fn compound_up(value: i128, multiplier: i128) -> Result<i128, LaunchLockError> {
    let scaled = checked(value.checked_mul(multiplier))?;
    let delta = checked(scaled.checked_add(PERCENTAGE_DIVISOR - 1))? / PERCENTAGE_DIVISOR;
    checked(value.checked_add(delta))
}

fn in_open_range(multiplier: i32) -> bool {
    let m = multiplier as i128;
    m > -PERCENTAGE_DIVISOR && m < PERCENTAGE_DIVISOR
}

fn checked(value: Option<i128>) -> Result<i128, LaunchLockError> {
    value.ok_or(LaunchLockError::ArithmeticOverflow)
}
