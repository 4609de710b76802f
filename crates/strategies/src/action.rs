// In crates/strategies/src/action.rs

use rust_decimal::Decimal;
use std::fmt;

/// Why an evaluation decided not to trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkipReason {
    /// The deviation (or the cash/cap clamp) left nothing to invest.
    NothingToInvest { deviation: Decimal },
    /// The amount was positive but rounds to zero shares at this price.
    ZeroBuySize,
    /// The share quantity for this amount does not fit a `Decimal` at this price.
    SizeOutOfRange,
    NoPosition,
    BelowTarget { current_return: Decimal },
    ProfitCooldown { current_return: Decimal, days_remaining: i64 },
    ZeroSellSize,
    /// The investment interval has not elapsed since the last buy.
    NotInvestmentDay { days_remaining: i64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NothingToInvest { deviation } => {
                write!(f, "deviation {:.1}%, investment paused", deviation)
            }
            SkipReason::ZeroBuySize => f.write_str("computed buy size is zero"),
            SkipReason::SizeOutOfRange => f.write_str("buy size is out of range at this price"),
            SkipReason::NoPosition => f.write_str("no position held"),
            SkipReason::BelowTarget { current_return } => {
                write!(f, "return {:.1}% is below target", current_return)
            }
            SkipReason::ProfitCooldown { current_return, days_remaining } => write!(
                f,
                "return {:.1}% reached target but profit-taking cools down for {} more day(s)",
                current_return, days_remaining
            ),
            SkipReason::ZeroSellSize => f.write_str("computed sell size is zero"),
            SkipReason::NotInvestmentDay { days_remaining } => {
                write!(f, "not an investment day, {} day(s) to go", days_remaining)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyOrder {
    /// Base-asset quantity, rounded to 4 decimal places.
    pub size: Decimal,
    /// Quote amount spent (`size * price`).
    pub amount: Decimal,
    pub price: Decimal,
    pub moving_average: Decimal,
    pub deviation: Decimal,
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellOrder {
    pub size: Decimal,
    /// Quote amount received (`size * price`).
    pub amount: Decimal,
    pub price: Decimal,
    pub current_return: Decimal,
    pub cost_of_sold: Decimal,
    pub profit: Decimal,
}

/// What the exchange actually filled for an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub size: Decimal,
    /// Quote amount transacted.
    pub amount: Decimal,
    /// Average fill price.
    pub price: Decimal,
}

/// The outcome of a single decision call. The caller executes the implied order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Skip { reason: SkipReason },
    Buy(BuyOrder),
    Sell(SellOrder),
}

impl Action {
    pub fn skip(reason: SkipReason) -> Self {
        Action::Skip { reason }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Action::Skip { .. })
    }
}
