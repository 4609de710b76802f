// In crates/strategies/src/dfa.rs

//! The DFA decision engine.
//!
//! Two evaluations run against a [`SymbolState`]: profit-taking (sell a fixed
//! fraction once the floating return reaches the target) and investment (buy
//! `base_cash` scaled by how far price sits from its moving average). Both
//! mutate the state only when they return a trade.

use crate::action::{Action, BuyOrder, Fill, SellOrder, SkipReason};
use crate::state::{InvestmentRecord, ProfitRecord, SymbolState};
use crate::types::StrategyConfig;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Share quantities are rounded to this many decimal places.
const SIZE_DECIMALS: u32 = 4;
const SIZE_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, SIZE_DECIMALS);

fn round_size(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::MidpointNearestEven)
}

/// Percentage distance of `current_price` from `moving_average`.
/// A zero moving average yields zero. Saturates at `Decimal::MAX` or
/// `Decimal::MIN` when the ratio does not fit.
pub fn calculate_deviation(current_price: Decimal, moving_average: Decimal) -> Decimal {
    if moving_average.is_zero() {
        return Decimal::ZERO;
    }
    current_price
        .checked_sub(moving_average)
        .and_then(|diff| diff.checked_div(moving_average))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .unwrap_or_else(|| {
            if (current_price > moving_average) == moving_average.is_sign_positive() {
                Decimal::MAX
            } else {
                Decimal::MIN
            }
        })
}

/// True when the symbol has never bought, or the interval has elapsed since the last buy.
pub fn should_invest_today(state: &SymbolState, config: &StrategyConfig, current_date: NaiveDate) -> bool {
    days_until_next_investment(state, config, current_date) == 0
}

/// Days left until the investment gate opens; zero when it is already open.
pub fn days_until_next_investment(
    state: &SymbolState,
    config: &StrategyConfig,
    current_date: NaiveDate,
) -> i64 {
    match state.last_investment_date {
        None => 0,
        Some(last) => {
            let elapsed = (current_date - last).num_days();
            (i64::from(config.investment_interval_days) - elapsed).max(0)
        }
    }
}

/// Result of the profit-taking gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitGate {
    Open,
    BelowTarget,
    Cooldown { days_remaining: i64 },
}

pub fn profit_gate(
    state: &SymbolState,
    config: &StrategyConfig,
    current_date: NaiveDate,
    current_return: Decimal,
) -> ProfitGate {
    if current_return < config.target_return {
        return ProfitGate::BelowTarget;
    }
    if let Some(last) = state.last_profit_taking_date {
        let elapsed = (current_date - last).num_days();
        let cooldown = i64::from(config.profit_taking_cooldown_days);
        if elapsed < cooldown {
            return ProfitGate::Cooldown { days_remaining: cooldown - elapsed };
        }
    }
    ProfitGate::Open
}

pub fn should_take_profit(
    state: &SymbolState,
    config: &StrategyConfig,
    current_date: NaiveDate,
    current_return: Decimal,
) -> bool {
    profit_gate(state, config, current_date, current_return) == ProfitGate::Open
}

/// Decides how much to buy and, on `Buy`, books it into `state`.
///
/// This does not check the investment interval; callers gate it with
/// [`should_invest_today`]. Calling it twice on one day buys twice.
pub fn evaluate_investment(
    state: &mut SymbolState,
    config: &StrategyConfig,
    current_price: Decimal,
    moving_average: Decimal,
    current_date: NaiveDate,
    available_cash: Option<Decimal>,
) -> Action {
    let deviation = calculate_deviation(current_price, moving_average);
    let multiplier = config.multiplier_table.multiplier(deviation);

    let mut investment_amount = config.base_cash.saturating_mul(multiplier);
    if let Some(cap) = config.max_single_order {
        investment_amount = investment_amount.min(cap);
    }
    if let Some(cash) = available_cash {
        investment_amount = investment_amount.min(cash);
    }

    if investment_amount <= Decimal::ZERO {
        return Action::skip(SkipReason::NothingToInvest { deviation });
    }
    if current_price <= Decimal::ZERO {
        return Action::skip(SkipReason::ZeroBuySize);
    }

    let Some(exact_size) = investment_amount.checked_div(current_price) else {
        return Action::skip(SkipReason::SizeOutOfRange);
    };
    let mut size = round_size(exact_size);

    // Never spend more than the account holds: round down when rounding to nearest would.
    if let Some(cash) = available_cash {
        if size * current_price > cash {
            size = exact_size.round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::ToZero);
            while size > Decimal::ZERO && size * current_price > cash {
                size -= SIZE_STEP;
            }
        }
    }
    if size <= Decimal::ZERO {
        return Action::skip(SkipReason::ZeroBuySize);
    }

    // Book what the rounded size really costs, not the pre-rounding amount.
    let fill = Fill {
        size,
        amount: size * current_price,
        price: current_price,
    };
    Action::Buy(book_buy(state, current_date, fill, moving_average, deviation, multiplier))
}

/// Books a bought quantity into `state`.
///
/// [`evaluate_investment`] books its own decision; this is also how a fill
/// that differs from the decision is recorded instead.
pub fn book_buy(
    state: &mut SymbolState,
    current_date: NaiveDate,
    fill: Fill,
    moving_average: Decimal,
    deviation: Decimal,
    multiplier: Decimal,
) -> BuyOrder {
    state.total_invested += fill.amount;
    state.total_shares += fill.size;
    state.investment_count += 1;
    state.last_investment_date = Some(current_date);
    state.investment_history.push(InvestmentRecord {
        date: current_date,
        price: fill.price,
        moving_average,
        deviation,
        multiplier,
        amount: fill.amount,
        shares: fill.size,
    });

    BuyOrder {
        size: fill.size,
        amount: fill.amount,
        price: fill.price,
        moving_average,
        deviation,
        multiplier,
    }
}

/// Decides whether to sell a slice of the position and, on `Sell`, books it into `state`.
pub fn evaluate_profit_taking(
    state: &mut SymbolState,
    config: &StrategyConfig,
    current_price: Decimal,
    current_date: NaiveDate,
) -> Action {
    if !state.has_position() {
        return Action::skip(SkipReason::NoPosition);
    }

    let current_return = state.current_return(current_price);

    match profit_gate(state, config, current_date, current_return) {
        ProfitGate::Open => {}
        ProfitGate::BelowTarget => {
            return Action::skip(SkipReason::BelowTarget { current_return });
        }
        ProfitGate::Cooldown { days_remaining } => {
            return Action::skip(SkipReason::ProfitCooldown { current_return, days_remaining });
        }
    }

    // Holdings reloaded from disk may carry more than 4 decimals; never sell more than is held.
    let sell_shares = round_size(state.total_shares * config.sell_ratio).min(state.total_shares);
    if sell_shares <= Decimal::ZERO {
        return Action::skip(SkipReason::ZeroSellSize);
    }

    let fill = Fill {
        size: sell_shares,
        amount: sell_shares.saturating_mul(current_price),
        price: current_price,
    };
    Action::Sell(book_sell(state, current_date, fill, current_return))
}

/// Books a sold quantity into `state`, releasing its share of the cost basis.
/// A fill larger than the position is booked as the whole position.
pub fn book_sell(
    state: &mut SymbolState,
    current_date: NaiveDate,
    fill: Fill,
    current_return: Decimal,
) -> SellOrder {
    let sell_shares = fill.size.min(state.total_shares);
    let cost_of_sold = if sell_shares == state.total_shares {
        state.total_invested
    } else {
        sell_shares / state.total_shares * state.total_invested
    };
    let profit = fill.amount - cost_of_sold;

    state.total_shares -= sell_shares;
    state.total_invested -= cost_of_sold;
    state.total_sell_amount += fill.amount;
    state.last_profit_taking_date = Some(current_date);
    state.profit_history.push(ProfitRecord {
        date: current_date,
        price: fill.price,
        return_percent: current_return,
        shares_sold: sell_shares,
        amount_received: fill.amount,
        cost_of_sold,
        profit,
    });

    SellOrder {
        size: sell_shares,
        amount: fill.amount,
        price: fill.price,
        current_return,
        cost_of_sold,
        profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MultiplierTable;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn single_asset(base_cash: Decimal) -> StrategyConfig {
        StrategyConfig::new(base_cash).with_multiplier_table(MultiplierTable::SingleAsset)
    }

    #[test]
    fn deviation_handles_zero_moving_average() {
        assert_eq!(calculate_deviation(dec!(100), dec!(0)), Decimal::ZERO);
        assert_eq!(calculate_deviation(dec!(100), dec!(125)), dec!(-20));
        assert_eq!(calculate_deviation(dec!(110), dec!(100)), dec!(10));
    }

    #[test]
    fn buys_scaled_amount_below_trend() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(70));
        let today = date(2024, 3, 1);

        let action = evaluate_investment(&mut state, &config, dec!(100), dec!(125), today, None);

        let Action::Buy(buy) = action else { panic!("expected buy, got {:?}", action) };
        assert_eq!(buy.deviation, dec!(-20));
        assert_eq!(buy.multiplier, dec!(2.2));
        assert_eq!(buy.size, dec!(1.54));
        assert_eq!(buy.amount, dec!(154.0));
        assert_eq!(state.total_invested, dec!(154));
        assert_eq!(state.total_shares, dec!(1.54));
        assert_eq!(state.investment_count, 1);
        assert_eq!(state.last_investment_date, Some(today));
        assert_eq!(state.investment_history.len(), 1);
        assert_eq!(state.investment_history[0].moving_average, dec!(125));
    }

    #[test]
    fn zero_moving_average_buys_at_base_multiplier() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(70));

        let action = evaluate_investment(&mut state, &config, dec!(10), dec!(0), date(2024, 3, 1), None);

        let Action::Buy(buy) = action else { panic!("expected buy") };
        assert_eq!(buy.deviation, Decimal::ZERO);
        assert_eq!(buy.multiplier, dec!(1.4));
        assert_eq!(buy.size, dec!(9.8));
    }

    #[test]
    fn skips_far_above_trend() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(70));

        let action = evaluate_investment(&mut state, &config, dec!(130), dec!(100), date(2024, 3, 1), None);

        assert_eq!(action, Action::skip(SkipReason::NothingToInvest { deviation: dec!(30) }));
        assert_eq!(state, SymbolState::new());
    }

    #[test]
    fn clamps_to_cap_then_cash() {
        let config = single_asset(dec!(70)).with_max_single_order(Some(dec!(100)));

        let mut state = SymbolState::new();
        let action = evaluate_investment(&mut state, &config, dec!(100), dec!(125), date(2024, 3, 1), None);
        let Action::Buy(buy) = action else { panic!("expected buy") };
        assert_eq!(buy.amount, dec!(100));

        let mut state = SymbolState::new();
        let action =
            evaluate_investment(&mut state, &config, dec!(100), dec!(125), date(2024, 3, 1), Some(dec!(40)));
        let Action::Buy(buy) = action else { panic!("expected buy") };
        assert_eq!(buy.amount, dec!(40));
        assert_eq!(buy.size, dec!(0.4));
    }

    #[test]
    fn no_cash_means_skip() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(70));

        let action =
            evaluate_investment(&mut state, &config, dec!(100), dec!(100), date(2024, 3, 1), Some(dec!(0)));

        assert!(matches!(action, Action::Skip { reason: SkipReason::NothingToInvest { .. } }));
        assert_eq!(state.investment_count, 0);
    }

    #[test]
    fn tiny_amount_at_huge_price_rounds_to_zero() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(1));

        let action = evaluate_investment(
            &mut state,
            &config,
            dec!(1000000),
            dec!(1000000),
            date(2024, 3, 1),
            None,
        );

        assert_eq!(action, Action::skip(SkipReason::ZeroBuySize));
        assert_eq!(state.investment_count, 0);
    }

    #[test]
    fn non_positive_price_is_skipped() {
        let mut state = SymbolState::new();
        let config = single_asset(dec!(70));

        let action = evaluate_investment(&mut state, &config, dec!(0), dec!(100), date(2024, 3, 1), None);

        assert_eq!(action, Action::skip(SkipReason::ZeroBuySize));
    }

    #[test]
    fn buys_accumulate_monotonically() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(28));
        let mut day = date(2024, 1, 1);
        let prices = [dec!(95), dec!(80), dec!(104), dec!(120), dec!(60), dec!(100.37)];

        let mut last_shares = Decimal::ZERO;
        let mut last_count = 0;
        for price in prices {
            let action = evaluate_investment(&mut state, &config, price, dec!(100), day, None);
            assert!(matches!(action, Action::Buy(_)));
            assert!(state.total_shares >= last_shares);
            assert!(state.investment_count > last_count);
            last_shares = state.total_shares;
            last_count = state.investment_count;
            day += chrono::Duration::days(14);
        }
        let booked: Decimal = state.investment_history.iter().map(|r| r.amount).sum();
        assert_eq!(booked, state.total_invested);
    }

    #[test]
    fn gate_is_caller_responsibility() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(28));
        let today = date(2024, 5, 10);

        assert!(should_invest_today(&state, &config, today));
        let first = evaluate_investment(&mut state, &config, dec!(50), dec!(50), today, None);
        let second = evaluate_investment(&mut state, &config, dec!(50), dec!(50), today, None);

        assert!(matches!(first, Action::Buy(_)));
        assert!(matches!(second, Action::Buy(_)));
        assert_eq!(state.investment_count, 2);
        assert!(!should_invest_today(&state, &config, today));
    }

    #[test]
    fn interval_gate_opens_after_interval() {
        let config = StrategyConfig::new(dec!(28));
        let state = SymbolState {
            last_investment_date: Some(date(2024, 1, 1)),
            ..Default::default()
        };

        assert!(!should_invest_today(&state, &config, date(2024, 1, 14)));
        assert_eq!(days_until_next_investment(&state, &config, date(2024, 1, 14)), 1);
        assert!(should_invest_today(&state, &config, date(2024, 1, 15)));
        assert!(should_invest_today(&state, &config, date(2024, 3, 1)));
        assert_eq!(days_until_next_investment(&state, &config, date(2024, 3, 1)), 0);
    }

    #[test]
    fn takes_profit_at_target() {
        let mut state = SymbolState {
            total_shares: dec!(10),
            total_invested: dec!(500),
            ..Default::default()
        };
        let config = StrategyConfig::new(dec!(70));
        let today = date(2024, 6, 1);

        let action = evaluate_profit_taking(&mut state, &config, dec!(90), today);

        let Action::Sell(sell) = action else { panic!("expected sell, got {:?}", action) };
        assert_eq!(sell.size, dec!(5.0));
        assert_eq!(sell.amount, dec!(450.0));
        assert_eq!(sell.current_return, dec!(80));
        assert_eq!(sell.cost_of_sold, dec!(250.0));
        assert_eq!(sell.profit, dec!(200.0));
        assert_eq!(state.total_shares, dec!(5.0));
        assert_eq!(state.total_invested, dec!(250.0));
        assert_eq!(state.total_sell_amount, dec!(450.0));
        assert_eq!(state.last_profit_taking_date, Some(today));
        assert_eq!(state.profit_history.len(), 1);
        assert_eq!(state.profit_history[0].profit, dec!(200));
    }

    #[test]
    fn no_position_no_sell() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(70));

        let action = evaluate_profit_taking(&mut state, &config, dec!(90), date(2024, 6, 1));

        assert_eq!(action, Action::skip(SkipReason::NoPosition));
    }

    #[test]
    fn below_target_reports_return() {
        let mut state = SymbolState {
            total_shares: dec!(10),
            total_invested: dec!(500),
            ..Default::default()
        };
        let config = StrategyConfig::new(dec!(70));

        let action = evaluate_profit_taking(&mut state, &config, dec!(60), date(2024, 6, 1));

        assert_eq!(action, Action::skip(SkipReason::BelowTarget { current_return: dec!(20) }));
        assert_eq!(state.total_shares, dec!(10));
    }

    #[test]
    fn cooldown_blocks_second_sell() {
        let mut state = SymbolState {
            total_shares: dec!(10),
            total_invested: dec!(500),
            ..Default::default()
        };
        let config = StrategyConfig::new(dec!(70));

        let first = evaluate_profit_taking(&mut state, &config, dec!(200), date(2024, 6, 1));
        assert!(matches!(first, Action::Sell(_)));

        let blocked = evaluate_profit_taking(&mut state, &config, dec!(200), date(2024, 6, 20));
        assert!(matches!(
            blocked,
            Action::Skip { reason: SkipReason::ProfitCooldown { days_remaining: 11, .. } }
        ));

        let again = evaluate_profit_taking(&mut state, &config, dec!(200), date(2024, 7, 1));
        assert!(matches!(again, Action::Sell(_)));
    }

    #[test]
    fn zero_cost_basis_means_zero_return() {
        let mut state = SymbolState {
            total_shares: dec!(3),
            total_invested: dec!(0),
            ..Default::default()
        };
        let config = StrategyConfig::new(dec!(70));

        let action = evaluate_profit_taking(&mut state, &config, dec!(90), date(2024, 6, 1));

        assert_eq!(action, Action::skip(SkipReason::BelowTarget { current_return: Decimal::ZERO }));
    }

    #[test]
    fn tiny_position_rounds_to_zero_sell() {
        let mut state = SymbolState {
            total_shares: dec!(0.0001),
            total_invested: dec!(0.001),
            ..Default::default()
        };
        let config = StrategyConfig::new(dec!(70));

        let action = evaluate_profit_taking(&mut state, &config, dec!(1000), date(2024, 6, 1));

        assert_eq!(action, Action::skip(SkipReason::ZeroSellSize));
        assert_eq!(state.total_shares, dec!(0.0001));
    }

    #[test]
    fn repeated_sells_never_go_negative() {
        let mut state = SymbolState {
            total_shares: dec!(7.3331),
            total_invested: dec!(333.33),
            ..Default::default()
        };
        let mut config = StrategyConfig::new(dec!(70));
        config.profit_taking_cooldown_days = 0;
        config.target_return = dec!(0);

        for i in 0..40 {
            let _ = evaluate_profit_taking(&mut state, &config, dec!(150), date(2024, 1, 1) + chrono::Duration::days(i));
            assert!(state.total_shares >= Decimal::ZERO);
            assert!(state.total_invested >= Decimal::ZERO);
        }
        assert!(state.total_sell_amount > Decimal::ZERO);
    }

    #[test]
    fn full_sell_ratio_clears_cost_basis() {
        let mut state = SymbolState {
            total_shares: dec!(2.00005),
            total_invested: dec!(100),
            ..Default::default()
        };
        let mut config = StrategyConfig::new(dec!(70));
        config.sell_ratio = dec!(1);

        let action = evaluate_profit_taking(&mut state, &config, dec!(100), date(2024, 6, 1));

        let Action::Sell(sell) = action else { panic!("expected sell") };
        assert!(sell.size <= dec!(2.00005));
        assert!(state.total_shares >= Decimal::ZERO);
        assert!(state.total_invested >= Decimal::ZERO);
    }

    #[test]
    fn deviation_saturates_when_ratio_overflows() {
        assert_eq!(calculate_deviation(dec!(10000000), Decimal::new(1, 22)), Decimal::MAX);
        assert_eq!(calculate_deviation(dec!(-10000000), Decimal::new(1, 22)), Decimal::MIN);
    }

    #[test]
    fn overflowing_deviation_pauses_investment() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(28));

        let action =
            evaluate_investment(&mut state, &config, dec!(10000000), Decimal::new(1, 22), date(2024, 3, 1), None);

        assert_eq!(action, Action::skip(SkipReason::NothingToInvest { deviation: Decimal::MAX }));
        assert_eq!(state, SymbolState::new());
    }

    #[test]
    fn unrepresentable_size_is_skipped() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(10000000000));

        // A tiny price with a matching moving average: amount / price overflows.
        let price = Decimal::new(1, 27);
        let action = evaluate_investment(&mut state, &config, price, price, date(2024, 3, 1), None);

        assert_eq!(action, Action::skip(SkipReason::SizeOutOfRange));
        assert_eq!(state.investment_count, 0);
    }

    #[test]
    fn cash_clamped_buy_never_exceeds_cash() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(28));
        let price = dec!(0.00015);

        let action = evaluate_investment(&mut state, &config, price, price, date(2024, 3, 1), Some(dec!(10)));

        let Action::Buy(buy) = action else { panic!("expected buy, got {:?}", action) };
        // 10 / 0.00015 = 66666.666..., which rounds to nearest as 66666.6667 (10.000000005).
        assert_eq!(buy.size, dec!(66666.6666));
        assert!(buy.amount <= dec!(10));
        assert_eq!(state.total_invested, buy.amount);
    }

    #[test]
    fn unclamped_buy_still_rounds_to_nearest() {
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(28));
        let price = dec!(0.00015);

        // 1.2 * 28 / 0.00015 = 224000 exactly; cash is not binding.
        let action = evaluate_investment(&mut state, &config, price, price, date(2024, 3, 1), Some(dec!(1000)));
        let Action::Buy(buy) = action else { panic!("expected buy") };
        assert_eq!(buy.size, dec!(224000));

        // 1.2 * 25 / 4.5 = 6.6666...
        let mut state = SymbolState::new();
        let config = StrategyConfig::new(dec!(25));
        let action = evaluate_investment(&mut state, &config, dec!(4.5), dec!(4.5), date(2024, 3, 1), Some(dec!(100)));
        let Action::Buy(buy) = action else { panic!("expected buy") };
        assert_eq!(buy.size, dec!(6.6667));
    }

    #[test]
    fn booked_fill_replaces_decided_size() {
        let mut state = SymbolState::new();
        let fill = Fill {
            size: dec!(0.5),
            amount: dec!(50.2),
            price: dec!(100.4),
        };

        let buy = book_buy(&mut state, date(2024, 3, 1), fill, dec!(125), dec!(-20), dec!(2.2));

        assert_eq!(buy.size, dec!(0.5));
        assert_eq!(buy.amount, dec!(50.2));
        assert_eq!(state.total_shares, dec!(0.5));
        assert_eq!(state.total_invested, dec!(50.2));
        assert_eq!(state.investment_history[0].price, dec!(100.4));
        assert_eq!(state.investment_history[0].moving_average, dec!(125));
    }

    #[test]
    fn booked_sell_is_capped_at_the_position() {
        let mut state = SymbolState {
            total_shares: dec!(2),
            total_invested: dec!(100),
            ..Default::default()
        };
        let fill = Fill {
            size: dec!(3),
            amount: dec!(300),
            price: dec!(100),
        };

        let sell = book_sell(&mut state, date(2024, 6, 1), fill, dec!(100));

        assert_eq!(sell.size, dec!(2));
        assert_eq!(sell.cost_of_sold, dec!(100));
        assert_eq!(sell.profit, dec!(200));
        assert_eq!(state.total_shares, Decimal::ZERO);
        assert_eq!(state.total_invested, Decimal::ZERO);
    }
}
