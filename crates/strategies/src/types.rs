// In crates/strategies/src/types.rs

use crate::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Which multiplier staircase to apply to the price deviation.
///
/// Both tables share the upper half (at or above trend). The single-asset
/// table leans harder into dips because all of the budget sits in one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierTable {
    SingleAsset,
    #[default]
    MultiAsset,
}

impl MultiplierTable {
    /// Maps a deviation (in percent) to an investment multiplier.
    ///
    /// Each band is closed on its upper edge: exactly -20% is the deepest band,
    /// exactly 0% still counts as "below trend", exactly 25% still buys 0.2x.
    pub fn multiplier(&self, deviation: Decimal) -> Decimal {
        let (deep, dip, below) = match self {
            MultiplierTable::SingleAsset => (dec!(2.2), dec!(1.8), dec!(1.4)),
            MultiplierTable::MultiAsset => (dec!(1.6), dec!(1.4), dec!(1.2)),
        };

        if deviation <= dec!(-20) {
            deep
        } else if deviation <= dec!(-10) {
            dip
        } else if deviation <= Decimal::ZERO {
            below
        } else if deviation <= dec!(5) {
            dec!(1.0)
        } else if deviation <= dec!(15) {
            dec!(0.5)
        } else if deviation <= dec!(25) {
            dec!(0.2)
        } else {
            Decimal::ZERO
        }
    }
}

/// Per-symbol parameters of the DFA strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Quote amount (e.g., USDT) invested per period at a 1.0x multiplier.
    pub base_cash: Decimal,
    #[serde(default = "default_investment_interval_days")]
    pub investment_interval_days: u32,
    /// Floating return, in percent, at which profit-taking kicks in.
    #[serde(default = "default_target_return")]
    pub target_return: Decimal,
    /// Fraction of current holdings sold per profit-taking event.
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: Decimal,
    #[serde(default = "default_profit_taking_cooldown_days")]
    pub profit_taking_cooldown_days: u32,
    /// Optional cap on a single buy, applied before the cash clamp.
    #[serde(default)]
    pub max_single_order: Option<Decimal>,
    #[serde(default)]
    pub multiplier_table: MultiplierTable,
}

impl StrategyConfig {
    /// Creates a config with the stock parameters and the given base cash.
    pub fn new(base_cash: Decimal) -> Self {
        Self {
            base_cash,
            investment_interval_days: default_investment_interval_days(),
            target_return: default_target_return(),
            sell_ratio: default_sell_ratio(),
            profit_taking_cooldown_days: default_profit_taking_cooldown_days(),
            max_single_order: None,
            multiplier_table: MultiplierTable::default(),
        }
    }

    pub fn with_multiplier_table(mut self, table: MultiplierTable) -> Self {
        self.multiplier_table = table;
        self
    }

    pub fn with_max_single_order(mut self, cap: Option<Decimal>) -> Self {
        self.max_single_order = cap;
        self
    }

    /// Checks that the parameters describe a strategy that can actually run.
    pub fn validate(&self) -> Result<()> {
        if self.base_cash < Decimal::ZERO {
            return Err(Error::InvalidParameters(format!(
                "base_cash must not be negative (got {})",
                self.base_cash
            )));
        }
        if self.sell_ratio <= Decimal::ZERO || self.sell_ratio > Decimal::ONE {
            return Err(Error::InvalidParameters(format!(
                "sell_ratio must be in (0, 1] (got {})",
                self.sell_ratio
            )));
        }
        if let Some(cap) = self.max_single_order {
            if cap <= Decimal::ZERO {
                return Err(Error::InvalidParameters(format!(
                    "max_single_order must be positive when set (got {})",
                    cap
                )));
            }
        }
        Ok(())
    }
}

// Helper functions for serde defaults
fn default_investment_interval_days() -> u32 { 14 }
fn default_target_return() -> Decimal { dec!(75) }
fn default_sell_ratio() -> Decimal { dec!(0.5) }
fn default_profit_taking_cooldown_days() -> u32 { 30 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_asset_boundaries() {
        let t = MultiplierTable::SingleAsset;
        let cases = [
            (dec!(-35), dec!(2.2)),
            (dec!(-20.001), dec!(2.2)),
            (dec!(-20), dec!(2.2)),
            (dec!(-19.999), dec!(1.8)),
            (dec!(-10.001), dec!(1.8)),
            (dec!(-10), dec!(1.8)),
            (dec!(-9.999), dec!(1.4)),
            (dec!(-0.001), dec!(1.4)),
            (dec!(0), dec!(1.4)),
            (dec!(0.001), dec!(1.0)),
            (dec!(5), dec!(1.0)),
            (dec!(5.001), dec!(0.5)),
            (dec!(15), dec!(0.5)),
            (dec!(15.001), dec!(0.2)),
            (dec!(25), dec!(0.2)),
            (dec!(25.001), dec!(0)),
            (dec!(300), dec!(0)),
        ];
        for (deviation, expected) in cases {
            assert_eq!(t.multiplier(deviation), expected, "deviation {}", deviation);
        }
    }

    #[test]
    fn multi_asset_boundaries() {
        let t = MultiplierTable::MultiAsset;
        let cases = [
            (dec!(-20.001), dec!(1.6)),
            (dec!(-20), dec!(1.6)),
            (dec!(-19.999), dec!(1.4)),
            (dec!(-10), dec!(1.4)),
            (dec!(-9.999), dec!(1.2)),
            (dec!(0), dec!(1.2)),
            (dec!(0.001), dec!(1.0)),
            (dec!(5), dec!(1.0)),
            (dec!(5.001), dec!(0.5)),
            (dec!(15), dec!(0.5)),
            (dec!(15.001), dec!(0.2)),
            (dec!(25), dec!(0.2)),
            (dec!(25.001), dec!(0)),
        ];
        for (deviation, expected) in cases {
            assert_eq!(t.multiplier(deviation), expected, "deviation {}", deviation);
        }
    }

    #[test]
    fn multiplier_is_non_increasing() {
        for table in [MultiplierTable::SingleAsset, MultiplierTable::MultiAsset] {
            let mut previous = table.multiplier(dec!(-100));
            let mut d = dec!(-100);
            while d <= dec!(100) {
                let m = table.multiplier(d);
                assert!(m <= previous, "{:?} increased at {}", table, d);
                previous = m;
                d += dec!(0.25);
            }
        }
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: StrategyConfig = toml::from_str(
            r#"
            base_cash = "28"
            multiplier_table = "single_asset"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_cash, dec!(28));
        assert_eq!(config.investment_interval_days, 14);
        assert_eq!(config.target_return, dec!(75));
        assert_eq!(config.sell_ratio, dec!(0.5));
        assert_eq!(config.profit_taking_cooldown_days, 30);
        assert_eq!(config.max_single_order, None);
        assert_eq!(config.multiplier_table, MultiplierTable::SingleAsset);
    }

    #[test]
    fn validate_rejects_bad_sell_ratio() {
        let mut config = StrategyConfig::new(dec!(70));
        assert!(config.validate().is_ok());

        config.sell_ratio = dec!(0);
        assert!(config.validate().is_err());
        config.sell_ratio = dec!(1.5);
        assert!(config.validate().is_err());
        config.sell_ratio = dec!(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_cap() {
        let config = StrategyConfig::new(dec!(70)).with_max_single_order(Some(dec!(0)));
        assert!(matches!(config.validate(), Err(Error::InvalidParameters(_))));
    }
}
