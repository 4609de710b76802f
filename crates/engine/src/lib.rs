// In crates/engine/src/lib.rs

pub mod coordinator;
pub mod error;
pub mod market;

use analytics::PortfolioSummary;
use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use core_types::{OrderRequest, Side, Symbol};
use execution::Executor;
use rust_decimal::Decimal;
use state_store::StateStore;
use std::collections::HashMap;
use std::time::Duration;
use strategies::{Action, Fill, StrategyConfig, SymbolState};

pub use coordinator::{Coordinator, TickOutcome};
pub use error::{Error, Result};
pub use market::MarketData;

/// Runner settings that are not per-symbol strategy parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of daily closes in the moving average.
    pub moving_average_period: usize,
    /// The asset buys are paid in (e.g., "USDT").
    pub quote_asset: String,
    /// When false, buys are sized without looking at the account balance.
    pub check_balance: bool,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub outcomes: Vec<(Symbol, TickOutcome)>,
    /// Symbols whose market data or orders failed part way through.
    pub failed: Vec<FailedSymbol>,
    /// Every price fetched this tick, including those of failed symbols.
    pub prices: HashMap<Symbol, Decimal>,
}

/// A symbol that did not finish its tick.
#[derive(Debug, Clone)]
pub struct FailedSymbol {
    pub symbol: Symbol,
    pub error: String,
    /// The profit-taking decision, if it settled before the failure.
    pub profit_taking: Option<Action>,
}

impl TickReport {
    pub fn buys(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o.investment, Action::Buy(_)))
            .count()
    }

    /// Sells executed this tick, counting those of symbols that failed afterwards.
    pub fn sells(&self) -> usize {
        let completed = self
            .outcomes
            .iter()
            .filter(|(_, o)| matches!(o.profit_taking, Action::Sell(_)));
        let partial = self
            .failed
            .iter()
            .filter(|f| matches!(f.profit_taking, Some(Action::Sell(_))));
        completed.count() + partial.count()
    }

    pub fn failed_symbols(&self) -> Vec<&Symbol> {
        self.failed.iter().map(|f| &f.symbol).collect()
    }
}

/// How far a symbol got through its tick.
#[derive(Debug, Default)]
struct SymbolProgress {
    price: Option<Decimal>,
    profit_taking: Option<Action>,
}

/// Builds the coordinator from the state file.
///
/// A corrupt file is fatal unless `reset_corrupt` is set, in which case every
/// symbol starts fresh.
pub fn load_coordinator(
    configs: Vec<(Symbol, StrategyConfig)>,
    store: &StateStore,
    reset_corrupt: bool,
) -> Result<Coordinator> {
    match store.load() {
        Ok(Some(persisted)) => Ok(Coordinator::from_persistable(configs, persisted)),
        Ok(None) => {
            tracing::info!("Starting with fresh strategy state.");
            Ok(Coordinator::new(configs))
        }
        Err(e @ state_store::Error::Corrupt { .. }) if reset_corrupt => {
            tracing::warn!(error = %e, "State file is corrupt; starting fresh as requested.");
            Ok(Coordinator::new(configs))
        }
        Err(e) => Err(e.into()),
    }
}

/// The live tick runner. Owns the coordinator and all I/O around it.
pub struct Engine {
    coordinator: Coordinator,
    market: Box<dyn MarketData>,
    executor: Box<dyn Executor + Sync>,
    store: StateStore,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        coordinator: Coordinator,
        market: Box<dyn MarketData>,
        executor: Box<dyn Executor + Sync>,
        store: StateStore,
        settings: EngineSettings,
    ) -> Self {
        Self {
            coordinator,
            market,
            executor,
            store,
            settings,
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Checks exchange connectivity: server time and the first symbol's price.
    pub async fn health_check(&self) -> Result<()> {
        let server_time = self.market.server_time().await?;
        tracing::info!(server_time, "Exchange reachable.");

        if let Some(symbol) = self.coordinator.symbols().first() {
            let price = self.market.current_price(symbol).await?;
            tracing::info!(symbol = %symbol, %price, "Price feed OK.");
        }
        Ok(())
    }

    /// Current prices of every tracked symbol. Symbols whose price fails are left out.
    pub async fn current_prices(&self) -> HashMap<Symbol, Decimal> {
        let mut prices = HashMap::new();
        for symbol in self.coordinator.symbols() {
            match self.market.current_price(symbol).await {
                Ok(price) => {
                    prices.insert(symbol.clone(), price);
                }
                Err(e) => tracing::warn!(symbol = %symbol, error = %e, "Could not fetch price."),
            }
        }
        prices
    }

    pub async fn status(&self) -> PortfolioSummary {
        let prices = self.current_prices().await;
        self.coordinator.portfolio_summary(&prices)
    }

    /// Evaluates every symbol once, executing and persisting each decision as it is made.
    ///
    /// A symbol whose data or order fails is logged and skipped; a failure to
    /// save state aborts the tick.
    pub async fn run_tick(&mut self, current_date: NaiveDate) -> Result<TickReport> {
        tracing::info!(date = %current_date, symbols = self.coordinator.symbols().len(), "Starting tick.");
        let mut report = TickReport::default();

        let symbols = self.coordinator.symbols().to_vec();
        for symbol in &symbols {
            let mut progress = SymbolProgress::default();
            let result = self.tick_symbol(symbol, current_date, &mut progress).await;
            if let Some(price) = progress.price {
                report.prices.insert(symbol.clone(), price);
            }

            match result {
                Ok(outcome) => report.outcomes.push((symbol.clone(), outcome)),
                Err(e @ Error::Store(_)) => return Err(e),
                Err(e) => {
                    tracing::error!(
                        symbol = %symbol,
                        error = %e,
                        profit_taking = ?progress.profit_taking,
                        "Skipping the rest of this symbol's tick."
                    );
                    report.failed.push(FailedSymbol {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                        profit_taking: progress.profit_taking,
                    });
                }
            }
        }

        let summary = self.coordinator.portfolio_summary(&report.prices);
        for status in &summary.symbols {
            tracing::info!(
                symbol = %status.symbol,
                shares = %status.total_shares,
                invested = %status.total_invested.round_dp(2),
                value = %status.current_value.round_dp(2),
                current_return = %status.current_return.round_dp(2),
                total_return = %status.total_return.round_dp(2),
                "Symbol status."
            );
        }
        tracing::info!(
            total_assets = %summary.total_assets.round_dp(2),
            total_investment = %summary.total_investment.round_dp(2),
            total_return = %summary.total_return.round_dp(2),
            buys = report.buys(),
            sells = report.sells(),
            failed = report.failed.len(),
            "Tick complete."
        );
        Ok(report)
    }

    /// Runs one symbol's tick, recording in `progress` what has already settled.
    async fn tick_symbol(
        &mut self,
        symbol: &Symbol,
        current_date: NaiveDate,
        progress: &mut SymbolProgress,
    ) -> Result<TickOutcome> {
        let period = self.settings.moving_average_period;
        let price = self.market.current_price(symbol).await?;
        progress.price = Some(price);
        let klines = self.market.daily_klines(symbol, period).await?;
        let moving_average = strategies::indicators::moving_average(&klines, period).ok_or_else(|| {
            Error::MarketData {
                symbol: symbol.clone(),
                reason: "no daily klines returned".to_string(),
            }
        })?;
        tracing::info!(symbol = %symbol, %price, %moving_average, candles = klines.len(), "Market data fetched.");

        let snapshot = self.coordinator.state(symbol)?.clone();
        let profit_taking = self.coordinator.evaluate_profit_taking(symbol, price, current_date)?;
        let profit_taking = self
            .settle(symbol, profit_taking, price, snapshot, current_date)
            .await?;
        progress.profit_taking = Some(profit_taking);

        let investment = if self.coordinator.should_invest_today(symbol, current_date)? {
            let available_cash = if self.settings.check_balance {
                let cash = self.market.free_balance(&self.settings.quote_asset).await?;
                tracing::info!(symbol = %symbol, %cash, asset = %self.settings.quote_asset, "Available balance.");
                Some(cash)
            } else {
                None
            };

            let snapshot = self.coordinator.state(symbol)?.clone();
            let action =
                self.coordinator
                    .evaluate_investment(symbol, price, moving_average, current_date, available_cash)?;
            self.settle(symbol, action, price, snapshot, current_date).await?
        } else {
            self.coordinator
                .evaluate_investment(symbol, price, moving_average, current_date, None)?
        };

        Ok(TickOutcome { profit_taking, investment })
    }

    /// Executes the order implied by `action` and persists the result.
    ///
    /// The exchange's fill is authoritative: when it differs from the decision
    /// the fill is booked instead. On a failed or empty order the symbol is
    /// rolled back to `snapshot` before the error returns.
    async fn settle(
        &mut self,
        symbol: &Symbol,
        action: Action,
        price: Decimal,
        snapshot: SymbolState,
        current_date: NaiveDate,
    ) -> Result<Action> {
        let (side, quantity) = match &action {
            Action::Skip { .. } => return Ok(action),
            Action::Buy(order) => (Side::Buy, order.size),
            Action::Sell(order) => (Side::Sell, order.size),
        };

        let request = OrderRequest {
            symbol: symbol.clone(),
            side,
            quantity,
            reference_price: price,
        };

        match self.executor.execute(&request, price).await {
            Ok(execution) => {
                tracing::info!(
                    executor = self.executor.name(),
                    symbol = %symbol,
                    side = %execution.side,
                    order_id = %execution.order_id,
                    quantity = %execution.quantity,
                    price = %execution.price,
                    "Order executed."
                );

                if execution.quantity <= Decimal::ZERO {
                    tracing::error!(symbol = %symbol, order_id = %execution.order_id, "Order filled nothing; rolling back state.");
                    self.coordinator.restore(symbol, snapshot)?;
                    return Err(Error::Execution(execution::Error::ExecutionFailed {
                        reason: format!("order {} for {} filled nothing", execution.order_id, symbol),
                    }));
                }

                let action = if execution.quantity == quantity && execution.price == price {
                    action
                } else {
                    tracing::info!(
                        symbol = %symbol,
                        decided_quantity = %quantity,
                        filled_quantity = %execution.quantity,
                        decided_price = %price,
                        fill_price = %execution.price,
                        "Booking the exchange fill."
                    );
                    let fill = Fill {
                        size: execution.quantity,
                        amount: execution.quote_amount,
                        price: execution.price,
                    };
                    self.coordinator
                        .record_fill(symbol, snapshot, &action, fill, current_date)?
                };

                self.persist()?;
                Ok(action)
            }
            Err(e) => {
                tracing::error!(symbol = %symbol, side = %side, error = %e, "Order failed; rolling back state.");
                self.coordinator.restore(symbol, snapshot)?;
                Err(e.into())
            }
        }
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.coordinator.to_persistable())?;
        Ok(())
    }

    /// Runs one tick now, then once a day at `check_time` local time, until Ctrl-C.
    pub async fn run_daily(&mut self, check_time: NaiveTime) -> Result<()> {
        self.run_scheduled_tick().await;

        loop {
            let wait = duration_until(&Local::now(), check_time);
            tracing::info!(
                next_check_in_secs = wait.as_secs(),
                check_time = %check_time.format("%H:%M"),
                "Waiting for next check."
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.run_scheduled_tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, stopping scheduler.");
                    return Ok(());
                }
            }
        }
    }

    async fn run_scheduled_tick(&mut self) {
        let today = Local::now().date_naive();
        if let Err(e) = self.run_tick(today).await {
            tracing::error!(error = %e, "Tick failed.");
        }
    }
}

/// Time from `now` until `check_time` next shows on the wall clock of `now`'s time zone.
///
/// A check time skipped by a daylight-saving jump runs an hour later that day;
/// one that occurs twice runs at its first occurrence.
pub fn duration_until<Tz: TimeZone>(now: &DateTime<Tz>, check_time: NaiveTime) -> Duration {
    let zone = now.timezone();
    let today = now.date_naive();
    let next = (0..=2)
        .filter_map(|days| today.checked_add_days(Days::new(days)))
        .filter_map(|date| resolve_local(&zone, date.and_time(check_time)))
        .find(|candidate| candidate > now);

    match next {
        Some(next) => next.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

fn resolve_local<Tz: TimeZone>(zone: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(local + TimeDelta::hours(1))).earliest())
}
