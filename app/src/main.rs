// In app/src/main.rs

use anyhow::{Context, Result};
use api_client::ApiClient;
use app_config::Settings;
use backtester::Backtester;
use chrono::Local;
use clap::{Parser, Subcommand};
use core_types::Symbol;
use engine::{Engine, EngineSettings};
use execution::{DryRunExecutor, Executor, LiveExecutor};
use rust_decimal::Decimal;
use state_store::StateStore;

mod logging;
mod report;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A deviation-factored DCA bot for Binance spot.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a health check, then checks every day at the configured time.
    Run {
        /// Start from empty state if the state file cannot be parsed.
        #[arg(long)]
        reset_corrupt: bool,
    },

    /// Runs a single check now and exits.
    Check {
        /// Start from empty state if the state file cannot be parsed.
        #[arg(long)]
        reset_corrupt: bool,
    },

    /// Prints the per-symbol and total status at current prices.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Checks exchange connectivity.
    Health,

    /// Replays recent daily candles of one symbol through the strategy.
    Backtest {
        /// The trading symbol to backtest (e.g., "ETHUSDT").
        #[arg(short, long)]
        symbol: String,

        /// Number of trading days after the moving-average warm-up.
        #[arg(short, long, default_value_t = 365)]
        days: usize,

        /// Simulated starting cash in the quote asset.
        #[arg(long, default_value = "10000")]
        initial_cash: Decimal,

        /// Base cash per period. Defaults to the symbol's configured value.
        #[arg(long)]
        base_cash: Option<Decimal>,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings().context("loading config/base.toml")?;
    let _log_guard = logging::init(&settings.app.log_level, &settings.app.log_dir)?;

    tracing::info!(
        environment = %settings.app.environment,
        dry_run = settings.app.dry_run,
        "Starting DFA trader."
    );

    match cli.command {
        Commands::Run { reset_corrupt } => {
            let mut engine = build_engine(&settings, reset_corrupt)?;
            engine.health_check().await.context("health check failed")?;
            engine.run_daily(settings.app.check_time()?).await?;
        }
        Commands::Check { reset_corrupt } => {
            let mut engine = build_engine(&settings, reset_corrupt)?;
            engine.run_tick(Local::now().date_naive()).await?;
        }
        Commands::Status { json } => {
            let engine = build_engine(&settings, false)?;
            let summary = engine.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", report::format_status(&summary));
            }
        }
        Commands::Health => {
            let engine = build_engine(&settings, false)?;
            engine.health_check().await?;
            println!("OK");
        }
        Commands::Backtest {
            symbol,
            days,
            initial_cash,
            base_cash,
        } => {
            handle_backtest(&settings, &symbol, days, initial_cash, base_cash).await?;
        }
    }

    tracing::info!("DFA trader has finished successfully.");
    Ok(())
}

/// Wires config, saved state, the exchange client and an executor into an engine.
fn build_engine(settings: &Settings, reset_corrupt: bool) -> Result<Engine> {
    let live = app_config::load_live_config().context("loading config/live.toml")?;
    let configs = live.strategy_configs(&settings.strategy)?;
    let symbols: Vec<&str> = configs.iter().map(|(s, _)| s.as_str()).collect();
    tracing::info!(?symbols, "Tracking assets.");

    let store = StateStore::new(&settings.app.state_path);
    let coordinator = engine::load_coordinator(configs, &store, reset_corrupt)?;

    let api_client = api_client::new(&settings.binance)?;
    let has_keys = !settings.binance.api_key.is_empty() && !settings.binance.secret_key.is_empty();

    let executor: Box<dyn Executor + Sync> = if settings.app.dry_run {
        tracing::info!("Dry run: orders are logged, not sent.");
        Box::new(DryRunExecutor::new())
    } else {
        if !has_keys {
            anyhow::bail!("Live trading needs binance.api_key and binance.secret_key.");
        }
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
        Box::new(LiveExecutor::new(api_client.clone()))
    };

    Ok(Engine::new(
        coordinator,
        Box::new(api_client),
        executor,
        store,
        EngineSettings {
            moving_average_period: settings.strategy.moving_average_period,
            quote_asset: settings.binance.quote_asset.clone(),
            check_balance: has_keys,
        },
    ))
}

async fn handle_backtest(
    settings: &Settings,
    symbol: &str,
    days: usize,
    initial_cash: Decimal,
    base_cash: Option<Decimal>,
) -> Result<()> {
    let symbol = Symbol::parse(symbol)?;
    let base_cash = match base_cash {
        Some(cash) => cash,
        None => app_config::load_live_config()?
            .asset_configs
            .iter()
            .find(|a| Symbol::parse(&a.symbol).is_ok_and(|s| s == symbol))
            .map(|a| a.base_cash)
            .with_context(|| format!("{} is not in config/live.toml; pass --base-cash", symbol))?,
    };
    let config = settings.strategy.config_for(base_cash)?;
    let period = settings.strategy.moving_average_period;

    let wanted = days + period;
    let limit = wanted.min(usize::from(api_client::MAX_KLINES_PER_REQUEST));
    if limit < wanted {
        tracing::warn!(wanted, limit, "Binance returns at most this many daily candles; replaying fewer days.");
    }

    let api_client = ApiClient::new(&settings.binance)?;
    let klines = api_client
        .with_retries("daily_klines", || api_client.daily_klines(&symbol, limit as u16))
        .await?;
    tracing::info!(symbol = %symbol, candles = klines.len(), "Loaded daily klines for backtest.");

    let report = Backtester::new(symbol, config, period, initial_cash).run(&klines)?;
    println!("{}", report::format_backtest(&report));
    Ok(())
}
