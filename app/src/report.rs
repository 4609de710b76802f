// In app/src/report.rs

use analytics::PortfolioSummary;
use backtester::BacktestReport;
use std::fmt::Write;

/// Renders the portfolio status as a plain-text table.
pub fn format_status(summary: &PortfolioSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n========== DFA Portfolio Status ==========");
    let _ = writeln!(
        out,
        "{:<10} {:>5} {:>14} {:>12} {:>12} {:>9} {:>12} {:>9}  {}",
        "SYMBOL", "BUYS", "SHARES", "INVESTED", "VALUE", "RETURN%", "SOLD", "TOTAL%", "LAST BUY"
    );
    for s in &summary.symbols {
        let last_buy = s
            .last_investment_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<10} {:>5} {:>14} {:>12} {:>12} {:>9} {:>12} {:>9}  {}",
            s.symbol.as_str(),
            s.investment_count,
            s.total_shares.round_dp(4).to_string(),
            s.total_invested.round_dp(2).to_string(),
            s.current_value.round_dp(2).to_string(),
            s.current_return.round_dp(2).to_string(),
            s.total_sell_amount.round_dp(2).to_string(),
            s.total_return.round_dp(2).to_string(),
            last_buy
        );
    }
    let _ = writeln!(out, "------------------------------------------");
    let _ = writeln!(out, "Total invested:   {}", summary.total_investment.round_dp(2));
    let _ = writeln!(out, "Total assets:     {}", summary.total_assets.round_dp(2));
    let _ = writeln!(out, "Total return:     {}%", summary.total_return.round_dp(2));
    let _ = writeln!(out, "==========================================");
    out
}

/// Renders a backtest summary.
pub fn format_backtest(report: &BacktestReport) -> String {
    let status = &report.final_status;
    let mut out = String::new();
    let _ = writeln!(out, "\n========== Backtest: {} ==========", report.symbol);
    let _ = writeln!(out, "Period:            {} to {}", report.start_date, report.end_date);
    let _ = writeln!(out, "Buys / sells:      {} / {}", report.buys, report.sells);
    let _ = writeln!(out, "Initial cash:      {}", report.initial_cash.round_dp(2));
    let _ = writeln!(out, "Final cash:        {}", report.final_cash.round_dp(2));
    let _ = writeln!(out, "Shares held:       {}", status.total_shares.round_dp(4));
    let _ = writeln!(out, "Holdings value:    {}", status.current_value.round_dp(2));
    let _ = writeln!(out, "Final equity:      {}", report.final_equity().round_dp(2));
    let _ = writeln!(out, "Equity return:     {}%", report.equity_return().round_dp(2));
    let _ = writeln!(out, "Strategy return:   {}%", status.total_return.round_dp(2));
    let _ = writeln!(out, "Max drawdown:      {}%", report.max_drawdown.round_dp(2));
    let _ = writeln!(out, "==========================================");
    out
}
