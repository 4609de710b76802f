// In crates/execution/src/dry_run.rs

use crate::{Executor, Result};
use async_trait::async_trait;
use core_types::{Execution, OrderRequest, Side};
use rust_decimal::Decimal;

/// Logs orders instead of sending them. Fills are immediate, complete and free.
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &'static str {
        "DryRunExecutor"
    }

    async fn execute(&mut self, order_request: &OrderRequest, current_price: Decimal) -> Result<Execution> {
        let quote_amount = order_request.quantity * current_price;
        let order_id = match order_request.side {
            Side::Buy => "DRY_RUN_BUY",
            Side::Sell => "DRY_RUN_SELL",
        };

        tracing::info!(
            symbol = %order_request.symbol,
            side = %order_request.side,
            quantity = %order_request.quantity,
            price = %current_price,
            amount = %quote_amount.round_dp(2),
            "Simulated market order (dry run)."
        );

        Ok(Execution {
            symbol: order_request.symbol.clone(),
            side: order_request.side,
            price: current_price,
            quantity: order_request.quantity,
            quote_amount,
            fee: Decimal::ZERO,
            order_id: order_id.to_string(),
            source_request: order_request.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Symbol;
    use rust_decimal_macros::dec;

    fn request(side: Side) -> OrderRequest {
        OrderRequest {
            symbol: Symbol("ETHUSDT".into()),
            side,
            quantity: dec!(0.0093),
            reference_price: dec!(3000),
        }
    }

    #[tokio::test]
    async fn fills_buy_at_current_price() {
        let mut executor = DryRunExecutor::new();
        let execution = executor.execute(&request(Side::Buy), dec!(3010)).await.unwrap();

        assert_eq!(execution.order_id, "DRY_RUN_BUY");
        assert_eq!(execution.price, dec!(3010));
        assert_eq!(execution.quantity, dec!(0.0093));
        assert_eq!(execution.quote_amount, dec!(27.993));
        assert_eq!(execution.fee, Decimal::ZERO);
        assert_eq!(execution.source_request, request(Side::Buy));
    }

    #[tokio::test]
    async fn labels_sells() {
        let mut executor = DryRunExecutor::new();
        let execution = executor.execute(&request(Side::Sell), dec!(3000)).await.unwrap();
        assert_eq!(execution.order_id, "DRY_RUN_SELL");
        assert_eq!(execution.side, Side::Sell);
    }
}
