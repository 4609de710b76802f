// In crates/execution/src/live.rs

use crate::{Error, Executor, Result};
use api_client::{ApiClient, LotSize};
use async_trait::async_trait;
use core_types::{Execution, OrderRequest, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// An executor that places real market orders on Binance spot.
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    /// The API client for communicating with Binance.
    api_client: ApiClient,
    /// `LOT_SIZE` filters fetched so far, one per symbol.
    lot_sizes: HashMap<Symbol, LotSize>,
}

impl LiveExecutor {
    pub fn new(api_client: ApiClient) -> Self {
        Self {
            api_client,
            lot_sizes: HashMap::new(),
        }
    }

    async fn lot_size(&mut self, symbol: &Symbol) -> Result<LotSize> {
        if let Some(lot) = self.lot_sizes.get(symbol) {
            return Ok(*lot);
        }

        let client = &self.api_client;
        let lot = client.with_retries("lot_size", || client.lot_size(symbol)).await?;
        tracing::info!(
            symbol = %symbol,
            step_size = %lot.step_size,
            min_qty = %lot.min_qty,
            max_qty = %lot.max_qty,
            "Loaded lot size."
        );
        self.lot_sizes.insert(symbol.clone(), lot);
        Ok(lot)
    }
}

/// Floors `quantity` to the symbol's step and checks it against the lot limits.
fn fit_to_lot(lot: &LotSize, symbol: &Symbol, quantity: Decimal) -> Result<Decimal> {
    let fitted = lot.floor(quantity);
    if fitted <= Decimal::ZERO || fitted < lot.min_qty {
        return Err(Error::ExecutionFailed {
            reason: format!(
                "quantity {} for {} is below the minimum {} after flooring to step {}",
                quantity, symbol, lot.min_qty, lot.step_size
            ),
        });
    }
    if lot.max_qty > Decimal::ZERO && fitted > lot.max_qty {
        return Err(Error::ExecutionFailed {
            reason: format!("quantity {} for {} exceeds the maximum {}", fitted, symbol, lot.max_qty),
        });
    }
    Ok(fitted)
}

#[async_trait]
impl Executor for LiveExecutor {
    fn name(&self) -> &'static str {
        "LiveExecutor"
    }

    async fn execute(&mut self, order_request: &OrderRequest, current_price: Decimal) -> Result<Execution> {
        tracing::info!(?order_request, "Executing live order request...");

        let lot = self.lot_size(&order_request.symbol).await?;
        let quantity = fit_to_lot(&lot, &order_request.symbol, order_request.quantity)?;
        if quantity != order_request.quantity {
            tracing::info!(
                symbol = %order_request.symbol,
                requested = %order_request.quantity,
                sent = %quantity,
                step_size = %lot.step_size,
                "Quantity floored to the lot step."
            );
        }

        // Not retried: a timed-out order may still have filled.
        let response = self
            .api_client
            .place_market_order(&order_request.symbol, order_request.side, quantity)
            .await?;

        let price = response.average_price().ok_or_else(|| Error::ExecutionFailed {
            reason: format!(
                "order {} for {} was not filled (status {})",
                response.order_id, response.symbol, response.status
            ),
        })?;

        if response.executed_qty != quantity {
            tracing::warn!(
                symbol = %order_request.symbol,
                sent = %quantity,
                executed = %response.executed_qty,
                "Order was partially filled."
            );
        }

        let execution = Execution {
            symbol: order_request.symbol.clone(),
            side: order_request.side,
            price,
            quantity: response.executed_qty,
            quote_amount: response.cumulative_quote_qty,
            fee: response.total_commission(),
            order_id: response.order_id.to_string(),
            source_request: order_request.clone(),
        };

        tracing::info!(
            symbol = %execution.symbol,
            order_id = %execution.order_id,
            price = %execution.price,
            reference_price = %current_price,
            quantity = %execution.quantity,
            "Live order filled."
        );
        Ok(execution)
    }
}
