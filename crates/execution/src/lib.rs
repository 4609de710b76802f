// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{Execution, OrderRequest};
use rust_decimal::Decimal;

pub mod dry_run;
pub mod error;
pub mod live;

// Re-export public types
pub use dry_run::DryRunExecutor;
pub use error::{Error, Result};
pub use live::LiveExecutor;

/// The universal interface for an execution handler.
///
/// An `Executor` takes a sized `OrderRequest` and submits it to a target,
/// which is either the live exchange or a log-only simulation.
#[async_trait]
pub trait Executor: Send {
    /// The name of the executor (e.g., "LiveExecutor", "DryRunExecutor").
    fn name(&self) -> &'static str;

    /// Executes a given order request and waits for its confirmation.
    ///
    /// `current_price` is the price the decision was made at; simulated
    /// executors fill there, live ones report the exchange's fill.
    async fn execute(&mut self, order_request: &OrderRequest, current_price: Decimal) -> Result<Execution>;
}
