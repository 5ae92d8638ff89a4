//! Interface boundary to the hosting trading runtime.
//!
//! The core consumes these three narrow interfaces; everything behind them
//! (exchange connectivity, fill tracking, durable config) is external.

use crate::model::{CreateDirective, LevelId, PositionId, PositionRecord};
use anyhow::Result;

/// Order placement/cancellation boundary. Calls are fire-and-acknowledge and
/// idempotent on retry; fulfillment failures come back later as
/// order-lifecycle events, never as in-band errors.
#[allow(async_fn_in_trait)]
pub trait ExecutorOrchestrator {
    /// Snapshot of the executor-owned positions for one instrument.
    async fn active_positions(&self, instrument: &str) -> Result<Vec<PositionRecord>>;

    async fn create_position(&mut self, directive: &CreateDirective) -> Result<PositionId>;

    async fn stop_position(&mut self, position_id: &PositionId) -> Result<()>;

    /// Relabels a surviving position during a trailing roll. This is the
    /// "adopt" operation: the core never mutates executor-owned records
    /// directly.
    async fn adopt_level(&mut self, position_id: &PositionId, level: LevelId) -> Result<()>;

    /// Realized PnL aggregate for status display.
    async fn realized_pnl(&self, instrument: &str) -> Result<f64>;
}

/// Live price retrieval. May fail transiently; the controller skips the pass
/// and retries next tick.
#[allow(async_fn_in_trait)]
pub trait MarketDataProvider {
    async fn mid_price(&self, instrument: &str) -> Result<f64>;
}

/// Durable home of the reference price. Written whenever the reference price
/// changes (initial resolution or trailing roll), read back on restart so a
/// ladder resumes without re-deriving from a live price.
#[allow(async_fn_in_trait)]
pub trait ReferencePriceStore {
    fn load(&self) -> Result<Option<f64>>;

    async fn persist(&mut self, entry_price: f64) -> Result<()>;
}
