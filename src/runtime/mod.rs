//! Async host for the controller: the tick loop, event intake, periodic
//! status summaries and graceful shutdown.

pub mod paper;
pub mod traits;

use crate::constants::STATUS_SUMMARY_INTERVAL;
use crate::ladder::controller::LadderController;
use crate::model::OrderLifecycleEvent;
use crate::runtime::traits::{ExecutorOrchestrator, MarketDataProvider, ReferencePriceStore};
use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info};
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Engine<X, M, S>
where
    X: ExecutorOrchestrator,
    M: MarketDataProvider,
    S: ReferencePriceStore,
{
    controller: LadderController<X, M, S>,
    events: UnboundedReceiver<OrderLifecycleEvent>,
}

impl<X, M, S> Engine<X, M, S>
where
    X: ExecutorOrchestrator,
    M: MarketDataProvider,
    S: ReferencePriceStore,
{
    pub fn new(
        controller: LadderController<X, M, S>,
        events: UnboundedReceiver<OrderLifecycleEvent>,
    ) -> Self {
        Self { controller, events }
    }

    /// Drives the controller until Ctrl+C. A failed tick is logged and the
    /// loop keeps going; the scheduler's forced interval guarantees the next
    /// full pass.
    pub async fn run(self) -> Result<()> {
        let Self {
            mut controller,
            mut events,
        } = self;
        let instrument = controller.config().instrument.clone();
        let scheduler = controller.scheduler();

        let mut tick_timer = tokio::time::interval(std::time::Duration::from_secs(
            controller.config().tick_secs,
        ));
        let mut status_timer = tokio::time::interval(STATUS_SUMMARY_INTERVAL);

        info!("[ENGINE] Started for {}.", instrument);
        loop {
            tokio::select! {
                _ = tick_timer.tick() => {
                    match controller.on_tick(Utc::now()).await {
                        Ok(report) => {
                            if let Some(reason) = report.skipped {
                                debug!("[ENGINE] Degraded pass for {}: {}", instrument, reason);
                            }
                        }
                        Err(e) => {
                            error!("[ENGINE] Tick failed for {} (continuing): {}", instrument, e);
                        }
                    }
                }
                _ = status_timer.tick() => {
                    match controller.status().await {
                        Ok(status) => match serde_json::to_string(&status) {
                            Ok(json) => info!("[STATUS] {}", json),
                            Err(e) => debug!("[ENGINE] Status serialization failed: {}", e),
                        },
                        Err(e) => debug!("[ENGINE] Status unavailable: {}", e),
                    }
                }
                Some(event) = events.recv() => {
                    debug!("[ENGINE] Lifecycle event: {:?}", event);
                    scheduler.observe(&event, &instrument);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("[ENGINE] Shutdown signal received. Stopping...");
                    break;
                }
            }
        }
        info!("[ENGINE] Stopped gracefully.");
        Ok(())
    }
}
