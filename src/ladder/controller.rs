//! The control loop: one controller instance owns the ladder of one
//! instrument and drives reconciliation and trailing from the scheduler's
//! flags, one tick at a time.

use crate::config::ladder::LadderConfig;
use crate::ladder::reconcile;
use crate::ladder::scheduler::InvalidationScheduler;
use crate::ladder::trailing::{self, TrailingRoll};
use crate::ladder::view::PositionView;
use crate::ladder::LadderState;
use crate::logging::directive_audit::DirectiveAuditLogger;
use crate::model::{CreateDirective, StopDirective};
use crate::runtime::traits::{ExecutorOrchestrator, MarketDataProvider, ReferencePriceStore};
use crate::status::LadderStatus;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

/// What one tick did, for logging and tests.
#[derive(Debug, Default)]
pub struct TickReport {
    /// False when neither flag was set: no snapshot fetch, no computation.
    pub ran: bool,
    pub rolled: bool,
    pub creates: usize,
    pub stops: usize,
    pub adopts: usize,
    /// Set when the pass was skipped on transient data unavailability; the
    /// consumed flags were re-set for the next tick.
    pub skipped: Option<String>,
}

pub struct LadderController<X, M, S>
where
    X: ExecutorOrchestrator,
    M: MarketDataProvider,
    S: ReferencePriceStore,
{
    config: LadderConfig,
    scheduler: Arc<InvalidationScheduler>,
    executor: X,
    market: M,
    store: S,
    audit: Option<DirectiveAuditLogger>,
    // In-memory reference price, always updated synchronously within the
    // tick; the durable write is awaited before the tick completes.
    reference_price: Option<f64>,
}

impl<X, M, S> LadderController<X, M, S>
where
    X: ExecutorOrchestrator,
    M: MarketDataProvider,
    S: ReferencePriceStore,
{
    pub fn new(
        config: LadderConfig,
        executor: X,
        market: M,
        store: S,
        audit: Option<DirectiveAuditLogger>,
    ) -> Self {
        let scheduler = Arc::new(InvalidationScheduler::new(Duration::seconds(
            config.forced_check_secs as i64,
        )));
        let reference_price = config
            .entry_price
            .or_else(|| store.load().ok().flatten())
            .filter(|p| *p > 0.0);
        if let Some(price) = reference_price {
            info!(
                "[LADDER] {} resuming with persisted reference price {}",
                config.instrument, price
            );
        }
        Self {
            config,
            scheduler,
            executor,
            market,
            store,
            audit,
            reference_price,
        }
    }

    pub fn config(&self) -> &LadderConfig {
        &self.config
    }

    pub fn scheduler(&self) -> Arc<InvalidationScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reference_price(&self) -> Option<f64> {
        self.reference_price
    }

    /// Runs one control-loop tick. Ticks where neither flag is set are
    /// no-ops. Transient data unavailability skips the pass with the flags
    /// re-set; configuration errors are returned to the caller, which keeps
    /// ticking.
    pub async fn on_tick(&mut self, now: DateTime<Utc>) -> Result<TickReport> {
        if !self.config.enabled {
            return self.close_all().await;
        }

        self.scheduler.update_forced(now);
        let run_trail = self.scheduler.take_trail();
        let run_reconcile = self.scheduler.take_reconcile();
        if !run_trail && !run_reconcile {
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            ran: true,
            ..TickReport::default()
        };

        let reference_price = match self.resolve_reference_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    "[LADDER] {} reference price unresolved, skipping pass: {}",
                    self.config.instrument, e
                );
                return Ok(self.skip_pass(report, run_trail, run_reconcile, e));
            }
        };

        let snapshot = match self.executor.active_positions(&self.config.instrument).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "[LADDER] {} snapshot unavailable, skipping pass: {}",
                    self.config.instrument, e
                );
                return Ok(self.skip_pass(report, run_trail, run_reconcile, e));
            }
        };

        let state = LadderState::from_config(&self.config, reference_price);

        if run_trail {
            let roll = {
                let view = PositionView::new(&snapshot, &self.config.instrument);
                trailing::check_trailing(
                    &view,
                    &state,
                    now,
                    Duration::seconds(self.config.executor_refresh_secs as i64),
                )?
            };
            if let Some(roll) = roll {
                self.apply_roll(roll, &mut report).await?;
                // The roll just changed labels and the reference price; a
                // reconciliation pass on this tick's snapshot would double
                // the new top level. Re-validate against a fresh snapshot
                // next tick, whether or not this tick was asked to
                // reconcile.
                self.scheduler.request_reconcile();
            }
        }

        if run_reconcile && !report.rolled {
            let outcome = {
                let view = PositionView::new(&snapshot, &self.config.instrument);
                reconcile::reconcile(&view, &state)?
            };
            for create in &outcome.creates {
                self.submit_create(create).await;
                report.creates += 1;
            }
            for stop in &outcome.stops {
                self.submit_stop(stop).await;
                report.stops += 1;
            }
            if outcome.resize_detected {
                self.scheduler.request_reconcile();
            }
        }

        if report.creates + report.stops + report.adopts > 0 {
            info!(
                "[LADDER] {} tick: {} creates, {} stops, {} adopts{}",
                self.config.instrument,
                report.creates,
                report.stops,
                report.adopts,
                if report.rolled { " (rolled)" } else { "" }
            );
        }
        Ok(report)
    }

    /// Read-only snapshot for external display.
    pub async fn status(&self) -> Result<LadderStatus> {
        let snapshot = self.executor.active_positions(&self.config.instrument).await?;
        let mid = self
            .market
            .mid_price(&self.config.instrument)
            .await
            .ok()
            .filter(|m| *m > 0.0);
        let realized = self
            .executor
            .realized_pnl(&self.config.instrument)
            .await
            .unwrap_or(0.0);
        Ok(LadderStatus::build(
            &snapshot,
            &self.config.instrument,
            self.reference_price.unwrap_or(0.0),
            mid,
            self.config.levels,
            realized,
        ))
    }

    /// Kill-switch path: a disabled ladder places nothing and stops every
    /// active position. Runs every tick until the book is flat; the
    /// scheduler's flags are left untouched so a re-enable resumes promptly.
    async fn close_all(&mut self) -> Result<TickReport> {
        let mut report = TickReport {
            ran: true,
            ..TickReport::default()
        };
        let snapshot = match self.executor.active_positions(&self.config.instrument).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "[LADDER] {} snapshot unavailable, close-all deferred: {}",
                    self.config.instrument, e
                );
                report.skipped = Some(e.to_string());
                return Ok(report);
            }
        };
        let stops: Vec<StopDirective> = {
            let view = PositionView::new(&snapshot, &self.config.instrument);
            view.active()
                .iter()
                .map(|p| StopDirective {
                    position_id: p.id.clone(),
                })
                .collect()
        };
        if !stops.is_empty() {
            warn!(
                "[LADDER] {} disabled, closing {} active positions",
                self.config.instrument,
                stops.len()
            );
            for stop in &stops {
                self.submit_stop(stop).await;
                report.stops += 1;
            }
        }
        Ok(report)
    }

    fn skip_pass(
        &self,
        mut report: TickReport,
        run_trail: bool,
        run_reconcile: bool,
        reason: anyhow::Error,
    ) -> TickReport {
        if run_trail {
            self.scheduler.request_trail();
        }
        if run_reconcile {
            self.scheduler.request_reconcile();
        }
        report.skipped = Some(reason.to_string());
        report
    }

    /// The reference price the ladder is anchored at: the persisted override
    /// when present, else resolved once from the live mid and persisted.
    async fn resolve_reference_price(&mut self) -> Result<f64> {
        if let Some(price) = self.reference_price {
            return Ok(price);
        }
        let mid = self.market.mid_price(&self.config.instrument).await?;
        if mid <= 0.0 {
            return Err(anyhow!("Mid price unavailable for {}", self.config.instrument));
        }
        // Durable write first: caching an unpersisted anchor would let a
        // restart re-derive a different ladder.
        self.store.persist(mid).await?;
        self.reference_price = Some(mid);
        info!(
            "[LADDER] {} reference price resolved from mid: {}",
            self.config.instrument, mid
        );
        Ok(mid)
    }

    /// Applies a trailing roll as one logical unit of work: relabel the
    /// survivors, mint the new top, retire the pushed-out bottom, move the
    /// reference price.
    async fn apply_roll(&mut self, roll: TrailingRoll, report: &mut TickReport) -> Result<()> {
        for adopt in &roll.adopts {
            match self
                .executor
                .adopt_level(&adopt.position_id, adopt.level.clone())
                .await
            {
                Ok(()) => {
                    if let Some(audit) = &self.audit {
                        audit.log_adopt(adopt);
                    }
                    report.adopts += 1;
                }
                Err(e) => {
                    warn!(
                        "[LADDER] Adopt for {} failed to submit: {}",
                        adopt.position_id, e
                    );
                    self.scheduler.request_reconcile();
                }
            }
        }

        self.submit_create(&roll.create).await;
        report.creates += 1;
        if let Some(stop) = &roll.stop {
            self.submit_stop(stop).await;
            report.stops += 1;
        }

        // Memory first, then the awaited durable write; a persistence
        // failure must not leave the tick anchored at the stale price.
        self.reference_price = Some(roll.new_reference_price);
        self.config.entry_price = Some(roll.new_reference_price);
        if let Err(e) = self.store.persist(roll.new_reference_price).await {
            warn!("[LADDER] Failed to persist reference price: {}", e);
        }

        report.rolled = true;
        Ok(())
    }

    async fn submit_create(&mut self, directive: &CreateDirective) {
        match self.executor.create_position(directive).await {
            Ok(id) => {
                debug!(
                    "[LADDER] Created {} @ {} ({}): {}",
                    directive.level, directive.entry_price, directive.amount, id
                );
                if let Some(audit) = &self.audit {
                    audit.log_create(directive);
                }
            }
            Err(e) => {
                warn!(
                    "[LADDER] Create for {} failed to submit: {}",
                    directive.level, e
                );
                self.scheduler.request_reconcile();
            }
        }
    }

    async fn submit_stop(&mut self, directive: &StopDirective) {
        match self.executor.stop_position(&directive.position_id).await {
            Ok(()) => {
                debug!("[LADDER] Stopped {}", directive.position_id);
                if let Some(audit) = &self.audit {
                    audit.log_stop(&self.config.instrument, directive);
                }
            }
            Err(e) => {
                warn!(
                    "[LADDER] Stop for {} failed to submit: {}",
                    directive.position_id, e
                );
                self.scheduler.request_reconcile();
            }
        }
    }
}
