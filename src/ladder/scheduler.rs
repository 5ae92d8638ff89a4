//! Invalidation scheduling: decides *when* reconciliation and trailing run.
//!
//! Two sticky flags, set by event callbacks or the periodic forced interval,
//! consumed once per control-loop tick. Event callbacks only ever set flags;
//! all computation stays on the tick task. Consumption is a swap-based atomic
//! read-and-clear, so a flag set between the tick's read and its clear is
//! never lost.

use crate::model::OrderLifecycleEvent;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct InvalidationScheduler {
    // Both start set: the first tick always reconciles.
    reconcile_requested: AtomicBool,
    trail_requested: AtomicBool,
    last_forced_check: Mutex<DateTime<Utc>>,
    forced_interval: Duration,
}

impl InvalidationScheduler {
    pub fn new(forced_interval: Duration) -> Self {
        Self {
            reconcile_requested: AtomicBool::new(true),
            trail_requested: AtomicBool::new(true),
            last_forced_check: Mutex::new(Utc::now()),
            forced_interval,
        }
    }

    pub fn request_reconcile(&self) {
        self.reconcile_requested.store(true, Ordering::Release);
    }

    pub fn request_trail(&self) {
        self.trail_requested.store(true, Ordering::Release);
    }

    /// Reacts to an order-lifecycle event for the given instrument. Cancelled
    /// or failed orders invalidate the ladder; a completed closing sell on
    /// the top rung makes it eligible for a trailing check.
    pub fn observe(&self, event: &OrderLifecycleEvent, instrument: &str) {
        if event.instrument() != instrument {
            return;
        }
        match event {
            OrderLifecycleEvent::OrderCancelled { .. }
            | OrderLifecycleEvent::OrderFailed { .. } => {
                debug!("[SCHED] {} invalidated by {:?}", instrument, event);
                self.request_reconcile();
            }
            OrderLifecycleEvent::SellCompleted { .. } => {
                debug!("[SCHED] {} trail check requested by {:?}", instrument, event);
                self.request_trail();
            }
        }
    }

    /// Sets both flags when the forced interval has elapsed since the last
    /// mandatory pass. Called by the tick task only.
    pub fn update_forced(&self, now: DateTime<Utc>) {
        let Ok(mut last) = self.last_forced_check.lock() else {
            return;
        };
        if now - *last >= self.forced_interval {
            *last = now;
            self.request_reconcile();
            self.request_trail();
        }
    }

    /// Atomic read-and-clear of the reconcile flag.
    pub fn take_reconcile(&self) -> bool {
        self.reconcile_requested.swap(false, Ordering::AcqRel)
    }

    /// Atomic read-and-clear of the trail flag.
    pub fn take_trail(&self) -> bool {
        self.trail_requested.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(interval_secs: i64) -> InvalidationScheduler {
        InvalidationScheduler::new(Duration::seconds(interval_secs))
    }

    #[test]
    fn test_first_tick_runs_everything() {
        let sched = scheduler(10);
        assert!(sched.take_reconcile());
        assert!(sched.take_trail());
        // Cleared after consumption.
        assert!(!sched.take_reconcile());
        assert!(!sched.take_trail());
    }

    #[test]
    fn test_events_set_the_matching_flag() {
        let sched = scheduler(10);
        sched.take_reconcile();
        sched.take_trail();

        sched.observe(
            &OrderLifecycleEvent::OrderCancelled {
                instrument: "WLD-USDT".to_string(),
            },
            "WLD-USDT",
        );
        assert!(sched.take_reconcile());
        assert!(!sched.take_trail());

        sched.observe(
            &OrderLifecycleEvent::SellCompleted {
                instrument: "WLD-USDT".to_string(),
            },
            "WLD-USDT",
        );
        assert!(sched.take_trail());
        assert!(!sched.take_reconcile());
    }

    #[test]
    fn test_foreign_instrument_events_are_ignored() {
        let sched = scheduler(10);
        sched.take_reconcile();
        sched.observe(
            &OrderLifecycleEvent::OrderFailed {
                instrument: "ETH-USDT".to_string(),
            },
            "WLD-USDT",
        );
        assert!(!sched.take_reconcile());
    }

    #[test]
    fn test_forced_interval_sets_both() {
        let sched = scheduler(10);
        sched.take_reconcile();
        sched.take_trail();

        let start = Utc::now();
        sched.update_forced(start + Duration::seconds(5));
        assert!(!sched.take_reconcile(), "interval not yet elapsed");

        sched.update_forced(start + Duration::seconds(10));
        assert!(sched.take_reconcile());
        assert!(sched.take_trail());

        // The stamp resets: five more seconds is not enough again.
        sched.update_forced(start + Duration::seconds(15));
        assert!(!sched.take_reconcile());
    }

    #[test]
    fn test_set_after_take_is_carried_to_next_tick() {
        let sched = scheduler(10);
        assert!(sched.take_reconcile());
        // An event lands after the tick consumed the flag: it must survive
        // for the next tick instead of being lost.
        sched.request_reconcile();
        assert!(sched.take_reconcile());
    }
}
