//! Ladder reconciliation: the minimal create/stop directives that make the
//! observed positions match the expected ladder.

use crate::ladder::view::PositionView;
use crate::ladder::{price, sizing, LadderState};
use crate::model::{CreateDirective, LevelId, StopDirective};
use anyhow::Result;
use log::info;

/// Result of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Create directives for missing levels, ascending index order.
    pub creates: Vec<CreateDirective>,
    /// Stop directives for resting positions sized against stale capital.
    pub stops: Vec<StopDirective>,
    /// Set when a capital change was detected; the caller must request
    /// another reconciliation pass so the stopped levels are recreated with
    /// the new sizing next tick.
    pub resize_detected: bool,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.stops.is_empty()
    }
}

/// Computes the directives needed to restore the one-position-per-level
/// invariant. Idempotent: run twice against an unchanged snapshot, the second
/// pass emits nothing.
pub fn reconcile(view: &PositionView, state: &LadderState) -> Result<ReconcileOutcome> {
    let amount = sizing::per_level_amount(
        state.allocated_margin,
        state.reinvested,
        state.leverage,
        state.level_count,
        state.reference_price,
    )?;

    let mut outcome = ReconcileOutcome::default();

    if (view.active_count() as u32) < state.level_count {
        for index in 0..state.level_count {
            if !view.occupies(index) {
                outcome.creates.push(CreateDirective {
                    level: LevelId::new(&state.instrument, index),
                    entry_price: price::entry_price_at(state.reference_price, state.step, index),
                    amount,
                });
            }
        }
    }

    // Capital change detection: resting positions carry the amount they were
    // sized with at creation; if the margin that amount implies at the current
    // reference price differs from the configured capital, retire them all.
    let target_margin = (state.allocated_margin + state.reinvested).round();
    let resting = view.not_trading();
    let mismatch = resting.iter().any(|p| {
        sizing::implied_margin(p.amount, state.reference_price, state.level_count, state.leverage)
            != target_margin
    });
    if mismatch {
        info!(
            "[RECONCILE] {} capital changed to {}, retiring {} resting positions",
            state.instrument,
            target_margin,
            resting.len()
        );
        outcome.stops = resting
            .iter()
            .map(|p| StopDirective {
                position_id: p.id.clone(),
            })
            .collect();
        outcome.resize_detected = true;
    }

    Ok(outcome)
}
