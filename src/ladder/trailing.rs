//! Trailing roll: shifts the whole ladder up when the top level has sat
//! unfilled past its allowed dwell time.

use crate::ladder::view::PositionView;
use crate::ladder::{sizing, LadderState};
use crate::model::{AdoptDirective, CreateDirective, LevelId, StopDirective};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::info;

/// One atomic trailing transition. The caller applies all parts as a single
/// logical unit of work within the same tick.
#[derive(Debug)]
pub struct TrailingRoll {
    /// Relabels for every surviving active position: index n becomes n+1.
    pub adopts: Vec<AdoptDirective>,
    /// New level-0 position at the rolled-up reference price.
    pub create: CreateDirective,
    /// The position pushed out past the level count. `None` when the ladder
    /// was not full, so a partially-built ladder never loses a rung.
    pub stop: Option<StopDirective>,
    /// `top.entry_price * (1 + step)`; must be persisted as the new
    /// reference price before the tick completes.
    pub new_reference_price: f64,
}

/// Checks the trailing trigger and, when met, computes the roll.
///
/// Trigger: the top position (highest entry price) exists, is not trading,
/// and has been resting longer than `refresh_timeout`. An unfilled resting
/// top order past its timeout means the market has moved up and away; the
/// ladder rolls upward to follow it. No active positions is a no-op.
pub fn check_trailing(
    view: &PositionView,
    state: &LadderState,
    now: DateTime<Utc>,
    refresh_timeout: Duration,
) -> Result<Option<TrailingRoll>> {
    let top = match view.top() {
        Some(top) => top,
        None => return Ok(None),
    };
    if top.is_trading || now - top.timestamp < refresh_timeout {
        return Ok(None);
    }

    let new_reference_price = top.entry_price * (1.0 + state.step);
    let amount = sizing::per_level_amount(
        state.allocated_margin,
        state.reinvested,
        state.leverage,
        state.level_count,
        new_reference_price,
    )?;

    let adopts = view
        .active()
        .iter()
        .filter_map(|p| {
            p.level.as_ref().map(|level| AdoptDirective {
                position_id: p.id.clone(),
                level: LevelId::new(&level.instrument, level.index + 1),
            })
        })
        .collect();

    let stop = if view.active_count() as u32 >= state.level_count {
        view.bottom().map(|bottom| StopDirective {
            position_id: bottom.id.clone(),
        })
    } else {
        None
    };

    info!(
        "[TRAIL] {} rolling up: top {} idle past timeout, new reference {}",
        state.instrument, top.entry_price, new_reference_price
    );

    Ok(Some(TrailingRoll {
        adopts,
        create: CreateDirective {
            level: LevelId::new(&state.instrument, 0),
            entry_price: new_reference_price,
            amount,
        },
        stop,
        new_reference_price,
    }))
}
