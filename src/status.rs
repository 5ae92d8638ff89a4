//! Read-only status snapshot for external display. Free-form, not bit-exact.

use crate::model::PositionRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelAssignment {
    pub index: u32,
    pub position_id: String,
    pub entry_price: f64,
    pub amount: f64,
    /// "Placed" (resting) or "Filled" (trading).
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderStatus {
    pub instrument: String,
    pub reference_price: f64,
    /// Absent while the price feed is unavailable.
    pub mid_price: Option<f64>,
    pub level_count: u32,
    pub placed: usize,
    pub filled: usize,
    pub done: usize,
    pub realized_pnl: f64,
    /// Marked against the current mid; absent with it.
    pub unrealized_pnl: Option<f64>,
    pub levels: Vec<LevelAssignment>,
}

impl LadderStatus {
    pub fn build(
        snapshot: &[PositionRecord],
        instrument: &str,
        reference_price: f64,
        mid_price: Option<f64>,
        level_count: u32,
        realized_pnl: f64,
    ) -> Self {
        let mut placed = 0;
        let mut filled = 0;
        let mut done = 0;
        let mut unrealized = 0.0;
        let mut levels = Vec::new();

        for record in snapshot {
            if record.instrument != instrument {
                continue;
            }
            if record.is_done {
                done += 1;
                continue;
            }
            if !record.is_active {
                continue;
            }
            if record.is_trading {
                filled += 1;
                if let Some(mid) = mid_price {
                    unrealized += (mid - record.entry_price) * record.amount;
                }
            } else {
                placed += 1;
            }
            if let Some(level) = &record.level {
                levels.push(LevelAssignment {
                    index: level.index,
                    position_id: record.id.to_string(),
                    entry_price: record.entry_price,
                    amount: record.amount,
                    state: if record.is_trading {
                        "Filled".to_string()
                    } else {
                        "Placed".to_string()
                    },
                });
            }
        }
        levels.sort_by_key(|l| l.index);

        Self {
            instrument: instrument.to_string(),
            reference_price,
            mid_price,
            level_count,
            placed,
            filled,
            done,
            realized_pnl,
            unrealized_pnl: mid_price.map(|_| unrealized),
            levels,
        }
    }
}
