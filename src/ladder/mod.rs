pub mod controller;
pub mod price;
pub mod reconcile;
pub mod scheduler;
pub mod sizing;
pub mod trailing;
pub mod view;

use crate::config::ladder::LadderConfig;

/// Snapshot of the ladder parameters for one reconciliation pass.
///
/// Owned by a single controller instance and rebuilt each tick from the
/// config plus the resolved reference price; the pure engines operate on this
/// snapshot, never on shared state.
#[derive(Debug, Clone)]
pub struct LadderState {
    pub instrument: String,
    pub reference_price: f64,
    pub step: f64,
    pub level_count: u32,
    pub allocated_margin: f64,
    pub reinvested: f64,
    pub leverage: u32,
}

impl LadderState {
    pub fn from_config(config: &LadderConfig, reference_price: f64) -> Self {
        Self {
            instrument: config.instrument.clone(),
            reference_price,
            step: config.step,
            level_count: config.levels,
            allocated_margin: config.initial_margin,
            reinvested: config.reinvested,
            leverage: config.leverage,
        }
    }
}
