//! Read-only classification of executor-owned position records.

use crate::model::PositionRecord;
use log::warn;
use std::collections::HashMap;

/// Snapshot view over the positions of one instrument.
///
/// Filters the raw records down to active, non-done positions for the
/// instrument and groups them by assigned level index. Positions carrying a
/// duplicate level id degrade gracefully: the level counts as occupied and a
/// warning is logged, the margin-mismatch path retires stale ones eventually.
pub struct PositionView<'a> {
    active: Vec<&'a PositionRecord>,
    by_index: HashMap<u32, Vec<&'a PositionRecord>>,
}

impl<'a> PositionView<'a> {
    pub fn new(records: &'a [PositionRecord], instrument: &str) -> Self {
        let mut active = Vec::new();
        let mut by_index: HashMap<u32, Vec<&'a PositionRecord>> = HashMap::new();

        for record in records {
            if record.instrument != instrument || !record.is_active || record.is_done {
                continue;
            }
            active.push(record);
            if let Some(level) = &record.level {
                let slot = by_index.entry(level.index).or_default();
                if !slot.is_empty() {
                    warn!(
                        "[VIEW] Duplicate positions at level {}: {} and {}",
                        level.index, slot[0].id, record.id
                    );
                }
                slot.push(record);
            }
        }

        Self { active, by_index }
    }

    /// All active, non-done positions for the instrument.
    pub fn active(&self) -> &[&'a PositionRecord] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether any active position carries the given level index.
    pub fn occupies(&self, index: u32) -> bool {
        self.by_index.contains_key(&index)
    }

    /// Active positions whose opening order is placed but not yet filled.
    pub fn not_trading(&self) -> Vec<&'a PositionRecord> {
        self.active
            .iter()
            .copied()
            .filter(|p| !p.is_trading)
            .collect()
    }

    /// The active position with the highest entry price.
    pub fn top(&self) -> Option<&'a PositionRecord> {
        self.active
            .iter()
            .copied()
            .max_by(|a, b| a.entry_price.total_cmp(&b.entry_price))
    }

    /// The active position with the lowest entry price.
    pub fn bottom(&self) -> Option<&'a PositionRecord> {
        self.active
            .iter()
            .copied()
            .min_by(|a, b| a.entry_price.total_cmp(&b.entry_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LevelId, PositionId};
    use chrono::Utc;

    fn record(instrument: &str, index: Option<u32>, entry: f64, trading: bool) -> PositionRecord {
        PositionRecord {
            id: PositionId::generate(),
            instrument: instrument.to_string(),
            level: index.map(|i| LevelId::new(instrument, i)),
            entry_price: entry,
            amount: 10.0,
            timestamp: Utc::now(),
            is_active: true,
            is_trading: trading,
            is_done: false,
        }
    }

    #[test]
    fn test_filters_to_active_instrument_records() {
        let mut other = record("ETH-USDT", Some(0), 100.0, false);
        other.instrument = "ETH-USDT".to_string();
        let mut done = record("WLD-USDT", Some(1), 98.0, true);
        done.is_done = true;
        let mut inactive = record("WLD-USDT", Some(2), 96.0, false);
        inactive.is_active = false;
        let live = record("WLD-USDT", Some(0), 100.0, false);

        let records = vec![other, done, inactive, live];
        let view = PositionView::new(&records, "WLD-USDT");
        assert_eq!(view.active_count(), 1);
        assert!(view.occupies(0));
        assert!(!view.occupies(1));
        assert!(!view.occupies(2));
    }

    #[test]
    fn test_top_and_bottom_by_entry_price() {
        let records = vec![
            record("WLD-USDT", Some(1), 98.0, true),
            record("WLD-USDT", Some(0), 100.0, false),
            record("WLD-USDT", Some(2), 96.04, true),
        ];
        let view = PositionView::new(&records, "WLD-USDT");
        assert_eq!(view.top().unwrap().entry_price, 100.0);
        assert_eq!(view.bottom().unwrap().entry_price, 96.04);
    }

    #[test]
    fn test_not_trading_subset() {
        let records = vec![
            record("WLD-USDT", Some(0), 100.0, false),
            record("WLD-USDT", Some(1), 98.0, true),
            record("WLD-USDT", Some(2), 96.04, false),
        ];
        let view = PositionView::new(&records, "WLD-USDT");
        let resting = view.not_trading();
        assert_eq!(resting.len(), 2);
        assert!(resting.iter().all(|p| !p.is_trading));
    }

    #[test]
    fn test_duplicate_level_counts_as_occupied() {
        let records = vec![
            record("WLD-USDT", Some(0), 100.0, false),
            record("WLD-USDT", Some(0), 100.0, false),
        ];
        let view = PositionView::new(&records, "WLD-USDT");
        assert_eq!(view.active_count(), 2);
        assert!(view.occupies(0));
    }

    #[test]
    fn test_unlabeled_position_is_active_but_occupies_nothing() {
        let records = vec![record("WLD-USDT", None, 100.0, false)];
        let view = PositionView::new(&records, "WLD-USDT");
        assert_eq!(view.active_count(), 1);
        assert!(!view.occupies(0));
    }
}
