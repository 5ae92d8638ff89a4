//! Paper-trading host: an in-memory executor book plus a replayable price
//! tape, for previewing what the controller would do without touching an
//! exchange.

use crate::model::{CreateDirective, LevelId, OrderLifecycleEvent, PositionId, PositionRecord};
use crate::runtime::traits::{ExecutorOrchestrator, MarketDataProvider};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{debug, info};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

struct PaperBook {
    positions: Vec<PositionRecord>,
    realized_pnl: f64,
    last_mid: Option<f64>,
    // Each filled position closes at entry * (1 + step), like the take-profit
    // leg the live executor would attach.
    take_profit_step: f64,
    events: UnboundedSender<OrderLifecycleEvent>,
}

/// Shared handle over the paper book. Clones see the same book, so the same
/// handle can serve as both executor and price feed.
#[derive(Clone)]
pub struct PaperExchange {
    book: Arc<Mutex<PaperBook>>,
}

impl PaperExchange {
    pub fn new(take_profit_step: f64, events: UnboundedSender<OrderLifecycleEvent>) -> Self {
        Self {
            book: Arc::new(Mutex::new(PaperBook {
                positions: Vec::new(),
                realized_pnl: 0.0,
                last_mid: None,
                take_profit_step,
                events,
            })),
        }
    }

    /// Advances the book to a new mid price: fills resting buys the mid has
    /// crossed down through, closes filled positions whose take-profit it
    /// has crossed up through.
    pub fn mark(&self, mid: f64) {
        let Ok(mut guard) = self.book.lock() else {
            return;
        };
        let book = &mut *guard;
        book.last_mid = Some(mid);

        for p in book.positions.iter_mut() {
            if p.is_active && !p.is_done && !p.is_trading && mid <= p.entry_price {
                p.is_trading = true;
                debug!("[PAPER] Filled {:?} @ {}", p.level, p.entry_price);
            }
        }

        let step = book.take_profit_step;
        for p in book.positions.iter_mut() {
            if !p.is_active || p.is_done || !p.is_trading {
                continue;
            }
            let target = p.entry_price * (1.0 + step);
            if mid >= target {
                p.is_done = true;
                p.is_active = false;
                p.is_trading = false;
                book.realized_pnl += (target - p.entry_price) * p.amount;
                info!(
                    "[PAPER] Closed {:?}: {} -> {} ({:+.4})",
                    p.level,
                    p.entry_price,
                    target,
                    (target - p.entry_price) * p.amount
                );
                let _ = book.events.send(OrderLifecycleEvent::SellCompleted {
                    instrument: p.instrument.clone(),
                });
            }
        }
    }
}

impl ExecutorOrchestrator for PaperExchange {
    async fn active_positions(&self, instrument: &str) -> Result<Vec<PositionRecord>> {
        let book = self
            .book
            .lock()
            .map_err(|_| anyhow!("Paper book lock poisoned"))?;
        Ok(book
            .positions
            .iter()
            .filter(|p| p.instrument == instrument)
            .cloned()
            .collect())
    }

    async fn create_position(&mut self, directive: &CreateDirective) -> Result<PositionId> {
        let mut book = self
            .book
            .lock()
            .map_err(|_| anyhow!("Paper book lock poisoned"))?;
        let id = PositionId::generate();
        book.positions.push(PositionRecord {
            id: id.clone(),
            instrument: directive.level.instrument.clone(),
            level: Some(directive.level.clone()),
            entry_price: directive.entry_price,
            amount: directive.amount,
            timestamp: Utc::now(),
            is_active: true,
            is_trading: false,
            is_done: false,
        });
        Ok(id)
    }

    async fn stop_position(&mut self, position_id: &PositionId) -> Result<()> {
        let Ok(mut guard) = self.book.lock() else {
            return Err(anyhow!("Paper book lock poisoned"));
        };
        let book = &mut *guard;
        if let Some(p) = book.positions.iter_mut().find(|p| &p.id == position_id) {
            let was_resting = p.is_active && !p.is_trading;
            p.is_active = false;
            p.is_trading = false;
            p.is_done = true;
            if was_resting {
                let _ = book.events.send(OrderLifecycleEvent::OrderCancelled {
                    instrument: p.instrument.clone(),
                });
            }
        }
        Ok(())
    }

    async fn adopt_level(&mut self, position_id: &PositionId, level: LevelId) -> Result<()> {
        let mut book = self
            .book
            .lock()
            .map_err(|_| anyhow!("Paper book lock poisoned"))?;
        if let Some(p) = book.positions.iter_mut().find(|p| &p.id == position_id) {
            p.level = Some(level);
        }
        Ok(())
    }

    async fn realized_pnl(&self, _instrument: &str) -> Result<f64> {
        let book = self
            .book
            .lock()
            .map_err(|_| anyhow!("Paper book lock poisoned"))?;
        Ok(book.realized_pnl)
    }
}

impl MarketDataProvider for PaperExchange {
    async fn mid_price(&self, instrument: &str) -> Result<f64> {
        let book = self
            .book
            .lock()
            .map_err(|_| anyhow!("Paper book lock poisoned"))?;
        book.last_mid
            .ok_or_else(|| anyhow!("No mark yet for {}", instrument))
    }
}

/// A sequence of mid prices to replay. Reading past the end holds the last
/// price, so a finished tape behaves like a quiet market.
pub struct PriceTape {
    prices: Vec<f64>,
}

impl PriceTape {
    pub fn constant(price: f64) -> Self {
        Self {
            prices: vec![price],
        }
    }

    /// Loads the first column of a CSV file; non-numeric rows (headers) are
    /// skipped.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open price tape {}", path.display()))?;

        let mut prices = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(field) = record.get(0) {
                if let Ok(price) = field.trim().parse::<f64>() {
                    if price > 0.0 {
                        prices.push(price);
                    }
                }
            }
        }
        if prices.is_empty() {
            return Err(anyhow!("Price tape {} contains no prices", path.display()));
        }
        Ok(Self { prices })
    }

    pub fn get(&self, index: usize) -> f64 {
        self.prices[index.min(self.prices.len() - 1)]
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ladder::LadderConfig;
    use crate::config::store::InMemoryPriceStore;
    use crate::ladder::controller::LadderController;
    use std::io::Write;
    use tokio::sync::mpsc::unbounded_channel;

    const INSTRUMENT: &str = "WLD-USDT";

    fn config() -> LadderConfig {
        LadderConfig {
            instrument: INSTRUMENT.to_string(),
            enabled: true,
            step: 0.02,
            levels: 3,
            initial_margin: 150.0,
            reinvested: 0.0,
            leverage: 20,
            entry_price: Some(100.0),
            executor_refresh_secs: 60,
            forced_check_secs: 10,
            tick_secs: 2,
        }
    }

    #[tokio::test]
    async fn test_paper_session_roundtrip() {
        let (tx, mut rx) = unbounded_channel();
        let exchange = PaperExchange::new(0.02, tx);
        exchange.mark(100.0);

        let mut ctrl = LadderController::new(
            config(),
            exchange.clone(),
            exchange.clone(),
            InMemoryPriceStore::default(),
            None,
        );

        // First tick places the full ladder: 100, 98, 96.04 resting.
        let report = ctrl.on_tick(Utc::now()).await.unwrap();
        assert_eq!(report.creates, 3);
        let status = ctrl.status().await.unwrap();
        assert_eq!(status.placed, 3);
        assert_eq!(status.filled, 0);

        // Mid drops through every level: all fill.
        exchange.mark(95.0);
        let status = ctrl.status().await.unwrap();
        assert_eq!(status.filled, 3);

        // Mid rallies past every take-profit: all close with profit.
        exchange.mark(103.0);
        let realized = exchange.realized_pnl(INSTRUMENT).await.unwrap();
        // (102 - 100 + 99.96 - 98 + 97.9608 - 96.04) * 10
        assert!((realized - 58.808).abs() < 1e-6);

        let mut sells = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, OrderLifecycleEvent::SellCompleted { .. }) {
                sells += 1;
            }
        }
        assert_eq!(sells, 3);

        // The closed-out ladder is rebuilt on the next requested pass.
        ctrl.scheduler().request_reconcile();
        let report = ctrl.on_tick(Utc::now()).await.unwrap();
        assert_eq!(report.creates, 3);
    }

    #[tokio::test]
    async fn test_stop_of_resting_position_emits_cancel() {
        let (tx, mut rx) = unbounded_channel();
        let mut exchange = PaperExchange::new(0.02, tx);
        let id = exchange
            .create_position(&CreateDirective {
                level: LevelId::new(INSTRUMENT, 0),
                entry_price: 100.0,
                amount: 10.0,
            })
            .await
            .unwrap();

        exchange.stop_position(&id).await.unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            OrderLifecycleEvent::OrderCancelled { .. }
        ));
        assert!(exchange
            .active_positions(INSTRUMENT)
            .await
            .unwrap()
            .iter()
            .all(|p| p.is_done));
    }

    #[test]
    fn test_price_tape_from_csv_skips_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "price").unwrap();
        writeln!(file, "100.0").unwrap();
        writeln!(file, "99.5").unwrap();
        writeln!(file, "101.25").unwrap();

        let tape = PriceTape::from_csv(file.path()).unwrap();
        assert_eq!(tape.len(), 3);
        assert_eq!(tape.get(0), 100.0);
        assert_eq!(tape.get(2), 101.25);
        // Past the end holds the last price.
        assert_eq!(tape.get(99), 101.25);
    }

    #[test]
    fn test_price_tape_rejects_empty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(PriceTape::from_csv(file.path()).is_err());
    }
}
