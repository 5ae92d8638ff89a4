use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one rung of the price ladder: `(instrument, index)`.
///
/// The wire encoding used by executor layers is `"{instrument}_{index}"`;
/// that is an encoding detail, the structured key is the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelId {
    pub instrument: String,
    pub index: u32,
}

impl LevelId {
    pub fn new(instrument: impl Into<String>, index: u32) -> Self {
        Self {
            instrument: instrument.into(),
            index,
        }
    }

    /// Parses the `"{instrument}_{index}"` wire encoding. Returns `None`
    /// when the trailing segment is not a non-negative integer.
    pub fn parse(s: &str) -> Option<Self> {
        let (instrument, index) = s.rsplit_once('_')?;
        let index = index.parse().ok()?;
        Some(Self::new(instrument, index))
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.instrument, self.index)
    }
}

/// Executor-assigned identifier of a single position executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub uuid::Uuid);

impl PositionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Read-only view of one position owned by the external executor layer.
///
/// `is_trading` means the opening order is filled and the position is live;
/// an active, non-trading record is a resting (placed, unfilled) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: PositionId,
    pub instrument: String,
    pub level: Option<LevelId>,
    pub entry_price: f64,
    /// Base-denominated order size.
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
    pub is_trading: bool,
    pub is_done: bool,
}

/// Request to open a new position executor at a ladder level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDirective {
    pub level: LevelId,
    pub entry_price: f64,
    pub amount: f64,
}

/// Request to stop an existing position executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopDirective {
    pub position_id: PositionId,
}

/// Request to relabel a surviving position during a trailing roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptDirective {
    pub position_id: PositionId,
    pub level: LevelId,
}

/// Order-lifecycle events pushed by the hosting runtime. The core's only
/// reaction is flag-setting on the invalidation scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderLifecycleEvent {
    OrderCancelled { instrument: String },
    OrderFailed { instrument: String },
    SellCompleted { instrument: String },
}

impl OrderLifecycleEvent {
    pub fn instrument(&self) -> &str {
        match self {
            OrderLifecycleEvent::OrderCancelled { instrument }
            | OrderLifecycleEvent::OrderFailed { instrument }
            | OrderLifecycleEvent::SellCompleted { instrument } => instrument,
        }
    }
}
