//! Central configuration constants for grid-ladder-bot.
//!
//! Tunable parameters and default intervals used throughout the controller.
//! Modify values here to adjust behavior without changing the ladder logic.

use std::time::Duration;

// =============================================================================
// CONTROL LOOP INTERVALS
// =============================================================================

/// Default control-loop tick interval (seconds), overridable per config.
pub const DEFAULT_TICK_SECS: u64 = 2;

/// Default forced re-check interval: the maximum time between mandatory
/// reconciliation/trailing passes regardless of events (seconds).
pub const DEFAULT_FORCED_CHECK_SECS: u64 = 10;

/// Default dwell time before an idle top level triggers a trailing roll
/// (seconds).
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 60;

/// Interval for logging the status snapshot.
pub const STATUS_SUMMARY_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// VALIDATION BOUNDS
// =============================================================================

/// Maximum leverage accepted by config validation.
pub const MAX_LEVERAGE: u32 = 50;
