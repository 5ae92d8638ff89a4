//! Margin-based order sizing.
//!
//! Sizing is recomputed on every reconciliation pass, never cached across
//! ticks: allocated margin, reinvested capital and the reference price may
//! all change between ticks.

use anyhow::{anyhow, Result};

/// Base-denominated order size for one ladder level.
///
/// `(allocated_margin + reinvested) * leverage / level_count / reference_price`
///
/// Fails fast on degenerate inputs instead of silently producing a zero or
/// negative size.
pub fn per_level_amount(
    allocated_margin: f64,
    reinvested: f64,
    leverage: u32,
    level_count: u32,
    reference_price: f64,
) -> Result<f64> {
    if reference_price <= 0.0 {
        return Err(anyhow!(
            "Reference price must be positive, got {}",
            reference_price
        ));
    }
    if level_count == 0 {
        return Err(anyhow!("Level count must be positive"));
    }
    if leverage == 0 {
        return Err(anyhow!("Leverage must be positive"));
    }
    let capital = allocated_margin + reinvested;
    if capital <= 0.0 {
        return Err(anyhow!(
            "Allocated margin + reinvested must be positive, got {}",
            capital
        ));
    }
    Ok(capital * leverage as f64 / level_count as f64 / reference_price)
}

/// Inverts the sizing formula: the margin a resting position of `amount` was
/// sized against, given the current reference price. Rounded to whole quote
/// units so that float noise does not masquerade as a capital change.
pub fn implied_margin(amount: f64, reference_price: f64, level_count: u32, leverage: u32) -> f64 {
    (amount * reference_price * level_count as f64 / leverage as f64).round()
}
