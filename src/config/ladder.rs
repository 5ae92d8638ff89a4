use crate::constants::{DEFAULT_FORCED_CHECK_SECS, DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_TICK_SECS, MAX_LEVERAGE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Instrument the ladder trades, e.g. "WLD-USDT".
    pub instrument: String,
    /// Kill switch. A disabled ladder stops every active position instead of
    /// maintaining the ladder.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Fractional step between levels (0.02 = 2%).
    pub step: f64,
    /// Number of ladder levels.
    pub levels: u32,
    /// Capital allocated to the ladder, quote units.
    pub initial_margin: f64,
    /// Profit added back on top of the initial margin at runtime. Kept
    /// separate so it can return to zero without touching the allocation.
    #[serde(default)]
    pub reinvested: f64,
    pub leverage: u32,
    /// Persisted reference price. Resolved from the live mid and written back
    /// when absent; updated by every trailing roll.
    #[serde(default)]
    pub entry_price: Option<f64>,
    /// Dwell time before an idle top level triggers a trailing roll.
    #[serde(default = "default_refresh_secs")]
    pub executor_refresh_secs: u64,
    /// Maximum time between mandatory reconciliation/trailing passes.
    #[serde(default = "default_forced_secs")]
    pub forced_check_secs: u64,
    /// Control-loop tick interval.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECS
}

fn default_forced_secs() -> u64 {
    DEFAULT_FORCED_CHECK_SECS
}

fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}

impl LadderConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.instrument.is_empty() {
            return Err(anyhow::anyhow!("Instrument must not be empty."));
        }
        if self.step <= 0.0 || self.step >= 1.0 {
            return Err(anyhow::anyhow!(
                "Step {} must be in (0, 1) exclusive.",
                self.step
            ));
        }
        if self.levels == 0 {
            return Err(anyhow::anyhow!("Level count must be positive."));
        }
        if self.initial_margin <= 0.0 {
            return Err(anyhow::anyhow!(
                "Initial margin {} must be positive.",
                self.initial_margin
            ));
        }
        if self.reinvested < 0.0 {
            return Err(anyhow::anyhow!(
                "Reinvested {} must not be negative.",
                self.reinvested
            ));
        }
        if self.leverage == 0 || self.leverage > MAX_LEVERAGE {
            return Err(anyhow::anyhow!(
                "Leverage must be between 1 and {}",
                MAX_LEVERAGE
            ));
        }
        if let Some(entry) = self.entry_price {
            if entry <= 0.0 {
                return Err(anyhow::anyhow!("Entry price {} must be positive.", entry));
            }
        }
        if self.executor_refresh_secs == 0 {
            return Err(anyhow::anyhow!("Executor refresh time must be positive."));
        }
        if self.forced_check_secs == 0 {
            return Err(anyhow::anyhow!("Forced check interval must be positive."));
        }
        if self.tick_secs == 0 {
            return Err(anyhow::anyhow!("Tick interval must be positive."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> LadderConfig {
        LadderConfig {
            instrument: "WLD-USDT".to_string(),
            enabled: true,
            step: 0.02,
            levels: 47,
            initial_margin: 150.0,
            reinvested: 0.0,
            leverage: 20,
            entry_price: None,
            executor_refresh_secs: 60,
            forced_check_secs: 10,
            tick_secs: 2,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_step_out_of_range() {
        let mut config = valid();
        config.step = 0.0;
        assert!(config.validate().is_err());
        config.step = 1.0;
        assert!(config.validate().is_err());
        config.step = -0.02;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_levels_rejected() {
        let mut config = valid();
        config.levels = 0;
        let res = config.validate();
        assert!(res.is_err());
        assert_eq!(res.unwrap_err().to_string(), "Level count must be positive.");
    }

    #[test]
    fn test_leverage_bounds() {
        let mut config = valid();
        config.leverage = 0;
        assert!(config.validate().is_err());
        config.leverage = 51;
        assert!(config.validate().is_err());
        config.leverage = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_margin_rejected() {
        let mut config = valid();
        config.initial_margin = -150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_entry_price_rejected() {
        let mut config = valid();
        config.entry_price = Some(0.0);
        assert!(config.validate().is_err());
        config.entry_price = Some(2.345);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_from_minimal_toml() {
        let config: LadderConfig = toml::from_str(
            r#"
            instrument = "WLD-USDT"
            step = 0.02
            levels = 47
            initial_margin = 150.0
            leverage = 20
            "#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.executor_refresh_secs, 60);
        assert_eq!(config.forced_check_secs, 10);
        assert_eq!(config.reinvested, 0.0);
        assert!(config.entry_price.is_none());
        assert!(config.validate().is_ok());
    }
}
