use self::ladder::LadderConfig;
use crate::error::BotError;
use std::fs;

pub mod ladder;
pub mod store;

pub fn load_config(path: &str) -> Result<LadderConfig, BotError> {
    let content = fs::read_to_string(path)?;
    let config: LadderConfig = toml::from_str(&content)?;
    config
        .validate()
        .map_err(|e| BotError::ValidationError(e.to_string()))?;
    Ok(config)
}
