//! Durable reference-price persistence.
//!
//! The reference price lives in the same toml file the ladder config is
//! loaded from, under the `entry_price` key. The write rewrites only that key
//! and preserves everything else, so a restarted controller resumes the
//! ladder where the last trailing roll left it.

use crate::runtime::traits::ReferencePriceStore;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

pub struct TomlPriceStore {
    path: PathBuf,
}

impl TomlPriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReferencePriceStore for TomlPriceStore {
    fn load(&self) -> Result<Option<f64>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let table: toml::Table = content.parse().context("Failed to parse config file")?;
        Ok(table.get("entry_price").and_then(|v| v.as_float()))
    }

    async fn persist(&mut self, entry_price: f64) -> Result<()> {
        if entry_price <= 0.0 {
            return Ok(());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut table: toml::Table = content.parse().context("Failed to parse config file")?;
        table.insert(
            "entry_price".to_string(),
            toml::Value::Float(entry_price),
        );
        fs::write(&self.path, toml::to_string_pretty(&table)?)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        info!("[STORE] Persisted entry_price = {}", entry_price);
        Ok(())
    }
}

/// Volatile store for paper sessions and tests: nothing survives a restart.
#[derive(Default)]
pub struct InMemoryPriceStore {
    value: Option<f64>,
}

impl ReferencePriceStore for InMemoryPriceStore {
    fn load(&self) -> Result<Option<f64>> {
        Ok(self.value)
    }

    async fn persist(&mut self, entry_price: f64) -> Result<()> {
        if entry_price > 0.0 {
            self.value = Some(entry_price);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
instrument = "WLD-USDT"
step = 0.02
levels = 3
initial_margin = 150.0
leverage = 20
"#;

    #[tokio::test]
    async fn test_persist_and_load_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let mut store = TomlPriceStore::new(file.path());
        assert_eq!(store.load().unwrap(), None);

        store.persist(102.0).await.unwrap();
        assert_eq!(store.load().unwrap(), Some(102.0));

        // The rest of the config survives the rewrite.
        let config = crate::config::load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.instrument, "WLD-USDT");
        assert_eq!(config.levels, 3);
        assert_eq!(config.entry_price, Some(102.0));
    }

    #[tokio::test]
    async fn test_persist_overwrites_previous_price() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let mut store = TomlPriceStore::new(file.path());
        store.persist(100.0).await.unwrap();
        store.persist(104.04).await.unwrap();
        assert_eq!(store.load().unwrap(), Some(104.04));
    }

    #[tokio::test]
    async fn test_non_positive_price_is_not_written() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let mut store = TomlPriceStore::new(file.path());
        store.persist(0.0).await.unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
