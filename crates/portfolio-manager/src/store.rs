use crate::models::Portfolio;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// JSON file holding the portfolio.
pub struct PortfolioStore {
    path: PathBuf,
}

impl PortfolioStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the portfolio. A missing file is an empty portfolio.
    pub fn load(&self) -> Result<Portfolio> {
        if !self.path.exists() {
            tracing::info!("Portfolio file {} not found, starting empty", self.path.display());
            return Ok(Portfolio::default());
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read portfolio file {}", self.path.display()))?;
        let mut portfolio: Portfolio = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid portfolio JSON in {}", self.path.display()))?;
        portfolio.normalize()?;

        tracing::debug!(
            "Loaded {} positions from {}",
            portfolio.stocks.len(),
            self.path.display()
        );
        Ok(portfolio)
    }

    /// Writes a sibling temp file, then renames it over the target.
    pub fn save(&self, portfolio: &Portfolio) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(portfolio).context("Failed to serialize portfolio")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!("Saved portfolio to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_portfolio() {
        let dir = tempfile::tempdir().unwrap();
        let store = PortfolioStore::new(dir.path().join("portfolio.json"));
        let portfolio = store.load().unwrap();
        assert!(portfolio.stocks.is_empty());
        assert_eq!(portfolio.cash.available, 0.0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PortfolioStore::new(dir.path().join("nested").join("portfolio.json"));

        let mut portfolio = Portfolio::default();
        portfolio.add_position("AAPL", 10.0, 150.0, Some("long term".to_string())).unwrap();
        portfolio.set_cash(2500.0).unwrap();
        store.save(&portfolio).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, portfolio);

        // symbols live in the map keys only
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["stocks"]["AAPL"].get("symbol").is_none());
        assert_eq!(value["cash"]["available"], 2500.0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(PortfolioStore::new(path).load().is_err());
    }
}
