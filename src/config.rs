use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for title matching and candidate gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum token-set similarity (0-100) a best-matching title must
    /// reach before a release is considered mapped at all.
    pub fuzzy_threshold: u32,

    /// How many years a candidate's catalogue year may differ from the
    /// release year before the candidate is discarded. Widened per release
    /// by the release's own year span.
    pub year_window: i32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 85,
            year_window: 2,
        }
    }
}

impl MatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.fuzzy_threshold <= 100,
            "fuzzy_threshold must be 0-100, got {}",
            self.fuzzy_threshold
        );
        anyhow::ensure!(
            self.year_window >= 0,
            "year_window must be non-negative, got {}",
            self.year_window
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.fuzzy_threshold, 85);
        assert_eq!(config.year_window, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: MatchConfig = toml::from_str("fuzzy_threshold = 90").unwrap();
        assert_eq!(config.fuzzy_threshold, 90);
        assert_eq!(config.year_window, 2);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = MatchConfig {
            fuzzy_threshold: 101,
            year_window: 2,
        };
        assert!(config.validate().is_err());
    }
}
