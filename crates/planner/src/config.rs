use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid planner configuration: {0}")]
    Invalid(String),
}

/// Markup applied on top of average spend, per buffer tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferTiers {
    pub overspending: Decimal,
    pub high_variance: Decimal,
    pub moderate_variance: Decimal,
    pub stable: Decimal,
}

impl Default for BufferTiers {
    fn default() -> Self {
        Self {
            overspending: Decimal::new(20, 2),
            high_variance: Decimal::new(15, 2),
            moderate_variance: Decimal::new(10, 2),
            stable: Decimal::new(5, 2),
        }
    }
}

/// Coefficient-of-variation cut-offs; each is an exclusive lower bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceThresholds {
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

impl Default for VarianceThresholds {
    fn default() -> Self {
        Self {
            high: 0.5,
            moderate: 0.3,
            low: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Trailing calendar months analysed, including the current one.
    pub window_months: u32,
    /// How many of the latest monthly totals make up the trend check.
    pub trend_months: usize,
    /// A month above `spike_factor` times the average counts as a spike.
    pub spike_factor: Decimal,
    pub buffers: BufferTiers,
    pub variance: VarianceThresholds,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            window_months: 6,
            trend_months: 3,
            spike_factor: Decimal::new(15, 1),
            buffers: BufferTiers::default(),
            variance: VarianceThresholds::default(),
        }
    }
}

impl PlannerConfig {
    /// Reads overrides from TOML; anything left out keeps its default.
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_months == 0 {
            return Err(ConfigError::Invalid("window_months must be at least 1".into()));
        }
        if self.trend_months == 0 {
            return Err(ConfigError::Invalid("trend_months must be at least 1".into()));
        }
        let b = &self.buffers;
        if [b.overspending, b.high_variance, b.moderate_variance, b.stable]
            .iter()
            .any(|buffer| buffer.is_sign_negative())
        {
            return Err(ConfigError::Invalid("buffers cannot be negative".into()));
        }
        Ok(())
    }
}
