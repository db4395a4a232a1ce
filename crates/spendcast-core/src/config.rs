//! Trend configuration
//!
//! Forecast weights, direction thresholds, lookback lengths and query limits
//! are plain data passed into the forecast engine and classifier, so tests can
//! inject alternate values.
//!
//! ## Configuration Resolution
//!
//! 1. Explicit path (`--config`), if given
//! 2. Override in data dir (~/.local/share/spendcast/config/trends.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::periods::PeriodUnit;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/trends.toml");

/// Weights for the linear spending forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastWeights {
    /// Weight applied to the current period's spend
    pub current: f64,
    /// Weight applied to the period-over-period delta
    pub trend: f64,
    /// Weight applied to the historical per-transaction average
    pub historical: f64,
    /// Fraction of current spend used when the weighted prediction is negative
    pub floor_factor: f64,
}

impl Default for ForecastWeights {
    fn default() -> Self {
        Self {
            current: 0.4,
            trend: 0.4,
            historical: 0.2,
            floor_factor: 0.8,
        }
    }
}

/// Percent-change thresholds for trend direction labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendThresholds {
    /// Change strictly above this is "up"
    pub up: f64,
    /// Change strictly below this is "down"
    pub down: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            up: 10.0,
            down: -10.0,
        }
    }
}

/// Historical lookback length in calendar days, per period unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookbackDays {
    pub day: u32,
    pub week: u32,
    pub month: u32,
}

impl LookbackDays {
    pub fn for_unit(&self, unit: PeriodUnit) -> u32 {
        match unit {
            PeriodUnit::Day => self.day,
            PeriodUnit::Week => self.week,
            PeriodUnit::Month => self.month,
        }
    }
}

impl Default for LookbackDays {
    fn default() -> Self {
        Self {
            day: 30,
            week: 84,
            month: 365,
        }
    }
}

/// Limits for the queries issued by one trend computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Maximum historical-average queries in flight at once
    pub max_concurrency: usize,
    /// Deadline for a whole computation
    pub timeout_secs: u64,
}

impl QueryLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout_secs: 30,
        }
    }
}

/// Full trend configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub weights: ForecastWeights,
    pub thresholds: TrendThresholds,
    pub lookback: LookbackDays,
    pub query: QueryLimits,
}

impl TrendConfig {
    /// Load configuration (explicit path, then data-dir override, then defaults)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Using trend config override");
                    fs::read_to_string(&path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", path.display(), e))
                    })?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TrendConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        for (name, value) in [
            ("weights.current", w.current),
            ("weights.trend", w.trend),
            ("weights.historical", w.historical),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&w.floor_factor) {
            return Err(Error::Config(format!(
                "weights.floor_factor must be between 0 and 1, got {}",
                w.floor_factor
            )));
        }

        let t = &self.thresholds;
        if !t.up.is_finite() || !t.down.is_finite() || t.up < t.down {
            return Err(Error::Config(format!(
                "thresholds.up ({}) must be >= thresholds.down ({})",
                t.up, t.down
            )));
        }

        if PeriodUnit::all()
            .iter()
            .any(|unit| self.lookback.for_unit(*unit) == 0)
        {
            return Err(Error::Config("lookback days must be > 0".to_string()));
        }

        if self.query.max_concurrency == 0 {
            return Err(Error::Config(
                "query.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.query.timeout_secs == 0 {
            return Err(Error::Config(
                "query.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Location of the user's config override
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("spendcast").join("config").join("trends.toml"))
}
