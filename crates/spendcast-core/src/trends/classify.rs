//! Trend direction labels

use serde::{Deserialize, Serialize};

use crate::config::TrendThresholds;
use crate::models::TrendDirection;

/// Direction and percent change of current spend relative to previous spend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub direction: TrendDirection,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendClassifier {
    thresholds: TrendThresholds,
}

impl TrendClassifier {
    pub fn new(thresholds: TrendThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, current: f64, previous: f64) -> Classification {
        if previous <= 0.0 {
            return Classification {
                direction: TrendDirection::New,
                change_percent: 0.0,
            };
        }

        let change_percent = (current - previous) / previous * 100.0;
        let direction = if change_percent > self.thresholds.up {
            TrendDirection::Up
        } else if change_percent < self.thresholds.down {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        Classification {
            direction,
            change_percent,
        }
    }
}
