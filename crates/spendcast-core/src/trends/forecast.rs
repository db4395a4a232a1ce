//! Naive linear spending forecast

use crate::config::ForecastWeights;

/// Predicts next-period spend from current spend, the period-over-period
/// delta and the historical per-transaction average
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine {
    weights: ForecastWeights,
}

impl ForecastEngine {
    pub fn new(weights: ForecastWeights) -> Self {
        Self { weights }
    }

    /// Weighted prediction; a negative result falls back to a fraction of current spend
    pub fn predict(&self, current: f64, previous: f64, historical: f64) -> f64 {
        let w = &self.weights;

        // No delta without a previous period to compare against
        let trend_delta = if previous > 0.0 {
            current - previous
        } else {
            0.0
        };

        let predicted = current * w.current + trend_delta * w.trend + historical * w.historical;
        if predicted < 0.0 {
            current * w.floor_factor
        } else {
            predicted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_weighted_prediction() {
        let engine = ForecastEngine::default();
        // 100*0.4 + 20*0.4 + 90*0.2
        assert_close(engine.predict(100.0, 80.0, 90.0), 66.0);
    }

    #[test]
    fn test_negative_prediction_clamped() {
        let engine = ForecastEngine::default();
        // 10*0.4 - 990*0.4 = -392, floored to 10*0.8
        assert_close(engine.predict(10.0, 1000.0, 0.0), 8.0);
    }

    #[test]
    fn test_no_previous_spend_ignores_delta() {
        let engine = ForecastEngine::default();
        assert_close(engine.predict(50.0, 0.0, 25.0), 50.0 * 0.4 + 25.0 * 0.2);
    }

    #[test]
    fn test_zero_everything() {
        let engine = ForecastEngine::default();
        assert_eq!(engine.predict(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_custom_weights() {
        let engine = ForecastEngine::new(ForecastWeights {
            current: 1.0,
            trend: 0.0,
            historical: 0.0,
            floor_factor: 0.5,
        });
        assert_close(engine.predict(42.0, 10.0, 1000.0), 42.0);

        let engine = ForecastEngine::new(ForecastWeights {
            current: 0.0,
            trend: 1.0,
            historical: 0.0,
            floor_factor: 0.5,
        });
        assert_close(engine.predict(10.0, 30.0, 0.0), 5.0);
    }
}
