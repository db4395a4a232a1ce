//! Spendcast Core Library
//!
//! Shared functionality for the Spendcast spending-trend service:
//! - Database access and migrations
//! - Calendar period windows (day, week, month)
//! - Spending trend analysis and next-period forecasting
//! - Income/expense analytics
//! - CSV transaction import and keyword categorization
//! - Trend configuration (weights, thresholds, lookbacks)

pub mod categorize;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod periods;
pub mod trends;

pub use config::{ForecastWeights, LookbackDays, QueryLimits, TrendConfig, TrendThresholds};
pub use db::Database;
pub use error::{Error, Result};
pub use periods::{PeriodUnit, PeriodWindows, Window};
pub use trends::{
    Classification, ForecastEngine, TrendClassifier, TrendQuery, TrendReportBuilder, TrendStore,
};
