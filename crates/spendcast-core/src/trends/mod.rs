//! Spending trend analysis and forecasting
//!
//! - `forecast` - Weighted next-period spend prediction
//! - `classify` - Up/down/stable/new labelling from percent change
//! - `store` - Queries the computation needs, and the SQLite implementation
//! - `report` - Orchestration into a sorted trend report

mod classify;
mod forecast;
mod report;
mod store;

pub use classify::{Classification, TrendClassifier};
pub use forecast::ForecastEngine;
pub use report::{TrendQuery, TrendReportBuilder};
pub use store::TrendStore;
