//! Analytics handlers: spending trends, income summary, category breakdown
//! and monthly cashflow

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use crate::{AppError, AppState, Owner};
use spendcast_core::models::{AnalyticsSummary, IncomeVsExpenses, SpendingByCategory, TrendReport};
use spendcast_core::TrendQuery;

/// Query parameters for the trends endpoint
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// Period unit: day, week or month
    pub period: Option<String>,
    /// Reference date (YYYY-MM-DD), defaults to today
    pub date: Option<String>,
}

/// GET /api/v1/analytics/trends - Per-category trends with next-period forecast
pub async fn get_trends(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Query(params): Query<TrendsQuery>,
) -> Result<Json<TrendReport>, AppError> {
    let period = params
        .period
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Missing period parameter (day, week, or month)"))?;

    let query = TrendQuery::parse(
        owner.0,
        period,
        params.date.as_deref(),
        Local::now().naive_local(),
    )
    .map_err(AppError::from_core)?;

    // Cancel in-flight store work if the client goes away
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let report = state
        .trends
        .compute_trends(&query, &cancel)
        .await
        .map_err(AppError::from_core)?;

    debug!(
        owner = owner.0,
        period = %report.period,
        date = %report.date,
        categories = report.trends.len(),
        "Computed trends"
    );

    Ok(Json(report))
}

/// Query parameters for date-ranged analytics
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    /// Start date, inclusive (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// End date, inclusive (YYYY-MM-DD)
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    fn parse(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
        let from = self
            .start_date
            .as_ref()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| AppError::bad_request("Invalid start_date format (use YYYY-MM-DD)"))?;

        let to = self
            .end_date
            .as_ref()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .transpose()
            .map_err(|_| AppError::bad_request("Invalid end_date format (use YYYY-MM-DD)"))?;

        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::bad_request("start_date must not be after end_date"));
            }
        }

        Ok((from, to))
    }
}

/// GET /api/v1/analytics/summary - Income, expenses and net income
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    let (from, to) = params.parse()?;

    let summary = state
        .db
        .analytics_summary(owner.0, from, to)
        .map_err(AppError::from_core)?;

    Ok(Json(summary))
}

/// GET /api/v1/analytics/spending - Expense totals per category with percentages
pub async fn get_spending(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Json<SpendingByCategory>, AppError> {
    let (from, to) = params.parse()?;

    let spending = state
        .db
        .spending_by_category(owner.0, from, to)
        .map_err(AppError::from_core)?;

    Ok(Json(spending))
}

/// Months covered by the cashflow endpoint when none are given
const DEFAULT_CASHFLOW_MONTHS: u32 = 12;

#[derive(Debug, Deserialize)]
pub struct CashflowQuery {
    /// Trailing months to include, defaults to 12
    pub months: Option<String>,
}

/// GET /api/v1/analytics/income-expenses - Monthly income, expenses and savings rate
pub async fn get_income_vs_expenses(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Query(params): Query<CashflowQuery>,
) -> Result<Json<IncomeVsExpenses>, AppError> {
    let months = match params.months.as_deref() {
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| AppError::bad_request("Invalid months parameter (use a whole number)"))?,
        None => DEFAULT_CASHFLOW_MONTHS,
    };

    let report = state
        .db
        .income_vs_expenses(owner.0, months, Local::now().date_naive())
        .map_err(AppError::from_core)?;

    Ok(Json(report))
}
