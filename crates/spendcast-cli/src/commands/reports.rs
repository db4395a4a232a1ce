//! Report command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use spendcast_core::db::Database;
use spendcast_core::models::{AnalyticsSummary, IncomeVsExpenses, SpendingByCategory, TrendReport};
use spendcast_core::{TrendConfig, TrendQuery, TrendReportBuilder};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::truncate;

/// Parse optional --from/--to dates (inclusive range)
pub fn parse_date_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let from_date = from
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --from date format (use YYYY-MM-DD)")?;
    let to_date = to
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --to date format (use YYYY-MM-DD)")?;

    if let (Some(from), Some(to)) = (from_date, to_date) {
        if from > to {
            anyhow::bail!("--from ({}) must not be after --to ({})", from, to);
        }
    }

    Ok((from_date, to_date))
}

pub async fn cmd_trends(
    db: &Database,
    config: TrendConfig,
    user_id: i64,
    period: &str,
    date: Option<&str>,
    json: bool,
) -> Result<TrendReport> {
    let query = TrendQuery::parse(user_id, period, date, Local::now().naive_local())?;
    let builder = TrendReportBuilder::new(Arc::new(db.clone()), config);

    // Ctrl-C cancels the computation instead of killing it mid-query
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling trend computation");
                cancel.cancel();
            }
        })
    };

    let result = builder.compute_trends(&query, &cancel).await;
    interrupt.abort();
    let report = result.context("Failed to compute trends")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!(
        "📊 Spending trends by {} ({})",
        report.period,
        report.date.format("%Y-%m-%d")
    );
    println!();

    if report.trends.is_empty() {
        println!("   No expense categories found.");
        return Ok(report);
    }

    println!(
        "   {:<24} {:>12} {:>12} {:>10}",
        "Category", "Current", "Forecast", "Change"
    );
    println!("   ─────────────────────────────────────────────────────────────────");

    for trend in &report.trends {
        println!(
            "   {:<24} {:>12.2} {:>12.2} {:>9.1}% {} {}",
            truncate(&trend.category_name, 24),
            trend.current_spend,
            trend.predicted_spend,
            trend.change_percent,
            trend.trend_direction.icon(),
            trend.trend_direction
        );
    }

    let current: f64 = report.trends.iter().map(|t| t.current_spend).sum();
    let forecast: f64 = report.trends.iter().map(|t| t.predicted_spend).sum();
    println!("   ─────────────────────────────────────────────────────────────────");
    println!("   {:<24} {:>12.2} {:>12.2}", "Total", current, forecast);

    Ok(report)
}

pub fn cmd_summary(
    db: &Database,
    user_id: i64,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let (from_date, to_date) = parse_date_range(from, to)?;
    let summary: AnalyticsSummary = db.analytics_summary(user_id, from_date, to_date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("💰 Income Summary ({})", describe_range(from_date, to_date));
    println!("   ─────────────────────────────");
    println!("   Income:    ${:>12.2}", summary.total_income);
    println!("   Expenses:  ${:>12.2}", summary.total_expenses);
    println!("   Net:       ${:>12.2}", summary.net_income);
    println!("   Balance:   ${:>12.2}", summary.account_balance);

    Ok(())
}

pub fn cmd_spending(
    db: &Database,
    user_id: i64,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let (from_date, to_date) = parse_date_range(from, to)?;
    let spending: SpendingByCategory = db.spending_by_category(user_id, from_date, to_date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&spending)?);
        return Ok(());
    }

    println!("💸 Spending by Category ({})", describe_range(from_date, to_date));
    println!("   Total: ${:.2}", spending.total);
    println!();

    for category in &spending.categories {
        println!(
            "   {:<24} ${:>10.2} ({:>5.1}%)",
            truncate(&category.category_name, 24),
            category.amount,
            category.percentage
        );
    }

    Ok(())
}

pub fn cmd_cashflow(
    db: &Database,
    user_id: i64,
    months: u32,
    json: bool,
) -> Result<IncomeVsExpenses> {
    db.require_user(user_id)?;
    let report = db.income_vs_expenses(user_id, months, Local::now().date_naive())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!("📅 Income vs Expenses (last {} months, since {})", months, report.since);

    let Some(summary) = &report.summary else {
        println!("   No transactions in this period.");
        return Ok(report);
    };

    println!(
        "   {:<8} {:>12} {:>12} {:>12} {:>8}",
        "Month", "Income", "Expenses", "Net", "Saved"
    );
    for month in &report.monthly {
        println!(
            "   {:<8} {:>12.2} {:>12.2} {:>12.2} {:>7.1}%",
            month.month, month.income, month.expenses, month.net_income, month.savings_rate
        );
    }
    println!("   ─────────────────────────────────────────────────────");
    println!(
        "   {:<8} {:>12.2} {:>12.2} {:>12.2} {:>7.1}%",
        "Average",
        summary.avg_monthly_income,
        summary.avg_monthly_expenses,
        summary.avg_net_income,
        summary.avg_savings_rate
    );
    println!(
        "   {:<8} {:>12.2} {:>12.2}",
        "Total", summary.total_income, summary.total_expenses
    );

    Ok(report)
}

fn describe_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    match (from, to) {
        (None, None) => "all time".to_string(),
        (Some(from), None) => format!("since {}", from),
        (None, Some(to)) => format!("through {}", to),
        (Some(from), Some(to)) => format!("{} to {}", from, to),
    }
}
