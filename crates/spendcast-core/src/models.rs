//! Domain models for Spendcast

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::periods::PeriodUnit;

/// A user; owns accounts, categories and transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Current balance as last recorded; negative for money owed
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// Whether money came in or went out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown category kind: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending or income category, unique per (user, name, kind)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
}

/// Category identity as consumed by trend computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// Summed expense amount for one category inside a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category_id: i64,
    pub category_name: String,
    pub amount: f64,
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
    /// Unsigned magnitude; meaning carried by `kind`
    pub amount: f64,
    pub kind: CategoryKind,
    pub occurred_at: NaiveDateTime,
    pub description: String,
    /// Hash for deduplication
    pub import_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A new transaction to be inserted
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub amount: f64,
    pub kind: CategoryKind,
    pub occurred_at: NaiveDateTime,
    pub description: String,
    pub import_hash: Option<String>,
}

/// Direction of spending in the current period relative to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    /// No spending in the previous period to compare against
    New,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
            Self::New => "new",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Up => "📈",
            Self::Down => "📉",
            Self::Stable => "➡️",
            Self::New => "🆕",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-category trend and forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub category_id: i64,
    pub category_name: String,
    pub current_spend: f64,
    pub predicted_spend: f64,
    pub trend_direction: TrendDirection,
    pub change_percent: f64,
}

/// Trend records for one owner, period unit and reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub period: PeriodUnit,
    pub date: NaiveDate,
    pub trends: Vec<TrendRecord>,
}

/// Income vs. expenses for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_income: f64,
    /// Sum of the owner's recorded account balances, independent of the range
    pub account_balance: f64,
    /// "custom" when a date range was given, otherwise "all_time"
    pub period: String,
}

/// Spending for one expense category, with its share of the total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category_id: i64,
    pub category_name: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Spending by category for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingByCategory {
    pub total: f64,
    pub categories: Vec<CategorySpending>,
}

/// Income and expenses for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflow {
    /// `YYYY-MM`
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    pub net_income: f64,
    /// Net income as a percentage of income; 0 for months without income
    pub savings_rate: f64,
}

/// Averages and totals across the months of a cashflow report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub avg_monthly_income: f64,
    pub avg_monthly_expenses: f64,
    pub avg_net_income: f64,
    pub avg_savings_rate: f64,
    pub total_income: f64,
    pub total_expenses: f64,
}

/// Monthly income vs. expenses over a trailing number of months
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeVsExpenses {
    pub months: u32,
    /// First day included
    pub since: NaiveDate,
    /// Months with activity, oldest first
    pub monthly: Vec<MonthlyCashflow>,
    /// `None` when no month had activity
    pub summary: Option<CashflowSummary>,
}

/// Import statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: i64,
    pub skipped: i64,
    /// Rows dropped by the parser (bad date or amount)
    pub invalid: i64,
    pub categories_created: i64,
    /// Uncategorized expenses moved to a keyword category after import
    pub categorized: i64,
}
