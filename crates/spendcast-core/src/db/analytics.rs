//! Income/expense summary, spending breakdown and monthly cashflow

use chrono::{Days, Months, NaiveDate, NaiveTime};
use rusqlite::params;

use super::{format_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsSummary, CashflowSummary, CategorySpending, IncomeVsExpenses, MonthlyCashflow,
    SpendingByCategory,
};

/// Longest trailing window accepted by `income_vs_expenses`
pub const MAX_CASHFLOW_MONTHS: u32 = 120;

/// Convert an inclusive date range into `occurred_at` text bounds `[from, to + 1 day)`
fn date_bounds(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(Option<String>, Option<String>)> {
    let start = from.map(|d| format_datetime(&d.and_time(NaiveTime::MIN)));
    let end = match to {
        Some(d) => {
            let next = d
                .checked_add_days(Days::new(1))
                .ok_or_else(|| Error::InvalidArgument(format!("Date {} is out of range", d)))?;
            Some(format_datetime(&next.and_time(NaiveTime::MIN)))
        }
        None => None,
    };
    Ok((start, end))
}

impl Database {
    /// Total income, total expenses and net for a user, optionally within an inclusive date range
    pub fn analytics_summary(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AnalyticsSummary> {
        let (start, end) = date_bounds(from, to)?;
        let conn = self.conn()?;

        let (total_income, total_expenses): (f64, f64) = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0.0)
            FROM transactions
            WHERE user_id = ?1
              AND (?2 IS NULL OR occurred_at >= ?2)
              AND (?3 IS NULL OR occurred_at < ?3)
            "#,
            params![user_id, start, end],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let account_balance: f64 = conn.query_row(
            "SELECT COALESCE(SUM(balance), 0.0) FROM accounts WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        let period = if from.is_none() && to.is_none() {
            "all_time"
        } else {
            "custom"
        };

        Ok(AnalyticsSummary {
            total_income,
            total_expenses,
            net_income: total_income - total_expenses,
            account_balance,
            period: period.to_string(),
        })
    }

    /// Spending per expense category with each category's share of the total
    ///
    /// All expense categories are listed, including those with no spending.
    pub fn spending_by_category(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SpendingByCategory> {
        let (start, end) = date_bounds(from, to)?;
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name, COALESCE(SUM(t.amount), 0.0) AS total
            FROM categories c
            LEFT JOIN transactions t
                ON t.category_id = c.id
               AND t.kind = 'expense'
               AND (?2 IS NULL OR t.occurred_at >= ?2)
               AND (?3 IS NULL OR t.occurred_at < ?3)
            WHERE c.user_id = ?1 AND c.kind = 'expense'
            GROUP BY c.id, c.name
            ORDER BY total DESC, c.id
            "#,
        )?;

        let rows: Vec<(i64, String, f64)> = stmt
            .query_map(params![user_id, start, end], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total: f64 = rows.iter().map(|(_, _, amount)| amount).sum();

        let categories = rows
            .into_iter()
            .map(|(category_id, category_name, amount)| CategorySpending {
                category_id,
                category_name,
                amount,
                percentage: if total > 0.0 {
                    amount / total * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Ok(SpendingByCategory { total, categories })
    }

    /// Monthly income, expenses, net income and savings rate over the
    /// trailing `months` months ending at `today`
    pub fn income_vs_expenses(
        &self,
        user_id: i64,
        months: u32,
        today: NaiveDate,
    ) -> Result<IncomeVsExpenses> {
        if months == 0 || months > MAX_CASHFLOW_MONTHS {
            return Err(Error::InvalidArgument(format!(
                "Months must be between 1 and {}, got {}",
                MAX_CASHFLOW_MONTHS, months
            )));
        }
        let since = today
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| Error::InvalidArgument(format!("Date {} is out of range", today)))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                substr(occurred_at, 1, 7) AS month,
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE 0 END), 0.0),
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount ELSE 0 END), 0.0)
            FROM transactions
            WHERE user_id = ?1 AND occurred_at >= ?2
            GROUP BY month
            ORDER BY month
            "#,
        )?;

        let monthly: Vec<MonthlyCashflow> = stmt
            .query_map(
                params![user_id, format_datetime(&since.and_time(NaiveTime::MIN))],
                |row| {
                    let income: f64 = row.get(1)?;
                    let expenses: f64 = row.get(2)?;
                    let net_income = income - expenses;
                    Ok(MonthlyCashflow {
                        month: row.get(0)?,
                        income,
                        expenses,
                        net_income,
                        savings_rate: if income > 0.0 {
                            net_income / income * 100.0
                        } else {
                            0.0
                        },
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let summary = summarize_cashflow(&monthly);

        Ok(IncomeVsExpenses {
            months,
            since,
            monthly,
            summary,
        })
    }
}

fn summarize_cashflow(monthly: &[MonthlyCashflow]) -> Option<CashflowSummary> {
    if monthly.is_empty() {
        return None;
    }

    let count = monthly.len() as f64;
    let total_income: f64 = monthly.iter().map(|m| m.income).sum();
    let total_expenses: f64 = monthly.iter().map(|m| m.expenses).sum();
    let total_net: f64 = monthly.iter().map(|m| m.net_income).sum();
    let total_rate: f64 = monthly.iter().map(|m| m.savings_rate).sum();

    Some(CashflowSummary {
        avg_monthly_income: total_income / count,
        avg_monthly_expenses: total_expenses / count,
        avg_net_income: total_net / count,
        avg_savings_rate: total_rate / count,
        total_income,
        total_expenses,
    })
}
