//! Queries backing trend analysis
//!
//! Window bounds are bound as `YYYY-MM-DD HH:MM:SS` text parameters and
//! compared lexically against `occurred_at`.

use rusqlite::params;

use super::{format_datetime, Database};
use crate::error::Result;
use crate::models::{CategoryAmount, CategoryRef};
use crate::periods::Window;

impl Database {
    /// Sum expense transactions per expense category inside `[start, end)`
    ///
    /// Every expense category of the user appears, with 0 when it had no
    /// activity in the window. Ordered by amount descending, then category id.
    pub fn aggregate_expenses(&self, user_id: i64, window: &Window) -> Result<Vec<CategoryAmount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.name, COALESCE(SUM(t.amount), 0.0) AS total
            FROM categories c
            LEFT JOIN transactions t
                ON t.category_id = c.id
               AND t.user_id = c.user_id
               AND t.kind = 'expense'
               AND t.occurred_at >= ?2
               AND t.occurred_at < ?3
            WHERE c.user_id = ?1 AND c.kind = 'expense'
            GROUP BY c.id, c.name
            ORDER BY total DESC, c.id
            "#,
        )?;

        let amounts = stmt
            .query_map(
                params![
                    user_id,
                    format_datetime(&window.start),
                    format_datetime(&window.end)
                ],
                |row| {
                    Ok(CategoryAmount {
                        category_id: row.get(0)?,
                        category_name: row.get(1)?,
                        amount: row.get(2)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(amounts)
    }

    /// Mean of individual expense transaction amounts for one category in `[start, end)`
    ///
    /// Returns 0 when no transaction matches.
    pub fn average_expense(&self, user_id: i64, category_id: i64, window: &Window) -> Result<f64> {
        let conn = self.conn()?;
        let average: f64 = conn.query_row(
            r#"
            SELECT COALESCE(AVG(amount), 0.0)
            FROM transactions
            WHERE user_id = ?1
              AND category_id = ?2
              AND kind = 'expense'
              AND occurred_at >= ?3
              AND occurred_at < ?4
            "#,
            params![
                user_id,
                category_id,
                format_datetime(&window.start),
                format_datetime(&window.end)
            ],
            |row| row.get(0),
        )?;

        Ok(average)
    }

    /// List a user's expense categories by id
    pub fn list_expense_categories(&self, user_id: i64) -> Result<Vec<CategoryRef>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name FROM categories WHERE user_id = ? AND kind = 'expense' ORDER BY id",
        )?;

        let categories = stmt
            .query_map(params![user_id], |row| {
                Ok(CategoryRef {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }
}
