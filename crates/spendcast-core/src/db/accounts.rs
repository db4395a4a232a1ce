//! Account operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Account;

impl Database {
    /// Create or get an account for a user
    pub fn upsert_account(&self, user_id: i64, name: &str) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE user_id = ? AND name = ?",
                params![user_id, name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO accounts (user_id, name) VALUES (?, ?)",
            params![user_id, name],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Record the current balance of a user's account
    ///
    /// Negative balances are allowed (credit cards, overdrafts).
    pub fn set_account_balance(&self, user_id: i64, name: &str, balance: f64) -> Result<()> {
        if !balance.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "Account balance must be a finite number, got {}",
                balance
            )));
        }

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE accounts SET balance = ? WHERE user_id = ? AND name = ?",
            params![balance, user_id, name],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Account '{}'", name)));
        }

        info!(user_id, account = %name, balance, "Updated account balance");
        Ok(())
    }

    /// List a user's accounts
    pub fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, balance, created_at FROM accounts WHERE user_id = ? ORDER BY name",
        )?;

        let accounts = stmt
            .query_map(params![user_id], |row| {
                let created_at_str: String = row.get(4)?;
                Ok(Account {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    balance: row.get(3)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }
}
