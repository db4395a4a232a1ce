//! Transaction operations

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::categories::upsert_category_on;
use super::{format_datetime, parse_datetime, parse_occurred_at, Database};
use crate::error::{Error, Result};
use crate::import::ImportRow;
use crate::models::{CategoryKind, ImportStats, NewTransaction, Transaction};

impl Database {
    /// Insert a transaction (skips the owner's duplicates based on import_hash)
    ///
    /// The category must belong to the same user and have the same kind as
    /// the transaction. Returns `None` when the import hash already exists.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;
        insert_transaction_on(&conn, tx)
    }

    /// List a user's transactions, newest first, optionally bounded to `[from, to)`
    pub fn list_transactions(
        &self,
        user_id: i64,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        limit: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, account_id, category_id, amount, kind, occurred_at,
                   description, import_hash, created_at
            FROM transactions
            WHERE user_id = ?1
              AND (?2 IS NULL OR occurred_at >= ?2)
              AND (?3 IS NULL OR occurred_at < ?3)
            ORDER BY occurred_at DESC, id DESC
            LIMIT ?4
            "#,
        )?;

        let transactions = stmt
            .query_map(
                params![
                    user_id,
                    from.as_ref().map(format_datetime),
                    to.as_ref().map(format_datetime),
                    limit
                ],
                |row| {
                    let kind_str: String = row.get(5)?;
                    let occurred_at_str: String = row.get(6)?;
                    let created_at_str: String = row.get(9)?;

                    Ok(Transaction {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        account_id: row.get(2)?,
                        category_id: row.get(3)?,
                        amount: row.get(4)?,
                        kind: kind_str.parse().map_err(|e: String| {
                            rusqlite::Error::FromSqlConversionFailure(
                                5,
                                rusqlite::types::Type::Text,
                                e.into(),
                            )
                        })?,
                        occurred_at: parse_occurred_at(6, &occurred_at_str)?,
                        description: row.get(7)?,
                        import_hash: row.get(8)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Import parsed CSV rows into an account
    ///
    /// Categories are resolved by (name, kind) and created on first use.
    /// Rows whose import hash already exists are skipped. The batch runs in
    /// one transaction: any failing row rolls back every row and category.
    pub fn import_transactions(
        &self,
        user_id: i64,
        account_id: i64,
        rows: &[ImportRow],
    ) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let mut category_ids: HashMap<(String, CategoryKind), i64> = HashMap::new();

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        for row in rows {
            let key = (row.category.clone(), row.kind);
            let category_id = match category_ids.get(&key) {
                Some(id) => *id,
                None => {
                    let (id, created) =
                        upsert_category_on(&db_tx, user_id, &row.category, row.kind)?;
                    if created {
                        debug!(category = %row.category, kind = %row.kind, "Created category");
                        stats.categories_created += 1;
                    }
                    category_ids.insert(key, id);
                    id
                }
            };

            let tx = NewTransaction {
                user_id,
                account_id,
                category_id,
                amount: row.amount,
                kind: row.kind,
                occurred_at: row.occurred_at,
                description: row.description.clone(),
                import_hash: Some(row.import_hash.clone()),
            };

            match insert_transaction_on(&db_tx, &tx)? {
                Some(_) => stats.imported += 1,
                None => stats.skipped += 1,
            }
        }

        db_tx.commit()?;

        info!(
            user_id,
            account_id,
            imported = stats.imported,
            skipped = stats.skipped,
            "Imported transactions"
        );

        Ok(stats)
    }
}

/// Validate and insert a transaction on an existing connection or transaction
fn insert_transaction_on(conn: &Connection, tx: &NewTransaction) -> Result<Option<i64>> {
    if !tx.amount.is_finite() || tx.amount < 0.0 {
        return Err(Error::InvalidData(format!(
            "Transaction amount must be a non-negative magnitude, got {}",
            tx.amount
        )));
    }

    let category: Option<(i64, String)> = conn
        .query_row(
            "SELECT user_id, kind FROM categories WHERE id = ?",
            params![tx.category_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (category_user, category_kind) =
        category.ok_or_else(|| Error::NotFound(format!("Category {}", tx.category_id)))?;

    if category_user != tx.user_id {
        return Err(Error::InvalidData(format!(
            "Category {} does not belong to user {}",
            tx.category_id, tx.user_id
        )));
    }
    if category_kind != tx.kind.as_str() {
        return Err(Error::InvalidData(format!(
            "Category {} is {}, transaction is {}",
            tx.category_id, category_kind, tx.kind
        )));
    }

    if let Some(hash) = &tx.import_hash {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE user_id = ? AND import_hash = ?",
                params![tx.user_id, hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None);
        }
    }

    conn.execute(
        r#"
        INSERT INTO transactions
            (user_id, account_id, category_id, amount, kind, occurred_at, description, import_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            tx.user_id,
            tx.account_id,
            tx.category_id,
            tx.amount,
            tx.kind.as_str(),
            format_datetime(&tx.occurred_at),
            tx.description,
            tx.import_hash,
        ],
    )?;

    Ok(Some(conn.last_insert_rowid()))
}
