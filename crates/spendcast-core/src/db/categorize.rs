//! Keyword categorization of uncategorized expenses

use std::collections::HashMap;

use rusqlite::params;
use tracing::{debug, info};

use super::categories::upsert_category_on;
use super::Database;
use crate::categorize::category_for;
use crate::error::Result;
use crate::import::DEFAULT_CATEGORY;
use crate::models::CategoryKind;

impl Database {
    /// Move a user's expenses out of the default category when a keyword rule
    /// matches their description
    ///
    /// Target categories are created on first use. Runs in one transaction and
    /// returns the number of transactions recategorized.
    pub fn auto_categorize(&self, user_id: i64) -> Result<i64> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let mut stmt = db_tx.prepare(
            r#"
            SELECT t.id, t.description
            FROM transactions t
            JOIN categories c ON c.id = t.category_id
            WHERE t.user_id = ?1 AND t.kind = 'expense' AND c.name = ?2
            ORDER BY t.id
            "#,
        )?;
        let pending: Vec<(i64, String)> = stmt
            .query_map(params![user_id, DEFAULT_CATEGORY], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut category_ids: HashMap<&'static str, i64> = HashMap::new();
        let mut categorized = 0;

        for (transaction_id, description) in &pending {
            let Some(name) = category_for(description) else {
                continue;
            };

            let category_id = match category_ids.get(name) {
                Some(id) => *id,
                None => {
                    let (id, created) =
                        upsert_category_on(&db_tx, user_id, name, CategoryKind::Expense)?;
                    if created {
                        debug!(category = name, "Created category");
                    }
                    category_ids.insert(name, id);
                    id
                }
            };

            db_tx.execute(
                "UPDATE transactions SET category_id = ? WHERE id = ?",
                params![category_id, transaction_id],
            )?;
            categorized += 1;
        }

        db_tx.commit()?;

        info!(
            user_id,
            categorized,
            remaining = pending.len() as i64 - categorized,
            "Auto-categorized expenses"
        );

        Ok(categorized)
    }
}
