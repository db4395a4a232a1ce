//! Category operations

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryKind};

impl Database {
    /// Create or get a category; categories are unique per (user, name, kind)
    ///
    /// Returns the category ID and whether it was newly created.
    pub fn upsert_category(
        &self,
        user_id: i64,
        name: &str,
        kind: CategoryKind,
    ) -> Result<(i64, bool)> {
        let conn = self.conn()?;
        upsert_category_on(&conn, user_id, name, kind)
    }

    /// List a user's categories, optionally restricted to one kind
    pub fn list_categories(
        &self,
        user_id: i64,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, name, kind, created_at
            FROM categories
            WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
            ORDER BY kind, name
            "#,
        )?;

        let categories = stmt
            .query_map(
                params![user_id, kind.map(|k| k.as_str())],
                row_to_category,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }
}

/// Create or get a category on an existing connection or transaction
pub(super) fn upsert_category_on(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: CategoryKind,
) -> Result<(i64, bool)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidData(
            "Category name cannot be empty".to_string(),
        ));
    }

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE user_id = ? AND name = ? AND kind = ?",
            params![user_id, name, kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok((id, false));
    }

    conn.execute(
        "INSERT INTO categories (user_id, name, kind) VALUES (?, ?, ?)",
        params![user_id, name, kind.as_str()],
    )?;

    Ok((conn.last_insert_rowid(), true))
}

fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    let kind_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: kind_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        created_at: parse_datetime(&created_at_str),
    })
}
