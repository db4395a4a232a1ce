//! User operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

impl Database {
    /// Create a user, failing if the name is taken
    pub fn create_user(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("User name cannot be empty".to_string()));
        }

        let conn = self.conn()?;
        conn.execute("INSERT INTO users (name) VALUES (?)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Create or get a user by name
    pub fn upsert_user(&self, name: &str) -> Result<i64> {
        let existing: Option<i64> = {
            let conn = self.conn()?;
            conn.query_row(
                "SELECT id FROM users WHERE name = ?",
                params![name.trim()],
                |row| row.get(0),
            )
            .optional()?
        };

        match existing {
            Some(id) => Ok(id),
            None => self.create_user(name),
        }
    }

    /// Get a user by ID
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;

        Ok(user)
    }

    /// Get a user by ID, or `NotFound`
    pub fn require_user(&self, id: i64) -> Result<User> {
        self.get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM users ORDER BY id")?;

        let users = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }
}
