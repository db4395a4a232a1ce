//! Store interface consumed by trend computation

use async_trait::async_trait;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CategoryAmount, CategoryRef};
use crate::periods::Window;

/// Read-only queries needed to compute trends
///
/// Implementations must be Send + Sync so per-category queries can run as
/// separate tasks.
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Summed expense amount per expense category inside `[start, end)`,
    /// including categories with no activity
    async fn aggregate_expenses(&self, owner_id: i64, window: Window)
        -> Result<Vec<CategoryAmount>>;

    /// Mean individual expense amount for a category inside the lookback
    /// window, 0 when nothing matches
    async fn average_expense(&self, owner_id: i64, category_id: i64, lookback: Window)
        -> Result<f64>;

    /// All expense categories of the owner
    async fn list_expense_categories(&self, owner_id: i64) -> Result<Vec<CategoryRef>>;
}

/// Run a synchronous database call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Unavailable(format!("Database task failed: {}", e)))?
}

#[async_trait]
impl TrendStore for Database {
    async fn aggregate_expenses(
        &self,
        owner_id: i64,
        window: Window,
    ) -> Result<Vec<CategoryAmount>> {
        let db = self.clone();
        blocking(move || Database::aggregate_expenses(&db, owner_id, &window)).await
    }

    async fn average_expense(
        &self,
        owner_id: i64,
        category_id: i64,
        lookback: Window,
    ) -> Result<f64> {
        let db = self.clone();
        blocking(move || Database::average_expense(&db, owner_id, category_id, &lookback)).await
    }

    async fn list_expense_categories(&self, owner_id: i64) -> Result<Vec<CategoryRef>> {
        let db = self.clone();
        blocking(move || Database::list_expense_categories(&db, owner_id)).await
    }
}
