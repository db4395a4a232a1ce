//! Trend report assembly
//!
//! For one owner, period unit and reference date:
//!
//! 1. Compute the current and previous windows
//! 2. Fetch expense categories and both window aggregations concurrently
//! 3. Fetch each category's historical average as a bounded set of tasks
//! 4. Forecast and classify each category, most spend first
//!
//! Every store call races the caller's cancellation token and the whole
//! computation runs under a deadline. A failed historical average degrades to
//! the category's current spend; any other store failure fails the report.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{ForecastEngine, TrendClassifier, TrendStore};
use crate::config::TrendConfig;
use crate::error::{Error, Result};
use crate::models::{CategoryAmount, TrendRecord, TrendReport};
use crate::periods::{self, PeriodUnit, Window};

/// Inputs of a single trend computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendQuery {
    pub owner_id: i64,
    pub period: PeriodUnit,
    /// Reference date selecting the current period
    pub date: NaiveDate,
    /// End of the historical lookback (call time)
    pub as_of: NaiveDateTime,
}

impl TrendQuery {
    pub fn new(owner_id: i64, period: PeriodUnit, date: NaiveDate, as_of: NaiveDateTime) -> Self {
        Self {
            owner_id,
            period,
            date,
            as_of,
        }
    }

    /// Build a query from raw request values
    ///
    /// `date` is `YYYY-MM-DD` and defaults to the date of `now` when absent or empty.
    pub fn parse(
        owner_id: i64,
        period: &str,
        date: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Self> {
        let period: PeriodUnit = period.parse().map_err(Error::InvalidArgument)?;

        let date = match date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                Error::InvalidArgument(format!("Invalid date '{}', expected YYYY-MM-DD", s))
            })?,
            None => now.date(),
        };

        Ok(Self::new(owner_id, period, date, now))
    }
}

/// Orchestrates windows, aggregation, averaging, forecasting and classification
pub struct TrendReportBuilder<S> {
    store: Arc<S>,
    config: TrendConfig,
    engine: ForecastEngine,
    classifier: TrendClassifier,
}

impl<S> Clone for TrendReportBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
            engine: self.engine,
            classifier: self.classifier,
        }
    }
}

impl<S: TrendStore + 'static> TrendReportBuilder<S> {
    pub fn new(store: Arc<S>, config: TrendConfig) -> Self {
        Self {
            store,
            engine: ForecastEngine::new(config.weights),
            classifier: TrendClassifier::new(config.thresholds),
            config,
        }
    }

    /// Compute per-category trends for the query
    ///
    /// Fails with `InvalidArgument` when the windows cannot be computed,
    /// `Unavailable` when a category or aggregation query fails, and
    /// `Cancelled` when `cancel` fires or the configured deadline elapses.
    pub async fn compute_trends(
        &self,
        query: &TrendQuery,
        cancel: &CancellationToken,
    ) -> Result<TrendReport> {
        let deadline = self.config.query.timeout();

        match tokio::time::timeout(deadline, self.compute(query, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    owner_id = query.owner_id,
                    period = %query.period,
                    timeout_secs = self.config.query.timeout_secs,
                    "Trend computation deadline elapsed"
                );
                Err(Error::Cancelled(format!(
                    "Trend computation exceeded {}s deadline",
                    self.config.query.timeout_secs
                )))
            }
        }
    }

    async fn compute(&self, query: &TrendQuery, cancel: &CancellationToken) -> Result<TrendReport> {
        let owner_id = query.owner_id;
        let windows = periods::windows(query.date, query.period)?;
        let lookback = Window::lookback(query.as_of, self.config.lookback.for_unit(query.period))?;

        debug!(
            owner_id,
            period = %query.period,
            current = %windows.current,
            previous = %windows.previous,
            lookback = %lookback,
            "Computing spending trends"
        );

        let (categories, current, previous) = tokio::try_join!(
            race(cancel, self.store.list_expense_categories(owner_id)),
            race(cancel, self.store.aggregate_expenses(owner_id, windows.current)),
            race(cancel, self.store.aggregate_expenses(owner_id, windows.previous)),
        )
        .map_err(|e| {
            if !matches!(e, Error::Cancelled(_)) {
                error!(owner_id, period = %query.period, error = %e, "Spending aggregation failed");
            }
            e.into_unavailable()
        })?;

        let current = amounts_by_category(&current);
        let previous = amounts_by_category(&previous);

        // Categories without a row in an aggregation still get a record
        let mut names: BTreeMap<i64, String> =
            categories.into_iter().map(|c| (c.id, c.name)).collect();
        for (id, (name, _)) in current.iter().chain(previous.iter()) {
            names.entry(*id).or_insert_with(|| name.clone());
        }

        let historical = self
            .historical_averages(owner_id, names.keys().copied(), lookback, cancel)
            .await?;

        let mut trends: Vec<TrendRecord> = names
            .into_iter()
            .map(|(category_id, category_name)| {
                let current_spend = current.get(&category_id).map_or(0.0, |(_, a)| *a);
                let previous_spend = previous.get(&category_id).map_or(0.0, |(_, a)| *a);
                let historical = historical
                    .get(&category_id)
                    .copied()
                    .unwrap_or(current_spend);

                let classification = self.classifier.classify(current_spend, previous_spend);

                TrendRecord {
                    category_id,
                    category_name,
                    current_spend,
                    predicted_spend: self
                        .engine
                        .predict(current_spend, previous_spend, historical),
                    trend_direction: classification.direction,
                    change_percent: classification.change_percent,
                }
            })
            .collect();

        trends.sort_by(|a, b| {
            b.current_spend
                .total_cmp(&a.current_spend)
                .then(a.category_id.cmp(&b.category_id))
        });

        Ok(TrendReport {
            period: query.period,
            date: query.date,
            trends,
        })
    }

    /// Historical averages keyed by category; categories whose query failed are absent
    async fn historical_averages(
        &self,
        owner_id: i64,
        category_ids: impl Iterator<Item = i64>,
        lookback: Window,
        cancel: &CancellationToken,
    ) -> Result<HashMap<i64, f64>> {
        let semaphore = Arc::new(Semaphore::new(self.config.query.max_concurrency));
        let mut tasks = JoinSet::new();

        for category_id in category_ids {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let result = race(&cancel, async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| Error::Unavailable(e.to_string()))?;
                    store.average_expense(owner_id, category_id, lookback).await
                })
                .await;
                (category_id, result)
            });
        }

        let mut averages = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((category_id, Ok(average))) => {
                    averages.insert(category_id, average);
                }
                Ok((_, Err(e @ Error::Cancelled(_)))) => return Err(e),
                Ok((category_id, Err(e))) => {
                    warn!(
                        owner_id,
                        category_id,
                        error = %e,
                        "Historical average unavailable, using current spend"
                    );
                }
                Err(e) => {
                    warn!(owner_id, error = %e, "Historical average task failed");
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        Ok(averages)
    }
}

fn amounts_by_category(amounts: &[CategoryAmount]) -> HashMap<i64, (String, f64)> {
    amounts
        .iter()
        .map(|a| (a.category_id, (a.category_name.clone(), a.amount)))
        .collect()
}

fn cancelled() -> Error {
    Error::Cancelled("Trend computation was cancelled".to_string())
}

/// Resolve `fut` unless `cancel` fires first
async fn race<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled()),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryLimits;
    use crate::db::Database;
    use crate::models::{CategoryKind, CategoryRef, NewTransaction, TrendDirection};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn now() -> NaiveDateTime {
        d(2024, 3, 8).and_hms_opt(15, 0, 0).unwrap()
    }

    fn week_query() -> TrendQuery {
        TrendQuery::new(1, PeriodUnit::Week, d(2024, 3, 6), now())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[derive(Default)]
    struct FakeStore {
        categories: Vec<CategoryRef>,
        /// Aggregations keyed by window start
        amounts: HashMap<NaiveDateTime, Vec<CategoryAmount>>,
        averages: HashMap<i64, f64>,
        fail_categories: bool,
        fail_aggregate: bool,
        fail_average_for: HashSet<i64>,
        delay: Option<Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        lookbacks: Mutex<Vec<Window>>,
    }

    impl FakeStore {
        fn with_categories(names: &[(i64, &str)]) -> Self {
            Self {
                categories: names
                    .iter()
                    .map(|(id, name)| CategoryRef {
                        id: *id,
                        name: name.to_string(),
                    })
                    .collect(),
                ..Default::default()
            }
        }

        fn spend(mut self, window: Window, category_id: i64, amount: f64) -> Self {
            let name = self
                .categories
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            self.amounts
                .entry(window.start)
                .or_default()
                .push(CategoryAmount {
                    category_id,
                    category_name: name,
                    amount,
                });
            self
        }

        fn average(mut self, category_id: i64, average: f64) -> Self {
            self.averages.insert(category_id, average);
            self
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl TrendStore for FakeStore {
        async fn aggregate_expenses(
            &self,
            _owner_id: i64,
            window: Window,
        ) -> Result<Vec<CategoryAmount>> {
            self.pause().await;
            if self.fail_aggregate {
                return Err(Error::InvalidData("connection reset".to_string()));
            }
            Ok(self.amounts.get(&window.start).cloned().unwrap_or_default())
        }

        async fn average_expense(
            &self,
            _owner_id: i64,
            category_id: i64,
            lookback: Window,
        ) -> Result<f64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.lookbacks.lock().unwrap().push(lookback);

            self.pause().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_average_for.contains(&category_id) {
                return Err(Error::InvalidData("timeout".to_string()));
            }
            Ok(self.averages.get(&category_id).copied().unwrap_or(0.0))
        }

        async fn list_expense_categories(&self, _owner_id: i64) -> Result<Vec<CategoryRef>> {
            self.pause().await;
            if self.fail_categories {
                return Err(Error::InvalidData("no such table".to_string()));
            }
            Ok(self.categories.clone())
        }
    }

    fn builder(store: FakeStore) -> TrendReportBuilder<FakeStore> {
        TrendReportBuilder::new(Arc::new(store), TrendConfig::default())
    }

    fn week_windows() -> periods::PeriodWindows {
        periods::windows(d(2024, 3, 6), PeriodUnit::Week).unwrap()
    }

    #[tokio::test]
    async fn test_worked_example() {
        let w = week_windows();
        let store = FakeStore::with_categories(&[(1, "Groceries")])
            .spend(w.current, 1, 100.0)
            .spend(w.previous, 1, 80.0)
            .average(1, 90.0);

        let report = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.period, PeriodUnit::Week);
        assert_eq!(report.date, d(2024, 3, 6));
        assert_eq!(report.trends.len(), 1);

        let trend = &report.trends[0];
        assert_eq!(trend.category_name, "Groceries");
        assert_eq!(trend.current_spend, 100.0);
        assert_eq!(trend.trend_direction, TrendDirection::Up);
        assert_close(trend.change_percent, 25.0);
        assert_close(trend.predicted_spend, 66.0);
    }

    #[tokio::test]
    async fn test_negative_prediction_clamped() {
        let w = week_windows();
        let store = FakeStore::with_categories(&[(1, "Travel")])
            .spend(w.current, 1, 10.0)
            .spend(w.previous, 1, 1000.0)
            .average(1, 0.0);

        let report = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        let trend = &report.trends[0];
        assert_eq!(trend.trend_direction, TrendDirection::Down);
        assert_close(trend.predicted_spend, 8.0);
    }

    #[tokio::test]
    async fn test_zero_activity_category_included() {
        let w = week_windows();
        let store = FakeStore::with_categories(&[(1, "Groceries"), (2, "Gifts")])
            .spend(w.current, 1, 40.0)
            .spend(w.previous, 1, 40.0);

        let report = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.trends.len(), 2);
        let gifts = &report.trends[1];
        assert_eq!(gifts.category_id, 2);
        assert_eq!(gifts.current_spend, 0.0);
        assert_eq!(gifts.predicted_spend, 0.0);
        assert_eq!(gifts.trend_direction, TrendDirection::New);
        assert_eq!(gifts.change_percent, 0.0);

        assert_eq!(report.trends[0].trend_direction, TrendDirection::Stable);
    }

    #[tokio::test]
    async fn test_sorted_by_current_spend_then_id() {
        let w = week_windows();
        let store = FakeStore::with_categories(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")])
            .spend(w.current, 2, 5.0)
            .spend(w.current, 3, 50.0)
            .spend(w.current, 4, 5.0);

        let report = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<i64> = report.trends.iter().map(|t| t.category_id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[tokio::test]
    async fn test_historical_failure_degrades_to_current_spend() {
        let w = week_windows();
        let mut store = FakeStore::with_categories(&[(1, "Groceries"), (2, "Fuel")])
            .spend(w.current, 1, 100.0)
            .spend(w.previous, 1, 80.0)
            .spend(w.current, 2, 30.0)
            .average(1, 90.0)
            .average(2, 999.0);
        store.fail_average_for.insert(2);

        let report = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        assert_close(report.trends[0].predicted_spend, 66.0);
        // 30*0.4 + 0*0.4 + 30*0.2
        assert_close(report.trends[1].predicted_spend, 18.0);
    }

    #[tokio::test]
    async fn test_aggregation_failure_is_unavailable() {
        let mut store = FakeStore::with_categories(&[(1, "Groceries")]);
        store.fail_aggregate = true;

        let err = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_category_failure_is_unavailable() {
        let mut store = FakeStore::with_categories(&[(1, "Groceries")]);
        store.fail_categories = true;

        let err = builder(store)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let store = FakeStore::with_categories(&[(1, "Groceries")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = builder(store)
            .compute_trends(&week_query(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_cancelled_mid_flight() {
        let mut store = FakeStore::with_categories(&[(1, "Groceries"), (2, "Fuel")]);
        store.delay = Some(Duration::from_secs(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = builder(store)
            .compute_trends(&week_query(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_deadline_elapsed_is_cancelled() {
        let mut store = FakeStore::with_categories(&[(1, "Groceries")]);
        store.delay = Some(Duration::from_secs(30));

        let config = TrendConfig {
            query: QueryLimits {
                max_concurrency: 4,
                timeout_secs: 1,
            },
            ..Default::default()
        };

        let err = TrendReportBuilder::new(Arc::new(store), config)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
        assert!(err.to_string().contains("deadline"));
    }

    #[tokio::test]
    async fn test_historical_queries_respect_concurrency_limit() {
        let ids: Vec<(i64, &str)> = (1..=8).map(|id| (id, "cat")).collect();
        let mut store = FakeStore::with_categories(&ids);
        store.delay = Some(Duration::from_millis(15));
        let store = Arc::new(store);

        let config = TrendConfig {
            query: QueryLimits {
                max_concurrency: 2,
                timeout_secs: 30,
            },
            ..Default::default()
        };

        let report = TrendReportBuilder::new(Arc::clone(&store), config)
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.trends.len(), 8);
        let max = store.max_in_flight.load(Ordering::SeqCst);
        assert!((1..=2).contains(&max), "max in flight was {}", max);
    }

    #[tokio::test]
    async fn test_lookback_ends_at_call_time() {
        let store = Arc::new(FakeStore::with_categories(&[(1, "Groceries")]));

        TrendReportBuilder::new(Arc::clone(&store), TrendConfig::default())
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();

        let lookbacks = store.lookbacks.lock().unwrap();
        assert_eq!(lookbacks.len(), 1);
        assert_eq!(lookbacks[0].end, now());
        assert_eq!((lookbacks[0].end - lookbacks[0].start).num_days(), 84);
    }

    #[tokio::test]
    async fn test_identical_inputs_identical_output() {
        let w = week_windows();
        let store = FakeStore::with_categories(&[(1, "A"), (2, "B"), (3, "C")])
            .spend(w.current, 1, 12.5)
            .spend(w.previous, 1, 20.0)
            .spend(w.current, 3, 12.5)
            .average(1, 7.0)
            .average(3, 3.0);
        let builder = builder(store);

        let first = builder
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();
        let second = builder
            .compute_trends(&week_query(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_query() {
        let query = TrendQuery::parse(7, "month", Some("2024-01-15"), now()).unwrap();
        assert_eq!(query.owner_id, 7);
        assert_eq!(query.period, PeriodUnit::Month);
        assert_eq!(query.date, d(2024, 1, 15));
        assert_eq!(query.as_of, now());

        let query = TrendQuery::parse(7, "day", None, now()).unwrap();
        assert_eq!(query.date, d(2024, 3, 8));

        let query = TrendQuery::parse(7, "day", Some(""), now()).unwrap();
        assert_eq!(query.date, d(2024, 3, 8));
    }

    #[test]
    fn test_parse_query_rejects_bad_input() {
        let err = TrendQuery::parse(7, "fortnight", None, now()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = TrendQuery::parse(7, "week", Some("03/06/2024"), now()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = TrendQuery::parse(7, "week", Some("2024-02-30"), now()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_sqlite_store() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("alice").unwrap();
        let account = db.upsert_account(user, "Checking").unwrap();
        let (groceries, _) = db
            .upsert_category(user, "Groceries", CategoryKind::Expense)
            .unwrap();
        let (gifts, _) = db
            .upsert_category(user, "Gifts", CategoryKind::Expense)
            .unwrap();
        let (salary, _) = db
            .upsert_category(user, "Salary", CategoryKind::Income)
            .unwrap();

        let add = |category_id: i64, kind: CategoryKind, amount: f64, at: NaiveDateTime| {
            db.insert_transaction(&NewTransaction {
                user_id: user,
                account_id: account,
                category_id,
                amount,
                kind,
                occurred_at: at,
                description: String::new(),
                import_hash: None,
            })
            .unwrap();
        };

        let at = |m: u32, day: u32| d(2024, m, day).and_hms_opt(12, 0, 0).unwrap();

        // Current week (Mar 4-10): 100; previous week (Feb 26-Mar 3): 80
        add(groceries, CategoryKind::Expense, 60.0, at(3, 4));
        add(groceries, CategoryKind::Expense, 40.0, at(3, 6));
        add(groceries, CategoryKind::Expense, 80.0, at(2, 27));
        add(salary, CategoryKind::Income, 4000.0, at(3, 5));

        let query = TrendQuery::new(user, PeriodUnit::Week, d(2024, 3, 6), now());
        let report = TrendReportBuilder::new(Arc::new(db.clone()), TrendConfig::default())
            .compute_trends(&query, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.trends.len(), 2);

        let first = &report.trends[0];
        assert_eq!(first.category_id, groceries);
        assert_eq!(first.current_spend, 100.0);
        assert_eq!(first.trend_direction, TrendDirection::Up);
        // Historical average over the last 84 days: (60 + 40 + 80) / 3 = 60
        assert_close(first.predicted_spend, 40.0 + 8.0 + 12.0);

        let second = &report.trends[1];
        assert_eq!(second.category_id, gifts);
        assert_eq!(second.trend_direction, TrendDirection::New);
    }
}
