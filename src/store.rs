//! Read access to the production records.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::record::ProductionRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProductionStore: Send + Sync {
    /// The record with the greatest production date (missing dates last),
    /// ties broken by the greatest `sno`. `None` when the table is empty.
    async fn latest_record(&self) -> Result<Option<ProductionRecord>, StoreError>;

    /// Number of records produced on `date`. A missing date matches nothing.
    async fn count_for_date(&self, date: Option<NaiveDate>) -> Result<i64, StoreError>;
}

// `production_date` is expected to be a `date` column (see migrations/).
// ORDER BY and WHERE name the table column, not the casted output alias.
const LATEST_RECORD_SQL: &str = r#"
    SELECT t.sno::int8               AS sno,
           t.operator_id::text       AS operator_id,
           t.p_shift::text           AS p_shift,
           t.recipe_name::text       AS recipe_name,
           t.performance::float8     AS performance,
           t.production_date::date   AS production_date,
           t.drum_changeover::int4   AS drum_changeover
    FROM public.tbm9 AS t
    ORDER BY t.production_date DESC NULLS LAST, t.sno DESC
    LIMIT 1
"#;

const COUNT_FOR_DATE_SQL: &str = r#"
    SELECT COUNT(*)
    FROM public.tbm9 AS t
    WHERE t.production_date = $1
"#;

/// Postgres-backed store. The pool is shared by all requests; each query
/// checks a connection out and returns it on completion.
#[derive(Clone)]
pub struct PgProductionStore {
    pool: PgPool,
}

impl PgProductionStore {
    /// Creates the pool without connecting; connections open on first use.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options: PgConnectOptions = database_url.parse()?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Wraps a pool that is already set up, e.g. a per-test database.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductionStore for PgProductionStore {
    #[instrument(level = "debug", skip(self))]
    async fn latest_record(&self) -> Result<Option<ProductionRecord>, StoreError> {
        let record = sqlx::query_as::<_, ProductionRecord>(LATEST_RECORD_SQL)
            .fetch_optional(&self.pool)
            .await?;
        debug!(found = record.is_some(), "Fetched latest tbm9 record");
        Ok(record)
    }

    #[instrument(level = "debug", skip(self))]
    async fn count_for_date(&self, date: Option<NaiveDate>) -> Result<i64, StoreError> {
        let total: i64 = sqlx::query_scalar(COUNT_FOR_DATE_SQL)
            .bind(date)
            .fetch_one(&self.pool)
            .await?;
        debug!(total, "Counted tbm9 records for date");
        Ok(total)
    }
}

/// In-memory store following the same selection rules as the SQL above.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ProductionRecord>>,
}

impl MemoryStore {
    pub fn new(records: Vec<ProductionRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn insert(&self, record: ProductionRecord) {
        self.lock().push(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProductionRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProductionStore for MemoryStore {
    async fn latest_record(&self) -> Result<Option<ProductionRecord>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .max_by(|a, b| a.recency_cmp(b))
            .cloned())
    }

    async fn count_for_date(&self, date: Option<NaiveDate>) -> Result<i64, StoreError> {
        let Some(date) = date else {
            return Ok(0);
        };
        let total = self
            .lock()
            .iter()
            .filter(|r| r.production_date == Some(date))
            .count();
        Ok(total as i64)
    }
}
