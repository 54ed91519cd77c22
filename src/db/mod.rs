use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, FromRow, PgPool};
use std::time::Duration;

pub mod crud;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// A single column value handed to the store on insert or patch
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(Option<i32>),
    Date(NaiveDate),
}

impl From<&FieldValue> for serde_json::Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(v) => serde_json::Value::from(v.as_str()),
            FieldValue::Int(v) => v.map_or(serde_json::Value::Null, serde_json::Value::from),
            FieldValue::Date(v) => serde_json::Value::from(v.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Column/value pairs. Column names are always compile-time constants.
pub type Fields = Vec<(&'static str, FieldValue)>;

/// Anything that can be written to the store as a list of columns
pub trait IntoFields {
    fn into_fields(self) -> Fields;
}

impl IntoFields for Fields {
    fn into_fields(self) -> Fields {
        self
    }
}

/// A persisted entity with a system-assigned `id` and
/// `created_at`/`updated_at` timestamps.
pub trait Record:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    /// Columns carrying a unique constraint besides `id`
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> i64;
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Row could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Persistence backend.
///
/// Every mutating call is its own unit of work: it either commits fully or
/// leaves nothing behind. Absent rows are reported as `None`, never as an
/// error.
#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trips to the backend, used by the health check
    async fn ping(&self) -> Result<(), StoreError>;

    async fn fetch<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError>;

    /// Rows in id order. Callers pass `skip >= 0` and `limit > 0`.
    async fn scan<R: Record>(&self, skip: i64, limit: i64) -> Result<Vec<R>, StoreError>;

    async fn insert<R: Record>(&self, fields: Fields) -> Result<R, StoreError>;

    /// Writes the given columns and refreshes `updated_at`
    async fn patch<R: Record>(&self, id: i64, fields: Fields) -> Result<Option<R>, StoreError>;

    async fn delete<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError>;
}
