use async_trait::async_trait;
use sqlx::{query_builder::Separated, PgPool, Postgres, QueryBuilder};

use super::{FieldValue, Fields, Record, Store, StoreError};

/// Postgres-backed store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_value<'args>(separated: &mut Separated<'_, 'args, Postgres, &'static str>, value: FieldValue) {
    match value {
        FieldValue::Text(v) => separated.push_bind(v),
        FieldValue::Int(v) => separated.push_bind(v),
        FieldValue::Date(v) => separated.push_bind(v),
    };
}

fn push_value_unseparated<'args>(
    separated: &mut Separated<'_, 'args, Postgres, &'static str>,
    value: FieldValue,
) {
    match value {
        FieldValue::Text(v) => separated.push_bind_unseparated(v),
        FieldValue::Int(v) => separated.push_bind_unseparated(v),
        FieldValue::Date(v) => separated.push_bind_unseparated(v),
    };
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let detail = db_err
                .constraint()
                .map(|c| format!("{} ({})", db_err.message(), c))
                .unwrap_or_else(|| db_err.message().to_string());
            StoreError::UniqueViolation(detail)
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(table = R::TABLE))]
    async fn fetch<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", R::TABLE);
        let row = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(table = R::TABLE))]
    async fn scan<R: Record>(&self, skip: i64, limit: i64) -> Result<Vec<R>, StoreError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY id OFFSET $1 LIMIT $2",
            R::TABLE
        );
        let rows = sqlx::query_as::<_, R>(&sql)
            .bind(skip)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, fields), fields(table = R::TABLE))]
    async fn insert<R: Record>(&self, fields: Fields) -> Result<R, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} (", R::TABLE));

        let mut columns = builder.separated(", ");
        for (column, _) in &fields {
            columns.push(*column);
        }
        builder.push(") VALUES (");

        let mut values = builder.separated(", ");
        for (_, value) in fields {
            push_value(&mut values, value);
        }
        builder.push(") RETURNING *");

        let mut tx = self.pool.begin().await?;
        let record = builder
            .build_query_as::<R>()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, fields), fields(table = R::TABLE))]
    async fn patch<R: Record>(&self, id: i64, fields: Fields) -> Result<Option<R>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", R::TABLE));

        let mut assignments = builder.separated(", ");
        assignments.push("updated_at = NOW()");
        for (column, value) in fields {
            assignments.push(format!("{} = ", column));
            push_value_unseparated(&mut assignments, value);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING *");

        let mut tx = self.pool.begin().await?;
        let record = builder
            .build_query_as::<R>()
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(table = R::TABLE))]
    async fn delete<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING *", R::TABLE);

        let mut tx = self.pool.begin().await?;
        let record = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(record)
    }
}
