use std::marker::PhantomData;

use super::{IntoFields, Record, Store, StoreError};
use crate::services::validators::ValidationError;

const ANONYMOUS: &str = "anonymous";

/// Failures of a repository operation. The username is only there so that
/// logs and error bodies say who asked.
#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("[{username}] Not found, ReferenceObject<{id}>")]
    Select { username: String, id: i64 },

    #[error("[{username}] Not created: {detail}")]
    Create { username: String, detail: String },

    #[error("[{username}] Not updated, reference object not found, ReferenceObject<{id}>")]
    Update { username: String, id: i64 },

    #[error("[{username}] Not deleted, reference object not found, ReferenceObject<{id}>")]
    Delete { username: String, id: i64 },

    /// Patch refused before reaching the store
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create/read/list/update/delete for one record type.
///
/// `C` is the validated create schema and `U` the update patch. The store is
/// passed to every call; the repository itself holds no connection.
#[derive(Debug)]
pub struct CrudRepository<R, C, U> {
    username: String,
    _types: PhantomData<fn() -> (R, C, U)>,
}

impl<R, C, U> Default for CrudRepository<R, C, U> {
    fn default() -> Self {
        Self {
            username: ANONYMOUS.to_string(),
            _types: PhantomData,
        }
    }
}

impl<R, C, U> Clone for CrudRepository<R, C, U> {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            _types: PhantomData,
        }
    }
}

impl<R, C, U> CrudRepository<R, C, U>
where
    R: Record,
    C: IntoFields + Send,
    U: IntoFields + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.set_username(username);
        self
    }

    /// Sets the principal reported in error messages
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    #[tracing::instrument(skip(self, store), fields(table = R::TABLE, username = %self.username))]
    pub async fn get<S: Store>(&self, store: &S, id: i64) -> Result<R, RepositoryError> {
        store
            .fetch::<R>(id)
            .await?
            .ok_or_else(|| RepositoryError::Select {
                username: self.username.clone(),
                id,
            })
    }

    /// A page of records in insertion order.
    ///
    /// A non-positive `limit` yields an empty page without touching the
    /// store; a negative `skip` counts as zero.
    #[tracing::instrument(skip(self, store), fields(table = R::TABLE, username = %self.username))]
    pub async fn get_multi<S: Store>(
        &self,
        store: &S,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<R>, RepositoryError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        Ok(store.scan::<R>(skip.max(0), limit).await?)
    }

    /// Inserts a new record. The store's unique constraints are the only
    /// duplicate check.
    #[tracing::instrument(skip(self, store, obj_in), fields(table = R::TABLE, username = %self.username))]
    pub async fn create<S: Store>(&self, store: &S, obj_in: C) -> Result<R, RepositoryError> {
        match store.insert::<R>(obj_in.into_fields()).await {
            Ok(record) => {
                tracing::info!(id = record.id(), "Record created");
                Ok(record)
            }
            Err(StoreError::UniqueViolation(detail)) => {
                tracing::warn!(%detail, "Create rejected by unique constraint");
                Err(RepositoryError::Create {
                    username: self.username.clone(),
                    detail,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies the fields present in `obj_in` to an existing record
    #[tracing::instrument(skip(self, store, obj_in), fields(table = R::TABLE, username = %self.username))]
    pub async fn update<S: Store>(
        &self,
        store: &S,
        id: i64,
        obj_in: U,
    ) -> Result<R, RepositoryError> {
        self.update_fields(store, id, obj_in).await
    }

    pub(crate) async fn update_fields<S: Store, P: IntoFields + Send>(
        &self,
        store: &S,
        id: i64,
        patch: P,
    ) -> Result<R, RepositoryError> {
        let record = store
            .patch::<R>(id, patch.into_fields())
            .await?
            .ok_or_else(|| RepositoryError::Update {
                username: self.username.clone(),
                id,
            })?;

        tracing::info!(id, "Record updated");
        Ok(record)
    }

    /// Deletes a record and returns its last known state
    #[tracing::instrument(skip(self, store), fields(table = R::TABLE, username = %self.username))]
    pub async fn remove<S: Store>(&self, store: &S, id: i64) -> Result<R, RepositoryError> {
        let record = store
            .delete::<R>(id)
            .await?
            .ok_or_else(|| RepositoryError::Delete {
                username: self.username.clone(),
                id,
            })?;

        tracing::info!(id, "Record deleted");
        Ok(record)
    }
}
