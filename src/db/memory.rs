use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Fields, Record, Store, StoreError};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Map<String, Value>>,
}

/// In-process store keeping rows as JSON objects, one table per record type.
///
/// Enforces the same unique columns as the SQL schema so that racing or
/// repeated inserts behave like they do against Postgres.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<&'static str, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<&'static str, Table>> {
        // A panic while holding the lock cannot leave a row half written
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn decode<R: Record>(row: &Map<String, Value>) -> Result<R, StoreError> {
    Ok(serde_json::from_value(Value::Object(row.clone()))?)
}

fn check_unique<R: Record>(
    table: &Table,
    candidate: &Map<String, Value>,
    skip_id: Option<i64>,
) -> Result<(), StoreError> {
    for column in R::UNIQUE {
        let Some(value) = candidate.get(*column) else {
            continue;
        };
        let clash = table
            .rows
            .iter()
            .filter(|(id, _)| Some(**id) != skip_id)
            .any(|(_, row)| row.get(*column) == Some(value));
        if clash {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate key value violates unique constraint on {}.{}",
                R::TABLE,
                column
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn fetch<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError> {
        let tables = self.lock();
        tables
            .get(R::TABLE)
            .and_then(|table| table.rows.get(&id))
            .map(decode::<R>)
            .transpose()
    }

    async fn scan<R: Record>(&self, skip: i64, limit: i64) -> Result<Vec<R>, StoreError> {
        let tables = self.lock();
        let Some(table) = tables.get(R::TABLE) else {
            return Ok(Vec::new());
        };

        table
            .rows
            .values()
            .skip(usize::try_from(skip).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(decode::<R>)
            .collect()
    }

    async fn insert<R: Record>(&self, fields: Fields) -> Result<R, StoreError> {
        let mut tables = self.lock();
        let table = tables.entry(R::TABLE).or_default();

        let now = serde_json::to_value(Utc::now())?;
        let mut row = Map::new();
        row.insert("id".to_string(), Value::from(table.next_id + 1));
        row.insert("created_at".to_string(), now.clone());
        row.insert("updated_at".to_string(), now);
        for (column, value) in &fields {
            row.insert(column.to_string(), Value::from(value));
        }

        check_unique::<R>(table, &row, None)?;
        // Decode before committing so a malformed row is never stored
        let record = decode::<R>(&row)?;

        table.next_id += 1;
        table.rows.insert(table.next_id, row);

        Ok(record)
    }

    async fn patch<R: Record>(&self, id: i64, fields: Fields) -> Result<Option<R>, StoreError> {
        let mut tables = self.lock();
        let Some(table) = tables.get_mut(R::TABLE) else {
            return Ok(None);
        };
        let Some(current) = table.rows.get(&id) else {
            return Ok(None);
        };

        let mut row = current.clone();
        row.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        for (column, value) in &fields {
            row.insert(column.to_string(), Value::from(value));
        }

        check_unique::<R>(table, &row, Some(id))?;
        let record = decode::<R>(&row)?;
        table.rows.insert(id, row);

        Ok(Some(record))
    }

    async fn delete<R: Record>(&self, id: i64) -> Result<Option<R>, StoreError> {
        let mut tables = self.lock();
        let Some(table) = tables.get_mut(R::TABLE) else {
            return Ok(None);
        };

        let removed = table.rows.remove(&id);
        removed.as_ref().map(decode::<R>).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FieldValue;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
    struct Note {
        id: i64,
        title: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl Record for Note {
        const TABLE: &'static str = "notes";
        const UNIQUE: &'static [&'static str] = &["title"];

        fn id(&self) -> i64 {
            self.id
        }
    }

    fn title(value: &str) -> Fields {
        vec![("title", FieldValue::Text(value.to_string()))]
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();

        let first: Note = store.insert(title("one")).await.unwrap();
        let second: Note = store.insert(title("two")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn test_unique_violation_leaves_table_untouched() {
        let store = MemoryStore::new();
        store.insert::<Note>(title("same")).await.unwrap();

        let result = store.insert::<Note>(title("same")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));

        let rows: Vec<Note> = store.scan(0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);

        // The failed insert does not burn an id
        let next: Note = store.insert(title("other")).await.unwrap();
        assert_eq!(next.id, 2);
    }

    #[tokio::test]
    async fn test_scan_is_ordered_and_paged() {
        let store = MemoryStore::new();
        for t in ["a", "b", "c", "d"] {
            store.insert::<Note>(title(t)).await.unwrap();
        }

        let page: Vec<Note> = store.scan(1, 2).await.unwrap();
        let titles: Vec<_> = page.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["b", "c"]);

        let past_end: Vec<Note> = store.scan(10, 2).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_missing_rows_are_none() {
        let store = MemoryStore::new();

        assert!(store.fetch::<Note>(1).await.unwrap().is_none());
        assert!(store.patch::<Note>(1, title("x")).await.unwrap().is_none());
        assert!(store.delete::<Note>(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_and_delete() {
        let store = MemoryStore::new();
        let note: Note = store.insert(title("draft")).await.unwrap();

        let patched: Note = store.patch(note.id, title("final")).await.unwrap().unwrap();
        assert_eq!(patched.title, "final");
        assert_eq!(patched.created_at, note.created_at);
        assert!(patched.updated_at >= note.updated_at);

        let deleted: Note = store.delete(note.id).await.unwrap().unwrap();
        assert_eq!(deleted, patched);
        assert!(store.fetch::<Note>(note.id).await.unwrap().is_none());
    }
}
