use serde_json::Value;

use super::crud::{CrudRepository, RepositoryError};
use super::{FieldValue, Fields, IntoFields, Store};
use crate::models::CreditCard;
use crate::services::card_schema::{CreditCardSchema, CreditCardUpdateSchema};
use crate::services::validators::{validate_holder_update, ValidationError};

/// Columns an update may write. Number, expiration, cvv and brand are fixed
/// once the card exists.
const UPDATABLE_COLUMNS: &[&str] = &["holder"];

/// Repository for stored credit cards.
///
/// Delegates to the generic repository, except that `update` drops every
/// column but `holder` before anything reaches the store.
#[derive(Debug, Clone, Default)]
pub struct CreditCardRepository {
    inner: CrudRepository<CreditCard, CreditCardSchema, CreditCardUpdateSchema>,
}

impl CreditCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.set_username(username);
        self
    }

    /// Sets the user performing the operations, used in error messages
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.inner.set_username(username);
    }

    pub fn username(&self) -> &str {
        self.inner.username()
    }

    pub async fn get<S: Store>(&self, store: &S, id: i64) -> Result<CreditCard, RepositoryError> {
        self.inner.get(store, id).await
    }

    pub async fn get_multi<S: Store>(
        &self,
        store: &S,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<CreditCard>, RepositoryError> {
        self.inner.get_multi(store, skip, limit).await
    }

    pub async fn create<S: Store>(
        &self,
        store: &S,
        obj_in: CreditCardSchema,
    ) -> Result<CreditCard, RepositoryError> {
        self.inner.create(store, obj_in).await
    }

    /// Updates a card. Whatever the patch carries, only `holder` is written.
    pub async fn update<S: Store, P: IntoFields + Send>(
        &self,
        store: &S,
        id: i64,
        obj_in: P,
    ) -> Result<CreditCard, RepositoryError> {
        let mut fields: Fields = obj_in.into_fields();
        fields.retain(|(column, _)| UPDATABLE_COLUMNS.contains(column));
        for (_, value) in &fields {
            check_holder(value)?;
        }

        if fields.len() != UPDATABLE_COLUMNS.len() {
            tracing::debug!(id, "Update carried no holder, only updated_at is refreshed");
        }

        self.inner.update_fields(store, id, fields).await
    }

    pub async fn remove<S: Store>(
        &self,
        store: &S,
        id: i64,
    ) -> Result<CreditCard, RepositoryError> {
        self.inner.remove(store, id).await
    }
}

/// Raw patches bypass the update schema, so the holder rule is applied again
fn check_holder(value: &FieldValue) -> Result<(), ValidationError> {
    match value {
        FieldValue::Text(holder) => {
            validate_holder_update(&Value::String(holder.clone()))?;
            Ok(())
        }
        _ => Err(ValidationError::InvalidHolder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FieldValue, MemoryStore};
    use crate::services::card_schema::{CreditCardInput, CreditCardUpdateInput};
    use crate::services::tokenizer::{is_token, tokenize};
    use chrono::NaiveDate;
    use serde_json::json;

    const VALID_VISA: &str = "4539578763621486";
    const VALID_MASTER: &str = "5186001700009726";

    fn schema(holder: &str, number: &str) -> CreditCardSchema {
        let input: CreditCardInput = serde_json::from_value(json!({
            "holder": holder,
            "number": number,
            "exp_date": "01/2029",
            "cvv": 123
        }))
        .unwrap();
        CreditCardSchema::assemble(input, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_visa() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new().with_username("test");

        let created = repo.create(&store, schema("Test User 1", VALID_VISA)).await.unwrap();
        let fetched = repo.get(&store, created.id).await.unwrap();

        assert_eq!(fetched.holder, "Test User 1");
        assert_eq!(fetched.brand, "visa");
        assert_eq!(fetched.number.len(), 64);
        assert!(is_token(&fetched.number));
        assert_eq!(fetched.number, tokenize(VALID_VISA));
        assert_eq!(fetched.exp_date.to_string(), "2029-01-31");
        assert_eq!(fetched.cvv, Some(123));
    }

    #[tokio::test]
    async fn test_same_number_twice_conflicts() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new().with_username("test");

        repo.create(&store, schema("Test User 1", VALID_VISA)).await.unwrap();
        let err = repo
            .create(&store, schema("Test User 2", "4539-5787-6362-1486"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Create { ref username, .. } if username == "test"));
        assert_eq!(repo.get_multi(&store, 0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_only_touches_holder() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new();
        let created = repo.create(&store, schema("Test User 2", VALID_MASTER)).await.unwrap();

        let patch: Fields = vec![
            ("holder", FieldValue::Text("Renamed Holder".to_string())),
            ("number", FieldValue::Text(tokenize(VALID_VISA))),
            ("brand", FieldValue::Text("visa".to_string())),
            ("cvv", FieldValue::Int(Some(999))),
            (
                "exp_date",
                FieldValue::Date(NaiveDate::from_ymd_opt(2040, 1, 31).unwrap()),
            ),
        ];
        let updated = repo.update(&store, created.id, patch).await.unwrap();

        assert_eq!(updated.holder, "Renamed Holder");
        assert_eq!(updated.number, created.number);
        assert_eq!(updated.brand, "master");
        assert_eq!(updated.cvv, created.cvv);
        assert_eq!(updated.exp_date, created.exp_date);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_with_schema() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new();
        let created = repo.create(&store, schema("Test User 2", VALID_MASTER)).await.unwrap();

        let input: CreditCardUpdateInput = serde_json::from_value(json!({
            "holder": "New Name",
            "number": VALID_VISA
        }))
        .unwrap();
        let update = CreditCardUpdateSchema::assemble(input).unwrap();
        let updated = repo.update(&store, created.id, update).await.unwrap();

        assert_eq!(updated.holder, "New Name");
        assert_eq!(updated.number, created.number);
    }

    #[tokio::test]
    async fn test_update_without_holder_keeps_record() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new();
        let created = repo.create(&store, schema("Test User 2", VALID_MASTER)).await.unwrap();

        let patch: Fields = vec![("brand", FieldValue::Text("amex".to_string()))];
        let updated = repo.update(&store, created.id, patch).await.unwrap();

        assert_eq!(updated.holder, created.holder);
        assert_eq!(updated.brand, "master");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_raw_patch_with_short_holder_is_rejected() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new();
        let created = repo.create(&store, schema("Test User 2", VALID_MASTER)).await.unwrap();

        let short: Fields = vec![("holder", FieldValue::Text("A".to_string()))];
        let err = repo.update(&store, created.id, short).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid(ValidationError::InvalidHolder)
        ));

        let wrong_type: Fields = vec![("holder", FieldValue::Int(Some(123)))];
        let err = repo.update(&store, created.id, wrong_type).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Invalid(ValidationError::InvalidHolder)
        ));

        let stored = repo.get(&store, created.id).await.unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn test_concurrent_creates_of_one_number_settle_on_one_row() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new().with_username("test");

        let (first, second) = tokio::join!(
            repo.create(&store, schema("Test User 1", VALID_VISA)),
            repo.create(&store, schema("Test User 2", "4539-5787-6362-1486")),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(RepositoryError::Create { .. })))
                .count(),
            1
        );
        assert_eq!(repo.get_multi(&store, 0, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_map_to_taxonomy() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new().with_username("auditor");

        assert!(matches!(
            repo.get(&store, 7).await,
            Err(RepositoryError::Select { id: 7, .. })
        ));
        assert!(matches!(
            repo.update(&store, 7, CreditCardUpdateSchema { holder: "Someone".into() }).await,
            Err(RepositoryError::Update { id: 7, .. })
        ));
        assert!(matches!(
            repo.remove(&store, 7).await,
            Err(RepositoryError::Delete { ref username, id: 7 }) if username == "auditor"
        ));
    }

    #[tokio::test]
    async fn test_remove_returns_deleted_card() {
        let store = MemoryStore::new();
        let repo = CreditCardRepository::new();
        let created = repo.create(&store, schema("Test User 1", VALID_VISA)).await.unwrap();

        let removed = repo.remove(&store, created.id).await.unwrap();
        assert_eq!(removed, created);
        assert!(repo.get_multi(&store, 0, 100).await.unwrap().is_empty());
    }
}
