use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CreditCard {
    pub id: i64,
    pub holder: String,
    pub number: String, // SHA-256 token, never the card number
    pub exp_date: NaiveDate,
    pub cvv: Option<i32>,
    pub brand: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for CreditCard {
    const TABLE: &'static str = "credit_cards";
    const UNIQUE: &'static [&'static str] = &["number"];

    fn id(&self) -> i64 {
        self.id
    }
}
