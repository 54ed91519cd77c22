use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{FieldValue, Fields, IntoFields};
use crate::services::card_number::{validate_card_number, CardBrand};
use crate::services::tokenizer::tokenize;
use crate::services::validators::{
    validate_cvv, validate_expiration, validate_holder, validate_holder_update, ValidationError,
};

/// Raw body of a create request.
///
/// `holder` and `cvv` stay as JSON values so that wrong types surface as
/// validation errors instead of deserialization failures. A client supplied
/// `brand` (or any other unknown key) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditCardInput {
    #[serde(default)]
    pub holder: Value,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub exp_date: String,
    #[serde(default)]
    pub cvv: Option<Value>,
}

/// Raw body of an update request. Only `holder` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditCardUpdateInput {
    #[serde(default)]
    pub holder: Value,
}

/// A fully validated card, number already tokenized, ready for insert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCardSchema {
    pub holder: String,
    pub number: String,
    pub exp_date: NaiveDate,
    pub cvv: Option<i32>,
    pub brand: CardBrand,
}

impl CreditCardSchema {
    /// Validates every field of a create request and tokenizes the number.
    ///
    /// Checks run number, expiration, cvv, holder and stop at the first
    /// failure. Nothing here touches the store.
    pub fn assemble(input: CreditCardInput, today: NaiveDate) -> Result<Self, ValidationError> {
        let card_number = validate_card_number(&input.number)?;
        let exp_date = validate_expiration(&input.exp_date, today)?;
        let cvv = validate_cvv(input.cvv.as_ref())?;
        let holder = validate_holder(&input.holder)?;

        Ok(Self {
            holder,
            number: tokenize(card_number.digits()),
            exp_date,
            cvv,
            brand: card_number.brand(),
        })
    }
}

impl IntoFields for CreditCardSchema {
    fn into_fields(self) -> Fields {
        vec![
            ("holder", FieldValue::Text(self.holder)),
            ("number", FieldValue::Text(self.number)),
            ("exp_date", FieldValue::Date(self.exp_date)),
            ("cvv", FieldValue::Int(self.cvv)),
            ("brand", FieldValue::Text(self.brand.as_str().to_string())),
        ]
    }
}

/// The only thing an update may change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditCardUpdateSchema {
    pub holder: String,
}

impl CreditCardUpdateSchema {
    pub fn assemble(input: CreditCardUpdateInput) -> Result<Self, ValidationError> {
        Ok(Self {
            holder: validate_holder_update(&input.holder)?,
        })
    }
}

impl IntoFields for CreditCardUpdateSchema {
    fn into_fields(self) -> Fields {
        vec![("holder", FieldValue::Text(self.holder))]
    }
}
