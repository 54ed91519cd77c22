use chrono::{Datelike, NaiveDate};
use serde_json::Value;

/// Holder names are accepted when strictly longer than this
const HOLDER_MIN_EXCLUSIVE: usize = 2;
/// and strictly shorter than this
const HOLDER_MAX_EXCLUSIVE: usize = 100;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid card number")]
    InvalidCardNumber,

    #[error("Holder name must be more than 2 characters and less than 100 characters")]
    InvalidHolder,

    #[error("The expiration date must be a month/year that has not already passed")]
    InvalidExpirationDate,

    #[error("Invalid cvv")]
    InvalidCvv,
}

/// Validates the holder name on the creation path
pub fn validate_holder(raw: &Value) -> Result<String, ValidationError> {
    holder_within_bounds(raw)
}

/// Validates the holder name carried by an update request
pub fn validate_holder_update(raw: &Value) -> Result<String, ValidationError> {
    holder_within_bounds(raw)
}

fn holder_within_bounds(raw: &Value) -> Result<String, ValidationError> {
    match raw {
        Value::String(holder) => {
            let len = holder.chars().count();
            if len > HOLDER_MIN_EXCLUSIVE && len < HOLDER_MAX_EXCLUSIVE {
                Ok(holder.clone())
            } else {
                Err(ValidationError::InvalidHolder)
            }
        }
        _ => Err(ValidationError::InvalidHolder),
    }
}

/// Validates an expiration given as `MM/YYYY` (or `M/YYYY`).
///
/// Returns the last calendar day of that month, which must not be earlier
/// than `today`.
pub fn validate_expiration(raw: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let (month, year) = parse_month_year(raw).ok_or(ValidationError::InvalidExpirationDate)?;
    let last_day = last_day_of_month(year, month).ok_or(ValidationError::InvalidExpirationDate)?;

    if last_day < today {
        return Err(ValidationError::InvalidExpirationDate);
    }

    Ok(last_day)
}

fn parse_month_year(raw: &str) -> Option<(u32, i32)> {
    let (month, year) = raw.trim().split_once('/')?;

    if month.is_empty() || month.len() > 2 || !month.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    (1..=12).contains(&month).then_some((month, year))
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let first_of_next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}

/// Validates an optional CVV.
///
/// Missing, `null`, `false`, `0` and `""` all mean "no CVV". Anything else
/// must be a JSON integer with 3 or 4 decimal digits.
pub fn validate_cvv(raw: Option<&Value>) -> Result<Option<i32>, ValidationError> {
    let Some(value) = raw else {
        return Ok(None);
    };

    match value {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(None),
            Some(cvv) if (100..=9999).contains(&cvv) => Ok(Some(cvv as i32)),
            _ => Err(ValidationError::InvalidCvv),
        },
        _ => Err(ValidationError::InvalidCvv),
    }
}
