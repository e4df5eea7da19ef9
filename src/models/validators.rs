use std::{borrow::Cow, sync::LazyLock};

use chrono::{NaiveDate, Utc};
use regex::Regex;
use validator::ValidationError;

/// Phone numbers are stored as bare digits.
/// Examples: "5551234567", "447700900123"
pub static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10,15}$").unwrap());

/// Reject whitespace-only text that would otherwise satisfy a length rule.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::Borrowed("Value cannot be empty or whitespace-only"));
        return Err(err);
    }
    Ok(())
}

/// Dates of birth must not lie in the future.
pub fn validate_date_of_birth(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        let mut err = ValidationError::new("date_of_birth_in_future");
        err.message = Some(Cow::Borrowed("Date of birth cannot be in the future"));
        return Err(err);
    }
    Ok(())
}
