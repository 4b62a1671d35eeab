//! Client-side form checks, run before any request is made.

use chrono::NaiveDate;
use thiserror::Error;

use crate::api::PatientFields;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("birth date {0} is in the future")]
    FutureBirthDate(NaiveDate),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("password must be at least 8 characters")]
    PasswordTooShort,
    #[error("passwords do not match")]
    PasswordMismatch,
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
/// Returns [`ValidationError::InvalidDate`] when the value does not parse.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_err| ValidationError::InvalidDate(value.trim().to_string()))
}

/// Validates the patient form. Names are trimmed; the birth date must parse
/// and must not be after `today`.
///
/// # Errors
/// Returns the first failing check.
pub fn patient_fields(
    first_name: &str,
    last_name: &str,
    birth_date: &str,
    today: NaiveDate,
) -> Result<PatientFields, ValidationError> {
    let first_name = required(first_name, "first name")?;
    let last_name = required(last_name, "last name")?;
    let birth = required(birth_date, "birth date")?;
    let parsed = parse_date(&birth)?;
    if parsed > today {
        return Err(ValidationError::FutureBirthDate(parsed));
    }

    Ok(PatientFields {
        first_name,
        last_name,
        birth_date: parsed.format("%Y-%m-%d").to_string(),
    })
}

/// Minimal shape check: something on both sides of a single `@`, and a dot
/// in the domain.
///
/// # Errors
/// Returns [`ValidationError`] for blank or malformed addresses.
pub fn email(value: &str) -> Result<String, ValidationError> {
    let value = required(value, "email")?;
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.ends_with('.')
    });
    if valid {
        Ok(value)
    } else {
        Err(ValidationError::InvalidEmail(value))
    }
}

/// Checks a new password against its confirmation.
///
/// # Errors
/// Returns [`ValidationError`] when too short or mismatched.
pub fn new_password(new: &str, confirm: &str) -> Result<(), ValidationError> {
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if new != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
