//! Input validation shared by the user, project and expense endpoints.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use validator::ValidateEmail;

use crate::error::CoreError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Departments a user may belong to.
pub const ALLOWED_DEPARTMENTS: &[&str] = &["BMS研发部", "PACK研发部", "综合部", "外部单位"];

/// Date format used on the wire (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9\- ]{5,19}$").expect("valid regex"));

/// Require a non-blank string, returning it trimmed.
pub fn required(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        CoreError::Validation(format!("Invalid date '{raw}'. Expected format YYYY-MM-DD"))
    })
}

/// Parse an optional date, treating blank as absent.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, CoreError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some),
    }
}

/// Passwords need at least [`MIN_PASSWORD_LENGTH`] characters and one each of
/// upper case, lower case, digit and symbol.
pub fn validate_password_complexity(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if !(has_upper && has_lower && has_digit && has_symbol) {
        return Err(CoreError::Validation(
            "Password must contain upper case, lower case, digit and special characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_department(department: &str) -> Result<(), CoreError> {
    if ALLOWED_DEPARTMENTS.contains(&department) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid department '{department}'. Must be one of: {}",
            ALLOWED_DEPARTMENTS.join(", ")
        )))
    }
}

/// Blank email is allowed; anything else must be well-formed.
pub fn validate_optional_email(email: Option<&str>) -> Result<(), CoreError> {
    match email.map(str::trim) {
        None | Some("") => Ok(()),
        Some(e) if e.validate_email() => Ok(()),
        Some(e) => Err(CoreError::Validation(format!("Invalid email address '{e}'"))),
    }
}

/// Blank phone is allowed; anything else must look like a phone number.
pub fn validate_optional_phone(phone: Option<&str>) -> Result<(), CoreError> {
    match phone.map(str::trim) {
        None | Some("") => Ok(()),
        Some(p) if PHONE_RE.is_match(p) => Ok(()),
        Some(p) => Err(CoreError::Validation(format!("Invalid phone number '{p}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(validate_password_complexity("Admin@123").is_ok());
    }

    #[test]
    fn short_password_fails() {
        let err = validate_password_complexity("A@1a").unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }

    #[test]
    fn password_missing_a_class_fails() {
        assert!(validate_password_complexity("admin@123").is_err(), "no upper");
        assert!(validate_password_complexity("ADMIN@123").is_err(), "no lower");
        assert!(validate_password_complexity("Admin@abc").is_err(), "no digit");
        assert!(validate_password_complexity("Admin1234").is_err(), "no symbol");
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("29/02/2024").is_err());
        assert_eq!(parse_optional_date(Some("  ")).unwrap(), None);
    }

    #[test]
    fn departments_are_a_closed_list() {
        assert!(validate_department("综合部").is_ok());
        assert!(validate_department("Sales").is_err());
    }

    #[test]
    fn contact_fields_are_optional_but_checked() {
        assert!(validate_optional_email(None).is_ok());
        assert!(validate_optional_email(Some("dev@example.com")).is_ok());
        assert!(validate_optional_email(Some("not-an-email")).is_err());
        assert!(validate_optional_phone(Some("138-0000-0000")).is_ok());
        assert!(validate_optional_phone(Some("call me")).is_err());
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Pack  ").unwrap(), "Pack");
        assert!(required("name", "   ").is_err());
    }
}
