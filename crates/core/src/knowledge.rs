//! Knowledge-base item rules: status values and version numbering.

use crate::error::CoreError;

pub const STATUS_PUBLISHED: &str = "published";
pub const STATUS_DRAFT: &str = "draft";

pub const INITIAL_VERSION: &str = "1.0";

/// Minor versions roll over into the major at this value.
const MINOR_ROLLOVER: u32 = 10;

pub fn validate_status(status: &str) -> Result<(), CoreError> {
    match status {
        STATUS_PUBLISHED | STATUS_DRAFT => Ok(()),
        other => Err(CoreError::Validation(format!(
            "Invalid knowledge status '{other}'. Must be one of: published, draft"
        ))),
    }
}

/// Bump a `major.minor` version string: `1.0 -> 1.1`, `1.9 -> 2.0`.
///
/// Unparseable components count as zero.
pub fn next_version(current: &str) -> String {
    let mut parts = current.trim().splitn(2, '.');
    let major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

    let minor = minor + 1;
    if minor >= MINOR_ROLLOVER {
        format!("{}.0", major + 1)
    } else {
        format!("{major}.{minor}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_increments() {
        assert_eq!(next_version("1.0"), "1.1");
        assert_eq!(next_version("2.4"), "2.5");
    }

    #[test]
    fn minor_rolls_over_at_ten() {
        assert_eq!(next_version("1.9"), "2.0");
    }

    #[test]
    fn garbage_version_restarts_from_zero() {
        assert_eq!(next_version("draft"), "0.1");
        assert_eq!(next_version(""), "0.1");
    }

    #[test]
    fn only_known_statuses_validate() {
        assert!(validate_status("published").is_ok());
        assert!(validate_status("draft").is_ok());
        assert!(validate_status("hidden").is_err());
    }
}
