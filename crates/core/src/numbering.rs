//! Business numbers for projects and contracts.
//!
//! Numbers look like `PRJ20240305` followed by four digits taken from the
//! sub-second clock. Uniqueness is enforced by the database; callers retry
//! or surface the conflict.

use chrono::{DateTime, Utc};

pub const PROJECT_PREFIX: &str = "PRJ";
pub const CONTRACT_PREFIX: &str = "CON";

/// Generate a number with the given prefix for the instant `now`.
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    format!(
        "{prefix}{}{:04}",
        now.format("%Y%m%d"),
        now.timestamp_subsec_nanos() % 10_000
    )
}

pub fn project_no(now: DateTime<Utc>) -> String {
    generate(PROJECT_PREFIX, now)
}

pub fn contract_no(now: DateTime<Utc>) -> String {
    generate(CONTRACT_PREFIX, now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn number_embeds_date_and_four_digits() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(project_no(now), "PRJ202403056789");
        assert_eq!(contract_no(now), "CON202403056789");
    }

    #[test]
    fn suffix_is_zero_padded() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(7);
        assert_eq!(project_no(now), "PRJ202401010007");
    }
}
