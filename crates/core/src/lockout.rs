//! Failed-login lockout rules.

use chrono::Duration;

use crate::types::Timestamp;

/// Consecutive failed attempts that lock an account.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// How long a locked account stays locked.
pub const LOCK_DURATION_MINS: i64 = 30;

/// Whether the account is locked at `now`.
pub fn is_locked(locked_until: Option<Timestamp>, now: Timestamp) -> bool {
    locked_until.is_some_and(|until| until > now)
}

/// When a lock taken at `now` expires.
pub fn lock_expiry(now: Timestamp) -> Timestamp {
    now + Duration::minutes(LOCK_DURATION_MINS)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn lock_lasts_thirty_minutes() {
        let now = Utc::now();
        assert_eq!(lock_expiry(now) - now, Duration::minutes(30));
    }

    #[test]
    fn lock_expires() {
        let now = Utc::now();
        let until = now + Duration::minutes(30);
        assert!(is_locked(Some(until), now));
        assert!(!is_locked(Some(until), until + Duration::seconds(1)));
        assert!(!is_locked(None, now));
    }
}
