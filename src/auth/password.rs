//! Password lifecycle: Fresh -> ReminderDue [25,30) days -> Expired [>=30).
//!
//! Transition back to Fresh happens only through reset-password or
//! update-password, which stamp `last_password_update`.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStatus {
    Fresh,
    /// Within the reminder window; a reminder mail is attempted per request.
    ReminderDue { days_left: i64 },
    Expired,
}

/// Whole days elapsed since the last password update (floor division).
pub fn password_age_days(last_update: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_update).num_days()
}

pub fn password_status(last_update: DateTime<Utc>, now: DateTime<Utc>) -> PasswordStatus {
    let cfg = &crate::config::config().security;
    status_with_policy(last_update, now, cfg.password_reminder_days, cfg.password_expiry_days)
}

pub fn status_with_policy(
    last_update: DateTime<Utc>,
    now: DateTime<Utc>,
    reminder_days: i64,
    expiry_days: i64,
) -> PasswordStatus {
    let age = password_age_days(last_update, now);
    if age >= expiry_days {
        PasswordStatus::Expired
    } else if age >= reminder_days {
        PasswordStatus::ReminderDue { days_left: expiry_days - age }
    } else {
        PasswordStatus::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn status_at(days_ago: i64) -> PasswordStatus {
        let now = Utc::now();
        status_with_policy(now - Duration::days(days_ago), now, 25, 30)
    }

    #[test]
    fn fresh_until_reminder_window() {
        assert_eq!(status_at(0), PasswordStatus::Fresh);
        assert_eq!(status_at(24), PasswordStatus::Fresh);
    }

    #[test]
    fn reminder_window_is_25_to_29_days() {
        assert_eq!(status_at(25), PasswordStatus::ReminderDue { days_left: 5 });
        assert_eq!(status_at(29), PasswordStatus::ReminderDue { days_left: 1 });
    }

    #[test]
    fn expired_at_30_days_and_beyond() {
        assert_eq!(status_at(30), PasswordStatus::Expired);
        assert_eq!(status_at(31), PasswordStatus::Expired);
        assert_eq!(status_at(365), PasswordStatus::Expired);
    }

    #[test]
    fn reminder_recurs_on_every_check_in_the_window() {
        // Status is computed from stored state alone, so every request inside
        // the window qualifies for a reminder attempt, not just the first
        for _ in 0..3 {
            assert_eq!(status_at(26), PasswordStatus::ReminderDue { days_left: 4 });
        }
    }

    #[test]
    fn age_uses_floor_division() {
        let now = Utc::now();
        // 29 days and 23 hours is still 29 whole days
        let last = now - Duration::days(29) - Duration::hours(23);
        assert_eq!(password_age_days(last, now), 29);
        assert_eq!(status_with_policy(last, now, 25, 30), PasswordStatus::ReminderDue { days_left: 1 });
    }
}
