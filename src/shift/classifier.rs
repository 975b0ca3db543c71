use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Check-ins more than this far ahead of the scheduled start are flagged
/// EARLY: that far out it is likely the tail of a *different* shift
/// bleeding into the window, and should be reviewed rather than silently
/// counted on time.
pub const EARLY_WINDOW_MINUTES: i64 = 120;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Early,
    OnTime,
    Late,
    /// No check-in recorded for the shift; assigned by the admin record
    /// surface, never by [`classify`].
    Absent,
    /// Checked in but never out by the end of the shift window; likewise
    /// assigned outside the classifier.
    NoCheckout,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Early => "EARLY",
            AttendanceStatus::OnTime => "ON_TIME",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::NoCheckout => "NO_CHECKOUT",
        }
    }
}

/// Classifies a check-in against the (possibly override-adjusted)
/// scheduled start. Returns only `Early`, `OnTime` or `Late`.
///
/// The grace period extends the deadline once and is inclusive: arriving
/// at exactly `scheduled_start + grace` is still on time. The early check
/// runs first; the two conditions cannot both hold since anything more
/// than [`EARLY_WINDOW_MINUTES`] before the start is necessarily before
/// the deadline.
pub fn classify(
    check_in_at: DateTime<Utc>,
    scheduled_start: DateTime<Utc>,
    grace_minutes: i64,
) -> AttendanceStatus {
    let deadline = scheduled_start + Duration::minutes(grace_minutes);

    if scheduled_start - check_in_at > Duration::minutes(EARLY_WINDOW_MINUTES) {
        return AttendanceStatus::Early;
    }

    if check_in_at > deadline {
        return AttendanceStatus::Late;
    }

    AttendanceStatus::OnTime
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Karachi;
    use std::str::FromStr;

    fn start() -> DateTime<Utc> {
        // 2025-12-12 22:00 in Karachi (UTC+5).
        Karachi
            .with_ymd_and_hms(2025, 12, 12, 22, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn within_grace_is_on_time() {
        let s = start();
        assert_eq!(
            classify(s + Duration::seconds(9 * 60 + 59), s, 10),
            AttendanceStatus::OnTime
        );
    }

    #[test]
    fn deadline_is_inclusive() {
        let s = start();
        assert_eq!(classify(s + Duration::minutes(10), s, 10), AttendanceStatus::OnTime);
    }

    #[test]
    fn one_second_past_deadline_is_late() {
        let s = start();
        assert_eq!(
            classify(s + Duration::seconds(10 * 60 + 1), s, 10),
            AttendanceStatus::Late
        );
    }

    #[test]
    fn exactly_on_the_start_is_on_time() {
        let s = start();
        assert_eq!(classify(s, s, 10), AttendanceStatus::OnTime);
    }

    #[test]
    fn far_ahead_of_start_is_early() {
        let s = start();
        assert_eq!(classify(s - Duration::minutes(121), s, 10), AttendanceStatus::Early);
    }

    #[test]
    fn slightly_ahead_of_start_is_on_time() {
        let s = start();
        assert_eq!(classify(s - Duration::minutes(119), s, 10), AttendanceStatus::OnTime);
        // The 120-minute boundary itself is not "more than" two hours.
        assert_eq!(classify(s - Duration::minutes(120), s, 10), AttendanceStatus::OnTime);
    }

    #[test]
    fn zero_grace_means_any_delay_is_late() {
        let s = start();
        assert_eq!(classify(s + Duration::seconds(1), s, 0), AttendanceStatus::Late);
        assert_eq!(classify(s, s, 0), AttendanceStatus::OnTime);
    }

    #[test]
    fn status_string_round_trips() {
        for status in [
            AttendanceStatus::Early,
            AttendanceStatus::OnTime,
            AttendanceStatus::Late,
            AttendanceStatus::Absent,
            AttendanceStatus::NoCheckout,
        ] {
            assert_eq!(AttendanceStatus::from_str(status.as_str()).unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
