use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use chrono_tz::Tz;
use thiserror::Error;

/// Rejected schedule input. Raised synchronously; the HTTP layer decides
/// whether it becomes a 400 (user-supplied value) or a 500 (corrupt row).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid time of day `{0}`, expected HH:mm")]
    InvalidTimeOfDay(String),
    #[error("hour {0} out of range 0-23")]
    HourOutOfRange(u32),
    #[error("minute {0} out of range 0-59")]
    MinuteOutOfRange(u32),
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),
    #[error("check-in and check-out times must differ")]
    EqualCheckTimes,
}

/// A wall-clock time of day, minute resolution. Ordered by (hour, minute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(ScheduleError::MinuteOutOfRange(minute));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Strict `HH:mm` parse. Anything else is a `ScheduleError`.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let bad = || ScheduleError::InvalidTimeOfDay(s.to_string());

        let (h, m) = s.split_once(':').ok_or_else(bad)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(bad());
        }

        let hour: u32 = h.parse().map_err(|_| bad())?;
        let minute: u32 = m.parse().map_err(|_| bad())?;
        Self::new(hour, minute)
    }

    // Invariant: hour/minute are range-checked at construction, so the
    // chrono conversion cannot fail.
    pub(crate) fn to_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One employee's recurring shift: check-in and check-out times of day in
/// an IANA timezone. Whether the shift spans midnight is implied by the
/// pair; equal times are refused rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub check_in: TimeOfDay,
    pub check_out: TimeOfDay,
    pub tz: Tz,
}

impl Schedule {
    pub fn new(check_in: TimeOfDay, check_out: TimeOfDay, tz: Tz) -> Result<Self, ScheduleError> {
        if check_in == check_out {
            return Err(ScheduleError::EqualCheckTimes);
        }
        Ok(Self {
            check_in,
            check_out,
            tz,
        })
    }

    /// Builds a schedule from raw stored strings (`"21:00"`, `"05:00"`,
    /// `"Asia/Karachi"`).
    pub fn parse(check_in: &str, check_out: &str, tz: &str) -> Result<Self, ScheduleError> {
        let zone: Tz = tz
            .parse()
            .map_err(|_| ScheduleError::UnknownTimezone(tz.to_string()))?;
        Self::new(TimeOfDay::parse(check_in)?, TimeOfDay::parse(check_out)?, zone)
    }

    /// True when the shift runs past midnight (check-out wall time is
    /// earlier than check-in wall time, e.g. 22:00 -> 06:00).
    pub fn is_overnight(&self) -> bool {
        self.check_out < self.check_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Karachi;

    #[test]
    fn parses_valid_times() {
        assert_eq!(TimeOfDay::parse("21:00").unwrap(), TimeOfDay { hour: 21, minute: 0 });
        assert_eq!(TimeOfDay::parse("00:00").unwrap(), TimeOfDay { hour: 0, minute: 0 });
        assert_eq!(TimeOfDay::parse("9:05").unwrap(), TimeOfDay { hour: 9, minute: 5 });
        assert_eq!(TimeOfDay::parse("23:59").unwrap(), TimeOfDay { hour: 23, minute: 59 });
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "21", "21:0", "21:000", "2100", "ab:cd", "21:xx", ":30", "21:"] {
            assert!(
                matches!(TimeOfDay::parse(bad), Err(ScheduleError::InvalidTimeOfDay(_))),
                "expected parse failure for {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert_eq!(TimeOfDay::parse("24:00"), Err(ScheduleError::HourOutOfRange(24)));
        assert_eq!(TimeOfDay::parse("99:00"), Err(ScheduleError::HourOutOfRange(99)));
        assert_eq!(TimeOfDay::parse("12:60"), Err(ScheduleError::MinuteOutOfRange(60)));
    }

    #[test]
    fn ordering_is_by_hour_then_minute() {
        let a = TimeOfDay::parse("05:30").unwrap();
        let b = TimeOfDay::parse("05:31").unwrap();
        let c = TimeOfDay::parse("06:00").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn display_round_trips() {
        let t = TimeOfDay::parse("05:07").unwrap();
        assert_eq!(t.to_string(), "05:07");
        assert_eq!(TimeOfDay::parse(&t.to_string()).unwrap(), t);
    }

    #[test]
    fn overnight_detection() {
        let overnight = Schedule::parse("22:00", "06:00", "Asia/Karachi").unwrap();
        assert!(overnight.is_overnight());

        let same_day = Schedule::parse("09:00", "17:00", "Asia/Karachi").unwrap();
        assert!(!same_day.is_overnight());

        // Midnight check-in with a morning check-out is a plain same-day shift.
        let from_midnight = Schedule::parse("00:00", "08:00", "Asia/Karachi").unwrap();
        assert!(!from_midnight.is_overnight());
    }

    #[test]
    fn equal_times_are_a_configuration_error() {
        let nine = TimeOfDay::parse("09:00").unwrap();
        assert_eq!(
            Schedule::new(nine, nine, Karachi),
            Err(ScheduleError::EqualCheckTimes)
        );
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert_eq!(
            Schedule::parse("09:00", "17:00", "Mars/Olympus"),
            Err(ScheduleError::UnknownTimezone("Mars/Olympus".into()))
        );
    }
}
