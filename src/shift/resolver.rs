use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use super::schedule::{Schedule, TimeOfDay};

/// The shift occurrence an instant belongs to: its calendar date in the
/// schedule's timezone, and the absolute instant its check-in is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftResolution {
    pub shift_date: NaiveDate,
    pub scheduled_start: DateTime<Utc>,
}

/// Maps an instant to its shift occurrence.
///
/// The instant is first decomposed into wall-clock date and time in the
/// schedule's zone (tz-database rules, so DST-observing zones come out
/// right). For an overnight shift, wall times before the check-out time
/// still belong to the shift that started the previous evening, so the
/// calendar date is stepped back by one day; same-day shifts always keep
/// the wall-clock date.
pub fn resolve_shift(instant: DateTime<Utc>, schedule: &Schedule) -> ShiftResolution {
    let local = instant.with_timezone(&schedule.tz);
    let wall_date = local.date_naive();
    let wall_time = TimeOfDay {
        hour: local.hour() as u8,
        minute: local.minute() as u8,
    };

    let shift_date = if schedule.is_overnight() && wall_time < schedule.check_out {
        // Calendar-aware step, never "minus 24 hours": a naive hour
        // subtraction is off by one across a DST transition.
        wall_date.pred_opt().unwrap_or(wall_date)
    } else {
        wall_date
    };

    ShiftResolution {
        shift_date,
        scheduled_start: scheduled_start(shift_date, schedule.check_in, schedule.tz),
    }
}

/// Absolute instant at which the shift on `shift_date` is due to begin.
///
/// Also the substitution point for one-day overrides: resolve the shift
/// date with the base schedule first, then recompute the start from the
/// override's check-in time.
pub fn scheduled_start(shift_date: NaiveDate, check_in: TimeOfDay, tz: Tz) -> DateTime<Utc> {
    localize(tz, shift_date.and_time(check_in.to_naive())).with_timezone(&Utc)
}

/// Wall-clock to instant under tz-database rules. A time repeated by a
/// backward DST jump resolves to its first occurrence; a time skipped by
/// a forward jump resolves to the first valid instant after the gap.
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Karachi;
    use chrono_tz::Europe::Berlin;

    fn overnight() -> Schedule {
        Schedule::parse("22:00", "06:00", "Asia/Karachi").unwrap()
    }

    fn nine_to_five() -> Schedule {
        Schedule::parse("09:00", "17:00", "Asia/Karachi").unwrap()
    }

    fn karachi(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Karachi
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn overnight_evening_belongs_to_current_date() {
        let r = resolve_shift(karachi(2025, 12, 12, 23, 5), &overnight());
        assert_eq!(r.shift_date, date(2025, 12, 12));
        assert_eq!(r.scheduled_start, karachi(2025, 12, 12, 22, 0));
    }

    #[test]
    fn overnight_early_morning_belongs_to_previous_date() {
        let r = resolve_shift(karachi(2025, 12, 13, 0, 30), &overnight());
        assert_eq!(r.shift_date, date(2025, 12, 12));
        assert_eq!(r.scheduled_start, karachi(2025, 12, 12, 22, 0));
    }

    #[test]
    fn overnight_after_checkout_starts_a_new_date() {
        let r = resolve_shift(karachi(2025, 12, 13, 7, 0), &overnight());
        assert_eq!(r.shift_date, date(2025, 12, 13));
        assert_eq!(r.scheduled_start, karachi(2025, 12, 13, 22, 0));
    }

    #[test]
    fn checkout_minute_itself_opens_the_next_date() {
        // 06:00 sharp is no longer "before check-out".
        let r = resolve_shift(karachi(2025, 12, 13, 6, 0), &overnight());
        assert_eq!(r.shift_date, date(2025, 12, 13));
    }

    #[test]
    fn same_shift_span_maps_to_one_key() {
        // Every instant from the scheduled start until the check-out
        // boundary next morning lands on the same shift date.
        let spans = [
            karachi(2025, 12, 12, 22, 0),
            karachi(2025, 12, 12, 23, 59),
            karachi(2025, 12, 13, 0, 0),
            karachi(2025, 12, 13, 3, 17),
            karachi(2025, 12, 13, 5, 59),
        ];
        for instant in spans {
            let r = resolve_shift(instant, &overnight());
            assert_eq!(r.shift_date, date(2025, 12, 12), "instant {instant}");
            assert_eq!(r.scheduled_start, karachi(2025, 12, 12, 22, 0));
        }
    }

    #[test]
    fn same_day_shift_never_steps_back() {
        for (h, mi) in [(8, 0), (9, 5), (16, 59)] {
            let r = resolve_shift(karachi(2025, 6, 1, h, mi), &nine_to_five());
            assert_eq!(r.shift_date, date(2025, 6, 1));
            assert_eq!(r.scheduled_start, karachi(2025, 6, 1, 9, 0));
        }
    }

    #[test]
    fn month_rollover_steps_into_previous_month() {
        let r = resolve_shift(karachi(2025, 12, 1, 1, 0), &overnight());
        assert_eq!(r.shift_date, date(2025, 11, 30));
    }

    #[test]
    fn year_rollover_steps_into_previous_year() {
        let r = resolve_shift(karachi(2026, 1, 1, 2, 0), &overnight());
        assert_eq!(r.shift_date, date(2025, 12, 31));
    }

    #[test]
    fn midnight_boundary_times_are_valid() {
        // 00:00 -> 08:00 reads as check_out > check_in, plain same-day.
        // 23:00 -> 00:30 is the overnight case with a midnight-adjacent
        // check-out.
        let s = Schedule::parse("23:00", "00:30", "Asia/Karachi").unwrap();
        assert!(s.is_overnight());

        let r = resolve_shift(karachi(2025, 3, 10, 0, 10), &s);
        assert_eq!(r.shift_date, date(2025, 3, 9));

        let r = resolve_shift(karachi(2025, 3, 10, 0, 45), &s);
        assert_eq!(r.shift_date, date(2025, 3, 10));
    }

    #[test]
    fn round_trip_of_scheduled_start_keeps_the_key() {
        for schedule in [overnight(), nine_to_five()] {
            let r = resolve_shift(karachi(2025, 12, 12, 23, 0), &schedule);
            let again = resolve_shift(r.scheduled_start, &schedule);
            assert_eq!(again.shift_date, r.shift_date);
            assert_eq!(again.scheduled_start, r.scheduled_start);
        }
    }

    #[test]
    fn dst_zone_uses_real_offsets() {
        // Berlin is UTC+1 in winter and UTC+2 in summer; a fixed offset
        // would misplace one of these.
        let s = Schedule::parse("22:00", "06:00", "Europe/Berlin").unwrap();

        let winter = Berlin
            .with_ymd_and_hms(2025, 1, 10, 2, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(resolve_shift(winter, &s).shift_date, date(2025, 1, 9));

        let summer = Berlin
            .with_ymd_and_hms(2025, 7, 10, 2, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(resolve_shift(summer, &s).shift_date, date(2025, 7, 9));
    }

    #[test]
    fn dst_forward_jump_day_is_calendar_stepped() {
        // Berlin springs forward on 2025-03-30; the night shift spanning
        // it is 23 hours long, but the early-morning instants still step
        // back exactly one calendar day.
        let s = Schedule::parse("22:00", "06:00", "Europe/Berlin").unwrap();
        let during = Berlin
            .with_ymd_and_hms(2025, 3, 30, 4, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let r = resolve_shift(during, &s);
        assert_eq!(r.shift_date, date(2025, 3, 29));
        assert_eq!(
            r.scheduled_start,
            Berlin
                .with_ymd_and_hms(2025, 3, 29, 22, 0, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[test]
    fn start_inside_dst_gap_lands_after_the_gap() {
        // 02:30 does not exist in Berlin on 2025-03-30; the scheduled
        // start resolves to the first valid instant after the jump.
        let t = TimeOfDay::parse("02:30").unwrap();
        let start = scheduled_start(date(2025, 3, 30), t, Berlin);
        assert_eq!(
            start,
            Berlin
                .with_ymd_and_hms(2025, 3, 30, 3, 30, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[test]
    fn override_time_moves_a_single_start() {
        let s = Schedule::parse("21:00", "05:00", "Asia/Karachi").unwrap();
        let r = resolve_shift(karachi(2025, 12, 12, 21, 30), &s);
        assert_eq!(r.scheduled_start, karachi(2025, 12, 12, 21, 0));

        let new_time = TimeOfDay::parse("23:00").unwrap();
        let adjusted = scheduled_start(r.shift_date, new_time, s.tz);
        assert_eq!(adjusted, karachi(2025, 12, 12, 23, 0));
        assert_eq!(adjusted - r.scheduled_start, Duration::hours(2));

        // Other occurrences are untouched: the next day still starts 21:00.
        let next = resolve_shift(karachi(2025, 12, 13, 21, 30), &s);
        assert_eq!(next.scheduled_start, karachi(2025, 12, 13, 21, 0));
    }
}
