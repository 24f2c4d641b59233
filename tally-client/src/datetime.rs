//! Date input parsing and timestamp rendering in a single reference timezone.
//!
//! Every timestamp the client produces carries the same fixed UTC offset, whatever
//! the timezone of the machine it runs on, so events logged from different places
//! compare correctly on the backend. The offset does not observe daylight saving.

use eyre::{eyre, Result};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// UTC+03:00.
pub const DEFAULT_OFFSET_MINUTES: i32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceClock {
    offset: UtcOffset,
}

impl Default for ReferenceClock {
    fn default() -> Self {
        Self {
            offset: UtcOffset::from_whole_seconds(DEFAULT_OFFSET_MINUTES * 60)
                .unwrap_or(UtcOffset::UTC),
        }
    }
}

impl ReferenceClock {
    pub fn new(offset_minutes: i32) -> Result<Self> {
        let seconds = offset_minutes
            .checked_mul(60)
            .ok_or_else(|| eyre!("Invalid reference offset {offset_minutes} minutes"))?;
        let offset = UtcOffset::from_whole_seconds(seconds)
            .map_err(|e| eyre!("Invalid reference offset {offset_minutes} minutes: {e}"))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Current instant, expressed in the reference offset.
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    /// Strict `dd/mm/yyyy`, read as midnight in the reference timezone.
    pub fn parse_date_input(&self, value: &str) -> Option<OffsetDateTime> {
        let date = parse_date(value.trim())?;
        Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(self.offset))
    }

    /// Strict `dd/mm/yyyy HH:MM` (a `T` separator is accepted too), read as
    /// wall-clock time in the reference timezone.
    pub fn parse_date_time_input(&self, value: &str) -> Option<OffsetDateTime> {
        let (date, clock) = value.trim().split_once([' ', 'T'])?;
        let date = parse_date(date)?;

        let (hour, minute) = clock.split_once(':')?;
        if hour.len() != 2 || minute.len() != 2 {
            return None;
        }
        let hour = digits(hour)?;
        let minute = digits(minute)?;
        if hour > 23 || minute > 59 {
            return None;
        }
        let time = Time::from_hms(hour as u8, minute as u8, 0).ok()?;

        Some(PrimitiveDateTime::new(date, time).assume_offset(self.offset))
    }

    /// `YYYY-MM-DDTHH:MM:SS+HH:MM` using the reference timezone's wall clock.
    pub fn to_iso_with_offset(&self, instant: OffsetDateTime) -> String {
        let local = instant.to_offset(self.offset);
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}",
            local.year(),
            u8::from(local.month()),
            local.day(),
            local.hour(),
            local.minute(),
            local.second(),
            self.format_offset(),
        )
    }

    pub fn format_date_input(&self, instant: OffsetDateTime) -> String {
        let local = instant.to_offset(self.offset);
        format_date(local.date())
    }

    pub fn format_date_time_input(&self, instant: OffsetDateTime) -> String {
        let local = instant.to_offset(self.offset);
        format!(
            "{} {:02}:{:02}",
            format_date(local.date()),
            local.hour(),
            local.minute()
        )
    }

    /// Monday of the reference-timezone week containing `now`, as `dd/mm/yyyy`.
    pub fn default_week_start(&self, now: OffsetDateTime) -> String {
        let date = now.to_offset(self.offset).date();
        let back = date.weekday().number_days_from_monday() as i64;
        let monday = date
            .checked_sub(time::Duration::days(back))
            .unwrap_or(date);
        format_date(monday)
    }

    /// Value offered when the user turns on backdating.
    pub fn default_backdate(&self, now: OffsetDateTime) -> String {
        self.format_date_time_input(now)
    }

    fn format_offset(&self) -> String {
        let minutes = self.offset.whole_minutes();
        let sign = if minutes >= 0 { '+' } else { '-' };
        let minutes = minutes.unsigned_abs();
        format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

fn format_date(date: Date) -> String {
    format!(
        "{:02}/{:02}/{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

fn digits(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_date(value: &str) -> Option<Date> {
    let mut parts = value.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return None;
    }

    let month = Month::try_from(digits(month)? as u8).ok()?;
    Date::from_calendar_date(digits(year)? as i32, month, digits(day)? as u8).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use time::macros::datetime;

    #[test]
    fn parses_date_as_reference_midnight() {
        let clock = ReferenceClock::default();
        let parsed = clock.parse_date_input("04/03/2024").unwrap();

        assert_eq!(parsed, datetime!(2024-03-03 21:00 UTC));
        assert_eq!(clock.to_iso_with_offset(parsed), "2024-03-04T00:00:00+03:00");
    }

    #[test]
    fn rejects_invalid_dates() {
        let clock = ReferenceClock::default();
        for input in [
            "31/02/2024",
            "00/01/2020",
            "01/13/2020",
            "1/01/2020",
            "01/01/20",
            "01-01-2020",
            "01/01/2020/01",
            "aa/01/2020",
            "+1/01/2020",
            "",
        ] {
            assert!(clock.parse_date_input(input).is_none(), "{input} parsed");
        }
        assert!(clock.parse_date_input("29/02/2024").is_some());
        assert!(clock.parse_date_input(" 29/02/2024 ").is_some());
    }

    #[test]
    fn parses_date_time() {
        let clock = ReferenceClock::default();
        let parsed = clock.parse_date_time_input("15/06/2024 08:05").unwrap();
        assert_eq!(clock.to_iso_with_offset(parsed), "2024-06-15T08:05:00+03:00");
        assert_eq!(parsed, datetime!(2024-06-15 05:05 UTC));

        let with_t = clock.parse_date_time_input("15/06/2024T08:05").unwrap();
        assert_eq!(with_t, parsed);
    }

    #[test]
    fn rejects_invalid_date_times() {
        let clock = ReferenceClock::default();
        for input in [
            "15/06/2024 24:00",
            "15/06/2024 23:60",
            "15/06/2024 8:05",
            "15/06/2024  08:05",
            "15/06/2024",
            "31/04/2024 10:00",
            "15/06/2024 08:05:00",
        ] {
            assert!(clock.parse_date_time_input(input).is_none(), "{input} parsed");
        }
    }

    #[test]
    fn iso_uses_reference_wall_clock_not_input_offset() {
        let clock = ReferenceClock::default();
        let instant = datetime!(2024-12-31 22:30 -05:00);
        assert_eq!(clock.to_iso_with_offset(instant), "2025-01-01T06:30:00+03:00");
    }

    #[test]
    fn negative_offsets_render() {
        let clock = ReferenceClock::new(-330).unwrap();
        let instant = datetime!(2024-01-01 12:00 UTC);
        assert_eq!(clock.to_iso_with_offset(instant), "2024-01-01T06:30:00-05:30");
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        assert!(ReferenceClock::new(i32::MAX).is_err());
        assert!(ReferenceClock::new(i32::MIN).is_err());
        assert!(ReferenceClock::new(26 * 60).is_err());
        assert_eq!(ReferenceClock::new(180).unwrap(), ReferenceClock::default());
    }

    #[test]
    fn week_start_is_reference_monday() {
        let clock = ReferenceClock::default();
        // Sunday 22:00 UTC is already Monday in UTC+3.
        let now = datetime!(2024-03-10 22:00 UTC);
        assert_eq!(clock.default_week_start(now), "11/03/2024");

        let now = datetime!(2024-03-10 20:00 UTC);
        assert_eq!(clock.default_week_start(now), "04/03/2024");
    }

    #[test]
    fn backdate_default_is_reference_wall_clock() {
        let clock = ReferenceClock::default();
        let now = datetime!(2024-03-10 22:15 UTC);
        assert_eq!(clock.default_backdate(now), "11/03/2024 01:15");
    }

    #[quickcheck]
    fn date_input_round_trips(day: u8, month: u8, year: u16) -> TestResult {
        let input = format!("{:02}/{:02}/{:04}", day % 32, month % 13, 1000 + year % 9000);
        let clock = ReferenceClock::default();
        match clock.parse_date_input(&input) {
            Some(parsed) => TestResult::from_bool(clock.format_date_input(parsed) == input),
            None => TestResult::discard(),
        }
    }
}
