use time::macros::format_description;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

use super::error::TimestampError;

/// Two digit years at or above this are taken to be 19xx
const CENTURY_PIVOT: i32 = 70;

/// Parse the `MM/DD/YY` (or `MM/DD/YYYY`) dates written by the g software
pub fn parse_us_date(text: &str) -> Result<Date, TimestampError> {
    let bad = || TimestampError::BadDate(text.to_string());
    let parts: Vec<&str> = text.trim().split('/').collect();
    if parts.len() != 3 {
        return Err(bad());
    }
    let month: u8 = parts[0].parse().map_err(|_| bad())?;
    let day: u8 = parts[1].parse().map_err(|_| bad())?;
    let mut year: i32 = parts[2].parse().map_err(|_| bad())?;
    if parts[2].len() <= 2 {
        year += if year >= CENTURY_PIVOT { 1900 } else { 2000 };
    }
    let month = Month::try_from(month).map_err(|_| bad())?;
    Date::from_calendar_date(year, month, day).map_err(|_| bad())
}

/// Parse an `HH:MM:SS` time of day. Fractional seconds are truncated.
pub fn parse_time_of_day(text: &str) -> Result<Time, TimestampError> {
    let bad = || TimestampError::BadTime(text.to_string());
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(bad());
    }
    let hour: u8 = parts[0].parse().map_err(|_| bad())?;
    let minute: u8 = parts[1].parse().map_err(|_| bad())?;
    let second: f64 = parts[2].parse().map_err(|_| bad())?;
    if !(0.0..60.0).contains(&second) {
        return Err(bad());
    }
    Time::from_hms(hour, minute, second as u8).map_err(|_| bad())
}

/// Parse an ISO-ish date, `YYYY-MM-DD`
pub fn parse_iso_date(text: &str) -> Result<Date, TimestampError> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| TimestampError::BadDate(text.to_string()))
}

/// Parse the logger timestamps, either `YYYY/MM/DD HH:MM:SS` or `YYYY-MM-DD HH:MM:SS`
pub fn parse_log_timestamp(text: &str) -> Result<PrimitiveDateTime, TimestampError> {
    let text = text.trim();
    PrimitiveDateTime::parse(
        text,
        format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
    })
    .map_err(|_| TimestampError::BadTimestamp(text.to_string()))
}

/// `YYYY-MM-DD`, used when building file names
pub fn format_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day())
}

/// An inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Date,
    pub end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Mean of a set of timestamps.
///
/// The offsets from the earliest timestamp are averaged and added back onto it, so
/// no absolute time is ever summed. Returns None for an empty set.
pub fn mean_timestamp<I>(times: I) -> Option<PrimitiveDateTime>
where
    I: IntoIterator<Item = PrimitiveDateTime>,
{
    let times: Vec<PrimitiveDateTime> = times.into_iter().collect();
    let start = *times.iter().min()?;
    let total_ms: i128 = times
        .iter()
        .map(|t| (*t - start).whole_milliseconds())
        .sum();
    let mean_ms = total_ms / times.len() as i128;
    Some(start + Duration::milliseconds(mean_ms as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn test_us_date_two_digit_year() {
        assert_eq!(parse_us_date("08/19/18").unwrap(), date!(2018 - 08 - 19));
        assert_eq!(parse_us_date("12/31/99").unwrap(), date!(1999 - 12 - 31));
        assert_eq!(parse_us_date("1/2/2021").unwrap(), date!(2021 - 01 - 02));
        assert!(parse_us_date("13/01/18").is_err());
        assert!(parse_us_date("garbage").is_err());
    }

    #[test]
    fn test_time_of_day() {
        assert_eq!(parse_time_of_day("09:05:30").unwrap(), time!(09:05:30));
        assert_eq!(parse_time_of_day("9:05:30.75").unwrap(), time!(09:05:30));
        assert!(parse_time_of_day("25:00:00").is_err());
    }

    #[test]
    fn test_log_timestamp_formats() {
        let expected = datetime!(2018-08-19 13:50:00);
        assert_eq!(parse_log_timestamp("2018/08/19 13:50:00").unwrap(), expected);
        assert_eq!(parse_log_timestamp(" 2018-08-19 13:50:00 ").unwrap(), expected);
        assert!(parse_log_timestamp("19/08/2018").is_err());
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let window = DateWindow::new(date!(2018 - 08 - 01), date!(2018 - 08 - 31));
        assert!(window.contains(date!(2018 - 08 - 01)));
        assert!(window.contains(date!(2018 - 08 - 31)));
        assert!(!window.contains(date!(2018 - 09 - 01)));
        assert!(!window.contains(date!(2018 - 07 - 31)));
    }

    #[test]
    fn test_mean_timestamp() {
        let times = [
            datetime!(2018-08-19 09:00:00),
            datetime!(2018-08-19 09:05:00),
            datetime!(2018-08-19 09:10:00),
        ];
        assert_eq!(
            mean_timestamp(times.iter().copied()),
            Some(datetime!(2018-08-19 09:05:00))
        );
        assert_eq!(mean_timestamp(Vec::new()), None);
    }
}
