use bson::DateTime;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lumdash_db::models::Table;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("End date {end} is before start date {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("Quantity must be at least 1")]
    ZeroQuantity,
    #[error("Event has no gear check-out/check-in dates")]
    MissingEventDates,
}

/// Parses a calendar day from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps keep the calendar day they were written in, so
/// `2024-05-01T23:30:00-05:00` and `2024-05-01T08:00:00+09:00` both mean
/// May 1st.
pub fn parse_day(input: &str) -> Result<NaiveDate, ReservationError> {
    let value = input.trim();

    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    if let Ok(timestamp) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.date_naive());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.date());
    }

    Err(ReservationError::InvalidDate(input.to_string()))
}

/// UTC midnight of `day`.
pub fn day_start(day: NaiveDate) -> DateTime {
    DateTime::from_chrono(day.and_time(NaiveTime::MIN).and_utc())
}

pub fn day_of(value: DateTime) -> NaiveDate {
    value.to_chrono().date_naive()
}

pub fn format_day(value: DateTime) -> String {
    day_of(value).format("%Y-%m-%d").to_string()
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReservationError> {
        if end < start {
            return Err(ReservationError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ReservationError> {
        Self::new(parse_day(start)?, parse_day(end)?)
    }

    /// Builds a range from stored timestamps. Stored data is trusted to be
    /// ordered, but a swapped pair is still read as the span it covers.
    pub fn from_stored(start: DateTime, end: DateTime) -> Self {
        let (a, b) = (day_of(start), day_of(end));
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn overlaps(&self, other: &DayRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn stored_start(&self) -> DateTime {
        day_start(self.start)
    }

    pub fn stored_end(&self) -> DateTime {
        day_start(self.end)
    }
}

/// Gear window of an event: the explicit gear dates, falling back to the
/// event's general start/end.
pub fn event_window(table: &Table) -> Result<DayRange, ReservationError> {
    if let (Some(out), Some(back)) = (table.gear.check_out_date, table.gear.check_in_date) {
        return DayRange::new(day_of(out), day_of(back));
    }

    match (&table.general.start, &table.general.end) {
        (Some(start), Some(end)) => DayRange::parse(start, end),
        (Some(start), None) => {
            let day = parse_day(start)?;
            DayRange::new(day, day)
        }
        _ => Err(ReservationError::MissingEventDates),
    }
}
