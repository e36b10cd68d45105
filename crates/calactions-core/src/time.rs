//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! as the calendar API expresses them, [`EventDateTime`] which pairs a time
//! with its timezone name, and [`TimeWindow`] for defining query ranges.

use std::cmp::Ordering;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Wire format for wall-clock datetimes (no offset).
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Wire format for all-day dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents the time of a calendar event.
///
/// The remote calendar expresses times in three ways:
/// - **DateTime**: an RFC 3339 instant carrying its UTC offset
/// - **Local**: a wall-clock time whose meaning depends on a named timezone
/// - **AllDay**: a date without a specific time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant with its offset.
    DateTime(DateTime<FixedOffset>),
    /// A wall-clock datetime, interpreted in the accompanying timezone.
    Local(NaiveDateTime),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Parses the `dateTime` / `date` pair returned by the calendar API.
    ///
    /// `dateTime` wins when both are present. A `dateTime` without an offset
    /// is kept as a [`EventTime::Local`] value.
    pub fn parse(date_time: Option<&str>, date: Option<&str>) -> Option<Self> {
        if let Some(dt) = date_time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(dt) {
                return Some(Self::DateTime(parsed));
            }
            return NaiveDateTime::parse_from_str(dt, LOCAL_DATETIME_FORMAT)
                .ok()
                .map(Self::Local);
        }
        date.and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .map(Self::AllDay)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the value sent as `dateTime`, if this is not an all-day time.
    pub fn date_time_value(&self) -> Option<String> {
        match self {
            Self::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            Self::Local(naive) => Some(naive.format(LOCAL_DATETIME_FORMAT).to_string()),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the value sent as `date`, if this is an all-day time.
    pub fn date_value(&self) -> Option<String> {
        match self {
            Self::AllDay(date) => Some(date.format(DATE_FORMAT).to_string()),
            _ => None,
        }
    }

    /// Returns the `dateTime` value, falling back to `date` for all-day times.
    pub fn display_value(&self) -> String {
        self.date_time_value()
            .or_else(|| self.date_value())
            .unwrap_or_default()
    }
}

/// Times are only comparable within the same representation.
impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Local(a), Self::Local(b)) => Some(a.cmp(b)),
            (Self::AllDay(a), Self::AllDay(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// An event boundary: the time plus the timezone it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDateTime {
    /// The time value.
    pub time: EventTime,
    /// IANA timezone name, when the calendar reports or requires one.
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Creates a boundary without a timezone name.
    pub fn new(time: EventTime) -> Self {
        Self {
            time,
            time_zone: None,
        }
    }

    /// Creates a wall-clock boundary in the given timezone.
    pub fn local(time: NaiveDateTime, time_zone: impl Into<String>) -> Self {
        Self {
            time: EventTime::Local(time),
            time_zone: Some(time_zone.into()),
        }
    }
}

/// Parses an IANA timezone name such as `Brazil/East` or `Europe/Paris`.
pub fn parse_time_zone(name: &str) -> Result<Tz, EventError> {
    name.parse::<Tz>()
        .map_err(|_| EventError::UnknownTimeZone(name.to_string()))
}

/// A half-open time window `[start, end)` for querying calendar events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EventError> {
        if start >= end {
            return Err(EventError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates the window `[start, start + num_days days)`.
    pub fn from_days(start: DateTime<Utc>, num_days: u32) -> Result<Self, EventError> {
        let end = TimeDelta::try_days(i64::from(num_days))
            .and_then(|days| start.checked_add_signed(days))
            .ok_or(EventError::TimeOutOfRange)?;
        Self::new(start, end)
    }

    /// Returns true if the given instant lies inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Returns true if an event starting at `start` belongs to the window.
    ///
    /// Wall-clock starts are resolved in their own timezone, or in
    /// `default_tz` when they carry none. An all-day start is kept when that
    /// day overlaps the window. Times that do not exist in their timezone
    /// are kept.
    pub fn admits(&self, start: &EventDateTime, default_tz: Tz) -> bool {
        let tz = start
            .time_zone
            .as_deref()
            .and_then(|name| parse_time_zone(name).ok())
            .unwrap_or(default_tz);

        match &start.time {
            EventTime::DateTime(dt) => self.contains(dt.with_timezone(&Utc)),
            EventTime::Local(naive) => match tz.from_local_datetime(naive).earliest() {
                Some(instant) => self.contains(instant.with_timezone(&Utc)),
                None => true,
            },
            EventTime::AllDay(date) => {
                let midnight = |day: NaiveDate| {
                    tz.from_local_datetime(&day.and_time(NaiveTime::MIN))
                        .earliest()
                        .map(|instant| instant.with_timezone(&Utc))
                };
                match (midnight(*date), date.succ_opt().and_then(midnight)) {
                    (Some(day_start), Some(day_end)) => {
                        day_start < self.end && day_end > self.start
                    }
                    _ => true,
                }
            }
        }
    }

    /// The lower bound as a UTC timestamp (`...Z`).
    pub fn time_min(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// The upper bound as a UTC timestamp (`...Z`).
    pub fn time_max(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}
