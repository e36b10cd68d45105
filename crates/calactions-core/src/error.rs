//! Validation errors for events and query windows.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// An event or query window that cannot be sent to the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The query window is empty or inverted.
    #[error("query window is empty: {start} is not before {end}")]
    EmptyWindow {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },

    /// The event ends before (or when) it starts.
    #[error("event must start before it ends (start {start}, end {end})")]
    InvalidTimeRange {
        /// Start as sent on the wire.
        start: String,
        /// End as sent on the wire.
        end: String,
    },

    /// Start and end use different time representations.
    #[error("event start and end must both be timed or both be all-day")]
    MixedTimeKinds,

    /// Event duration is zero, negative or not a number.
    #[error("event duration must be positive")]
    NonPositiveDuration,

    /// A computed time does not fit in the supported range.
    #[error("time is out of range")]
    TimeOutOfRange,

    /// The timezone name is not a known IANA identifier.
    #[error("unknown timezone: {0}")]
    UnknownTimeZone(String),

    /// An attendee slot was left empty.
    #[error("attendee email must not be empty")]
    EmptyAttendee,
}
