//! Event types for calendar events.
//!
//! This module provides core types for representing calendar events:
//! - [`Event`]: a transient copy of an event owned by the remote calendar
//! - [`Attendee`], [`Reminders`]: the event's invitees and notifications
//! - [`NewEvent`]: the parameters of an event about to be inserted
//!
//! # Attendee filtering
//!
//! [`filter_by_attendee`] keeps events where at least one attendee email
//! **contains** the filter as a substring. The match is case-sensitive and is
//! not an exact-address match: `"ana@"` matches both `ana@x.com` and
//! `mariana@y.com`. Callers wanting exact matches must post-filter.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::time::EventDateTime;

/// Minutes before the event for the default email reminder (24 hours).
pub const EMAIL_REMINDER_MINUTES: u32 = 24 * 60;

/// Minutes before the event for the default popup reminder.
pub const POPUP_REMINDER_MINUTES: u32 = 10;

/// The response status for an event attendee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The attendee has accepted the invitation.
    Accepted,
    /// The attendee has declined the invitation.
    Declined,
    /// The attendee has tentatively accepted.
    Tentative,
    /// The attendee has not responded.
    NeedsAction,
    /// Unknown response status.
    #[default]
    Unknown,
}

impl ResponseStatus {
    /// Maps the API's camelCase status string.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("accepted") => Self::Accepted,
            Some("declined") => Self::Declined,
            Some("tentative") => Self::Tentative,
            Some("needsAction") => Self::NeedsAction,
            _ => Self::Unknown,
        }
    }

    /// The API string for this status; `None` for [`ResponseStatus::Unknown`].
    pub fn as_api(&self) -> Option<&'static str> {
        match self {
            Self::Accepted => Some("accepted"),
            Self::Declined => Some("declined"),
            Self::Tentative => Some("tentative"),
            Self::NeedsAction => Some("needsAction"),
            Self::Unknown => None,
        }
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    /// The attendee's email address.
    pub email: String,
    /// The attendee's display name, if available.
    pub display_name: Option<String>,
    /// The attendee's response status.
    pub response_status: ResponseStatus,
    /// Whether this attendee is the organizer.
    pub organizer: bool,
    /// Whether this attendee is optional.
    pub optional: bool,
}

impl Attendee {
    /// Creates a new attendee with the given email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            response_status: ResponseStatus::Unknown,
            organizer: false,
            optional: false,
        }
    }
}

/// How a reminder is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Popup => "popup",
        }
    }
}

/// A reminder fired a number of minutes before the event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes: u32,
}

impl ReminderOverride {
    pub fn new(method: ReminderMethod, minutes: u32) -> Self {
        Self { method, minutes }
    }
}

/// Reminder settings of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminders {
    /// Whether the calendar's default reminders apply.
    pub use_default: bool,
    /// Explicit reminders, used when `use_default` is false.
    pub overrides: Vec<ReminderOverride>,
}

impl Reminders {
    /// Email one day before, popup ten minutes before.
    pub fn standard() -> Self {
        Self {
            use_default: false,
            overrides: vec![
                ReminderOverride::new(ReminderMethod::Email, EMAIL_REMINDER_MINUTES),
                ReminderOverride::new(ReminderMethod::Popup, POPUP_REMINDER_MINUTES),
            ],
        }
    }
}

impl Default for Reminders {
    fn default() -> Self {
        Self {
            use_default: true,
            overrides: Vec::new(),
        }
    }
}

/// A calendar event.
///
/// The remote calendar owns events; values of this type are disposable copies
/// returned by queries or built for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier assigned by the calendar; `None` before insertion.
    pub id: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<Attendee>,
    pub reminders: Reminders,
    /// RRULE/EXDATE lines; always empty for events created here.
    pub recurrence: Vec<String>,
    /// Event status (`confirmed`, `tentative`, `cancelled`).
    pub status: Option<String>,
    /// Link to the event in the calendar web UI.
    pub html_link: Option<String>,
}

impl Event {
    /// Creates an event with the given boundaries and nothing else set.
    pub fn new(start: EventDateTime, end: EventDateTime) -> Self {
        Self {
            id: None,
            summary: None,
            location: None,
            description: None,
            start,
            end,
            attendees: Vec::new(),
            reminders: Reminders::default(),
            recurrence: Vec::new(),
            status: None,
            html_link: None,
        }
    }

    /// Sets the event id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Adds an attendee.
    pub fn with_attendee(mut self, attendee: Attendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Returns true if any attendee email contains `needle`.
    pub fn has_attendee_matching(&self, needle: &str) -> bool {
        self.attendees.iter().any(|a| a.email.contains(needle))
    }

    /// Returns the attendee emails in order.
    pub fn attendee_emails(&self) -> Vec<&str> {
        self.attendees.iter().map(|a| a.email.as_str()).collect()
    }

    /// Checks that the event starts strictly before it ends.
    pub fn validate(&self) -> Result<(), EventError> {
        match self.start.time.partial_cmp(&self.end.time) {
            Some(std::cmp::Ordering::Less) => Ok(()),
            Some(_) => Err(EventError::InvalidTimeRange {
                start: self.start.time.display_value(),
                end: self.end.time.display_value(),
            }),
            None => Err(EventError::MixedTimeKinds),
        }
    }

    /// One-line summary: start time followed by the title.
    pub fn display_line(&self) -> String {
        format!(
            "{} {}",
            self.start.time.display_value(),
            self.summary.as_deref().unwrap_or("(no title)")
        )
    }
}

/// Applies the loose attendee filter.
///
/// With `None` the events are returned untouched. With `Some(filter)` only
/// events with at least one attendee email containing `filter` are kept, each
/// once and in the original order. Events without attendees never match.
pub fn filter_by_attendee(events: Vec<Event>, filter: Option<&str>) -> Vec<Event> {
    match filter {
        None => events,
        Some(needle) => events
            .into_iter()
            .filter(|event| event.has_attendee_matching(needle))
            .collect(),
    }
}

/// Parameters of an event to insert into the calendar.
///
/// Every new event has exactly two attendees, the standard reminders and no
/// recurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Wall-clock start, interpreted in the client's timezone.
    pub start: NaiveDateTime,
    pub summary: String,
    pub email: String,
    pub email2: String,
    pub duration: TimeDelta,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl NewEvent {
    /// Default event length.
    pub const DEFAULT_DURATION_HOURS: i64 = 1;

    /// Creates a one-hour event with the two given attendees.
    pub fn new(
        start: NaiveDateTime,
        summary: impl Into<String>,
        email: impl Into<String>,
        email2: impl Into<String>,
    ) -> Self {
        Self {
            start,
            summary: summary.into(),
            email: email.into(),
            email2: email2.into(),
            duration: TimeDelta::hours(Self::DEFAULT_DURATION_HOURS),
            location: None,
            description: None,
        }
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: TimeDelta) -> Self {
        self.duration = duration;
        self
    }

    /// Sets the duration from fractional hours (`0.5` is thirty minutes).
    ///
    /// Non-finite or out-of-range values become a zero duration, which
    /// [`NewEvent::into_event`] rejects.
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.duration = if hours.is_finite() {
            TimeDelta::try_milliseconds((hours * 3_600_000.0).round() as i64)
                .unwrap_or_else(TimeDelta::zero)
        } else {
            TimeDelta::zero()
        };
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the computed end time.
    pub fn end(&self) -> Result<NaiveDateTime, EventError> {
        if self.duration <= TimeDelta::zero() {
            return Err(EventError::NonPositiveDuration);
        }
        self.start
            .checked_add_signed(self.duration)
            .ok_or(EventError::TimeOutOfRange)
    }

    /// Builds the event to insert, with both boundaries in `time_zone`.
    pub fn into_event(self, time_zone: &str) -> Result<Event, EventError> {
        if self.email.trim().is_empty() || self.email2.trim().is_empty() {
            return Err(EventError::EmptyAttendee);
        }
        let end = self.end()?;

        let mut event = Event::new(
            EventDateTime::local(self.start, time_zone),
            EventDateTime::local(end, time_zone),
        );
        event.summary = Some(self.summary);
        event.location = self.location;
        event.description = self.description;
        event.attendees = vec![Attendee::new(self.email), Attendee::new(self.email2)];
        event.reminders = Reminders::standard();
        event.recurrence = Vec::new();

        event.validate()?;
        Ok(event)
    }
}

/// Builds a pair of wall-clock boundaries in one timezone.
pub fn local_span(
    start: NaiveDateTime,
    end: NaiveDateTime,
    time_zone: &str,
) -> (EventDateTime, EventDateTime) {
    (
        EventDateTime::local(start, time_zone),
        EventDateTime::local(end, time_zone),
    )
}
