//! Core types: calendar events, query windows, tracing setup

pub mod error;
pub mod event;
pub mod time;
pub mod tracing;

pub use error::EventError;
pub use event::{
    Attendee, Event, NewEvent, ReminderMethod, ReminderOverride, Reminders, ResponseStatus,
    filter_by_attendee, local_span,
};
pub use time::{EventDateTime, EventTime, TimeWindow, parse_time_zone};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
