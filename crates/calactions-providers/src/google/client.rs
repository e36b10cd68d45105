//! Google Calendar API client.
//!
//! [`EventClient`] lists, inserts and deletes events on the primary calendar
//! through an injected [`Session`]. Each call is a single HTTP round trip.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use calactions_core::{
    Attendee, Event, EventDateTime, EventTime, NewEvent, ReminderMethod, ReminderOverride,
    Reminders, ResponseStatus, TimeWindow, filter_by_attendee, parse_time_zone,
};

use crate::error::{CalendarError, CalendarResult};

use super::config::PRIMARY_CALENDAR;
use super::session::Session;

/// Result of a delete request.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The calendar accepted the deletion.
    Deleted,
    /// No id was given; nothing was sent.
    MissingId,
    /// The request failed.
    Failed(CalendarError),
}

impl DeleteOutcome {
    /// Returns true only for [`DeleteOutcome::Deleted`].
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Client for the events of the primary calendar.
#[derive(Debug, Clone)]
pub struct EventClient {
    session: Session,
    time_zone: String,
    tz: Tz,
}

impl EventClient {
    /// Creates a client; `time_zone` must be a known IANA name.
    pub fn new(session: Session, time_zone: impl Into<String>) -> CalendarResult<Self> {
        let time_zone = time_zone.into();
        let tz = parse_time_zone(&time_zone)
            .map_err(|e| CalendarError::configuration(e.to_string()).with_source(e))?;
        Ok(Self {
            session,
            time_zone,
            tz,
        })
    }

    /// Returns the timezone used for queries and new events.
    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    /// Lists events starting in `[start, start + num_days days)`.
    ///
    /// Recurring events come back expanded, ordered by start time. Events the
    /// calendar returns because they are still running at `start` are dropped
    /// (see [`TimeWindow::admits`]). With an `email_filter`, only events with an attendee email containing it are
    /// kept (see [`filter_by_attendee`]).
    pub async fn list_events(
        &self,
        start: DateTime<Utc>,
        num_days: u32,
        email_filter: Option<&str>,
    ) -> CalendarResult<Vec<Event>> {
        let window = TimeWindow::from_days(start, num_days)
            .map_err(|e| CalendarError::bad_request(e.to_string()).with_source(e))?;

        debug!(
            "listing events from {} to {}",
            window.time_min(),
            window.time_max()
        );

        let response = self
            .session
            .request(Method::GET, &events_path())
            .query(&[
                ("timeMin", window.time_min()),
                ("timeMax", window.time_max()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeZone", self.time_zone.clone()),
            ])
            .send()
            .await
            .map_err(send_error)?;

        let body = check_status(response).await?.text().await.map_err(|e| {
            CalendarError::network(format!("failed to read response: {}", e)).with_source(e)
        })?;

        let list: EventListResponse = serde_json::from_str(&body).map_err(|e| {
            CalendarError::invalid_response(format!("failed to parse response: {}", e))
                .with_source(e)
        })?;

        let events: Vec<Event> = list
            .items
            .into_iter()
            .filter_map(ApiEvent::into_event)
            .filter(|event| {
                let inside = window.admits(&event.start, self.tz);
                if !inside {
                    debug!(
                        "dropping event {} starting outside the window",
                        event.id.as_deref().unwrap_or("(no id)")
                    );
                }
                inside
            })
            .collect();
        debug!("fetched {} events", events.len());

        Ok(filter_by_attendee(events, email_filter))
    }

    /// Inserts an event with two attendees and the standard reminders.
    ///
    /// The event is validated before anything is sent.
    pub async fn create_event(&self, new_event: NewEvent) -> CalendarResult<()> {
        let event = new_event.into_event(&self.time_zone)?;
        let body = ApiEvent::from_event(&event);

        let response = self
            .session
            .request(Method::POST, &events_path())
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let response = check_status(response).await?;
        match response.json::<ApiEvent>().await {
            Ok(created) => info!(
                "created event {}",
                created.id.as_deref().unwrap_or("(unknown id)")
            ),
            Err(e) => debug!("created event, response not parsed: {}", e),
        }
        Ok(())
    }

    /// Deletes an event by id.
    ///
    /// Returns `false` without any request when `id` is `None` or empty, and
    /// `false` when the calendar rejects the deletion or cannot be reached.
    pub async fn delete_event(&self, id: Option<&str>) -> bool {
        self.delete_event_outcome(id).await.is_deleted()
    }

    /// Deletes an event by id, reporting why it did not happen.
    pub async fn delete_event_outcome(&self, id: Option<&str>) -> DeleteOutcome {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            debug!("no event id given, skipping delete");
            return DeleteOutcome::MissingId;
        };

        match self.send_delete(id).await {
            Ok(()) => {
                info!("deleted event {}", id);
                DeleteOutcome::Deleted
            }
            Err(e) => {
                warn!("failed to delete event {}: {}", id, e);
                DeleteOutcome::Failed(e)
            }
        }
    }

    async fn send_delete(&self, id: &str) -> CalendarResult<()> {
        let path = format!("{}/{}", events_path(), urlencoding::encode(id));
        let response = self
            .session
            .request(Method::DELETE, &path)
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn events_path() -> String {
    format!("calendars/{}/events", PRIMARY_CALENDAR)
}

fn send_error(e: reqwest::Error) -> CalendarError {
    let message = if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    };
    CalendarError::network(message).with_source(e)
}

/// Maps non-success statuses onto error codes.
async fn check_status(response: reqwest::Response) -> CalendarResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(CalendarError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => {
            CalendarError::authorization(format!("access token rejected: {}", body))
        }
        StatusCode::FORBIDDEN => CalendarError::authorization(format!("access denied: {}", body)),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            CalendarError::not_found(format!("event not found ({})", status))
        }
        StatusCode::BAD_REQUEST => CalendarError::bad_request(format!("bad request: {}", body)),
        _ => CalendarError::server(format!("API error ({}): {}", status, body)),
    })
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// A single event as the API reads and writes it.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<ApiAttendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminders: Option<ApiReminders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recurrence: Option<Vec<String>>,
    #[serde(skip_serializing)]
    status: Option<String>,
    #[serde(skip_serializing)]
    html_link: Option<String>,
}

/// Event time from the API.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

/// Attendee from the API.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organizer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiReminders {
    #[serde(default)]
    use_default: bool,
    #[serde(default)]
    overrides: Vec<ApiReminderOverride>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiReminderOverride {
    method: String,
    minutes: u32,
}

impl ApiEvent {
    /// Builds the request body for an insert.
    fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            summary: event.summary.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
            start: ApiEventTime::from_boundary(&event.start),
            end: ApiEventTime::from_boundary(&event.end),
            attendees: Some(event.attendees.iter().map(ApiAttendee::from_attendee).collect()),
            reminders: Some(ApiReminders {
                use_default: event.reminders.use_default,
                overrides: event
                    .reminders
                    .overrides
                    .iter()
                    .map(|r| ApiReminderOverride {
                        method: r.method.as_str().to_string(),
                        minutes: r.minutes,
                    })
                    .collect(),
            }),
            recurrence: Some(event.recurrence.clone()),
            status: None,
            html_link: None,
        }
    }

    /// Converts a listed event, skipping those without usable times.
    fn into_event(self) -> Option<Event> {
        let label = self.id.clone().unwrap_or_else(|| "(no id)".to_string());
        let Some(start) = self.start.into_boundary() else {
            warn!("event {} has no usable start time, skipping", label);
            return None;
        };
        let Some(end) = self.end.into_boundary() else {
            warn!("event {} has no usable end time, skipping", label);
            return None;
        };

        let mut event = Event::new(start, end);
        event.id = self.id;
        event.summary = self.summary;
        event.location = self.location;
        event.description = self.description;
        event.attendees = self
            .attendees
            .unwrap_or_default()
            .into_iter()
            .filter_map(ApiAttendee::into_attendee)
            .collect();
        if let Some(reminders) = self.reminders {
            event.reminders = reminders.into_reminders();
        }
        event.recurrence = self.recurrence.unwrap_or_default();
        event.status = self.status;
        event.html_link = self.html_link;
        Some(event)
    }
}

impl ApiEventTime {
    fn from_boundary(boundary: &EventDateTime) -> Self {
        Self {
            date: boundary.time.date_value(),
            date_time: boundary.time.date_time_value(),
            time_zone: boundary.time_zone.clone(),
        }
    }

    fn into_boundary(self) -> Option<EventDateTime> {
        let time = EventTime::parse(self.date_time.as_deref(), self.date.as_deref())?;
        Some(EventDateTime {
            time,
            time_zone: self.time_zone,
        })
    }
}

impl ApiAttendee {
    fn from_attendee(attendee: &Attendee) -> Self {
        Self {
            email: Some(attendee.email.clone()),
            display_name: attendee.display_name.clone(),
            organizer: attendee.organizer.then_some(true),
            optional: attendee.optional.then_some(true),
            response_status: attendee.response_status.as_api().map(String::from),
        }
    }

    fn into_attendee(self) -> Option<Attendee> {
        let mut attendee = Attendee::new(self.email?);
        attendee.display_name = self.display_name;
        attendee.organizer = self.organizer.unwrap_or(false);
        attendee.optional = self.optional.unwrap_or(false);
        attendee.response_status = ResponseStatus::from_api(self.response_status.as_deref());
        Some(attendee)
    }
}

impl ApiReminders {
    fn into_reminders(self) -> Reminders {
        let overrides = self
            .overrides
            .into_iter()
            .filter_map(|r| {
                let method = match r.method.as_str() {
                    "email" => ReminderMethod::Email,
                    "popup" => ReminderMethod::Popup,
                    _ => return None,
                };
                Some(ReminderOverride::new(method, r.minutes))
            })
            .collect();
        Reminders {
            use_default: self.use_default,
            overrides,
        }
    }
}
