//! Demonstration sequence exercising every calendar operation.

use std::io::Write;

use chrono::{NaiveDateTime, NaiveTime, Utc};

use calactions_core::{NewEvent, parse_time_zone};
use calactions_providers::EventClient;

use crate::error::{ClientError, ClientResult};
use crate::output;

/// Days listed by the demo.
const DEMO_DAYS: u32 = 5;

/// Creates an event, lists, deletes the first listed event, lists again.
pub async fn run(
    client: &EventClient,
    email: &str,
    email2: &str,
    out: &mut impl Write,
) -> ClientResult<()> {
    let start = tomorrow_at_ten(client.time_zone())?;
    let event = NewEvent::new(start, "calactions demo", email, email2)
        .with_duration_hours(0.5)
        .with_location("location")
        .with_description("description");
    client.create_event(event).await?;
    writeln!(out, "Event created at {}", start)?;

    let now = Utc::now();
    let events = client.list_events(now, DEMO_DAYS, None).await?;
    output::show_events(out, &events)?;

    let first_id = events.first().and_then(|event| event.id.as_deref());
    let deleted = client.delete_event(first_id).await;
    writeln!(out, "{}", u8::from(deleted))?;

    let events = client.list_events(now, DEMO_DAYS, None).await?;
    output::show_events(out, &events)?;
    Ok(())
}

/// 10:00 on the next day, wall-clock in `time_zone`.
fn tomorrow_at_ten(time_zone: &str) -> ClientResult<NaiveDateTime> {
    let tz = parse_time_zone(time_zone).map_err(|e| ClientError::Config(e.to_string()))?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    let tomorrow = today
        .succ_opt()
        .ok_or_else(|| ClientError::InvalidArgument("date out of range".to_string()))?;
    Ok(tomorrow.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default()))
}
