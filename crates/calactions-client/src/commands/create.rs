//! Create command.

use calactions_core::NewEvent;
use calactions_providers::EventClient;

use crate::cli::EventArgs;
use crate::error::ClientResult;

/// Builds the event described by the command-line arguments.
pub fn new_event(args: EventArgs) -> NewEvent {
    let mut event = NewEvent::new(args.start, args.summary, args.email, args.email2)
        .with_duration_hours(args.hours);
    if let Some(location) = args.location {
        event = event.with_location(location);
    }
    if let Some(description) = args.description {
        event = event.with_description(description);
    }
    event
}

/// Inserts the event into the primary calendar.
pub async fn run(client: &EventClient, args: EventArgs) -> ClientResult<()> {
    let event = new_event(args);
    let summary = event.summary.clone();
    client.create_event(event).await?;
    println!("Event created: {}", summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;

    fn args(hours: f64) -> EventArgs {
        EventArgs {
            start: NaiveDate::from_ymd_opt(2019, 9, 6)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            summary: "summary".to_string(),
            email: "a@x.com".to_string(),
            email2: "b@x.com".to_string(),
            hours,
            location: Some("location".to_string()),
            description: None,
        }
    }

    #[test]
    fn builds_event_from_args() {
        let event = new_event(args(0.5));
        assert_eq!(event.duration, TimeDelta::minutes(30));
        assert_eq!(event.location.as_deref(), Some("location"));
        assert!(event.description.is_none());
        assert_eq!(
            event.end().unwrap(),
            NaiveDate::from_ymd_opt(2019, 9, 6)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn zero_hours_rejected_on_build() {
        let event = new_event(args(0.0));
        assert!(event.into_event("Brazil/East").is_err());
    }
}
