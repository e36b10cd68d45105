//! Rendering of event lists for the terminal.

use std::io::{self, Write};

use calactions_core::Event;

/// Printed when a query returns nothing.
pub const NO_EVENTS_TEXT: &str = "No upcoming events found.";

/// One line per event: start (`dateTime`, else `date`) then the summary.
pub fn format_event_line(event: &Event) -> String {
    event.display_line()
}

/// Writes the `Events:` block.
pub fn show_events(out: &mut impl Write, events: &[Event]) -> io::Result<()> {
    writeln!(out, "Events:")?;
    if events.is_empty() {
        writeln!(out, "{}", NO_EVENTS_TEXT)?;
    }
    for event in events {
        writeln!(out, "{}", format_event_line(event))?;
    }
    Ok(())
}

/// Writes the events as a pretty-printed JSON array.
pub fn show_events_json(out: &mut impl Write, events: &[Event]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, events)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use calactions_core::{EventDateTime, EventTime};
    use chrono::NaiveDate;

    use super::*;

    fn all_day(summary: &str) -> Event {
        let day = NaiveDate::from_ymd_opt(2019, 9, 7).unwrap();
        Event::new(
            EventDateTime::new(EventTime::AllDay(day)),
            EventDateTime::new(EventTime::AllDay(day.succ_opt().unwrap())),
        )
        .with_summary(summary)
    }

    fn render(events: &[Event]) -> String {
        let mut out = Vec::new();
        show_events(&mut out, events).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_list() {
        assert_eq!(render(&[]), "Events:\nNo upcoming events found.\n");
    }

    #[test]
    fn lines_in_order() {
        let start = NaiveDate::from_ymd_opt(2019, 9, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let timed = Event::new(
            EventDateTime::local(start, "Brazil/East"),
            EventDateTime::local(start + chrono::TimeDelta::minutes(30), "Brazil/East"),
        )
        .with_summary("summary");

        assert_eq!(
            render(&[timed, all_day("Offsite")]),
            "Events:\n2019-09-06T10:00:00 summary\n2019-09-07 Offsite\n"
        );
    }

    #[test]
    fn json_output() {
        let mut out = Vec::new();
        show_events_json(&mut out, &[all_day("Offsite").with_id("ev2")]).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["id"], "ev2");
        assert_eq!(value[0]["summary"], "Offsite");
    }
}
