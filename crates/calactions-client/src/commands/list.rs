//! List command.

use std::io::Write;

use chrono::{DateTime, Utc};

use calactions_providers::EventClient;

use crate::error::ClientResult;
use crate::output;

/// Lists events over `days` days from `start` and prints them.
pub async fn run(
    client: &EventClient,
    start: DateTime<Utc>,
    days: u32,
    email: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> ClientResult<()> {
    let events = client.list_events(start, days, email).await?;
    if json {
        output::show_events_json(out, &events)?;
    } else {
        output::show_events(out, &events)?;
    }
    Ok(())
}
