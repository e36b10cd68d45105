//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};

use calactions_core::time::LOCAL_DATETIME_FORMAT;

/// calactions - List, create and delete Google Calendar events
#[derive(Debug, Parser)]
#[command(name = "calactions")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALACTIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// IANA timezone for listing and creating events (e.g. Brazil/East)
    #[arg(long, env = "CALACTIONS_TIME_ZONE")]
    pub time_zone: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize access to Google Calendar
    Auth {
        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. It is remembered in the config file.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// List events of the primary calendar
    List {
        /// Start of the window, RFC 3339 or "now"
        #[arg(long, default_value = "now", value_parser = parse_start)]
        start: DateTime<Utc>,

        /// Number of days to list
        #[arg(long, short, default_value_t = 5)]
        days: u32,

        /// Only events with an attendee email containing this text
        #[arg(long, short)]
        email: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Create an event with two attendees
    Create {
        #[command(flatten)]
        event: EventArgs,
    },

    /// Delete an event; prints 1 when deleted, 0 otherwise
    Delete {
        /// Event id
        id: Option<String>,
    },

    /// Create, list, delete and list again
    Demo {
        /// First attendee email
        #[arg(long)]
        email: String,

        /// Second attendee email
        #[arg(long)]
        email2: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Parameters of a new event.
#[derive(Debug, Clone, clap::Args)]
pub struct EventArgs {
    /// Wall-clock start in the configured timezone (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, value_parser = parse_local_datetime)]
    pub start: NaiveDateTime,

    /// Event title
    #[arg(long)]
    pub summary: String,

    /// First attendee email
    #[arg(long)]
    pub email: String,

    /// Second attendee email
    #[arg(long)]
    pub email2: String,

    /// Duration in hours (fractions allowed)
    #[arg(long, default_value_t = 1.0)]
    pub hours: f64,

    /// Event location
    #[arg(long)]
    pub location: Option<String>,

    /// Event description
    #[arg(long)]
    pub description: Option<String>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// Parses `now` or an RFC 3339 timestamp.
fn parse_start(value: &str) -> Result<DateTime<Utc>, String> {
    if value.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp or 'now': {}", e))
}

fn parse_local_datetime(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, LOCAL_DATETIME_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS: {}", e))
}
