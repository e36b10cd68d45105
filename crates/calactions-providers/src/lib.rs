//! Google Calendar client for calactions.
//!
//! - [`CredentialManager`] - loads, refreshes or obtains the OAuth credential
//! - [`Session`] - the authenticated handle it produces
//! - [`EventClient`] - lists, creates and deletes events on the primary calendar
//! - [`CalendarError`] - error type for every operation
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   token file   ┌──────────────┐
//! │ CredentialManager │ ◄────────────► │ TokenStorage │
//! └─────────┬─────────┘                └──────────────┘
//!           │ obtain()
//!           ▼
//!     ┌───────────┐
//!     │  Session  │
//!     └─────┬─────┘
//!           │ injected
//!           ▼
//!     ┌─────────────┐    HTTPS    ┌─────────────────────┐
//!     │ EventClient │ ──────────► │ Google Calendar API │
//!     └─────────────┘             └─────────────────────┘
//! ```

pub mod error;
pub mod google;

pub use error::{CalendarError, CalendarErrorCode, CalendarResult};
pub use google::{
    CredentialManager, DeleteOutcome, EventClient, GoogleConfig, OAuthCredentials, Session,
};
