//! Google Calendar access.
//!
//! # Authentication Flow
//!
//! 1. The user provides their own OAuth client file (required by Google)
//! 2. A stored credential is reused while valid and refreshed once expired
//! 3. Otherwise a local HTTP server is started on a loopback port
//! 4. The browser opens Google's consent page with a PKCE challenge
//! 5. Google redirects to the loopback server with the authorization code
//! 6. The code is exchanged for access and refresh tokens, which are persisted
//!
//! # Example
//!
//! ```ignore
//! use calactions_providers::google::{CredentialManager, EventClient, GoogleConfig};
//!
//! let config = GoogleConfig::new().with_time_zone("Europe/Paris");
//! let time_zone = config.time_zone.clone();
//! let session = CredentialManager::new(config)?.obtain().await?;
//! let client = EventClient::new(session, time_zone)?;
//!
//! let events = client.list_events(chrono::Utc::now(), 5, Some("@example.com")).await?;
//! ```

mod client;
mod config;
mod oauth;
mod session;
mod tokens;

pub use client::{DeleteOutcome, EventClient};
pub use config::{
    CALENDAR_API_BASE, CALENDAR_SCOPE, Endpoints, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig,
    OAuthCredentials, PRIMARY_CALENDAR,
};
pub use oauth::{OAuthClient, PkceFlow, TokenResponse};
pub use session::{CredentialManager, Session};
pub use tokens::{Credential, TokenStorage};
