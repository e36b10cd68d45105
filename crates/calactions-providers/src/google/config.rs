//! Google Calendar configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CalendarError, CalendarResult};

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google's OAuth consent page.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read/write access to the user's calendars.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// The only calendar this client operates on.
pub const PRIMARY_CALENDAR: &str = "primary";

/// OAuth 2.0 client identity for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth client JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    ///
    /// A missing or unreadable file is a configuration error.
    pub fn from_file(path: impl AsRef<Path>) -> CalendarResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::configuration(format!(
                "failed to read OAuth client file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google client JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> CalendarResult<Self> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| {
            CalendarError::configuration(format!("failed to parse OAuth client JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(CalendarError::configuration(
            "OAuth client file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Remote endpoints used by the client.
///
/// Production values point at Google; tests point them at a stub server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Calendar API base, without trailing slash.
    pub api_base: String,
    /// OAuth consent page.
    pub auth_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: CALENDAR_API_BASE.to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

/// Configuration for the credential manager and event client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path to the OAuth client JSON downloaded from Google Cloud Console.
    ///
    /// Only read when the interactive flow runs, or when a stored credential
    /// lacks its own client identity and must be refreshed.
    pub client_secrets_path: PathBuf,

    /// Path of the persisted credential.
    ///
    /// Defaults to `~/.local/share/calactions/google-token.json`.
    pub token_path: PathBuf,

    /// IANA timezone used for listing and creating events.
    pub time_zone: String,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// `(0, 0)` lets the operating system pick a free port.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Remote endpoints.
    pub endpoints: Endpoints,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default timezone.
    pub const DEFAULT_TIME_ZONE: &'static str = "Brazil/East";

    /// Default OAuth client file, relative to the working directory.
    pub const DEFAULT_CLIENT_SECRETS: &'static str = "client_secret.json";

    /// Creates a configuration with default paths and endpoints.
    pub fn new() -> Self {
        Self {
            client_secrets_path: PathBuf::from(Self::DEFAULT_CLIENT_SECRETS),
            token_path: Self::default_token_path(),
            time_zone: Self::DEFAULT_TIME_ZONE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calactions/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (0, 0),
            scopes: vec![CALENDAR_SCOPE.to_string()],
            endpoints: Endpoints::default(),
        }
    }

    /// Returns the default credential storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calactions")
            .join("google-token.json")
    }

    /// Sets the OAuth client file path.
    pub fn with_client_secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_secrets_path = path.into();
        self
    }

    /// Sets the credential storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the timezone.
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Points the calendar API at another base URL.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.endpoints.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Points the OAuth token endpoint at another URL.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.token_url = url.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CalendarResult<()> {
        calactions_core::parse_time_zone(&self.time_zone)
            .map_err(|e| CalendarError::configuration(e.to_string()).with_source(e))?;

        if self.scopes.is_empty() {
            return Err(CalendarError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(CalendarError::configuration("invalid loopback port range"));
        }

        if self.timeout.is_zero() {
            return Err(CalendarError::configuration("timeout must be positive"));
        }

        for (name, value) in [
            ("api_base", &self.endpoints.api_base),
            ("auth_url", &self.endpoints.auth_url),
            ("token_url", &self.endpoints.token_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                CalendarError::configuration(format!("invalid {} '{}': {}", name, value, e))
            })?;
        }

        Ok(())
    }

    /// Builds the HTTP client shared by the OAuth and calendar requests.
    pub(crate) fn http_client(&self) -> CalendarResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| {
                CalendarError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;

    #[test]
    fn credentials_validation() {
        let valid = OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        assert!(valid.validate().is_ok());

        let empty_id = OAuthCredentials::new("", "secret");
        assert!(empty_id.validate().is_err());

        let bad_id = OAuthCredentials::new("bad-id", "secret");
        assert!(bad_id.validate().is_err());

        let empty_secret = OAuthCredentials::new("test.apps.googleusercontent.com", "");
        assert!(empty_secret.validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new();
        assert_eq!(config.time_zone, "Brazil/East");
        assert_eq!(config.scopes, vec![CALENDAR_SCOPE.to_string()]);
        assert_eq!(config.client_secrets_path, PathBuf::from("client_secret.json"));
        assert_eq!(config.endpoints, Endpoints::default());
        assert!(config.token_path.ends_with("calactions/google-token.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new()
            .with_time_zone("Europe/Paris")
            .with_timeout(Duration::from_secs(5))
            .with_loopback_port_range(9000, 9010)
            .with_api_base("http://127.0.0.1:1234/")
            .with_token_url("http://127.0.0.1:1234/token");

        assert_eq!(config.time_zone, "Europe/Paris");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.loopback_port_range, (9000, 9010));
        assert_eq!(config.endpoints.api_base, "http://127.0.0.1:1234");
        assert_eq!(config.endpoints.token_url, "http://127.0.0.1:1234/token");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let bad_zone = GoogleConfig::new().with_time_zone("Nowhere/Special");
        assert_eq!(
            bad_zone.validate().unwrap_err().code(),
            CalendarErrorCode::ConfigurationError
        );

        let no_scopes = GoogleConfig::new().with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_ports = GoogleConfig::new().with_loopback_port_range(9010, 9000);
        assert!(bad_ports.validate().is_err());

        let bad_url = GoogleConfig::new().with_api_base("not a url");
        assert_eq!(
            bad_url.validate().unwrap_err().code(),
            CalendarErrorCode::ConfigurationError
        );
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret",
            "refresh_token": "some-refresh-token"
        }"#;

        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = OAuthCredentials::from_file(tmp.path().join("client_secret.json")).unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }
}
