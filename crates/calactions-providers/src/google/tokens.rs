//! OAuth credential and its file-based store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CalendarError, CalendarResult};

use super::config::OAuthCredentials;

/// Seconds shaved off the reported lifetime so tokens refresh before expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The OAuth token bundle granting calendar access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// Client identity the tokens were issued to, kept so refreshes do not
    /// need the client file.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// When the tokens were last issued or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential from token endpoint data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            client_id: None,
            client_secret: None,
            last_refresh: Utc::now(),
        }
    }

    /// Records the client identity the tokens belong to.
    pub fn with_client(mut self, client: &OAuthCredentials) -> Self {
        self.client_id = Some(client.client_id.clone());
        self.client_secret = Some(client.client_secret.clone());
        self
    }

    /// Returns the stored client identity, if complete.
    pub fn client(&self) -> Option<OAuthCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some(OAuthCredentials::new(id, secret)),
            _ => None,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Returns true if the credential can be used as-is.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Returns true if a refresh can be attempted.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if the credential has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Applies a refresh response.
    ///
    /// Google usually omits the refresh token on refresh; the existing one is
    /// kept in that case.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// Persisted credential storage at a single path.
///
/// The credential is stored as JSON; writes go to a temporary file that is
/// then renamed over the previous one.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the stored credential.
    ///
    /// Returns `Ok(None)` when nothing has been stored yet.
    pub fn load(&self) -> CalendarResult<Option<Credential>> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CalendarError::authentication(format!("failed to read token file: {}", e))
                .with_source(e)
        })?;

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            CalendarError::authentication(format!("failed to parse token file: {}", e))
                .with_source(e)
        })?;

        info!("loaded credential from {:?}", self.path);
        Ok(Some(credential))
    }

    /// Writes the credential, replacing any previous one.
    pub fn save(&self, credential: &Credential) -> CalendarResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                CalendarError::authentication(format!("failed to create token directory: {}", e))
                    .with_source(e)
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(credential).map_err(|e| {
            CalendarError::internal(format!("failed to serialize credential: {}", e))
        })?;

        write_private(&temp_path, content.as_bytes()).map_err(|e| {
            CalendarError::authentication(format!("failed to write token file: {}", e))
                .with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            CalendarError::authentication(format!("failed to replace token file: {}", e))
                .with_source(e)
        })?;

        debug!("saved credential to {:?}", self.path);
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes `content` to a file readable only by its owner.
fn write_private(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;

    // A leftover file keeps the mode it was created with.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            warn!("failed to restrict permissions on {:?}: {}", path, e);
        }
    }

    file.write_all(content)?;
    file.sync_all()
}
