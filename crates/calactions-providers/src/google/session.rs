//! Credential acquisition and the authenticated session handle.

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::error::{CalendarError, CalendarResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::OAuthClient;
use super::tokens::{Credential, TokenStorage};

/// An authenticated handle for calendar API requests.
///
/// Cheap to clone; holds no mutable state.
#[derive(Debug, Clone)]
pub struct Session {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl Session {
    /// Creates a session from an access token.
    pub fn new(
        http_client: reqwest::Client,
        access_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the bearer token sent with every request.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the calendar API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Starts an authorized request against a path below the API base.
    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        self.http_client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

/// Loads, refreshes or obtains the credential and hands out a [`Session`].
#[derive(Debug)]
pub struct CredentialManager {
    config: GoogleConfig,
    storage: TokenStorage,
    http_client: reqwest::Client,
}

impl CredentialManager {
    /// Creates a manager for the given configuration.
    pub fn new(config: GoogleConfig) -> CalendarResult<Self> {
        config.validate()?;
        let storage = TokenStorage::new(&config.token_path);
        let http_client = config.http_client()?;
        Ok(Self {
            config,
            storage,
            http_client,
        })
    }

    /// Returns an authenticated session.
    ///
    /// A stored credential is used as-is while valid and refreshed once
    /// expired. Anything else runs the interactive browser flow. Whatever
    /// credential gets produced is persisted before returning. A failed
    /// refresh is fatal.
    pub async fn obtain(&self) -> CalendarResult<Session> {
        let credential = match self.load_stored() {
            Some(credential) if !credential.has_scopes(&self.config.scopes) => {
                info!("stored credential lacks required scopes, re-authorizing");
                self.authorize().await?
            }
            Some(credential) if credential.is_valid() => {
                debug!("using stored credential");
                return Ok(self.session(&credential));
            }
            Some(credential) if credential.can_refresh() => self.refresh(credential).await?,
            Some(_) => {
                info!("stored credential expired without refresh token, re-authorizing");
                self.authorize().await?
            }
            None => self.authorize().await?,
        };

        self.storage.save(&credential)?;
        Ok(self.session(&credential))
    }

    /// Runs the interactive flow regardless of the stored credential.
    pub async fn reauthorize(&self) -> CalendarResult<Session> {
        let credential = self.authorize().await?;
        self.storage.save(&credential)?;
        Ok(self.session(&credential))
    }

    /// Returns the credential store.
    pub fn storage(&self) -> &TokenStorage {
        &self.storage
    }

    /// Reads the stored credential; an unreadable store counts as empty.
    fn load_stored(&self) -> Option<Credential> {
        match self.storage.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!("ignoring stored credential: {}", e);
                None
            }
        }
    }

    async fn refresh(&self, mut credential: Credential) -> CalendarResult<Credential> {
        let client = match credential.client() {
            Some(client) => client,
            None => self.client_credentials()?,
        };
        let refresh_token = credential.refresh_token.clone().unwrap_or_default();

        debug!("refreshing expired access token");
        let response = self
            .oauth_client(client.clone())
            .refresh(&refresh_token)
            .await?;

        credential.apply_refresh(
            response.access_token,
            response.expires_in,
            response.refresh_token,
        );
        Ok(credential.with_client(&client))
    }

    async fn authorize(&self) -> CalendarResult<Credential> {
        let client = self.client_credentials()?;
        client.validate().map_err(|e| {
            CalendarError::configuration(format!(
                "invalid OAuth client file {}: {}",
                self.config.client_secrets_path.display(),
                e
            ))
        })?;

        self.oauth_client(client)
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
    }

    fn client_credentials(&self) -> CalendarResult<OAuthCredentials> {
        OAuthCredentials::from_file(&self.config.client_secrets_path)
    }

    fn oauth_client(&self, client: OAuthCredentials) -> OAuthClient {
        OAuthClient::new(
            client,
            self.http_client.clone(),
            self.config.endpoints.clone(),
        )
    }

    fn session(&self, credential: &Credential) -> Session {
        Session::new(
            self.http_client.clone(),
            &credential.access_token,
            &self.config.endpoints.api_base,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::error::CalendarErrorCode;
    use crate::google::config::CALENDAR_SCOPE;

    const CLIENT_ID: &str = "test-client.apps.googleusercontent.com";

    fn config_for(dir: &Path, server_url: &str) -> GoogleConfig {
        GoogleConfig::new()
            .with_token_path(dir.join("token.json"))
            .with_client_secrets_path(dir.join("client_secret.json"))
            .with_api_base(server_url)
            .with_token_url(format!("{}/token", server_url))
    }

    fn expired(access: &str, refresh: Option<&str>) -> Credential {
        let mut credential = Credential::new(
            access,
            refresh.map(String::from),
            Some(3600),
            vec![CALENDAR_SCOPE.to_string()],
        );
        credential.expires_at = Some(Utc::now() - Duration::minutes(5));
        credential
    }

    #[test]
    fn session_request_url() {
        let session = Session::new(reqwest::Client::new(), "tok", "http://127.0.0.1:1/api/");
        assert_eq!(session.api_base(), "http://127.0.0.1:1/api");
        let request = session
            .request(Method::GET, "/calendars/primary/events")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:1/api/calendars/primary/events"
        );
        assert_eq!(
            request.headers()["authorization"].to_str().unwrap(),
            "Bearer tok"
        );
    }

    #[test]
    fn manager_rejects_invalid_config() {
        let err = CredentialManager::new(GoogleConfig::new().with_time_zone("Mars/Base"))
            .unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn valid_credential_used_without_network() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .expect(0)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), &server.url());
        let stored = Credential::new(
            "stored-token",
            Some("refresh".to_string()),
            Some(3600),
            vec![CALENDAR_SCOPE.to_string()],
        );
        TokenStorage::new(&config.token_path).save(&stored).unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let session = manager.obtain().await.unwrap();

        assert_eq!(session.access_token(), "stored-token");
        assert_eq!(session.api_base(), server.url());
        token_mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_credential_refreshed_and_persisted() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), CLIENT_ID.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh-token", "expires_in": 3600}"#)
            .expect(1)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), &server.url());
        let stored = expired("stale-token", Some("refresh-1"))
            .with_client(&OAuthCredentials::new(CLIENT_ID, "secret"));
        TokenStorage::new(&config.token_path).save(&stored).unwrap();

        // No client file on disk: the embedded client identity is enough.
        let manager = CredentialManager::new(config).unwrap();
        let session = manager.obtain().await.unwrap();
        assert_eq!(session.access_token(), "fresh-token");
        token_mock.assert_async().await;

        let persisted = manager.storage().load().unwrap().unwrap();
        assert_eq!(persisted.access_token, "fresh-token");
        assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-1"));
        assert!(persisted.is_valid());
    }

    #[tokio::test]
    async fn refresh_falls_back_to_client_file() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::UrlEncoded(
                "client_secret".into(),
                "file-secret".into(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token": "fresh-token", "expires_in": 3600}"#)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), &server.url());
        std::fs::write(
            &config.client_secrets_path,
            format!(
                r#"{{"installed": {{"client_id": "{}", "client_secret": "file-secret"}}}}"#,
                CLIENT_ID
            ),
        )
        .unwrap();
        TokenStorage::new(&config.token_path)
            .save(&expired("stale", Some("refresh-1")))
            .unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let session = manager.obtain().await.unwrap();
        assert_eq!(session.access_token(), "fresh-token");
        token_mock.assert_async().await;

        let persisted = manager.storage().load().unwrap().unwrap();
        assert_eq!(persisted.client_secret.as_deref(), Some("file-secret"));
    }

    #[tokio::test]
    async fn failed_refresh_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _token_mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), &server.url());
        let stored = expired("stale-token", Some("revoked"))
            .with_client(&OAuthCredentials::new(CLIENT_ID, "secret"));
        TokenStorage::new(&config.token_path).save(&stored).unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::AuthenticationFailed);

        // The stored credential is left untouched.
        let persisted = manager.storage().load().unwrap().unwrap();
        assert_eq!(persisted.access_token, "stale-token");
    }

    #[tokio::test]
    async fn missing_client_file_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), "http://127.0.0.1:9");

        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
        assert!(!manager.storage().path().exists());
    }

    #[tokio::test]
    async fn malformed_client_file_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), "http://127.0.0.1:9");
        std::fs::write(&config.client_secrets_path, r#"{"installed": {}}"#).unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn expired_without_refresh_token_needs_authorization() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), "http://127.0.0.1:9");
        TokenStorage::new(&config.token_path)
            .save(&expired("stale", None))
            .unwrap();

        // Reaching the interactive flow means reading the (absent) client file.
        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn missing_scope_needs_authorization() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), "http://127.0.0.1:9");
        let narrow = Credential::new(
            "valid-token",
            None,
            Some(3600),
            vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        );
        TokenStorage::new(&config.token_path).save(&narrow).unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn corrupt_store_needs_authorization() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_for(tmp.path(), "http://127.0.0.1:9");
        std::fs::write(&config.token_path, "{ not json").unwrap();

        let manager = CredentialManager::new(config).unwrap();
        let err = manager.obtain().await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::ConfigurationError);
    }
}
