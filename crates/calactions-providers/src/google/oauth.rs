//! OAuth 2.0 authorization code flow with PKCE and a loopback redirect.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a local HTTP listener on 127.0.0.1
//! 3. Open the user's browser on Google's consent page
//! 4. Google redirects to the listener with the authorization code
//! 5. Exchange the code (with the verifier) for access and refresh tokens

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{CalendarError, CalendarResult};

use super::config::{Endpoints, OAuthCredentials};
use super::tokens::Credential;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Path the consent page redirects to.
const CALLBACK_PATH: &str = "/callback";

/// OAuth client for Google's identity endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    endpoints: Endpoints,
}

impl OAuthClient {
    /// Creates an OAuth client for the given client identity.
    pub fn new(
        credentials: OAuthCredentials,
        http_client: reqwest::Client,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            credentials,
            http_client,
            endpoints,
        }
    }

    /// Runs the interactive flow and returns the issued credential.
    ///
    /// Blocks until the browser redirects back or [`CALLBACK_TIMEOUT`]
    /// elapses.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> CalendarResult<Credential> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let auth_url = pkce.build_auth_url(
            &self.endpoints.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let (code, received_state) = wait_for_callback(listener)?;

        if received_state != pkce.state {
            return Err(CalendarError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens");

        let response = self
            .token_request(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("code_verifier", pkce.verifier.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?;

        info!("obtained new credential");
        Ok(Credential::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        )
        .with_client(&self.credentials))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> CalendarResult<TokenResponse> {
        let response = self
            .token_request(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        info!("refreshed access token");
        Ok(response)
    }

    /// POSTs a form to the token endpoint and parses the reply.
    async fn token_request(&self, params: &[(&str, &str)]) -> CalendarResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                CalendarError::authentication(format!("token request failed: {}", e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CalendarError::authentication(format!("failed to read token response: {}", e))
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(CalendarError::authentication(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            CalendarError::authentication(format!("invalid token response: {}", e)).with_source(e)
        })
    }
}

/// Binds the callback listener on the first free port in the range.
///
/// Port `0` asks the operating system for any free port.
fn bind_loopback_server(port_range: (u16, u16)) -> CalendarResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) else {
            continue;
        };
        let bound = listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|e| {
                CalendarError::authentication(format!("failed to read listener address: {}", e))
            })?;
        debug!("bound loopback server on port {}", bound);
        return Ok((listener, bound));
    }
    Err(CalendarError::authentication(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Waits for the OAuth redirect and extracts `(code, state)`.
fn wait_for_callback(listener: TcpListener) -> CalendarResult<(String, String)> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(CalendarError::authentication("OAuth callback timeout"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(CalendarError::internal("callback channel disconnected"))
        }
    }
}

/// Handles one request on the callback listener.
///
/// Returns `None` for requests that are not the redirect (favicon, probes).
fn handle_callback(mut stream: TcpStream) -> Option<CalendarResult<(String, String)>> {
    let mut request_line = String::new();
    BufReader::new(&stream).read_line(&mut request_line).ok()?;

    let target = parse_request_target(&request_line)?;
    let outcome = parse_callback(target)?;

    let response = if outcome.is_ok() {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(outcome)
}

/// Extracts the target of a `GET <target> HTTP/1.1` request line.
fn parse_request_target(request_line: &str) -> Option<&str> {
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target),
        _ => None,
    }
}

/// Parses the redirect target into `(code, state)`.
fn parse_callback(target: &str) -> Option<CalendarResult<(String, String)>> {
    let url = url::Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(CalendarError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    Some(match code {
        Some(code) => Ok((code, state.unwrap_or_default())),
        None => Err(CalendarError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE flow state (RFC 7636).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Computes the S256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }

    /// Builds the consent page URL.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

/// Response from Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalendarErrorCode;
    use crate::google::config::GOOGLE_AUTH_URL;

    fn client_for(server: &mockito::Server) -> OAuthClient {
        let endpoints = Endpoints {
            token_url: format!("{}/token", server.url()),
            ..Endpoints::default()
        };
        OAuthClient::new(
            OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
            reqwest::Client::new(),
            endpoints,
        )
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // Base64 encoding of 32 bytes = 43 characters (no padding)
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_is_deterministic() {
        let challenge1 = PkceFlow::compute_challenge("test-verifier-string");
        let challenge2 = PkceFlow::compute_challenge("test-verifier-string");
        assert_eq!(challenge1, challenge2);
    }

    #[test]
    fn pkce_rfc7636_vector() {
        // Appendix B of RFC 7636.
        let challenge =
            PkceFlow::compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn pkce_state_is_random() {
        assert_ne!(PkceFlow::new().state, PkceFlow::new().state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            GOOGLE_AUTH_URL,
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &["https://www.googleapis.com/auth/calendar".to_string()],
        );

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn request_target() {
        assert_eq!(
            parse_request_target("GET /callback?code=x HTTP/1.1\r\n"),
            Some("/callback?code=x")
        );
        assert_eq!(parse_request_target("POST /callback HTTP/1.1\r\n"), None);
        assert_eq!(parse_request_target(""), None);
    }

    #[test]
    fn callback_with_code() {
        let result = parse_callback("/callback?code=4%2Fabc&state=xyz").unwrap();
        assert_eq!(result.unwrap(), ("4/abc".to_string(), "xyz".to_string()));
    }

    #[test]
    fn callback_with_error() {
        let err = parse_callback("/callback?error=access_denied")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::AuthenticationFailed);
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_ignores_other_paths() {
        assert!(parse_callback("/favicon.ico").is_none());
    }

    #[test]
    fn loopback_os_assigned_port() {
        let (_listener, port) = bind_loopback_server((0, 0)).unwrap();
        assert_ne!(port, 0);
    }

    #[tokio::test]
    async fn refresh_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                mockito::Matcher::UrlEncoded("refresh_token".into(), "r-1".into()),
                mockito::Matcher::UrlEncoded(
                    "client_id".into(),
                    "id.apps.googleusercontent.com".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let response = client_for(&server).refresh("r-1").await.unwrap();
        assert_eq!(response.access_token, "fresh");
        assert_eq!(response.expires_in, Some(3599));
        assert!(response.refresh_token.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let err = client_for(&server).refresh("revoked").await.unwrap_err();
        assert_eq!(err.code(), CalendarErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
    }
}
