//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calactions/config.toml` by default. Every field is optional;
//! command-line flags override file values.
//!
//! ```toml
//! [google]
//! credentials_file = "/home/me/client_secret.json"
//! token_path = "/home/me/.local/share/calactions/google-token.json"
//! time_zone = "Brazil/East"
//! timeout = 30
//! loopback_port_range = [8080, 8090]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use calactions_providers::GoogleConfig;

/// Configuration for the calactions client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Google Calendar settings.
    pub google: GoogleSettings,
}

/// Google Calendar settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client file downloaded from Google Cloud Console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,

    /// Path to token storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    /// IANA timezone for listing and creating events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// Request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Ports tried for the OAuth callback listener.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_port_range: Option<(u16, u16)>,
}

impl GoogleSettings {
    /// Converts to provider configuration, filling unset values with defaults.
    pub fn to_google_config(&self) -> GoogleConfig {
        let mut config = GoogleConfig::new();

        if let Some(ref path) = self.credentials_file {
            config = config.with_client_secrets_path(path);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(ref time_zone) = self.time_zone {
            config = config.with_time_zone(time_zone);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some((start, end)) = self.loopback_port_range {
            config = config.with_loopback_port_range(start, end);
        }

        config
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calactions")
    }

    /// Builds the provider configuration, applying a timezone override.
    pub fn google_config(&self, time_zone: Option<&str>) -> GoogleConfig {
        let config = self.google.to_google_config();
        match time_zone {
            Some(time_zone) => config.with_time_zone(time_zone),
            None => config,
        }
    }
}

/// Records the OAuth client file under `[google]` in `config_path`.
///
/// Other keys, comments and formatting in the file are preserved.
pub fn save_credentials_file(config_path: &Path, credentials_file: &Path) -> Result<(), String> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)
            .map_err(|e| format!("failed to read config: {}", e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("failed to parse config: {}", e))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let google = doc["google"]
        .as_table_mut()
        .ok_or_else(|| "[google] in config is not a table".to_string())?;
    google["credentials_file"] = toml_edit::value(credentials_file.display().to_string());

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }

    std::fs::write(config_path, doc.to_string())
        .map_err(|e| format!("failed to write {}: {}", config_path.display(), e))?;
    info!("credentials file saved to {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(!config.debug);
        assert_eq!(config.google, GoogleSettings::default());

        let google = config.google_config(None);
        assert_eq!(google.time_zone, GoogleConfig::DEFAULT_TIME_ZONE);
        assert_eq!(
            google.client_secrets_path,
            PathBuf::from(GoogleConfig::DEFAULT_CLIENT_SECRETS)
        );
    }

    #[test]
    fn config_toml_google_section() {
        let toml_content = r#"
debug = true

[google]
credentials_file = "/etc/calactions/client_secret.json"
token_path = "/tmp/token.json"
time_zone = "Europe/Paris"
timeout = 10
loopback_port_range = [8080, 8090]
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert!(config.debug);

        let google = config.google_config(None);
        assert_eq!(
            google.client_secrets_path,
            PathBuf::from("/etc/calactions/client_secret.json")
        );
        assert_eq!(google.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(google.time_zone, "Europe/Paris");
        assert_eq!(google.timeout, Duration::from_secs(10));
        assert_eq!(google.loopback_port_range, (8080, 8090));
    }

    #[test]
    fn time_zone_override_wins() {
        let config: ClientConfig =
            toml::from_str("[google]\ntime_zone = \"Europe/Paris\"\n").unwrap();
        let google = config.google_config(Some("America/Sao_Paulo"));
        assert_eq!(google.time_zone, "America/Sao_Paulo");
    }

    #[test]
    fn load_errors() {
        let err = ClientConfig::load_from(Path::new("/nonexistent/calactions.toml")).unwrap_err();
        assert!(err.contains("failed to read config"));

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[google]\ntimeout = \"soon\"\n").unwrap();
        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("failed to parse config"));
    }

    #[test]
    fn config_serializes_back() {
        let config = ClientConfig {
            debug: false,
            google: GoogleSettings {
                time_zone: Some("Brazil/East".to_string()),
                ..Default::default()
            },
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let reloaded: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(reloaded.google, config.google);
    }

    #[test]
    fn save_credentials_file_creates_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("nested").join("config.toml");

        save_credentials_file(&config_path, Path::new("/secrets/client.json")).unwrap();

        let config = ClientConfig::load_from(&config_path).unwrap();
        assert_eq!(
            config.google.credentials_file,
            Some(PathBuf::from("/secrets/client.json"))
        );
    }

    #[test]
    fn save_credentials_file_preserves_existing_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            "# my settings\ndebug = true\n\n[google]\ntime_zone = \"Europe/Paris\"\n",
        )
        .unwrap();

        save_credentials_file(&config_path, Path::new("/secrets/client.json")).unwrap();

        let text = std::fs::read_to_string(&config_path).unwrap();
        assert!(text.contains("# my settings"));

        let config = ClientConfig::load_from(&config_path).unwrap();
        assert!(config.debug);
        assert_eq!(config.google.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(
            config.google.credentials_file,
            Some(PathBuf::from("/secrets/client.json"))
        );
    }
}
