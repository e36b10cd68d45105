//! Authentication command.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use calactions_providers::{CredentialManager, GoogleConfig};

use crate::config;
use crate::error::{ClientError, ClientResult};

/// Run the Google authentication flow.
///
/// Reuses the stored credential unless `force` is set. A `credentials_file`
/// given on the command line replaces the configured one and is remembered in
/// `config_path` for later runs.
pub async fn google(
    credentials_file: Option<PathBuf>,
    force: bool,
    google_config: GoogleConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let google_config = match credentials_file {
        Some(ref path) => google_config.with_client_secrets_path(path),
        None => google_config,
    };

    let manager = CredentialManager::new(google_config)?;

    if force {
        println!("Starting Google Calendar authentication...");
        println!();
        println!("A browser window will open for you to authorize access.");
        println!("If the browser doesn't open, check the terminal for a URL to copy.");
        println!();
        manager.reauthorize().await?;
    } else {
        manager.obtain().await?;
    }

    if let Some(ref path) = credentials_file {
        remember_credentials_file(config_path, path)?;
    }

    info!("Google authentication successful");
    println!("Authenticated with Google Calendar.");
    println!(
        "Tokens are stored in {}",
        manager.storage().path().display()
    );
    if !force {
        println!("Use --force to re-authenticate.");
    }

    Ok(())
}

/// Saves an absolute form of `credentials_file` into the config file.
fn remember_credentials_file(config_path: &Path, credentials_file: &Path) -> ClientResult<()> {
    let absolute = match std::fs::canonicalize(credentials_file) {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "could not resolve {}: {}",
                credentials_file.display(),
                e
            );
            credentials_file.to_path_buf()
        }
    };
    config::save_credentials_file(config_path, &absolute).map_err(ClientError::Config)?;
    println!("Credentials file saved to {}", config_path.display());
    Ok(())
}
