//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig, time_zone: Option<&str>) -> ClientResult<()> {
    let google = config.google_config(time_zone);
    google
        .validate()
        .map_err(|e| ClientError::Config(e.message().to_string()))?;

    if google.client_secrets_path.exists() {
        calactions_providers::OAuthCredentials::from_file(&google.client_secrets_path)?;
        println!("OAuth client file is valid.");
    } else {
        println!(
            "OAuth client file {} not found; only needed to authorize.",
            google.client_secrets_path.display()
        );
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
