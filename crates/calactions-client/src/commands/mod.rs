//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod create;
pub mod delete;
pub mod demo;
pub mod list;

use calactions_providers::{CredentialManager, EventClient, GoogleConfig};

use crate::error::ClientResult;

/// Obtains a session and wraps it in an event client.
pub async fn connect(config: &GoogleConfig) -> ClientResult<EventClient> {
    let manager = CredentialManager::new(config.clone())?;
    let session = manager.obtain().await?;
    Ok(EventClient::new(session, config.time_zone.clone())?)
}
