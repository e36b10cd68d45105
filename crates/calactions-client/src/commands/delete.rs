//! Delete command.

use std::io::Write;

use calactions_providers::EventClient;

use crate::error::ClientResult;

/// Deletes an event and prints `1` when it was deleted, `0` otherwise.
///
/// A failed deletion is not an error for the command.
pub async fn run(client: &EventClient, id: Option<&str>, out: &mut impl Write) -> ClientResult<()> {
    let deleted = client.delete_event(id).await;
    writeln!(out, "{}", u8::from(deleted))?;
    Ok(())
}
