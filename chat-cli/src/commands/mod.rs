//! CLI command implementations.

pub mod chat;
pub mod demo;
pub mod history;

use anyhow::{Context, Result};
use peerchat_client::UiEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// How long to wait for an expected UI line before giving up.
const UI_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for the next display line on `ui`, skipping history pushes.
pub(crate) async fn next_display(ui: &mut UnboundedReceiver<UiEvent>) -> Result<String> {
    loop {
        let event = tokio::time::timeout(UI_TIMEOUT, ui.recv())
            .await
            .context("Timed out waiting for a message")?
            .context("Session closed")?;
        if let UiEvent::Display(line) = event {
            return Ok(line);
        }
    }
}
