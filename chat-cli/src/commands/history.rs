//! Print a stored conversation.

use anyhow::{Context, Result};
use peerchat_types::Identity;
use std::path::Path;

use crate::config::Config;

/// Run the history command.
pub async fn run(data_dir: &Path, config: &Config, identity: &str, with: &str) -> Result<()> {
    let chat_config = config.chat_config(identity, data_dir);
    let file = chat_config.history_file();

    let decoded = file
        .load()
        .await
        .with_context(|| format!("Failed to read {}", file.path().display()))?;

    let text = decoded
        .store
        .conversation_history(&chat_config.identity, &Identity::from(with));
    if text.is_empty() {
        println!("No messages between {} and {}.", identity, with);
    } else {
        print!("{}", text);
    }

    Ok(())
}
