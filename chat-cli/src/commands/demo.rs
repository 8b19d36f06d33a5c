//! Run the alice/bob scenario.

use anyhow::{Context, Result};
use peerchat_client::{ChatConfig, ChatSession, LocalHub};
use peerchat_types::{ConversationKey, Identity};
use std::io::ErrorKind;
use std::path::Path;

use super::next_display;
use crate::config::{default_history_path, Config};

/// Run the demo command.
///
/// Two sessions share an in-process hub. Alice says "hi", Bob answers "yo",
/// and Alice's stored conversation is printed. History files go to
/// `<data-dir>/demo` and are reset on every run.
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let demo_dir = data_dir.join("demo");
    tokio::fs::create_dir_all(&demo_dir)
        .await
        .context("Failed to create demo directory")?;

    let format = config.history.format;
    let session_config = |name: &str| {
        ChatConfig::new(name, default_history_path(&demo_dir, name, format))
            .with_format(format)
            .with_retry(config.retry_policy())
    };

    for name in ["alice", "bob"] {
        let path = default_history_path(&demo_dir, name, format);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to reset demo history"),
        }
    }

    let hub = LocalHub::new();
    let alice_cfg = session_config("alice");
    let bob_cfg = session_config("bob");

    let alice_endpoint = hub.endpoint(alice_cfg.identity.clone());
    let (alice, mut alice_ui) =
        ChatSession::start(alice_cfg, alice_endpoint.clone(), alice_endpoint).await;
    let bob_endpoint = hub.endpoint(bob_cfg.identity.clone());
    let (bob, mut bob_ui) = ChatSession::start(bob_cfg, bob_endpoint.clone(), bob_endpoint).await;

    println!("=== peerchat demo ===");
    println!();
    println!("Registered: {}", join(&alice.get_all_agents().await));
    println!();

    alice
        .send_message_from_ui("hi", bob.identity())
        .await
        .context("alice failed to send")?;
    println!("[alice] {}", next_display(&mut alice_ui).await?);
    println!("[bob]   {}", next_display(&mut bob_ui).await?);

    bob.send_message_from_ui("yo", alice.identity())
        .await
        .context("bob failed to send")?;
    println!("[bob]   {}", next_display(&mut bob_ui).await?);
    println!("[alice] {}", next_display(&mut alice_ui).await?);

    println!();
    let key = ConversationKey::new(alice.identity(), bob.identity());
    println!("Conversation {}:", key);
    print!("{}", alice.get_conversation_history(bob.identity()).await);
    println!();
    println!("History saved to {}", alice.history().file().path().display());

    alice.shutdown();
    bob.shutdown();
    Ok(())
}

fn join(ids: &[Identity]) -> String {
    if ids.is_empty() {
        return "(none)".to_string();
    }
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
