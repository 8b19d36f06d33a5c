//! Interactive chat against in-process echo peers.
//!
//! Every `--peer` becomes a registered identity on a shared [`LocalHub`]
//! that answers each message with `echo: <content>`. Our own session runs
//! on the same hub, so the full discovery, send and receive path is used.

use anyhow::{Context, Result};
use peerchat_client::{
    ChatSession, Directory, LocalHub, MessageBus, Transport, TransportError, UiEvent,
};
use peerchat_types::Identity;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::config::Config;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Help,
    Peers,
    History,
    To(&'a str),
    Unknown(&'a str),
    Send(&'a str),
}

fn parse_line(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Send(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("quit" | "exit", _) => Input::Quit,
        ("help", _) => Input::Help,
        ("peers", _) => Input::Peers,
        ("history", _) => Input::History,
        ("to", "") => Input::Unknown(line),
        ("to", peer) => Input::To(peer),
        _ => Input::Unknown(line),
    }
}

/// Run the chat command.
pub async fn run(data_dir: &Path, config: &Config, identity: &str, peers: &[String]) -> Result<()> {
    let hub = LocalHub::new();

    let mut echoes = Vec::new();
    for peer in peers {
        if peer == identity {
            tracing::warn!("Skipping echo peer with our own name: {}", peer);
            continue;
        }
        echoes.push(spawn_echo_peer(&hub, Identity::from(peer.as_str())).await?);
    }

    let chat_config = config.chat_config(identity, data_dir);
    let history_path = chat_config.history_path.clone();
    let endpoint = hub.endpoint(chat_config.identity.clone());
    let (session, ui) = ChatSession::start(chat_config, endpoint.clone(), endpoint).await;
    let printer = tokio::spawn(print_events(ui));

    let mut recipient = session.get_peers().await.into_iter().next();

    println!("=== peerchat: {} ===", identity);
    println!("History: {}", history_path.display());
    match &recipient {
        Some(peer) => println!("Talking to {}", peer),
        None => println!("No peers online. Use /to NAME once one shows up."),
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match parse_line(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Peers => {
                let peers = session.get_peers().await;
                if peers.is_empty() {
                    println!("No peers found.");
                }
                for peer in peers {
                    println!("  {}", peer);
                }
            }
            Input::To(peer) => {
                println!("Talking to {}", peer);
                recipient = Some(Identity::from(peer));
            }
            Input::History => match &recipient {
                Some(peer) => session.update_conversation_history(peer).await,
                None => println!("No recipient. Use /to NAME first."),
            },
            Input::Unknown(command) => println!("Unknown command: {}", command),
            Input::Send(text) => {
                let to = recipient.clone().unwrap_or_else(|| Identity::new(""));
                if let Err(e) = session.send_message_from_ui(text, &to).await {
                    println!("! {}", e);
                }
            }
        }
    }

    session.shutdown();
    for echo in echoes {
        echo.abort();
    }
    printer.abort();
    Ok(())
}

fn print_help() {
    println!("Commands: /peers, /to NAME, /history, /quit. Anything else is sent.");
}

async fn print_events(mut ui: UnboundedReceiver<UiEvent>) {
    while let Some(event) = ui.recv().await {
        match event {
            UiEvent::Display(line) => println!("{}", line),
            UiEvent::History { peer, text } => {
                println!("--- conversation with {} ---", peer);
                print!("{}", text);
                println!("---");
            }
        }
    }
}

/// Register `identity` on the hub and answer everything it receives.
async fn spawn_echo_peer(hub: &LocalHub, identity: Identity) -> Result<JoinHandle<()>> {
    let endpoint = hub.endpoint(identity.clone());
    endpoint
        .register(&identity)
        .await
        .with_context(|| format!("Failed to register echo peer {}", identity))?;
    tracing::debug!("Echo peer {} online", identity);

    let bus = MessageBus::new(identity, endpoint);
    Ok(tokio::spawn(echo_loop(bus)))
}

async fn echo_loop<T: Transport>(bus: MessageBus<T>) {
    loop {
        match bus.next_message().await {
            Ok(message) => {
                let reply = format!("echo: {}", message.content);
                if let Err(e) = bus.send(&reply, &message.sender).await {
                    tracing::warn!("{} could not reply to {}: {}", bus.identity(), message.sender, e);
                }
            }
            Err(TransportError::Closed) => break,
            Err(e) => {
                tracing::warn!("Echo peer {} stopped: {}", bus.identity(), e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerchat_client::ChatConfig;
    use peerchat_core::RetryPolicy;
    use std::time::Duration;
    use tempfile::tempdir;

    use crate::commands::next_display;

    // ===========================================
    // Input Parsing Tests
    // ===========================================

    #[test]
    fn plain_text_is_sent() {
        assert_eq!(parse_line("hello there"), Input::Send("hello there"));
        assert_eq!(parse_line("  padded  "), Input::Send("padded"));
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse_line(""), Input::Empty);
        assert_eq!(parse_line("   "), Input::Empty);
    }

    #[test]
    fn slash_commands_are_recognised() {
        assert_eq!(parse_line("/quit"), Input::Quit);
        assert_eq!(parse_line("/exit"), Input::Quit);
        assert_eq!(parse_line("/peers"), Input::Peers);
        assert_eq!(parse_line("/history"), Input::History);
        assert_eq!(parse_line("/help"), Input::Help);
        assert_eq!(parse_line("/to  carol "), Input::To("carol"));
    }

    #[test]
    fn bad_commands_are_unknown() {
        assert_eq!(parse_line("/to"), Input::Unknown("/to"));
        assert_eq!(parse_line("/dance now"), Input::Unknown("/dance now"));
    }

    // ===========================================
    // Echo Peer Tests
    // ===========================================

    #[tokio::test]
    async fn echo_peer_answers_and_is_discoverable() {
        let dir = tempdir().unwrap();
        let hub = LocalHub::new();
        let echo = spawn_echo_peer(&hub, Identity::from("bob")).await.unwrap();

        let config = ChatConfig::new("alice", dir.path().join("alice.json"))
            .with_retry(RetryPolicy::new(1, Duration::ZERO));
        let endpoint = hub.endpoint("alice");
        let (session, mut ui) = ChatSession::start(config, endpoint.clone(), endpoint).await;

        assert_eq!(session.get_peers().await, vec![Identity::from("bob")]);

        session
            .send_message_from_ui("hi", &"bob".into())
            .await
            .unwrap();
        assert_eq!(next_display(&mut ui).await.unwrap(), "You: hi");
        assert_eq!(next_display(&mut ui).await.unwrap(), "bob: echo: hi");
        assert_eq!(
            session.get_conversation_history(&"bob".into()).await,
            "alice: hi\nbob: echo: hi\n"
        );

        hub.kill(&"bob".into());
        tokio::time::timeout(Duration::from_secs(1), echo)
            .await
            .expect("echo peer should stop once its mailbox closes")
            .unwrap();
    }
}
