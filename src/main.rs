//! `confab` - chat with a remote assistant without losing a session
//!
//! Every exchange is persisted to the session store as it happens, so a
//! dropped connection loses at most the in-flight turn. `resume` rebuilds
//! context from the persisted history and continues where the conversation
//! stopped.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::EnvFilter;

use confab_core::{
    ChatClient, ContinuityManager, ConversationPatch, ConversationStatus, SessionData, Settings,
    SessionStoreClient, StreamEvent, Turn,
};

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;
    let retry = settings.retry_policy();
    let chat = ChatClient::new(settings.chat_config(), retry.clone())?;
    let store = SessionStoreClient::new(settings.store_config(), retry)?;
    let manager = ContinuityManager::new(store, chat.clone());

    match cli.command {
        Commands::Chat {
            user,
            message,
            conversation,
            title,
            stream,
        } => {
            run_chat(&manager, &chat, &user, &message, conversation, &title, stream).await?;
        }

        Commands::Sessions { user } => {
            let records = manager.list(&user).await?;
            if records.is_empty() {
                println!("no stored conversations for {user}");
            }
            for record in records {
                let updated = record
                    .updated_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    record.conversation_id, record.status, updated, record.title
                );
            }
        }

        Commands::Resume { user, conversation } => {
            let response = manager.resume(&user, &conversation).await?;
            println!(
                "{}",
                reply_content(&response.data).unwrap_or_else(|| response.data.to_string())
            );
            // The manager leaves the status bit to its caller; flip the
            // record back to active now that the resume round-trip worked.
            manager
                .update(
                    &user,
                    &conversation,
                    &ConversationPatch::new().status(ConversationStatus::Active),
                )
                .await?;
        }

        Commands::Interrupt { user, conversation } => {
            manager
                .update(
                    &user,
                    &conversation,
                    &ConversationPatch::new().status(ConversationStatus::Interrupted),
                )
                .await?;
            println!("conversation {conversation} marked interrupted");
        }

        Commands::Finish { user, conversation } => {
            manager
                .update(
                    &user,
                    &conversation,
                    &ConversationPatch::new().status(ConversationStatus::Finished),
                )
                .await?;
            println!("conversation {conversation} marked finished");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_chat(
    manager: &ContinuityManager,
    chat: &ChatClient,
    user: &str,
    message: &str,
    conversation: Option<String>,
    title: &str,
    stream: bool,
) -> Result<()> {
    let (external_id, existing) = match conversation {
        Some(id) => {
            let existing = manager.get(user, &id).await?;
            (id, existing)
        }
        None => (uuid::Uuid::new_v4().to_string(), None),
    };

    let reply_text = if stream {
        let mut events = chat.send_message_stream(user, message).await?;
        let mut full = String::new();
        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(text) = delta_content(&event) {
                print!("{text}");
                std::io::stdout().flush().ok();
                full.push_str(&text);
            }
        }
        println!();
        full
    } else {
        let response = chat.send_message(user, message).await?;
        let text =
            reply_content(&response.data).unwrap_or_else(|| response.data.to_string());
        println!("{text}");
        text
    };

    // Persist the exchange: save creates the record on the first turn,
    // every later turn goes through update.
    let is_new = existing.is_none();
    let mut session: SessionData = existing.unwrap_or_default();
    session.messages.push(Turn::new("user", message));
    if !reply_text.is_empty() {
        session.messages.push(Turn::new("assistant", reply_text));
    }

    if is_new {
        manager
            .save(user, &external_id, title, ConversationStatus::Active, &session)
            .await?;
    } else {
        manager
            .update(
                user,
                &external_id,
                &ConversationPatch::new().session_data(session),
            )
            .await?;
    }

    println!("[conversation {external_id}]");
    Ok(())
}

/// Incremental text carried by a streamed delta event, if any.
fn delta_content(event: &StreamEvent) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(&event.data).ok()?;
    parsed
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Assistant text inside a materialized response payload, if present.
fn reply_content(data: &serde_json::Value) -> Option<String> {
    data.get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
