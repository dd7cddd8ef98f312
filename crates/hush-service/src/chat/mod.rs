//! Chat subsystem: transport-agnostic command loop plus the Telegram
//! long-poll gateway.

pub mod command;
pub mod telegram;

use crate::store::MessageStore;
use anyhow::Result;
use async_trait::async_trait;
use hush_core::presence::SharedPresence;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, warn};

/// An inbound chat message, normalized across transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub message_id: String,
    /// Channel the message was posted in; deletion targets this.
    pub chat_id: String,
    pub author_id: String,
    pub text: String,
}

/// Uniform interface over a messaging platform.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Blocks (long-poll) until at least one event arrives or the poll
    /// window elapses; an empty vec is a normal outcome.
    async fn next_events(&mut self) -> Result<Vec<ChatEvent>>;

    /// Delivers a private reply to `identity`.
    async fn send_direct(&self, identity: &str, text: &str) -> Result<()>;

    /// Removes the triggering message from its channel. Best-effort: the
    /// caller logs a failure and carries on.
    async fn delete_message(&self, event: &ChatEvent) -> Result<()>;
}

/// Drives the command loop until the task is aborted. Poll failures back
/// off and retry; per-command failures are reported to the invoker and
/// never tear the loop down.
pub async fn run_chat_loop<G: ChatGateway>(
    mut gateway: G,
    store: Arc<dyn MessageStore>,
    presence: SharedPresence,
    owner_id: String,
) -> Result<()> {
    tracing::info!("chat command loop started");
    loop {
        let events = match gateway.next_events().await {
            Ok(events) => events,
            Err(err) => {
                warn!(error = %err, "event poll failed");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for event in events {
            let Some(invocation) = command::parse(&event.text) else {
                continue;
            };
            if let Err(err) = command::handle(
                &gateway,
                store.as_ref(),
                &presence,
                &owner_id,
                &event,
                invocation,
            )
            .await
            {
                error!(error = %err, author = %event.author_id, "command handler failed");
                let _ = gateway
                    .send_direct(
                        &event.author_id,
                        "Something went wrong while handling that command.",
                    )
                    .await;
            }
        }
    }
}
