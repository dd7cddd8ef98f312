//! Command parsing and the liveness-gated dispatcher.

use super::{ChatEvent, ChatGateway};
use crate::store::{MessageStore, StoredMessage};
use anyhow::Result;
use chrono::Utc;
use hush_core::presence::SharedPresence;
use tracing::{error, info, warn};

pub const COMMAND_PREFIX: char = '!';
/// Replies are chunked below this to stay inside transport message limits.
const MAX_REPLY_CHARS: usize = 1900;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Add {
        category: Option<String>,
        content: String,
    },
    List {
        category: Option<String>,
    },
    Delete {
        id: String,
    },
    /// A recognized command with unusable arguments; the reply is the usage
    /// line sent back to the invoker.
    Invalid(&'static str),
}

/// Why the gate refused a command.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum GateDenial {
    #[error("permission denied")]
    NotOwner,
    #[error("companion not active")]
    NotActive,
}

/// Returns `None` for anything that is not a command; unknown commands are
/// ignored rather than answered.
pub fn parse(text: &str) -> Option<Invocation> {
    let rest = text.trim().strip_prefix(COMMAND_PREFIX)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    match name {
        "add" => {
            let mut remainder: Vec<&str> = words.collect();
            let category = match remainder.first().and_then(|word| word.strip_prefix('#')) {
                Some(tag) if !tag.is_empty() => {
                    remainder.remove(0);
                    Some(tag.to_string())
                }
                _ => None,
            };
            if remainder.is_empty() {
                return Some(Invocation::Invalid("Usage: !add [#category] <message>"));
            }
            Some(Invocation::Add {
                category,
                content: remainder.join(" "),
            })
        }
        "list" => {
            let category = words
                .next()
                .map(|word| word.strip_prefix('#').unwrap_or(word).to_string());
            Some(Invocation::List { category })
        }
        "delete" => match words.next() {
            Some(id) => Some(Invocation::Delete { id: id.to_string() }),
            None => Some(Invocation::Invalid("Usage: !delete <id>")),
        },
        _ => None,
    }
}

/// Owner check first, liveness second; neither touches the store.
pub fn check_gate(
    presence: &SharedPresence,
    owner_id: &str,
    author_id: &str,
    privileged: bool,
) -> std::result::Result<(), GateDenial> {
    if privileged && author_id != owner_id {
        return Err(GateDenial::NotOwner);
    }
    if !presence.lock().is_actively_running(author_id, Utc::now()) {
        return Err(GateDenial::NotActive);
    }
    Ok(())
}

pub async fn handle<G: ChatGateway + ?Sized>(
    gateway: &G,
    store: &dyn MessageStore,
    presence: &SharedPresence,
    owner_id: &str,
    event: &ChatEvent,
    invocation: Invocation,
) -> Result<()> {
    if let Invocation::Invalid(usage) = invocation {
        gateway.send_direct(&event.author_id, usage).await?;
        return Ok(());
    }

    // Wipe the command from the shared channel before anything else so the
    // command text does not linger there.
    if let Err(err) = gateway.delete_message(event).await {
        warn!(error = %err, message_id = %event.message_id, "could not delete command message");
    }

    let privileged = matches!(
        invocation,
        Invocation::Add { .. } | Invocation::Delete { .. }
    );
    if let Err(denial) = check_gate(presence, owner_id, &event.author_id, privileged) {
        info!(author = %event.author_id, %denial, "command refused");
        let reply = match denial {
            GateDenial::NotOwner => "You don't have permission to use this command.",
            GateDenial::NotActive => "Your companion app must be active to use this command.",
        };
        gateway.send_direct(&event.author_id, reply).await?;
        return Ok(());
    }

    match invocation {
        Invocation::Add { category, content } => {
            match store
                .create(&content, &event.author_id, category.as_deref())
                .await
            {
                Ok(id) => {
                    info!(id = %id, author = %event.author_id, "message stored");
                    let reply = format!(
                        "Message stored.\nID: {id}\nCategory: {}",
                        category.as_deref().unwrap_or("none")
                    );
                    gateway.send_direct(&event.author_id, &reply).await?;
                }
                Err(err) => {
                    error!(error = %err, "failed to store message");
                    gateway
                        .send_direct(&event.author_id, "There was an error saving the message.")
                        .await?;
                }
            }
        }
        Invocation::List { category } => match store.list(category.as_deref()).await {
            Ok(messages) if messages.is_empty() => {
                let reply = match &category {
                    Some(category) => format!("No messages in category {category}."),
                    None => "No messages.".to_string(),
                };
                gateway.send_direct(&event.author_id, &reply).await?;
            }
            Ok(messages) => {
                for chunk in chunk_reply(&render_listing(&messages, category.as_deref())) {
                    gateway.send_direct(&event.author_id, &chunk).await?;
                }
                info!(author = %event.author_id, count = messages.len(), "listing sent");
            }
            Err(err) => {
                error!(error = %err, "failed to list messages");
                gateway
                    .send_direct(&event.author_id, "There was an error reading the messages.")
                    .await?;
            }
        },
        Invocation::Delete { id } => match store.delete(&id).await {
            Ok(true) => {
                info!(id = %id, author = %event.author_id, "message deleted");
                gateway
                    .send_direct(&event.author_id, &format!("Message {id} was deleted."))
                    .await?;
            }
            Ok(false) => {
                gateway
                    .send_direct(&event.author_id, &format!("Message {id} not found."))
                    .await?;
            }
            Err(err) => {
                error!(error = %err, "failed to delete message");
                gateway
                    .send_direct(&event.author_id, "There was an error deleting the message.")
                    .await?;
            }
        },
        Invocation::Invalid(_) => unreachable!("handled above"),
    }
    Ok(())
}

fn render_listing(messages: &[StoredMessage], category: Option<&str>) -> String {
    let mut out = String::from("Stored messages\n\n");
    if let Some(category) = category {
        out.push_str(&format!("Category: {category}\n\n"));
    }
    for message in messages {
        out.push_str(&format!(
            "ID: {} | {}\n{}\n{}\n\n",
            message.id,
            message.created_at.format("%Y-%m-%d %H:%M"),
            "=".repeat(40),
            message.content,
        ));
    }
    out
}

/// Splits on the last newline below the limit so entries stay intact.
fn chunk_reply(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while remaining.len() > MAX_REPLY_CHARS {
        let mut limit = MAX_REPLY_CHARS;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let cut = remaining[..limit]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(limit);
        chunks.push(remaining[..cut].to_string());
        remaining = &remaining[cut..];
    }
    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}
