//! Telegram gateway: long-polls `getUpdates` over the Bot API.

use super::{ChatEvent, ChatGateway};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramGateway {
    client: reqwest::Client,
    token: String,
    offset: i64,
}

impl TelegramGateway {
    pub fn new(token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("hush-service/0.1")
            .build()?;
        Ok(Self {
            client,
            token: token.to_string(),
            offset: 0,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?;
        let data: Value = response.json().await?;
        if !data.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let description = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown telegram api error");
            return Err(anyhow!("{method} failed: {description}"));
        }
        Ok(data)
    }
}

fn parse_update(update: &Value) -> Option<ChatEvent> {
    let message = update.get("message")?;
    let text = message.get("text")?.as_str()?;
    let message_id = message.get("message_id")?.as_i64()?;
    let chat_id = message.get("chat")?.get("id")?.as_i64()?;
    let author_id = message.get("from")?.get("id")?.as_i64()?;
    Some(ChatEvent {
        message_id: message_id.to_string(),
        chat_id: chat_id.to_string(),
        author_id: author_id.to_string(),
        text: text.to_string(),
    })
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn next_events(&mut self) -> Result<Vec<ChatEvent>> {
        let data = self
            .call(
                "getUpdates",
                json!({
                    "offset": self.offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        let mut events = Vec::new();
        if let Some(updates) = data.get("result").and_then(Value::as_array) {
            for update in updates {
                if let Some(update_id) = update.get("update_id").and_then(Value::as_i64) {
                    self.offset = self.offset.max(update_id + 1);
                }
                if let Some(event) = parse_update(update) {
                    events.push(event);
                }
            }
        }
        Ok(events)
    }

    async fn send_direct(&self, identity: &str, text: &str) -> Result<()> {
        self.call(
            "sendMessage",
            json!({"chat_id": identity, "text": text}),
        )
        .await?;
        Ok(())
    }

    async fn delete_message(&self, event: &ChatEvent) -> Result<()> {
        let message_id: i64 = event.message_id.parse()?;
        self.call(
            "deleteMessage",
            json!({"chat_id": event.chat_id, "message_id": message_id}),
        )
        .await?;
        Ok(())
    }
}
