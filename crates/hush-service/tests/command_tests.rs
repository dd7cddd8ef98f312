use async_trait::async_trait;
use chrono::{Duration, Utc};
use hush_core::presence::{self, SharedPresence};
use hush_service::chat::command::{self, GateDenial, Invocation};
use hush_service::chat::{ChatEvent, ChatGateway};
use hush_service::store::{MessageStore, StoredMessage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct RecordingGateway {
    direct: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: bool,
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn next_events(&mut self) -> anyhow::Result<Vec<ChatEvent>> {
        Ok(vec![])
    }

    async fn send_direct(&self, identity: &str, text: &str) -> anyhow::Result<()> {
        self.direct
            .lock()
            .push((identity.to_string(), text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, event: &ChatEvent) -> anyhow::Result<()> {
        if self.fail_deletes {
            anyhow::bail!("delete forbidden");
        }
        self.deleted.lock().push(event.message_id.clone());
        Ok(())
    }
}

/// In-memory store that counts every call, for short-circuit assertions.
#[derive(Default)]
struct CountingStore {
    messages: Mutex<Vec<StoredMessage>>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

#[async_trait]
impl MessageStore for CountingStore {
    async fn create(
        &self,
        content: &str,
        author: &str,
        category: Option<&str>,
    ) -> anyhow::Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("id{:04}", self.messages.lock().len());
        self.messages.lock().push(StoredMessage {
            id: id.clone(),
            content: content.to_string(),
            author: author.to_string(),
            category: category.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(&self, category: Option<&str>) -> anyhow::Result<Vec<StoredMessage>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| category.is_none() || m.category.as_deref() == category)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut messages = self.messages.lock();
        let before = messages.len();
        messages.retain(|m| m.id != id);
        Ok(messages.len() < before)
    }
}

fn event(author: &str, text: &str) -> ChatEvent {
    ChatEvent {
        message_id: "555".to_string(),
        chat_id: "chat-1".to_string(),
        author_id: author.to_string(),
        text: text.to_string(),
    }
}

fn active_presence(identity: &str) -> SharedPresence {
    let shared = presence::shared();
    shared.lock().record(identity, Utc::now());
    shared
}

#[tokio::test]
async fn non_owner_add_is_rejected_before_the_store() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    let presence = active_presence("99");

    let ev = event("99", "!add #secret the cellar key");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    let direct = gateway.direct.lock();
    assert_eq!(direct.len(), 1);
    assert!(direct[0].1.contains("permission"));
}

#[tokio::test]
async fn inactive_owner_is_rejected_before_the_store() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    let presence = presence::shared();
    // Seen, but outside the 10s active window.
    presence
        .lock()
        .record("42", Utc::now() - Duration::seconds(20));

    let ev = event("42", "!add the cellar key");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    let direct = gateway.direct.lock();
    assert!(direct[0].1.contains("active"));
}

#[tokio::test]
async fn active_owner_add_stores_and_confirms() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    let presence = active_presence("42");

    let ev = event("42", "!add #secret the cellar key");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.deleted.lock().as_slice(), ["555"]);
    let direct = gateway.direct.lock();
    assert!(direct[0].1.contains("ID: id0000"));
    assert!(direct[0].1.contains("secret"));
}

#[tokio::test]
async fn list_is_open_to_any_active_identity() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    store.create("hello", "42", Some("secret")).await.unwrap();
    store.create_calls.store(0, Ordering::SeqCst);
    let presence = active_presence("99");

    let ev = event("99", "!list #secret");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    let direct = gateway.direct.lock();
    assert!(direct[0].1.contains("hello"));
}

#[tokio::test]
async fn list_requires_an_active_companion() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    let presence = presence::shared();

    let ev = event("99", "!list");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    assert!(gateway.direct.lock()[0].1.contains("active"));
}

#[tokio::test]
async fn delete_reports_missing_ids() {
    let gateway = RecordingGateway::default();
    let store = CountingStore::default();
    let presence = active_presence("42");

    let id = store.create("hello", "42", None).await.unwrap();
    for _ in 0..2 {
        let ev = event("42", &format!("!delete {id}"));
        let invocation = command::parse(&ev.text).unwrap();
        command::handle(&gateway, &store, &presence, "42", &ev, invocation)
            .await
            .unwrap();
    }

    let direct = gateway.direct.lock();
    assert!(direct[0].1.contains("deleted"));
    assert!(direct[1].1.contains("not found"));
}

#[tokio::test]
async fn failed_channel_cleanup_does_not_block_the_command() {
    let gateway = RecordingGateway {
        fail_deletes: true,
        ..Default::default()
    };
    let store = CountingStore::default();
    let presence = active_presence("42");

    let ev = event("42", "!add still works");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn owner_scenario_against_a_real_store() {
    use hush_service::store::SqliteStore;

    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("messages.db"))
        .await
        .unwrap();
    let gateway = RecordingGateway::default();
    let presence = active_presence("42");

    let ev = event("42", "!add #secret the cellar key");
    let invocation = command::parse(&ev.text).unwrap();
    command::handle(&gateway, &store, &presence, "42", &ev, invocation)
        .await
        .unwrap();

    let secret = store.list(Some("secret")).await.unwrap();
    assert_eq!(secret.len(), 1);
    assert!(store.list(Some("other")).await.unwrap().is_empty());
    let id = secret[0].id.clone();
    assert!(gateway.direct.lock().last().unwrap().1.contains(&id));

    for expected in ["was deleted", "not found"] {
        let ev = event("42", &format!("!delete {id}"));
        let invocation = command::parse(&ev.text).unwrap();
        command::handle(&gateway, &store, &presence, "42", &ev, invocation)
            .await
            .unwrap();
        assert!(gateway.direct.lock().last().unwrap().1.contains(expected));
    }
    assert!(store.list(None).await.unwrap().is_empty());
}

#[test]
fn gate_checks_owner_before_liveness() {
    let presence = presence::shared();
    // Non-owner and inactive: the owner check wins.
    assert_eq!(
        command::check_gate(&presence, "42", "99", true),
        Err(GateDenial::NotOwner)
    );
    assert_eq!(
        command::check_gate(&presence, "42", "42", true),
        Err(GateDenial::NotActive)
    );
}

#[test]
fn invalid_invocations_carry_usage_text() {
    match command::parse("!add").unwrap() {
        Invocation::Invalid(usage) => assert!(usage.contains("!add")),
        other => panic!("unexpected parse: {other:?}"),
    }
}
