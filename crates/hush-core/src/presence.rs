use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Window within which an identity counts as reachable at all.
pub const REACHABLE_WINDOW_SECS: i64 = 30;
/// Tighter window used to gate privileged commands.
pub const ACTIVE_WINDOW_SECS: i64 = 10;

/// Last-seen table for companion identities.
///
/// No background sweeper: staleness is computed lazily at query time.
/// Identities are unbounded in principle but bounded in practice by the
/// single-operator deployment.
#[derive(Debug, Default)]
pub struct PresenceTable {
    seen: HashMap<String, DateTime<Utc>>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally records `identity` as seen at `now`.
    pub fn record(&mut self, identity: &str, now: DateTime<Utc>) {
        self.seen.insert(identity.to_string(), now);
    }

    /// 30-second window. A stale entry is evicted as a side effect.
    pub fn is_reachable(&mut self, identity: &str, now: DateTime<Utc>) -> bool {
        match self.seen.get(identity) {
            None => false,
            Some(&last_seen) if now - last_seen <= Duration::seconds(REACHABLE_WINDOW_SECS) => true,
            Some(_) => {
                self.seen.remove(identity);
                false
            }
        }
    }

    /// 10-second window, read-only: does not evict. The public reachability
    /// check expires slower than this one so status surfaces can still show
    /// "connecting" while privileged commands already fail.
    pub fn is_actively_running(&self, identity: &str, now: DateTime<Utc>) -> bool {
        match self.seen.get(identity) {
            None => false,
            Some(&last_seen) => now - last_seen <= Duration::seconds(ACTIVE_WINDOW_SECS),
        }
    }
}

/// The table is shared between the HTTP handlers and the chat command loop,
/// which run on parallel runtime threads; every read-evict-write sequence
/// happens under a single lock acquisition.
pub type SharedPresence = Arc<Mutex<PresenceTable>>;

pub fn shared() -> SharedPresence {
    Arc::new(Mutex::new(PresenceTable::new()))
}
