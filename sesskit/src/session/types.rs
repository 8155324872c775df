use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Key/value payload of one session. Values are opaque JSON documents;
/// the storage layer never interprets them.
pub type SessionMap = HashMap<String, Value>;

/// Builds a session from its id, initial data and expiry.
///
/// Engines call this on load to reconstruct a stored session; the
/// middleware calls it with `None` data when minting a fresh one.
pub type SessionBuilder =
    Arc<dyn Fn(String, Option<SessionMap>, DateTime<Utc>) -> Arc<dyn Session> + Send + Sync>;

/// What is saved on the server. The browser only ever sees the id,
/// carried in a cookie.
///
/// Implementations must be safe to share across tasks: the handler, the
/// middleware's post-request save and an expiry sweep may all observe one
/// session concurrently.
pub trait Session: Send + Sync {
    /// Opaque unique id; immutable after creation and never empty for a
    /// persisted session.
    fn id(&self) -> &str;

    /// Absolute expiration instant.
    fn expires(&self) -> DateTime<Utc>;

    fn set_expires(&self, at: DateTime<Utc>);

    /// Value stored under `key`, if any. An absent data map reads as empty.
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Snapshot of the whole payload. Empty when no data was ever set.
    fn get_all(&self) -> SessionMap;
}

struct State {
    data: Option<SessionMap>,
    expires: DateTime<Utc>,
}

/// Basic [`Session`] implementation guarded by a reader/writer lock.
pub struct DefaultSession {
    id: String,
    state: RwLock<State>,
}

impl DefaultSession {
    /// A fresh session starts with `data: None`; the map is allocated on
    /// the first `set`.
    pub fn new(id: String, data: Option<SessionMap>, expires: DateTime<Utc>) -> Self {
        Self {
            id,
            state: RwLock::new(State { data, expires }),
        }
    }
}

impl Session for DefaultSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn expires(&self) -> DateTime<Utc> {
        self.state.read().expect("session state lock poisoned").expires
    }

    fn set_expires(&self, at: DateTime<Utc>) {
        self.state.write().expect("session state lock poisoned").expires = at;
    }

    fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.read().expect("session state lock poisoned");
        state.data.as_ref().and_then(|data| data.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) {
        let mut state = self.state.write().expect("session state lock poisoned");
        state
            .data
            .get_or_insert_with(SessionMap::new)
            .insert(key.to_string(), value);
    }

    fn get_all(&self) -> SessionMap {
        let state = self.state.read().expect("session state lock poisoned");
        state.data.clone().unwrap_or_default()
    }
}

/// [`SessionBuilder`] producing [`DefaultSession`] values.
pub fn default_builder() -> SessionBuilder {
    Arc::new(|id, data, expires| Arc::new(DefaultSession::new(id, data, expires)))
}
