//! In-process session engine: one map, one mutex, periodic expiry sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;
use crate::errors::SessionError;
use crate::registry::{Driver, StartArgs};
use crate::session::Session;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Driver for the `memory` backend. Needs no start arguments.
pub struct MemoryDriver;

#[async_trait]
impl Driver for MemoryDriver {
    async fn start(
        &self,
        shutdown: CancellationToken,
        _args: StartArgs,
    ) -> Result<Arc<dyn Engine>, SessionError> {
        let engine = Arc::new(MemoryEngine {
            entries: Mutex::new(HashMap::new()),
        });
        tokio::spawn(run_sweep(shutdown, Arc::clone(&engine)));
        Ok(engine)
    }
}

/// Sessions are stored as live handles, so handler mutations are visible
/// without an explicit save. The single mutex is only ever held for
/// in-memory map operations.
struct MemoryEngine {
    entries: Mutex<HashMap<String, Arc<dyn Session>>>,
}

impl MemoryEngine {
    /// Drops every entry whose expiry is in the past. Idempotent; racing
    /// with a concurrent save is benign, the session just reappears with
    /// a fresh expiry.
    fn sweep(&self) {
        let now = Utc::now();
        let mut entries = self.entries.lock().expect("session map lock poisoned");
        entries.retain(|_, session| session.expires() > now);
    }
}

async fn run_sweep(shutdown: CancellationToken, engine: Arc<MemoryEngine>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    // The first tick of a tokio interval completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => engine.sweep(),
        }
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn exists(&self, id: &str) -> bool {
        self.entries
            .lock()
            .expect("session map lock poisoned")
            .contains_key(id)
    }

    async fn load(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        self.entries
            .lock()
            .expect("session map lock poisoned")
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    async fn save(&self, session: Arc<dyn Session>) -> Result<(), SessionError> {
        let id = session.id().to_string();
        self.entries
            .lock()
            .expect("session map lock poisoned")
            .insert(id, session);
        Ok(())
    }

    async fn count(&self) -> usize {
        self.entries.lock().expect("session map lock poisoned").len()
    }
}
