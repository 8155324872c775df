//! Process-wide driver registry.
//!
//! Drivers are named factories producing [`Engine`]s. The three built-in
//! drivers (`memory`, `sql`, `redis`) are present from the start; custom
//! drivers can be added with [`register`] before the first [`connect`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::driver::kv::RedisDriver;
use crate::driver::memory::MemoryDriver;
use crate::driver::sql::{DEFAULT_CLEANUP_INTERVAL, SqlDriver};
use crate::engine::Engine;
use crate::errors::SessionError;
use crate::session::SessionBuilder;

/// Backend-specific connection handle forwarded opaquely to a driver.
pub enum Backend {
    /// For drivers that need no handle (memory).
    None,
    Sqlite(sqlx::SqlitePool),
    Postgres(sqlx::PgPool),
    Redis(redis::Client),
    RedisUrl(String),
}

/// Arguments for [`Driver::start`].
pub struct StartArgs {
    pub backend: Backend,
    /// Overrides the constructor used to rebuild loaded sessions.
    pub builder: Option<SessionBuilder>,
    /// Opts the relational driver into its periodic bulk delete of
    /// expired rows. Other drivers ignore it.
    pub cleanup_every: Option<Duration>,
}

impl StartArgs {
    pub fn new() -> Self {
        Self {
            backend: Backend::None,
            builder: None,
            cleanup_every: None,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_builder(mut self, builder: SessionBuilder) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_cleanup_every(mut self, every: Duration) -> Self {
        self.cleanup_every = Some(every);
        self
    }

    /// Like [`with_cleanup_every`](Self::with_cleanup_every), at
    /// [`DEFAULT_CLEANUP_INTERVAL`](crate::DEFAULT_CLEANUP_INTERVAL).
    pub fn with_cleanup(mut self) -> Self {
        self.cleanup_every = Some(DEFAULT_CLEANUP_INTERVAL);
        self
    }
}

impl Default for StartArgs {
    fn default() -> Self {
        Self::new()
    }
}

/// A named factory that constructs an [`Engine`].
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Opens a live engine against the backend described by `args`.
    ///
    /// Any background activity the engine needs (expiry sweeps) must be
    /// bound to `shutdown` and exit promptly once it is cancelled.
    async fn start(
        &self,
        shutdown: CancellationToken,
        args: StartArgs,
    ) -> Result<Arc<dyn Engine>, SessionError>;
}

static DRIVERS: LazyLock<Mutex<HashMap<String, Arc<dyn Driver>>>> = LazyLock::new(|| {
    let mut drivers: HashMap<String, Arc<dyn Driver>> = HashMap::new();
    drivers.insert("memory".to_string(), Arc::new(MemoryDriver));
    drivers.insert("sql".to_string(), Arc::new(SqlDriver));
    drivers.insert("redis".to_string(), Arc::new(RedisDriver));
    Mutex::new(drivers)
});

/// Registers a session driver under `name`.
///
/// Registration is expected at process-initialization time, before any
/// [`connect`] call. Duplicate names fail with
/// [`SessionError::AlreadyRegistered`].
pub fn register(name: &str, driver: Arc<dyn Driver>) -> Result<(), SessionError> {
    let mut drivers = DRIVERS.lock().expect("driver registry lock poisoned");
    if drivers.contains_key(name) {
        return Err(SessionError::AlreadyRegistered(name.to_string()));
    }
    drivers.insert(name.to_string(), driver);
    Ok(())
}

/// Connects to a registered session driver.
///
/// Unknown names fail with [`SessionError::DriverNotFound`]; everything
/// else is delegated to the driver's [`start`](Driver::start).
pub async fn connect(
    shutdown: CancellationToken,
    name: &str,
    args: StartArgs,
) -> Result<Arc<dyn Engine>, SessionError> {
    let driver = {
        let drivers = DRIVERS.lock().expect("driver registry lock poisoned");
        drivers.get(name).cloned()
    };
    match driver {
        Some(driver) => driver.start(shutdown, args).await,
        None => Err(SessionError::DriverNotFound(name.to_string())),
    }
}
