//! Server-side session storage for HTTP request handlers.
//!
//! A session is an opaque bag of JSON values with an absolute expiry,
//! identified by an id the browser carries in a cookie. Storage backends
//! are interchangeable [`Engine`]s resolved by name through a driver
//! registry:
//!
//! - `memory` — process-local map with a periodic expiry sweep
//! - `sql` — SQLite or Postgres table via sqlx, with optional bulk cleanup
//! - `redis` — Redis keys with the server's native TTL
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), sesskit::SessionError> {
//! let shutdown = CancellationToken::new();
//! let engine = sesskit::connect(shutdown.clone(), "memory", sesskit::StartArgs::new()).await?;
//!
//! let session = sesskit::default_builder()(
//!     sesskit::new_session_id(),
//!     None,
//!     chrono::Utc::now() + std::time::Duration::from_secs(1800),
//! );
//! session.set("count", serde_json::json!(1));
//! engine.save(session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Cancelling the token passed to [`connect`] stops any background sweep
//! task the engine spawned.

mod driver;
mod engine;
mod errors;
mod registry;
mod session;

pub use driver::kv::RedisDriver;
pub use driver::memory::MemoryDriver;
pub use driver::sql::{DEFAULT_CLEANUP_INTERVAL, SqlDriver};
pub use engine::Engine;
pub use errors::SessionError;
pub use registry::{Backend, Driver, StartArgs, connect, register};
pub use session::{
    DefaultSession, Session, SessionBuilder, SessionMap, default_builder, new_session_id,
};
