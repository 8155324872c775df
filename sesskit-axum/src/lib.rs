//! Axum integration for the `sesskit` session store.
//!
//! Install [`session_middleware`] on a router with
//! `axum::middleware::from_fn_with_state`, then take [`CurrentSession`]
//! as an extractor in handlers:
//!
//! ```no_run
//! use axum::{Router, middleware, routing::get};
//! use sesskit_axum::{CurrentSession, SessionConfig, SessionState, session_middleware};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn count(CurrentSession(session): CurrentSession) -> String {
//!     let n = session.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//!     session.set("count", serde_json::json!(n + 1));
//!     format!("Count: {n}")
//! }
//!
//! # async fn run() -> Result<(), sesskit::SessionError> {
//! let engine = sesskit::connect(CancellationToken::new(), "memory", sesskit::StartArgs::new()).await?;
//! let state = SessionState::new(engine, SessionConfig::default());
//! let app: Router = Router::new()
//!     .route("/count", get(count))
//!     .layer(middleware::from_fn_with_state(state, session_middleware));
//! # Ok(())
//! # }
//! ```

mod config;
mod extract;
mod middleware;

pub use config::{SameSite, SessionConfig};
pub use extract::CurrentSession;
pub use middleware::{SessionState, session_middleware};
