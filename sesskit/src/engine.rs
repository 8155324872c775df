use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::SessionError;
use crate::session::Session;

/// A live handle to one storage backend.
///
/// Engines are cheap to share behind an `Arc` and hold no per-session
/// state beyond what the backend itself stores. They stay usable for the
/// lifetime of the process or until the token passed to
/// [`connect`](crate::connect) is cancelled.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Whether a record for `id` is present. Never mutates state; backend
    /// failures read as absent. Expired entries a sweep has not yet
    /// removed may still report present.
    async fn exists(&self, id: &str) -> bool;

    /// Loads the session stored under `id`, reconstructing it through the
    /// engine's session builder.
    ///
    /// [`SessionError::NotFound`] covers both a missing record and an
    /// undecodable payload; medium failures surface as
    /// [`SessionError::Storage`].
    async fn load(&self, id: &str) -> Result<Arc<dyn Session>, SessionError>;

    /// Upserts the session under its current id. Safe to call
    /// concurrently for distinct ids; for one id the last save to
    /// complete wins, callers serialize writes within a request.
    async fn save(&self, session: Arc<dyn Session>) -> Result<(), SessionError>;

    /// Approximate number of stored sessions, for diagnostics only. May
    /// include not-yet-swept expired entries; errors report as 0.
    async fn count(&self) -> usize;
}
