//! Relational session engine over sqlx, serving SQLite and Postgres pools.
//!
//! Rows live in `{prefix}sessions` as `(id, data, expires)` with the
//! payload as JSON text and the expiry as Unix seconds. Expired rows are
//! only removed by the optional cleanup sweep; until then they still
//! count as existing.

use std::env;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;
use crate::errors::SessionError;
use crate::registry::{Backend, Driver, StartArgs};
use crate::session::{Session, SessionBuilder, SessionMap, default_builder};

mod postgres;
mod sqlite;

/// Sweep cadence used when cleanup is requested without an explicit
/// interval.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Table prefix from the environment; the sessions table is
/// `{prefix}sessions`.
static TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("SESSION_TABLE_PREFIX").unwrap_or_else(|_| "sesskit_".to_string()));

/// The prefix is interpolated into query text, so it must stay a plain
/// identifier. Row values always go through bind parameters.
fn valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

enum SqlPool {
    Sqlite(sqlx::SqlitePool),
    Postgres(sqlx::PgPool),
}

/// Driver for the `sql` backend. Start arguments must carry a SQLite or
/// Postgres pool; `cleanup_every` opts into the expired-row sweep.
pub struct SqlDriver;

#[async_trait]
impl Driver for SqlDriver {
    async fn start(
        &self,
        shutdown: CancellationToken,
        args: StartArgs,
    ) -> Result<Arc<dyn Engine>, SessionError> {
        let pool = match args.backend {
            Backend::Sqlite(pool) => SqlPool::Sqlite(pool),
            Backend::Postgres(pool) => SqlPool::Postgres(pool),
            _ => {
                return Err(SessionError::InvalidArguments(
                    "sql driver needs a sqlite or postgres pool".to_string(),
                ));
            }
        };

        let prefix = TABLE_PREFIX.as_str();
        if !valid_prefix(prefix) {
            return Err(SessionError::InvalidArguments(format!(
                "table prefix {prefix:?} is not a plain identifier"
            )));
        }

        let engine = Arc::new(SqlEngine {
            pool,
            table: format!("{prefix}sessions"),
            builder: args.builder.unwrap_or_else(default_builder),
        });
        engine.create_table().await?;

        if let Some(every) = args.cleanup_every {
            tokio::spawn(run_cleanup(shutdown, Arc::clone(&engine), every));
        }
        Ok(engine)
    }
}

struct SqlEngine {
    pool: SqlPool,
    table: String,
    builder: SessionBuilder,
}

impl SqlEngine {
    async fn create_table(&self) -> Result<(), SessionError> {
        match &self.pool {
            SqlPool::Sqlite(pool) => sqlite::create_table(pool, &self.table).await,
            SqlPool::Postgres(pool) => postgres::create_table(pool, &self.table).await,
        }
    }

    async fn delete_expired(&self) -> Result<u64, SessionError> {
        let now = Utc::now().timestamp();
        match &self.pool {
            SqlPool::Sqlite(pool) => sqlite::delete_expired(pool, &self.table, now).await,
            SqlPool::Postgres(pool) => postgres::delete_expired(pool, &self.table, now).await,
        }
    }
}

async fn run_cleanup(shutdown: CancellationToken, engine: Arc<SqlEngine>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick of a tokio interval completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match engine.delete_expired().await {
                Ok(0) => {}
                Ok(deleted) => tracing::debug!(deleted, "removed expired session rows"),
                // Skip the failed cycle; the loop keeps running.
                Err(err) => tracing::warn!(%err, "session cleanup sweep failed"),
            },
        }
    }
}

#[async_trait]
impl Engine for SqlEngine {
    async fn exists(&self, id: &str) -> bool {
        let found = match &self.pool {
            SqlPool::Sqlite(pool) => sqlite::exists(pool, &self.table, id).await,
            SqlPool::Postgres(pool) => postgres::exists(pool, &self.table, id).await,
        };
        found.unwrap_or(false)
    }

    async fn load(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let row = match &self.pool {
            SqlPool::Sqlite(pool) => sqlite::load(pool, &self.table, id).await?,
            SqlPool::Postgres(pool) => postgres::load(pool, &self.table, id).await?,
        };
        let Some((data, expires)) = row else {
            return Err(SessionError::NotFound);
        };

        // NULL data is a session that never had a key set.
        let map: SessionMap = match data {
            Some(text) => serde_json::from_str(&text).map_err(|err| {
                tracing::warn!(%err, id, "stored session payload is not valid json");
                SessionError::NotFound
            })?,
            None => SessionMap::new(),
        };
        let expires = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or(SessionError::NotFound)?;
        Ok((self.builder)(id.to_string(), Some(map), expires))
    }

    async fn save(&self, session: Arc<dyn Session>) -> Result<(), SessionError> {
        let data = session.get_all();
        let text = if data.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&data)?)
        };
        let expires = session.expires().timestamp();
        match &self.pool {
            SqlPool::Sqlite(pool) => {
                sqlite::save(pool, &self.table, session.id(), text.as_deref(), expires).await
            }
            SqlPool::Postgres(pool) => {
                postgres::save(pool, &self.table, session.id(), text.as_deref(), expires).await
            }
        }
    }

    async fn count(&self) -> usize {
        let counted = match &self.pool {
            SqlPool::Sqlite(pool) => sqlite::count(pool, &self.table).await,
            SqlPool::Postgres(pool) => postgres::count(pool, &self.table).await,
        };
        counted.map(|n| n as usize).unwrap_or(0)
    }
}
