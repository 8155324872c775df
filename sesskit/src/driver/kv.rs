//! Redis session engine.
//!
//! Records live under `session_{id}` as an 8-byte big-endian expiry (Unix
//! seconds) immediately followed by the JSON payload. Eviction is
//! delegated to Redis' own per-key TTL, set at save time, so this engine
//! spawns no sweep task.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;
use crate::errors::SessionError;
use crate::registry::{Backend, Driver, StartArgs};
use crate::session::{Session, SessionBuilder, SessionMap, default_builder};

const KEY_PREFIX: &str = "session_";

fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Frames a record value: expiry seconds, then the JSON document.
fn encode_record(expires: i64, data: &SessionMap) -> Result<Vec<u8>, SessionError> {
    let body = serde_json::to_vec(data)?;
    let mut buf = Vec::with_capacity(8 + body.len());
    buf.extend_from_slice(&expires.to_be_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

fn decode_record(raw: &[u8]) -> Result<(i64, SessionMap), SessionError> {
    if raw.len() < 8 {
        return Err(SessionError::NotFound);
    }
    let mut header = [0u8; 8];
    header.copy_from_slice(&raw[..8]);
    let expires = i64::from_be_bytes(header);
    let data = serde_json::from_slice(&raw[8..]).map_err(|_| SessionError::NotFound)?;
    Ok((expires, data))
}

/// Driver for the `redis` backend. Start arguments carry an existing
/// client or a connection URL.
pub struct RedisDriver;

#[async_trait]
impl Driver for RedisDriver {
    async fn start(
        &self,
        _shutdown: CancellationToken,
        args: StartArgs,
    ) -> Result<Arc<dyn Engine>, SessionError> {
        let client = match args.backend {
            Backend::Redis(client) => client,
            Backend::RedisUrl(url) => redis::Client::open(url.as_str())?,
            _ => {
                return Err(SessionError::InvalidArguments(
                    "redis driver needs a client or connection url".to_string(),
                ));
            }
        };
        let engine = RedisEngine {
            client,
            builder: args.builder.unwrap_or_else(default_builder),
        };
        // Fail fast at startup if the server is unreachable.
        engine.client.get_multiplexed_async_connection().await?;
        Ok(Arc::new(engine))
    }
}

struct RedisEngine {
    client: redis::Client,
    builder: SessionBuilder,
}

#[async_trait]
impl Engine for RedisEngine {
    async fn exists(&self, id: &str) -> bool {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return false;
        };
        conn.exists(record_key(id)).await.unwrap_or(false)
    }

    async fn load(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<Vec<u8>> = conn.get(record_key(id)).await?;
        let raw = raw.ok_or(SessionError::NotFound)?;

        let (expires, data) = decode_record(&raw)?;
        let expires = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or(SessionError::NotFound)?;
        Ok((self.builder)(id.to_string(), Some(data), expires))
    }

    async fn save(&self, session: Arc<dyn Session>) -> Result<(), SessionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let expires = session.expires();
        let value = encode_record(expires.timestamp(), &session.get_all())?;
        let key = record_key(session.id());

        let _: () = conn.set(&key, value).await?;
        // The absolute expiry maps onto Redis' relative TTL at save time;
        // a non-positive TTL deletes the key, which is the right outcome
        // for an already-expired session.
        let ttl = (expires - Utc::now()).num_seconds() + 1;
        let _: () = conn.expire(&key, ttl).await?;
        Ok(())
    }

    async fn count(&self) -> usize {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return 0;
        };
        let mut cursor: u64 = 0;
        let mut n = 0;
        loop {
            let page: Result<(u64, Vec<String>), redis::RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(format!("{KEY_PREFIX}*"))
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;
            let Ok((next, keys)) = page else {
                return 0;
            };
            n += keys.len();
            if next == 0 {
                break;
            }
            cursor = next;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_shape() {
        assert_eq!(record_key("abc123"), "session_abc123");
    }

    #[test]
    fn test_record_roundtrip() {
        let mut data = SessionMap::new();
        data.insert("count".to_string(), json!(9));
        data.insert("name".to_string(), json!("alice"));

        let raw = encode_record(1_900_000_000, &data).expect("encode");
        let (expires, decoded) = decode_record(&raw).expect("decode");

        assert_eq!(expires, 1_900_000_000);
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_record_header_is_big_endian() {
        let raw = encode_record(1, &SessionMap::new()).expect("encode");

        assert_eq!(raw[..8], [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(raw[8..], *b"{}");
    }

    #[test]
    fn test_truncated_record_is_not_found() {
        let err = decode_record(&[0, 1, 2]).unwrap_err();

        assert!(matches!(err, SessionError::NotFound));
    }

    #[test]
    fn test_corrupt_payload_is_not_found() {
        let mut raw = 0i64.to_be_bytes().to_vec();
        raw.extend_from_slice(b"{not json");

        let err = decode_record(&raw).unwrap_err();

        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_start_rejects_missing_backend() {
        let Err(err) = RedisDriver
            .start(CancellationToken::new(), StartArgs::new())
            .await
        else {
            panic!("start without a backend should fail");
        };

        assert!(matches!(err, SessionError::InvalidArguments(_)));
    }
}
