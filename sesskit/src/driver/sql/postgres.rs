use sqlx::{Pool, Postgres, Row};

use crate::errors::SessionError;

pub(super) async fn create_table(pool: &Pool<Postgres>, table: &str) -> Result<(), SessionError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY NOT NULL,
            data TEXT,
            expires BIGINT NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;
    Ok(())
}

pub(super) async fn exists(
    pool: &Pool<Postgres>,
    table: &str,
    id: &str,
) -> Result<bool, SessionError> {
    let found: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

pub(super) async fn load(
    pool: &Pool<Postgres>,
    table: &str,
    id: &str,
) -> Result<Option<(Option<String>, i64)>, SessionError> {
    let row = sqlx::query(&format!("SELECT data, expires FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some((row.try_get("data")?, row.try_get("expires")?))),
        None => Ok(None),
    }
}

pub(super) async fn save(
    pool: &Pool<Postgres>,
    table: &str,
    id: &str,
    data: Option<&str>,
    expires: i64,
) -> Result<(), SessionError> {
    sqlx::query(&format!(
        r#"
        INSERT INTO {table} (id, data, expires) VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET data = excluded.data, expires = excluded.expires
        "#
    ))
    .bind(id)
    .bind(data)
    .bind(expires)
    .execute(pool)
    .await?;
    Ok(())
}

pub(super) async fn count(pool: &Pool<Postgres>, table: &str) -> Result<i64, SessionError> {
    let counted: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(counted)
}

pub(super) async fn delete_expired(
    pool: &Pool<Postgres>,
    table: &str,
    now: i64,
) -> Result<u64, SessionError> {
    let result = sqlx::query(&format!("DELETE FROM {table} WHERE expires < $1"))
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
