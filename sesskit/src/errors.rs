use thiserror::Error;

/// Errors produced by the driver registry and the storage engines.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A driver with this name is already present in the registry.
    #[error("session driver {0} already registered")]
    AlreadyRegistered(String),

    /// No driver with this name has been registered.
    #[error("session driver {0} not found")]
    DriverNotFound(String),

    /// No record for the requested id, or the stored payload could not be
    /// decoded.
    #[error("session not found")]
    NotFound,

    /// The underlying storage medium failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Json conversion error.
    #[error("json conversion error: {0}")]
    Serde(String),

    /// Backend-specific start arguments were missing or of the wrong kind.
    #[error("invalid driver arguments: {0}")]
    InvalidArguments(String),
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}
