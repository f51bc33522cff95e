//! Error types for `lendcrm-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The actor identity is missing or malformed.
  #[error("unauthorized")]
  Unauthorized,

  /// The actor is known but lacks the role or status for the operation.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("insufficient balance: requested {requested}, available {available}")]
  InsufficientBalance { requested: i64, available: i64 },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Box a backend error into [`Error::Store`].
pub fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}
