//! Error types for `roster-presence`.

use thiserror::Error;

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("connection refused: {0}")]
  Refused(String),

  #[error("transport is not open")]
  NotOpen,

  #[error("connection closed by peer")]
  Closed,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("transport error: {0}")]
  Transport(#[from] TransportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
