//! API error type and [`axum::response::IntoResponse`] implementation.

use std::error::Error as StdError;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The organization snapshot failed validation. Reported separately from
  /// an empty result so clients never read it as "nobody is assignable".
  #[error("invalid organization snapshot: {0}")]
  InvalidSnapshot(#[source] BoxError),

  #[error("directory error: {0}")]
  Directory(#[source] BoxError),
}

impl ApiError {
  /// Wrap a directory failure, classifying it as a snapshot validation
  /// failure if a [`roster_core::Error`] appears anywhere in its chain.
  pub fn directory<E>(e: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    let boxed: BoxError = Box::new(e);
    let mut current = Some(&*boxed as &(dyn StdError + 'static));
    while let Some(err) = current {
      if err.is::<roster_core::Error>() {
        return ApiError::InvalidSnapshot(boxed);
      }
      current = err.source();
    }
    ApiError::Directory(boxed)
  }
}

impl From<roster_core::Error> for ApiError {
  fn from(e: roster_core::Error) -> Self {
    match e {
      roster_core::Error::EmptyRequesterId => ApiError::BadRequest(e.to_string()),
      other => ApiError::InvalidSnapshot(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::InvalidSnapshot(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
