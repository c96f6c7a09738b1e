//! HTTP host for the Roster API.
//!
//! Serves [`roster_api::api_router`] under `/api`, backed by a
//! [`FileDirectory`] that re-reads the organization snapshot on every
//! request.

use std::{
  future::Future,
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use roster_core::{OrgSnapshot, directory::Directory};
use serde::Deserialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  /// JSON file holding `{"users": [...]}`.
  pub snapshot_path: PathBuf,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── File-backed directory ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FileDirectoryError {
  #[error("failed to read snapshot {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("snapshot {path:?} is invalid: {source}")]
  Invalid {
    path:   PathBuf,
    #[source]
    source: roster_core::Error,
  },
}

/// Reads the organization snapshot from a JSON file on each fetch, so edits
/// to the file are picked up without a restart.
#[derive(Debug, Clone)]
pub struct FileDirectory {
  path: PathBuf,
}

impl FileDirectory {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }
}

impl Directory for FileDirectory {
  type Error = FileDirectoryError;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<OrgSnapshot, Self::Error>> + Send + '_ {
    async move {
      let bytes = tokio::fs::read(&self.path).await.map_err(|source| {
        FileDirectoryError::Io {
          path: self.path.clone(),
          source,
        }
      })?;
      OrgSnapshot::from_slice(&bytes).map_err(|source| {
        FileDirectoryError::Invalid {
          path: self.path.clone(),
          source,
        }
      })
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/health` plus the API under `/api`.
pub fn router<D>(directory: Arc<D>) -> Router
where
  D: Directory + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", roster_api::api_router(directory))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
