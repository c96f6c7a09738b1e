//! JSON REST API for Roster.
//!
//! Exposes an axum [`Router`] backed by any [`roster_core::directory::Directory`].
//! Auth, TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", roster_api::api_router(directory.clone()))
//! ```

pub mod error;
pub mod members;

use std::sync::Arc;

use axum::{Router, routing::get};
use roster_core::directory::Directory;

pub use error::ApiError;

/// Build the API router for `directory`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D>(directory: Arc<D>) -> Router<()>
where
  D: Directory + 'static,
{
  Router::new()
    .route("/members", get(members::list::<D>))
    .route("/members/{id}", get(members::get_one::<D>))
    .route("/members/{id}/assignable", get(members::assignable::<D>))
    .route("/members/{id}/subordinates", get(members::subordinates::<D>))
    .route(
      "/members/{id}/can-assign/{assignee}",
      get(members::can_assign::<D>),
    )
    .with_state(directory)
}

#[cfg(test)]
mod tests;
