//! Error types for `roster-core`.

use thiserror::Error;

use crate::member::MemberId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("snapshot member at index {index} has an empty id")]
  EmptyMemberId { index: usize },

  #[error("duplicate member id in snapshot: {0}")]
  DuplicateMember(MemberId),

  #[error("requester id is empty")]
  EmptyRequesterId,

  #[error("malformed snapshot: {0}")]
  Snapshot(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
